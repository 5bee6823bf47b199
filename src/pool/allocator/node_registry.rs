//! Node Registry.

use super::node::{classify, Node, NodeId, NodeState};
use crate::metrics::PoolMetrics;
use crate::pool::Address;
use crate::segment::SegmentLength;

/// アドレス空間の割当状況を管理するレジストリ.
///
/// 確保済みの全セグメントを連結した領域を、アドレス順に並んだノード群で分割して管理する.
/// 各ノードは`Active`(シーケンスに割当済み)か、空き(`Cached`ないし`Fragmented`)のいずれかの状態を持つ.
///
/// ノードは`Vec`上のテーブルに格納され、前後のノードへのリンクはテーブル内の位置で表現される.
/// 不要になったノードのスロットは再利用される.
///
/// この構造体は領域の計算処理のみを担当し、実際のデータの読み書きやセグメントの確保は行わない.
/// 新規にセグメントが必要となった場合には、その数が呼び出し元に返される.
///
/// # 割当戦略
///
/// このレジストリは"FirstFit"戦略を採用している.
///
/// 新規割当要求が発行された際には、ノード群を先頭(アドレスの小さい方)から順に走査し、
/// 要求サイズを満たす最初の空きノードが選択される.
/// 余剰分は、選択されたノードの直後に空きノードとして残される.
///
/// 解放されたノードは、前後の空きノードと(状態に関わらず)併合される.
/// そのため、空きノード同士が隣接することはない.
#[derive(Debug)]
pub(crate) struct NodeRegistry {
    nodes: Vec<Node>,
    vacant: Vec<NodeId>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    capacity: usize,
    segment_length: SegmentLength,
    next_stamp: u64,
    metrics: PoolMetrics,
}

/// `NodeRegistry::allocate`の結果.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Allocation {
    /// 割り当てられた`Active`ノード.
    pub node: NodeId,

    /// 呼び出し元が末尾に追加する必要があるセグメントの数.
    pub new_segments: usize,
}

impl NodeRegistry {
    pub fn new(segment_length: SegmentLength, metrics: PoolMetrics) -> Self {
        NodeRegistry {
            nodes: Vec::new(),
            vacant: Vec::new(),
            head: None,
            tail: None,
            capacity: 0,
            segment_length,
            next_stamp: 0,
            metrics,
        }
    }

    /// 全ノードの長さの合計(i.e., 確保済みセグメントの合計要素数)を返す.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// `id`が指すノードが、世代`generation`のまま`Active`であるかどうかを判定する.
    pub fn is_active(&self, id: NodeId, generation: u64) -> bool {
        self.nodes
            .get(id)
            .map_or(false, |n| n.generation == generation && n.state == NodeState::Active)
    }

    /// アドレス順にノードを走査するイテレータを返す.
    pub fn iter(&self) -> NodeIter {
        NodeIter {
            registry: self,
            next: self.head,
        }
    }

    /// `len`要素分の領域を割り当てる.
    ///
    /// 十分な大きさの空きノードが存在する場合には、その先頭部分が割り当てられる.
    /// 存在しない場合には、末尾にセグメント境界から始まる領域が追加される.
    pub fn allocate(&mut self, len: usize) -> Allocation {
        debug_assert!(len > 0);
        let found = self
            .iter()
            .find(|&(_, n)| n.is_free() && n.len >= len)
            .map(|(id, _)| id);
        if let Some(free) = found {
            self.metrics.first_fit_hits.increment();
            let node = self.activate_front(free, len);
            return Allocation {
                node,
                new_segments: 0,
            };
        }

        self.metrics.first_fit_misses.increment();
        let new_segments = self.segment_length.segments_for(len);
        let free = self.append_free(new_segments * self.segment_length.as_usize(), false);
        let node = self.activate_front(free, len);
        Allocation { node, new_segments }
    }

    /// アドレス空間の末尾に`len`要素分の`Active`ノードを作成する.
    ///
    /// 末尾のノードが空きの場合には、その開始位置から割当が行われる.
    pub fn allocate_tail(&mut self, len: usize) -> Allocation {
        let tail_free = self.tail.filter(|&id| self.nodes[id].is_free());
        let available = tail_free.map_or(0, |id| self.nodes[id].len);
        let mut new_segments = 0;
        if len > available {
            new_segments = self.segment_length.segments_for(len - available);
        }

        let free = if new_segments > 0 {
            self.append_free(new_segments * self.segment_length.as_usize(), true)
        } else if let Some(free) = tail_free {
            free
        } else {
            // 長さ0のノードを末尾に追加する
            let start = Address::from(self.capacity);
            let id = self.insert_after(self.tail, NodeState::Fragmented, start, 0);
            self.metrics.inserted_nodes.increment();
            id
        };
        let node = self.activate_front(free, len);
        Allocation { node, new_segments }
    }

    /// `Active`ノード`id`を、移動なしで`extra`要素分伸長することを試みる.
    ///
    /// 伸長可能な場合には、呼び出し元が追加する必要があるセグメントの数が返される.
    /// 後続のノードが`Active`等の理由で伸長できない場合には`None`が返される.
    pub fn grow_in_place(&mut self, id: NodeId, extra: usize) -> Option<usize> {
        debug_assert_eq!(self.nodes[id].state, NodeState::Active);
        let next = self.nodes[id].next;
        match next {
            None => {
                let new_segments = self.segment_length.segments_for(extra);
                let free = self.append_free(new_segments * self.segment_length.as_usize(), true);
                self.absorb_front(id, free, extra);
                Some(new_segments)
            }
            Some(next) if self.nodes[next].is_free() => {
                let available = self.nodes[next].len;
                if available >= extra {
                    self.absorb_front(id, next, extra);
                    Some(0)
                } else if self.nodes[next].next.is_none() {
                    let new_segments = self.segment_length.segments_for(extra - available);
                    let len = new_segments * self.segment_length.as_usize();
                    let free = self.append_free(len, true);
                    self.absorb_front(id, free, extra);
                    Some(new_segments)
                } else {
                    None
                }
            }
            Some(_) => None,
        }
    }

    /// `Active`ノード`id`を解放する.
    ///
    /// 解放されたノードの(併合前の)範囲が返される.
    ///
    /// # 事前条件
    ///
    /// - `id`は`Active`なノードである
    pub fn release(&mut self, id: NodeId) -> (Address, usize) {
        assert_eq!(self.nodes[id].state, NodeState::Active, "{:?}", self.nodes[id]);
        let released = (self.nodes[id].start, self.nodes[id].len);
        self.nodes[id].generation += 1;
        self.nodes[id].state = NodeState::Fragmented;

        let mut id = id;
        if let Some(prev) = self.nodes[id].prev.filter(|&p| self.nodes[p].is_free()) {
            self.nodes[prev].len += self.nodes[id].len;
            self.unlink(id);
            id = prev;
        }
        if let Some(next) = self.nodes[id].next.filter(|&n| self.nodes[n].is_free()) {
            self.nodes[id].len += self.nodes[next].len;
            self.unlink(next);
        }

        if self.nodes[id].len == 0 {
            self.unlink(id);
        } else {
            let segment_length = self.segment_length;
            self.nodes[id].reclassify(segment_length);
        }
        released
    }

    /// 末尾の空きノード群が覆っているセグメントを切り離す.
    ///
    /// 最初に出現した`Active`ノードで走査は停止する.
    /// 切り離されたセグメントの数が返される.
    pub fn trim(&mut self) -> usize {
        let mut released = 0;
        while let Some(tail) = self.tail.filter(|&t| self.nodes[t].is_free()) {
            let keep_end = self
                .segment_length
                .ceil_align(self.nodes[tail].start.as_usize());
            let excess = self.capacity - keep_end;
            if excess == 0 {
                break;
            }
            self.capacity = keep_end;
            self.nodes[tail].len -= excess;
            released += excess;
            if self.nodes[tail].len == 0 {
                self.unlink(tail);
            } else {
                let segment_length = self.segment_length;
                self.nodes[tail].reclassify(segment_length);
                break;
            }
        }
        released / self.segment_length.as_usize()
    }

    // 空きノード`free`の先頭`len`要素を`Active`にする.
    // 余剰分は直後の空きノードとして残される.
    fn activate_front(&mut self, free: NodeId, len: usize) -> NodeId {
        debug_assert!(self.nodes[free].is_free());
        debug_assert!(self.nodes[free].len >= len);
        let remainder = self.nodes[free].len - len;
        if remainder > 0 {
            let start = self.nodes[free].start + len;
            let state = classify(start, remainder, self.segment_length);
            self.insert_after(Some(free), state, start, remainder);
            self.metrics.inserted_nodes.increment();
        }

        let stamp = self.next_stamp;
        self.next_stamp += 1;
        let node = &mut self.nodes[free];
        node.len = len;
        node.state = NodeState::Active;
        node.stamp = stamp;
        free
    }

    // 直後の空きノード`free`の先頭`extra`要素を`id`に取り込む.
    fn absorb_front(&mut self, id: NodeId, free: NodeId, extra: usize) {
        debug_assert_eq!(self.nodes[id].next, Some(free));
        debug_assert!(self.nodes[free].len >= extra);
        self.nodes[id].len += extra;
        if self.nodes[free].len == extra {
            self.unlink(free);
        } else {
            let segment_length = self.segment_length;
            let node = &mut self.nodes[free];
            node.start = node.start + extra;
            node.len -= extra;
            node.reclassify(segment_length);
        }
    }

    // 末尾に`len`要素分の空き領域を追加し、それを保持する空きノードを返す.
    //
    // `coalesce`が`true`かつ末尾のノードが空きの場合には、そのノードに併合される.
    // `false`の場合には、追加された領域は常に独立したノードとなるが、
    // 呼び出し元は直ちにその先頭を`Active`にしなければならない.
    fn append_free(&mut self, len: usize, coalesce: bool) -> NodeId {
        let start = Address::from(self.capacity);
        self.capacity += len;
        let segment_length = self.segment_length;
        let tail_free = self.tail.filter(|&t| coalesce && self.nodes[t].is_free());
        if let Some(tail) = tail_free {
            self.nodes[tail].len += len;
            self.nodes[tail].reclassify(segment_length);
            tail
        } else {
            let state = classify(start, len, segment_length);
            let id = self.insert_after(self.tail, state, start, len);
            self.metrics.inserted_nodes.increment();
            id
        }
    }

    fn insert_after(
        &mut self,
        prev: Option<NodeId>,
        state: NodeState,
        start: Address,
        len: usize,
    ) -> NodeId {
        let next = match prev {
            Some(p) => self.nodes[p].next,
            None => self.head,
        };
        let node = Node {
            state,
            start,
            len,
            prev,
            next,
            generation: 0,
            stamp: 0,
        };
        let id = if let Some(id) = self.vacant.pop() {
            // 古いハンドルが再利用後のノードを参照しないように世代を進める
            let generation = self.nodes[id].generation + 1;
            self.nodes[id] = Node { generation, ..node };
            id
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        };

        match prev {
            Some(p) => self.nodes[p].next = Some(id),
            None => self.head = Some(id),
        }
        match next {
            Some(n) => self.nodes[n].prev = Some(id),
            None => self.tail = Some(id),
        }
        id
    }

    fn unlink(&mut self, id: NodeId) {
        let (prev, next) = (self.nodes[id].prev, self.nodes[id].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        let node = &mut self.nodes[id];
        node.prev = None;
        node.next = None;
        node.len = 0;
        node.state = NodeState::Fragmented;
        node.generation += 1;
        self.vacant.push(id);
        self.metrics.removed_nodes.increment();
    }
}

/// `NodeRegistry::iter`が返すイテレータ.
#[derive(Debug)]
pub(crate) struct NodeIter<'a> {
    registry: &'a NodeRegistry,
    next: Option<NodeId>,
}
impl<'a> Iterator for NodeIter<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = &self.registry.nodes[id];
        self.next = node.next;
        Some((id, node))
    }
}
