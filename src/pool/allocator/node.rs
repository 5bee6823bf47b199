//! Node

use crate::pool::Address;
use crate::segment::SegmentLength;

/// ノードテーブル内の位置.
pub(crate) type NodeId = usize;

/// ノードの状態.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// シーケンスに割り当て済み.
    Active,

    /// 空き領域で、セグメント境界に揃っており、長さもセグメント長の倍数になっているもの.
    Cached,

    /// `Cached`の条件を満たさない空き領域.
    Fragmented,
}

/// アドレス空間の一部を表現するノード.
///
/// 全てのノードはアドレス順の双方向リストで繋がっており、
/// 確保済みの全セグメントの領域を、隙間なく・重複なく分割している.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub state: NodeState,
    pub start: Address,
    pub len: usize,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,

    /// ノードがシーケンスから切り離される(i.e., 解放ないし再利用される)度にインクリメントされる.
    pub generation: u64,

    /// ノードが`Active`になった順番.
    pub stamp: u64,
}
impl Node {
    pub fn end(&self) -> Address {
        self.start + self.len
    }

    pub fn is_free(&self) -> bool {
        self.state != NodeState::Active
    }

    /// 空きノードの状態を、現在の位置と長さから再計算する.
    pub fn reclassify(&mut self, segment_length: SegmentLength) {
        debug_assert!(self.is_free());
        self.state = classify(self.start, self.len, segment_length);
    }
}

/// 空き領域`[start, start + len)`の状態を返す.
pub(crate) fn classify(start: Address, len: usize, segment_length: SegmentLength) -> NodeState {
    if len > 0 && segment_length.is_aligned(start.as_usize()) && segment_length.is_aligned(len) {
        NodeState::Cached
    } else {
        NodeState::Fragmented
    }
}

#[cfg(test)]
mod tests {
    use trackable::result::TestResult;

    use super::*;

    #[test]
    fn classify_works() -> TestResult {
        let s = track!(SegmentLength::new(16))?;
        assert_eq!(classify(Address::from(0), 16, s), NodeState::Cached);
        assert_eq!(classify(Address::from(32), 48, s), NodeState::Cached);
        assert_eq!(classify(Address::from(17), 15, s), NodeState::Fragmented);
        assert_eq!(classify(Address::from(16), 17, s), NodeState::Fragmented);
        assert_eq!(classify(Address::from(16), 0, s), NodeState::Fragmented);
        Ok(())
    }

    #[test]
    fn reclassify_works() -> TestResult {
        let s = track!(SegmentLength::new(4))?;
        let mut node = Node {
            state: NodeState::Fragmented,
            start: Address::from(4),
            len: 3,
            prev: None,
            next: None,
            generation: 0,
            stamp: 0,
        };
        assert_eq!(node.end(), Address::from(7));
        node.len = 8;
        node.reclassify(s);
        assert_eq!(node.state, NodeState::Cached);
        assert!(node.is_free());
        Ok(())
    }
}
