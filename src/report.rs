//! プールの使用状況のスナップショット.
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::pool::{NodeId, NodeState, PoolInner};
use crate::sequence::Sequence;

/// [`SequencePool::report`]が返す、プールの使用状況のスナップショット.
///
/// 生成後にプールが操作されても、内容は更新されない.
///
/// 以下の関係が常に成り立つ:
///
/// ```text
/// active_elements + fragmented_elements + cached_elements == allocated_segments * segment_length
/// ```
///
/// [`SequencePool::report`]: ../struct.SequencePool.html#method.report
pub struct PoolReport<T> {
    pool: Rc<RefCell<PoolInner<T>>>,
    segment_length: usize,
    allocated_segments: usize,
    active_segments: usize,
    cached_nodes: usize,
    active_nodes: usize,
    fragmented_nodes: usize,
    active_elements: usize,
    fragmented_elements: usize,
    cached_elements: usize,
    fragmented_sizes: Vec<usize>,
    active_nodes_by_recency: Vec<(NodeId, u64, usize)>,
}
impl<T> PoolReport<T>
where
    T: Default + Clone,
{
    pub(crate) fn new(pool: &Rc<RefCell<PoolInner<T>>>) -> Self {
        let inner = pool.borrow();
        let segment_length = inner.store.segment_length();
        let mut report = PoolReport {
            pool: Rc::clone(pool),
            segment_length: segment_length.as_usize(),
            allocated_segments: inner.store.len(),
            active_segments: 0,
            cached_nodes: 0,
            active_nodes: 0,
            fragmented_nodes: 0,
            active_elements: 0,
            fragmented_elements: 0,
            cached_elements: 0,
            fragmented_sizes: Vec::new(),
            active_nodes_by_recency: Vec::new(),
        };

        let mut active = Vec::new();
        let mut last_counted_segment = None;
        for (id, node) in inner.registry.iter() {
            match node.state {
                NodeState::Active => {
                    report.active_nodes += 1;
                    report.active_elements += node.len;
                    active.push((node.stamp, id, node.generation, node.len));
                    if node.len > 0 {
                        // ノードはアドレス順に並んでいるので、直前に数えたセグメントとの重複のみを除けば良い
                        let first = segment_length.segment_index(node.start.as_usize());
                        let last = segment_length.segment_index(node.end().as_usize() - 1);
                        let first = match last_counted_segment {
                            Some(counted) if counted >= first => counted + 1,
                            _ => first,
                        };
                        if first <= last {
                            report.active_segments += last - first + 1;
                        }
                        last_counted_segment = Some(last);
                    }
                }
                NodeState::Cached => {
                    report.cached_nodes += 1;
                    report.cached_elements += node.len;
                }
                NodeState::Fragmented => {
                    report.fragmented_nodes += 1;
                    report.fragmented_elements += node.len;
                    report.fragmented_sizes.push(node.len);
                }
            }
        }

        // 新しく割り当てられたものほど先頭に来るように並べる
        active.sort_by_key(|&(stamp, ..)| std::cmp::Reverse(stamp));
        report.active_nodes_by_recency = active
            .into_iter()
            .map(|(_, id, generation, len)| (id, generation, len))
            .collect();
        report
    }

    /// プールのセグメント長.
    pub fn segment_length(&self) -> usize {
        self.segment_length
    }

    /// 確保済みのセグメント数.
    pub fn allocated_segments(&self) -> usize {
        self.allocated_segments
    }

    /// 貸し出し中のシーケンスが一要素以上を占有しているセグメントの数.
    pub fn active_segments(&self) -> usize {
        self.active_segments
    }

    /// `Cached`状態の空きノードの数.
    pub fn cached_nodes(&self) -> usize {
        self.cached_nodes
    }

    /// `Active`状態のノード(i.e., 貸し出し中のシーケンス)の数.
    pub fn active_nodes(&self) -> usize {
        self.active_nodes
    }

    /// `Fragmented`状態の空きノードの数.
    pub fn fragmented_nodes(&self) -> usize {
        self.fragmented_nodes
    }

    /// 貸し出し中のシーケンスが保持している要素数の合計.
    pub fn active_elements(&self) -> usize {
        self.active_elements
    }

    /// `Fragmented`状態の空きノードが保持している要素数の合計.
    pub fn fragmented_elements(&self) -> usize {
        self.fragmented_elements
    }

    /// `Cached`状態の空きノードが保持している要素数の合計.
    pub fn cached_elements(&self) -> usize {
        self.cached_elements
    }

    /// `Fragmented`状態の空きノードの長さを、アドレス順に返す.
    pub fn fragmented_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.fragmented_sizes.iter().cloned()
    }

    /// 貸し出し中のシーケンスを、新しく割り当てられた順に返す.
    ///
    /// 返されるのは、スナップショット作成時点のシーケンスを指すハンドルで、
    /// イテレータが進む度に一つずつ生成される.
    pub fn active_sequences(&self) -> impl Iterator<Item = Sequence<T>> + '_ {
        self.active_nodes_by_recency
            .iter()
            .map(move |&(id, generation, len)| {
                Sequence::new(Rc::clone(&self.pool), id, generation, len)
            })
    }
}
impl<T> fmt::Debug for PoolReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PoolReport")
            .field("segment_length", &self.segment_length)
            .field("allocated_segments", &self.allocated_segments)
            .field("active_segments", &self.active_segments)
            .field("cached_nodes", &self.cached_nodes)
            .field("active_nodes", &self.active_nodes)
            .field("fragmented_nodes", &self.fragmented_nodes)
            .field("active_elements", &self.active_elements)
            .field("fragmented_elements", &self.fragmented_elements)
            .field("cached_elements", &self.cached_elements)
            .field("fragmented_sizes", &self.fragmented_sizes)
            .finish()
    }
}
impl<T> fmt::Display for PoolReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "segments={}/{} (segment_length={}), active={} ({} elements), \
             cached={} ({} elements), fragmented={} ({} elements)",
            self.active_segments,
            self.allocated_segments,
            self.segment_length,
            self.active_nodes,
            self.active_elements,
            self.cached_nodes,
            self.cached_elements,
            self.fragmented_nodes,
            self.fragmented_elements
        )
    }
}

#[cfg(test)]
mod tests {
    use trackable::error::Failed;
    use trackable::result::TestResult;

    use crate::SequencePool;

    #[test]
    fn report_works() -> TestResult {
        let pool = track!(SequencePool::<u8>::new(16))?;
        let mut a = pool.rent(5);
        let b = pool.rent(20);
        let c = pool.rent(3);
        a.dispose();

        let report = pool.report();
        assert_eq!(report.segment_length(), 16);
        assert_eq!(report.allocated_segments(), 3);
        assert_eq!(report.active_segments(), 3);
        assert_eq!(report.active_nodes(), 2);
        assert_eq!(report.active_elements(), 23);
        assert_eq!(report.fragmented_nodes(), 3);
        assert_eq!(report.fragmented_sizes().collect::<Vec<_>>(), vec![5, 8, 12]);
        assert_eq!(report.cached_nodes(), 0);
        assert_eq!(
            report.active_elements() + report.fragmented_elements() + report.cached_elements(),
            report.allocated_segments() * report.segment_length()
        );

        let lens = report.active_sequences().map(|s| s.len()).collect::<Vec<_>>();
        assert_eq!(lens, vec![c.len(), b.len()]);

        let mut newest = track_assert_some!(report.active_sequences().next(), Failed);
        track!(newest.set(0, 9))?;
        assert_eq!(track!(c.get(0))?, 9);
        newest.dispose();
        assert!(c.is_disposed());
        assert_eq!(report.active_sequences().count(), 2);
        assert!(report
            .active_sequences()
            .all(|s| s.owner().map_or(false, |p| p.ptr_eq(&pool))));
        Ok(())
    }

    #[test]
    fn cached_nodes_are_reported() -> TestResult {
        let pool = track!(SequencePool::<u8>::new(4))?;
        let mut a = pool.rent(8);
        let _b = pool.rent(1);
        a.dispose();

        let report = pool.report();
        assert_eq!(report.cached_nodes(), 1);
        assert_eq!(report.cached_elements(), 8);
        assert_eq!(report.fragmented_elements(), 3);
        assert_eq!(report.active_segments(), 1);
        assert_eq!(
            report.to_string(),
            "segments=1/3 (segment_length=4), active=1 (1 elements), \
             cached=1 (8 elements), fragmented=1 (3 elements)"
        );

        let empty = track!(SequencePool::<u8>::new(4))?.report();
        assert_eq!(empty.allocated_segments(), 0);
        assert_eq!(empty.active_sequences().count(), 0);
        Ok(())
    }
}
