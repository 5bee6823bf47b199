//! シーケンス用のメモリプール.
//!
//! [SequencePool]は、固定長のセグメント群を論理的に連結したアドレス空間を管理し、
//! その部分領域を可変長の[Sequence]として貸し出す.
//!
//! 返却された領域は、アドレス上で隣接する空き領域と併合された上で、以後の貸し出しに再利用される.
//!
//! [SequencePool]: ./struct.SequencePool.html
//! [Sequence]: ../sequence/struct.Sequence.html
use slog::Logger;
use std::cell::RefCell;
use std::rc::Rc;
use uuid::Uuid;

pub use self::address::Address;
pub use self::allocator::NodeState;
pub use self::builder::SequencePoolBuilder;

pub(crate) use self::allocator::NodeId;

use self::allocator::NodeRegistry;
use crate::metrics::PoolMetrics;
use crate::report::PoolReport;
use crate::segment::SegmentStore;
use crate::sequence::Sequence;
use crate::Result;

mod address;
mod allocator;
mod builder;

/// 可変長のシーケンスを貸し出すためのメモリプール.
///
/// 内部状態は`Rc<RefCell<_>>`で共有されており、`SequencePool`自体の複製は安価
/// (複製したインスタンスは全て同じプールを指す).
/// ただし、スレッド間での共有はできない.
///
/// # 割当戦略
///
/// - 割当はアドレスの昇順に空き領域を走査する"FirstFit"で行われる
/// - 十分な空き領域が無い場合には、必要な数のセグメントが末尾に追加される
/// - 返却された領域は、隣接する空き領域と併合される
/// - セグメントが解放されるのは`trim_excess`が呼ばれた場合のみ
///
/// # Examples
///
/// ```
/// use segpool::SequencePool;
///
/// let pool = SequencePool::<u8>::new(16).unwrap();
/// let mut seq = pool.rent(17);
/// assert_eq!(seq.len(), 17);
/// assert_eq!(seq.segments().map(|s| s.len()).collect::<Vec<_>>(), vec![16, 1]);
///
/// seq.push(3);
/// assert_eq!(seq.get(17).ok(), Some(3));
///
/// seq.dispose();
/// assert_eq!(seq.len(), 0);
/// ```
#[derive(Debug)]
pub struct SequencePool<T> {
    inner: Rc<RefCell<PoolInner<T>>>,
}
impl<T> SequencePool<T>
where
    T: Default + Clone,
{
    /// デフォルト設定で、セグメント長の下限が`min_segment_length`のプールを生成する.
    ///
    /// # Errors
    ///
    /// `min_segment_length`が`[1, 2^30]`の範囲外の場合には、
    /// 種類が`ErrorKind::InvalidInput`のエラーが返される.
    pub fn new(min_segment_length: usize) -> Result<Self> {
        track!(SequencePoolBuilder::new()
            .min_segment_length(min_segment_length)
            .finish())
    }

    pub(crate) fn from_inner(inner: PoolInner<T>) -> Self {
        SequencePool {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    pub(crate) fn from_rc(inner: Rc<RefCell<PoolInner<T>>>) -> Self {
        SequencePool { inner }
    }

    /// セグメント長を返す.
    pub fn segment_length(&self) -> usize {
        self.inner.borrow().store.segment_length().as_usize()
    }

    /// 返却された領域をゼロクリアするかどうかを返す.
    pub fn clear_returned_sequences(&self) -> bool {
        self.inner.borrow().clear_returned_sequences
    }

    /// 返却された領域をゼロクリアするかどうかを設定する.
    ///
    /// 変更は、これ以降に返却される領域に対してのみ反映される.
    pub fn set_clear_returned_sequences(&self, clear: bool) {
        self.inner.borrow_mut().clear_returned_sequences = clear;
    }

    /// プールインスタンスの識別子を返す.
    pub fn instance_uuid(&self) -> Uuid {
        self.inner.borrow().instance_uuid
    }

    /// プールのメトリクスを返す.
    pub fn metrics(&self) -> PoolMetrics {
        self.inner.borrow().metrics.clone()
    }

    /// 長さ`len`のシーケンスを借りる.
    ///
    /// `len`が`0`の場合には、どのプールにも属さない空のシーケンスが返される(領域の確保は行われない).
    ///
    /// 新規に確保されたセグメント上の要素、および返却時にゼロクリアされた要素は`T::default()`となる.
    /// それ以外の場合には、以前に書き込まれた値がそのまま残っている.
    ///
    /// # Panics
    ///
    /// このプールに属するシーケンスの`segments()`が返した参照が生存している場合には、パニックする.
    pub fn rent(&self, len: usize) -> Sequence<T> {
        if len == 0 {
            return Sequence::default();
        }
        let (node, generation) = self.inner.borrow_mut().allocate(len);
        Sequence::new(Rc::clone(&self.inner), node, generation, len)
    }

    /// アドレス空間の末尾に、長さ`len`のシーケンスを借りる.
    ///
    /// 返されたシーケンスの直後には(他の割当が行われない限り)常に伸長の余地があるので、
    /// 以後の`push`や`expand`はデータの移動なしで行われる.
    ///
    /// `rent`とは異なり、`len`が`0`の場合でも、このプールに属するシーケンスが返される.
    pub fn greedy_rent(&self, len: usize) -> Sequence<T> {
        let (node, generation) = self.inner.borrow_mut().allocate_tail(len);
        Sequence::new(Rc::clone(&self.inner), node, generation, len)
    }

    /// 末尾の空き領域が覆っているセグメントを解放する.
    ///
    /// 貸し出し中のシーケンスが移動されることはない.
    /// 解放されたセグメントの数が返される.
    pub fn trim_excess(&self) -> usize {
        self.inner.borrow_mut().trim_excess()
    }

    /// プールの使用状況のスナップショットを返す.
    pub fn report(&self) -> PoolReport<T> {
        PoolReport::new(&self.inner)
    }

    /// `self`と`other`が同じプールを指しているかどうかを判定する.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
impl<T> Clone for SequencePool<T> {
    fn clone(&self) -> Self {
        SequencePool {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// プールの内部状態.
///
/// `Sequence`からも操作されるので`crate`内に公開している.
#[derive(Debug)]
pub(crate) struct PoolInner<T> {
    pub(crate) store: SegmentStore<T>,
    pub(crate) registry: NodeRegistry,
    pub(crate) clear_returned_sequences: bool,
    pub(crate) instance_uuid: Uuid,
    pub(crate) metrics: PoolMetrics,
    pub(crate) logger: Logger,
}
impl<T> PoolInner<T>
where
    T: Default + Clone,
{
    /// ノード`node`が世代`generation`のまま`Active`である場合に、その開始位置を返す.
    pub fn active_start(&self, node: NodeId, generation: u64) -> Option<usize> {
        if self.registry.is_active(node, generation) {
            Some(self.registry.node(node).start.as_usize())
        } else {
            None
        }
    }

    /// ノード`node`が世代`generation`のまま`Active`である場合に、その長さを返す.
    pub fn active_len(&self, node: NodeId, generation: u64) -> Option<usize> {
        if self.registry.is_active(node, generation) {
            Some(self.registry.node(node).len)
        } else {
            None
        }
    }

    pub fn allocate(&mut self, len: usize) -> (NodeId, u64) {
        let allocation = self.registry.allocate(len);
        self.grow_store(allocation.new_segments);
        self.metrics.rented_sequences.increment();
        self.metrics.rented_elements.add_u64(len as u64);
        (
            allocation.node,
            self.registry.node(allocation.node).generation,
        )
    }

    pub fn allocate_tail(&mut self, len: usize) -> (NodeId, u64) {
        let allocation = self.registry.allocate_tail(len);
        self.grow_store(allocation.new_segments);
        self.metrics.rented_sequences.increment();
        self.metrics.rented_elements.add_u64(len as u64);
        (
            allocation.node,
            self.registry.node(allocation.node).generation,
        )
    }

    /// シーケンスを返却する.
    ///
    /// 既に返却済みの場合には何もせずに`false`を返す.
    pub fn dispose(&mut self, node: NodeId, generation: u64) -> bool {
        if !self.registry.is_active(node, generation) {
            return false;
        }
        self.release(node);
        self.metrics.disposed_sequences.increment();
        true
    }

    /// シーケンスを`extra`要素分伸長する.
    ///
    /// 伸長後のノードとその世代が返される.
    /// 移動が必要だった場合には、元とは異なるノードとなる.
    pub fn grow(&mut self, node: NodeId, generation: u64, extra: usize) -> Option<(NodeId, u64)> {
        if !self.registry.is_active(node, generation) || extra == 0 {
            return None;
        }
        let (start, len) = {
            let n = self.registry.node(node);
            (n.start.as_usize(), n.len)
        };

        if let Some(new_segments) = self.registry.grow_in_place(node, extra) {
            self.grow_store(new_segments);
            self.store.reset(start + len, extra);
            self.metrics.in_place_growths.increment();
            self.metrics.rented_elements.add_u64(extra as u64);
            return Some((node, generation));
        }

        let allocation = self.registry.allocate(len + extra);
        self.grow_store(allocation.new_segments);
        let new_start = self.registry.node(allocation.node).start.as_usize();
        self.store.copy_nonoverlapping(start, new_start, len);
        self.store.reset(new_start + len, extra);
        self.release(node);
        self.metrics.migrations.increment();
        self.metrics
            .rented_elements
            .add_u64((len + extra) as u64);
        debug!(
            self.logger,
            "Sequence migrated";
            "from" => start, "to" => new_start, "len" => len + extra
        );
        Some((
            allocation.node,
            self.registry.node(allocation.node).generation,
        ))
    }

    pub fn trim_excess(&mut self) -> usize {
        let released = self.registry.trim();
        if released > 0 {
            let remaining = self.store.len() - released;
            self.store.truncate(remaining);
            self.metrics.released_segments.add_u64(released as u64);
            info!(
                self.logger,
                "Segments released";
                "released" => released, "remaining" => remaining
            );
        }
        debug_assert_eq!(self.store.capacity(), self.registry.capacity());
        released
    }

    fn release(&mut self, node: NodeId) {
        let (start, len) = self.registry.release(node);
        if self.clear_returned_sequences {
            self.store.reset(start.as_usize(), len);
        }
        self.metrics.released_elements.add_u64(len as u64);
    }

    fn grow_store(&mut self, new_segments: usize) {
        if new_segments > 0 {
            self.store.grow(new_segments);
            self.metrics
                .allocated_segments
                .add_u64(new_segments as u64);
            debug!(
                self.logger,
                "Segments allocated";
                "allocated" => new_segments, "total" => self.store.len()
            );
        }
        debug_assert_eq!(self.store.capacity(), self.registry.capacity());
    }
}

#[cfg(test)]
mod tests {
    use trackable::result::TestResult;
    use uuid::Uuid;

    use super::*;
    use crate::ErrorKind;

    fn segment_lens<T: Default + Clone>(seq: &Sequence<T>) -> Vec<usize> {
        seq.segments().map(|s| s.len()).collect()
    }

    #[test]
    fn segment_length_is_rounded_up() -> TestResult {
        assert_eq!(track!(SequencePool::<u8>::new(1))?.segment_length(), 1);
        assert_eq!(track!(SequencePool::<u8>::new(30))?.segment_length(), 32);
        assert_eq!(track!(SequencePool::<u8>::new(1024))?.segment_length(), 1024);

        for &len in &[0, (1 << 30) + 1] {
            let e = SequencePool::<u8>::new(len).err().map(|e| *e.kind());
            assert_eq!(e, Some(ErrorKind::InvalidInput));
        }
        Ok(())
    }

    #[test]
    fn rent_zero_allocates_nothing() -> TestResult {
        let pool = track!(SequencePool::<u8>::new(16))?;
        let mut seq = pool.rent(0);
        assert_eq!(seq.len(), 0);
        assert!(seq.owner().is_none());
        assert_eq!(seq.segments().count(), 0);

        seq.push(1);
        assert_eq!(seq.len(), 0);
        assert_eq!(pool.report().allocated_segments(), 0);
        assert_eq!(pool.metrics().rented_sequences(), 0);
        Ok(())
    }

    #[test]
    fn rent_spans_segments() -> TestResult {
        let pool = track!(SequencePool::<u8>::new(16))?;
        let seq = pool.rent(17);
        assert_eq!(segment_lens(&seq), vec![16, 1]);

        let pool = track!(SequencePool::<u32>::new(30))?;
        let seq = pool.rent(97);
        assert_eq!(segment_lens(&seq), vec![32, 32, 32, 1]);
        assert_eq!(pool.report().allocated_segments(), 4);
        Ok(())
    }

    #[test]
    fn disposed_region_is_reused() -> TestResult {
        let pool = track!(SequencePool::<u8>::new(16))?;
        let mut a = pool.rent(10);
        let ptr = a.segments().next().map(|s| s.as_ptr());
        a.dispose();
        assert_eq!(a.len(), 0);
        assert!(a.owner().is_none());

        let b = pool.rent(10);
        assert_eq!(b.segments().next().map(|s| s.as_ptr()), ptr);
        assert_eq!(pool.report().allocated_segments(), 1);
        Ok(())
    }

    #[test]
    fn returned_sequences_are_cleared() -> TestResult {
        let pool = track!(SequencePool::<u8>::new(16))?;
        assert!(pool.clear_returned_sequences());

        let mut a = pool.rent(4);
        a.fill(7);
        a.dispose();
        let mut b = pool.rent(4);
        assert_eq!(b.to_vec(), vec![0; 4]);

        pool.set_clear_returned_sequences(false);
        b.fill(7);
        b.dispose();
        let c = pool.rent(4);
        assert_eq!(c.to_vec(), vec![7; 4]);
        Ok(())
    }

    #[test]
    fn push_grows_in_place_at_tail() -> TestResult {
        let pool = track!(SequencePool::<u8>::new(4))?;
        let mut a = pool.rent(3);
        a.push(1);
        a.push(2);
        assert_eq!(a.to_vec(), vec![0, 0, 0, 1, 2]);
        assert_eq!(segment_lens(&a), vec![4, 1]);

        let metrics = pool.metrics();
        assert_eq!(metrics.in_place_growths(), 2);
        assert_eq!(metrics.migrations(), 0);
        assert_eq!(pool.report().allocated_segments(), 2);
        Ok(())
    }

    #[test]
    fn push_migrates_when_blocked() -> TestResult {
        let pool = track!(SequencePool::<u8>::new(4))?;
        let mut a = pool.rent(2);
        track!(a.copy_from(&[1, 2]))?;
        let _b = pool.rent(2);
        let mut alias = a.clone();

        a.push(3);
        assert_eq!(a.to_vec(), vec![1, 2, 3]);
        assert_eq!(pool.metrics().migrations(), 1);

        // 移動前の領域を指す複製は無効になる
        assert_eq!(alias.len(), 2);
        assert_eq!(alias.get(0).err().map(|e| *e.kind()), Some(ErrorKind::OutOfRange));
        assert_eq!(alias.refresh(), 0);
        assert!(alias.is_disposed());

        // 移動前の領域は返却済み(かつゼロクリア済み)
        let c = pool.rent(2);
        assert_eq!(c.to_vec(), vec![0, 0]);
        assert_eq!(pool.report().allocated_segments(), 2);
        Ok(())
    }

    #[test]
    fn dispose_is_idempotent() -> TestResult {
        let pool = track!(SequencePool::<u8>::new(16))?;
        let mut a = pool.rent(4);
        let mut alias = a.clone();
        a.dispose();
        a.dispose();
        alias.dispose();
        assert_eq!(alias.len(), 0);

        let metrics = pool.metrics();
        assert_eq!(metrics.rented_sequences(), 1);
        assert_eq!(metrics.disposed_sequences(), 1);
        assert_eq!(metrics.active_sequences(), 0);
        Ok(())
    }

    #[test]
    fn alias_observes_growth_after_refresh() -> TestResult {
        let pool = track!(SequencePool::<u8>::new(16))?;
        let mut a = pool.rent(4);
        let mut alias = a.clone();
        a.push(9);

        assert_eq!(alias.len(), 4);
        assert_eq!(alias.refresh(), 5);
        assert_eq!(track!(alias.get(4))?, 9);
        Ok(())
    }

    #[test]
    fn greedy_rent_never_migrates() -> TestResult {
        let pool = track!(SequencePool::<u32>::new(4))?;
        let _a = pool.rent(1);
        let mut g = pool.greedy_rent(0);
        assert_eq!(g.len(), 0);
        assert!(g.owner().map_or(false, |p| p.ptr_eq(&pool)));

        for i in 0..10 {
            g.push(i);
        }
        assert_eq!(g.to_vec(), (0..10).collect::<Vec<_>>());
        assert_eq!(segment_lens(&g), vec![3, 4, 3]);

        let metrics = pool.metrics();
        assert_eq!(metrics.in_place_growths(), 10);
        assert_eq!(metrics.migrations(), 0);
        assert_eq!(pool.report().allocated_segments(), 3);
        Ok(())
    }

    #[test]
    fn trim_excess_releases_trailing_segments() -> TestResult {
        let pool = track!(SequencePoolBuilder::new()
            .min_segment_length(4)
            .clear_returned_sequences(false)
            .finish::<u8>())?;
        let mut a = pool.rent(4);
        let mut b = pool.rent(8);
        b.fill(9);
        assert_eq!(pool.trim_excess(), 0);

        b.dispose();
        assert_eq!(pool.trim_excess(), 2);
        assert_eq!(pool.report().allocated_segments(), 1);
        assert_eq!(pool.metrics().segments(), 1);

        // 解放後に確保されたセグメントは初期値で埋められている
        let c = pool.rent(8);
        assert_eq!(c.to_vec(), vec![0; 8]);

        a.dispose();
        assert_eq!(pool.trim_excess(), 0);
        Ok(())
    }

    #[test]
    fn builder_works() -> TestResult {
        let pool = track!(SequencePoolBuilder::new()
            .instance_uuid(Uuid::nil())
            .clear_returned_sequences(false)
            .finish::<u8>())?;
        assert_eq!(pool.segment_length(), SequencePoolBuilder::DEFAULT_SEGMENT_LENGTH);
        assert_eq!(pool.instance_uuid(), Uuid::nil());
        assert!(!pool.clear_returned_sequences());
        assert_eq!(pool.metrics().segment_length(), 1024);

        let other = pool.clone();
        assert!(other.ptr_eq(&pool));
        assert!(!other.ptr_eq(&track!(SequencePool::new(1024))?));
        Ok(())
    }

    fn assert_consistent<T: Default + Clone>(pool: &SequencePool<T>) {
        let report = pool.report();
        assert_eq!(
            report.active_elements() + report.fragmented_elements() + report.cached_elements(),
            report.allocated_segments() * report.segment_length()
        );

        let inner = pool.inner.borrow();
        let mut position = 0;
        let mut prev_is_free = false;
        for (_, node) in inner.registry.iter() {
            assert_eq!(node.start.as_usize(), position);
            if node.is_free() {
                assert!(node.len > 0);
                assert!(!prev_is_free);
            }
            prev_is_free = node.is_free();
            position += node.len;
        }
        assert_eq!(position, inner.registry.capacity());
        assert_eq!(position, inner.store.capacity());
    }

    #[test]
    fn invariants_hold_under_mixed_operations() -> TestResult {
        let pool = track!(SequencePool::<u32>::new(8))?;
        let mut live: Vec<(Sequence<u32>, Vec<u32>)> = Vec::new();
        let mut value = 0;
        let mut state = 0x2545_f491_4f6c_dd1du64;
        let mut random = |n: usize| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 33) as usize % n
        };

        for step in 0..1000 {
            match random(7) {
                0 | 1 => {
                    let len = 1 + random(20);
                    value += 1;
                    let seq = pool.rent(len);
                    seq.fill(value);
                    live.push((seq, vec![value; len]));
                }
                2 => {
                    let len = random(3);
                    value += 1;
                    let seq = pool.greedy_rent(len);
                    seq.fill(value);
                    live.push((seq, vec![value; len]));
                }
                3 | 4 if !live.is_empty() => {
                    let i = random(live.len());
                    let n = random(4);
                    let (seq, expected) = &mut live[i];
                    value += 1;
                    seq.push(value);
                    expected.push(value);
                    if n > 0 {
                        assert!(seq.expand(n));
                        expected.resize(expected.len() + n, 0);
                    }
                }
                5 if !live.is_empty() => {
                    let i = random(live.len());
                    let (mut seq, _) = live.swap_remove(i);
                    seq.dispose();
                }
                _ => {
                    pool.trim_excess();
                }
            }

            assert_consistent(&pool);
            for (seq, expected) in &live {
                assert_eq!(seq.len(), expected.len(), "step={}", step);
                assert_eq!(&seq.to_vec(), expected, "step={}", step);
            }
        }

        let metrics = pool.metrics();
        assert!(metrics.in_place_growths() > 0);
        assert!(metrics.migrations() > 0);
        assert_eq!(metrics.active_sequences(), live.len() as u64);

        for (mut seq, _) in live {
            seq.dispose();
        }
        pool.trim_excess();
        assert_consistent(&pool);
        assert_eq!(pool.report().allocated_segments(), 0);
        Ok(())
    }
}
