use std::cell::Ref;

use super::view::SequenceView;
use super::Sequence;
use crate::segment::Runs;

/// シーケンスを構成するセグメント群を走査するイテレータ.
///
/// 各要素は、一つの物理セグメント内に収まる連続した部分スライスで、
/// 内容の複製は行われない.
///
/// 返却済みのシーケンスに対しては、要素を一つも返さない.
/// 走査中に(別のハンドル経由で)シーケンスが返却ないし移動された場合には、その時点で走査は終了する.
#[derive(Debug)]
pub struct Segments<'a, T: 'a> {
    sequence: &'a Sequence<T>,
    runs: Option<Runs>,
}
impl<'a, T> Segments<'a, T> {
    pub(crate) fn new(sequence: &'a Sequence<T>, runs: Option<Runs>) -> Self {
        Segments { sequence, runs }
    }
}
impl<'a, T> Iterator for Segments<'a, T>
where
    T: Default + Clone,
{
    type Item = Ref<'a, [T]>;

    fn next(&mut self) -> Option<Self::Item> {
        let run = self.runs.as_mut()?.next()?;
        let sequence = self.sequence;
        let inner = sequence.pool.as_ref()?.borrow();
        if inner
            .active_start(sequence.node, sequence.generation)
            .is_none()
        {
            self.runs = None;
            return None;
        }
        Some(Ref::map(inner, |inner| inner.store.run(run)))
    }
}

/// シーケンスの要素を先頭から順に走査するイテレータ.
///
/// 走査中にシーケンスが返却された場合には、その時点で走査は終了する.
#[derive(Debug)]
pub struct Iter<'a, T: 'a> {
    view: SequenceView<'a, T>,
    index: usize,
}
impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(view: SequenceView<'a, T>) -> Self {
        Iter { view, index: 0 }
    }
}
impl<'a, T> Iterator for Iter<'a, T>
where
    T: Default + Clone,
{
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.view.get(self.index).ok()?;
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.view.len() - self.index;
        (0, Some(remaining))
    }
}
