use std::fmt;

use super::segments::{Iter, Segments};
use super::Sequence;
use crate::{ErrorKind, Result};

/// シーケンスの部分範囲を表す、所有権を持たないビュー.
///
/// ビュー経由の読み書きは、元のシーケンスのハンドルを通して行われるので、
/// シーケンスが返却済みの場合の振る舞いも`Sequence`と同様になる.
pub struct SequenceView<'a, T: 'a> {
    sequence: &'a Sequence<T>,
    start: usize,
    len: usize,
}
impl<'a, T> SequenceView<'a, T>
where
    T: Default + Clone,
{
    pub(crate) fn new(sequence: &'a Sequence<T>, start: usize, len: usize) -> Self {
        SequenceView {
            sequence,
            start,
            len,
        }
    }

    /// ビューの長さを返す.
    pub fn len(&self) -> usize {
        self.len
    }

    /// ビューの長さが`0`かどうかを判定する.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `index`番目の要素を返す.
    ///
    /// # Errors
    ///
    /// `index`が`[0, len)`の範囲外の場合や、シーケンスが返却済みの場合には、
    /// 種類が`ErrorKind::OutOfRange`のエラーが返される.
    pub fn get(&self, index: usize) -> Result<T> {
        track_assert!(index < self.len, ErrorKind::OutOfRange; index, self.len);
        let position = self.start + index;
        let value = self
            .sequence
            .with_inner(|inner, base| inner.store.get(base + position).clone());
        let value = track_assert_some!(value, ErrorKind::OutOfRange, "Disposed sequence");
        Ok(value)
    }

    /// `index`番目の要素を`value`で上書きする.
    ///
    /// シーケンスが返却済みの場合には何も行わない.
    ///
    /// # Errors
    ///
    /// `index`が`[0, len)`の範囲外の場合には、種類が`ErrorKind::OutOfRange`のエラーが返される.
    pub fn set(&self, index: usize, value: T) -> Result<()> {
        track_assert!(index < self.len, ErrorKind::OutOfRange; index, self.len);
        let position = self.start + index;
        self.sequence.with_inner_mut(|inner, base| {
            *inner.store.get_mut(base + position) = value;
        });
        Ok(())
    }

    /// このビュー内の`[start, start + len)`の範囲を表すビューを返す.
    ///
    /// # Errors
    ///
    /// 範囲がビューに収まらない場合には、種類が`ErrorKind::OutOfRange`のエラーが返される.
    pub fn slice(&self, start: usize, len: usize) -> Result<Self> {
        track_assert!(start <= self.len, ErrorKind::OutOfRange; start, self.len);
        track_assert!(len <= self.len - start, ErrorKind::OutOfRange; start, len, self.len);
        Ok(SequenceView::new(self.sequence, self.start + start, len))
    }

    /// このビュー内の`start`以降の範囲を表すビューを返す.
    ///
    /// # Errors
    ///
    /// `start`がビューの長さを超えている場合には、種類が`ErrorKind::OutOfRange`のエラーが返される.
    pub fn slice_from(&self, start: usize) -> Result<Self> {
        track_assert!(start <= self.len, ErrorKind::OutOfRange; start, self.len);
        track!(self.slice(start, self.len - start))
    }

    /// ビューを構成するセグメント群を、アドレス順に走査するイテレータを返す.
    pub fn segments(&self) -> Segments<'a, T> {
        let (start, len) = (self.start, self.len);
        let runs = self.sequence.with_inner(|inner, base| {
            inner.store.segment_length().runs(base + start, len)
        });
        Segments::new(self.sequence, runs)
    }

    /// 要素を先頭から順に走査するイテレータを返す.
    pub fn iter(&self) -> Iter<'a, T> {
        Iter::new(*self)
    }

    /// 全要素を`T::default()`で上書きする.
    pub fn clear(&self) {
        let (start, len) = (self.start, self.len);
        self.sequence
            .with_inner_mut(|inner, base| inner.store.reset(base + start, len));
    }

    /// 全要素を`value`で上書きする.
    pub fn fill(&self, value: T) {
        let (start, len) = (self.start, self.len);
        self.sequence.with_inner_mut(|inner, base| {
            inner.store.for_each_run_mut(base + start, len, |run| {
                for x in run {
                    *x = value.clone();
                }
            })
        });
    }

    /// 要素を`destination`の先頭にコピーする.
    ///
    /// シーケンスが返却済みの場合には何も行わない.
    ///
    /// # Errors
    ///
    /// `destination`がビューよりも短い場合には、種類が`ErrorKind::InvalidInput`のエラーが返される.
    pub fn copy_to(&self, destination: &mut [T]) -> Result<()> {
        if self.sequence.is_disposed() {
            return Ok(());
        }
        track_assert!(
            destination.len() >= self.len,
            ErrorKind::InvalidInput;
            destination.len(),
            self.len
        );
        let (start, len) = (self.start, self.len);
        self.sequence.with_inner(|inner, base| {
            let mut copied = 0;
            inner.store.for_each_run(base + start, len, |run| {
                destination[copied..copied + run.len()].clone_from_slice(run);
                copied += run.len();
            });
        });
        Ok(())
    }

    /// `source`の内容を、ビューの先頭からコピーする.
    ///
    /// シーケンスが返却済みの場合には何も行わない.
    ///
    /// # Errors
    ///
    /// `source`がビューよりも長い場合には、種類が`ErrorKind::InvalidInput`のエラーが返される.
    pub fn copy_from(&self, source: &[T]) -> Result<()> {
        if self.sequence.is_disposed() {
            return Ok(());
        }
        track_assert!(
            source.len() <= self.len,
            ErrorKind::InvalidInput;
            source.len(),
            self.len
        );
        let start = self.start;
        self.sequence.with_inner_mut(|inner, base| {
            let mut copied = 0;
            inner
                .store
                .for_each_run_mut(base + start, source.len(), |run| {
                    run.clone_from_slice(&source[copied..copied + run.len()]);
                    copied += run.len();
                });
        });
        Ok(())
    }

    /// 内容を`Vec`にコピーして返す.
    ///
    /// シーケンスが返却済みの場合には空の`Vec`が返される.
    pub fn to_vec(&self) -> Vec<T> {
        let (start, len) = (self.start, self.len);
        self.sequence
            .with_inner(|inner, base| {
                let mut values = Vec::with_capacity(len);
                inner
                    .store
                    .for_each_run(base + start, len, |run| values.extend_from_slice(run));
                values
            })
            .unwrap_or_default()
    }
}
impl<'a, T> SequenceView<'a, T>
where
    T: Default + Clone + PartialEq,
{
    /// `value`と等しい要素が含まれているかどうかを判定する.
    ///
    /// シーケンスが返却済みの場合には`false`が返される.
    pub fn contains(&self, value: &T) -> bool {
        let (start, len) = (self.start, self.len);
        self.sequence
            .with_inner(|inner, base| {
                let mut found = false;
                inner.store.for_each_run(base + start, len, |run| {
                    found = found || run.contains(value);
                });
                found
            })
            .unwrap_or(false)
    }
}
impl<'a, T> SequenceView<'a, T>
where
    T: Default + Clone + Ord,
{
    /// 要素を昇順に並び替える.
    ///
    /// シーケンスが返却済みの場合には何も行わない.
    pub fn sort(&self) {
        let (start, len) = (self.start, self.len);
        self.sequence.with_inner_mut(|inner, base| {
            let mut values = Vec::with_capacity(len);
            inner
                .store
                .for_each_run(base + start, len, |run| values.extend_from_slice(run));
            values.sort();

            let mut values = values.into_iter();
            inner.store.for_each_run_mut(base + start, len, |run| {
                for (x, v) in run.iter_mut().zip(values.by_ref()) {
                    *x = v;
                }
            });
        });
    }
}
impl<'a, T> Clone for SequenceView<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'a, T> Copy for SequenceView<'a, T> {}
impl<'a, T> fmt::Debug for SequenceView<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SequenceView")
            .field("sequence", self.sequence)
            .field("start", &self.start)
            .field("len", &self.len)
            .finish()
    }
}
