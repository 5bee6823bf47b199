use crate::segment::{Run, SegmentLength};

/// プールが確保した物理セグメント群を保持する構造体.
///
/// セグメントは常に末尾に追加され、明示的なトリム(`truncate`)以外で解放されることはない.
/// そのため、セグメント`i`はアドレス範囲`[i * segment_length, (i + 1) * segment_length)`に常に対応する.
#[derive(Debug)]
pub(crate) struct SegmentStore<T> {
    segments: Vec<Box<[T]>>,
    segment_length: SegmentLength,
}
impl<T> SegmentStore<T>
where
    T: Default + Clone,
{
    pub fn new(segment_length: SegmentLength) -> Self {
        SegmentStore {
            segments: Vec::new(),
            segment_length,
        }
    }

    pub fn segment_length(&self) -> SegmentLength {
        self.segment_length
    }

    /// 確保済みのセグメント数を返す.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// 確保済みの全セグメントの合計要素数を返す.
    pub fn capacity(&self) -> usize {
        self.segments.len() * self.segment_length.as_usize()
    }

    /// 末尾に`count`個のセグメントを追加する.
    ///
    /// 新しいセグメントの要素は全て`T::default()`で初期化されている.
    pub fn grow(&mut self, count: usize) {
        let len = self.segment_length.as_usize();
        self.segments.reserve(count);
        for _ in 0..count {
            let segment = (0..len).map(|_| T::default()).collect::<Vec<_>>();
            self.segments.push(segment.into_boxed_slice());
        }
    }

    /// セグメント数が`count`になるまで、末尾のセグメントを解放する.
    ///
    /// 解放されたセグメントの数を返す.
    pub fn truncate(&mut self, count: usize) -> usize {
        let released = self.segments.len().saturating_sub(count);
        self.segments.truncate(count);
        self.segments.shrink_to_fit();
        released
    }

    pub fn get(&self, position: usize) -> &T {
        let s = self.segment_length;
        &self.segments[s.segment_index(position)][s.segment_offset(position)]
    }

    pub fn get_mut(&mut self, position: usize) -> &mut T {
        let s = self.segment_length;
        &mut self.segments[s.segment_index(position)][s.segment_offset(position)]
    }

    /// 一つのセグメントに収まる部分範囲を参照する.
    pub fn run(&self, run: Run) -> &[T] {
        &self.segments[run.segment][run.offset..run.offset + run.len]
    }

    /// `[start, start + len)`の範囲を、セグメント毎のスライスとして順に`f`に渡す.
    pub fn for_each_run<F>(&self, start: usize, len: usize, mut f: F)
    where
        F: FnMut(&[T]),
    {
        for run in self.segment_length.runs(start, len) {
            f(&self.segments[run.segment][run.offset..run.offset + run.len]);
        }
    }

    /// `for_each_run`の可変版.
    pub fn for_each_run_mut<F>(&mut self, start: usize, len: usize, mut f: F)
    where
        F: FnMut(&mut [T]),
    {
        for run in self.segment_length.runs(start, len) {
            f(&mut self.segments[run.segment][run.offset..run.offset + run.len]);
        }
    }

    /// 範囲内の要素を全て`T::default()`に戻す.
    pub fn reset(&mut self, start: usize, len: usize) {
        self.for_each_run_mut(start, len, |run| {
            for x in run {
                *x = T::default();
            }
        });
    }

    /// `[src, src + len)`の内容を`[dst, dst + len)`に複製する.
    ///
    /// 二つの範囲は重なっていてはいけない.
    pub fn copy_nonoverlapping(&mut self, src: usize, dst: usize, len: usize) {
        debug_assert!(src + len <= dst || dst + len <= src);
        let mut copied = 0;
        for run in self.segment_length.runs(src, len) {
            let values = self.segments[run.segment][run.offset..run.offset + run.len].to_vec();
            let mut values = values.into_iter();
            self.for_each_run_mut(dst + copied, run.len, |target| {
                for (x, v) in target.iter_mut().zip(values.by_ref()) {
                    *x = v;
                }
            });
            copied += run.len;
        }
    }
}
