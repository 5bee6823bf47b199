//! セグメント(物理的な記憶領域の単位)関連の構成要素.
use crate::{ErrorKind, Result};

pub(crate) use self::store::SegmentStore;

mod store;

/// [`SequencePool`]が使用するセグメントの長さ(要素数)を表現するための構造体.
///
/// "セグメント"は、プールが確保する固定長の物理領域であり、
/// 個々のシーケンスは一つ以上のセグメントの部分領域を論理的に連結したものとして表現される.
///
/// セグメント長は常に二の冪となるので、
/// アドレスからセグメント番号およびセグメント内オフセットへの変換はビット演算で行える.
///
/// [`SequencePool`]: ../struct.SequencePool.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentLength(u32);
impl SegmentLength {
    /// 許容されるセグメント長の最小値.
    pub const MIN: usize = 1;

    /// 許容されるセグメント長の最大値 (`2^30`).
    pub const MAX: usize = 1 << 30;

    /// `min_len`以上で最小の二の冪をセグメント長とする`SegmentLength`インスタンスを生成する.
    ///
    /// # Errors
    ///
    /// `min_len`が`[SegmentLength::MIN, SegmentLength::MAX]`の範囲外の場合には、
    /// 種類が`ErrorKind::InvalidInput`のエラーが返される.
    ///
    /// # Examples
    ///
    /// ```
    /// use segpool::ErrorKind;
    /// use segpool::SegmentLength;
    ///
    /// assert_eq!(SegmentLength::new(1).ok().map(|s| s.as_usize()), Some(1));
    /// assert_eq!(SegmentLength::new(3).ok().map(|s| s.as_usize()), Some(4));
    /// assert_eq!(SegmentLength::new(513).ok().map(|s| s.as_usize()), Some(1024));
    ///
    /// assert_eq!(SegmentLength::new(0).err().map(|e| *e.kind()), Some(ErrorKind::InvalidInput));
    /// ```
    #[allow(clippy::new_ret_no_self)]
    pub fn new(min_len: usize) -> Result<Self> {
        track_assert!(min_len >= Self::MIN, ErrorKind::InvalidInput; min_len);
        track_assert!(min_len <= Self::MAX, ErrorKind::InvalidInput; min_len);
        Ok(SegmentLength(min_len.next_power_of_two() as u32))
    }

    /// セグメント長を`usize`に変換して返す.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// 指定位置より後方の最初のセグメント境界を返す.
    ///
    /// # Examples
    ///
    /// ```
    /// use segpool::SegmentLength;
    ///
    /// let segment_length = SegmentLength::new(16).unwrap();
    /// assert_eq!(segment_length.ceil_align(0), 0);
    /// assert_eq!(segment_length.ceil_align(1), 16);
    /// assert_eq!(segment_length.ceil_align(16), 16);
    /// ```
    pub fn ceil_align(self, position: usize) -> usize {
        (position + self.mask()) & !self.mask()
    }

    /// 指定位置より前方の最初のセグメント境界を返す.
    ///
    /// # Examples
    ///
    /// ```
    /// use segpool::SegmentLength;
    ///
    /// let segment_length = SegmentLength::new(16).unwrap();
    /// assert_eq!(segment_length.floor_align(0), 0);
    /// assert_eq!(segment_length.floor_align(15), 0);
    /// assert_eq!(segment_length.floor_align(17), 16);
    /// ```
    pub fn floor_align(self, position: usize) -> usize {
        position & !self.mask()
    }

    /// 指定位置がセグメント境界に沿っているかどうかを判定する.
    ///
    /// # Examples
    ///
    /// ```
    /// use segpool::SegmentLength;
    ///
    /// let segment_length = SegmentLength::new(16).unwrap();
    /// assert!(segment_length.is_aligned(0));
    /// assert!(segment_length.is_aligned(32));
    ///
    /// assert!(!segment_length.is_aligned(15));
    /// assert!(!segment_length.is_aligned(17));
    /// ```
    pub fn is_aligned(self, position: usize) -> bool {
        position & self.mask() == 0
    }

    /// `len`個の要素を格納するのに必要なセグメント数を返す.
    pub fn segments_for(self, len: usize) -> usize {
        self.ceil_align(len) >> self.shift()
    }

    /// 指定位置を含むセグメントの番号を返す.
    pub fn segment_index(self, position: usize) -> usize {
        position >> self.shift()
    }

    /// 指定位置のセグメント内でのオフセットを返す.
    pub fn segment_offset(self, position: usize) -> usize {
        position & self.mask()
    }

    /// `[start, start + len)`の範囲を、セグメント境界で区切った部分範囲群に分解する.
    pub(crate) fn runs(self, start: usize, len: usize) -> Runs {
        Runs {
            segment_length: self,
            position: start,
            end: start + len,
        }
    }

    fn mask(self) -> usize {
        self.as_usize() - 1
    }

    fn shift(self) -> u32 {
        self.0.trailing_zeros()
    }
}

/// 一つのセグメントに収まる連続した部分範囲.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Run {
    pub segment: usize,
    pub offset: usize,
    pub len: usize,
}

/// `SegmentLength::runs`が返すイテレータ.
#[derive(Debug, Clone)]
pub(crate) struct Runs {
    segment_length: SegmentLength,
    position: usize,
    end: usize,
}
impl Iterator for Runs {
    type Item = Run;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.end {
            return None;
        }
        let offset = self.segment_length.segment_offset(self.position);
        let len = std::cmp::min(
            self.segment_length.as_usize() - offset,
            self.end - self.position,
        );
        let run = Run {
            segment: self.segment_length.segment_index(self.position),
            offset,
            len,
        };
        self.position += len;
        Some(run)
    }
}
