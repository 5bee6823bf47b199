//! Segmented Sequence Pool.
//!
//! `segpool`は、可変長のシーケンス(要素列)を、固定長のセグメント群の上に詰め込んで貸し出すためのメモリプール.
//!
//! # 特徴
//!
//! - プールは二の冪長のセグメントを必要に応じて末尾に追加し、それらを連結した一つのアドレス空間を管理する
//! - シーケンスは一つ以上のセグメントにまたがって配置され、その物理的な配置を[segments]で直接参照できる
//! - 割当はアドレスの昇順の"FirstFit"で行われ、返却された領域は隣接する空き領域と併合される
//! - 末尾の空き領域は`trim_excess`を呼び出すことでセグメント単位で解放できる
//! - シーケンスのハンドルは軽量で、複製しても内容はコピーされない
//!   - 返却や移動が行われた後の古いハンドルに対する操作は、単に無視される
//! - プールはシングルスレッドでの利用を前提としている(`Send`ではない)
//!
//! # モジュールの依存関係
//!
//! ```text
//! sequence => pool => segment
//!                  => metrics
//! ```
//!
//! - [pool]モジュール:
//!   - 主に[SequencePool]構造体と、その内部で使用されるノード管理(割当器)を提供
//! - [sequence]モジュール:
//!   - 主に[Sequence]構造体と、その部分範囲を表す[SequenceView]を提供
//!   - `segpool`の利用者が直接触るのはこの構造体
//! - [report]モジュール:
//!   - プールの使用状況のスナップショットを提供
//! - [metrics]モジュール:
//!   - [Prometheus]用のメトリクスを提供
//!
//! # Examples
//!
//! ```
//! use segpool::SequencePoolBuilder;
//!
//! let pool = SequencePoolBuilder::new()
//!     .min_segment_length(30)
//!     .finish::<u32>()
//!     .unwrap();
//! assert_eq!(pool.segment_length(), 32);
//!
//! let mut seq = pool.rent(97);
//! assert_eq!(seq.segments().map(|s| s.len()).collect::<Vec<_>>(), vec![32, 32, 32, 1]);
//!
//! seq.set(96, 10).unwrap();
//! seq.push(20);
//! assert_eq!(seq.len(), 98);
//! assert_eq!(seq.slice_from(96).unwrap().to_vec(), vec![10, 20]);
//!
//! let report = pool.report();
//! assert_eq!(report.allocated_segments(), 4);
//! assert_eq!(report.active_elements(), 98);
//! ```
//!
//! [segments]: ./sequence/struct.Sequence.html#method.segments
//! [pool]: ./pool/index.html
//! [SequencePool]: ./pool/struct.SequencePool.html
//! [sequence]: ./sequence/index.html
//! [Sequence]: ./sequence/struct.Sequence.html
//! [SequenceView]: ./sequence/struct.SequenceView.html
//! [report]: ./report/index.html
//! [metrics]: ./metrics/index.html
//! [Prometheus]: https://prometheus.io/
#![warn(missing_docs)]
extern crate prometrics;
#[macro_use]
extern crate trackable;
extern crate uuid;
#[macro_use]
extern crate slog;

pub use crate::error::{Error, ErrorKind};
pub use crate::pool::{Address, NodeState, SequencePool, SequencePoolBuilder};
pub use crate::report::PoolReport;
pub use crate::segment::SegmentLength;
pub use crate::sequence::{Iter, Segments, Sequence, SequenceView};

pub mod metrics;
pub mod pool;
pub mod report;
pub mod sequence;

mod error;
mod segment;

/// crate固有の`Result`型.
pub type Result<T> = std::result::Result<T, Error>;
