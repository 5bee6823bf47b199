use prometrics::metrics::MetricBuilder;
use slog::{Discard, Logger};
use uuid::Uuid;

use crate::metrics::PoolMetrics;
use crate::pool::allocator::NodeRegistry;
use crate::pool::{PoolInner, SequencePool};
use crate::segment::{SegmentLength, SegmentStore};
use crate::Result;

/// `SequencePool`のビルダ.
#[derive(Debug, Clone)]
pub struct SequencePoolBuilder {
    min_segment_length: usize,
    clear_returned_sequences: bool,
    instance_uuid: Option<Uuid>,
    metrics: MetricBuilder,
    logger: Logger,
}
impl SequencePoolBuilder {
    /// デフォルトのセグメント長.
    pub const DEFAULT_SEGMENT_LENGTH: usize = 1024;

    /// 新しい`SequencePoolBuilder`インスタンスを生成する.
    pub fn new() -> Self {
        SequencePoolBuilder {
            min_segment_length: Self::DEFAULT_SEGMENT_LENGTH,
            clear_returned_sequences: true,
            instance_uuid: None,
            metrics: MetricBuilder::new(),
            logger: Logger::root(Discard, o!()),
        }
    }

    /// セグメント長の下限を設定する.
    ///
    /// 実際のセグメント長は、この値以上で最小の二の冪となる.
    /// 取り得る値は`1`から`2^30`までで、範囲外の値が指定された場合には`finish()`呼び出し時にエラーが返される.
    ///
    /// デフォルト値は`1024`.
    pub fn min_segment_length(&mut self, len: usize) -> &mut Self {
        self.min_segment_length = len;
        self
    }

    /// 返却されたシーケンスの領域を、再利用前にゼロクリア(`T::default()`で上書き)するかどうかを設定する.
    ///
    /// デフォルト値は`true`.
    pub fn clear_returned_sequences(&mut self, clear: bool) -> &mut Self {
        self.clear_returned_sequences = clear;
        self
    }

    /// プールインスタンスを識別するためのUUIDを設定する.
    ///
    /// この値はメトリクスの`instance`ラベルとして使用される.
    /// 本メソッドが呼ばれていない場合は、ランダムなUUIDが割り当てられる.
    pub fn instance_uuid(&mut self, uuid: Uuid) -> &mut Self {
        self.instance_uuid = Some(uuid);
        self
    }

    /// メトリクス用の共通設定を登録する.
    ///
    /// デフォルト値は`MetricBuilder::new()`.
    pub fn metrics(&mut self, metrics: MetricBuilder) -> &mut Self {
        self.metrics = metrics;
        self
    }

    /// ロガーを登録する.
    ///
    /// デフォルトでは、ログは全て破棄される.
    pub fn logger(&mut self, logger: Logger) -> &mut Self {
        self.logger = logger;
        self
    }

    /// 新しいプールを生成する.
    ///
    /// # Errors
    ///
    /// セグメント長の下限が`[1, 2^30]`の範囲外の場合には、
    /// 種類が`ErrorKind::InvalidInput`のエラーが返される.
    pub fn finish<T>(&self) -> Result<SequencePool<T>>
    where
        T: Default + Clone,
    {
        let segment_length = track!(SegmentLength::new(self.min_segment_length))?;
        let instance_uuid = self.instance_uuid.unwrap_or_else(Uuid::new_v4);
        let metrics = PoolMetrics::new(&self.metrics, &instance_uuid, segment_length);
        let logger = self.logger.new(o!(
            "instance" => instance_uuid.to_string(),
            "segment_length" => segment_length.as_usize()
        ));
        debug!(logger, "Pool created");

        let inner = PoolInner {
            store: SegmentStore::new(segment_length),
            registry: NodeRegistry::new(segment_length, metrics.clone()),
            clear_returned_sequences: self.clear_returned_sequences,
            instance_uuid,
            metrics,
            logger,
        };
        Ok(SequencePool::from_inner(inner))
    }
}
impl Default for SequencePoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
