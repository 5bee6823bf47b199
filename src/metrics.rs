//! [Prometheus][prometheus]用のメトリクス.
//!
//! [prometheus]: https://prometheus.io/
use prometrics::metrics::{Counter, Gauge, MetricBuilder};
use uuid::Uuid;

use crate::segment::SegmentLength;

/// [`SequencePool`]のメトリクス.
///
/// [`SequencePool`]: ../struct.SequencePool.html
///
/// # Prometheus
///
/// `Methods`節に記載の無いメトリクスのみを掲載:
///
/// ```prometheus
/// segpool_pool_segment_length { instance="<UUID>" } <GAUGE>
/// ```
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub(crate) rented_sequences: Counter,
    pub(crate) disposed_sequences: Counter,
    pub(crate) rented_elements: Counter,
    pub(crate) released_elements: Counter,
    pub(crate) allocated_segments: Counter,
    pub(crate) released_segments: Counter,
    pub(crate) inserted_nodes: Counter,
    pub(crate) removed_nodes: Counter,
    pub(crate) first_fit_hits: Counter,
    pub(crate) first_fit_misses: Counter,
    pub(crate) in_place_growths: Counter,
    pub(crate) migrations: Counter,
    pub(crate) segment_length: Gauge,
}
impl PoolMetrics {
    /// 貸し出されたシーケンスの数.
    ///
    /// 長さ`0`の`rent`は領域を確保しないので含まれない.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// segpool_pool_rented_sequences_total <COUNTER>
    /// ```
    pub fn rented_sequences(&self) -> u64 {
        self.rented_sequences.value() as u64
    }

    /// 返却されたシーケンスの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// segpool_pool_disposed_sequences_total <COUNTER>
    /// ```
    pub fn disposed_sequences(&self) -> u64 {
        self.disposed_sequences.value() as u64
    }

    /// 現在貸し出し中のシーケンスの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// segpool_pool_rented_sequences_total - segpool_pool_disposed_sequences_total
    /// ```
    pub fn active_sequences(&self) -> u64 {
        // NOTE: 以下の順番で値を取得しないとアンダーフローする可能性がある
        let dec = self.disposed_sequences();
        let inc = self.rented_sequences();
        inc - dec
    }

    /// シーケンス用に割り当てた要素数の合計.
    ///
    /// `push`/`expand`による伸長分も含む.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// segpool_pool_rented_elements_total <COUNTER>
    /// ```
    pub fn rented_elements(&self) -> u64 {
        self.rented_elements.value() as u64
    }

    /// 返却された要素数の合計.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// segpool_pool_released_elements_total <COUNTER>
    /// ```
    pub fn released_elements(&self) -> u64 {
        self.released_elements.value() as u64
    }

    /// 確保された物理セグメントの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// segpool_pool_allocated_segments_total <COUNTER>
    /// ```
    pub fn allocated_segments(&self) -> u64 {
        self.allocated_segments.value() as u64
    }

    /// `trim_excess`によって解放された物理セグメントの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// segpool_pool_released_segments_total <COUNTER>
    /// ```
    pub fn released_segments(&self) -> u64 {
        self.released_segments.value() as u64
    }

    /// 現在保持している物理セグメントの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// segpool_pool_allocated_segments_total - segpool_pool_released_segments_total
    /// ```
    pub fn segments(&self) -> u64 {
        // NOTE: 以下の順番で値を取得しないとアンダーフローする可能性がある
        let dec = self.released_segments();
        let inc = self.allocated_segments();
        inc - dec
    }

    /// 現在のノード数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// segpool_pool_inserted_nodes_total - segpool_pool_removed_nodes_total
    /// ```
    pub fn nodes(&self) -> u64 {
        // NOTE: 以下の順番で値を取得しないとアンダーフローする可能性がある
        let dec = self.removed_nodes.value() as u64;
        let inc = self.inserted_nodes.value() as u64;
        inc - dec
    }

    /// 既存の空き領域から割当が行えた回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// segpool_pool_first_fit_total { result="hit" } <COUNTER>
    /// ```
    pub fn first_fit_hits(&self) -> u64 {
        self.first_fit_hits.value() as u64
    }

    /// 十分な空き領域が無く、新規セグメントの確保が必要になった回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// segpool_pool_first_fit_total { result="miss" } <COUNTER>
    /// ```
    pub fn first_fit_misses(&self) -> u64 {
        self.first_fit_misses.value() as u64
    }

    /// データの移動を伴わずに伸長が行えた回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// segpool_pool_growths_total { kind="in_place" } <COUNTER>
    /// ```
    pub fn in_place_growths(&self) -> u64 {
        self.in_place_growths.value() as u64
    }

    /// 伸長のためにシーケンスの再配置が行われた回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// segpool_pool_growths_total { kind="migration" } <COUNTER>
    /// ```
    pub fn migrations(&self) -> u64 {
        self.migrations.value() as u64
    }

    /// プールのセグメント長.
    pub fn segment_length(&self) -> usize {
        self.segment_length.value() as usize
    }

    pub(crate) fn new(
        builder: &MetricBuilder,
        instance_uuid: &Uuid,
        segment_length: SegmentLength,
    ) -> Self {
        let mut builder = builder.clone();
        builder.namespace("segpool").subsystem("pool");
        let instance = instance_uuid.to_string();
        let counter = |name: &str, help: &str| {
            builder
                .counter(name)
                .help(help)
                .label("instance", &instance)
                .finish()
                .expect("Never fails")
        };
        let labeled_counter = |name: &str, help: &str, key: &str, value: &str| {
            builder
                .counter(name)
                .help(help)
                .label("instance", &instance)
                .label(key, value)
                .finish()
                .expect("Never fails")
        };
        let segment_length_gauge = builder
            .gauge("segment_length")
            .help("Number of elements held by a segment")
            .label("instance", &instance)
            .finish()
            .expect("Never fails");
        segment_length_gauge.set(segment_length.as_usize() as f64);
        PoolMetrics {
            rented_sequences: counter(
                "rented_sequences_total",
                "Number of sequences rented from the pool",
            ),
            disposed_sequences: counter(
                "disposed_sequences_total",
                "Number of sequences returned to the pool",
            ),
            rented_elements: counter(
                "rented_elements_total",
                "Number of elements handed out to sequences",
            ),
            released_elements: counter(
                "released_elements_total",
                "Number of elements returned to the pool",
            ),
            allocated_segments: counter(
                "allocated_segments_total",
                "Number of physical segments allocated by the pool",
            ),
            released_segments: counter(
                "released_segments_total",
                "Number of physical segments released by trimming",
            ),
            inserted_nodes: counter(
                "inserted_nodes_total",
                "Number of nodes inserted to the node registry",
            ),
            removed_nodes: counter(
                "removed_nodes_total",
                "Number of nodes removed from the node registry",
            ),
            first_fit_hits: labeled_counter(
                "first_fit_total",
                "Number of first-fit searches",
                "result",
                "hit",
            ),
            first_fit_misses: labeled_counter(
                "first_fit_total",
                "Number of first-fit searches",
                "result",
                "miss",
            ),
            in_place_growths: labeled_counter(
                "growths_total",
                "Number of sequence growths",
                "kind",
                "in_place",
            ),
            migrations: labeled_counter(
                "growths_total",
                "Number of sequence growths",
                "kind",
                "migration",
            ),
            segment_length: segment_length_gauge,
        }
    }
}
