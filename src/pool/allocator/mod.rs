//! プールのアドレス空間用のアロケータ.
//!
//! アロケータは、確保済みセグメント群を連結した(仮想的な)連続領域を受け取り、
//! 個々のシーケンスに対して、その中から必要なサイズの部分領域(ノード)を割り当てる責務を負っている.
//!
//! アロケータが担当するのは、領域の計算処理のみで、実際のデータの読み書き等を、この中で行うことは無い.
pub use self::node::NodeState;

pub(crate) use self::node::NodeId;
pub(crate) use self::node_registry::NodeRegistry;

mod node;
mod node_registry;
