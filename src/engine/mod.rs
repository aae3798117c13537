// ==========================================
// 仓储拣选编排系统 - 引擎层
// ==========================================
// 纯算法引擎 (签名/分类/切分) + 事务引擎 (领取/格位/生命周期)
// ==========================================

pub mod allocator;
pub mod bin_assigner;
pub mod bulk_splitter;
pub mod classifier;
pub mod events;
pub mod lifecycle;
pub mod signature;

pub use allocator::{ChunkAllocator, ClaimLimits, ClaimTarget};
pub use bin_assigner::{BinAssigner, BinLocationResolver, SkuGroup, UNRESOLVED_LOCATION_SORT_KEY};
pub use bulk_splitter::BulkSplitter;
pub use classifier::{ClassifiedOrder, OrderClassifier};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, PickingEvent, PickingEventPublisher,
    PickingEventType,
};
pub use lifecycle::LifecycleManager;
pub use signature::{compute_signature, OrderSignature};
