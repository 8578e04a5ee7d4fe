// ==========================================
// 商品目录同步 - 同步层
// ==========================================
// 职责: 商品森林与持久化存储之间的双向同步
// 流程: 加载（扁平 → 树）/ 写入（树 → 扁平操作）
// 红线: 写入序列期间由变更守卫屏蔽自身引起的行变更通知
// ==========================================

pub mod change_guard;
pub mod error;
pub mod events;
pub mod flatten;
pub mod reconciler;

pub use change_guard::{ChangeGuard, GuardToken};
pub use error::{SyncError, SyncResult};
pub use events::{NoOpRowSink, RecordingRowSink, RowChangeEvent, RowReplaceSink};
pub use flatten::{
    adopt_stored_ids, build_forest, flatten_forest, into_batches, LoadedForest, OrphanReason,
    OrphanRecord,
};
pub use reconciler::{
    BulkReport, CreateOutcome, EventOutcome, LoadOptions, SyncReconciler, WriteFailure, WriteReport,
};
