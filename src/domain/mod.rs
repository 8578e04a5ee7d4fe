// ==========================================
// 商品目录同步 - 领域层
// ==========================================
// 职责: 商品节点、扁平记录、导入报告等领域类型
// ==========================================

pub mod product;
pub mod types;

pub use product::{
    forest_len, generate_id, Attributes, DecodedRow, ImportIssue, ImportOutcome, ImportReport,
    ParsedVariation, ProductNode, ProductRecord, SyncBatch,
};
pub use types::{IssueKind, IssueLevel, ProductKind, ProductStatus};
