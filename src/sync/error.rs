// ==========================================
// 商品目录同步 - 同步层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 错误携带操作上下文（操作 / id / sku / 已提交数量）
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("加载失败: {source}")]
    LoadFailed {
        #[source]
        source: RepositoryError,
    },

    #[error("创建失败 (sku={sku}): {source}")]
    CreateFailed {
        sku: String,
        #[source]
        source: RepositoryError,
    },

    #[error("更新失败 (id={id}, sku={sku}): {source}")]
    UpdateFailed {
        id: String,
        sku: String,
        #[source]
        source: RepositoryError,
    },

    #[error("删除失败 (id={id}): {source}")]
    DeleteFailed {
        id: String,
        #[source]
        source: RepositoryError,
    },

    #[error("子记录删除失败，父记录 {parent_id} 未删除: {failed_children:?}")]
    ChildDeleteFailed {
        parent_id: String,
        failed_children: Vec<String>,
    },

    #[error("批量写入前读取已存储记录失败，未提交任何记录（共 {total} 条）: {source}")]
    IdAlignmentFailed {
        total: usize,
        #[source]
        source: RepositoryError,
    },

    #[error("批量写入在第 {chunk_index} 块失败，已提交 {committed}/{total} 条: {source}")]
    BulkChunkFailed {
        chunk_index: usize,
        committed: usize,
        total: usize,
        #[source]
        source: RepositoryError,
    },

    #[error("批量写入在第 {chunk_index} 块被存储拒绝，已提交 {committed}/{total} 条")]
    BulkChunkRejected {
        chunk_index: usize,
        committed: usize,
        total: usize,
    },

    #[error("节点缺少 id，无法更新: sku={0}")]
    MissingId(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SyncError {
    /// 批量写入失败时已提交的记录数
    pub fn committed(&self) -> Option<usize> {
        match self {
            SyncError::BulkChunkFailed { committed, .. }
            | SyncError::BulkChunkRejected { committed, .. } => Some(*committed),
            SyncError::IdAlignmentFailed { .. } => Some(0),
            _ => None,
        }
    }
}

/// Result 类型别名
pub type SyncResult<T> = Result<T, SyncError>;
