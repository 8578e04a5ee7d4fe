// ==========================================
// 商品目录同步 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换下层错误为用户友好的错误消息
// ==========================================

use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use crate::sync::SyncError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入与业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("字段校验失败 (field={field}): {reason}")]
    FieldValidationError { field: String, reason: String },

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入与同步错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("同步失败: {0}")]
    SyncError(String),

    /// 批量写入中止（携带已提交数量）
    #[error("批量同步中止: 已提交 {committed}/{total} 条, 原因: {reason}")]
    BulkSyncAborted {
        committed: usize,
        total: usize,
        reason: String,
    },

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Other(e) => ApiError::Other(e),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

// ==========================================
// 从 SyncError 转换
// ==========================================
impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::BulkChunkFailed {
                committed, total, ..
            }
            | SyncError::BulkChunkRejected { committed, total, .. } => ApiError::BulkSyncAborted {
                committed,
                total,
                reason: err.to_string(),
            },
            SyncError::IdAlignmentFailed { total, .. } => ApiError::BulkSyncAborted {
                committed: 0,
                total,
                reason: err.to_string(),
            },
            SyncError::MissingId(sku) => {
                ApiError::InvalidInput(format!("商品 {} 尚未持久化，无法更新", sku))
            }
            SyncError::Other(e) => ApiError::Other(e),
            other => ApiError::SyncError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let err: ApiError = RepositoryError::NotFound {
            entity: "Product".to_string(),
            id: "p-1".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(ref msg) if msg.contains("p-1")));
    }

    #[test]
    fn test_bulk_sync_error_keeps_progress() {
        let err: ApiError = SyncError::BulkChunkRejected {
            chunk_index: 2,
            committed: 1000,
            total: 1300,
        }
        .into();
        match err {
            ApiError::BulkSyncAborted { committed, total, .. } => {
                assert_eq!(committed, 1000);
                assert_eq!(total, 1300);
            }
            other => panic!("unexpected: {other}"),
        }
    }
}
