// ==========================================
// 商品目录同步 - API 层
// ==========================================
// 职责: 展示层调用入口，错误转换为用户可读信息
// ==========================================

pub mod catalog_api;
pub mod error;
pub mod validator;

pub use catalog_api::{CatalogApi, MassActionReport, RowActionFailure, SelectedRow};
pub use error::{ApiError, ApiResult};
pub use validator::{validate_field_edit, FieldEdit};
