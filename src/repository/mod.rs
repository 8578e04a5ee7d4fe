// ==========================================
// 商品目录同步 - 存储层
// ==========================================
// 红线: 存储不含业务逻辑
// 职责: 提供扁平商品记录的访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod memory_store;
pub mod product_store;
pub mod product_store_impl;

pub use error::{RepositoryError, RepositoryResult};
pub use memory_store::{InMemoryProductStore, StoreCall};
pub use product_store::{ProductStore, CONFLICT_KEY_ID, CONFLICT_KEY_SKU};
pub use product_store_impl::SqliteProductStore;
