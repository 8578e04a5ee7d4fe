// ==========================================
// 商品目录同步 - 商品存储适配器 Trait
// ==========================================
// 职责: 定义扁平商品记录的数据访问接口（不包含业务逻辑）
// 红线: 存储适配器不含层级规则，层级仅由 parent_id 表达
// ==========================================

use crate::domain::ProductRecord;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

/// 批量写入的冲突键
pub const CONFLICT_KEY_ID: &str = "id";
pub const CONFLICT_KEY_SKU: &str = "sku";

// ==========================================
// ProductStore Trait
// ==========================================
// 用途: 商品持久化存储（由宿主应用提供）
// 实现者: SqliteProductStore, InMemoryProductStore
// 说明: 每个调用独立成败，调用方不假设对存储的独占访问
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// 读取全部扁平记录（按写入顺序）
    async fn fetch_all(&self) -> RepositoryResult<Vec<ProductRecord>>;

    /// 插入单条记录
    ///
    /// # 返回
    /// - Ok(ProductRecord): 已持久化的记录（id 由存储分配或沿用）
    async fn insert(&self, record: ProductRecord) -> RepositoryResult<ProductRecord>;

    /// 按 id 更新单条记录
    ///
    /// # 返回
    /// - Ok(ProductRecord): 更新后的记录
    /// - Err(NotFound): id 不存在
    async fn update(&self, id: &str, record: ProductRecord) -> RepositoryResult<ProductRecord>;

    /// 按 id 删除单条记录
    ///
    /// # 返回
    /// - Ok(true): 已删除
    /// - Ok(false): 记录不存在
    async fn delete_by_id(&self, id: &str) -> RepositoryResult<bool>;

    /// 批量写入（按冲突键 upsert，单次调用为一个数据块）
    ///
    /// # 参数
    /// - records: 扁平记录（父记录先于子记录）
    /// - conflict_key: 冲突键（"id" 或 "sku"）
    ///
    /// # 返回
    /// - Ok(true): 数据块全部写入
    async fn bulk_upsert(
        &self,
        records: Vec<ProductRecord>,
        conflict_key: &str,
    ) -> RepositoryResult<bool>;

    /// 查询直接子记录（默认基于 fetch_all 过滤）
    async fn fetch_children(&self, parent_id: &str) -> RepositoryResult<Vec<ProductRecord>> {
        Ok(self
            .fetch_all()
            .await?
            .into_iter()
            .filter(|r| r.parent_id.as_deref() == Some(parent_id))
            .collect())
    }
}
