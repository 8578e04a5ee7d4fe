// ==========================================
// 商品目录同步 - 内存商品存储
// ==========================================
// 职责: 无数据库场景下的 ProductStore 实现
// 用途: 单元测试 / 集成测试 / 预览导入结果
// 支持: 调用日志、按 SKU / id / 块序号注入失败
// ==========================================

use crate::domain::{generate_id, ProductRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::product_store::{ProductStore, CONFLICT_KEY_ID, CONFLICT_KEY_SKU};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// 存储调用记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    FetchAll,
    Insert { sku: String },
    Update { id: String },
    DeleteById { id: String },
    BulkUpsert { size: usize },
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<ProductRecord>,
    calls: Vec<StoreCall>,
    fail_fetch: bool,
    fail_skus: HashSet<String>,
    fail_delete_ids: HashSet<String>,
    fail_bulk_call: Option<usize>,
    bulk_calls: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    state: Mutex<MemoryState>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以既有记录初始化（按给定顺序）
    pub fn with_records(records: Vec<ProductRecord>) -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.lock() {
            state.records = records;
        }
        store
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// fetch_all 返回错误
    pub fn fail_fetch(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_fetch = true;
        }
    }

    /// 指定 SKU 的 insert / update 返回错误
    pub fn fail_on_sku(&self, sku: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_skus.insert(sku.to_string());
        }
    }

    /// 指定 id 的 delete_by_id 返回错误
    pub fn fail_on_delete(&self, id: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_delete_ids.insert(id.to_string());
        }
    }

    /// 第 n 次 bulk_upsert 调用（从 0 开始）返回错误
    pub fn fail_bulk_call(&self, call_index: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_bulk_call = Some(call_index);
        }
    }

    /// 调用日志快照
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    /// 记录快照
    pub fn records(&self) -> Vec<ProductRecord> {
        self.state
            .lock()
            .map(|state| state.records.clone())
            .unwrap_or_default()
    }

    fn injected_failure(operation: &str, key: &str) -> RepositoryError {
        RepositoryError::InternalError(format!("{} 失败（注入）: {}", operation, key))
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn fetch_all(&self) -> RepositoryResult<Vec<ProductRecord>> {
        let mut state = self.lock()?;
        state.calls.push(StoreCall::FetchAll);
        if state.fail_fetch {
            return Err(Self::injected_failure("fetch_all", "*"));
        }
        Ok(state.records.clone())
    }

    async fn insert(&self, mut record: ProductRecord) -> RepositoryResult<ProductRecord> {
        let mut state = self.lock()?;
        state.calls.push(StoreCall::Insert {
            sku: record.sku.clone(),
        });
        if state.fail_skus.contains(&record.sku) {
            return Err(Self::injected_failure("insert", &record.sku));
        }
        if state.records.iter().any(|r| r.sku == record.sku) {
            return Err(RepositoryError::UniqueConstraintViolation(format!(
                "products.sku: {}",
                record.sku
            )));
        }

        if record.id.is_empty() {
            record.id = generate_id();
        }
        state.records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, mut record: ProductRecord) -> RepositoryResult<ProductRecord> {
        let mut state = self.lock()?;
        state.calls.push(StoreCall::Update { id: id.to_string() });
        if state.fail_skus.contains(&record.sku) {
            return Err(Self::injected_failure("update", &record.sku));
        }

        record.id = id.to_string();
        match state.records.iter_mut().find(|r| r.id == id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(record)
            }
            None => Err(RepositoryError::NotFound {
                entity: "Product".to_string(),
                id: id.to_string(),
            }),
        }
    }

    async fn delete_by_id(&self, id: &str) -> RepositoryResult<bool> {
        let mut state = self.lock()?;
        state.calls.push(StoreCall::DeleteById { id: id.to_string() });
        if state.fail_delete_ids.contains(id) {
            return Err(Self::injected_failure("delete_by_id", id));
        }

        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        Ok(state.records.len() < before)
    }

    async fn bulk_upsert(
        &self,
        records: Vec<ProductRecord>,
        conflict_key: &str,
    ) -> RepositoryResult<bool> {
        let mut state = self.lock()?;
        state.calls.push(StoreCall::BulkUpsert {
            size: records.len(),
        });
        let call_index = state.bulk_calls;
        state.bulk_calls += 1;
        if state.fail_bulk_call == Some(call_index) {
            return Err(Self::injected_failure("bulk_upsert", &call_index.to_string()));
        }
        if conflict_key != CONFLICT_KEY_ID && conflict_key != CONFLICT_KEY_SKU {
            return Err(RepositoryError::ValidationError(format!(
                "不支持的冲突键: {}",
                conflict_key
            )));
        }

        for mut record in records {
            if record.id.is_empty() {
                record.id = generate_id();
            }
            let existing = state.records.iter_mut().find(|r| {
                if conflict_key == CONFLICT_KEY_ID {
                    r.id == record.id
                } else {
                    r.sku == record.sku
                }
            });
            match existing {
                Some(existing) => {
                    if conflict_key == CONFLICT_KEY_SKU {
                        record.id = existing.id.clone();
                    }
                    *existing = record;
                }
                None => state.records.push(record),
            }
        }
        Ok(true)
    }
}
