// ==========================================
// 商品目录同步 - 同步协调器
// ==========================================
// 职责: 内存森林与扁平持久化记录之间的加载 / 创建 / 更新 / 删除 / 批量替换
// 红线: 创建与更新父先子后；删除子先父后
// 红线: 批量替换按块顺序写入，前一块完成后才发出下一块
// 红线: 所有写入入口持有变更守卫，退出路径必须释放
// 说明: 无事务保证，子记录失败不回滚已提交的父记录
// ==========================================

use crate::config::SyncConfig;
use crate::domain::{forest_len, ProductNode, ProductRecord};
use crate::repository::ProductStore;
use crate::sync::change_guard::ChangeGuard;
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::events::{RowChangeEvent, RowReplaceSink};
use crate::sync::flatten::{
    adopt_stored_ids, build_forest, flatten_forest, into_batches, LoadedForest,
};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// 调用参数与结果
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// 加载期间屏蔽行变更通知
    pub suppress_notifications: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            suppress_notifications: true,
        }
    }
}

/// 单个子树写入失败
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteFailure {
    pub sku: String,
    pub id: Option<String>,
    pub message: String,
    /// 因本节点失败而未尝试写入的后代数量
    pub skipped_descendants: usize,
}

impl WriteFailure {
    fn new(node: &ProductNode, err: &SyncError) -> Self {
        Self {
            sku: node.sku.clone(),
            id: Some(node.id.clone()).filter(|id| !id.is_empty()),
            message: err.to_string(),
            skipped_descendants: node.subtree_len() - 1,
        }
    }
}

/// 创建 / 更新写入报告
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriteReport {
    pub written: usize,
    pub failures: Vec<WriteFailure>,
}

impl WriteReport {
    fn merge(&mut self, other: WriteReport) {
        self.written += other.written;
        self.failures.extend(other.failures);
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 创建结果：持久化后的树（仅包含写入成功的子节点）
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    pub node: ProductNode,
    pub report: WriteReport,
}

/// 批量替换结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub total: usize,
    pub committed: usize,
    pub chunks: usize,
    /// 沿用已存储 id 的节点数
    pub remapped: usize,
}

/// 行事件处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// 守卫激活期间的通知被忽略
    Ignored,
    Created(CreateOutcome),
    Updated(WriteReport),
    Deleted(usize),
}

// ==========================================
// SyncReconciler
// ==========================================
pub struct SyncReconciler<S>
where
    S: ProductStore + ?Sized,
{
    store: Arc<S>,
    sink: Arc<dyn RowReplaceSink>,
    guard: ChangeGuard,
    chunk_size: usize,
    conflict_key: String,
}

impl<S> SyncReconciler<S>
where
    S: ProductStore + ?Sized,
{
    /// 创建新的 SyncReconciler 实例
    ///
    /// # 参数
    /// - store: 存储适配器
    /// - sink: 展示层整表替换回调
    /// - config: 同步配置（块大小 / 冲突键）
    pub fn new(store: Arc<S>, sink: Arc<dyn RowReplaceSink>, config: &SyncConfig) -> Self {
        Self {
            store,
            sink,
            guard: ChangeGuard::new(),
            chunk_size: config.chunk_size,
            conflict_key: config.conflict_key.clone(),
        }
    }

    /// 共享守卫（展示层可据此判断是否处于同步写入中）
    pub fn guard(&self) -> ChangeGuard {
        self.guard.clone()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    // ==========================================
    // 加载（扁平 → 树）
    // ==========================================

    /// 读取全部记录并整表替换展示层数据
    ///
    /// # 返回
    /// - Ok(LoadedForest): 森林 + 孤儿记录
    /// - Err(LoadFailed): 读取失败（展示层收到空森林）
    #[instrument(skip(self))]
    pub async fn load(&self, options: LoadOptions) -> SyncResult<LoadedForest> {
        let _token = options.suppress_notifications.then(|| self.guard.enter());

        let records = match self.store.fetch_all().await {
            Ok(records) => records,
            Err(source) => {
                error!(error = %source, "商品数据加载失败");
                self.sink.replace_all(&[]);
                return Err(SyncError::LoadFailed { source });
            }
        };

        let total = records.len();
        let loaded = build_forest(records);
        self.sink.replace_all(&loaded.forest);

        info!(
            total = total,
            top_level = loaded.forest.len(),
            orphans = loaded.orphans.len(),
            "商品数据加载完成"
        );
        Ok(loaded)
    }

    // ==========================================
    // 创建
    // ==========================================

    /// 创建节点及其子树
    ///
    /// # 参数
    /// - node: 待创建节点（可含子节点）
    /// - parent_id: 父记录 id（顶层为 None）
    ///
    /// # 返回
    /// - Ok(CreateOutcome): 根节点已写入；子节点失败记入报告
    /// - Err(CreateFailed): 根节点写入失败
    #[instrument(skip(self, node), fields(sku = %node.sku))]
    pub async fn create(&self, node: &ProductNode, parent_id: Option<&str>) -> SyncResult<CreateOutcome> {
        let _token = self.guard.enter();
        let (node, report) = self
            .create_subtree(node, parent_id.map(str::to_string))
            .await?;
        info!(written = report.written, failures = report.failures.len(), "创建完成");
        Ok(CreateOutcome { node, report })
    }

    fn create_subtree<'a>(
        &'a self,
        node: &'a ProductNode,
        parent_id: Option<String>,
    ) -> BoxFuture<'a, SyncResult<(ProductNode, WriteReport)>> {
        async move {
            let saved = self
                .store
                .insert(node.to_record(parent_id.as_deref()))
                .await
                .map_err(|source| SyncError::CreateFailed {
                    sku: node.sku.clone(),
                    source,
                })?;
            debug!(sku = %node.sku, id = %saved.id, "记录已创建");

            let mut persisted = saved.into_node();
            let mut report = WriteReport {
                written: 1,
                failures: Vec::new(),
            };

            let own_id = persisted.id.clone();
            let results = join_all(
                node.children
                    .iter()
                    .map(|child| self.create_subtree(child, Some(own_id.clone()))),
            )
            .await;

            for (child, result) in node.children.iter().zip(results) {
                match result {
                    Ok((created, child_report)) => {
                        persisted.children.push(created);
                        report.merge(child_report);
                    }
                    Err(e) => {
                        warn!(parent_id = %own_id, child_sku = %child.sku, error = %e, "子记录创建失败");
                        report.failures.push(WriteFailure::new(child, &e));
                    }
                }
            }

            Ok((persisted, report))
        }
        .boxed()
    }

    // ==========================================
    // 更新
    // ==========================================

    /// 按 id 更新节点及其子树
    ///
    /// # 返回
    /// - Ok(WriteReport): 根节点已更新；子节点失败记入报告
    /// - Err: 根节点缺少 id 或更新失败
    #[instrument(skip(self, node), fields(id = %node.id, sku = %node.sku))]
    pub async fn update(&self, node: &ProductNode, parent_id: Option<&str>) -> SyncResult<WriteReport> {
        let _token = self.guard.enter();
        let report = self
            .update_subtree(node, parent_id.map(str::to_string))
            .await?;
        info!(written = report.written, failures = report.failures.len(), "更新完成");
        Ok(report)
    }

    fn update_subtree<'a>(
        &'a self,
        node: &'a ProductNode,
        parent_id: Option<String>,
    ) -> BoxFuture<'a, SyncResult<WriteReport>> {
        async move {
            if node.id.is_empty() {
                return Err(SyncError::MissingId(node.sku.clone()));
            }

            self.store
                .update(&node.id, node.to_record(parent_id.as_deref()))
                .await
                .map_err(|source| SyncError::UpdateFailed {
                    id: node.id.clone(),
                    sku: node.sku.clone(),
                    source,
                })?;

            let mut report = WriteReport {
                written: 1,
                failures: Vec::new(),
            };

            let results = join_all(
                node.children
                    .iter()
                    .map(|child| self.update_subtree(child, Some(node.id.clone()))),
            )
            .await;

            for (child, result) in node.children.iter().zip(results) {
                match result {
                    Ok(child_report) => report.merge(child_report),
                    Err(e) => {
                        warn!(parent_id = %node.id, child_sku = %child.sku, error = %e, "子记录更新失败");
                        report.failures.push(WriteFailure::new(child, &e));
                    }
                }
            }

            Ok(report)
        }
        .boxed()
    }

    // ==========================================
    // 删除
    // ==========================================

    /// 删除记录及其全部后代（子先父后）
    ///
    /// # 返回
    /// - Ok(n): 实际删除的记录数（记录不存在时为 0）
    /// - Err(ChildDeleteFailed): 有子记录删除失败，父记录保留
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> SyncResult<usize> {
        let _token = self.guard.enter();
        let deleted = self.delete_subtree(id.to_string(), Vec::new()).await?;
        info!(deleted = deleted, "删除完成");
        Ok(deleted)
    }

    fn delete_subtree<'a>(&'a self, id: String, ancestors: Vec<String>) -> BoxFuture<'a, SyncResult<usize>> {
        async move {
            let children = self
                .store
                .fetch_children(&id)
                .await
                .map_err(|source| SyncError::DeleteFailed {
                    id: id.clone(),
                    source,
                })?;

            let mut path = ancestors;
            path.push(id.clone());
            let child_ids: Vec<String> = children
                .into_iter()
                .map(|c| c.id)
                .filter(|child_id| {
                    let cyclic = path.contains(child_id);
                    if cyclic {
                        warn!(record_id = %child_id, parent_id = %id, "检测到环引用，跳过");
                    }
                    !cyclic
                })
                .collect();

            let results = join_all(
                child_ids
                    .iter()
                    .map(|child_id| self.delete_subtree(child_id.clone(), path.clone())),
            )
            .await;

            let mut deleted = 0;
            let mut failed_children = Vec::new();
            for (child_id, result) in child_ids.into_iter().zip(results) {
                match result {
                    Ok(n) => deleted += n,
                    Err(e) => {
                        warn!(parent_id = %id, record_id = %child_id, error = %e, "子记录删除失败");
                        failed_children.push(child_id);
                    }
                }
            }

            if !failed_children.is_empty() {
                return Err(SyncError::ChildDeleteFailed {
                    parent_id: id,
                    failed_children,
                });
            }

            let removed = self
                .store
                .delete_by_id(&id)
                .await
                .map_err(|source| SyncError::DeleteFailed {
                    id: id.clone(),
                    source,
                })?;
            if removed {
                deleted += 1;
            } else {
                warn!(record_id = %id, "待删除记录不存在");
            }

            Ok(deleted)
        }
        .boxed()
    }

    // ==========================================
    // 批量替换
    // ==========================================

    /// 扁平化森林并按块顺序 upsert
    ///
    /// # 返回
    /// - Ok(BulkReport): 全部块写入成功
    /// - Err(IdAlignmentFailed): 读取已存储记录失败，未写入
    /// - Err(BulkChunkFailed / BulkChunkRejected): 在失败块处中止，携带已提交数量
    pub async fn bulk_replace(&self, forest: &[ProductNode]) -> SyncResult<BulkReport> {
        self.bulk_replace_aligned(forest)
            .await
            .map(|(_, report)| report)
    }

    /// 批量替换，并返回 id 已与存储对齐的森林
    ///
    /// # 说明
    /// - 写入前读取全部记录，同 SKU 节点沿用已存储的 id，子记录 parent_id 随之指向已存在的行
    /// - 展示层应以返回的森林替换行数据，后续编辑才能命中已存储记录
    #[instrument(skip(self, forest), fields(top_level = forest.len()))]
    pub async fn bulk_replace_aligned(
        &self,
        forest: &[ProductNode],
    ) -> SyncResult<(Vec<ProductNode>, BulkReport)> {
        let _token = self.guard.enter();

        let stored = match self.store.fetch_all().await {
            Ok(stored) => stored,
            Err(source) => {
                error!(error = %source, "读取已存储记录失败，批量写入未开始");
                return Err(SyncError::IdAlignmentFailed {
                    total: forest_len(forest),
                    source,
                });
            }
        };
        let (aligned, remapped) = adopt_stored_ids(forest, &stored);
        if remapped > 0 {
            info!(remapped = remapped, stored = stored.len(), "节点 id 已与存储记录对齐");
        }

        let records: Vec<ProductRecord> = flatten_forest(&aligned);
        let total = records.len();
        let batches = into_batches(records, self.chunk_size);
        let chunks = batches.len();
        info!(total = total, chunks = chunks, chunk_size = self.chunk_size, "开始批量写入");

        let mut committed = 0;
        for batch in batches {
            let chunk_index = batch.index;
            let size = batch.len();
            match self.store.bulk_upsert(batch.records, &self.conflict_key).await {
                Ok(true) => {
                    committed += size;
                    debug!(chunk_index = chunk_index, committed = committed, "数据块写入完成");
                }
                Ok(false) => {
                    error!(chunk_index = chunk_index, committed = committed, "数据块被存储拒绝");
                    return Err(SyncError::BulkChunkRejected {
                        chunk_index,
                        committed,
                        total,
                    });
                }
                Err(source) => {
                    error!(chunk_index = chunk_index, committed = committed, error = %source, "数据块写入失败");
                    return Err(SyncError::BulkChunkFailed {
                        chunk_index,
                        committed,
                        total,
                        source,
                    });
                }
            }
        }

        info!(committed = committed, "批量写入完成");
        Ok((
            aligned,
            BulkReport {
                total,
                committed,
                chunks,
                remapped,
            },
        ))
    }

    // ==========================================
    // 行变更通知
    // ==========================================

    /// 处理展示层行变更通知（守卫激活时忽略）
    pub async fn handle_row_event(&self, event: RowChangeEvent) -> SyncResult<EventOutcome> {
        if self.guard.is_active() {
            debug!(event = event.as_str(), "同步写入进行中，忽略行变更通知");
            return Ok(EventOutcome::Ignored);
        }

        match event {
            RowChangeEvent::CellEdited { node, parent_id } => self
                .update(&node, parent_id.as_deref())
                .await
                .map(EventOutcome::Updated),
            RowChangeEvent::RowAdded { node, parent_id } => self
                .create(&node, parent_id.as_deref())
                .await
                .map(EventOutcome::Created),
            RowChangeEvent::RowDeleted { id } => self.delete(&id).await.map(EventOutcome::Deleted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProductKind, ProductStatus};
    use crate::repository::{InMemoryProductStore, StoreCall};
    use crate::sync::events::RecordingRowSink;

    fn node(sku: &str) -> ProductNode {
        let mut n = ProductNode::new(sku, format!("Name {}", sku), ProductKind::Simple);
        n.status = ProductStatus::Enabled;
        n
    }

    fn parent_with(children: &[&str]) -> ProductNode {
        let mut p = node("P");
        p.kind = ProductKind::Configurable;
        p.children = children.iter().map(|c| node(c)).collect();
        p
    }

    fn setup(store: InMemoryProductStore) -> (SyncReconciler<InMemoryProductStore>, RecordingRowSink) {
        let sink = RecordingRowSink::new();
        let reconciler = SyncReconciler::new(Arc::new(store), Arc::new(sink.clone()), &SyncConfig::default());
        (reconciler, sink)
    }

    fn deletes(calls: &[StoreCall]) -> Vec<String> {
        calls
            .iter()
            .filter_map(|c| match c {
                StoreCall::DeleteById { id } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_create_parent_before_children() {
        let (reconciler, _) = setup(InMemoryProductStore::new());
        let outcome = reconciler.create(&parent_with(&["C1", "C2"]), None).await.unwrap();

        assert_eq!(outcome.report.written, 3);
        assert!(outcome.report.is_complete());
        let records = reconciler.store().records();
        let skus: Vec<_> = records.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["P", "C1", "C2"]);
        assert_eq!(records[1].parent_id.as_deref(), Some(outcome.node.id.as_str()));
        assert_eq!(outcome.node.children.len(), 2);
        assert!(!reconciler.guard().is_active());
    }

    #[tokio::test]
    async fn test_create_child_failure_keeps_parent() {
        let store = InMemoryProductStore::new();
        store.fail_on_sku("C1");
        let (reconciler, _) = setup(store);

        let outcome = reconciler.create(&parent_with(&["C1", "C2"]), None).await.unwrap();
        assert_eq!(outcome.report.written, 2);
        assert_eq!(outcome.report.failures.len(), 1);
        assert_eq!(outcome.report.failures[0].sku, "C1");
        assert_eq!(reconciler.store().records().len(), 2);
    }

    #[tokio::test]
    async fn test_create_root_failure_is_error() {
        let store = InMemoryProductStore::new();
        store.fail_on_sku("P");
        let (reconciler, _) = setup(store);

        let err = reconciler.create(&parent_with(&["C1"]), None).await.unwrap_err();
        assert!(matches!(err, SyncError::CreateFailed { ref sku, .. } if sku == "P"));
        assert!(reconciler.store().records().is_empty());
        assert!(!reconciler.guard().is_active());
    }

    #[tokio::test]
    async fn test_update_sets_parent_ref_on_children() {
        let (reconciler, _) = setup(InMemoryProductStore::new());
        let created = reconciler.create(&parent_with(&["C1"]), None).await.unwrap().node;

        let mut edited = created.clone();
        edited.children[0].name = "Edited".to_string();
        let report = reconciler.update(&edited, None).await.unwrap();

        assert_eq!(report.written, 2);
        let child = reconciler
            .store()
            .records()
            .into_iter()
            .find(|r| r.sku == "C1")
            .unwrap();
        assert_eq!(child.name, "Edited");
        assert_eq!(child.parent_id.as_deref(), Some(created.id.as_str()));
    }

    #[tokio::test]
    async fn test_update_without_id_fails() {
        let (reconciler, _) = setup(InMemoryProductStore::new());
        let mut n = node("X");
        n.id.clear();
        assert!(matches!(
            reconciler.update(&n, None).await,
            Err(SyncError::MissingId(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_children_first_then_parent() {
        let (reconciler, _) = setup(InMemoryProductStore::new());
        let created = reconciler.create(&parent_with(&["C1", "C2"]), None).await.unwrap().node;

        let deleted = reconciler.delete(&created.id).await.unwrap();
        assert_eq!(deleted, 3);

        let ids = deletes(&reconciler.store().calls());
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[2], created.id);
        assert!(ids[..2].contains(&created.children[0].id));
        assert!(ids[..2].contains(&created.children[1].id));
        assert!(reconciler.store().records().is_empty());
    }

    #[tokio::test]
    async fn test_delete_aborts_when_child_fails() {
        let (reconciler, _) = setup(InMemoryProductStore::new());
        let created = reconciler.create(&parent_with(&["C1", "C2"]), None).await.unwrap().node;
        reconciler.store().fail_on_delete(&created.children[0].id);

        let err = reconciler.delete(&created.id).await.unwrap_err();
        match err {
            SyncError::ChildDeleteFailed { parent_id, failed_children } => {
                assert_eq!(parent_id, created.id);
                assert_eq!(failed_children, vec![created.children[0].id.clone()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        let remaining: Vec<_> = reconciler.store().records().into_iter().map(|r| r.sku).collect();
        assert_eq!(remaining, vec!["P", "C1"]);
    }

    #[tokio::test]
    async fn test_bulk_replace_chunk_count() {
        let (reconciler, _) = setup(InMemoryProductStore::new());
        let forest: Vec<ProductNode> = (0..1001).map(|i| node(&format!("S-{i}"))).collect();

        let report = reconciler.bulk_replace(&forest).await.unwrap();
        assert_eq!(
            report,
            BulkReport {
                total: 1001,
                committed: 1001,
                chunks: 3,
                remapped: 0
            }
        );

        let sizes: Vec<_> = reconciler
            .store()
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::BulkUpsert { size } => Some(size),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![500, 500, 1]);
    }

    #[tokio::test]
    async fn test_bulk_replace_aborts_and_reports_committed() {
        let store = InMemoryProductStore::new();
        store.fail_bulk_call(1);
        let (reconciler, _) = setup(store);
        let forest: Vec<ProductNode> = (0..1200).map(|i| node(&format!("S-{i}"))).collect();

        let err = reconciler.bulk_replace(&forest).await.unwrap_err();
        assert_eq!(err.committed(), Some(500));
        assert!(matches!(err, SyncError::BulkChunkFailed { chunk_index: 1, total: 1200, .. }));
        // 对齐读取 + 两次块写入
        assert_eq!(reconciler.store().calls().len(), 3);
        assert!(!reconciler.guard().is_active());
    }

    #[tokio::test]
    async fn test_load_replaces_rows_and_reports_orphans() {
        let (writer, _) = setup(InMemoryProductStore::new());
        let created = writer.create(&parent_with(&["C1"]), None).await.unwrap().node;
        let mut records = writer.store().records();
        let mut orphan = node("LOST").to_record(Some("ghost"));
        orphan.id = "lost-id".to_string();
        records.push(orphan);

        let (reconciler, sink) = setup(InMemoryProductStore::with_records(records));
        let loaded = reconciler.load(LoadOptions::default()).await.unwrap();

        assert_eq!(loaded.forest, vec![created]);
        assert_eq!(loaded.orphans.len(), 1);
        assert_eq!(sink.latest(), Some(loaded.forest.clone()));
    }

    #[tokio::test]
    async fn test_load_failure_sends_empty_forest() {
        let store = InMemoryProductStore::new();
        store.fail_fetch();
        let (reconciler, sink) = setup(store);

        let err = reconciler.load(LoadOptions::default()).await.unwrap_err();
        assert!(matches!(err, SyncError::LoadFailed { .. }));
        assert_eq!(sink.snapshots(), vec![Vec::<ProductNode>::new()]);
        assert!(!reconciler.guard().is_active());
    }

    #[tokio::test]
    async fn test_row_events_ignored_while_guard_active() {
        let (reconciler, _) = setup(InMemoryProductStore::new());

        let token = reconciler.guard().enter();
        let outcome = reconciler
            .handle_row_event(RowChangeEvent::RowAdded { node: node("A"), parent_id: None })
            .await
            .unwrap();
        assert_eq!(outcome, EventOutcome::Ignored);
        assert!(reconciler.store().calls().is_empty());
        drop(token);

        let outcome = reconciler
            .handle_row_event(RowChangeEvent::RowAdded { node: node("A"), parent_id: None })
            .await
            .unwrap();
        assert!(matches!(outcome, EventOutcome::Created(_)));
        assert_eq!(reconciler.store().records().len(), 1);
    }

    /// 在整表替换回调内部记录守卫状态
    #[derive(Clone, Default)]
    struct GuardObservingSink {
        guard: Arc<std::sync::Mutex<Option<ChangeGuard>>>,
        observed: Arc<std::sync::Mutex<Vec<bool>>>,
    }

    impl GuardObservingSink {
        fn observed(&self) -> Vec<bool> {
            self.observed.lock().unwrap().clone()
        }
    }

    impl RowReplaceSink for GuardObservingSink {
        fn replace_all(&self, _forest: &[ProductNode]) {
            let active = self
                .guard
                .lock()
                .unwrap()
                .as_ref()
                .map(ChangeGuard::is_active)
                .unwrap_or(false);
            self.observed.lock().unwrap().push(active);
        }
    }

    fn observed_setup(store: InMemoryProductStore) -> (SyncReconciler<InMemoryProductStore>, GuardObservingSink) {
        let sink = GuardObservingSink::default();
        let reconciler = SyncReconciler::new(Arc::new(store), Arc::new(sink.clone()), &SyncConfig::default());
        *sink.guard.lock().unwrap() = Some(reconciler.guard());
        (reconciler, sink)
    }

    #[tokio::test]
    async fn test_load_holds_guard_while_replacing_rows() {
        let records = vec![node("A").to_record(None)];
        let (reconciler, sink) = observed_setup(InMemoryProductStore::with_records(records));

        reconciler.load(LoadOptions::default()).await.unwrap();
        assert_eq!(sink.observed(), vec![true]);
        assert!(!reconciler.guard().is_active());
    }

    #[tokio::test]
    async fn test_load_without_suppression_leaves_guard_clear() {
        let records = vec![node("A").to_record(None)];
        let (reconciler, sink) = observed_setup(InMemoryProductStore::with_records(records));

        reconciler
            .load(LoadOptions {
                suppress_notifications: false,
            })
            .await
            .unwrap();
        assert_eq!(sink.observed(), vec![false]);
        assert!(!reconciler.guard().is_active());
    }

    #[tokio::test]
    async fn test_load_failure_holds_guard_while_clearing_rows() {
        let store = InMemoryProductStore::new();
        store.fail_fetch();
        let (reconciler, sink) = observed_setup(store);

        assert!(reconciler.load(LoadOptions::default()).await.is_err());
        assert_eq!(sink.observed(), vec![true]);
        assert!(!reconciler.guard().is_active());
    }

    #[tokio::test]
    async fn test_bulk_replace_by_sku_reuses_stored_ids() {
        let store = InMemoryProductStore::new();
        let config = SyncConfig {
            conflict_key: "sku".to_string(),
            ..SyncConfig::default()
        };
        let reconciler = SyncReconciler::new(Arc::new(store), Arc::new(RecordingRowSink::new()), &config);

        let first = parent_with(&["C1", "C2"]);
        reconciler.bulk_replace(&[first.clone()]).await.unwrap();

        // 同一目录重新导入：节点 id 全新
        let second = parent_with(&["C1", "C2"]);
        assert_ne!(second.id, first.id);
        let (aligned, report) = reconciler.bulk_replace_aligned(&[second]).await.unwrap();
        assert_eq!(report.remapped, 3);
        assert_eq!(aligned, vec![first.clone()]);

        let loaded = reconciler.load(LoadOptions::default()).await.unwrap();
        assert!(loaded.orphans.is_empty());
        assert_eq!(loaded.forest, vec![first]);
    }

    #[tokio::test]
    async fn test_bulk_replace_aborts_when_stored_ids_unreadable() {
        let store = InMemoryProductStore::new();
        store.fail_fetch();
        let (reconciler, _) = setup(store);

        let err = reconciler.bulk_replace(&[parent_with(&["C1"])]).await.unwrap_err();
        assert!(matches!(err, SyncError::IdAlignmentFailed { total: 2, .. }));
        assert_eq!(err.committed(), Some(0));
        assert!(!reconciler.guard().is_active());
    }
}
