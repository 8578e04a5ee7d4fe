// ==========================================
// 商品目录同步 - 目录 API
// ==========================================
// 职责: 展示层调用入口（导入 / 加载 / 同步 / 单元格编辑 / 批量操作）
// 说明: 导入结果与加载结果通过整表替换回调推送给展示层
// ==========================================

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::validate_field_edit;
use crate::config::SyncConfig;
use crate::domain::{ImportOutcome, ProductNode, ProductStatus};
use crate::importer::{CatalogExporter, CatalogImporter, CatalogImporterImpl, ImportResult};
use crate::repository::ProductStore;
use crate::sync::{
    BulkReport, EventOutcome, LoadOptions, LoadedForest, RowChangeEvent, RowReplaceSink,
    SyncReconciler,
};

/// 表格中被选中的行（含父记录 id，用于保持层级）
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedRow {
    pub node: ProductNode,
    pub parent_id: Option<String>,
}

/// 批量操作单行结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowActionFailure {
    pub id: String,
    pub reason: String,
}

/// 批量操作结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MassActionReport {
    /// 成功处理的行 id（按处理顺序）
    pub succeeded: Vec<String>,
    pub failed: Vec<RowActionFailure>,
    /// 实际写入 / 删除的记录数（删除包含级联的子记录）
    pub affected_records: usize,
}

// ==========================================
// CatalogApi - 目录 API
// ==========================================
pub struct CatalogApi<S>
where
    S: ProductStore + ?Sized,
{
    importer: CatalogImporterImpl,
    exporter: CatalogExporter,
    reconciler: SyncReconciler<S>,
    sink: Arc<dyn RowReplaceSink>,
}

impl<S> CatalogApi<S>
where
    S: ProductStore + ?Sized,
{
    /// 创建新的CatalogApi实例
    ///
    /// # 参数
    /// - store: 存储适配器
    /// - sink: 展示层整表替换回调
    /// - config: 同步配置
    pub fn new(store: Arc<S>, sink: Arc<dyn RowReplaceSink>, config: &SyncConfig) -> Self {
        Self {
            importer: CatalogImporterImpl::from_config(config),
            exporter: CatalogExporter,
            reconciler: SyncReconciler::new(store, Arc::clone(&sink), config),
            sink,
        }
    }

    pub fn reconciler(&self) -> &SyncReconciler<S> {
        &self.reconciler
    }

    // ==========================================
    // 导入 / 导出
    // ==========================================

    /// 导入文件并推送到展示层（失败时推送空表）
    pub async fn import_file(&self, file_path: &Path) -> ApiResult<ImportOutcome> {
        let result = self.importer.import_from_file(file_path).await;
        self.publish_import(result)
    }

    /// 导入 CSV 文本并推送到展示层（失败时推送空表）
    pub fn import_csv_text(&self, content: &str) -> ApiResult<ImportOutcome> {
        let result = self.importer.import_csv_str(content);
        self.publish_import(result)
    }

    fn publish_import(&self, result: ImportResult<ImportOutcome>) -> ApiResult<ImportOutcome> {
        match result {
            Ok(outcome) => {
                self.sink.replace_all(&outcome.forest);
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "导入失败，展示层清空");
                self.sink.replace_all(&[]);
                Err(e.into())
            }
        }
    }

    /// 导入文件并整体写入存储
    ///
    /// # 返回
    /// - 导入结果（森林 id 已与存储对齐）+ 批量写入报告
    pub async fn import_and_sync(&self, file_path: &Path) -> ApiResult<(ImportOutcome, BulkReport)> {
        let mut outcome = self.import_file(file_path).await?;
        let (aligned, bulk) = self.reconciler.bulk_replace_aligned(&outcome.forest).await?;
        outcome.forest = aligned;
        self.sink.replace_all(&outcome.forest);
        info!(
            batch_id = %outcome.report.batch_id,
            committed = bulk.committed,
            remapped = bulk.remapped,
            "导入并同步完成"
        );
        Ok((outcome, bulk))
    }

    /// 导出森林到 CSV 文件
    pub fn export_file(&self, forest: &[ProductNode], file_path: &Path) -> ApiResult<usize> {
        Ok(self.exporter.export_to_path(forest, file_path)?)
    }

    // ==========================================
    // 加载 / 同步
    // ==========================================

    /// 从存储加载全部商品（屏蔽自身引起的行变更通知）
    pub async fn load(&self) -> ApiResult<LoadedForest> {
        Ok(self.reconciler.load(LoadOptions::default()).await?)
    }

    /// 整体写入森林，并以 id 对齐后的森林替换展示层数据
    pub async fn bulk_replace(&self, forest: &[ProductNode]) -> ApiResult<BulkReport> {
        let (aligned, bulk) = self.reconciler.bulk_replace_aligned(forest).await?;
        self.sink.replace_all(&aligned);
        Ok(bulk)
    }

    /// 展示层行变更通知
    pub async fn on_row_event(&self, event: RowChangeEvent) -> ApiResult<EventOutcome> {
        Ok(self.reconciler.handle_row_event(event).await?)
    }

    // ==========================================
    // 单元格编辑
    // ==========================================

    /// 校验并写入单元格编辑（仅写入该行自身）
    ///
    /// # 返回
    /// - Ok(ProductNode): 编辑后的节点（子节点保持不变）
    /// - Err(FieldValidationError): 校验失败，未写入
    pub async fn edit_field(
        &self,
        row: &SelectedRow,
        field: &str,
        value: &str,
    ) -> ApiResult<ProductNode> {
        let edit = validate_field_edit(field, value)?;

        let mut edited = row.node.clone();
        edit.apply_to(&mut edited);

        let own_row = ProductNode {
            children: Vec::new(),
            ..edited.clone()
        };
        self.reconciler
            .update(&own_row, row.parent_id.as_deref())
            .await?;

        info!(id = %edited.id, field = %field, "单元格编辑已同步");
        Ok(edited)
    }

    // ==========================================
    // 批量操作
    // ==========================================

    /// 批量上架 / 下架
    pub async fn mass_set_status(
        &self,
        rows: &[SelectedRow],
        status: ProductStatus,
    ) -> ApiResult<MassActionReport> {
        if rows.is_empty() {
            return Err(ApiError::InvalidInput("未选择任何行".to_string()));
        }

        let mut report = MassActionReport::default();
        for row in rows {
            let own_row = ProductNode {
                status,
                children: Vec::new(),
                ..row.node.clone()
            };
            match self
                .reconciler
                .update(&own_row, row.parent_id.as_deref())
                .await
            {
                Ok(write) => {
                    report.affected_records += write.written;
                    report.succeeded.push(own_row.id);
                }
                Err(e) => {
                    warn!(id = %own_row.id, error = %e, "批量状态更新失败");
                    report.failed.push(RowActionFailure {
                        id: own_row.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            status = %status,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "批量状态更新完成"
        );
        Ok(report)
    }

    /// 批量删除（按选择顺序的逆序，子记录级联删除）
    pub async fn mass_delete(&self, ids: &[String]) -> ApiResult<MassActionReport> {
        if ids.is_empty() {
            return Err(ApiError::InvalidInput("未选择任何行".to_string()));
        }

        let mut report = MassActionReport::default();
        for id in ids.iter().rev() {
            match self.reconciler.delete(id).await {
                Ok(deleted) => {
                    report.affected_records += deleted;
                    report.succeeded.push(id.clone());
                }
                Err(e) => {
                    warn!(id = %id, error = %e, "批量删除失败");
                    report.failed.push(RowActionFailure {
                        id: id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            deleted = report.affected_records,
            "批量删除完成"
        );
        Ok(report)
    }
}
