// ==========================================
// 商品目录同步 - 目录导入器实现
// ==========================================
// 职责: 整合导入流程，从文件到商品森林 + 导入报告
// 流程: 解析 → 格式识别 → 行解码 → 重复检测 → 变体解析/建树 → 报告
// 说明: 导入器不落库，落库由 SyncReconciler::bulk_replace 负责
// ==========================================

use crate::config::SyncConfig;
use crate::domain::{DecodedRow, ImportIssue, ImportOutcome, ImportReport, IssueKind};
use crate::importer::catalog_importer_trait::{
    CatalogImporter, ConflictHandler, FieldMapper, FileParser, RawRow,
};
use crate::importer::conflict_handler::ConflictHandler as ConflictHandlerImpl;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::FieldMapper as FieldMapperImpl;
use crate::importer::file_parser::{ensure_export_format, CsvParser, UniversalFileParser};
use crate::importer::tree_builder::TreeBuilder;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// CatalogImporterImpl - 目录导入器实现
// ==========================================
pub struct CatalogImporterImpl {
    // 导入组件
    file_parser: Box<dyn FileParser>,
    field_mapper: Box<dyn FieldMapper>,
    conflict_handler: Box<dyn ConflictHandler>,

    // 建树器（携带可见性默认值）
    tree_builder: TreeBuilder,
}

impl Default for CatalogImporterImpl {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl CatalogImporterImpl {
    /// 创建新的 CatalogImporter 实例
    ///
    /// # 参数
    /// - file_parser: 文件解析器
    /// - field_mapper: 行解码器
    /// - conflict_handler: 冲突处理器
    /// - tree_builder: 层级树构建器
    pub fn new(
        file_parser: Box<dyn FileParser>,
        field_mapper: Box<dyn FieldMapper>,
        conflict_handler: Box<dyn ConflictHandler>,
        tree_builder: TreeBuilder,
    ) -> Self {
        Self {
            file_parser,
            field_mapper,
            conflict_handler,
            tree_builder,
        }
    }

    /// 按配置装配默认组件
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            Box::new(UniversalFileParser),
            Box::new(FieldMapperImpl::new()),
            Box::new(ConflictHandlerImpl),
            TreeBuilder::new(
                config.top_level_visibility.clone(),
                config.child_visibility.clone(),
            ),
        )
    }

    /// 从 CSV 文本导入（粘贴 / 上传内容）
    pub fn import_csv_str(&self, content: &str) -> ImportResult<ImportOutcome> {
        let raw_rows = CsvParser.parse_str(content)?;
        ensure_export_format(&raw_rows)?;
        Ok(self.import_rows(raw_rows))
    }

    /// 步骤: 行解码（拒绝的行记为 Error 级问题）
    fn decode_rows(&self, raw_rows: &[RawRow], issues: &mut Vec<ImportIssue>) -> Vec<DecodedRow> {
        let mut decoded = Vec::with_capacity(raw_rows.len());
        for (idx, row) in raw_rows.iter().enumerate() {
            let row_number = idx + 1;
            match self.field_mapper.decode_row(row, row_number) {
                Ok(record) => decoded.push(record),
                Err(issue) => {
                    warn!(row_number = row_number, reason = %issue.message, "行解码被拒绝");
                    issues.push(issue);
                }
            }
        }
        decoded
    }

    /// 步骤: 同批次重复 SKU（首次出现者保留）
    fn drop_duplicates(
        &self,
        decoded: Vec<DecodedRow>,
        issues: &mut Vec<ImportIssue>,
    ) -> Vec<DecodedRow> {
        let duplicates = self.conflict_handler.detect_duplicates(&decoded);
        if duplicates.is_empty() {
            return decoded;
        }

        let mut duplicate_rows = HashSet::new();
        for (row_number, sku) in duplicates {
            warn!(row_number = row_number, sku = %sku, "SKU 重复，保留首次出现的记录");
            issues.push(
                ImportIssue::error(
                    IssueKind::DuplicateSku,
                    Some(&sku),
                    format!("SKU {} 重复，第 {} 行被忽略", sku, row_number),
                )
                .at_row(row_number),
            );
            duplicate_rows.insert(row_number);
        }

        decoded
            .into_iter()
            .filter(|r| !duplicate_rows.contains(&r.row_number))
            .collect()
    }
}

#[async_trait::async_trait]
impl CatalogImporter for CatalogImporterImpl {
    /// 从文件导入商品目录
    ///
    /// # 参数
    /// - file_path: 文件路径（.csv, .xlsx, .xls）
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 最终森林 + 导入报告
    /// - Err: 文件读取 / 解析错误，或无法识别的导出格式
    #[instrument(skip(self, file_path))]
    async fn import_from_file(&self, file_path: &Path) -> ImportResult<ImportOutcome> {
        let start_time = Instant::now();
        info!(file_path = %file_path.display(), "开始导入商品目录");

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let raw_rows = self
            .file_parser
            .parse_to_raw_records(file_path)
            .map_err(|e| {
                error!(error = %e, "文件解析失败");
                e
            })?;
        info!(total_rows = raw_rows.len(), "文件解析完成");

        // === 步骤 2: 格式识别 ===
        debug!("步骤 2: 格式识别");
        ensure_export_format(&raw_rows).map_err(|e| {
            error!(error = %e, "文件不是可识别的商品导出格式");
            e
        })?;

        let outcome = self.import_rows(raw_rows);
        info!(
            batch_id = %outcome.report.batch_id,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "商品目录导入完成"
        );
        Ok(outcome)
    }

    /// 从原始行记录导入
    fn import_rows(&self, raw_rows: Vec<RawRow>) -> ImportOutcome {
        let batch_id = Uuid::new_v4().to_string();
        let total_rows = raw_rows.len();
        let mut issues = Vec::new();

        // === 步骤 3: 行解码 ===
        debug!("步骤 3: 行解码");
        let decoded = self.decode_rows(&raw_rows, &mut issues);

        // === 步骤 4: 重复检测 ===
        debug!("步骤 4: 重复检测");
        let accepted = self.drop_duplicates(decoded, &mut issues);
        let accepted_rows = accepted.len();
        info!(
            accepted = accepted_rows,
            rejected = total_rows - accepted_rows,
            "行解码与重复检测完成"
        );

        // === 步骤 5: 变体解析 + 建树 ===
        debug!("步骤 5: 变体解析与建树");
        let build = self.tree_builder.build(&accepted);
        issues.extend(build.issues);

        // === 步骤 6: 生成报告 ===
        let mut type_summary: BTreeMap<String, usize> = BTreeMap::new();
        for node in &build.forest {
            *type_summary.entry(node.kind.as_str().to_string()).or_insert(0) += 1;
        }

        if build.forest.is_empty() {
            warn!(batch_id = %batch_id, "导入结果为空");
            issues.push(ImportIssue::error(
                IssueKind::EmptyResult,
                None,
                "未解析出任何有效商品",
            ));
        }

        let report = ImportReport {
            batch_id,
            total_rows,
            accepted_rows,
            rejected_rows: total_rows - accepted_rows,
            top_level_count: build.forest.len(),
            child_count: build.child_count,
            type_summary,
            issues,
        };

        ImportOutcome {
            forest: build.forest,
            report,
        }
    }
}
