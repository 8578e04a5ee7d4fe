// ==========================================
// 商品目录同步 - 导入接口 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 流程: 文件解析 → 行解码 → 重复检测 → 变体解析 → 建树
// ==========================================

use crate::domain::{DecodedRow, ImportIssue, ImportOutcome};
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

/// 原始行记录（列名 → 原值）
pub type RawRow = HashMap<String, String>;

// ==========================================
// CatalogImporter Trait
// ==========================================
// 用途: 商品目录导入主接口
// 实现者: CatalogImporterImpl
#[async_trait]
pub trait CatalogImporter: Send + Sync {
    /// 从文件导入（按扩展名选择 CSV / Excel）
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 最终森林 + 导入报告
    /// - Err: 文件读取错误、格式无法识别等
    async fn import_from_file(&self, file_path: &Path) -> ImportResult<ImportOutcome>;

    /// 从已解析的行记录导入（纯函数，无 I/O）
    ///
    /// # 说明
    /// - 单条记录的校验失败不会中断整体导入
    fn import_rows(&self, rows: Vec<RawRow>) -> ImportOutcome;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录（跳过完全空白行）
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRow>>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 行解码接口
// 实现者: FieldMapperImpl
pub trait FieldMapper: Send + Sync {
    /// 将原始行记录解码为 DecodedRow
    ///
    /// # 返回
    /// - Ok(DecodedRow): 有效记录
    /// - Err(ImportIssue): 被拒绝的原因（SKU 缺失 / 名称缺失）
    fn decode_row(&self, row: &RawRow, row_number: usize) -> Result<DecodedRow, ImportIssue>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 字段清洗与类型强制转换
// 实现者: DataCleanerImpl
pub trait DataCleaner: Send + Sync {
    /// 标准化 NULL 值（空字符串/空白 → None）
    fn normalize_null(&self, value: Option<&str>) -> Option<String>;

    /// 解析状态（"1" / "Enabled" 等真值编码 → Enabled）
    fn normalize_status(&self, value: Option<&str>) -> crate::domain::ProductStatus;

    /// 解析价格（缺失或无法解析 → None，负数 → None）
    fn parse_price(&self, value: Option<&str>) -> Option<f64>;

    /// 解析数量（缺失或无法解析 → 0）
    fn parse_quantity(&self, value: Option<&str>) -> u32;

    /// 解析布尔标志（"1" → true）
    fn parse_flag(&self, value: Option<&str>) -> bool;
}

// ==========================================
// ConflictHandler Trait
// ==========================================
// 用途: 同一导入内 SKU 冲突检测
// 实现者: ConflictHandlerImpl
pub trait ConflictHandler: Send + Sync {
    /// 检测同批次内重复 SKU
    ///
    /// # 返回
    /// - Vec<(行号, sku)>: 重复记录列表（不包括第一次出现）
    fn detect_duplicates(&self, rows: &[DecodedRow]) -> Vec<(usize, String)>;
}
