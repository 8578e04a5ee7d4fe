// ==========================================
// 商品目录同步 - 冲突处理器实现
// ==========================================
// 职责: 检测同一导入内重复 SKU（首次出现者保留）
// ==========================================

use crate::domain::DecodedRow;
use crate::importer::catalog_importer_trait::ConflictHandler as ConflictHandlerTrait;
use std::collections::HashSet;

pub struct ConflictHandler;

impl ConflictHandlerTrait for ConflictHandler {
    /// 检测同批次内重复 SKU
    ///
    /// # 返回
    /// - Vec<(行号, sku)>: 重复记录列表（不包括第一次出现）
    fn detect_duplicates(&self, rows: &[DecodedRow]) -> Vec<(usize, String)> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut duplicates = Vec::new();

        for row in rows {
            if !seen.insert(row.sku.as_str()) {
                duplicates.push((row.row_number, row.sku.clone()));
            }
        }

        duplicates
    }
}
