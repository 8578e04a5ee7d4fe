// ==========================================
// 商品目录同步 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 数值强制转换 / 状态真值归一
// ==========================================

use crate::domain::ProductStatus;
use crate::importer::catalog_importer_trait::DataCleaner as DataCleanerTrait;

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn normalize_status(&self, value: Option<&str>) -> ProductStatus {
        match self.normalize_null(value) {
            Some(v) if v == "1" || v.eq_ignore_ascii_case("enabled") => ProductStatus::Enabled,
            _ => ProductStatus::Disabled,
        }
    }

    fn parse_price(&self, value: Option<&str>) -> Option<f64> {
        self.normalize_null(value)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|p| p.is_finite() && *p >= 0.0)
    }

    fn parse_quantity(&self, value: Option<&str>) -> u32 {
        let Some(v) = self.normalize_null(value) else {
            return 0;
        };
        if let Ok(q) = v.parse::<u32>() {
            return q;
        }
        // 兼容 "3.0" 这类导出格式
        match v.parse::<f64>() {
            Ok(f) if f.is_finite() && f >= 0.0 && f <= u32::MAX as f64 => f.trunc() as u32,
            _ => 0,
        }
    }

    fn parse_flag(&self, value: Option<&str>) -> bool {
        matches!(self.normalize_null(value).as_deref(), Some("1"))
    }
}

impl DataCleaner {
    /// 合并两个状态来源（任一为真值即启用）
    pub fn merge_status(&self, primary: Option<&str>, secondary: Option<&str>) -> ProductStatus {
        if self.normalize_status(primary).is_enabled() || self.normalize_status(secondary).is_enabled() {
            ProductStatus::Enabled
        } else {
            ProductStatus::Disabled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_null() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.normalize_null(Some("  ")), None);
        assert_eq!(cleaner.normalize_null(Some("")), None);
        assert_eq!(cleaner.normalize_null(Some("  value  ")), Some("value".to_string()));
        assert_eq!(cleaner.normalize_null(None), None);
    }

    #[test]
    fn test_normalize_status_truthy_encodings() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.normalize_status(Some("1")), ProductStatus::Enabled);
        assert_eq!(cleaner.normalize_status(Some(" 1 ")), ProductStatus::Enabled);
        assert_eq!(cleaner.normalize_status(Some("Enabled")), ProductStatus::Enabled);
        assert_eq!(cleaner.normalize_status(Some("enabled")), ProductStatus::Enabled);
        assert_eq!(cleaner.normalize_status(Some("2")), ProductStatus::Disabled);
        assert_eq!(cleaner.normalize_status(Some("0")), ProductStatus::Disabled);
        assert_eq!(cleaner.normalize_status(None), ProductStatus::Disabled);
    }

    #[test]
    fn test_merge_status() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.merge_status(None, Some("1")), ProductStatus::Enabled);
        assert_eq!(cleaner.merge_status(Some("0"), Some("0")), ProductStatus::Disabled);
    }

    #[test]
    fn test_parse_price() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_price(Some("19.99")), Some(19.99));
        assert_eq!(cleaner.parse_price(Some("0")), Some(0.0));
        assert_eq!(cleaner.parse_price(Some("abc")), None);
        assert_eq!(cleaner.parse_price(Some("-3")), None);
        assert_eq!(cleaner.parse_price(None), None);
    }

    #[test]
    fn test_parse_quantity() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_quantity(Some("12")), 12);
        assert_eq!(cleaner.parse_quantity(Some("3.0")), 3);
        assert_eq!(cleaner.parse_quantity(Some("-4")), 0);
        assert_eq!(cleaner.parse_quantity(Some("many")), 0);
        assert_eq!(cleaner.parse_quantity(None), 0);
    }

    #[test]
    fn test_parse_flag() {
        let cleaner = DataCleaner;
        assert!(cleaner.parse_flag(Some("1")));
        assert!(!cleaner.parse_flag(Some("0")));
        assert!(!cleaner.parse_flag(Some("yes")));
        assert!(!cleaner.parse_flag(None));
    }
}
