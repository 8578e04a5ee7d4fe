// ==========================================
// 商品目录同步 - 字段映射器（行解码）实现
// ==========================================
// 职责: 源字段 → DecodedRow + 类型强制转换 + 有效性判定
// 规则: SKU 必填；name / product_name 至少其一
// ==========================================

use crate::domain::{Attributes, DecodedRow, ImportIssue, IssueKind, ProductKind};
use crate::importer::catalog_importer_trait::{
    DataCleaner as DataCleanerTrait, FieldMapper as FieldMapperTrait, RawRow,
};
use crate::importer::data_cleaner::DataCleaner;

/// 源数据列名
pub mod columns {
    pub const SKU: &str = "sku";
    pub const NAME: &str = "name";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const PRODUCT_TYPE: &str = "product_type";
    pub const TYPE: &str = "type";
    pub const PRICE: &str = "price";
    pub const QTY: &str = "qty";
    pub const QUANTITY: &str = "quantity";
    pub const STATUS: &str = "status";
    pub const PRODUCT_STATUS: &str = "product_status";
    pub const VISIBILITY: &str = "visibility";
    pub const OPTION_TITLE: &str = "option_title";
    pub const IS_REQUIRED: &str = "is_required";
    pub const CONFIGURABLE_VARIATIONS: &str = "configurable_variations";
    pub const COLOR: &str = "color";
    pub const SIZE: &str = "size";
}

/// 节点属性键
pub mod attribute_keys {
    pub const VISIBILITY: &str = "visibility";
    pub const OPTION_TITLE: &str = "option_title";
    pub const IS_REQUIRED: &str = "is_required";
    pub const COLOR: &str = "color";
    pub const SIZE: &str = "size";
}

pub struct FieldMapper {
    cleaner: DataCleaner,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMapper {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 提取字符串字段，支持多个可能的列名（别名）
    fn get_string(&self, row: &RawRow, key: &str) -> Option<String> {
        let aliases: &[&str] = match key {
            columns::NAME => &[columns::NAME, columns::PRODUCT_NAME],
            columns::PRODUCT_TYPE => &[columns::PRODUCT_TYPE, columns::TYPE],
            columns::QTY => &[columns::QTY, columns::QUANTITY],
            _ => return self.cleaner.normalize_null(row.get(key).map(String::as_str)),
        };

        aliases
            .iter()
            .find_map(|alias| self.cleaner.normalize_null(row.get(*alias).map(String::as_str)))
    }

    fn raw(&self, row: &RawRow, key: &str) -> Option<String> {
        self.cleaner.normalize_null(row.get(key).map(String::as_str))
    }

    /// 抽取扩展属性（颜色/尺码/捆绑选项）
    fn extract_attributes(&self, row: &RawRow) -> Attributes {
        let mut attributes = Attributes::new();

        if let Some(color) = self.raw(row, columns::COLOR) {
            attributes.insert(attribute_keys::COLOR.to_string(), color);
        }
        if let Some(size) = self.raw(row, columns::SIZE) {
            attributes.insert(attribute_keys::SIZE.to_string(), size);
        }

        // 捆绑商品选项行
        if let Some(title) = self.raw(row, columns::OPTION_TITLE) {
            attributes.insert(attribute_keys::OPTION_TITLE.to_string(), title);
            let required = self
                .cleaner
                .parse_flag(row.get(columns::IS_REQUIRED).map(String::as_str));
            attributes.insert(attribute_keys::IS_REQUIRED.to_string(), required.to_string());
        }

        attributes
    }
}

impl FieldMapperTrait for FieldMapper {
    fn decode_row(&self, row: &RawRow, row_number: usize) -> Result<DecodedRow, ImportIssue> {
        let sku = self.raw(row, columns::SKU).ok_or_else(|| {
            ImportIssue::error(IssueKind::MissingSku, None, "SKU 为空，记录被排除").at_row(row_number)
        })?;

        let name = self.get_string(row, columns::NAME).ok_or_else(|| {
            ImportIssue::error(
                IssueKind::MissingName,
                Some(&sku),
                format!("无法确定商品名称: {}", sku),
            )
            .at_row(row_number)
        })?;

        let kind = self
            .get_string(row, columns::PRODUCT_TYPE)
            .map(|t| ProductKind::parse(&t))
            .unwrap_or_default();

        Ok(DecodedRow {
            row_number,
            sku,
            name,
            kind,
            price: self.cleaner.parse_price(row.get(columns::PRICE).map(String::as_str)),
            quantity: self
                .cleaner
                .parse_quantity(self.get_string(row, columns::QTY).as_deref()),
            status: self.cleaner.merge_status(
                row.get(columns::STATUS).map(String::as_str),
                row.get(columns::PRODUCT_STATUS).map(String::as_str),
            ),
            visibility: self.raw(row, columns::VISIBILITY),
            attributes: self.extract_attributes(row),
            variations: self.raw(row, columns::CONFIGURABLE_VARIATIONS),
        })
    }
}
