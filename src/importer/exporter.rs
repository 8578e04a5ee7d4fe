// ==========================================
// 商品目录同步 - CSV 导出器
// ==========================================
// 职责: 商品森林 → 可再次导入的 CSV（属性编码格式）
// 规则: 父商品先于其子商品输出；子商品回写到父商品的 configurable_variations
// ==========================================

use crate::domain::{ProductKind, ProductNode};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{attribute_keys, columns};
use crate::importer::variation_parser::{
    ATTRIBUTE_SEPARATOR, KEY_VALUE_SEPARATOR, SKU_KEY, VARIATION_SEPARATOR,
};
use csv::Writer;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// 导出列（顺序固定）
pub const EXPORT_COLUMNS: [&str; 12] = [
    columns::SKU,
    columns::NAME,
    columns::PRODUCT_TYPE,
    columns::PRICE,
    columns::QTY,
    columns::STATUS,
    columns::VISIBILITY,
    columns::COLOR,
    columns::SIZE,
    columns::OPTION_TITLE,
    columns::IS_REQUIRED,
    columns::CONFIGURABLE_VARIATIONS,
];

pub struct CatalogExporter;

impl CatalogExporter {
    /// 导出到文件
    pub fn export_to_path(&self, forest: &[ProductNode], file_path: &Path) -> ImportResult<usize> {
        let file = File::create(file_path)?;
        let rows = self.export_to_writer(forest, file)?;
        info!(file_path = %file_path.display(), rows = rows, "商品目录导出完成");
        Ok(rows)
    }

    /// 导出为 CSV 文本
    pub fn export_to_string(&self, forest: &[ProductNode]) -> ImportResult<String> {
        let mut buffer = Vec::new();
        self.export_to_writer(forest, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ImportError::ExportError(e.to_string()))
    }

    /// 导出到任意写入端，返回写出的数据行数
    pub fn export_to_writer<W: Write>(&self, forest: &[ProductNode], sink: W) -> ImportResult<usize> {
        let mut writer = Writer::from_writer(sink);
        writer
            .write_record(EXPORT_COLUMNS)
            .map_err(|e| ImportError::ExportError(e.to_string()))?;

        let mut rows = 0;
        for node in forest {
            rows += self.write_subtree(&mut writer, node)?;
        }

        writer
            .flush()
            .map_err(|e| ImportError::ExportError(e.to_string()))?;
        Ok(rows)
    }

    fn write_subtree<W: Write>(&self, writer: &mut Writer<W>, node: &ProductNode) -> ImportResult<usize> {
        writer
            .write_record(self.row_of(node)?)
            .map_err(|e| ImportError::ExportError(e.to_string()))?;

        let mut rows = 1;
        for child in &node.children {
            rows += self.write_subtree(writer, child)?;
        }
        Ok(rows)
    }

    fn row_of(&self, node: &ProductNode) -> ImportResult<Vec<String>> {
        let attr = |key: &str| node.attributes.get(key).cloned().unwrap_or_default();
        let is_required = match node.attributes.get(attribute_keys::IS_REQUIRED).map(String::as_str) {
            Some("true") => "1".to_string(),
            Some(_) => "0".to_string(),
            None => String::new(),
        };
        let variations = if node.kind == ProductKind::Configurable {
            encode_variations(&node.children)?
        } else {
            String::new()
        };

        Ok(vec![
            node.sku.clone(),
            node.name.clone(),
            node.kind.as_str().to_string(),
            node.price.to_string(),
            node.quantity.to_string(),
            if node.status.is_enabled() { "1" } else { "0" }.to_string(),
            attr(attribute_keys::VISIBILITY),
            attr(attribute_keys::COLOR),
            attr(attribute_keys::SIZE),
            attr(attribute_keys::OPTION_TITLE),
            is_required,
            variations,
        ])
    }
}

/// 子商品 → 变体编码字段（可见性不参与编码，空值省略）
///
/// # 返回
/// - Err(ExportError): SKU / 属性键 / 属性值含分隔符，编码后无法原样导入
pub fn encode_variations(children: &[ProductNode]) -> ImportResult<String> {
    let mut entries = Vec::with_capacity(children.len());
    for child in children {
        ensure_encodable(&child.sku, SKU_KEY, &child.sku, false)?;
        let mut tokens = vec![format!("{}{}{}", SKU_KEY, KEY_VALUE_SEPARATOR, child.sku)];

        for (key, value) in &child.attributes {
            if key.as_str() == attribute_keys::VISIBILITY || value.trim().is_empty() {
                continue;
            }
            ensure_encodable(&child.sku, key, key, true)?;
            ensure_encodable(&child.sku, key, value, false)?;
            tokens.push(format!("{}{}{}", key, KEY_VALUE_SEPARATOR, value));
        }
        entries.push(tokens.join(&ATTRIBUTE_SEPARATOR.to_string()));
    }
    Ok(entries.join(&VARIATION_SEPARATOR.to_string()))
}

/// 分隔符检查（键还不得含 '='，值中的 '=' 按首个 '=' 切分可保留）
fn ensure_encodable(sku: &str, key: &str, text: &str, is_key: bool) -> ImportResult<()> {
    let reserved = text.contains(VARIATION_SEPARATOR)
        || text.contains(ATTRIBUTE_SEPARATOR)
        || (is_key && text.contains(KEY_VALUE_SEPARATOR));
    if reserved {
        warn!(sku = %sku, key = %key, text = %text, "变体字段含保留分隔符，无法导出");
        return Err(ImportError::ExportError(format!(
            "子商品 {} 的 {} 含保留分隔符（'{}' / '{}'）: {}",
            sku, key, VARIATION_SEPARATOR, ATTRIBUTE_SEPARATOR, text
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductStatus;
    use crate::importer::catalog_importer_trait::CatalogImporter;
    use crate::importer::CatalogImporterImpl;

    fn shirt() -> ProductNode {
        let mut parent = ProductNode::new("TS-1", "Shirt", ProductKind::Configurable);
        parent.price = 20.0;
        parent.status = ProductStatus::Enabled;
        for size in ["S", "M"] {
            let mut child = ProductNode::new(format!("TS-1-{}", size), format!("Shirt {}", size), ProductKind::Simple);
            child.price = 20.0;
            child.quantity = 3;
            child.attributes.insert("color".to_string(), "Black".to_string());
            child.attributes.insert("size".to_string(), size.to_string());
            child
                .attributes
                .insert("visibility".to_string(), "Not Visible Individually".to_string());
            parent.children.push(child);
        }
        parent
            .attributes
            .insert("visibility".to_string(), "Catalog, Search".to_string());
        parent
    }

    #[test]
    fn test_encode_variations() {
        let encoded = encode_variations(&shirt().children).unwrap();
        assert_eq!(
            encoded,
            "sku=TS-1-S,color=Black,size=S|sku=TS-1-M,color=Black,size=M"
        );
    }

    #[test]
    fn test_export_rejects_separator_in_variation_value() {
        let mut parent = shirt();
        parent.children[1]
            .attributes
            .insert("material".to_string(), "Wool, Cotton".to_string());

        let result = CatalogExporter.export_to_string(&[parent]);
        assert!(matches!(result, Err(ImportError::ExportError(_))));
    }

    #[test]
    fn test_encode_rejects_separator_in_key_or_sku() {
        let mut parent = shirt();
        parent.children[0]
            .attributes
            .insert("a|b".to_string(), "x".to_string());
        assert!(encode_variations(&parent.children).is_err());

        let mut parent = shirt();
        parent.children[0].sku = "TS,1".to_string();
        assert!(encode_variations(&parent.children).is_err());
    }

    #[test]
    fn test_encode_keeps_equals_in_value() {
        let mut parent = shirt();
        parent.children.truncate(1);
        parent.children[0].attributes.clear();
        parent.children[0]
            .attributes
            .insert("formula".to_string(), "a=b".to_string());

        let encoded = encode_variations(&parent.children).unwrap();
        assert_eq!(encoded, "sku=TS-1-S,formula=a=b");
        let parsed = crate::importer::VariationParser.parse(&encoded);
        assert_eq!(parsed[0].attributes.get("formula").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn test_export_parent_before_children() {
        let csv = CatalogExporter.export_to_string(&[shirt()]).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("sku,name,product_type"));
        assert!(lines[1].starts_with("TS-1,Shirt,configurable"));
        assert!(lines[2].starts_with("TS-1-S,"));
        assert!(lines[3].starts_with("TS-1-M,"));
    }

    #[test]
    fn test_export_then_import_reproduces_forest() {
        let mut sticker = ProductNode::new("ST-1", "Sticker", ProductKind::Simple);
        sticker.price = 1.25;
        sticker
            .attributes
            .insert("visibility".to_string(), "Catalog, Search".to_string());
        let forest = vec![shirt(), sticker];

        let csv = CatalogExporter.export_to_string(&forest).unwrap();
        let outcome = CatalogImporterImpl::default().import_csv_str(&csv).unwrap();

        assert_eq!(outcome.forest.len(), 2);
        for (expected, actual) in forest.iter().zip(outcome.forest.iter()) {
            assert_eq!(actual.sku, expected.sku);
            assert_eq!(actual.name, expected.name);
            assert_eq!(actual.kind, expected.kind);
            assert_eq!(actual.price, expected.price);
            assert_eq!(actual.status, expected.status);
            assert_eq!(actual.attributes, expected.attributes);
            let child_skus: Vec<_> = actual.children.iter().map(|c| c.sku.as_str()).collect();
            let expected_skus: Vec<_> = expected.children.iter().map(|c| c.sku.as_str()).collect();
            assert_eq!(child_skus, expected_skus);
            for (e, a) in expected.children.iter().zip(actual.children.iter()) {
                assert_eq!(a.attributes, e.attributes);
                assert_eq!(a.quantity, e.quantity);
            }
        }
        assert!(outcome.report.issues.is_empty());
    }

    #[tokio::test]
    async fn test_export_to_path() {
        let temp_file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let rows = CatalogExporter.export_to_path(&[shirt()], temp_file.path()).unwrap();
        assert_eq!(rows, 3);

        let outcome = CatalogImporterImpl::default()
            .import_from_file(temp_file.path())
            .await
            .unwrap();
        assert_eq!(outcome.forest[0].children.len(), 2);
    }
}
