// ==========================================
// 商品目录同步 - 层级树构建器
// ==========================================
// 职责: 有效记录 + 变体引用 → 父子商品森林
// 红线: 被认领为子商品的记录不得出现在顶层
// 红线: 顶层顺序与输入顺序一致（去除子商品后），不做隐式排序
// ==========================================

use crate::domain::{
    DecodedRow, ImportIssue, IssueKind, ProductKind, ProductNode, generate_id,
};
use crate::importer::field_mapper::attribute_keys;
use crate::importer::variation_parser::{ResolvedVariation, VariationParser};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// 顶层商品默认可见性
pub const DEFAULT_TOP_LEVEL_VISIBILITY: &str = "Catalog, Search";
/// 子商品默认可见性
pub const DEFAULT_CHILD_VISIBILITY: &str = "Not Visible Individually";

/// 建树结果
#[derive(Debug, Clone, Default)]
pub struct TreeBuild {
    pub forest: Vec<ProductNode>,
    pub child_count: usize,
    pub issues: Vec<ImportIssue>,
}

pub struct TreeBuilder {
    parser: VariationParser,
    top_level_visibility: String,
    child_visibility: String,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_LEVEL_VISIBILITY, DEFAULT_CHILD_VISIBILITY)
    }
}

impl TreeBuilder {
    pub fn new(top_level_visibility: impl Into<String>, child_visibility: impl Into<String>) -> Self {
        Self {
            parser: VariationParser,
            top_level_visibility: top_level_visibility.into(),
            child_visibility: child_visibility.into(),
        }
    }

    /// 构建森林
    ///
    /// # 参数
    /// - rows: 行解码通过且 SKU 已去重的记录（按输入顺序）
    ///
    /// # 规则
    /// 1. 仅 configurable 且带变体字段的记录展开子商品
    /// 2. 子商品按变体顺序追加；先认领者优先
    /// 3. 已被认领的记录不再展开，已展开的父商品不能被认领
    /// 4. 未解析出子商品的 configurable 仍保留在顶层（警告）
    pub fn build(&self, rows: &[DecodedRow]) -> TreeBuild {
        let lookup: HashMap<&str, &DecodedRow> =
            rows.iter().map(|r| (r.sku.as_str(), r)).collect();

        let mut nodes: Vec<ProductNode> = rows.iter().map(|r| self.top_level_node(r)).collect();
        let mut claimed: HashSet<String> = HashSet::new();
        let mut expanded: HashSet<String> = HashSet::new();
        let mut issues = Vec::new();

        for (row, node) in rows.iter().zip(nodes.iter_mut()) {
            if row.kind != ProductKind::Configurable || row.variations.is_none() {
                continue;
            }

            if claimed.contains(&row.sku) {
                warn!(sku = %row.sku, "已作为子商品的记录声明了变体，不再展开");
                issues.push(
                    ImportIssue::warning(
                        IssueKind::NestedConfigurable,
                        Some(&row.sku),
                        format!("{} 已作为子商品被认领，其变体被忽略", row.sku),
                    )
                    .at_row(row.row_number),
                );
                continue;
            }

            debug!(sku = %row.sku, "处理可配置商品变体");
            let resolution = self
                .parser
                .resolve(&row.sku, row.variations.as_deref(), &lookup);
            issues.extend(
                resolution
                    .issues
                    .into_iter()
                    .map(|issue| issue.at_row(row.row_number)),
            );

            for variation in resolution.resolved {
                if claimed.contains(&variation.child_sku) {
                    warn!(
                        parent_sku = %row.sku,
                        child_sku = %variation.child_sku,
                        "子 SKU 已被其他父商品认领"
                    );
                    issues.push(
                        ImportIssue::warning(
                            IssueKind::ChildAlreadyClaimed,
                            Some(&variation.child_sku),
                            format!("{} 已被其他父商品认领，{} 跳过该变体", variation.child_sku, row.sku),
                        )
                        .at_row(row.row_number),
                    );
                    continue;
                }
                if expanded.contains(&variation.child_sku) {
                    warn!(
                        parent_sku = %row.sku,
                        child_sku = %variation.child_sku,
                        "引用的子 SKU 本身是已展开的父商品"
                    );
                    issues.push(
                        ImportIssue::warning(
                            IssueKind::NestedConfigurable,
                            Some(&variation.child_sku),
                            format!("{} 已是父商品，不能作为 {} 的子商品", variation.child_sku, row.sku),
                        )
                        .at_row(row.row_number),
                    );
                    continue;
                }

                claimed.insert(variation.child_sku.clone());
                node.children.push(self.child_node(node.price, variation));
            }

            if node.children.is_empty() {
                warn!(sku = %row.sku, "可配置商品未找到有效子商品");
                issues.push(
                    ImportIssue::warning(
                        IssueKind::NoChildren,
                        Some(&row.sku),
                        format!("可配置商品 {} 未找到有效子商品", row.sku),
                    )
                    .at_row(row.row_number),
                );
            } else {
                debug!(sku = %row.sku, children = node.children.len(), "子商品挂接完成");
                expanded.insert(row.sku.clone());
            }
        }

        let forest: Vec<ProductNode> = nodes
            .into_iter()
            .filter(|n| !claimed.contains(&n.sku))
            .collect();

        info!(
            top_level = forest.len(),
            children = claimed.len(),
            "层级树构建完成"
        );

        TreeBuild {
            forest,
            child_count: claimed.len(),
            issues,
        }
    }

    fn top_level_node(&self, row: &DecodedRow) -> ProductNode {
        let mut attributes = row.attributes.clone();
        attributes.insert(
            attribute_keys::VISIBILITY.to_string(),
            row.visibility
                .clone()
                .unwrap_or_else(|| self.top_level_visibility.clone()),
        );

        ProductNode {
            id: generate_id(),
            sku: row.sku.clone(),
            name: row.name.clone(),
            kind: row.kind,
            price: row.price.unwrap_or(0.0),
            quantity: row.quantity,
            status: row.status,
            attributes,
            children: Vec::new(),
        }
    }

    /// 子商品字段来自匹配记录；价格缺失回退父价格；属性冲突时匹配记录优先
    fn child_node(&self, parent_price: f64, variation: ResolvedVariation<'_>) -> ProductNode {
        let record = variation.record;

        let mut attributes = variation.attributes;
        attributes.extend(record.attributes.clone());
        match &record.visibility {
            Some(v) => {
                attributes.insert(attribute_keys::VISIBILITY.to_string(), v.clone());
            }
            None => {
                attributes
                    .entry(attribute_keys::VISIBILITY.to_string())
                    .or_insert_with(|| self.child_visibility.clone());
            }
        }

        ProductNode {
            id: generate_id(),
            sku: variation.child_sku,
            name: record.name.clone(),
            kind: ProductKind::Simple,
            price: record.price.unwrap_or(parent_price),
            quantity: record.quantity,
            status: record.status,
            attributes,
            children: Vec::new(),
        }
    }
}
