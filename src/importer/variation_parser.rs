// ==========================================
// 商品目录同步 - 变体编码解析器
// ==========================================
// 职责: 解析 configurable_variations 字段并解析子 SKU 引用
// 语法: 变体以 `|` 分隔；变体内以 `,` 分隔 `key=value`
// 规则: 缺少 `=` 或 key/value 为空的片段按片段粒度丢弃
// ==========================================

use crate::domain::{Attributes, DecodedRow, ImportIssue, IssueKind, ParsedVariation};
use std::collections::HashMap;
use tracing::{debug, warn};

/// 变体分隔符
pub const VARIATION_SEPARATOR: char = '|';
/// 属性分隔符
pub const ATTRIBUTE_SEPARATOR: char = ',';
/// 键值分隔符
pub const KEY_VALUE_SEPARATOR: char = '=';
/// 子 SKU 引用键
pub const SKU_KEY: &str = "sku";

/// 已匹配到子记录的变体
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVariation<'a> {
    pub child_sku: String,
    pub attributes: Attributes,
    pub record: &'a DecodedRow,
}

/// 单个父商品的变体解析结果
#[derive(Debug, Clone, Default)]
pub struct VariationResolution<'a> {
    pub resolved: Vec<ResolvedVariation<'a>>,
    pub issues: Vec<ImportIssue>,
}

pub struct VariationParser;

impl VariationParser {
    /// 解析编码字段（仅语法层，不做 SKU 匹配）
    ///
    /// # 返回
    /// - 含 `sku` 的变体列表，顺序与编码一致
    pub fn parse(&self, encoded: &str) -> Vec<ParsedVariation> {
        encoded
            .split(VARIATION_SEPARATOR)
            .filter_map(|entry| self.parse_entry(entry))
            .collect()
    }

    fn parse_entry(&self, entry: &str) -> Option<ParsedVariation> {
        let mut child_sku: Option<String> = None;
        let mut attributes = Attributes::new();

        for token in entry.split(ATTRIBUTE_SEPARATOR) {
            let Some((key, value)) = token.split_once(KEY_VALUE_SEPARATOR) else {
                if !token.trim().is_empty() {
                    debug!(token = %token, "变体片段缺少 '='，已忽略");
                }
                continue;
            };

            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                debug!(token = %token, "变体片段键或值为空，已忽略");
                continue;
            }

            if key == SKU_KEY {
                child_sku = Some(value.to_string());
            } else {
                attributes.insert(key.to_string(), value.to_string());
            }
        }

        match child_sku {
            Some(child_sku) => Some(ParsedVariation {
                child_sku,
                attributes,
            }),
            None => {
                if !entry.trim().is_empty() {
                    debug!(entry = %entry, "变体缺少 sku，已丢弃");
                }
                None
            }
        }
    }

    /// 解析编码字段并在记录索引中匹配子 SKU
    ///
    /// # 参数
    /// - parent_sku: 父商品 SKU（用于报告与自引用检测）
    /// - encoded: 变体编码字段（可缺失）
    /// - lookup: 全部有效记录（SKU → 记录）
    ///
    /// # 说明
    /// - 未匹配的变体被丢弃并记录警告，其余变体继续处理
    pub fn resolve<'a>(
        &self,
        parent_sku: &str,
        encoded: Option<&str>,
        lookup: &HashMap<&str, &'a DecodedRow>,
    ) -> VariationResolution<'a> {
        let mut resolution = VariationResolution::default();
        let Some(encoded) = encoded else {
            return resolution;
        };

        for variation in self.parse(encoded) {
            if variation.child_sku == parent_sku {
                warn!(parent_sku = %parent_sku, "变体引用了父商品自身，已忽略");
                resolution.issues.push(ImportIssue::warning(
                    IssueKind::SelfReference,
                    Some(parent_sku),
                    format!("{} 的变体引用了自身", parent_sku),
                ));
                continue;
            }

            match lookup.get(variation.child_sku.as_str()) {
                Some(&record) => resolution.resolved.push(ResolvedVariation {
                    child_sku: variation.child_sku,
                    attributes: variation.attributes,
                    record,
                }),
                None => {
                    warn!(
                        parent_sku = %parent_sku,
                        child_sku = %variation.child_sku,
                        "变体引用的子 SKU 不存在或不完整"
                    );
                    resolution.issues.push(ImportIssue::warning(
                        IssueKind::UnresolvedChild,
                        Some(&variation.child_sku),
                        format!(
                            "{} 引用的子 SKU {} 不存在或不完整",
                            parent_sku, variation.child_sku
                        ),
                    ));
                }
            }
        }

        resolution
    }
}
