// ==========================================
// 商品目录同步 - 领域枚举类型
// ==========================================
// 职责: 商品类型 / 上下架状态 / 导入问题分级
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ProductKind - 商品类型
// ==========================================
// 说明: 类型字段显式携带，不由是否有子节点推断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Configurable,
    Bundle,
    #[default]
    Simple,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Configurable => "configurable",
            ProductKind::Bundle => "bundle",
            ProductKind::Simple => "simple",
        }
    }

    /// 从源数据解析类型（未知值按 simple 处理）
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "configurable" => ProductKind::Configurable,
            "bundle" => ProductKind::Bundle,
            _ => ProductKind::Simple,
        }
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// ProductStatus - 上下架状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Enabled,
    #[default]
    Disabled,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Enabled => "enabled",
            ProductStatus::Disabled => "disabled",
        }
    }

    /// 解析持久化值（仅识别规范写法，其他视为 disabled）
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("enabled") {
            ProductStatus::Enabled
        } else {
            ProductStatus::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, ProductStatus::Enabled)
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// IssueLevel / IssueKind - 导入问题分级
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueLevel {
    /// 记录被排除（校验拒绝）
    Error,
    /// 记录/变体被丢弃，但整体继续
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    /// SKU 缺失
    MissingSku,
    /// 无法确定名称
    MissingName,
    /// 同一导入内 SKU 重复
    DuplicateSku,
    /// 变体引用的子 SKU 不存在或不完整
    UnresolvedChild,
    /// 子 SKU 已被其他父商品认领
    ChildAlreadyClaimed,
    /// 变体引用了父商品自身
    SelfReference,
    /// 已展开的父商品被引用为子商品，或已被认领的子商品声明了变体
    NestedConfigurable,
    /// 可配置商品未解析出任何子商品
    NoChildren,
    /// 导入结果为空
    EmptyResult,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingSku => "MISSING_SKU",
            IssueKind::MissingName => "MISSING_NAME",
            IssueKind::DuplicateSku => "DUPLICATE_SKU",
            IssueKind::UnresolvedChild => "UNRESOLVED_CHILD",
            IssueKind::ChildAlreadyClaimed => "CHILD_ALREADY_CLAIMED",
            IssueKind::SelfReference => "SELF_REFERENCE",
            IssueKind::NestedConfigurable => "NESTED_CONFIGURABLE",
            IssueKind::NoChildren => "NO_CHILDREN",
            IssueKind::EmptyResult => "EMPTY_RESULT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_kind_parse() {
        assert_eq!(ProductKind::parse("configurable"), ProductKind::Configurable);
        assert_eq!(ProductKind::parse(" Bundle "), ProductKind::Bundle);
        assert_eq!(ProductKind::parse("virtual"), ProductKind::Simple);
        assert_eq!(ProductKind::parse(""), ProductKind::Simple);
    }

    #[test]
    fn test_product_status_roundtrip_str() {
        assert_eq!(ProductStatus::parse("enabled"), ProductStatus::Enabled);
        assert_eq!(ProductStatus::parse("ENABLED"), ProductStatus::Enabled);
        assert_eq!(ProductStatus::parse("disabled"), ProductStatus::Disabled);
        assert_eq!(ProductStatus::parse("whatever"), ProductStatus::Disabled);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ProductKind::Configurable).unwrap();
        assert_eq!(json, "\"configurable\"");
        let status: ProductStatus = serde_json::from_str("\"enabled\"").unwrap();
        assert_eq!(status, ProductStatus::Enabled);
    }
}
