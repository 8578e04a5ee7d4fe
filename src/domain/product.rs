// ==========================================
// 商品目录同步 - 商品领域模型
// ==========================================
// 职责: 树形商品节点 / 扁平持久化记录 / 导入中间结构 / 导入报告
// 红线: children 与 parent_id 不在同一表示中同时承载层级信息
// ==========================================

use crate::domain::types::{IssueKind, IssueLevel, ProductKind, ProductStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 扩展属性（颜色、尺码、选项标题、可见性等）
pub type Attributes = BTreeMap<String, String>;

/// 生成节点 ID
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

// ==========================================
// ProductNode - 树形商品节点
// ==========================================
// 用途: 导入结果 / 表格数据 / 写入入口
// 生命周期: 仅在单次导入或同步调用内
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductNode {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub kind: ProductKind,
    pub price: f64,
    pub quantity: u32,
    pub status: ProductStatus,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub children: Vec<ProductNode>,
}

impl ProductNode {
    /// 创建叶子节点（自动生成 ID）
    pub fn new(sku: impl Into<String>, name: impl Into<String>, kind: ProductKind) -> Self {
        Self {
            id: generate_id(),
            sku: sku.into(),
            name: name.into(),
            kind,
            price: 0.0,
            quantity: 0,
            status: ProductStatus::Disabled,
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// 节点自身字段转为扁平记录（不含子节点）
    pub fn to_record(&self, parent_id: Option<&str>) -> ProductRecord {
        ProductRecord {
            id: self.id.clone(),
            sku: self.sku.clone(),
            name: self.name.clone(),
            kind: self.kind,
            price: self.price,
            quantity: self.quantity,
            status: self.status,
            attributes: self.attributes.clone(),
            parent_id: parent_id.map(str::to_string),
        }
    }

    /// 子树节点总数（含自身）
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(ProductNode::subtree_len).sum::<usize>()
    }

    /// 按 SKU 查找（深度优先，区分大小写）
    pub fn find_by_sku(&self, sku: &str) -> Option<&ProductNode> {
        if self.sku == sku {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_by_sku(sku))
    }
}

/// 森林节点总数
pub fn forest_len(forest: &[ProductNode]) -> usize {
    forest.iter().map(ProductNode::subtree_len).sum()
}

// ==========================================
// ProductRecord - 扁平持久化记录
// ==========================================
// 用途: 存储适配器的输入/输出
// 说明: 层级关系仅由 parent_id 表达
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// 空字符串表示尚未持久化，由存储分配
    #[serde(default)]
    pub id: String,
    pub sku: String,
    pub name: String,
    pub kind: ProductKind,
    pub price: f64,
    pub quantity: u32,
    pub status: ProductStatus,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl ProductRecord {
    /// 转为不含子节点的树节点
    pub fn into_node(self) -> ProductNode {
        ProductNode {
            id: self.id,
            sku: self.sku,
            name: self.name,
            kind: self.kind,
            price: self.price,
            quantity: self.quantity,
            status: self.status,
            attributes: self.attributes,
            children: Vec::new(),
        }
    }
}

// ==========================================
// SyncBatch - 单次批量写入的数据块
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct SyncBatch {
    /// 块序号（从 0 开始）
    pub index: usize,
    pub records: Vec<ProductRecord>,
}

impl SyncBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ==========================================
// DecodedRow - 导入中间结构体
// ==========================================
// 用途: 行解码输出（文件解析 → 字段映射 → 此结构）
// 生命周期: 仅在导入流程内
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedRow {
    pub row_number: usize,
    pub sku: String,
    pub name: String,
    pub kind: ProductKind,
    /// None 表示源数据缺失或无法解析（子商品回退到父价格）
    pub price: Option<f64>,
    pub quantity: u32,
    pub status: ProductStatus,
    /// 源数据显式给出的可见性
    pub visibility: Option<String>,
    pub attributes: Attributes,
    /// 原样保留的变体编码字段，供变体解析器消费
    pub variations: Option<String>,
}

// ==========================================
// ParsedVariation - 解析后的单个变体
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedVariation {
    pub child_sku: String,
    pub attributes: Attributes,
}

// ==========================================
// ImportIssue / ImportReport - 导入问题与报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportIssue {
    pub row_number: Option<usize>,
    pub sku: Option<String>,
    pub level: IssueLevel,
    pub kind: IssueKind,
    pub message: String,
}

impl ImportIssue {
    pub fn warning(kind: IssueKind, sku: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            row_number: None,
            sku: sku.map(str::to_string),
            level: IssueLevel::Warning,
            kind,
            message: message.into(),
        }
    }

    pub fn error(kind: IssueKind, sku: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            row_number: None,
            sku: sku.map(str::to_string),
            level: IssueLevel::Error,
            kind,
            message: message.into(),
        }
    }

    pub fn at_row(mut self, row_number: usize) -> Self {
        self.row_number = Some(row_number);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub batch_id: String,
    pub total_rows: usize,
    pub accepted_rows: usize,
    pub rejected_rows: usize,
    pub top_level_count: usize,
    pub child_count: usize,
    /// 顶层商品按类型计数
    pub type_summary: BTreeMap<String, usize>,
    pub issues: Vec<ImportIssue>,
}

impl ImportReport {
    pub fn warnings(&self) -> impl Iterator<Item = &ImportIssue> {
        self.issues.iter().filter(|i| i.level == IssueLevel::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ImportIssue> {
        self.issues.iter().filter(|i| i.level == IssueLevel::Error)
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &ImportIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }
}

/// 导入结果：最终森林 + 报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub forest: Vec<ProductNode>,
    pub report: ImportReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> ProductNode {
        let mut parent = ProductNode::new("TS-1", "Shirt", ProductKind::Configurable);
        parent.children.push(ProductNode::new("TS-1-S", "Shirt S", ProductKind::Simple));
        parent.children.push(ProductNode::new("TS-1-M", "Shirt M", ProductKind::Simple));
        parent
    }

    #[test]
    fn test_subtree_len_and_find() {
        let tree = sample_tree();
        assert_eq!(tree.subtree_len(), 3);
        assert_eq!(forest_len(&[tree.clone(), ProductNode::new("X", "X", ProductKind::Simple)]), 4);
        assert_eq!(tree.find_by_sku("TS-1-M").map(|n| n.name.as_str()), Some("Shirt M"));
        assert!(tree.find_by_sku("ts-1-m").is_none());
    }

    #[test]
    fn test_to_record_and_back() {
        let tree = sample_tree();
        let child = &tree.children[0];
        let record = child.to_record(Some(&tree.id));
        assert_eq!(record.parent_id.as_deref(), Some(tree.id.as_str()));
        assert_eq!(record.sku, "TS-1-S");

        let node = record.into_node();
        assert_eq!(node, *child);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(generate_id(), generate_id());
    }
}
