// ==========================================
// 商品目录同步 - 树形 / 扁平表示转换
// ==========================================
// 职责: 森林 ↔ 带 parent_id 的扁平记录；扁平记录 → 定长数据块
// 红线: 扁平化为深度优先，父记录先于其子记录
// 红线: 无法挂接的记录丢弃并告警，不中断加载
// 红线: 写入前节点 id 与存储中同 SKU 记录对齐，parent_id 才能指向已存在的行
// ==========================================

use crate::domain::{generate_id, ProductNode, ProductRecord, SyncBatch};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// 孤儿记录原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrphanReason {
    /// parent_id 指向不存在的记录
    MissingParent,
    /// 父记录存在但无法从任何顶层记录到达（环引用或重复 id）
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanRecord {
    pub record: ProductRecord,
    pub reason: OrphanReason,
}

/// 加载结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedForest {
    pub forest: Vec<ProductNode>,
    pub orphans: Vec<OrphanRecord>,
}

/// 森林 → 扁平记录（深度优先，父先子后，parent_id 在展开时赋值）
pub fn flatten_forest(forest: &[ProductNode]) -> Vec<ProductRecord> {
    let mut records = Vec::with_capacity(crate::domain::forest_len(forest));
    for root in forest {
        flatten_into(root, None, &mut records);
    }
    records
}

fn flatten_into(node: &ProductNode, parent_id: Option<&str>, out: &mut Vec<ProductRecord>) {
    out.push(node.to_record(parent_id));
    for child in &node.children {
        flatten_into(child, Some(&node.id), out);
    }
}

fn parent_of(record: &ProductRecord) -> Option<&str> {
    record.parent_id.as_deref().filter(|p| !p.is_empty())
}

/// 扁平记录 → 森林
///
/// # 规则
/// 1. 按 id 建索引（重复 id 以首次出现为准）
/// 2. 无 parent_id 的记录进入顶层
/// 3. 其余记录按接收顺序挂到父记录下
/// 4. parent_id 无法解析的记录作为孤儿返回
pub fn build_forest(records: Vec<ProductRecord>) -> LoadedForest {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        index.entry(record.id.clone()).or_insert(i);
    }

    let mut roots = Vec::new();
    let mut children: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        match parent_of(record) {
            None => roots.push(i),
            Some(parent_id) if index.contains_key(parent_id) => {
                children.entry(parent_id.to_string()).or_default().push(i);
            }
            Some(_) => {}
        }
    }

    let mut slots: Vec<Option<ProductRecord>> = records.into_iter().map(Some).collect();
    let forest: Vec<ProductNode> = roots
        .into_iter()
        .filter_map(|i| assemble(i, &mut slots, &children))
        .collect();

    let orphans: Vec<OrphanRecord> = slots
        .into_iter()
        .flatten()
        .map(|record| {
            let reason = match parent_of(&record) {
                Some(parent_id) if index.contains_key(parent_id) => OrphanReason::Unreachable,
                _ => OrphanReason::MissingParent,
            };
            warn!(
                record_id = %record.id,
                sku = %record.sku,
                parent_id = ?record.parent_id,
                reason = ?reason,
                "孤儿记录已从树中丢弃"
            );
            OrphanRecord { record, reason }
        })
        .collect();

    LoadedForest { forest, orphans }
}

fn assemble(
    i: usize,
    slots: &mut [Option<ProductRecord>],
    children: &HashMap<String, Vec<usize>>,
) -> Option<ProductNode> {
    let mut node = slots.get_mut(i)?.take()?.into_node();
    if let Some(child_indices) = children.get(&node.id) {
        for &c in child_indices {
            if let Some(child) = assemble(c, slots, children) {
                node.children.push(child);
            }
        }
    }
    Some(node)
}

/// 森林 id 与存储对齐
///
/// # 规则
/// 1. 节点 id 已存在于存储中：保留
/// 2. 否则存储中有同 SKU 记录且其 id 未被其他节点占用：改用该 id
/// 3. 否则 id 为空时分配新 id
///
/// # 返回
/// - 对齐后的森林（子节点随父节点一起改写）
/// - 改用存储 id 的节点数
pub fn adopt_stored_ids(forest: &[ProductNode], stored: &[ProductRecord]) -> (Vec<ProductNode>, usize) {
    let stored_ids: HashSet<&str> = stored.iter().map(|r| r.id.as_str()).collect();
    let mut by_sku: HashMap<&str, &str> = HashMap::with_capacity(stored.len());
    for record in stored {
        by_sku.entry(record.sku.as_str()).or_insert(record.id.as_str());
    }

    // 先登记保留原 id 的节点，避免同一存储 id 被两个节点占用
    let mut taken: HashSet<String> = HashSet::new();
    collect_kept_ids(forest, &stored_ids, &mut taken);

    let mut remapped = 0;
    let aligned = forest
        .iter()
        .map(|node| align_node(node, &stored_ids, &by_sku, &mut taken, &mut remapped))
        .collect();
    (aligned, remapped)
}

fn collect_kept_ids(nodes: &[ProductNode], stored_ids: &HashSet<&str>, taken: &mut HashSet<String>) {
    for node in nodes {
        if stored_ids.contains(node.id.as_str()) {
            taken.insert(node.id.clone());
        }
        collect_kept_ids(&node.children, stored_ids, taken);
    }
}

fn align_node(
    node: &ProductNode,
    stored_ids: &HashSet<&str>,
    by_sku: &HashMap<&str, &str>,
    taken: &mut HashSet<String>,
    remapped: &mut usize,
) -> ProductNode {
    let mut aligned = ProductNode {
        children: Vec::with_capacity(node.children.len()),
        ..node.clone()
    };

    if !stored_ids.contains(node.id.as_str()) {
        match by_sku.get(node.sku.as_str()) {
            Some(&existing) if !taken.contains(existing) => {
                debug!(sku = %node.sku, from = %node.id, to = %existing, "节点 id 对齐到存储记录");
                aligned.id = existing.to_string();
                taken.insert(aligned.id.clone());
                *remapped += 1;
            }
            _ if aligned.id.is_empty() => aligned.id = generate_id(),
            _ => {}
        }
    }

    for child in &node.children {
        aligned
            .children
            .push(align_node(child, stored_ids, by_sku, taken, remapped));
    }
    aligned
}

/// 扁平记录 → 定长数据块（最后一块可不足）
pub fn into_batches(records: Vec<ProductRecord>, chunk_size: usize) -> Vec<SyncBatch> {
    let size = chunk_size.max(1);
    let mut batches = Vec::with_capacity(records.len().div_ceil(size));
    let mut iter = records.into_iter().peekable();
    while iter.peek().is_some() {
        let chunk: Vec<ProductRecord> = iter.by_ref().take(size).collect();
        batches.push(SyncBatch {
            index: batches.len(),
            records: chunk,
        });
    }
    batches
}
