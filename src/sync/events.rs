// ==========================================
// 商品目录同步 - 表格行事件与整表替换
// ==========================================
// 职责: 定义展示层 → 同步层的行变更通知，以及同步层 → 展示层的整表替换回调
// 说明: 同步层定义 trait，展示层实现适配器
// ==========================================

use crate::domain::ProductNode;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ==========================================
// 行变更通知
// ==========================================

/// 展示层发出的行变更通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowChangeEvent {
    /// 单元格编辑（整行当前值，含子行）
    CellEdited {
        node: ProductNode,
        parent_id: Option<String>,
    },
    /// 新增行
    RowAdded {
        node: ProductNode,
        parent_id: Option<String>,
    },
    /// 删除行
    RowDeleted { id: String },
}

impl RowChangeEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowChangeEvent::CellEdited { .. } => "CellEdited",
            RowChangeEvent::RowAdded { .. } => "RowAdded",
            RowChangeEvent::RowDeleted { .. } => "RowDeleted",
        }
    }
}

// ==========================================
// 整表替换 Trait
// ==========================================

/// 展示层整表替换回调
///
/// # 实现说明
/// - 只接收完整森林（失败时为空森林），不会收到中间结果
pub trait RowReplaceSink: Send + Sync {
    fn replace_all(&self, forest: &[ProductNode]);
}

/// 空操作实现
///
/// 用于无展示层的场景（命令行 / 单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpRowSink;

impl RowReplaceSink for NoOpRowSink {
    fn replace_all(&self, forest: &[ProductNode]) {
        tracing::debug!(rows = forest.len(), "NoOpRowSink: 跳过整表替换");
    }
}

/// 记录每次替换内容的实现（预览 / 测试）
#[derive(Debug, Clone, Default)]
pub struct RecordingRowSink {
    replaced: Arc<Mutex<Vec<Vec<ProductNode>>>>,
}

impl RecordingRowSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 历次替换的森林
    pub fn snapshots(&self) -> Vec<Vec<ProductNode>> {
        self.replaced
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// 最近一次替换的森林
    pub fn latest(&self) -> Option<Vec<ProductNode>> {
        self.replaced.lock().ok().and_then(|r| r.last().cloned())
    }
}

impl RowReplaceSink for RecordingRowSink {
    fn replace_all(&self, forest: &[ProductNode]) {
        if let Ok(mut replaced) = self.replaced.lock() {
            replaced.push(forest.to_vec());
        }
    }
}
