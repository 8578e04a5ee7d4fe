// ==========================================
// 商品目录同步 - 同步配置
// ==========================================
// 职责: 默认值 + 环境变量覆写
// 优先级: config_kv 覆写 > 环境变量 > 默认值
// ==========================================

use crate::importer::tree_builder::{DEFAULT_CHILD_VISIBILITY, DEFAULT_TOP_LEVEL_VISIBILITY};
use crate::repository::CONFLICT_KEY_ID;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// 批量写入默认块大小（存储端批量上限）
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// 环境变量
pub const ENV_DB_PATH: &str = "CATALOG_SYNC_DB_PATH";
pub const ENV_CHUNK_SIZE: &str = "CATALOG_SYNC_CHUNK_SIZE";
pub const ENV_CONFLICT_KEY: &str = "CATALOG_SYNC_CONFLICT_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub db_path: String,
    pub chunk_size: usize,
    pub conflict_key: String,
    pub top_level_visibility: String,
    pub child_visibility: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            db_path: "./catalog.db".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            conflict_key: CONFLICT_KEY_ID.to_string(),
            top_level_visibility: DEFAULT_TOP_LEVEL_VISIBILITY.to_string(),
            child_visibility: DEFAULT_CHILD_VISIBILITY.to_string(),
        }
    }
}

impl SyncConfig {
    /// 默认值 + 环境变量覆写
    pub fn from_env() -> Self {
        let mut config = Self {
            db_path: get_default_db_path(),
            ..Self::default()
        };

        if let Some(raw) = read_env(ENV_CHUNK_SIZE) {
            config.set_chunk_size(&raw);
        }
        if let Some(key) = read_env(ENV_CONFLICT_KEY) {
            config.conflict_key = key;
        }

        config
    }

    /// 设置块大小（非法值忽略并告警）
    pub fn set_chunk_size(&mut self, raw: &str) {
        match raw.trim().parse::<usize>() {
            Ok(size) if size > 0 => self.chunk_size = size,
            _ => warn!(value = %raw, fallback = self.chunk_size, "块大小配置无效，已忽略"),
        }
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 获取默认数据库路径
///
/// # 顺序
/// 1. 环境变量 CATALOG_SYNC_DB_PATH
/// 2. 用户数据目录下 catalog-sync/catalog.db
/// 3. 当前目录 ./catalog.db
pub fn get_default_db_path() -> String {
    if let Some(path) = read_env(ENV_DB_PATH) {
        return path;
    }

    let mut path = PathBuf::from("./catalog.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("catalog-sync");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("catalog.db");
        }
    }

    path.to_string_lossy().to_string()
}
