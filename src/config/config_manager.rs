// ==========================================
// 商品目录同步 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::sync_config::SyncConfig;
use crate::db::open_sqlite_connection;
use crate::repository::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// 全局配置作用域
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（会建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        debug!(key = %key, "配置已更新");
        Ok(())
    }

    /// 在给定基础配置上叠加 config_kv 覆写
    pub fn load_sync_config(&self, base: SyncConfig) -> RepositoryResult<SyncConfig> {
        let mut config = base;

        if let Some(raw) = self.get_global_config_value(config_keys::CHUNK_SIZE)? {
            config.set_chunk_size(&raw);
        }
        if let Some(key) = self.get_global_config_value(config_keys::CONFLICT_KEY)? {
            if key.trim().is_empty() {
                warn!("冲突键配置为空，已忽略");
            } else {
                config.conflict_key = key.trim().to_string();
            }
        }
        if let Some(v) = self.get_global_config_value(config_keys::TOP_LEVEL_VISIBILITY)? {
            config.top_level_visibility = v;
        }
        if let Some(v) = self.get_global_config_value(config_keys::CHILD_VISIBILITY)? {
            config.child_visibility = v;
        }

        Ok(config)
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 命令行输出 / 排查同步行为时记录当时的配置
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 批量写入
    pub const CHUNK_SIZE: &str = "sync_chunk_size";
    pub const CONFLICT_KEY: &str = "sync_conflict_key";

    // 可见性默认值
    pub const TOP_LEVEL_VISIBILITY: &str = "import_top_level_visibility";
    pub const CHILD_VISIBILITY: &str = "import_child_visibility";
}
