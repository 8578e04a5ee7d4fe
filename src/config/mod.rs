// ==========================================
// 商品目录同步 - 配置层
// ==========================================
// 职责: 同步配置管理,支持环境变量与 config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod sync_config;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager, GLOBAL_SCOPE};
pub use sync_config::{get_default_db_path, SyncConfig, DEFAULT_CHUNK_SIZE};
