// ==========================================
// 商品目录同步 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 层级商品目录的导入与存储同步引擎
// 流程: 行解码 → 变体解析 → 建树 → 同步协调（变更守卫包裹所有写入入口）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 商品节点与导入报告
pub mod domain;

// 存储层 - 扁平记录访问
pub mod repository;

// 导入层 - 外部导出文件
pub mod importer;

// 同步层 - 森林与存储的双向同步
pub mod sync;

// 配置层 - 同步配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 展示层调用入口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    ImportIssue, ImportOutcome, ImportReport, IssueKind, IssueLevel, ProductKind, ProductNode,
    ProductRecord, ProductStatus,
};

// 导入
pub use importer::{CatalogExporter, CatalogImporter, CatalogImporterImpl};

// 存储
pub use repository::{InMemoryProductStore, ProductStore, SqliteProductStore};

// 同步
pub use sync::{ChangeGuard, LoadOptions, SyncReconciler};

// 配置
pub use config::{ConfigManager, SyncConfig};

// API
pub use api::CatalogApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "商品目录同步";
