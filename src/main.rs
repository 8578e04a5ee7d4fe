// ==========================================
// 商品目录同步 - 命令行入口
// ==========================================
// 用法: catalog-sync <导入文件> [数据库路径]
// 流程: 导入文件 → 整体写入 SQLite → 输出导入报告（JSON）
// ==========================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use catalog_sync::api::CatalogApi;
use catalog_sync::config::{ConfigManager, SyncConfig};
use catalog_sync::logging;
use catalog_sync::repository::SqliteProductStore;
use catalog_sync::sync::NoOpRowSink;
use serde_json::json;

fn print_usage() {
    eprintln!("用法: catalog-sync <导入文件 .csv/.xlsx> [数据库路径]");
    eprintln!("环境变量: CATALOG_SYNC_DB_PATH / CATALOG_SYNC_CHUNK_SIZE / CATALOG_SYNC_CONFLICT_KEY / RUST_LOG");
}

async fn run(file_path: PathBuf, db_path: Option<String>) -> anyhow::Result<()> {
    let mut base = SyncConfig::from_env();
    if let Some(db_path) = db_path {
        base.db_path = db_path;
    }

    tracing::info!("==================================================");
    tracing::info!("{} v{}", catalog_sync::APP_NAME, catalog_sync::VERSION);
    tracing::info!("使用数据库: {}", base.db_path);
    tracing::info!("==================================================");

    let config_manager = ConfigManager::new(&base.db_path)?;
    let config = config_manager.load_sync_config(base)?;
    tracing::debug!(snapshot = %config_manager.get_config_snapshot()?, "配置快照");

    let store = Arc::new(SqliteProductStore::new(&config.db_path)?);
    let api = CatalogApi::new(store, Arc::new(NoOpRowSink), &config);

    let (outcome, bulk) = api.import_and_sync(&file_path).await?;

    let output = json!({
        "report": outcome.report,
        "sync": bulk,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let mut args = std::env::args().skip(1);
    let Some(file_path) = args.next() else {
        print_usage();
        return ExitCode::from(2);
    };
    let db_path = args.next();

    match run(PathBuf::from(file_path), db_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "导入同步失败");
            eprintln!("导入同步失败: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
