// ==========================================
// 商品目录同步 - SQLite 商品存储实现
// ==========================================
// 职责: 实现 ProductStore（使用 rusqlite）
// 红线: 存储不含业务规则，只做数据 CRUD
// 说明: bulk_upsert 单次调用即单个数据块，块内事务化
// ==========================================

use crate::db;
use crate::domain::{generate_id, Attributes, ProductKind, ProductRecord, ProductStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::product_store::{ProductStore, CONFLICT_KEY_ID, CONFLICT_KEY_SKU};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const SELECT_COLUMNS: &str =
    "id, sku, name, product_type, price, qty, status, attributes_json, parent_id";

const UPSERT_SET_CLAUSE: &str = r#"
    name = excluded.name,
    product_type = excluded.product_type,
    price = excluded.price,
    qty = excluded.qty,
    status = excluded.status,
    attributes_json = excluded.attributes_json,
    parent_id = excluded.parent_id,
    updated_at = excluded.updated_at
"#;

fn map_record_row(row: &Row<'_>) -> rusqlite::Result<ProductRecord> {
    let kind: String = row.get(3)?;
    let qty: i64 = row.get(5)?;
    let status: String = row.get(6)?;
    let attributes_json: String = row.get(7)?;
    let attributes: Attributes = serde_json::from_str(&attributes_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(ProductRecord {
        id: row.get(0)?,
        sku: row.get(1)?,
        name: row.get(2)?,
        kind: ProductKind::parse(&kind),
        price: row.get(4)?,
        quantity: u32::try_from(qty).unwrap_or(0),
        status: ProductStatus::parse(&status),
        attributes,
        parent_id: row.get(8)?,
    })
}

// ==========================================
// SqliteProductStore
// ==========================================
pub struct SqliteProductStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProductStore {
    /// 打开数据库并建表
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 使用共享连接创建实例（需已建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn upsert_sql(conflict_key: &str) -> RepositoryResult<String> {
        if conflict_key != CONFLICT_KEY_ID && conflict_key != CONFLICT_KEY_SKU {
            return Err(RepositoryError::ValidationError(format!(
                "不支持的冲突键: {}（仅支持 id / sku）",
                conflict_key
            )));
        }

        // 以 sku 为冲突键时保留已有 id；以 id 为冲突键时允许改写 sku
        let sku_update = if conflict_key == CONFLICT_KEY_ID {
            "sku = excluded.sku,"
        } else {
            ""
        };

        Ok(format!(
            r#"
            INSERT INTO products (
                id, sku, name, product_type, price, qty, status,
                attributes_json, parent_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            ON CONFLICT({}) DO UPDATE SET {} {}
            "#,
            conflict_key, sku_update, UPSERT_SET_CLAUSE
        ))
    }

    /// 在事务中批量 upsert
    fn bulk_upsert_tx(
        tx: &Transaction,
        records: &[ProductRecord],
        conflict_key: &str,
    ) -> RepositoryResult<usize> {
        let sql = Self::upsert_sql(conflict_key)?;
        let mut stmt = tx.prepare(&sql)?;
        let now = Utc::now().to_rfc3339();

        let mut count = 0;
        for record in records {
            let id = if record.id.is_empty() {
                generate_id()
            } else {
                record.id.clone()
            };
            stmt.execute(params![
                id,
                record.sku,
                record.name,
                record.kind.as_str(),
                record.price,
                record.quantity as i64,
                record.status.as_str(),
                serde_json::to_string(&record.attributes)?,
                record.parent_id,
                now,
            ])?;
            count += 1;
        }

        Ok(count)
    }
}

#[async_trait]
impl ProductStore for SqliteProductStore {
    async fn fetch_all(&self) -> RepositoryResult<Vec<ProductRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM products ORDER BY rowid",
            SELECT_COLUMNS
        ))?;
        let records = stmt
            .query_map([], map_record_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn insert(&self, mut record: ProductRecord) -> RepositoryResult<ProductRecord> {
        if record.id.is_empty() {
            record.id = generate_id();
        }

        let conn = self.get_conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO products (
                id, sku, name, product_type, price, qty, status,
                attributes_json, parent_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            "#,
            params![
                record.id,
                record.sku,
                record.name,
                record.kind.as_str(),
                record.price,
                record.quantity as i64,
                record.status.as_str(),
                serde_json::to_string(&record.attributes)?,
                record.parent_id,
                now,
            ],
        )?;

        debug!(id = %record.id, sku = %record.sku, "商品记录已插入");
        Ok(record)
    }

    async fn update(&self, id: &str, mut record: ProductRecord) -> RepositoryResult<ProductRecord> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            r#"
            UPDATE products SET
                sku = ?2, name = ?3, product_type = ?4, price = ?5, qty = ?6,
                status = ?7, attributes_json = ?8, parent_id = ?9, updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                id,
                record.sku,
                record.name,
                record.kind.as_str(),
                record.price,
                record.quantity as i64,
                record.status.as_str(),
                serde_json::to_string(&record.attributes)?,
                record.parent_id,
                Utc::now().to_rfc3339(),
            ],
        )?;

        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Product".to_string(),
                id: id.to_string(),
            });
        }

        record.id = id.to_string();
        Ok(record)
    }

    async fn delete_by_id(&self, id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let deleted = conn.execute("DELETE FROM products WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    async fn bulk_upsert(
        &self,
        records: Vec<ProductRecord>,
        conflict_key: &str,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let count = Self::bulk_upsert_tx(&tx, &records, conflict_key)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        debug!(count = count, conflict_key = %conflict_key, "批量写入完成");
        Ok(count == records.len())
    }

    async fn fetch_children(&self, parent_id: &str) -> RepositoryResult<Vec<ProductRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM products WHERE parent_id = ?1 ORDER BY rowid",
            SELECT_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![parent_id], map_record_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
