use crate::feed::{FeedResult, SnapshotSink, UrlSource};
use crate::marketplace::Marketplace;
use crate::model::{PendingProduct, ProductSnapshot};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// Local SQLite-backed product table
///
/// Serves both feed roles: the watch list (which URLs to refresh) and the
/// snapshot upsert target. One `products` row per product URL, overwritten on
/// every delivery.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    pub fn open(path: &Path) -> FeedResult<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Adds a product to the watch list
    ///
    /// Snapshot fields stay empty until the first successful scrape; adding
    /// the same URL twice is a no-op.
    pub fn add_product(
        &self,
        marketplace: Marketplace,
        product_url: &str,
        articul: &str,
    ) -> FeedResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO products (marketplace, product_url, articul) \
             VALUES (?1, ?2, ?3)",
            params![marketplace.key(), product_url, articul],
        )?;
        Ok(())
    }

    /// Number of tracked products for a marketplace
    pub fn product_count(&self, marketplace: Marketplace) -> FeedResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM products WHERE marketplace = ?1",
            params![marketplace.key()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY,
            marketplace TEXT NOT NULL,
            product_url TEXT NOT NULL UNIQUE,
            articul TEXT NOT NULL,
            is_available INTEGER NOT NULL DEFAULT 0,
            price INTEGER,
            rating REAL,
            review_count INTEGER,
            updated_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_products_marketplace ON products(marketplace);
        CREATE INDEX IF NOT EXISTS idx_products_articul ON products(articul);",
    )
}

#[async_trait]
impl UrlSource for SqliteStore {
    async fn pending_products(
        &self,
        marketplace: Marketplace,
    ) -> FeedResult<Vec<PendingProduct>> {
        let conn = self.conn.lock().unwrap();
        let mut statement = conn.prepare(
            "SELECT product_url, articul FROM products WHERE marketplace = ?1 ORDER BY id",
        )?;

        let rows = statement.query_map(params![marketplace.key()], |row| {
            Ok(PendingProduct::new(
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[async_trait]
impl SnapshotSink for SqliteStore {
    async fn send_batch(
        &self,
        marketplace: Marketplace,
        snapshots: &[ProductSnapshot],
    ) -> FeedResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        for snapshot in snapshots {
            tx.execute(
                "INSERT INTO products \
                     (marketplace, product_url, articul, is_available, price, rating, \
                      review_count, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
                 ON CONFLICT(product_url) DO UPDATE SET \
                     articul = excluded.articul, \
                     is_available = excluded.is_available, \
                     price = excluded.price, \
                     rating = excluded.rating, \
                     review_count = excluded.review_count, \
                     updated_at = excluded.updated_at",
                params![
                    marketplace.key(),
                    snapshot.product_url,
                    snapshot.articul,
                    snapshot.is_available,
                    snapshot.price.map(|p| p as i64),
                    snapshot.rating,
                    snapshot.review_count.map(|c| c as i64),
                    snapshot.captured_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        tracing::info!("Stored {} snapshots for {}", snapshots.len(), marketplace);
        Ok(())
    }
}
