use crate::error::StoreError;
use crate::metadata::ProductRecord;
use crate::source::ProductSource;
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use std::sync::{Arc, Mutex};

const SELECT_PRODUCTS: &str = "SELECT p.id, p.name, p.description, p.price, p.available_quantity,
        c.name AS category_name, c.description AS category_desc
    FROM product p
    LEFT JOIN category c ON p.category_id = c.id";

/// Reads products straight from the catalog database.
///
/// Expects the catalog's `product` and `category` tables. Queries run on the
/// blocking thread pool so request handlers never block the runtime.
pub struct LocalStoreFetcher {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStoreFetcher {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Source(format!("DB error opening '{path}': {e}")))?;
        Ok(Self::new(conn))
    }

    fn query(conn: &Connection, ids: Option<&[i64]>) -> Result<Vec<ProductRecord>, rusqlite::Error> {
        match ids {
            Some(ids) => {
                let placeholders = (1..=ids.len())
                    .map(|i| format!("?{i}"))
                    .collect::<Vec<_>>()
                    .join(",");
                let sql = format!("{SELECT_PRODUCTS} WHERE p.id IN ({placeholders}) ORDER BY p.id");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(ids.iter()), Self::row_to_product)?;
                rows.collect()
            }
            None => {
                let sql = format!("{SELECT_PRODUCTS} ORDER BY p.id");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], Self::row_to_product)?;
                rows.collect()
            }
        }
    }

    fn row_to_product(row: &rusqlite::Row) -> Result<ProductRecord, rusqlite::Error> {
        let id = match row.get::<_, Value>(0)? {
            Value::Integer(i) => i.to_string(),
            Value::Text(s) => s,
            Value::Real(f) => f.to_string(),
            _ => String::new(),
        };
        let name: Option<String> = row.get(1)?;
        let description: Option<String> = row.get(2)?;
        let price: Option<f64> = row.get(3)?;
        let quantity: Option<i64> = row.get(4)?;

        Ok(ProductRecord {
            id,
            name: name.unwrap_or_default(),
            description: description.unwrap_or_default(),
            price: price.unwrap_or(0.0),
            category: row.get(5)?,
            category_description: row.get(6)?,
            stock: Some(quantity.unwrap_or(0).clamp(0, u32::MAX as i64) as u32),
        })
    }
}

#[async_trait::async_trait]
impl ProductSource for LocalStoreFetcher {
    async fn get_products(&self, ids: Option<&[String]>) -> Result<Vec<ProductRecord>, StoreError> {
        // An empty id list means "everything", same as no list at all
        let ids: Option<Vec<i64>> = ids.filter(|ids| !ids.is_empty()).map(|ids| {
            ids.iter()
                .filter_map(|id| match id.trim().parse::<i64>() {
                    Ok(n) => Some(n),
                    Err(_) => {
                        tracing::warn!("Skipping non-numeric product id '{}'", id);
                        None
                    }
                })
                .collect()
        });

        if matches!(&ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Source(format!("DB lock poisoned: {e}")))?;
            Self::query(&conn, ids.as_deref())
                .map_err(|e| StoreError::Source(format!("Error fetching products from database: {e}")))
        })
        .await
        .map_err(|e| StoreError::Source(format!("DB task failed: {e}")))?
    }

    fn name(&self) -> &str {
        "database"
    }
}

#[cfg(test)]
mod local_test {
    use super::*;

    fn catalog() -> LocalStoreFetcher {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE category (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT
            );
            CREATE TABLE product (
                id INTEGER PRIMARY KEY,
                name TEXT,
                description TEXT,
                price REAL,
                available_quantity INTEGER,
                category_id INTEGER REFERENCES category(id)
            );
            INSERT INTO category VALUES (1, 'Tools', 'Hand and power tools');
            INSERT INTO product VALUES (1, 'Widget', 'A widget', 9.99, 12, 1);
            INSERT INTO product VALUES (2, 'Gadget', 'A gadget', 19.99, NULL, 1);
            INSERT INTO product VALUES (3, NULL, NULL, NULL, 3, NULL);
            ",
        )
        .unwrap();
        LocalStoreFetcher::new(conn)
    }

    #[tokio::test]
    async fn test_fetch_all_with_category_join() {
        let products = catalog().get_products(None).await.unwrap();

        assert_eq!(products.len(), 3);
        let widget = &products[0];
        assert_eq!(widget.id, "1");
        assert_eq!(widget.name, "Widget");
        assert!((widget.price - 9.99).abs() < 1e-9);
        assert_eq!(widget.stock, Some(12));
        assert_eq!(widget.category.as_deref(), Some("Tools"));
        assert_eq!(widget.category_description.as_deref(), Some("Hand and power tools"));
    }

    #[tokio::test]
    async fn test_null_columns_get_defaults() {
        let products = catalog().get_products(None).await.unwrap();

        assert_eq!(products[1].stock, Some(0));
        let bare = &products[2];
        assert_eq!(bare.name, "");
        assert_eq!(bare.description, "");
        assert_eq!(bare.price, 0.0);
        assert!(bare.category.is_none());
        assert!(bare.category_description.is_none());
    }

    #[tokio::test]
    async fn test_fetch_subset_skips_unknown_ids() {
        let ids = vec!["2".to_string(), "42".to_string(), "abc".to_string()];
        let products = catalog().get_products(Some(ids.as_slice())).await.unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "2");
    }

    #[tokio::test]
    async fn test_only_invalid_ids_returns_nothing() {
        let ids = vec!["abc".to_string()];
        let products = catalog().get_products(Some(ids.as_slice())).await.unwrap();
        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn test_empty_id_list_fetches_all() {
        let products = catalog().get_products(Some(&[][..])).await.unwrap();
        assert_eq!(products.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_tables_is_source_error() {
        let fetcher = LocalStoreFetcher::new(Connection::open_in_memory().unwrap());

        let result = fetcher.get_products(None).await;
        assert!(matches!(result, Err(StoreError::Source(_))));
    }
}
