//! PostgreSQL storage for parsed instrument rows

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use super::models::TradeRecord;
use super::Result;

/// Rows per multi-row INSERT statement
const DEFAULT_INSERT_CHUNK_SIZE: usize = 500;

/// Idempotent schema for the instruments table
const CREATE_INSTRUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS instruments (
    id BIGSERIAL PRIMARY KEY,
    exchange_product_id VARCHAR(30) NOT NULL,
    exchange_product_name VARCHAR(300) NOT NULL,
    oil_id VARCHAR(30) NOT NULL,
    delivery_basis_id VARCHAR(30) NOT NULL,
    delivery_basis_name VARCHAR(50) NOT NULL,
    delivery_type_id VARCHAR(30) NOT NULL,
    volume DOUBLE PRECISION NOT NULL,
    total DOUBLE PRECISION NOT NULL,
    count DOUBLE PRECISION NOT NULL,
    trade_date DATE NOT NULL,
    created_on TIMESTAMPTZ NOT NULL,
    updated_on TIMESTAMPTZ
)
"#;

/// Storage handler for parsed instrument records
pub struct TradeStorage {
    db: PgPool,
    chunk_size: usize,
}

impl TradeStorage {
    /// Create a storage handler with the default insert chunk size
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            chunk_size: DEFAULT_INSERT_CHUNK_SIZE,
        }
    }

    /// Create a storage handler with a custom insert chunk size
    pub fn with_chunk_size(db: PgPool, chunk_size: usize) -> Self {
        Self { db, chunk_size }
    }

    /// Create the instruments table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_INSTRUMENTS_TABLE).execute(&self.db).await?;
        Ok(())
    }

    /// Insert all records inside one transaction
    ///
    /// Either every record becomes visible or none does: any failure rolls
    /// the whole batch back.
    pub async fn ingest(&self, records: &[TradeRecord]) -> Result<usize> {
        self.ensure_schema().await?;

        if records.is_empty() {
            info!("No instrument records to ingest");
            return Ok(0);
        }

        let mut tx = self.db.begin().await?;

        for chunk in records.chunks(self.chunk_size) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO instruments (\
                 exchange_product_id, exchange_product_name, oil_id, \
                 delivery_basis_id, delivery_basis_name, delivery_type_id, \
                 volume, total, count, trade_date, created_on, updated_on) ",
            );

            builder.push_values(chunk, |mut row, record| {
                row.push_bind(&record.exchange_product_id)
                    .push_bind(&record.exchange_product_name)
                    .push_bind(&record.oil_id)
                    .push_bind(&record.delivery_basis_id)
                    .push_bind(&record.delivery_basis_name)
                    .push_bind(&record.delivery_type_id)
                    .push_bind(record.volume)
                    .push_bind(record.total)
                    .push_bind(record.count)
                    .push_bind(record.trade_date)
                    .push_bind(record.created_on)
                    .push_bind(record.updated_on);
            });

            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        info!(records = records.len(), "Ingested instrument records");

        Ok(records.len())
    }

    /// Number of stored instrument rows
    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM instruments")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    /// All stored instrument rows in insertion order
    pub async fn fetch_all(&self) -> Result<Vec<TradeRecord>> {
        let records = sqlx::query_as::<_, TradeRecord>(
            "SELECT id, exchange_product_id, exchange_product_name, oil_id, \
             delivery_basis_id, delivery_basis_name, delivery_type_id, \
             volume, total, count, trade_date, created_on, updated_on \
             FROM instruments ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(records)
    }
}
