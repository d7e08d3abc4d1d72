use crate::errors::ClientResult;
use crate::queries::Queries;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

/// Process-local durable store. Every record is a whole JSON blob under one key,
/// so a write replaces the record in a single statement.
pub struct ClientDatabase {
    pub pool: SqlitePool,
}

impl ClientDatabase {
    pub async fn new(database_url: &str) -> ClientResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Single-connection in-memory database with migrations applied.
    pub async fn in_memory() -> ClientResult<Self> {
        // Each sqlite memory connection is its own database, so pin exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> ClientResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn get_value(&self, key: &str) -> ClientResult<Option<String>> {
        let row = sqlx::query(Queries::GET_VALUE)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .map(|row| row.try_get::<String, _>("value"))
            .transpose()?)
    }

    pub async fn put_value(&self, key: &str, value: &str) -> ClientResult<()> {
        sqlx::query(Queries::UPSERT_VALUE)
            .bind(key)
            .bind(value)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete_value(&self, key: &str) -> ClientResult<()> {
        sqlx::query(Queries::DELETE_VALUE)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn count_values(&self) -> ClientResult<i64> {
        let row = sqlx::query(Queries::COUNT_VALUES)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("count")?)
    }
}
