//! # scripto-db
//!
//! PostgreSQL persistence for the ScriptO AI pipeline.
//!
//! This crate provides:
//! - Connection pool management
//! - [`PgInteractionRepository`], the durable interaction log
//! - [`InMemoryInteractionRepository`] with identical semantics
//! - Embedded migrations (feature `migrations`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use scripto_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/scripto").await?;
//!     db.migrate().await?;
//!     Ok(())
//! }
//! ```

pub mod interactions;
pub mod memory;
pub mod pool;

pub use interactions::PgInteractionRepository;
pub use memory::InMemoryInteractionRepository;
pub use pool::{create_pool, PoolConfig};

// Re-export core types
pub use scripto_core::{Error, Interaction, InteractionRepository, NewInteraction, Result};

/// Database handle bundling the pool and repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Interaction log repository.
    pub interactions: PgInteractionRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            interactions: PgInteractionRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = config.connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Round-trip a trivial query; used by the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
