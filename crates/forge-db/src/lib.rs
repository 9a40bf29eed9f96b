//! # forge-db
//!
//! PostgreSQL database layer for the forge planner.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for every forge-core repository trait
//! - Schema migrations (feature `migrations`)
//! - Fixtures for database-backed tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use forge_db::{Database, GoalInput, GoalRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/forge").await?;
//!     db.migrate().await?;
//!
//!     let goal = db.goals.create("test@example.com", GoalInput {
//!         title: "Ship v1".to_string(),
//!         ..Default::default()
//!     }).await?;
//!
//!     println!("Created goal: {}", goal.id);
//!     Ok(())
//! }
//! ```

pub mod ai_keys;
pub mod calendar_events;
pub mod deliverables;
pub mod goals;
pub mod info_tags;
pub mod pool;
pub mod users;

// Always compiled so integration tests in tests/ can use it.
pub mod test_fixtures;

// Re-export core types
pub use forge_core::*;

pub use ai_keys::PgAiKeyRepository;
pub use calendar_events::PgCalendarEventRepository;
pub use deliverables::PgDeliverableRepository;
pub use goals::PgGoalRepository;
pub use info_tags::PgInfoTagRepository;
pub use pool::{create_lazy_pool, create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use users::PgUserRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Accounts.
    pub users: PgUserRepository,
    /// Goals with their deliverables and goal tags.
    pub goals: PgGoalRepository,
    /// Deliverables and goal events.
    pub deliverables: PgDeliverableRepository,
    /// Stand-alone calendar events.
    pub calendar_events: PgCalendarEventRepository,
    /// Info tags.
    pub info_tags: PgInfoTagRepository,
    /// Sealed provider API keys.
    pub ai_keys: PgAiKeyRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            goals: PgGoalRepository::new(pool.clone()),
            deliverables: PgDeliverableRepository::new(pool.clone()),
            calendar_events: PgCalendarEventRepository::new(pool.clone()),
            info_tags: PgInfoTagRepository::new(pool.clone()),
            ai_keys: PgAiKeyRepository::new(pool.clone()),
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
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Create without connecting; connections open on first query.
    pub fn connect_lazy(url: &str, config: PoolConfig) -> Result<Self> {
        Ok(Self::new(create_lazy_pool(url, config)?))
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
}
