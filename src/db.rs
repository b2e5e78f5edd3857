use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, gauge, histogram};
use sea_orm::{
    ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, DbErr, TransactionError,
    TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Boxed future handed to [`with_transaction`] callbacks.
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send + 'c>>;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
    /// Log every statement through sqlx
    pub sqlx_logging: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
            sqlx_logging: false,
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
            sqlx_logging: cfg.is_development(),
        }
    }
}

/// Establishes a connection pool with default tuning.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns `ServiceError::DatabaseError` if the pool cannot be created
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Configuring database connection"
    );

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(config.sqlx_logging);

    gauge!("pos_db.max_connections", config.max_connections as f64);

    let pool = Database::connect(opt).await.map_err(|e| {
        error!(error = %e, "Database connection establishment failed");
        ServiceError::DatabaseError(e)
    })?;

    info!("Database connection pool established");
    Ok(pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs `f` inside a database transaction, committing on `Ok` and rolling
/// back on `Err`.
///
/// Transaction outcomes are counted under `pos_db.transaction.*` with an
/// `operation` label.
pub async fn with_transaction<F, T>(db: &DbPool, operation: &str, f: F) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> TxFuture<'c, T> + Send,
    T: Send,
{
    let transaction_id = Uuid::new_v4();
    let start = Instant::now();

    debug!(%transaction_id, operation, "Starting database transaction");
    counter!("pos_db.transaction.started", 1, "operation" => operation.to_string());

    let result = db.transaction::<_, T, ServiceError>(f).await;

    let elapsed = start.elapsed();
    histogram!("pos_db.transaction.duration", elapsed, "operation" => operation.to_string());

    match result {
        Ok(value) => {
            counter!("pos_db.transaction.committed", 1, "operation" => operation.to_string());
            debug!(%transaction_id, operation, ?elapsed, "Transaction committed");
            Ok(value)
        }
        Err(err) => {
            counter!("pos_db.transaction.rolled_back", 1, "operation" => operation.to_string());
            warn!(%transaction_id, operation, ?elapsed, "Transaction rolled back");
            Err(match err {
                TransactionError::Connection(e) => ServiceError::DatabaseError(e),
                TransactionError::Transaction(e) => e,
            })
        }
    }
}

/// Runs the embedded migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = Instant::now();

    let result = crate::migrator::Migrator::up(pool, None).await;

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!(?elapsed, "Database migrations completed"),
        Err(e) => error!(?elapsed, error = %e, "Database migrations failed"),
    }

    result.map_err(ServiceError::DatabaseError)
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), DbErr> {
    let start = Instant::now();
    let result = pool.ping().await;

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            gauge!("pos_db.connection_latency", elapsed.as_millis() as f64);
        }
        Err(e) => {
            error!(?elapsed, error = %e, "Database connection check failed");
            counter!("pos_db.connection_failures", 1);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::store;
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

    async fn memory_pool() -> DbPool {
        let pool = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("sqlite pool");
        run_migrations(&pool).await.expect("migrations");
        pool
    }

    fn new_store(name: &str) -> store::ActiveModel {
        store::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            currency: Set("USD".to_string()),
            created_at: Set(chrono::Utc::now()),
        }
    }

    #[tokio::test]
    async fn connection_check_succeeds_after_migrations() {
        let pool = memory_pool().await;
        assert!(check_connection(&pool).await.is_ok());
    }

    #[tokio::test]
    async fn transaction_commits_on_ok() {
        let pool = memory_pool().await;

        with_transaction(&pool, "test.commit", |txn| {
            Box::pin(async move {
                new_store("Main Street").insert(txn).await?;
                Ok(())
            })
        })
        .await
        .unwrap();

        assert_eq!(store::Entity::find().count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_err() {
        let pool = memory_pool().await;

        let result: Result<(), ServiceError> = with_transaction(&pool, "test.rollback", |txn| {
            Box::pin(async move {
                new_store("Harbor").insert(txn).await?;
                Err(ServiceError::InvalidInput("abort".into()))
            })
        })
        .await;

        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
        assert_eq!(store::Entity::find().count(&pool).await.unwrap(), 0);
    }
}
