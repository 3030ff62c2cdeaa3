pub mod db;
mod errors;

pub mod accounts;
pub mod activity;
pub mod orders;

use std::{env, str::FromStr, time::Duration};

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use log::info;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite,
    SqlitePool,
};

const SQLITE_DB_URL: &str = "sqlite://data/mess_store.db";

/// How long a connection waits on the store's write lock before surfacing a retryable error instead of hanging.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn db_url() -> String {
    let result = env::var("MLS_DATABASE_URL").unwrap_or_else(|_| {
        info!("MLS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    let options = SqliteConnectOptions::from_str(url)?.busy_timeout(BUSY_TIMEOUT).foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// Creates the database file if it does not exist yet. A no-op otherwise.
pub async fn create_database_if_missing(url: &str) -> Result<(), SqliteDatabaseError> {
    if !Sqlite::database_exists(url).await.unwrap_or(false) {
        Sqlite::create_database(url).await?;
        info!("Created Sqlite database {url}");
    }
    Ok(())
}

/// Applies the embedded schema migrations to the given pool.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteDatabaseError> {
    sqlx::migrate!("./src/db/sqlite/migrations")
        .run(pool)
        .await
        .map_err(|e| SqliteDatabaseError::MigrationError(e.to_string()))?;
    info!("Migrations complete");
    Ok(())
}
