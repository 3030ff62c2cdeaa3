use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

/// A unique sqlite URL under the workspace `data/` directory, so parallel test binaries never share a ledger.
pub fn random_db_path() -> String {
    format!("sqlite://../data/mess_ledger_test_{:016x}.db", rand::random::<u64>())
}

/// Drops whatever sits at `url`, recreates it, applies the ledger migrations and hands back a connected database.
pub async fn prepare_test_ledger(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Could not drop stale test ledger {url}: {e:?}");
    }
    let db = SqliteDatabase::create(url, 5).await.expect("Error preparing the test ledger");
    info!("🚀️ Test ledger ready at {url}");
    db
}

/// A fresh, migrated ledger at a random path. What almost every test wants.
pub async fn fresh_test_ledger() -> SqliteDatabase {
    prepare_test_ledger(&random_db_path()).await
}
