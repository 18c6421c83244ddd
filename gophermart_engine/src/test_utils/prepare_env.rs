use std::env;

use log::*;

use crate::SqliteDatabase;

/// Loads `.env.test`, initialises logging and brings the schema at `url` up to date.
pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    run_migrations(url).await;
}

/// A URL for a fresh database file in the system temp directory.
pub fn random_db_url() -> String {
    let path = env::temp_dir().join(format!("gm_test_store_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

/// A migrated database at a fresh location.
pub async fn test_database() -> SqliteDatabase {
    let url = random_db_url();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database")
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    db.close().await;
    info!("🚀️ Migrations complete");
}
