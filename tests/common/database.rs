//! Test database setup
#![allow(dead_code)]

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::path::Path;

/// Fresh in-memory SQLite database with the full schema.
///
/// Each call returns an isolated database, so tests can run in parallel
/// without cleanup. The pool is capped at one connection because every
/// connection to `sqlite::memory:` opens its own empty database.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1).min_connections(1);

    let db = Database::connect(options).await?;
    pollcast::db::init_schema(&db).await?;
    Ok(db)
}

/// SQLite database file in `dir` behind a pool of `max_connections`.
///
/// Unlike the in-memory database, every pooled connection sees the same data,
/// so concurrent requests really contend for locks.
pub async fn setup_file_database(
    dir: &Path,
    max_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let url = format!("sqlite://{}?mode=rwc", dir.join("pollcast.db").display());
    let mut options = ConnectOptions::new(url);
    options.max_connections(max_connections);

    let db = Database::connect(options).await?;
    pollcast::db::init_schema(&db).await?;
    Ok(db)
}
