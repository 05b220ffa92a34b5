//! Database connection and schema bootstrap.

use crate::orm::{poll_comments, poll_options, poll_votes, polls};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    Statement,
};

/// Name of the unique index that guarantees one vote per user per poll.
pub const VOTE_UNIQUE_INDEX: &str = "poll_votes_poll_id_user_id_key";

/// Opens the connection pool.
pub async fn init_db(database_url: String) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options.max_connections(crate::app_config::database().max_connections);

    let db = Database::connect(options).await?;
    log::info!(
        "Database connection established ({:?})",
        db.get_database_backend()
    );
    Ok(db)
}

/// Creates any missing tables and indexes.
///
/// Tables are derived from the entity definitions so the schema cannot drift
/// from the models. Parents are created before children.
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, polls::Entity).await?;
    create_table(db, &schema, poll_options::Entity).await?;
    create_table(db, &schema, poll_votes::Entity).await?;
    create_table(db, &schema, poll_comments::Entity).await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON poll_votes (poll_id, user_id)",
            VOTE_UNIQUE_INDEX
        ),
    ))
    .await?;

    log::debug!("Database schema verified");
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(db.get_database_backend().build(&stmt)).await?;
    Ok(())
}
