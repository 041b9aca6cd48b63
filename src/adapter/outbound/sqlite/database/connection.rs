//! SQLite pool and schema setup for the transaction store.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{Error, Result};

/// Schema for the `transactions` table, embedded at build time.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

#[derive(Debug, Clone, Copy)]
struct BusyTimeout;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for BusyTimeout {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        configure_sqlite_connection(conn).map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Open a small pool over `path`. Claims serialize on SQLite's write lock,
/// so a handful of connections is enough.
///
/// # Errors
/// Returns [`Error::Connection`] if the database cannot be opened.
pub fn create_pool(path: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(path);
    Pool::builder()
        .max_size(4)
        .connection_customizer(Box::new(BusyTimeout))
        .build(manager)
        .map_err(|e| Error::Connection(e.to_string()))
}

/// Bring the schema up to date.
///
/// # Errors
/// Returns [`Error::Database`] if a migration fails.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get().map_err(|e| Error::Connection(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Database(e.to_string()))?;
    Ok(())
}

/// Wait up to five seconds on a locked database instead of failing the claim.
///
/// # Errors
/// Returns an error if the pragma fails to apply.
pub fn configure_sqlite_connection(
    conn: &mut SqliteConnection,
) -> std::result::Result<(), diesel::result::Error> {
    diesel::sql_query("PRAGMA busy_timeout = 5000").execute(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(diesel::QueryableByName)]
    struct TableName {
        #[diesel(sql_type = diesel::sql_types::Text)]
        name: String,
    }

    fn temp_pool() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let url = dir.path().join("arbfill.db");
        let pool = create_pool(url.to_str().unwrap()).unwrap();
        (dir, pool)
    }

    #[test]
    fn schema_has_only_transactions_table() {
        let (_dir, pool) = temp_pool();
        run_migrations(&pool).unwrap();

        let mut conn = pool.get().unwrap();
        let tables: Vec<String> = diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '__diesel_schema_migrations' ORDER BY name",
        )
        .load::<TableName>(&mut conn)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();

        assert_eq!(tables, vec!["transactions".to_string()]);
    }

    #[test]
    fn migrating_twice_is_harmless() {
        let (_dir, pool) = temp_pool();
        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap();
    }

    #[test]
    fn pooled_connection_accepts_busy_timeout() {
        let (_dir, pool) = temp_pool();
        let mut conn = pool.get().unwrap();
        assert!(configure_sqlite_connection(&mut conn).is_ok());
    }
}
