//! Embedded schema migrations.
//!
//! Migrations run on a blocking `PgConnection` because `diesel_migrations`
//! has no async harness; callers on a Tokio runtime go through
//! [`run_migrations`], which moves the work onto the blocking pool.

use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors raised while applying migrations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// The database could not be reached.
    #[error("failed to connect for migrations: {message}")]
    Connection { message: String },
    /// A migration failed to apply.
    #[error("failed to apply migrations: {message}")]
    Apply { message: String },
    /// The blocking task panicked or was cancelled.
    #[error("migration task failed: {message}")]
    Task { message: String },
}

/// Apply pending migrations synchronously, returning how many ran.
///
/// # Errors
///
/// Returns [`MigrationError::Connection`] if `database_url` cannot be
/// reached and [`MigrationError::Apply`] if any migration fails.
pub fn migrate_schema(database_url: &str) -> Result<usize, MigrationError> {
    let mut conn =
        PgConnection::establish(database_url).map_err(|err| MigrationError::Connection {
            message: err.to_string(),
        })?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| MigrationError::Apply {
            message: err.to_string(),
        })?;
    Ok(applied.len())
}

/// Apply pending migrations from async code.
///
/// # Errors
///
/// Propagates [`migrate_schema`] failures and reports a join failure as
/// [`MigrationError::Task`].
pub async fn run_migrations(database_url: String) -> Result<usize, MigrationError> {
    let applied = tokio::task::spawn_blocking(move || migrate_schema(&database_url))
        .await
        .map_err(|err| MigrationError::Task {
            message: err.to_string(),
        })??;
    info!(applied, "schema migrations applied");
    Ok(applied)
}
