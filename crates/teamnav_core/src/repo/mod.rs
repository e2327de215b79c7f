//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for cards and categories.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Read paths reject invalid persisted state instead of masking it.

use rusqlite::Connection;

use crate::db::migrations::latest_version;

pub mod card_repo;
pub mod category_repo;

use self::card_repo::{RepoError, RepoResult};

/// Verifies the connection has the fully migrated schema.
///
/// Repositories are constructed with `try_new` so that a connection that
/// skipped [`crate::db::open_db`] bootstrap fails here, not on first query.
fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version =
        conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
