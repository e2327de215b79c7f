//! Category repository contract and SQLite implementation.
//!
//! Categories are owned by an external collaborator; the card core only
//! needs listing and lookup, so the contract stays read-only.

use crate::model::category::Category;
use crate::repo::card_repo::RepoResult;
use rusqlite::{Connection, Row};

/// Read-only repository interface for categories.
pub trait CategoryRepository {
    /// Lists every category, ordered `sort ASC, id ASC`.
    fn list_all(&self) -> RepoResult<Vec<Category>>;
    /// Loads one category by id.
    fn get(&self, id: &str) -> RepoResult<Option<Category>>;
}

/// SQLite-backed category repository.
pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        super::ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn list_all(&self) -> RepoResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, sort FROM categories ORDER BY sort ASC, id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }

    fn get(&self, id: &str) -> RepoResult<Option<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, sort FROM categories WHERE id = ?1;")?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_category_row(row)?));
        }
        Ok(None)
    }
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    Ok(Category {
        id: row.get("id")?,
        name: row.get("name")?,
        sort: row.get("sort")?,
    })
}
