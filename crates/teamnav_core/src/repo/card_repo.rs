//! Card repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD and ordered-query APIs over `cards` storage.
//! - Keep SQL details and the icon JSON column inside the repository boundary.
//!
//! # Invariants
//! - Category listings are deterministic: `sort ASC, id ASC`.
//! - Read paths reject rows with an unknown type or unparseable icon JSON.
//! - Keyword lookup expects an already-lowercased term.

use crate::db::DbError;
use crate::model::card::{parse_card_type, Card, CardIcon, CardId};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CARD_SELECT_SQL: &str = "SELECT
    id,
    category,
    type,
    title,
    content,
    url,
    icon,
    sort
FROM cards";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for card and category persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(CardId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "card not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted card data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface consumed by the card lifecycle service.
pub trait CardRepository {
    /// Lists every card, ordered `category ASC, sort ASC, id ASC`.
    fn find_all(&self) -> RepoResult<Vec<Card>>;
    /// Lists cards whose title, content or url contains the lowercased term.
    fn find_by_keywords(&self, lowercase_term: &str) -> RepoResult<Vec<Card>>;
    /// Lists one category's cards, ordered `sort ASC, id ASC`.
    fn find_by_category_ordered(&self, category: &str) -> RepoResult<Vec<Card>>;
    /// Returns the highest sort value in one category, 0 when empty.
    fn max_sort(&self, category: &str) -> RepoResult<i64>;
    /// Loads one card by id.
    fn find_by_id(&self, id: &str) -> RepoResult<Option<Card>>;
    /// Inserts or fully updates one card.
    fn save(&self, card: &Card) -> RepoResult<()>;
    /// Persists a batch of cards atomically.
    fn save_all(&self, cards: &[Card]) -> RepoResult<()>;
    /// Removes one card by id.
    fn delete_by_id(&self, id: &str) -> RepoResult<()>;
}

/// SQLite-backed card repository.
pub struct SqliteCardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCardRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        super::ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_cards(&self, sql: &str, bind: &[&dyn rusqlite::ToSql]) -> RepoResult<Vec<Card>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut cards = Vec::new();
        while let Some(row) = rows.next()? {
            cards.push(parse_card_row(row)?);
        }
        Ok(cards)
    }
}

impl CardRepository for SqliteCardRepository<'_> {
    fn find_all(&self) -> RepoResult<Vec<Card>> {
        self.query_cards(
            &format!("{CARD_SELECT_SQL} ORDER BY category ASC, sort ASC, id ASC;"),
            &[],
        )
    }

    fn find_by_keywords(&self, lowercase_term: &str) -> RepoResult<Vec<Card>> {
        // instr() instead of LIKE so `%`/`_` in the term stay literal.
        self.query_cards(
            &format!(
                "{CARD_SELECT_SQL}
                 WHERE instr(lower(coalesce(title, '')), ?1) > 0
                    OR instr(lower(coalesce(content, '')), ?1) > 0
                    OR instr(lower(coalesce(url, '')), ?1) > 0
                 ORDER BY category ASC, sort ASC, id ASC;"
            ),
            &[&lowercase_term],
        )
    }

    fn find_by_category_ordered(&self, category: &str) -> RepoResult<Vec<Card>> {
        self.query_cards(
            &format!("{CARD_SELECT_SQL} WHERE category = ?1 ORDER BY sort ASC, id ASC;"),
            &[&category],
        )
    }

    fn max_sort(&self, category: &str) -> RepoResult<i64> {
        let max = self.conn.query_row(
            "SELECT COALESCE(MAX(sort), 0) FROM cards WHERE category = ?1;",
            [category],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(max)
    }

    fn find_by_id(&self, id: &str) -> RepoResult<Option<Card>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CARD_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_card_row(row)?));
        }
        Ok(None)
    }

    fn save(&self, card: &Card) -> RepoResult<()> {
        upsert_card(self.conn, card)
    }

    fn save_all(&self, cards: &[Card]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for card in cards {
            upsert_card(&tx, card)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_by_id(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM cards WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn upsert_card(conn: &Connection, card: &Card) -> RepoResult<()> {
    let icon_json = serde_json::to_string(&card.icon)
        .map_err(|err| RepoError::InvalidData(format!("icon serialization failed: {err}")))?;

    conn.execute(
        "INSERT INTO cards (id, category, type, title, content, url, icon, sort)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT (id) DO UPDATE SET
            category = excluded.category,
            type = excluded.type,
            title = excluded.title,
            content = excluded.content,
            url = excluded.url,
            icon = excluded.icon,
            sort = excluded.sort,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![
            card.id,
            card.category,
            card.kind.as_str(),
            card.title.as_deref(),
            card.content.as_deref(),
            card.url.as_deref(),
            icon_json,
            card.sort,
        ],
    )?;
    Ok(())
}

fn parse_card_row(row: &Row<'_>) -> RepoResult<Card> {
    let type_text: String = row.get("type")?;
    let kind = parse_card_type(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid card type `{type_text}` in cards.type"))
    })?;

    let icon_json: String = row.get("icon")?;
    let icon: CardIcon = serde_json::from_str(&icon_json).map_err(|err| {
        RepoError::InvalidData(format!("invalid icon json in cards.icon: {err}"))
    })?;

    Ok(Card {
        id: row.get("id")?,
        category: row.get("category")?,
        kind,
        title: row.get("title")?,
        content: row.get("content")?,
        url: row.get("url")?,
        icon,
        sort: row.get("sort")?,
    })
}
