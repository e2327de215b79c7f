//! Category domain model.
//!
//! Categories are owned by an external collaborator; the card core only reads
//! them for grouping and display-name decoration.

use serde::{Deserialize, Serialize};

/// Named grouping of cards, itself orderable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Stable category id.
    pub id: String,
    /// User-facing display name.
    pub name: String,
    /// Order key among categories.
    pub sort: i64,
}
