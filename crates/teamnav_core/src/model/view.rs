//! Read models returned by card lifecycle operations.
//!
//! # Responsibility
//! - Carry stored card data decorated for display.
//! - Keep formatting augmentation out of the canonical `Card` record.
//!
//! # Invariants
//! - Building a view never mutates the stored card.
//! - Children inside one tree node are sorted `(sort, id)` ascending.

use serde::{Deserialize, Serialize};

use crate::model::card::{Card, CardIcon, CardId, CardType};
use crate::model::category::Category;

/// Single-category listing item, decorated with the category display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardView {
    pub id: CardId,
    pub category: String,
    /// Display name of the owning category.
    pub category_name: String,
    #[serde(rename = "type")]
    pub kind: CardType,
    pub title: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub icon: CardIcon,
    pub sort: i64,
}

impl CardView {
    /// Builds a view from a stored card and its category display name.
    pub fn new(card: Card, category_name: impl Into<String>) -> Self {
        Self {
            id: card.id,
            category: card.category,
            category_name: category_name.into(),
            kind: card.kind,
            title: card.title,
            content: card.content,
            url: card.url,
            icon: card.icon,
            sort: card.sort,
        }
    }
}

/// Card entry inside a dashboard tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTreeChild {
    pub id: CardId,
    #[serde(rename = "type")]
    pub kind: CardType,
    pub title: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub icon: CardIcon,
    pub sort: i64,
    /// Type-specific display text filled in by the card's handler.
    pub display_text: Option<String>,
    /// Hover summary joining the distinct non-blank display fields.
    pub tip: String,
}

impl CardTreeChild {
    /// Builds an undecorated child from a stored card.
    ///
    /// `display_text` and `tip` start empty; the type handler and the
    /// lifecycle service fill them in.
    pub fn new(card: Card) -> Self {
        Self {
            id: card.id,
            kind: card.kind,
            title: card.title,
            content: card.content,
            url: card.url,
            icon: card.icon,
            sort: card.sort,
            display_text: None,
            tip: String::new(),
        }
    }
}

/// One category with its visible cards, as served to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTreeNode {
    pub id: String,
    pub name: String,
    pub sort: i64,
    pub children: Vec<CardTreeChild>,
}

impl CardTreeNode {
    /// Builds a node from a category and its already-sorted children.
    pub fn new(category: &Category, children: Vec<CardTreeChild>) -> Self {
        Self {
            id: category.id.clone(),
            name: category.name.clone(),
            sort: category.sort,
            children,
        }
    }
}
