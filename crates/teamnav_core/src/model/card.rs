//! Card domain model.
//!
//! # Responsibility
//! - Define the canonical card record and its nested icon value.
//! - Define the closed card type enumeration used for handler dispatch.
//!
//! # Invariants
//! - `id` is stable once assigned and never reused for another card.
//! - `kind` always maps to exactly one registered type handler.
//! - `sort` values within a category need not be contiguous; ordering ties
//!   are broken by `id` ascending.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a card, stored as dash-less uuid hex.
pub type CardId = String;

/// Generates a fresh card identifier.
pub fn new_card_id() -> CardId {
    Uuid::new_v4().simple().to_string()
}

/// Closed set of card kinds known to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    /// External bookmark opened in a new tab.
    Link,
    /// Free-form markdown note rendered inline.
    Note,
    /// Embedded third-party widget addressed by URL.
    Embed,
}

/// Every variant, in declaration order. Used for registry completeness checks.
pub const CARD_TYPES: &[CardType] = &[CardType::Link, CardType::Note, CardType::Embed];

impl CardType {
    /// Stable string id used in persisted rows and save requests.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Note => "note",
            Self::Embed => "embed",
        }
    }
}

/// Parses one card type from its stable string id.
pub fn parse_card_type(value: &str) -> Option<CardType> {
    match value {
        "link" => Some(CardType::Link),
        "note" => Some(CardType::Note),
        "embed" => Some(CardType::Embed),
        _ => None,
    }
}

/// Icon value nested inside a card.
///
/// `src` is either a remote URL or a local served path under the icon cache
/// prefix. The remaining fields are decorative and opaque to core logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardIcon {
    /// Remote URL or local served path.
    #[serde(default)]
    pub src: String,
    /// Fallback glyph text shown when no image is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Background color hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CardIcon {
    /// Creates an icon pointing at `src` with no decoration.
    pub fn from_src(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            text: None,
            color: None,
        }
    }
}

/// Canonical stored card record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Stable id, unique across all categories.
    pub id: CardId,
    /// Owning category id.
    pub category: String,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: CardType,
    /// Display title.
    pub title: Option<String>,
    /// Body text; markdown for note cards.
    pub content: Option<String>,
    /// Target URL for link/embed cards.
    pub url: Option<String>,
    /// Nested icon value.
    pub icon: CardIcon,
    /// Order key within the owning category.
    pub sort: i64,
}

/// Save request for one card, before ids and defaults are assigned.
///
/// `kind` stays a raw string here: resolving it through the registry is what
/// turns a stale or foreign type value into a validation error instead of a
/// silent no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDraft {
    /// Owning category id.
    pub category: String,
    /// Raw card type identifier, resolved via the type registry.
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub icon: CardIcon,
    /// Explicit order key; `None` means "append at the end".
    pub sort: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::{new_card_id, parse_card_type, CardIcon, CardType, CARD_TYPES};

    #[test]
    fn card_type_string_ids_round_trip() {
        for kind in CARD_TYPES {
            assert_eq!(parse_card_type(kind.as_str()), Some(*kind));
        }
    }

    #[test]
    fn parse_rejects_unknown_and_non_lowercase_ids() {
        assert_eq!(parse_card_type("qrcode"), None);
        assert_eq!(parse_card_type("Link"), None);
        assert_eq!(parse_card_type(""), None);
    }

    #[test]
    fn new_card_ids_are_dashless_and_unique() {
        let a = new_card_id();
        let b = new_card_id();
        assert_eq!(a.len(), 32);
        assert!(!a.contains('-'));
        assert_ne!(a, b);
    }

    #[test]
    fn icon_serializes_without_empty_decoration() {
        let icon = CardIcon::from_src("https://host/a.png");
        let json = serde_json::to_string(&icon).expect("icon should serialize");
        assert_eq!(json, r#"{"src":"https://host/a.png"}"#);
    }
}
