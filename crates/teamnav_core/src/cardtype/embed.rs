//! Handler for embedded third-party widget cards.
//!
//! # Invariants
//! - An embed card never persists without its widget URL.
//! - The widget URL is stored verbatim; embed providers are sensitive to
//!   rewritten query strings.

use std::path::PathBuf;

use crate::cardtype::{
    remove_cached_icon, CardTypeHandler, CardValidationError, HandlerCleanupError,
};
use crate::model::card::{Card, CardType};
use crate::model::view::CardTreeChild;

/// Handler for [`CardType::Embed`] cards.
pub struct EmbedHandler {
    icon_root: PathBuf,
}

impl EmbedHandler {
    /// Creates the handler; `icon_root` locates cached icon files for cleanup.
    pub fn new(icon_root: impl Into<PathBuf>) -> Self {
        Self {
            icon_root: icon_root.into(),
        }
    }
}

impl CardTypeHandler for EmbedHandler {
    fn served_kinds(&self) -> &'static [CardType] {
        &[CardType::Embed]
    }

    fn format_view(&self, child: &mut CardTreeChild) {
        let title = child.title.as_deref().map(str::trim).unwrap_or_default();
        child.display_text = if title.is_empty() {
            child.url.clone()
        } else {
            Some(title.to_string())
        };
    }

    fn before_save(
        &self,
        _existing_id: Option<&str>,
        card: &mut Card,
    ) -> Result<(), CardValidationError> {
        let url = card.url.as_deref().map(str::trim).unwrap_or_default();
        if url.is_empty() {
            return Err(CardValidationError::MissingField {
                kind: CardType::Embed,
                field: "url",
            });
        }
        card.url = Some(url.to_string());
        Ok(())
    }

    fn after_delete(&self, card: &Card) -> Result<(), HandlerCleanupError> {
        remove_cached_icon(&self.icon_root, &card.icon)
    }
}
