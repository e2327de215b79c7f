//! Handler for inline markdown note cards.
//!
//! # Invariants
//! - A note card never persists without body content.
//! - Display text is a plain-text projection; markdown syntax never leaks
//!   into the dashboard tree.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cardtype::{CardTypeHandler, CardValidationError};
use crate::model::card::{Card, CardType};
use crate::model::view::CardTreeChild;

const PREVIEW_MAX_CHARS: usize = 100;
const DEFAULT_TITLE_MAX_CHARS: usize = 30;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*]\([^)]*\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*_`#>~|\[\]()!-]+").expect("valid symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Handler for [`CardType::Note`] cards.
pub struct NoteHandler;

impl NoteHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoteHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CardTypeHandler for NoteHandler {
    fn served_kinds(&self) -> &'static [CardType] {
        &[CardType::Note]
    }

    fn format_view(&self, child: &mut CardTreeChild) {
        child.display_text = child.content.as_deref().and_then(derive_note_preview);
    }

    fn before_save(
        &self,
        existing_id: Option<&str>,
        card: &mut Card,
    ) -> Result<(), CardValidationError> {
        let content = card.content.as_deref().map(str::trim).unwrap_or_default();
        if content.is_empty() {
            return Err(CardValidationError::MissingField {
                kind: CardType::Note,
                field: "content",
            });
        }

        // First save of an untitled note gets a title derived from the body;
        // later saves keep whatever title the user settled on, even blank.
        let title_blank = card
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .is_empty();
        if existing_id.is_none() && title_blank {
            card.title = derive_note_preview(content)
                .map(|preview| preview.chars().take(DEFAULT_TITLE_MAX_CHARS).collect());
        }
        Ok(())
    }
}

/// Projects markdown content onto a single plain-text preview line.
///
/// Images are dropped, links keep their label, markdown symbols are removed
/// and whitespace is collapsed; the first `PREVIEW_MAX_CHARS` characters are
/// retained.
pub fn derive_note_preview(content: &str) -> Option<String> {
    let without_images = MARKDOWN_IMAGE_RE.replace_all(content, " ");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, " ");
    let normalized = WHITESPACE_RE.replace_all(&without_symbols, " ");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(PREVIEW_MAX_CHARS).collect())
}
