//! Handler for external bookmark cards.
//!
//! # Invariants
//! - A link card never persists without a usable URL.
//! - Persisted URLs always carry an explicit scheme.

use std::path::PathBuf;

use crate::cardtype::{
    remove_cached_icon, CardTypeHandler, CardValidationError, HandlerCleanupError,
};
use crate::model::card::{Card, CardType};
use crate::model::view::CardTreeChild;

/// Handler for [`CardType::Link`] cards.
pub struct LinkHandler {
    icon_root: PathBuf,
}

impl LinkHandler {
    /// Creates the handler; `icon_root` locates cached icon files for cleanup.
    pub fn new(icon_root: impl Into<PathBuf>) -> Self {
        Self {
            icon_root: icon_root.into(),
        }
    }
}

impl CardTypeHandler for LinkHandler {
    fn served_kinds(&self) -> &'static [CardType] {
        &[CardType::Link]
    }

    fn format_view(&self, child: &mut CardTreeChild) {
        let title = child.title.as_deref().map(str::trim).unwrap_or_default();
        child.display_text = if title.is_empty() {
            child.url.as_deref().map(url_host).map(str::to_string)
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
                kind: CardType::Link,
                field: "url",
            });
        }
        card.url = Some(normalize_url(url));
        Ok(())
    }

    fn after_delete(&self, card: &Card) -> Result<(), HandlerCleanupError> {
        remove_cached_icon(&self.icon_root, &card.icon)
    }
}

/// Prepends `https://` when the URL carries no scheme.
fn normalize_url(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Extracts the host portion of a URL for fallback display text.
fn url_host(url: &str) -> &str {
    let after_scheme = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    after_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(after_scheme)
}

#[cfg(test)]
mod tests {
    use super::{normalize_url, url_host, LinkHandler};
    use crate::cardtype::{CardTypeHandler, CardValidationError};
    use crate::model::card::{Card, CardIcon, CardType};
    use crate::model::view::CardTreeChild;

    fn link_card(url: Option<&str>) -> Card {
        Card {
            id: "c1".to_string(),
            category: "dev".to_string(),
            kind: CardType::Link,
            title: None,
            content: None,
            url: url.map(str::to_string),
            icon: CardIcon::default(),
            sort: 1,
        }
    }

    #[test]
    fn before_save_rejects_blank_url() {
        let handler = LinkHandler::new("/tmp");
        let mut card = link_card(Some("   "));
        let err = handler
            .before_save(None, &mut card)
            .expect_err("blank url must fail");
        assert_eq!(
            err,
            CardValidationError::MissingField {
                kind: CardType::Link,
                field: "url",
            }
        );
    }

    #[test]
    fn before_save_defaults_missing_scheme_to_https() {
        let handler = LinkHandler::new("/tmp");
        let mut card = link_card(Some("example.com/docs"));
        handler.before_save(None, &mut card).expect("valid url");
        assert_eq!(card.url.as_deref(), Some("https://example.com/docs"));

        let mut explicit = link_card(Some("http://example.com"));
        handler.before_save(None, &mut explicit).expect("valid url");
        assert_eq!(explicit.url.as_deref(), Some("http://example.com"));
    }

    #[test]
    fn format_view_falls_back_to_url_host() {
        let handler = LinkHandler::new("/tmp");
        let mut child = CardTreeChild::new(link_card(Some("https://docs.example.com/a/b")));
        handler.format_view(&mut child);
        assert_eq!(child.display_text.as_deref(), Some("docs.example.com"));

        child.title = Some("Docs".to_string());
        handler.format_view(&mut child);
        assert_eq!(child.display_text.as_deref(), Some("Docs"));
    }

    #[test]
    fn url_helpers_handle_edge_shapes() {
        assert_eq!(normalize_url("ftp://host/x"), "ftp://host/x");
        assert_eq!(url_host("host.only"), "host.only");
        assert_eq!(url_host("https://host?q=1"), "host");
    }
}
