//! Card type capability contract and handler registry.
//!
//! # Responsibility
//! - Define the per-type hook set invoked around card persistence.
//! - Hold the immutable type-to-handler mapping built at startup.
//!
//! # Invariants
//! - Every `CardType` variant has exactly one registered handler; a gap or a
//!   duplicate fails registry construction, never a later lookup.
//! - The mapping is immutable after construction and safe for concurrent
//!   reads.
//! - An identifier that does not parse and a parseable identifier with no
//!   handler surface as the same `UnknownCardTypeError`.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::icon::ICON_PUBLIC_PREFIX;
use crate::model::card::{parse_card_type, Card, CardIcon, CardType, CARD_TYPES};
use crate::model::view::CardTreeChild;

pub mod embed;
pub mod link;
pub mod note;

pub use embed::EmbedHandler;
pub use link::LinkHandler;
pub use note::NoteHandler;

/// Type-specific validation failure raised by [`CardTypeHandler::before_save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardValidationError {
    /// A field required by this card type is blank or absent.
    MissingField {
        kind: CardType,
        field: &'static str,
    },
}

impl Display for CardValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { kind, field } => {
                write!(f, "card of type `{}` requires `{field}`", kind.as_str())
            }
        }
    }
}

impl Error for CardValidationError {}

/// Failure of a best-effort [`CardTypeHandler::after_delete`] cleanup.
///
/// Callers log this and never escalate it; the primary delete has already
/// succeeded by the time cleanup runs.
#[derive(Debug)]
pub enum HandlerCleanupError {
    Io { path: PathBuf, source: io::Error },
}

impl Display for HandlerCleanupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cleanup of `{}` failed: {source}", path.display())
            }
        }
    }
}

impl Error for HandlerCleanupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// A card type identifier that resolves to no registered handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCardTypeError(pub String);

impl Display for UnknownCardTypeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown card type: `{}`", self.0)
    }
}

impl Error for UnknownCardTypeError {}

/// Registry construction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// A declared card type has no registered handler.
    MissingHandler(CardType),
    /// Two handlers claimed the same card type.
    DuplicateHandler(CardType),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHandler(kind) => {
                write!(f, "no handler registered for card type `{}`", kind.as_str())
            }
            Self::DuplicateHandler(kind) => {
                write!(f, "card type `{}` registered twice", kind.as_str())
            }
        }
    }
}

impl Error for RegistryError {}

/// Capability set implemented once per card type.
pub trait CardTypeHandler: Send + Sync {
    /// Type identifiers served by this handler.
    fn served_kinds(&self) -> &'static [CardType];

    /// Augments the read model for display; never touches the stored card.
    fn format_view(&self, child: &mut CardTreeChild);

    /// Applies type-specific defaulting and validation before persistence.
    ///
    /// `existing_id` is `Some` when the save updates an already stored card.
    fn before_save(
        &self,
        existing_id: Option<&str>,
        card: &mut Card,
    ) -> Result<(), CardValidationError>;

    /// Best-effort cleanup after the card row has been removed.
    fn after_delete(&self, card: &Card) -> Result<(), HandlerCleanupError> {
        let _ = card;
        Ok(())
    }
}

impl std::fmt::Debug for dyn CardTypeHandler + '_ {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardTypeHandler")
            .field("served_kinds", &self.served_kinds())
            .finish()
    }
}

/// Immutable mapping from card type to handler, built once at startup.
pub struct CardTypeRegistry {
    handlers: BTreeMap<CardType, Arc<dyn CardTypeHandler>>,
}

impl CardTypeRegistry {
    /// Builds the registry from an explicit handler list.
    ///
    /// Fails fast when a handler claims an already-taken type or when any
    /// variant of the closed enumeration is left unserved.
    pub fn try_new(handlers: Vec<Arc<dyn CardTypeHandler>>) -> Result<Self, RegistryError> {
        let mut map: BTreeMap<CardType, Arc<dyn CardTypeHandler>> = BTreeMap::new();
        for handler in handlers {
            for kind in handler.served_kinds() {
                if map.insert(*kind, Arc::clone(&handler)).is_some() {
                    return Err(RegistryError::DuplicateHandler(*kind));
                }
            }
        }
        for kind in CARD_TYPES {
            if !map.contains_key(kind) {
                return Err(RegistryError::MissingHandler(*kind));
            }
        }
        Ok(Self { handlers: map })
    }

    /// Wires the production handler set.
    ///
    /// `icon_root` is the storage root under which cached icon files live;
    /// handlers that own hotlinked icons use it for delete-time cleanup.
    pub fn with_defaults(icon_root: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let icon_root = icon_root.into();
        Self::try_new(vec![
            Arc::new(LinkHandler::new(icon_root.clone())),
            Arc::new(NoteHandler::new()),
            Arc::new(EmbedHandler::new(icon_root)),
        ])
    }

    /// Resolves a raw type identifier to its kind and handler.
    pub fn lookup(&self, raw: &str) -> Result<(CardType, &dyn CardTypeHandler), UnknownCardTypeError> {
        let kind =
            parse_card_type(raw).ok_or_else(|| UnknownCardTypeError(raw.to_string()))?;
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| UnknownCardTypeError(raw.to_string()))?;
        Ok((kind, handler.as_ref()))
    }

    /// Resolves an already-typed kind to its handler.
    pub fn handler_for(&self, kind: CardType) -> Result<&dyn CardTypeHandler, UnknownCardTypeError> {
        self.handlers
            .get(&kind)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| UnknownCardTypeError(kind.as_str().to_string()))
    }
}

/// Removes the locally cached icon file referenced by `icon`, if any.
///
/// Remote URLs and non-cache paths are left alone. A file that is already
/// gone counts as successful cleanup.
fn remove_cached_icon(icon_root: &Path, icon: &CardIcon) -> Result<(), HandlerCleanupError> {
    let Some(relative) = icon.src.strip_prefix(ICON_PUBLIC_PREFIX) else {
        return Ok(());
    };
    let path = icon_root.join(relative.trim_start_matches('/'));
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(HandlerCleanupError::Io { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        remove_cached_icon, CardTypeHandler, CardTypeRegistry, RegistryError, UnknownCardTypeError,
    };
    use crate::model::card::{Card, CardIcon, CardType, CARD_TYPES};
    use crate::model::view::CardTreeChild;
    use std::sync::Arc;

    struct SingleKindHandler(&'static [CardType]);

    impl CardTypeHandler for SingleKindHandler {
        fn served_kinds(&self) -> &'static [CardType] {
            self.0
        }

        fn format_view(&self, _child: &mut CardTreeChild) {}

        fn before_save(
            &self,
            _existing_id: Option<&str>,
            _card: &mut Card,
        ) -> Result<(), super::CardValidationError> {
            Ok(())
        }
    }

    #[test]
    fn default_registry_serves_every_declared_type() {
        let registry = CardTypeRegistry::with_defaults("/tmp/teamnav-icons")
            .expect("default registry should cover the closed set");
        for kind in CARD_TYPES {
            registry
                .lookup(kind.as_str())
                .expect("declared type should resolve");
            registry
                .handler_for(*kind)
                .expect("typed lookup should resolve");
        }
    }

    #[test]
    fn lookup_rejects_unknown_identifier() {
        let registry =
            CardTypeRegistry::with_defaults("/tmp/teamnav-icons").expect("default registry");
        let err = registry.lookup("qrcode").expect_err("unknown type must fail");
        assert_eq!(err, UnknownCardTypeError("qrcode".to_string()));
    }

    #[test]
    fn construction_fails_on_missing_handler() {
        let err = CardTypeRegistry::try_new(vec![Arc::new(SingleKindHandler(&[CardType::Link]))])
            .err()
            .expect("incomplete set must fail");
        assert!(matches!(err, RegistryError::MissingHandler(_)));
    }

    #[test]
    fn construction_fails_on_duplicate_handler() {
        let err = CardTypeRegistry::try_new(vec![
            Arc::new(SingleKindHandler(&[CardType::Link])),
            Arc::new(SingleKindHandler(&[CardType::Link, CardType::Note])),
            Arc::new(SingleKindHandler(&[CardType::Embed])),
        ])
        .err()
        .expect("double registration must fail");
        assert_eq!(err, RegistryError::DuplicateHandler(CardType::Link));
    }

    #[test]
    fn cached_icon_cleanup_ignores_remote_and_missing_files() {
        let dir = tempfile::tempdir().expect("temp dir");

        let remote = CardIcon::from_src("https://host/a.png");
        remove_cached_icon(dir.path(), &remote).expect("remote src is a no-op");

        let missing = CardIcon::from_src("/ext-resources/images/20240101/gone.png");
        remove_cached_icon(dir.path(), &missing).expect("missing file counts as cleaned");
    }
}
