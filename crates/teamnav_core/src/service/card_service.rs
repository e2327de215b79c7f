//! Card lifecycle service.
//!
//! # Responsibility
//! - Orchestrate save/select/tree/change_sort/delete around the repositories.
//! - Run type-handler hooks and icon caching at the right lifecycle points.
//!
//! # Invariants
//! - Every save resolves the draft's raw type through the registry; an
//!   unresolvable type is a validation error, never a silent no-op.
//! - Listings are ordered `(sort, id)` ascending within a category.
//! - Reordering persists only the records whose sort value changed.
//! - Delete-time handler cleanup is best-effort: failures are logged after
//!   the row is already gone, never escalated.

use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

use log::{info, warn};

use crate::cardtype::{
    CardTypeRegistry, CardValidationError, UnknownCardTypeError,
};
use crate::icon::{IconCacheError, IconCacheFetcher};
use crate::model::card::{new_card_id, Card, CardDraft, CardId};
use crate::model::view::{CardTreeChild, CardTreeNode, CardView};
use crate::reorder::swap_sort_keys;
use crate::repo::card_repo::{CardRepository, RepoError};
use crate::repo::category_repo::CategoryRepository;

pub type CardServiceResult<T> = Result<T, CardServiceError>;

/// Card lifecycle error taxonomy.
#[derive(Debug)]
pub enum CardServiceError {
    /// Draft named a type with no registered handler (user-correctable).
    UnknownCardType(UnknownCardTypeError),
    /// Type-specific validation rejected the draft (user-correctable).
    Validation(CardValidationError),
    /// Icon cache infrastructure failure; aborts the save.
    IconCache(IconCacheError),
    /// Referenced card does not exist.
    NotFound(CardId),
    /// Referenced category does not exist.
    CategoryNotFound(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for CardServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCardType(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::IconCache(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "card not found: {id}"),
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CardServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownCardType(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::IconCache(err) => Some(err),
            Self::NotFound(_) => None,
            Self::CategoryNotFound(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<UnknownCardTypeError> for CardServiceError {
    fn from(value: UnknownCardTypeError) -> Self {
        Self::UnknownCardType(value)
    }
}

impl From<CardValidationError> for CardServiceError {
    fn from(value: CardValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<IconCacheError> for CardServiceError {
    fn from(value: IconCacheError) -> Self {
        Self::IconCache(value)
    }
}

impl From<RepoError> for CardServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Orchestrates the card lifecycle over explicit collaborators.
///
/// Constructed once at startup and shared by reference between callers; it
/// holds no interior mutability of its own.
pub struct CardService<C: CardRepository, G: CategoryRepository> {
    cards: C,
    categories: G,
    registry: CardTypeRegistry,
    icons: IconCacheFetcher,
}

impl<C: CardRepository, G: CategoryRepository> CardService<C, G> {
    /// Creates the service from its collaborators.
    pub fn new(cards: C, categories: G, registry: CardTypeRegistry, icons: IconCacheFetcher) -> Self {
        Self {
            cards,
            categories,
            registry,
            icons,
        }
    }

    /// Saves one card, creating it when `id` is blank or absent.
    ///
    /// Order matters: the icon is mirrored first (a directory failure aborts
    /// the save before anything persists), then the type handler validates
    /// and defaults the record, then a missing sort gets `max + 1` within the
    /// category.
    pub fn save(&self, id: Option<&str>, draft: CardDraft) -> CardServiceResult<Card> {
        let existing_id = id.map(str::trim).filter(|value| !value.is_empty());

        let icon = self.icons.cache_icon(draft.icon)?;
        let (kind, handler) = self.registry.lookup(&draft.kind)?;

        let mut card = Card {
            id: existing_id.map(str::to_string).unwrap_or_else(new_card_id),
            category: draft.category,
            kind,
            title: draft.title,
            content: draft.content,
            url: draft.url,
            icon,
            sort: draft.sort.unwrap_or_default(),
        };

        handler.before_save(existing_id, &mut card)?;

        if draft.sort.is_none() {
            card.sort = self.cards.max_sort(&card.category)? + 1;
        }

        self.cards.save(&card)?;
        info!(
            "event=card_save module=service status=ok id={} category={} kind={} sort={}",
            card.id,
            card.category,
            card.kind.as_str(),
            card.sort
        );
        Ok(card)
    }

    /// Lists one category's cards ordered `(sort, id)`, decorated with the
    /// category display name.
    pub fn select(&self, category: &str) -> CardServiceResult<Vec<CardView>> {
        let found = self
            .categories
            .get(category)?
            .ok_or_else(|| CardServiceError::CategoryNotFound(category.to_string()))?;
        let cards = self.cards.find_by_category_ordered(category)?;
        Ok(cards
            .into_iter()
            .map(|card| CardView::new(card, found.name.as_str()))
            .collect())
    }

    /// Builds the dashboard tree, optionally filtered by a keyword.
    ///
    /// Matching is case-insensitive over title, content and url. Categories
    /// without matching cards are dropped; the rest are ordered by their own
    /// sort key, children by `(sort, id)`.
    pub fn tree(&self, keywords: Option<&str>) -> CardServiceResult<Vec<CardTreeNode>> {
        let categories = self.categories.list_all()?;
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let term = keywords.map(str::trim).filter(|value| !value.is_empty());
        let cards = match term {
            Some(term) => self.cards.find_by_keywords(&term.to_lowercase())?,
            None => self.cards.find_all()?,
        };
        if cards.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_category: HashMap<String, Vec<Card>> = HashMap::new();
        for card in cards {
            by_category
                .entry(card.category.clone())
                .or_default()
                .push(card);
        }

        let mut nodes = Vec::new();
        for category in &categories {
            let Some(members) = by_category.remove(&category.id) else {
                continue;
            };
            let children = self.build_children(members)?;
            nodes.push(CardTreeNode::new(category, children));
        }
        nodes.sort_by(|a, b| a.sort.cmp(&b.sort).then_with(|| a.id.cmp(&b.id)));
        Ok(nodes)
    }

    /// Swaps the order keys of the cards at two positions within a category.
    ///
    /// Positions index into the freshly loaded `(sort, id)`-ordered list, so
    /// stale indices from the UI are benign no-ops. Returns the persisted
    /// change set (at most two cards), written atomically.
    pub fn change_sort(
        &self,
        category: &str,
        before: i64,
        after: i64,
    ) -> CardServiceResult<Vec<Card>> {
        let cards = self.cards.find_by_category_ordered(category)?;
        let changed = swap_sort_keys(&cards, before, after);
        if changed.is_empty() {
            return Ok(changed);
        }
        self.cards.save_all(&changed)?;
        info!(
            "event=card_change_sort module=service status=ok category={category} \
             before={before} after={after} changed={}",
            changed.len()
        );
        Ok(changed)
    }

    /// Deletes one card, then runs its type handler's cleanup hook.
    pub fn delete(&self, id: &str) -> CardServiceResult<()> {
        let card = self
            .cards
            .find_by_id(id)?
            .ok_or_else(|| CardServiceError::NotFound(id.to_string()))?;

        self.cards.delete_by_id(id)?;

        let handler = self.registry.handler_for(card.kind)?;
        if let Err(err) = handler.after_delete(&card) {
            // The row is gone; cleanup debris is preferable to a failed delete.
            warn!(
                "event=card_delete module=service status=degraded id={id} cleanup_error={err}"
            );
        } else {
            info!("event=card_delete module=service status=ok id={id}");
        }
        Ok(())
    }

    fn build_children(&self, cards: Vec<Card>) -> CardServiceResult<Vec<CardTreeChild>> {
        let mut children = Vec::with_capacity(cards.len());
        for card in cards {
            let handler = self.registry.handler_for(card.kind)?;
            let mut child = CardTreeChild::new(card);
            handler.format_view(&mut child);
            child.tip = build_tip(&child);
            children.push(child);
        }
        children.sort_by(|a, b| a.sort.cmp(&b.sort).then_with(|| a.id.cmp(&b.id)));
        Ok(children)
    }
}

/// Joins the distinct non-blank display fields into the hover summary.
fn build_tip(child: &CardTreeChild) -> String {
    let mut lines: Vec<&str> = Vec::with_capacity(3);
    for field in [&child.title, &child.content, &child.url] {
        let Some(value) = field.as_deref().map(str::trim) else {
            continue;
        };
        if !value.is_empty() && !lines.contains(&value) {
            lines.push(value);
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::build_tip;
    use crate::model::card::{Card, CardIcon, CardType};
    use crate::model::view::CardTreeChild;

    fn child(title: Option<&str>, content: Option<&str>, url: Option<&str>) -> CardTreeChild {
        CardTreeChild::new(Card {
            id: "t1".to_string(),
            category: "dev".to_string(),
            kind: CardType::Link,
            title: title.map(str::to_string),
            content: content.map(str::to_string),
            url: url.map(str::to_string),
            icon: CardIcon::default(),
            sort: 1,
        })
    }

    #[test]
    fn tip_joins_distinct_non_blank_fields() {
        let tip = build_tip(&child(
            Some("CI"),
            Some("build status"),
            Some("https://ci.example.com"),
        ));
        assert_eq!(tip, "CI\nbuild status\nhttps://ci.example.com");
    }

    #[test]
    fn tip_drops_blanks_and_duplicates() {
        let tip = build_tip(&child(Some("CI"), Some("  "), Some("CI")));
        assert_eq!(tip, "CI");
        assert_eq!(build_tip(&child(None, None, None)), "");
    }
}
