//! Sort-key reordering for cards within one category.
//!
//! # Responsibility
//! - Recompute order keys when a card moves up or down in its category.
//! - Report only the records whose sort value actually changed.
//!
//! # Invariants
//! - Input is the category's full sequence, ordered `sort ASC, id ASC`.
//! - Only the two addressed positions may change; everything else keeps its
//!   sort value and relative order.
//! - Sort values stay non-contiguous over time; no renumbering happens here.

use crate::model::card::Card;

/// Exchanges the sort values of the cards at positions `before` and `after`.
///
/// Returns the cards to persist, with their new sort values (at most two).
/// A move onto itself, an index outside `[0, len)` (stale UI state sends
/// both), or two positions already sharing one sort value yield an empty
/// change set rather than an error.
pub fn swap_sort_keys(cards: &[Card], before: i64, after: i64) -> Vec<Card> {
    if before == after {
        return Vec::new();
    }
    let len = cards.len() as i64;
    if before < 0 || before >= len || after < 0 || after >= len {
        return Vec::new();
    }

    let first = &cards[before as usize];
    let second = &cards[after as usize];
    if first.sort == second.sort {
        return Vec::new();
    }

    let mut moved_down = first.clone();
    let mut moved_up = second.clone();
    moved_down.sort = second.sort;
    moved_up.sort = first.sort;
    vec![moved_down, moved_up]
}
