//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, registry and icon-cache calls into the card
//!   lifecycle API.
//! - Keep callers (HTTP or otherwise) decoupled from storage details.

pub mod card_service;
