//! Card data utilities
//!
//! This crate provides:
//! - Recursive loading of card JSON files with skip-on-error
//! - Breadth-first walking of a card with inherited field views
//! - Card id formatting
//! - Order-preserving card writing and fingerprints

pub mod loader;
pub mod naming;
pub mod walker;
pub mod writer;

pub use loader::{CardFiles, LoaderConfig, iter_cards, load_card};
pub use naming::{card_id, name_to_id};
pub use walker::{CardWalk, NodeMut, TraversalNode, walk_card, walk_card_mut};
pub use writer::{fingerprint, fingerprint_bytes, to_card_string, write_card};

pub use cardkit_core::{CardDocument, CardKitError, NodePath, PathStep, Result};
