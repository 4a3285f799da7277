//! # cardkit-core
//!
//! Core types shared by the cardkit crates.
//!
//! This crate provides:
//! - The ordered card document model and node addressing
//! - Hero class to card color lookup
//! - Error types

pub mod class;
pub mod document;
pub mod error;

pub use class::{CLASS_MAPPING, HeroClass, class_color};
pub use document::{CardDocument, NodePath, PathStep, node_at, node_at_mut, parse_document};
pub use error::{CardKitError, Result};
