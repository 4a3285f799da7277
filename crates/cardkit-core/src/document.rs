//! Card document model
//!
//! A card document is an ordered JSON object. The workspace enables
//! serde_json's `preserve_order` feature, so `Map` keeps fields in the
//! order they appeared in the source file and writes them back that way.

use crate::error::{CardKitError, Result};
use serde_json::{Map, Value};
use std::fmt;

/// One parsed card definition
pub type CardDocument = Map<String, Value>;

/// Parse a card document from JSON text
///
/// Fails if the text is not valid JSON or if its top level is not an object.
pub fn parse_document(text: &str) -> Result<CardDocument> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(CardKitError::NotAnObject(value_kind(&other))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A single step from a mapping to one of its child mappings
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// The child is the value stored under this key
    Field(String),
    /// The child is element `index` of the array stored under `key`
    Element { key: String, index: usize },
}

impl PathStep {
    /// Key in the parent mapping this step goes through
    pub fn key(&self) -> &str {
        match self {
            PathStep::Field(key) => key,
            PathStep::Element { key, .. } => key,
        }
    }
}

/// Location of a nested mapping within a card document
///
/// The empty path addresses the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<PathStep>);

impl NodePath {
    /// Path of the document root
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Whether this path addresses the root
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of steps from the root
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Steps from the root, outermost first
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    /// Key under which the addressed node hangs off its parent
    pub fn last_key(&self) -> Option<&str> {
        self.0.last().map(PathStep::key)
    }

    /// Path extended by one step
    pub fn join(&self, step: PathStep) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }
}

/// Renders as a JSON Pointer (RFC 6901), e.g. `/trigger/spells/0`
impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.0 {
            write!(f, "/{}", escape_pointer(step.key()))?;
            if let PathStep::Element { index, .. } = step {
                write!(f, "/{}", index)?;
            }
        }
        Ok(())
    }
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Resolve a path to the mapping it addresses
pub fn node_at<'a>(doc: &'a CardDocument, path: &NodePath) -> Option<&'a CardDocument> {
    let mut node = doc;
    for step in path.steps() {
        let value = match step {
            PathStep::Field(key) => node.get(key)?,
            PathStep::Element { key, index } => node.get(key)?.as_array()?.get(*index)?,
        };
        node = value.as_object()?;
    }
    Some(node)
}

/// Resolve a path to a mutable reference to the mapping it addresses
pub fn node_at_mut<'a>(doc: &'a mut CardDocument, path: &NodePath) -> Option<&'a mut CardDocument> {
    let mut node = doc;
    for step in path.steps() {
        let value = match step {
            PathStep::Field(key) => node.get_mut(key)?,
            PathStep::Element { key, index } => {
                node.get_mut(key)?.as_array_mut()?.get_mut(*index)?
            }
        };
        node = value.as_object_mut()?;
    }
    Some(node)
}
