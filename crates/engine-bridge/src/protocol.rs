//! Wire protocol for Rust <-> engine communication
//!
//! Messages are serialized as JSON with internally-tagged enums.
//! Format: {"Type": "MessageType", ...fields}

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// A class on the engine side, named relative to one of its package views
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteRef {
    /// View the class is resolved in (e.g. `cards`)
    pub view: String,
    /// Class path inside the view (e.g. `CardCatalogue`, `heroes.Hero`)
    pub class: String,
}

impl RemoteRef {
    pub fn new(view: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            class: class.into(),
        }
    }
}

impl std::fmt::Display for RemoteRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.view, self.class)
    }
}

/// Event pushed by the engine outside of any request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EngineEvent {
    pub name: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Messages sent between the Rust bridge and the engine process
///
/// `rename_all` on the enum only renames variants, so each field carries
/// its own PascalCase rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all = "PascalCase")]
pub enum EngineMessage {
    // === Engine -> Rust ===
    /// Engine is up; always the first message on a connection
    Ready {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Version")]
        version: String,
    },

    /// Package view created and imported
    Imported {
        #[serde(rename = "View")]
        view: String,
    },

    /// Result of an invocation
    ReturnValue {
        #[serde(rename = "Value", default)]
        value: serde_json::Value,
    },

    /// Pushed engine event
    Event {
        #[serde(flatten)]
        event: EngineEvent,
    },

    /// Error response
    Error {
        #[serde(rename = "Code", deserialize_with = "error_code")]
        code: i32,
        #[serde(rename = "Message")]
        message: String,
    },

    // === Rust -> Engine ===
    /// Create a named view and import a package into it
    ImportPackage {
        #[serde(rename = "View")]
        view: String,
        #[serde(rename = "Package")]
        package: String,
    },

    /// Call a static method on a remote class
    Invoke {
        #[serde(rename = "Target")]
        target: RemoteRef,
        #[serde(rename = "Method")]
        method: String,
        #[serde(rename = "Args", default)]
        args: Vec<serde_json::Value>,
    },

    /// Shut the engine down
    Shutdown,
}

/// Read an error code through `Number`, which also accepts the buffered
/// form numbers take inside a tagged enum under `arbitrary_precision`
fn error_code<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    number
        .as_i64()
        .and_then(|code| i32::try_from(code).ok())
        .ok_or_else(|| D::Error::custom(format!("error code out of range: {}", number)))
}

/// Serialize a message to JSON bytes
pub fn serialize(msg: &EngineMessage) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(msg)
}

/// Deserialize a message from JSON bytes
pub fn deserialize(bytes: &[u8]) -> Result<EngineMessage, serde_json::Error> {
    serde_json::from_slice(bytes)
}
