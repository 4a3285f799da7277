//! Bridge to the card game engine process
//!
//! This crate provides:
//! - Engine process launch and jar discovery
//! - Wire protocol for remote class invocation
//! - Transport abstractions (AsyncReader/AsyncWriter traits)
//! - TCP and Unix socket transports
//! - Background reader task for routing responses and pushed events
//! - `EngineContext`, which exposes the engine's classes as remote handles

pub mod config;
pub mod context;
pub mod error;
pub mod protocol;
pub mod tcp;
pub mod transport;
#[cfg(unix)]
pub mod unix;

pub use config::{EngineConfig, find_jar_path};
pub use context::{
    CLASS_REFERENCES, ENGINE_VIEWS, EngineContext, EngineGateway, EngineStatus, RemoteClass,
};
pub use error::{BridgeError, Result};
pub use protocol::{EngineEvent, EngineMessage, RemoteRef, deserialize, serialize};
pub use transport::{AsyncReader, AsyncWriter, reader_task};
