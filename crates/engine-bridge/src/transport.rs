//! Transport abstractions for the engine bridge
//!
//! Provides AsyncReader/AsyncWriter traits that can be implemented
//! for different transport mechanisms (TCP, Unix sockets), plus the
//! length-prefixed framing they share.

use crate::error::{BridgeError, Result};
use crate::protocol::{EngineEvent, EngineMessage, deserialize};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, warn};

/// Largest frame accepted from the engine (64MB)
pub const MAX_MESSAGE_LEN: usize = 64 * 1024 * 1024;

/// Channel a pending request's response is delivered on
pub type Responder = oneshot::Sender<Result<EngineMessage>>;

/// Trait for async reading from a transport
#[async_trait]
pub trait AsyncReader: Send {
    /// Read a complete message from the transport
    /// Messages are length-prefixed: 4-byte little-endian length + JSON payload
    async fn read_message(&mut self) -> Result<Vec<u8>>;
}

/// Trait for async writing to a transport
#[async_trait]
pub trait AsyncWriter: Send + Sync {
    /// Write a complete message to the transport
    /// Messages are length-prefixed: 4-byte little-endian length + JSON payload
    async fn write_message(&mut self, data: &[u8]) -> Result<()>;
}

/// Read one length-prefixed frame; `label` names the transport in errors
pub async fn read_frame<R>(reader: &mut R, label: &str) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + Send,
{
    let mut len_bytes = [0u8; 4];
    reader
        .read_exact(&mut len_bytes)
        .await
        .map_err(|e| BridgeError::IpcError(format!("{} read length failed: {}", label, e)))?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > MAX_MESSAGE_LEN {
        return Err(BridgeError::IpcError(format!(
            "Message too large: {} bytes",
            len
        )));
    }

    let mut data = vec![0u8; len];
    reader
        .read_exact(&mut data)
        .await
        .map_err(|e| BridgeError::IpcError(format!("{} read data failed: {}", label, e)))?;

    Ok(data)
}

/// Write one length-prefixed frame and flush it
pub async fn write_frame<W>(writer: &mut W, data: &[u8], label: &str) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let len = u32::try_from(data.len())
        .map_err(|_| BridgeError::IpcError(format!("Message too large: {} bytes", data.len())))?;

    writer
        .write_all(&len.to_le_bytes())
        .await
        .map_err(|e| BridgeError::IpcError(format!("{} write length failed: {}", label, e)))?;
    writer
        .write_all(data)
        .await
        .map_err(|e| BridgeError::IpcError(format!("{} write data failed: {}", label, e)))?;
    writer
        .flush()
        .await
        .map_err(|e| BridgeError::IpcError(format!("{} flush failed: {}", label, e)))?;

    Ok(())
}

/// Background reader task that handles incoming messages
///
/// This task:
/// - Receives messages from the engine via the transport
/// - Routes `Event` messages to broadcast subscribers
/// - Routes every other message to the oldest pending request
///
/// Callers must register a responder on `request_rx` before writing the
/// request it answers. Registrations are collected after each frame is
/// read, so a reply always finds its own registration. The read itself is
/// never raced against the channel, which keeps partial frames intact.
pub async fn reader_task<R: AsyncReader>(
    mut reader: R,
    mut request_rx: mpsc::Receiver<Responder>,
    event_tx: broadcast::Sender<EngineEvent>,
) {
    let mut pending: VecDeque<Responder> = VecDeque::new();

    loop {
        let data = match reader.read_message().await {
            Ok(data) => data,
            Err(e) => {
                error!("Reader task failed: {}", e);
                while let Ok(response_tx) = request_rx.try_recv() {
                    pending.push_back(response_tx);
                }
                for response_tx in pending.drain(..) {
                    let _ = response_tx.send(Err(BridgeError::IpcError("Connection lost".into())));
                }
                break;
            }
        };

        let json_preview: String = String::from_utf8_lossy(&data).chars().take(200).collect();
        debug!("[Engine→Rust] len={} json={}", data.len(), json_preview);

        while let Ok(response_tx) = request_rx.try_recv() {
            pending.push_back(response_tx);
        }

        match deserialize(&data) {
            Ok(EngineMessage::Event { event }) => {
                // Ignore send errors (no subscribers)
                let _ = event_tx.send(event);
            }
            Ok(msg) => {
                if let Some(response_tx) = pending.pop_front() {
                    let _ = response_tx.send(Ok(msg));
                } else {
                    warn!("Received response but no pending request: {:?}", msg);
                }
            }
            Err(e) => {
                error!("Failed to deserialize message: {}", e);
                if let Some(response_tx) = pending.pop_front() {
                    let _ = response_tx.send(Err(BridgeError::SerializationError(e.to_string())));
                }
            }
        }
    }

    debug!("Reader task exiting");
}
