//! TCP transport implementation for the engine bridge
//!
//! Used when the engine process binds a local gateway port.

use crate::error::Result;
use crate::transport::{AsyncReader, AsyncWriter, read_frame, write_frame};
use async_trait::async_trait;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// TCP read wrapper
pub struct TcpReadWrapper(pub OwnedReadHalf);

#[async_trait]
impl AsyncReader for TcpReadWrapper {
    async fn read_message(&mut self) -> Result<Vec<u8>> {
        read_frame(&mut self.0, "TCP").await
    }
}

/// TCP write wrapper
pub struct TcpWriteWrapper(pub OwnedWriteHalf);

#[async_trait]
impl AsyncWriter for TcpWriteWrapper {
    async fn write_message(&mut self, data: &[u8]) -> Result<()> {
        write_frame(&mut self.0, data, "TCP").await
    }
}
