//! Unix socket transport implementation for the engine bridge
//!
//! Used when the engine is configured to listen on a Unix domain socket
//! instead of a TCP port.

use crate::error::Result;
use crate::transport::{AsyncReader, AsyncWriter, read_frame, write_frame};
use async_trait::async_trait;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

/// Unix socket read wrapper
pub struct UnixReadWrapper(pub OwnedReadHalf);

#[async_trait]
impl AsyncReader for UnixReadWrapper {
    async fn read_message(&mut self) -> Result<Vec<u8>> {
        read_frame(&mut self.0, "Unix").await
    }
}

/// Unix socket write wrapper
pub struct UnixWriteWrapper(pub OwnedWriteHalf);

#[async_trait]
impl AsyncWriter for UnixWriteWrapper {
    async fn write_message(&mut self, data: &[u8]) -> Result<()> {
        write_frame(&mut self.0, data, "Unix").await
    }
}
