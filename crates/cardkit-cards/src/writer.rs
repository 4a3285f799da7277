//! Card writer
//!
//! Cards are written with two-space indentation, `": "` between keys and
//! values, and fields in their original order. The write is not atomic: a
//! failure part way through can leave a truncated file behind.

use cardkit_core::{CardDocument, CardKitError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Render a card exactly as [`write_card`] would write it
pub fn to_card_string(card: &CardDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(card)?)
}

/// Write a card to `path`, replacing any existing file
pub fn write_card(card: &CardDocument, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let io_err = |e: std::io::Error| CardKitError::Io(format!("{}: {}", path.display(), e));

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, card).map_err(|e| {
        if e.is_io() {
            io_err(e.into())
        } else {
            CardKitError::from(e)
        }
    })?;
    writer.flush().map_err(io_err)?;

    debug!("Wrote card with {} fields to {}", card.len(), path.display());
    Ok(())
}

/// SHA-256 of the written form of a card, hex encoded
///
/// Two cards share a fingerprint exactly when writing them would produce
/// the same bytes, so field order matters.
pub fn fingerprint(card: &CardDocument) -> Result<String> {
    let text = to_card_string(card)?;
    Ok(fingerprint_bytes(text.as_bytes()))
}

/// SHA-256 of raw file contents, comparable with [`fingerprint`]
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
