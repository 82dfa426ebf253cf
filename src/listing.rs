//! Directory listing: one name per 32-byte chunk.

use anyhow::Result;

use crate::{
    Transport,
    bus::Bus,
    constants::{CHUNK_SIZE, sentinels},
    protocol::decode_byte,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Name(String),
    EndOfListing,
}

impl Entry {
    /// The name; empty for [`Entry::EndOfListing`].
    pub fn name(&self) -> &str {
        match self {
            Entry::Name(s) => s,
            Entry::EndOfListing => "",
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Entry::EndOfListing)
    }
}

/// Decodes a single listing chunk.
///
/// A leading 0xFF means the listing is exhausted. Otherwise the name runs up
/// to the first NUL, the first 0xFF, or the end of the chunk.
pub fn scan_filename(chunk: &[u8; CHUNK_SIZE]) -> Entry {
    if chunk[0] == sentinels::EOF {
        return Entry::EndOfListing;
    }
    let name = chunk
        .iter()
        .take_while(|&&b| b != sentinels::NUL && b != sentinels::EOF)
        .map(|&b| decode_byte(b))
        .collect();
    Entry::Name(name)
}

pub fn read_filename<T: Transport>(bus: &mut Bus<T>) -> Result<Entry> {
    let chunk = bus.read_chunk()?;
    Ok(scan_filename(&chunk))
}
