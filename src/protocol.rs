//! The register-level command set of the OpenLog I2C interface

use anyhow::Result;

use crate::constants::{registers, MAX_PAYLOAD};

/// OpenLog register write.
///
/// Every command goes out as one bus frame: the register byte followed by at
/// most [`MAX_PAYLOAD`] payload bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Command {
    /// Move the device to a new bus address. Takes effect immediately.
    SetAddress(u8),
    /// Start a new sequential log file.
    InitLog,
    CreateFile(String),
    MakeDir(String),
    ChangeDir(String),
    /// Start streaming a file. The stream is read back in 32-byte chunks.
    ReadFile(String),
    /// Move the device-side read cursor.
    StartPosition(u8),
    /// Open (or create) a file for appending.
    OpenFile(String),
    /// Append raw bytes to the open file, at most 31 per frame.
    WriteFile(Vec<u8>),
    /// Request the size of a file, answered by a 4-byte big-endian read.
    FileSize(String),
    /// Start a directory listing. Wildcards are allowed.
    List(String),
    /// Remove files; wildcards are allowed.
    Remove(String),
    /// Remove a directory and everything below it.
    RemoveRecursive(String),
    /// Flush the open file to the card.
    SyncFile,
}

impl Command {
    pub fn register(&self) -> u8 {
        match self {
            Command::SetAddress(_) => registers::I2C_ADDRESS,
            Command::InitLog => registers::LOG_INIT,
            Command::CreateFile(_) => registers::CREATE_FILE,
            Command::MakeDir(_) => registers::MKDIR,
            Command::ChangeDir(_) => registers::CD,
            Command::ReadFile(_) => registers::READ_FILE,
            Command::StartPosition(_) => registers::START_POSITION,
            Command::OpenFile(_) => registers::OPEN_FILE,
            Command::WriteFile(_) => registers::WRITE_FILE,
            Command::FileSize(_) => registers::FILE_SIZE,
            Command::List(_) => registers::LIST,
            Command::Remove(_) => registers::RM,
            Command::RemoveRecursive(_) => registers::RMRF,
            Command::SyncFile => registers::SYNC_FILE,
        }
    }
}

/// Encodes text one byte per character.
///
/// Only characters up to U+00FF have a single-byte form; anything wider is
/// rejected instead of being silently mangled.
pub fn encode_text(s: &str) -> Result<Vec<u8>> {
    s.chars()
        .map(|c| {
            u8::try_from(u32::from(c))
                .map_err(|_| anyhow::format_err!("character {:?} has no single-byte encoding", c))
        })
        .collect()
}

/// Like [`encode_text`], keeping only the characters one command frame can
/// carry. Whatever lies past the cut is never looked at.
pub fn encode_command_text(s: &str) -> Result<Vec<u8>> {
    let head = match s.char_indices().nth(MAX_PAYLOAD) {
        Some((cut, _)) => {
            log::warn!("command argument {:?} truncated to {} bytes", s, MAX_PAYLOAD);
            &s[..cut]
        }
        None => s,
    };
    encode_text(head)
}

/// Inverse of [`encode_text`] for a single byte.
pub fn decode_byte(b: u8) -> char {
    char::from(b)
}
