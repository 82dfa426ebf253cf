//! Line reassembly for file streams.
//!
//! The device streams a file as fixed 32-byte chunks. Lines end with CR,
//! an LF is dropped wherever it appears, and the stream ends with 0xFF.
//! A chunk is fetched only once every buffered byte has been consumed.

use anyhow::Result;

use crate::{
    Transport,
    bus::Bus,
    constants::{CHUNK_SIZE, READ_BUFFER_LENGTH, sentinels},
    protocol::decode_byte,
};

/// One step of a file read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A line with its terminator stripped. May be empty.
    Text(String),
    /// `READ_BUFFER_LENGTH` bytes arrived without a terminator. The rest of
    /// the line follows on the next call.
    Truncated(String),
    /// The end-of-stream marker was reached. Sticky until the next read.
    EndOfStream,
}

impl Line {
    /// The accumulated text; empty for [`Line::EndOfStream`].
    pub fn text(&self) -> &str {
        match self {
            Line::Text(s) | Line::Truncated(s) => s,
            Line::EndOfStream => "",
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Line::Text(s) | Line::Truncated(s) => s,
            Line::EndOfStream => String::new(),
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Line::EndOfStream)
    }
}

/// Fixed-capacity byte queue with a read cursor.
///
/// `head..len` holds the pending bytes. Chunks are appended at `len`; once
/// the array has no room for another chunk the cursor rewinds to the start,
/// which is safe because a refill only ever happens with nothing pending.
pub struct ReadBuffer {
    buf: [u8; READ_BUFFER_LENGTH],
    head: usize,
    len: usize,
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadBuffer {
    pub fn new() -> Self {
        ReadBuffer {
            buf: [0; READ_BUFFER_LENGTH],
            head: 0,
            len: 0,
        }
    }

    pub fn reset(&mut self) {
        self.buf.fill(0);
        self.head = 0;
        self.len = 0;
    }

    pub fn pending(&self) -> usize {
        self.len - self.head
    }

    fn refill<T: Transport>(&mut self, bus: &mut Bus<T>) -> Result<()> {
        debug_assert_eq!(self.pending(), 0);
        if self.len + CHUNK_SIZE > READ_BUFFER_LENGTH {
            self.head = 0;
            self.len = 0;
        }
        let chunk = bus.read_chunk()?;
        self.buf[self.len..self.len + CHUNK_SIZE].copy_from_slice(&chunk);
        self.len += CHUNK_SIZE;
        Ok(())
    }

    fn peek(&self) -> u8 {
        self.buf[self.head]
    }

    fn consume(&mut self) -> u8 {
        let b = self.buf[self.head];
        self.head += 1;
        b
    }

    /// Advances the stream by one line.
    pub fn read_line<T: Transport>(&mut self, bus: &mut Bus<T>) -> Result<Line> {
        let mut line = String::new();
        let mut taken = 0;
        loop {
            if self.pending() == 0 {
                self.refill(bus)?;
            }
            match self.peek() {
                sentinels::EOF => {
                    // Left in place so every later call ends here too.
                    return Ok(if taken == 0 {
                        Line::EndOfStream
                    } else {
                        Line::Text(line)
                    });
                }
                sentinels::CR => {
                    self.consume();
                    return Ok(Line::Text(line));
                }
                sentinels::LF => {
                    self.consume();
                }
                _ if taken == READ_BUFFER_LENGTH => {
                    log::warn!("line exceeds {} bytes, truncated", READ_BUFFER_LENGTH);
                    return Ok(Line::Truncated(line));
                }
                _ => {
                    line.push(decode_byte(self.consume()));
                    taken += 1;
                }
            }
        }
    }
}
