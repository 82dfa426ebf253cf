//! Outgoing data path: split into frames, then flush once.

use anyhow::Result;

use crate::{
    Transport,
    bus::Bus,
    constants::{MAX_PAYLOAD, registers, sentinels},
    protocol::encode_text,
};

/// Appends `data` to the open file as consecutive `WRITE_FILE` frames of at
/// most 31 bytes, followed by exactly one `SYNC_FILE`, even for empty input.
///
/// `progress` sees the number of bytes sent after each frame.
/// Returns the number of frames written.
pub fn write_bytes<T: Transport>(
    bus: &mut Bus<T>,
    data: &[u8],
    mut progress: impl FnMut(usize),
) -> Result<usize> {
    let mut frames = 0;
    let mut sent = 0;
    for chunk in data.chunks(MAX_PAYLOAD) {
        bus.write_chunk(registers::WRITE_FILE, chunk)?;
        frames += 1;
        sent += chunk.len();
        progress(sent);
    }
    bus.write_byte(registers::SYNC_FILE, 0)?;
    log::debug!("wrote {} bytes in {} frames", data.len(), frames);
    Ok(frames)
}

pub fn write_string<T: Transport>(bus: &mut Bus<T>, s: &str) -> Result<usize> {
    let data = encode_text(s)?;
    write_bytes(bus, &data, |_| ())
}

/// `s` terminated by CR LF.
pub fn line(s: &str) -> String {
    let mut line = String::with_capacity(s.len() + 2);
    line.push_str(s);
    line.push(char::from(sentinels::CR));
    line.push(char::from(sentinels::LF));
    line
}

/// `name:value` terminated by CR LF.
pub fn value_line(name: &str, value: impl std::fmt::Display) -> String {
    line(&format!("{}:{}", name, value))
}
