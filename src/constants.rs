//! Wire-level constants of the Qwiic OpenLog I2C interface.

/// Factory default 7-bit bus address.
pub const DEFAULT_ADDRESS: u8 = 0x2A;

/// Transport chunk: one register byte plus up to 31 payload bytes outgoing,
/// fixed 32-byte reads incoming.
pub const CHUNK_SIZE: usize = 32;

/// Largest payload carried by a single register write.
pub const MAX_PAYLOAD: usize = CHUNK_SIZE - 1;

pub const READ_BUFFER_LENGTH: usize = 256;

/// Settle time after every register write, in milliseconds.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 15;

pub mod sentinels {
    pub const CR: u8 = 13;
    pub const LF: u8 = 10;
    pub const EOF: u8 = 255;
    /// Terminates one name in a directory listing chunk.
    pub const NUL: u8 = 0;
}

pub mod registers {
    pub const ID: u8 = 0x00;
    pub const STATUS: u8 = 0x01;
    pub const FIRMWARE_MAJOR: u8 = 0x02;
    pub const FIRMWARE_MINOR: u8 = 0x03;
    pub const I2C_ADDRESS: u8 = 0x1E;
    pub const LOG_INIT: u8 = 0x05;
    pub const CREATE_FILE: u8 = 0x06;
    pub const MKDIR: u8 = 0x07;
    pub const CD: u8 = 0x08;
    pub const READ_FILE: u8 = 0x09;
    pub const START_POSITION: u8 = 0x0A;
    pub const OPEN_FILE: u8 = 0x0B;
    pub const WRITE_FILE: u8 = 0x0C;
    pub const FILE_SIZE: u8 = 0x0D;
    pub const LIST: u8 = 0x0E;
    pub const RM: u8 = 0x0F;
    pub const RMRF: u8 = 0x10;
    pub const SYNC_FILE: u8 = 0x11;
}
