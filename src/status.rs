//! Status register and firmware version.
use std::fmt;

use bitfield::bitfield;

bitfield! {
    /// Raw status register.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Status(u8);
    impl Debug;
    pub sd_init_good, _: 0;
    pub last_command_success, _: 1;
    pub last_command_known, _: 2;
    pub file_open, _: 3;
    pub in_root_directory, _: 4;
}

impl Status {
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl From<u8> for Status {
    fn from(raw: u8) -> Self {
        Status(raw)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:02x} (sd: {}, last command: {}/{}, file open: {}, root: {})",
            self.0,
            if self.sd_init_good() { "ok" } else { "fail" },
            if self.last_command_known() { "known" } else { "unknown" },
            if self.last_command_success() { "ok" } else { "fail" },
            self.file_open(),
            self.in_root_directory(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
