//! File-system operations on an OpenLog.

use anyhow::Result;
use scroll::{BE, Pread};

use crate::{
    Command, Transport,
    bus::Bus,
    config::Config,
    constants::{registers, sentinels},
    listing::{self, Entry},
    pacing::Pacing,
    reader::{Line, ReadBuffer},
    status::{Status, Version},
    transport::UsbTransport,
    writer,
};

/// Glob used when a listing is started without a pattern.
pub const LIST_ALL: &str = "*";

/// A full buffer of NULs without a terminator: no device is answering.
fn is_silent(text: &str) -> bool {
    text.chars().all(|c| c == '\0')
}

pub struct OpenLog<T: Transport> {
    bus: Bus<T>,
    read_buffer: ReadBuffer,
}

impl OpenLog<UsbTransport> {
    pub fn new_from_usb(config: &Config) -> Result<Self> {
        log::debug!("{} CH341 bridge(s) attached", UsbTransport::scan_devices()?);
        let transport = UsbTransport::open_nth(config.usb_index, config.i2c_speed)?;
        let mut openlog = OpenLog::new(transport, config.address, config.pacing());

        let version = openlog.version()?;
        log::debug!("found OpenLog at 0x{:02x}, firmware {}", config.address, version);
        Ok(openlog)
    }
}

impl<T: Transport> OpenLog<T> {
    pub fn new(transport: T, address: u8, pacing: Pacing) -> Self {
        OpenLog {
            bus: Bus::new(transport).with_address(address).with_pacing(pacing),
            read_buffer: ReadBuffer::new(),
        }
    }

    pub fn bus(&self) -> &Bus<T> {
        &self.bus
    }

    pub fn into_transport(self) -> T {
        self.bus.into_transport()
    }

    pub fn dump_info(&mut self) -> Result<()> {
        let id = self.identify()?;
        let version = self.version()?;
        let status = self.status()?;
        log::info!("OpenLog @ 0x{:02x}: id 0x{:02x}", self.bus.address(), id);
        log::info!("Firmware: {}", version);
        log::info!("Status: {}", status);
        Ok(())
    }

    pub fn address(&self) -> u8 {
        self.bus.address()
    }

    /// Talk to a device at another address from now on.
    pub fn set_address(&mut self, address: u8) {
        self.bus.set_address(address);
    }

    /// Reprogram the device's own address, then follow it there.
    pub fn change_device_address(&mut self, address: u8) -> Result<()> {
        anyhow::ensure!(
            (0x08..=0x77).contains(&address),
            "0x{:02x} is outside the usable 7-bit address range",
            address
        );
        self.bus.send(Command::SetAddress(address))?;
        self.bus.set_address(address);
        log::info!("Device address changed to 0x{:02x}", address);
        Ok(())
    }

    pub fn identify(&mut self) -> Result<u8> {
        self.bus.read_byte(registers::ID)
    }

    pub fn status(&mut self) -> Result<Status> {
        Ok(Status::from(self.bus.read_byte(registers::STATUS)?))
    }

    pub fn version(&mut self) -> Result<Version> {
        let major = self.bus.read_byte(registers::FIRMWARE_MAJOR)?;
        let minor = self.bus.read_byte(registers::FIRMWARE_MINOR)?;
        Ok(Version { major, minor })
    }

    pub fn init_log(&mut self) -> Result<()> {
        self.bus.send(Command::InitLog)
    }

    /// Sends a path command followed by a flush. Empty paths are ignored.
    fn path_command(&mut self, cmd: fn(String) -> Command, path: &str) -> Result<()> {
        if path.is_empty() {
            log::debug!("ignoring {:?} with an empty path", cmd(String::new()));
            return Ok(());
        }
        self.bus.send(cmd(path.to_string()))?;
        self.bus.send(Command::SyncFile)
    }

    pub fn make_dir(&mut self, dir: &str) -> Result<()> {
        self.path_command(Command::MakeDir, dir)
    }

    /// Removes a directory and its contents. Wildcards are allowed.
    pub fn remove_dir(&mut self, dir: &str) -> Result<()> {
        self.path_command(Command::RemoveRecursive, dir)
    }

    pub fn change_dir(&mut self, dir: &str) -> Result<()> {
        self.path_command(Command::ChangeDir, dir)
    }

    pub fn create_file(&mut self, filename: &str) -> Result<()> {
        self.path_command(Command::CreateFile, filename)
    }

    /// Wildcards are allowed.
    pub fn remove_file(&mut self, filename: &str) -> Result<()> {
        self.path_command(Command::Remove, filename)
    }

    /// Opens `filename` for appending. Later writes go to this file.
    pub fn open_file(&mut self, filename: &str) -> Result<()> {
        if filename.is_empty() {
            return Ok(());
        }
        self.bus.send(Command::OpenFile(filename.to_string()))
    }

    /// Size of `filename` in bytes; 0 without any bus traffic for an empty name.
    pub fn file_size(&mut self, filename: &str) -> Result<u32> {
        if filename.is_empty() {
            return Ok(0);
        }
        self.bus.send(Command::FileSize(filename.to_string()))?;
        let mut raw = [0u8; 4];
        self.bus.read_exact(&mut raw)?;
        Ok(raw.pread_with::<u32>(0, BE)?)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.bus.send(Command::SyncFile)
    }

    pub fn write_string(&mut self, s: &str) -> Result<()> {
        writer::write_string(&mut self.bus, s)?;
        Ok(())
    }

    pub fn write_bytes(&mut self, data: &[u8], progress: impl FnMut(usize)) -> Result<()> {
        writer::write_bytes(&mut self.bus, data, progress)?;
        Ok(())
    }

    pub fn write_line(&mut self, s: &str) -> Result<()> {
        self.write_string(&writer::line(s))
    }

    /// Writes the decimal form of `n`, no terminator.
    pub fn write_number(&mut self, n: impl std::fmt::Display) -> Result<()> {
        self.write_string(&n.to_string())
    }

    /// Writes `name:value` as one line.
    pub fn write_value(&mut self, name: &str, value: impl std::fmt::Display) -> Result<()> {
        self.write_string(&writer::value_line(name, value))
    }

    /// Starts streaming `filename` from its first byte.
    pub fn read_file(&mut self, filename: &str) -> Result<()> {
        if filename.is_empty() {
            return Ok(());
        }
        self.read_buffer.reset();
        self.bus.send(Command::StartPosition(0))?;
        self.bus.send(Command::ReadFile(filename.to_string()))
    }

    pub fn read_line(&mut self) -> Result<Line> {
        self.read_buffer.read_line(&mut self.bus)
    }

    /// Reads `filename` line by line until the end of the stream.
    pub fn read_to_end(&mut self, filename: &str) -> Result<Vec<String>> {
        let mut lines = vec![];
        if filename.is_empty() {
            return Ok(lines);
        }
        self.read_file(filename)?;
        let mut partial = String::new();
        loop {
            match self.read_line()? {
                Line::Text(s) => {
                    partial.push_str(&s);
                    lines.push(std::mem::take(&mut partial));
                }
                Line::Truncated(s) if is_silent(&s) => {
                    log::warn!("device streams only zeros, assuming end of file");
                    break;
                }
                Line::Truncated(s) => partial.push_str(&s),
                Line::EndOfStream => break,
            }
        }
        if !partial.is_empty() {
            lines.push(partial);
        }
        Ok(lines)
    }

    /// Reads the raw bytes of `filename` up to the end-of-stream marker,
    /// terminators included.
    ///
    /// Stops early on a chunk of nothing but zeros, which is all a silent
    /// device produces.
    pub fn read_raw(&mut self, filename: &str) -> Result<Vec<u8>> {
        let mut data = vec![];
        if filename.is_empty() {
            return Ok(data);
        }
        self.read_file(filename)?;
        loop {
            let chunk = self.bus.read_chunk()?;
            if chunk.iter().all(|&b| b == 0) {
                log::warn!("device streams only zeros, assuming end of file");
                break;
            }
            match chunk.iter().position(|&b| b == sentinels::EOF) {
                Some(end) => {
                    data.extend_from_slice(&chunk[..end]);
                    break;
                }
                None => data.extend_from_slice(&chunk),
            }
        }
        Ok(data)
    }

    /// Starts a listing; an empty pattern lists everything.
    pub fn search_dir(&mut self, pattern: &str) -> Result<()> {
        let pattern = if pattern.is_empty() { LIST_ALL } else { pattern };
        self.read_buffer.reset();
        self.bus.send(Command::List(pattern.to_string()))
    }

    pub fn read_filename(&mut self) -> Result<Entry> {
        listing::read_filename(&mut self.bus)
    }

    /// Collects a whole listing.
    ///
    /// Also stops at an empty name, which is all a silent device produces.
    pub fn list(&mut self, pattern: &str) -> Result<Vec<String>> {
        self.search_dir(pattern)?;
        let mut names = vec![];
        loop {
            match self.read_filename()? {
                Entry::EndOfListing => break,
                Entry::Name(name) if name.is_empty() => {
                    log::warn!("empty directory entry, assuming end of listing");
                    break;
                }
                Entry::Name(name) => names.push(name),
            }
        }
        Ok(names)
    }
}
