//! Register access on top of a [`Transport`].

use anyhow::Result;

use crate::{
    Transport,
    constants::{CHUNK_SIZE, DEFAULT_ADDRESS, MAX_PAYLOAD},
    pacing::Pacing,
    protocol::{Command, encode_command_text},
};

/// One OpenLog on a bus: the transport, the device address, and the pause
/// that follows every write.
pub struct Bus<T: Transport> {
    transport: T,
    address: u8,
    pacing: Pacing,
}

impl<T: Transport> Bus<T> {
    pub fn new(transport: T) -> Self {
        Bus {
            transport,
            address: DEFAULT_ADDRESS,
            pacing: Pacing::default(),
        }
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Retarget this handle. Nothing is sent to the device.
    pub fn set_address(&mut self, address: u8) {
        log::debug!("bus address 0x{:02x} -> 0x{:02x}", self.address, address);
        self.address = address;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        log::debug!("=> [{:02x}] {}", self.address, hex::encode(frame));
        self.transport.write(self.address, frame)?;
        self.pacing.settle();
        Ok(())
    }

    /// Selects `register`, then reads one byte back.
    pub fn read_byte(&mut self, register: u8) -> Result<u8> {
        self.transport.write(self.address, &[register])?;
        let mut buf = [0u8; 1];
        self.transport.read(self.address, &mut buf)?;
        log::debug!("<= [{:02x}] reg 0x{:02x} = {:02x}", self.address, register, buf[0]);
        Ok(buf[0])
    }

    pub fn write_byte(&mut self, register: u8, value: u8) -> Result<()> {
        self.send_frame(&[register, value])
    }

    pub fn write_chunk(&mut self, register: u8, payload: &[u8]) -> Result<()> {
        anyhow::ensure!(
            payload.len() <= MAX_PAYLOAD,
            "payload of {} bytes does not fit one frame",
            payload.len()
        );
        let mut frame = Vec::with_capacity(1 + payload.len());
        frame.push(register);
        frame.extend_from_slice(payload);
        self.send_frame(&frame)
    }

    /// Sends `text` as the argument of `register`, truncated to one frame.
    pub fn write_command_string(&mut self, register: u8, text: &str) -> Result<()> {
        let payload = encode_command_text(text)?;
        self.write_chunk(register, &payload)
    }

    pub fn send(&mut self, cmd: Command) -> Result<()> {
        let register = cmd.register();
        match cmd {
            Command::SetAddress(value) | Command::StartPosition(value) => {
                self.write_byte(register, value)
            }
            Command::InitLog | Command::SyncFile => self.write_byte(register, 0),
            Command::WriteFile(data) => self.write_chunk(register, &data),
            Command::CreateFile(s)
            | Command::MakeDir(s)
            | Command::ChangeDir(s)
            | Command::ReadFile(s)
            | Command::OpenFile(s)
            | Command::FileSize(s)
            | Command::List(s)
            | Command::Remove(s)
            | Command::RemoveRecursive(s) => self.write_command_string(register, &s),
        }
    }

    /// Reads `buf.len()` bytes of whatever the device is currently streaming.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.transport.read(self.address, buf)?;
        log::debug!("<= [{:02x}] {}", self.address, hex::encode(&*buf));
        Ok(())
    }

    pub fn read_chunk(&mut self) -> Result<[u8; CHUNK_SIZE]> {
        let mut chunk = [0u8; CHUNK_SIZE];
        self.read_exact(&mut chunk)?;
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::constants::registers;
    use crate::transport::mock::{MockTransport, Op};

    fn bus(script: &[u8]) -> Bus<MockTransport> {
        Bus::new(MockTransport::with_script(script)).with_pacing(Pacing::Disabled)
    }

    #[test]
    fn read_byte_selects_register_then_reads_one() {
        let mut bus = bus(&[0x2a]);
        assert_eq!(bus.read_byte(registers::ID).unwrap(), 0x2a);
        assert_eq!(
            bus.transport().ops,
            [Op::Write(0x2a, vec![registers::ID]), Op::Read(0x2a, 1)]
        );
    }

    #[test]
    fn command_string_is_truncated_to_frame() {
        let mut bus = bus(&[]);
        bus.write_command_string(registers::OPEN_FILE, &"a".repeat(64))
            .unwrap();
        let writes = bus.transport().writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].len(), CHUNK_SIZE);
    }

    #[test]
    fn oversized_chunk_is_rejected_without_traffic() {
        let mut bus = bus(&[]);
        assert!(bus.write_chunk(registers::WRITE_FILE, &[0; 32]).is_err());
        assert!(bus.transport().ops.is_empty());
    }

    #[test]
    fn string_commands_carry_register_then_text() {
        let mut bus = bus(&[]);
        bus.send(Command::MakeDir("LOGS".into())).unwrap();
        bus.send(Command::CreateFile("x".repeat(40))).unwrap();
        let writes = bus.transport().writes();
        assert_eq!(writes[0], [registers::MKDIR, b'L', b'O', b'G', b'S']);
        assert_eq!(writes[1].len(), CHUNK_SIZE);
        assert_eq!(writes[1][0], registers::CREATE_FILE);
    }

    #[test]
    fn value_commands_are_two_byte_frames() {
        let mut bus = bus(&[]);
        bus.send(Command::SyncFile).unwrap();
        bus.send(Command::StartPosition(0)).unwrap();
        bus.send(Command::SetAddress(0x31)).unwrap();
        assert_eq!(
            bus.transport().writes(),
            [vec![0x11, 0x00], vec![0x0A, 0x00], vec![0x1E, 0x31]]
        );
    }

    #[test]
    fn oversized_write_command_is_rejected() {
        let mut bus = bus(&[]);
        assert!(bus.send(Command::WriteFile(vec![0; 32])).is_err());
        bus.send(Command::WriteFile(vec![7; 31])).unwrap();
        let mut expected = vec![registers::WRITE_FILE];
        expected.extend([7; 31]);
        assert_eq!(bus.transport().writes(), [expected]);
    }

    #[test]
    fn settle_delay_follows_writes_only() {
        let delay = Duration::from_millis(40);
        let mut bus = Bus::new(MockTransport::with_script(&[1, 2, 3]))
            .with_pacing(Pacing::Fixed(delay));

        let start = Instant::now();
        bus.write_byte(registers::SYNC_FILE, 0).unwrap();
        assert!(start.elapsed() >= delay);

        let start = Instant::now();
        bus.write_chunk(registers::WRITE_FILE, b"abc").unwrap();
        assert!(start.elapsed() >= delay);

        let start = Instant::now();
        for _ in 0..3 {
            bus.read_byte(registers::STATUS).unwrap();
        }
        assert!(start.elapsed() < delay);
    }

    #[test]
    fn set_address_retargets_following_transfers() {
        let mut bus = bus(&[]);
        bus.set_address(0x30);
        bus.write_byte(registers::SYNC_FILE, 0).unwrap();
        assert_eq!(bus.transport().ops, [Op::Write(0x30, vec![0x11, 0])]);
    }
}
