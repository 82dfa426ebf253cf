//! End-to-end checks against a simulated OpenLog.
use std::collections::{BTreeMap, VecDeque};

use anyhow::Result;
use rstest::rstest;

use openlog_i2c::{
    Entry, Line, OpenLog, Pacing, Transport,
    constants::{CHUNK_SIZE, DEFAULT_ADDRESS, registers, sentinels},
};

/// Keeps files in memory and answers reads the way the firmware does.
#[derive(Default)]
struct SimulatedOpenLog {
    address: u8,
    files: BTreeMap<String, Vec<u8>>,
    open: Option<String>,
    outgoing: VecDeque<u8>,
    write_frames: usize,
    syncs: usize,
    status: u8,
    version: (u8, u8),
}

impl SimulatedOpenLog {
    fn new() -> Self {
        SimulatedOpenLog {
            address: DEFAULT_ADDRESS,
            status: 0b10111,
            version: (3, 10),
            ..Default::default()
        }
    }

    fn text(payload: &[u8]) -> String {
        payload.iter().map(|&b| char::from(b)).collect()
    }
}

impl Transport for SimulatedOpenLog {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()> {
        if addr != self.address {
            return Ok(());
        }
        let (register, payload) = bytes.split_first().expect("empty frame");
        self.outgoing.clear();
        match *register {
            registers::STATUS => self.outgoing.push_back(self.status),
            registers::FIRMWARE_MAJOR => self.outgoing.push_back(self.version.0),
            registers::FIRMWARE_MINOR => self.outgoing.push_back(self.version.1),
            registers::ID => self.outgoing.push_back(0x2a),
            registers::I2C_ADDRESS => self.address = payload[0],
            registers::CREATE_FILE => {
                self.files.entry(Self::text(payload)).or_default();
            }
            registers::OPEN_FILE => {
                let name = Self::text(payload);
                self.files.entry(name.clone()).or_default();
                self.open = Some(name);
            }
            registers::WRITE_FILE => {
                self.write_frames += 1;
                let name = self.open.as_ref().expect("no open file");
                self.files.get_mut(name).unwrap().extend_from_slice(payload);
            }
            registers::SYNC_FILE => self.syncs += 1,
            registers::START_POSITION => {}
            registers::READ_FILE => {
                if let Some(data) = self.files.get(&Self::text(payload)) {
                    self.outgoing.extend(data.iter().copied());
                }
                self.outgoing.push_back(sentinels::EOF);
            }
            registers::FILE_SIZE => {
                let size = self
                    .files
                    .get(&Self::text(payload))
                    .map_or(u32::MAX, |f| f.len() as u32);
                self.outgoing.extend(size.to_be_bytes());
            }
            registers::LIST => {
                for name in self.files.keys() {
                    let mut chunk = [sentinels::NUL; CHUNK_SIZE];
                    chunk[..name.len()].copy_from_slice(name.as_bytes());
                    self.outgoing.extend(chunk);
                }
                self.outgoing.extend([sentinels::EOF; CHUNK_SIZE]);
            }
            registers::RM => {
                self.files.remove(&Self::text(payload));
            }
            other => panic!("unexpected register 0x{:02x}", other),
        }
        Ok(())
    }

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<()> {
        if addr != self.address {
            buf.fill(0);
            return Ok(());
        }
        for b in buf.iter_mut() {
            *b = self.outgoing.pop_front().unwrap_or(sentinels::EOF);
        }
        Ok(())
    }
}

fn openlog() -> OpenLog<SimulatedOpenLog> {
    OpenLog::new(SimulatedOpenLog::new(), DEFAULT_ADDRESS, Pacing::Disabled)
}

#[rstest]
#[case("")]
#[case("x")]
#[case("exactly thirty-one characters!!")]
#[case("a line that is a good deal longer than a single bus frame")]
#[case("latin-1 ok: caf\u{e9} \u{b0}C")]
fn line_round_trip(#[case] s: &str) {
    let mut log = openlog();
    log.open_file("RT.TXT").unwrap();
    log.write_line(s).unwrap();

    log.read_file("RT.TXT").unwrap();
    assert_eq!(log.read_line().unwrap(), Line::Text(s.to_string()));
    assert_eq!(log.read_line().unwrap(), Line::EndOfStream);
    assert_eq!(log.read_line().unwrap(), Line::EndOfStream);
}

#[test]
fn long_write_uses_ceil_frames_and_one_sync() {
    let mut log = openlog();
    log.open_file("BIG.TXT").unwrap();
    let data = vec![b'z'; 100];
    log.write_bytes(&data, |_| ()).unwrap();
    let sim = log.into_transport();
    assert_eq!(sim.write_frames, 4);
    assert_eq!(sim.syncs, 1);
    assert_eq!(sim.files["BIG.TXT"], data);
}

#[test]
fn multiple_lines_and_values() {
    let mut log = openlog();
    log.open_file("DATA.CSV").unwrap();
    log.write_line("header").unwrap();
    log.write_value("temp", 21).unwrap();
    log.write_number(42).unwrap();
    log.write_line("").unwrap();

    assert_eq!(
        log.read_to_end("DATA.CSV").unwrap(),
        ["header", "temp:21", "42"]
    );
    assert_eq!(log.file_size("DATA.CSV").unwrap(), 21);
}

#[test]
fn overlong_line_is_reassembled_by_read_to_end() {
    let mut log = openlog();
    let long = "0123456789".repeat(40);
    log.open_file("LONG.TXT").unwrap();
    log.write_line(&long).unwrap();

    log.read_file("LONG.TXT").unwrap();
    assert!(matches!(log.read_line().unwrap(), Line::Truncated(_)));
    assert_eq!(log.read_to_end("LONG.TXT").unwrap(), [long]);
}

#[test]
fn listing_and_removal() {
    let mut log = openlog();
    log.create_file("A.TXT").unwrap();
    log.create_file("B.TXT").unwrap();
    assert_eq!(log.list("").unwrap(), ["A.TXT", "B.TXT"]);

    log.remove_file("A.TXT").unwrap();
    log.search_dir("*").unwrap();
    assert_eq!(log.read_filename().unwrap(), Entry::Name("B.TXT".into()));
    assert_eq!(log.read_filename().unwrap(), Entry::EndOfListing);
}

#[test]
fn status_and_version() {
    let mut log = openlog();
    let status = log.status().unwrap();
    assert!(status.sd_init_good());
    assert!(status.last_command_success());
    assert!(status.last_command_known());
    assert!(!status.file_open());
    assert!(status.in_root_directory());
    assert_eq!(log.version().unwrap().to_string(), "3.10");
    assert_eq!(log.identify().unwrap(), 0x2a);
}

#[test]
fn device_follows_address_change() {
    let mut log = openlog();
    log.change_device_address(0x31).unwrap();
    assert_eq!(log.address(), 0x31);
    assert_eq!(log.version().unwrap().to_string(), "3.10");

    // Only the handle moves; the device stays put.
    log.set_address(DEFAULT_ADDRESS);
    assert_eq!(log.identify().unwrap(), 0);
}
