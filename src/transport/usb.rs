//! CH341 USB-to-I2C bridge.
use std::{fmt::Display, time::Duration};

use anyhow::Result;
use clap::{ValueEnum, builder::PossibleValue};
use rusb::{Context, DeviceHandle, UsbContext};
use serde::{Deserialize, Serialize};

use super::Transport;

const CH341_VID: u16 = 0x1a86;
const CH341_PID: u16 = 0x5512;

const ENDPOINT_OUT: u8 = 0x02;
const ENDPOINT_IN: u8 = 0x82;

const TIMEOUT_MS: u64 = 1000;

/// Bulk packet size of the bridge.
const PACKET_SIZE: usize = 32;

const CMD_I2C_STREAM: u8 = 0xaa;
const I2C_STM_STA: u8 = 0x74;
const I2C_STM_STO: u8 = 0x75;
const I2C_STM_OUT: u8 = 0x80;
const I2C_STM_IN: u8 = 0xc0;
const I2C_STM_SET: u8 = 0x60;
const I2C_STM_END: u8 = 0x00;

/// Bytes left for data in one packet after stream, start, out, stop and end.
const MAX_OUT_SEGMENT: usize = PACKET_SIZE - 5;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum I2cSpeed {
    Khz20,
    #[default]
    Khz100,
    Khz400,
    Khz750,
}

impl I2cSpeed {
    fn code(self) -> u8 {
        match self {
            I2cSpeed::Khz20 => 0,
            I2cSpeed::Khz100 => 1,
            I2cSpeed::Khz400 => 2,
            I2cSpeed::Khz750 => 3,
        }
    }
}

impl From<I2cSpeed> for u32 {
    fn from(value: I2cSpeed) -> Self {
        match value {
            I2cSpeed::Khz20 => 20_000,
            I2cSpeed::Khz100 => 100_000,
            I2cSpeed::Khz400 => 400_000,
            I2cSpeed::Khz750 => 750_000,
        }
    }
}

impl Display for I2cSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Hz", u32::from(*self))
    }
}

impl ValueEnum for I2cSpeed {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            I2cSpeed::Khz20,
            I2cSpeed::Khz100,
            I2cSpeed::Khz400,
            I2cSpeed::Khz750,
        ]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        match self {
            I2cSpeed::Khz20 => Some(PossibleValue::new("20k").aliases(["20000", "khz20"])),
            I2cSpeed::Khz100 => Some(PossibleValue::new("100k").aliases(["100000", "khz100"])),
            I2cSpeed::Khz400 => Some(PossibleValue::new("400k").aliases(["400000", "khz400"])),
            I2cSpeed::Khz750 => Some(PossibleValue::new("750k").aliases(["750000", "khz750"])),
        }
    }
}

pub struct UsbTransport {
    device_handle: DeviceHandle<rusb::Context>,
}

fn is_ch341(device: &rusb::Device<Context>) -> bool {
    device
        .device_descriptor()
        .map(|desc| desc.vendor_id() == CH341_VID && desc.product_id() == CH341_PID)
        .unwrap_or(false)
}

impl UsbTransport {
    pub fn scan_devices() -> Result<usize> {
        let context = Context::new()?;

        let n = context
            .devices()?
            .iter()
            .filter(is_ch341)
            .enumerate()
            .map(|(i, device)| {
                log::debug!("Found CH341 USB device #{}: [{:?}]", i, device);
            })
            .count();
        Ok(n)
    }

    pub fn open_nth(nth: usize, speed: I2cSpeed) -> Result<UsbTransport> {
        let context = Context::new()?;

        let device = context
            .devices()?
            .iter()
            .filter(is_ch341)
            .nth(nth)
            .ok_or(anyhow::format_err!(
                "No CH341 USB device found(1a86:5512 device not found at index #{})",
                nth
            ))?;
        log::debug!("Found USB Device {:?}", device);

        let mut device_handle = device.open()?;

        let config = device.config_descriptor(0)?;

        let mut endpoint_out_found = false;
        let mut endpoint_in_found = false;
        if let Some(intf) = config.interfaces().next() {
            if let Some(desc) = intf.descriptors().next() {
                for endpoint in desc.endpoint_descriptors() {
                    if endpoint.address() == ENDPOINT_OUT {
                        endpoint_out_found = true;
                    }
                    if endpoint.address() == ENDPOINT_IN {
                        endpoint_in_found = true;
                    }
                }
            }
        }

        if !(endpoint_out_found && endpoint_in_found) {
            anyhow::bail!("USB Endpoints not found");
        }

        if device_handle.kernel_driver_active(0).unwrap_or(false) {
            device_handle.detach_kernel_driver(0)?;
        }
        device_handle.claim_interface(0)?;

        let mut transport = UsbTransport { device_handle };
        transport.set_speed(speed)?;
        Ok(transport)
    }

    pub fn set_speed(&mut self, speed: I2cSpeed) -> Result<()> {
        log::info!("I2C clock set to {}", speed);
        self.send_packet(&[CMD_I2C_STREAM, I2C_STM_SET | speed.code(), I2C_STM_END])
    }

    fn send_packet(&mut self, packet: &[u8]) -> Result<()> {
        debug_assert!(packet.len() <= PACKET_SIZE);
        self.device_handle
            .write_bulk(ENDPOINT_OUT, packet, Duration::from_millis(TIMEOUT_MS))?;
        Ok(())
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let nread = self.device_handle.read_bulk(
                ENDPOINT_IN,
                &mut buf[filled..],
                Duration::from_millis(TIMEOUT_MS),
            )?;
            anyhow::ensure!(nread > 0, "CH341 returned an empty bulk read");
            filled += nread;
        }
        Ok(())
    }
}

/// Splits one I2C write transaction into bridge packets.
fn write_packets(addr: u8, bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut stream = Vec::with_capacity(1 + bytes.len());
    stream.push(addr << 1);
    stream.extend_from_slice(bytes);

    let segments = stream.chunks(MAX_OUT_SEGMENT).count();
    stream
        .chunks(MAX_OUT_SEGMENT)
        .enumerate()
        .map(|(i, segment)| {
            let mut packet = Vec::with_capacity(PACKET_SIZE);
            packet.push(CMD_I2C_STREAM);
            if i == 0 {
                packet.push(I2C_STM_STA);
            }
            packet.push(I2C_STM_OUT | segment.len() as u8);
            packet.extend_from_slice(segment);
            if i == segments - 1 {
                packet.push(I2C_STM_STO);
            }
            packet.push(I2C_STM_END);
            packet
        })
        .collect()
}

fn read_packet(addr: u8, len: usize) -> Vec<u8> {
    let mut packet = vec![CMD_I2C_STREAM, I2C_STM_STA, I2C_STM_OUT | 1, (addr << 1) | 1];
    // All but the last byte are ACKed, the last one is NACKed.
    if len > 1 {
        packet.push(I2C_STM_IN | (len - 1) as u8);
    }
    packet.push(I2C_STM_IN);
    packet.push(I2C_STM_STO);
    packet.push(I2C_STM_END);
    packet
}

impl Transport for UsbTransport {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()> {
        for packet in write_packets(addr, bytes) {
            self.send_packet(&packet)?;
        }
        Ok(())
    }

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<()> {
        anyhow::ensure!(
            !buf.is_empty() && buf.len() <= PACKET_SIZE,
            "CH341 read length {} out of range",
            buf.len()
        );
        self.send_packet(&read_packet(addr, buf.len()))?;
        self.recv_exact(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_write_fits_one_packet() {
        let packets = write_packets(0x2a, &[0x11, 0x00]);
        assert_eq!(packets, [vec![0xaa, 0x74, 0x83, 0x54, 0x11, 0x00, 0x75, 0x00]]);
    }

    #[test]
    fn full_frame_is_split_with_one_start_and_one_stop() {
        let packets = write_packets(0x2a, &[0x0c; 32]);
        assert_eq!(packets.len(), 2);
        assert!(packets.iter().all(|p| p.len() <= PACKET_SIZE));
        assert_eq!(&packets[0][..3], [0xaa, 0x74, 0x80 | MAX_OUT_SEGMENT as u8]);
        assert_ne!(packets[0][packets[0].len() - 2], I2C_STM_STO);
        assert_eq!(packets[1][1], 0x80 | (33 - MAX_OUT_SEGMENT) as u8);
        assert_eq!(&packets[1][packets[1].len() - 2..], [I2C_STM_STO, I2C_STM_END]);
    }

    #[test]
    fn chunk_read_acks_all_but_last() {
        assert_eq!(
            read_packet(0x2a, 32),
            [0xaa, 0x74, 0x81, 0x55, 0xc0 | 31, 0xc0, 0x75, 0x00]
        );
        assert_eq!(read_packet(0x2a, 1), [0xaa, 0x74, 0x81, 0x55, 0xc0, 0x75, 0x00]);
    }
}
