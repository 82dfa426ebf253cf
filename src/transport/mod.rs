//! Abstract I2C transport interface.
use anyhow::Result;

pub use self::usb::{I2cSpeed, UsbTransport};

#[cfg(test)]
pub(crate) mod mock;
mod usb;

/// Addressed byte transfers on an I2C bus.
/// Might be a USB bridge, a native host adapter, or a fake in tests.
pub trait Transport {
    /// Write `bytes` to the device at 7-bit `addr` in one transaction.
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()>;
    /// Read exactly `buf.len()` bytes from the device at 7-bit `addr`.
    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()> {
        (**self).write(addr, bytes)
    }

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<()> {
        (**self).read(addr, buf)
    }
}
