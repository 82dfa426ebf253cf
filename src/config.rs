//! Connection settings, optionally read from a YAML file.
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_ADDRESS, DEFAULT_SETTLE_DELAY_MS},
    pacing::Pacing,
    transport::I2cSpeed,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 7-bit device address; accepts `0x2a` style hex.
    #[serde(deserialize_with = "parse_address")]
    pub address: u8,
    /// Pause after every register write. 0 disables it.
    pub settle_delay_ms: u64,
    /// Which CH341 bridge to use when several are plugged in.
    pub usb_index: usize,
    pub i2c_speed: I2cSpeed,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            address: DEFAULT_ADDRESS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            usb_index: 0,
            i2c_speed: I2cSpeed::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let raw = std::fs::read_to_string(p)?;
        let config = Self::from_yaml(&raw)
            .map_err(|e| anyhow::format_err!("{}: {}", p.display(), e))?;
        log::debug!("Loaded config from {}: {:?}", p.display(), config);
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(raw)?;
        anyhow::ensure!(
            config.address <= 0x7f,
            "address 0x{:02x} is not a 7-bit I2C address",
            config.address
        );
        Ok(config)
    }

    pub fn pacing(&self) -> Pacing {
        Pacing::from_millis(self.settle_delay_ms)
    }
}

/// Parses `0x2a`, `42`, or a bare YAML integer.
pub fn parse_address_str(s: &str) -> Result<u8> {
    let s = s.trim();
    let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)?
    } else {
        s.parse()?
    };
    Ok(value)
}

fn parse_address<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u8),
        Str(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Int(v) => Ok(v),
        Raw::Str(s) => parse_address_str(&s).map_err(serde::de::Error::custom),
    }
}
