//! Post-write settle policy.
use std::{thread::sleep, time::Duration};

use crate::constants::DEFAULT_SETTLE_DELAY_MS;

/// How long to let the device digest a register write before the next
/// transfer. The device has no readiness signal, so this is a fixed pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    Fixed(Duration),
    /// No pause at all. Only useful against simulated devices.
    Disabled,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing::Fixed(Duration::from_millis(DEFAULT_SETTLE_DELAY_MS))
    }
}

impl Pacing {
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Pacing::Disabled
        } else {
            Pacing::Fixed(Duration::from_millis(ms))
        }
    }

    pub fn settle(&self) {
        if let Pacing::Fixed(delay) = self {
            sleep(*delay);
        }
    }
}
