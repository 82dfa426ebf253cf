//! Qwiic OpenLog I2C driver.

pub mod bus;
pub mod config;
pub mod constants;
pub mod listing;
pub mod openlog;
pub mod pacing;
pub mod protocol;
pub mod reader;
pub mod status;
pub mod transport;
pub mod writer;

pub use self::bus::Bus;
pub use self::config::Config;
pub use self::listing::Entry;
pub use self::openlog::OpenLog;
pub use self::pacing::Pacing;
pub use self::protocol::Command;
pub use self::reader::Line;
pub use self::status::{Status, Version};
pub use self::transport::Transport;
