#![cfg_attr(not(test), no_std)]
//! BLE HID report pipeline: a report map fixed at startup, per class event
//! queues, encoders that follow the report map bit for bit, delivery loops and
//! the single peer session that gates them.

// Must stay first so the logging macros are visible in every module below.
#[macro_use]
mod fmt;

pub mod config;
pub mod delivery;
pub mod descriptor;
pub mod device;
pub mod encoder;
pub mod error;
pub mod joystick;
pub mod keyboard;
pub mod pointer;
pub mod prelude;
pub mod queue;
pub mod report;
pub mod security;
pub mod session;
pub mod transport;

#[cfg(feature = "nrf")]
pub mod ble_hid;
#[cfg(feature = "nrf")]
pub mod nrf;

pub use hidlink_events as events;
pub use hidlink_report_map as report_map;
