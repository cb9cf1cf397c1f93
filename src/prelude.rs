pub use crate::config::{board::BOARD, ClassesConfig, HidConfig, IdentityConfig, SecurityConfig};
pub use crate::device::HidDevice;
pub use crate::error::*;
pub use crate::events::{AxisEvent, Hat, KeyEvent, KeyModifiers, PointerButtons, PointerEvent};
pub use crate::keyboard::KeyboardLeds;
pub use crate::report::{DeviceClass, Report, ReportId};
pub use crate::security::{Passkey, PairingPolicy, PeerAddress, StaticPasskey};
pub use crate::session::ConnectionState;
pub use crate::transport::{ConnectionEvents, Transport, TransportError};

#[cfg(feature = "nrf")]
pub use crate::ble_hid::{BleTransport, Server};
#[cfg(feature = "nrf")]
pub use embassy_executor::Spawner;
#[cfg(feature = "nrf")]
pub use static_cell::make_static;
