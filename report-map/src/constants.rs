//! Usage pages and usages referenced by the report maps in this workspace.

pub mod page {
	pub const GENERIC_DESKTOP: u16 = 0x01;
	pub const KEYBOARD: u16 = 0x07;
	pub const LEDS: u16 = 0x08;
	pub const BUTTON: u16 = 0x09;
}

pub mod desktop {
	pub const POINTER: u16 = 0x01;
	pub const MOUSE: u16 = 0x02;
	pub const JOYSTICK: u16 = 0x04;
	pub const KEYBOARD: u16 = 0x06;
	pub const X: u16 = 0x30;
	pub const Y: u16 = 0x31;
	pub const Z: u16 = 0x32;
	pub const RZ: u16 = 0x35;
	pub const SLIDER: u16 = 0x36;
	pub const WHEEL: u16 = 0x38;
	pub const HAT_SWITCH: u16 = 0x39;
}

pub mod keyboard {
	pub const LEFT_CTRL: u16 = 0xe0;
	pub const RIGHT_GUI: u16 = 0xe7;
}

pub mod led {
	pub const NUM_LOCK: u16 = 0x01;
	pub const KANA: u16 = 0x05;
}

pub mod unit {
	/// English rotation, degrees.
	pub const DEGREES: u32 = 0x14;
}
