#![cfg_attr(not(test), no_std)]
//! Input events handed from producers to the HID engine, one type per device class.

pub mod keymap;

use strum::{EnumIter, FromRepr};

/// Boot keyboard modifier byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyModifiers(pub u8);

impl KeyModifiers {
	pub const NONE: KeyModifiers = KeyModifiers(0);
	pub const LEFT_CTRL: KeyModifiers = KeyModifiers(1 << 0);
	pub const LEFT_SHIFT: KeyModifiers = KeyModifiers(1 << 1);
	pub const LEFT_ALT: KeyModifiers = KeyModifiers(1 << 2);
	pub const LEFT_GUI: KeyModifiers = KeyModifiers(1 << 3);
	pub const RIGHT_CTRL: KeyModifiers = KeyModifiers(1 << 4);
	pub const RIGHT_SHIFT: KeyModifiers = KeyModifiers(1 << 5);
	pub const RIGHT_ALT: KeyModifiers = KeyModifiers(1 << 6);
	pub const RIGHT_GUI: KeyModifiers = KeyModifiers(1 << 7);

	pub fn bits(self) -> u8 {
		self.0
	}

	pub fn contains(self, other: KeyModifiers) -> bool {
		self.0 & other.0 == other.0
	}
}

impl core::ops::BitOr for KeyModifiers {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		KeyModifiers(self.0 | rhs.0)
	}
}

impl From<KeyModifiers> for u8 {
	fn from(modifiers: KeyModifiers) -> u8 {
		modifiers.0
	}
}

impl From<u8> for KeyModifiers {
	fn from(bits: u8) -> Self {
		KeyModifiers(bits)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyAction {
	/// Key goes down and stays down.
	Press,
	/// Key goes up.
	Release,
	/// Press immediately followed by release.
	Tap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
	/// Keyboard/Keypad page usage, 0 for a modifier-only event.
	pub usage: u8,
	pub modifiers: KeyModifiers,
	pub action: KeyAction,
}

impl KeyEvent {
	pub fn tap(usage: u8, modifiers: KeyModifiers) -> Self {
		Self {
			usage,
			modifiers,
			action: KeyAction::Tap,
		}
	}

	pub fn press(usage: u8, modifiers: KeyModifiers) -> Self {
		Self {
			usage,
			modifiers,
			action: KeyAction::Press,
		}
	}

	pub fn release(usage: u8, modifiers: KeyModifiers) -> Self {
		Self {
			usage,
			modifiers,
			action: KeyAction::Release,
		}
	}
}

/// Mouse buttons, bit 0 is the primary button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PointerButtons(pub u8);

impl PointerButtons {
	pub const NONE: PointerButtons = PointerButtons(0);
	pub const LEFT: PointerButtons = PointerButtons(1 << 0);
	pub const RIGHT: PointerButtons = PointerButtons(1 << 1);
	pub const MIDDLE: PointerButtons = PointerButtons(1 << 2);
}

/// Relative pointer motion. The report declares -127..=127 for every axis, so
/// `i8::MIN` is rejected by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PointerEvent {
	pub buttons: PointerButtons,
	pub x: i8,
	pub y: i8,
	pub wheel: i8,
}

impl PointerEvent {
	pub fn motion(x: i8, y: i8) -> Self {
		Self {
			x,
			y,
			..Default::default()
		}
	}

	pub fn scroll(wheel: i8) -> Self {
		Self {
			wheel,
			..Default::default()
		}
	}

	pub fn with_buttons(mut self, buttons: PointerButtons) -> Self {
		self.buttons = buttons;
		self
	}
}

/// Eight way hat switch. `Centered` is sent as a value outside the declared
/// logical range, which the report map marks as the null state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hat {
	Up        = 0,
	UpRight   = 1,
	Right     = 2,
	DownRight = 3,
	Down      = 4,
	DownLeft  = 5,
	Left      = 6,
	UpLeft    = 7,
	#[default]
	Centered  = 0x0f,
}

impl Hat {
	pub fn raw(self) -> u8 {
		self as u8
	}
}

pub const JOYSTICK_BUTTONS: usize = 32;
pub const JOYSTICK_AXES: usize = 4;
pub const JOYSTICK_SLIDERS: usize = 2;

/// Full joystick state: 32 buttons, a hat, X/Y/Z/Rz and two sliders.
/// Axis and slider values are absolute, 0..=1023.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisEvent {
	pub buttons: u32,
	pub hat: Hat,
	pub axes: [u16; JOYSTICK_AXES],
	pub sliders: [u16; JOYSTICK_SLIDERS],
}

impl AxisEvent {
	pub fn button(&self, index: usize) -> bool {
		index < JOYSTICK_BUTTONS && self.buttons & (1 << index) != 0
	}

	pub fn set_button(&mut self, index: usize, pressed: bool) {
		if index >= JOYSTICK_BUTTONS {
			return;
		}
		if pressed {
			self.buttons |= 1 << index;
		} else {
			self.buttons &= !(1 << index);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use strum::IntoEnumIterator;

	#[test]
	fn modifiers_combine() {
		let mods = KeyModifiers::LEFT_SHIFT | KeyModifiers::RIGHT_ALT;
		assert_eq!(mods.bits(), 0x42);
		assert!(mods.contains(KeyModifiers::LEFT_SHIFT));
		assert!(!mods.contains(KeyModifiers::LEFT_CTRL));
	}

	#[test]
	fn hat_directions_are_contiguous() {
		let raw: Vec<u8> = Hat::iter().map(Hat::raw).collect();
		assert_eq!(raw, [0, 1, 2, 3, 4, 5, 6, 7, 0x0f]);
		assert_eq!(Hat::from_repr(4), Some(Hat::Down));
		assert_eq!(Hat::from_repr(9), None);
	}

	#[test]
	fn joystick_buttons() {
		let mut event = AxisEvent::default();
		event.set_button(0, true);
		event.set_button(31, true);
		event.set_button(32, true);
		assert_eq!(event.buttons, 0x8000_0001);
		assert!(event.button(31));
		event.set_button(0, false);
		assert!(!event.button(0));
	}
}
