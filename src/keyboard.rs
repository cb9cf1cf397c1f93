use hidlink_events::{KeyAction, KeyEvent, KeyModifiers};
use hidlink_report_map::constants::keyboard::{LEFT_CTRL, RIGHT_GUI};

use crate::encoder::{push, Encoder, FieldSpec, Reports};
use crate::error::EncodeError;
use crate::report::{DeviceClass, Report};

pub const REPORT_LEN: usize = 8;

/// Simultaneous non-modifier keys the boot layout carries.
pub const ROLLOVER: usize = 6;

/// Highest Keyboard/Keypad usage the report map declares.
pub const MAX_USAGE: u8 = 104;

/// Modifier bits, reserved byte, six key slots.
#[derive(Debug, Default)]
pub struct KeyboardEncoder {
	modifiers: KeyModifiers,
	keys: [u8; ROLLOVER],
}

impl KeyboardEncoder {
	pub fn new() -> Self {
		Self::default()
	}

	fn report(&self, extra_modifiers: KeyModifiers, extra_key: u8) -> Report {
		let mut bytes = [0u8; REPORT_LEN];
		bytes[0] = (self.modifiers | extra_modifiers).bits();

		let mut slots = self.keys.iter().copied().filter(|&k| k != 0).chain((extra_key != 0).then_some(extra_key));
		for slot in bytes[2..].iter_mut() {
			match slots.next() {
				Some(key) => *slot = key,
				None => break,
			}
		}

		Report::new(DeviceClass::Keyboard.report_id(), &bytes)
	}

	fn held(&self, usage: u8) -> bool {
		usage != 0 && self.keys.contains(&usage)
	}

	fn free_slots(&self) -> usize {
		self.keys.iter().filter(|&&k| k == 0).count()
	}

	fn hold(&mut self, usage: u8) {
		if usage == 0 || self.held(usage) {
			return;
		}
		if let Some(slot) = self.keys.iter_mut().find(|k| **k == 0) {
			*slot = usage;
		}
	}

	fn let_go(&mut self, usage: u8) {
		if usage == 0 {
			return;
		}
		if let Some(pos) = self.keys.iter().position(|&k| k == usage) {
			// Keep the slots packed so reports list keys in press order.
			self.keys.copy_within(pos + 1.., pos);
			self.keys[ROLLOVER - 1] = 0;
		}
	}
}

/// Modifier usages (0xE0..=0xE7) travel as bits of byte 0 rather than in a slot.
fn split_usage(event: &KeyEvent) -> (u8, KeyModifiers) {
	let usage = event.usage as u16;
	if (LEFT_CTRL..=RIGHT_GUI).contains(&usage) {
		(0, event.modifiers | KeyModifiers(1u8 << (usage - LEFT_CTRL)))
	} else {
		(event.usage, event.modifiers)
	}
}

impl Encoder for KeyboardEncoder {
	type Event = KeyEvent;

	const CLASS: DeviceClass = DeviceClass::Keyboard;

	const FIELDS: &'static [FieldSpec] = &[
		FieldSpec::data("modifiers", 1, 8, 0, 1),
		FieldSpec::padding("reserved", 8, 1),
		FieldSpec::data("keys", 8, ROLLOVER as u16, 0, MAX_USAGE as i32),
	];

	fn encode(&mut self, event: &KeyEvent, out: &mut Reports) -> Result<(), EncodeError> {
		let (usage, modifiers) = split_usage(event);
		Self::FIELDS[2].check(Self::CLASS, usage as i32)?;

		match event.action {
			KeyAction::Press => {
				if usage != 0 && !self.held(usage) && self.free_slots() == 0 {
					return Err(EncodeError::Rollover(ROLLOVER));
				}
				self.hold(usage);
				self.modifiers = self.modifiers | modifiers;
				push(out, self.report(KeyModifiers::NONE, 0))
			},
			KeyAction::Release => {
				self.let_go(usage);
				self.modifiers = KeyModifiers(self.modifiers.bits() & !modifiers.bits());
				push(out, self.report(KeyModifiers::NONE, 0))
			},
			KeyAction::Tap => {
				if usage != 0 && !self.held(usage) && self.free_slots() == 0 {
					return Err(EncodeError::Rollover(ROLLOVER));
				}
				let down = if self.held(usage) {
					self.report(modifiers, 0)
				} else {
					self.report(modifiers, usage)
				};
				push(out, down)?;
				push(out, self.report(KeyModifiers::NONE, 0))
			},
		}
	}

	fn neutral(&mut self) -> Report {
		*self = Self::default();
		Report::neutral(Self::CLASS)
	}
}

/// Keyboard output report: the host's lock lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardLeds {
	pub num_lock: bool,
	pub caps_lock: bool,
	pub scroll_lock: bool,
	pub compose: bool,
	pub kana: bool,
}

impl KeyboardLeds {
	/// Output report payload length.
	pub const REPORT_LEN: usize = 1;

	pub fn from_bits(bits: u8) -> Self {
		Self {
			num_lock: bits & 0x01 != 0,
			caps_lock: bits & 0x02 != 0,
			scroll_lock: bits & 0x04 != 0,
			compose: bits & 0x08 != 0,
			kana: bits & 0x10 != 0,
		}
	}

	/// `None` unless `bytes` is exactly one output report.
	pub fn decode(bytes: &[u8]) -> Option<Self> {
		match bytes {
			[bits] => Some(Self::from_bits(*bits)),
			_ => None,
		}
	}

	pub fn bits(&self) -> u8 {
		self.num_lock as u8
			| (self.caps_lock as u8) << 1
			| (self.scroll_lock as u8) << 2
			| (self.compose as u8) << 3
			| (self.kana as u8) << 4
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::EncodingRangeError;

	const A: u8 = 0x04;

	fn encode(encoder: &mut KeyboardEncoder, event: KeyEvent) -> Result<Vec<Vec<u8>>, EncodeError> {
		let mut out = Reports::new();
		encoder.encode(&event, &mut out)?;
		Ok(out.iter().map(|r| r.as_bytes().to_vec()).collect())
	}

	#[test]
	fn tap_is_down_then_all_zero() {
		let mut encoder = KeyboardEncoder::new();
		let reports = encode(&mut encoder, KeyEvent::tap(0x0b, KeyModifiers::LEFT_SHIFT)).unwrap();
		assert_eq!(reports, [vec![0x02, 0, 0x0b, 0, 0, 0, 0, 0], vec![0; 8]]);
	}

	#[test]
	fn press_then_release() {
		let mut encoder = KeyboardEncoder::new();
		assert_eq!(encode(&mut encoder, KeyEvent::press(A, KeyModifiers::NONE)).unwrap(), [vec![0, 0, A, 0, 0, 0, 0, 0]]);
		assert_eq!(encode(&mut encoder, KeyEvent::release(A, KeyModifiers::NONE)).unwrap(), [vec![0; 8]]);
	}

	#[test]
	fn release_keeps_press_order() {
		let mut encoder = KeyboardEncoder::new();
		for usage in [A, A + 1, A + 2] {
			encode(&mut encoder, KeyEvent::press(usage, KeyModifiers::NONE)).unwrap();
		}
		let reports = encode(&mut encoder, KeyEvent::release(A + 1, KeyModifiers::NONE)).unwrap();
		assert_eq!(reports, [vec![0, 0, A, A + 2, 0, 0, 0, 0]]);
	}

	#[test]
	fn tap_while_holding_returns_to_held_state() {
		let mut encoder = KeyboardEncoder::new();
		encode(&mut encoder, KeyEvent::press(0xe1, KeyModifiers::NONE)).unwrap();
		let reports = encode(&mut encoder, KeyEvent::tap(A, KeyModifiers::NONE)).unwrap();
		assert_eq!(reports, [vec![0x02, 0, A, 0, 0, 0, 0, 0], vec![0x02, 0, 0, 0, 0, 0, 0, 0]]);
	}

	#[test]
	fn seventh_key_is_rollover() {
		let mut encoder = KeyboardEncoder::new();
		for usage in A..A + 6 {
			encode(&mut encoder, KeyEvent::press(usage, KeyModifiers::NONE)).unwrap();
		}
		assert_eq!(
			encode(&mut encoder, KeyEvent::press(A + 6, KeyModifiers::NONE)),
			Err(EncodeError::Rollover(ROLLOVER))
		);
		// Re-pressing a held key is not a seventh key.
		assert!(encode(&mut encoder, KeyEvent::press(A, KeyModifiers::NONE)).is_ok());
	}

	#[test]
	fn usage_outside_logical_range_is_rejected() {
		let mut encoder = KeyboardEncoder::new();
		let err = encode(&mut encoder, KeyEvent::tap(MAX_USAGE + 1, KeyModifiers::NONE)).unwrap_err();
		assert_eq!(
			err,
			EncodeError::Range(EncodingRangeError {
				class: DeviceClass::Keyboard,
				field: "keys",
				value: 105,
				min: 0,
				max: 104,
			})
		);
		assert!(encode(&mut encoder, KeyEvent::tap(MAX_USAGE, KeyModifiers::NONE)).is_ok());
	}

	#[test]
	fn neutral_forgets_held_keys() {
		let mut encoder = KeyboardEncoder::new();
		encode(&mut encoder, KeyEvent::press(A, KeyModifiers::LEFT_CTRL)).unwrap();
		assert!(encoder.neutral().is_neutral());
		assert_eq!(encode(&mut encoder, KeyEvent::release(0, KeyModifiers::NONE)).unwrap(), [vec![0; 8]]);
	}

	#[test]
	fn leds() {
		let leds = KeyboardLeds::decode(&[0x03]).unwrap();
		assert!(leds.num_lock && leds.caps_lock && !leds.scroll_lock);
		assert_eq!(leds.bits(), 0x03);
		assert_eq!(KeyboardLeds::decode(&[1, 2]), None);
	}
}
