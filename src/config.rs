use crate::error::DescriptorConsistencyError;
use crate::report::DeviceClass;
use crate::security::Passkey;

/// Which reports the report map carries. Decided once, at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClassesConfig {
	pub keyboard: bool,
	pub pointer: bool,
	pub joystick: bool,
}

impl Default for ClassesConfig {
	fn default() -> Self {
		Self {
			keyboard: true,
			pointer: true,
			joystick: false,
		}
	}
}

impl ClassesConfig {
	pub fn includes(&self, class: DeviceClass) -> bool {
		match class {
			DeviceClass::Keyboard => self.keyboard,
			DeviceClass::Pointer => self.pointer,
			DeviceClass::Joystick => self.joystick,
		}
	}

	pub fn included(&self) -> impl Iterator<Item = DeviceClass> + '_ {
		[DeviceClass::Keyboard, DeviceClass::Pointer, DeviceClass::Joystick]
			.into_iter()
			.filter(move |class| self.includes(*class))
	}

	pub fn validate(&self) -> Result<(), DescriptorConsistencyError> {
		if !self.keyboard {
			return Err(DescriptorConsistencyError::KeyboardRequired);
		}
		if self.joystick && !self.pointer {
			return Err(DescriptorConsistencyError::JoystickWithoutPointer);
		}
		Ok(())
	}
}

/// What the peer sees before it reads a single report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdentityConfig {
	pub device_name: &'static str,
	pub manufacturer: &'static str,
	/// GAP appearance, 0x03C0 is a generic HID.
	pub appearance: u16,
	/// 1 = Bluetooth SIG assigned vendor id, 2 = USB-IF.
	pub vid_source: u8,
	pub vendor_id: u16,
	pub product_id: u16,
	pub product_version: u16,
	pub bcd_hid: u16,
	pub country_code: u8,
	/// Bit 0 remote wake, bit 1 normally connectable.
	pub hid_flags: u8,
}

impl Default for IdentityConfig {
	fn default() -> Self {
		Self {
			device_name: "hidlink",
			manufacturer: "hidlink",
			appearance: 0x03c0,
			vid_source: 2,
			vendor_id: 0xe502,
			product_id: 0xa111,
			product_version: 0x0210,
			bcd_hid: 0x0111,
			country_code: 0,
			hid_flags: 0x01,
		}
	}
}

impl IdentityConfig {
	/// HID Information characteristic value.
	pub fn hid_information(&self) -> [u8; 4] {
		let [lo, hi] = self.bcd_hid.to_le_bytes();
		[lo, hi, self.country_code, self.hid_flags]
	}

	/// PnP ID characteristic value.
	pub fn pnp_id(&self) -> [u8; 7] {
		let [vid_lo, vid_hi] = self.vendor_id.to_le_bytes();
		let [pid_lo, pid_hi] = self.product_id.to_le_bytes();
		let [ver_lo, ver_hi] = self.product_version.to_le_bytes();
		[self.vid_source, vid_lo, vid_hi, pid_lo, pid_hi, ver_lo, ver_hi]
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SecurityConfig {
	pub passkey: u32,
}

impl SecurityConfig {
	pub fn passkey(&self) -> Passkey {
		Passkey(self.passkey.min(Passkey::MAX))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HidConfig {
	pub classes: ClassesConfig,
	pub identity: IdentityConfig,
	pub security: SecurityConfig,
}

impl HidConfig {
	pub fn validate(&self) -> Result<(), DescriptorConsistencyError> {
		self.classes.validate()
	}
}

/// Board configuration generated by `build.rs`.
pub mod board {
	use super::*;
	use lazy_static::lazy_static;

	include!(concat!(env!("OUT_DIR"), "/board.rs"));
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn joystick_needs_pointer() {
		let classes = ClassesConfig {
			keyboard: true,
			pointer: false,
			joystick: true,
		};
		assert_eq!(classes.validate(), Err(DescriptorConsistencyError::JoystickWithoutPointer));

		let classes = ClassesConfig {
			keyboard: false,
			..Default::default()
		};
		assert_eq!(classes.validate(), Err(DescriptorConsistencyError::KeyboardRequired));
	}

	#[test]
	fn included_classes_in_report_id_order() {
		let classes = ClassesConfig {
			joystick: true,
			..Default::default()
		};
		let included: Vec<DeviceClass> = classes.included().collect();
		assert_eq!(included, [DeviceClass::Keyboard, DeviceClass::Pointer, DeviceClass::Joystick]);

		let keyboard_only = ClassesConfig {
			pointer: false,
			..Default::default()
		};
		assert_eq!(keyboard_only.included().count(), 1);
	}

	#[test]
	fn identity_values() {
		let identity = IdentityConfig::default();
		assert_eq!(identity.hid_information(), [0x11, 0x01, 0x00, 0x01]);
		assert_eq!(identity.pnp_id(), [0x02, 0x02, 0xe5, 0x11, 0xa1, 0x10, 0x02]);
	}

	#[test]
	fn default_board_is_valid() {
		assert!(board::BOARD.validate().is_ok());
		assert!(board::BOARD.classes.keyboard);
	}
}
