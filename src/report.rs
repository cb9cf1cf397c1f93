use strum::EnumIter;

/// Longest input report payload (the joystick).
pub const MAX_REPORT_LEN: usize = 12;

/// Report id as declared in the report map and in the GATT report reference descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceClass {
	Keyboard,
	Pointer,
	Joystick,
}

impl DeviceClass {
	pub const COUNT: usize = 3;

	pub const fn report_id(self) -> ReportId {
		match self {
			DeviceClass::Keyboard => ReportId(1),
			DeviceClass::Pointer => ReportId(2),
			DeviceClass::Joystick => ReportId(3),
		}
	}

	/// Input payload length the encoder for this class emits.
	pub const fn report_len(self) -> usize {
		match self {
			DeviceClass::Keyboard => crate::keyboard::REPORT_LEN,
			DeviceClass::Pointer => crate::pointer::REPORT_LEN,
			DeviceClass::Joystick => crate::joystick::REPORT_LEN,
		}
	}

	pub const fn index(self) -> usize {
		self as usize
	}

	pub fn from_report_id(id: ReportId) -> Option<Self> {
		match id.0 {
			1 => Some(DeviceClass::Keyboard),
			2 => Some(DeviceClass::Pointer),
			3 => Some(DeviceClass::Joystick),
			_ => None,
		}
	}
}

/// One encoded input report, ready to be stored in its characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
	id: ReportId,
	len: u8,
	data: [u8; MAX_REPORT_LEN],
}

impl Report {
	pub fn new(id: ReportId, bytes: &[u8]) -> Self {
		debug_assert!(bytes.len() <= MAX_REPORT_LEN);
		let len = bytes.len().min(MAX_REPORT_LEN);
		let mut data = [0u8; MAX_REPORT_LEN];
		data[..len].copy_from_slice(&bytes[..len]);

		Self {
			id,
			len: len as u8,
			data,
		}
	}

	/// All zero report: nothing pressed, no motion.
	pub fn neutral(class: DeviceClass) -> Self {
		Self {
			id: class.report_id(),
			len: class.report_len() as u8,
			data: [0; MAX_REPORT_LEN],
		}
	}

	pub fn id(&self) -> ReportId {
		self.id
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.data[..self.len as usize]
	}

	pub fn is_neutral(&self) -> bool {
		self.as_bytes().iter().all(|&b| b == 0)
	}
}

#[cfg(feature = "defmt")]
impl defmt::Format for Report {
	fn format(&self, f: defmt::Formatter) {
		defmt::write!(f, "Report({=u8}, {=[u8]:x})", self.id.0, self.as_bytes())
	}
}
