/// Short item prefixes with the size bits cleared.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ItemTag {
	// Main items
	Input         = 0x80,
	Output        = 0x90,
	Feature       = 0xb0,
	Collection    = 0xa0,
	EndCollection = 0xc0,

	// Global items
	UsagePage       = 0x04,
	LogicalMinimum  = 0x14,
	LogicalMaximum  = 0x24,
	PhysicalMinimum = 0x34,
	PhysicalMaximum = 0x44,
	UnitExponent    = 0x54,
	Unit            = 0x64,
	ReportSize      = 0x74, // bits
	ReportId        = 0x84,
	ReportCount     = 0x94, // fields
	Push            = 0xa4,
	Pop             = 0xb4,

	// Local items
	Usage             = 0x08,
	UsageMinimum      = 0x18,
	UsageMaximum      = 0x28,
	DesignatorIndex   = 0x38,
	DesignatorMinimum = 0x48,
	DesignatorMaximum = 0x58,
	StringIndex       = 0x78,
	StringMinimum     = 0x88,
	StringMaximum     = 0x98,
	Delimiter         = 0xa8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ItemKind {
	Main,
	Global,
	Local,
}

/// Prefix byte announcing a long item. Its data size lives in the next byte.
pub const LONG_ITEM_PREFIX: u8 = 0xfe;

impl ItemTag {
	pub fn from_prefix(prefix: u8) -> Option<Self> {
		use ItemTag::*;

		Some(match prefix & 0xfc {
			0x80 => Input,
			0x90 => Output,
			0xb0 => Feature,
			0xa0 => Collection,
			0xc0 => EndCollection,
			0x04 => UsagePage,
			0x14 => LogicalMinimum,
			0x24 => LogicalMaximum,
			0x34 => PhysicalMinimum,
			0x44 => PhysicalMaximum,
			0x54 => UnitExponent,
			0x64 => Unit,
			0x74 => ReportSize,
			0x84 => ReportId,
			0x94 => ReportCount,
			0xa4 => Push,
			0xb4 => Pop,
			0x08 => Usage,
			0x18 => UsageMinimum,
			0x28 => UsageMaximum,
			0x38 => DesignatorIndex,
			0x48 => DesignatorMinimum,
			0x58 => DesignatorMaximum,
			0x78 => StringIndex,
			0x88 => StringMinimum,
			0x98 => StringMaximum,
			0xa8 => Delimiter,
			_ => return None,
		})
	}

	pub fn kind(self) -> ItemKind {
		match (self as u8) & 0x0c {
			0x00 => ItemKind::Main,
			0x04 => ItemKind::Global,
			_ => ItemKind::Local,
		}
	}
}

/// Payload of a short item.
///
/// Signed payloads pick the narrowest width that keeps the sign bit right, so
/// `-127` becomes `0x81` and `255` becomes `0xff 0x00`. Hosts read logical and
/// physical extents as signed, which is why those items must use `Signed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ItemData {
	None,
	Unsigned(u32),
	Signed(i32),
}

impl ItemData {
	/// Little endian payload and its length (0, 1, 2 or 4).
	pub fn to_bytes(self) -> ([u8; 4], usize) {
		match self {
			ItemData::None => ([0; 4], 0),
			ItemData::Unsigned(value) => {
				let len = if value <= 0xff {
					1
				} else if value <= 0xffff {
					2
				} else {
					4
				};
				(value.to_le_bytes(), len)
			},
			ItemData::Signed(value) => {
				let len = if i8::try_from(value).is_ok() {
					1
				} else if i16::try_from(value).is_ok() {
					2
				} else {
					4
				};
				(value.to_le_bytes(), len)
			},
		}
	}
}

/// Size code stored in the two low bits of the prefix.
pub fn size_code(len: usize) -> u8 {
	match len {
		0 => 0,
		1 => 1,
		2 => 2,
		_ => 3,
	}
}

pub fn data_len(prefix: u8) -> usize {
	match prefix & 0x03 {
		0 => 0,
		1 => 1,
		2 => 2,
		_ => 4,
	}
}

/// Bits of the Input/Output/Feature main item payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MainFlags(pub u8);

impl MainFlags {
	pub const CONSTANT: u8 = 0x01;
	pub const VARIABLE: u8 = 0x02;
	pub const RELATIVE: u8 = 0x04;
	pub const NULL_STATE: u8 = 0x40;

	/// Data, Array, Absolute.
	pub const DATA_ARRAY: MainFlags = MainFlags(0);
	/// Data, Variable, Absolute.
	pub const DATA_VAR_ABS: MainFlags = MainFlags(Self::VARIABLE);
	/// Constant, Variable, Absolute.
	pub const CONST_VAR_ABS: MainFlags = MainFlags(Self::CONSTANT | Self::VARIABLE);
	/// Data, Variable, Relative.
	pub const DATA_VAR_REL: MainFlags = MainFlags(Self::VARIABLE | Self::RELATIVE);
	/// Data, Variable, Absolute, Null state.
	pub const DATA_VAR_ABS_NULL: MainFlags = MainFlags(Self::VARIABLE | Self::NULL_STATE);

	pub fn is_constant(self) -> bool {
		self.0 & Self::CONSTANT != 0
	}

	pub fn is_variable(self) -> bool {
		self.0 & Self::VARIABLE != 0
	}

	pub fn is_relative(self) -> bool {
		self.0 & Self::RELATIVE != 0
	}

	pub fn has_null_state(self) -> bool {
		self.0 & Self::NULL_STATE != 0
	}
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CollectionKind {
	Physical    = 0x00,
	Application = 0x01,
	Logical     = 0x02,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn signed_data_uses_narrowest_width() {
		assert_eq!(ItemData::Signed(-127).to_bytes(), ([0x81, 0xff, 0xff, 0xff], 1));
		assert_eq!(ItemData::Signed(127).to_bytes().1, 1);
		assert_eq!(ItemData::Signed(255).to_bytes(), ([0xff, 0x00, 0x00, 0x00], 2));
		assert_eq!(ItemData::Signed(1023).to_bytes(), ([0xff, 0x03, 0x00, 0x00], 2));
		assert_eq!(ItemData::Signed(70000).to_bytes().1, 4);
	}

	#[test]
	fn unsigned_data_widths() {
		assert_eq!(ItemData::Unsigned(0).to_bytes().1, 1);
		assert_eq!(ItemData::Unsigned(0xe7).to_bytes().1, 1);
		assert_eq!(ItemData::Unsigned(0x0100).to_bytes().1, 2);
		assert_eq!(ItemData::None.to_bytes().1, 0);
	}

	#[test]
	fn prefix_round_trip() {
		for tag in [ItemTag::Input, ItemTag::ReportId, ItemTag::UsageMaximum, ItemTag::Pop] {
			let prefix = tag as u8 | size_code(2);
			assert_eq!(ItemTag::from_prefix(prefix), Some(tag));
			assert_eq!(data_len(prefix), 2);
		}
		assert_eq!(ItemTag::from_prefix(0xf0), None);
	}

	#[test]
	fn kinds() {
		assert_eq!(ItemTag::Collection.kind(), ItemKind::Main);
		assert_eq!(ItemTag::ReportSize.kind(), ItemKind::Global);
		assert_eq!(ItemTag::Usage.kind(), ItemKind::Local);
	}
}
