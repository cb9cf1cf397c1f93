use hidlink_report_map::Field;

use crate::error::{EncodeError, EncodingRangeError};
use crate::report::{DeviceClass, Report};

/// Reports produced by one event. A keyboard tap needs two, everything else one.
pub type Reports = heapless::Vec<Report, 2>;

/// One input main item as an encoder lays it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
	pub name: &'static str,
	pub size: u8,
	pub count: u16,
	pub logical_min: i32,
	pub logical_max: i32,
	pub constant: bool,
	/// Values outside the logical range mean "no value" (hat switch centered).
	pub nullable: bool,
}

impl FieldSpec {
	pub const fn data(name: &'static str, size: u8, count: u16, logical_min: i32, logical_max: i32) -> Self {
		Self {
			name,
			size,
			count,
			logical_min,
			logical_max,
			constant: false,
			nullable: false,
		}
	}

	pub const fn padding(name: &'static str, size: u8, count: u16) -> Self {
		Self {
			name,
			size,
			count,
			logical_min: 0,
			logical_max: 0,
			constant: true,
			nullable: false,
		}
	}

	pub const fn with_null_state(mut self) -> Self {
		self.nullable = true;
		self
	}

	pub const fn bits(&self) -> u32 {
		self.size as u32 * self.count as u32
	}

	/// Rejects `value` unless it lies within the logical range.
	pub fn check(&self, class: DeviceClass, value: i32) -> Result<(), EncodingRangeError> {
		if (self.logical_min..=self.logical_max).contains(&value) {
			return Ok(());
		}

		Err(EncodingRangeError {
			class,
			field: self.name,
			value,
			min: self.logical_min,
			max: self.logical_max,
		})
	}

	/// Whether a parsed report map field declares the same thing. The range of
	/// padding is irrelevant and not compared.
	pub fn matches(&self, field: &Field) -> bool {
		if field.size != self.size || field.count != self.count || field.is_constant() != self.constant {
			return false;
		}
		if self.constant {
			return true;
		}

		field.logical_min == self.logical_min
			&& field.logical_max == self.logical_max
			&& field.flags.has_null_state() == self.nullable
	}
}

/// Turns one class's events into input reports laid out exactly as its `FIELDS` say.
pub trait Encoder {
	type Event;

	const CLASS: DeviceClass;

	/// Input fields in declaration order.
	const FIELDS: &'static [FieldSpec];

	/// Appends the reports for `event` to `out`. On error nothing is appended and
	/// the encoder state is left as it was.
	fn encode(&mut self, event: &Self::Event, out: &mut Reports) -> Result<(), EncodeError>;

	/// Report releasing everything. Resets any state the encoder holds.
	fn neutral(&mut self) -> Report;

	fn report_len() -> usize {
		Self::CLASS.report_len()
	}

	fn declared_bits() -> u32 {
		Self::FIELDS.iter().map(FieldSpec::bits).sum()
	}
}

/// Input fields the encoder for `class` produces.
pub fn fields(class: DeviceClass) -> &'static [FieldSpec] {
	match class {
		DeviceClass::Keyboard => <crate::keyboard::KeyboardEncoder as Encoder>::FIELDS,
		DeviceClass::Pointer => <crate::pointer::PointerEncoder as Encoder>::FIELDS,
		DeviceClass::Joystick => <crate::joystick::JoystickEncoder as Encoder>::FIELDS,
	}
}

pub(crate) fn push(out: &mut Reports, report: Report) -> Result<(), EncodeError> {
	out.push(report).map_err(|_| EncodeError::Overflow)
}
