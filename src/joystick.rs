use hidlink_events::{AxisEvent, Hat, JOYSTICK_AXES, JOYSTICK_SLIDERS};
use hidlink_report_map::{BitError, BitReader, BitWriter};

use crate::encoder::{push, Encoder, FieldSpec, Reports};
use crate::error::EncodeError;
use crate::report::{DeviceClass, Report};

pub const REPORT_LEN: usize = 12;

pub const AXIS_MAX: u16 = 1023;

const BUTTONS: FieldSpec = FieldSpec::data("buttons", 1, 32, 0, 1);
const HAT: FieldSpec = FieldSpec::data("hat", 4, 1, 0, 7).with_null_state();
const AXES: FieldSpec = FieldSpec::data("axes", 10, JOYSTICK_AXES as u16, 0, AXIS_MAX as i32);
const SLIDERS: FieldSpec = FieldSpec::data("sliders", 10, JOYSTICK_SLIDERS as u16, 0, AXIS_MAX as i32);

/// 32 button bits, a 4 bit hat, X/Y/Z/Rz and two sliders at 10 bits each,
/// packed least significant bit first in declaration order.
#[derive(Debug, Default)]
pub struct JoystickEncoder;

impl JoystickEncoder {
	fn pack(event: &AxisEvent) -> Result<[u8; REPORT_LEN], EncodeError> {
		let mut bytes = [0u8; REPORT_LEN];
		let mut writer = BitWriter::new(&mut bytes);

		writer.write(event.buttons, BUTTONS.size)?;

		// Centered is the null value and deliberately outside 0..=7.
		if event.hat != Hat::Centered {
			HAT.check(DeviceClass::Joystick, event.hat.raw() as i32)?;
		}
		writer.write(event.hat.raw() as u32, HAT.size)?;

		for (spec, values) in [(&AXES, &event.axes[..]), (&SLIDERS, &event.sliders[..])] {
			for &value in values {
				spec.check(DeviceClass::Joystick, value as i32)?;
				writer.write(value as u32, spec.size)?;
			}
		}

		debug_assert_eq!(writer.position(), REPORT_LEN * 8);
		Ok(bytes)
	}
}

impl Encoder for JoystickEncoder {
	type Event = AxisEvent;

	const CLASS: DeviceClass = DeviceClass::Joystick;

	const FIELDS: &'static [FieldSpec] = &[BUTTONS, HAT, AXES, SLIDERS];

	fn encode(&mut self, event: &AxisEvent, out: &mut Reports) -> Result<(), EncodeError> {
		let bytes = Self::pack(event)?;
		push(out, Report::new(Self::CLASS.report_id(), &bytes))
	}

	/// Nothing pressed, hat centered, every axis at zero.
	fn neutral(&mut self) -> Report {
		match Self::pack(&AxisEvent::default()) {
			Ok(bytes) => Report::new(Self::CLASS.report_id(), &bytes),
			Err(_) => Report::neutral(Self::CLASS),
		}
	}
}

/// Unpacks a joystick input report. Hat values with no direction read as centered.
pub fn decode(bytes: &[u8]) -> Result<AxisEvent, BitError> {
	let mut reader = BitReader::new(bytes);
	let mut event = AxisEvent {
		buttons: reader.read(BUTTONS.size)?,
		hat: Hat::from_repr(reader.read(HAT.size)? as u8).unwrap_or_default(),
		..Default::default()
	};
	for axis in event.axes.iter_mut() {
		*axis = reader.read(AXES.size)? as u16;
	}
	for slider in event.sliders.iter_mut() {
		*slider = reader.read(SLIDERS.size)? as u16;
	}

	Ok(event)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use strum::IntoEnumIterator;

	fn encode(event: &AxisEvent) -> Result<Report, EncodeError> {
		let mut out = Reports::new();
		JoystickEncoder.encode(event, &mut out)?;
		Ok(out[0])
	}

	#[test]
	fn field_boundaries() {
		let event = AxisEvent {
			buttons: 0x8000_0001,
			hat: Hat::Right,
			axes: [AXIS_MAX, 0, 1, 0x155],
			sliders: [0, AXIS_MAX],
		};
		let report = encode(&event).unwrap();
		let bytes = report.as_bytes();

		assert_eq!(bytes.len(), REPORT_LEN);
		assert_eq!(&bytes[..4], &[0x01, 0x00, 0x00, 0x80]);
		// Hat in the low nibble of byte 4, X starts at bit 36.
		assert_eq!(bytes[4], 0x02 | 0xf0);
		assert_eq!(bytes[5], 0x3f);
		// Last 10 bits are the second slider.
		assert_eq!(bytes[11], 0xff);
		assert_eq!(bytes[10] & 0xc0, 0xc0);
	}

	#[test]
	fn axis_above_1023_is_rejected() {
		let mut event = AxisEvent::default();
		event.sliders[1] = AXIS_MAX + 1;
		let err = encode(&event).unwrap_err();
		assert!(matches!(err, EncodeError::Range(e) if e.field == "sliders" && e.value == 1024));
	}

	#[test]
	fn neutral_centers_the_hat() {
		let report = JoystickEncoder.neutral();
		assert_eq!(report.as_bytes().len(), REPORT_LEN);
		assert_eq!(report.as_bytes()[4], 0x0f);
		assert_eq!(decode(report.as_bytes()).unwrap(), AxisEvent::default());
	}

	fn hat() -> impl Strategy<Value = Hat> {
		prop::sample::select(Hat::iter().collect::<Vec<_>>())
	}

	proptest! {
		#[test]
		fn pack_unpack_round_trip(
			buttons in any::<u32>(),
			hat in hat(),
			axes in prop::array::uniform4(0..=AXIS_MAX),
			sliders in prop::array::uniform2(0..=AXIS_MAX),
		) {
			let event = AxisEvent { buttons, hat, axes, sliders };
			let report = encode(&event).unwrap();
			prop_assert_eq!(report.as_bytes().len(), REPORT_LEN);
			prop_assert_eq!(decode(report.as_bytes()).unwrap(), event);
		}
	}
}
