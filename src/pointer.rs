use hidlink_events::PointerEvent;

use crate::encoder::{push, Encoder, FieldSpec, Reports};
use crate::error::EncodeError;
use crate::report::{DeviceClass, Report};

pub const REPORT_LEN: usize = 4;

/// Buttons byte, then relative X, Y and wheel as two's complement bytes.
#[derive(Debug, Default)]
pub struct PointerEncoder;

impl Encoder for PointerEncoder {
	type Event = PointerEvent;

	const CLASS: DeviceClass = DeviceClass::Pointer;

	const FIELDS: &'static [FieldSpec] = &[
		FieldSpec::data("buttons", 1, 8, 0, 1),
		FieldSpec::data("motion", 8, 3, -127, 127),
	];

	fn encode(&mut self, event: &PointerEvent, out: &mut Reports) -> Result<(), EncodeError> {
		let motion = &Self::FIELDS[1];
		for value in [event.x, event.y, event.wheel] {
			motion.check(Self::CLASS, value as i32)?;
		}

		let bytes = [event.buttons.0, event.x as u8, event.y as u8, event.wheel as u8];
		push(out, Report::new(Self::CLASS.report_id(), &bytes))
	}

	fn neutral(&mut self) -> Report {
		Report::neutral(Self::CLASS)
	}
}
