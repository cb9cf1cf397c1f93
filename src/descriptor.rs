//! Report map assembly and the startup check that it agrees with the encoders.

use hidlink_report_map::constants::{desktop, keyboard, led, page, unit};
use hidlink_report_map::{parse, CollectionKind, Direction, MainFlags, ReportLayout, ReportMap, ReportMapBuilder};

use crate::config::ClassesConfig;
use crate::encoder::{self, FieldSpec};
use crate::error::DescriptorConsistencyError;
use crate::keyboard::{KeyboardLeds, MAX_USAGE};
use crate::report::{DeviceClass, ReportId};

/// Room for all three collections.
pub const MAX_DESCRIPTOR_LEN: usize = 256;

type Builder = ReportMapBuilder<MAX_DESCRIPTOR_LEN>;

/// The immutable report map, built once at startup.
#[derive(Debug, Clone)]
pub struct ReportDescriptor {
	bytes: heapless::Vec<u8, MAX_DESCRIPTOR_LEN>,
	map: ReportMap,
	classes: ClassesConfig,
}

impl ReportDescriptor {
	/// Assembles the report map for `classes` and checks it against every encoder.
	pub fn build(classes: &ClassesConfig) -> Result<Self, DescriptorConsistencyError> {
		classes.validate()?;

		let mut builder = Builder::new();
		keyboard_collection(&mut builder);
		if classes.pointer {
			pointer_collection(&mut builder);
		}
		if classes.joystick {
			joystick_collection(&mut builder);
		}

		Self::from_bytes(&builder.build()?, classes)
	}

	/// Adopts an externally supplied report map after the same checks `build` runs.
	pub fn from_bytes(bytes: &[u8], classes: &ClassesConfig) -> Result<Self, DescriptorConsistencyError> {
		let mut owned = heapless::Vec::new();
		owned
			.extend_from_slice(bytes)
			.map_err(|_| DescriptorConsistencyError::Build(hidlink_report_map::BuildError::Overflow(bytes.len())))?;

		let descriptor = Self {
			map: parse(bytes)?,
			bytes: owned,
			classes: *classes,
		};
		descriptor.check()?;

		debug!("Report map is {} bytes", descriptor.bytes.len());
		Ok(descriptor)
	}

	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	pub fn classes(&self) -> &ClassesConfig {
		&self.classes
	}

	pub fn layout(&self, class: DeviceClass) -> Option<&ReportLayout> {
		if !self.classes.includes(class) {
			return None;
		}
		self.map.report(class.report_id().0)
	}

	/// Declared input payload length of `class`, in bytes.
	pub fn input_len(&self, class: DeviceClass) -> Option<usize> {
		self.layout(class).and_then(|layout| layout.bytes(Direction::Input))
	}

	fn check(&self) -> Result<(), DescriptorConsistencyError> {
		for report in self.map.reports() {
			let id = ReportId(report.id());
			match DeviceClass::from_report_id(id) {
				Some(class) if self.classes.includes(class) => {},
				_ => return Err(DescriptorConsistencyError::UnexpectedReport(id)),
			}
		}

		for class in self.classes.included() {
			let id = class.report_id();
			let layout = self
				.map
				.report(id.0)
				.ok_or(DescriptorConsistencyError::MissingReport(id))?;
			check_layout(class, layout)?;
		}

		if let Some(keyboard) = self.layout(DeviceClass::Keyboard) {
			let leds = keyboard.bytes(Direction::Output);
			if leds != Some(KeyboardLeds::REPORT_LEN) {
				warn!("Keyboard output report is {:?} bytes", leds);
			}
		}

		Ok(())
	}
}

fn check_layout(class: DeviceClass, layout: &ReportLayout) -> Result<(), DescriptorConsistencyError> {
	let id = class.report_id();
	let expected: &[FieldSpec] = encoder::fields(class);

	let bits = layout.bits(Direction::Input);
	let bytes = layout
		.bytes(Direction::Input)
		.ok_or(DescriptorConsistencyError::UnalignedReport { id, bits })?;
	if bytes != class.report_len() {
		return Err(DescriptorConsistencyError::LengthMismatch {
			id,
			declared_bits: bits,
			encoder_bytes: class.report_len(),
		});
	}

	let mut declared = layout.fields_in(Direction::Input);
	for (index, spec) in expected.iter().enumerate() {
		match declared.next() {
			Some(field) if spec.matches(field) => {},
			_ => return Err(DescriptorConsistencyError::FieldMismatch { id, index }),
		}
	}
	if declared.next().is_some() {
		return Err(DescriptorConsistencyError::FieldMismatch { id, index: expected.len() });
	}

	Ok(())
}

fn keyboard_collection(b: &mut Builder) {
	b.usage_page(page::GENERIC_DESKTOP)
		.usage(desktop::KEYBOARD)
		.collection(CollectionKind::Application)
		.report_id(DeviceClass::Keyboard.report_id().0)
		// Modifiers
		.report_size(1)
		.report_count(8)
		.usage_page(page::KEYBOARD)
		.usage_minimum(keyboard::LEFT_CTRL)
		.usage_maximum(keyboard::RIGHT_GUI)
		.logical_minimum(0)
		.logical_maximum(1)
		.input(MainFlags::DATA_VAR_ABS)
		// Reserved
		.report_count(1)
		.report_size(8)
		.input(MainFlags::CONST_VAR_ABS)
		// LEDs
		.report_count(5)
		.report_size(1)
		.usage_page(page::LEDS)
		.usage_minimum(led::NUM_LOCK)
		.usage_maximum(led::KANA)
		.output(MainFlags::DATA_VAR_ABS)
		.report_count(1)
		.report_size(3)
		.output(MainFlags::CONST_VAR_ABS)
		// Keys
		.report_count(6)
		.report_size(8)
		.logical_minimum(0)
		.logical_maximum(MAX_USAGE as i32)
		.usage_page(page::KEYBOARD)
		.usage_minimum(0)
		.usage_maximum(MAX_USAGE as u16)
		.input(MainFlags::DATA_ARRAY)
		.end_collection();
}

fn pointer_collection(b: &mut Builder) {
	b.usage_page(page::GENERIC_DESKTOP)
		.usage(desktop::MOUSE)
		.collection(CollectionKind::Application)
		.report_id(DeviceClass::Pointer.report_id().0)
		.usage(desktop::POINTER)
		.collection(CollectionKind::Physical)
		.usage_page(page::BUTTON)
		.usage_minimum(1)
		.usage_maximum(8)
		.logical_minimum(0)
		.logical_maximum(1)
		.report_count(8)
		.report_size(1)
		.input(MainFlags::DATA_VAR_ABS)
		.usage_page(page::GENERIC_DESKTOP)
		.usage(desktop::X)
		.usage(desktop::Y)
		.usage(desktop::WHEEL)
		.logical_minimum(-127)
		.logical_maximum(127)
		.report_size(8)
		.report_count(3)
		.input(MainFlags::DATA_VAR_REL)
		.end_collection()
		.end_collection();
}

fn joystick_collection(b: &mut Builder) {
	b.usage_page(page::GENERIC_DESKTOP)
		.usage(desktop::JOYSTICK)
		.collection(CollectionKind::Application)
		.report_id(DeviceClass::Joystick.report_id().0)
		// Buttons
		.logical_minimum(0)
		.logical_maximum(1)
		.report_count(32)
		.report_size(1)
		.usage_page(page::BUTTON)
		.usage_minimum(1)
		.usage_maximum(32)
		.input(MainFlags::DATA_VAR_ABS)
		// Hat, in degrees; the unit must not leak into the axes
		.push()
		.logical_minimum(0)
		.logical_maximum(7)
		.physical_minimum(0)
		.physical_maximum(315)
		.report_size(4)
		.report_count(1)
		.unit(unit::DEGREES)
		.usage_page(page::GENERIC_DESKTOP)
		.usage(desktop::HAT_SWITCH)
		.input(MainFlags::DATA_VAR_ABS_NULL)
		.pop()
		// X, Y, Z, Rz
		.usage_page(page::GENERIC_DESKTOP)
		.usage(desktop::POINTER)
		.collection(CollectionKind::Physical)
		.logical_minimum(0)
		.logical_maximum(1023)
		.report_count(4)
		.report_size(10)
		.usage(desktop::X)
		.usage(desktop::Y)
		.usage(desktop::Z)
		.usage(desktop::RZ)
		.input(MainFlags::DATA_VAR_ABS)
		.end_collection()
		// Sliders
		.logical_minimum(0)
		.logical_maximum(1023)
		.report_count(2)
		.report_size(10)
		.usage(desktop::SLIDER)
		.usage(desktop::SLIDER)
		.input(MainFlags::DATA_VAR_ABS)
		.end_collection();
}
