use hidlink_report_map::{BitError, BuildError, ParseError};
use thiserror::Error;

use crate::report::{DeviceClass, ReportId};
use crate::security::PeerAddress;
use crate::transport::TransportError;

/// The class queue is at capacity; the event was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("{class:?} queue is full")]
pub struct QueueFullError {
	pub class: DeviceClass,
}

/// The report map and the encoders disagree, or the class selection cannot be expressed.
/// Fatal at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorConsistencyError {
	#[error("the keyboard report is always present")]
	KeyboardRequired,
	#[error("the joystick report requires the pointer report")]
	JoystickWithoutPointer,
	#[error("report {0:?} is missing from the report map")]
	MissingReport(ReportId),
	#[error("report {0:?} is not produced by any included class")]
	UnexpectedReport(ReportId),
	#[error("report {id:?} declares {declared_bits} input bits but its encoder emits {encoder_bytes} bytes")]
	LengthMismatch {
		id: ReportId,
		declared_bits: u32,
		encoder_bytes: usize,
	},
	#[error("report {id:?} input fields end at bit {bits}, not on a byte boundary")]
	UnalignedReport { id: ReportId, bits: u32 },
	#[error("report {id:?} input field {index} does not match its encoder")]
	FieldMismatch { id: ReportId, index: usize },
	#[error("report map is malformed: {0}")]
	Malformed(#[from] ParseError),
	#[error("report map could not be built: {0}")]
	Build(#[from] BuildError),
}

/// A value lies outside the logical range its field declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("{class:?} {field} = {value} outside {min}..={max}")]
pub struct EncodingRangeError {
	pub class: DeviceClass,
	pub field: &'static str,
	pub value: i32,
	pub min: i32,
	pub max: i32,
}

/// Per event failure. The event is dropped, the delivery task carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
	#[error(transparent)]
	Range(#[from] EncodingRangeError),
	#[error("all {0} key slots are held")]
	Rollover(usize),
	#[error("report packing failed: {0}")]
	Packing(#[from] BitError),
	#[error("no room left for another report")]
	Overflow,
}

/// The event could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubmitError {
	#[error("{0:?} is not part of the report map")]
	ClassNotIncluded(DeviceClass),
	#[error(transparent)]
	QueueFull(#[from] QueueFullError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubmitTextError {
	#[error("no key types {ch:?} (character {index})")]
	Unmappable { index: usize, ch: char },
	#[error(transparent)]
	QueueFull(#[from] QueueFullError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("peer {peer:?} failed authentication")]
pub struct SecurityRejected {
	pub peer: PeerAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("a session with {active:?} is already open")]
pub struct ConnectionRejected {
	pub active: PeerAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
	#[error(transparent)]
	Descriptor(#[from] DescriptorConsistencyError),
	#[error("transport refused the report map: {0:?}")]
	Transport(TransportError),
}
