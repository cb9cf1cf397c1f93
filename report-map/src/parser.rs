use heapless::Vec;
use thiserror::Error;

use crate::items::{data_len, ItemTag, MainFlags, LONG_ITEM_PREFIX};

pub const MAX_REPORTS: usize = 8;
pub const MAX_FIELDS: usize = 16;
const MAX_STACK: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
	#[error("item at offset {0} runs past the end of the map")]
	Truncated(usize),
	#[error("unknown item prefix {prefix:#04x} at offset {offset}")]
	UnknownItem { offset: usize, prefix: u8 },
	#[error("report id 0 is reserved (offset {0})")]
	ReservedReportId(usize),
	#[error("too many report ids")]
	TooManyReports,
	#[error("report {0} declares too many fields")]
	TooManyFields(u8),
	#[error("field at offset {offset} is {bits} bits wide")]
	FieldTooWide { offset: usize, bits: u32 },
	#[error("field at offset {offset} repeats {count} times")]
	CountTooLarge { offset: usize, count: u32 },
	#[error("push without room on the global stack")]
	StackOverflow,
	#[error("pop on an empty global stack")]
	StackUnderflow,
	#[error("collections do not balance")]
	UnbalancedCollections,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
	Input,
	Output,
	Feature,
}

/// One Input/Output/Feature main item: `count` fields of `size` bits each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
	pub direction: Direction,
	/// Offset in bits from the start of the report payload (the report id byte is not part of it).
	pub bit_offset: u32,
	pub size: u8,
	pub count: u16,
	pub logical_min: i32,
	pub logical_max: i32,
	pub usage_page: u16,
	pub flags: MainFlags,
}

impl Field {
	pub fn bits(&self) -> u32 {
		self.size as u32 * self.count as u32
	}

	pub fn is_constant(&self) -> bool {
		self.flags.is_constant()
	}

	pub fn accepts(&self, value: i32) -> bool {
		(self.logical_min..=self.logical_max).contains(&value)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLayout {
	id: u8,
	fields: Vec<Field, MAX_FIELDS>,
	bits: [u32; 3],
}

impl ReportLayout {
	fn new(id: u8) -> Self {
		Self {
			id,
			fields: Vec::new(),
			bits: [0; 3],
		}
	}

	pub fn id(&self) -> u8 {
		self.id
	}

	pub fn fields(&self) -> &[Field] {
		&self.fields
	}

	pub fn fields_in(&self, direction: Direction) -> impl Iterator<Item = &Field> {
		self.fields.iter().filter(move |f| f.direction == direction)
	}

	/// Total declared width in one direction.
	pub fn bits(&self, direction: Direction) -> u32 {
		self.bits[direction as usize]
	}

	/// Payload length in bytes, or `None` when the fields do not end on a byte boundary.
	pub fn bytes(&self, direction: Direction) -> Option<usize> {
		let bits = self.bits(direction);
		(bits % 8 == 0).then_some((bits / 8) as usize)
	}

	fn push(&mut self, field: Field) -> Result<(), ParseError> {
		self.bits[field.direction as usize] += field.bits();
		self.fields.push(field).map_err(|_| ParseError::TooManyFields(self.id))
	}
}

/// Every report declared by a report map, keyed by report id (0 when the map uses no ids).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportMap {
	reports: Vec<ReportLayout, MAX_REPORTS>,
}

impl ReportMap {
	pub fn report(&self, id: u8) -> Option<&ReportLayout> {
		self.reports.iter().find(|r| r.id == id)
	}

	pub fn reports(&self) -> &[ReportLayout] {
		&self.reports
	}

	fn report_mut(&mut self, id: u8) -> Result<&mut ReportLayout, ParseError> {
		let index = match self.reports.iter().position(|r| r.id == id) {
			Some(index) => index,
			None => {
				self.reports
					.push(ReportLayout::new(id))
					.map_err(|_| ParseError::TooManyReports)?;
				self.reports.len() - 1
			},
		};
		Ok(&mut self.reports[index])
	}
}

#[derive(Debug, Clone, Copy, Default)]
struct Globals {
	usage_page: u16,
	logical_min: i32,
	logical_max: i32,
	report_size: u32,
	report_count: u32,
	report_id: u8,
}

fn unsigned(data: &[u8]) -> u32 {
	data.iter().rev().fold(0, |acc, &b| (acc << 8) | b as u32)
}

fn signed(data: &[u8]) -> i32 {
	let raw = unsigned(data);
	match data.len() {
		1 => raw as u8 as i8 as i32,
		2 => raw as u16 as i16 as i32,
		_ => raw as i32,
	}
}

/// Walks a report map and lays out every main item into its report.
pub fn parse(bytes: &[u8]) -> Result<ReportMap, ParseError> {
	let mut map = ReportMap::default();
	let mut globals = Globals::default();
	let mut stack: Vec<Globals, MAX_STACK> = Vec::new();
	let mut depth = 0usize;
	let mut offset = 0usize;

	while offset < bytes.len() {
		let prefix = bytes[offset];

		if prefix == LONG_ITEM_PREFIX {
			let size = *bytes.get(offset + 1).ok_or(ParseError::Truncated(offset))? as usize;
			offset += 3 + size;
			if offset > bytes.len() {
				return Err(ParseError::Truncated(offset));
			}
			continue;
		}

		let len = data_len(prefix);
		let data = bytes
			.get(offset + 1..offset + 1 + len)
			.ok_or(ParseError::Truncated(offset))?;
		let tag = ItemTag::from_prefix(prefix).ok_or(ParseError::UnknownItem { offset, prefix })?;

		match tag {
			ItemTag::UsagePage => globals.usage_page = unsigned(data) as u16,
			ItemTag::LogicalMinimum => globals.logical_min = signed(data),
			ItemTag::LogicalMaximum => globals.logical_max = signed(data),
			ItemTag::ReportSize => globals.report_size = unsigned(data),
			ItemTag::ReportCount => globals.report_count = unsigned(data),
			ItemTag::ReportId => {
				let id = unsigned(data);
				if id == 0 || id > u8::MAX as u32 {
					return Err(ParseError::ReservedReportId(offset));
				}
				globals.report_id = id as u8;
			},
			ItemTag::Push => stack.push(globals).map_err(|_| ParseError::StackOverflow)?,
			ItemTag::Pop => globals = stack.pop().ok_or(ParseError::StackUnderflow)?,
			ItemTag::Collection => depth += 1,
			ItemTag::EndCollection => {
				depth = depth.checked_sub(1).ok_or(ParseError::UnbalancedCollections)?;
			},
			ItemTag::Input | ItemTag::Output | ItemTag::Feature => {
				let direction = match tag {
					ItemTag::Input => Direction::Input,
					ItemTag::Output => Direction::Output,
					_ => Direction::Feature,
				};
				if globals.report_size > 32 {
					return Err(ParseError::FieldTooWide {
						offset,
						bits: globals.report_size,
					});
				}

				let count = u16::try_from(globals.report_count).map_err(|_| ParseError::CountTooLarge {
					offset,
					count: globals.report_count,
				})?;

				let report = map.report_mut(globals.report_id)?;
				let field = Field {
					direction,
					bit_offset: report.bits(direction),
					size: globals.report_size as u8,
					count,
					logical_min: globals.logical_min,
					logical_max: globals.logical_max,
					usage_page: globals.usage_page,
					flags: MainFlags(unsigned(data) as u8),
				};
				report.push(field)?;
			},
			// Local items and the remaining globals do not affect the layout
			_ => {},
		}

		offset += 1 + len;
	}

	if depth != 0 {
		return Err(ParseError::UnbalancedCollections);
	}

	Ok(map)
}
