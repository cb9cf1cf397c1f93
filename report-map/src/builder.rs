use heapless::Vec;
use thiserror::Error;

use crate::items::{size_code, CollectionKind, ItemData, ItemTag, MainFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BuildError {
	#[error("report map does not fit in {0} bytes")]
	Overflow(usize),
	#[error("{0} collection(s) left open")]
	UnbalancedCollections(usize),
	#[error("end collection without a matching collection")]
	UnexpectedEndCollection,
}

/// Assembles a report map into a fixed capacity buffer.
///
/// Calls chain; the first failure is remembered and returned from [`build`](Self::build)
/// so a half written map never escapes.
pub struct ReportMapBuilder<const N: usize> {
	bytes: Vec<u8, N>,
	depth: usize,
	error: Option<BuildError>,
}

impl<const N: usize> Default for ReportMapBuilder<N> {
	fn default() -> Self {
		Self::new()
	}
}

impl<const N: usize> ReportMapBuilder<N> {
	pub fn new() -> Self {
		Self {
			bytes: Vec::new(),
			depth: 0,
			error: None,
		}
	}

	pub fn item(&mut self, tag: ItemTag, data: ItemData) -> &mut Self {
		if self.error.is_some() {
			return self;
		}

		let (payload, len) = data.to_bytes();
		if self.bytes.push(tag as u8 | size_code(len)).is_err()
			|| self.bytes.extend_from_slice(&payload[..len]).is_err()
		{
			self.error = Some(BuildError::Overflow(N));
		}

		self
	}

	pub fn usage_page(&mut self, page: u16) -> &mut Self {
		self.item(ItemTag::UsagePage, ItemData::Unsigned(page as u32))
	}

	pub fn usage(&mut self, usage: u16) -> &mut Self {
		self.item(ItemTag::Usage, ItemData::Unsigned(usage as u32))
	}

	pub fn usage_minimum(&mut self, usage: u16) -> &mut Self {
		self.item(ItemTag::UsageMinimum, ItemData::Unsigned(usage as u32))
	}

	pub fn usage_maximum(&mut self, usage: u16) -> &mut Self {
		self.item(ItemTag::UsageMaximum, ItemData::Unsigned(usage as u32))
	}

	pub fn collection(&mut self, kind: CollectionKind) -> &mut Self {
		self.depth += 1;
		self.item(ItemTag::Collection, ItemData::Unsigned(kind as u32))
	}

	pub fn end_collection(&mut self) -> &mut Self {
		if self.depth == 0 {
			self.error.get_or_insert(BuildError::UnexpectedEndCollection);
			return self;
		}
		self.depth -= 1;
		self.item(ItemTag::EndCollection, ItemData::None)
	}

	pub fn report_id(&mut self, id: u8) -> &mut Self {
		self.item(ItemTag::ReportId, ItemData::Unsigned(id as u32))
	}

	pub fn report_size(&mut self, bits: u8) -> &mut Self {
		self.item(ItemTag::ReportSize, ItemData::Unsigned(bits as u32))
	}

	pub fn report_count(&mut self, count: u8) -> &mut Self {
		self.item(ItemTag::ReportCount, ItemData::Unsigned(count as u32))
	}

	pub fn logical_minimum(&mut self, value: i32) -> &mut Self {
		self.item(ItemTag::LogicalMinimum, ItemData::Signed(value))
	}

	pub fn logical_maximum(&mut self, value: i32) -> &mut Self {
		self.item(ItemTag::LogicalMaximum, ItemData::Signed(value))
	}

	pub fn physical_minimum(&mut self, value: i32) -> &mut Self {
		self.item(ItemTag::PhysicalMinimum, ItemData::Signed(value))
	}

	pub fn physical_maximum(&mut self, value: i32) -> &mut Self {
		self.item(ItemTag::PhysicalMaximum, ItemData::Signed(value))
	}

	pub fn unit(&mut self, unit: u32) -> &mut Self {
		self.item(ItemTag::Unit, ItemData::Unsigned(unit))
	}

	pub fn unit_exponent(&mut self, exponent: i8) -> &mut Self {
		self.item(ItemTag::UnitExponent, ItemData::Signed(exponent as i32))
	}

	pub fn push(&mut self) -> &mut Self {
		self.item(ItemTag::Push, ItemData::None)
	}

	pub fn pop(&mut self) -> &mut Self {
		self.item(ItemTag::Pop, ItemData::None)
	}

	pub fn input(&mut self, flags: MainFlags) -> &mut Self {
		self.item(ItemTag::Input, ItemData::Unsigned(flags.0 as u32))
	}

	pub fn output(&mut self, flags: MainFlags) -> &mut Self {
		self.item(ItemTag::Output, ItemData::Unsigned(flags.0 as u32))
	}

	pub fn feature(&mut self, flags: MainFlags) -> &mut Self {
		self.item(ItemTag::Feature, ItemData::Unsigned(flags.0 as u32))
	}

	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	pub fn build(&self) -> Result<Vec<u8, N>, BuildError> {
		if let Some(error) = self.error {
			return Err(error);
		}
		if self.depth != 0 {
			return Err(BuildError::UnbalancedCollections(self.depth));
		}
		Ok(self.bytes.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::constants::{desktop, page};

	#[test]
	fn encodes_pointer_axes_like_a_hand_written_map() {
		let mut builder = ReportMapBuilder::<64>::new();
		builder
			.usage_page(page::GENERIC_DESKTOP)
			.usage(desktop::MOUSE)
			.collection(CollectionKind::Application)
			.report_id(2)
			.logical_minimum(-127)
			.logical_maximum(127)
			.report_size(8)
			.report_count(3)
			.input(MainFlags::DATA_VAR_REL)
			.end_collection();

		let bytes = builder.build().unwrap();
		assert_eq!(
			bytes.as_slice(),
			&[
				0x05, 0x01, 0x09, 0x02, 0xa1, 0x01, 0x85, 0x02, 0x15, 0x81, 0x25, 0x7f, 0x75, 0x08, 0x95, 0x03, 0x81,
				0x06, 0xc0,
			]
		);
	}

	#[test]
	fn wide_values_take_more_bytes() {
		let mut builder = ReportMapBuilder::<16>::new();
		builder.logical_maximum(1023).physical_maximum(315);
		assert_eq!(builder.build().unwrap().as_slice(), &[0x26, 0xff, 0x03, 0x46, 0x3b, 0x01]);
	}

	#[test]
	fn overflow_is_sticky() {
		let mut builder = ReportMapBuilder::<4>::new();
		builder.usage_page(1).usage(2).usage(3);
		assert_eq!(builder.build(), Err(BuildError::Overflow(4)));
	}

	#[test]
	fn collections_must_balance() {
		let mut builder = ReportMapBuilder::<16>::new();
		builder.collection(CollectionKind::Application);
		assert_eq!(builder.build(), Err(BuildError::UnbalancedCollections(1)));

		let mut builder = ReportMapBuilder::<16>::new();
		builder.end_collection();
		assert_eq!(builder.build(), Err(BuildError::UnexpectedEndCollection));
	}
}
