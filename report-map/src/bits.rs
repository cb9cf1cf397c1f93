use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitError {
	#[error("bit field runs past the end of the buffer at bit {0}")]
	OutOfBounds(usize),
	#[error("bit fields are limited to 32 bits, got {0}")]
	TooWide(u8),
}

/// Writes values into a report buffer least significant bit first, each field
/// starting right where the previous one ended.
pub struct BitWriter<'a> {
	buf: &'a mut [u8],
	pos: usize,
}

impl<'a> BitWriter<'a> {
	pub fn new(buf: &'a mut [u8]) -> Self {
		Self { buf, pos: 0 }
	}

	/// Current offset in bits.
	pub fn position(&self) -> usize {
		self.pos
	}

	/// Stores the low `bits` of `value`. Higher bits are ignored, callers range check first.
	pub fn write(&mut self, value: u32, bits: u8) -> Result<(), BitError> {
		if bits > 32 {
			return Err(BitError::TooWide(bits));
		}
		if self.pos + bits as usize > self.buf.len() * 8 {
			return Err(BitError::OutOfBounds(self.pos));
		}

		for i in 0..bits as usize {
			let bit = (value >> i) & 1;
			let byte = &mut self.buf[(self.pos + i) / 8];
			let shift = (self.pos + i) % 8;
			*byte = (*byte & !(1 << shift)) | ((bit as u8) << shift);
		}
		self.pos += bits as usize;

		Ok(())
	}
}

pub struct BitReader<'a> {
	buf: &'a [u8],
	pos: usize,
}

impl<'a> BitReader<'a> {
	pub fn new(buf: &'a [u8]) -> Self {
		Self { buf, pos: 0 }
	}

	pub fn position(&self) -> usize {
		self.pos
	}

	pub fn read(&mut self, bits: u8) -> Result<u32, BitError> {
		if bits > 32 {
			return Err(BitError::TooWide(bits));
		}
		if self.pos + bits as usize > self.buf.len() * 8 {
			return Err(BitError::OutOfBounds(self.pos));
		}

		let mut value = 0u32;
		for i in 0..bits as usize {
			let byte = self.buf[(self.pos + i) / 8];
			let bit = (byte >> ((self.pos + i) % 8)) & 1;
			value |= (bit as u32) << i;
		}
		self.pos += bits as usize;

		Ok(value)
	}

	/// Reads a two's complement field and sign extends it.
	pub fn read_signed(&mut self, bits: u8) -> Result<i32, BitError> {
		let raw = self.read(bits)?;
		if bits == 0 || bits >= 32 {
			return Ok(raw as i32);
		}
		let shift = 32 - bits as u32;
		Ok(((raw << shift) as i32) >> shift)
	}
}
