use crate::codec::{CodecError, Result};

/// Simple bounded cursor over an immutable byte slice.
pub struct Cursor<'a> {
	bytes: &'a [u8],
	pos: usize,
}

impl<'a> Cursor<'a> {
	/// Create a cursor at position 0.
	pub fn new(bytes: &'a [u8]) -> Self {
		Self { bytes, pos: 0 }
	}

	/// Return current byte offset.
	pub fn pos(&self) -> usize {
		self.pos
	}

	/// Return remaining unread bytes.
	pub fn remaining(&self) -> usize {
		self.bytes.len().saturating_sub(self.pos)
	}

	/// Return the next byte without consuming it.
	pub fn peek_u8(&self) -> Result<u8> {
		self.bytes.get(self.pos).copied().ok_or(CodecError::UnexpectedEof {
			at: self.pos,
			need: 1,
			rem: 0,
		})
	}

	/// Read exactly `n` bytes and advance cursor.
	pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
		if n > self.remaining() {
			return Err(CodecError::UnexpectedEof {
				at: self.pos,
				need: n,
				rem: self.remaining(),
			});
		}

		let start = self.pos;
		self.pos += n;
		Ok(&self.bytes[start..self.pos])
	}

	/// Read one byte.
	pub fn read_u8(&mut self) -> Result<u8> {
		Ok(self.read_exact(1)?[0])
	}

	/// Read a big-endian `u16`.
	pub fn read_u16_be(&mut self) -> Result<u16> {
		Ok(u16::from_be_bytes(self.read_array()?))
	}

	/// Read a big-endian `i16`.
	pub fn read_i16_be(&mut self) -> Result<i16> {
		Ok(i16::from_be_bytes(self.read_array()?))
	}

	/// Read a big-endian `i32`.
	pub fn read_i32_be(&mut self) -> Result<i32> {
		Ok(i32::from_be_bytes(self.read_array()?))
	}

	/// Read a big-endian `i64`.
	pub fn read_i64_be(&mut self) -> Result<i64> {
		Ok(i64::from_be_bytes(self.read_array()?))
	}

	/// Read a big-endian IEEE-754 `f64`.
	pub fn read_f64_be(&mut self) -> Result<f64> {
		Ok(f64::from_bits(u64::from_be_bytes(self.read_array()?)))
	}

	fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		let raw = self.read_exact(N)?;
		let mut out = [0_u8; N];
		out.copy_from_slice(raw);
		Ok(out)
	}
}

#[cfg(test)]
mod tests {
	use super::Cursor;
	use crate::codec::{CodecError, ErrorKind};

	#[test]
	fn reads_big_endian_scalars() {
		let bytes = [0x01, 0x02, 0xff, 0xfe, 0x00, 0x00, 0x00, 0x2a];
		let mut cursor = Cursor::new(&bytes);
		assert_eq!(cursor.read_u16_be().expect("u16"), 0x0102);
		assert_eq!(cursor.read_i16_be().expect("i16"), -2);
		assert_eq!(cursor.read_i32_be().expect("i32"), 42);
		assert_eq!(cursor.remaining(), 0);
	}

	#[test]
	fn short_read_reports_offset() {
		let bytes = [0x00, 0x01];
		let mut cursor = Cursor::new(&bytes);
		cursor.read_u8().expect("first byte");
		let err = cursor.read_i32_be().expect_err("should be truncated");
		assert!(matches!(err, CodecError::UnexpectedEof { at: 1, need: 4, rem: 1 }));
		assert_eq!(err.kind(), ErrorKind::MalformedStream);
	}
}
