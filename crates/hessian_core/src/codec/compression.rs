use std::io::Read;

use crate::codec::{CodecError, Result};

const MAX_DECOMPRESSED_BYTES: usize = 64 * 1024 * 1024;
/// zstd frame magic.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Compression mode detected for a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
	/// Raw Hessian bytes.
	None,
	/// zstd-compressed Hessian bytes.
	Zstd,
}

impl Compression {
	/// Render compression mode as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Zstd => "zstd",
		}
	}
}

/// Detect and decode compression, returning `(mode, payload_bytes)`.
///
/// Anything that does not start with the zstd frame magic is returned untouched.
pub fn decode_payload_bytes(raw: Vec<u8>) -> Result<(Compression, Vec<u8>)> {
	decode_payload_bytes_with_limit(raw, MAX_DECOMPRESSED_BYTES)
}

/// Like [`decode_payload_bytes`] with an explicit ceiling on decompressed size.
pub fn decode_payload_bytes_with_limit(raw: Vec<u8>, limit: usize) -> Result<(Compression, Vec<u8>)> {
	if !raw.starts_with(&ZSTD_MAGIC) {
		return Ok((Compression::None, raw));
	}

	let out = decode_zstd(&raw, limit)?;
	debug!(compressed = raw.len(), decompressed = out.len(), "zstd payload");
	Ok((Compression::Zstd, out))
}

fn decode_zstd(raw: &[u8], limit: usize) -> Result<Vec<u8>> {
	let mut decoder = zstd::stream::read::Decoder::new(raw)?;
	let mut out = Vec::new();
	let mut buf = [0_u8; 8192];

	loop {
		let read = decoder.read(&mut buf)?;
		if read == 0 {
			break;
		}

		if out.len() + read > limit {
			return Err(CodecError::DecompressedTooLarge { limit });
		}

		out.extend_from_slice(&buf[..read]);
	}

	Ok(out)
}
