use std::path::Path;

use crate::error::{CliError, Result};

/// Print a serializable payload as pretty JSON on stdout.
pub fn emit_json<T: serde::Serialize>(payload: &T) {
	match serde_json::to_string_pretty(payload) {
		Ok(text) => println!("{text}"),
		Err(err) => eprintln!("error: failed to serialize output: {err}"),
	}
}

/// Lowercase hex rendering without separators.
pub fn hex(bytes: &[u8]) -> String {
	::hex::encode(bytes)
}

/// Parse lowercase or uppercase hex, ignoring ASCII whitespace.
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
	let digits: String = text.chars().filter(|ch| !ch.is_ascii_whitespace()).collect();
	::hex::decode(&digits).map_err(|err| CliError::Input(format!("invalid hex: {err}")))
}

/// Read a whole file, attaching the path to failures.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
	std::fs::read(path).map_err(|err| CliError::io(path, err))
}
