use std::path::PathBuf;

use hessian::codec::CodecError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

/// Failures surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Codec(#[from] CodecError),
	#[error("{path}: {source}")]
	Io { path: PathBuf, source: std::io::Error },
	#[error("{path}: invalid json: {source}")]
	Json { path: PathBuf, source: serde_json::Error },
	#[error("invalid duration: {0}")]
	Duration(#[from] humantime::DurationError),
	#[error("{0}")]
	Input(String),
}

impl CliError {
	pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Self::Io { path: path.into(), source }
	}

	pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
		Self::Json { path: path.into(), source }
	}
}
