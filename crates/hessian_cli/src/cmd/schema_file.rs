use std::path::Path;

use hessian::codec::{Registry, Shape};
use tracing::debug;

use crate::cmd::util::read_file;
use crate::error::{CliError, Result};

/// JSON schema document declaring registered compound types.
#[derive(Debug, serde::Deserialize)]
pub struct SchemaFile {
	/// Declared types in registration order.
	pub types: Vec<TypeEntry>,
}

/// One compound type declaration.
#[derive(Debug, serde::Deserialize)]
pub struct TypeEntry {
	/// Wire type name.
	pub name: String,
	/// Ordered field list.
	#[serde(default)]
	pub fields: Vec<FieldEntry>,
}

/// One field declaration.
#[derive(Debug, serde::Deserialize)]
pub struct FieldEntry {
	/// Wire field name.
	pub name: String,
	/// Type expression such as `*i32` or `map<string,any>`.
	#[serde(rename = "type")]
	pub ty: String,
}

impl SchemaFile {
	/// Read and parse a schema file.
	pub fn load(path: &Path) -> Result<Self> {
		let raw = read_file(path)?;
		serde_json::from_slice(&raw).map_err(|err| CliError::json(path, err))
	}

	/// Register every declared type into `registry`.
	pub fn register_into(&self, registry: &Registry) -> Result<()> {
		for entry in &self.types {
			let mut builder = Shape::builder();
			for field in &entry.fields {
				builder = builder.field_expr(&field.name, &field.ty)?;
			}
			registry.register(&entry.name, builder.build())?;
		}
		debug!(types = self.types.len(), "schema registered");
		Ok(())
	}
}

/// Load `path` into a fresh registry.
pub fn load_registry(path: &Path) -> Result<Registry> {
	let registry = Registry::new();
	SchemaFile::load(path)?.register_into(&registry)?;
	Ok(registry)
}
