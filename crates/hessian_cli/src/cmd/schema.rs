use std::path::PathBuf;

use hessian::codec::Registry;

use crate::cmd::schema_file::SchemaFile;
use crate::cmd::util::emit_json;
use crate::error::Result;

#[derive(clap::Args)]
pub struct Args {
	pub file: PathBuf,
	#[arg(long = "type")]
	pub type_name: Option<String>,
	#[arg(long)]
	pub json: bool,
}

/// Load a schema file, register it, and list its types or one type's fields.
pub fn run(args: Args) -> Result<()> {
	let Args { file: path, type_name, json } = args;

	let schema = SchemaFile::load(&path)?;
	let registry = Registry::new();
	schema.register_into(&registry)?;

	let mut names: Vec<_> = registry.names().into_iter().map(|name| name.to_string()).collect();
	if let Some(wanted) = &type_name {
		names.retain(|name| name == wanted);
		if names.is_empty() {
			// Surface the registry's own lookup failure.
			registry.resolve(wanted)?;
		}
	}

	let mut types = Vec::with_capacity(names.len());
	for name in names {
		let shape = registry.resolve(&name)?;
		types.push(TypeJson {
			name,
			fields: shape
				.fields()
				.iter()
				.map(|field| FieldJson {
					name: field.name.to_string(),
					ty: field.ty.to_string(),
				})
				.collect(),
		});
	}

	if json {
		emit_json(&SchemaJson {
			path: path.display().to_string(),
			types,
		});
		return Ok(());
	}

	println!("path: {}", path.display());
	println!("types: {}", types.len());
	if type_name.is_none() {
		println!();
		println!("name\tfields");
		for item in &types {
			println!("{}\t{}", item.name, item.fields.len());
		}
		return Ok(());
	}

	for item in &types {
		println!();
		println!("{}", item.name);
		for field in &item.fields {
			println!("  {}: {}", field.name, field.ty);
		}
	}
	Ok(())
}

#[derive(serde::Serialize)]
struct SchemaJson {
	path: String,
	types: Vec<TypeJson>,
}

#[derive(serde::Serialize)]
struct TypeJson {
	name: String,
	fields: Vec<FieldJson>,
}

#[derive(serde::Serialize)]
struct FieldJson {
	name: String,
	#[serde(rename = "type")]
	ty: String,
}

#[cfg(test)]
mod tests {
	use crate::cmd::test_support::{fixture_arg, run_hessian_err, run_hessian_json};

	#[test]
	fn schema_json_lists_types_with_normalized_fields() {
		let json = run_hessian_json(&["schema", &fixture_arg("people_schema.json"), "--json"]);

		let types = json["types"].as_array().expect("types array");
		assert_eq!(types.len(), 1);
		assert_eq!(types[0]["name"], "demo.Person");
		let fields: Vec<_> = types[0]["fields"]
			.as_array()
			.expect("fields array")
			.iter()
			.map(|field| format!("{}:{}", field["name"].as_str().unwrap_or(""), field["type"].as_str().unwrap_or("")))
			.collect();
		assert_eq!(fields, ["name:string", "age:i32", "tags:list<string>", "friend:*demo.Person"]);
	}

	#[test]
	fn schema_type_filter_rejects_unknown_names() {
		let stderr = run_hessian_err(&["schema", &fixture_arg("dubbo_schema.json"), "--type", "missing.Type"]);
		assert!(stderr.contains("unknown type: missing.Type"), "{stderr}");
	}
}
