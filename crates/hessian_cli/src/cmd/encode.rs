use std::path::PathBuf;

use hessian::codec::{ObjectGraph, TypeDesc, coerce, encode};

use crate::cmd::json::JsonReader;
use crate::cmd::schema_file::load_registry;
use crate::cmd::util::{emit_json, hex, read_file};
use crate::error::{CliError, Result};

#[derive(clap::Args)]
pub struct Args {
	pub input: PathBuf,
	#[arg(long)]
	pub schema: PathBuf,
	/// Destination type expression, usually a registered type name.
	#[arg(long = "type")]
	pub type_expr: String,
	#[arg(long)]
	pub out: Option<PathBuf>,
	#[arg(long)]
	pub json: bool,
}

/// Build a value of a registered type from JSON and encode it.
pub fn run(args: Args) -> Result<()> {
	let Args {
		input,
		schema,
		type_expr,
		out,
		json,
	} = args;

	let registry = load_registry(&schema)?;
	let ty = TypeDesc::parse(&type_expr)?;

	let raw = read_file(&input)?;
	let document: serde_json::Value = serde_json::from_slice(&raw).map_err(|err| CliError::json(&input, err))?;

	let mut graph = ObjectGraph::new();
	let value = JsonReader::new(&mut graph).read(&document)?;
	let value = coerce(&registry, &mut graph, value, &ty)?;
	graph.set_root(value);
	let bytes = encode(&registry, &graph)?;

	if let Some(out) = &out {
		std::fs::write(out, &bytes).map_err(|err| CliError::io(out, err))?;
	}

	if json {
		emit_json(&EncodeJson {
			input: input.display().to_string(),
			type_expr: ty.to_string(),
			bytes: bytes.len(),
			out: out.as_ref().map(|out| out.display().to_string()),
			hex: hex(&bytes),
		});
		return Ok(());
	}

	match &out {
		Some(out) => println!("wrote {} bytes to {}", bytes.len(), out.display()),
		None => println!("{}", hex(&bytes)),
	}
	Ok(())
}

#[derive(serde::Serialize)]
struct EncodeJson {
	input: String,
	#[serde(rename = "type")]
	type_expr: String,
	bytes: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	out: Option<String>,
	hex: String,
}

#[cfg(test)]
mod tests {
	use hessian_testkit::target_dir;

	use crate::cmd::test_support::{fixture_arg as path, run_hessian, run_hessian_err, run_hessian_json};

	#[test]
	fn encoded_person_decodes_back_to_the_same_fields() {
		let out = target_dir().join("hessian-cli-tests").join("person.hessian");
		std::fs::create_dir_all(out.parent().expect("parent dir")).expect("output dir");
		let out = out.to_str().expect("utf-8 path").to_owned();

		let encoded = run_hessian_json(&[
			"encode",
			&path("person.json"),
			"--schema",
			&path("people_schema.json"),
			"--type",
			"demo.Person",
			"--out",
			&out,
			"--json",
		]);
		assert_eq!(encoded["type"], "demo.Person");
		assert!(encoded["hex"].as_str().expect("hex").starts_with("430b"));

		let decoded = run_hessian_json(&["decode", &out, "--schema", &path("people_schema.json"), "--json"]);
		let person = &decoded["value"];
		assert_eq!(person["$type"], "demo.Person");
		assert_eq!(person["name"], "carol");
		assert_eq!(person["age"], 41);
		assert_eq!(person["tags"], serde_json::json!(["ops", "oncall"]));
		assert!(person["friend"].is_null());
	}

	#[test]
	fn encode_prints_hex_without_out_file() {
		let output = run_hessian(&["encode", &path("person.json"), "--schema", &path("people_schema.json"), "--type", "demo.Person"]);
		assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
		let stdout = String::from_utf8_lossy(&output.stdout);
		assert!(stdout.trim().starts_with("430b64656d6f2e506572736f6e"), "{stdout}");
	}

	#[test]
	fn encode_rejects_fields_outside_the_shape() {
		let input = target_dir().join("hessian-cli-tests").join("stray_field.json");
		std::fs::create_dir_all(input.parent().expect("parent dir")).expect("input dir");
		std::fs::write(&input, br#"{"name":"dave","nickname":"d"}"#).expect("input written");

		let input = input.display().to_string();
		let stderr = run_hessian_err(&["encode", &input, "--schema", &path("people_schema.json"), "--type", "demo.Person"]);
		assert!(stderr.contains("shape mismatch for demo.Person"), "{stderr}");
	}
}
