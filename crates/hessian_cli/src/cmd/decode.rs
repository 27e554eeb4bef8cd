use std::path::PathBuf;

use hessian::codec::{DecodeOptions, Decoder, ObjectGraph, Registry, TypeDesc, decode_payload_bytes};

use crate::cmd::json::graph_to_json;
use crate::cmd::print::{PrintOptions, render_value};
use crate::cmd::schema_file::load_registry;
use crate::cmd::util::{emit_json, parse_hex, read_file};
use crate::error::Result;

#[derive(clap::Args)]
pub struct Args {
	pub file: PathBuf,
	#[arg(long)]
	pub schema: Option<PathBuf>,
	/// Destination type expression for the root value.
	#[arg(long = "type", default_value = "any")]
	pub type_expr: String,
	#[arg(long)]
	pub max_depth: Option<u32>,
	#[arg(long)]
	pub strict: bool,
	/// Treat the file as hex text instead of raw bytes.
	#[arg(long)]
	pub hex: bool,
	#[arg(long)]
	pub json: bool,
}

/// Decode a raw, hex or zstd-compressed payload file and print its value graph.
pub fn run(args: Args) -> Result<()> {
	let Args {
		file: path,
		schema,
		type_expr,
		max_depth,
		strict,
		hex,
		json,
	} = args;

	let registry = match &schema {
		Some(schema) => load_registry(schema)?,
		None => Registry::new(),
	};
	let ty = TypeDesc::parse(&type_expr)?;

	let mut options = if strict { DecodeOptions::strict() } else { DecodeOptions::default() };
	if let Some(max_depth) = max_depth {
		options.max_depth = max_depth;
	}

	let mut raw = read_file(&path)?;
	if hex {
		raw = parse_hex(&String::from_utf8_lossy(&raw))?;
	}
	let (compression, payload) = decode_payload_bytes(raw)?;

	let mut graph = ObjectGraph::new();
	let mut decoder = Decoder::new(&registry, &payload, options, &mut graph);
	let root = decoder.read(&ty)?;
	let consumed = decoder.finish()?;

	if json {
		emit_json(&DecodeJson {
			path: path.display().to_string(),
			compression: compression.as_str().to_owned(),
			bytes: payload.len(),
			consumed,
			nodes: graph.len(),
			value: graph_to_json(&registry, &graph, &root),
		});
		return Ok(());
	}

	println!("path: {}", path.display());
	println!("compression: {}", compression.as_str());
	println!("bytes: {}", payload.len());
	println!("consumed: {consumed}");
	println!("nodes: {}", graph.len());
	println!();
	print!("{}", render_value(&registry, &graph, &root, PrintOptions::default()));
	Ok(())
}

#[derive(serde::Serialize)]
struct DecodeJson {
	path: String,
	compression: String,
	bytes: usize,
	consumed: usize,
	nodes: usize,
	value: serde_json::Value,
}
