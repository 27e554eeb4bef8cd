use std::time::{Duration, Instant};

use hessian::codec::{DecodeOptions, Decoder, GraphPool, Kind, MapNode, ObjectGraph, ObjectNode, Registry, Shape, TypeDesc, Value, encode};
use tracing::{debug, info};

use crate::cmd::util::{emit_json, hex};
use crate::error::{CliError, Result};

/// Wire name of the SayHello request.
pub const REQUEST_TYPE: &str = "org.apache.dubbo.DubboRequest";
/// Wire name of the SayHello response.
pub const RESPONSE_TYPE: &str = "org.apache.dubbo.DubboResponse";

#[derive(clap::Args)]
pub struct Args {
	/// Simulated processing time the provider sleeps for, e.g. `5s` or `250ms`.
	#[arg(long, default_value = "5s")]
	pub cost: String,
	/// Number of request/response exchanges to run.
	#[arg(long, default_value_t = 1)]
	pub count: u32,
	/// Skip the provider's sleep.
	#[arg(long)]
	pub no_sleep: bool,
	#[arg(long)]
	pub json: bool,
}

/// Run SayHello exchanges between an in-process client and provider.
pub fn run(args: Args) -> Result<()> {
	let Args {
		cost,
		count,
		no_sleep,
		json,
	} = args;

	let registry = Registry::global();
	register_types(registry)?;

	let provider = Provider {
		registry,
		pool: GraphPool::default(),
		sleep: !no_sleep,
	};

	let mut exchanges = Vec::with_capacity(count as usize);
	for _ in 0..count {
		let request = build_request(registry, &cost)?;
		let response = provider.say_hello(&request)?;
		let message = read_response(registry, &response)?;
		info!("client response result: {message}");

		exchanges.push(ExchangeJson {
			message,
			request_bytes: request.len(),
			response_bytes: response.len(),
			request_hex: hex(&request),
		});
	}

	if json {
		let stats = provider.pool.stats();
		emit_json(&HelloJson {
			cost,
			exchanges,
			pool_hits: stats.hits,
			pool_misses: stats.misses,
		});
		return Ok(());
	}

	for exchange in &exchanges {
		println!("client response result: {}", exchange.message);
	}
	Ok(())
}

/// Register the request and response types, tolerating repeat registration.
pub fn register_types(registry: &Registry) -> Result<()> {
	registry.register(REQUEST_TYPE, Shape::builder().field_expr("Request", "map<string,any>")?.build())?;
	registry.register(RESPONSE_TYPE, Shape::builder().field("Reponse", TypeDesc::new(Kind::Bytes)).build())?;
	Ok(())
}

/// Encode `DubboRequest { Request: {"cost": cost} }`.
pub fn build_request(registry: &Registry, cost: &str) -> Result<Vec<u8>> {
	let mut graph = ObjectGraph::new();
	let request = graph.push_map(MapNode {
		type_name: None,
		entries: vec![(Value::from("cost"), Value::from(cost))],
	});

	let mut object = ObjectNode::new(registry.resolve(REQUEST_TYPE)?);
	object.set_field("Request", Value::Node(request));
	let root = graph.push_object(object);
	graph.set_root(Value::Node(root));
	Ok(encode(registry, &graph)?)
}

/// Decode a response and return its message text.
pub fn read_response(registry: &Registry, bytes: &[u8]) -> Result<String> {
	let mut graph = ObjectGraph::new();
	let mut decoder = Decoder::new(registry, bytes, DecodeOptions::strict(), &mut graph);
	let root = decoder.read(&TypeDesc::object(RESPONSE_TYPE))?;
	decoder.finish()?;

	let payload = root
		.as_node()
		.and_then(|id| graph.object(id))
		.and_then(|object| object.field("Reponse"))
		.and_then(Value::as_bytes)
		.unwrap_or_default();
	Ok(String::from_utf8_lossy(payload).into_owned())
}

/// Provider side of the exchange; request graphs are recycled through a pool.
struct Provider<'a> {
	registry: &'a Registry,
	pool: GraphPool,
	sleep: bool,
}

impl Provider<'_> {
	fn say_hello(&self, request: &[u8]) -> Result<Vec<u8>> {
		let started = Instant::now();

		let mut graph = self.pool.acquire(REQUEST_TYPE);
		let cost = self.read_cost(request, &mut graph);
		self.pool.release(REQUEST_TYPE, graph);
		let cost = humantime::parse_duration(&cost?)?;

		if self.sleep {
			std::thread::sleep(cost);
		}
		let response = self.respond(cost)?;

		info!("SayHello cost: {}ms", started.elapsed().as_millis());
		Ok(response)
	}

	fn read_cost(&self, request: &[u8], graph: &mut ObjectGraph) -> Result<String> {
		let mut decoder = Decoder::new(self.registry, request, DecodeOptions::strict(), graph);
		let root = decoder.read(&TypeDesc::object(REQUEST_TYPE))?;
		let consumed = decoder.finish()?;
		debug!(consumed, "request decoded");

		let cost = root
			.as_node()
			.and_then(|id| graph.object(id))
			.and_then(|object| object.field("Request"))
			.and_then(Value::as_node)
			.and_then(|id| graph.map(id))
			.and_then(|map| map.get_str("cost"))
			.and_then(Value::as_str)
			.unwrap_or_default();
		Ok(cost.to_owned())
	}

	fn respond(&self, cost: Duration) -> Result<Vec<u8>> {
		let message = format!("Hello, this request cost {}", humantime::format_duration(cost));

		let mut graph = ObjectGraph::new();
		let mut object = ObjectNode::new(self.registry.resolve(RESPONSE_TYPE)?);
		if !object.set_field("Reponse", Value::Bytes(message.into_bytes())) {
			return Err(CliError::Input(format!("{RESPONSE_TYPE} has no Reponse field")));
		}
		let root = graph.push_object(object);
		graph.set_root(Value::Node(root));
		Ok(encode(self.registry, &graph)?)
	}
}

#[derive(serde::Serialize)]
struct HelloJson {
	cost: String,
	exchanges: Vec<ExchangeJson>,
	pool_hits: u64,
	pool_misses: u64,
}

#[derive(serde::Serialize)]
struct ExchangeJson {
	message: String,
	request_bytes: usize,
	response_bytes: usize,
	request_hex: String,
}

#[cfg(test)]
mod tests {
	use hessian::codec::Registry;
	use hessian_testkit::read_fixture;

	use super::{build_request, read_response, register_types};
	use crate::cmd::test_support::{run_hessian_err, run_hessian_json};
	use crate::cmd::util::hex;

	#[test]
	fn request_bytes_match_the_captured_fixture() {
		let registry = Registry::new();
		register_types(&registry).expect("types register");
		register_types(&registry).expect("registration is idempotent");

		let request = build_request(&registry, "5s").expect("request encodes");
		assert_eq!(request, read_fixture("say_hello_request.hessian"));
	}

	#[test]
	fn hello_round_trip_reports_the_cost() {
		let json = run_hessian_json(&["hello", "--cost", "5s", "--no-sleep", "--count", "3", "--json"]);

		assert_eq!(json["cost"], "5s");
		let exchanges = json["exchanges"].as_array().expect("exchanges");
		assert_eq!(exchanges.len(), 3);
		for exchange in exchanges {
			assert_eq!(exchange["message"], "Hello, this request cost 5s");
			assert_eq!(exchange["request_bytes"], 51);
			assert_eq!(exchange["request_hex"], hex(&read_fixture("say_hello_request.hessian")));
		}
		assert_eq!(json["pool_misses"], 1);
		assert_eq!(json["pool_hits"], 2);
	}

	#[test]
	fn hello_sleeps_for_short_costs() {
		let json = run_hessian_json(&["hello", "--cost", "20ms", "--json"]);
		assert_eq!(json["exchanges"][0]["message"], "Hello, this request cost 20ms");
	}

	#[test]
	fn hello_rejects_unparseable_costs() {
		let stderr = run_hessian_err(&["hello", "--cost", "soon", "--no-sleep"]);
		assert!(stderr.contains("invalid duration"), "{stderr}");
	}

	#[test]
	fn empty_response_reads_as_empty_message() {
		let registry = Registry::new();
		register_types(&registry).expect("types register");
		let bytes = [b'C', 0x1e]
			.into_iter()
			.chain(*b"org.apache.dubbo.DubboResponse")
			.chain([0x91, 0x07])
			.chain(*b"Reponse")
			.chain([0x60, b'N'])
			.collect::<Vec<_>>();
		assert_eq!(read_response(&registry, &bytes).expect("response decodes"), "");
	}
}
