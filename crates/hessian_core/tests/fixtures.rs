#![allow(missing_docs)]

use hessian::codec::{Compression, DecodeOptions, Kind, Registry, Shape, TypeDesc, Value, decode, decode_as, decode_payload_bytes, encode};
use hessian_testkit::read_fixture;

fn people() -> Registry {
	let registry = Registry::new();
	registry
		.register(
			"demo.Person",
			Shape::builder()
				.field("name", TypeDesc::new(Kind::String))
				.field("age", TypeDesc::new(Kind::I32))
				.field_expr("tags", "list<string>")
				.expect("tags parses")
				.field("friend", TypeDesc::object("demo.Person").ptr())
				.build(),
		)
		.expect("person registers");
	registry
}

#[test]
fn person_cycle_fixture_links_friends_both_ways() {
	let registry = people();
	let bytes = read_fixture("person_cycle.hessian");
	let graph = decode(&registry, &bytes).expect("fixture decodes");

	let alice = graph.root().as_node().expect("root node");
	let alice_obj = graph.object(alice).expect("alice");
	assert_eq!(alice_obj.field("name").and_then(Value::as_str), Some("alice"));
	assert_eq!(alice_obj.field("age"), Some(&Value::I64(30)));

	let friend = alice_obj.field("friend").expect("friend field");
	assert_eq!(friend.depth(), 1);
	let bob = friend.as_node().expect("bob");
	let back = graph.object(bob).and_then(|obj| obj.field("friend")).expect("bob's friend");
	assert_eq!(back, &Value::Node(alice).wrap(1));

	assert_eq!(encode(&registry, &graph).expect("re-encodes"), bytes);
}

#[test]
fn unknown_type_in_fixture_is_reported() {
	let err = decode(&Registry::new(), &read_fixture("person_cycle.hessian")).expect_err("no types registered");
	assert_eq!(err.kind(), hessian::codec::ErrorKind::UnknownType);
}

#[test]
fn truncated_fixture_is_malformed() {
	let bytes = read_fixture("person_cycle.hessian");
	for cut in [1, 12, bytes.len() / 2, bytes.len() - 1] {
		let err = decode(&people(), &bytes[..cut]).expect_err("truncated input fails");
		assert_eq!(err.kind(), hessian::codec::ErrorKind::MalformedStream, "cut at {cut}");
	}
}

#[test]
fn compressed_and_raw_request_fixtures_agree() {
	let registry = Registry::new();
	registry
		.register(
			"org.apache.dubbo.DubboRequest",
			Shape::builder().field_expr("Request", "map<string,any>").expect("parses").build(),
		)
		.expect("request registers");

	let (mode, raw) = decode_payload_bytes(read_fixture("say_hello_request.hessian")).expect("raw payload");
	assert_eq!(mode, Compression::None);
	let (mode, inflated) = decode_payload_bytes(read_fixture("say_hello_request.hessian.zst")).expect("zstd payload");
	assert_eq!(mode, Compression::Zstd);
	assert_eq!(raw, inflated);

	let ty = TypeDesc::object("org.apache.dubbo.DubboRequest");
	let graph = decode_as(&registry, &inflated, &ty, &DecodeOptions::strict()).expect("decodes");
	let root = graph.root().as_node().expect("root");
	let request = graph.object(root).and_then(|obj| obj.field("Request")).and_then(Value::as_node).expect("request map");
	assert_eq!(graph.map(request).and_then(|map| map.get_str("cost")).and_then(Value::as_str), Some("5s"));
}
