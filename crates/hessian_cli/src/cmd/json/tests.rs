use hessian::codec::{Kind, ListNode, MapNode, ObjectGraph, Registry, Shape, TypeDesc, Value, coerce, decode, encode};
use serde_json::json;

use super::{JsonReader, graph_to_json};

fn person_registry() -> Registry {
	let registry = Registry::new();
	registry
		.register(
			"demo.Person",
			Shape::builder()
				.field("name", TypeDesc::new(Kind::String))
				.field("friend", TypeDesc::object("demo.Person").ptr())
				.build(),
		)
		.expect("person registers");
	registry
}

#[test]
fn shared_lists_carry_ids_and_refs() {
	let registry = Registry::new();
	let mut graph = ObjectGraph::new();
	let shared = graph.push_list(ListNode {
		type_name: None,
		items: vec![Value::I64(1)],
	});
	let outer = graph.push_list(ListNode {
		type_name: None,
		items: vec![Value::Node(shared), Value::Node(shared)],
	});

	let value = graph_to_json(&registry, &graph, &Value::Node(outer));
	assert_eq!(value, json!([{ "$id": 0, "$items": [1] }, { "$ref": 0 }]));
}

#[test]
fn scalars_and_non_string_keys_use_tagged_forms() {
	let registry = Registry::new();
	let mut graph = ObjectGraph::new();
	let map = graph.push_map(MapNode {
		type_name: Some("java.util.HashMap".into()),
		entries: vec![(Value::I64(7), Value::Bytes(vec![0xca, 0xfe])), (Value::Bool(true), Value::Date(60_000))],
	});

	let value = graph_to_json(&registry, &graph, &Value::Node(map));
	assert_eq!(
		value,
		json!({
			"$type": "java.util.HashMap",
			"$entries": [[7, { "$bytes": "cafe" }], [true, { "$date": 60_000 }]],
		})
	);
}

#[test]
fn cyclic_json_rebuilds_an_identical_graph() {
	let registry = person_registry();
	let document = json!({
		"$id": 3,
		"$type": "demo.Person",
		"name": "ann",
		"friend": { "$type": "demo.Person", "name": "ben", "friend": { "$ref": 3 } },
	});

	let mut graph = ObjectGraph::new();
	let value = JsonReader::new(&mut graph).read(&document).expect("json reads");
	let value = coerce(&registry, &mut graph, value, &TypeDesc::object("demo.Person")).expect("coerces");
	graph.set_root(value);

	let bytes = encode(&registry, &graph).expect("encodes");
	let decoded = decode(&registry, &bytes).expect("decodes");
	assert!(graph.equivalent(&decoded));

	let round_trip = graph_to_json(&registry, &decoded, decoded.root());
	assert_eq!(round_trip["$id"], 0);
	assert_eq!(round_trip["friend"]["friend"], json!({ "$ref": 0 }));
	assert_eq!(round_trip["friend"]["name"], "ben");
}

#[test]
fn dangling_and_duplicate_ids_are_rejected() {
	let mut graph = ObjectGraph::new();
	assert!(JsonReader::new(&mut graph).read(&json!([{ "$ref": 9 }])).is_err());

	let mut graph = ObjectGraph::new();
	assert!(JsonReader::new(&mut graph).read(&json!([{ "$id": 1 }, { "$id": 1 }])).is_err());

	let mut graph = ObjectGraph::new();
	assert!(JsonReader::new(&mut graph).read(&json!({ "$bytes": "abc" })).is_err());
}

#[test]
fn tagged_scalars_read_back() {
	let mut graph = ObjectGraph::new();
	let value = JsonReader::new(&mut graph)
		.read(&json!([{ "$bytes": "00ff" }, { "$date": 120_000 }, 2.5, 18_446_744_073_709_551_615_u64]))
		.expect("json reads");
	let list = graph.list(value.as_node().expect("list")).expect("list node");
	assert_eq!(
		list.items,
		[Value::Bytes(vec![0x00, 0xff]), Value::Date(120_000), Value::F64(2.5), Value::U64(u64::MAX)]
	);
}
