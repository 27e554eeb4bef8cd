use std::sync::Arc;

use super::{Encoder, encode};
use crate::codec::{ErrorKind, Kind, ListNode, MapNode, NodeId, ObjectGraph, ObjectNode, Registry, Shape, TypeDesc, Value};

fn scalar(value: Value) -> Vec<u8> {
	let mut graph = ObjectGraph::new();
	graph.set_root(value);
	encode(&Registry::new(), &graph).expect("scalar encodes")
}

fn link_registry() -> (Registry, Arc<Shape>) {
	let registry = Registry::new();
	let shape = registry
		.register(
			"Link",
			Shape::builder()
				.field("name", TypeDesc::new(Kind::String))
				.field("next", TypeDesc::object("Link"))
				.build(),
		)
		.expect("link registers");
	(registry, shape)
}

fn link(graph: &mut ObjectGraph, shape: &Arc<Shape>, name: &str) -> NodeId {
	let mut object = ObjectNode::new(shape.clone());
	object.set_field("name", Value::from(name));
	graph.push_object(object)
}

fn link_class() -> Vec<u8> {
	let mut out = vec![b'C', 0x04];
	out.extend_from_slice(b"Link");
	out.extend_from_slice(&[0x92, 0x04]);
	out.extend_from_slice(b"name");
	out.push(0x04);
	out.extend_from_slice(b"next");
	out
}

#[test]
fn ints_pick_the_smallest_form() {
	let cases: &[(i64, &[u8])] = &[
		(0, &[0x90]),
		(-16, &[0x80]),
		(47, &[0xbf]),
		(48, &[0xc8, 0x30]),
		(-17, &[0xc7, 0xef]),
		(2047, &[0xcf, 0xff]),
		(-2048, &[0xc0, 0x00]),
		(2048, &[0xd4, 0x08, 0x00]),
		(262_143, &[0xd7, 0xff, 0xff]),
		(-262_144, &[0xd0, 0x00, 0x00]),
		(262_144, &[b'I', 0x00, 0x04, 0x00, 0x00]),
		(1 << 31, &[b'L', 0x00, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00]),
	];

	for (value, expected) in cases {
		assert_eq!(scalar(Value::I64(*value)), *expected, "{value}");
	}
}

#[test]
fn unsigned_values_use_long_forms() {
	assert_eq!(scalar(Value::U64(5)), [0xe5]);
	assert_eq!(scalar(Value::U64(100)), [0xf8, 0x64]);
	assert_eq!(scalar(Value::U64(300_000)), [b'Y', 0x00, 0x04, 0x93, 0xe0]);
	assert_eq!(scalar(Value::U64(u64::MAX)), [0xdf]);
}

#[test]
fn doubles_pick_the_smallest_form() {
	assert_eq!(scalar(Value::F64(0.0)), [0x5b]);
	assert_eq!(scalar(Value::F64(1.0)), [0x5c]);
	assert_eq!(scalar(Value::F64(-1.0)), [0x5d, 0xff]);
	assert_eq!(scalar(Value::F64(127.0)), [0x5d, 0x7f]);
	assert_eq!(scalar(Value::F64(128.0)), [0x5e, 0x00, 0x80]);
	assert_eq!(scalar(Value::F64(0.5)), [0x5f, 0x00, 0x00, 0x01, 0xf4]);
	assert_eq!(scalar(Value::F32(1.5)), [0x5f, 0x00, 0x00, 0x05, 0xdc]);
	assert_eq!(scalar(Value::F64(-0.0)), [b'D', 0x80, 0, 0, 0, 0, 0, 0, 0]);
	assert_eq!(scalar(Value::F64(std::f64::consts::PI)), [b'D', 0x40, 0x09, 0x21, 0xfb, 0x54, 0x44, 0x2d, 0x18]);
}

#[test]
fn dates_prefer_whole_minutes() {
	assert_eq!(scalar(Value::Date(120_000)), [0x4b, 0x00, 0x00, 0x00, 0x02]);
	assert_eq!(scalar(Value::Date(1000)), [0x4a, 0, 0, 0, 0, 0, 0, 0x03, 0xe8]);
}

#[test]
fn string_lengths_at_form_boundaries() {
	let text = |len: usize| "a".repeat(len);

	assert_eq!(scalar(Value::from("")), [0x00]);
	assert_eq!(scalar(Value::from(text(31).as_str()))[0], 0x1f);
	assert_eq!(scalar(Value::from(text(32).as_str()))[..2], [0x30, 0x20]);
	assert_eq!(scalar(Value::from(text(1023).as_str()))[..2], [0x33, 0xff]);
	assert_eq!(scalar(Value::from(text(1024).as_str()))[..3], [b'S', 0x04, 0x00]);
	assert_eq!(scalar(Value::from("\u{1f600}")), [0x02, 0xf0, 0x9f, 0x98, 0x80]);

	let long = scalar(Value::from(text(0x8001).as_str()));
	assert_eq!(long[..3], [b'R', 0x80, 0x00]);
	assert_eq!(long[3 + 0x8000..], [0x01, b'a']);
}

#[test]
fn surrogate_pairs_stay_in_one_chunk() {
	let mut text = "a".repeat(0x7fff);
	text.push('\u{1f600}');
	let out = scalar(Value::from(text.as_str()));

	assert_eq!(out[..3], [b'R', 0x7f, 0xff]);
	assert_eq!(out[3 + 0x7fff..], [0x02, 0xf0, 0x9f, 0x98, 0x80]);
}

#[test]
fn binary_lengths_at_form_boundaries() {
	assert_eq!(scalar(Value::Bytes(Vec::new())), [0x20]);
	assert_eq!(scalar(Value::Bytes(vec![7; 15]))[0], 0x2f);
	assert_eq!(scalar(Value::Bytes(vec![7; 16]))[..2], [0x34, 0x10]);
	assert_eq!(scalar(Value::Bytes(vec![7; 1024]))[..3], [b'B', 0x04, 0x00]);

	let long = scalar(Value::Bytes(vec![7; 0x8001]));
	assert_eq!(long[..3], [b'A', 0x80, 0x00]);
	assert_eq!(long[3 + 0x8000..], [0x21, 7]);
}

#[test]
fn class_definition_is_emitted_once() {
	let (registry, shape) = link_registry();
	let mut graph = ObjectGraph::new();
	let a = link(&mut graph, &shape, "a");
	let b = link(&mut graph, &shape, "b");
	let list = graph.push_list(ListNode {
		type_name: None,
		items: vec![Value::Node(a), Value::Node(b)],
	});
	graph.set_root(Value::Node(list));

	let mut expected = vec![0x7a];
	expected.extend(link_class());
	expected.extend_from_slice(&[0x60, 0x01, b'a', b'N', 0x60, 0x01, b'b', b'N']);
	assert_eq!(encode(&registry, &graph).expect("encodes"), expected);
}

#[test]
fn repeated_nodes_become_back_references() {
	let (registry, shape) = link_registry();
	let mut graph = ObjectGraph::new();
	let looped = link(&mut graph, &shape, "a");
	graph.object_mut(looped).expect("object").set_field("next", Value::Node(looped));
	graph.set_root(Value::Node(looped));

	let mut expected = link_class();
	expected.extend_from_slice(&[0x60, 0x01, b'a', b'Q', 0x90]);
	assert_eq!(encode(&registry, &graph).expect("cycle encodes"), expected);

	let mut graph = ObjectGraph::new();
	let shared = link(&mut graph, &shape, "x");
	let list = graph.push_list(ListNode {
		type_name: None,
		items: vec![Value::Node(shared), Value::Node(shared).wrap(1)],
	});
	graph.set_root(Value::Node(list));

	let mut expected = vec![0x7a];
	expected.extend(link_class());
	expected.extend_from_slice(&[0x60, 0x01, b'x', b'N', b'Q', 0x91]);
	assert_eq!(encode(&registry, &graph).expect("shared encodes"), expected);
}

#[test]
fn typed_collections_reuse_type_names() {
	let mut graph = ObjectGraph::new();
	let first = graph.push_list(ListNode {
		type_name: Some("[int".into()),
		items: vec![Value::I64(0)],
	});
	let second = graph.push_list(ListNode {
		type_name: Some("[int".into()),
		items: vec![Value::I64(1)],
	});
	let map = graph.push_map(MapNode {
		type_name: Some("[int".into()),
		entries: vec![(Value::Node(first), Value::Node(second))],
	});
	graph.set_root(Value::Node(map));

	let out = encode(&Registry::new(), &graph).expect("encodes");
	assert_eq!(out, [b'M', 0x04, b'[', b'i', b'n', b't', 0x71, 0x90, 0x90, 0x71, 0x90, 0x91, b'Z']);
}

#[test]
fn long_lists_use_length_prefixed_forms() {
	let mut graph = ObjectGraph::new();
	let untyped = graph.push_list(ListNode {
		type_name: None,
		items: vec![Value::Null; 8],
	});
	graph.set_root(Value::Node(untyped));
	let out = encode(&Registry::new(), &graph).expect("encodes");
	assert_eq!(out[..2], [b'X', 0x98]);

	let mut graph = ObjectGraph::new();
	let typed = graph.push_list(ListNode {
		type_name: Some("t".into()),
		items: vec![Value::Null; 8],
	});
	graph.set_root(Value::Node(typed));
	let out = encode(&Registry::new(), &graph).expect("encodes");
	assert_eq!(out[..4], [b'V', 0x01, b't', 0x98]);
}

#[test]
fn class_index_past_short_range_uses_long_form() {
	let registry = Registry::new();
	let mut graph = ObjectGraph::new();
	let mut items = Vec::new();
	for idx in 0..17 {
		let shape = registry
			.register(&format!("T{idx}"), Shape::builder().field("v", TypeDesc::new(Kind::I32)).build())
			.expect("type registers");
		let mut object = ObjectNode::new(shape);
		object.set_field("v", Value::I64(0));
		items.push(Value::Node(graph.push_object(object)));
	}
	let list = graph.push_list(ListNode { type_name: None, items });
	graph.set_root(Value::Node(list));

	let out = encode(&registry, &graph).expect("encodes");
	assert!(out.ends_with(&[b'O', 0xa0, 0x90]), "{:02x?}", &out[out.len() - 8..]);
}

#[test]
fn encoder_shares_tables_across_values() {
	let (registry, shape) = link_registry();
	let mut graph = ObjectGraph::new();
	let node = link(&mut graph, &shape, "a");

	let mut encoder = Encoder::new(&registry);
	encoder.write(&graph, &Value::Node(node)).expect("first write");
	let first_len = encoder.bytes().len();
	encoder.write(&graph, &Value::Node(node)).expect("second write");

	let out = encoder.finish();
	assert_eq!(out[first_len..], [b'Q', 0x90]);
}

#[test]
fn unregistered_shapes_and_dangling_nodes_fail() {
	let mut graph = ObjectGraph::new();
	let stray = Arc::new(Shape::builder().field("x", TypeDesc::new(Kind::Bool)).build());
	let id = graph.push_object(ObjectNode::new(stray));
	graph.set_root(Value::Node(id));
	let err = encode(&Registry::new(), &graph).expect_err("shape is unknown");
	assert_eq!(err.kind(), ErrorKind::UnknownType);

	let mut graph = ObjectGraph::new();
	graph.set_root(Value::Node(NodeId(7)));
	let err = encode(&Registry::new(), &graph).expect_err("node is missing");
	assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
