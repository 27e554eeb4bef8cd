use std::sync::Arc;

use super::{ObjectGraph, Slot};
use crate::codec::{ErrorKind, ListNode, MapNode, NodeId, ObjectNode, Shape, TypeDesc, Value};

fn node_shape() -> Arc<Shape> {
	Arc::new(Shape::builder().field("next", TypeDesc::object("Node")).field("label", TypeDesc::any()).build())
}

#[test]
fn writes_land_in_the_addressed_slot() {
	let mut graph = ObjectGraph::new();
	let list = graph.push_list(ListNode {
		type_name: None,
		items: vec![Value::Null, Value::Null],
	});
	let map = graph.push_map(MapNode {
		type_name: None,
		entries: vec![(Value::Null, Value::Null)],
	});

	graph.write(Slot::Element { node: list, index: 1 }, Value::I64(7)).expect("element write");
	graph.write(Slot::Key { node: map, index: 0 }, "k".into()).expect("key write");
	graph.write(Slot::Entry { node: map, index: 0 }, Value::Bool(true)).expect("entry write");
	graph.write(Slot::Root, Value::Node(list)).expect("root write");

	assert_eq!(graph.list(list).expect("list").items, vec![Value::Null, Value::I64(7)]);
	assert_eq!(graph.map(map).expect("map").get_str("k"), Some(&Value::Bool(true)));
	assert_eq!(graph.root(), &Value::Node(list));
	assert_eq!(graph.read(Slot::Element { node: list, index: 1 }).expect("read back"), &Value::I64(7));
}

#[test]
fn mismatched_slots_are_rejected() {
	let mut graph = ObjectGraph::new();
	let list = graph.push_list(ListNode::default());

	let err = graph.write(Slot::Field { node: list, index: 0 }, Value::Null).expect_err("list has no fields");
	assert_eq!(err.kind(), ErrorKind::InvalidInput);

	let err = graph.write(Slot::Element { node: NodeId(9), index: 0 }, Value::Null).expect_err("dangling node");
	assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn equivalence_follows_cycles_and_sharing() {
	let shape = node_shape();
	let build = |labels: [&str; 2]| {
		let mut graph = ObjectGraph::new();
		let a = graph.push_object(ObjectNode::new(shape.clone()));
		let b = graph.push_object(ObjectNode::new(shape.clone()));
		for (id, other, label) in [(a, b, labels[0]), (b, a, labels[1])] {
			let object = graph.object_mut(id).expect("object");
			object.set_field("next", Value::Node(other));
			object.set_field("label", label.into());
		}
		graph.set_root(Value::Node(a));
		graph
	};

	assert!(build(["a", "b"]).equivalent(&build(["a", "b"])));
	assert!(!build(["a", "b"]).equivalent(&build(["a", "c"])));

	let mut self_loop = ObjectGraph::new();
	let a = self_loop.push_object(ObjectNode::new(shape.clone()));
	let object = self_loop.object_mut(a).expect("object");
	object.set_field("next", Value::Node(a));
	object.set_field("label", "a".into());
	self_loop.set_root(Value::Node(a));
	assert!(!build(["a", "a"]).equivalent(&self_loop), "two-node cycle is not a self loop");
}
