use std::collections::HashMap;

use crate::codec::{CodecError, ListNode, MapNode, Node, NodeId, ObjectNode, Result, Value};

/// Writable location inside a graph being populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
	/// The graph root.
	Root,
	/// Field `index` of an object node.
	Field {
		/// Target object.
		node: NodeId,
		/// Field position within the object's shape.
		index: usize,
	},
	/// Element `index` of a list node.
	Element {
		/// Target list.
		node: NodeId,
		/// Element position.
		index: usize,
	},
	/// Key of entry `index` of a map node.
	Key {
		/// Target map.
		node: NodeId,
		/// Entry position.
		index: usize,
	},
	/// Value of entry `index` of a map node.
	Entry {
		/// Target map.
		node: NodeId,
		/// Entry position.
		index: usize,
	},
}

impl Slot {
	fn label(self) -> &'static str {
		match self {
			Slot::Root => "root",
			Slot::Field { .. } => "field",
			Slot::Element { .. } => "element",
			Slot::Key { .. } => "key",
			Slot::Entry { .. } => "entry",
		}
	}
}

/// Arena of list, map, and object nodes plus a root value.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectGraph {
	nodes: Vec<Node>,
	root: Value,
}

impl Default for ObjectGraph {
	fn default() -> Self {
		Self::new()
	}
}

impl ObjectGraph {
	/// Create an empty graph with a null root.
	pub fn new() -> Self {
		Self {
			nodes: Vec::new(),
			root: Value::Null,
		}
	}

	/// Append a node and return its handle.
	pub fn push(&mut self, node: Node) -> NodeId {
		let id = NodeId(self.nodes.len() as u32);
		self.nodes.push(node);
		id
	}

	/// Append a list node.
	pub fn push_list(&mut self, list: ListNode) -> NodeId {
		self.push(Node::List(list))
	}

	/// Append a map node.
	pub fn push_map(&mut self, map: MapNode) -> NodeId {
		self.push(Node::Map(map))
	}

	/// Append an object node.
	pub fn push_object(&mut self, object: ObjectNode) -> NodeId {
		self.push(Node::Object(object))
	}

	/// Look up a node.
	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(id.index())
	}

	/// Look up a node mutably.
	pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
		self.nodes.get_mut(id.index())
	}

	/// Look up a node, failing on dangling handles.
	pub fn try_node(&self, id: NodeId) -> Result<&Node> {
		self.node(id).ok_or(CodecError::MissingNode { node: id.0 })
	}

	/// Look up a list node.
	pub fn list(&self, id: NodeId) -> Option<&ListNode> {
		match self.node(id)? {
			Node::List(list) => Some(list),
			_ => None,
		}
	}

	/// Look up a map node.
	pub fn map(&self, id: NodeId) -> Option<&MapNode> {
		match self.node(id)? {
			Node::Map(map) => Some(map),
			_ => None,
		}
	}

	/// Look up an object node.
	pub fn object(&self, id: NodeId) -> Option<&ObjectNode> {
		match self.node(id)? {
			Node::Object(object) => Some(object),
			_ => None,
		}
	}

	/// Look up an object node mutably.
	pub fn object_mut(&mut self, id: NodeId) -> Option<&mut ObjectNode> {
		match self.node_mut(id)? {
			Node::Object(object) => Some(object),
			_ => None,
		}
	}

	/// Return the root value.
	pub fn root(&self) -> &Value {
		&self.root
	}

	/// Replace the root value.
	pub fn set_root(&mut self, value: Value) {
		self.root = value;
	}

	/// Return the number of nodes.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Return whether the graph has no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Drop every node and reset the root, keeping allocated capacity.
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.root = Value::Null;
	}

	/// Iterate nodes in arena order.
	pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
		self.nodes.iter().enumerate().map(|(idx, node)| (NodeId(idx as u32), node))
	}

	/// Read the value currently stored at `slot`.
	pub fn read(&self, slot: Slot) -> Result<&Value> {
		let Some((node, index)) = slot_target(slot) else {
			return Ok(&self.root);
		};
		let target = self.try_node(node)?;
		let value = match (slot, target) {
			(Slot::Field { .. }, Node::Object(object)) => object.fields.get(index),
			(Slot::Element { .. }, Node::List(list)) => list.items.get(index),
			(Slot::Key { .. }, Node::Map(map)) => map.entries.get(index).map(|(key, _)| key),
			(Slot::Entry { .. }, Node::Map(map)) => map.entries.get(index).map(|(_, value)| value),
			_ => None,
		};
		value.ok_or(CodecError::InvalidSlot {
			slot: slot.label(),
			node: target.kind_name(),
		})
	}

	/// Store `value` at `slot`.
	pub fn write(&mut self, slot: Slot, value: Value) -> Result<()> {
		let Some((node, index)) = slot_target(slot) else {
			self.root = value;
			return Ok(());
		};
		let target = self.nodes.get_mut(node.index()).ok_or(CodecError::MissingNode { node: node.0 })?;
		let kind = target.kind_name();
		let place = match (slot, target) {
			(Slot::Field { .. }, Node::Object(object)) => object.fields.get_mut(index),
			(Slot::Element { .. }, Node::List(list)) => list.items.get_mut(index),
			(Slot::Key { .. }, Node::Map(map)) => map.entries.get_mut(index).map(|(key, _)| key),
			(Slot::Entry { .. }, Node::Map(map)) => map.entries.get_mut(index).map(|(_, value)| value),
			_ => None,
		};
		let place = place.ok_or(CodecError::InvalidSlot { slot: slot.label(), node: kind })?;
		*place = value;
		Ok(())
	}

	/// Compare two graphs structurally, matching nodes by position in the walk from each root.
	///
	/// Shared and cyclic nodes must be shared in the same places on both sides.
	pub fn equivalent(&self, other: &ObjectGraph) -> bool {
		let mut matcher = Matcher::default();
		matcher.values(self, &self.root, other, &other.root)
	}
}

fn slot_target(slot: Slot) -> Option<(NodeId, usize)> {
	match slot {
		Slot::Root => None,
		Slot::Field { node, index } | Slot::Element { node, index } | Slot::Key { node, index } | Slot::Entry { node, index } => Some((node, index)),
	}
}

#[derive(Default)]
struct Matcher {
	forward: HashMap<NodeId, NodeId>,
	backward: HashMap<NodeId, NodeId>,
}

impl Matcher {
	fn values(&mut self, left_graph: &ObjectGraph, left: &Value, right_graph: &ObjectGraph, right: &Value) -> bool {
		match (left, right) {
			(Value::Ptr(left), Value::Ptr(right)) => self.values(left_graph, left, right_graph, right),
			(Value::Node(left), Value::Node(right)) => self.nodes(left_graph, *left, right_graph, *right),
			_ => left == right,
		}
	}

	fn nodes(&mut self, left_graph: &ObjectGraph, left: NodeId, right_graph: &ObjectGraph, right: NodeId) -> bool {
		match (self.forward.get(&left), self.backward.get(&right)) {
			(Some(mapped), _) => return *mapped == right,
			(None, Some(_)) => return false,
			(None, None) => {}
		}
		self.forward.insert(left, right);
		self.backward.insert(right, left);

		let (Some(left_node), Some(right_node)) = (left_graph.node(left), right_graph.node(right)) else {
			return false;
		};

		match (left_node, right_node) {
			(Node::List(a), Node::List(b)) => {
				a.type_name == b.type_name
					&& a.items.len() == b.items.len()
					&& a.items.iter().zip(&b.items).all(|(x, y)| self.values(left_graph, x, right_graph, y))
			}
			(Node::Map(a), Node::Map(b)) => {
				a.type_name == b.type_name
					&& a.entries.len() == b.entries.len()
					&& a.entries.iter().zip(&b.entries).all(|((ka, va), (kb, vb))| {
						self.values(left_graph, ka, right_graph, kb) && self.values(left_graph, va, right_graph, vb)
					})
			}
			(Node::Object(a), Node::Object(b)) => {
				a.shape == b.shape
					&& a.fields.len() == b.fields.len()
					&& a.fields.iter().zip(&b.fields).all(|(x, y)| self.values(left_graph, x, right_graph, y))
			}
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests;
