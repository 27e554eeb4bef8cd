use std::sync::Arc;

use crate::codec::Shape;

/// Arena index of a list, map, or object inside an [`ObjectGraph`](crate::codec::ObjectGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
	/// Return the arena position.
	pub fn index(self) -> usize {
		self.0 as usize
	}
}

/// Decoded runtime value.
///
/// Containers are held by [`NodeId`], so two equal `Node` values are the same object.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// Absent or zero state.
	Null,
	/// Boolean scalar.
	Bool(bool),
	/// Signed integer scalar.
	I64(i64),
	/// Unsigned integer scalar.
	U64(u64),
	/// 32-bit float scalar.
	F32(f32),
	/// 64-bit float scalar.
	F64(f64),
	/// UTF-8 string.
	String(Box<str>),
	/// Opaque byte payload.
	Bytes(Vec<u8>),
	/// Milliseconds since the Unix epoch.
	Date(i64),
	/// One level of indirection.
	Ptr(Box<Value>),
	/// Handle to a list, map, or object node.
	Node(NodeId),
}

impl Value {
	/// Wrap a value in `depth` levels of indirection.
	pub fn wrap(mut self, depth: u8) -> Value {
		for _ in 0..depth {
			self = Value::Ptr(Box::new(self));
		}
		self
	}

	/// Return the number of indirection levels.
	pub fn depth(&self) -> u8 {
		let mut depth = 0_u8;
		let mut current = self;
		while let Value::Ptr(inner) = current {
			depth = depth.saturating_add(1);
			current = inner;
		}
		depth
	}

	/// Follow every indirection level.
	pub fn deref_all(&self) -> &Value {
		let mut current = self;
		while let Value::Ptr(inner) = current {
			current = inner;
		}
		current
	}

	/// Strip every indirection level, consuming the value.
	pub fn into_base(self) -> Value {
		let mut current = self;
		while let Value::Ptr(inner) = current {
			current = *inner;
		}
		current
	}

	/// Return the node handle behind any indirection.
	pub fn as_node(&self) -> Option<NodeId> {
		match self.deref_all() {
			Value::Node(id) => Some(*id),
			_ => None,
		}
	}

	/// Return the string behind any indirection.
	pub fn as_str(&self) -> Option<&str> {
		match self.deref_all() {
			Value::String(text) => Some(text),
			_ => None,
		}
	}

	/// Return the byte payload behind any indirection.
	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self.deref_all() {
			Value::Bytes(bytes) => Some(bytes),
			_ => None,
		}
	}

	/// Return an integer view behind any indirection.
	pub fn as_i64(&self) -> Option<i64> {
		match self.deref_all() {
			Value::I64(v) => Some(*v),
			Value::U64(v) => Some(*v as i64),
			_ => None,
		}
	}

	/// Return whether this is the absent state.
	pub fn is_null(&self) -> bool {
		matches!(self.deref_all(), Value::Null)
	}

	/// Stable lowercase label of the base kind.
	pub fn kind_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::I64(_) => "i64",
			Value::U64(_) => "u64",
			Value::F32(_) => "f32",
			Value::F64(_) => "f64",
			Value::String(_) => "string",
			Value::Bytes(_) => "bytes",
			Value::Date(_) => "date",
			Value::Ptr(_) => "ptr",
			Value::Node(_) => "node",
		}
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::String(value.into())
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::I64(value)
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<NodeId> for Value {
	fn from(value: NodeId) -> Self {
		Value::Node(value)
	}
}

/// Sequence node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListNode {
	/// Wire type name for typed lists.
	pub type_name: Option<Box<str>>,
	/// Elements in order.
	pub items: Vec<Value>,
}

/// Mapping node; entry order is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapNode {
	/// Wire type name for typed maps.
	pub type_name: Option<Box<str>>,
	/// Key/value pairs in order.
	pub entries: Vec<(Value, Value)>,
}

impl MapNode {
	/// Look up a value by string key.
	pub fn get_str(&self, key: &str) -> Option<&Value> {
		self.entries.iter().find(|(candidate, _)| candidate.as_str() == Some(key)).map(|(_, value)| value)
	}
}

/// Compound node with fields positional to its registered shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectNode {
	/// Registered shape of this instance.
	pub shape: Arc<Shape>,
	/// Field values, one per shape field.
	pub fields: Vec<Value>,
}

impl ObjectNode {
	/// Create an instance with every field in the absent state.
	pub fn new(shape: Arc<Shape>) -> Self {
		let fields = vec![Value::Null; shape.len()];
		Self { shape, fields }
	}

	/// Return a field value by name.
	pub fn field(&self, name: &str) -> Option<&Value> {
		self.shape.field_index(name).and_then(|idx| self.fields.get(idx))
	}

	/// Replace a field value by name, returning `false` when the field does not exist.
	pub fn set_field(&mut self, name: &str, value: Value) -> bool {
		let Some(slot) = self.shape.field_index(name).and_then(|idx| self.fields.get_mut(idx)) else {
			return false;
		};
		*slot = value;
		true
	}
}

/// Arena entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
	/// Sequence.
	List(ListNode),
	/// Mapping.
	Map(MapNode),
	/// Registered compound.
	Object(ObjectNode),
}

impl Node {
	/// Stable lowercase label of the node kind.
	pub fn kind_name(&self) -> &'static str {
		match self {
			Node::List(_) => "list",
			Node::Map(_) => "map",
			Node::Object(_) => "object",
		}
	}
}
