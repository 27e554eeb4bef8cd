use std::collections::HashSet;
use std::sync::Arc;

use crate::codec::holder::{Pending, RefHolder, Relocation};
use crate::codec::{CodecError, Kind, Node, NodeId, ObjectGraph, ObjectNode, Registry, Result, Shape, Slot, TypeDesc, Value};

/// Outcome of reading one wire value: either concrete, or a handle to a node still being built.
#[derive(Debug, Clone)]
pub(crate) enum Decoded {
	Value(Value),
	Pending(NodeId),
}

/// Convert `value` into something assignable to a destination of type `ty`.
///
/// Containers are converted in place so node identity survives. Numeric conversions never fail
/// on overflow; they truncate or wrap the way Rust `as` casts do.
pub fn coerce(registry: &Registry, graph: &mut ObjectGraph, value: Value, ty: &TypeDesc) -> Result<Value> {
	Coercer::new(registry, graph).value(value, ty)
}

/// Write a decoded value into `slot`, deferring when it is a placeholder.
pub(crate) fn assign(registry: &Registry, graph: &mut ObjectGraph, holders: &mut [RefHolder], slot: Slot, ty: &TypeDesc, decoded: Decoded) -> Result<()> {
	let value = match decoded {
		Decoded::Value(value) => value,
		Decoded::Pending(node) => {
			let holder = holders.get_mut(node.index()).ok_or(CodecError::UnresolvedReference { node: node.0 })?;
			match holder.defer(slot, ty) {
				Some(value) => value,
				None => {
					trace!(node = node.0, ?slot, "deferred assignment");
					return Ok(());
				}
			}
		}
	};

	let moves = place(registry, graph, slot, ty, value)?;
	relocate(holders, &mut [], &moves);
	Ok(())
}

/// Mark `node` complete and fill every destination that was waiting on it, in FIFO order.
pub(crate) fn resolve(registry: &Registry, graph: &mut ObjectGraph, holders: &mut [RefHolder], node: NodeId) -> Result<()> {
	let holder = holders.get_mut(node.index()).ok_or(CodecError::UnresolvedReference { node: node.0 })?;
	let mut pending = holder.resolve(Value::Node(node));
	if !pending.is_empty() {
		trace!(node = node.0, count = pending.len(), "resolving deferred assignments");
	}

	for next in 0..pending.len() {
		let Pending { slot, ty } = pending[next].clone();
		let moves = place(registry, graph, slot, &ty, Value::Node(node))?;
		relocate(holders, &mut pending[next + 1..], &moves);
	}
	Ok(())
}

/// Coerce `value` and write it, following `slot` if the coercion rebuilt its node.
fn place(registry: &Registry, graph: &mut ObjectGraph, slot: Slot, ty: &TypeDesc, value: Value) -> Result<Vec<Relocation>> {
	let mut coercer = Coercer::new(registry, graph);
	let value = coercer.value(value, ty)?;
	let mut moves = coercer.moves;

	let moved = moves.iter().find(|moved| moved.from == slot).map(|moved| (moved.to, moved.ty.clone()));
	let (slot, value) = match moved {
		Some((to, ty)) => {
			let mut coercer = Coercer::new(registry, graph);
			let value = coercer.value(value, &ty)?;
			moves.extend(coercer.moves);
			(to, value)
		}
		None => (slot, value),
	};
	graph.write(slot, value)?;
	Ok(moves)
}

fn relocate(holders: &mut [RefHolder], queued: &mut [Pending], moves: &[Relocation]) {
	if moves.is_empty() {
		return;
	}
	for holder in holders.iter_mut() {
		holder.relocate(moves);
	}
	for pending in queued {
		pending.relocate(moves);
	}
}

struct Coercer<'a> {
	registry: &'a Registry,
	graph: &'a mut ObjectGraph,
	visited: HashSet<NodeId>,
	/// Map entries that became object fields during this conversion.
	moves: Vec<Relocation>,
}

impl<'a> Coercer<'a> {
	fn new(registry: &'a Registry, graph: &'a mut ObjectGraph) -> Self {
		Self {
			registry,
			graph,
			visited: HashSet::new(),
			moves: Vec::new(),
		}
	}

	fn value(&mut self, value: Value, ty: &TypeDesc) -> Result<Value> {
		if ty.is_any() {
			return Ok(value);
		}
		if value.is_null() {
			return Ok(Value::Null);
		}

		if value.depth() == ty.depth && matches_exactly(value.deref_all(), &ty.kind) {
			return Ok(value);
		}

		let base = self.base(value.into_base(), ty)?;
		Ok(base.wrap(ty.depth))
	}

	fn base(&mut self, value: Value, ty: &TypeDesc) -> Result<Value> {
		match &ty.kind {
			Kind::Any => Ok(value),
			Kind::Bool => match value {
				Value::Bool(_) => Ok(value),
				other => Err(mismatch(ty, other.kind_name())),
			},
			kind if kind.is_numeric() => {
				let got = value_kind(self.graph, &value);
				numeric(value, kind).ok_or_else(|| mismatch(ty, got))
			}
			Kind::String => match value {
				Value::String(_) => Ok(value),
				other => Err(mismatch(ty, value_kind(self.graph, &other))),
			},
			Kind::Bytes => match value {
				Value::Bytes(_) => Ok(value),
				other => Err(mismatch(ty, value_kind(self.graph, &other))),
			},
			Kind::Date => match value {
				Value::Date(_) => Ok(value),
				other => Err(mismatch(ty, value_kind(self.graph, &other))),
			},
			Kind::List(elem) => {
				let id = self.expect_node(value, ty, "list")?;
				self.list_in_place(id, elem)?;
				Ok(Value::Node(id))
			}
			Kind::Map(key, entry) => {
				let id = self.expect_node(value, ty, "map")?;
				self.map_in_place(id, key, entry)?;
				Ok(Value::Node(id))
			}
			Kind::Object(name) => {
				let Value::Node(id) = value else {
					return Err(mismatch(ty, value.kind_name()));
				};
				self.object(id, name, ty)?;
				Ok(Value::Node(id))
			}
			_ => Err(mismatch(ty, value.kind_name())),
		}
	}

	fn expect_node(&self, value: Value, ty: &TypeDesc, want: &'static str) -> Result<NodeId> {
		let Value::Node(id) = value else {
			return Err(mismatch(ty, value.kind_name()));
		};
		let got = self.graph.try_node(id)?.kind_name();
		if got != want {
			return Err(mismatch(ty, got));
		}
		Ok(id)
	}

	fn list_in_place(&mut self, id: NodeId, elem: &TypeDesc) -> Result<()> {
		if elem.is_any() || !self.visited.insert(id) {
			return Ok(());
		}

		let len = self.graph.list(id).map_or(0, |list| list.items.len());
		for index in 0..len {
			let slot = Slot::Element { node: id, index };
			self.convert_slot(slot, elem)?;
		}
		Ok(())
	}

	fn map_in_place(&mut self, id: NodeId, key: &TypeDesc, entry: &TypeDesc) -> Result<()> {
		if (key.is_any() && entry.is_any()) || !self.visited.insert(id) {
			return Ok(());
		}

		let len = self.graph.map(id).map_or(0, |map| map.entries.len());
		for index in 0..len {
			self.convert_slot(Slot::Key { node: id, index }, key)?;
			self.convert_slot(Slot::Entry { node: id, index }, entry)?;
		}
		Ok(())
	}

	fn convert_slot(&mut self, slot: Slot, ty: &TypeDesc) -> Result<()> {
		if ty.is_any() {
			return Ok(());
		}
		let current = self.graph.read(slot)?.clone();
		let converted = self.value(current, ty)?;
		self.graph.write(slot, converted)
	}

	fn object(&mut self, id: NodeId, name: &str, ty: &TypeDesc) -> Result<()> {
		if !self.visited.insert(id) {
			return Ok(());
		}

		let expected = self.registry.resolve(name)?;
		match self.graph.try_node(id)? {
			Node::Object(object) if Arc::ptr_eq(&object.shape, &expected) => Ok(()),
			Node::Object(object) if object.shape.same_layout(&expected) => self.adopt_shape(id, expected),
			Node::Object(object) => Err(CodecError::ShapeMismatch {
				type_name: name.to_owned(),
				detail: format!("fields [{}] do not match [{}]", field_list(&object.shape), field_list(&expected)),
			}),
			Node::Map(_) => self.map_to_object(id, name, expected),
			Node::List(_) => Err(mismatch(ty, "list")),
		}
	}

	fn adopt_shape(&mut self, id: NodeId, shape: Arc<Shape>) -> Result<()> {
		for (index, field) in shape.fields().iter().enumerate() {
			self.convert_slot(Slot::Field { node: id, index }, &field.ty)?;
		}
		if let Some(object) = self.graph.object_mut(id) {
			object.shape = shape;
		}
		Ok(())
	}

	fn map_to_object(&mut self, id: NodeId, name: &str, shape: Arc<Shape>) -> Result<()> {
		let entries = match self.graph.node_mut(id) {
			Some(Node::Map(map)) => std::mem::take(&mut map.entries),
			_ => Vec::new(),
		};

		let mut object = ObjectNode::new(shape.clone());
		for (entry, (key, value)) in entries.into_iter().enumerate() {
			let Some(field_name) = key.as_str() else {
				return Err(CodecError::TypeMismatch {
					expected: "string".to_owned(),
					got: value_kind(self.graph, &key),
				});
			};
			let index = shape.field_index(field_name).ok_or_else(|| CodecError::ShapeMismatch {
				type_name: name.to_owned(),
				detail: format!("unknown field `{field_name}`"),
			})?;
			let ty = &shape.fields()[index].ty;
			object.fields[index] = self.value(value, ty)?;
			self.moves.push(Relocation {
				from: Slot::Entry { node: id, index: entry },
				to: Slot::Field { node: id, index },
				ty: ty.clone(),
			});
		}

		if let Some(node) = self.graph.node_mut(id) {
			*node = Node::Object(object);
		}
		debug!(type_name = name, node = id.0, "typed map converted to object");
		Ok(())
	}
}

fn matches_exactly(value: &Value, kind: &Kind) -> bool {
	matches!(
		(value, kind),
		(_, Kind::Any)
			| (Value::Bool(_), Kind::Bool)
			| (Value::I64(_), Kind::I64)
			| (Value::U64(_), Kind::U64)
			| (Value::F32(_), Kind::F32)
			| (Value::F64(_), Kind::F64)
			| (Value::String(_), Kind::String)
			| (Value::Bytes(_), Kind::Bytes)
			| (Value::Date(_), Kind::Date)
	)
}

fn numeric(value: Value, kind: &Kind) -> Option<Value> {
	if matches!(kind, Kind::F32 | Kind::F64) {
		let float = match value {
			Value::I64(v) => v as f64,
			Value::U64(v) => v as f64,
			Value::F32(v) => f64::from(v),
			Value::F64(v) => v,
			_ => return None,
		};
		return Some(if *kind == Kind::F32 { Value::F32(float as f32) } else { Value::F64(float) });
	}

	let bits = match value {
		Value::I64(v) => v,
		Value::U64(v) => v as i64,
		Value::F32(v) => v as i64,
		Value::F64(v) => v as i64,
		_ => return None,
	};

	Some(match kind {
		Kind::I8 => Value::I64(i64::from(bits as i8)),
		Kind::I16 => Value::I64(i64::from(bits as i16)),
		Kind::I32 => Value::I64(i64::from(bits as i32)),
		Kind::U8 => Value::U64(u64::from(bits as u8)),
		Kind::U16 => Value::U64(u64::from(bits as u16)),
		Kind::U32 => Value::U64(u64::from(bits as u32)),
		Kind::U64 => Value::U64(bits as u64),
		_ => Value::I64(bits),
	})
}

fn value_kind(graph: &ObjectGraph, value: &Value) -> &'static str {
	match value {
		Value::Node(id) => graph.node(*id).map_or("node", Node::kind_name),
		other => other.kind_name(),
	}
}

fn mismatch(ty: &TypeDesc, got: &'static str) -> CodecError {
	CodecError::TypeMismatch {
		expected: ty.to_string(),
		got,
	}
}

fn field_list(shape: &Shape) -> String {
	shape.fields().iter().map(|field| field.name.as_ref()).collect::<Vec<_>>().join(", ")
}
