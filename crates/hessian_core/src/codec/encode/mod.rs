use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::{CodecError, ListNode, MapNode, Node, NodeId, ObjectGraph, ObjectNode, Registry, Result, Value, tag};

/// Nesting ceiling for the recursive writer.
pub const MAX_ENCODE_DEPTH: u32 = 512;

/// Encode the root of `graph` as one Hessian value.
pub fn encode(registry: &Registry, graph: &ObjectGraph) -> Result<Vec<u8>> {
	let mut encoder = Encoder::new(registry);
	encoder.write(graph, graph.root())?;
	let out = encoder.finish();
	debug!(bytes = out.len(), nodes = graph.len(), "encode finished");
	Ok(out)
}

/// Streaming writer for a sequence of Hessian values sharing one set of reference tables.
pub struct Encoder<'a> {
	registry: &'a Registry,
	out: Vec<u8>,
	refs: HashMap<NodeId, u32>,
	classes: HashMap<Arc<str>, u32>,
	types: HashMap<Box<str>, u32>,
	depth: u32,
}

impl<'a> Encoder<'a> {
	/// Create an empty encoder.
	pub fn new(registry: &'a Registry) -> Self {
		Self {
			registry,
			out: Vec::new(),
			refs: HashMap::new(),
			classes: HashMap::new(),
			types: HashMap::new(),
			depth: 0,
		}
	}

	/// Append `value`, resolving node handles against `graph`.
	///
	/// Nodes already written by this encoder, in this or an earlier call, become back-references.
	pub fn write(&mut self, graph: &ObjectGraph, value: &Value) -> Result<()> {
		match value {
			Value::Null => self.out.push(tag::NULL),
			Value::Bool(true) => self.out.push(tag::TRUE),
			Value::Bool(false) => self.out.push(tag::FALSE),
			Value::I64(v) => match i32::try_from(*v) {
				Ok(v) => self.int(v),
				Err(_) => self.long(*v),
			},
			Value::U64(v) => self.long(*v as i64),
			Value::F32(v) => self.double(f64::from(*v)),
			Value::F64(v) => self.double(*v),
			Value::String(text) => self.string(text),
			Value::Bytes(bytes) => self.binary(bytes),
			Value::Date(millis) => self.date(*millis),
			Value::Ptr(inner) => self.write(graph, inner)?,
			Value::Node(id) => self.node(graph, *id)?,
		}
		Ok(())
	}

	/// Return the bytes written so far.
	pub fn bytes(&self) -> &[u8] {
		&self.out
	}

	/// Consume the encoder and return the output buffer.
	pub fn finish(self) -> Vec<u8> {
		self.out
	}

	fn node(&mut self, graph: &ObjectGraph, id: NodeId) -> Result<()> {
		if let Some(&index) = self.refs.get(&id) {
			trace!(node = id.0, index, "back-reference");
			self.out.push(tag::REF);
			self.int(index as i32);
			return Ok(());
		}

		let node = graph.try_node(id)?;
		if self.depth >= MAX_ENCODE_DEPTH {
			return Err(CodecError::DepthExceeded {
				max_depth: MAX_ENCODE_DEPTH,
			});
		}
		let index = self.refs.len() as u32;
		self.refs.insert(id, index);

		self.depth += 1;
		let out = match node {
			Node::List(list) => self.list(graph, list),
			Node::Map(map) => self.map(graph, map),
			Node::Object(object) => self.object(graph, object),
		};
		self.depth -= 1;
		out
	}

	fn list(&mut self, graph: &ObjectGraph, list: &ListNode) -> Result<()> {
		let len = list.items.len();
		match (&list.type_name, len <= tag::LIST_SHORT_MAX) {
			(Some(name), true) => {
				self.out.push(tag::LIST_TYPED_SHORT + len as u8);
				self.type_name(name);
			}
			(Some(name), false) => {
				self.out.push(tag::LIST_FIXED_TYPED);
				self.type_name(name);
				self.int(len as i32);
			}
			(None, true) => self.out.push(tag::LIST_SHORT + len as u8),
			(None, false) => {
				self.out.push(tag::LIST_FIXED);
				self.int(len as i32);
			}
		}

		for item in &list.items {
			self.write(graph, item)?;
		}
		Ok(())
	}

	fn map(&mut self, graph: &ObjectGraph, map: &MapNode) -> Result<()> {
		match &map.type_name {
			Some(name) => {
				self.out.push(tag::MAP_TYPED);
				self.type_name(name);
			}
			None => self.out.push(tag::MAP),
		}

		for (key, value) in &map.entries {
			self.write(graph, key)?;
			self.write(graph, value)?;
		}
		self.out.push(tag::END);
		Ok(())
	}

	fn object(&mut self, graph: &ObjectGraph, object: &ObjectNode) -> Result<()> {
		let name = self.registry.name_of(&object.shape)?;
		let index = match self.classes.get(&name) {
			Some(&index) => index,
			None => {
				let index = self.classes.len() as u32;
				self.out.push(tag::CLASS_DEF);
				self.string(&name);
				self.int(object.shape.len() as i32);
				for field in object.shape.fields() {
					self.string(&field.name);
				}
				debug!(type_name = %name, index, "class definition");
				self.classes.insert(name, index);
				index
			}
		};

		if index <= tag::OBJECT_SHORT_MAX {
			self.out.push(tag::OBJECT_SHORT + index as u8);
		} else {
			self.out.push(tag::OBJECT);
			self.int(index as i32);
		}

		for value in &object.fields {
			self.write(graph, value)?;
		}
		Ok(())
	}

	fn type_name(&mut self, name: &str) {
		if let Some(&index) = self.types.get(name) {
			self.int(index as i32);
			return;
		}
		let index = self.types.len() as u32;
		self.types.insert(name.into(), index);
		self.string(name);
	}

	fn int(&mut self, v: i32) {
		match v {
			-16..=47 => self.out.push((i32::from(tag::INT_ZERO) + v) as u8),
			-2048..=2047 => {
				self.out.push((i32::from(tag::INT_BYTE_ZERO) + (v >> 8)) as u8);
				self.out.push(v as u8);
			}
			-262_144..=262_143 => {
				self.out.push((i32::from(tag::INT_SHORT_ZERO) + (v >> 16)) as u8);
				self.out.extend_from_slice(&(v as u16).to_be_bytes());
			}
			_ => {
				self.out.push(tag::INT);
				self.out.extend_from_slice(&v.to_be_bytes());
			}
		}
	}

	fn long(&mut self, v: i64) {
		match v {
			-8..=15 => self.out.push((i64::from(tag::LONG_ZERO) + v) as u8),
			-2048..=2047 => {
				self.out.push((i64::from(tag::LONG_BYTE_ZERO) + (v >> 8)) as u8);
				self.out.push(v as u8);
			}
			-262_144..=262_143 => {
				self.out.push((i64::from(tag::LONG_SHORT_ZERO) + (v >> 16)) as u8);
				self.out.extend_from_slice(&(v as u16).to_be_bytes());
			}
			_ => match i32::try_from(v) {
				Ok(short) => {
					self.out.push(tag::LONG_INT);
					self.out.extend_from_slice(&short.to_be_bytes());
				}
				Err(_) => {
					self.out.push(tag::LONG);
					self.out.extend_from_slice(&v.to_be_bytes());
				}
			},
		}
	}

	fn double(&mut self, v: f64) {
		if v.to_bits() == 0 {
			self.out.push(tag::DOUBLE_ZERO);
			return;
		}
		if v == 1.0 {
			self.out.push(tag::DOUBLE_ONE);
			return;
		}

		// -0.0 keeps its sign only in the full form.
		if v == 0.0 {
			self.double_full(v);
			return;
		}

		if v.fract() == 0.0 {
			if (-128.0..=127.0).contains(&v) {
				self.out.push(tag::DOUBLE_BYTE);
				self.out.push(v as i8 as u8);
				return;
			}
			if (-32768.0..=32767.0).contains(&v) {
				self.out.push(tag::DOUBLE_SHORT);
				self.out.extend_from_slice(&(v as i16).to_be_bytes());
				return;
			}
		}

		let mills = (v * 1000.0) as i32;
		if v.is_finite() && 0.001 * f64::from(mills) == v {
			self.out.push(tag::DOUBLE_MILL);
			self.out.extend_from_slice(&mills.to_be_bytes());
			return;
		}
		self.double_full(v);
	}

	fn double_full(&mut self, v: f64) {
		self.out.push(tag::DOUBLE);
		self.out.extend_from_slice(&v.to_bits().to_be_bytes());
	}

	fn date(&mut self, millis: i64) {
		let minutes = i32::try_from(millis / 60_000).ok().filter(|_| millis % 60_000 == 0);
		if let Some(minutes) = minutes {
			self.out.push(tag::DATE_MINUTES);
			self.out.extend_from_slice(&minutes.to_be_bytes());
			return;
		}
		self.out.push(tag::DATE_MILLIS);
		self.out.extend_from_slice(&millis.to_be_bytes());
	}

	fn string(&mut self, text: &str) {
		let mut rest = text;
		loop {
			let (split, units) = chunk_split(rest);
			if split == rest.len() {
				self.string_final(rest, units);
				return;
			}
			let (head, tail) = rest.split_at(split);
			self.out.push(tag::STRING_CHUNK);
			self.out.extend_from_slice(&(units as u16).to_be_bytes());
			self.out.extend_from_slice(head.as_bytes());
			rest = tail;
		}
	}

	fn string_final(&mut self, text: &str, units: usize) {
		if units <= tag::STRING_SHORT_MAX {
			self.out.push(units as u8);
		} else if units <= tag::STRING_MEDIUM_MAX {
			self.out.push(tag::STRING_MEDIUM + (units >> 8) as u8);
			self.out.push(units as u8);
		} else {
			self.out.push(tag::STRING_FINAL);
			self.out.extend_from_slice(&(units as u16).to_be_bytes());
		}
		self.out.extend_from_slice(text.as_bytes());
	}

	fn binary(&mut self, bytes: &[u8]) {
		let mut rest = bytes;
		while rest.len() > tag::CHUNK_SIZE {
			let (head, tail) = rest.split_at(tag::CHUNK_SIZE);
			self.out.push(tag::BINARY_CHUNK);
			self.out.extend_from_slice(&(head.len() as u16).to_be_bytes());
			self.out.extend_from_slice(head);
			rest = tail;
		}

		let len = rest.len();
		if len <= tag::BINARY_SHORT_MAX {
			self.out.push(tag::BINARY_SHORT + len as u8);
		} else if len <= tag::BINARY_MEDIUM_MAX {
			self.out.push(tag::BINARY_MEDIUM + (len >> 8) as u8);
			self.out.push(len as u8);
		} else {
			self.out.push(tag::BINARY_FINAL);
			self.out.extend_from_slice(&(len as u16).to_be_bytes());
		}
		self.out.extend_from_slice(rest);
	}
}

/// Return the byte offset and UTF-16 length of the first chunk of `text`.
///
/// The whole string fits when the offset equals `text.len()`. Surrogate pairs never straddle
/// a chunk boundary.
fn chunk_split(text: &str) -> (usize, usize) {
	let mut units = 0;
	for (offset, ch) in text.char_indices() {
		let width = ch.len_utf16();
		if units + width > tag::CHUNK_SIZE {
			return (offset, units);
		}
		units += width;
	}
	(text.len(), units)
}

#[cfg(test)]
mod tests;
