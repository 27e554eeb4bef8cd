use std::sync::Arc;

use crate::codec::bytes::Cursor;
use crate::codec::coerce::{self, Decoded};
use crate::codec::holder::RefHolder;
use crate::codec::{ANY_TYPE, CodecError, Kind, ListNode, MapNode, Node, NodeId, ObjectGraph, ObjectNode, Registry, Result, Shape, Slot, TypeDesc, Value, tag};

/// Decode policy and hard safety limits.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
	/// Maximum container nesting depth.
	pub max_depth: u32,
	/// Maximum declared length of a string, binary, or list.
	pub max_len: usize,
	/// Fail when bytes remain after the last value read.
	pub reject_trailing: bool,
}

impl Default for DecodeOptions {
	fn default() -> Self {
		Self {
			max_depth: 256,
			max_len: 16 * 1024 * 1024,
			reject_trailing: false,
		}
	}
}

impl DecodeOptions {
	/// Tight limits for payloads from untrusted peers: one value, no trailing bytes.
	pub fn strict() -> Self {
		Self {
			max_depth: 64,
			max_len: 1024 * 1024,
			reject_trailing: true,
		}
	}
}

/// Decode one untyped root value into a fresh graph.
pub fn decode(registry: &Registry, bytes: &[u8]) -> Result<ObjectGraph> {
	decode_with(registry, bytes, &DecodeOptions::default())
}

/// Decode one untyped root value into a fresh graph with explicit options.
pub fn decode_with(registry: &Registry, bytes: &[u8], options: &DecodeOptions) -> Result<ObjectGraph> {
	let mut graph = ObjectGraph::new();
	decode_into(registry, bytes, options, &mut graph)?;
	Ok(graph)
}

/// Decode one root value into `graph`, which is cleared first. Returns consumed bytes.
///
/// On failure `graph` is left empty.
pub fn decode_into(registry: &Registry, bytes: &[u8], options: &DecodeOptions, graph: &mut ObjectGraph) -> Result<usize> {
	let mut decoder = Decoder::new(registry, bytes, options.clone(), graph);
	decoder.read(&ANY_TYPE)?;
	decoder.finish()
}

/// Decode one root value and coerce it into `ty`.
pub fn decode_as(registry: &Registry, bytes: &[u8], ty: &TypeDesc, options: &DecodeOptions) -> Result<ObjectGraph> {
	let mut graph = ObjectGraph::new();
	let mut decoder = Decoder::new(registry, bytes, options.clone(), &mut graph);
	decoder.read(ty)?;
	decoder.finish()?;
	Ok(graph)
}

#[derive(Debug)]
struct ClassDef {
	name: Box<str>,
	shape: Arc<Shape>,
	/// Shape field index for each wire field, in wire order.
	fields: Vec<usize>,
}

/// Streaming reader for a sequence of Hessian values sharing one set of reference tables.
///
/// Each call to [`Decoder::read`] stores its result as the graph root and returns it. Class
/// definitions, type names and back-references carry over between reads.
pub struct Decoder<'a> {
	registry: &'a Registry,
	cursor: Cursor<'a>,
	options: DecodeOptions,
	graph: &'a mut ObjectGraph,
	holders: Vec<RefHolder>,
	refs: Vec<NodeId>,
	classes: Vec<Arc<ClassDef>>,
	types: Vec<Box<str>>,
	depth: u32,
}

impl<'a> Decoder<'a> {
	/// Create a decoder writing into `graph`, which is cleared first.
	pub fn new(registry: &'a Registry, bytes: &'a [u8], options: DecodeOptions, graph: &'a mut ObjectGraph) -> Self {
		graph.clear();
		Self {
			registry,
			cursor: Cursor::new(bytes),
			options,
			graph,
			holders: Vec::new(),
			refs: Vec::new(),
			classes: Vec::new(),
			types: Vec::new(),
			depth: 0,
		}
	}

	/// Return whether unread bytes remain.
	pub fn has_remaining(&self) -> bool {
		self.cursor.remaining() > 0
	}

	/// Return current byte offset.
	pub fn position(&self) -> usize {
		self.cursor.pos()
	}

	/// Read the next value, coerce it into `ty`, and store it as the root.
	///
	/// A failed read empties the graph and the reference tables.
	pub fn read(&mut self, ty: &TypeDesc) -> Result<Value> {
		let start = self.cursor.pos();
		let out = self.value(ty).and_then(|decoded| coerce::assign(self.registry, self.graph, &mut self.holders, Slot::Root, ty, decoded));
		if let Err(err) = out {
			debug!(start, at = self.cursor.pos(), %err, "decode failed, discarding partial graph");
			self.discard();
			return Err(err);
		}
		trace!(start, end = self.cursor.pos(), nodes = self.graph.len(), "decoded value");
		Ok(self.graph.root().clone())
	}

	/// Check that every reference resolved and return consumed bytes.
	///
	/// The graph is emptied when the check fails.
	pub fn finish(mut self) -> Result<usize> {
		let out = self.check_finished();
		if out.is_err() {
			self.discard();
		}
		out
	}

	fn discard(&mut self) {
		self.graph.clear();
		self.holders.clear();
		self.refs.clear();
	}

	fn check_finished(&self) -> Result<usize> {
		if let Some(node) = self.holders.iter().position(|holder| !holder.is_resolved()) {
			return Err(CodecError::UnresolvedReference { node: node as u32 });
		}

		let consumed = self.cursor.pos();
		let rem = self.cursor.remaining();
		if self.options.reject_trailing && rem > 0 {
			return Err(CodecError::TrailingBytes { at: consumed, rem });
		}
		debug!(consumed, rem, nodes = self.graph.len(), classes = self.classes.len(), "decode finished");
		Ok(consumed)
	}

	fn value(&mut self, ty: &TypeDesc) -> Result<Decoded> {
		let mut at = self.cursor.pos();
		let mut tag = self.cursor.read_u8()?;
		while tag == tag::CLASS_DEF {
			self.class_def()?;
			at = self.cursor.pos();
			tag = self.cursor.read_u8()?;
		}

		let value = match tag {
			tag::NULL => Value::Null,
			tag::TRUE => Value::Bool(true),
			tag::FALSE => Value::Bool(false),
			0x80..=0xd7 | tag::INT => Value::I64(self.int_body(tag, at)?),
			0xd8..=0xff | 0x38..=0x3f | tag::LONG_INT | tag::LONG => Value::I64(self.long_body(tag, at)?),
			0x5b..=0x5f | tag::DOUBLE => Value::F64(self.double_body(tag)?),
			tag::DATE_MILLIS => Value::Date(self.cursor.read_i64_be()?),
			tag::DATE_MINUTES => Value::Date(i64::from(self.cursor.read_i32_be()?) * 60_000),
			0x00..=0x1f | 0x30..=0x33 | tag::STRING_CHUNK | tag::STRING_FINAL => Value::String(self.string_body(tag, at)?),
			0x20..=0x2f | 0x34..=0x37 | tag::BINARY_CHUNK | tag::BINARY_FINAL => Value::Bytes(self.binary_body(tag, at)?),
			tag::OBJECT | 0x60..=0x6f => return self.nested(|this| this.object(tag, at)),
			tag::LIST_VARIABLE_TYPED | tag::LIST_FIXED_TYPED | tag::LIST_VARIABLE | tag::LIST_FIXED | 0x70..=0x7f => {
				return self.nested(|this| this.list(tag, ty));
			}
			tag::MAP_TYPED | tag::MAP => return self.nested(|this| this.map(tag, ty)),
			tag::REF => return self.back_ref(at),
			_ => return Err(CodecError::UnknownTag { tag, at }),
		};
		Ok(Decoded::Value(value))
	}

	fn nested(&mut self, f: impl FnOnce(&mut Self) -> Result<Decoded>) -> Result<Decoded> {
		if self.depth >= self.options.max_depth {
			return Err(CodecError::DepthExceeded {
				max_depth: self.options.max_depth,
			});
		}
		self.depth += 1;
		let out = f(self);
		self.depth -= 1;
		out
	}

	fn begin(&mut self, node: Node) -> NodeId {
		let id = self.graph.push(node);
		self.holders.push(RefHolder::default());
		self.refs.push(id);
		id
	}

	fn complete(&mut self, id: NodeId) -> Result<Decoded> {
		coerce::resolve(self.registry, self.graph, &mut self.holders, id)?;
		Ok(Decoded::Value(Value::Node(id)))
	}

	fn list(&mut self, tag: u8, ty: &TypeDesc) -> Result<Decoded> {
		let (type_name, len) = match tag {
			tag::LIST_VARIABLE_TYPED => (Some(self.type_name()?), None),
			tag::LIST_FIXED_TYPED => (Some(self.type_name()?), Some(self.length()?)),
			tag::LIST_VARIABLE => (None, None),
			tag::LIST_FIXED => (None, Some(self.length()?)),
			0x70..=0x77 => (Some(self.type_name()?), Some(usize::from(tag - tag::LIST_TYPED_SHORT))),
			_ => (None, Some(usize::from(tag - tag::LIST_SHORT))),
		};

		let elem = match &ty.kind {
			Kind::List(elem) => elem.as_ref().clone(),
			_ => TypeDesc::any(),
		};
		let id = self.begin(Node::List(ListNode {
			type_name,
			items: Vec::with_capacity(len.unwrap_or(0)),
		}));

		let mut index = 0;
		loop {
			match len {
				Some(len) if index >= len => break,
				None if self.cursor.peek_u8()? == tag::END => {
					self.cursor.read_u8()?;
					break;
				}
				_ => {}
			}
			if let Some(Node::List(list)) = self.graph.node_mut(id) {
				list.items.push(Value::Null);
			}
			let decoded = self.value(&elem)?;
			coerce::assign(self.registry, self.graph, &mut self.holders, Slot::Element { node: id, index }, &elem, decoded)?;
			index += 1;
		}
		self.complete(id)
	}

	fn map(&mut self, tag: u8, ty: &TypeDesc) -> Result<Decoded> {
		let type_name = if tag == tag::MAP_TYPED { Some(self.type_name()?) } else { None };
		let (key_ty, entry_ty) = match &ty.kind {
			Kind::Map(key, entry) => (key.as_ref().clone(), entry.as_ref().clone()),
			_ => (TypeDesc::any(), TypeDesc::any()),
		};
		let id = self.begin(Node::Map(MapNode {
			type_name,
			entries: Vec::new(),
		}));

		let mut index = 0;
		while self.cursor.peek_u8()? != tag::END {
			if let Some(Node::Map(map)) = self.graph.node_mut(id) {
				map.entries.push((Value::Null, Value::Null));
			}
			let key = self.value(&key_ty)?;
			coerce::assign(self.registry, self.graph, &mut self.holders, Slot::Key { node: id, index }, &key_ty, key)?;
			let entry = self.value(&entry_ty)?;
			coerce::assign(self.registry, self.graph, &mut self.holders, Slot::Entry { node: id, index }, &entry_ty, entry)?;
			index += 1;
		}
		self.cursor.read_u8()?;
		self.complete(id)
	}

	fn object(&mut self, tag: u8, at: usize) -> Result<Decoded> {
		let index = if tag == tag::OBJECT {
			self.int()?
		} else {
			i64::from(tag - tag::OBJECT_SHORT)
		};
		let class = usize::try_from(index)
			.ok()
			.and_then(|idx| self.classes.get(idx))
			.cloned()
			.ok_or(CodecError::BadClassReference {
				index,
				defined: self.classes.len(),
				at,
			})?;

		let id = self.begin(Node::Object(ObjectNode::new(class.shape.clone())));
		trace!(type_name = %class.name, node = id.0, "object start");
		for &field in &class.fields {
			let field_ty = &class.shape.fields()[field].ty;
			let decoded = self.value(field_ty)?;
			coerce::assign(self.registry, self.graph, &mut self.holders, Slot::Field { node: id, index: field }, field_ty, decoded)?;
		}
		self.complete(id)
	}

	fn class_def(&mut self) -> Result<()> {
		let name = self.string()?;
		let count = self.length()?;
		let shape = self.registry.resolve(&name)?;

		let mut fields = Vec::with_capacity(count.min(shape.len()));
		for _ in 0..count {
			let field = self.string()?;
			let index = shape.field_index(&field).ok_or_else(|| CodecError::ShapeMismatch {
				type_name: name.to_string(),
				detail: format!("wire field `{field}` is not part of the registered shape"),
			})?;
			if fields.contains(&index) {
				return Err(CodecError::ShapeMismatch {
					type_name: name.to_string(),
					detail: format!("wire field `{field}` repeated"),
				});
			}
			fields.push(index);
		}

		debug!(type_name = %name, fields = fields.len(), index = self.classes.len(), "class definition");
		self.classes.push(Arc::new(ClassDef { name, shape, fields }));
		Ok(())
	}

	fn back_ref(&mut self, at: usize) -> Result<Decoded> {
		let index = self.int()?;
		let node = usize::try_from(index).ok().and_then(|idx| self.refs.get(idx)).copied();
		let node = node.ok_or(CodecError::BadReference {
			index,
			seen: self.refs.len(),
			at,
		})?;
		Ok(Decoded::Pending(node))
	}

	fn type_name(&mut self) -> Result<Box<str>> {
		let at = self.cursor.pos();
		let tag = self.cursor.peek_u8()?;
		if tag::is_string(tag) {
			let name = self.string()?;
			self.types.push(name.clone());
			return Ok(name);
		}

		let index = self.int()?;
		usize::try_from(index)
			.ok()
			.and_then(|idx| self.types.get(idx))
			.cloned()
			.ok_or(CodecError::BadTypeReference {
				index,
				defined: self.types.len(),
				at,
			})
	}

	fn int(&mut self) -> Result<i64> {
		let at = self.cursor.pos();
		let tag = self.cursor.read_u8()?;
		if !tag::is_int(tag) {
			return Err(CodecError::UnexpectedTag { tag, at, expected: "int" });
		}
		self.int_body(tag, at)
	}

	/// Read an int used as a length and check it against the limits.
	fn length(&mut self) -> Result<usize> {
		let at = self.cursor.pos();
		let len = self.int()?;
		let len = usize::try_from(len).map_err(|_| CodecError::NegativeLength { len, at })?;
		self.check_len(len)?;
		// Every element occupies at least one byte.
		if len > self.cursor.remaining() {
			return Err(CodecError::UnexpectedEof {
				at: self.cursor.pos(),
				need: len,
				rem: self.cursor.remaining(),
			});
		}
		Ok(len)
	}

	fn check_len(&self, len: usize) -> Result<()> {
		if len > self.options.max_len {
			return Err(CodecError::LengthTooLarge {
				len,
				max: self.options.max_len,
			});
		}
		Ok(())
	}

	fn string(&mut self) -> Result<Box<str>> {
		let at = self.cursor.pos();
		let tag = self.cursor.read_u8()?;
		if !tag::is_string(tag) {
			return Err(CodecError::UnexpectedTag { tag, at, expected: "string" });
		}
		self.string_body(tag, at)
	}

	fn int_body(&mut self, tag: u8, at: usize) -> Result<i64> {
		let tag_value = i64::from(tag);
		Ok(match tag {
			0x80..=0xbf => tag_value - i64::from(tag::INT_ZERO),
			0xc0..=0xcf => ((tag_value - i64::from(tag::INT_BYTE_ZERO)) << 8) + i64::from(self.cursor.read_u8()?),
			0xd0..=0xd7 => {
				let high = (tag_value - i64::from(tag::INT_SHORT_ZERO)) << 16;
				high + i64::from(self.cursor.read_u16_be()?)
			}
			tag::INT => i64::from(self.cursor.read_i32_be()?),
			_ => return Err(CodecError::UnexpectedTag { tag, at, expected: "int" }),
		})
	}

	fn long_body(&mut self, tag: u8, at: usize) -> Result<i64> {
		let tag_value = i64::from(tag);
		Ok(match tag {
			0xd8..=0xef => tag_value - i64::from(tag::LONG_ZERO),
			0xf0..=0xff => ((tag_value - i64::from(tag::LONG_BYTE_ZERO)) << 8) + i64::from(self.cursor.read_u8()?),
			0x38..=0x3f => {
				let high = (tag_value - i64::from(tag::LONG_SHORT_ZERO)) << 16;
				high + i64::from(self.cursor.read_u16_be()?)
			}
			tag::LONG_INT => i64::from(self.cursor.read_i32_be()?),
			tag::LONG => self.cursor.read_i64_be()?,
			_ => return Err(CodecError::UnexpectedTag { tag, at, expected: "long" }),
		})
	}

	fn double_body(&mut self, tag: u8) -> Result<f64> {
		Ok(match tag {
			tag::DOUBLE_ZERO => 0.0,
			tag::DOUBLE_ONE => 1.0,
			tag::DOUBLE_BYTE => f64::from(self.cursor.read_u8()? as i8),
			tag::DOUBLE_SHORT => f64::from(self.cursor.read_i16_be()?),
			tag::DOUBLE_MILL => 0.001 * f64::from(self.cursor.read_i32_be()?),
			_ => self.cursor.read_f64_be()?,
		})
	}

	fn string_body(&mut self, mut tag: u8, at: usize) -> Result<Box<str>> {
		let mut units: Vec<u16> = Vec::new();
		loop {
			let (len, last) = match tag {
				0x00..=0x1f => (usize::from(tag), true),
				0x30..=0x33 => ((usize::from(tag - tag::STRING_MEDIUM) << 8) + usize::from(self.cursor.read_u8()?), true),
				tag::STRING_FINAL => (usize::from(self.cursor.read_u16_be()?), true),
				tag::STRING_CHUNK => (usize::from(self.cursor.read_u16_be()?), false),
				_ => {
					return Err(CodecError::UnexpectedTag {
						tag,
						at: self.cursor.pos() - 1,
						expected: "string chunk",
					});
				}
			};
			self.check_len(units.len() + len)?;
			self.utf16_units(len, &mut units)?;
			if last {
				break;
			}
			tag = self.cursor.read_u8()?;
		}

		String::from_utf16(&units).map(String::into_boxed_str).map_err(|_| CodecError::InvalidUtf8 { at })
	}

	/// Read `count` UTF-16 units worth of UTF-8 (or CESU-8 surrogate) sequences.
	fn utf16_units(&mut self, count: usize, out: &mut Vec<u16>) -> Result<()> {
		let target = out.len() + count;
		while out.len() < target {
			let at = self.cursor.pos();
			let lead = self.cursor.read_u8()?;
			let (extra, init) = match lead {
				0x00..=0x7f => (0, u32::from(lead)),
				0xc0..=0xdf => (1, u32::from(lead & 0x1f)),
				0xe0..=0xef => (2, u32::from(lead & 0x0f)),
				0xf0..=0xf7 => (3, u32::from(lead & 0x07)),
				_ => return Err(CodecError::InvalidUtf8 { at }),
			};

			let mut code = init;
			for &byte in self.cursor.read_exact(extra)? {
				if byte & 0xc0 != 0x80 {
					return Err(CodecError::InvalidUtf8 { at });
				}
				code = (code << 6) | u32::from(byte & 0x3f);
			}

			if code > 0xffff {
				let ch = char::from_u32(code).ok_or(CodecError::InvalidUtf8 { at })?;
				let mut pair = [0_u16; 2];
				out.extend_from_slice(ch.encode_utf16(&mut pair));
			} else {
				out.push(code as u16);
			}
		}
		Ok(())
	}

	fn binary_body(&mut self, mut tag: u8, at: usize) -> Result<Vec<u8>> {
		let mut out = Vec::new();
		loop {
			let (len, last) = match tag {
				0x20..=0x2f => (usize::from(tag - tag::BINARY_SHORT), true),
				0x34..=0x37 => ((usize::from(tag - tag::BINARY_MEDIUM) << 8) + usize::from(self.cursor.read_u8()?), true),
				tag::BINARY_FINAL => (usize::from(self.cursor.read_u16_be()?), true),
				tag::BINARY_CHUNK => (usize::from(self.cursor.read_u16_be()?), false),
				_ => {
					return Err(CodecError::UnexpectedTag {
						tag,
						at,
						expected: "binary chunk",
					});
				}
			};
			self.check_len(out.len() + len)?;
			out.extend_from_slice(self.cursor.read_exact(len)?);
			if last {
				return Ok(out);
			}
			tag = self.cursor.read_u8()?;
		}
	}
}
