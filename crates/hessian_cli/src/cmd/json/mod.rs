use std::collections::{HashMap, HashSet};

use hessian::codec::{ListNode, MapNode, Node, NodeId, ObjectGraph, Registry, Value};
use serde_json::{Map, Number, json};

use crate::cmd::util::{hex, parse_hex};
use crate::error::{CliError, Result};

/// Key holding the arena index of a node that is referenced more than once.
pub const ID_KEY: &str = "$id";
/// Key holding a back-reference to a node labelled with [`ID_KEY`].
pub const REF_KEY: &str = "$ref";
/// Key holding the registered name of an object or the wire name of a typed container.
pub const TYPE_KEY: &str = "$type";
/// Key holding list elements when a list needs an id or type.
pub const ITEMS_KEY: &str = "$items";
/// Key holding `[key, value]` pairs for maps with non-string keys.
pub const ENTRIES_KEY: &str = "$entries";
/// Key holding a hex byte payload.
pub const BYTES_KEY: &str = "$bytes";
/// Key holding epoch milliseconds.
pub const DATE_KEY: &str = "$date";

/// Convert a decoded graph into JSON.
///
/// Objects carry `$type`; nodes reached more than once carry `$id` at their first
/// appearance and print as `{"$ref": id}` afterwards. Indirection levels are dropped.
pub fn graph_to_json(registry: &Registry, graph: &ObjectGraph, value: &Value) -> serde_json::Value {
	let mut counts = HashMap::new();
	count_refs(graph, value, &mut counts);
	let shared = counts.into_iter().filter(|(_, count)| *count > 1).map(|(id, _)| id).collect();

	let mut writer = JsonWriter {
		registry,
		graph,
		shared,
		written: HashSet::new(),
	};
	writer.value(value)
}

fn count_refs(graph: &ObjectGraph, value: &Value, counts: &mut HashMap<NodeId, usize>) {
	let mut stack = vec![value];
	while let Some(value) = stack.pop() {
		let Some(id) = value.as_node() else {
			continue;
		};
		let count = counts.entry(id).or_insert(0);
		*count += 1;
		if *count > 1 {
			continue;
		}
		match graph.node(id) {
			Some(Node::List(list)) => stack.extend(&list.items),
			Some(Node::Map(map)) => stack.extend(map.entries.iter().flat_map(|(key, value)| [key, value])),
			Some(Node::Object(object)) => stack.extend(&object.fields),
			None => {}
		}
	}
}

struct JsonWriter<'a> {
	registry: &'a Registry,
	graph: &'a ObjectGraph,
	shared: HashSet<NodeId>,
	written: HashSet<NodeId>,
}

impl JsonWriter<'_> {
	fn value(&mut self, value: &Value) -> serde_json::Value {
		match value.deref_all() {
			Value::Null => serde_json::Value::Null,
			Value::Bool(v) => json!(v),
			Value::I64(v) => json!(v),
			Value::U64(v) => json!(v),
			Value::F32(v) => float(f64::from(*v)),
			Value::F64(v) => float(*v),
			Value::String(text) => json!(&**text),
			Value::Bytes(bytes) => tagged(BYTES_KEY, json!(hex(bytes))),
			Value::Date(millis) => tagged(DATE_KEY, json!(millis)),
			Value::Node(id) => self.node(*id),
			Value::Ptr(_) => serde_json::Value::Null,
		}
	}

	fn node(&mut self, id: NodeId) -> serde_json::Value {
		if !self.written.insert(id) {
			return tagged(REF_KEY, json!(id.0));
		}

		let mut out = Map::new();
		if self.shared.contains(&id) {
			out.insert(ID_KEY.to_owned(), json!(id.0));
		}

		let graph = self.graph;
		match graph.node(id) {
			Some(Node::Object(object)) => {
				let name = self.registry.name_of(&object.shape).map(|name| name.to_string()).unwrap_or_default();
				out.insert(TYPE_KEY.to_owned(), json!(name));
				for (field, value) in object.shape.fields().iter().zip(&object.fields) {
					let value = self.value(value);
					out.insert(field.name.to_string(), value);
				}
			}
			Some(Node::List(list)) => {
				let items: Vec<_> = list.items.iter().map(|item| self.value(item)).collect();
				if out.is_empty() && list.type_name.is_none() {
					return serde_json::Value::Array(items);
				}
				if let Some(name) = &list.type_name {
					out.insert(TYPE_KEY.to_owned(), json!(&**name));
				}
				out.insert(ITEMS_KEY.to_owned(), serde_json::Value::Array(items));
			}
			Some(Node::Map(map)) => {
				if let Some(name) = &map.type_name {
					out.insert(TYPE_KEY.to_owned(), json!(&**name));
				}
				let string_keys = map.entries.iter().all(|(key, _)| key.as_str().is_some_and(|key| !key.starts_with('$')));
				if string_keys {
					for (key, value) in &map.entries {
						let value = self.value(value);
						out.insert(key.as_str().unwrap_or_default().to_owned(), value);
					}
				} else {
					let entries = map.entries.iter().map(|(key, value)| json!([self.value(key), self.value(value)])).collect();
					out.insert(ENTRIES_KEY.to_owned(), serde_json::Value::Array(entries));
				}
			}
			None => return serde_json::Value::Null,
		}
		serde_json::Value::Object(out)
	}
}

fn tagged(key: &str, value: serde_json::Value) -> serde_json::Value {
	let mut out = Map::new();
	out.insert(key.to_owned(), value);
	serde_json::Value::Object(out)
}

fn float(v: f64) -> serde_json::Value {
	Number::from_f64(v).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// Build untyped graph values from JSON, the inverse of [`graph_to_json`].
///
/// Objects become maps, keeping `$type` as the map's wire name, so a later coercion to a
/// registered type turns them into objects. `$id`/`$ref` pairs rebuild shared and cyclic nodes.
pub struct JsonReader<'a> {
	graph: &'a mut ObjectGraph,
	ids: HashMap<u64, NodeId>,
	defined: HashSet<u64>,
}

impl<'a> JsonReader<'a> {
	/// Create a reader that appends nodes to `graph`.
	pub fn new(graph: &'a mut ObjectGraph) -> Self {
		Self {
			graph,
			ids: HashMap::new(),
			defined: HashSet::new(),
		}
	}

	/// Convert one JSON document, failing when a `$ref` has no matching `$id`.
	pub fn read(mut self, json: &serde_json::Value) -> Result<Value> {
		let value = self.value(json)?;
		if let Some(missing) = self.ids.keys().find(|id| !self.defined.contains(id)) {
			return Err(CliError::Input(format!("{REF_KEY} {missing} has no matching {ID_KEY}")));
		}
		Ok(value)
	}

	fn value(&mut self, json: &serde_json::Value) -> Result<Value> {
		Ok(match json {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(v) => Value::Bool(*v),
			serde_json::Value::Number(number) => number_value(number),
			serde_json::Value::String(text) => Value::from(text.as_str()),
			serde_json::Value::Array(items) => {
				let items = items.iter().map(|item| self.value(item)).collect::<Result<Vec<_>>>()?;
				Value::Node(self.graph.push_list(ListNode { type_name: None, items }))
			}
			serde_json::Value::Object(fields) => self.object(fields)?,
		})
	}

	fn object(&mut self, fields: &Map<String, serde_json::Value>) -> Result<Value> {
		if let Some(bytes) = fields.get(BYTES_KEY) {
			let text = bytes.as_str().ok_or_else(|| CliError::Input(format!("{BYTES_KEY} must be a hex string")))?;
			return Ok(Value::Bytes(parse_hex(text)?));
		}
		if let Some(millis) = fields.get(DATE_KEY) {
			let millis = millis.as_i64().ok_or_else(|| CliError::Input(format!("{DATE_KEY} must be an integer")))?;
			return Ok(Value::Date(millis));
		}
		if let Some(target) = fields.get(REF_KEY) {
			let target = label(target, REF_KEY)?;
			return Ok(Value::Node(self.slot(target)));
		}

		let id = match fields.get(ID_KEY) {
			Some(label_value) => {
				let label_value = label(label_value, ID_KEY)?;
				if !self.defined.insert(label_value) {
					return Err(CliError::Input(format!("{ID_KEY} {label_value} is defined twice")));
				}
				self.slot(label_value)
			}
			None => self.graph.push_list(ListNode::default()),
		};

		let type_name = match fields.get(TYPE_KEY) {
			Some(serde_json::Value::String(name)) => Some(Box::from(name.as_str())),
			Some(_) => return Err(CliError::Input(format!("{TYPE_KEY} must be a string"))),
			None => None,
		};

		let node = if let Some(items) = fields.get(ITEMS_KEY) {
			let items = items.as_array().ok_or_else(|| CliError::Input(format!("{ITEMS_KEY} must be an array")))?;
			let items = items.iter().map(|item| self.value(item)).collect::<Result<Vec<_>>>()?;
			Node::List(ListNode { type_name, items })
		} else if let Some(entries) = fields.get(ENTRIES_KEY) {
			let entries = entries.as_array().ok_or_else(|| CliError::Input(format!("{ENTRIES_KEY} must be an array")))?;
			let mut pairs = Vec::with_capacity(entries.len());
			for entry in entries {
				let [key, value] = entry.as_array().map(Vec::as_slice).unwrap_or_default() else {
					return Err(CliError::Input(format!("{ENTRIES_KEY} items must be [key, value] pairs")));
				};
				pairs.push((self.value(key)?, self.value(value)?));
			}
			Node::Map(MapNode { type_name, entries: pairs })
		} else {
			let mut entries = Vec::with_capacity(fields.len());
			for (key, value) in fields {
				if key.starts_with('$') {
					continue;
				}
				entries.push((Value::from(key.as_str()), self.value(value)?));
			}
			Node::Map(MapNode { type_name, entries })
		};

		if let Some(slot) = self.graph.node_mut(id) {
			*slot = node;
		}
		Ok(Value::Node(id))
	}

	fn slot(&mut self, label_value: u64) -> NodeId {
		if let Some(id) = self.ids.get(&label_value) {
			return *id;
		}
		let id = self.graph.push_list(ListNode::default());
		self.ids.insert(label_value, id);
		id
	}
}

fn label(value: &serde_json::Value, key: &str) -> Result<u64> {
	value.as_u64().ok_or_else(|| CliError::Input(format!("{key} must be a non-negative integer")))
}

fn number_value(number: &Number) -> Value {
	if let Some(v) = number.as_i64() {
		Value::I64(v)
	} else if let Some(v) = number.as_u64() {
		Value::U64(v)
	} else {
		Value::F64(number.as_f64().unwrap_or(f64::NAN))
	}
}

#[cfg(test)]
mod tests;
