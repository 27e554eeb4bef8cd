use std::collections::HashSet;
use std::fmt::Write as _;
use std::time::{Duration, UNIX_EPOCH};

use hessian::codec::{Node, NodeId, ObjectGraph, Registry, Value};

/// Output truncation and formatting limits for rendered graphs.
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
	/// Maximum number of Unicode scalar values printed for strings.
	pub max_string_len: usize,
	/// Maximum number of elements or entries printed per container.
	pub max_items: usize,
	/// Maximum nesting depth before containers are elided.
	pub max_print_depth: u32,
}

impl Default for PrintOptions {
	fn default() -> Self {
		Self {
			max_string_len: 200,
			max_items: 32,
			max_print_depth: 12,
		}
	}
}

/// Render `value` as an indented text tree.
///
/// Every container is labelled `#N` with its arena index on first appearance; later
/// appearances print as `@N`. Each level of indirection prints as a leading `&`.
pub fn render_value(registry: &Registry, graph: &ObjectGraph, value: &Value, options: PrintOptions) -> String {
	let mut printer = Printer {
		registry,
		graph,
		options,
		seen: HashSet::new(),
		out: String::new(),
	};
	printer.item("", value, 0, 0);
	printer.out
}

struct Printer<'a> {
	registry: &'a Registry,
	graph: &'a ObjectGraph,
	options: PrintOptions,
	seen: HashSet<NodeId>,
	out: String,
}

impl Printer<'_> {
	fn item(&mut self, label: &str, value: &Value, indent: usize, depth: u32) {
		let pad = " ".repeat(indent);
		let refs = "&".repeat(usize::from(value.depth()));
		let base = value.deref_all();

		let Value::Node(id) = base else {
			let text = scalar(base, self.options.max_string_len);
			let _ = writeln!(self.out, "{pad}{label}{refs}{text}");
			return;
		};
		if self.seen.contains(id) {
			let _ = writeln!(self.out, "{pad}{label}{refs}@{}", id.0);
			return;
		}
		let Some(node) = self.graph.node(*id) else {
			let _ = writeln!(self.out, "{pad}{label}{refs}<missing #{}>", id.0);
			return;
		};

		let head = self.head(*id, node);
		if depth >= self.options.max_print_depth {
			let _ = writeln!(self.out, "{pad}{label}{refs}{head} {{ ... }}");
			return;
		}
		self.seen.insert(*id);

		match node {
			Node::Object(object) => {
				let _ = writeln!(self.out, "{pad}{label}{refs}{head} {{");
				for (field, value) in object.shape.fields().iter().zip(&object.fields) {
					self.item(&format!("{} = ", field.name), value, indent + 2, depth + 1);
				}
				let _ = writeln!(self.out, "{pad}}}");
			}
			Node::List(list) => {
				let _ = writeln!(self.out, "{pad}{label}{refs}{head} [");
				for item in list.items.iter().take(self.options.max_items) {
					self.item("", item, indent + 2, depth + 1);
				}
				if list.items.len() > self.options.max_items {
					let _ = writeln!(self.out, "{pad}  ... {} more", list.items.len() - self.options.max_items);
				}
				let _ = writeln!(self.out, "{pad}]");
			}
			Node::Map(map) => {
				let _ = writeln!(self.out, "{pad}{label}{refs}{head} {{");
				for (key, value) in map.entries.iter().take(self.options.max_items) {
					let key = self.key(key);
					self.item(&format!("{key} => "), value, indent + 2, depth + 1);
				}
				if map.entries.len() > self.options.max_items {
					let _ = writeln!(self.out, "{pad}  ... {} more", map.entries.len() - self.options.max_items);
				}
				let _ = writeln!(self.out, "{pad}}}");
			}
		}
	}

	fn head(&self, id: NodeId, node: &Node) -> String {
		match node {
			Node::Object(object) => match self.registry.name_of(&object.shape) {
				Ok(name) => format!("{name} #{}", id.0),
				Err(_) => format!("<unregistered> #{}", id.0),
			},
			Node::List(list) => match &list.type_name {
				Some(name) => format!("list({name}) #{}", id.0),
				None => format!("list #{}", id.0),
			},
			Node::Map(map) => match &map.type_name {
				Some(name) => format!("map({name}) #{}", id.0),
				None => format!("map #{}", id.0),
			},
		}
	}

	fn key(&self, key: &Value) -> String {
		match key.as_node() {
			Some(id) => format!("#{}", id.0),
			None => scalar(key.deref_all(), self.options.max_string_len),
		}
	}
}

fn scalar(value: &Value, max_string_len: usize) -> String {
	match value {
		Value::Null => "null".to_owned(),
		Value::Bool(v) => v.to_string(),
		Value::I64(v) => v.to_string(),
		Value::U64(v) => v.to_string(),
		Value::F32(v) => v.to_string(),
		Value::F64(v) => v.to_string(),
		Value::String(text) => format!("\"{}\"", truncate(text, max_string_len)),
		Value::Bytes(bytes) => format!("bytes[{}]", bytes.len()),
		Value::Date(millis) => format_date(*millis),
		Value::Ptr(inner) => scalar(inner, max_string_len),
		Value::Node(id) => format!("@{}", id.0),
	}
}

/// Render epoch milliseconds as RFC 3339, falling back to the raw count before 1970.
pub fn format_date(millis: i64) -> String {
	match u64::try_from(millis) {
		Ok(millis) => {
			let time = UNIX_EPOCH + Duration::from_millis(millis);
			format!("date({})", humantime::format_rfc3339_millis(time))
		}
		Err(_) => format!("date({millis}ms)"),
	}
}

fn truncate(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_owned();
	}
	let mut out: String = text.chars().take(max_chars).collect();
	out.push_str("...");
	out
}
