use std::fmt;

use crate::codec::{CodecError, Result};

/// Base kind a destination slot declares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
	/// Accepts any value unchanged.
	Any,
	/// Boolean.
	Bool,
	/// Signed 8-bit integer.
	I8,
	/// Signed 16-bit integer.
	I16,
	/// Signed 32-bit integer.
	I32,
	/// Signed 64-bit integer.
	I64,
	/// Unsigned 8-bit integer.
	U8,
	/// Unsigned 16-bit integer.
	U16,
	/// Unsigned 32-bit integer.
	U32,
	/// Unsigned 64-bit integer.
	U64,
	/// 32-bit float.
	F32,
	/// 64-bit float.
	F64,
	/// UTF-8 text.
	String,
	/// Raw byte sequence.
	Bytes,
	/// Milliseconds since the Unix epoch.
	Date,
	/// Sequence with a declared element type.
	List(Box<TypeDesc>),
	/// Mapping with declared key and value types.
	Map(Box<TypeDesc>, Box<TypeDesc>),
	/// Registered compound type, by wire name.
	Object(Box<str>),
}

impl Kind {
	/// Return whether this is an integer or float kind.
	pub fn is_numeric(&self) -> bool {
		self.is_integer() || matches!(self, Self::F32 | Self::F64)
	}

	/// Return whether this is a signed or unsigned integer kind.
	pub fn is_integer(&self) -> bool {
		matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::U8 | Self::U16 | Self::U32 | Self::U64)
	}
}

/// Destination type: a base kind plus indirection depth.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDesc {
	/// Base kind once all indirection is stripped.
	pub kind: Kind,
	/// Number of reference levels above the base kind.
	pub depth: u8,
}

/// Shared `any` descriptor.
pub static ANY_TYPE: TypeDesc = TypeDesc { kind: Kind::Any, depth: 0 };

impl TypeDesc {
	/// Descriptor with no indirection.
	pub fn new(kind: Kind) -> Self {
		Self { kind, depth: 0 }
	}

	/// `any` descriptor.
	pub fn any() -> Self {
		Self::new(Kind::Any)
	}

	/// `list<elem>` descriptor.
	pub fn list(elem: TypeDesc) -> Self {
		Self::new(Kind::List(Box::new(elem)))
	}

	/// `map<key,value>` descriptor.
	pub fn map(key: TypeDesc, value: TypeDesc) -> Self {
		Self::new(Kind::Map(Box::new(key), Box::new(value)))
	}

	/// Compound descriptor for a registered wire name.
	pub fn object(name: &str) -> Self {
		Self::new(Kind::Object(name.into()))
	}

	/// Add one level of indirection.
	pub fn ptr(mut self) -> Self {
		self.depth = self.depth.saturating_add(1);
		self
	}

	/// Replace the indirection depth.
	pub fn with_depth(mut self, depth: u8) -> Self {
		self.depth = depth;
		self
	}

	/// Return whether values pass through without conversion.
	pub fn is_any(&self) -> bool {
		self.depth == 0 && self.kind == Kind::Any
	}

	/// Parse a type expression such as `**i32`, `list<string>` or `map<string,any>`.
	pub fn parse(expr: &str) -> Result<Self> {
		parse_type(expr.trim()).ok_or_else(|| CodecError::InvalidTypeExpr { expr: expr.to_owned() })
	}
}

impl From<Kind> for TypeDesc {
	fn from(kind: Kind) -> Self {
		Self::new(kind)
	}
}

impl fmt::Display for TypeDesc {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for _ in 0..self.depth {
			f.write_str("*")?;
		}
		match &self.kind {
			Kind::Any => f.write_str("any"),
			Kind::Bool => f.write_str("bool"),
			Kind::I8 => f.write_str("i8"),
			Kind::I16 => f.write_str("i16"),
			Kind::I32 => f.write_str("i32"),
			Kind::I64 => f.write_str("i64"),
			Kind::U8 => f.write_str("u8"),
			Kind::U16 => f.write_str("u16"),
			Kind::U32 => f.write_str("u32"),
			Kind::U64 => f.write_str("u64"),
			Kind::F32 => f.write_str("f32"),
			Kind::F64 => f.write_str("f64"),
			Kind::String => f.write_str("string"),
			Kind::Bytes => f.write_str("bytes"),
			Kind::Date => f.write_str("date"),
			Kind::List(elem) => write!(f, "list<{elem}>"),
			Kind::Map(key, value) => write!(f, "map<{key},{value}>"),
			Kind::Object(name) => f.write_str(name),
		}
	}
}

/// One declared field of a compound shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDef {
	/// Wire-visible field name.
	pub name: Box<str>,
	/// Declared destination type.
	pub ty: TypeDesc,
}

/// Ordered field layout of a compound type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Shape {
	fields: Vec<FieldDef>,
}

impl Shape {
	/// Build a shape from an ordered field list.
	pub fn new(fields: Vec<FieldDef>) -> Self {
		Self { fields }
	}

	/// Start an empty builder.
	pub fn builder() -> ShapeBuilder {
		ShapeBuilder::default()
	}

	/// Return declared fields in wire order.
	pub fn fields(&self) -> &[FieldDef] {
		&self.fields
	}

	/// Return number of declared fields.
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	/// Return whether the shape has no fields.
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Return position of a field by name.
	pub fn field_index(&self, name: &str) -> Option<usize> {
		self.fields.iter().position(|field| field.name.as_ref() == name)
	}

	/// Return a field declaration by name.
	pub fn field(&self, name: &str) -> Option<&FieldDef> {
		self.fields.iter().find(|field| field.name.as_ref() == name)
	}

	/// Return whether field names and order match another shape.
	pub fn same_layout(&self, other: &Shape) -> bool {
		self.fields.len() == other.fields.len() && self.fields.iter().zip(&other.fields).all(|(left, right)| left.name == right.name)
	}
}

/// Incremental [`Shape`] construction.
#[derive(Debug, Default)]
pub struct ShapeBuilder {
	fields: Vec<FieldDef>,
}

impl ShapeBuilder {
	/// Append a field with a typed descriptor.
	pub fn field(mut self, name: &str, ty: TypeDesc) -> Self {
		self.fields.push(FieldDef { name: name.into(), ty });
		self
	}

	/// Append a field with a textual type expression.
	pub fn field_expr(self, name: &str, expr: &str) -> Result<Self> {
		let ty = TypeDesc::parse(expr)?;
		Ok(self.field(name, ty))
	}

	/// Finish the shape.
	pub fn build(self) -> Shape {
		Shape { fields: self.fields }
	}
}

fn parse_type(expr: &str) -> Option<TypeDesc> {
	let stars = expr.chars().take_while(|c| *c == '*').count();
	let depth = u8::try_from(stars).ok()?;
	let kind = parse_kind(expr[stars..].trim())?;
	Some(TypeDesc { kind, depth })
}

fn parse_kind(base: &str) -> Option<Kind> {
	if let Some(inner) = generic_args(base, "list") {
		return Some(Kind::List(Box::new(parse_type(inner.trim())?)));
	}

	if let Some(inner) = generic_args(base, "map") {
		let split = top_level_comma(inner)?;
		let key = parse_type(inner[..split].trim())?;
		let value = parse_type(inner[split + 1..].trim())?;
		return Some(Kind::Map(Box::new(key), Box::new(value)));
	}

	let kind = match base {
		"any" => Kind::Any,
		"bool" => Kind::Bool,
		"i8" => Kind::I8,
		"i16" => Kind::I16,
		"i32" => Kind::I32,
		"i64" => Kind::I64,
		"u8" => Kind::U8,
		"u16" => Kind::U16,
		"u32" => Kind::U32,
		"u64" => Kind::U64,
		"f32" => Kind::F32,
		"f64" => Kind::F64,
		"string" => Kind::String,
		"bytes" => Kind::Bytes,
		"date" => Kind::Date,
		name if is_type_name(name) => Kind::Object(name.into()),
		_ => return None,
	};
	Some(kind)
}

fn generic_args<'a>(base: &'a str, head: &str) -> Option<&'a str> {
	base.strip_prefix(head)?.trim_start().strip_prefix('<')?.strip_suffix('>')
}

fn top_level_comma(inner: &str) -> Option<usize> {
	let mut nesting = 0_usize;
	for (idx, ch) in inner.char_indices() {
		match ch {
			'<' => nesting += 1,
			'>' => nesting = nesting.checked_sub(1)?,
			',' if nesting == 0 => return Some(idx),
			_ => {}
		}
	}
	None
}

fn is_type_name(name: &str) -> bool {
	let mut chars = name.chars();
	let Some(first) = chars.next() else {
		return false;
	};
	(first.is_alphabetic() || first == '_' || first == '$') && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.'))
}
