use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Coarse error taxonomy shared by every codec operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Type name or shape is not registered.
	UnknownType,
	/// Conflicting registration for an existing type name.
	DuplicateType,
	/// Decoded value and destination type are fundamentally incompatible.
	TypeMismatch,
	/// Compound field arity or order does not match the registered shape.
	ShapeMismatch,
	/// Truncated input, unknown tag, bad back-reference, or a decode limit hit.
	MalformedStream,
	/// Caller-provided input outside the wire stream was invalid.
	InvalidInput,
	/// Filesystem, stream, or decompression failure.
	Io,
}

/// Errors produced while registering, coercing, encoding, and decoding values.
#[derive(Debug, Error)]
pub enum CodecError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// No type is registered under this wire name.
	#[error("unknown type: {name}")]
	UnknownType {
		/// Requested wire type name.
		name: String,
	},
	/// Shape was never registered, so no wire name exists for it.
	#[error("shape with {fields} fields is not registered")]
	UnregisteredShape {
		/// Field count of the offending shape.
		fields: usize,
	},
	/// Wire name is already bound to a different shape.
	#[error("type {name} already registered with a different shape")]
	DuplicateType {
		/// Conflicting wire type name.
		name: String,
	},
	/// Value kind cannot be converted into the destination type.
	#[error("type mismatch: expected {expected}, got {got}")]
	TypeMismatch {
		/// Destination type rendered as a type expression.
		expected: String,
		/// Logical kind of the offending value.
		got: &'static str,
	},
	/// Compound value does not line up with the registered shape.
	#[error("shape mismatch for {type_name}: {detail}")]
	ShapeMismatch {
		/// Wire type name of the compound.
		type_name: String,
		/// Human-readable description of the mismatch.
		detail: String,
	},
	/// Not enough bytes remained for a requested read.
	#[error("unexpected eof at offset {at}, need {need} bytes, remaining {rem}")]
	UnexpectedEof {
		/// Byte offset where the read was attempted.
		at: usize,
		/// Requested bytes.
		need: usize,
		/// Bytes still available.
		rem: usize,
	},
	/// Tag byte outside the known tag space.
	#[error("unknown tag 0x{tag:02x} at offset {at}")]
	UnknownTag {
		/// Offending tag byte.
		tag: u8,
		/// Offset of the tag.
		at: usize,
	},
	/// Known tag in a position where another production was required.
	#[error("unexpected tag 0x{tag:02x} at offset {at}, expected {expected}")]
	UnexpectedTag {
		/// Offending tag byte.
		tag: u8,
		/// Offset of the tag.
		at: usize,
		/// Production the decoder was looking for.
		expected: &'static str,
	},
	/// Back-reference index beyond the values seen so far.
	#[error("back-reference {index} out of range at offset {at} (seen {seen})")]
	BadReference {
		/// Referenced position.
		index: i64,
		/// Number of values in the reference table.
		seen: usize,
		/// Offset of the reference tag.
		at: usize,
	},
	/// Object instance points at a class definition that was never sent.
	#[error("class definition {index} out of range at offset {at} (defined {defined})")]
	BadClassReference {
		/// Referenced class definition index.
		index: i64,
		/// Number of class definitions seen.
		defined: usize,
		/// Offset of the instance tag.
		at: usize,
	},
	/// Typed list or map points at a type name that was never sent.
	#[error("type reference {index} out of range at offset {at} (defined {defined})")]
	BadTypeReference {
		/// Referenced type index.
		index: i64,
		/// Number of type names seen.
		defined: usize,
		/// Offset of the type reference.
		at: usize,
	},
	/// Length prefix was negative.
	#[error("negative length {len} at offset {at}")]
	NegativeLength {
		/// Parsed signed length.
		len: i64,
		/// Offset of the length prefix.
		at: usize,
	},
	/// String payload is not valid UTF-8.
	#[error("invalid utf-8 in string at offset {at}")]
	InvalidUtf8 {
		/// Offset of the first invalid byte.
		at: usize,
	},
	/// Input continued after the root value in strict mode.
	#[error("trailing bytes after root value at offset {at}: {rem}")]
	TrailingBytes {
		/// Offset where the root value ended.
		at: usize,
		/// Remaining unread bytes.
		rem: usize,
	},
	/// Nesting exceeded the configured limit.
	#[error("decode depth exceeded (max={max_depth})")]
	DepthExceeded {
		/// Configured depth ceiling.
		max_depth: u32,
	},
	/// Declared length exceeded the configured limit.
	#[error("length {len} exceeds limit {max}")]
	LengthTooLarge {
		/// Declared length.
		len: usize,
		/// Maximum permitted length.
		max: usize,
	},
	/// A placeholder survived the decode pass.
	#[error("unresolved reference to node {node}")]
	UnresolvedReference {
		/// Arena index of the unfinished node.
		node: u32,
	},
	/// Type expression could not be parsed.
	#[error("invalid type expression: {expr}")]
	InvalidTypeExpr {
		/// Original expression text.
		expr: String,
	},
	/// Value handle points outside the graph arena.
	#[error("node {node} not found in graph")]
	MissingNode {
		/// Arena index of the missing node.
		node: u32,
	},
	/// Slot does not exist on the targeted node.
	#[error("slot {slot} is not writable on a {node} node")]
	InvalidSlot {
		/// Slot kind label.
		slot: &'static str,
		/// Node kind label.
		node: &'static str,
	},
	/// Decompression output exceeded configured safety limit.
	#[error("decompressed output exceeded limit {limit} bytes")]
	DecompressedTooLarge {
		/// Maximum allowed output bytes.
		limit: usize,
	},
}

impl CodecError {
	/// Map this error onto the coarse codec taxonomy.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::UnknownType { .. } | Self::UnregisteredShape { .. } => ErrorKind::UnknownType,
			Self::DuplicateType { .. } => ErrorKind::DuplicateType,
			Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
			Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
			Self::UnexpectedEof { .. }
			| Self::UnknownTag { .. }
			| Self::UnexpectedTag { .. }
			| Self::BadReference { .. }
			| Self::BadClassReference { .. }
			| Self::BadTypeReference { .. }
			| Self::NegativeLength { .. }
			| Self::InvalidUtf8 { .. }
			| Self::TrailingBytes { .. }
			| Self::DepthExceeded { .. }
			| Self::LengthTooLarge { .. }
			| Self::UnresolvedReference { .. } => ErrorKind::MalformedStream,
			Self::InvalidTypeExpr { .. } | Self::MissingNode { .. } | Self::InvalidSlot { .. } => ErrorKind::InvalidInput,
			Self::Io(_) | Self::DecompressedTooLarge { .. } => ErrorKind::Io,
		}
	}
}
