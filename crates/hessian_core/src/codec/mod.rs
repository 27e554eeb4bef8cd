mod bytes;
mod coerce;
mod compression;
mod decode;
mod encode;
mod error;
mod graph;
mod holder;
mod pool;
mod registry;
mod schema;
mod tag;
mod value;

/// Destination-type coercion entry point.
pub use coerce::coerce;
/// Compression detection result and payload helpers.
pub use compression::{Compression, ZSTD_MAGIC, decode_payload_bytes, decode_payload_bytes_with_limit};
/// Hessian decoding entry points and options.
pub use decode::{DecodeOptions, Decoder, decode, decode_as, decode_into, decode_with};
/// Hessian encoding entry points.
pub use encode::{Encoder, MAX_ENCODE_DEPTH, encode};
/// Error and result aliases.
pub use error::{CodecError, ErrorKind, Result};
/// Node arena and writable slots.
pub use graph::{ObjectGraph, Slot};
/// Reusable graph free list.
pub use pool::{DEFAULT_PER_KEY, GraphPool, PoolStats};
/// Wire type name registry.
pub use registry::Registry;
/// Type descriptors and registered shapes.
pub use schema::{ANY_TYPE, FieldDef, Kind, Shape, ShapeBuilder, TypeDesc};
/// Decoded runtime value types.
pub use value::{ListNode, MapNode, Node, NodeId, ObjectNode, Value};
