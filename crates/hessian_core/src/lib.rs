//! Hessian 2 object marshaling: type registry, value coercion, and reference-graph codec.

#[macro_use]
extern crate tracing;

/// Wire codec, type registry, coercion engine, and object graph model.
pub mod codec;
