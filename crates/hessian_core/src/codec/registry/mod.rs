use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::codec::{CodecError, Result, Shape};

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Wire type name to shape mapping, and the inverse used for encoding.
///
/// Registration is expected to happen at startup; lookups may run concurrently from any
/// number of encode/decode calls afterwards. Entries are never removed.
#[derive(Debug, Default)]
pub struct Registry {
	inner: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
	by_name: HashMap<Box<str>, Arc<Shape>>,
	// Keyed by `Arc` address; registered shapes live as long as the registry.
	by_identity: HashMap<usize, Arc<str>>,
	order: Vec<(Arc<str>, Arc<Shape>)>,
}

impl Registry {
	/// Create an empty, independent registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Return the process-wide registry.
	pub fn global() -> &'static Registry {
		GLOBAL.get_or_init(Registry::new)
	}

	/// Register `shape` under `name`, returning the stored shape handle.
	///
	/// Re-registering an identical shape is a no-op that returns the existing handle.
	pub fn register(&self, name: &str, shape: Shape) -> Result<Arc<Shape>> {
		validate_shape(name, &shape)?;

		if let Some(existing) = self.inner.read().by_name.get(name) {
			return check_same(name, existing, &shape);
		}

		let shape = Arc::new(shape);
		let mut tables = self.inner.write();
		if let Some(existing) = tables.by_name.get(name) {
			return check_same(name, existing, &shape);
		}

		let name: Arc<str> = Arc::from(name);
		tables.by_name.insert(Box::from(name.as_ref()), shape.clone());
		tables.by_identity.insert(shape_addr(&shape), name.clone());
		tables.order.push((name.clone(), shape.clone()));
		debug!(type_name = %name, fields = shape.len(), "registered type");
		Ok(shape)
	}

	/// Look up the shape registered under `name`.
	pub fn resolve(&self, name: &str) -> Result<Arc<Shape>> {
		self.inner
			.read()
			.by_name
			.get(name)
			.cloned()
			.ok_or_else(|| CodecError::UnknownType { name: name.to_owned() })
	}

	/// Return the wire name for a shape.
	///
	/// Handles returned by [`Registry::register`] or [`Registry::resolve`] resolve by identity.
	/// Other shapes fall back to structural equality, first registration wins.
	pub fn name_of(&self, shape: &Arc<Shape>) -> Result<Arc<str>> {
		let tables = self.inner.read();
		if let Some(name) = tables.by_identity.get(&shape_addr(shape)) {
			return Ok(name.clone());
		}

		tables
			.order
			.iter()
			.find(|(_, candidate)| candidate.as_ref() == shape.as_ref())
			.map(|(name, _)| name.clone())
			.ok_or(CodecError::UnregisteredShape { fields: shape.len() })
	}

	/// Return whether `name` is registered.
	pub fn contains(&self, name: &str) -> bool {
		self.inner.read().by_name.contains_key(name)
	}

	/// Return number of registered types.
	pub fn len(&self) -> usize {
		self.inner.read().order.len()
	}

	/// Return whether no types are registered.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Return a sorted snapshot of registered wire names.
	pub fn names(&self) -> Vec<Arc<str>> {
		let mut names: Vec<_> = self.inner.read().order.iter().map(|(name, _)| name.clone()).collect();
		names.sort();
		names
	}
}

fn check_same(name: &str, existing: &Arc<Shape>, shape: &Shape) -> Result<Arc<Shape>> {
	if existing.as_ref() == shape {
		trace!(type_name = name, "identical re-registration ignored");
		return Ok(existing.clone());
	}
	Err(CodecError::DuplicateType { name: name.to_owned() })
}

fn validate_shape(name: &str, shape: &Shape) -> Result<()> {
	for (idx, field) in shape.fields().iter().enumerate() {
		if shape.fields()[..idx].iter().any(|earlier| earlier.name == field.name) {
			return Err(CodecError::ShapeMismatch {
				type_name: name.to_owned(),
				detail: format!("duplicate field `{}`", field.name),
			});
		}
	}
	Ok(())
}

fn shape_addr(shape: &Arc<Shape>) -> usize {
	Arc::as_ptr(shape) as usize
}
