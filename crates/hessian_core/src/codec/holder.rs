use crate::codec::{Slot, TypeDesc, Value};

/// Destination waiting on a value that is still being decoded.
#[derive(Debug, Clone)]
pub(crate) struct Pending {
	pub slot: Slot,
	pub ty: TypeDesc,
}

/// A slot that moved while its node was rebuilt, such as a map entry that became an object field.
#[derive(Debug, Clone)]
pub(crate) struct Relocation {
	pub from: Slot,
	pub to: Slot,
	pub ty: TypeDesc,
}

impl Pending {
	/// Follow `moves` if this destination's slot was one of them.
	pub fn relocate(&mut self, moves: &[Relocation]) {
		if let Some(moved) = moves.iter().find(|moved| moved.from == self.slot) {
			self.slot = moved.to;
			self.ty = moved.ty.clone();
		}
	}
}

/// Deferred-assignment record for one container node.
///
/// Destinations that reference the node before it is complete are queued and drained in
/// registration order once the node finishes. After that, new destinations are answered
/// immediately.
#[derive(Debug, Default)]
pub(crate) struct RefHolder {
	value: Option<Value>,
	pending: Vec<Pending>,
	resolved: bool,
}

impl RefHolder {
	/// Queue `slot`, or hand back the final value when already resolved.
	pub fn defer(&mut self, slot: Slot, ty: &TypeDesc) -> Option<Value> {
		if self.resolved {
			return self.value.clone();
		}
		self.pending.push(Pending { slot, ty: ty.clone() });
		None
	}

	/// Record the final value and return queued destinations in FIFO order.
	pub fn resolve(&mut self, value: Value) -> Vec<Pending> {
		self.value = Some(value);
		self.resolved = true;
		std::mem::take(&mut self.pending)
	}

	/// Point queued destinations at their new slots.
	pub fn relocate(&mut self, moves: &[Relocation]) {
		for pending in &mut self.pending {
			pending.relocate(moves);
		}
	}

	/// Return whether the final value is known.
	pub fn is_resolved(&self) -> bool {
		self.resolved
	}

	/// Return number of queued destinations.
	#[cfg(test)]
	pub fn pending_len(&self) -> usize {
		self.pending.len()
	}
}

#[cfg(test)]
mod tests {
	use super::{RefHolder, Relocation};
	use crate::codec::{Kind, NodeId, Slot, TypeDesc, Value};

	#[test]
	fn queues_until_resolved_then_answers_immediately() {
		let mut holder = RefHolder::default();
		let ty = TypeDesc::any();
		let first = Slot::Field { node: NodeId(0), index: 0 };
		let second = Slot::Element { node: NodeId(1), index: 3 };

		assert!(holder.defer(first, &ty).is_none());
		assert!(holder.defer(second, &ty).is_none());
		assert_eq!(holder.pending_len(), 2);

		let drained = holder.resolve(Value::Node(NodeId(0)));
		let slots: Vec<_> = drained.iter().map(|pending| pending.slot).collect();
		assert_eq!(slots, vec![first, second]);
		assert!(holder.is_resolved());

		let late = holder.defer(Slot::Root, &ty);
		assert_eq!(late, Some(Value::Node(NodeId(0))));
		assert_eq!(holder.pending_len(), 0);
	}

	#[test]
	fn relocation_moves_matching_destinations_only() {
		let mut holder = RefHolder::default();
		let entry = Slot::Entry { node: NodeId(2), index: 0 };
		let other = Slot::Entry { node: NodeId(2), index: 1 };
		holder.defer(entry, &TypeDesc::any());
		holder.defer(other, &TypeDesc::any());

		let field = Slot::Field { node: NodeId(2), index: 3 };
		holder.relocate(&[Relocation {
			from: entry,
			to: field,
			ty: TypeDesc::new(Kind::String),
		}]);

		let drained = holder.resolve(Value::Null);
		assert_eq!(drained[0].slot, field);
		assert_eq!(drained[0].ty, TypeDesc::new(Kind::String));
		assert_eq!(drained[1].slot, other);
	}
}
