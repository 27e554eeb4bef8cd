use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::codec::ObjectGraph;

/// Default number of idle graphs retained per key.
pub const DEFAULT_PER_KEY: usize = 8;

/// Free list of cleared graphs keyed by request-shape name.
///
/// Callers take a graph with [`GraphPool::acquire`], decode into it, and hand it back with
/// [`GraphPool::release`]. Nothing is reclaimed implicitly.
#[derive(Debug)]
pub struct GraphPool {
	free: Mutex<HashMap<Box<str>, Vec<ObjectGraph>>>,
	per_key: usize,
	hits: AtomicU64,
	misses: AtomicU64,
}

/// Counters describing pool reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
	/// Acquisitions served from the free list.
	pub hits: u64,
	/// Acquisitions that allocated a fresh graph.
	pub misses: u64,
	/// Graphs currently idle across all keys.
	pub idle: usize,
}

impl Default for GraphPool {
	fn default() -> Self {
		Self::new(DEFAULT_PER_KEY)
	}
}

impl GraphPool {
	/// Create a pool retaining at most `per_key` idle graphs for each key.
	pub fn new(per_key: usize) -> Self {
		Self {
			free: Mutex::new(HashMap::new()),
			per_key,
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
		}
	}

	/// Take an empty graph for `key`, reusing a released one when available.
	pub fn acquire(&self, key: &str) -> ObjectGraph {
		let reused = self.free.lock().get_mut(key).and_then(Vec::pop);
		match reused {
			Some(graph) => {
				self.hits.fetch_add(1, Ordering::Relaxed);
				graph
			}
			None => {
				self.misses.fetch_add(1, Ordering::Relaxed);
				ObjectGraph::new()
			}
		}
	}

	/// Clear `graph` and keep it for the next [`GraphPool::acquire`] of `key`.
	///
	/// Returns `false` when the key is already at capacity and the graph was dropped.
	pub fn release(&self, key: &str, mut graph: ObjectGraph) -> bool {
		graph.clear();
		let mut free = self.free.lock();
		let slot = free.entry(Box::from(key)).or_default();
		if slot.len() >= self.per_key {
			trace!(key, "graph pool full, dropping graph");
			return false;
		}
		slot.push(graph);
		true
	}

	/// Return number of idle graphs held for `key`.
	pub fn idle(&self, key: &str) -> usize {
		self.free.lock().get(key).map_or(0, Vec::len)
	}

	/// Snapshot reuse counters.
	pub fn stats(&self) -> PoolStats {
		PoolStats {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			idle: self.free.lock().values().map(Vec::len).sum(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::GraphPool;
	use crate::codec::{ListNode, Value};

	#[test]
	fn released_graphs_come_back_cleared() {
		let pool = GraphPool::new(2);
		let mut graph = pool.acquire("req");
		let id = graph.push_list(ListNode::default());
		graph.set_root(Value::Node(id));
		assert!(pool.release("req", graph));
		assert_eq!(pool.idle("req"), 1);

		let graph = pool.acquire("req");
		assert!(graph.is_empty());
		assert_eq!(graph.root(), &Value::Null);

		let stats = pool.stats();
		assert_eq!((stats.hits, stats.misses, stats.idle), (1, 1, 0));
	}

	#[test]
	fn keys_are_isolated_and_capped() {
		let pool = GraphPool::new(1);
		assert!(pool.release("a", pool.acquire("a")));
		assert!(!pool.release("a", pool.acquire("b")));
		assert_eq!(pool.idle("a"), 1);
		assert_eq!(pool.idle("b"), 0);
	}
}
