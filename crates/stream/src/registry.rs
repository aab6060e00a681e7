//! Process-wide mapping from native stream identifiers to live bridge entries.
//!
//! The engine only carries an opaque pointer for each counterpart object, so
//! every callback has to resolve that pointer back to the Rust instance
//! through this table. Lookup is the hot path and takes a read lock; insert
//! and remove happen once per stream lifetime.

use std::collections::hash_map::Entry;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::stream::StreamEntry;

/// Concurrent identifier-to-value table.
pub(crate) struct HandleRegistry<V> {
	inner: RwLock<FxHashMap<usize, V>>,
}

impl<V> Default for HandleRegistry<V> {
	fn default() -> Self {
		Self {
			inner: RwLock::new(FxHashMap::default()),
		}
	}
}

impl<V: Clone> HandleRegistry<V> {
	/// Inserts a new live entry.
	///
	/// Panics if the identifier is already registered: the engine handed out
	/// the same counterpart pointer for two live streams, which breaks every
	/// dispatch guarantee downstream.
	pub(crate) fn insert(&self, id: usize, value: V) {
		match self.inner.write().entry(id) {
			Entry::Occupied(_) => panic!("native stream identifier {id:#x} registered twice"),
			Entry::Vacant(slot) => {
				slot.insert(value);
			}
		}
	}

	/// Looks up a live entry.
	pub(crate) fn get(&self, id: usize) -> Option<V> {
		self.inner.read().get(&id).cloned()
	}

	/// Removes an entry, returning it if it was still registered.
	pub(crate) fn remove(&self, id: usize) -> Option<V> {
		self.inner.write().remove(&id)
	}
}

static REGISTRY: LazyLock<HandleRegistry<Arc<StreamEntry>>> = LazyLock::new(HandleRegistry::default);

/// The process-wide stream registry.
pub(crate) fn registry() -> &'static HandleRegistry<Arc<StreamEntry>> {
	&REGISTRY
}
