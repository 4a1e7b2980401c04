//! Global hook registries.

use parking_lot::Mutex;
use reinhardt_routes::{GuardError, ResolvedRoute};
use std::fmt;
use std::sync::{Arc, Weak};

/// Hook run after every committed navigation. Receives `(to, from)`.
pub type AfterHook = Arc<dyn Fn(&ResolvedRoute, &ResolvedRoute) + Send + Sync>;

/// Handler for errors raised inside guards.
pub type ErrorHandler = Arc<dyn Fn(&GuardError) + Send + Sync>;

struct Entries<T> {
	next: u64,
	items: Vec<(u64, T)>,
}

/// Ordered list of hooks that can be unregistered individually.
pub(crate) struct HookRegistry<T> {
	entries: Arc<Mutex<Entries<T>>>,
}

impl<T: Clone + Send + 'static> HookRegistry<T> {
	pub(crate) fn new() -> Self {
		Self {
			entries: Arc::new(Mutex::new(Entries {
				next: 0,
				items: Vec::new(),
			})),
		}
	}

	pub(crate) fn register(&self, hook: T) -> HookHandle {
		let id = {
			let mut entries = self.entries.lock();
			let id = entries.next;
			entries.next += 1;
			entries.items.push((id, hook));
			id
		};

		let weak: Weak<Mutex<Entries<T>>> = Arc::downgrade(&self.entries);
		HookHandle {
			remove: Arc::new(move || {
				if let Some(entries) = weak.upgrade() {
					entries.lock().items.retain(|(entry, _)| *entry != id);
				}
			}),
		}
	}

	/// Snapshot in registration order.
	pub(crate) fn snapshot(&self) -> Vec<T> {
		self.entries
			.lock()
			.items
			.iter()
			.map(|(_, hook)| hook.clone())
			.collect()
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.entries.lock().items.is_empty()
	}
}

impl<T> fmt::Debug for HookRegistry<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HookRegistry")
			.field("len", &self.entries.lock().items.len())
			.finish()
	}
}

/// Unregisters a hook. Dropping the handle keeps the hook registered.
#[derive(Clone)]
pub struct HookHandle {
	remove: Arc<dyn Fn() + Send + Sync>,
}

impl HookHandle {
	/// Removes the hook. Calling this more than once is harmless.
	pub fn unregister(&self) {
		(self.remove)();
	}
}

impl fmt::Debug for HookHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HookHandle").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_registration_order_and_unregister() {
		let registry = HookRegistry::new();
		let _first = registry.register("first");
		let second = registry.register("second");
		let _third = registry.register("third");

		second.unregister();
		second.unregister();

		assert_eq!(registry.snapshot(), vec!["first", "third"]);
	}

	#[rstest]
	fn test_handle_outlives_registry() {
		let registry = HookRegistry::new();
		let handle = registry.register(1);
		drop(registry);
		handle.unregister();
	}

	#[rstest]
	fn test_is_empty() {
		let registry = HookRegistry::new();
		assert!(registry.is_empty());
		let handle = registry.register(());
		assert!(!registry.is_empty());
		handle.unregister();
		assert!(registry.is_empty());
	}
}
