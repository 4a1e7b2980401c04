//! In-memory history for hosts without a URL.

use crate::{History, HistoryError, HistoryListener, HistoryMode, ListenerId, Subscriptions};
use parking_lot::Mutex;

#[derive(Debug)]
struct MemoryStack {
	entries: Vec<String>,
	index: usize,
}

/// History kept as a stack of locations and a cursor.
#[derive(Debug)]
pub struct MemoryHistory {
	stack: Mutex<MemoryStack>,
	listeners: Subscriptions<HistoryListener>,
}

impl MemoryHistory {
	/// Creates a memory history whose only entry is `initial`.
	pub fn new(initial: impl Into<String>) -> Self {
		Self {
			stack: Mutex::new(MemoryStack {
				entries: vec![initial.into()],
				index: 0,
			}),
			listeners: Subscriptions::default(),
		}
	}

	/// Returns every entry.
	pub fn entries(&self) -> Vec<String> {
		self.stack.lock().entries.clone()
	}

	/// Returns the cursor position.
	pub fn index(&self) -> usize {
		self.stack.lock().index
	}
}

impl Default for MemoryHistory {
	fn default() -> Self {
		Self::new("/")
	}
}

impl History for MemoryHistory {
	fn mode(&self) -> HistoryMode {
		HistoryMode::Memory
	}

	fn base(&self) -> &str {
		""
	}

	fn current_location(&self) -> String {
		let stack = self.stack.lock();
		stack.entries[stack.index].clone()
	}

	fn push(&self, location: &str) -> Result<(), HistoryError> {
		self.listeners.ensure_active()?;
		let mut stack = self.stack.lock();
		let keep = stack.index + 1;
		stack.entries.truncate(keep);
		stack.entries.push(location.to_string());
		stack.index += 1;
		Ok(())
	}

	fn replace(&self, location: &str) -> Result<(), HistoryError> {
		self.listeners.ensure_active()?;
		let mut stack = self.stack.lock();
		let index = stack.index;
		stack.entries[index] = location.to_string();
		Ok(())
	}

	fn go(&self, delta: i64) {
		let location = {
			let mut stack = self.stack.lock();
			let target = stack.index as i64 + delta;
			if delta == 0 || target < 0 || target >= stack.entries.len() as i64 {
				return;
			}
			stack.index = target as usize;
			stack.entries[stack.index].clone()
		};

		for listener in self.listeners.items() {
			listener(location.clone());
		}
	}

	fn listen(&self, listener: HistoryListener) -> ListenerId {
		self.listeners.add(listener)
	}

	fn unlisten(&self, id: ListenerId) {
		self.listeners.remove(id);
	}

	fn href(&self, full_path: &str) -> String {
		full_path.to_string()
	}

	fn teardown(&self) {
		self.listeners.drain();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::Arc;

	#[rstest]
	fn test_push_replace_and_truncate() {
		let history = MemoryHistory::default();
		history.push("/a").unwrap();
		history.push("/b").unwrap();
		history.go(-1);
		history.push("/c").unwrap();
		history.replace("/d").unwrap();

		assert_eq!(history.entries(), vec!["/", "/a", "/d"]);
		assert_eq!(history.current_location(), "/d");
	}

	#[rstest]
	#[case(-1, 1)]
	#[case(-2, 0)]
	#[case(-3, 2)]
	#[case(1, 2)]
	fn test_go_moves_cursor_within_bounds(#[case] delta: i64, #[case] expected: usize) {
		let history = MemoryHistory::default();
		history.push("/a").unwrap();
		history.push("/b").unwrap();

		history.go(delta);

		assert_eq!(history.index(), expected);
	}

	#[rstest]
	fn test_go_notifies_listeners() {
		let history = MemoryHistory::new("/start");
		history.push("/next").unwrap();
		let seen = Arc::new(Mutex::new(Vec::new()));

		let sink = Arc::clone(&seen);
		let id = history.listen(Arc::new(move |location| sink.lock().push(location)));
		history.go(-1);
		history.unlisten(id);
		history.go(1);

		assert_eq!(*seen.lock(), vec!["/start".to_string()]);
	}
}
