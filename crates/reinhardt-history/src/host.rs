//! Browser host abstraction.
//!
//! Path and fragment history read and write the URL through a
//! [`BrowserHost`]. [`SimulatedBrowser`] is an in-process implementation with
//! a session history stack, used by non-browser hosts and tests.
//!
//! Writes made through the host (`push_state`, `set_hash`, ...) never notify
//! subscribers. Only traversal and external URL changes do.

use parking_lot::Mutex;
use reinhardt_routes::parse_path;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Events a host can notify subscribers about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEvent {
	/// A session history traversal happened.
	PopState,
	/// The URL fragment changed.
	HashChange,
}

/// Identifier of a host subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Callback invoked for host events.
pub type HostCallback = Arc<dyn Fn() + Send + Sync>;

/// The URL of the host, split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostLocation {
	/// Path portion, e.g. `/app/users`.
	pub pathname: String,
	/// Query portion including `?`, or empty.
	pub search: String,
	/// Fragment including `#`, or empty.
	pub hash: String,
}

impl HostLocation {
	/// Splits a same-origin URL into its parts.
	pub fn parse(url: &str) -> Self {
		let parsed = parse_path(url);
		Self {
			pathname: if parsed.path.is_empty() {
				"/".to_string()
			} else {
				parsed.path
			},
			search: if parsed.query.is_empty() {
				String::new()
			} else {
				format!("?{}", parsed.query)
			},
			hash: parsed.hash,
		}
	}

	/// Returns the URL without its fragment.
	pub fn without_hash(&self) -> String {
		format!("{}{}", self.pathname, self.search)
	}
}

impl fmt::Display for HostLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{}{}", self.pathname, self.search, self.hash)
	}
}

/// Access to a browser-like host's URL and session history.
pub trait BrowserHost: Send + Sync + fmt::Debug {
	/// Returns whether the host supports `pushState`/`replaceState`.
	fn supports_push_state(&self) -> bool;

	/// Returns the current URL.
	fn location(&self) -> HostLocation;

	/// Adds a history entry for `url`.
	fn push_state(&self, url: &str);

	/// Replaces the current history entry with `url`.
	fn replace_state(&self, url: &str);

	/// Assigns the fragment, adding a history entry.
	fn set_hash(&self, hash: &str);

	/// Navigates to `url` in place of the current entry.
	fn replace_location(&self, url: &str);

	/// Moves through session history.
	fn go(&self, delta: i64);

	/// Subscribes to an event.
	fn subscribe(&self, event: HostEvent, callback: HostCallback) -> SubscriptionId;

	/// Removes a subscription.
	fn unsubscribe(&self, id: SubscriptionId);
}

struct BrowserState {
	entries: Vec<String>,
	index: usize,
	subscribers: Vec<(SubscriptionId, HostEvent, HostCallback)>,
}

/// In-process browser with a session history stack.
///
/// # Examples
///
/// ```
/// use reinhardt_history::{BrowserHost, SimulatedBrowser};
///
/// let browser = SimulatedBrowser::new("/app/");
/// browser.push_state("/app/users");
/// browser.go(-1);
/// assert_eq!(browser.url(), "/app/");
/// ```
pub struct SimulatedBrowser {
	state: Mutex<BrowserState>,
	push_state: bool,
	next_id: AtomicU64,
}

impl SimulatedBrowser {
	/// Creates a browser showing `initial_url`, with push-state support.
	pub fn new(initial_url: &str) -> Self {
		Self::build(initial_url, true)
	}

	/// Creates a browser without push-state support.
	pub fn without_push_state(initial_url: &str) -> Self {
		Self::build(initial_url, false)
	}

	fn build(initial_url: &str, push_state: bool) -> Self {
		Self {
			state: Mutex::new(BrowserState {
				entries: vec![HostLocation::parse(initial_url).to_string()],
				index: 0,
				subscribers: Vec::new(),
			}),
			push_state,
			next_id: AtomicU64::new(1),
		}
	}

	/// Returns the current URL.
	pub fn url(&self) -> String {
		let state = self.state.lock();
		state.entries[state.index].clone()
	}

	/// Returns every session history entry.
	pub fn entries(&self) -> Vec<String> {
		self.state.lock().entries.clone()
	}

	/// Returns the index of the current entry.
	pub fn index(&self) -> usize {
		self.state.lock().index
	}

	/// Returns the number of active subscriptions.
	pub fn subscriber_count(&self) -> usize {
		self.state.lock().subscribers.len()
	}

	/// Simulates the user changing the URL, e.g. following an in-page link.
	pub fn navigate_externally(&self, url: &str) {
		let next = HostLocation::parse(url).to_string();
		let previous = {
			let mut state = self.state.lock();
			let previous = state.entries[state.index].clone();
			let keep = state.index + 1;
			state.entries.truncate(keep);
			state.entries.push(next.clone());
			state.index += 1;
			previous
		};
		self.notify(&previous, &next);
	}

	fn write(&self, url: &str, replace: bool) {
		let url = HostLocation::parse(url).to_string();
		let mut state = self.state.lock();
		if replace {
			let index = state.index;
			state.entries[index] = url;
		} else {
			let keep = state.index + 1;
			state.entries.truncate(keep);
			state.entries.push(url);
			state.index += 1;
		}
	}

	fn notify(&self, previous: &str, next: &str) {
		let hash_changed = HostLocation::parse(previous).hash != HostLocation::parse(next).hash;
		let callbacks: Vec<HostCallback> = self
			.state
			.lock()
			.subscribers
			.iter()
			.filter(|(_, event, _)| *event == HostEvent::PopState || hash_changed)
			.map(|(_, _, callback)| Arc::clone(callback))
			.collect();

		// Callbacks run outside the lock so they may read the URL.
		for callback in callbacks {
			callback();
		}
	}
}

impl fmt::Debug for SimulatedBrowser {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("SimulatedBrowser")
			.field("entries", &state.entries)
			.field("index", &state.index)
			.field("subscribers", &state.subscribers.len())
			.field("push_state", &self.push_state)
			.finish()
	}
}

impl BrowserHost for SimulatedBrowser {
	fn supports_push_state(&self) -> bool {
		self.push_state
	}

	fn location(&self) -> HostLocation {
		HostLocation::parse(&self.url())
	}

	fn push_state(&self, url: &str) {
		self.write(url, false);
	}

	fn replace_state(&self, url: &str) {
		self.write(url, true);
	}

	fn set_hash(&self, hash: &str) {
		let current = self.location();
		let hash = hash.strip_prefix('#').unwrap_or(hash);
		self.write(&format!("{}#{}", current.without_hash(), hash), false);
	}

	fn replace_location(&self, url: &str) {
		self.write(url, true);
	}

	fn go(&self, delta: i64) {
		let moved = {
			let mut state = self.state.lock();
			let target = state.index as i64 + delta;
			if delta == 0 || target < 0 || target >= state.entries.len() as i64 {
				None
			} else {
				let previous = state.entries[state.index].clone();
				state.index = target as usize;
				Some((previous, state.entries[state.index].clone()))
			}
		};

		if let Some((previous, next)) = moved {
			self.notify(&previous, &next);
		}
	}

	fn subscribe(&self, event: HostEvent, callback: HostCallback) -> SubscriptionId {
		let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.state.lock().subscribers.push((id, event, callback));
		id
	}

	fn unsubscribe(&self, id: SubscriptionId) {
		self.state
			.lock()
			.subscribers
			.retain(|(subscription, _, _)| *subscription != id);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::atomic::AtomicUsize;

	#[rstest]
	#[case("/a/b?x=1#top", "/a/b", "?x=1", "#top")]
	#[case("", "/", "", "")]
	#[case("/#/users", "/", "", "#/users")]
	fn test_host_location_parse(
		#[case] url: &str,
		#[case] pathname: &str,
		#[case] search: &str,
		#[case] hash: &str,
	) {
		let location = HostLocation::parse(url);
		assert_eq!(location.pathname, pathname);
		assert_eq!(location.search, search);
		assert_eq!(location.hash, hash);
	}

	#[rstest]
	fn test_push_truncates_forward_entries() {
		let browser = SimulatedBrowser::new("/");
		browser.push_state("/a");
		browser.push_state("/b");
		browser.go(-2);
		browser.push_state("/c");

		assert_eq!(browser.entries(), vec!["/", "/c"]);
		assert_eq!(browser.index(), 1);
	}

	#[rstest]
	fn test_go_out_of_range_is_ignored() {
		let browser = SimulatedBrowser::new("/");
		browser.go(-1);
		browser.go(3);
		assert_eq!(browser.url(), "/");
	}

	#[rstest]
	fn test_traversal_notifies_subscribers() {
		let browser = SimulatedBrowser::new("/#/a");
		let pops = Arc::new(AtomicUsize::new(0));
		let hashes = Arc::new(AtomicUsize::new(0));

		let counter = Arc::clone(&pops);
		browser.subscribe(
			HostEvent::PopState,
			Arc::new(move || {
				counter.fetch_add(1, Ordering::SeqCst);
			}),
		);
		let counter = Arc::clone(&hashes);
		let id = browser.subscribe(
			HostEvent::HashChange,
			Arc::new(move || {
				counter.fetch_add(1, Ordering::SeqCst);
			}),
		);

		browser.set_hash("/b");
		assert_eq!(pops.load(Ordering::SeqCst), 0);

		browser.go(-1);
		browser.unsubscribe(id);
		browser.go(1);

		assert_eq!(pops.load(Ordering::SeqCst), 2);
		assert_eq!(hashes.load(Ordering::SeqCst), 1);
		assert_eq!(browser.url(), "/#/b");
	}
}
