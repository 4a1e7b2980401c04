//! History persistence adapters for Reinhardt navigation.
//!
//! A [`History`] reads the current location from its backing store, writes
//! new locations with push or replace semantics, and reports changes made
//! outside the router (back/forward traversal, edited fragments).
//!
//! - [`PathHistory`]: locations in the URL path via the push-state API
//! - [`FragmentHistory`]: locations after `#` in the URL
//! - [`MemoryHistory`]: an in-process stack, no URL involved
//!
//! Browser-backed adapters talk to the URL through a [`BrowserHost`];
//! [`SimulatedBrowser`] provides one without a real browser.

pub mod error;
pub mod fragment;
pub mod host;
pub mod memory;
pub mod path;

pub use error::HistoryError;
pub use fragment::FragmentHistory;
pub use host::{BrowserHost, HostCallback, HostEvent, HostLocation, SimulatedBrowser, SubscriptionId};
pub use memory::MemoryHistory;
pub use path::{PathHistory, normalize_base};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// How locations are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
	/// URL path, via the push-state API.
	#[serde(alias = "history")]
	Path,
	/// URL fragment.
	#[default]
	#[serde(alias = "hash")]
	Fragment,
	/// In-memory stack.
	#[serde(alias = "abstract")]
	Memory,
}

impl fmt::Display for HistoryMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Path => write!(f, "path"),
			Self::Fragment => write!(f, "fragment"),
			Self::Memory => write!(f, "memory"),
		}
	}
}

impl FromStr for HistoryMode {
	type Err = HistoryError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"path" | "history" => Ok(Self::Path),
			"fragment" | "hash" => Ok(Self::Fragment),
			"memory" | "abstract" => Ok(Self::Memory),
			_ => Err(HistoryError::InvalidMode(s.to_string())),
		}
	}
}

/// How a navigation reached the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationType {
	/// A new entry is added.
	Push,
	/// The current entry is replaced.
	Replace,
	/// The backing store changed outside the router.
	Pop,
}

/// Callback receiving the new location after an external change.
pub type HistoryListener = Arc<dyn Fn(String) + Send + Sync>;

/// Identifier returned by [`History::listen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// A location store the router persists navigations to.
pub trait History: Send + Sync + fmt::Debug {
	/// Returns the mode implemented by this adapter.
	fn mode(&self) -> HistoryMode;

	/// Returns the normalized base path, empty when none.
	fn base(&self) -> &str;

	/// Returns the location currently held by the store.
	fn current_location(&self) -> String;

	/// Adds an entry for `location`.
	///
	/// # Errors
	///
	/// Returns [`HistoryError::TornDown`] after [`History::teardown`].
	fn push(&self, location: &str) -> Result<(), HistoryError>;

	/// Replaces the current entry with `location`.
	///
	/// # Errors
	///
	/// Returns [`HistoryError::TornDown`] after [`History::teardown`].
	fn replace(&self, location: &str) -> Result<(), HistoryError>;

	/// Moves through history; listeners are told about the new location.
	fn go(&self, delta: i64);

	/// Registers a listener for external changes.
	///
	/// Listening revives an adapter that was torn down.
	fn listen(&self, listener: HistoryListener) -> ListenerId;

	/// Removes a listener.
	fn unlisten(&self, id: ListenerId);

	/// Builds the link target for a full path.
	fn href(&self, full_path: &str) -> String;

	/// Removes every listener and rejects writes until the next `listen`.
	fn teardown(&self);
}

/// Picks the history mode usable on this host.
///
/// # Errors
///
/// - [`HistoryError::UnsupportedMode`] when a URL-backed mode has no host.
/// - [`HistoryError::InvalidMode`] when path mode lacks push-state support
///   and `fallback` is off.
pub fn resolve_mode(
	requested: HistoryMode,
	host: Option<&dyn BrowserHost>,
	fallback: bool,
) -> Result<HistoryMode, HistoryError> {
	match (requested, host) {
		(HistoryMode::Memory, _) => Ok(HistoryMode::Memory),
		(mode, None) => Err(HistoryError::UnsupportedMode(mode)),
		(HistoryMode::Path, Some(host)) if !host.supports_push_state() => {
			if fallback {
				debug!("push-state unsupported, falling back to fragment history");
				Ok(HistoryMode::Fragment)
			} else {
				Err(HistoryError::InvalidMode(
					"path mode requires push-state support and fallback is disabled".to_string(),
				))
			}
		}
		(mode, Some(_)) => Ok(mode),
	}
}

/// Creates the adapter for `requested`, applying the fallback policy.
///
/// # Errors
///
/// See [`resolve_mode`].
pub fn create_history(
	requested: HistoryMode,
	base: &str,
	fallback: bool,
	host: Option<Arc<dyn BrowserHost>>,
) -> Result<Arc<dyn History>, HistoryError> {
	let mode = resolve_mode(requested, host.as_deref(), fallback)?;
	let history: Arc<dyn History> = match (mode, host) {
		(HistoryMode::Memory, _) => Arc::new(MemoryHistory::default()),
		(HistoryMode::Path, Some(host)) => Arc::new(PathHistory::new(host, base)?),
		(HistoryMode::Fragment, Some(host)) => {
			let converted = requested == HistoryMode::Path;
			Arc::new(FragmentHistory::new(host, base, converted))
		}
		(mode, None) => return Err(HistoryError::UnsupportedMode(mode)),
	};
	Ok(history)
}

/// Listener bookkeeping shared by the adapters.
pub(crate) struct Subscriptions<T = SubscriptionId> {
	state: Mutex<SubscriptionState<T>>,
}

struct SubscriptionState<T> {
	next: u64,
	entries: Vec<(ListenerId, T)>,
	torn_down: bool,
}

impl<T> Default for Subscriptions<T> {
	fn default() -> Self {
		Self {
			state: Mutex::new(SubscriptionState {
				next: 1,
				entries: Vec::new(),
				torn_down: false,
			}),
		}
	}
}

impl<T: Clone> Subscriptions<T> {
	pub(crate) fn add(&self, item: T) -> ListenerId {
		let mut state = self.state.lock();
		let id = ListenerId(state.next);
		state.next += 1;
		state.torn_down = false;
		state.entries.push((id, item));
		id
	}

	pub(crate) fn remove(&self, id: ListenerId) -> Option<T> {
		let mut state = self.state.lock();
		let position = state.entries.iter().position(|(entry, _)| *entry == id)?;
		Some(state.entries.remove(position).1)
	}

	pub(crate) fn items(&self) -> Vec<T> {
		self.state
			.lock()
			.entries
			.iter()
			.map(|(_, item)| item.clone())
			.collect()
	}

	pub(crate) fn drain(&self) -> Vec<T> {
		let mut state = self.state.lock();
		state.torn_down = true;
		state.entries.drain(..).map(|(_, item)| item).collect()
	}

	pub(crate) fn ensure_active(&self) -> Result<(), HistoryError> {
		if self.state.lock().torn_down {
			Err(HistoryError::TornDown)
		} else {
			Ok(())
		}
	}
}

impl<T> fmt::Debug for Subscriptions<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("Subscriptions")
			.field("listeners", &state.entries.len())
			.field("torn_down", &state.torn_down)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("path", HistoryMode::Path)]
	#[case("HASH", HistoryMode::Fragment)]
	#[case("abstract", HistoryMode::Memory)]
	fn test_mode_from_str(#[case] input: &str, #[case] expected: HistoryMode) {
		assert_eq!(input.parse::<HistoryMode>().unwrap(), expected);
	}

	#[rstest]
	fn test_mode_serde() {
		let mode: HistoryMode = serde_json::from_str(r#""history""#).unwrap();
		assert_eq!(mode, HistoryMode::Path);
		assert_eq!(serde_json::to_string(&HistoryMode::Memory).unwrap(), r#""memory""#);
		assert_eq!(HistoryMode::default(), HistoryMode::Fragment);
	}

	#[rstest]
	fn test_resolve_mode_fallback_policy() {
		let legacy = SimulatedBrowser::without_push_state("/");
		let modern = SimulatedBrowser::new("/");

		assert_eq!(
			resolve_mode(HistoryMode::Path, Some(&legacy), true),
			Ok(HistoryMode::Fragment)
		);
		assert!(matches!(
			resolve_mode(HistoryMode::Path, Some(&legacy), false),
			Err(HistoryError::InvalidMode(_))
		));
		assert_eq!(
			resolve_mode(HistoryMode::Path, Some(&modern), false),
			Ok(HistoryMode::Path)
		);
		assert_eq!(
			resolve_mode(HistoryMode::Fragment, None, true),
			Err(HistoryError::UnsupportedMode(HistoryMode::Fragment))
		);
		assert_eq!(
			resolve_mode(HistoryMode::Memory, None, false),
			Ok(HistoryMode::Memory)
		);
	}

	#[rstest]
	fn test_create_history_falls_back_to_fragment() {
		let browser = Arc::new(SimulatedBrowser::without_push_state("/shop/cart"));

		let history = create_history(HistoryMode::Path, "/shop", true, Some(browser.clone())).unwrap();

		assert_eq!(history.mode(), HistoryMode::Fragment);
		assert_eq!(browser.url(), "/shop/#/cart");
		assert_eq!(history.current_location(), "/cart");
	}
}
