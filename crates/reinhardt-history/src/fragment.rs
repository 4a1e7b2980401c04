//! Fragment-based history: the location lives after `#` in the URL.

use crate::host::{BrowserHost, HostEvent};
use crate::path::{location_under_base, normalize_base};
use crate::{History, HistoryError, HistoryListener, HistoryMode, ListenerId, Subscriptions};
use reinhardt_routes::clean_path;
use std::sync::{Arc, Weak};
use tracing::debug;

/// History that stores locations in the URL fragment.
///
/// Fragments always start with `/`: `#users` is rewritten to `#/users`.
#[derive(Debug)]
pub struct FragmentHistory {
	host: Arc<dyn BrowserHost>,
	base: String,
	subscriptions: Subscriptions,
}

impl FragmentHistory {
	/// Creates a fragment history.
	///
	/// With `fallback` set, a path-style URL such as `/base/users` is first
	/// converted to `/base/#/users`.
	pub fn new(host: Arc<dyn BrowserHost>, base: &str, fallback: bool) -> Self {
		let history = Self {
			host,
			base: normalize_base(base),
			subscriptions: Subscriptions::default(),
		};

		if fallback && history.convert_path_url() {
			return history;
		}
		ensure_slash(history.host.as_ref());
		history
	}

	fn convert_path_url(&self) -> bool {
		let location = location_under_base(self.host.as_ref(), &self.base);
		if location.starts_with("/#") {
			return false;
		}
		let url = clean_path(&format!("{}/#{}", self.base, location));
		debug!(from = %location, to = %url, "converting path URL to fragment URL");
		self.host.replace_location(&url);
		true
	}
}

fn read_hash(host: &dyn BrowserHost) -> String {
	let hash = host.location().hash;
	hash.strip_prefix('#').unwrap_or(&hash).to_string()
}

fn hash_url(host: &dyn BrowserHost, path: &str) -> String {
	format!("{}#{}", host.location().without_hash(), path)
}

fn write_hash(host: &dyn BrowserHost, path: &str, replace: bool) {
	match (host.supports_push_state(), replace) {
		(true, false) => host.push_state(&hash_url(host, path)),
		(true, true) => host.replace_state(&hash_url(host, path)),
		(false, false) => host.set_hash(path),
		(false, true) => host.replace_location(&hash_url(host, path)),
	}
}

/// Rewrites the fragment to start with `/`. Returns the fragment and whether it already did.
fn ensure_slash(host: &dyn BrowserHost) -> (String, bool) {
	let path = read_hash(host);
	if path.starts_with('/') {
		return (path, true);
	}
	let fixed = format!("/{}", path);
	write_hash(host, &fixed, true);
	(fixed, false)
}

impl History for FragmentHistory {
	fn mode(&self) -> HistoryMode {
		HistoryMode::Fragment
	}

	fn base(&self) -> &str {
		&self.base
	}

	fn current_location(&self) -> String {
		read_hash(self.host.as_ref())
	}

	fn push(&self, location: &str) -> Result<(), HistoryError> {
		self.subscriptions.ensure_active()?;
		write_hash(self.host.as_ref(), location, false);
		Ok(())
	}

	fn replace(&self, location: &str) -> Result<(), HistoryError> {
		self.subscriptions.ensure_active()?;
		write_hash(self.host.as_ref(), location, true);
		Ok(())
	}

	fn go(&self, delta: i64) {
		self.host.go(delta);
	}

	fn listen(&self, listener: HistoryListener) -> ListenerId {
		let event = if self.host.supports_push_state() {
			HostEvent::PopState
		} else {
			HostEvent::HashChange
		};
		let host: Weak<dyn BrowserHost> = Arc::downgrade(&self.host);
		let subscription = self.host.subscribe(
			event,
			Arc::new(move || {
				if let Some(host) = host.upgrade() {
					let (location, _) = ensure_slash(host.as_ref());
					listener(location);
				}
			}),
		);
		self.subscriptions.add(subscription)
	}

	fn unlisten(&self, id: ListenerId) {
		if let Some(subscription) = self.subscriptions.remove(id) {
			self.host.unsubscribe(subscription);
		}
	}

	fn href(&self, full_path: &str) -> String {
		let path = format!("#{}", full_path);
		if self.base.is_empty() {
			path
		} else {
			clean_path(&format!("{}/{}", self.base, path))
		}
	}

	fn teardown(&self) {
		for subscription in self.subscriptions.drain() {
			self.host.unsubscribe(subscription);
		}
	}
}
