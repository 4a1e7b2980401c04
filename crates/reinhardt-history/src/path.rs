//! Path-based history backed by the host's push-state API.

use crate::host::{BrowserHost, HostEvent, SubscriptionId};
use crate::{History, HistoryError, HistoryListener, HistoryMode, ListenerId, Subscriptions};
use reinhardt_routes::clean_path;
use std::sync::{Arc, Weak};

/// Normalizes a base path: leading slash, no trailing slash, empty for `/`.
pub fn normalize_base(base: &str) -> String {
	let base = base.trim();
	if base.is_empty() || base == "/" {
		return String::new();
	}
	let base = if base.starts_with('/') {
		base.to_string()
	} else {
		format!("/{}", base)
	};
	base.trim_end_matches('/').to_string()
}

/// Reads the engine location from the host URL, stripping `base`.
pub(crate) fn location_under_base(host: &dyn BrowserHost, base: &str) -> String {
	let location = host.location();
	let mut path = location.pathname.as_str();

	if !base.is_empty() {
		if let Some(prefix) = path.get(..base.len())
			&& prefix.eq_ignore_ascii_case(base)
			&& matches!(path.as_bytes().get(base.len()), None | Some(b'/'))
		{
			path = &path[base.len()..];
		}
	}

	let path = if path.is_empty() { "/" } else { path };
	format!("{}{}{}", path, location.search, location.hash)
}

/// History that stores locations in the URL path.
#[derive(Debug)]
pub struct PathHistory {
	host: Arc<dyn BrowserHost>,
	base: String,
	subscriptions: Subscriptions,
}

impl PathHistory {
	/// Creates a path history rooted at `base`.
	///
	/// # Errors
	///
	/// Returns [`HistoryError::InvalidMode`] if the host lacks push-state support.
	pub fn new(host: Arc<dyn BrowserHost>, base: &str) -> Result<Self, HistoryError> {
		if !host.supports_push_state() {
			return Err(HistoryError::InvalidMode(
				"path mode requires push-state support".to_string(),
			));
		}
		Ok(Self {
			host,
			base: normalize_base(base),
			subscriptions: Subscriptions::default(),
		})
	}

	fn url(&self, location: &str) -> String {
		clean_path(&format!("{}{}", self.base, location))
	}
}

impl History for PathHistory {
	fn mode(&self) -> HistoryMode {
		HistoryMode::Path
	}

	fn base(&self) -> &str {
		&self.base
	}

	fn current_location(&self) -> String {
		location_under_base(self.host.as_ref(), &self.base)
	}

	fn push(&self, location: &str) -> Result<(), HistoryError> {
		self.subscriptions.ensure_active()?;
		self.host.push_state(&self.url(location));
		Ok(())
	}

	fn replace(&self, location: &str) -> Result<(), HistoryError> {
		self.subscriptions.ensure_active()?;
		self.host.replace_state(&self.url(location));
		Ok(())
	}

	fn go(&self, delta: i64) {
		self.host.go(delta);
	}

	fn listen(&self, listener: HistoryListener) -> ListenerId {
		let host: Weak<dyn BrowserHost> = Arc::downgrade(&self.host);
		let base = self.base.clone();
		let subscription: SubscriptionId = self.host.subscribe(
			HostEvent::PopState,
			Arc::new(move || {
				if let Some(host) = host.upgrade() {
					listener(location_under_base(host.as_ref(), &base));
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
		clean_path(&format!("{}/{}", self.base, full_path))
	}

	fn teardown(&self) {
		for subscription in self.subscriptions.drain() {
			self.host.unsubscribe(subscription);
		}
	}
}
