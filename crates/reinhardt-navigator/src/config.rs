//! Router configuration.
//!
//! [`RouterSettings`] holds the serializable knobs and can be loaded from a
//! TOML document; [`RouterOptions`] adds the route tree and the host
//! environment.

use crate::error::NavigationError;
use reinhardt_history::{BrowserHost, History, HistoryMode};
use reinhardt_routes::{PatternOptions, RouteConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Serializable router settings.
///
/// # Examples
///
/// ```
/// use reinhardt_history::HistoryMode;
/// use reinhardt_navigator::RouterSettings;
///
/// let settings = RouterSettings::from_toml_str(r#"
/// mode = "path"
/// base = "/app"
/// "#).unwrap();
/// assert_eq!(settings.mode, HistoryMode::Path);
/// assert_eq!(settings.max_redirects, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
	/// Requested history mode.
	pub mode: HistoryMode,
	/// Base path the application is served from.
	pub base: String,
	/// Fall back to fragment mode when push-state is unavailable.
	pub fallback: bool,
	/// Match paths case-sensitively.
	pub case_sensitive: bool,
	/// Treat a trailing slash as significant.
	pub strict: bool,
	/// Maximum guard redirects followed by one navigation.
	pub max_redirects: usize,
}

impl Default for RouterSettings {
	fn default() -> Self {
		Self {
			mode: HistoryMode::default(),
			base: "/".to_string(),
			fallback: true,
			case_sensitive: false,
			strict: false,
			max_redirects: 16,
		}
	}
}

impl RouterSettings {
	/// Parses settings from a TOML document. Missing keys take their defaults.
	///
	/// # Errors
	///
	/// Returns [`NavigationError::InvalidSettings`] if the document is malformed
	/// or names an unknown mode.
	pub fn from_toml_str(source: &str) -> Result<Self, NavigationError> {
		toml::from_str(source).map_err(|e| NavigationError::InvalidSettings(e.to_string()))
	}

	/// Returns the default pattern options for route compilation.
	pub fn pattern_options(&self) -> PatternOptions {
		PatternOptions::new(self.case_sensitive, self.strict)
	}
}

/// Everything needed to build a [`Router`](crate::Router).
#[derive(Clone, Default)]
pub struct RouterOptions {
	pub(crate) settings: RouterSettings,
	pub(crate) routes: Vec<RouteConfig>,
	pub(crate) host: Option<Arc<dyn BrowserHost>>,
	pub(crate) history: Option<Arc<dyn History>>,
}

impl RouterOptions {
	/// Creates options with default settings and no routes.
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the settings.
	pub fn settings(mut self, settings: RouterSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Sets the history mode.
	pub fn mode(mut self, mode: HistoryMode) -> Self {
		self.settings.mode = mode;
		self
	}

	/// Sets the base path.
	pub fn base(mut self, base: impl Into<String>) -> Self {
		self.settings.base = base.into();
		self
	}

	/// Sets the fallback policy.
	pub fn fallback(mut self, fallback: bool) -> Self {
		self.settings.fallback = fallback;
		self
	}

	/// Appends a root route.
	pub fn route(mut self, route: RouteConfig) -> Self {
		self.routes.push(route);
		self
	}

	/// Appends several root routes.
	pub fn routes(mut self, routes: impl IntoIterator<Item = RouteConfig>) -> Self {
		self.routes.extend(routes);
		self
	}

	/// Sets the browser host used by the path and fragment modes.
	pub fn host(mut self, host: Arc<dyn BrowserHost>) -> Self {
		self.host = Some(host);
		self
	}

	/// Uses a prebuilt history adapter, bypassing mode selection.
	pub fn history(mut self, history: Arc<dyn History>) -> Self {
		self.history = Some(history);
		self
	}

	/// Returns the settings.
	pub fn get_settings(&self) -> &RouterSettings {
		&self.settings
	}
}

impl fmt::Debug for RouterOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouterOptions")
			.field("settings", &self.settings)
			.field("routes", &self.routes.len())
			.field("host", &self.host.is_some())
			.field("history", &self.history.as_ref().map(|history| history.mode()))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_defaults() {
		let settings = RouterSettings::default();
		assert_eq!(settings.mode, HistoryMode::Fragment);
		assert_eq!(settings.base, "/");
		assert!(settings.fallback);
		assert!(!settings.case_sensitive);
		assert!(!settings.strict);
		assert_eq!(settings.max_redirects, 16);
	}

	#[rstest]
	#[case("mode = \"memory\"", HistoryMode::Memory)]
	#[case("mode = \"history\"", HistoryMode::Path)]
	#[case("mode = \"hash\"", HistoryMode::Fragment)]
	#[case("", HistoryMode::Fragment)]
	fn test_mode_from_toml(#[case] source: &str, #[case] expected: HistoryMode) {
		let settings = RouterSettings::from_toml_str(source).unwrap();
		assert_eq!(settings.mode, expected);
	}

	#[rstest]
	fn test_full_toml() {
		let settings = RouterSettings::from_toml_str(
			r#"
			mode = "path"
			base = "/shop"
			fallback = false
			case_sensitive = true
			strict = true
			max_redirects = 4
			"#,
		)
		.unwrap();

		assert_eq!(settings.base, "/shop");
		assert!(!settings.fallback);
		assert_eq!(settings.max_redirects, 4);
		assert_eq!(settings.pattern_options(), PatternOptions::new(true, true));
	}

	#[rstest]
	fn test_invalid_toml() {
		let result = RouterSettings::from_toml_str("mode = \"carrier-pigeon\"");
		assert!(matches!(result, Err(NavigationError::InvalidSettings(_))));
	}

	#[rstest]
	fn test_options_builder() {
		let options = RouterOptions::new()
			.mode(HistoryMode::Memory)
			.base("/app")
			.fallback(false)
			.route(RouteConfig::new("/"))
			.routes([RouteConfig::new("/a"), RouteConfig::new("/b")]);

		assert_eq!(options.get_settings().mode, HistoryMode::Memory);
		assert_eq!(options.get_settings().base, "/app");
		assert_eq!(options.routes.len(), 3);
	}
}
