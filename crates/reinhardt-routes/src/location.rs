//! Raw and normalized navigation targets.
//!
//! A navigation target is either a path string (optionally carrying a query
//! and hash) or a [`LocationDescriptor`]. Before matching, targets are
//! normalized against the current route into a [`Location`].

use crate::error::RouterError;
use crate::params::{ParamValue, Params};
use crate::query::{Query, QueryValue, resolve_query, stringify_query};
use crate::route::ResolvedRoute;
use std::fmt;
use tracing::debug;

/// A structured navigation target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationDescriptor {
	/// Target route name. Takes precedence over `path`.
	pub name: Option<String>,
	/// Target path, possibly relative, possibly with a query or hash.
	pub path: Option<String>,
	/// Path parameters.
	pub params: Params,
	/// Query parameters, overlaid on any query in `path`.
	pub query: Query,
	/// Fragment, with or without the leading `#`.
	pub hash: Option<String>,
	/// Resolve a relative `path` by appending to the current path.
	pub append: bool,
	/// Replace the current history entry instead of pushing.
	pub replace: bool,
	/// Navigate even if the target equals the current route.
	pub force: bool,
}

impl LocationDescriptor {
	/// Creates a descriptor targeting a path.
	pub fn from_path(path: impl Into<String>) -> Self {
		Self {
			path: Some(path.into()),
			..Self::default()
		}
	}

	/// Creates a descriptor targeting a named route.
	pub fn named(name: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			..Self::default()
		}
	}

	/// Sets a path parameter.
	pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
		self.params.insert(key.into(), value.into());
		self
	}

	/// Replaces all path parameters.
	pub fn with_params(mut self, params: Params) -> Self {
		self.params = params;
		self
	}

	/// Sets a query parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
		self.query.insert(key.into(), value.into());
		self
	}

	/// Sets the fragment.
	pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
		self.hash = Some(hash.into());
		self
	}

	/// Resolves a relative path by appending to the current path.
	pub fn with_append(mut self) -> Self {
		self.append = true;
		self
	}

	/// Replaces the current history entry.
	pub fn with_replace(mut self) -> Self {
		self.replace = true;
		self
	}

	/// Navigates even when the target is already current.
	pub fn with_force(mut self) -> Self {
		self.force = true;
		self
	}
}

/// A navigation target as supplied by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawLocation {
	/// A path string such as `/users/7?tab=posts#top`.
	Path(String),
	/// A structured descriptor.
	Descriptor(LocationDescriptor),
}

impl RawLocation {
	/// Converts into a descriptor, treating a path string as its `path`.
	pub fn into_descriptor(self) -> LocationDescriptor {
		match self {
			Self::Path(path) => LocationDescriptor::from_path(path),
			Self::Descriptor(descriptor) => descriptor,
		}
	}

	/// Returns whether the target asks to replace the current entry.
	pub fn is_replace(&self) -> bool {
		matches!(self, Self::Descriptor(d) if d.replace)
	}

	/// Returns whether the target bypasses duplicate detection.
	pub fn is_force(&self) -> bool {
		matches!(self, Self::Descriptor(d) if d.force)
	}

	/// Returns whether a relative path should be appended to the current path.
	pub fn is_append(&self) -> bool {
		matches!(self, Self::Descriptor(d) if d.append)
	}
}

impl From<&str> for RawLocation {
	fn from(path: &str) -> Self {
		Self::Path(path.to_string())
	}
}

impl From<String> for RawLocation {
	fn from(path: String) -> Self {
		Self::Path(path)
	}
}

impl From<&String> for RawLocation {
	fn from(path: &String) -> Self {
		Self::Path(path.clone())
	}
}

impl From<LocationDescriptor> for RawLocation {
	fn from(descriptor: LocationDescriptor) -> Self {
		Self::Descriptor(descriptor)
	}
}

impl fmt::Display for RawLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Path(path) => f.write_str(path),
			Self::Descriptor(d) => match (&d.name, &d.path) {
				(Some(name), _) => write!(f, "{{ name: {} }}", name),
				(None, Some(path)) => f.write_str(path),
				(None, None) => f.write_str("{ params }"),
			},
		}
	}
}

/// A navigation target after normalization against the current route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
	/// Route name, for named targets.
	pub name: Option<String>,
	/// Absolute path, without query or hash.
	pub path: Option<String>,
	/// Path parameters.
	pub params: Params,
	/// Query parameters.
	pub query: Query,
	/// Fragment including its `#`, or empty.
	pub hash: String,
}

impl Location {
	/// Returns path, query and hash joined together.
	pub fn full_path(&self) -> String {
		format!(
			"{}{}{}",
			self.path.as_deref().unwrap_or("/"),
			stringify_query(&self.query),
			self.hash
		)
	}
}

/// A path string split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPath {
	/// Path portion.
	pub path: String,
	/// Query portion, without `?`.
	pub query: String,
	/// Hash portion, including `#`.
	pub hash: String,
}

/// Splits a path into path, query and hash.
pub fn parse_path(raw: &str) -> ParsedPath {
	let (rest, hash) = match raw.find('#') {
		Some(index) => (&raw[..index], &raw[index..]),
		None => (raw, ""),
	};
	let (path, query) = match rest.find('?') {
		Some(index) => (&rest[..index], &rest[index + 1..]),
		None => (rest, ""),
	};

	ParsedPath {
		path: path.to_string(),
		query: query.to_string(),
		hash: hash.to_string(),
	}
}

/// Resolves `relative` against `base`.
///
/// Absolute paths are returned unchanged and paths starting with `?` or `#`
/// are appended to `base`. Otherwise the last segment of `base` is replaced,
/// unless `append` is set and `base` does not end with `/`.
pub fn resolve_path(relative: &str, base: &str, append: bool) -> String {
	match relative.chars().next() {
		Some('/') => return relative.to_string(),
		Some('?') | Some('#') => return format!("{}{}", base, relative),
		_ => {}
	}

	let mut stack: Vec<&str> = base.split('/').collect();
	if !append || stack.last().is_some_and(|last| last.is_empty()) {
		stack.pop();
	}

	for segment in relative.split('/') {
		match segment {
			".." => {
				stack.pop();
			}
			"." => {}
			_ => stack.push(segment),
		}
	}

	if stack.first() != Some(&"") {
		stack.insert(0, "");
	}

	let resolved = stack.join("/");
	if resolved.is_empty() {
		"/".to_string()
	} else {
		resolved
	}
}

/// Collapses runs of `/` into a single slash.
pub fn clean_path(path: &str) -> String {
	let mut cleaned = String::with_capacity(path.len());
	for c in path.chars() {
		if c == '/' && cleaned.ends_with('/') {
			continue;
		}
		cleaned.push(c);
	}
	cleaned
}

pub(crate) fn normalize_hash(hash: &str) -> String {
	if hash.is_empty() || hash.starts_with('#') {
		hash.to_string()
	} else {
		format!("#{}", hash)
	}
}

/// Normalizes a raw target against the current route.
///
/// Named targets pass through. A descriptor carrying only params reuses the
/// current route's name, or fills the current leaf template. Everything else
/// is resolved as a path relative to the current path.
///
/// # Errors
///
/// Returns a formatting error when params-only navigation cannot fill the
/// current template.
pub fn normalize_location(
	raw: &RawLocation,
	current: Option<&ResolvedRoute>,
	append: bool,
) -> Result<Location, RouterError> {
	let descriptor = match raw {
		RawLocation::Path(path) => LocationDescriptor::from_path(path.as_str()),
		RawLocation::Descriptor(descriptor) => descriptor.clone(),
	};
	let hash = normalize_hash(descriptor.hash.as_deref().unwrap_or(""));

	if let Some(name) = descriptor.name {
		return Ok(Location {
			name: Some(name),
			path: descriptor.path,
			params: descriptor.params,
			query: descriptor.query,
			hash,
		});
	}

	if descriptor.path.is_none() && !descriptor.params.is_empty() {
		if let Some(current) = current {
			let mut params = current.params().clone();
			params.extend(descriptor.params.clone());

			if let Some(name) = current.name() {
				return Ok(Location {
					name: Some(name.to_string()),
					path: None,
					params,
					query: descriptor.query,
					hash,
				});
			}
			if let Some(leaf) = current.matched().last() {
				let path = leaf.pattern().format(&params)?;
				return Ok(Location {
					name: None,
					path: Some(path),
					params,
					query: descriptor.query,
					hash,
				});
			}
		}

		debug!("relative params navigation without a matched current route");
		return Ok(Location {
			params: descriptor.params,
			query: descriptor.query,
			hash,
			..Location::default()
		});
	}

	let parsed = parse_path(descriptor.path.as_deref().unwrap_or(""));
	let base = current.map(ResolvedRoute::path).unwrap_or("/");
	let path = if parsed.path.is_empty() {
		base.to_string()
	} else {
		resolve_path(&parsed.path, base, append || descriptor.append)
	};
	let hash = if hash.is_empty() {
		normalize_hash(&parsed.hash)
	} else {
		hash
	};

	Ok(Location {
		name: None,
		path: Some(path),
		params: Params::new(),
		query: resolve_query(&parsed.query, &descriptor.query),
		hash,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("/a/b?x=1#top", "/a/b", "x=1", "#top")]
	#[case("/a/b#top?x=1", "/a/b", "", "#top?x=1")]
	#[case("/a", "/a", "", "")]
	#[case("?q", "", "q", "")]
	fn test_parse_path(
		#[case] raw: &str,
		#[case] path: &str,
		#[case] query: &str,
		#[case] hash: &str,
	) {
		let parsed = parse_path(raw);
		assert_eq!(parsed.path, path);
		assert_eq!(parsed.query, query);
		assert_eq!(parsed.hash, hash);
	}

	#[rstest]
	#[case("/abs", "/a/b", false, "/abs")]
	#[case("c", "/a/b", false, "/a/c")]
	#[case("c", "/a/b", true, "/a/b/c")]
	#[case("c", "/a/b/", true, "/a/b/c")]
	#[case("../c", "/a/b", false, "/c")]
	#[case("./c", "/a/b", false, "/a/c")]
	#[case("?x=1", "/a/b", false, "/a/b?x=1")]
	#[case("#top", "/a", false, "/a#top")]
	#[case("../../..", "/a", false, "/")]
	fn test_resolve_path(
		#[case] relative: &str,
		#[case] base: &str,
		#[case] append: bool,
		#[case] expected: &str,
	) {
		assert_eq!(resolve_path(relative, base, append), expected);
	}

	#[rstest]
	#[case("//a///b", "/a/b")]
	#[case("/a/b", "/a/b")]
	fn test_clean_path(#[case] raw: &str, #[case] expected: &str) {
		assert_eq!(clean_path(raw), expected);
	}

	#[rstest]
	fn test_normalize_path_location() {
		let location =
			normalize_location(&RawLocation::from("/users/7?tab=posts#bio"), None, false).unwrap();

		assert_eq!(location.path.as_deref(), Some("/users/7"));
		assert_eq!(location.query.get("tab"), Some(&QueryValue::from("posts")));
		assert_eq!(location.hash, "#bio");
		assert_eq!(location.full_path(), "/users/7?tab=posts#bio");
	}

	#[rstest]
	fn test_normalize_descriptor_overlays_query_and_hash() {
		let raw = RawLocation::from(
			LocationDescriptor::from_path("/search?q=a&page=1")
				.with_query("page", "2")
				.with_hash("results"),
		);

		let location = normalize_location(&raw, None, false).unwrap();

		assert_eq!(location.full_path(), "/search?q=a&page=2#results");
	}

	#[rstest]
	fn test_normalize_named_location_passes_through() {
		let raw = RawLocation::from(LocationDescriptor::named("user").with_param("id", "7"));

		let location = normalize_location(&raw, None, false).unwrap();

		assert_eq!(location.name.as_deref(), Some("user"));
		assert_eq!(location.params.get("id"), Some(&ParamValue::from("7")));
		assert!(location.path.is_none());
	}

	#[rstest]
	fn test_params_only_without_current_route() {
		let raw = RawLocation::from(
			LocationDescriptor::default()
				.with_param("id", "1")
				.with_query("tab", "posts"),
		);

		let location = normalize_location(&raw, None, false).unwrap();

		assert!(location.name.is_none());
		assert!(location.path.is_none());
		assert_eq!(location.params.get("id"), Some(&ParamValue::from("1")));
		assert_eq!(location.query.get("tab"), Some(&QueryValue::from("posts")));
	}

	#[rstest]
	fn test_raw_location_flags() {
		let raw = RawLocation::from(LocationDescriptor::from_path("/a").with_replace().with_force());
		assert!(raw.is_replace());
		assert!(raw.is_force());
		assert!(!RawLocation::from("/a").is_replace());
	}
}
