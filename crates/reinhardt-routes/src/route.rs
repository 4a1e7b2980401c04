//! The result of matching a location.

use crate::location::Location;
use crate::params::{ParamValue, Params};
use crate::query::{Query, stringify_query};
use crate::record::{RecordId, RouteRecord};
use serde_json::{Map, Value};
use std::sync::Arc;

/// An immutable, fully resolved route.
///
/// Every navigation produces a fresh value; the matched chain is a snapshot
/// of the records at match time, ordered root to leaf.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
	name: Option<String>,
	path: String,
	hash: String,
	query: Query,
	params: Params,
	full_path: String,
	matched: Vec<Arc<RouteRecord>>,
	redirected_from: Option<String>,
	meta: Map<String, Value>,
	initial: bool,
}

impl ResolvedRoute {
	/// The route a router holds before its first navigation.
	pub fn start() -> Self {
		Self {
			name: None,
			path: "/".to_string(),
			hash: String::new(),
			query: Query::new(),
			params: Params::new(),
			full_path: "/".to_string(),
			matched: Vec::new(),
			redirected_from: None,
			meta: Map::new(),
			initial: true,
		}
	}

	pub(crate) fn new(
		matched: Vec<Arc<RouteRecord>>,
		location: &Location,
		redirected_from: Option<String>,
	) -> Self {
		let leaf = matched.last();
		Self {
			name: location
				.name
				.clone()
				.or_else(|| leaf.and_then(|record| record.name().map(str::to_string))),
			path: location
				.path
				.clone()
				.filter(|path| !path.is_empty())
				.unwrap_or_else(|| "/".to_string()),
			hash: location.hash.clone(),
			query: location.query.clone(),
			params: location.params.clone(),
			full_path: location.full_path(),
			meta: leaf.map(|record| record.meta().clone()).unwrap_or_default(),
			matched,
			redirected_from,
			initial: false,
		}
	}

	/// Returns the route name, if the matched record is named.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Returns the path without query or hash.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Returns the fragment including `#`, or an empty string.
	pub fn hash(&self) -> &str {
		&self.hash
	}

	/// Returns the query parameters.
	pub fn query(&self) -> &Query {
		&self.query
	}

	/// Returns the path parameters.
	pub fn params(&self) -> &Params {
		&self.params
	}

	/// Returns a single path parameter by name.
	pub fn param(&self, name: &str) -> Option<&ParamValue> {
		self.params.get(name)
	}

	/// Returns path, query and hash joined together.
	pub fn full_path(&self) -> &str {
		&self.full_path
	}

	/// Returns the matched records, root first.
	pub fn matched(&self) -> &[Arc<RouteRecord>] {
		&self.matched
	}

	/// Returns the full path originally requested, if redirects were followed.
	pub fn redirected_from(&self) -> Option<&str> {
		self.redirected_from.as_deref()
	}

	/// Returns the leaf record's metadata.
	pub fn meta(&self) -> &Map<String, Value> {
		&self.meta
	}

	/// Returns whether no record matched.
	pub fn is_not_found(&self) -> bool {
		self.matched.is_empty()
	}

	/// Returns whether this is the pre-navigation start route.
	pub fn is_start(&self) -> bool {
		self.initial
	}

	/// Returns the identifier of the leaf record.
	pub fn leaf_id(&self) -> Option<RecordId> {
		self.matched.last().map(|record| record.id())
	}

	/// Returns a copy with `redirected_from` replaced.
	pub fn with_redirected_from(mut self, redirected_from: Option<String>) -> Self {
		self.redirected_from = redirected_from;
		self
	}

	/// Returns whether `other` points at the same place.
	///
	/// Paths are compared ignoring a trailing slash; query, hash and the leaf
	/// record must also agree. The start route only equals itself.
	pub fn is_same_route(&self, other: &ResolvedRoute) -> bool {
		if self.initial || other.initial {
			return self.initial && other.initial;
		}

		trim_trailing_slash(&self.path) == trim_trailing_slash(&other.path)
			&& self.hash == other.hash
			&& self.query == other.query
			&& self.leaf_id() == other.leaf_id()
	}

	/// Returns the query rendered as a string, prefixed with `?` when non-empty.
	pub fn query_string(&self) -> String {
		stringify_query(&self.query)
	}
}

fn trim_trailing_slash(path: &str) -> &str {
	path.strip_suffix('/').unwrap_or(path)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::query::QueryValue;
	use rstest::rstest;

	fn location(path: &str) -> Location {
		Location {
			path: Some(path.to_string()),
			..Location::default()
		}
	}

	#[rstest]
	fn test_start_route() {
		let start = ResolvedRoute::start();
		assert_eq!(start.path(), "/");
		assert!(start.is_start());
		assert!(start.is_not_found());
		assert!(start.is_same_route(&ResolvedRoute::start()));
	}

	#[rstest]
	fn test_start_differs_from_unmatched_root() {
		let root = ResolvedRoute::new(Vec::new(), &location("/"), None);
		assert!(!root.is_same_route(&ResolvedRoute::start()));
	}

	#[rstest]
	#[case("/a", "/a/", true)]
	#[case("/a", "/b", false)]
	fn test_is_same_route_path(#[case] a: &str, #[case] b: &str, #[case] expected: bool) {
		let a = ResolvedRoute::new(Vec::new(), &location(a), None);
		let b = ResolvedRoute::new(Vec::new(), &location(b), None);
		assert_eq!(a.is_same_route(&b), expected);
	}

	#[rstest]
	fn test_is_same_route_compares_query() {
		let plain = ResolvedRoute::new(Vec::new(), &location("/a"), None);
		let mut with_query = location("/a");
		with_query
			.query
			.insert("page".to_string(), QueryValue::from("2"));
		let queried = ResolvedRoute::new(Vec::new(), &with_query, None);

		assert!(!plain.is_same_route(&queried));
		assert_eq!(queried.full_path(), "/a?page=2");
	}
}
