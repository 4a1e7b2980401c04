//! Query string handling.
//!
//! Queries keep their insertion order. A key given without `=` is a flag and
//! carries no value; a key given several times collects its values into a
//! list.

use crate::pattern::decode_component;
use indexmap::IndexMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

/// Parsed query parameters in insertion order.
pub type Query = IndexMap<String, QueryValue>;

/// Characters left as-is by `encodeURIComponent`, minus `!'()*`, plus `,`.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'_')
	.remove(b'.')
	.remove(b'~')
	.remove(b',');

/// The value of a query key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
	/// A single value, or `None` for a bare flag key.
	Single(Option<String>),
	/// Values of a repeated key.
	List(Vec<Option<String>>),
}

impl QueryValue {
	/// Returns the first value, if any.
	pub fn first(&self) -> Option<&str> {
		match self {
			Self::Single(value) => value.as_deref(),
			Self::List(values) => values.iter().flatten().next().map(String::as_str),
		}
	}

	/// Returns every value carried by this key.
	pub fn values(&self) -> Vec<Option<&str>> {
		match self {
			Self::Single(value) => vec![value.as_deref()],
			Self::List(values) => values.iter().map(Option::as_deref).collect(),
		}
	}

	fn push(&mut self, value: Option<String>) {
		match self {
			Self::Single(existing) => {
				let first = existing.take();
				*self = Self::List(vec![first, value]);
			}
			Self::List(values) => values.push(value),
		}
	}
}

impl From<&str> for QueryValue {
	fn from(value: &str) -> Self {
		Self::Single(Some(value.to_string()))
	}
}

impl From<String> for QueryValue {
	fn from(value: String) -> Self {
		Self::Single(Some(value))
	}
}

impl From<Option<String>> for QueryValue {
	fn from(value: Option<String>) -> Self {
		Self::Single(value)
	}
}

impl From<Vec<&str>> for QueryValue {
	fn from(values: Vec<&str>) -> Self {
		Self::List(values.into_iter().map(|v| Some(v.to_string())).collect())
	}
}

/// Parses a raw query string. A single leading `?`, `#` or `&` is ignored.
pub fn parse_query(raw: &str) -> Query {
	let mut query = Query::new();
	let trimmed = raw.trim();
	let trimmed = trimmed
		.strip_prefix(['?', '#', '&'])
		.unwrap_or(trimmed);

	for pair in trimmed.split('&').filter(|pair| !pair.is_empty()) {
		let pair = pair.replace('+', " ");
		let (key, value) = match pair.split_once('=') {
			Some((key, value)) => (decode_component(key), Some(decode_component(value))),
			None => (decode_component(&pair), None),
		};

		match query.get_mut(&key) {
			Some(existing) => existing.push(value),
			None => {
				query.insert(key, QueryValue::Single(value));
			}
		}
	}

	query
}

/// Serializes a query, prefixed with `?` when non-empty.
pub fn stringify_query(query: &Query) -> String {
	let pairs: Vec<String> = query
		.iter()
		.filter_map(|(key, value)| {
			let key = encode(key);
			let rendered = match value {
				QueryValue::Single(value) => render_pair(&key, value.as_deref()),
				QueryValue::List(values) => values
					.iter()
					.map(|value| render_pair(&key, value.as_deref()))
					.collect::<Vec<_>>()
					.join("&"),
			};
			(!rendered.is_empty()).then_some(rendered)
		})
		.collect();

	if pairs.is_empty() {
		String::new()
	} else {
		format!("?{}", pairs.join("&"))
	}
}

/// Parses `raw` and overlays `extra` on top of it.
pub fn resolve_query(raw: &str, extra: &Query) -> Query {
	let mut query = parse_query(raw);
	for (key, value) in extra {
		query.insert(key.clone(), value.clone());
	}
	query
}

fn render_pair(key: &str, value: Option<&str>) -> String {
	match value {
		Some(value) => format!("{}={}", key, encode(value)),
		None => key.to_string(),
	}
}

fn encode(value: &str) -> String {
	utf8_percent_encode(value, QUERY_ENCODE_SET).to_string()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("", 0)]
	#[case("?", 0)]
	#[case("?a=1", 1)]
	#[case("#a=1&b=2", 2)]
	#[case("&a=1&&b", 2)]
	fn test_parse_query_key_count(#[case] raw: &str, #[case] expected: usize) {
		assert_eq!(parse_query(raw).len(), expected);
	}

	#[rstest]
	fn test_parse_query_values() {
		let query = parse_query("?q=hello+world&flag&tag=a&tag=b&enc=%E2%9C%93");

		assert_eq!(query.get("q"), Some(&QueryValue::from("hello world")));
		assert_eq!(query.get("flag"), Some(&QueryValue::Single(None)));
		assert_eq!(query.get("tag"), Some(&QueryValue::from(vec!["a", "b"])));
		assert_eq!(query.get("enc").and_then(QueryValue::first), Some("✓"));
	}

	#[rstest]
	fn test_parse_query_keeps_equals_in_value() {
		let query = parse_query("expr=a=b");
		assert_eq!(query.get("expr"), Some(&QueryValue::from("a=b")));
	}

	#[rstest]
	fn test_stringify_query() {
		let mut query = Query::new();
		query.insert("q".to_string(), QueryValue::from("a b"));
		query.insert("flag".to_string(), QueryValue::Single(None));
		query.insert("ids".to_string(), QueryValue::from(vec!["1,2", "3"]));
		query.insert("bang".to_string(), QueryValue::from("!"));

		assert_eq!(stringify_query(&query), "?q=a%20b&flag&ids=1,2&ids=3&bang=%21");
	}

	#[rstest]
	fn test_stringify_empty_query() {
		assert_eq!(stringify_query(&Query::new()), "");

		let mut query = Query::new();
		query.insert("empty".to_string(), QueryValue::List(Vec::new()));
		assert_eq!(stringify_query(&query), "");
	}

	#[rstest]
	fn test_resolve_query_overlays_extra() {
		let mut extra = Query::new();
		extra.insert("page".to_string(), QueryValue::from("2"));

		let query = resolve_query("page=1&sort=asc", &extra);

		assert_eq!(query.get("page"), Some(&QueryValue::from("2")));
		assert_eq!(query.get("sort"), Some(&QueryValue::from("asc")));
	}
}
