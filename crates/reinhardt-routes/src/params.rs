//! Path parameter values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Parameters extracted from, or used to format, a path.
pub type Params = HashMap<String, ParamValue>;

/// The value of a single path parameter.
///
/// Repeatable segments (`:path+`, `:path*`) produce [`ParamValue::List`];
/// every other segment produces [`ParamValue::Single`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
	/// A single segment value.
	Single(String),
	/// The segments captured by a repeatable parameter.
	List(Vec<String>),
}

impl ParamValue {
	/// Returns the value if this is a single segment.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Single(value) => Some(value),
			Self::List(_) => None,
		}
	}

	/// Returns the segments if this is a repeated value.
	pub fn as_list(&self) -> Option<&[String]> {
		match self {
			Self::Single(_) => None,
			Self::List(values) => Some(values),
		}
	}
}

impl fmt::Display for ParamValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Single(value) => f.write_str(value),
			Self::List(values) => f.write_str(&values.join("/")),
		}
	}
}

impl From<&str> for ParamValue {
	fn from(value: &str) -> Self {
		Self::Single(value.to_string())
	}
}

impl From<String> for ParamValue {
	fn from(value: String) -> Self {
		Self::Single(value)
	}
}

impl From<i64> for ParamValue {
	fn from(value: i64) -> Self {
		Self::Single(value.to_string())
	}
}

impl From<Vec<String>> for ParamValue {
	fn from(values: Vec<String>) -> Self {
		Self::List(values)
	}
}

impl From<Vec<&str>> for ParamValue {
	fn from(values: Vec<&str>) -> Self {
		Self::List(values.into_iter().map(str::to_string).collect())
	}
}

/// Builds a [`Params`] map from `key => value` pairs.
///
/// ```
/// use reinhardt_routes::{ParamValue, params};
///
/// let p = params! { "id" => "7", "tags" => vec!["a", "b"] };
/// assert_eq!(p.get("id"), Some(&ParamValue::from("7")));
/// ```
#[macro_export]
macro_rules! params {
	() => {
		$crate::Params::new()
	};
	($($key:expr => $value:expr),+ $(,)?) => {{
		let mut params = $crate::Params::new();
		$(
			params.insert(::std::string::String::from($key), $crate::ParamValue::from($value));
		)+
		params
	}};
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_param_value_accessors() {
		let single = ParamValue::from("42");
		assert_eq!(single.as_str(), Some("42"));
		assert!(single.as_list().is_none());

		let list = ParamValue::from(vec!["a", "b"]);
		assert_eq!(list.as_list(), Some(&["a".to_string(), "b".to_string()][..]));
		assert_eq!(list.to_string(), "a/b");
	}

	#[rstest]
	fn test_params_macro() {
		let p = params! { "id" => 7_i64, "slug" => "hello" };
		assert_eq!(p.len(), 2);
		assert_eq!(p.get("id"), Some(&ParamValue::Single("7".to_string())));
	}

	#[rstest]
	fn test_param_value_serde_untagged() {
		let json = serde_json::to_string(&ParamValue::from(vec!["x", "y"])).unwrap();
		assert_eq!(json, r#"["x","y"]"#);
		let parsed: ParamValue = serde_json::from_str(r#""7""#).unwrap();
		assert_eq!(parsed, ParamValue::from("7"));
	}
}
