//! Path pattern compilation.
//!
//! Route templates are compiled once into a [`PathPattern`], which can test a
//! concrete path, extract its parameters and format a path back from
//! parameters.
//!
//! Supported template syntax:
//! - `/users/:id` - a named segment (excludes `/`)
//! - `/users/:id?` - an optional segment
//! - `/files/:path+` - a repeatable segment, one or more
//! - `/files/:path*` - a repeatable segment, zero or more
//! - `/users/:id(\\d+)` - a segment constrained by a custom regular expression
//! - `/(\\d+)` - an unnamed group, keyed by its index (`"0"`, `"1"`, ...)
//! - `*` - a catch-all, keyed `pathMatch`
//!
//! Case sensitivity and trailing-slash strictness are fixed when the pattern
//! is compiled, see [`PatternOptions`].

use crate::error::RouterError;
use crate::params::{ParamValue, Params};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Parameter name used by the `*` catch-all.
pub const CATCH_ALL_PARAM: &str = "pathMatch";

/// Maximum allowed length for a route template in bytes.
const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum allowed number of path segments in a route template.
const MAX_PATH_SEGMENTS: usize = 32;

/// Maximum allowed size for a compiled template regex (in bytes).
const MAX_REGEX_SIZE: usize = 1 << 20; // 1 MiB

const DEFAULT_DELIMITER: char = '/';
const DEFAULT_SEGMENT: &str = "[^/]+?";
const CATCH_ALL_SEGMENT: &str = ".*";

/// Bytes escaped when formatting a segment: what `encodeURI` escapes, plus `/`, `?` and `#`.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'_')
	.remove(b'.')
	.remove(b'!')
	.remove(b'~')
	.remove(b'*')
	.remove(b'\'')
	.remove(b'(')
	.remove(b')')
	.remove(b';')
	.remove(b',')
	.remove(b':')
	.remove(b'@')
	.remove(b'&')
	.remove(b'=')
	.remove(b'+')
	.remove(b'$');

/// Catch-all values keep their slashes.
const CATCH_ALL_ENCODE_SET: &AsciiSet = &SEGMENT_ENCODE_SET.remove(b'/');

/// Compile-time matching options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternOptions {
	/// Match letter case exactly.
	pub sensitive: bool,
	/// Require the trailing slash to match exactly.
	pub strict: bool,
}

impl PatternOptions {
	/// Creates options with case sensitivity and strictness set.
	pub fn new(sensitive: bool, strict: bool) -> Self {
		Self { sensitive, strict }
	}
}

/// A parameter declared by a template.
#[derive(Debug, Clone)]
pub struct ParamKey {
	name: String,
	prefix: Option<char>,
	optional: bool,
	repeat: bool,
	partial: bool,
	catch_all: bool,
	pattern: String,
	validator: Regex,
}

impl ParamKey {
	/// Returns the parameter name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns whether the parameter may be omitted.
	pub fn is_optional(&self) -> bool {
		self.optional
	}

	/// Returns whether the parameter captures a list of segments.
	pub fn is_repeat(&self) -> bool {
		self.repeat
	}

	/// Returns the regular expression a value must satisfy.
	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	fn delimiter(&self) -> char {
		self.prefix.unwrap_or(DEFAULT_DELIMITER)
	}

	fn encode(&self, value: &str) -> String {
		let set = if self.catch_all {
			CATCH_ALL_ENCODE_SET
		} else {
			SEGMENT_ENCODE_SET
		};
		utf8_percent_encode(value, set).to_string()
	}

	fn validate(&self, segment: &str) -> Result<(), RouterError> {
		if self.validator.is_match(segment) {
			Ok(())
		} else {
			Err(RouterError::invalid_param(
				&self.name,
				format!("'{}' does not match '{}'", segment, self.pattern),
			))
		}
	}
}

#[derive(Debug, Clone)]
enum Token {
	Static(String),
	Param(ParamKey),
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct PathPattern {
	template: String,
	options: PatternOptions,
	tokens: Vec<Token>,
	regex: Regex,
}

impl PathPattern {
	/// Compiles a template with default options (case-insensitive, lenient trailing slash).
	///
	/// # Errors
	///
	/// See [`PathPattern::compile`].
	pub fn new(template: &str) -> Result<Self, RouterError> {
		Self::compile(template, PatternOptions::default())
	}

	/// Compiles a template into a matcher.
	///
	/// # Errors
	///
	/// Returns [`RouterError::InvalidPattern`] if:
	/// - the template exceeds 1024 bytes or 32 segments
	/// - a group is nested or left unterminated
	/// - a custom segment expression is not a valid regular expression
	pub fn compile(template: &str, options: PatternOptions) -> Result<Self, RouterError> {
		// Reject templates exceeding the maximum length to prevent ReDoS
		if template.len() > MAX_PATTERN_LENGTH {
			return Err(RouterError::invalid_pattern(
				template,
				format!(
					"length {} exceeds maximum allowed length of {} bytes",
					template.len(),
					MAX_PATTERN_LENGTH
				),
			));
		}

		let segment_count = template.split('/').count();
		if segment_count > MAX_PATH_SEGMENTS {
			return Err(RouterError::invalid_pattern(
				template,
				format!(
					"{} path segments exceed the maximum of {}",
					segment_count, MAX_PATH_SEGMENTS
				),
			));
		}

		let tokens = parse(template)?;
		let regex = build_regex(template, &tokens, options)?;

		Ok(Self {
			template: template.to_string(),
			options,
			tokens,
			regex,
		})
	}

	/// Returns the template string.
	pub fn template(&self) -> &str {
		&self.template
	}

	/// Returns the options the template was compiled with.
	pub fn options(&self) -> PatternOptions {
		self.options
	}

	/// Returns the declared parameters in template order.
	pub fn keys(&self) -> impl Iterator<Item = &ParamKey> {
		self.tokens.iter().filter_map(|token| match token {
			Token::Param(key) => Some(key),
			Token::Static(_) => None,
		})
	}

	/// Returns the parameter names in template order.
	pub fn param_names(&self) -> Vec<&str> {
		self.keys().map(ParamKey::name).collect()
	}

	/// Returns the names of parameters that must be supplied when formatting.
	pub fn required_param_names(&self) -> Vec<&str> {
		self.keys()
			.filter(|key| !key.optional)
			.map(ParamKey::name)
			.collect()
	}

	/// Returns whether the template declares no parameters.
	pub fn is_static(&self) -> bool {
		self.keys().next().is_none()
	}

	/// Returns whether this template is the bare catch-all `*`.
	pub fn is_catch_all(&self) -> bool {
		self.template == "*"
	}

	/// Checks whether the pattern matches a path.
	pub fn is_match(&self, path: &str) -> bool {
		self.regex.is_match(path)
	}

	/// Matches a path and extracts its decoded parameters.
	///
	/// Optional parameters that did not participate are omitted from the map.
	pub fn match_path(&self, path: &str) -> Option<Params> {
		let captures = self.regex.captures(path)?;
		let mut params = Params::new();

		for (index, key) in self.keys().enumerate() {
			let Some(capture) = captures.get(index + 1) else {
				continue;
			};
			let value = if key.repeat {
				ParamValue::List(
					capture
						.as_str()
						.split(key.delimiter())
						.map(decode_component)
						.collect(),
				)
			} else {
				ParamValue::Single(decode_component(capture.as_str()))
			};
			params.insert(key.name.clone(), value);
		}

		Some(params)
	}

	/// Formats a path from parameters.
	///
	/// # Errors
	///
	/// - [`RouterError::MissingParam`] when a required parameter is absent.
	/// - [`RouterError::InvalidParamValue`] when a value fails its segment
	///   constraint, a list is given for a non-repeatable segment, or a single
	///   value is given for a repeatable one.
	pub fn format(&self, params: &Params) -> Result<String, RouterError> {
		let mut path = String::new();

		for token in &self.tokens {
			let key = match token {
				Token::Static(text) => {
					path.push_str(text);
					continue;
				}
				Token::Param(key) => key,
			};

			match params.get(&key.name) {
				None => {
					if key.optional {
						if key.partial
							&& let Some(prefix) = key.prefix
						{
							path.push(prefix);
						}
						continue;
					}
					return Err(RouterError::MissingParam {
						param: key.name.clone(),
						template: self.template.clone(),
					});
				}
				Some(ParamValue::List(values)) => {
					if !key.repeat {
						return Err(RouterError::invalid_param(
							&key.name,
							"expected a single value, received a list",
						));
					}
					if values.is_empty() {
						if key.optional {
							continue;
						}
						return Err(RouterError::invalid_param(
							&key.name,
							"expected at least one value",
						));
					}
					for (index, value) in values.iter().enumerate() {
						let segment = key.encode(value);
						key.validate(&segment)?;
						if index == 0 {
							if let Some(prefix) = key.prefix {
								path.push(prefix);
							}
						} else {
							path.push(key.delimiter());
						}
						path.push_str(&segment);
					}
				}
				Some(ParamValue::Single(value)) => {
					if key.repeat {
						return Err(RouterError::invalid_param(
							&key.name,
							"expected a list of values for a repeatable segment",
						));
					}
					let segment = key.encode(value);
					key.validate(&segment)?;
					if let Some(prefix) = key.prefix {
						path.push(prefix);
					}
					path.push_str(&segment);
				}
			}
		}

		Ok(path)
	}
}

impl PartialEq for PathPattern {
	fn eq(&self, other: &Self) -> bool {
		self.template == other.template && self.options == other.options
	}
}

impl Eq for PathPattern {}

impl fmt::Display for PathPattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.template)
	}
}

/// Decodes a percent-encoded component, keeping the raw text if it is not valid UTF-8.
pub(crate) fn decode_component(raw: &str) -> String {
	percent_decode_str(raw)
		.decode_utf8()
		.map(|decoded| decoded.into_owned())
		.unwrap_or_else(|_| raw.to_string())
}

fn parse(template: &str) -> Result<Vec<Token>, RouterError> {
	let chars: Vec<char> = template.chars().collect();
	let mut tokens = Vec::new();
	let mut literal = String::new();
	let mut unnamed = 0usize;
	let mut i = 0;

	while i < chars.len() {
		let c = chars[i];

		if c == '\\' {
			match chars.get(i + 1) {
				Some(&escaped) => {
					literal.push(escaped);
					i += 2;
				}
				None => {
					literal.push(c);
					i += 1;
				}
			}
			continue;
		}

		let prefix = match c {
			'/' | '.' if starts_param(&chars, i + 1) => Some(c),
			_ => None,
		};
		let start = if prefix.is_some() { i + 1 } else { i };
		if !starts_param(&chars, start) {
			literal.push(c);
			i += 1;
			continue;
		}

		let mut cursor = start;
		let (name, custom, catch_all) = match chars[cursor] {
			':' => {
				cursor += 1;
				let name_start = cursor;
				while cursor < chars.len() && is_word(chars[cursor]) {
					cursor += 1;
				}
				let name: String = chars[name_start..cursor].iter().collect();
				let custom = if chars.get(cursor) == Some(&'(') {
					let (group, end) = read_group(template, &chars, cursor)?;
					cursor = end;
					Some(group)
				} else {
					None
				};
				(name, custom, false)
			}
			'(' => {
				let (group, end) = read_group(template, &chars, cursor)?;
				cursor = end;
				let name = unnamed.to_string();
				unnamed += 1;
				(name, Some(group), false)
			}
			_ => {
				cursor += 1;
				(CATCH_ALL_PARAM.to_string(), None, true)
			}
		};

		let modifier = if catch_all {
			None
		} else {
			match chars.get(cursor) {
				Some(&m @ ('+' | '*' | '?')) => {
					cursor += 1;
					Some(m)
				}
				_ => None,
			}
		};
		let partial = match (prefix, chars.get(cursor)) {
			(Some(p), Some(&next)) => next != p,
			_ => false,
		};

		if !literal.is_empty() {
			tokens.push(Token::Static(std::mem::take(&mut literal)));
		}

		let pattern = custom.unwrap_or_else(|| {
			if catch_all {
				CATCH_ALL_SEGMENT.to_string()
			} else {
				DEFAULT_SEGMENT.to_string()
			}
		});
		let validator = Regex::new(&format!("^(?:{})$", pattern))
			.map_err(|e| RouterError::invalid_pattern(template, e.to_string()))?;

		tokens.push(Token::Param(ParamKey {
			name,
			prefix,
			optional: matches!(modifier, Some('?' | '*')),
			repeat: matches!(modifier, Some('+' | '*')),
			partial,
			catch_all,
			pattern,
			validator,
		}));
		i = cursor;
	}

	if !literal.is_empty() {
		tokens.push(Token::Static(literal));
	}

	Ok(tokens)
}

fn starts_param(chars: &[char], at: usize) -> bool {
	match chars.get(at) {
		Some(':') => chars.get(at + 1).is_some_and(|c| is_word(*c)),
		Some('(') | Some('*') => true,
		_ => false,
	}
}

fn is_word(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_'
}

/// Reads a `( ... )` group starting at `open`, returning its body and the index after `)`.
fn read_group(template: &str, chars: &[char], open: usize) -> Result<(String, usize), RouterError> {
	let mut group = String::new();
	let mut cursor = open + 1;

	while let Some(&c) = chars.get(cursor) {
		match c {
			'\\' => {
				group.push(c);
				if let Some(&next) = chars.get(cursor + 1) {
					group.push(next);
				}
				cursor += 2;
			}
			')' => {
				if group.is_empty() {
					return Err(RouterError::invalid_pattern(template, "empty group"));
				}
				return Ok((group, cursor + 1));
			}
			'(' => {
				return Err(RouterError::invalid_pattern(
					template,
					"nested groups are not supported",
				));
			}
			_ => {
				group.push(c);
				cursor += 1;
			}
		}
	}

	Err(RouterError::invalid_pattern(template, "unterminated group"))
}

fn build_regex(
	template: &str,
	tokens: &[Token],
	options: PatternOptions,
) -> Result<Regex, RouterError> {
	let mut route = String::from("^");

	for token in tokens {
		match token {
			Token::Static(text) => route.push_str(&regex::escape(text)),
			Token::Param(key) => {
				let prefix = key
					.prefix
					.map(|p| regex::escape(&p.to_string()))
					.unwrap_or_default();
				let mut capture = format!("(?:{})", key.pattern);
				if key.repeat {
					capture = format!("{capture}(?:{prefix}{capture})*");
				}
				let capture = match (key.optional, key.partial) {
					(true, false) => format!("(?:{prefix}({capture}))?"),
					(true, true) => format!("{prefix}({capture})?"),
					(false, _) => format!("{prefix}({capture})"),
				};
				route.push_str(&capture);
			}
		}
	}

	if !options.strict {
		if route.ends_with('/') {
			route.pop();
		}
		route.push_str("/?");
	}
	route.push('$');

	// Use RegexBuilder with size limits to prevent memory exhaustion
	RegexBuilder::new(&route)
		.case_insensitive(!options.sensitive)
		.size_limit(MAX_REGEX_SIZE)
		.build()
		.map_err(|e| RouterError::invalid_pattern(template, e.to_string()))
}
