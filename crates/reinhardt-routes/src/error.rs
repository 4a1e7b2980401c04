//! Error types for route compilation and matching.

use thiserror::Error;

/// Errors raised while compiling route patterns or resolving locations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
	/// A named location referenced a route name that is not registered.
	#[error("no route named '{0}'")]
	NoSuchNamedRoute(String),

	/// A required path parameter was not supplied while formatting a path.
	#[error("missing required parameter '{param}' for path '{template}'")]
	MissingParam {
		/// Name of the missing parameter.
		param: String,
		/// Template being formatted.
		template: String,
	},

	/// A supplied parameter value does not satisfy its segment.
	#[error("invalid value for parameter '{param}': {reason}")]
	InvalidParamValue {
		/// Name of the offending parameter.
		param: String,
		/// Why the value was rejected.
		reason: String,
	},

	/// A path template could not be compiled.
	#[error("invalid route pattern '{pattern}': {reason}")]
	InvalidPattern {
		/// The template as declared.
		pattern: String,
		/// Compilation failure detail.
		reason: String,
	},

	/// Two records in the route tree share a name.
	#[error("duplicate route name '{0}'")]
	DuplicateRouteName(String),

	/// Following redirects revisited a record already seen in this resolution.
	#[error("redirect loop detected at '{0}'")]
	RedirectLoop(String),

	/// A redirect target carries neither a name nor a path.
	#[error("route '{0}' redirects to a location without a name or path")]
	InvalidRedirect(String),
}

impl RouterError {
	pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
		Self::InvalidPattern {
			pattern: pattern.to_string(),
			reason: reason.into(),
		}
	}

	pub(crate) fn invalid_param(param: &str, reason: impl Into<String>) -> Self {
		Self::InvalidParamValue {
			param: param.to_string(),
			reason: reason.into(),
		}
	}
}
