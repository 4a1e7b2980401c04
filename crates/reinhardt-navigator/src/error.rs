//! Navigation errors and failures.
//!
//! A [`NavigationFailure`] is an expected terminal state of a navigation
//! (aborted by a guard, superseded, redundant). Everything else in
//! [`NavigationError`] is a genuine error.

use reinhardt_history::HistoryError;
use reinhardt_routes::{GuardError, ResolvedRoute, RouterError};
use thiserror::Error;

/// Why a navigation did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
	/// A guard redirected to the location that is already current.
	Redirected,
	/// A guard aborted the navigation.
	Aborted,
	/// A newer navigation started before this one finished.
	Cancelled,
	/// The target is already the current location.
	Duplicated,
}

impl FailureKind {
	/// Returns the kind's flag for mask checks.
	pub fn bits(self) -> u8 {
		match self {
			Self::Redirected => 2,
			Self::Aborted => 4,
			Self::Cancelled => 8,
			Self::Duplicated => 16,
		}
	}
}

/// A navigation that ended without committing.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct NavigationFailure {
	kind: FailureKind,
	from: ResolvedRoute,
	to: ResolvedRoute,
	message: String,
}

impl NavigationFailure {
	pub(crate) fn new(kind: FailureKind, from: &ResolvedRoute, to: &ResolvedRoute) -> Self {
		let message = match kind {
			FailureKind::Redirected => format!(
				"Redirected when going from \"{}\" to \"{}\" via a navigation guard.",
				from.full_path(),
				to.full_path()
			),
			FailureKind::Aborted => format!(
				"Navigation aborted from \"{}\" to \"{}\" via a navigation guard.",
				from.full_path(),
				to.full_path()
			),
			FailureKind::Cancelled => format!(
				"Navigation cancelled from \"{}\" to \"{}\" with a new navigation.",
				from.full_path(),
				to.full_path()
			),
			FailureKind::Duplicated => format!(
				"Avoided redundant navigation to current location: \"{}\".",
				from.full_path()
			),
		};
		Self {
			kind,
			from: from.clone(),
			to: to.clone(),
			message,
		}
	}

	/// Returns the failure kind.
	pub fn kind(&self) -> FailureKind {
		self.kind
	}

	/// Returns the route that was current when the navigation started.
	pub fn from(&self) -> &ResolvedRoute {
		&self.from
	}

	/// Returns the route the navigation was heading to.
	pub fn to(&self) -> &ResolvedRoute {
		&self.to
	}

	/// Returns whether the kind is part of `mask`.
	pub fn matches(&self, mask: u8) -> bool {
		self.kind.bits() & mask != 0
	}
}

/// Errors produced by router construction and navigation.
#[derive(Debug, Clone, Error)]
pub enum NavigationError {
	/// Route compilation or matching failed.
	#[error(transparent)]
	Router(#[from] RouterError),

	/// The history adapter rejected the operation.
	#[error(transparent)]
	History(#[from] HistoryError),

	/// The navigation ended in an expected failure state.
	#[error(transparent)]
	Failure(#[from] NavigationFailure),

	/// A guard raised an error, panicked, or a lazy component failed to load.
	#[error("navigation guard failed: {0}")]
	Guard(#[from] GuardError),

	/// Guards kept redirecting.
	#[error("exceeded {limit} redirects while navigating to '{target}'")]
	TooManyRedirects {
		/// Configured limit.
		limit: usize,
		/// Last redirect target.
		target: String,
	},

	/// Router settings could not be parsed.
	#[error("invalid router settings: {0}")]
	InvalidSettings(String),
}

impl NavigationError {
	/// Returns the failure, if this is one.
	pub fn failure(&self) -> Option<&NavigationFailure> {
		match self {
			Self::Failure(failure) => Some(failure),
			_ => None,
		}
	}
}

/// Returns whether `error` is a navigation failure, optionally of a given kind.
///
/// # Examples
///
/// ```
/// use reinhardt_navigator::{FailureKind, NavigationError, is_navigation_failure};
///
/// let error = NavigationError::InvalidSettings("bad".to_string());
/// assert!(!is_navigation_failure(&error, None));
/// assert!(!is_navigation_failure(&error, Some(FailureKind::Aborted)));
/// ```
pub fn is_navigation_failure(error: &NavigationError, kind: Option<FailureKind>) -> bool {
	match (error.failure(), kind) {
		(Some(failure), Some(kind)) => failure.kind() == kind,
		(Some(_), None) => true,
		(None, _) => false,
	}
}

/// Navigation result type.
pub type NavigationResult<T> = Result<T, NavigationError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(FailureKind::Redirected, 2)]
	#[case(FailureKind::Aborted, 4)]
	#[case(FailureKind::Cancelled, 8)]
	#[case(FailureKind::Duplicated, 16)]
	fn test_failure_bits(#[case] kind: FailureKind, #[case] bits: u8) {
		assert_eq!(kind.bits(), bits);
	}

	#[rstest]
	fn test_failure_messages() {
		let start = ResolvedRoute::start();
		let duplicated = NavigationFailure::new(FailureKind::Duplicated, &start, &start);
		assert_eq!(
			duplicated.to_string(),
			"Avoided redundant navigation to current location: \"/\"."
		);

		let aborted = NavigationFailure::new(FailureKind::Aborted, &start, &start);
		assert!(aborted.to_string().starts_with("Navigation aborted"));
		assert!(aborted.matches(FailureKind::Aborted.bits() | FailureKind::Cancelled.bits()));
		assert!(!aborted.matches(FailureKind::Duplicated.bits()));
	}

	#[rstest]
	fn test_is_navigation_failure() {
		let start = ResolvedRoute::start();
		let error = NavigationError::from(NavigationFailure::new(
			FailureKind::Cancelled,
			&start,
			&start,
		));

		assert!(is_navigation_failure(&error, None));
		assert!(is_navigation_failure(&error, Some(FailureKind::Cancelled)));
		assert!(!is_navigation_failure(&error, Some(FailureKind::Aborted)));
		assert!(!is_navigation_failure(
			&NavigationError::Guard(GuardError::message("boom")),
			None
		));
	}
}
