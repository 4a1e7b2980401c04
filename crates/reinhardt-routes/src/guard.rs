//! Navigation guards.
//!
//! A guard is an async function of `(to, from)` that decides whether a
//! navigation may continue. Guards resolve to a [`GuardOutcome`]; callback
//! style guards receive a single-use [`Next`] continuation instead.

use crate::location::RawLocation;
use crate::route::ResolvedRoute;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::{BoxFuture, pending};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Errors raised from inside guards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
	/// The guard reported an error.
	#[error("{0}")]
	Message(String),

	/// The guard panicked.
	#[error("navigation guard panicked: {0}")]
	Panicked(String),

	/// A lazily loaded component failed to resolve.
	#[error("failed to resolve component for outlet '{outlet}': {reason}")]
	ComponentLoad {
		/// Outlet whose component was being loaded.
		outlet: String,
		/// Loader error.
		reason: String,
	},
}

impl GuardError {
	/// Creates a guard error from a message.
	pub fn message(message: impl Into<String>) -> Self {
		Self::Message(message.into())
	}
}

/// The decision of a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
	/// Continue with the next step.
	Proceed,
	/// Abort the navigation.
	Abort,
	/// Abort and navigate to another location instead.
	Redirect(RawLocation),
	/// Abort with an error.
	Error(GuardError),
}

impl From<bool> for GuardOutcome {
	fn from(proceed: bool) -> Self {
		if proceed { Self::Proceed } else { Self::Abort }
	}
}

impl From<&str> for GuardOutcome {
	fn from(path: &str) -> Self {
		Self::Redirect(RawLocation::from(path))
	}
}

impl From<RawLocation> for GuardOutcome {
	fn from(location: RawLocation) -> Self {
		Self::Redirect(location)
	}
}

impl From<crate::location::LocationDescriptor> for GuardOutcome {
	fn from(descriptor: crate::location::LocationDescriptor) -> Self {
		Self::Redirect(RawLocation::Descriptor(descriptor))
	}
}

impl From<GuardError> for GuardOutcome {
	fn from(error: GuardError) -> Self {
		Self::Error(error)
	}
}

/// Boxed future returned by a guard.
pub type GuardFuture = BoxFuture<'static, GuardOutcome>;

type GuardFn = dyn Fn(ResolvedRoute, ResolvedRoute) -> GuardFuture + Send + Sync;

/// A shareable navigation guard.
#[derive(Clone)]
pub struct NavigationGuard(Arc<GuardFn>);

impl NavigationGuard {
	/// Creates a guard from an async function.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_routes::{GuardOutcome, NavigationGuard};
	///
	/// let guard = NavigationGuard::new(|to, _from| async move {
	///     if to.path().starts_with("/admin") {
	///         GuardOutcome::from("/login")
	///     } else {
	///         GuardOutcome::Proceed
	///     }
	/// });
	/// ```
	pub fn new<F, Fut>(guard: F) -> Self
	where
		F: Fn(ResolvedRoute, ResolvedRoute) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = GuardOutcome> + Send + 'static,
	{
		Self(Arc::new(move |to, from| guard(to, from).boxed()))
	}

	/// Creates a guard that decides synchronously.
	pub fn sync<F>(guard: F) -> Self
	where
		F: Fn(&ResolvedRoute, &ResolvedRoute) -> GuardOutcome + Send + Sync + 'static,
	{
		Self(Arc::new(move |to, from| {
			let outcome = guard(&to, &from);
			futures::future::ready(outcome).boxed()
		}))
	}

	/// Creates a callback-style guard driven by a [`Next`] continuation.
	///
	/// The pipeline waits until `next` is called. If every clone of `next` is
	/// dropped without being called the navigation stalls.
	pub fn with_next<F>(guard: F) -> Self
	where
		F: Fn(ResolvedRoute, ResolvedRoute, Next) + Send + Sync + 'static,
	{
		Self(Arc::new(move |to, from| {
			let (sender, receiver) = oneshot::channel();
			guard(to, from, Next::new(sender));
			async move {
				match receiver.await {
					Ok(outcome) => outcome,
					Err(_) => {
						warn!("navigation guard dropped its continuation without calling it");
						pending().await
					}
				}
			}
			.boxed()
		}))
	}

	/// Invokes the guard.
	pub fn call(&self, to: ResolvedRoute, from: ResolvedRoute) -> GuardFuture {
		(self.0)(to, from)
	}
}

impl fmt::Debug for NavigationGuard {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NavigationGuard").finish_non_exhaustive()
	}
}

/// Single-use continuation handed to callback-style guards.
///
/// Only the first call has an effect; later calls are ignored.
#[derive(Clone)]
pub struct Next {
	sender: Arc<Mutex<Option<oneshot::Sender<GuardOutcome>>>>,
}

impl Next {
	fn new(sender: oneshot::Sender<GuardOutcome>) -> Self {
		Self {
			sender: Arc::new(Mutex::new(Some(sender))),
		}
	}

	/// Resolves the guard with an outcome.
	pub fn call(&self, outcome: impl Into<GuardOutcome>) {
		let Some(sender) = self.sender.lock().take() else {
			warn!("navigation guard continuation called more than once");
			return;
		};
		// The pipeline may already have been dropped.
		let _ = sender.send(outcome.into());
	}

	/// Continues the navigation.
	pub fn proceed(&self) {
		self.call(GuardOutcome::Proceed);
	}

	/// Aborts the navigation.
	pub fn abort(&self) {
		self.call(GuardOutcome::Abort);
	}

	/// Redirects the navigation.
	pub fn redirect(&self, location: impl Into<RawLocation>) {
		self.call(GuardOutcome::Redirect(location.into()));
	}

	/// Returns whether the continuation has already been used.
	pub fn is_called(&self) -> bool {
		self.sender.lock().is_none()
	}
}

impl fmt::Debug for Next {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Next")
			.field("called", &self.is_called())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(true, GuardOutcome::Proceed)]
	#[case(false, GuardOutcome::Abort)]
	fn test_outcome_from_bool(#[case] input: bool, #[case] expected: GuardOutcome) {
		assert_eq!(GuardOutcome::from(input), expected);
	}

	#[rstest]
	fn test_outcome_from_path() {
		assert_eq!(
			GuardOutcome::from("/login"),
			GuardOutcome::Redirect(RawLocation::Path("/login".to_string()))
		);
	}

	#[tokio::test]
	async fn test_async_guard() {
		let guard = NavigationGuard::new(|to, _from| async move {
			GuardOutcome::from(to.path() == "/")
		});

		let outcome = guard
			.call(ResolvedRoute::start(), ResolvedRoute::start())
			.await;

		assert_eq!(outcome, GuardOutcome::Proceed);
	}

	#[tokio::test]
	async fn test_sync_guard() {
		let guard = NavigationGuard::sync(|_to, _from| GuardOutcome::Abort);
		let outcome = guard
			.call(ResolvedRoute::start(), ResolvedRoute::start())
			.await;
		assert_eq!(outcome, GuardOutcome::Abort);
	}

	#[tokio::test]
	async fn test_next_only_first_call_counts() {
		let guard = NavigationGuard::with_next(|_to, _from, next| {
			next.redirect("/first");
			next.abort();
			assert!(next.is_called());
		});

		let outcome = guard
			.call(ResolvedRoute::start(), ResolvedRoute::start())
			.await;

		assert_eq!(outcome, GuardOutcome::from("/first"));
	}

	#[tokio::test]
	async fn test_next_called_later() {
		let guard = NavigationGuard::with_next(|_to, _from, next| {
			tokio::spawn(async move {
				tokio::task::yield_now().await;
				next.call(GuardError::message("denied"));
			});
		});

		let outcome = guard
			.call(ResolvedRoute::start(), ResolvedRoute::start())
			.await;

		assert_eq!(outcome, GuardOutcome::Error(GuardError::message("denied")));
	}
}
