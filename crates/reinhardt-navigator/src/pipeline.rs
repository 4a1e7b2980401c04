//! Sequential guard execution.
//!
//! Guards run one at a time in the given order. The first guard that does
//! not proceed ends the run. Before each guard, and again after each guard
//! settles, the run checks whether it has been superseded; a superseded run
//! reports [`PipelineOutcome::Cancelled`] and starts no further guards.

use futures::FutureExt;
use reinhardt_routes::{GuardError, GuardOutcome, NavigationGuard, RawLocation, ResolvedRoute};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
	/// Every guard proceeded.
	Completed,
	/// A guard aborted.
	Aborted,
	/// A guard asked for another location.
	Redirect(RawLocation),
	/// A guard raised an error or panicked.
	Error(GuardError),
	/// The run was superseded.
	Cancelled,
}

/// Runs `steps` against `(to, from)`. `None` steps are skipped.
pub async fn run_pipeline<I, F>(
	steps: I,
	to: &ResolvedRoute,
	from: &ResolvedRoute,
	is_current: F,
) -> PipelineOutcome
where
	I: IntoIterator<Item = Option<NavigationGuard>>,
	F: Fn() -> bool,
{
	for guard in steps.into_iter().flatten() {
		if !is_current() {
			return PipelineOutcome::Cancelled;
		}

		let outcome = invoke(&guard, to, from).await;

		if !is_current() {
			return PipelineOutcome::Cancelled;
		}

		match outcome {
			GuardOutcome::Proceed => {}
			GuardOutcome::Abort => return PipelineOutcome::Aborted,
			GuardOutcome::Redirect(location) => return PipelineOutcome::Redirect(location),
			GuardOutcome::Error(error) => return PipelineOutcome::Error(error),
		}
	}
	PipelineOutcome::Completed
}

async fn invoke(guard: &NavigationGuard, to: &ResolvedRoute, from: &ResolvedRoute) -> GuardOutcome {
	let future = match catch_unwind(AssertUnwindSafe(|| guard.call(to.clone(), from.clone()))) {
		Ok(future) => future,
		Err(payload) => return GuardOutcome::Error(GuardError::Panicked(panic_message(payload))),
	};

	match AssertUnwindSafe(future).catch_unwind().await {
		Ok(outcome) => outcome,
		Err(payload) => GuardOutcome::Error(GuardError::Panicked(panic_message(payload))),
	}
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic".to_string()
	}
}
