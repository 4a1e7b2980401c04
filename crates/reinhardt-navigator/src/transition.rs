//! The transition coordinator.
//!
//! [`RouterInner`] owns the current route and the navigation generation.
//! Every navigation request bumps the generation; a transition only commits
//! while its generation is still the latest one.

use crate::config::RouterSettings;
use crate::error::{FailureKind, NavigationError, NavigationFailure, NavigationResult};
use crate::hooks::{AfterHook, ErrorHandler, HookRegistry};
use crate::pipeline::{PipelineOutcome, panic_message, run_pipeline};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use reinhardt_history::{History, ListenerId, NavigationType};
use reinhardt_routes::{
	GuardError, GuardOutcome, NavigationGuard, RawLocation, ResolvedRoute, RouteMatcher, RouteRecord,
};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, warn};

/// Callback fired once the first navigation settles successfully.
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Callback fired when the first navigation settles with an error.
pub type ReadyErrorCallback = Box<dyn FnOnce(&NavigationError) + Send>;

pub(crate) struct RouterState {
	pub(crate) current: ResolvedRoute,
	pub(crate) ready: bool,
	pub(crate) ready_callbacks: Vec<(ReadyCallback, Option<ReadyErrorCallback>)>,
	pub(crate) attachments: usize,
	pub(crate) listener: Option<ListenerId>,
}

pub(crate) struct RouterInner {
	pub(crate) matcher: RwLock<RouteMatcher>,
	pub(crate) history: Arc<dyn History>,
	pub(crate) settings: RouterSettings,
	pub(crate) state: Mutex<RouterState>,
	pub(crate) generation: AtomicU64,
	pub(crate) before_each: HookRegistry<NavigationGuard>,
	pub(crate) before_resolve: HookRegistry<NavigationGuard>,
	pub(crate) after_each: HookRegistry<AfterHook>,
	pub(crate) error_handlers: HookRegistry<ErrorHandler>,
}

impl RouterInner {
	pub(crate) fn new(matcher: RouteMatcher, history: Arc<dyn History>, settings: RouterSettings) -> Self {
		Self {
			matcher: RwLock::new(matcher),
			history,
			settings,
			state: Mutex::new(RouterState {
				current: ResolvedRoute::start(),
				ready: false,
				ready_callbacks: Vec::new(),
				attachments: 0,
				listener: None,
			}),
			generation: AtomicU64::new(0),
			before_each: HookRegistry::new(),
			before_resolve: HookRegistry::new(),
			after_each: HookRegistry::new(),
			error_handlers: HookRegistry::new(),
		}
	}

	pub(crate) fn current_route(&self) -> ResolvedRoute {
		self.state.lock().current.clone()
	}

	fn is_current(&self, generation: u64) -> bool {
		self.generation.load(Ordering::SeqCst) == generation
	}

	/// Supersedes any navigation in flight.
	pub(crate) fn invalidate(&self) -> u64 {
		self.generation.fetch_add(1, Ordering::SeqCst) + 1
	}

	/// Runs a navigation and settles readiness with its result.
	pub(crate) async fn navigate(
		self: &Arc<Self>,
		raw: RawLocation,
		navigation: NavigationType,
	) -> NavigationResult<ResolvedRoute> {
		let generation = self.invalidate();
		let result = self.transition(raw, navigation, generation).await;

		match &result {
			Ok(_) => self.settle_ready(None),
			Err(NavigationError::Failure(failure)) if failure.kind() == FailureKind::Cancelled => {}
			Err(error) => self.settle_ready(Some(error)),
		}
		result
	}

	async fn transition(
		&self,
		mut raw: RawLocation,
		mut navigation: NavigationType,
		generation: u64,
	) -> NavigationResult<ResolvedRoute> {
		let mut redirected_from: Option<String> = None;
		let mut redirects = 0usize;

		loop {
			let from = self.current_route();
			let resolved = self
				.matcher
				.read()
				.resolve(&raw, Some(&from), raw.is_append());
			let to = match resolved {
				Ok((_, route)) => match &redirected_from {
					Some(original) => route.with_redirected_from(Some(original.clone())),
					None => route,
				},
				Err(e) => {
					if self.is_current(generation) {
						self.ensure_url(true);
					}
					return Err(e.into());
				}
			};

			if !raw.is_force() && to.is_same_route(&from) {
				self.ensure_url(false);
				let kind = if redirected_from.is_some() {
					FailureKind::Redirected
				} else {
					FailureKind::Duplicated
				};
				debug!(generation, to = %to.full_path(), ?kind, "navigation skipped");
				return Err(NavigationFailure::new(kind, &from, &to).into());
			}

			debug!(
				generation,
				from = %from.full_path(),
				to = %to.full_path(),
				?navigation,
				"navigation started"
			);

			let queue = self.build_queue(&from, &to);
			let outcome = run_pipeline(queue, &to, &from, || self.is_current(generation)).await;

			match outcome {
				PipelineOutcome::Completed => return self.commit(to, from, navigation, generation),
				PipelineOutcome::Cancelled => {
					debug!(generation, to = %to.full_path(), "navigation cancelled");
					return Err(NavigationFailure::new(FailureKind::Cancelled, &from, &to).into());
				}
				PipelineOutcome::Aborted => {
					self.ensure_url(true);
					return Err(NavigationFailure::new(FailureKind::Aborted, &from, &to).into());
				}
				PipelineOutcome::Error(guard_error) => {
					self.ensure_url(true);
					self.report_guard_error(&guard_error);
					return Err(guard_error.into());
				}
				PipelineOutcome::Redirect(target) => {
					redirects += 1;
					if redirects > self.settings.max_redirects {
						self.ensure_url(true);
						return Err(NavigationError::TooManyRedirects {
							limit: self.settings.max_redirects,
							target: target.to_string(),
						});
					}
					if redirected_from.is_none() {
						redirected_from = Some(to.redirected_from().unwrap_or(to.full_path()).to_string());
					}
					navigation = match (navigation, target.is_replace()) {
						(_, true) => NavigationType::Replace,
						(NavigationType::Pop, false) => NavigationType::Push,
						(other, false) => other,
					};
					debug!(generation, from = %to.full_path(), to = %target, "navigation redirected");
					raw = target;
				}
			}
		}
	}

	/// Guards in execution order for `from -> to`.
	fn build_queue(&self, from: &ResolvedRoute, to: &ResolvedRoute) -> Vec<Option<NavigationGuard>> {
		let (updated, deactivated, activated) = diff_chains(from.matched(), to.matched());

		let mut queue: Vec<Option<NavigationGuard>> = Vec::new();
		queue.extend(deactivated.iter().rev().map(|record| record.leave_guard().cloned()));
		queue.extend(self.before_each.snapshot().into_iter().map(Some));
		queue.extend(updated.iter().map(|record| record.update_guard().cloned()));
		queue.extend(activated.iter().map(|record| record.before_enter().cloned()));
		queue.push(lazy_components_guard(activated));
		queue.extend(activated.iter().map(|record| record.enter_guard().cloned()));
		queue.extend(self.before_resolve.snapshot().into_iter().map(Some));
		queue
	}

	fn commit(
		&self,
		to: ResolvedRoute,
		from: ResolvedRoute,
		navigation: NavigationType,
		generation: u64,
	) -> NavigationResult<ResolvedRoute> {
		{
			let mut state = self.state.lock();
			if !self.is_current(generation) {
				return Err(NavigationFailure::new(FailureKind::Cancelled, &from, &to).into());
			}

			let full_path = to.full_path();
			match navigation {
				NavigationType::Push => self.history.push(full_path)?,
				NavigationType::Replace => self.history.replace(full_path)?,
				NavigationType::Pop => {
					if self.history.current_location() != full_path {
						self.history.replace(full_path)?;
					}
				}
			}
			state.current = to.clone();
		}

		debug!(generation, from = %from.full_path(), to = %to.full_path(), "navigation committed");

		for hook in self.after_each.snapshot() {
			if let Err(payload) = catch_unwind(AssertUnwindSafe(|| hook(&to, &from))) {
				error!(
					to = %to.full_path(),
					panic = %panic_message(payload),
					"after hook panicked"
				);
			}
		}
		Ok(to)
	}

	/// Brings the history back in line with the current route.
	fn ensure_url(&self, push: bool) {
		let current = self.current_route();
		if current.full_path() == self.history.current_location() {
			return;
		}
		let result = if push {
			self.history.push(current.full_path())
		} else {
			self.history.replace(current.full_path())
		};
		if let Err(e) = result {
			debug!(error = %e, "could not restore history location");
		}
	}

	fn report_guard_error(&self, guard_error: &GuardError) {
		if self.error_handlers.is_empty() {
			warn!(error = %guard_error, "uncaught error during navigation");
			return;
		}
		for handler in self.error_handlers.snapshot() {
			handler(guard_error);
		}
	}

	fn settle_ready(&self, outcome: Option<&NavigationError>) {
		let callbacks = {
			let mut state = self.state.lock();
			if state.ready {
				return;
			}
			state.ready = true;
			std::mem::take(&mut state.ready_callbacks)
		};

		for (on_ready, on_error) in callbacks {
			match (outcome, on_error) {
				(None, _) => on_ready(),
				(Some(error), Some(on_error)) => on_error(error),
				(Some(_), None) => {}
			}
		}
	}

	/// Registers a readiness callback, firing it at once if already ready.
	pub(crate) fn on_ready(&self, on_ready: ReadyCallback, on_error: Option<ReadyErrorCallback>) {
		let mut state = self.state.lock();
		if state.ready {
			drop(state);
			on_ready();
		} else {
			state.ready_callbacks.push((on_ready, on_error));
		}
	}

	pub(crate) fn is_ready(&self) -> bool {
		self.state.lock().ready
	}

	/// Re-resolves the current location after the route tree changed.
	pub(crate) async fn refresh(self: &Arc<Self>) {
		if self.current_route().is_start() {
			return;
		}
		let location = self.history.current_location();
		if let Err(e) = self.navigate(RawLocation::from(location), NavigationType::Pop).await {
			debug!(error = %e, "re-resolving current location after route change failed");
		}
	}
}

/// Splits two matched chains into updated, deactivated and activated records.
fn diff_chains<'a>(
	current: &'a [Arc<RouteRecord>],
	next: &'a [Arc<RouteRecord>],
) -> (
	&'a [Arc<RouteRecord>],
	&'a [Arc<RouteRecord>],
	&'a [Arc<RouteRecord>],
) {
	let shared = current
		.iter()
		.zip(next.iter())
		.take_while(|(a, b)| a.id() == b.id())
		.count();
	(&next[..shared], &current[shared..], &next[shared..])
}

/// Loads every pending component of `records` in parallel and caches the results.
fn lazy_components_guard(records: &[Arc<RouteRecord>]) -> Option<NavigationGuard> {
	let pending: Vec<_> = records
		.iter()
		.flat_map(|record| {
			record
				.pending_components()
				.into_iter()
				.map(move |(outlet, loader)| (Arc::clone(record), outlet, loader))
		})
		.collect();
	if pending.is_empty() {
		return None;
	}

	Some(NavigationGuard::new(move |_to, _from| {
		let pending = pending.clone();
		async move {
			let loads = pending.into_iter().map(|(record, outlet, loader)| {
				let load = loader();
				async move { (record, outlet, load.await) }
			});

			for (record, outlet, result) in join_all(loads).await {
				match result {
					Ok(component) => record.resolve_component(&outlet, component),
					Err(reason) => {
						return GuardOutcome::Error(GuardError::ComponentLoad { outlet, reason });
					}
				}
			}
			GuardOutcome::Proceed
		}
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use reinhardt_routes::{ComponentId, PatternOptions, RouteConfig};
	use rstest::rstest;

	fn chain(matcher: &RouteMatcher, path: &str) -> Vec<Arc<RouteRecord>> {
		matcher
			.match_location(&RawLocation::from(path), None)
			.unwrap()
			.matched()
			.to_vec()
	}

	#[rstest]
	fn test_diff_chains() {
		let matcher = RouteMatcher::new(
			vec![
				RouteConfig::new("/users/:id")
					.child(RouteConfig::new("profile"))
					.child(RouteConfig::new("posts")),
				RouteConfig::new("/about"),
			],
			PatternOptions::default(),
		)
		.unwrap();
		let profile = chain(&matcher, "/users/1/profile");
		let posts = chain(&matcher, "/users/2/posts");
		let about = chain(&matcher, "/about");

		let (updated, deactivated, activated) = diff_chains(&profile, &posts);
		assert_eq!(updated.len(), 1);
		assert_eq!(deactivated[0].path(), "/users/:id/profile");
		assert_eq!(activated[0].path(), "/users/:id/posts");

		let (updated, deactivated, activated) = diff_chains(&posts, &about);
		assert!(updated.is_empty());
		assert_eq!(deactivated.len(), 2);
		assert_eq!(activated.len(), 1);
	}

	#[rstest]
	fn test_lazy_guard_absent_without_loaders() {
		let matcher =
			RouteMatcher::new(vec![RouteConfig::new("/").component("Home")], PatternOptions::default())
				.unwrap();
		assert!(lazy_components_guard(&chain(&matcher, "/")).is_none());
	}

	#[tokio::test]
	async fn test_lazy_guard_caches_components() {
		let matcher = RouteMatcher::new(
			vec![
				RouteConfig::new("/")
					.lazy_component(|| async { Ok(ComponentId::new("Home")) })
					.lazy_view("aside", || async { Ok(ComponentId::new("Sidebar")) }),
			],
			PatternOptions::default(),
		)
		.unwrap();
		let matched = chain(&matcher, "/");
		let guard = lazy_components_guard(&matched).unwrap();

		let outcome = guard
			.call(ResolvedRoute::start(), ResolvedRoute::start())
			.await;

		assert_eq!(outcome, GuardOutcome::Proceed);
		assert!(matched[0].pending_components().is_empty());
		assert_eq!(matched[0].component("aside").unwrap().as_str(), "Sidebar");
	}
}
