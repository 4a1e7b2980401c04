//! The public router handle.

use crate::config::{RouterOptions, RouterSettings};
use crate::error::{NavigationError, NavigationResult};
use crate::hooks::HookHandle;
use crate::transition::{ReadyCallback, ReadyErrorCallback, RouterInner};
use reinhardt_history::{History, HistoryMode, NavigationType, create_history};
use reinhardt_routes::{
	ComponentId, GuardError, Location, NavigationGuard, RawLocation, RecordId, ResolvedRoute,
	RouteConfig, RouteMatcher, RouteRecord, RouterError,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of [`Router::resolve`].
#[derive(Debug, Clone)]
pub struct Resolution {
	/// The normalized location.
	pub location: Location,
	/// The matched route.
	pub route: ResolvedRoute,
	/// Link target for the location, including base and fragment prefix.
	pub href: String,
}

/// A navigation engine instance.
///
/// Cloning is cheap; clones share the same state.
///
/// # Examples
///
/// ```
/// use reinhardt_history::HistoryMode;
/// use reinhardt_navigator::{Router, RouterOptions};
/// use reinhardt_routes::RouteConfig;
///
/// # tokio_test::block_on(async {
/// let router = Router::new(
///     RouterOptions::new()
///         .mode(HistoryMode::Memory)
///         .route(RouteConfig::new("/").named("home"))
///         .route(RouteConfig::new("/users/:id").named("user")),
/// )
/// .unwrap();
///
/// let route = router.push("/users/7").await.unwrap();
/// assert_eq!(route.name(), Some("user"));
/// assert_eq!(router.current_route().path(), "/users/7");
/// # });
/// ```
#[derive(Clone)]
pub struct Router {
	inner: Arc<RouterInner>,
}

impl Router {
	/// Builds a router.
	///
	/// # Errors
	///
	/// Fails when a route is invalid or the history mode cannot be used on
	/// the configured host.
	pub fn new(options: RouterOptions) -> NavigationResult<Self> {
		let RouterOptions {
			settings,
			routes,
			host,
			history,
		} = options;

		let matcher = RouteMatcher::new(routes, settings.pattern_options())?;
		let history = match history {
			Some(history) => history,
			None => create_history(settings.mode, &settings.base, settings.fallback, host)?,
		};
		debug!(mode = %history.mode(), base = %history.base(), "router created");

		Ok(Self {
			inner: Arc::new(RouterInner::new(matcher, history, settings)),
		})
	}

	/// Navigates to `location`, adding a history entry.
	///
	/// A descriptor with `replace` set behaves like [`Router::replace`].
	///
	/// # Errors
	///
	/// Returns a [`NavigationError::Failure`] when the navigation was aborted,
	/// superseded or redundant, and other variants for real errors.
	pub async fn push(&self, location: impl Into<RawLocation>) -> NavigationResult<ResolvedRoute> {
		let location = location.into();
		let navigation = if location.is_replace() {
			NavigationType::Replace
		} else {
			NavigationType::Push
		};
		self.inner.navigate(location, navigation).await
	}

	/// Navigates to `location`, replacing the current history entry.
	///
	/// # Errors
	///
	/// See [`Router::push`].
	pub async fn replace(&self, location: impl Into<RawLocation>) -> NavigationResult<ResolvedRoute> {
		self.inner
			.navigate(location.into(), NavigationType::Replace)
			.await
	}

	/// Callback flavor of [`Router::push`].
	pub async fn push_with<C, A>(&self, location: impl Into<RawLocation>, on_complete: C, on_abort: A)
	where
		C: FnOnce(&ResolvedRoute),
		A: FnOnce(&NavigationError),
	{
		match self.push(location).await {
			Ok(route) => on_complete(&route),
			Err(error) => on_abort(&error),
		}
	}

	/// Callback flavor of [`Router::replace`].
	pub async fn replace_with<C, A>(
		&self,
		location: impl Into<RawLocation>,
		on_complete: C,
		on_abort: A,
	) where
		C: FnOnce(&ResolvedRoute),
		A: FnOnce(&NavigationError),
	{
		match self.replace(location).await {
			Ok(route) => on_complete(&route),
			Err(error) => on_abort(&error),
		}
	}

	/// Moves through history. The resulting change is navigated like any
	/// external change, on the current tokio runtime.
	pub fn go(&self, delta: i64) {
		self.inner.history.go(delta);
	}

	/// Goes back one entry.
	pub fn back(&self) {
		self.go(-1);
	}

	/// Goes forward one entry.
	pub fn forward(&self) {
		self.go(1);
	}

	/// Matches a location relative to the current route.
	///
	/// # Errors
	///
	/// Returns the matcher's error for unknown names or unformattable params.
	pub fn match_location(&self, location: impl Into<RawLocation>) -> Result<ResolvedRoute, RouterError> {
		let current = self.current_route();
		self.inner
			.matcher
			.read()
			.match_location(&location.into(), Some(&current))
	}

	/// Resolves a location without navigating.
	///
	/// `current` defaults to the current route.
	///
	/// # Errors
	///
	/// See [`Router::match_location`].
	pub fn resolve(
		&self,
		location: impl Into<RawLocation>,
		current: Option<&ResolvedRoute>,
		append: bool,
	) -> Result<Resolution, RouterError> {
		let current = match current {
			Some(route) => route.clone(),
			None => self.current_route(),
		};
		let (location, route) = self
			.inner
			.matcher
			.read()
			.resolve(&location.into(), Some(&current), append)?;
		let href = self
			.inner
			.history
			.href(route.redirected_from().unwrap_or(route.full_path()));
		Ok(Resolution {
			location,
			route,
			href,
		})
	}

	/// Returns every route record, depth-first.
	pub fn get_routes(&self) -> Vec<Arc<RouteRecord>> {
		self.inner.matcher.read().get_routes()
	}

	/// Adds a root route and re-resolves the current location.
	///
	/// # Errors
	///
	/// Returns the matcher's error; the route tree is unchanged on failure.
	pub async fn add_route(&self, route: RouteConfig) -> NavigationResult<RecordId> {
		let id = self.inner.matcher.write().add_route(route)?;
		self.inner.refresh().await;
		Ok(id)
	}

	/// Adds several root routes and re-resolves the current location.
	///
	/// # Errors
	///
	/// See [`Router::add_route`].
	pub async fn add_routes(&self, routes: Vec<RouteConfig>) -> NavigationResult<()> {
		self.inner.matcher.write().add_routes(routes)?;
		self.inner.refresh().await;
		Ok(())
	}

	/// Adds a route under the route named `parent`.
	///
	/// # Errors
	///
	/// Returns [`RouterError::NoSuchNamedRoute`] for an unknown parent, or
	/// any error of [`Router::add_route`].
	pub async fn add_route_to(&self, parent: &str, route: RouteConfig) -> NavigationResult<RecordId> {
		let id = self.inner.matcher.write().add_route_to(parent, route)?;
		self.inner.refresh().await;
		Ok(id)
	}

	/// Registers a guard run before every navigation.
	pub fn before_each(&self, guard: NavigationGuard) -> HookHandle {
		self.inner.before_each.register(guard)
	}

	/// Registers a guard run after route guards and lazy components.
	pub fn before_resolve(&self, guard: NavigationGuard) -> HookHandle {
		self.inner.before_resolve.register(guard)
	}

	/// Registers a hook run after every committed navigation.
	pub fn after_each<F>(&self, hook: F) -> HookHandle
	where
		F: Fn(&ResolvedRoute, &ResolvedRoute) + Send + Sync + 'static,
	{
		self.inner.after_each.register(Arc::new(hook))
	}

	/// Registers a handler for errors raised inside guards.
	pub fn on_error<F>(&self, handler: F) -> HookHandle
	where
		F: Fn(&GuardError) + Send + Sync + 'static,
	{
		self.inner.error_handlers.register(Arc::new(handler))
	}

	/// Registers callbacks for when the first navigation settles.
	///
	/// If the router is already ready, `on_ready` runs immediately.
	pub fn on_ready<F>(&self, on_ready: F, on_error: Option<ReadyErrorCallback>)
	where
		F: FnOnce() + Send + 'static,
	{
		let on_ready: ReadyCallback = Box::new(on_ready);
		self.inner.on_ready(on_ready, on_error);
	}

	/// Returns whether the first navigation has settled.
	pub fn is_ready(&self) -> bool {
		self.inner.is_ready()
	}

	/// Returns the current route.
	pub fn current_route(&self) -> ResolvedRoute {
		self.inner.current_route()
	}

	/// Returns the components of every outlet along a route's matched chain.
	///
	/// Uses the current route when `route` is `None`. Lazy components that
	/// have not been loaded yet are left out.
	pub fn matched_components(&self, route: Option<&ResolvedRoute>) -> Vec<ComponentId> {
		let current;
		let route = match route {
			Some(route) => route,
			None => {
				current = self.current_route();
				&current
			}
		};
		route
			.matched()
			.iter()
			.flat_map(|record| record.components())
			.filter_map(|(_, component)| component)
			.collect()
	}

	/// Returns the active history mode.
	pub fn mode(&self) -> HistoryMode {
		self.inner.history.mode()
	}

	/// Returns the history adapter.
	pub fn history(&self) -> Arc<dyn History> {
		Arc::clone(&self.inner.history)
	}

	/// Returns the settings the router was built with.
	pub fn settings(&self) -> &RouterSettings {
		&self.inner.settings
	}

	/// Binds a consumer to the router.
	///
	/// The first attachment starts listening to the history and navigates to
	/// its current location. Dropping the last attachment stops listening,
	/// tears the history down and resets the current route.
	pub async fn attach(&self) -> Attachment {
		let first = {
			let mut state = self.inner.state.lock();
			state.attachments += 1;
			state.attachments == 1
		};

		if first {
			self.listen();
			let location = self.inner.history.current_location();
			if let Err(e) = self
				.inner
				.navigate(RawLocation::from(location), NavigationType::Pop)
				.await
			{
				debug!(error = %e, "initial navigation did not complete");
			}
		}

		Attachment {
			inner: Arc::clone(&self.inner),
		}
	}

	fn listen(&self) {
		let weak = Arc::downgrade(&self.inner);
		let id = self.inner.history.listen(Arc::new(move |location: String| {
			let Some(inner) = weak.upgrade() else {
				return;
			};
			match tokio::runtime::Handle::try_current() {
				Ok(handle) => {
					handle.spawn(async move {
						if let Err(e) = inner
							.navigate(RawLocation::from(location), NavigationType::Pop)
							.await
						{
							debug!(error = %e, "history navigation did not complete");
						}
					});
				}
				Err(_) => warn!(%location, "history changed outside a tokio runtime, ignoring"),
			}
		}));
		self.inner.state.lock().listener = Some(id);
	}
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("mode", &self.mode())
			.field("current", &self.current_route().full_path())
			.finish_non_exhaustive()
	}
}

/// Keeps a router bound to its history. See [`Router::attach`].
pub struct Attachment {
	inner: Arc<RouterInner>,
}

impl Attachment {
	/// Returns the attached router.
	pub fn router(&self) -> Router {
		Router {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl fmt::Debug for Attachment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Attachment").finish_non_exhaustive()
	}
}

impl Drop for Attachment {
	fn drop(&mut self) {
		let listener = {
			let mut state = self.inner.state.lock();
			state.attachments = state.attachments.saturating_sub(1);
			if state.attachments > 0 {
				return;
			}
			state.current = ResolvedRoute::start();
			state.listener.take()
		};

		self.inner.invalidate();
		if let Some(id) = listener {
			self.inner.history.unlisten(id);
		}
		self.inner.history.teardown();
		debug!("router detached");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn router() -> Router {
		Router::new(
			RouterOptions::new()
				.mode(HistoryMode::Memory)
				.route(RouteConfig::new("/").named("home").component("Home"))
				.route(
					RouteConfig::new("/users/:id")
						.named("user")
						.component("UserLayout")
						.view("aside", "UserAside")
						.child(RouteConfig::new("").component("UserHome")),
				)
				.route(RouteConfig::new("/legacy").redirect("/")),
		)
		.unwrap()
	}

	#[rstest]
	fn test_resolve_href_prefers_redirected_from(router: Router) {
		let resolution = router.resolve("/legacy", None, false).unwrap();
		assert_eq!(resolution.route.path(), "/");
		assert_eq!(resolution.href, "/legacy");
	}

	#[rstest]
	fn test_match_location_uses_current_params(router: Router) {
		let route = router.match_location("/users/3").unwrap();
		assert_eq!(route.matched().len(), 2);
		assert_eq!(route.param("id").and_then(|v| v.as_str()), Some("3"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_matched_components(router: Router) {
		router.push("/users/3").await.unwrap();

		let components: Vec<String> = router
			.matched_components(None)
			.iter()
			.map(|id| id.as_str().to_string())
			.collect();

		assert_eq!(components, vec!["UserLayout", "UserAside", "UserHome"]);
	}

	#[rstest]
	fn test_unsupported_mode_without_host() {
		let result = Router::new(RouterOptions::new().mode(HistoryMode::Path));
		assert!(matches!(result, Err(NavigationError::History(_))));
	}
}
