//! Route declarations and the records compiled from them.
//!
//! [`RouteConfig`] is the declarative, user-facing form of a route.
//! [`RouteMatcher`](crate::RouteMatcher) compiles each config into a
//! [`RouteRecord`] stored in an arena and addressed by [`RecordId`]; parent
//! links are identifiers, so the tree holds no ownership cycles.

use crate::guard::NavigationGuard;
use crate::location::RawLocation;
use crate::pattern::{PathPattern, PatternOptions};
use crate::route::ResolvedRoute;
use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Outlet used by [`RouteConfig::component`].
pub const DEFAULT_OUTLET: &str = "default";

/// Stable identifier of a record within one matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub(crate) usize);

impl RecordId {
	/// Returns the arena index.
	pub fn index(&self) -> usize {
		self.0
	}
}

impl fmt::Display for RecordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Opaque handle to a view component owned by the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentId(String);

impl ComponentId {
	/// Creates a component handle.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Returns the handle as a string.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for ComponentId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

impl From<String> for ComponentId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl fmt::Display for ComponentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Async loader for a lazily resolved component.
pub type ComponentLoader =
	Arc<dyn Fn() -> BoxFuture<'static, Result<ComponentId, String>> + Send + Sync>;

/// Where an outlet's component comes from.
#[derive(Clone)]
pub enum ComponentSource {
	/// Already available.
	Ready(ComponentId),
	/// Loaded on first activation.
	Lazy(ComponentLoader),
}

impl fmt::Debug for ComponentSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Ready(id) => f.debug_tuple("Ready").field(id).finish(),
			Self::Lazy(_) => f.write_str("Lazy(..)"),
		}
	}
}

type RedirectFn = dyn Fn(&ResolvedRoute) -> RawLocation + Send + Sync;

/// Redirect target of a record.
#[derive(Clone)]
pub enum Redirect {
	/// A fixed path or descriptor.
	Location(RawLocation),
	/// Computed from the route that matched the redirecting record.
	Dynamic(Arc<RedirectFn>),
}

impl Redirect {
	pub(crate) fn target(&self, matched: &ResolvedRoute) -> RawLocation {
		match self {
			Self::Location(location) => location.clone(),
			Self::Dynamic(redirect) => redirect(matched),
		}
	}
}

impl fmt::Debug for Redirect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Location(location) => f.debug_tuple("Location").field(location).finish(),
			Self::Dynamic(_) => f.write_str("Dynamic(..)"),
		}
	}
}

/// Declarative route definition.
///
/// # Examples
///
/// ```
/// use reinhardt_routes::RouteConfig;
///
/// let users = RouteConfig::new("/users/:id")
///     .named("user")
///     .component("UserLayout")
///     .child(RouteConfig::new("").component("UserHome"))
///     .child(RouteConfig::new("posts").named("user-posts").component("UserPosts"))
///     .meta("requires_auth", true);
/// assert_eq!(users.path(), "/users/:id");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteConfig {
	path: String,
	name: Option<String>,
	components: IndexMap<String, ComponentSource>,
	redirect: Option<Redirect>,
	alias: Vec<String>,
	meta: Map<String, Value>,
	children: Vec<RouteConfig>,
	before_enter: Option<NavigationGuard>,
	on_enter: Option<NavigationGuard>,
	on_update: Option<NavigationGuard>,
	on_leave: Option<NavigationGuard>,
	case_sensitive: Option<bool>,
	strict: Option<bool>,
}

impl RouteConfig {
	/// Creates a route for a path template, relative to its parent unless it starts with `/`.
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			..Self::default()
		}
	}

	/// Names the route. Names must be unique across the tree.
	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Sets the component of the default outlet.
	pub fn component(self, id: impl Into<ComponentId>) -> Self {
		self.view(DEFAULT_OUTLET, id)
	}

	/// Sets the component of a named outlet.
	pub fn view(mut self, outlet: impl Into<String>, id: impl Into<ComponentId>) -> Self {
		self.components
			.insert(outlet.into(), ComponentSource::Ready(id.into()));
		self
	}

	/// Sets a lazily loaded component for the default outlet.
	pub fn lazy_component<F, Fut>(self, loader: F) -> Self
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<ComponentId, String>> + Send + 'static,
	{
		self.lazy_view(DEFAULT_OUTLET, loader)
	}

	/// Sets a lazily loaded component for a named outlet.
	pub fn lazy_view<F, Fut>(mut self, outlet: impl Into<String>, loader: F) -> Self
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<ComponentId, String>> + Send + 'static,
	{
		let loader: ComponentLoader = Arc::new(move || loader().boxed());
		self.components
			.insert(outlet.into(), ComponentSource::Lazy(loader));
		self
	}

	/// Redirects to a fixed path or descriptor.
	pub fn redirect(mut self, to: impl Into<RawLocation>) -> Self {
		self.redirect = Some(Redirect::Location(to.into()));
		self
	}

	/// Redirects to a location computed from the matched route.
	pub fn redirect_with<F>(mut self, redirect: F) -> Self
	where
		F: Fn(&ResolvedRoute) -> RawLocation + Send + Sync + 'static,
	{
		self.redirect = Some(Redirect::Dynamic(Arc::new(redirect)));
		self
	}

	/// Adds an alias path matching the same records.
	pub fn alias(mut self, alias: impl Into<String>) -> Self {
		self.alias.push(alias.into());
		self
	}

	/// Adds a metadata entry.
	pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.meta.insert(key.into(), value.into());
		self
	}

	/// Appends a child route.
	pub fn child(mut self, child: RouteConfig) -> Self {
		self.children.push(child);
		self
	}

	/// Appends several child routes.
	pub fn children(mut self, children: impl IntoIterator<Item = RouteConfig>) -> Self {
		self.children.extend(children);
		self
	}

	/// Guard run before this route is entered.
	pub fn before_enter(mut self, guard: NavigationGuard) -> Self {
		self.before_enter = Some(guard);
		self
	}

	/// Guard run after lazy components resolve, when this route is entered.
	pub fn on_enter(mut self, guard: NavigationGuard) -> Self {
		self.on_enter = Some(guard);
		self
	}

	/// Guard run when this route stays matched but the location changes.
	pub fn on_update(mut self, guard: NavigationGuard) -> Self {
		self.on_update = Some(guard);
		self
	}

	/// Guard run when this route is left.
	pub fn on_leave(mut self, guard: NavigationGuard) -> Self {
		self.on_leave = Some(guard);
		self
	}

	/// Overrides case sensitivity for this route.
	pub fn case_sensitive(mut self, sensitive: bool) -> Self {
		self.case_sensitive = Some(sensitive);
		self
	}

	/// Overrides trailing-slash strictness for this route.
	pub fn strict(mut self, strict: bool) -> Self {
		self.strict = Some(strict);
		self
	}

	/// Returns the declared path template.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Returns the route name.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub(crate) fn take_children(&mut self) -> Vec<RouteConfig> {
		std::mem::take(&mut self.children)
	}

	pub(crate) fn pattern_options(&self, defaults: PatternOptions) -> PatternOptions {
		PatternOptions {
			sensitive: self.case_sensitive.unwrap_or(defaults.sensitive),
			strict: self.strict.unwrap_or(defaults.strict),
		}
	}
}

/// A compiled node of the route tree.
#[derive(Debug, Clone)]
pub struct RouteRecord {
	id: RecordId,
	raw_path: String,
	path: String,
	pattern: PathPattern,
	name: Option<String>,
	parent: Option<RecordId>,
	children: Vec<RecordId>,
	alias: Vec<String>,
	redirect: Option<Redirect>,
	meta: Map<String, Value>,
	components: Arc<Mutex<IndexMap<String, ComponentSource>>>,
	before_enter: Option<NavigationGuard>,
	on_enter: Option<NavigationGuard>,
	on_update: Option<NavigationGuard>,
	on_leave: Option<NavigationGuard>,
}

impl RouteRecord {
	pub(crate) fn new(
		id: RecordId,
		config: RouteConfig,
		path: String,
		pattern: PathPattern,
		parent: Option<RecordId>,
	) -> Self {
		Self {
			id,
			raw_path: config.path,
			path,
			pattern,
			name: config.name,
			parent,
			children: Vec::new(),
			alias: config.alias,
			redirect: config.redirect,
			meta: config.meta,
			components: Arc::new(Mutex::new(config.components)),
			before_enter: config.before_enter,
			on_enter: config.on_enter,
			on_update: config.on_update,
			on_leave: config.on_leave,
		}
	}

	/// Returns the record identifier.
	pub fn id(&self) -> RecordId {
		self.id
	}

	/// Returns the path template as declared.
	pub fn raw_path(&self) -> &str {
		&self.raw_path
	}

	/// Returns the full, normalized path template.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Returns the compiled pattern of the full path.
	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	/// Returns the route name.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Returns the parent record.
	pub fn parent(&self) -> Option<RecordId> {
		self.parent
	}

	/// Returns the child records in declaration order.
	pub fn children(&self) -> &[RecordId] {
		&self.children
	}

	/// Returns the alias templates as declared.
	pub fn alias(&self) -> &[String] {
		&self.alias
	}

	/// Returns the redirect target.
	pub fn redirect(&self) -> Option<&Redirect> {
		self.redirect.as_ref()
	}

	/// Returns the metadata.
	pub fn meta(&self) -> &Map<String, Value> {
		&self.meta
	}

	/// Returns the guard run before entering.
	pub fn before_enter(&self) -> Option<&NavigationGuard> {
		self.before_enter.as_ref()
	}

	/// Returns the guard run on entering, after lazy components resolve.
	pub fn enter_guard(&self) -> Option<&NavigationGuard> {
		self.on_enter.as_ref()
	}

	/// Returns the guard run when the record stays matched.
	pub fn update_guard(&self) -> Option<&NavigationGuard> {
		self.on_update.as_ref()
	}

	/// Returns the guard run when leaving.
	pub fn leave_guard(&self) -> Option<&NavigationGuard> {
		self.on_leave.as_ref()
	}

	/// Returns the resolved component of an outlet.
	pub fn component(&self, outlet: &str) -> Option<ComponentId> {
		match self.components.lock().get(outlet) {
			Some(ComponentSource::Ready(id)) => Some(id.clone()),
			_ => None,
		}
	}

	/// Returns every outlet with its component, `None` while still lazy.
	pub fn components(&self) -> Vec<(String, Option<ComponentId>)> {
		self.components
			.lock()
			.iter()
			.map(|(outlet, source)| {
				let id = match source {
					ComponentSource::Ready(id) => Some(id.clone()),
					ComponentSource::Lazy(_) => None,
				};
				(outlet.clone(), id)
			})
			.collect()
	}

	/// Returns the outlets whose component has not been loaded yet.
	pub fn pending_components(&self) -> Vec<(String, ComponentLoader)> {
		self.components
			.lock()
			.iter()
			.filter_map(|(outlet, source)| match source {
				ComponentSource::Lazy(loader) => Some((outlet.clone(), Arc::clone(loader))),
				ComponentSource::Ready(_) => None,
			})
			.collect()
	}

	/// Caches a loaded component. Shared by every snapshot of this record.
	pub fn resolve_component(&self, outlet: &str, id: ComponentId) {
		if let Some(source) = self.components.lock().get_mut(outlet) {
			*source = ComponentSource::Ready(id);
		}
	}

	pub(crate) fn push_child(&mut self, child: RecordId) {
		self.children.push(child);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn record(config: RouteConfig) -> RouteRecord {
		let path = config.path().to_string();
		let pattern = PathPattern::new(&path).unwrap();
		RouteRecord::new(RecordId(0), config, path, pattern, None)
	}

	#[rstest]
	fn test_route_config_builder() {
		let config = RouteConfig::new("/users/:id")
			.named("user")
			.component("User")
			.view("sidebar", "UserSidebar")
			.alias("/u/:id")
			.meta("title", "User")
			.child(RouteConfig::new("posts"));

		let record = record(config);

		assert_eq!(record.name(), Some("user"));
		assert_eq!(record.component(DEFAULT_OUTLET), Some(ComponentId::new("User")));
		assert_eq!(record.component("sidebar"), Some(ComponentId::new("UserSidebar")));
		assert_eq!(record.alias(), &["/u/:id".to_string()]);
		assert_eq!(record.meta().get("title"), Some(&Value::from("User")));
	}

	#[rstest]
	fn test_route_config_pattern_options() {
		let config = RouteConfig::new("/a").strict(true);
		let options = config.pattern_options(PatternOptions::new(true, false));
		assert_eq!(options, PatternOptions::new(true, true));
	}

	#[tokio::test]
	async fn test_lazy_component_resolution_is_shared() {
		let record = record(
			RouteConfig::new("/lazy").lazy_component(|| async { Ok(ComponentId::new("Lazy")) }),
		);
		let snapshot = record.clone();

		let pending = record.pending_components();
		assert_eq!(pending.len(), 1);
		assert_eq!(record.component(DEFAULT_OUTLET), None);

		let (outlet, loader) = pending.into_iter().next().unwrap();
		let id = loader().await.unwrap();
		record.resolve_component(&outlet, id);

		assert_eq!(snapshot.component(DEFAULT_OUTLET), Some(ComponentId::new("Lazy")));
		assert!(snapshot.pending_components().is_empty());
	}
}
