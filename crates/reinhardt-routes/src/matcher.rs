//! Route matching.
//!
//! [`RouteMatcher`] owns the record arena and a flat match index built from
//! it. The index is rebuilt wholesale whenever routes are added. Entries are
//! ordered depth-first (parent before children, earlier siblings first),
//! with alias entries after the record's own subtree and catch-all entries
//! last. The first entry whose pattern matches wins.

use crate::error::RouterError;
use crate::location::{
	Location, LocationDescriptor, RawLocation, clean_path, normalize_location, parse_path,
	resolve_path,
};
use crate::params::Params;
use crate::pattern::{PathPattern, PatternOptions};
use crate::record::{RecordId, Redirect, RouteConfig, RouteRecord};
use crate::route::ResolvedRoute;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
struct MatchEntry {
	pattern: PathPattern,
	record: RecordId,
}

/// Resolves locations against a tree of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteMatcher {
	records: Vec<Arc<RouteRecord>>,
	roots: Vec<RecordId>,
	names: HashMap<String, RecordId>,
	entries: Vec<MatchEntry>,
	options: PatternOptions,
}

impl RouteMatcher {
	/// Creates a matcher over the given root routes.
	///
	/// # Errors
	///
	/// Returns [`RouterError::InvalidPattern`] or
	/// [`RouterError::DuplicateRouteName`] if the tree is invalid.
	pub fn new(routes: Vec<RouteConfig>, options: PatternOptions) -> Result<Self, RouterError> {
		let mut matcher = Self {
			options,
			..Self::default()
		};
		matcher.add_routes(routes)?;
		Ok(matcher)
	}

	/// Returns the default pattern options.
	pub fn options(&self) -> PatternOptions {
		self.options
	}

	/// Adds root routes. On error the matcher is left unchanged.
	///
	/// # Errors
	///
	/// See [`RouteMatcher::new`].
	pub fn add_routes(&mut self, routes: Vec<RouteConfig>) -> Result<(), RouterError> {
		let mut staged = self.stage();
		for route in routes {
			let id = staged.insert(route, None)?;
			staged.roots.push(id);
		}
		self.commit(staged)
	}

	/// Adds a single root route.
	///
	/// # Errors
	///
	/// See [`RouteMatcher::new`].
	pub fn add_route(&mut self, route: RouteConfig) -> Result<RecordId, RouterError> {
		let mut staged = self.stage();
		let id = staged.insert(route, None)?;
		staged.roots.push(id);
		self.commit(staged)?;
		Ok(id)
	}

	/// Adds a route as the last child of the route named `parent`.
	///
	/// Aliases of the parent also cover the new child.
	///
	/// # Errors
	///
	/// Returns [`RouterError::NoSuchNamedRoute`] if `parent` is unknown, or
	/// any error of [`RouteMatcher::new`].
	pub fn add_route_to(&mut self, parent: &str, route: RouteConfig) -> Result<RecordId, RouterError> {
		let parent_id = *self
			.names
			.get(parent)
			.ok_or_else(|| RouterError::NoSuchNamedRoute(parent.to_string()))?;

		let mut staged = self.stage();
		let id = staged.insert(route, Some(parent_id))?;
		Arc::make_mut(&mut staged.records[parent_id.0]).push_child(id);
		self.commit(staged)?;
		Ok(id)
	}

	/// Returns every record, depth-first in declaration order.
	pub fn get_routes(&self) -> Vec<Arc<RouteRecord>> {
		let mut routes = Vec::with_capacity(self.records.len());
		let mut stack: Vec<RecordId> = self.roots.iter().rev().copied().collect();
		while let Some(id) = stack.pop() {
			let record = &self.records[id.0];
			routes.push(Arc::clone(record));
			stack.extend(record.children().iter().rev().copied());
		}
		routes
	}

	/// Returns a record by identifier.
	pub fn record(&self, id: RecordId) -> Option<&Arc<RouteRecord>> {
		self.records.get(id.0)
	}

	/// Returns a record by route name.
	pub fn record_by_name(&self, name: &str) -> Option<&Arc<RouteRecord>> {
		self.names.get(name).and_then(|id| self.record(*id))
	}

	/// Returns whether a route with this name exists.
	pub fn has_route(&self, name: &str) -> bool {
		self.names.contains_key(name)
	}

	/// Resolves a location to a route.
	///
	/// Unmatched paths yield a route with an empty matched chain.
	///
	/// # Errors
	///
	/// - [`RouterError::NoSuchNamedRoute`] for an unknown name.
	/// - [`RouterError::MissingParam`] or [`RouterError::InvalidParamValue`]
	///   when a path cannot be formatted.
	/// - [`RouterError::RedirectLoop`] or [`RouterError::InvalidRedirect`]
	///   for broken redirects.
	pub fn match_location(
		&self,
		raw: &RawLocation,
		current: Option<&ResolvedRoute>,
	) -> Result<ResolvedRoute, RouterError> {
		self.resolve(raw, current, false).map(|(_, route)| route)
	}

	/// Resolves a location, returning the normalized location alongside the route.
	///
	/// # Errors
	///
	/// See [`RouteMatcher::match_location`].
	pub fn resolve(
		&self,
		raw: &RawLocation,
		current: Option<&ResolvedRoute>,
		append: bool,
	) -> Result<(Location, ResolvedRoute), RouterError> {
		let mut visited = Vec::new();
		self.resolve_from(raw, current, append, None, &mut visited)
	}

	fn resolve_from(
		&self,
		raw: &RawLocation,
		current: Option<&ResolvedRoute>,
		append: bool,
		origin: Option<&Location>,
		visited: &mut Vec<RecordId>,
	) -> Result<(Location, ResolvedRoute), RouterError> {
		let mut location = normalize_location(raw, current, append)?;

		if let Some(name) = location.name.clone() {
			let id = *self
				.names
				.get(&name)
				.ok_or(RouterError::NoSuchNamedRoute(name))?;
			let record = &self.records[id.0];

			if let Some(current) = current {
				for key in record.pattern().required_param_names() {
					if !location.params.contains_key(key)
						&& let Some(value) = current.param(key)
					{
						location.params.insert(key.to_string(), value.clone());
					}
				}
			}

			location.path = Some(record.pattern().format(&location.params)?);
			let route = self.create_route(Some(id), &location, origin, visited)?;
			return Ok((location, route));
		}

		if let Some(path) = location.path.clone() {
			location.params = Params::new();
			for entry in &self.entries {
				if let Some(params) = entry.pattern.match_path(&path) {
					location.params = params;
					let route = self.create_route(Some(entry.record), &location, origin, visited)?;
					return Ok((location, route));
				}
			}
		}

		let route = self.create_route(None, &location, origin, visited)?;
		Ok((location, route))
	}

	fn create_route(
		&self,
		record: Option<RecordId>,
		location: &Location,
		origin: Option<&Location>,
		visited: &mut Vec<RecordId>,
	) -> Result<ResolvedRoute, RouterError> {
		let Some(id) = record else {
			return Ok(ResolvedRoute::new(
				Vec::new(),
				location,
				origin.map(Location::full_path),
			));
		};

		let chain = self.chain(id);
		match self.records[id.0].redirect() {
			Some(redirect) => {
				let redirect = redirect.clone();
				let origin = origin.unwrap_or(location);
				self.follow_redirect(id, &redirect, chain, location, origin, visited)
			}
			None => Ok(ResolvedRoute::new(
				chain,
				location,
				origin.map(Location::full_path),
			)),
		}
	}

	fn follow_redirect(
		&self,
		id: RecordId,
		redirect: &Redirect,
		chain: Vec<Arc<RouteRecord>>,
		hop: &Location,
		origin: &Location,
		visited: &mut Vec<RecordId>,
	) -> Result<ResolvedRoute, RouterError> {
		let record = &self.records[id.0];
		if visited.contains(&id) {
			return Err(RouterError::RedirectLoop(record.path().to_string()));
		}
		visited.push(id);

		let matched = ResolvedRoute::new(chain, hop, None);
		let target = redirect.target(&matched).into_descriptor();

		let query = if target.query.is_empty() {
			hop.query.clone()
		} else {
			target.query
		};
		let hash = target
			.hash
			.filter(|hash| !hash.is_empty())
			.unwrap_or_else(|| hop.hash.clone());
		let params = if target.params.is_empty() {
			hop.params.clone()
		} else {
			target.params
		};

		let next = if let Some(name) = target.name {
			LocationDescriptor {
				name: Some(name),
				params,
				query,
				hash: Some(hash),
				..LocationDescriptor::default()
			}
		} else if let Some(path) = target.path {
			let parsed = parse_path(&path);
			let base = record
				.parent()
				.map(|parent| self.records[parent.0].path())
				.unwrap_or("/");
			let raw_path = resolve_path(&parsed.path, base, true);
			let filled = PathPattern::new(&raw_path)?.format(&params)?;
			let mut path = filled;
			if !parsed.query.is_empty() {
				path.push('?');
				path.push_str(&parsed.query);
			}
			let hash = if hash.is_empty() { parsed.hash } else { hash };
			LocationDescriptor {
				path: Some(path),
				query,
				hash: Some(hash),
				..LocationDescriptor::default()
			}
		} else {
			return Err(RouterError::InvalidRedirect(record.path().to_string()));
		};

		debug!(from = %origin.full_path(), record = %record.path(), "following redirect");
		self.resolve_from(&RawLocation::Descriptor(next), None, false, Some(origin), visited)
			.map(|(_, route)| route)
	}

	fn chain(&self, id: RecordId) -> Vec<Arc<RouteRecord>> {
		let mut chain = Vec::new();
		let mut cursor = Some(id);
		while let Some(id) = cursor {
			let record = &self.records[id.0];
			chain.push(Arc::clone(record));
			cursor = record.parent();
		}
		chain.reverse();
		chain
	}

	fn stage(&self) -> Staged {
		Staged {
			records: self.records.clone(),
			roots: self.roots.clone(),
			names: self.names.clone(),
			options: self.options,
		}
	}

	fn commit(&mut self, staged: Staged) -> Result<(), RouterError> {
		let entries = build_index(&staged.records, &staged.roots)?;
		debug!(
			records = staged.records.len(),
			entries = entries.len(),
			"rebuilt route index"
		);

		self.records = staged.records;
		self.roots = staged.roots;
		self.names = staged.names;
		self.entries = entries;
		Ok(())
	}
}

/// Copy of the arena that additions are applied to before being committed.
struct Staged {
	records: Vec<Arc<RouteRecord>>,
	roots: Vec<RecordId>,
	names: HashMap<String, RecordId>,
	options: PatternOptions,
}

impl Staged {
	fn insert(&mut self, mut config: RouteConfig, parent: Option<RecordId>) -> Result<RecordId, RouterError> {
		let options = config.pattern_options(self.options);
		let parent_path = parent.map(|id| self.records[id.0].path().to_string());
		let path = normalize_path(config.path(), parent_path.as_deref(), options.strict);
		let pattern = PathPattern::compile(&path, options)?;
		let id = RecordId(self.records.len());

		if let Some(name) = config.name() {
			if self.names.contains_key(name) {
				return Err(RouterError::DuplicateRouteName(name.to_string()));
			}
			self.names.insert(name.to_string(), id);
		}

		let children = config.take_children();
		self.records
			.push(Arc::new(RouteRecord::new(id, config, path, pattern, parent)));

		for child in children {
			let child_id = self.insert(child, Some(id))?;
			Arc::make_mut(&mut self.records[id.0]).push_child(child_id);
		}

		Ok(id)
	}
}

/// Joins a template with its parent's full template.
///
/// Without `strict` a trailing slash is dropped; the root is always `/`.
pub fn normalize_path(path: &str, parent: Option<&str>, strict: bool) -> String {
	let path = if strict {
		path
	} else {
		path.strip_suffix('/').unwrap_or(path)
	};

	let mut joined = match parent {
		Some(parent) if !path.starts_with('/') => clean_path(&format!("{}/{}", parent, path)),
		_ => path.to_string(),
	};

	if !strict && joined.len() > 1 && joined.ends_with('/') {
		joined.pop();
	}
	if joined.is_empty() {
		joined.push('/');
	}
	joined
}

struct IndexBuilder<'a> {
	records: &'a [Arc<RouteRecord>],
	entries: Vec<MatchEntry>,
	positions: HashMap<String, usize>,
}

impl IndexBuilder<'_> {
	fn register(&mut self, key: String, pattern: PathPattern, id: RecordId) {
		match self.positions.get(&key) {
			None => {
				self.positions.insert(key, self.entries.len());
				self.entries.push(MatchEntry {
					pattern,
					record: id,
				});
			}
			Some(&position) => {
				// A default child shares its parent's path and takes over the slot.
				if self.is_ancestor(self.entries[position].record, id) {
					self.entries[position] = MatchEntry {
						pattern,
						record: id,
					};
				} else {
					debug!(path = %key, "duplicate route path ignored");
				}
			}
		}
	}

	fn is_ancestor(&self, ancestor: RecordId, mut id: RecordId) -> bool {
		while let Some(parent) = self.records[id.0].parent() {
			if parent == ancestor {
				return true;
			}
			id = parent;
		}
		false
	}

	fn register_subtree(&mut self, id: RecordId, parent_path: Option<&str>) -> Result<(), RouterError> {
		let records = self.records;
		let record = &records[id.0];
		let options = record.pattern().options();

		let path = normalize_path(record.raw_path(), parent_path, options.strict);
		let pattern = if path == record.path() {
			record.pattern().clone()
		} else {
			PathPattern::compile(&path, options)?
		};
		self.register(path.clone(), pattern, id);
		for child in record.children() {
			self.register_subtree(*child, Some(&path))?;
		}

		for alias in record.alias() {
			let alias_path = normalize_path(alias, parent_path, options.strict);
			let pattern = PathPattern::compile(&alias_path, options)?;
			self.register(alias_path.clone(), pattern, id);
			for child in record.children() {
				self.register_subtree(*child, Some(&alias_path))?;
			}
		}

		Ok(())
	}
}

fn build_index(records: &[Arc<RouteRecord>], roots: &[RecordId]) -> Result<Vec<MatchEntry>, RouterError> {
	let mut builder = IndexBuilder {
		records,
		entries: Vec::new(),
		positions: HashMap::new(),
	};
	for root in roots {
		builder.register_subtree(*root, None)?;
	}

	let (catch_all, mut entries): (Vec<_>, Vec<_>) = builder
		.entries
		.into_iter()
		.partition(|entry| entry.pattern.is_catch_all());
	entries.extend(catch_all);
	Ok(entries)
}
