//! Route trees, path patterns and location matching for Reinhardt navigation.
//!
//! This crate provides the matching half of the navigation engine:
//!
//! - **Path patterns**: `:id`, `:id?`, `:path+`, `:path*`, `:id(\\d+)`, unnamed groups and `*`
//! - **Route records**: nested routes with aliases, redirects, metadata, named views
//!   and per-route guards
//! - **Matching**: resolve a path or a named descriptor into a [`ResolvedRoute`]
//!
//! # Quick Start
//!
//! ```rust
//! use reinhardt_routes::{
//!     LocationDescriptor, PatternOptions, RawLocation, RouteConfig, RouteMatcher,
//! };
//!
//! let matcher = RouteMatcher::new(
//!     vec![
//!         RouteConfig::new("/").named("home"),
//!         RouteConfig::new("/users/:id").named("user"),
//!     ],
//!     PatternOptions::default(),
//! )
//! .unwrap();
//!
//! let route = matcher
//!     .match_location(
//!         &RawLocation::from(LocationDescriptor::named("user").with_param("id", "7")),
//!         None,
//!     )
//!     .unwrap();
//! assert_eq!(route.path(), "/users/7");
//! ```

pub mod error;
pub mod guard;
pub mod location;
pub mod matcher;
pub mod params;
pub mod pattern;
pub mod query;
pub mod record;
pub mod route;

pub use error::RouterError;
pub use guard::{GuardError, GuardFuture, GuardOutcome, NavigationGuard, Next};
pub use location::{
	Location, LocationDescriptor, ParsedPath, RawLocation, clean_path, normalize_location,
	parse_path, resolve_path,
};
pub use matcher::{RouteMatcher, normalize_path};
pub use params::{ParamValue, Params};
pub use pattern::{CATCH_ALL_PARAM, ParamKey, PathPattern, PatternOptions};
pub use query::{Query, QueryValue, parse_query, resolve_query, stringify_query};
pub use record::{
	ComponentId, ComponentLoader, ComponentSource, DEFAULT_OUTLET, RecordId, Redirect,
	RouteConfig, RouteRecord,
};
pub use route::ResolvedRoute;

/// Result type for route operations.
pub type RouterResult<T> = Result<T, RouterError>;
