//! # Reinhardt Navigation
//!
//! A client-side navigation engine: declared route trees are matched against
//! incoming locations, navigations pass through an ordered chain of async
//! guards, and approved routes are committed to a pluggable history.
//!
//! ## Crates
//!
//! - [`routes`]: path patterns, route records and the matcher
//! - [`history`]: path, fragment and memory history adapters
//! - [`navigator`]: the router, its guard pipeline and transition rules
//!   (feature `navigator`, enabled by default)
//!
//! ## Quick Start
//!
//! ```rust
//! use reinhardt_navigation::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let router = Router::new(
//!     RouterOptions::new()
//!         .mode(HistoryMode::Memory)
//!         .route(RouteConfig::new("/").named("home"))
//!         .route(RouteConfig::new("/admin").named("admin"))
//!         .route(RouteConfig::new("/login").named("login")),
//! )
//! .unwrap();
//!
//! router.before_each(NavigationGuard::sync(|to, _from| {
//!     if to.path() == "/admin" {
//!         GuardOutcome::from("/login")
//!     } else {
//!         GuardOutcome::Proceed
//!     }
//! }));
//!
//! let route = router.push("/admin").await.unwrap();
//! assert_eq!(route.path(), "/login");
//! assert_eq!(route.redirected_from(), Some("/admin"));
//! # });
//! ```

pub use reinhardt_history as history;
#[cfg(feature = "navigator")]
pub use reinhardt_navigator as navigator;
pub use reinhardt_routes as routes;

pub use reinhardt_history::{History, HistoryError, HistoryMode, NavigationType};
pub use reinhardt_routes::{
	GuardError, GuardOutcome, LocationDescriptor, NavigationGuard, Next, RawLocation,
	ResolvedRoute, RouteConfig, RouteMatcher, RouterError, params,
};

#[cfg(feature = "navigator")]
pub use reinhardt_navigator::{
	Attachment, FailureKind, HookHandle, NavigationError, NavigationFailure, Resolution, Router,
	RouterOptions, RouterSettings, is_navigation_failure,
};

/// Prelude module for convenient imports.
pub mod prelude {
	pub use crate::{
		GuardError, GuardOutcome, HistoryMode, LocationDescriptor, NavigationGuard, NavigationType,
		Next, RawLocation, ResolvedRoute, RouteConfig,
	};

	#[cfg(feature = "navigator")]
	pub use crate::{
		Attachment, FailureKind, HookHandle, NavigationError, NavigationFailure, Router,
		RouterOptions, RouterSettings, is_navigation_failure,
	};
}
