//! Navigation coordinator for Reinhardt navigation.
//!
//! A [`Router`] owns the current route. Each navigation request is matched,
//! run through an ordered chain of guards, and either committed to the
//! history adapter or reported as a [`NavigationFailure`].
//!
//! ## Guard order
//!
//! 1. Leave guards of deactivated records, leaf first
//! 2. Global `before_each` guards
//! 3. Update guards of records that stay matched
//! 4. `before_enter` guards of activated records, root first
//! 5. Lazy component loading for activated records
//! 6. Enter guards of activated records
//! 7. Global `before_resolve` guards
//!
//! After the commit, `after_each` hooks run in registration order.
//!
//! ## Overlapping navigations
//!
//! Starting a navigation supersedes the one in flight. The superseded
//! navigation lets its running guard finish, runs nothing further and ends
//! with [`FailureKind::Cancelled`].

pub mod config;
pub mod error;
pub mod hooks;
pub mod pipeline;
pub mod router;
mod transition;

pub use config::{RouterOptions, RouterSettings};
pub use error::{
	FailureKind, NavigationError, NavigationFailure, NavigationResult, is_navigation_failure,
};
pub use hooks::{AfterHook, ErrorHandler, HookHandle};
pub use pipeline::{PipelineOutcome, run_pipeline};
pub use router::{Attachment, Resolution, Router};
pub use transition::{ReadyCallback, ReadyErrorCallback};

/// Common imports for applications using the router.
pub mod prelude {
	pub use crate::{
		Attachment, FailureKind, HookHandle, NavigationError, NavigationFailure, Router,
		RouterOptions, RouterSettings, is_navigation_failure,
	};
	pub use reinhardt_history::{HistoryMode, NavigationType};
	pub use reinhardt_routes::{
		GuardError, GuardOutcome, LocationDescriptor, NavigationGuard, Next, RawLocation,
		ResolvedRoute, RouteConfig,
	};
}
