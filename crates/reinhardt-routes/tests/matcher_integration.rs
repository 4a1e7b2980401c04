//! Integration tests for route tree matching
//!
//! This test file verifies the integration between:
//! - Path pattern compilation and formatting
//! - Route tree flattening (nesting, aliases, default children)
//! - Redirect resolution
//! - Named and path-based matching

use reinhardt_routes::{
	ComponentId, DEFAULT_OUTLET, LocationDescriptor, ParamValue, PatternOptions, RawLocation,
	RouteConfig, RouteMatcher, params,
};
use rstest::{fixture, rstest};

// ============================================================
// Test Utilities
// ============================================================

#[fixture]
fn app_matcher() -> RouteMatcher {
	RouteMatcher::new(
		vec![
			RouteConfig::new("/").named("home").component("Home"),
			RouteConfig::new("/users/:id")
				.named("user")
				.component("User")
				.alias("/people/:id")
				.child(RouteConfig::new("profile").named("user-profile").component("Profile"))
				.child(
					RouteConfig::new("posts")
						.named("user-posts")
						.view(DEFAULT_OUTLET, "Posts")
						.view("aside", "PostsAside"),
				),
			RouteConfig::new("/docs/:path*").named("docs"),
			RouteConfig::new("/legacy").redirect("/old"),
			RouteConfig::new("/old").redirect("/users/1"),
			RouteConfig::new("*").named("not-found"),
		],
		PatternOptions::default(),
	)
	.expect("valid route tree")
}

fn path(route: &str) -> RawLocation {
	RawLocation::from(route)
}

// ============================================================
// Matching
// ============================================================

/// Test Intent: Verify the canonical named/path example
/// Integration Point: RouteMatcher name lookup + PathPattern formatting
#[rstest]
fn test_named_and_path_resolution_agree(app_matcher: RouteMatcher) {
	// Arrange
	let named = RawLocation::from(LocationDescriptor::named("user").with_param("id", "7"));

	// Act
	let by_name = app_matcher.match_location(&named, None).unwrap();
	let by_path = app_matcher.match_location(&path("/users/7"), None).unwrap();

	// Assert
	assert_eq!(by_name.path(), "/users/7");
	assert_eq!(by_path.param("id"), Some(&ParamValue::from("7")));
	assert_eq!(by_path.matched().len(), 1);
	assert_eq!(by_name.leaf_id(), by_path.leaf_id());
}

/// Test Intent: Verify match followed by format reproduces the path
/// Integration Point: RouteMatcher match + RouteRecord pattern format
#[rstest]
#[case("/users/7")]
#[case("/users/7/profile")]
#[case("/docs/guide/routing")]
#[case("/docs")]
fn test_match_then_format_round_trip(app_matcher: RouteMatcher, #[case] input: &str) {
	let route = app_matcher.match_location(&path(input), None).unwrap();
	let leaf = route.matched().last().expect("matched");

	let formatted = leaf.pattern().format(route.params()).unwrap();

	assert_eq!(formatted, input);
}

/// Test Intent: Verify earlier siblings win ties
/// Integration Point: RouteMatcher index ordering
#[rstest]
fn test_earlier_sibling_wins() {
	let matcher = RouteMatcher::new(
		vec![
			RouteConfig::new("/items/:id").named("first"),
			RouteConfig::new("/items/:slug").named("second"),
		],
		PatternOptions::default(),
	)
	.unwrap();

	for _ in 0..3 {
		let route = matcher.match_location(&path("/items/a"), None).unwrap();
		assert_eq!(route.name(), Some("first"));
	}
}

/// Test Intent: Verify aliases resolve to the target's chain and components
/// Integration Point: alias index entries + matched chain construction
#[rstest]
fn test_alias_resolves_same_chain(app_matcher: RouteMatcher) {
	let canonical = app_matcher
		.match_location(&path("/users/3/posts"), None)
		.unwrap();
	let aliased = app_matcher
		.match_location(&path("/people/3/posts"), None)
		.unwrap();

	let ids = |route: &reinhardt_routes::ResolvedRoute| {
		route
			.matched()
			.iter()
			.map(|record| record.id())
			.collect::<Vec<_>>()
	};
	assert_eq!(ids(&canonical), ids(&aliased));
	assert_eq!(aliased.path(), "/people/3/posts");
	assert_eq!(aliased.name(), Some("user-posts"));
	assert_eq!(
		aliased.matched()[1].component("aside"),
		Some(ComponentId::new("PostsAside"))
	);
}

/// Test Intent: Verify redirect chains are transitive
/// Integration Point: redirect resolution + redirectedFrom propagation
#[rstest]
fn test_redirect_chain_is_transitive(app_matcher: RouteMatcher) {
	let route = app_matcher.match_location(&path("/legacy"), None).unwrap();

	assert_eq!(route.path(), "/users/1");
	assert_eq!(route.name(), Some("user"));
	assert_eq!(route.redirected_from(), Some("/legacy"));
}

/// Test Intent: Verify each redirect hop reads the params and query of the
/// location it matched, while redirectedFrom keeps the original input
/// Integration Point: redirect resolution across named and path targets
#[rstest]
#[case("/a", "/c/1", "c")]
#[case("/q", "/s?x=1", "s")]
#[case("/q?y=2", "/s?x=1&y=2", "s")]
fn test_redirect_chain_carries_hop_state(
	#[case] input: &str,
	#[case] expected: &str,
	#[case] name: &str,
) {
	// Arrange
	let matcher = RouteMatcher::new(
		vec![
			RouteConfig::new("/a").redirect(LocationDescriptor::named("b").with_param("k", "1")),
			RouteConfig::new("/b/:k").named("b").redirect("/c/:k"),
			RouteConfig::new("/c/:k").named("c"),
			RouteConfig::new("/q").redirect("/r?x=1"),
			RouteConfig::new("/r").redirect("/s"),
			RouteConfig::new("/s").named("s"),
		],
		PatternOptions::default(),
	)
	.unwrap();

	// Act
	let route = matcher.match_location(&path(input), None).unwrap();

	// Assert
	assert_eq!(route.full_path(), expected);
	assert_eq!(route.name(), Some(name));
	assert_eq!(route.redirected_from(), Some(input));
}

/// Test Intent: Verify unmatched paths resolve to an empty chain
/// Integration Point: RouteMatcher no-match handling
#[rstest]
fn test_unmatched_path_is_not_an_error() {
	let matcher = RouteMatcher::new(
		vec![RouteConfig::new("/").named("home")],
		PatternOptions::default(),
	)
	.unwrap();

	let route = matcher.match_location(&path("/nowhere?x=1"), None).unwrap();

	assert!(route.is_not_found());
	assert_eq!(route.full_path(), "/nowhere?x=1");
}

/// Test Intent: Verify catch-all routes only match leftovers
/// Integration Point: catch-all ordering
#[rstest]
fn test_catch_all_fallback(app_matcher: RouteMatcher) {
	let route = app_matcher.match_location(&path("/a/b/c"), None).unwrap();

	assert_eq!(route.name(), Some("not-found"));
	assert_eq!(route.param("pathMatch"), Some(&ParamValue::from("/a/b/c")));
}

/// Test Intent: Verify relative paths resolve against the current route
/// Integration Point: location normalization + matching
#[rstest]
fn test_relative_path_against_current(app_matcher: RouteMatcher) {
	let current = app_matcher
		.match_location(&path("/users/4/profile"), None)
		.unwrap();

	let sibling = app_matcher
		.match_location(&path("posts"), Some(&current))
		.unwrap();
	let appended = app_matcher
		.match_location(
			&RawLocation::from(LocationDescriptor::from_path("posts").with_append()),
			Some(&current),
		)
		.unwrap();

	assert_eq!(sibling.name(), Some("user-posts"));
	assert_eq!(appended.path(), "/users/4/profile/posts");
	assert_eq!(appended.name(), Some("not-found"));
}

/// Test Intent: Verify formatting errors surface from named resolution
/// Integration Point: RouteMatcher + PathPattern errors
#[rstest]
fn test_named_resolution_missing_param(app_matcher: RouteMatcher) {
	let err = app_matcher
		.match_location(&RawLocation::from(LocationDescriptor::named("user")), None)
		.unwrap_err();

	assert!(err.to_string().contains("missing required parameter 'id'"));
}

/// Test Intent: Verify dynamically added routes are matched
/// Integration Point: add_routes + index rebuild
#[rstest]
fn test_dynamic_routes(mut app_matcher: RouteMatcher) {
	let before = app_matcher.match_location(&path("/settings"), None).unwrap();
	assert_eq!(before.name(), Some("not-found"));

	app_matcher
		.add_routes(vec![RouteConfig::new("/settings").named("settings")])
		.unwrap();
	app_matcher
		.add_route_to("user", RouteConfig::new("likes").named("user-likes"))
		.unwrap();

	let after = app_matcher.match_location(&path("/settings"), None).unwrap();
	let likes = app_matcher
		.match_location(
			&RawLocation::from(LocationDescriptor::named("user-likes").with_params(params! { "id" => "2" })),
			None,
		)
		.unwrap();
	assert_eq!(after.name(), Some("settings"));
	assert_eq!(likes.path(), "/users/2/likes");
	assert_eq!(
		app_matcher
			.match_location(&path("/people/2/likes"), None)
			.unwrap()
			.name(),
		Some("user-likes")
	);
}
