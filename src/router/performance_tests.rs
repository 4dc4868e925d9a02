// Scalability checks for the per-method trees
//
// Lookup cost depends on the number of segments in the path, not on the
// number of registered routes.

use super::Router;
use crate::dispatcher::Context;
use crate::handlers;
use http::Method;
#[cfg(not(debug_assertions))]
use std::time::Instant;

fn router_with(routes: usize) -> Router {
    let mut router = Router::new();
    for i in 0..routes {
        router.get(
            &format!("/api/v1/resource{i}/:id"),
            handlers![|_: &mut Context| {}],
        );
    }
    router
}

#[test]
fn test_lookup_with_many_routes() {
    let router = router_with(500);
    assert_eq!(router.route_count(), 500);
    for i in [0, 250, 499] {
        let m = router
            .lookup(&Method::GET, &format!("/api/v1/resource{i}/123"))
            .unwrap();
        assert_eq!(m.get_path_param("id"), Some("123"));
    }
}

// Wall-clock budgets only mean something with optimizations on.
#[cfg(not(debug_assertions))]
#[test]
fn test_lookup_time_budget() {
    let router = router_with(500);

    let start = Instant::now();
    for _ in 0..1000 {
        let m = router.lookup(&Method::GET, "/api/v1/resource250/123");
        assert!(m.is_some());
    }
    let duration = start.elapsed();

    assert!(
        duration.as_millis() < 200,
        "1000 lookups over 500 routes took {duration:?}"
    );
}

#[test]
fn test_many_routes_share_prefix_nodes() {
    let router = router_with(2000);
    assert_eq!(router.route_count(), 2000);
    assert!(router.lookup(&Method::GET, "/api/v1/resource1999/x").is_some());
    assert!(router.lookup(&Method::GET, "/api/v1/resource2000/x").is_none());
    assert!(router.lookup(&Method::GET, "/api/v1").is_none());
}

#[test]
fn test_deep_path_params() {
    let mut router = Router::new();
    let pattern: String = (0..12).map(|i| format!("/s{i}/:p{i}")).collect();
    router.get(&pattern, handlers![|_: &mut Context| {}]);

    let path: String = (0..12).map(|i| format!("/s{i}/{i}")).collect();
    let m = router.lookup(&Method::GET, &path).unwrap();
    // more than the inline capacity spills to the heap but still works
    assert_eq!(m.path_params.len(), 12);
    assert_eq!(m.get_path_param("p11"), Some("11"));
}
