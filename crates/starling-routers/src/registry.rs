//! Process-wide named route-list registry.
//!
//! Lets configuration code register a route list under a symbolic key and
//! mount it elsewhere by name ([`Mount::from_registry`]), decoupling the
//! module that declares routes from the module that wires the tree
//! together. Written only during startup; has no bearing on matching once
//! a mount has resolved its list.
//!
//! [`Mount::from_registry`]: crate::route::Mount::from_registry

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;

use crate::route::RouteNode;

static ROUTE_LISTS: Lazy<RwLock<HashMap<String, Vec<RouteNode>>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

/// Register a route list under a key, replacing any previous list.
pub fn register_routes(key: impl Into<String>, routes: Vec<RouteNode>) {
	let key = key.into();
	info!(key = %key, count = routes.len(), "registered named route list");
	ROUTE_LISTS.write().insert(key, routes);
}

/// Fetch a copy of the route list registered under a key.
pub fn named_routes(key: &str) -> Option<Vec<RouteNode>> {
	ROUTE_LISTS.read().get(key).cloned()
}

/// Remove and return the route list registered under a key.
pub fn unregister_routes(key: &str) -> Option<Vec<RouteNode>> {
	ROUTE_LISTS.write().remove(key)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::route::Route;
	use serial_test::serial;
	use starling_http::{FunctionHandler, Response};

	fn leaf(path: &str) -> RouteNode {
		Route::new(
			path,
			FunctionHandler::new(|_req| std::future::ready(Ok(Response::ok()))),
		)
		.unwrap()
		.into()
	}

	#[test]
	#[serial]
	fn test_register_and_fetch() {
		register_routes("registry-test-api", vec![leaf("/a"), leaf("/b")]);
		let routes = named_routes("registry-test-api").unwrap();
		assert_eq!(routes.len(), 2);
		assert!(unregister_routes("registry-test-api").is_some());
		assert!(named_routes("registry-test-api").is_none());
	}
}
