//! # Starling
//!
//! An HTTP routing and request-dispatch core for Rust, in the style of the
//! Python ASGI micro-frameworks.
//!
//! Starling is the routing layer of a web stack: it compiles typed path
//! templates, matches requests against an ordered route tree (leaf HTTP
//! routes, WebSocket routes, path-prefix mounts, virtual hosts), composes
//! per-route middleware/permission/hook chains once at configuration time,
//! and resolves route names back into concrete URLs. Everything beyond the
//! connection-handler contract — servers, templating, persistence — is out
//! of scope and plugs in behind `Handler`.
//!
//! ## Quick Example
//!
//! ```
//! use starling::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let router = Router::new()
//!     .route(
//!         Route::new(
//!             "/users/{username}",
//!             FunctionHandler::new(|req: Request| async move {
//!                 let name = req.path_param("username").unwrap_or("?").to_string();
//!                 Ok(Response::ok().with_body(name))
//!             }),
//!         )
//!         .unwrap()
//!         .named("user-detail"),
//!     );
//!
//! let request = Request::builder()
//!     .method(hyper::Method::GET)
//!     .uri("/users/ada")
//!     .build()
//!     .unwrap();
//! let response = router.dispatch(request).await;
//! assert_eq!(response.body.as_ref(), b"ada");
//!
//! let path = router
//!     .path_for("user-detail", &UrlParams::new().set("username", "ada"))
//!     .unwrap();
//! assert_eq!(path, "/users/ada");
//! # });
//! ```

pub use starling_http as http;
pub use starling_routers as routers;

pub use starling_http::{
	Exception, Extensions, FunctionHandler, Handler, Middleware, Request, RequestBuilder,
	Response, Result,
};
pub use starling_routers::{
	default_registry, register_path_converter, AfterHook, BeforeHook, Converter,
	ConverterRegistry, ExceptionHandlers, Host, LifecycleHook, LoggingMiddleware, Mount,
	PathKwargs, PathPattern, PathValue, Permission, ReverseError, Route, RouteNode, Router,
	UrlParams, WebSocketRoute,
};

/// Commonly used imports.
///
/// ```
/// use starling::prelude::*;
/// ```
pub mod prelude {
	pub use starling_http::{
		Exception, FunctionHandler, Handler, Middleware, Request, Response, Result,
	};
	pub use starling_routers::{
		Host, Mount, PathKwargs, PathValue, Route, RouteNode, Router, UrlParams, WebSocketRoute,
	};
}
