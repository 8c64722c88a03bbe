//! # Starling Routers
//!
//! The routing core: typed path-template compilation, ordered first-match
//! route resolution, dispatch-chain composition and reverse URL lookup.
//!
//! A [`Router`] owns an ordered list of [`RouteNode`]s — leaf HTTP routes,
//! WebSocket routes, path-prefix mounts and virtual-host nodes — and
//! dispatches each request to the first node that fully matches. Path
//! templates like `/orders/{id:int}` compile through a [`ConverterRegistry`]
//! of typed parameter converters; the same compiled pattern drives both
//! matching and reverse resolution (`path_for("customers:get", …)`).
//!
//! ```
//! use starling_routers::{Route, Router, UrlParams};
//! use starling_http::{FunctionHandler, Response};
//!
//! let router = Router::new().route(
//!     Route::new(
//!         "/users/{username}",
//!         FunctionHandler::new(|_req| async { Ok(Response::ok()) }),
//!     )
//!     .unwrap()
//!     .named("user-detail"),
//! );
//!
//! let path = router
//!     .path_for("user-detail", &UrlParams::new().set("username", "ada"))
//!     .unwrap();
//! assert_eq!(path, "/users/ada");
//! ```

pub mod converters;
pub mod dispatch;
pub mod logging;
pub mod pattern;
pub mod registry;
pub mod reverse;
pub mod route;
pub mod router;

pub use converters::{
	default_registry, register_path_converter, Converter, ConverterError, ConverterRegistry,
	ConverterResult, PathValue,
};
pub use dispatch::{
	build_chain, convert_exception_to_response, AfterHook, BeforeHook, ExceptionHandlers,
	Permission,
};
pub use logging::LoggingMiddleware;
pub use pattern::{MatchingMode, PathParams, PathPattern, PatternError};
pub use registry::{named_routes, register_routes, unregister_routes};
pub use reverse::{ReverseError, UrlParams};
pub use route::{
	Host, MatchContext, Mount, MountError, MountTarget, PartialKind, PathKwargs, Route,
	RouteMatch, RouteNode, WebSocketRoute,
};
pub use router::{LifecycleHook, Router};
