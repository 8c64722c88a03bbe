//! Route variants.
//!
//! Four node kinds share one matching contract: [`Route`] (leaf HTTP),
//! [`WebSocketRoute`], [`Mount`] (path-prefix delegation to a nested router
//! or an opaque sub-application) and [`Host`] (virtual-host delegation).
//! The router iterates [`RouteNode`] values and only ever talks to the
//! shared [`matches`](RouteNode::matches) / dispatch-chain surface.

use hyper::Method;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use starling_http::{Handler, Middleware, Request};

use crate::converters::{default_registry, ConverterRegistry, PathValue};
use crate::dispatch::{build_chain, AfterHook, BeforeHook, Permission};
use crate::pattern::{PathParams, PathPattern, PatternError};
use crate::registry;
use crate::router::Router;

/// Typed path parameters, carried in the request's extension bag so
/// handlers can recover converted values without re-parsing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathKwargs(pub HashMap<String, PathValue>);

impl PathKwargs {
	pub fn get(&self, name: &str) -> Option<&PathValue> {
		self.0.get(name)
	}
}

/// Outcome of matching one node against a request.
#[derive(Debug)]
pub enum RouteMatch {
	/// The node does not apply to this request at all.
	None,
	/// The path matched but an auxiliary constraint failed; drives the
	/// 405/426 outcome when nothing matches fully.
	Partial(PartialKind),
	/// The node owns this request.
	Full(MatchContext),
}

/// Which auxiliary constraint failed on a partial match.
#[derive(Debug, Clone)]
pub enum PartialKind {
	/// Path matched a leaf HTTP route declared for other methods.
	MethodNotAllowed { allowed: Vec<Method> },
	/// Path matched a WebSocket route but no upgrade was requested.
	UpgradeRequired,
}

/// Context a full match hands to the router before invoking the chain.
#[derive(Debug, Default)]
pub struct MatchContext {
	pub params: PathParams,
}

/// Errors constructing a mount.
#[derive(Debug, Error)]
pub enum MountError {
	#[error(transparent)]
	Pattern(#[from] PatternError),

	#[error("no route list registered under key `{key}`")]
	UnknownKey { key: String },
}

/// A leaf HTTP route: compiled path template, handler, allowed methods.
///
/// `GET` implies `HEAD`. Methods default to `GET` only.
///
/// # Examples
///
/// ```
/// use starling_routers::route::Route;
/// use starling_http::{FunctionHandler, Response};
/// use hyper::Method;
///
/// let route = Route::new(
///     "/users/{username}",
///     FunctionHandler::new(|_req| async { Ok(Response::ok()) }),
/// )
/// .unwrap()
/// .methods(vec![Method::GET, Method::POST])
/// .named("user-detail");
///
/// assert_eq!(route.name(), Some("user-detail"));
/// ```
#[derive(Clone)]
pub struct Route {
	pattern: PathPattern,
	handler: Arc<dyn Handler>,
	methods: Vec<Method>,
	name: Option<String>,
	middleware: Vec<Arc<dyn Middleware>>,
	permissions: Vec<Arc<dyn Permission>>,
	before_hooks: Vec<Arc<dyn BeforeHook>>,
	after_hooks: Vec<Arc<dyn AfterHook>>,
	pub include_in_schema: bool,
	pub deprecated: bool,
	chain: OnceCell<Arc<dyn Handler>>,
}

impl Route {
	/// Compile the template against the process-wide default registry.
	pub fn new(path: &str, handler: impl Handler + 'static) -> Result<Self, PatternError> {
		Self::with_registry(path, handler, &default_registry())
	}

	/// Compile the template against an explicit converter registry.
	pub fn with_registry(
		path: &str,
		handler: impl Handler + 'static,
		registry: &ConverterRegistry,
	) -> Result<Self, PatternError> {
		Ok(Self {
			pattern: PathPattern::compile(path, registry)?,
			handler: Arc::new(handler),
			methods: vec![Method::GET],
			name: None,
			middleware: Vec::new(),
			permissions: Vec::new(),
			before_hooks: Vec::new(),
			after_hooks: Vec::new(),
			include_in_schema: true,
			deprecated: false,
			chain: OnceCell::new(),
		})
	}

	/// Replace the allowed-method set.
	pub fn methods(mut self, methods: Vec<Method>) -> Self {
		self.methods = methods;
		self
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Set the symbolic name used by reverse resolution.
	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middleware.push(middleware);
		self
	}

	pub fn permission(mut self, permission: Arc<dyn Permission>) -> Self {
		self.permissions.push(permission);
		self
	}

	pub fn before_hook(mut self, hook: Arc<dyn BeforeHook>) -> Self {
		self.before_hooks.push(hook);
		self
	}

	pub fn after_hook(mut self, hook: Arc<dyn AfterHook>) -> Self {
		self.after_hooks.push(hook);
		self
	}

	pub fn include_in_schema(mut self, include: bool) -> Self {
		self.include_in_schema = include;
		self
	}

	pub fn deprecated(mut self, deprecated: bool) -> Self {
		self.deprecated = deprecated;
		self
	}

	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	/// Allowed methods as advertised in `Allow`, `HEAD` included when
	/// `GET` is.
	pub fn allowed_methods(&self) -> Vec<Method> {
		let mut methods = self.methods.clone();
		if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
			methods.push(Method::HEAD);
		}
		methods
	}

	fn allows(&self, method: &Method) -> bool {
		self.methods.contains(method)
			|| (*method == Method::HEAD && self.methods.contains(&Method::GET))
	}

	pub fn matches(&self, request: &Request) -> RouteMatch {
		if request.is_websocket_upgrade() {
			return RouteMatch::None;
		}
		let Some(params) = self.pattern.match_path(request.routing_path()) else {
			return RouteMatch::None;
		};
		if self.allows(&request.method) {
			RouteMatch::Full(MatchContext { params })
		} else {
			RouteMatch::Partial(PartialKind::MethodNotAllowed {
				allowed: self.allowed_methods(),
			})
		}
	}

	pub(crate) fn dispatch_chain(&self) -> Arc<dyn Handler> {
		self.chain
			.get_or_init(|| {
				build_chain(
					self.handler.clone(),
					&self.middleware,
					&self.permissions,
					&self.before_hooks,
					&self.after_hooks,
				)
			})
			.clone()
	}
}

/// A leaf WebSocket route.
///
/// Matching requires the connection to ask for a protocol upgrade; a plain
/// HTTP request on a matching path is a partial match, which the router
/// turns into `426 Upgrade Required` if nothing else fully matches.
#[derive(Clone)]
pub struct WebSocketRoute {
	pattern: PathPattern,
	handler: Arc<dyn Handler>,
	name: Option<String>,
	middleware: Vec<Arc<dyn Middleware>>,
	permissions: Vec<Arc<dyn Permission>>,
	pub include_in_schema: bool,
	pub deprecated: bool,
	chain: OnceCell<Arc<dyn Handler>>,
}

impl WebSocketRoute {
	pub fn new(path: &str, handler: impl Handler + 'static) -> Result<Self, PatternError> {
		Self::with_registry(path, handler, &default_registry())
	}

	pub fn with_registry(
		path: &str,
		handler: impl Handler + 'static,
		registry: &ConverterRegistry,
	) -> Result<Self, PatternError> {
		Ok(Self {
			pattern: PathPattern::compile(path, registry)?,
			handler: Arc::new(handler),
			name: None,
			middleware: Vec::new(),
			permissions: Vec::new(),
			include_in_schema: true,
			deprecated: false,
			chain: OnceCell::new(),
		})
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middleware.push(middleware);
		self
	}

	pub fn permission(mut self, permission: Arc<dyn Permission>) -> Self {
		self.permissions.push(permission);
		self
	}

	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	pub fn matches(&self, request: &Request) -> RouteMatch {
		let Some(params) = self.pattern.match_path(request.routing_path()) else {
			return RouteMatch::None;
		};
		if request.is_websocket_upgrade() {
			RouteMatch::Full(MatchContext { params })
		} else {
			RouteMatch::Partial(PartialKind::UpgradeRequired)
		}
	}

	pub(crate) fn dispatch_chain(&self) -> Arc<dyn Handler> {
		self.chain
			.get_or_init(|| {
				build_chain(
					self.handler.clone(),
					&self.middleware,
					&self.permissions,
					&[],
					&[],
				)
			})
			.clone()
	}
}

/// What a mount delegates to below its prefix.
#[derive(Clone)]
pub enum MountTarget {
	/// A nested router with its own ordered route list.
	Routes(Router),
	/// An opaque sub-application matched as a catch-all.
	App(Arc<dyn Handler>),
}

/// Path-prefix delegation node.
///
/// The prefix is compiled with an implicit catch-all tail, so `/users`
/// matches `/users/7` and hands `/7` to the nested router as its routing
/// path; the consumed prefix accumulates in the request's root path.
#[derive(Clone)]
pub struct Mount {
	pattern: PathPattern,
	target: MountTarget,
	name: Option<String>,
	middleware: Vec<Arc<dyn Middleware>>,
	permissions: Vec<Arc<dyn Permission>>,
	pub include_in_schema: bool,
	pub deprecated: bool,
	chain: OnceCell<Arc<dyn Handler>>,
}

impl Mount {
	/// Mount a nested route list under a path prefix.
	pub fn new(prefix: &str, routes: Vec<RouteNode>) -> Result<Self, PatternError> {
		Self::with_registry(prefix, routes, &default_registry())
	}

	pub fn with_registry(
		prefix: &str,
		routes: Vec<RouteNode>,
		registry: &ConverterRegistry,
	) -> Result<Self, PatternError> {
		Ok(Self {
			pattern: PathPattern::compile_prefix(prefix, registry)?,
			target: MountTarget::Routes(Router::with_routes(routes)),
			name: None,
			middleware: Vec::new(),
			permissions: Vec::new(),
			include_in_schema: true,
			deprecated: false,
			chain: OnceCell::new(),
		})
	}

	/// Mount an opaque sub-application under a path prefix.
	pub fn app(prefix: &str, app: Arc<dyn Handler>) -> Result<Self, PatternError> {
		Ok(Self {
			pattern: PathPattern::compile_prefix(prefix, &default_registry())?,
			target: MountTarget::App(app),
			name: None,
			middleware: Vec::new(),
			permissions: Vec::new(),
			include_in_schema: true,
			deprecated: false,
			chain: OnceCell::new(),
		})
	}

	/// Mount a route list previously registered under a symbolic key.
	///
	/// Purely a configuration convenience; once resolved, matching is
	/// identical to [`Mount::new`].
	pub fn from_registry(prefix: &str, key: &str) -> Result<Self, MountError> {
		let routes = registry::named_routes(key).ok_or_else(|| MountError::UnknownKey {
			key: key.to_string(),
		})?;
		Ok(Self::new(prefix, routes)?)
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middleware.push(middleware);
		self
	}

	pub fn permission(mut self, permission: Arc<dyn Permission>) -> Self {
		self.permissions.push(permission);
		self
	}

	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	pub fn target(&self) -> &MountTarget {
		&self.target
	}

	/// The nested router, when this mount delegates to one.
	pub fn router(&self) -> Option<&Router> {
		match &self.target {
			MountTarget::Routes(router) => Some(router),
			MountTarget::App(_) => None,
		}
	}

	pub fn matches(&self, request: &Request) -> RouteMatch {
		match self.pattern.match_path(request.routing_path()) {
			Some(params) => RouteMatch::Full(MatchContext { params }),
			None => RouteMatch::None,
		}
	}

	pub(crate) fn dispatch_chain(&self) -> Arc<dyn Handler> {
		self.chain
			.get_or_init(|| {
				let endpoint: Arc<dyn Handler> = match &self.target {
					MountTarget::Routes(router) => Arc::new(router.clone()),
					MountTarget::App(app) => app.clone(),
				};
				build_chain(endpoint, &self.middleware, &self.permissions, &[], &[])
			})
			.clone()
	}
}

/// Virtual-host delegation node.
///
/// Matches the connection's declared host (port stripped) against a host
/// template compiled by the same path compiler, never the path; wraps an
/// inner router exactly like [`Mount`] wraps one for path delegation.
#[derive(Clone)]
pub struct Host {
	pattern: PathPattern,
	router: Router,
	name: Option<String>,
	middleware: Vec<Arc<dyn Middleware>>,
	permissions: Vec<Arc<dyn Permission>>,
	pub include_in_schema: bool,
	pub deprecated: bool,
	chain: OnceCell<Arc<dyn Handler>>,
}

impl Host {
	pub fn new(host: &str, routes: Vec<RouteNode>) -> Result<Self, PatternError> {
		Self::with_registry(host, routes, &default_registry())
	}

	pub fn with_registry(
		host: &str,
		routes: Vec<RouteNode>,
		registry: &ConverterRegistry,
	) -> Result<Self, PatternError> {
		Ok(Self {
			pattern: PathPattern::compile(host, registry)?,
			router: Router::with_routes(routes),
			name: None,
			middleware: Vec::new(),
			permissions: Vec::new(),
			include_in_schema: true,
			deprecated: false,
			chain: OnceCell::new(),
		})
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middleware.push(middleware);
		self
	}

	pub fn permission(mut self, permission: Arc<dyn Permission>) -> Self {
		self.permissions.push(permission);
		self
	}

	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	pub fn router(&self) -> &Router {
		&self.router
	}

	pub fn matches(&self, request: &Request) -> RouteMatch {
		let Some(host) = request.host() else {
			return RouteMatch::None;
		};
		let host = host.split(':').next().unwrap_or(host);
		match self.pattern.match_path(host) {
			Some(params) => RouteMatch::Full(MatchContext { params }),
			None => RouteMatch::None,
		}
	}

	pub(crate) fn dispatch_chain(&self) -> Arc<dyn Handler> {
		self.chain
			.get_or_init(|| {
				build_chain(
					Arc::new(self.router.clone()),
					&self.middleware,
					&self.permissions,
					&[],
					&[],
				)
			})
			.clone()
	}
}

/// The unit the router iterates over.
#[derive(Clone)]
pub enum RouteNode {
	Http(Route),
	WebSocket(WebSocketRoute),
	Mount(Mount),
	Host(Host),
}

impl RouteNode {
	pub fn name(&self) -> Option<&str> {
		match self {
			RouteNode::Http(r) => r.name(),
			RouteNode::WebSocket(r) => r.name(),
			RouteNode::Mount(m) => m.name(),
			RouteNode::Host(h) => h.name(),
		}
	}

	pub fn pattern(&self) -> &PathPattern {
		match self {
			RouteNode::Http(r) => r.pattern(),
			RouteNode::WebSocket(r) => r.pattern(),
			RouteNode::Mount(m) => m.pattern(),
			RouteNode::Host(h) => h.pattern(),
		}
	}

	pub fn matches(&self, request: &Request) -> RouteMatch {
		match self {
			RouteNode::Http(r) => r.matches(request),
			RouteNode::WebSocket(r) => r.matches(request),
			RouteNode::Mount(m) => m.matches(request),
			RouteNode::Host(h) => h.matches(request),
		}
	}

	/// Carried for external schema generators; never consulted by matching.
	pub fn include_in_schema(&self) -> bool {
		match self {
			RouteNode::Http(r) => r.include_in_schema,
			RouteNode::WebSocket(r) => r.include_in_schema,
			RouteNode::Mount(m) => m.include_in_schema,
			RouteNode::Host(h) => h.include_in_schema,
		}
	}

	/// Carried for external schema generators; never consulted by matching.
	pub fn deprecated(&self) -> bool {
		match self {
			RouteNode::Http(r) => r.deprecated,
			RouteNode::WebSocket(r) => r.deprecated,
			RouteNode::Mount(m) => m.deprecated,
			RouteNode::Host(h) => h.deprecated,
		}
	}

	pub(crate) fn dispatch_chain(&self) -> Arc<dyn Handler> {
		match self {
			RouteNode::Http(r) => r.dispatch_chain(),
			RouteNode::WebSocket(r) => r.dispatch_chain(),
			RouteNode::Mount(m) => m.dispatch_chain(),
			RouteNode::Host(h) => h.dispatch_chain(),
		}
	}
}

impl From<Route> for RouteNode {
	fn from(route: Route) -> Self {
		RouteNode::Http(route)
	}
}

impl From<WebSocketRoute> for RouteNode {
	fn from(route: WebSocketRoute) -> Self {
		RouteNode::WebSocket(route)
	}
}

impl From<Mount> for RouteNode {
	fn from(mount: Mount) -> Self {
		RouteNode::Mount(mount)
	}
}

impl From<Host> for RouteNode {
	fn from(host: Host) -> Self {
		RouteNode::Host(host)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use hyper::header::{HOST, UPGRADE};
	use hyper::HeaderMap;
	use starling_http::{FunctionHandler, Response};

	fn ok_handler() -> impl Handler {
		FunctionHandler::new(|_req| std::future::ready(Ok(Response::ok())))
	}

	fn get(uri: &str) -> Request {
		Request::builder().method(Method::GET).uri(uri).build().unwrap()
	}

	fn upgrade(uri: &str) -> Request {
		let mut headers = HeaderMap::new();
		headers.insert(UPGRADE, "websocket".parse().unwrap());
		Request::builder()
			.method(Method::GET)
			.uri(uri)
			.headers(headers)
			.build()
			.unwrap()
	}

	#[test]
	fn test_route_method_mismatch_is_partial() {
		let route = Route::new("/items", ok_handler())
			.unwrap()
			.methods(vec![Method::POST]);
		let outcome = route.matches(&get("/items"));
		match outcome {
			RouteMatch::Partial(PartialKind::MethodNotAllowed { allowed }) => {
				assert_eq!(allowed, vec![Method::POST]);
			}
			other => panic!("expected partial match, got {other:?}"),
		}
	}

	#[test]
	fn test_head_implied_by_get() {
		let route = Route::new("/items", ok_handler()).unwrap();
		let request = Request::builder()
			.method(Method::HEAD)
			.uri("/items")
			.build()
			.unwrap();
		assert!(matches!(route.matches(&request), RouteMatch::Full(_)));
		assert!(route.allowed_methods().contains(&Method::HEAD));
	}

	#[test]
	fn test_http_route_ignores_upgrade_requests() {
		let route = Route::new("/items", ok_handler()).unwrap();
		assert!(matches!(route.matches(&upgrade("/items")), RouteMatch::None));
	}

	#[test]
	fn test_websocket_route_without_upgrade_is_partial() {
		let route = WebSocketRoute::new("/ws", ok_handler()).unwrap();
		assert!(matches!(
			route.matches(&get("/ws")),
			RouteMatch::Partial(PartialKind::UpgradeRequired)
		));
		assert!(matches!(route.matches(&upgrade("/ws")), RouteMatch::Full(_)));
	}

	#[test]
	fn test_mount_captures_residual() {
		let leaf = Route::new("/{id:int}", ok_handler()).unwrap();
		let mount = Mount::new("/customers", vec![leaf.into()]).unwrap();
		match mount.matches(&get("/customers/7")) {
			RouteMatch::Full(ctx) => {
				assert_eq!(ctx.params.residual.as_deref(), Some("/7"));
			}
			other => panic!("expected full match, got {other:?}"),
		}
		assert!(matches!(mount.matches(&get("/customers")), RouteMatch::None));
	}

	#[test]
	fn test_host_matches_header_port_stripped() {
		let leaf = Route::new("/", ok_handler()).unwrap().named("home");
		let host = Host::new("{subdomain}.example.com", vec![leaf.into()]).unwrap();

		let mut headers = HeaderMap::new();
		headers.insert(HOST, "api.example.com:8080".parse().unwrap());
		let request = Request::builder()
			.method(Method::GET)
			.uri("/")
			.headers(headers)
			.build()
			.unwrap();

		match host.matches(&request) {
			RouteMatch::Full(ctx) => {
				assert_eq!(ctx.params.raw["subdomain"], "api");
			}
			other => panic!("expected full match, got {other:?}"),
		}
		assert!(matches!(host.matches(&get("/")), RouteMatch::None));
	}
}
