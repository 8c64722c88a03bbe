//! Ordered first-match-wins router.
//!
//! The router scans its route list in insertion order and dispatches to the
//! first node that fully matches. Partial matches (right path, wrong method
//! or missing protocol upgrade) are remembered so exhaustion can answer
//! `405` with an `Allow` header, or `426` for a WebSocket route hit without
//! an upgrade, instead of a plain `404`. A handler may decline a full match
//! by returning [`Exception::ContinueRouting`]; the scan then resumes from
//! the next node as if that node had never matched.

use async_trait::async_trait;
use hyper::Method;
use std::sync::Arc;
use tracing::{debug, info, warn};

use starling_http::{Exception, Handler, Request, Response, Result};

use crate::dispatch::{convert_exception_to_response, ExceptionHandlers};
use crate::reverse::{self, ReverseError, UrlParams};
use crate::route::{Host, Mount, PartialKind, PathKwargs, Route, RouteMatch, RouteNode, WebSocketRoute};

/// Async callback run by [`Router::startup`] / [`Router::shutdown`].
#[async_trait]
pub trait LifecycleHook: Send + Sync {
	async fn run(&self) -> Result<()>;
}

/// Ordered route table plus dispatch policy.
///
/// Insertion order is match-priority order: more specific patterns must be
/// listed before more general ones (`/users/me` before `/users/{id}`).
/// The table is meant to be fully built before the first connection is
/// served; mutating it while serving is a programming error.
///
/// # Examples
///
/// ```
/// use starling_routers::route::Route;
/// use starling_routers::router::Router;
/// use starling_http::{FunctionHandler, Response};
/// use hyper::Method;
///
/// # tokio_test::block_on(async {
/// let router = Router::new().route(
///     Route::new("/hello/{name}", FunctionHandler::new(|req: starling_http::Request| async move {
///         let name = req.path_param("name").unwrap_or("world").to_string();
///         Ok(Response::ok().with_body(name))
///     }))
///     .unwrap(),
/// );
///
/// let request = starling_http::Request::builder()
///     .method(Method::GET)
///     .uri("/hello/ada")
///     .build()
///     .unwrap();
/// let response = router.dispatch(request).await;
/// assert_eq!(response.body.as_ref(), b"ada");
/// # });
/// ```
#[derive(Clone)]
pub struct Router {
	routes: Vec<RouteNode>,
	redirect_slashes: bool,
	default_handler: Option<Arc<dyn Handler>>,
	exception_handlers: ExceptionHandlers,
	on_startup: Vec<Arc<dyn LifecycleHook>>,
	on_shutdown: Vec<Arc<dyn LifecycleHook>>,
}

impl Default for Router {
	fn default() -> Self {
		Self::new()
	}
}

impl Router {
	pub fn new() -> Self {
		Self {
			routes: Vec::new(),
			redirect_slashes: true,
			default_handler: None,
			exception_handlers: ExceptionHandlers::default(),
			on_startup: Vec::new(),
			on_shutdown: Vec::new(),
		}
	}

	/// Build a router over an existing route list.
	pub fn with_routes(routes: Vec<RouteNode>) -> Self {
		let mut router = Self::new();
		for node in routes {
			router.push(node);
		}
		router
	}

	/// Append a leaf HTTP route.
	pub fn route(mut self, route: Route) -> Self {
		self.push(route.into());
		self
	}

	/// Append a leaf WebSocket route.
	pub fn websocket_route(mut self, route: WebSocketRoute) -> Self {
		self.push(route.into());
		self
	}

	/// Append a mount.
	pub fn mount(mut self, mount: Mount) -> Self {
		self.push(mount.into());
		self
	}

	/// Append a host node.
	pub fn host(mut self, host: Host) -> Self {
		self.push(host.into());
		self
	}

	/// Append any node, keeping insertion order as match priority.
	pub fn push(&mut self, node: RouteNode) {
		info!(
			pattern = node.pattern().template(),
			name = node.name().unwrap_or("-"),
			position = self.routes.len(),
			"adding route"
		);
		self.routes.push(node);
	}

	/// Remove the first node with the given name.
	pub fn remove_route(&mut self, name: &str) -> Option<RouteNode> {
		let position = self.routes.iter().position(|n| n.name() == Some(name))?;
		Some(self.routes.remove(position))
	}

	/// Toggle the trailing-slash redirect retry (on by default).
	pub fn redirect_slashes(mut self, enabled: bool) -> Self {
		self.redirect_slashes = enabled;
		self
	}

	/// Replace the fallback handler consulted before the built-in 404.
	pub fn default_handler(mut self, handler: Arc<dyn Handler>) -> Self {
		self.default_handler = Some(handler);
		self
	}

	/// Replace the exception-handler mapping.
	pub fn exception_handlers(mut self, handlers: ExceptionHandlers) -> Self {
		self.exception_handlers = handlers;
		self
	}

	/// Append a startup hook; hooks run in declaration order.
	pub fn on_startup(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
		self.on_startup.push(hook);
		self
	}

	/// Append a shutdown hook; hooks run in declaration order.
	pub fn on_shutdown(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
		self.on_shutdown.push(hook);
		self
	}

	/// The route table, in match-priority order.
	pub fn routes(&self) -> &[RouteNode] {
		&self.routes
	}

	/// Run the startup hooks in declaration order, stopping on the first
	/// error.
	pub async fn startup(&self) -> Result<()> {
		for hook in &self.on_startup {
			hook.run().await?;
		}
		Ok(())
	}

	/// Run the shutdown hooks in declaration order, stopping on the first
	/// error.
	pub async fn shutdown(&self) -> Result<()> {
		for hook in &self.on_shutdown {
			hook.run().await?;
		}
		Ok(())
	}

	/// Match and dispatch one request.
	///
	/// Always produces a response: handler exceptions are rendered through
	/// the exception-handler mapping, and no-match outcomes become the
	/// 404/405/426/redirect responses described on the type.
	pub async fn dispatch(&self, request: Request) -> Response {
		// Typed params contributed by enclosing mounts/hosts; each attempt
		// rebuilds the extension from this snapshot so a declined candidate
		// leaves no residue for the next one.
		let base_kwargs = request.extensions.get::<PathKwargs>().unwrap_or_default();
		let mut allowed: Vec<Method> = Vec::new();
		let mut upgrade_partial = false;

		for node in &self.routes {
			match node.matches(&request) {
				RouteMatch::None => {}
				RouteMatch::Partial(PartialKind::MethodNotAllowed { allowed: methods }) => {
					for method in methods {
						if !allowed.contains(&method) {
							allowed.push(method);
						}
					}
				}
				RouteMatch::Partial(PartialKind::UpgradeRequired) => {
					upgrade_partial = true;
				}
				RouteMatch::Full(ctx) => {
					debug!(
						pattern = node.pattern().template(),
						path = request.routing_path(),
						"route matched"
					);
					let attempt = prepare_attempt(&request, node, ctx, &base_kwargs);
					match node.dispatch_chain().handle(attempt).await {
						Ok(response) => return response,
						Err(error) if error.is_continue_routing() => {
							debug!(
								pattern = node.pattern().template(),
								"handler declined; resuming scan"
							);
						}
						Err(error) => return self.render_exception(request, error).await,
					}
				}
			}
		}

		if !allowed.is_empty() {
			allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
			return self
				.render_exception(request, Exception::MethodNotAllowed { allowed })
				.await;
		}
		if upgrade_partial {
			return self.render_exception(request, Exception::UpgradeRejected).await;
		}
		if self.redirect_slashes && !request.is_websocket_upgrade() {
			if let Some(location) = self.slash_redirect_target(&request) {
				debug!(%location, "redirecting to slash-toggled path");
				return Response::temporary_redirect(&location);
			}
		}
		if let Some(handler) = &self.default_handler {
			match handler.handle(request.clone()).await {
				Ok(response) => return response,
				Err(error) => return self.render_exception(request, error).await,
			}
		}
		self.render_exception(request, Exception::NotFound).await
	}

	/// Re-match with the trailing slash toggled; a structural hit yields
	/// the redirect location (query string preserved).
	fn slash_redirect_target(&self, request: &Request) -> Option<String> {
		let routing_path = request.routing_path();
		let toggled = if routing_path.len() > 1 && routing_path.ends_with('/') {
			routing_path[..routing_path.len() - 1].to_string()
		} else if !routing_path.is_empty() && !routing_path.ends_with('/') {
			format!("{routing_path}/")
		} else {
			return None;
		};

		let mut probe = request.clone();
		probe.set_routing_path(toggled.clone());
		let hit = self
			.routes
			.iter()
			.any(|node| matches!(node.matches(&probe), RouteMatch::Full(_)));
		if !hit {
			return None;
		}

		let mut location = format!("{}{}", request.root_path(), toggled);
		if let Some(query) = request.uri.query() {
			location.push('?');
			location.push_str(query);
		}
		Some(location)
	}

	async fn render_exception(&self, request: Request, exception: Exception) -> Response {
		if exception.is_continue_routing() {
			warn!("continue-routing signal escaped the scan; rendering not found");
			return convert_exception_to_response(&Exception::NotFound);
		}
		if let Some(handler) = self.exception_handlers.get(exception.status_code()) {
			match handler.handle(request).await {
				Ok(response) => return response,
				Err(error) => {
					warn!(%error, "exception handler failed; falling back to default rendering");
				}
			}
		}
		convert_exception_to_response(&exception)
	}

	/// Reconstruct the path for a named route from supplied parameters.
	///
	/// Names are colon-qualified through nested mounts and hosts
	/// (`"customers:get"`). Fails with [`ReverseError::NoMatchFound`] when
	/// no node resolves the name with exactly the supplied parameters.
	pub fn path_for(&self, name: &str, params: &UrlParams) -> std::result::Result<String, ReverseError> {
		reverse::resolve(&self.routes, name, params)
	}

	/// Like [`path_for`](Self::path_for) but joined onto a base URL, so
	/// host-qualified results become absolute.
	pub fn url_for(
		&self,
		base: &str,
		name: &str,
		params: &UrlParams,
	) -> std::result::Result<String, ReverseError> {
		reverse::absolute(base, self.path_for(name, params)?)
	}
}

/// Clone the request for one dispatch attempt, merging matched parameters
/// and, for mounts, advancing the root-path/routing-path bookkeeping.
fn prepare_attempt(
	request: &Request,
	node: &RouteNode,
	ctx: crate::route::MatchContext,
	base_kwargs: &PathKwargs,
) -> Request {
	let mut attempt = request.clone();
	let mut kwargs = base_kwargs.clone();
	for (name, value) in ctx.params.typed {
		kwargs.0.insert(name, value);
	}
	for (name, value) in ctx.params.raw {
		attempt.set_path_param(name, value);
	}
	attempt.extensions.insert(kwargs);

	if matches!(node, RouteNode::Mount(_)) {
		if let Some(residual) = ctx.params.residual {
			let routing_path = attempt.routing_path().to_string();
			let consumed = &routing_path[..routing_path.len() - residual.len()];
			attempt.set_root_path(format!("{}{}", attempt.root_path(), consumed));
			attempt.set_routing_path(residual);
		}
	}
	attempt
}

#[async_trait]
impl Handler for Router {
	async fn handle(&self, request: Request) -> Result<Response> {
		Ok(self.dispatch(request).await)
	}
}
