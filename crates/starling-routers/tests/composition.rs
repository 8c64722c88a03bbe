//! Dispatch-chain composition scenarios: middleware/permission/hook
//! ordering, exception-handler mapping, lifecycle hooks.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hyper::{Method, StatusCode};

use starling_http::{
	Exception, FunctionHandler, Handler, Middleware, Request, Response, Result,
};
use starling_routers::{
	AfterHook, BeforeHook, ExceptionHandlers, LifecycleHook, Permission, Route, Router,
};

#[derive(Clone, Default)]
struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
	fn push(&self, event: impl Into<String>) {
		self.0.lock().unwrap().push(event.into());
	}

	fn events(&self) -> Vec<String> {
		self.0.lock().unwrap().clone()
	}
}

struct TracingMiddleware {
	label: &'static str,
	trace: Trace,
}

#[async_trait]
impl Middleware for TracingMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		self.trace.push(format!("{}-in", self.label));
		let response = next.handle(request).await;
		self.trace.push(format!("{}-out", self.label));
		response
	}
}

struct TracingPermission {
	trace: Trace,
	allow: bool,
}

#[async_trait]
impl Permission for TracingPermission {
	async fn check(&self, _request: &Request) -> Result<()> {
		self.trace.push("permission");
		if self.allow {
			Ok(())
		} else {
			Err(Exception::PermissionDenied("blocked".into()))
		}
	}
}

struct TracingHooks {
	trace: Trace,
}

#[async_trait]
impl BeforeHook for TracingHooks {
	async fn before(&self, _request: &Request) -> Result<()> {
		self.trace.push("before");
		Ok(())
	}
}

#[async_trait]
impl AfterHook for TracingHooks {
	async fn after(&self, _request: &Request, outcome: &Result<Response>) {
		self.trace
			.push(format!("after({})", if outcome.is_ok() { "ok" } else { "err" }));
	}
}

fn get(uri: &str) -> Request {
	Request::builder()
		.method(Method::GET)
		.uri(uri)
		.build()
		.unwrap()
}

fn traced_route(trace: &Trace, allow: bool) -> Route {
	let endpoint_trace = trace.clone();
	let hooks = Arc::new(TracingHooks { trace: trace.clone() });
	Route::new(
		"/guarded",
		FunctionHandler::new(move |_req| {
			let trace = endpoint_trace.clone();
			async move {
				trace.push("endpoint");
				Ok(Response::ok())
			}
		}),
	)
	.unwrap()
	.middleware(Arc::new(TracingMiddleware {
		label: "outer",
		trace: trace.clone(),
	}))
	.middleware(Arc::new(TracingMiddleware {
		label: "inner",
		trace: trace.clone(),
	}))
	.permission(Arc::new(TracingPermission {
		trace: trace.clone(),
		allow,
	}))
	.before_hook(hooks.clone())
	.after_hook(hooks)
}

#[tokio::test]
async fn test_full_chain_ordering() {
	let trace = Trace::default();
	let router = Router::new().route(traced_route(&trace, true));

	let response = router.dispatch(get("/guarded")).await;
	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(
		trace.events(),
		vec![
			"outer-in",
			"inner-in",
			"permission",
			"before",
			"endpoint",
			"after(ok)",
			"inner-out",
			"outer-out",
		]
	);
}

#[tokio::test]
async fn test_permission_denial_short_circuits_to_403() {
	let trace = Trace::default();
	let router = Router::new().route(traced_route(&trace, false));

	let response = router.dispatch(get("/guarded")).await;
	assert_eq!(response.status, StatusCode::FORBIDDEN);
	// The handler and its hooks never ran; middleware still unwound.
	assert_eq!(
		trace.events(),
		vec!["outer-in", "inner-in", "permission", "inner-out", "outer-out"]
	);
}

#[tokio::test]
async fn test_permission_denial_reaches_registered_handler() {
	let handlers = ExceptionHandlers::new().on(
		StatusCode::FORBIDDEN,
		Arc::new(FunctionHandler::new(|_req| {
			std::future::ready(Ok(Response::forbidden().with_body("custom denial page")))
		})),
	);
	let trace = Trace::default();
	let router = Router::new()
		.route(traced_route(&trace, false))
		.exception_handlers(handlers);

	let response = router.dispatch(get("/guarded")).await;
	assert_eq!(response.status, StatusCode::FORBIDDEN);
	assert_eq!(response.body.as_ref(), b"custom denial page");
}

#[tokio::test]
async fn test_after_hook_observes_handler_error() {
	let trace = Trace::default();
	let hooks = Arc::new(TracingHooks { trace: trace.clone() });
	let router = Router::new().route(
		Route::new(
			"/failing",
			FunctionHandler::new(|_req| {
				std::future::ready(Err(Exception::Internal("boom".into())))
			}),
		)
		.unwrap()
		.before_hook(hooks.clone())
		.after_hook(hooks),
	);

	let response = router.dispatch(get("/failing")).await;
	assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(trace.events(), vec!["before", "after(err)"]);
}

struct DecoratingMiddleware {
	trace: Trace,
}

#[async_trait]
impl Middleware for DecoratingMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let response = next.handle(request).await?;
		self.trace.push("decorated");
		Ok(response.with_header(hyper::header::SERVER, "starling"))
	}
}

struct AuthShortCircuit;

#[async_trait]
impl Middleware for AuthShortCircuit {
	async fn process(&self, _request: Request, _next: Arc<dyn Handler>) -> Result<Response> {
		Ok(Response::unauthorized().with_stop_chain(true))
	}
}

#[tokio::test]
async fn test_stop_chain_response_bypasses_outer_middleware() {
	let trace = Trace::default();
	let endpoint_trace = trace.clone();
	let router = Router::new().route(
		Route::new(
			"/private",
			FunctionHandler::new(move |_req| {
				let trace = endpoint_trace.clone();
				async move {
					trace.push("endpoint");
					Ok(Response::ok())
				}
			}),
		)
		.unwrap()
		.middleware(Arc::new(DecoratingMiddleware { trace: trace.clone() }))
		.middleware(Arc::new(AuthShortCircuit)),
	);

	let response = router.dispatch(get("/private")).await;
	assert_eq!(response.status, StatusCode::UNAUTHORIZED);
	// The stopped response reached the client as produced: no decoration,
	// no endpoint call.
	assert!(!response.headers.contains_key(hyper::header::SERVER));
	assert!(trace.events().is_empty());
}

struct TracingLifecycle {
	label: &'static str,
	trace: Trace,
}

#[async_trait]
impl LifecycleHook for TracingLifecycle {
	async fn run(&self) -> Result<()> {
		self.trace.push(self.label);
		Ok(())
	}
}

#[tokio::test]
async fn test_lifecycle_hooks_run_in_declaration_order() {
	let trace = Trace::default();
	let router = Router::new()
		.on_startup(Arc::new(TracingLifecycle {
			label: "start-a",
			trace: trace.clone(),
		}))
		.on_startup(Arc::new(TracingLifecycle {
			label: "start-b",
			trace: trace.clone(),
		}))
		.on_shutdown(Arc::new(TracingLifecycle {
			label: "stop-a",
			trace: trace.clone(),
		}));

	router.startup().await.unwrap();
	router.shutdown().await.unwrap();
	assert_eq!(trace.events(), vec!["start-a", "start-b", "stop-a"]);
}

struct SkippingMiddleware {
	trace: Trace,
}

#[async_trait]
impl Middleware for SkippingMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		self.trace.push("skipping-ran");
		next.handle(request).await
	}

	fn should_continue(&self, request: &Request) -> bool {
		request.query_param("debug").is_some()
	}
}

#[tokio::test]
async fn test_should_continue_gates_middleware_per_request() {
	let trace = Trace::default();
	let router = Router::new().route(
		Route::new(
			"/metrics",
			FunctionHandler::new(|_req| std::future::ready(Ok(Response::ok()))),
		)
		.unwrap()
		.middleware(Arc::new(SkippingMiddleware { trace: trace.clone() })),
	);

	router.dispatch(get("/metrics")).await;
	assert!(trace.events().is_empty());

	router.dispatch(get("/metrics?debug=1")).await;
	assert_eq!(trace.events(), vec!["skipping-ran"]);
}
