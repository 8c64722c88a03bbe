//! Dispatch-chain composition.
//!
//! Every route node gets one concrete call chain, built at configuration
//! time and reused for every connection. From innermost to outermost the
//! chain wraps the endpoint with the node's before/after hook pair, its
//! permission checks, and its middleware list; middleware declared first
//! ends up outermost, so it sees the request first and the response last.
//! A response marked stop-chain short-circuits on the way out: remaining
//! outer middleware never observe it.

use async_trait::async_trait;
use hyper::StatusCode;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use starling_http::{Exception, Handler, Middleware, Request, Response, Result};

/// Guard evaluated before the wrapped call ever runs.
///
/// A permission either lets the request through or returns an error
/// (typically [`Exception::PermissionDenied`]); permissions never observe
/// the response.
#[async_trait]
pub trait Permission: Send + Sync {
	async fn check(&self, request: &Request) -> Result<()>;
}

/// Hook run strictly before the wrapped call.
///
/// An error here aborts the call; the wrapped handler and the after-hooks
/// never run.
#[async_trait]
pub trait BeforeHook: Send + Sync {
	async fn before(&self, request: &Request) -> Result<()>;
}

/// Hook run strictly after the wrapped call, on success and on error alike.
///
/// The continue-routing signal is the one outcome after-hooks never see:
/// it propagates untouched so the router can resume its scan.
#[async_trait]
pub trait AfterHook: Send + Sync {
	async fn after(&self, request: &Request, outcome: &Result<Response>);
}

struct HookedHandler {
	inner: Arc<dyn Handler>,
	before: Vec<Arc<dyn BeforeHook>>,
	after: Vec<Arc<dyn AfterHook>>,
}

#[async_trait]
impl Handler for HookedHandler {
	async fn handle(&self, request: Request) -> Result<Response> {
		for hook in &self.before {
			hook.before(&request).await?;
		}
		let outcome = self.inner.handle(request.clone()).await;
		if matches!(outcome, Err(Exception::ContinueRouting)) {
			return outcome;
		}
		for hook in &self.after {
			hook.after(&request, &outcome).await;
		}
		outcome
	}
}

struct GuardedHandler {
	inner: Arc<dyn Handler>,
	permissions: Vec<Arc<dyn Permission>>,
}

#[async_trait]
impl Handler for GuardedHandler {
	async fn handle(&self, request: Request) -> Result<Response> {
		for permission in &self.permissions {
			permission.check(&request).await?;
		}
		self.inner.handle(request).await
	}
}

struct MiddlewareHandler {
	middleware: Arc<dyn Middleware>,
	next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for MiddlewareHandler {
	async fn handle(&self, request: Request) -> Result<Response> {
		if !self.middleware.should_continue(&request) {
			return self.next.handle(request).await;
		}
		let gate = Arc::new(StopChainGate {
			inner: self.next.clone(),
			stopped: Mutex::new(None),
		});
		let outcome = self.middleware.process(request, gate.clone()).await;
		match gate.take() {
			Some(response) => Ok(response),
			None => outcome,
		}
	}
}

/// Boundary between one middleware and the rest of the chain.
///
/// A response marked stop-chain is captured here instead of flowing back
/// into the wrapping middleware: the middleware sees
/// [`Exception::ChainStopped`], and the chain returns the captured response
/// untouched. The check repeats at every middleware boundary on the way
/// out, so no remaining outer middleware processes a stopped response.
struct StopChainGate {
	inner: Arc<dyn Handler>,
	stopped: Mutex<Option<Response>>,
}

impl StopChainGate {
	fn take(&self) -> Option<Response> {
		self.stopped.lock().take()
	}
}

#[async_trait]
impl Handler for StopChainGate {
	async fn handle(&self, request: Request) -> Result<Response> {
		let response = self.inner.handle(request).await?;
		if response.should_stop_chain() {
			*self.stopped.lock() = Some(response);
			return Err(Exception::ChainStopped);
		}
		Ok(response)
	}
}

/// Compose the full chain for one route node.
///
/// Hooks sit innermost, permissions wrap them, and the middleware list is
/// folded in reverse so the first-declared middleware is outermost.
pub fn build_chain(
	endpoint: Arc<dyn Handler>,
	middleware: &[Arc<dyn Middleware>],
	permissions: &[Arc<dyn Permission>],
	before_hooks: &[Arc<dyn BeforeHook>],
	after_hooks: &[Arc<dyn AfterHook>],
) -> Arc<dyn Handler> {
	let mut chain = endpoint;
	if !before_hooks.is_empty() || !after_hooks.is_empty() {
		chain = Arc::new(HookedHandler {
			inner: chain,
			before: before_hooks.to_vec(),
			after: after_hooks.to_vec(),
		});
	}
	if !permissions.is_empty() {
		chain = Arc::new(GuardedHandler {
			inner: chain,
			permissions: permissions.to_vec(),
		});
	}
	for mw in middleware.iter().rev() {
		chain = Arc::new(MiddlewareHandler {
			middleware: mw.clone(),
			next: chain,
		});
	}
	chain
}

/// Status-code → handler mapping consulted when an exception escapes a
/// dispatch chain. An unmapped exception falls back to
/// [`convert_exception_to_response`].
#[derive(Clone, Default)]
pub struct ExceptionHandlers {
	handlers: HashMap<StatusCode, Arc<dyn Handler>>,
}

impl ExceptionHandlers {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a handler for a status code, replacing any existing one.
	pub fn on(mut self, status: StatusCode, handler: Arc<dyn Handler>) -> Self {
		self.handlers.insert(status, handler);
		self
	}

	pub fn insert(&mut self, status: StatusCode, handler: Arc<dyn Handler>) {
		self.handlers.insert(status, handler);
	}

	pub fn get(&self, status: StatusCode) -> Option<Arc<dyn Handler>> {
		self.handlers.get(&status).cloned()
	}

	pub fn is_empty(&self) -> bool {
		self.handlers.is_empty()
	}
}

/// Default rendering of an exception as a response.
pub fn convert_exception_to_response(exception: &Exception) -> Response {
	match exception {
		Exception::MethodNotAllowed { allowed } => Response::method_not_allowed(allowed),
		Exception::UpgradeRejected => Response::upgrade_required(),
		other => Response::new(other.status_code()).with_body(other.to_string()),
	}
}
