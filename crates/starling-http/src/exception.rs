//! Dispatch-time exception taxonomy.
//!
//! Every handler, middleware and permission check in starling returns
//! [`Result<Response>`](crate::Result). The [`Exception`] enum is the error
//! half of that result: each variant either maps onto an HTTP status code or
//! is a control-flow signal consumed by the router itself.

use hyper::{Method, StatusCode};
use thiserror::Error;

/// Result alias used throughout the framework.
pub type Result<T> = std::result::Result<T, Exception>;

/// Errors raised while handling a request.
///
/// Exceptions propagate outward through the dispatch chain to the nearest
/// exception-handler mapping. [`Exception::ContinueRouting`] is the single
/// exception: it is caught by the router's own dispatch loop and never
/// reaches an exception handler.
#[derive(Debug, Error)]
pub enum Exception {
	/// No route matched the request path.
	#[error("not found")]
	NotFound,

	/// The path matched a route but the request method is not allowed.
	#[error("method not allowed")]
	MethodNotAllowed {
		/// Methods the matched route does accept, for the `Allow` header.
		allowed: Vec<Method>,
	},

	/// The path matched a WebSocket route but the connection did not
	/// request a protocol upgrade.
	#[error("websocket upgrade required")]
	UpgradeRejected,

	/// A permission check denied the request before the handler ran.
	#[error("permission denied: {0}")]
	PermissionDenied(String),

	/// The request was structurally invalid for the matched handler.
	#[error("bad request: {0}")]
	BadRequest(String),

	/// Control-flow signal: the handler declines a structurally matched
	/// route and asks the router to resume matching from the next
	/// candidate. Not an error condition; never mapped to a response by
	/// exception handlers.
	#[error("continue routing")]
	ContinueRouting,

	/// Control-flow signal: a response marked stop-chain is on its way out
	/// and the remaining outer middleware must not observe it. Raised and
	/// consumed inside the dispatch chain, which swaps the captured
	/// response back in at each middleware boundary.
	#[error("middleware chain stopped")]
	ChainStopped,

	/// Any other handler/middleware failure.
	#[error("internal error: {0}")]
	Internal(String),
}

impl Exception {
	/// The HTTP status code this exception surfaces as when no exception
	/// handler intercepts it.
	pub fn status_code(&self) -> StatusCode {
		match self {
			Exception::NotFound => StatusCode::NOT_FOUND,
			Exception::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
			Exception::UpgradeRejected => StatusCode::UPGRADE_REQUIRED,
			Exception::PermissionDenied(_) => StatusCode::FORBIDDEN,
			Exception::BadRequest(_) => StatusCode::BAD_REQUEST,
			// ContinueRouting escaping the router means every candidate
			// declined, which the router reports as a plain 404.
			Exception::ContinueRouting => StatusCode::NOT_FOUND,
			// ChainStopped never leaves a well-formed chain; treat an
			// escape as an internal failure.
			Exception::ChainStopped => StatusCode::INTERNAL_SERVER_ERROR,
			Exception::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Whether this is the continue-routing fallthrough signal.
	pub fn is_continue_routing(&self) -> bool {
		matches!(self, Exception::ContinueRouting)
	}
}

impl From<serde_json::Error> for Exception {
	fn from(err: serde_json::Error) -> Self {
		Exception::Internal(format!("JSON serialization failed: {err}"))
	}
}
