//! Request-line logging.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use starling_http::{Handler, Middleware, Request, Response, Result};

/// Middleware emitting one `tracing` event per request: method, path,
/// response status and elapsed milliseconds. A failed dispatch logs at
/// error level with the exception in place of a status.
///
/// Wrap it around a whole router or a single route; it never alters the
/// request or the response.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use starling_routers::logging::LoggingMiddleware;
/// use starling_http::{FunctionHandler, Handler, Middleware, Request, Response};
/// use hyper::Method;
///
/// # tokio_test::block_on(async {
/// let middleware = LoggingMiddleware::new();
/// let handler: Arc<dyn Handler> =
///     Arc::new(FunctionHandler::new(|_req| async { Ok(Response::ok()) }));
/// let request = Request::builder()
///     .method(Method::GET)
///     .uri("/api/users")
///     .build()
///     .unwrap();
///
/// let response = middleware.process(request, handler).await.unwrap();
/// assert_eq!(response.status, hyper::StatusCode::OK);
/// # });
/// ```
pub struct LoggingMiddleware;

impl LoggingMiddleware {
	pub fn new() -> Self {
		Self
	}
}

impl Default for LoggingMiddleware {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Middleware for LoggingMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let start = Instant::now();
		let method = request.method.to_string();
		let path = request.path().to_string();

		let result = next.handle(request).await;
		let elapsed_ms = start.elapsed().as_millis() as u64;

		match &result {
			Ok(response) => {
				info!(
					%method,
					%path,
					status = response.status.as_u16(),
					elapsed_ms,
					"request completed"
				);
			}
			Err(exception) => {
				error!(%method, %path, %exception, elapsed_ms, "request failed");
			}
		}

		result
	}
}
