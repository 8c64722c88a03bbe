//! The connection-handler contract.
//!
//! Everything that can answer a request satisfies [`Handler`]: leaf
//! endpoints, composed middleware chains, nested routers and mounted
//! foreign sub-applications all look identical behind this trait. The
//! routing core is agnostic of anything beyond it.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::{Request, Response, Result};

/// Core request-handling abstraction.
#[async_trait]
pub trait Handler: Send + Sync {
	async fn handle(&self, request: Request) -> Result<Response>;
}

/// Blanket implementation so `Arc<dyn Handler>` is itself a `Handler`.
#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
	async fn handle(&self, request: Request) -> Result<Response> {
		(**self).handle(request).await
	}
}

/// Adapter turning an async function into a [`Handler`].
///
/// # Examples
///
/// ```
/// use starling_http::{FunctionHandler, Handler, Request, Response};
/// use hyper::Method;
///
/// async fn hello(_req: Request) -> starling_http::Result<Response> {
///     Ok(Response::ok().with_body("hello"))
/// }
///
/// # tokio_test::block_on(async {
/// let handler = FunctionHandler::new(hello);
/// let request = Request::builder().method(Method::GET).uri("/").build().unwrap();
/// let response = handler.handle(request).await.unwrap();
/// assert_eq!(response.body.as_ref(), b"hello");
/// # });
/// ```
pub struct FunctionHandler<F> {
	func: F,
}

impl<F> FunctionHandler<F> {
	pub fn new(func: F) -> Self {
		Self { func }
	}
}

#[async_trait]
impl<F, Fut> Handler for FunctionHandler<F>
where
	F: Fn(Request) -> Fut + Send + Sync,
	Fut: Future<Output = Result<Response>> + Send,
{
	async fn handle(&self, request: Request) -> Result<Response> {
		(self.func)(request).await
	}
}

/// Middleware trait for request/response processing.
///
/// Middleware wraps a downstream handler; it may short-circuit by returning
/// a response without calling `next`, or post-process the response on the
/// way back out.
#[async_trait]
pub trait Middleware: Send + Sync {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response>;

	/// Whether this middleware should run for the given request.
	///
	/// Returning `false` skips this middleware entirely for the request,
	/// passing control straight to the next element of the chain.
	fn should_continue(&self, _request: &Request) -> bool {
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use hyper::Method;

	struct Echo;

	#[async_trait]
	impl Handler for Echo {
		async fn handle(&self, request: Request) -> Result<Response> {
			Ok(Response::ok().with_body(request.path().to_string()))
		}
	}

	#[tokio::test]
	async fn test_arc_handler_blanket_impl() {
		let handler: Arc<dyn Handler> = Arc::new(Echo);
		let request = Request::builder()
			.method(Method::GET)
			.uri("/echo")
			.build()
			.unwrap();
		let response = handler.handle(request).await.unwrap();
		assert_eq!(response.body.as_ref(), b"/echo");
	}

	#[tokio::test]
	async fn test_function_handler() {
		let handler = FunctionHandler::new(|_req| async { Ok(Response::no_content()) });
		let request = Request::builder()
			.method(Method::GET)
			.uri("/")
			.build()
			.unwrap();
		let response = handler.handle(request).await.unwrap();
		assert_eq!(response.status, hyper::StatusCode::NO_CONTENT);
	}
}
