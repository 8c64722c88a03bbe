//! HTTP response representation.

use bytes::Bytes;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE, LOCATION, UPGRADE};
use hyper::{HeaderMap, Method, StatusCode};
use serde::Serialize;

/// HTTP response produced by handlers and by the router itself
/// (404/405/redirect outcomes are ordinary responses, not errors).
#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
	/// When true, no further middleware in the chain processes this
	/// response.
	stop_chain: bool,
}

impl Response {
	/// Create a response with the given status code.
	///
	/// # Examples
	///
	/// ```
	/// use starling_http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::new(StatusCode::OK);
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
			stop_chain: false,
		}
	}

	/// HTTP 200 OK.
	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	/// HTTP 201 Created.
	pub fn created() -> Self {
		Self::new(StatusCode::CREATED)
	}

	/// HTTP 204 No Content.
	pub fn no_content() -> Self {
		Self::new(StatusCode::NO_CONTENT)
	}

	/// HTTP 400 Bad Request.
	pub fn bad_request() -> Self {
		Self::new(StatusCode::BAD_REQUEST)
	}

	/// HTTP 401 Unauthorized.
	pub fn unauthorized() -> Self {
		Self::new(StatusCode::UNAUTHORIZED)
	}

	/// HTTP 403 Forbidden.
	pub fn forbidden() -> Self {
		Self::new(StatusCode::FORBIDDEN)
	}

	/// HTTP 404 Not Found.
	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	/// HTTP 500 Internal Server Error.
	pub fn internal_server_error() -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR)
	}

	/// HTTP 405 with an `Allow` header listing the permitted methods.
	///
	/// # Examples
	///
	/// ```
	/// use starling_http::Response;
	/// use hyper::{Method, StatusCode};
	///
	/// let response = Response::method_not_allowed(&[Method::GET, Method::POST]);
	/// assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
	/// assert_eq!(response.headers["allow"], "GET, POST");
	/// ```
	pub fn method_not_allowed(allowed: &[Method]) -> Self {
		let mut response = Self::new(StatusCode::METHOD_NOT_ALLOWED);
		let allow = allowed
			.iter()
			.map(|m| m.as_str())
			.collect::<Vec<_>>()
			.join(", ");
		if let Ok(value) = allow.parse() {
			response.headers.insert(ALLOW, value);
		}
		response
	}

	/// HTTP 426 for a WebSocket route hit without a protocol upgrade.
	pub fn upgrade_required() -> Self {
		let mut response = Self::new(StatusCode::UPGRADE_REQUIRED);
		response
			.headers
			.insert(UPGRADE, HeaderValue::from_static("websocket"));
		response
	}

	/// HTTP 307, preserving the request method across the redirect.
	pub fn temporary_redirect(location: &str) -> Self {
		Self::redirect(StatusCode::TEMPORARY_REDIRECT, location)
	}

	/// HTTP 308.
	pub fn permanent_redirect(location: &str) -> Self {
		Self::redirect(StatusCode::PERMANENT_REDIRECT, location)
	}

	fn redirect(status: StatusCode, location: &str) -> Self {
		let mut response = Self::new(status);
		if let Ok(value) = location.parse() {
			response.headers.insert(LOCATION, value);
		}
		response
	}

	/// Set the response body.
	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Serialize a value as the JSON body and set the content type.
	pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
		self.body = Bytes::from(serde_json::to_vec(value)?);
		self.headers
			.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		Ok(self)
	}

	/// Insert a header, replacing any existing value.
	pub fn with_header(mut self, name: hyper::header::HeaderName, value: &str) -> Self {
		if let Ok(value) = value.parse() {
			self.headers.insert(name, value);
		}
		self
	}

	/// Mark whether the middleware chain should stop processing.
	///
	/// The dispatch chain returns a stopped response to the client as
	/// produced: remaining outer middleware never observe it.
	pub fn with_stop_chain(mut self, stop: bool) -> Self {
		self.stop_chain = stop;
		self
	}

	/// Whether the middleware chain should stop processing.
	pub fn should_stop_chain(&self) -> bool {
		self.stop_chain
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_redirect_sets_location() {
		let response = Response::temporary_redirect("/users/");
		assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
		assert_eq!(response.headers[LOCATION], "/users/");
	}

	#[test]
	fn test_upgrade_required_advertises_websocket() {
		let response = Response::upgrade_required();
		assert_eq!(response.status, StatusCode::UPGRADE_REQUIRED);
		assert_eq!(response.headers[UPGRADE], "websocket");
	}

	#[test]
	fn test_with_json() {
		let response = Response::ok()
			.with_json(&serde_json::json!({"ok": true}))
			.unwrap();
		assert_eq!(response.headers[CONTENT_TYPE], "application/json");
		assert_eq!(response.body.as_ref(), br#"{"ok":true}"#);
	}

	#[test]
	fn test_stop_chain_flag() {
		assert!(!Response::ok().should_stop_chain());
		assert!(Response::unauthorized().with_stop_chain(true).should_stop_chain());
	}
}
