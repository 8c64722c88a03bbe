//! HTTP request representation.
//!
//! A [`Request`] is the metadata record the routing core matches against:
//! method, URI, headers, declared protocol (plain HTTP or WebSocket
//! upgrade), plus the mutable state bag and the path-parameter map routers
//! fill in during matching.

use bytes::Bytes;
use hyper::header::{HOST, UPGRADE};
use hyper::{HeaderMap, Method, Uri, Version};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;

use crate::{Exception, Extensions, Result};

/// HTTP request record passed to every handler.
///
/// # Examples
///
/// ```
/// use starling_http::Request;
/// use hyper::Method;
///
/// let request = Request::builder()
///     .method(Method::GET)
///     .uri("/users/42?page=2")
///     .build()
///     .unwrap();
///
/// assert_eq!(request.path(), "/users/42");
/// assert_eq!(request.query_param("page"), Some("2"));
/// ```
#[derive(Clone)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,
	/// Raw path parameters extracted by the router (e.g. `{id}` -> `"42"`).
	pub path_params: HashMap<String, String>,
	/// Query string parameters parsed from the URI.
	pub query_params: HashMap<String, String>,
	/// Type-keyed per-request state bag, shared across clones.
	pub extensions: Extensions,
	/// Path prefix consumed by enclosing mounts.
	root_path: String,
	/// Residual path a mount delegated to a nested router, when set.
	route_path: Option<String>,
}

impl Request {
	/// Create a request from its parts.
	pub fn new(
		method: Method,
		uri: Uri,
		version: Version,
		headers: HeaderMap,
		body: Bytes,
	) -> Self {
		let query_params = Self::parse_query_params(&uri);
		Self {
			method,
			uri,
			version,
			headers,
			body,
			path_params: HashMap::new(),
			query_params,
			extensions: Extensions::new(),
			root_path: String::new(),
			route_path: None,
		}
	}

	/// Start building a request.
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	/// Parse query parameters from a URI.
	///
	/// Splits on the first `=` only, so `=` inside values survives.
	fn parse_query_params(uri: &Uri) -> HashMap<String, String> {
		uri.query()
			.map(|q| {
				q.split('&')
					.filter_map(|pair| {
						let mut parts = pair.splitn(2, '=');
						Some((
							parts.next()?.to_string(),
							parts.next().unwrap_or("").to_string(),
						))
					})
					.collect()
			})
			.unwrap_or_default()
	}

	/// The request path as sent by the client.
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// The path the current router should match against.
	///
	/// Starts out equal to [`path`](Self::path); a mount that delegates to a
	/// nested router replaces it with the residual suffix below the mount
	/// prefix.
	pub fn routing_path(&self) -> &str {
		self.route_path.as_deref().unwrap_or_else(|| self.uri.path())
	}

	/// The path prefix consumed by enclosing mounts.
	pub fn root_path(&self) -> &str {
		&self.root_path
	}

	/// Replace the path the next router level matches against.
	///
	/// Called by mounts and hosts while descending the route tree; handlers
	/// normally never touch this.
	pub fn set_routing_path(&mut self, path: impl Into<String>) {
		self.route_path = Some(path.into());
	}

	/// Replace the consumed-prefix bookkeeping.
	pub fn set_root_path(&mut self, root_path: impl Into<String>) {
		self.root_path = root_path.into();
	}

	/// The declared host, from the `Host` header or the URI authority.
	pub fn host(&self) -> Option<&str> {
		self.headers
			.get(HOST)
			.and_then(|v| v.to_str().ok())
			.or_else(|| self.uri.host())
	}

	/// Whether the connection asks for a WebSocket protocol upgrade.
	///
	/// # Examples
	///
	/// ```
	/// use starling_http::Request;
	/// use hyper::{HeaderMap, Method};
	///
	/// let mut headers = HeaderMap::new();
	/// headers.insert("upgrade", "websocket".parse().unwrap());
	///
	/// let request = Request::builder()
	///     .method(Method::GET)
	///     .uri("/ws")
	///     .headers(headers)
	///     .build()
	///     .unwrap();
	///
	/// assert!(request.is_websocket_upgrade());
	/// ```
	pub fn is_websocket_upgrade(&self) -> bool {
		self.headers
			.get(UPGRADE)
			.and_then(|v| v.to_str().ok())
			.is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
	}

	/// Set a path parameter (used by routers during matching).
	pub fn set_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.path_params.insert(key.into(), value.into());
	}

	/// Get a raw path parameter by name.
	pub fn path_param(&self, name: &str) -> Option<&str> {
		self.path_params.get(name).map(|v| v.as_str())
	}

	/// Get a query parameter by name.
	pub fn query_param(&self, name: &str) -> Option<&str> {
		self.query_params.get(name).map(|v| v.as_str())
	}

	/// Get URL-decoded query parameters.
	pub fn decoded_query_params(&self) -> HashMap<String, String> {
		self.query_params
			.iter()
			.map(|(k, v)| {
				let key = percent_decode_str(k).decode_utf8_lossy().to_string();
				let value = percent_decode_str(v).decode_utf8_lossy().to_string();
				(key, value)
			})
			.collect()
	}
}

/// Builder for [`Request`].
#[derive(Default)]
pub struct RequestBuilder {
	method: Option<Method>,
	uri: Option<Uri>,
	version: Option<Version>,
	headers: Option<HeaderMap>,
	body: Option<Bytes>,
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = Some(method);
		self
	}

	/// Set the URI. Accepts anything convertible into a [`Uri`]; an invalid
	/// value surfaces as an error from [`build`](Self::build).
	pub fn uri<U>(mut self, uri: U) -> Self
	where
		U: TryInto<Uri>,
	{
		self.uri = uri.try_into().ok();
		self
	}

	pub fn version(mut self, version: Version) -> Self {
		self.version = Some(version);
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = Some(headers);
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = Some(body.into());
		self
	}

	pub fn build(self) -> Result<Request> {
		let uri = self
			.uri
			.ok_or_else(|| Exception::BadRequest("missing or invalid request URI".into()))?;
		Ok(Request::new(
			self.method.unwrap_or(Method::GET),
			uri,
			self.version.unwrap_or(Version::HTTP_11),
			self.headers.unwrap_or_default(),
			self.body.unwrap_or_default(),
		))
	}
}
