//! # Starling HTTP
//!
//! Request/response types and the connection-handler contract for the
//! starling routing core.
//!
//! This crate defines the seam everything else plugs into: a [`Request`]
//! metadata record (method, URI, headers, declared protocol, state bag), a
//! [`Response`], and the [`Handler`]/[`Middleware`] traits that endpoints,
//! middleware chains, nested routers and mounted sub-applications all
//! satisfy. Dispatch-time failures travel as [`Exception`] values through
//! the shared [`Result`] alias.

pub mod exception;
pub mod extensions;
pub mod handler;
pub mod request;
pub mod response;

pub use exception::{Exception, Result};
pub use extensions::Extensions;
pub use handler::{FunctionHandler, Handler, Middleware};
pub use request::{Request, RequestBuilder};
pub use response::Response;
