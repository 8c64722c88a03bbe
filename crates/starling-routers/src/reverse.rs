//! Reverse URL resolution.
//!
//! Walks the route tree by symbolic name and reconstructs a concrete path
//! from supplied parameters. Names are colon-qualified across nesting:
//! `"customers:get"` names the route `get` inside the mount `customers`.
//! An unnamed mount or host is transparent — children are reachable under
//! their own names, prefix still applied.
//!
//! A leaf resolves only when the supplied parameters cover its template
//! exactly (no missing, no extra, enclosing prefixes' parameters already
//! consumed); anything else makes that candidate fail silently and the
//! scan move on, so the only surfaced error is [`ReverseError::NoMatchFound`].

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::converters::PathValue;
use crate::route::{Host, Mount, RouteNode};

/// Reverse-resolution failure, carrying the attempted name and the
/// supplied parameter keys.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReverseError {
	#[error("no route found for name {name:?} with params [{}]", .params.join(", "))]
	NoMatchFound { name: String, params: Vec<String> },

	#[error("base URL {base:?} has no scheme to absolutize a host-qualified path")]
	InvalidBase { base: String },
}

/// Named parameters for reverse resolution.
///
/// # Examples
///
/// ```
/// use starling_routers::reverse::UrlParams;
///
/// let params = UrlParams::new().set("username", "ada").set("page", 2u64);
/// assert_eq!(params.keys().count(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct UrlParams(HashMap<String, PathValue>);

impl UrlParams {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style insert.
	pub fn set(mut self, name: impl Into<String>, value: impl Into<PathValue>) -> Self {
		self.0.insert(name.into(), value.into());
		self
	}

	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PathValue>) {
		self.0.insert(name.into(), value.into());
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.0.keys().map(|k| k.as_str())
	}

	pub fn as_map(&self) -> &HashMap<String, PathValue> {
		&self.0
	}
}

/// Resolve a qualified name against an ordered route list; the first node
/// that resolves wins.
pub fn resolve(
	routes: &[RouteNode],
	name: &str,
	params: &UrlParams,
) -> Result<String, ReverseError> {
	for node in routes {
		if let Some(path) = resolve_node(node, name, params.as_map()) {
			return Ok(path);
		}
	}
	let mut keys: Vec<String> = params.keys().map(String::from).collect();
	keys.sort();
	Err(ReverseError::NoMatchFound {
		name: name.to_string(),
		params: keys,
	})
}

/// Join a resolved path onto a base URL. Host-qualified results
/// (`//host/path`) take only the scheme from the base.
pub fn absolute(base: &str, path: String) -> Result<String, ReverseError> {
	if let Some(rest) = path.strip_prefix("//") {
		let scheme = base
			.split_once("://")
			.map(|(scheme, _)| scheme)
			.filter(|scheme| !scheme.is_empty())
			.ok_or_else(|| ReverseError::InvalidBase {
				base: base.to_string(),
			})?;
		Ok(format!("{scheme}://{rest}"))
	} else {
		Ok(format!("{}{}", base.trim_end_matches('/'), path))
	}
}

fn resolve_node(
	node: &RouteNode,
	name: &str,
	params: &HashMap<String, PathValue>,
) -> Option<String> {
	match node {
		RouteNode::Http(route) => {
			resolve_leaf(route.name(), route.pattern(), name, params)
		}
		RouteNode::WebSocket(route) => {
			resolve_leaf(route.name(), route.pattern(), name, params)
		}
		RouteNode::Mount(mount) => resolve_mount(mount, name, params),
		RouteNode::Host(host) => resolve_host(host, name, params),
	}
}

fn resolve_leaf(
	node_name: Option<&str>,
	pattern: &crate::pattern::PathPattern,
	name: &str,
	params: &HashMap<String, PathValue>,
) -> Option<String> {
	if node_name != Some(name) {
		return None;
	}
	let expected: BTreeSet<&str> = pattern.param_names().collect();
	let supplied: BTreeSet<&str> = params.keys().map(|k| k.as_str()).collect();
	if expected != supplied {
		return None;
	}
	pattern.format_params(params).ok()
}

fn resolve_mount(
	mount: &Mount,
	name: &str,
	params: &HashMap<String, PathValue>,
) -> Option<String> {
	// The mount itself, named directly: resolve to the bare prefix.
	if mount.name() == Some(name) {
		let expected: BTreeSet<&str> = mount.pattern().param_names().collect();
		let supplied: BTreeSet<&str> = params.keys().map(|k| k.as_str()).collect();
		if expected != supplied {
			return None;
		}
		return mount.pattern().format_params(params).ok();
	}

	let remainder = match mount.name() {
		Some(own) => name.strip_prefix(own)?.strip_prefix(':')?,
		None => name,
	};
	let router = mount.router()?;
	let prefix = mount.pattern().format_params(params).ok()?;
	let leftover = without_keys(params, mount.pattern().param_names());
	for child in router.routes() {
		if let Some(suffix) = resolve_node(child, remainder, &leftover) {
			return Some(format!("{prefix}{suffix}"));
		}
	}
	None
}

fn resolve_host(host: &Host, name: &str, params: &HashMap<String, PathValue>) -> Option<String> {
	let remainder = match host.name() {
		Some(own) if own == name => {
			// The host node named directly resolves to its authority.
			let expected: BTreeSet<&str> = host.pattern().param_names().collect();
			let supplied: BTreeSet<&str> = params.keys().map(|k| k.as_str()).collect();
			if expected != supplied {
				return None;
			}
			let authority = host.pattern().format_params(params).ok()?;
			return Some(format!("//{authority}"));
		}
		Some(own) => name.strip_prefix(own)?.strip_prefix(':')?,
		None => name,
	};
	let authority = host.pattern().format_params(params).ok()?;
	let leftover = without_keys(params, host.pattern().param_names());
	for child in host.router().routes() {
		if let Some(suffix) = resolve_node(child, remainder, &leftover) {
			return Some(format!("//{authority}{suffix}"));
		}
	}
	None
}

fn without_keys<'a>(
	params: &HashMap<String, PathValue>,
	consumed: impl Iterator<Item = &'a str>,
) -> HashMap<String, PathValue> {
	let consumed: BTreeSet<&str> = consumed.collect();
	params
		.iter()
		.filter(|(key, _)| !consumed.contains(key.as_str()))
		.map(|(key, value)| (key.clone(), value.clone()))
		.collect()
}
