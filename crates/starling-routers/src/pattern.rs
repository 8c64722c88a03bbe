//! Path-template compiler.
//!
//! Turns a template like `/users/{username}` or `/orders/{id:int}` into a
//! [`PathPattern`]: an anchored regex with one named capture group per
//! parameter, the ordered converter list for typed extraction, and the
//! segment list used to rebuild a concrete path during reverse resolution.
//!
//! Compilation is configuration-time and fatal on error; matching and
//! formatting are the dispatch-time and reverse-time halves of the same
//! pattern.

use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::converters::{Converter, ConverterError, ConverterRegistry, PathValue};

/// Reserved parameter name for the implicit catch-all tail on mount
/// prefixes.
const RESIDUAL_PARAM: &str = "path";

/// Configuration-time template errors. These fail route construction and
/// are never produced during dispatch.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PatternError {
	#[error("unknown converter tag `{tag}` in template {template:?}")]
	UnknownConverter { tag: String, template: String },

	#[error("duplicate parameter name `{name}` in template {template:?}")]
	DuplicateParameter { name: String, template: String },

	#[error("invalid template {template:?}: {reason}")]
	InvalidTemplate { template: String, reason: String },
}

/// Formatting failures during reverse resolution.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormatError {
	#[error("missing parameter `{name}`")]
	MissingParameter { name: String },

	#[error(transparent)]
	Validation(#[from] ConverterError),
}

/// Whether a pattern must consume the whole path or only a prefix of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingMode {
	Exact,
	Prefix,
}

/// One piece of the template, kept for reverse formatting.
#[derive(Debug, Clone)]
enum Segment {
	Literal(String),
	Param(String),
}

/// Parameters extracted from a successful match.
#[derive(Debug, Clone, Default)]
pub struct PathParams {
	/// Raw capture text, keyed by parameter name.
	pub raw: HashMap<String, String>,
	/// Converted values, keyed by parameter name.
	pub typed: HashMap<String, PathValue>,
	/// The part of the path below a prefix pattern, leading `/` included.
	/// Always `None` for exact patterns.
	pub residual: Option<String>,
}

impl PathParams {
	/// Merge another set of parameters in, overwriting on collision.
	/// Used when a mount's own parameters meet a nested route's.
	pub fn merge(&mut self, other: PathParams) {
		self.raw.extend(other.raw);
		self.typed.extend(other.typed);
		if other.residual.is_some() {
			self.residual = other.residual;
		}
	}
}

/// A compiled path (or host) template.
#[derive(Clone)]
pub struct PathPattern {
	template: String,
	regex: Regex,
	segments: Vec<Segment>,
	converters: Vec<(String, Arc<dyn Converter>)>,
	mode: MatchingMode,
}

impl std::fmt::Debug for PathPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PathPattern")
			.field("template", &self.template)
			.field("regex", &self.regex.as_str())
			.field("mode", &self.mode)
			.finish()
	}
}

impl PathPattern {
	/// Compile a template into an exact-match pattern.
	///
	/// # Examples
	///
	/// ```
	/// use starling_routers::converters::{ConverterRegistry, PathValue};
	/// use starling_routers::pattern::PathPattern;
	///
	/// let registry = ConverterRegistry::with_builtins();
	/// let pattern = PathPattern::compile("/orders/{id:int}", &registry).unwrap();
	///
	/// let params = pattern.match_path("/orders/42").unwrap();
	/// assert_eq!(params.typed["id"], PathValue::Int(42));
	/// assert!(pattern.match_path("/orders/abc").is_none());
	/// ```
	pub fn compile(template: &str, registry: &ConverterRegistry) -> Result<Self, PatternError> {
		Self::build(template, template, registry, MatchingMode::Exact)
	}

	/// Compile a mount-prefix template. The trailing slash is normalized
	/// away and an implicit `{path:path}` tail captures everything below
	/// the prefix, so `/users` matches `/users/7` with residual `/7` but
	/// not `/users` itself (the slash-redirect pass handles that).
	pub fn compile_prefix(
		template: &str,
		registry: &ConverterRegistry,
	) -> Result<Self, PatternError> {
		let expanded = format!("{}/{{{RESIDUAL_PARAM}:path}}", template.trim_end_matches('/'));
		Self::build(template, &expanded, registry, MatchingMode::Prefix)
	}

	fn build(
		original: &str,
		template: &str,
		registry: &ConverterRegistry,
		mode: MatchingMode,
	) -> Result<Self, PatternError> {
		let mut regex_src = String::from("^");
		let mut segments = Vec::new();
		let mut converters: Vec<(String, Arc<dyn Converter>)> = Vec::new();
		let mut literal = String::new();
		let mut rest = template;

		while let Some(open) = rest.find('{') {
			literal.push_str(&rest[..open]);
			rest = &rest[open + 1..];
			let close = rest
				.find('}')
				.ok_or_else(|| PatternError::InvalidTemplate {
					template: original.to_string(),
					reason: "unbalanced `{`".to_string(),
				})?;
			let token = &rest[..close];
			rest = &rest[close + 1..];

			let (name, tag) = match token.split_once(':') {
				Some((name, tag)) => (name, tag),
				None => (token, "str"),
			};
			if name.is_empty()
				|| !name
					.chars()
					.all(|c| c.is_ascii_alphanumeric() || c == '_')
				|| name.starts_with(|c: char| c.is_ascii_digit())
			{
				return Err(PatternError::InvalidTemplate {
					template: original.to_string(),
					reason: format!("invalid parameter name `{name}`"),
				});
			}
			if converters.iter().any(|(existing, _)| existing == name) {
				return Err(PatternError::DuplicateParameter {
					name: name.to_string(),
					template: original.to_string(),
				});
			}
			let converter = registry
				.get(tag)
				.ok_or_else(|| PatternError::UnknownConverter {
					tag: tag.to_string(),
					template: original.to_string(),
				})?;

			regex_src.push_str(&regex::escape(&literal));
			regex_src.push_str(&format!("(?P<{name}>{})", converter.pattern()));
			if !literal.is_empty() {
				segments.push(Segment::Literal(std::mem::take(&mut literal)));
			}
			segments.push(Segment::Param(name.to_string()));
			converters.push((name.to_string(), converter));
		}
		if rest.contains('}') {
			return Err(PatternError::InvalidTemplate {
				template: original.to_string(),
				reason: "unbalanced `}`".to_string(),
			});
		}
		literal.push_str(rest);
		regex_src.push_str(&regex::escape(&literal));
		if !literal.is_empty() {
			segments.push(Segment::Literal(literal));
		}
		regex_src.push('$');

		let regex = Regex::new(&regex_src).map_err(|e| PatternError::InvalidTemplate {
			template: original.to_string(),
			reason: e.to_string(),
		})?;

		Ok(Self {
			template: original.to_string(),
			regex,
			segments,
			converters,
			mode,
		})
	}

	/// The template this pattern was compiled from, as written.
	pub fn template(&self) -> &str {
		&self.template
	}

	pub fn mode(&self) -> MatchingMode {
		self.mode
	}

	/// Parameter names in template order, implicit tail excluded.
	pub fn param_names(&self) -> impl Iterator<Item = &str> {
		self.converters
			.iter()
			.map(|(name, _)| name.as_str())
			.filter(|name| !(self.mode == MatchingMode::Prefix && *name == RESIDUAL_PARAM))
	}

	/// Match a path (or, for host patterns, a host value).
	///
	/// A structural regex match whose captures fail typed conversion is
	/// reported as no match at all.
	pub fn match_path(&self, path: &str) -> Option<PathParams> {
		let captures = self.regex.captures(path)?;
		let mut params = PathParams::default();
		for (name, converter) in &self.converters {
			let raw = captures.name(name)?.as_str();
			if self.mode == MatchingMode::Prefix && name == RESIDUAL_PARAM {
				params.residual = Some(format!("/{raw}"));
				continue;
			}
			match converter.parse(raw) {
				Ok(value) => {
					params.raw.insert(name.clone(), raw.to_string());
					params.typed.insert(name.clone(), value);
				}
				Err(error) => {
					debug!(template = %self.template, param = %name, %error,
						"capture failed typed conversion; treating as no match");
					return None;
				}
			}
		}
		Some(params)
	}

	/// Substitute parameters back into the template through each
	/// converter's `format`. For prefix patterns this produces the prefix
	/// only, never the implicit tail.
	pub fn format_params(
		&self,
		params: &HashMap<String, PathValue>,
	) -> Result<String, FormatError> {
		let mut out = String::new();
		for segment in &self.segments {
			match segment {
				Segment::Literal(text) => out.push_str(text),
				Segment::Param(name) => {
					if self.mode == MatchingMode::Prefix && name == RESIDUAL_PARAM {
						continue;
					}
					let value = params
						.get(name)
						.ok_or_else(|| FormatError::MissingParameter { name: name.clone() })?;
					let converter = self
						.converters
						.iter()
						.find(|(n, _)| n == name)
						.map(|(_, c)| c)
						.ok_or_else(|| FormatError::MissingParameter { name: name.clone() })?;
					out.push_str(&converter.format(value)?);
				}
			}
		}
		if self.mode == MatchingMode::Prefix {
			// Drop the `/` that introduced the implicit tail.
			if let Some(stripped) = out.strip_suffix('/') {
				out.truncate(stripped.len());
			}
		}
		Ok(out)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn registry() -> ConverterRegistry {
		ConverterRegistry::with_builtins()
	}

	#[test]
	fn test_literal_template() {
		let pattern = PathPattern::compile("/users/me", &registry()).unwrap();
		assert!(pattern.match_path("/users/me").is_some());
		assert!(pattern.match_path("/users/me/").is_none());
		assert!(pattern.match_path("/users/you").is_none());
	}

	#[test]
	fn test_untagged_param_defaults_to_str() {
		let pattern = PathPattern::compile("/users/{username}", &registry()).unwrap();
		let params = pattern.match_path("/users/alice").unwrap();
		assert_eq!(params.raw["username"], "alice");
		assert_eq!(params.typed["username"], PathValue::Str("alice".into()));
		assert!(pattern.match_path("/users/a/b").is_none());
	}

	#[test]
	fn test_typed_parse_failure_is_no_match() {
		let pattern = PathPattern::compile("/orders/{id:int}", &registry()).unwrap();
		assert!(pattern.match_path("/orders/abc").is_none());
		let params = pattern.match_path("/orders/42").unwrap();
		assert_eq!(params.typed["id"], PathValue::Int(42));
	}

	#[test]
	fn test_unknown_converter_fails_compilation() {
		let error = PathPattern::compile("/x/{a:bogus}", &registry()).unwrap_err();
		assert!(matches!(error, PatternError::UnknownConverter { ref tag, .. } if tag == "bogus"));
	}

	#[test]
	fn test_duplicate_parameter_fails_compilation() {
		let error = PathPattern::compile("/x/{a}/{a:int}", &registry()).unwrap_err();
		assert!(matches!(error, PatternError::DuplicateParameter { ref name, .. } if name == "a"));
	}

	#[test]
	fn test_unbalanced_braces_fail_compilation() {
		assert!(PathPattern::compile("/x/{a", &registry()).is_err());
		assert!(PathPattern::compile("/x/a}", &registry()).is_err());
	}

	#[test]
	fn test_round_trip() {
		let pattern = PathPattern::compile("/files/{name}/{size:int}", &registry()).unwrap();
		let mut params = HashMap::new();
		params.insert("name".to_string(), PathValue::Str("report".into()));
		params.insert("size".to_string(), PathValue::Int(1024));
		let path = pattern.format_params(&params).unwrap();
		assert_eq!(path, "/files/report/1024");
		let matched = pattern.match_path(&path).unwrap();
		assert_eq!(matched.typed, params);
	}

	#[test]
	fn test_format_missing_parameter() {
		let pattern = PathPattern::compile("/users/{username}", &registry()).unwrap();
		let error = pattern.format_params(&HashMap::new()).unwrap_err();
		assert!(matches!(error, FormatError::MissingParameter { ref name } if name == "username"));
	}

	#[test]
	fn test_format_rejects_separator_in_str_param() {
		let pattern = PathPattern::compile("/users/{username}", &registry()).unwrap();
		let mut params = HashMap::new();
		params.insert("username".to_string(), PathValue::Str("a/b".into()));
		assert!(matches!(
			pattern.format_params(&params),
			Err(FormatError::Validation(_))
		));
	}

	#[test]
	fn test_prefix_captures_residual() {
		let pattern = PathPattern::compile_prefix("/users", &registry()).unwrap();
		let params = pattern.match_path("/users/7/posts").unwrap();
		assert_eq!(params.residual.as_deref(), Some("/7/posts"));
		assert!(params.raw.is_empty());

		// The bare prefix without a trailing slash does not match; the
		// slash-redirect pass owns that case.
		assert!(pattern.match_path("/users").is_none());
		assert!(pattern.match_path("/usersx").is_none());
		let root = pattern.match_path("/users/").unwrap();
		assert_eq!(root.residual.as_deref(), Some("/"));
	}

	#[test]
	fn test_prefix_with_own_params() {
		let pattern = PathPattern::compile_prefix("/api/{version:int}", &registry()).unwrap();
		let params = pattern.match_path("/api/2/items").unwrap();
		assert_eq!(params.typed["version"], PathValue::Int(2));
		assert_eq!(params.residual.as_deref(), Some("/items"));

		let mut supplied = HashMap::new();
		supplied.insert("version".to_string(), PathValue::Int(2));
		assert_eq!(pattern.format_params(&supplied).unwrap(), "/api/2");
	}

	#[test]
	fn test_host_template() {
		let pattern = PathPattern::compile("{subdomain}.example.com", &registry()).unwrap();
		let params = pattern.match_path("api.example.com").unwrap();
		assert_eq!(params.raw["subdomain"], "api");
		assert!(pattern.match_path("example.com").is_none());
	}

	#[test]
	fn test_param_names_skip_residual_tail() {
		let pattern = PathPattern::compile_prefix("/api/{version:int}", &registry()).unwrap();
		let names: Vec<_> = pattern.param_names().collect();
		assert_eq!(names, vec!["version"]);
	}
}
