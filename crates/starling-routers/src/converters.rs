//! Typed path-parameter converters.
//!
//! A [`Converter`] owns three things: the regex fragment a parameter of its
//! type matches, a `parse` function from the captured text to a typed
//! [`PathValue`], and the inverse `format` used by reverse URL resolution.
//! Converters are looked up by tag (`str`, `int`, `float`, `uuid`,
//! `datetime`, `path`, or any custom tag) in a [`ConverterRegistry`].
//!
//! The registry handed to path compilation is an explicit argument so
//! compilation stays pure; [`register_path_converter`] mutates the
//! process-wide default registry and is a startup-only operation.
//!
//! # Examples
//!
//! ```
//! use starling_routers::converters::{ConverterRegistry, PathValue};
//!
//! let registry = ConverterRegistry::with_builtins();
//! let int = registry.get("int").unwrap();
//!
//! assert_eq!(int.parse("42").unwrap(), PathValue::Int(42));
//! assert_eq!(int.format(&PathValue::Int(42)).unwrap(), "42");
//! ```

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for converter operations.
pub type ConverterResult<T> = std::result::Result<T, ConverterError>;

/// Errors produced while parsing or formatting a path parameter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConverterError {
	/// The captured text is not a valid value for the tag.
	#[error("cannot parse {value:?} as `{tag}`")]
	Parse { tag: &'static str, value: String },

	/// The supplied value cannot be rendered as a path segment of the tag.
	#[error("cannot format {value} as `{tag}`: {reason}")]
	Format {
		tag: &'static str,
		value: String,
		reason: String,
	},
}

/// A typed value extracted from (or substituted into) a path segment.
#[derive(Debug, Clone, PartialEq)]
pub enum PathValue {
	Str(String),
	Int(u64),
	Float(f64),
	Uuid(Uuid),
	DateTime(NaiveDateTime),
}

impl fmt::Display for PathValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PathValue::Str(s) => write!(f, "{s}"),
			PathValue::Int(v) => write!(f, "{v}"),
			PathValue::Float(v) => write!(f, "{v}"),
			PathValue::Uuid(v) => write!(f, "{v}"),
			PathValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S")),
		}
	}
}

impl From<&str> for PathValue {
	fn from(s: &str) -> Self {
		PathValue::Str(s.to_string())
	}
}

impl From<String> for PathValue {
	fn from(s: String) -> Self {
		PathValue::Str(s)
	}
}

impl From<u64> for PathValue {
	fn from(v: u64) -> Self {
		PathValue::Int(v)
	}
}

impl From<u32> for PathValue {
	fn from(v: u32) -> Self {
		PathValue::Int(v as u64)
	}
}

impl From<f64> for PathValue {
	fn from(v: f64) -> Self {
		PathValue::Float(v)
	}
}

impl From<Uuid> for PathValue {
	fn from(v: Uuid) -> Self {
		PathValue::Uuid(v)
	}
}

impl From<NaiveDateTime> for PathValue {
	fn from(v: NaiveDateTime) -> Self {
		PathValue::DateTime(v)
	}
}

/// Bidirectional converter between a path-segment string and a typed value.
///
/// Invariant: `parse(format(v))` returns `v` for every value the converter
/// accepts, and `format` rejects values that would break path structure
/// (empty segments, embedded separators) for its tag.
pub trait Converter: Send + Sync {
	/// Regex fragment a parameter of this type matches. Embedded inside a
	/// named capture group, so it must not contain anchors.
	fn pattern(&self) -> &str;

	/// Parse the captured text into a typed value.
	fn parse(&self, raw: &str) -> ConverterResult<PathValue>;

	/// Render a value as the path-segment text that would parse back to it.
	fn format(&self, value: &PathValue) -> ConverterResult<String>;
}

/// `str` — any non-empty text without a path separator.
pub struct StringConverter;

impl Converter for StringConverter {
	fn pattern(&self) -> &str {
		"[^/]+"
	}

	fn parse(&self, raw: &str) -> ConverterResult<PathValue> {
		Ok(PathValue::Str(raw.to_string()))
	}

	fn format(&self, value: &PathValue) -> ConverterResult<String> {
		let rendered = value.to_string();
		if rendered.is_empty() {
			return Err(ConverterError::Format {
				tag: "str",
				value: rendered,
				reason: "may not be empty".into(),
			});
		}
		if rendered.contains('/') {
			return Err(ConverterError::Format {
				tag: "str",
				value: rendered,
				reason: "may not contain path separators".into(),
			});
		}
		Ok(rendered)
	}
}

/// `path` — any text, path separators included. Used both explicitly and as
/// the implicit catch-all tail on mount prefixes.
pub struct PathConverter;

impl Converter for PathConverter {
	fn pattern(&self) -> &str {
		".*"
	}

	fn parse(&self, raw: &str) -> ConverterResult<PathValue> {
		Ok(PathValue::Str(raw.to_string()))
	}

	fn format(&self, value: &PathValue) -> ConverterResult<String> {
		Ok(value.to_string())
	}
}

/// `int` — non-negative decimal digits.
pub struct IntegerConverter;

impl Converter for IntegerConverter {
	fn pattern(&self) -> &str {
		"[0-9]+"
	}

	fn parse(&self, raw: &str) -> ConverterResult<PathValue> {
		raw.parse::<u64>()
			.map(PathValue::Int)
			.map_err(|_| ConverterError::Parse {
				tag: "int",
				value: raw.to_string(),
			})
	}

	fn format(&self, value: &PathValue) -> ConverterResult<String> {
		match value {
			PathValue::Int(v) => Ok(v.to_string()),
			PathValue::Str(s) => s.parse::<u64>().map(|v| v.to_string()).map_err(|_| {
				ConverterError::Format {
					tag: "int",
					value: s.clone(),
					reason: "not a non-negative integer".into(),
				}
			}),
			other => Err(ConverterError::Format {
				tag: "int",
				value: other.to_string(),
				reason: "expected an integer value".into(),
			}),
		}
	}
}

/// `float` — non-negative finite decimal, canonically re-serialized without
/// trailing zeros (`"7.50"` parses to `7.5` and formats back as `"7.5"`).
pub struct FloatConverter;

impl Converter for FloatConverter {
	fn pattern(&self) -> &str {
		r"[0-9]+(\.[0-9]+)?"
	}

	fn parse(&self, raw: &str) -> ConverterResult<PathValue> {
		let parsed = raw.parse::<f64>().map_err(|_| ConverterError::Parse {
			tag: "float",
			value: raw.to_string(),
		})?;
		if !parsed.is_finite() {
			return Err(ConverterError::Parse {
				tag: "float",
				value: raw.to_string(),
			});
		}
		Ok(PathValue::Float(parsed))
	}

	fn format(&self, value: &PathValue) -> ConverterResult<String> {
		let float = match value {
			PathValue::Float(v) => *v,
			PathValue::Int(v) => *v as f64,
			other => {
				return Err(ConverterError::Format {
					tag: "float",
					value: other.to_string(),
					reason: "expected a float value".into(),
				});
			}
		};
		if !float.is_finite() || float < 0.0 {
			return Err(ConverterError::Format {
				tag: "float",
				value: float.to_string(),
				reason: "must be finite and non-negative".into(),
			});
		}
		Ok(float.to_string())
	}
}

/// `uuid` — canonical 36-character hyphenated form.
pub struct UuidConverter;

impl Converter for UuidConverter {
	fn pattern(&self) -> &str {
		"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
	}

	fn parse(&self, raw: &str) -> ConverterResult<PathValue> {
		Uuid::parse_str(raw)
			.map(PathValue::Uuid)
			.map_err(|_| ConverterError::Parse {
				tag: "uuid",
				value: raw.to_string(),
			})
	}

	fn format(&self, value: &PathValue) -> ConverterResult<String> {
		match value {
			PathValue::Uuid(v) => Ok(v.hyphenated().to_string()),
			PathValue::Str(s) => Uuid::parse_str(s)
				.map(|v| v.hyphenated().to_string())
				.map_err(|_| ConverterError::Format {
					tag: "uuid",
					value: s.clone(),
					reason: "not a valid UUID".into(),
				}),
			other => Err(ConverterError::Format {
				tag: "uuid",
				value: other.to_string(),
				reason: "expected a UUID value".into(),
			}),
		}
	}
}

/// `datetime` — ISO-like `YYYY-MM-DDTHH:MM:SS`.
pub struct DateTimeConverter;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

impl Converter for DateTimeConverter {
	fn pattern(&self) -> &str {
		"[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}"
	}

	fn parse(&self, raw: &str) -> ConverterResult<PathValue> {
		NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
			.map(PathValue::DateTime)
			.map_err(|_| ConverterError::Parse {
				tag: "datetime",
				value: raw.to_string(),
			})
	}

	fn format(&self, value: &PathValue) -> ConverterResult<String> {
		match value {
			PathValue::DateTime(v) => Ok(v.format(DATETIME_FORMAT).to_string()),
			PathValue::Str(s) => NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
				.map(|v| v.format(DATETIME_FORMAT).to_string())
				.map_err(|_| ConverterError::Format {
					tag: "datetime",
					value: s.clone(),
					reason: "not a valid datetime".into(),
				}),
			other => Err(ConverterError::Format {
				tag: "datetime",
				value: other.to_string(),
				reason: "expected a datetime value".into(),
			}),
		}
	}
}

/// Mapping from type tag to converter.
///
/// Registration overwrites; the five built-in tags can be replaced like any
/// custom tag.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
	converters: HashMap<String, Arc<dyn Converter>>,
}

impl ConverterRegistry {
	/// An empty registry with no tags at all.
	pub fn empty() -> Self {
		Self::default()
	}

	/// A registry pre-populated with the built-in tags.
	pub fn with_builtins() -> Self {
		let mut registry = Self::empty();
		registry.register("str", Arc::new(StringConverter));
		registry.register("path", Arc::new(PathConverter));
		registry.register("int", Arc::new(IntegerConverter));
		registry.register("float", Arc::new(FloatConverter));
		registry.register("uuid", Arc::new(UuidConverter));
		registry.register("datetime", Arc::new(DateTimeConverter));
		registry
	}

	/// Insert or overwrite a converter under a tag.
	pub fn register(&mut self, tag: impl Into<String>, converter: Arc<dyn Converter>) {
		self.converters.insert(tag.into(), converter);
	}

	/// Look up a converter by tag.
	pub fn get(&self, tag: &str) -> Option<Arc<dyn Converter>> {
		self.converters.get(tag).cloned()
	}

	pub fn contains(&self, tag: &str) -> bool {
		self.converters.contains_key(tag)
	}
}

/// Process-wide default registry, consulted when a route is built without
/// an explicit registry. Written only during startup/configuration.
static DEFAULT_REGISTRY: Lazy<RwLock<ConverterRegistry>> =
	Lazy::new(|| RwLock::new(ConverterRegistry::with_builtins()));

/// Register a custom converter under a tag in the default registry.
///
/// This is a startup-only operation: routes compiled afterwards see the new
/// tag, routes compiled before keep the converters they resolved.
pub fn register_path_converter(tag: impl Into<String>, converter: Arc<dyn Converter>) {
	DEFAULT_REGISTRY.write().register(tag, converter);
}

/// Snapshot of the current default registry.
pub fn default_registry() -> ConverterRegistry {
	DEFAULT_REGISTRY.read().clone()
}
