//! Type-keyed per-request state bag.
//!
//! The router clones a request once per matching attempt; sharing the bag
//! behind an `Arc` keeps every clone of one connection looking at the same
//! state, which is what middleware that stashes data for handlers expects.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Shared, type-keyed storage attached to every [`Request`](crate::Request).
///
/// Values are keyed by their Rust type; inserting a second value of the same
/// type overwrites the first. Reads hand out clones so no lock is held
/// across handler code.
#[derive(Clone, Default)]
pub struct Extensions {
	map: Arc<Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl Extensions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a value, replacing any previous value of the same type.
	pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
		let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		map.insert(TypeId::of::<T>(), Box::new(value));
	}

	/// Get a cloned value by type.
	///
	/// # Examples
	///
	/// ```
	/// use starling_http::Extensions;
	///
	/// let extensions = Extensions::new();
	/// extensions.insert(42u32);
	/// assert_eq!(extensions.get::<u32>(), Some(42));
	/// assert_eq!(extensions.get::<String>(), None);
	/// ```
	pub fn get<T>(&self) -> Option<T>
	where
		T: Clone + Send + Sync + 'static,
	{
		let map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		map.get(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast_ref::<T>())
			.cloned()
	}

	/// Whether a value of the given type is present.
	pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
		let map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		map.contains_key(&TypeId::of::<T>())
	}

	/// Remove a value by type and return it.
	pub fn remove<T>(&self) -> Option<T>
	where
		T: Send + Sync + 'static,
	{
		let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		let boxed = map.remove(&TypeId::of::<T>())?;
		match boxed.downcast::<T>() {
			Ok(val) => Some(*val),
			Err(boxed) => {
				map.insert(TypeId::of::<T>(), boxed);
				None
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Clone, Debug, PartialEq)]
	struct Token(String);

	#[test]
	fn test_insert_get_remove() {
		let extensions = Extensions::new();
		extensions.insert(Token("abc".into()));

		assert!(extensions.contains::<Token>());
		assert_eq!(extensions.get::<Token>(), Some(Token("abc".into())));
		assert_eq!(extensions.remove::<Token>(), Some(Token("abc".into())));
		assert!(!extensions.contains::<Token>());
	}

	#[test]
	fn test_clones_share_state() {
		let extensions = Extensions::new();
		let cloned = extensions.clone();

		extensions.insert(7u64);
		assert_eq!(cloned.get::<u64>(), Some(7));
	}

	#[test]
	fn test_overwrite_same_type() {
		let extensions = Extensions::new();
		extensions.insert(1u32);
		extensions.insert(2u32);
		assert_eq!(extensions.get::<u32>(), Some(2));
	}
}
