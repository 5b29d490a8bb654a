//! Store - shared reactive state
//!
//! A store is a reactive object with no owning component, plus a set of named mutator
//! functions. It is constructed once and shared by reference; every component reading
//! one of its fields while rendering re-renders when a mutator writes that field,
//! regardless of where the component sits in the tree.
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_reactive::Store;
//!
//! let cart = Store::builder("cart", serde_json::json!({ "items": [], "total": 0 }))
//!     .mutator("add", |state, item| {
//!         state.get("items").as_list().unwrap().push(item);
//!     })
//!     .build()?;
//!
//! cart.commit("add", "lamp")?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{ReactiveError, Result};
use crate::object::ReactiveObject;
use crate::value::Value;

/// A store mutator: receives the store state and a payload.
pub type Mutator = Rc<dyn Fn(&ReactiveObject, Value)>;

struct StoreInner {
	name: String,
	state: ReactiveObject,
	initial: serde_json::Value,
	mutators: BTreeMap<String, Mutator>,
}

/// Shared reactive state with named mutators.
///
/// Cloning is cheap; all clones refer to the same store.
#[derive(Clone)]
pub struct Store {
	inner: Rc<StoreInner>,
}

impl Store {
	/// Starts building a store from its initial state.
	pub fn builder(name: impl Into<String>, initial: serde_json::Value) -> StoreBuilder {
		StoreBuilder {
			name: name.into(),
			initial,
			mutators: BTreeMap::new(),
		}
	}

	/// Store name.
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// The reactive state. Reads are tracked like component state.
	pub fn state(&self) -> &ReactiveObject {
		&self.inner.state
	}

	/// Runs the mutator `name` with `payload`.
	pub fn commit(&self, name: &str, payload: impl Into<Value>) -> Result<()> {
		let mutator = self.inner.mutators.get(name).cloned().ok_or_else(|| {
			ReactiveError::UnknownMutator {
				store: self.inner.name.clone(),
				name: name.to_string(),
			}
		})?;
		tracing::trace!(store = %self.inner.name, mutator = name, "store commit");
		mutator(&self.inner.state, payload.into());
		Ok(())
	}

	/// Names of the available mutators.
	pub fn mutators(&self) -> impl Iterator<Item = &str> {
		self.inner.mutators.keys().map(String::as_str)
	}

	/// Returns true if both handles refer to the same store.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// Restores the initial state.
	///
	/// Fields are written one by one, so dependents re-render as for any other write.
	/// Fields that did not exist initially are removed.
	pub fn reset(&self) {
		let state = &self.inner.state;
		let initial = match &self.inner.initial {
			serde_json::Value::Object(map) => map.clone(),
			_ => serde_json::Map::new(),
		};
		for key in state.keys() {
			if !initial.contains_key(&key) {
				state.remove(&key);
			}
		}
		for (key, json) in initial {
			state.set(&key, Value::from_json(json));
		}
	}
}

impl fmt::Debug for Store {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Store")
			.field("name", &self.inner.name)
			.field("mutators", &self.inner.mutators.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Builder for [`Store`].
pub struct StoreBuilder {
	name: String,
	initial: serde_json::Value,
	mutators: BTreeMap<String, Mutator>,
}

impl StoreBuilder {
	/// Adds a named mutator.
	pub fn mutator<F>(mut self, name: impl Into<String>, f: F) -> Self
	where
		F: Fn(&ReactiveObject, Value) + 'static,
	{
		self.mutators.insert(name.into(), Rc::new(f));
		self
	}

	/// Builds the store. The initial state must be a JSON object.
	pub fn build(self) -> Result<Store> {
		let state = ReactiveObject::from_json(self.initial.clone())?;
		Ok(Store {
			inner: Rc::new(StoreInner {
				name: self.name,
				state,
				initial: self.initial,
				mutators: self.mutators,
			}),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn cart() -> Store {
		Store::builder("cart", json!({ "items": [], "total": 0 }))
			.mutator("add", |state, item| {
				let price = item.as_object().map(|o| o.get("price")).unwrap_or_default();
				state.get("items").as_list().unwrap().push(item);
				state.update("total", |total| {
					Value::from(total.as_i64().unwrap_or(0) + price.as_i64().unwrap_or(0))
				});
			})
			.build()
			.unwrap()
	}

	#[rstest]
	fn test_commit_runs_mutator(cart: Store) {
		cart.commit("add", json!({ "id": 1, "price": 30 })).unwrap();
		cart.commit("add", json!({ "id": 2, "price": 12 })).unwrap();

		assert_eq!(cart.state().get("total"), Value::Int(42));
		assert_eq!(cart.state().get("items").as_list().unwrap().len(), 2);
	}

	#[rstest]
	fn test_unknown_mutator(cart: Store) {
		let err = cart.commit("remove", Value::Null).unwrap_err();
		assert_eq!(err.to_string(), "Store `cart` has no mutator named `remove`");
	}

	#[rstest]
	fn test_reset_restores_initial_state(cart: Store) {
		cart.commit("add", json!({ "id": 1, "price": 5 })).unwrap();
		cart.state().set("coupon", "SAVE");

		cart.reset();

		assert_eq!(cart.state().get("total"), Value::Int(0));
		assert!(cart.state().get("items").as_list().unwrap().is_empty());
		assert!(!cart.state().contains_key("coupon"));
	}

	#[rstest]
	fn test_build_rejects_non_object() {
		assert!(Store::builder("bad", json!(1)).build().is_err());
	}

	#[rstest]
	fn test_clones_share_state(cart: Store) {
		let other = cart.clone();
		other.state().set("total", 7);
		assert!(cart.ptr_eq(&other));
		assert_eq!(cart.state().get("total"), Value::Int(7));
	}
}
