//! Reactive objects and lists.
//!
//! A [`ReactiveObject`] is a map of named fields. Reading a field while an observer is
//! rendering records the edge `(object, field) → observer`; writing the field enqueues
//! every recorded observer. Nested JSON objects and arrays are kept plain until first
//! read, at which point they are wrapped in place so deep mutation is tracked too.
//!
//! ```ignore
//! use reinhardt_reactive::make_reactive;
//!
//! let state = make_reactive(serde_json::json!({ "user": { "name": "Ada" }, "tags": [] }))?;
//! let user = state.get("user");                 // wraps `user` on first access
//! user.as_object().unwrap().set("name", "Grace"); // notifies readers of `user.name`
//! state.get("tags").as_list().unwrap().push("admin");
//! ```

use core::cell::RefCell;
use core::fmt;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;

use crate::error::ReactiveError;
use crate::runtime::{ALL_KEYS, NodeId, SourceKey, try_with_runtime, with_runtime};
use crate::value::Value;

/// Storage for one field or list item.
enum Slot {
	/// Wrapped value
	Ready(Value),
	/// Plain JSON not yet accessed
	Plain(serde_json::Value),
}

impl Slot {
	/// Returns the wrapped value, wrapping plain JSON in place on first access.
	fn resolve(&mut self) -> Value {
		if let Slot::Plain(json) = self {
			let value = Value::from_json(core::mem::take(json));
			*self = Slot::Ready(value);
		}
		match self {
			Slot::Ready(value) => value.clone(),
			Slot::Plain(_) => unreachable!("slot resolved above"),
		}
	}

	fn peek_json(&self) -> serde_json::Value {
		match self {
			Slot::Ready(value) => value.to_json(),
			Slot::Plain(json) => json.clone(),
		}
	}

	/// Whether storing `next` here would be observable.
	fn differs_from(&self, next: &Value) -> bool {
		match self {
			Slot::Ready(value) => value != next,
			Slot::Plain(json) if !json.is_object() && !json.is_array() => {
				Value::from_json(json.clone()) != *next
			}
			Slot::Plain(_) => true,
		}
	}
}

fn track(node: NodeId, key: &str) {
	with_runtime(|rt| {
		if rt.current_observer().is_some() {
			rt.track(SourceKey::new(node, key));
		}
	});
}

fn notify(node: NodeId, key: &str) {
	with_runtime(|rt| rt.notify(&SourceKey::new(node, key)));
}

struct ObjectInner {
	id: NodeId,
	fields: RefCell<BTreeMap<String, Slot>>,
}

impl Drop for ObjectInner {
	fn drop(&mut self) {
		let _ = try_with_runtime(|rt| rt.remove_node(self.id));
	}
}

/// A reactive map of named fields.
///
/// Cloning is cheap and shares the underlying fields.
#[derive(Clone)]
pub struct ReactiveObject {
	inner: Rc<ObjectInner>,
}

impl ReactiveObject {
	/// Creates an empty object.
	pub fn new() -> Self {
		Self::from_map(serde_json::Map::new())
	}

	/// Wraps a JSON object. Fails for any other JSON type.
	pub fn from_json(json: serde_json::Value) -> Result<Self, ReactiveError> {
		match json {
			serde_json::Value::Object(map) => Ok(Self::from_map(map)),
			other => Err(ReactiveError::NotAnObject(json_type(&other))),
		}
	}

	pub(crate) fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Self {
		let fields = map
			.into_iter()
			.map(|(key, json)| (key, Slot::Plain(json)))
			.collect();
		Self {
			inner: Rc::new(ObjectInner {
				id: NodeId::new(),
				fields: RefCell::new(fields),
			}),
		}
	}

	/// The node id used for dependency tracking.
	pub fn id(&self) -> NodeId {
		self.inner.id
	}

	/// Returns true if both handles share the same fields.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// Reads a field, recording a dependency when an observer is rendering.
	///
	/// Missing fields read as `Null` (and are still tracked, so adding them later
	/// re-renders the reader).
	pub fn get(&self, key: &str) -> Value {
		track(self.inner.id, key);
		self.get_untracked(key)
	}

	/// Reads a field without recording a dependency.
	pub fn get_untracked(&self, key: &str) -> Value {
		self.inner
			.fields
			.borrow_mut()
			.get_mut(key)
			.map(Slot::resolve)
			.unwrap_or(Value::Null)
	}

	/// Reads a field and deserializes it.
	pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, ReactiveError> {
		self.get(key).deserialize()
	}

	/// Writes a field, enqueueing every observer that read it.
	///
	/// Writing an equal scalar, or the same collection reference, is not a change.
	pub fn set(&self, key: &str, value: impl Into<Value>) {
		let value = value.into();
		let added = {
			let mut fields = self.inner.fields.borrow_mut();
			match fields.get_mut(key) {
				Some(slot) if !slot.differs_from(&value) => return,
				Some(slot) => {
					*slot = Slot::Ready(value);
					false
				}
				None => {
					fields.insert(key.to_string(), Slot::Ready(value));
					true
				}
			}
		};
		notify(self.inner.id, key);
		if added {
			notify(self.inner.id, ALL_KEYS);
		}
	}

	/// Reads, transforms and writes a field.
	pub fn update(&self, key: &str, f: impl FnOnce(Value) -> Value) {
		let next = f(self.get_untracked(key));
		self.set(key, next);
	}

	/// Removes a field, returning its value.
	pub fn remove(&self, key: &str) -> Option<Value> {
		let removed = self.inner.fields.borrow_mut().remove(key);
		removed.map(|mut slot| {
			notify(self.inner.id, key);
			notify(self.inner.id, ALL_KEYS);
			slot.resolve()
		})
	}

	/// Returns true if the field exists (tracks the key set).
	pub fn contains_key(&self, key: &str) -> bool {
		track(self.inner.id, ALL_KEYS);
		self.inner.fields.borrow().contains_key(key)
	}

	/// Field names in order (tracks the key set).
	pub fn keys(&self) -> Vec<String> {
		track(self.inner.id, ALL_KEYS);
		self.inner.fields.borrow().keys().cloned().collect()
	}

	/// Number of fields (tracks the key set).
	pub fn len(&self) -> usize {
		track(self.inner.id, ALL_KEYS);
		self.inner.fields.borrow().len()
	}

	/// Returns true if there are no fields (tracks the key set).
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Deep snapshot as JSON. Every field read is tracked.
	pub fn to_json(&self) -> serde_json::Value {
		let keys = self.keys();
		let map = keys
			.into_iter()
			.map(|key| {
				let value = self.get(&key).to_json();
				(key, value)
			})
			.collect();
		serde_json::Value::Object(map)
	}

	/// Shallow snapshot without tracking.
	pub fn to_json_untracked(&self) -> serde_json::Value {
		let fields = self.inner.fields.borrow();
		serde_json::Value::Object(
			fields
				.iter()
				.map(|(key, slot)| (key.clone(), slot.peek_json()))
				.collect(),
		)
	}
}

impl Default for ReactiveObject {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for ReactiveObject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReactiveObject")
			.field("id", &self.inner.id)
			.field("keys", &self.inner.fields.borrow().keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Wraps a plain JSON object in a [`ReactiveObject`].
pub fn make_reactive(json: serde_json::Value) -> Result<ReactiveObject, ReactiveError> {
	ReactiveObject::from_json(json)
}

struct ListInner {
	id: NodeId,
	items: RefCell<Vec<Slot>>,
}

impl Drop for ListInner {
	fn drop(&mut self) {
		let _ = try_with_runtime(|rt| rt.remove_node(self.id));
	}
}

/// A reactive ordered collection.
///
/// Any read (length, item, iteration) tracks the list as a whole, and any mutation
/// notifies every reader.
#[derive(Clone)]
pub struct ReactiveList {
	inner: Rc<ListInner>,
}

impl ReactiveList {
	/// Creates an empty list.
	pub fn new() -> Self {
		Self::from_items(Vec::new())
	}

	/// Wraps a JSON array. Fails for any other JSON type.
	pub fn from_json(json: serde_json::Value) -> Result<Self, ReactiveError> {
		match json {
			serde_json::Value::Array(items) => Ok(Self::from_items(items)),
			other => Err(ReactiveError::NotAnArray(json_type(&other))),
		}
	}

	pub(crate) fn from_items(items: Vec<serde_json::Value>) -> Self {
		Self {
			inner: Rc::new(ListInner {
				id: NodeId::new(),
				items: RefCell::new(items.into_iter().map(Slot::Plain).collect()),
			}),
		}
	}

	/// Builds a list from values.
	pub fn from_values(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
		let list = Self::new();
		list.inner
			.items
			.borrow_mut()
			.extend(values.into_iter().map(|v| Slot::Ready(v.into())));
		list
	}

	/// The node id used for dependency tracking.
	pub fn id(&self) -> NodeId {
		self.inner.id
	}

	/// Returns true if both handles share the same items.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	fn track(&self) {
		track(self.inner.id, ALL_KEYS);
	}

	fn notify(&self) {
		notify(self.inner.id, ALL_KEYS);
	}

	/// Number of items.
	pub fn len(&self) -> usize {
		self.track();
		self.inner.items.borrow().len()
	}

	/// Returns true if the list is empty.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns the item at `index`.
	pub fn get(&self, index: usize) -> Option<Value> {
		self.track();
		self.inner
			.items
			.borrow_mut()
			.get_mut(index)
			.map(Slot::resolve)
	}

	/// Snapshot of every item, wrapping nested collections.
	pub fn to_vec(&self) -> Vec<Value> {
		self.track();
		self.inner
			.items
			.borrow_mut()
			.iter_mut()
			.map(Slot::resolve)
			.collect()
	}

	/// Iterates over a snapshot of the items.
	pub fn iter(&self) -> impl Iterator<Item = Value> + use<> {
		self.to_vec().into_iter()
	}

	/// Appends an item.
	pub fn push(&self, value: impl Into<Value>) {
		self.inner.items.borrow_mut().push(Slot::Ready(value.into()));
		self.notify();
	}

	/// Removes the last item.
	pub fn pop(&self) -> Option<Value> {
		let popped = self.inner.items.borrow_mut().pop();
		popped.map(|mut slot| {
			self.notify();
			slot.resolve()
		})
	}

	/// Inserts an item at `index` (clamped to the length).
	pub fn insert(&self, index: usize, value: impl Into<Value>) {
		{
			let mut items = self.inner.items.borrow_mut();
			let index = index.min(items.len());
			items.insert(index, Slot::Ready(value.into()));
		}
		self.notify();
	}

	/// Removes the item at `index`.
	pub fn remove(&self, index: usize) -> Option<Value> {
		let removed = {
			let mut items = self.inner.items.borrow_mut();
			(index < items.len()).then(|| items.remove(index))
		};
		removed.map(|mut slot| {
			self.notify();
			slot.resolve()
		})
	}

	/// Replaces the item at `index`. Returns false when out of bounds.
	pub fn set(&self, index: usize, value: impl Into<Value>) -> bool {
		let value = value.into();
		{
			let mut items = self.inner.items.borrow_mut();
			match items.get_mut(index) {
				Some(slot) if !slot.differs_from(&value) => return true,
				Some(slot) => *slot = Slot::Ready(value),
				None => return false,
			}
		}
		self.notify();
		true
	}

	/// Keeps only the items for which `keep` returns true.
	pub fn retain(&self, mut keep: impl FnMut(&Value) -> bool) {
		let changed = {
			let mut items = self.inner.items.borrow_mut();
			let before = items.len();
			items.retain_mut(|slot| keep(&slot.resolve()));
			items.len() != before
		};
		if changed {
			self.notify();
		}
	}

	/// Removes every item.
	pub fn clear(&self) {
		let had_items = {
			let mut items = self.inner.items.borrow_mut();
			let had = !items.is_empty();
			items.clear();
			had
		};
		if had_items {
			self.notify();
		}
	}

	/// Deep snapshot as JSON (tracked).
	pub fn to_json(&self) -> serde_json::Value {
		serde_json::Value::Array(self.to_vec().iter().map(Value::to_json).collect())
	}
}

impl Default for ReactiveList {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for ReactiveList {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReactiveList")
			.field("id", &self.inner.id)
			.field("len", &self.inner.items.borrow().len())
			.finish()
	}
}

fn json_type(json: &serde_json::Value) -> &'static str {
	match json {
		serde_json::Value::Null => "null",
		serde_json::Value::Bool(_) => "bool",
		serde_json::Value::Number(_) => "number",
		serde_json::Value::String(_) => "string",
		serde_json::Value::Array(_) => "array",
		serde_json::Value::Object(_) => "object",
	}
}
