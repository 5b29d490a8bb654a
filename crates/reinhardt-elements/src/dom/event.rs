//! Events dispatched through the document.

use std::cell::{Cell, RefCell};

use reinhardt_reactive::Value;

use super::NodeId;

/// An event travelling through the document.
///
/// Native events (created with [`Event::native`]) bubble and cross shadow boundaries.
/// Custom events are created with [`Event::custom`] and do neither unless asked to.
#[derive(Debug)]
pub struct Event {
	name: String,
	detail: Value,
	property: Option<String>,
	bubbles: bool,
	composed: bool,
	native: bool,
	target: Cell<Option<NodeId>>,
	current_target: Cell<Option<NodeId>>,
	target_value: RefCell<Value>,
	propagation_stopped: Cell<bool>,
	default_prevented: Cell<bool>,
}

impl Event {
	fn build(name: impl Into<String>, detail: Value, native: bool) -> Self {
		Self {
			name: name.into(),
			detail,
			property: None,
			bubbles: native,
			composed: native,
			native,
			target: Cell::new(None),
			current_target: Cell::new(None),
			target_value: RefCell::new(Value::Null),
			propagation_stopped: Cell::new(false),
			default_prevented: Cell::new(false),
		}
	}

	/// A user-agent event such as `click`, `input` or `change`.
	pub fn native(name: impl Into<String>) -> Self {
		Self::build(name, Value::Null, true)
	}

	/// A custom event carrying `detail`. Does not bubble by default.
	pub fn custom(name: impl Into<String>, detail: impl Into<Value>) -> Self {
		Self::build(name, detail.into(), false)
	}

	/// Sets whether the event bubbles.
	pub fn bubbles(mut self, bubbles: bool) -> Self {
		self.bubbles = bubbles;
		self
	}

	/// Sets whether the event crosses shadow root boundaries.
	pub fn composed(mut self, composed: bool) -> Self {
		self.composed = composed;
		self
	}

	/// Names the component property a `change` event reports.
	pub fn with_property(mut self, property: impl Into<String>) -> Self {
		self.property = Some(property.into());
		self
	}

	/// Event name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Custom event payload (`Null` for native events).
	pub fn detail(&self) -> &Value {
		&self.detail
	}

	/// Property named by [`Event::with_property`].
	pub fn property(&self) -> Option<&str> {
		self.property.as_deref()
	}

	/// Whether this is a native event.
	pub fn is_native(&self) -> bool {
		self.native
	}

	/// Whether the event bubbles.
	pub fn is_bubbling(&self) -> bool {
		self.bubbles
	}

	/// Whether the event crosses shadow boundaries.
	pub fn is_composed(&self) -> bool {
		self.composed
	}

	/// The target as seen from the current listener (retargeted across shadow roots).
	pub fn target(&self) -> Option<NodeId> {
		self.target.get()
	}

	/// The node whose listener is running.
	pub fn current_target(&self) -> Option<NodeId> {
		self.current_target.get()
	}

	/// The value an input-like target held when the event was dispatched.
	///
	/// `checked` for checkboxes and radios, the `value` attribute otherwise.
	pub fn target_value(&self) -> Value {
		self.target_value.borrow().clone()
	}

	/// The value a two-way binding should store: the detail of a custom event, or the
	/// target value of a native one.
	pub fn model_value(&self) -> Value {
		if self.native || self.detail.is_null() {
			self.target_value()
		} else {
			self.detail.clone()
		}
	}

	/// Stops the event after the listeners of the current node.
	pub fn stop_propagation(&self) {
		self.propagation_stopped.set(true);
	}

	/// Whether propagation was stopped.
	pub fn is_propagation_stopped(&self) -> bool {
		self.propagation_stopped.get()
	}

	/// Marks the default action as cancelled.
	pub fn prevent_default(&self) {
		self.default_prevented.set(true);
	}

	/// Whether the default action was cancelled.
	pub fn is_default_prevented(&self) -> bool {
		self.default_prevented.get()
	}

	pub(crate) fn set_target(&self, target: NodeId) {
		self.target.set(Some(target));
	}

	pub(crate) fn set_current_target(&self, node: Option<NodeId>) {
		self.current_target.set(node);
	}

	pub(crate) fn set_target_value(&self, value: Value) {
		*self.target_value.borrow_mut() = value;
	}
}

/// Modifiers applied before a listener runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ListenerOptions {
	/// Call `prevent_default` first
	pub prevent_default: bool,
	/// Call `stop_propagation` first
	pub stop_propagation: bool,
}
