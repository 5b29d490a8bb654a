//! The handle a component's template, methods and hooks receive.

use std::fmt;
use std::rc::Rc;

use reinhardt_reactive::{ReactiveObject, Store, Value};

use crate::callback::Callback;
use crate::dom::{Document, Event, NodeId};
use crate::error::RenderError;
use crate::prop::Prop;

use super::App;
use super::instance::{ComponentInstance, Lifecycle};

/// Access to one component instance.
///
/// Cloning is cheap. A context outliving its instance keeps working but writes
/// through it no longer render anything.
#[derive(Clone)]
pub struct Context {
	instance: Rc<ComponentInstance>,
}

impl Context {
	pub(crate) fn new(instance: Rc<ComponentInstance>) -> Self {
		Self { instance }
	}

	/// Component tag.
	pub fn tag(&self) -> &str {
		self.instance.tag()
	}

	/// Reactive state created by `data()`. Reads inside the template are tracked.
	pub fn state(&self) -> &ReactiveObject {
		&self.instance.state
	}

	/// Current value of a prop, or its declared default.
	pub fn prop(&self, name: &str) -> Prop {
		self.instance.prop(name)
	}

	/// Current value of a prop as a [`Value`]. Render props read as `Null`.
	pub fn prop_value(&self, name: &str) -> Value {
		self.instance.prop(name).to_value()
	}

	/// Names of the props the instance has received or declared.
	pub fn prop_names(&self) -> Vec<String> {
		self.instance.prop_names()
	}

	/// A store declared with [`ComponentDefinition::store`](super::ComponentDefinition::store).
	pub fn store(&self, name: &str) -> Option<Store> {
		self.instance.definition.stores.get(name).cloned()
	}

	/// A method bound to this instance.
	pub fn method(&self, name: &str) -> Option<Callback> {
		self.instance.method(name)
	}

	/// Reports a value change to the owner of this component.
	///
	/// Stops propagation of `event` (the event that caused the change) and dispatches
	/// exactly one bubbling, composed `change` event from the host, carrying `value` as
	/// its detail and `property` as the changed property.
	pub fn emit_change(&self, event: Option<&Event>, value: impl Into<Value>, property: Option<&str>) {
		if let Some(event) = event {
			event.stop_propagation();
		}
		let mut change = Event::custom("change", value)
			.bubbles(true)
			.composed(true);
		if let Some(property) = property {
			change = change.with_property(property);
		}
		self.instance
			.document
			.dispatch_event(self.instance.host, &change);
	}

	/// Dispatches a custom event from the host. Returns false if a listener prevented
	/// the default action.
	pub fn emit(&self, event: Event) -> bool {
		self.instance
			.document
			.dispatch_event(self.instance.host, &event)
	}

	/// Host element.
	pub fn host(&self) -> NodeId {
		self.instance.host
	}

	/// Shadow root holding the rendered output.
	pub fn shadow_root(&self) -> NodeId {
		self.instance.shadow
	}

	/// Document the component lives in.
	pub fn document(&self) -> &Document {
		&self.instance.document
	}

	/// Application the component belongs to, if it is still alive.
	pub fn app(&self) -> Option<App> {
		self.instance.app()
	}

	/// Lifecycle state of the instance.
	pub fn lifecycle(&self) -> Lifecycle {
		self.instance.status()
	}

	/// Render errors captured by this error boundary.
	pub fn errors(&self) -> Vec<RenderError> {
		self.instance.captured_errors()
	}

	/// Clears captured errors and re-renders the failed descendants. Error boundaries
	/// only; the fallback's `on-click="retry"` calls this.
	pub fn retry(&self) {
		self.instance.retry();
	}

	/// Queues a re-render without a state change.
	pub fn request_update(&self) {
		self.instance.schedule();
	}
}

impl fmt::Debug for Context {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context")
			.field("tag", &self.tag())
			.field("host", &self.host())
			.field("lifecycle", &self.lifecycle())
			.finish()
	}
}
