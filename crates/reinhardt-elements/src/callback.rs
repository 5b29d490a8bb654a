//! Callback types and event handler conversion traits.
//!
//! ## Features
//!
//! - **Callback**: a cloneable handler whose identity survives re-renders
//! - **IntoEventHandler**: converts closures and callbacks into a [`Callback`]
//!
//! Event holes rebind only when the handler identity changes, so a handler created
//! once (outside the template function, or through a component method) is attached
//! exactly once no matter how often the component re-renders. A closure written inline
//! in the template is a new handler on every pass and is rebound every time.
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_elements::{Callback, html};
//!
//! let on_click = Callback::new(|event| {
//!     event.prevent_default();
//! });
//!
//! html!("<button on-click=\"{}\">Go</button>", on_click.clone())
//! ```

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::dom::Event;

/// Shared handler function
pub type EventHandler = Rc<dyn Fn(&Event) + 'static>;

/// A cloneable event handler with stable identity.
///
/// Cloning shares the underlying function; [`Callback::ptr_eq`] compares identity.
#[derive(Clone)]
pub struct Callback {
	inner: EventHandler,
}

impl Callback {
	/// Creates a new Callback from a function or closure.
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(&Event) + 'static,
	{
		Self { inner: Rc::new(f) }
	}

	/// Calls the callback with the given event.
	pub fn call(&self, event: &Event) {
		(self.inner)(event)
	}

	/// Returns true if both callbacks wrap the same function.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl fmt::Debug for Callback {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Callback")
			.field("inner", &"<function>")
			.finish()
	}
}

/// Trait for converting handler types to [`Callback`].
pub trait IntoEventHandler {
	/// Converts self into a [`Callback`].
	fn into_event_handler(self) -> Callback;
}

impl<F> IntoEventHandler for F
where
	F: Fn(&Event) + 'static,
{
	fn into_event_handler(self) -> Callback {
		Callback::new(self)
	}
}

impl IntoEventHandler for Callback {
	fn into_event_handler(self) -> Callback {
		self
	}
}

impl IntoEventHandler for EventHandler {
	fn into_event_handler(self) -> Callback {
		Callback { inner: self }
	}
}

/// Event handler helper with a concrete argument type for closure inference.
///
/// ```ignore
/// html!("<button on-click=\"{}\">+</button>", event_handler(|_| bump()))
/// ```
pub fn event_handler(f: impl Fn(&Event) + 'static) -> Callback {
	Callback::new(f)
}

/// Extracts the message of a caught panic.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"non-string panic payload".to_string()
	}
}
