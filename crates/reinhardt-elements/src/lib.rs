//! Reinhardt Elements - reactive components over an in-memory DOM
//!
//! This crate turns `html!` templates into a live document and keeps it in sync with
//! reactive state while touching as few nodes as possible.
//!
//! ## Architecture
//!
//! - [`dom`]: arena-backed document with shadow roots, slots, listeners and mutation
//!   counters
//! - [`template`]: the `html!` macro, hole values and the per-call-site compiler
//! - [`directive`]: `when`, `each`, `each_keyed` and `raw`
//! - [`reconcile`]: two-pass reconciler with keyed list moves
//! - [`component`]: component definitions, instances, lifecycle, `x-model`
//! - [`boundary`]: ready-made error boundary
//! - [`router`]: hash-based routing with `:param` extraction
//!
//! Reactive state lives in `reinhardt-reactive`; components read it in their
//! templates and re-render once per turn when it changes.
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_elements::prelude::*;
//!
//! let app = App::new();
//! app.define(
//!     ComponentDefinition::new("x-todos")
//!         .data(|| serde_json::json!({ "items": [] }))
//!         .template(|ctx| {
//!             let items = ctx.state().get("items");
//!             Ok(html!(
//!                 "<ul>{}</ul>",
//!                 each(items.as_list().map(|l| l.to_vec()).unwrap_or_default(), |item, _| {
//!                     html!("<li>{}</li>", item)
//!                 })
//!             ))
//!         }),
//! )?;
//! app.mount(app.document().body(), "x-todos", Vec::<(String, Prop)>::new())?;
//! ```

#![warn(missing_docs)]

pub mod boundary;
pub mod callback;
pub mod component;
pub mod directive;
pub mod dom;
pub mod error;
pub mod logging;
pub mod options;
pub mod prop;
pub mod reconcile;
pub mod router;
pub mod template;

mod markup;

#[doc(hidden)]
pub use tracing as __tracing;

pub use boundary::error_boundary;
pub use callback::{Callback, event_handler};
pub use component::{App, ComponentDefinition, Context, Lifecycle};
pub use directive::{each, each_keyed, raw, when, when_else};
pub use dom::{Document, Event, NodeId};
pub use error::{ComponentError, RenderError, RouterError, TemplateError};
pub use options::AppOptions;
pub use prop::Prop;
pub use router::{Router, enable_routing};
pub use template::{HoleValue, TemplateResult};

/// Common imports for component authors.
pub mod prelude {
	pub use crate::boundary::error_boundary;
	pub use crate::callback::{Callback, event_handler};
	pub use crate::component::{App, ComponentDefinition, Context};
	pub use crate::directive::{each, each_keyed, raw, when, when_else};
	pub use crate::dom::Event;
	pub use crate::error::RenderError;
	pub use crate::html;
	pub use crate::prop::Prop;
	pub use crate::router::enable_routing;
	pub use crate::template::TemplateResult;
	pub use reinhardt_reactive::{Store, Value};
}
