//! # Reinhardt UI
//!
//! Reactive UI components for Rust: compiled `html!` templates, dependency-tracked
//! state with batched rendering, and a keyed reconciler that preserves node identity.
//!
//! ## Crates
//!
//! - [`reactive`] (`reinhardt-reactive`): reactive objects and lists, the render
//!   runtime, stores
//! - [`elements`] (`reinhardt-elements`): in-memory DOM, template compiler,
//!   directives, reconciler, components, error boundary, router
//!
//! ## Feature Flags
//!
//! - `debug-hooks` - emits `debug_log!` output for render passes and part updates
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use reinhardt_ui::prelude::*;
//!
//! let app = App::new();
//! app.define(
//!     ComponentDefinition::new("x-counter")
//!         .data(|| serde_json::json!({ "count": 0 }))
//!         .method("increment", |ctx, _| {
//!             ctx.state().update("count", |n| (n.as_i64().unwrap_or(0) + 1).into());
//!         })
//!         .template(|ctx| {
//!             Ok(html!(
//!                 "<button on-click=\"increment\">Clicked {} times</button>",
//!                 ctx.state().get("count"),
//!             ))
//!         }),
//! )?;
//! app.mount(app.document().body(), "x-counter", Vec::<(String, Prop)>::new())?;
//! ```

pub use reinhardt_elements as elements;
pub use reinhardt_reactive as reactive;

pub use reinhardt_elements::html;

/// Common imports for applications.
pub mod prelude {
	pub use reinhardt_elements::prelude::*;
	pub use reinhardt_elements::{AppOptions, NodeId, Router};
	pub use reinhardt_reactive::{ReactiveList, ReactiveObject, batch, flush_updates};
}
