//! Component runtime.
//!
//! Components are registered on an [`App`] under a custom element tag. Each instance
//! lives on a host element, renders into the host's shadow root and projects the
//! host's light children through `<slot>`.
//!
//! ## Lifecycle
//!
//! ```text
//! Unattached --render--> Mounted --write--> (queued) --render--> Mounted
//!                                                  \--unmount--> Unmounted
//! ```
//!
//! - The first render runs while the instance is created; the `mounted` hook fires
//!   after the first successful render.
//! - Reads of state, stores and `x-model` values inside the template are tracked.
//!   Writing any of them queues one re-render, however many writes a turn makes.
//! - Unmounting drops the instance's dependency edges and any queued render, then
//!   fires `unmounted`. Later writes through a stale context do nothing.
//!
//! ## Failures
//!
//! A template that returns an error or panics leaves the previous frame on screen.
//! The error goes to the nearest ancestor error boundary
//! ([`ComponentDefinition::error_boundary`]); without one it is logged and kept in
//! [`App::take_render_errors`].
//!
//! ## Two-way binding
//!
//! `x-model="key"` binds an element's `value` (or `checked`) to `state[key]` and
//! listens for `change`. On a change the state is written and the component re-emits
//! the value through [`Context::emit_change`], which stops the original event, so
//! the owner sees exactly one `change` per edit at every level.

mod app;
mod context;
mod definition;
mod instance;

pub use app::{App, UnhandledRenderError};
pub use context::Context;
pub use definition::{
	ComponentDefinition, DataFn, FallbackFn, HookFn, MethodFn, PropsChangedFn, TemplateFn,
};
pub use instance::{Lifecycle, RETRY_METHOD};
