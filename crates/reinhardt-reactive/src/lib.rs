//! Reinhardt Reactive - dependency-tracked state for reinhardt-ui
//!
//! This crate holds the reactive state layer used by the component runtime:
//!
//! - [`runtime`]: observer stack, bipartite dependency graph, render queue and flush
//! - [`ReactiveObject`] / [`ReactiveList`]: tracked containers built from plain JSON
//! - [`Value`]: the dynamic values they hold
//! - [`Store`]: shared state with named mutators
//!
//! ## Batching
//!
//! Writes never render synchronously. Every observer depending on a written property is
//! enqueued once, and the queue is flushed at the end of the turn (by the installed
//! scheduler, by [`batch`], or by an explicit [`flush_updates`]). N writes in one turn
//! therefore produce exactly one run per affected observer.

#![warn(missing_docs)]

pub mod error;
pub mod object;
pub mod runtime;
pub mod store;
pub mod value;

pub use error::{ReactiveError, Result};
pub use object::{ReactiveList, ReactiveObject, make_reactive};
pub use runtime::{
	ALL_KEYS, FlushReport, NodeId, Observer, Runtime, SourceKey, UpdateFn, batch, flush_updates,
	reset_runtime, set_scheduler, untracked, with_runtime,
};
pub use store::{Mutator, Store, StoreBuilder};
pub use value::Value;
