//! Reactive Runtime
//!
//! This module provides the core reactive runtime for managing property
//! dependencies, render scheduling, and update batching.
//!
//! ## Architecture
//!
//! 1. **Observer Stack**: Tracks the component (or any other observer) currently rendering
//! 2. **Dependency Tracking**: Records `(source, key) → observer` edges when a reactive
//!    property is read while an observer is active
//! 3. **Update Scheduling**: Writes mark dependent observers dirty and enqueue them once
//! 4. **Flush**: The queue is drained in passes; writes performed during a pass are
//!    deferred to the next pass, never re-entering the running observer
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_reactive::{ReactiveObject, with_runtime, NodeId};
//!
//! let state = ReactiveObject::from_json(serde_json::json!({ "count": 0 }))?;
//! let observer = NodeId::new();
//! with_runtime(|rt| rt.register_observer(observer, std::rc::Rc::new(|| println!("render"))));
//!
//! with_runtime(|rt| rt.run_tracked(observer, || state.get("count")));
//! state.set("count", 1);
//! state.set("count", 2);
//!
//! // Prints "render" exactly once
//! reinhardt_reactive::flush_updates();
//! ```

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicUsize, Ordering};

extern crate alloc;
use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

/// Default upper bound on flush passes before the queue is considered cyclic.
pub const DEFAULT_MAX_FLUSH_PASSES: usize = 100;

/// Key used for whole-collection dependencies (list contents, object key sets).
pub const ALL_KEYS: &str = "*";

/// Unique identifier for reactive nodes (objects, lists, observers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
	/// Create a new unique NodeId
	pub fn new() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

impl Default for NodeId {
	fn default() -> Self {
		Self::new()
	}
}

/// A single dependency source: one property of one reactive node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceKey {
	/// The reactive object or list owning the property
	pub node: NodeId,
	/// Property name, or [`ALL_KEYS`] for collection-wide reads
	pub key: String,
}

impl SourceKey {
	/// Creates a source key for `node.key`.
	pub fn new(node: NodeId, key: impl Into<String>) -> Self {
		Self {
			node,
			key: key.into(),
		}
	}
}

/// Observer represents a currently executing render
#[derive(Debug, Clone)]
pub struct Observer {
	/// Unique identifier for this observer
	pub id: NodeId,
	/// Whether reads should be recorded for this frame
	pub tracking: bool,
}

impl Observer {
	/// A tracking observer frame.
	pub fn new(id: NodeId) -> Self {
		Self { id, tracking: true }
	}

	fn untracked(id: NodeId) -> Self {
		Self {
			id,
			tracking: false,
		}
	}
}

/// Bipartite dependency graph between property sources and observers.
#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
	/// source → observers reading it
	pub(crate) subscribers: BTreeMap<SourceKey, BTreeSet<NodeId>>,
	/// observer → sources it read during its last run
	pub(crate) dependencies: BTreeMap<NodeId, BTreeSet<SourceKey>>,
}

/// Callback run when a queued observer is flushed
pub type UpdateFn = Rc<dyn Fn()>;

/// Type for the task scheduler used to defer flushes to the end of the turn
type SchedulerFn = Rc<dyn Fn(Box<dyn FnOnce()>)>;

/// Statistics returned by a flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
	/// Number of queue passes executed
	pub passes: usize,
	/// Number of observer callbacks run
	pub runs: usize,
	/// Whether the pass limit was hit and remaining work dropped
	pub truncated: bool,
}

/// Thread-local reactive runtime
///
/// This struct manages the reactive dependency graph and update scheduling.
/// It uses thread-local storage to maintain separate runtime state per thread.
pub struct Runtime {
	/// Observer stack for tracking currently rendering observers
	observer_stack: RefCell<Vec<Observer>>,
	/// Dependency graph: source ↔ observer
	pub(crate) dependency_graph: RefCell<DependencyGraph>,
	/// Registered update callbacks per observer
	callbacks: RefCell<BTreeMap<NodeId, UpdateFn>>,
	/// Pending updates (observers that need to be re-run)
	pub(crate) pending_updates: RefCell<Vec<NodeId>>,
	/// Whether a flush is currently scheduled
	pub(crate) update_scheduled: Cell<bool>,
	/// Whether a flush is running
	flushing: Cell<bool>,
	/// Depth of nested `batch` calls
	batch_depth: Cell<usize>,
	/// Optional scheduler for end-of-turn flushes
	scheduler: RefCell<Option<SchedulerFn>>,
	/// Pass limit for a single flush
	max_passes: Cell<usize>,
}

impl Runtime {
	/// Create a new Runtime instance
	pub fn new() -> Self {
		Self {
			observer_stack: RefCell::new(Vec::new()),
			dependency_graph: RefCell::new(DependencyGraph::default()),
			callbacks: RefCell::new(BTreeMap::new()),
			pending_updates: RefCell::new(Vec::new()),
			update_scheduled: Cell::new(false),
			flushing: Cell::new(false),
			batch_depth: Cell::new(0),
			scheduler: RefCell::new(None),
			max_passes: Cell::new(DEFAULT_MAX_FLUSH_PASSES),
		}
	}

	/// Get the current tracking observer
	pub fn current_observer(&self) -> Option<NodeId> {
		self.observer_stack
			.borrow()
			.last()
			.filter(|observer| observer.tracking)
			.map(|observer| observer.id)
	}

	/// Returns true while any observer frame is on the stack.
	pub fn is_rendering(&self) -> bool {
		!self.observer_stack.borrow().is_empty()
	}

	/// Push an observer onto the stack
	pub fn push_observer(&self, observer: Observer) {
		self.observer_stack.borrow_mut().push(observer);
	}

	/// Pop an observer from the stack
	pub fn pop_observer(&self) -> Option<Observer> {
		self.observer_stack.borrow_mut().pop()
	}

	/// Runs `f` with `observer` as the current tracking observer.
	///
	/// Dependencies recorded by the previous run are cleared first, so the edge set
	/// always reflects the most recent run. The frame is popped even if `f` unwinds.
	pub fn run_tracked<R>(&self, observer: NodeId, f: impl FnOnce() -> R) -> R {
		self.clear_dependencies(observer);
		self.push_observer(Observer::new(observer));
		let _guard = PopGuard(self);
		f()
	}

	/// Runs `f` without recording any dependency.
	pub fn run_untracked<R>(&self, f: impl FnOnce() -> R) -> R {
		let id = self.current_observer().unwrap_or_default();
		self.push_observer(Observer::untracked(id));
		let _guard = PopGuard(self);
		f()
	}

	/// Track a dependency between the current observer and a source
	pub fn track(&self, source: SourceKey) {
		if let Some(observer_id) = self.current_observer() {
			let mut graph = self.dependency_graph.borrow_mut();
			graph
				.dependencies
				.entry(observer_id)
				.or_default()
				.insert(source.clone());
			graph
				.subscribers
				.entry(source)
				.or_default()
				.insert(observer_id);
		}
	}

	/// Notify that a source has changed
	///
	/// Every subscriber is enqueued once; nothing runs synchronously.
	pub fn notify(&self, source: &SourceKey) {
		let subscribers: Vec<NodeId> = self
			.dependency_graph
			.borrow()
			.subscribers
			.get(source)
			.map(|set| set.iter().copied().collect())
			.unwrap_or_default();

		for observer in subscribers {
			self.schedule_update(observer);
		}
	}

	/// Registers the callback run when `observer` is flushed.
	pub fn register_observer(&self, observer: NodeId, update: UpdateFn) {
		self.callbacks.borrow_mut().insert(observer, update);
	}

	/// Returns true if `observer` has a registered callback.
	pub fn is_registered(&self, observer: NodeId) -> bool {
		self.callbacks.borrow().contains_key(&observer)
	}

	/// Drops every trace of `observer`: edges, queued updates, callback.
	///
	/// Writes to sources it used to read become no-ops for it.
	pub fn dispose_observer(&self, observer: NodeId) {
		self.clear_dependencies(observer);
		self.dependency_graph
			.borrow_mut()
			.dependencies
			.remove(&observer);
		self.pending_updates
			.borrow_mut()
			.retain(|&id| id != observer);
		// Release the borrow before the callback (and whatever it captured) is dropped.
		let removed = self.callbacks.borrow_mut().remove(&observer);
		drop(removed);
	}

	/// Schedule an observer for update
	///
	/// Unregistered observers are ignored. The flush is requested from the scheduler
	/// at most once per turn; without a scheduler the caller flushes explicitly.
	pub fn schedule_update(&self, observer: NodeId) {
		if !self.is_registered(observer) {
			return;
		}
		{
			let mut pending = self.pending_updates.borrow_mut();
			if !pending.contains(&observer) {
				pending.push(observer);
			}
		}

		if self.flushing.get() || self.batch_depth.get() > 0 || self.update_scheduled.get() {
			return;
		}
		let scheduler = self.scheduler.borrow().clone();
		if let Some(scheduler) = scheduler {
			self.update_scheduled.set(true);
			scheduler(Box::new(|| {
				with_runtime(|rt| rt.flush_updates());
			}));
		}
	}

	/// Returns true if `observer` is waiting in the queue.
	pub fn is_pending(&self, observer: NodeId) -> bool {
		self.pending_updates.borrow().contains(&observer)
	}

	/// Number of queued observers.
	pub fn pending_count(&self) -> usize {
		self.pending_updates.borrow().len()
	}

	/// Flush all pending updates
	///
	/// Each pass takes the whole queue; observers enqueued while a pass runs are
	/// picked up by the following pass. Re-entrant calls are ignored.
	pub fn flush_updates(&self) -> FlushReport {
		let mut report = FlushReport::default();
		if self.flushing.get() {
			return report;
		}
		self.flushing.set(true);
		let _guard = FlushGuard(self);

		loop {
			let batch = core::mem::take(&mut *self.pending_updates.borrow_mut());
			if batch.is_empty() {
				break;
			}
			if report.passes >= self.max_passes.get() {
				tracing::error!(
					passes = report.passes,
					dropped = batch.len(),
					"render queue did not settle; dropping remaining updates"
				);
				report.truncated = true;
				break;
			}
			report.passes += 1;
			for observer in batch {
				let callback = self.callbacks.borrow().get(&observer).cloned();
				if let Some(callback) = callback {
					callback();
					report.runs += 1;
				}
			}
		}
		report
	}

	/// Runs `f` as one turn: writes inside are flushed once when the outermost
	/// batch returns.
	pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
		self.batch_depth.set(self.batch_depth.get() + 1);
		let result = {
			let _guard = BatchGuard(self);
			f()
		};
		if self.batch_depth.get() == 0 && !self.flushing.get() {
			self.flush_updates();
		}
		result
	}

	/// Installs the scheduler used to defer flushes to the end of the turn.
	pub fn set_scheduler(&self, scheduler: impl Fn(Box<dyn FnOnce()>) + 'static) {
		*self.scheduler.borrow_mut() = Some(Rc::new(scheduler));
	}

	/// Removes the scheduler; flushes become manual.
	pub fn clear_scheduler(&self) {
		*self.scheduler.borrow_mut() = None;
	}

	/// Sets the flush pass limit.
	pub fn set_max_passes(&self, passes: usize) {
		self.max_passes.set(passes.max(1));
	}

	/// Clear dependencies for an observer
	///
	/// Called before re-running an observer so stale edges disappear.
	pub fn clear_dependencies(&self, observer: NodeId) {
		let mut graph = self.dependency_graph.borrow_mut();
		let Some(sources) = graph.dependencies.get_mut(&observer).map(core::mem::take) else {
			return;
		};
		for source in sources {
			if let Some(subscribers) = graph.subscribers.get_mut(&source) {
				subscribers.remove(&observer);
				if subscribers.is_empty() {
					graph.subscribers.remove(&source);
				}
			}
		}
	}

	/// Remove every source owned by a reactive node
	///
	/// Called when a reactive object or list is dropped.
	pub fn remove_node(&self, node: NodeId) {
		let mut graph = self.dependency_graph.borrow_mut();
		let owned: Vec<SourceKey> = graph
			.subscribers
			.keys()
			.filter(|source| source.node == node)
			.cloned()
			.collect();
		for source in owned {
			if let Some(observers) = graph.subscribers.remove(&source) {
				for observer in observers {
					if let Some(deps) = graph.dependencies.get_mut(&observer) {
						deps.remove(&source);
					}
				}
			}
		}
	}

	/// Number of observers subscribed to `source` (for testing)
	pub fn subscriber_count(&self, source: &SourceKey) -> usize {
		self.dependency_graph
			.borrow()
			.subscribers
			.get(source)
			.map(BTreeSet::len)
			.unwrap_or(0)
	}

	/// Number of sources `observer` depends on (for testing)
	pub fn dependency_count(&self, observer: NodeId) -> usize {
		self.dependency_graph
			.borrow()
			.dependencies
			.get(&observer)
			.map(BTreeSet::len)
			.unwrap_or(0)
	}

	/// Resets the runtime to its initial state.
	pub fn reset(&self) {
		self.observer_stack.borrow_mut().clear();
		*self.dependency_graph.borrow_mut() = DependencyGraph::default();
		let callbacks = core::mem::take(&mut *self.callbacks.borrow_mut());
		drop(callbacks);
		self.pending_updates.borrow_mut().clear();
		self.update_scheduled.set(false);
		self.batch_depth.set(0);
		*self.scheduler.borrow_mut() = None;
		self.max_passes.set(DEFAULT_MAX_FLUSH_PASSES);
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}

struct PopGuard<'a>(&'a Runtime);

impl Drop for PopGuard<'_> {
	fn drop(&mut self) {
		self.0.pop_observer();
	}
}

struct FlushGuard<'a>(&'a Runtime);

impl Drop for FlushGuard<'_> {
	fn drop(&mut self) {
		self.0.flushing.set(false);
		self.0.update_scheduled.set(false);
	}
}

struct BatchGuard<'a>(&'a Runtime);

impl Drop for BatchGuard<'_> {
	fn drop(&mut self) {
		self.0.batch_depth.set(self.0.batch_depth.get() - 1);
	}
}

// Thread-local runtime instance
//
// The engine is single-threaded; each thread gets its own runtime instance.
thread_local! {
	static RUNTIME: Runtime = Runtime::new();
}

/// Get a reference to the thread's runtime
pub fn with_runtime<F, R>(f: F) -> R
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.with(f)
}

/// Try to access the runtime (safe version for Drop implementations)
///
/// Returns None if the thread-local storage has been destroyed.
pub(crate) fn try_with_runtime<F, R>(f: F) -> Option<R>
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.try_with(f).ok()
}

/// Flushes the thread's render queue.
pub fn flush_updates() -> FlushReport {
	with_runtime(|rt| rt.flush_updates())
}

/// Runs `f` as a single turn on the thread's runtime.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
	with_runtime(|rt| rt.batch(f))
}

/// Runs `f` without dependency tracking.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
	with_runtime(|rt| rt.run_untracked(f))
}

/// Installs an end-of-turn scheduler on the thread's runtime.
///
/// In a browser this would wrap `queueMicrotask`; native embedders can push the task
/// onto their own event loop.
pub fn set_scheduler(scheduler: impl Fn(Box<dyn FnOnce()>) + 'static) {
	with_runtime(|rt| rt.set_scheduler(scheduler));
}

/// Resets the thread's runtime.
pub fn reset_runtime() {
	with_runtime(Runtime::reset);
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;

	fn counter_observer(rt: &Runtime) -> (NodeId, Rc<Cell<usize>>) {
		let id = NodeId::new();
		let runs = Rc::new(Cell::new(0));
		let runs_clone = runs.clone();
		rt.register_observer(id, Rc::new(move || runs_clone.set(runs_clone.get() + 1)));
		(id, runs)
	}

	#[rstest]
	fn test_node_id_uniqueness() {
		let id1 = NodeId::new();
		let id2 = NodeId::new();
		let id3 = NodeId::new();

		assert_ne!(id1, id2);
		assert_ne!(id2, id3);
		assert_ne!(id1, id3);
	}

	#[rstest]
	fn test_runtime_observer_stack() {
		let runtime = Runtime::new();
		assert!(runtime.current_observer().is_none());

		let id1 = NodeId::new();
		runtime.push_observer(Observer::new(id1));
		assert_eq!(runtime.current_observer(), Some(id1));

		let id2 = NodeId::new();
		runtime.push_observer(Observer::new(id2));
		assert_eq!(runtime.current_observer(), Some(id2));

		runtime.pop_observer();
		assert_eq!(runtime.current_observer(), Some(id1));

		runtime.pop_observer();
		assert!(runtime.current_observer().is_none());
	}

	#[rstest]
	fn test_dependency_tracking() {
		let runtime = Runtime::new();
		let source = SourceKey::new(NodeId::new(), "count");
		let observer = NodeId::new();

		runtime.run_tracked(observer, || runtime.track(source.clone()));

		assert_eq!(runtime.subscriber_count(&source), 1);
		assert_eq!(runtime.dependency_count(observer), 1);
	}

	#[rstest]
	fn test_untracked_reads_record_nothing() {
		let runtime = Runtime::new();
		let source = SourceKey::new(NodeId::new(), "count");
		let observer = NodeId::new();

		runtime.run_tracked(observer, || {
			runtime.run_untracked(|| runtime.track(source.clone()));
		});

		assert_eq!(runtime.subscriber_count(&source), 0);
	}

	#[rstest]
	fn test_notify_enqueues_once() {
		let runtime = Runtime::new();
		let (observer, runs) = counter_observer(&runtime);
		let source = SourceKey::new(NodeId::new(), "count");
		runtime.run_tracked(observer, || runtime.track(source.clone()));

		runtime.notify(&source);
		runtime.notify(&source);
		runtime.notify(&source);
		assert_eq!(runtime.pending_count(), 1);
		assert_eq!(runs.get(), 0);

		let report = runtime.flush_updates();
		assert_eq!(runs.get(), 1);
		assert_eq!(report.runs, 1);
		assert_eq!(report.passes, 1);
	}

	#[rstest]
	fn test_unregistered_observer_is_ignored() {
		let runtime = Runtime::new();
		runtime.schedule_update(NodeId::new());
		assert_eq!(runtime.pending_count(), 0);
	}

	#[rstest]
	fn test_dispose_observer_cancels_pending_update() {
		let runtime = Runtime::new();
		let (observer, runs) = counter_observer(&runtime);
		let source = SourceKey::new(NodeId::new(), "count");
		runtime.run_tracked(observer, || runtime.track(source.clone()));

		runtime.notify(&source);
		runtime.dispose_observer(observer);
		runtime.notify(&source);
		runtime.flush_updates();

		assert_eq!(runs.get(), 0);
		assert_eq!(runtime.subscriber_count(&source), 0);
	}

	#[rstest]
	fn test_clear_dependencies() {
		let runtime = Runtime::new();
		let source = SourceKey::new(NodeId::new(), "a");
		let observer = NodeId::new();
		runtime.run_tracked(observer, || runtime.track(source.clone()));

		runtime.clear_dependencies(observer);

		assert_eq!(runtime.subscriber_count(&source), 0);
		assert_eq!(runtime.dependency_count(observer), 0);
	}

	#[rstest]
	fn test_batch_flushes_at_end_of_turn() {
		let runtime = Runtime::new();
		let (observer, runs) = counter_observer(&runtime);

		runtime.batch(|| {
			runtime.schedule_update(observer);
			runtime.schedule_update(observer);
			assert_eq!(runs.get(), 0);
		});

		assert_eq!(runs.get(), 1);
	}

	#[rstest]
	fn test_flush_limit_truncates_cycles() {
		let runtime = Rc::new(Runtime::new());
		runtime.set_max_passes(3);
		let observer = NodeId::new();
		let rt = runtime.clone();
		runtime.register_observer(observer, Rc::new(move || rt.schedule_update(observer)));

		runtime.schedule_update(observer);
		let report = runtime.flush_updates();

		assert!(report.truncated);
		assert_eq!(report.passes, 3);
	}

	#[rstest]
	#[serial]
	fn test_scheduler_is_called_once_per_turn() {
		reset_runtime();
		let tasks: Rc<RefCell<Vec<Box<dyn FnOnce()>>>> = Rc::new(RefCell::new(Vec::new()));
		let queue = tasks.clone();
		set_scheduler(move |task| queue.borrow_mut().push(task));

		let (observer, runs) = with_runtime(counter_observer);
		with_runtime(|rt| {
			rt.schedule_update(observer);
			rt.schedule_update(observer);
		});
		assert_eq!(tasks.borrow().len(), 1);

		let task = tasks.borrow_mut().pop().unwrap();
		task();
		assert_eq!(runs.get(), 1);
		reset_runtime();
	}
}
