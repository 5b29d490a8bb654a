//! Mounted component instances.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use reinhardt_reactive::{
	NodeId as ObserverId, ReactiveObject, Value, untracked, with_runtime,
};

use crate::callback::{Callback, panic_message};
use crate::directive::DuplicateKeyError;
use crate::dom::{Document, NodeId};
use crate::error::RenderError;
use crate::prop::Prop;
use crate::reconcile::{RenderHost, RenderRoot};
use crate::template::TemplateResult;
use crate::{debug_log, error_log, warn_log};

use super::app::{App, AppInner};
use super::{ComponentDefinition, Context};

/// Name of the method every error boundary provides.
pub const RETRY_METHOD: &str = "retry";

/// Lifecycle of a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
	/// Created, first render not finished
	Unattached,
	/// Rendered and idle
	Mounted,
	/// Inside a render pass
	Updating,
	/// Removed; further writes are ignored
	Unmounted,
}

pub(crate) struct ComponentInstance {
	pub(crate) definition: Rc<ComponentDefinition>,
	pub(crate) observer: ObserverId,
	pub(crate) document: Document,
	pub(crate) host: NodeId,
	pub(crate) shadow: NodeId,
	pub(crate) state: ReactiveObject,
	app: Weak<AppInner>,
	this: Weak<ComponentInstance>,
	props: RefCell<BTreeMap<String, Prop>>,
	status: Cell<Lifecycle>,
	root: RefCell<Option<RenderRoot>>,
	methods: RefCell<HashMap<String, Callback>>,
	writers: RefCell<HashMap<String, Callback>>,
	mounted_fired: Cell<bool>,
	renders: Cell<usize>,
	captured: RefCell<Vec<(Weak<ComponentInstance>, RenderError)>>,
}

pub(crate) struct InstanceParts {
	pub(crate) definition: Rc<ComponentDefinition>,
	pub(crate) app: Weak<AppInner>,
	pub(crate) document: Document,
	pub(crate) host: NodeId,
	pub(crate) shadow: NodeId,
	pub(crate) state: ReactiveObject,
	pub(crate) props: Vec<(String, Prop)>,
}

impl ComponentInstance {
	pub(crate) fn new(parts: InstanceParts) -> Rc<Self> {
		let InstanceParts {
			definition,
			app,
			document,
			host,
			shadow,
			state,
			props,
		} = parts;
		let mut initial: BTreeMap<String, Prop> = definition.props.iter().cloned().collect();
		initial.extend(props);
		let root = RenderRoot::new(&document, shadow);

		Rc::new_cyclic(|this| Self {
			definition,
			observer: ObserverId::new(),
			document,
			host,
			shadow,
			state,
			app,
			this: this.clone(),
			props: RefCell::new(initial),
			status: Cell::new(Lifecycle::Unattached),
			root: RefCell::new(Some(root)),
			methods: RefCell::new(HashMap::new()),
			writers: RefCell::new(HashMap::new()),
			mounted_fired: Cell::new(false),
			renders: Cell::new(0),
			captured: RefCell::new(Vec::new()),
		})
	}

	pub(crate) fn tag(&self) -> &str {
		&self.definition.tag
	}

	pub(crate) fn status(&self) -> Lifecycle {
		self.status.get()
	}

	pub(crate) fn is_alive(&self) -> bool {
		self.status.get() != Lifecycle::Unmounted
	}

	pub(crate) fn render_count(&self) -> usize {
		self.renders.get()
	}

	pub(crate) fn app(&self) -> Option<App> {
		self.app.upgrade().map(App::from_inner)
	}

	fn context(&self) -> Option<Context> {
		self.this.upgrade().map(Context::new)
	}

	/// Registers the instance's update callback with the runtime.
	pub(crate) fn register(&self) {
		let this = self.this.clone();
		with_runtime(|rt| {
			rt.register_observer(
				self.observer,
				Rc::new(move || {
					if let Some(instance) = this.upgrade() {
						instance.render();
					}
				}),
			)
		});
	}

	pub(crate) fn schedule(&self) {
		if self.is_alive() {
			with_runtime(|rt| rt.schedule_update(self.observer));
		}
	}

	/// Runs the template and patches the shadow root.
	///
	/// A failing template leaves the previous frame in place and is reported to the
	/// nearest error boundary.
	pub(crate) fn render(&self) {
		if !self.is_alive() {
			return;
		}
		let (Some(app), Some(ctx)) = (self.app(), self.context()) else {
			return;
		};
		self.status.set(Lifecycle::Updating);
		self.renders.set(self.renders.get() + 1);
		debug_log!(tag = self.tag(), host = %self.host, "rendering component");

		let outcome = with_runtime(|rt| {
			rt.run_tracked(self.observer, || {
				let next = self.evaluate(&ctx)?;
				let host = InstanceHost {
					instance: self,
					app: &app,
				};
				let mut root = self
					.root
					.try_borrow_mut()
					.map_err(|_| RenderError::msg("component re-rendered while patching"))?;
				match root.as_mut() {
					Some(root) => root.patch(&self.document, next, &host).map(|_| ()),
					None => Ok(()),
				}
			})
		});

		if self.status.get() == Lifecycle::Updating {
			self.status.set(Lifecycle::Mounted);
		}
		match outcome {
			Ok(()) => {
				if !self.mounted_fired.get() {
					self.mounted_fired.set(true);
					if let Some(hook) = self.definition.mounted.clone() {
						self.run_hook("mounted", || hook(&ctx));
					}
				}
			}
			Err(err) => app.report_render_error(self, err),
		}
	}

	fn evaluate(&self, ctx: &Context) -> Result<TemplateResult, RenderError> {
		if let Some(fallback) = &self.definition.fallback {
			let errors: Vec<RenderError> = self
				.captured
				.borrow()
				.iter()
				.map(|(_, err)| err.clone())
				.collect();
			if !errors.is_empty() {
				return catch_unwind(AssertUnwindSafe(|| fallback(ctx, &errors)))
					.map_err(|payload| RenderError::Panicked(panic_message(&*payload)));
			}
		}
		let template = self
			.definition
			.template
			.as_ref()
			.ok_or_else(|| RenderError::msg(format!("`{}` has no template", self.tag())))?;
		catch_unwind(AssertUnwindSafe(|| template(ctx)))
			.unwrap_or_else(|payload| Err(RenderError::Panicked(panic_message(&*payload))))
	}

	/// Runs a user hook untracked, containing panics.
	fn run_hook(&self, name: &str, f: impl FnOnce()) {
		let result = untracked(|| catch_unwind(AssertUnwindSafe(f)));
		if let Err(payload) = result {
			error_log!(
				tag = self.tag(),
				hook = name,
				"component hook panicked: {}",
				panic_message(&*payload)
			);
		}
	}

	/// Current value of a prop, falling back to its declared default.
	pub(crate) fn prop(&self, name: &str) -> Prop {
		self.props
			.borrow()
			.get(name)
			.cloned()
			.or_else(|| self.definition.default_prop(name).cloned())
			.unwrap_or_default()
	}

	pub(crate) fn prop_names(&self) -> Vec<String> {
		self.props.borrow().keys().cloned().collect()
	}

	/// Delivers a prop from the parent. Unchanged values are ignored.
	pub(crate) fn set_prop(&self, name: &str, prop: Prop) {
		if !self.is_alive() {
			return;
		}
		let old = self.prop(name);
		if old.same(&prop) {
			return;
		}
		self.props
			.borrow_mut()
			.insert(name.to_string(), prop.clone());
		if let (Some(hook), Some(ctx)) = (self.definition.props_changed.clone(), self.context()) {
			self.run_hook("props_changed", || hook(&ctx, name, &prop, &old));
		}
		self.schedule();
	}

	/// Method bound to this instance, resolved by name.
	///
	/// The callback is created once and reused, so event holes naming a method never
	/// rebind across renders.
	pub(crate) fn method(&self, name: &str) -> Option<Callback> {
		if let Some(callback) = self.methods.borrow().get(name) {
			return Some(callback.clone());
		}
		let this = self.this.clone();
		let callback = match self.definition.methods.get(name) {
			Some(method) => {
				let method = method.clone();
				Callback::new(move |event| {
					if let Some(ctx) = live_context(&this) {
						method(&ctx, event);
					}
				})
			}
			None if name == RETRY_METHOD && self.definition.is_error_boundary() => {
				Callback::new(move |_| {
					if let Some(ctx) = live_context(&this) {
						ctx.retry();
					}
				})
			}
			None => return None,
		};
		self.methods
			.borrow_mut()
			.insert(name.to_string(), callback.clone());
		Some(callback)
	}

	/// `x-model` writer for `key`: stores the event value in state and re-emits it as
	/// this component's `change`.
	pub(crate) fn model_writer(&self, key: &str) -> Callback {
		if let Some(callback) = self.writers.borrow().get(key) {
			return callback.clone();
		}
		let this = self.this.clone();
		let property = key.to_string();
		let callback = Callback::new(move |event| {
			if let Some(ctx) = live_context(&this) {
				let value = event.model_value();
				ctx.state().set(&property, value.clone());
				ctx.emit_change(Some(event), value, Some(&property));
			}
		});
		self.writers
			.borrow_mut()
			.insert(key.to_string(), callback.clone());
		callback
	}

	/// Records a descendant's render failure. Only meaningful for error boundaries.
	pub(crate) fn capture(&self, failed: &ComponentInstance, error: RenderError) {
		warn_log!(
			boundary = self.tag(),
			failed = failed.tag(),
			"render error captured by boundary: {error}"
		);
		self.captured
			.borrow_mut()
			.push((failed.this.clone(), error));
		self.schedule();
	}

	pub(crate) fn captured_errors(&self) -> Vec<RenderError> {
		self.captured
			.borrow()
			.iter()
			.map(|(_, err)| err.clone())
			.collect()
	}

	/// Clears captured errors and re-renders the boundary and the failed descendants.
	pub(crate) fn retry(&self) {
		let failed = std::mem::take(&mut *self.captured.borrow_mut());
		self.schedule();
		for (instance, _) in failed {
			if let Some(instance) = instance.upgrade() {
				instance.schedule();
			}
		}
	}

	/// Tears the instance down: drops its dependency edges and queued render, then
	/// runs the `unmounted` hook. Idempotent.
	pub(crate) fn unmount(&self) {
		if !self.is_alive() {
			return;
		}
		self.status.set(Lifecycle::Unmounted);
		with_runtime(|rt| rt.dispose_observer(self.observer));
		if let Some(ctx) = self.context()
			&& let Some(hook) = self.definition.unmounted.clone()
		{
			self.run_hook("unmounted", || hook(&ctx));
		}
		if let Ok(mut root) = self.root.try_borrow_mut() {
			root.take();
		}
		self.methods.borrow_mut().clear();
		self.writers.borrow_mut().clear();
		self.captured.borrow_mut().clear();
		debug_log!(tag = self.tag(), host = %self.host, "component unmounted");
	}
}

fn live_context(this: &Weak<ComponentInstance>) -> Option<Context> {
	this.upgrade()
		.filter(|instance| instance.is_alive())
		.map(Context::new)
}

/// Reconciler callbacks for one instance's render.
pub(crate) struct InstanceHost<'a> {
	pub(crate) instance: &'a ComponentInstance,
	pub(crate) app: &'a App,
}

impl RenderHost for InstanceHost<'_> {
	fn resolve_method(&self, name: &str) -> Option<Callback> {
		self.instance.method(name)
	}

	fn model_value(&self, key: &str) -> Value {
		self.instance.state.get(key)
	}

	fn model_writer(&self, key: &str) -> Option<Callback> {
		Some(self.instance.model_writer(key))
	}

	fn is_component(&self, tag: &str) -> bool {
		self.app.is_defined(tag)
	}

	fn create_component(&self, element: NodeId, props: Vec<(String, Prop)>) {
		if let Err(err) = self.app.create_instance(element, props) {
			error_log!(parent = self.instance.tag(), "failed to create child component: {err}");
		}
	}

	fn update_prop(&self, element: NodeId, name: &str, prop: Prop) {
		if let Some(child) = self.app.instance(element) {
			child.set_prop(name, prop);
		}
	}

	fn release(&self, node: NodeId) {
		self.app.release(node);
	}

	fn duplicate_keys(&self, site: &str, errors: &[DuplicateKeyError]) {
		if self.app.options().warn_duplicate_keys {
			for err in errors {
				warn_log!(tag = self.instance.tag(), site, "{err}");
			}
		}
	}
}
