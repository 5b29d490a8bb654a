//! The application: component registry, mounted instances and location.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use reinhardt_reactive::{FlushReport, ReactiveObject, batch, flush_updates, with_runtime};

use crate::dom::{Document, Event, NodeId, NodeKind};
use crate::error::{ComponentError, RenderError, Result};
use crate::options::AppOptions;
use crate::prop::Prop;
use crate::{debug_log, error_log, info_log};

use super::instance::{ComponentInstance, InstanceParts, Lifecycle};
use super::{ComponentDefinition, Context};

type LocationListener = Rc<dyn Fn(&str)>;

/// A render error no error boundary captured.
#[derive(Debug, Clone)]
pub struct UnhandledRenderError {
	/// Tag of the failing component
	pub tag: String,
	/// Host element of the failing component
	pub host: NodeId,
	/// What went wrong
	pub error: RenderError,
}

pub(crate) struct AppInner {
	document: Document,
	options: AppOptions,
	registry: RefCell<HashMap<String, Rc<ComponentDefinition>>>,
	instances: RefCell<HashMap<NodeId, Rc<ComponentInstance>>>,
	render_errors: RefCell<Vec<UnhandledRenderError>>,
	location: RefCell<String>,
	location_listeners: RefCell<Vec<(usize, LocationListener)>>,
	next_listener: Cell<usize>,
}

/// A component application bound to one document.
///
/// Cloning is cheap; clones share the registry, the instances and the location.
///
/// # Example
///
/// ```ignore
/// use reinhardt_elements::{component::{App, ComponentDefinition}, html};
///
/// let app = App::new();
/// app.define(
///     ComponentDefinition::new("x-hello")
///         .prop("name", "world")
///         .template(|ctx| Ok(html!("<p>Hello {}</p>", ctx.prop_value("name")))),
/// )?;
/// let host = app.mount(app.document().body(), "x-hello", [("name", "reinhardt")])?;
/// ```
#[derive(Clone)]
pub struct App {
	inner: Rc<AppInner>,
}

impl App {
	/// Creates an application on a fresh document with default options.
	pub fn new() -> Self {
		Self::with_options(AppOptions::default())
	}

	/// Creates an application on a fresh document.
	pub fn with_options(options: AppOptions) -> Self {
		Self::with_document(Document::new(), options)
	}

	/// Creates an application rendering into `document`.
	pub fn with_document(document: Document, options: AppOptions) -> Self {
		with_runtime(|rt| rt.set_max_passes(options.max_flush_passes));
		let location = options.hash_prefix.clone();
		Self {
			inner: Rc::new(AppInner {
				document,
				options,
				registry: RefCell::new(HashMap::new()),
				instances: RefCell::new(HashMap::new()),
				render_errors: RefCell::new(Vec::new()),
				location: RefCell::new(location),
				location_listeners: RefCell::new(Vec::new()),
				next_listener: Cell::new(0),
			}),
		}
	}

	pub(crate) fn from_inner(inner: Rc<AppInner>) -> Self {
		Self { inner }
	}

	/// Document the application renders into.
	pub fn document(&self) -> &Document {
		&self.inner.document
	}

	/// Application options.
	pub fn options(&self) -> &AppOptions {
		&self.inner.options
	}

	/// Returns true if both handles refer to the same application.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// Registers a component definition.
	pub fn define(&self, definition: ComponentDefinition) -> Result<()> {
		definition.validate()?;
		let mut registry = self.inner.registry.borrow_mut();
		if registry.contains_key(&definition.tag) {
			return Err(ComponentError::AlreadyDefined(definition.tag));
		}
		debug_log!(tag = %definition.tag, "component defined");
		registry.insert(definition.tag.clone(), Rc::new(definition));
		Ok(())
	}

	/// Returns true if `tag` is registered.
	pub fn is_defined(&self, tag: &str) -> bool {
		self.inner.registry.borrow().contains_key(tag)
	}

	/// Creates a `tag` host element at the end of `container` and mounts an instance
	/// on it. Returns the host.
	///
	/// The first render happens before this returns; writes made by `mounted` hooks are
	/// flushed as well.
	pub fn mount<I, K, V>(&self, container: NodeId, tag: &str, props: I) -> Result<NodeId>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<Prop>,
	{
		let doc = self.document();
		if !matches!(
			doc.kind(container),
			Some(NodeKind::Element | NodeKind::ShadowRoot)
		) {
			return Err(ComponentError::InvalidContainer(container.index()));
		}
		if !self.is_defined(tag) {
			return Err(ComponentError::NotDefined(tag.to_string()));
		}
		let props = props
			.into_iter()
			.map(|(k, v)| (k.into(), v.into()))
			.collect();
		let host = doc.create_element(tag);
		doc.append_child(container, host);
		match batch(|| self.create_instance(host, props)) {
			Ok(()) => {
				info_log!(tag, host = %host, "component mounted");
				Ok(host)
			}
			Err(err) => {
				doc.remove(host);
				Err(err)
			}
		}
	}

	/// Unmounts the instance on `host`, every component below it, and removes the
	/// host element.
	pub fn unmount(&self, host: NodeId) -> Result<()> {
		if self.instance(host).is_none() {
			return Err(ComponentError::NotMounted(host.index()));
		}
		self.release(host);
		self.document().remove(host);
		Ok(())
	}

	/// Context of the instance mounted on `host`.
	pub fn context(&self, host: NodeId) -> Option<Context> {
		self.instance(host).map(Context::new)
	}

	/// Lifecycle state of the instance on `host`.
	pub fn lifecycle(&self, host: NodeId) -> Option<Lifecycle> {
		self.instance(host).map(|instance| instance.status())
	}

	/// Number of times the template of the instance on `host` has run.
	pub fn render_count(&self, host: NodeId) -> Option<usize> {
		self.instance(host).map(|instance| instance.render_count())
	}

	/// Hosts of every mounted instance of `tag`, in document order of creation.
	pub fn hosts_of(&self, tag: &str) -> Vec<NodeId> {
		let mut hosts: Vec<NodeId> = self
			.inner
			.instances
			.borrow()
			.values()
			.filter(|instance| instance.tag() == tag)
			.map(|instance| instance.host)
			.collect();
		hosts.sort();
		hosts
	}

	/// Dispatches `event` at `target` as one turn: state written by handlers is
	/// rendered once, after the dispatch.
	pub fn dispatch(&self, target: NodeId, event: Event) -> bool {
		batch(|| self.document().dispatch_event(target, &event))
	}

	/// Renders every queued component.
	pub fn flush(&self) -> FlushReport {
		flush_updates()
	}

	/// Drains the render errors no error boundary captured.
	pub fn take_render_errors(&self) -> Vec<UnhandledRenderError> {
		std::mem::take(&mut *self.inner.render_errors.borrow_mut())
	}

	/// Current location hash, including the prefix (`#/shop`).
	pub fn location_hash(&self) -> String {
		self.inner.location.borrow().clone()
	}

	/// Path part of the location hash (`/shop`). An empty hash is `/`.
	pub fn location_path(&self) -> String {
		let hash = self.location_hash();
		let path = hash
			.strip_prefix(self.inner.options.hash_prefix.as_str())
			.unwrap_or(&hash);
		if path.is_empty() {
			"/".to_string()
		} else {
			path.to_string()
		}
	}

	/// Sets the location hash and notifies routers, like a `hashchange` event.
	///
	/// `hash` may be given with or without the prefix. Setting the current hash again
	/// notifies nobody.
	pub fn set_location_hash(&self, hash: &str) {
		let prefix = self.inner.options.hash_prefix.as_str();
		let normalized = if hash.starts_with(prefix) {
			hash.to_string()
		} else {
			format!("{prefix}{hash}")
		};
		if *self.inner.location.borrow() == normalized {
			return;
		}
		*self.inner.location.borrow_mut() = normalized;
		let listeners: Vec<LocationListener> = self
			.inner
			.location_listeners
			.borrow()
			.iter()
			.map(|(_, listener)| listener.clone())
			.collect();
		let path = self.location_path();
		batch(|| {
			for listener in listeners {
				listener(&path);
			}
		});
	}

	pub(crate) fn add_location_listener(&self, listener: impl Fn(&str) + 'static) -> usize {
		let id = self.inner.next_listener.get();
		self.inner.next_listener.set(id + 1);
		self.inner
			.location_listeners
			.borrow_mut()
			.push((id, Rc::new(listener)));
		id
	}

	pub(crate) fn remove_location_listener(&self, id: usize) {
		self.inner
			.location_listeners
			.borrow_mut()
			.retain(|(listener, _)| *listener != id);
	}

	pub(crate) fn instance(&self, host: NodeId) -> Option<Rc<ComponentInstance>> {
		self.inner.instances.borrow().get(&host).cloned()
	}

	fn definition(&self, tag: &str) -> Option<Rc<ComponentDefinition>> {
		self.inner.registry.borrow().get(tag).cloned()
	}

	/// Mounts an instance on an existing host element and renders it.
	pub(crate) fn create_instance(&self, host: NodeId, props: Vec<(String, Prop)>) -> Result<()> {
		let doc = self.document();
		let tag = doc
			.tag(host)
			.ok_or(ComponentError::InvalidContainer(host.index()))?;
		if self.inner.instances.borrow().contains_key(&host) {
			return Ok(());
		}
		let definition = self
			.definition(&tag)
			.ok_or_else(|| ComponentError::NotDefined(tag.clone()))?;
		let state = match &definition.data {
			Some(data) => ReactiveObject::from_json(data())
				.map_err(|source| ComponentError::InvalidState { tag: tag.clone(), source })?,
			None => ReactiveObject::new(),
		};
		let shadow = doc
			.attach_shadow(host)
			.ok_or(ComponentError::InvalidContainer(host.index()))?;
		if self.inner.options.inject_styles
			&& let Some(css) = &definition.styles
		{
			let style = doc.create_element("style");
			let text = doc.create_text(css);
			doc.append_child(style, text);
			doc.append_child(shadow, style);
		}

		let instance = ComponentInstance::new(InstanceParts {
			definition,
			app: Rc::downgrade(&self.inner),
			document: doc.clone(),
			host,
			shadow,
			state,
			props,
		});
		instance.register();
		self.inner
			.instances
			.borrow_mut()
			.insert(host, instance.clone());
		instance.render();
		Ok(())
	}

	/// Unmounts every instance hosted by `node` or its descendants, innermost first.
	pub(crate) fn release(&self, node: NodeId) {
		let doc = self.document();
		let mut nodes = vec![node];
		nodes.extend(doc.descendants(node, true));
		let released: Vec<Rc<ComponentInstance>> = {
			let mut instances = self.inner.instances.borrow_mut();
			nodes
				.iter()
				.rev()
				.filter_map(|id| instances.remove(id))
				.collect()
		};
		for instance in released {
			instance.unmount();
		}
	}

	/// Routes a render failure to the nearest error boundary above `failed`, or records
	/// it as unhandled.
	pub(crate) fn report_render_error(&self, failed: &ComponentInstance, error: RenderError) {
		let doc = self.document();
		let mut cursor = doc
			.parent(failed.host)
			.or_else(|| doc.shadow_host(failed.host));
		while let Some(node) = cursor {
			if let Some(boundary) = self
				.instance(node)
				.filter(|instance| instance.definition.is_error_boundary() && instance.is_alive())
			{
				boundary.capture(failed, error);
				return;
			}
			cursor = doc.parent(node).or_else(|| doc.shadow_host(node));
		}
		error_log!(tag = failed.tag(), host = %failed.host, "unhandled render error: {error}");
		self.inner
			.render_errors
			.borrow_mut()
			.push(UnhandledRenderError {
				tag: failed.tag().to_string(),
				host: failed.host,
				error,
			});
	}
}

impl Default for App {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for App {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("App")
			.field("components", &self.inner.registry.borrow().len())
			.field("instances", &self.inner.instances.borrow().len())
			.field("location", &self.inner.location.borrow())
			.finish()
	}
}
