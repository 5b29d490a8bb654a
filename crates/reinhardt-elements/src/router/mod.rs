//! Hash-based client-side routing.
//!
//! A [`Router`] owns an outlet element and a route table. When the location hash of
//! its [`App`] changes, the first route whose pattern matches the path wins: the
//! previously routed component is unmounted and the route's component is mounted in
//! the outlet with a `params` prop holding the captured parameters.
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_elements::router::enable_routing;
//!
//! let router = enable_routing(
//!     &app,
//!     outlet,
//!     [("/", "x-home"), ("/shop/product/:id/", "x-product")],
//! )?;
//! router.not_found("x-not-found");
//! router.navigate("/shop/product/42/")?;
//!
//! // In x-product's template:
//! // ctx.prop_value("params").as_object().map(|p| p.get("id"))
//! ```

mod pattern;

pub use pattern::{RoutePattern, Segment};

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::component::App;
use crate::dom::{NodeId, NodeKind};
use crate::error::{ComponentError, RouterError};
use crate::prop::Prop;
use crate::{debug_log, info_log, warn_log};

/// Name of the prop routed components receive their parameters in.
pub const PARAMS_PROP: &str = "params";

/// A route table entry: a path pattern and the component tag it renders.
#[derive(Debug, Clone)]
pub struct Route {
	pattern: RoutePattern,
	tag: String,
}

impl Route {
	/// Creates a route. Fails if `pattern` does not parse.
	pub fn new(pattern: &str, tag: impl Into<String>) -> Result<Self, RouterError> {
		Ok(Self {
			pattern: RoutePattern::parse(pattern)?,
			tag: tag.into(),
		})
	}

	/// The compiled pattern.
	pub fn pattern(&self) -> &RoutePattern {
		&self.pattern
	}

	/// Tag of the routed component.
	pub fn tag(&self) -> &str {
		&self.tag
	}
}

/// The route currently shown in an outlet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
	/// Path that was routed
	pub path: String,
	/// Matching pattern, `None` for the not-found component
	pub pattern: Option<String>,
	/// Tag of the mounted component
	pub tag: String,
	/// Decoded parameters
	pub params: BTreeMap<String, String>,
	/// Host element of the mounted component
	pub host: NodeId,
}

struct RouterInner {
	app: App,
	outlet: Cell<NodeId>,
	routes: Vec<Route>,
	not_found: RefCell<Option<String>>,
	current: RefCell<Option<RouteMatch>>,
	listener: Cell<Option<usize>>,
}

impl Drop for RouterInner {
	fn drop(&mut self) {
		if let Some(id) = self.listener.take() {
			self.app.remove_location_listener(id);
		}
	}
}

/// A router bound to one outlet.
///
/// Cloning is cheap. When the last clone is dropped the router stops listening to
/// location changes; the component it mounted stays in place.
#[derive(Clone)]
pub struct Router {
	inner: Rc<RouterInner>,
}

/// Creates a router rendering into `outlet` and subscribes it to location changes of
/// `app`.
///
/// The current location is not routed until the location changes or
/// [`Router::handle_route`] is called, so a not-found component can be configured
/// first.
pub fn enable_routing<I, P, T>(app: &App, outlet: NodeId, routes: I) -> Result<Router, RouterError>
where
	I: IntoIterator<Item = (P, T)>,
	P: AsRef<str>,
	T: Into<String>,
{
	check_outlet(app, outlet)?;
	let routes = routes
		.into_iter()
		.map(|(pattern, tag)| Route::new(pattern.as_ref(), tag))
		.collect::<Result<Vec<_>, _>>()?;

	let inner = Rc::new(RouterInner {
		app: app.clone(),
		outlet: Cell::new(outlet),
		routes,
		not_found: RefCell::new(None),
		current: RefCell::new(None),
		listener: Cell::new(None),
	});
	let weak = Rc::downgrade(&inner);
	let id = app.add_location_listener(move |path| {
		if let Some(inner) = weak.upgrade() {
			let router = Router { inner };
			if let Err(err) = router.handle_route() {
				warn_log!(path, "routing failed: {err}");
			}
		}
	});
	inner.listener.set(Some(id));
	info_log!(routes = inner.routes.len(), "routing enabled");
	Ok(Router { inner })
}

fn check_outlet(app: &App, outlet: NodeId) -> Result<(), RouterError> {
	match app.document().kind(outlet) {
		Some(NodeKind::Element | NodeKind::ShadowRoot) => Ok(()),
		_ => Err(ComponentError::InvalidContainer(outlet.index()).into()),
	}
}

impl Router {
	/// Sets the location to `path` and routes it.
	pub fn navigate(&self, path: &str) -> Result<(), RouterError> {
		self.inner.app.set_location_hash(path);
		self.handle_route()
	}

	/// Routes the current location of the app.
	///
	/// Does nothing if the location is the path already shown. Otherwise unmounts
	/// the routed component and mounts the first matching route, or the not-found
	/// component. Without either the outlet is left empty and
	/// [`RouterError::NotFound`] is returned.
	pub fn handle_route(&self) -> Result<(), RouterError> {
		let app = &self.inner.app;
		let location = app.location_path();
		let path = strip_query(&location);

		let unchanged = self
			.inner
			.current
			.borrow()
			.as_ref()
			.is_some_and(|current| current.path == path && app.context(current.host).is_some());
		if unchanged {
			return Ok(());
		}

		let target = self.match_path(path).or_else(|| {
			self.inner
				.not_found
				.borrow()
				.clone()
				.map(|tag| (None, tag, BTreeMap::new()))
		});

		self.unmount_current();
		let Some((pattern, tag, params)) = target else {
			return Err(RouterError::NotFound(path.to_string()));
		};

		let params_json: serde_json::Map<String, serde_json::Value> = params
			.iter()
			.map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
			.collect();
		let host = app.mount(
			self.inner.outlet.get(),
			&tag,
			[(PARAMS_PROP, Prop::from(serde_json::Value::Object(params_json)))],
		)?;
		debug_log!(path, tag = %tag, "route mounted");
		*self.inner.current.borrow_mut() = Some(RouteMatch {
			path: path.to_string(),
			pattern,
			tag,
			params,
			host,
		});
		Ok(())
	}

	/// Moves routing to another outlet: the routed component is unmounted and the
	/// current location is routed into `outlet`.
	pub fn set_outlet(&self, outlet: NodeId) -> Result<(), RouterError> {
		check_outlet(&self.inner.app, outlet)?;
		self.unmount_current();
		self.inner.outlet.set(outlet);
		self.handle_route()
	}

	/// Component mounted when no route matches.
	pub fn not_found(&self, tag: impl Into<String>) {
		*self.inner.not_found.borrow_mut() = Some(tag.into());
	}

	/// The route currently shown, if any.
	pub fn current(&self) -> Option<RouteMatch> {
		self.inner.current.borrow().clone()
	}

	/// Outlet element.
	pub fn outlet(&self) -> NodeId {
		self.inner.outlet.get()
	}

	/// The route table, in match order.
	pub fn routes(&self) -> &[Route] {
		&self.inner.routes
	}

	/// First route matching `path`, as `(pattern, tag, params)`.
	pub fn match_path(&self, path: &str) -> Option<(Option<String>, String, BTreeMap<String, String>)> {
		self.inner.routes.iter().find_map(|route| {
			route.pattern.matches(path).map(|params| {
				(
					Some(route.pattern.pattern().to_string()),
					route.tag.clone(),
					params,
				)
			})
		})
	}

	/// Builds the path of the first route rendering `tag`.
	pub fn reverse<I, K, V>(&self, tag: &str, params: I) -> Result<String, RouterError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let route = self
			.inner
			.routes
			.iter()
			.find(|route| route.tag == tag)
			.ok_or_else(|| RouterError::UnknownRoute(tag.to_string()))?;
		let params: BTreeMap<String, String> = params
			.into_iter()
			.map(|(k, v)| (k.into(), v.into()))
			.collect();
		route.pattern.reverse(&params)
	}

	fn unmount_current(&self) {
		let previous = self.inner.current.borrow_mut().take();
		if let Some(previous) = previous
			&& self.inner.app.unmount(previous.host).is_err()
		{
			debug_log!(tag = %previous.tag, "routed component already gone");
		}
	}
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("outlet", &self.inner.outlet.get())
			.field("routes", &self.inner.routes.len())
			.field("current", &*self.inner.current.borrow())
			.finish()
	}
}

fn strip_query(path: &str) -> &str {
	path.split(['?', '#']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::{ComponentDefinition, Lifecycle};
	use crate::html;
	use rstest::{fixture, rstest};
	use serial_test::serial;
	use std::cell::RefCell;

	fn page(tag: &str, log: Rc<RefCell<Vec<String>>>) -> ComponentDefinition {
		let name = tag.to_string();
		ComponentDefinition::new(tag)
			.prop(PARAMS_PROP, serde_json::json!({}))
			.unmounted(move |_| log.borrow_mut().push(format!("unmounted {name}")))
			.template(|ctx| {
				let params = ctx.prop_value(PARAMS_PROP);
				let id = params
					.as_object()
					.map(|p| p.get("id"))
					.unwrap_or_default();
				Ok(html!("<p>{} {}</p>", ctx.tag(), id))
			})
	}

	struct Harness {
		app: App,
		outlet: NodeId,
		log: Rc<RefCell<Vec<String>>>,
	}

	#[fixture]
	fn harness() -> Harness {
		let app = App::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		for tag in ["x-home", "x-product", "x-any", "x-missing-page"] {
			app.define(page(tag, log.clone())).unwrap();
		}
		let outlet = app.document().create_element("main");
		app.document().append_child(app.document().body(), outlet);
		Harness { app, outlet, log }
	}

	fn routes() -> Vec<(&'static str, &'static str)> {
		vec![
			("/", "x-home"),
			("/shop/product/:id/", "x-product"),
			("/shop/*", "x-any"),
		]
	}

	fn outlet_html(h: &Harness) -> String {
		let children = h.app.document().children(h.outlet);
		children
			.iter()
			.map(|host| {
				let shadow = h.app.document().shadow_root(*host).unwrap();
				h.app.document().inner_html(shadow)
			})
			.collect()
	}

	#[rstest]
	#[serial(reactive)]
	fn test_navigate_mounts_with_params(harness: Harness) {
		let router = enable_routing(&harness.app, harness.outlet, routes()).unwrap();

		router.navigate("/shop/product/42/").unwrap();

		assert_eq!(outlet_html(&harness), "<p>x-product 42</p>");
		let current = router.current().unwrap();
		assert_eq!(current.tag, "x-product");
		assert_eq!(current.pattern.as_deref(), Some("/shop/product/:id/"));
		assert_eq!(current.params.get("id").map(String::as_str), Some("42"));
		assert_eq!(harness.app.location_hash(), "#/shop/product/42/");
	}

	#[rstest]
	#[serial(reactive)]
	fn test_first_match_wins(harness: Harness) {
		let router = enable_routing(&harness.app, harness.outlet, routes()).unwrap();
		router.navigate("/shop/product/7").unwrap();
		assert_eq!(router.current().unwrap().tag, "x-product");

		router.navigate("/shop/product/7/reviews").unwrap();
		assert_eq!(router.current().unwrap().tag, "x-any");
	}

	#[rstest]
	#[serial(reactive)]
	fn test_route_change_unmounts_previous(harness: Harness) {
		let router = enable_routing(&harness.app, harness.outlet, routes()).unwrap();
		router.navigate("/").unwrap();
		let home = router.current().unwrap().host;

		router.navigate("/shop/product/1/").unwrap();

		assert_eq!(*harness.log.borrow(), vec!["unmounted x-home"]);
		assert!(!harness.app.document().contains(home));
		assert_eq!(harness.app.document().children(harness.outlet).len(), 1);
	}

	#[rstest]
	#[serial(reactive)]
	fn test_same_path_keeps_component(harness: Harness) {
		let router = enable_routing(&harness.app, harness.outlet, routes()).unwrap();
		router.navigate("/shop/product/1/").unwrap();
		let host = router.current().unwrap().host;

		router.handle_route().unwrap();
		router.navigate("/shop/product/1/").unwrap();

		assert_eq!(router.current().unwrap().host, host);
		assert_eq!(harness.app.lifecycle(host), Some(Lifecycle::Mounted));
		assert!(harness.log.borrow().is_empty());
	}

	#[rstest]
	#[serial(reactive)]
	fn test_location_change_routes_without_navigate(harness: Harness) {
		let router = enable_routing(&harness.app, harness.outlet, routes()).unwrap();

		harness.app.set_location_hash("#/shop/product/9/?ref=mail");

		assert_eq!(router.current().unwrap().params.get("id").unwrap(), "9");
	}

	#[rstest]
	#[serial(reactive)]
	fn test_not_found(harness: Harness) {
		let router = enable_routing(&harness.app, harness.outlet, routes()).unwrap();
		router.navigate("/").unwrap();

		let err = router.navigate("/nowhere").unwrap_err();
		assert!(matches!(err, RouterError::NotFound(path) if path == "/nowhere"));
		assert!(router.current().is_none());
		assert!(harness.app.document().children(harness.outlet).is_empty());

		router.not_found("x-missing-page");
		router.handle_route().unwrap();
		let current = router.current().unwrap();
		assert_eq!(current.tag, "x-missing-page");
		assert_eq!(current.pattern, None);
	}

	#[rstest]
	#[serial(reactive)]
	fn test_set_outlet_moves_routed_component(harness: Harness) {
		let router = enable_routing(&harness.app, harness.outlet, routes()).unwrap();
		router.navigate("/").unwrap();
		let aside = harness.app.document().create_element("aside");
		harness
			.app
			.document()
			.append_child(harness.app.document().body(), aside);

		router.set_outlet(aside).unwrap();

		assert!(harness.app.document().children(harness.outlet).is_empty());
		assert_eq!(harness.app.document().children(aside).len(), 1);
		assert_eq!(router.outlet(), aside);
	}

	#[rstest]
	#[serial(reactive)]
	fn test_invalid_outlet_and_pattern(harness: Harness) {
		let text = harness.app.document().create_text("x");
		assert!(matches!(
			enable_routing(&harness.app, text, routes()),
			Err(RouterError::Component(ComponentError::InvalidContainer(_)))
		));
		assert!(matches!(
			enable_routing(&harness.app, harness.outlet, [("shop", "x-any")]),
			Err(RouterError::InvalidPattern { .. })
		));
	}

	#[rstest]
	#[serial(reactive)]
	fn test_reverse(harness: Harness) {
		let router = enable_routing(&harness.app, harness.outlet, routes()).unwrap();
		assert_eq!(
			router.reverse("x-product", [("id", "42")]).unwrap(),
			"/shop/product/42/"
		);
		assert!(matches!(
			router.reverse("x-nope", Vec::<(String, String)>::new()),
			Err(RouterError::UnknownRoute(_))
		));
	}

	#[rstest]
	#[serial(reactive)]
	fn test_dropped_router_stops_listening(harness: Harness) {
		let router = enable_routing(&harness.app, harness.outlet, routes()).unwrap();
		router.navigate("/").unwrap();
		drop(router);

		harness.app.set_location_hash("/shop/product/3/");

		assert_eq!(outlet_html(&harness), "<p>x-home </p>");
	}
}
