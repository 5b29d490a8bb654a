//! Reconciler: patches a container toward a new render with minimal mutation.
//!
//! A render goes through two passes:
//!
//! 1. **Prepare** resolves every hole value against its compiled description:
//!    value counts, hole type checks, method names, attribute boolean rules. Any
//!    failure returns a [`RenderError`] before the document is touched.
//! 2. **Patch** walks the previous frame alongside the prepared one. Compatible
//!    templates (same call site) are updated hole by hole and keep their nodes;
//!    anything else is cleared and mounted fresh. Keyed lists move existing entries
//!    instead of recreating them.
//!
//! Components take part through [`RenderHost`]: the reconciler asks the host to
//! resolve method names and `x-model` bindings, and tells it when a component host
//! element appears, receives new props or is removed.
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_elements::{html, dom::Document, reconcile::{RenderRoot, StaticHost}};
//!
//! let doc = Document::new();
//! let mut root = RenderRoot::new(&doc, doc.body());
//! root.patch(&doc, html!("<p>{}</p>", 1), &StaticHost)?;
//! let p = doc.query(doc.body(), "p");
//! root.patch(&doc, html!("<p>{}</p>", 2), &StaticHost)?;
//! assert_eq!(doc.query(doc.body(), "p"), p);
//! ```

mod lis;
mod patcher;
mod prepare;

use reinhardt_reactive::Value;

use crate::callback::Callback;
use crate::directive::DuplicateKeyError;
use crate::dom::{Document, NodeId};
use crate::error::RenderError;
use crate::prop::Prop;
use crate::template::{HoleValue, TemplateResult};
use crate::warn_log;

use patcher::{Patcher, Region};
use prepare::prepare;

/// The reconciler's view of the component owning a render.
///
/// Every method has a default suited to rendering outside any component.
pub trait RenderHost {
	/// Resolves a method name used as an event binding.
	fn resolve_method(&self, _name: &str) -> Option<Callback> {
		None
	}

	/// Current value of the state property bound with `x-model`.
	fn model_value(&self, _key: &str) -> Value {
		Value::Null
	}

	/// Handler writing change events back to the `x-model` property.
	///
	/// Must return the same callback for the same key across renders, or the listener
	/// is rebound on every patch.
	fn model_writer(&self, _key: &str) -> Option<Callback> {
		None
	}

	/// Returns true if `tag` names a registered component.
	fn is_component(&self, _tag: &str) -> bool {
		false
	}

	/// Called once per patch for each component host element mounted by it.
	fn create_component(&self, _element: NodeId, _props: Vec<(String, Prop)>) {}

	/// Called when a prop of an already mounted component host changes.
	fn update_prop(&self, _element: NodeId, _name: &str, _prop: Prop) {}

	/// Called before `node` and its subtree are removed from the document.
	fn release(&self, _node: NodeId) {}

	/// Called when a keyed list contained duplicate keys.
	fn duplicate_keys(&self, site: &str, errors: &[DuplicateKeyError]) {
		for err in errors {
			warn_log!(site, "{err}");
		}
	}
}

/// Host for renders that belong to no component.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticHost;

impl RenderHost for StaticHost {}

/// The rendered content of one container.
///
/// A root owns a region appended to its container; nodes outside the region (for
/// example a component's injected `<style>`) are never touched.
#[derive(Debug)]
pub struct RenderRoot {
	container: NodeId,
	region: Region,
}

impl RenderRoot {
	/// Opens an empty root at the end of `container`.
	pub fn new(doc: &Document, container: NodeId) -> Self {
		let region = Patcher::new(doc, &StaticHost).open_region(container);
		Self { container, region }
	}

	/// Container the root renders into.
	pub fn container(&self) -> NodeId {
		self.container
	}

	/// Call site of the template currently rendered at the top level, if any.
	pub fn site(&self) -> Option<&'static str> {
		self.region.content.site()
	}

	/// Patches the root toward `next`.
	///
	/// On error nothing has been mutated and the previous frame stays in place.
	pub fn patch(
		&mut self,
		doc: &Document,
		next: impl Into<HoleValue>,
		host: &dyn RenderHost,
	) -> Result<NodeId, RenderError> {
		let prepared = prepare(next.into(), host)?;
		let mut patcher = Patcher::new(doc, host);
		patcher.update(&mut self.region, prepared);
		patcher.finish();
		Ok(self.container)
	}

	/// Removes the rendered content, keeping the root usable.
	pub fn clear(&mut self, doc: &Document, host: &dyn RenderHost) {
		Patcher::new(doc, host).clear(&mut self.region);
	}

	/// Removes the rendered content and the root's markers.
	pub fn remove(self, doc: &Document, host: &dyn RenderHost) {
		Patcher::new(doc, host).remove_region(self.region);
	}
}

/// Renders `next` into `container`, reusing `previous` when it renders there.
///
/// The first successful render stores a new root in `previous`; later calls patch it.
pub fn patch(
	doc: &Document,
	container: NodeId,
	previous: &mut Option<RenderRoot>,
	next: TemplateResult,
	host: &dyn RenderHost,
) -> Result<NodeId, RenderError> {
	if let Some(root) = previous.as_mut().filter(|root| root.container == container) {
		return root.patch(doc, next, host);
	}
	let mut root = RenderRoot::new(doc, container);
	match root.patch(doc, next, host) {
		Ok(node) => {
			if let Some(old) = previous.replace(root) {
				old.remove(doc, host);
			}
			Ok(node)
		}
		Err(err) => {
			root.remove(doc, host);
			Err(err)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::directive::{each, each_keyed, raw, when_else};
	use crate::dom::Event;
	use crate::html;
	use rstest::rstest;
	use std::cell::Cell;
	use std::rc::Rc;

	fn setup() -> (Document, RenderRoot) {
		let doc = Document::new();
		let root = RenderRoot::new(&doc, doc.body());
		(doc, root)
	}

	fn counter(count: i64, class: &str) -> TemplateResult {
		html!("<p class=\"{}\">Count: {}</p>", class, count)
	}

	fn keyed(keys: &[i64]) -> TemplateResult {
		html!(
			"<ul>{}</ul>",
			each_keyed(keys.iter().copied(), |k, _| *k, |k, _| html!("<li>{}</li>", k))
		)
	}

	fn items(doc: &Document) -> Vec<(NodeId, String)> {
		doc.query_all(doc.body(), "li")
			.into_iter()
			.map(|li| (li, doc.text_content(li)))
			.collect()
	}

	#[rstest]
	fn test_value_update_keeps_nodes() {
		let (doc, mut root) = setup();
		root.patch(&doc, counter(1, "a"), &StaticHost).unwrap();
		let p = doc.query(doc.body(), "p").unwrap();
		let before = doc.mutation_count();

		root.patch(&doc, counter(2, "a"), &StaticHost).unwrap();

		assert_eq!(doc.query(doc.body(), "p"), Some(p));
		assert_eq!(doc.text_content(p), "Count: 2");
		assert_eq!(doc.mutation_count() - before, 1);
	}

	#[rstest]
	fn test_unchanged_render_mutates_nothing() {
		let (doc, mut root) = setup();
		root.patch(&doc, counter(1, "a"), &StaticHost).unwrap();
		let before = doc.mutation_count();
		root.patch(&doc, counter(1, "a"), &StaticHost).unwrap();
		assert_eq!(doc.mutation_count(), before);
	}

	#[rstest]
	fn test_incompatible_template_remounts() {
		let (doc, mut root) = setup();
		root.patch(&doc, counter(1, "a"), &StaticHost).unwrap();
		let p = doc.query(doc.body(), "p").unwrap();

		root.patch(&doc, html!("<p>{}</p>", 1), &StaticHost).unwrap();

		assert_ne!(doc.query(doc.body(), "p"), Some(p));
		assert!(!doc.contains(p));
		assert_eq!(doc.inner_html(doc.body()), "<p>1</p>");
	}

	#[rstest]
	fn test_text_is_escaped_and_raw_is_not() {
		let (doc, mut root) = setup();
		root.patch(
			&doc,
			html!("<div>{}{}</div>", "<b>x</b>", raw("<i>y</i>")),
			&StaticHost,
		)
		.unwrap();
		assert_eq!(
			doc.inner_html(doc.body()),
			"<div>&lt;b&gt;x&lt;/b&gt;<i>y</i></div>"
		);
	}

	#[rstest]
	fn test_boolean_attribute_toggles() {
		let (doc, mut root) = setup();
		let view = |disabled: bool| html!("<button disabled=\"{}\">Go</button>", disabled);
		root.patch(&doc, view(true), &StaticHost).unwrap();
		let button = doc.query(doc.body(), "button").unwrap();
		assert!(doc.has_attribute(button, "disabled"));

		root.patch(&doc, view(false), &StaticHost).unwrap();
		assert!(!doc.has_attribute(button, "disabled"));
	}

	#[rstest]
	fn test_keyed_reorder_preserves_identity() {
		let (doc, mut root) = setup();
		root.patch(&doc, keyed(&[1, 2, 3, 4]), &StaticHost).unwrap();
		let before: Vec<_> = items(&doc);
		let stats = doc.stats();

		root.patch(&doc, keyed(&[4, 1, 2, 3]), &StaticHost).unwrap();

		let after = items(&doc);
		let texts: Vec<_> = after.iter().map(|(_, t)| t.as_str()).collect();
		assert_eq!(texts, vec!["4", "1", "2", "3"]);
		for (id, text) in &before {
			assert!(after.contains(&(*id, text.clone())));
		}
		// only the entry outside the stable run moves: two markers and the <li>
		assert_eq!(doc.stats().moved - stats.moved, 3);
		assert_eq!(doc.stats().created, stats.created);
	}

	#[rstest]
	fn test_keyed_insert_and_remove() {
		let (doc, mut root) = setup();
		root.patch(&doc, keyed(&[1, 2, 3]), &StaticHost).unwrap();
		let two = items(&doc)[1].0;

		root.patch(&doc, keyed(&[2, 5]), &StaticHost).unwrap();

		let after = items(&doc);
		assert_eq!(after[0].0, two);
		assert_eq!(after[1].1, "5");
		assert_eq!(after.len(), 2);
	}

	#[rstest]
	fn test_positional_list_grows_and_shrinks() {
		let (doc, mut root) = setup();
		let view = |n: usize| html!("<ol>{}</ol>", each(0..n, |i, _| html!("<li>{}</li>", i)));
		root.patch(&doc, view(2), &StaticHost).unwrap();
		let first = items(&doc)[0].0;
		root.patch(&doc, view(4), &StaticHost).unwrap();
		assert_eq!(items(&doc).len(), 4);
		root.patch(&doc, view(1), &StaticHost).unwrap();
		assert_eq!(items(&doc), vec![(first, "0".to_string())]);
	}

	#[rstest]
	fn test_branch_switch_remounts_and_same_branch_patches() {
		let (doc, mut root) = setup();
		let view = |on: bool, n: i64| {
			html!(
				"<div>{}</div>",
				when_else(on, || html!("<b>{}</b>", n), || html!("<i>off</i>"))
			)
		};
		root.patch(&doc, view(true, 1), &StaticHost).unwrap();
		let b = doc.query(doc.body(), "b").unwrap();
		root.patch(&doc, view(true, 2), &StaticHost).unwrap();
		assert_eq!(doc.query(doc.body(), "b"), Some(b));

		root.patch(&doc, view(false, 2), &StaticHost).unwrap();
		assert!(!doc.contains(b));
		assert_eq!(doc.inner_html(doc.body()), "<div><i>off</i></div>");
	}

	#[rstest]
	fn test_error_keeps_previous_frame() {
		let (doc, mut root) = setup();
		root.patch(&doc, counter(1, "a"), &StaticHost).unwrap();
		let html = doc.inner_html(doc.body());
		let before = doc.mutation_count();

		let err = root
			.patch(&doc, html!("<p>{}</p>", HoleValue::attrs([("a", 1)])), &StaticHost)
			.unwrap_err();

		assert!(matches!(err, RenderError::InvalidHoleValue { .. }));
		assert_eq!(doc.inner_html(doc.body()), html);
		assert_eq!(doc.mutation_count(), before);
	}

	#[rstest]
	fn test_handler_rebinds_only_when_changed() {
		let (doc, mut root) = setup();
		let clicks = Rc::new(Cell::new(0));
		let handler = {
			let clicks = clicks.clone();
			Callback::new(move |_| clicks.set(clicks.get() + 1))
		};
		let view = |h: Callback| html!("<button on-click=\"{}\">+</button>", h);

		root.patch(&doc, view(handler.clone()), &StaticHost).unwrap();
		let button = doc.query(doc.body(), "button").unwrap();
		root.patch(&doc, view(handler.clone()), &StaticHost).unwrap();

		doc.dispatch_event(button, &Event::native("click"));
		assert_eq!(clicks.get(), 1);
		assert_eq!(doc.listener_count(button), 1);
	}

	#[derive(Default)]
	struct LateDefinitionHost {
		defined: Cell<bool>,
		prop_updates: Cell<usize>,
	}

	impl RenderHost for LateDefinitionHost {
		fn is_component(&self, tag: &str) -> bool {
			self.defined.get() && tag == "x-late"
		}

		fn update_prop(&self, _element: NodeId, _name: &str, _prop: Prop) {
			self.prop_updates.set(self.prop_updates.get() + 1);
		}
	}

	fn late(title: &str) -> TemplateResult {
		html!("<x-late title=\"{}\"></x-late>", title)
	}

	#[rstest]
	fn test_element_defined_as_component_after_mount_keeps_attributes() {
		let (doc, mut root) = setup();
		let host = LateDefinitionHost::default();
		root.patch(&doc, late("a"), &host).unwrap();
		let element = doc.query(doc.body(), "x-late").unwrap();

		host.defined.set(true);
		root.patch(&doc, late("b"), &host).unwrap();

		assert_eq!(doc.query(doc.body(), "x-late"), Some(element));
		assert_eq!(doc.attribute(element, "title").as_deref(), Some("a"));
		assert_eq!(host.prop_updates.get(), 0);
	}

	#[rstest]
	fn test_patch_function_reuses_root() {
		let doc = Document::new();
		let mut previous = None;
		patch(&doc, doc.body(), &mut previous, counter(1, "a"), &StaticHost).unwrap();
		let p = doc.query(doc.body(), "p");
		patch(&doc, doc.body(), &mut previous, counter(2, "b"), &StaticHost).unwrap();
		assert_eq!(doc.query(doc.body(), "p"), p);
		assert_eq!(doc.inner_html(doc.body()), "<p class=\"b\">Count: 2</p>");
	}

	#[rstest]
	fn test_clear_removes_content() {
		let (doc, mut root) = setup();
		root.patch(&doc, counter(1, "a"), &StaticHost).unwrap();
		root.clear(&doc, &StaticHost);
		assert_eq!(doc.inner_html(doc.body()), "");
		assert_eq!(root.site(), None);
	}

	mod permutations {
		use super::*;
		use proptest::prelude::*;

		fn keys() -> impl Strategy<Value = Vec<i64>> {
			proptest::sample::subsequence((0..10).collect::<Vec<i64>>(), 0..=10)
				.prop_flat_map(|keys| Just(keys).prop_shuffle())
		}

		proptest! {
			#![proptest_config(ProptestConfig::with_cases(64))]

			#[test]
			fn test_keyed_patch_matches_order_and_keeps_survivors(old in keys(), new in keys()) {
				let (doc, mut root) = setup();
				root.patch(&doc, keyed(&old), &StaticHost).unwrap();
				let before = items(&doc);

				root.patch(&doc, keyed(&new), &StaticHost).unwrap();
				let after = items(&doc);

				let texts: Vec<String> = after.iter().map(|(_, t)| t.clone()).collect();
				let expected: Vec<String> = new.iter().map(i64::to_string).collect();
				prop_assert_eq!(texts, expected);
				for (id, text) in &before {
					if let Some((now, _)) = after.iter().find(|(_, t)| t == text) {
						prop_assert_eq!(now, id);
					}
				}
			}
		}
	}
}
