//! In-memory document: the live render surface.
//!
//! A [`Document`] is an arena of nodes addressed by [`NodeId`]. Ids are never reused, so
//! a `NodeId` is the node's identity: the reconciler promises that patching a
//! shape-compatible render leaves the ids of existing nodes untouched.
//!
//! The document supports what the engine needs from a browser DOM:
//!
//! - elements, text, comments and invisible markers (range delimiters for dynamic
//!   content, never serialized)
//! - open shadow roots attached to host elements, with `<slot>` projection
//! - listeners and event dispatch with bubbling, shadow boundary crossing
//!   and retargeting
//! - HTML serialization ([`Document::to_html`]) with declarative shadow roots
//! - mutation counters ([`Document::stats`])
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_elements::dom::{Document, Event};
//!
//! let doc = Document::new();
//! let button = doc.create_element("button");
//! doc.append_child(doc.body(), button);
//! doc.add_listener(button, "click", Callback::new(|_| println!("hi")), Default::default());
//! doc.dispatch_event(button, &Event::native("click"));
//! ```

mod event;
pub mod html;

pub use event::{Event, ListenerOptions};
pub use html::{BOOLEAN_ATTRS, html_escape, is_boolean_attr};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use reinhardt_reactive::Value;

use crate::callback::{Callback, panic_message};
use crate::error_log;
use crate::markup::{self, MarkupAttr, MarkupNode, Mode, Piece};

/// Identity of a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
	/// Arena index.
	pub fn index(self) -> usize {
		self.0
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Identity of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
	/// Element with a tag and attributes
	Element,
	/// Text node
	Text,
	/// Comment
	Comment,
	/// Invisible range delimiter
	Marker,
	/// Shadow root of a host element
	ShadowRoot,
}

/// Counters of document mutations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationStats {
	/// Nodes created
	pub created: usize,
	/// Detached nodes inserted into a parent
	pub inserted: usize,
	/// Attached nodes moved to another position
	pub moved: usize,
	/// Nodes removed
	pub removed: usize,
	/// Text data changes
	pub text_updates: usize,
	/// Attribute writes
	pub attribute_sets: usize,
	/// Attribute removals
	pub attribute_removals: usize,
}

impl MutationStats {
	/// Number of changes to the tree (creation of detached nodes excluded).
	pub fn total(&self) -> usize {
		self.inserted
			+ self.moved
			+ self.removed
			+ self.text_updates
			+ self.attribute_sets
			+ self.attribute_removals
	}
}

#[derive(Debug)]
pub(crate) enum Payload {
	Element {
		tag: String,
		attrs: Vec<(String, String)>,
		shadow: Option<NodeId>,
	},
	Text(String),
	Comment(String),
	Marker,
	ShadowRoot {
		host: NodeId,
	},
}

struct Listener {
	id: ListenerId,
	event: String,
	callback: Callback,
	options: ListenerOptions,
}

pub(crate) struct NodeData {
	pub(crate) payload: Payload,
	parent: Option<NodeId>,
	pub(crate) children: Vec<NodeId>,
	listeners: Vec<Listener>,
	discarded: bool,
}

struct DocumentInner {
	nodes: RefCell<Vec<NodeData>>,
	body: NodeId,
	stats: Cell<MutationStats>,
	next_listener: Cell<u64>,
}

/// Handle to an in-memory document. Cloning is cheap and shares the document.
#[derive(Clone)]
pub struct Document {
	inner: Rc<DocumentInner>,
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Document {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Document")
			.field("nodes", &self.inner.nodes.borrow().len())
			.field("stats", &self.inner.stats.get())
			.finish()
	}
}

impl Document {
	/// Creates a document containing an empty `<body>`.
	pub fn new() -> Self {
		let body = NodeData {
			payload: Payload::Element {
				tag: "body".to_string(),
				attrs: Vec::new(),
				shadow: None,
			},
			parent: None,
			children: Vec::new(),
			listeners: Vec::new(),
			discarded: false,
		};
		Self {
			inner: Rc::new(DocumentInner {
				nodes: RefCell::new(vec![body]),
				body: NodeId(0),
				stats: Cell::new(MutationStats::default()),
				next_listener: Cell::new(0),
			}),
		}
	}

	/// The `<body>` element.
	pub fn body(&self) -> NodeId {
		self.inner.body
	}

	/// Returns true if both handles refer to the same document.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	fn bump(&self, f: impl FnOnce(&mut MutationStats)) {
		let mut stats = self.inner.stats.get();
		f(&mut stats);
		self.inner.stats.set(stats);
	}

	/// Mutation counters since creation.
	pub fn stats(&self) -> MutationStats {
		self.inner.stats.get()
	}

	/// Number of tree changes since creation.
	pub fn mutation_count(&self) -> usize {
		self.stats().total()
	}

	fn live<R>(&self, id: NodeId, f: impl FnOnce(&NodeData) -> R) -> Option<R> {
		let nodes = self.inner.nodes.borrow();
		nodes.get(id.0).filter(|n| !n.discarded).map(f)
	}

	fn live_mut<R>(&self, id: NodeId, f: impl FnOnce(&mut NodeData) -> R) -> Option<R> {
		let mut nodes = self.inner.nodes.borrow_mut();
		nodes.get_mut(id.0).filter(|n| !n.discarded).map(f)
	}

	fn alloc(&self, payload: Payload) -> NodeId {
		let mut nodes = self.inner.nodes.borrow_mut();
		let id = NodeId(nodes.len());
		nodes.push(NodeData {
			payload,
			parent: None,
			children: Vec::new(),
			listeners: Vec::new(),
			discarded: false,
		});
		drop(nodes);
		self.bump(|s| s.created += 1);
		id
	}

	/// Creates a detached element.
	pub fn create_element(&self, tag: &str) -> NodeId {
		self.alloc(Payload::Element {
			tag: tag.to_ascii_lowercase(),
			attrs: Vec::new(),
			shadow: None,
		})
	}

	/// Creates a detached text node.
	pub fn create_text(&self, data: &str) -> NodeId {
		self.alloc(Payload::Text(data.to_string()))
	}

	/// Creates a detached comment.
	pub fn create_comment(&self, data: &str) -> NodeId {
		self.alloc(Payload::Comment(data.to_string()))
	}

	/// Creates a detached marker.
	pub fn create_marker(&self) -> NodeId {
		self.alloc(Payload::Marker)
	}

	/// Attaches an open shadow root to `host`, or returns the existing one.
	///
	/// Returns `None` if `host` is not a live element.
	pub fn attach_shadow(&self, host: NodeId) -> Option<NodeId> {
		let existing = self.live(host, |n| match &n.payload {
			Payload::Element { shadow, .. } => Some(*shadow),
			_ => None,
		})??;
		if let Some(root) = existing {
			return Some(root);
		}
		let root = self.alloc(Payload::ShadowRoot { host });
		self.live_mut(host, |n| {
			if let Payload::Element { shadow, .. } = &mut n.payload {
				*shadow = Some(root);
			}
		});
		Some(root)
	}

	/// Shadow root attached to `host`.
	pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
		self.live(host, |n| match &n.payload {
			Payload::Element { shadow, .. } => *shadow,
			_ => None,
		})
		.flatten()
	}

	/// Host element of a shadow root.
	pub fn shadow_host(&self, root: NodeId) -> Option<NodeId> {
		self.live(root, |n| match &n.payload {
			Payload::ShadowRoot { host } => Some(*host),
			_ => None,
		})
		.flatten()
	}

	/// Returns true if `node` exists and has not been removed.
	pub fn contains(&self, node: NodeId) -> bool {
		self.live(node, |_| ()).is_some()
	}

	/// Kind of `node`.
	pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
		self.live(node, |n| match n.payload {
			Payload::Element { .. } => NodeKind::Element,
			Payload::Text(_) => NodeKind::Text,
			Payload::Comment(_) => NodeKind::Comment,
			Payload::Marker => NodeKind::Marker,
			Payload::ShadowRoot { .. } => NodeKind::ShadowRoot,
		})
	}

	/// Tag name of an element.
	pub fn tag(&self, node: NodeId) -> Option<String> {
		self.live(node, |n| match &n.payload {
			Payload::Element { tag, .. } => Some(tag.clone()),
			_ => None,
		})
		.flatten()
	}

	/// Parent of `node`. Shadow roots have no parent; see [`Document::shadow_host`].
	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.live(node, |n| n.parent).flatten()
	}

	/// Children of `node`, in order.
	pub fn children(&self, node: NodeId) -> Vec<NodeId> {
		self.live(node, |n| n.children.clone()).unwrap_or_default()
	}

	/// First child of `node`.
	pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
		self.live(node, |n| n.children.first().copied()).flatten()
	}

	/// Next sibling of `node`.
	pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
		self.sibling(node, 1)
	}

	/// Previous sibling of `node`.
	pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
		self.sibling(node, -1)
	}

	fn sibling(&self, node: NodeId, offset: isize) -> Option<NodeId> {
		let parent = self.parent(node)?;
		let nodes = self.inner.nodes.borrow();
		let siblings = &nodes.get(parent.0)?.children;
		let index = siblings.iter().position(|c| *c == node)?;
		let target = index.checked_add_signed(offset)?;
		siblings.get(target).copied()
	}

	/// Appends `child` to `parent`, moving it if it is attached elsewhere.
	pub fn append_child(&self, parent: NodeId, child: NodeId) {
		self.insert_before(parent, child, None);
	}

	/// Inserts `child` into `parent` before `reference` (or last when `None` or when
	/// `reference` is not a child of `parent`). An attached `child` is moved.
	pub fn insert_before(&self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
		if parent == child || !self.contains(parent) || !self.contains(child) {
			return;
		}
		let moved = {
			let mut nodes = self.inner.nodes.borrow_mut();
			let old_parent = nodes[child.0].parent;
			if let Some(old) = old_parent {
				nodes[old.0].children.retain(|c| *c != child);
			}
			let siblings = &mut nodes[parent.0].children;
			let position = reference
				.and_then(|r| siblings.iter().position(|c| *c == r))
				.unwrap_or(siblings.len());
			siblings.insert(position, child);
			nodes[child.0].parent = Some(parent);
			old_parent.is_some()
		};
		if moved {
			self.bump(|s| s.moved += 1);
		} else {
			self.bump(|s| s.inserted += 1);
		}
	}

	/// Detaches `node` from its parent. The node stays alive and can be reinserted.
	pub fn detach(&self, node: NodeId) -> bool {
		let mut nodes = self.inner.nodes.borrow_mut();
		let Some(parent) = nodes.get(node.0).filter(|n| !n.discarded).and_then(|n| n.parent)
		else {
			return false;
		};
		nodes[parent.0].children.retain(|c| *c != node);
		nodes[node.0].parent = None;
		true
	}

	/// Removes `node` and discards its subtree, shadow roots and listeners included.
	pub fn remove(&self, node: NodeId) {
		if !self.contains(node) || node == self.inner.body {
			return;
		}
		self.detach(node);
		let mut nodes = self.inner.nodes.borrow_mut();
		let mut stack = vec![node];
		while let Some(id) = stack.pop() {
			let data = &mut nodes[id.0];
			data.discarded = true;
			data.listeners.clear();
			stack.extend(data.children.iter().copied());
			if let Payload::Element {
				shadow: Some(root), ..
			} = &data.payload
			{
				stack.push(*root);
			}
		}
		drop(nodes);
		self.bump(|s| s.removed += 1);
	}

	/// Sets an attribute, recording a mutation only when the value changes.
	pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
		let changed = self
			.live_mut(node, |n| match &mut n.payload {
				Payload::Element { attrs, .. } => {
					match attrs.iter_mut().find(|(k, _)| k == name) {
						Some((_, v)) if v == value => false,
						Some((_, v)) => {
							*v = value.to_string();
							true
						}
						None => {
							attrs.push((name.to_string(), value.to_string()));
							true
						}
					}
				}
				_ => false,
			})
			.unwrap_or(false);
		if changed {
			self.bump(|s| s.attribute_sets += 1);
		}
	}

	/// Removes an attribute. Returns true if it was present.
	pub fn remove_attribute(&self, node: NodeId, name: &str) -> bool {
		let removed = self
			.live_mut(node, |n| match &mut n.payload {
				Payload::Element { attrs, .. } => {
					let before = attrs.len();
					attrs.retain(|(k, _)| k != name);
					attrs.len() != before
				}
				_ => false,
			})
			.unwrap_or(false);
		if removed {
			self.bump(|s| s.attribute_removals += 1);
		}
		removed
	}

	/// Value of an attribute.
	pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
		self.live(node, |n| match &n.payload {
			Payload::Element { attrs, .. } => attrs
				.iter()
				.find(|(k, _)| k == name)
				.map(|(_, v)| v.clone()),
			_ => None,
		})
		.flatten()
	}

	/// Returns true if the attribute is present.
	pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
		self.attribute(node, name).is_some()
	}

	/// All attributes in insertion order.
	pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
		self.live(node, |n| match &n.payload {
			Payload::Element { attrs, .. } => attrs.clone(),
			_ => Vec::new(),
		})
		.unwrap_or_default()
	}

	/// Replaces the data of a text node or comment.
	pub fn set_text(&self, node: NodeId, data: &str) {
		let changed = self
			.live_mut(node, |n| match &mut n.payload {
				Payload::Text(current) | Payload::Comment(current) if current != data => {
					*current = data.to_string();
					true
				}
				_ => false,
			})
			.unwrap_or(false);
		if changed {
			self.bump(|s| s.text_updates += 1);
		}
	}

	/// Data of a text node or comment.
	pub fn text(&self, node: NodeId) -> Option<String> {
		self.live(node, |n| match &n.payload {
			Payload::Text(data) | Payload::Comment(data) => Some(data.clone()),
			_ => None,
		})
		.flatten()
	}

	/// Concatenated text of the light-tree descendants of `node`.
	pub fn text_content(&self, node: NodeId) -> String {
		let mut out = String::new();
		for id in std::iter::once(node).chain(self.descendants(node, false)) {
			let data = self.live(id, |n| match &n.payload {
				Payload::Text(data) => Some(data.clone()),
				_ => None,
			});
			if let Some(data) = data.flatten() {
				out.push_str(&data);
			}
		}
		out
	}

	/// Simulates the user typing into an input-like element.
	pub fn set_value(&self, node: NodeId, value: &str) {
		self.set_attribute(node, "value", value);
	}

	/// Simulates the user toggling a checkbox.
	pub fn set_checked(&self, node: NodeId, checked: bool) {
		if checked {
			self.set_attribute(node, "checked", "");
		} else {
			self.remove_attribute(node, "checked");
		}
	}

	/// Pre-order descendants of `node` (excluding `node`). With `deep`, shadow roots and
	/// their content are included, each shadow root before the host's light children.
	pub fn descendants(&self, node: NodeId, deep: bool) -> Vec<NodeId> {
		let nodes = self.inner.nodes.borrow();
		let mut out = Vec::new();
		let mut stack = Vec::new();
		let push_children = |id: NodeId, stack: &mut Vec<NodeId>| {
			let Some(data) = nodes.get(id.0) else { return };
			for child in data.children.iter().rev() {
				stack.push(*child);
			}
			if deep
				&& let Payload::Element {
					shadow: Some(root), ..
				} = &data.payload
			{
				stack.push(*root);
			}
		};
		push_children(node, &mut stack);
		while let Some(id) = stack.pop() {
			out.push(id);
			push_children(id, &mut stack);
		}
		out
	}

	/// Elements with tag `tag` under `root`, through shadow roots, in tree order.
	pub fn query_all(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
		self.descendants(root, true)
			.into_iter()
			.filter(|id| self.tag(*id).is_some_and(|t| t == tag))
			.collect()
	}

	/// First element with tag `tag` under `root`, through shadow roots.
	pub fn query(&self, root: NodeId, tag: &str) -> Option<NodeId> {
		self.query_all(root, tag).into_iter().next()
	}

	/// Returns true if `node` is reachable from `<body>`, crossing shadow roots.
	pub fn is_connected(&self, node: NodeId) -> bool {
		let mut current = node;
		loop {
			if current == self.inner.body {
				return true;
			}
			match self.parent(current).or_else(|| self.shadow_host(current)) {
				Some(next) => current = next,
				None => return false,
			}
		}
	}

	/// Light children of the slot's shadow host assigned to `slot`.
	///
	/// A `<slot name="x">` receives children with `slot="x"`; the unnamed slot receives
	/// the rest, excluding markers and whitespace-only text.
	pub fn assigned_nodes(&self, slot: NodeId) -> Vec<NodeId> {
		let name = self.attribute(slot, "name");
		let mut current = slot;
		let host = loop {
			match self.parent(current) {
				Some(parent) => current = parent,
				None => match self.shadow_host(current) {
					Some(host) => break host,
					None => return Vec::new(),
				},
			}
		};
		self.children(host)
			.into_iter()
			.filter(|child| match self.kind(*child) {
				Some(NodeKind::Element) => self.attribute(*child, "slot") == name,
				Some(NodeKind::Text) => {
					name.is_none() && self.text(*child).is_some_and(|t| !t.trim().is_empty())
				}
				_ => false,
			})
			.collect()
	}

	/// Registers a listener for `event` on `node`.
	pub fn add_listener(
		&self,
		node: NodeId,
		event: &str,
		callback: Callback,
		options: ListenerOptions,
	) -> Option<ListenerId> {
		let id = ListenerId(self.inner.next_listener.get());
		self.live_mut(node, |n| {
			n.listeners.push(Listener {
				id,
				event: event.to_string(),
				callback,
				options,
			})
		})?;
		self.inner.next_listener.set(id.0 + 1);
		Some(id)
	}

	/// Removes a listener. Returns true if it was registered.
	pub fn remove_listener(&self, node: NodeId, id: ListenerId) -> bool {
		self.live_mut(node, |n| {
			let before = n.listeners.len();
			n.listeners.retain(|l| l.id != id);
			n.listeners.len() != before
		})
		.unwrap_or(false)
	}

	/// Number of listeners on `node`.
	pub fn listener_count(&self, node: NodeId) -> usize {
		self.live(node, |n| n.listeners.len()).unwrap_or(0)
	}

	fn input_value(&self, node: NodeId) -> Value {
		let is_toggle = self.tag(node).as_deref() == Some("input")
			&& matches!(
				self.attribute(node, "type").as_deref(),
				Some("checkbox") | Some("radio")
			);
		if is_toggle {
			return Value::Bool(self.has_attribute(node, "checked"));
		}
		self.attribute(node, "value").map(Value::from).unwrap_or_default()
	}

	/// Dispatches `event` at `target`.
	///
	/// The event visits the target, then (if it bubbles) each ancestor. At a shadow root
	/// it continues to the host only when composed, and from then on listeners see the
	/// host as the target. Listener panics are caught and logged; remaining listeners
	/// still run. Returns false if the default action was prevented.
	pub fn dispatch_event(&self, target: NodeId, event: &Event) -> bool {
		if !self.contains(target) {
			return true;
		}
		event.set_target_value(self.input_value(target));

		let mut path = vec![(target, target)];
		if event.is_bubbling() {
			let mut current = target;
			let mut seen_as = target;
			loop {
				let next = match self.parent(current) {
					Some(parent) => parent,
					None => match self.shadow_host(current) {
						Some(host) if event.is_composed() => {
							seen_as = host;
							host
						}
						_ => break,
					},
				};
				path.push((next, seen_as));
				current = next;
			}
		}

		for (node, seen_as) in path {
			let listeners: Vec<(ListenerId, Callback, ListenerOptions)> = self
				.live(node, |n| {
					n.listeners
						.iter()
						.filter(|l| l.event == event.name())
						.map(|l| (l.id, l.callback.clone(), l.options))
						.collect()
				})
				.unwrap_or_default();
			event.set_target(seen_as);
			event.set_current_target(Some(node));
			for (id, callback, options) in listeners {
				let still_registered = self
					.live(node, |n| n.listeners.iter().any(|l| l.id == id))
					.unwrap_or(false);
				if !still_registered {
					continue;
				}
				if options.prevent_default {
					event.prevent_default();
				}
				if options.stop_propagation {
					event.stop_propagation();
				}
				if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback.call(event))) {
					error_log!(
						event = event.name(),
						node = node.0,
						"event handler panicked: {}",
						panic_message(payload.as_ref())
					);
				}
			}
			if event.is_propagation_stopped() {
				break;
			}
		}
		event.set_current_target(None);
		!event.is_default_prevented()
	}

	/// Parses `markup` leniently into detached nodes.
	///
	/// Markup that cannot be parsed at all becomes a single text node.
	pub fn parse_fragment(&self, markup: &str) -> Vec<NodeId> {
		match markup::parse(markup, Mode::Lenient) {
			Ok(nodes) => nodes.iter().filter_map(|n| self.build_markup(n)).collect(),
			Err(message) => {
				error_log!("unparsable raw markup inserted as text: {}", message);
				vec![self.create_text(markup)]
			}
		}
	}

	fn build_markup(&self, node: &MarkupNode) -> Option<NodeId> {
		match node {
			MarkupNode::Element {
				tag,
				attrs,
				children,
			} => {
				let element = self.create_element(tag);
				for attr in attrs {
					if let MarkupAttr::Named { name, value } = attr {
						let value: String = value
							.iter()
							.flatten()
							.map(|piece| match piece {
								Piece::Text(text) => text.as_str(),
								Piece::Hole => "",
							})
							.collect();
						self.set_attribute(element, name, &value);
					}
				}
				for child in children {
					if let Some(child) = self.build_markup(child) {
						self.append_child(element, child);
					}
				}
				Some(element)
			}
			MarkupNode::Text(text) => Some(self.create_text(text)),
			MarkupNode::Comment(text) => Some(self.create_comment(text)),
			MarkupNode::Hole => None,
		}
	}

	/// Outer HTML of `node`. Markers are omitted; shadow roots are written as
	/// `<template shadowrootmode="open">`.
	pub fn to_html(&self, node: NodeId) -> String {
		let mut out = String::new();
		html::serialize(&self.inner.nodes.borrow(), node, &mut out);
		out
	}

	/// Inner HTML of `node` (its light children).
	pub fn inner_html(&self, node: NodeId) -> String {
		let mut out = String::new();
		html::serialize_children(&self.inner.nodes.borrow(), node, &mut out);
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use std::cell::RefCell;

	#[fixture]
	fn doc() -> Document {
		Document::new()
	}

	fn recorder(log: &Rc<RefCell<Vec<String>>>, label: &'static str) -> Callback {
		let log = Rc::clone(log);
		Callback::new(move |event: &Event| {
			log.borrow_mut().push(format!(
				"{label}:{}",
				event.target().map(|t| t.index()).unwrap_or_default()
			));
		})
	}

	#[rstest]
	fn test_build_and_serialize(doc: Document) {
		let div = doc.create_element("DIV");
		doc.set_attribute(div, "class", "a<b");
		doc.set_attribute(div, "hidden", "");
		let text = doc.create_text("x & y");
		let marker = doc.create_marker();
		doc.append_child(div, text);
		doc.append_child(div, marker);
		doc.append_child(doc.body(), div);

		assert_eq!(
			doc.to_html(div),
			"<div class=\"a&lt;b\" hidden>x &amp; y</div>"
		);
		assert!(doc.is_connected(text));
	}

	#[rstest]
	fn test_insert_before_moves_attached_node(doc: Document) {
		let ul = doc.create_element("ul");
		let a = doc.create_element("li");
		let b = doc.create_element("li");
		doc.append_child(ul, a);
		doc.append_child(ul, b);
		let before = doc.stats();

		doc.insert_before(ul, b, Some(a));

		assert_eq!(doc.children(ul), vec![b, a]);
		assert_eq!(doc.stats().moved, before.moved + 1);
		assert_eq!(doc.previous_sibling(a), Some(b));
		assert_eq!(doc.next_sibling(b), Some(a));
	}

	#[rstest]
	fn test_unchanged_writes_are_not_mutations(doc: Document) {
		let p = doc.create_element("p");
		let t = doc.create_text("a");
		doc.set_attribute(p, "id", "x");
		let count = doc.mutation_count();

		doc.set_attribute(p, "id", "x");
		doc.set_text(t, "a");

		assert_eq!(doc.mutation_count(), count);
	}

	#[rstest]
	fn test_remove_discards_subtree(doc: Document) {
		let div = doc.create_element("div");
		let span = doc.create_element("span");
		doc.append_child(div, span);
		doc.append_child(doc.body(), div);
		doc.add_listener(span, "click", Callback::new(|_| {}), ListenerOptions::default());

		doc.remove(div);

		assert!(!doc.contains(div));
		assert!(!doc.contains(span));
		assert!(doc.children(doc.body()).is_empty());
		assert_eq!(doc.listener_count(span), 0);
	}

	#[rstest]
	fn test_shadow_root_serializes_declaratively(doc: Document) {
		let host = doc.create_element("x-card");
		let root = doc.attach_shadow(host).unwrap();
		let slot = doc.create_element("slot");
		doc.append_child(root, slot);
		let light = doc.create_text("hello");
		doc.append_child(host, light);

		assert_eq!(
			doc.to_html(host),
			"<x-card><template shadowrootmode=\"open\"><slot></slot></template>hello</x-card>"
		);
		assert_eq!(doc.attach_shadow(host), Some(root));
		assert_eq!(doc.shadow_host(root), Some(host));
		assert_eq!(doc.assigned_nodes(slot), vec![light]);
	}

	#[rstest]
	fn test_named_slots(doc: Document) {
		let host = doc.create_element("x-layout");
		let root = doc.attach_shadow(host).unwrap();
		let header_slot = doc.create_element("slot");
		doc.set_attribute(header_slot, "name", "header");
		let default_slot = doc.create_element("slot");
		doc.append_child(root, header_slot);
		doc.append_child(root, default_slot);
		let h1 = doc.create_element("h1");
		doc.set_attribute(h1, "slot", "header");
		let p = doc.create_element("p");
		doc.append_child(host, h1);
		doc.append_child(host, p);

		assert_eq!(doc.assigned_nodes(header_slot), vec![h1]);
		assert_eq!(doc.assigned_nodes(default_slot), vec![p]);
	}

	#[rstest]
	fn test_dispatch_bubbles_and_retargets_across_shadow(doc: Document) {
		let host = doc.create_element("x-field");
		doc.append_child(doc.body(), host);
		let root = doc.attach_shadow(host).unwrap();
		let input = doc.create_element("input");
		doc.append_child(root, input);

		let log = Rc::new(RefCell::new(Vec::new()));
		doc.add_listener(input, "click", recorder(&log, "input"), Default::default());
		doc.add_listener(host, "click", recorder(&log, "host"), Default::default());
		doc.add_listener(doc.body(), "click", recorder(&log, "body"), Default::default());

		doc.dispatch_event(input, &Event::native("click"));

		assert_eq!(
			*log.borrow(),
			vec![
				format!("input:{}", input.index()),
				format!("host:{}", host.index()),
				format!("body:{}", host.index()),
			]
		);
	}

	#[rstest]
	fn test_uncomposed_event_stops_at_shadow_root(doc: Document) {
		let host = doc.create_element("x-field");
		let root = doc.attach_shadow(host).unwrap();
		let input = doc.create_element("input");
		doc.append_child(root, input);
		let log = Rc::new(RefCell::new(Vec::new()));
		doc.add_listener(host, "ping", recorder(&log, "host"), Default::default());

		doc.dispatch_event(input, &Event::custom("ping", Value::Null).bubbles(true));

		assert!(log.borrow().is_empty());
	}

	#[rstest]
	fn test_listener_options_apply_before_call(doc: Document) {
		let form = doc.create_element("form");
		let button = doc.create_element("button");
		doc.append_child(form, button);
		let log = Rc::new(RefCell::new(Vec::new()));
		let options = ListenerOptions {
			prevent_default: true,
			stop_propagation: true,
		};
		doc.add_listener(button, "submit", recorder(&log, "button"), options);
		doc.add_listener(form, "submit", recorder(&log, "form"), Default::default());

		let allowed = doc.dispatch_event(button, &Event::native("submit"));

		assert!(!allowed);
		assert_eq!(log.borrow().len(), 1);
	}

	#[rstest]
	fn test_panicking_listener_is_contained(doc: Document) {
		let button = doc.create_element("button");
		let log = Rc::new(RefCell::new(Vec::new()));
		doc.add_listener(
			button,
			"click",
			Callback::new(|_| panic!("boom")),
			Default::default(),
		);
		doc.add_listener(button, "click", recorder(&log, "after"), Default::default());

		doc.dispatch_event(button, &Event::native("click"));

		assert_eq!(log.borrow().len(), 1);
	}

	#[rstest]
	fn test_target_value_snapshot(doc: Document) {
		let input = doc.create_element("input");
		doc.set_value(input, "typed");
		let seen = Rc::new(RefCell::new(Value::Null));
		doc.add_listener(
			input,
			"change",
			Callback::new({
				let seen = Rc::clone(&seen);
				move |event| *seen.borrow_mut() = event.model_value()
			}),
			Default::default(),
		);
		doc.dispatch_event(input, &Event::native("change"));
		assert_eq!(*seen.borrow(), Value::from("typed"));

		let checkbox = doc.create_element("input");
		doc.set_attribute(checkbox, "type", "checkbox");
		doc.set_checked(checkbox, true);
		let event = Event::native("change");
		doc.dispatch_event(checkbox, &event);
		assert_eq!(event.target_value(), Value::Bool(true));
	}

	#[rstest]
	fn test_parse_fragment(doc: Document) {
		let nodes = doc.parse_fragment("<b class=\"x\">bold</b> tail");
		assert_eq!(nodes.len(), 2);
		assert_eq!(doc.to_html(nodes[0]), "<b class=\"x\">bold</b>");
		assert_eq!(doc.text(nodes[1]).as_deref(), Some(" tail"));
	}

	#[rstest]
	fn test_query_through_shadow_roots(doc: Document) {
		let host = doc.create_element("x-app");
		doc.append_child(doc.body(), host);
		let root = doc.attach_shadow(host).unwrap();
		let button = doc.create_element("button");
		doc.append_child(root, button);

		assert_eq!(doc.query(doc.body(), "button"), Some(button));
		assert!(!doc.descendants(doc.body(), false).contains(&button));
	}
}
