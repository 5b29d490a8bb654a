//! Mutation pass: applies a prepared render to the document.
//!
//! Dynamic content lives in regions delimited by two marker nodes. A region's content
//! is everything strictly between its markers, so a region can be moved, cleared or
//! refilled without knowing how many nodes it currently holds.

use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use crate::callback::Callback;
use crate::directive::{Branch, Key};
use crate::dom::{Document, ListenerId, ListenerOptions, NodeId};
use crate::prop::Prop;
use crate::template::TemplateSource;
use crate::template::compiler::{TAttr, TNode};

use super::RenderHost;
use super::lis::longest_increasing_subsequence;
use super::prepare::{AttrValue, Prepared, PreparedHole, PreparedTemplate};

/// Dynamic content between two markers.
#[derive(Debug)]
pub(crate) struct Region {
	pub(crate) start: NodeId,
	pub(crate) end: NodeId,
	pub(crate) content: Content,
}

#[derive(Debug)]
pub(crate) enum Content {
	Empty,
	Text { node: NodeId, data: String },
	Raw { markup: Rc<str> },
	Template(TemplateInstance),
	/// Shares the enclosing region with its branch content
	Choice(Branch, Box<Content>),
	List(Vec<ListEntry>),
	Seq(Vec<Region>),
}

#[derive(Debug)]
pub(crate) struct ListEntry {
	key: Key,
	region: Region,
}

/// A mounted template: its call site and one part per hole.
#[derive(Debug)]
pub(crate) struct TemplateInstance {
	pub(crate) source: &'static TemplateSource,
	parts: Vec<Part>,
}

#[derive(Debug)]
enum Part {
	Content(Region),
	Attribute {
		element: NodeId,
		name: String,
		value: AttrValue,
	},
	Prop {
		element: NodeId,
		name: String,
		value: Prop,
	},
	Event {
		element: NodeId,
		event: String,
		options: ListenerOptions,
		bound: Option<(ListenerId, Callback)>,
	},
	Spread {
		element: NodeId,
		applied: Vec<(String, AttrValue)>,
	},
	SpreadProps {
		element: NodeId,
		applied: Vec<(String, Prop)>,
	},
}

impl Part {
	fn element(&self) -> Option<NodeId> {
		match self {
			Part::Content(_) => None,
			Part::Attribute { element, .. }
			| Part::Prop { element, .. }
			| Part::Event { element, .. }
			| Part::Spread { element, .. }
			| Part::SpreadProps { element, .. } => Some(*element),
		}
	}
}

pub(crate) struct Patcher<'a> {
	doc: &'a Document,
	host: &'a dyn RenderHost,
	components: Vec<(NodeId, Vec<(String, Prop)>)>,
}

impl<'a> Patcher<'a> {
	pub(crate) fn new(doc: &'a Document, host: &'a dyn RenderHost) -> Self {
		Self {
			doc,
			host,
			components: Vec::new(),
		}
	}

	/// Creates the components whose hosts were mounted during the patch, in document
	/// order. Hosts removed again before the end of the patch are skipped.
	pub(crate) fn finish(self) {
		for (element, props) in self.components {
			if self.doc.contains(element) {
				self.host.create_component(element, props);
			}
		}
	}

	/// Appends an empty region to `parent`.
	pub(crate) fn open_region(&mut self, parent: NodeId) -> Region {
		self.mount_region(parent, None, Prepared::Empty)
	}

	pub(crate) fn update(&mut self, region: &mut Region, next: Prepared) {
		self.update_content(region.start, region.end, &mut region.content, next);
	}

	/// Removes everything between the markers of `region`.
	pub(crate) fn clear(&mut self, region: &mut Region) {
		self.clear_between(region.start, region.end);
		region.content = Content::Empty;
	}

	/// Removes `region` together with its markers.
	pub(crate) fn remove_region(&mut self, region: Region) {
		self.clear_between(region.start, region.end);
		self.doc.remove(region.start);
		self.doc.remove(region.end);
	}

	fn update_content(&mut self, start: NodeId, end: NodeId, content: &mut Content, next: Prepared) {
		if !compatible(content, &next) {
			self.clear_between(start, end);
			*content = match self.doc.parent(end) {
				Some(parent) => self.mount(parent, end, next),
				None => Content::Empty,
			};
			return;
		}
		match (content, next) {
			(Content::Text { node, data }, Prepared::Text(text)) => {
				if *data != text {
					self.doc.set_text(*node, &text);
					*data = text;
				}
			}
			(Content::Template(instance), Prepared::Template(prepared)) => {
				self.update_instance(instance, prepared);
			}
			(Content::Choice(_, inner), Prepared::Choice(_, next)) => {
				self.update_content(start, end, inner, *next);
			}
			(Content::List(entries), Prepared::List(next)) => {
				let old = mem::take(entries);
				*entries = self.reconcile_list(end, old, next);
			}
			(Content::Seq(regions), Prepared::Seq(next)) => {
				self.update_seq(end, regions, next);
			}
			_ => {}
		}
	}

	fn mount(&mut self, parent: NodeId, before: NodeId, next: Prepared) -> Content {
		match next {
			Prepared::Empty => Content::Empty,
			Prepared::Text(data) => {
				let node = self.doc.create_text(&data);
				self.doc.insert_before(parent, node, Some(before));
				Content::Text { node, data }
			}
			Prepared::Raw(markup) => {
				for node in self.doc.parse_fragment(&markup) {
					self.doc.insert_before(parent, node, Some(before));
				}
				Content::Raw { markup }
			}
			Prepared::Template(prepared) => {
				Content::Template(self.instantiate(parent, Some(before), prepared))
			}
			Prepared::Choice(branch, inner) => {
				Content::Choice(branch, Box::new(self.mount(parent, before, *inner)))
			}
			Prepared::List(entries) => Content::List(
				entries
					.into_iter()
					.map(|(key, next)| ListEntry {
						key,
						region: self.mount_region(parent, Some(before), next),
					})
					.collect(),
			),
			Prepared::Seq(items) => Content::Seq(
				items
					.into_iter()
					.map(|next| self.mount_region(parent, Some(before), next))
					.collect(),
			),
		}
	}

	fn mount_region(&mut self, parent: NodeId, before: Option<NodeId>, next: Prepared) -> Region {
		let start = self.doc.create_marker();
		let end = self.doc.create_marker();
		self.doc.insert_before(parent, start, before);
		self.doc.insert_before(parent, end, before);
		let content = self.mount(parent, end, next);
		Region {
			start,
			end,
			content,
		}
	}

	fn clear_between(&mut self, start: NodeId, end: NodeId) {
		let mut cursor = self.doc.next_sibling(start);
		while let Some(node) = cursor {
			if node == end {
				break;
			}
			cursor = self.doc.next_sibling(node);
			self.host.release(node);
			self.doc.remove(node);
		}
	}

	fn instantiate(
		&mut self,
		parent: NodeId,
		before: Option<NodeId>,
		prepared: PreparedTemplate,
	) -> TemplateInstance {
		let PreparedTemplate {
			source,
			description,
			holes,
		} = prepared;
		let mut holes = holes.into_iter();
		let mut parts = Vec::with_capacity(description.holes().len());
		for node in description.nodes() {
			self.build(node, parent, before, &mut holes, &mut parts);
		}
		TemplateInstance { source, parts }
	}

	fn build(
		&mut self,
		node: &TNode,
		parent: NodeId,
		before: Option<NodeId>,
		holes: &mut impl Iterator<Item = PreparedHole>,
		parts: &mut Vec<Part>,
	) {
		match node {
			TNode::Text(data) => {
				let text = self.doc.create_text(data);
				self.doc.insert_before(parent, text, before);
			}
			TNode::Comment(data) => {
				let comment = self.doc.create_comment(data);
				self.doc.insert_before(parent, comment, before);
			}
			TNode::Hole(_) => {
				if let Some(PreparedHole::Content(next)) = holes.next() {
					let region = self.mount_region(parent, before, next);
					parts.push(Part::Content(region));
				}
			}
			TNode::Element {
				tag,
				attrs,
				children,
			} => {
				let element = self.doc.create_element(tag);
				let component = self.host.is_component(tag);
				let mut props = Vec::new();
				for attr in attrs {
					match attr {
						TAttr::Static { name, value } => {
							self.doc.set_attribute(element, name, value);
							if component {
								props.push((name.clone(), Prop::from(value.as_str())));
							}
						}
						TAttr::Hole(_) => {
							let part = holes
								.next()
								.and_then(|hole| self.attach(element, hole, &mut props));
							parts.extend(part);
						}
					}
				}
				self.doc.insert_before(parent, element, before);
				if component {
					self.components.push((element, props));
				}
				for child in children {
					self.build(child, element, None, holes, parts);
				}
			}
		}
	}

	fn attach(
		&mut self,
		element: NodeId,
		hole: PreparedHole,
		props: &mut Vec<(String, Prop)>,
	) -> Option<Part> {
		Some(match hole {
			PreparedHole::Attribute { name, value } => {
				self.apply_attribute(element, &name, &value);
				Part::Attribute {
					element,
					name,
					value,
				}
			}
			PreparedHole::Prop { name, value } => {
				props.push((name.clone(), value.clone()));
				Part::Prop {
					element,
					name,
					value,
				}
			}
			PreparedHole::Event {
				event,
				options,
				callback,
			} => {
				let bound = self.bind(element, &event, options, callback);
				Part::Event {
					element,
					event,
					options,
					bound,
				}
			}
			PreparedHole::Spread(applied) => {
				for (name, value) in &applied {
					self.apply_attribute(element, name, value);
				}
				Part::Spread { element, applied }
			}
			PreparedHole::SpreadProps(applied) => {
				props.extend(applied.iter().cloned());
				Part::SpreadProps { element, applied }
			}
			PreparedHole::Content(_) => return None,
		})
	}

	fn apply_attribute(&self, element: NodeId, name: &str, value: &AttrValue) {
		match value {
			AttrValue::Absent => {
				self.doc.remove_attribute(element, name);
			}
			AttrValue::Present(value) => self.doc.set_attribute(element, name, value),
		}
	}

	fn bind(
		&self,
		element: NodeId,
		event: &str,
		options: ListenerOptions,
		callback: Option<Callback>,
	) -> Option<(ListenerId, Callback)> {
		let callback = callback?;
		let id = self
			.doc
			.add_listener(element, event, callback.clone(), options)?;
		Some((id, callback))
	}

	fn update_instance(&mut self, instance: &mut TemplateInstance, prepared: PreparedTemplate) {
		for (part, hole) in instance.parts.iter_mut().zip(prepared.holes) {
			self.update_part(part, hole);
		}
	}

	fn update_part(&mut self, part: &mut Part, hole: PreparedHole) {
		match (part, hole) {
			(Part::Content(region), PreparedHole::Content(next)) => self.update(region, next),
			(Part::Attribute { element, name, value }, PreparedHole::Attribute { value: next, .. }) => {
				if *value != next {
					self.apply_attribute(*element, name, &next);
					*value = next;
				}
			}
			(Part::Prop { element, name, value }, PreparedHole::Prop { value: next, .. }) => {
				if !value.same(&next) {
					self.host.update_prop(*element, name, next.clone());
					*value = next;
				}
			}
			(
				Part::Event {
					element,
					event,
					options,
					bound,
				},
				PreparedHole::Event { callback, .. },
			) => {
				let unchanged = match (bound.as_ref(), callback.as_ref()) {
					(Some((_, current)), Some(next)) => current.ptr_eq(next),
					(None, None) => true,
					_ => false,
				};
				if !unchanged {
					if let Some((id, _)) = bound.take() {
						self.doc.remove_listener(*element, id);
					}
					*bound = self.bind(*element, event, *options, callback);
				}
			}
			(Part::Spread { element, applied }, PreparedHole::Spread(next)) => {
				for (name, _) in applied.iter() {
					if !next.iter().any(|(n, _)| n == name) {
						self.doc.remove_attribute(*element, name);
					}
				}
				for (name, value) in &next {
					let current = applied.iter().find(|(n, _)| n == name).map(|(_, v)| v);
					if current != Some(value) {
						self.apply_attribute(*element, name, value);
					}
				}
				*applied = next;
			}
			(Part::SpreadProps { element, applied }, PreparedHole::SpreadProps(next)) => {
				for (name, _) in applied.iter() {
					if !next.iter().any(|(n, _)| n == name) {
						self.host.update_prop(*element, name, Prop::default());
					}
				}
				for (name, prop) in &next {
					let unchanged = applied
						.iter()
						.find(|(n, _)| n == name)
						.is_some_and(|(_, current)| current.same(prop));
					if !unchanged {
						self.host.update_prop(*element, name, prop.clone());
					}
				}
				*applied = next;
			}
			(part, _) => {
				// A host rendered as a plain element keeps its attributes until remounted.
				let element = part.element();
				crate::warn_log!(
					"<{}> changed between element and component since it was mounted; remount the template to apply the change",
					element.and_then(|e| self.doc.tag(e)).unwrap_or_default()
				);
			}
		}
	}

	fn update_seq(&mut self, end: NodeId, regions: &mut Vec<Region>, next: Vec<Prepared>) {
		let Some(parent) = self.doc.parent(end) else {
			return;
		};
		let count = next.len();
		let mut next = next.into_iter();
		for region in regions.iter_mut().take(count) {
			if let Some(item) = next.next() {
				self.update(region, item);
			}
		}
		if regions.len() > count {
			for region in regions.drain(count..) {
				self.remove_region(region);
			}
		}
		for item in next {
			regions.push(self.mount_region(parent, Some(end), item));
		}
	}

	/// Keyed diff. Entries whose key survives keep their nodes; only entries outside a
	/// longest increasing subsequence of old positions are moved.
	fn reconcile_list(
		&mut self,
		end: NodeId,
		old: Vec<ListEntry>,
		next: Vec<(Key, Prepared)>,
	) -> Vec<ListEntry> {
		let Some(parent) = self.doc.parent(end) else {
			return Vec::new();
		};

		let wanted: HashMap<&Key, usize> = next
			.iter()
			.enumerate()
			.map(|(i, (key, _))| (key, i))
			.collect();
		let mut reusable: Vec<Option<Region>> = (0..next.len()).map(|_| None).collect();
		let mut sources: Vec<Option<usize>> = vec![None; next.len()];
		let mut kept = 0;
		for entry in old {
			match wanted.get(&entry.key) {
				Some(&position) if reusable[position].is_none() => {
					reusable[position] = Some(entry.region);
					sources[position] = Some(kept);
					kept += 1;
				}
				_ => self.remove_region(entry.region),
			}
		}
		drop(wanted);

		let stable = longest_increasing_subsequence(&sources);
		let mut result: Vec<Option<ListEntry>> = (0..next.len()).map(|_| None).collect();
		let mut anchor = end;
		for (position, (key, item)) in next.into_iter().enumerate().rev() {
			let region = match reusable[position].take() {
				Some(mut region) => {
					if !stable[position] {
						self.move_region(parent, &region, anchor);
					}
					self.update(&mut region, item);
					region
				}
				None => self.mount_region(parent, Some(anchor), item),
			};
			anchor = region.start;
			result[position] = Some(ListEntry { key, region });
		}
		result.into_iter().flatten().collect()
	}

	fn move_region(&self, parent: NodeId, region: &Region, before: NodeId) {
		let mut nodes = Vec::new();
		let mut cursor = Some(region.start);
		while let Some(node) = cursor {
			nodes.push(node);
			if node == region.end {
				break;
			}
			cursor = self.doc.next_sibling(node);
		}
		for node in nodes {
			self.doc.insert_before(parent, node, Some(before));
		}
	}
}

fn compatible(content: &Content, next: &Prepared) -> bool {
	match (content, next) {
		(Content::Empty, Prepared::Empty) => true,
		(Content::Text { .. }, Prepared::Text(_)) => true,
		(Content::Raw { markup }, Prepared::Raw(next)) => markup == next,
		(Content::Template(instance), Prepared::Template(next)) => instance.source.same_site(next.source),
		(Content::Choice(branch, _), Prepared::Choice(next, _)) => branch == next,
		(Content::List(_), Prepared::List(_)) | (Content::Seq(_), Prepared::Seq(_)) => true,
		_ => false,
	}
}

impl Content {
	/// Call site of the template at the top of this content, if any.
	pub(crate) fn site(&self) -> Option<&'static str> {
		match self {
			Content::Template(instance) => Some(instance.source.site()),
			Content::Choice(_, inner) => inner.site(),
			_ => None,
		}
	}
}
