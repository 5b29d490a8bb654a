//! HTML serialization of document subtrees.

use std::borrow::Cow;

use super::{NodeData, NodeId, Payload};
use crate::markup::VOID_ELEMENTS;

/// Escapes HTML special characters in a string.
///
/// Returns a borrowed reference if no escaping is needed.
pub fn html_escape(s: &str) -> Cow<'_, str> {
	if s.contains(['&', '<', '>', '"', '\'']) {
		let mut escaped = String::with_capacity(s.len() + 8);
		for c in s.chars() {
			match c {
				'&' => escaped.push_str("&amp;"),
				'<' => escaped.push_str("&lt;"),
				'>' => escaped.push_str("&gt;"),
				'"' => escaped.push_str("&quot;"),
				'\'' => escaped.push_str("&#x27;"),
				_ => escaped.push(c),
			}
		}
		Cow::Owned(escaped)
	} else {
		Cow::Borrowed(s)
	}
}

/// HTML boolean attributes: present means on, absent means off.
///
/// `<button disabled="false">` is still disabled, so interpolated values for these
/// names are never stringified; falsy values remove the attribute.
pub const BOOLEAN_ATTRS: &[&str] = &[
	"allowfullscreen",
	"async",
	"autofocus",
	"autoplay",
	"checked",
	"controls",
	"default",
	"defer",
	"disabled",
	"formnovalidate",
	"hidden",
	"inert",
	"ismap",
	"itemscope",
	"loop",
	"multiple",
	"muted",
	"nomodule",
	"novalidate",
	"open",
	"playsinline",
	"readonly",
	"required",
	"reversed",
	"selected",
	"truespeed",
];

/// Returns true if `name` is a boolean attribute.
pub fn is_boolean_attr(name: &str) -> bool {
	BOOLEAN_ATTRS.contains(&name)
}

/// Elements whose text children are serialized verbatim
const RAW_TEXT_PARENTS: &[&str] = &["script", "style"];

pub(super) fn serialize(nodes: &[NodeData], id: NodeId, out: &mut String) {
	let Some(node) = nodes.get(id.0) else {
		return;
	};
	match &node.payload {
		Payload::Element { tag, attrs, shadow } => {
			out.push('<');
			out.push_str(tag);
			for (name, value) in attrs {
				out.push(' ');
				out.push_str(name);
				if value.is_empty() && is_boolean_attr(name) {
					continue;
				}
				out.push_str("=\"");
				out.push_str(&html_escape(value));
				out.push('"');
			}
			out.push('>');
			if VOID_ELEMENTS.contains(&tag.as_str()) {
				return;
			}
			if let Some(shadow) = shadow {
				out.push_str("<template shadowrootmode=\"open\">");
				serialize_children(nodes, *shadow, out);
				out.push_str("</template>");
			}
			if RAW_TEXT_PARENTS.contains(&tag.as_str()) {
				for child in &node.children {
					if let Some(Payload::Text(data)) = nodes.get(child.0).map(|n| &n.payload) {
						out.push_str(data);
					}
				}
			} else {
				serialize_children(nodes, id, out);
			}
			out.push_str("</");
			out.push_str(tag);
			out.push('>');
		}
		Payload::Text(data) => out.push_str(&html_escape(data)),
		Payload::Comment(data) => {
			out.push_str("<!--");
			out.push_str(data);
			out.push_str("-->");
		}
		Payload::Marker => {}
		Payload::ShadowRoot { .. } => serialize_children(nodes, id, out),
	}
}

pub(super) fn serialize_children(nodes: &[NodeData], id: NodeId, out: &mut String) {
	if let Some(node) = nodes.get(id.0) {
		for child in &node.children {
			serialize(nodes, *child, out);
		}
	}
}
