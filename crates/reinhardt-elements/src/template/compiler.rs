//! Template compilation.
//!
//! Compiling a call site turns its markup into a [`TemplateDescription`]: the static node
//! tree and the ordered list of typed holes. Hole order is the pre-order of the tree
//! (an element's attributes before its children), which is also the order in which the
//! reconciler builds and patches parts.

use crate::dom::ListenerOptions;
use crate::error::TemplateError;
use crate::markup::{self, ESCAPABLE_RAW_TEXT_ELEMENTS, HOLE, MarkupAttr, MarkupNode, Mode, Piece};

use super::TemplateSource;

/// Attribute prefix of event bindings
pub const EVENT_PREFIX: &str = "on-";

/// Attribute used for two-way binding
pub const MODEL_ATTRIBUTE: &str = "x-model";

/// Event binding suffixes and the listener options they imply.
///
/// Longer suffixes come first so `-prevent-stop` is not read as `-stop`.
pub const EVENT_MODIFIERS: &[(&str, ListenerOptions)] = &[
	(
		"-prevent-stop",
		ListenerOptions {
			prevent_default: true,
			stop_propagation: true,
		},
	),
	(
		"-stop-prevent",
		ListenerOptions {
			prevent_default: true,
			stop_propagation: true,
		},
	),
	(
		"-prevent",
		ListenerOptions {
			prevent_default: true,
			stop_propagation: false,
		},
	),
	(
		"-stop",
		ListenerOptions {
			prevent_default: false,
			stop_propagation: true,
		},
	),
];

/// Splits an `on-<event>[-modifiers]` attribute name into the event name and options.
///
/// Returns `None` for attributes that are not event bindings.
pub fn parse_event_attribute(name: &str) -> Option<(&str, ListenerOptions)> {
	let rest = name.strip_prefix(EVENT_PREFIX)?;
	for (suffix, options) in EVENT_MODIFIERS {
		if let Some(event) = rest.strip_suffix(suffix)
			&& !event.is_empty()
		{
			return Some((event, *options));
		}
	}
	Some((rest, ListenerOptions::default()))
}

/// Where a hole gets its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
	/// The n-th value passed to the template
	Value(usize),
	/// A component method named in static markup (`on-click="save"`)
	Method(String),
	/// The current value of a state property (`x-model`)
	Model(String),
	/// A handler writing the event value back to a state property (`x-model`)
	ModelWriter(String),
}

/// Hole classification by syntactic position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoleKind {
	/// Content of `textarea` / `title`: scalars only
	Text,
	/// Element content
	Child,
	/// Attribute value; `strings` are the static pieces around the inputs
	Attribute {
		/// Attribute name
		name: String,
		/// Static text; always one more entry than the hole has inputs
		strings: Vec<String>,
	},
	/// Event binding
	Event {
		/// Event name
		event: String,
		/// Modifiers from the attribute suffix
		options: ListenerOptions,
	},
	/// Bare hole in attribute position
	Spread,
}

impl HoleKind {
	/// Short name used in error messages.
	pub fn label(&self) -> &'static str {
		match self {
			HoleKind::Text => "text",
			HoleKind::Child => "child",
			HoleKind::Attribute { .. } => "attribute",
			HoleKind::Event { .. } => "event",
			HoleKind::Spread => "spread",
		}
	}
}

/// A typed hole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hole {
	/// Kind of the hole
	pub kind: HoleKind,
	/// Sources of the hole's value(s)
	pub inputs: Vec<Input>,
	/// Tag of the element owning an attribute, event or spread hole
	pub element: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TAttr {
	Static { name: String, value: String },
	Hole(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TNode {
	Element {
		tag: String,
		attrs: Vec<TAttr>,
		children: Vec<TNode>,
	},
	Text(String),
	Comment(String),
	Hole(usize),
}

/// Compiled form of one template call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDescription {
	site: &'static str,
	nodes: Vec<TNode>,
	holes: Vec<Hole>,
	value_count: usize,
}

impl TemplateDescription {
	/// Call site the template was compiled from.
	pub fn site(&self) -> &'static str {
		self.site
	}

	/// Typed holes in patch order.
	pub fn holes(&self) -> &[Hole] {
		&self.holes
	}

	/// Number of values a render must supply.
	pub fn value_count(&self) -> usize {
		self.value_count
	}

	pub(crate) fn nodes(&self) -> &[TNode] {
		&self.nodes
	}
}

/// Compiles a template source.
pub fn compile(source: &TemplateSource) -> Result<TemplateDescription, TemplateError> {
	let site = source.site();
	let (joined, value_count) =
		substitute_holes(source.markup()).map_err(|m| TemplateError::compile(site, m))?;
	let tree = markup::parse(&joined, Mode::Template).map_err(|m| TemplateError::compile(site, m))?;

	let mut builder = Builder {
		holes: Vec::new(),
		next_value: 0,
	};
	let nodes = tree
		.into_iter()
		.map(|node| builder.node(node, None))
		.collect::<Result<Vec<_>, String>>()
		.map_err(|m| TemplateError::compile(site, m))?;

	debug_assert_eq!(builder.next_value, value_count);
	Ok(TemplateDescription {
		site,
		nodes,
		holes: builder.holes,
		value_count,
	})
}

/// Replaces `{}` with the hole placeholder and unescapes `{{` / `}}`.
fn substitute_holes(markup: &str) -> Result<(String, usize), String> {
	let mut out = String::with_capacity(markup.len());
	let mut count = 0;
	let mut chars = markup.chars().peekable();
	while let Some(c) = chars.next() {
		match c {
			'{' if chars.peek() == Some(&'{') => {
				chars.next();
				out.push('{');
			}
			'{' if chars.peek() == Some(&'}') => {
				chars.next();
				out.push(HOLE);
				count += 1;
			}
			'{' => return Err("unmatched `{` (use `{{` for a literal brace)".to_string()),
			'}' if chars.peek() == Some(&'}') => {
				chars.next();
				out.push('}');
			}
			'}' => return Err("unmatched `}` (use `}}` for a literal brace)".to_string()),
			HOLE => return Err("reserved character U+E000 in template".to_string()),
			_ => out.push(c),
		}
	}
	Ok((out, count))
}

struct Builder {
	holes: Vec<Hole>,
	next_value: usize,
}

impl Builder {
	fn value(&mut self) -> Input {
		let input = Input::Value(self.next_value);
		self.next_value += 1;
		input
	}

	fn push(&mut self, kind: HoleKind, inputs: Vec<Input>, element: Option<&str>) -> usize {
		self.holes.push(Hole {
			kind,
			inputs,
			element: element.map(str::to_string),
		});
		self.holes.len() - 1
	}

	fn node(&mut self, node: MarkupNode, parent: Option<&str>) -> Result<TNode, String> {
		match node {
			MarkupNode::Hole => {
				let kind = if parent.is_some_and(|tag| ESCAPABLE_RAW_TEXT_ELEMENTS.contains(&tag)) {
					HoleKind::Text
				} else {
					HoleKind::Child
				};
				let input = self.value();
				Ok(TNode::Hole(self.push(kind, vec![input], None)))
			}
			MarkupNode::Text(text) => Ok(TNode::Text(text)),
			MarkupNode::Comment(text) => Ok(TNode::Comment(text)),
			MarkupNode::Element {
				tag,
				attrs,
				children,
			} => {
				let input_type = attrs.iter().find_map(|attr| match attr {
					MarkupAttr::Named {
						name,
						value: Some(pieces),
					} if name == "type" => static_text(pieces),
					_ => None,
				});
				let mut compiled = Vec::with_capacity(attrs.len());
				for attr in attrs {
					self.attribute(attr, &tag, input_type.as_deref(), &mut compiled)?;
				}
				let children = children
					.into_iter()
					.map(|child| self.node(child, Some(&tag)))
					.collect::<Result<Vec<_>, _>>()?;
				Ok(TNode::Element {
					tag,
					attrs: compiled,
					children,
				})
			}
		}
	}

	fn attribute(
		&mut self,
		attr: MarkupAttr,
		tag: &str,
		input_type: Option<&str>,
		out: &mut Vec<TAttr>,
	) -> Result<(), String> {
		let (name, value) = match attr {
			MarkupAttr::Spread => {
				let input = self.value();
				out.push(TAttr::Hole(self.push(HoleKind::Spread, vec![input], Some(tag))));
				return Ok(());
			}
			MarkupAttr::Named { name, value } => (name, value),
		};

		if name == MODEL_ATTRIBUTE {
			let key = value
				.as_deref()
				.and_then(static_text)
				.map(|key| key.trim().to_string())
				.filter(|key| !key.is_empty())
				.ok_or_else(|| format!("{MODEL_ATTRIBUTE} on <{tag}> expects a static property name"))?;
			let bound = if tag == "input" && input_type == Some("checkbox") {
				"checked"
			} else {
				"value"
			};
			let value_hole = self.push(
				HoleKind::Attribute {
					name: bound.to_string(),
					strings: vec![String::new(), String::new()],
				},
				vec![Input::Model(key.clone())],
				Some(tag),
			);
			let event_hole = self.push(
				HoleKind::Event {
					event: "change".to_string(),
					options: ListenerOptions::default(),
				},
				vec![Input::ModelWriter(key)],
				Some(tag),
			);
			out.push(TAttr::Hole(value_hole));
			out.push(TAttr::Hole(event_hole));
			return Ok(());
		}

		if let Some((event, options)) = parse_event_attribute(&name) {
			if event.is_empty() {
				return Err(format!("event attribute `{name}` on <{tag}> names no event"));
			}
			let input = match value.as_deref() {
				Some([Piece::Hole]) => self.value(),
				Some([Piece::Text(method)]) if !method.trim().is_empty() => {
					Input::Method(method.trim().to_string())
				}
				None | Some([]) | Some([Piece::Text(_)]) => {
					return Err(format!(
						"event attribute `{name}` on <{tag}> needs a handler or method name"
					));
				}
				Some(_) => {
					return Err(format!(
						"event attribute `{name}` on <{tag}> must be a single hole or a method name"
					));
				}
			};
			let kind = HoleKind::Event {
				event: event.to_string(),
				options,
			};
			out.push(TAttr::Hole(self.push(kind, vec![input], Some(tag))));
			return Ok(());
		}

		let pieces = value.unwrap_or_default();
		if !pieces.contains(&Piece::Hole) {
			out.push(TAttr::Static {
				name,
				value: static_text(&pieces).unwrap_or_default(),
			});
			return Ok(());
		}

		let mut strings = vec![String::new()];
		let mut inputs = Vec::new();
		for piece in pieces {
			match piece {
				Piece::Text(text) => {
					if let Some(last) = strings.last_mut() {
						last.push_str(&text);
					}
				}
				Piece::Hole => {
					inputs.push(self.value());
					strings.push(String::new());
				}
			}
		}
		out.push(TAttr::Hole(self.push(
			HoleKind::Attribute { name, strings },
			inputs,
			Some(tag),
		)));
		Ok(())
	}
}

fn static_text(pieces: &[Piece]) -> Option<String> {
	pieces
		.iter()
		.map(|piece| match piece {
			Piece::Text(text) => Some(text.as_str()),
			Piece::Hole => None,
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn compile_str(markup: &'static str) -> Result<TemplateDescription, TemplateError> {
		let source: &'static TemplateSource =
			Box::leak(Box::new(TemplateSource::new("test.rs:1:1", markup)));
		compile(source)
	}

	fn kinds(description: &TemplateDescription) -> Vec<&'static str> {
		description.holes().iter().map(|h| h.kind.label()).collect()
	}

	#[rstest]
	#[case("on-click", Some(("click", false, false)))]
	#[case("on-submit-prevent", Some(("submit", true, false)))]
	#[case("on-click-stop", Some(("click", false, true)))]
	#[case("on-submit-prevent-stop", Some(("submit", true, true)))]
	#[case("on-key-down", Some(("key-down", false, false)))]
	#[case("on-stop", Some(("stop", false, false)))]
	#[case("onclick", None)]
	#[case("class", None)]
	fn test_parse_event_attribute(
		#[case] name: &str,
		#[case] expected: Option<(&str, bool, bool)>,
	) {
		let parsed = parse_event_attribute(name)
			.map(|(event, o)| (event, o.prevent_default, o.stop_propagation));
		assert_eq!(parsed, expected);
	}

	#[rstest]
	fn test_classifies_holes_by_position() {
		let description = compile_str(
			"<form {} on-submit-prevent=\"{}\"><p class=\"a {} b {}\">{}</p><textarea>{}</textarea></form>",
		)
		.unwrap();

		assert_eq!(
			kinds(&description),
			vec!["spread", "event", "attribute", "child", "text"]
		);
		assert_eq!(description.value_count(), 6);
		assert_eq!(
			description.holes()[2],
			Hole {
				kind: HoleKind::Attribute {
					name: "class".into(),
					strings: vec!["a ".into(), " b ".into(), String::new()],
				},
				inputs: vec![Input::Value(2), Input::Value(3)],
				element: Some("p".into()),
			}
		);
	}

	#[rstest]
	fn test_static_event_binds_method() {
		let description = compile_str("<button on-click=\"increment\">+</button>").unwrap();
		assert_eq!(description.value_count(), 0);
		assert_eq!(
			description.holes()[0].inputs,
			vec![Input::Method("increment".into())]
		);
	}

	#[rstest]
	#[case("<input x-model=\"name\">", "value")]
	#[case("<input type=\"checkbox\" x-model=\"done\">", "checked")]
	#[case("<text-field x-model=\"name\"></text-field>", "value")]
	fn test_model_desugars_to_attribute_and_change(#[case] markup: &'static str, #[case] bound: &str) {
		let description = compile_str(markup).unwrap();
		let holes = description.holes();
		assert_eq!(holes.len(), 2);
		let HoleKind::Attribute { name, .. } = &holes[0].kind else {
			panic!("expected attribute hole");
		};
		assert_eq!(name, bound);
		assert_eq!(
			holes[1].kind,
			HoleKind::Event {
				event: "change".into(),
				options: ListenerOptions::default(),
			}
		);
		assert!(matches!(holes[1].inputs[0], Input::ModelWriter(_)));
	}

	#[rstest]
	fn test_brace_escapes() {
		let description = compile_str("<p>{{literal}} {}</p>").unwrap();
		assert_eq!(description.value_count(), 1);
		let TNode::Element { children, .. } = &description.nodes()[0] else {
			panic!("expected element");
		};
		assert_eq!(children[0], TNode::Text("{literal} ".into()));
	}

	#[rstest]
	#[case("<p>{</p>", "unmatched `{` (use `{{` for a literal brace)")]
	#[case("<p>}</p>", "unmatched `}` (use `}}` for a literal brace)")]
	#[case("<button on-click=\"\">x</button>", "event attribute `on-click` on <button> needs a handler or method name")]
	#[case("<button on-click=\"a{}\">x</button>", "event attribute `on-click` on <button> must be a single hole or a method name")]
	#[case("<input x-model=\"{}\">", "x-model on <input> expects a static property name")]
	#[case("<{}>", "hole in tag name")]
	fn test_compile_errors(#[case] markup: &'static str, #[case] message: &str) {
		let err = compile_str(markup).unwrap_err();
		assert_eq!(
			err,
			TemplateError::Compile {
				site: "test.rs:1:1",
				message: message.to_string(),
			}
		);
	}
}
