//! Markup parser shared by the template compiler and `raw()`.
//!
//! Templates are parsed with every hole replaced by [`HOLE`], a private-use character,
//! so hole positions are known structurally and values never take part in parsing. In
//! [`Mode::Template`] the parser is strict and reports malformed markup; in
//! [`Mode::Lenient`] (raw HTML) it recovers the way browsers do: stray closing tags are
//! dropped and unclosed elements are closed at the end of input.

/// Placeholder standing for a hole in template markup
pub(crate) const HOLE: char = '\u{E000}';

/// Elements that never have children
pub(crate) const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
	"track", "wbr",
];

/// Elements whose content is text up to the matching closing tag
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Raw text elements whose content may contain holes and entities
pub(crate) const ESCAPABLE_RAW_TEXT_ELEMENTS: &[&str] = &["textarea", "title"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
	Template,
	Lenient,
}

/// Part of an attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Piece {
	Text(String),
	Hole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MarkupAttr {
	Named {
		name: String,
		/// `None` for a bare attribute (`<input disabled>`)
		value: Option<Vec<Piece>>,
	},
	Spread,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MarkupNode {
	Element {
		tag: String,
		attrs: Vec<MarkupAttr>,
		children: Vec<MarkupNode>,
	},
	Text(String),
	Comment(String),
	Hole,
}

struct OpenElement {
	tag: String,
	attrs: Vec<MarkupAttr>,
	children: Vec<MarkupNode>,
}

struct Parser {
	chars: Vec<char>,
	pos: usize,
	mode: Mode,
}

/// Parses `input` into a forest of markup nodes.
pub(crate) fn parse(input: &str, mode: Mode) -> Result<Vec<MarkupNode>, String> {
	Parser {
		chars: input.chars().collect(),
		pos: 0,
		mode,
	}
	.run()
}

fn is_name_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

impl Parser {
	fn peek(&self) -> Option<char> {
		self.chars.get(self.pos).copied()
	}

	fn peek_at(&self, offset: usize) -> Option<char> {
		self.chars.get(self.pos + offset).copied()
	}

	fn starts_with(&self, s: &str) -> bool {
		s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
	}

	fn is_hole(&self, c: char) -> bool {
		c == HOLE && self.mode == Mode::Template
	}

	fn strict(&self) -> bool {
		self.mode == Mode::Template
	}

	fn skip_whitespace(&mut self) {
		while self.peek().is_some_and(char::is_whitespace) {
			self.pos += 1;
		}
	}

	fn run(mut self) -> Result<Vec<MarkupNode>, String> {
		let mut root = Vec::new();
		let mut stack: Vec<OpenElement> = Vec::new();
		let mut text = String::new();

		while let Some(c) = self.peek() {
			if self.is_hole(c) {
				flush_text(&mut text, &mut stack, &mut root);
				push_node(MarkupNode::Hole, &mut stack, &mut root);
				self.pos += 1;
				continue;
			}
			if c == '<' {
				if self.starts_with("<!--") {
					flush_text(&mut text, &mut stack, &mut root);
					let comment = self.comment()?;
					push_node(MarkupNode::Comment(comment), &mut stack, &mut root);
					continue;
				}
				if self.starts_with("</") {
					flush_text(&mut text, &mut stack, &mut root);
					let tag = self.closing_tag()?;
					self.close(&tag, &mut stack, &mut root)?;
					continue;
				}
				match self.peek_at(1) {
					Some(next) if next.is_ascii_alphabetic() => {
						flush_text(&mut text, &mut stack, &mut root);
						self.start_tag(&mut stack, &mut root)?;
						continue;
					}
					Some(next) if self.is_hole(next) => {
						return Err("hole in tag name".to_string());
					}
					_ => {}
				}
			}
			if c == '&' {
				text.push_str(&self.entity());
				continue;
			}
			text.push(c);
			self.pos += 1;
		}
		flush_text(&mut text, &mut stack, &mut root);

		if let Some(open) = stack.last()
			&& self.strict()
		{
			return Err(format!("unclosed <{}>", open.tag));
		}
		while let Some(open) = stack.pop() {
			let node = MarkupNode::Element {
				tag: open.tag,
				attrs: open.attrs,
				children: open.children,
			};
			push_node(node, &mut stack, &mut root);
		}
		Ok(root)
	}

	fn comment(&mut self) -> Result<String, String> {
		self.pos += 4;
		let mut content = String::new();
		loop {
			if self.starts_with("-->") {
				self.pos += 3;
				return Ok(content);
			}
			match self.peek() {
				Some(c) if self.is_hole(c) => return Err("hole inside comment".to_string()),
				Some(c) => {
					content.push(c);
					self.pos += 1;
				}
				None if self.strict() => return Err("unterminated comment".to_string()),
				None => return Ok(content),
			}
		}
	}

	fn closing_tag(&mut self) -> Result<String, String> {
		self.pos += 2;
		let mut tag = String::new();
		while let Some(c) = self.peek() {
			if self.is_hole(c) {
				return Err("hole in closing tag".to_string());
			}
			if !is_name_char(c) {
				break;
			}
			tag.push(c.to_ascii_lowercase());
			self.pos += 1;
		}
		self.skip_whitespace();
		match self.peek() {
			Some('>') => {
				self.pos += 1;
				Ok(tag)
			}
			Some(c) if self.is_hole(c) => Err("hole in closing tag".to_string()),
			_ if self.strict() => Err(format!("malformed closing tag </{tag}")),
			_ => {
				while self.peek().is_some_and(|c| c != '>') {
					self.pos += 1;
				}
				self.pos += 1;
				Ok(tag)
			}
		}
	}

	fn close(
		&mut self,
		tag: &str,
		stack: &mut Vec<OpenElement>,
		root: &mut Vec<MarkupNode>,
	) -> Result<(), String> {
		if self.strict() {
			let Some(open) = stack.pop() else {
				return Err(format!("unexpected closing tag </{tag}>"));
			};
			if open.tag != tag {
				return Err(format!(
					"mismatched closing tag </{tag}>, expected </{}>",
					open.tag
				));
			}
			let node = MarkupNode::Element {
				tag: open.tag,
				attrs: open.attrs,
				children: open.children,
			};
			push_node(node, stack, root);
			return Ok(());
		}

		// Lenient: close everything up to the matching element, ignore strays
		if !stack.iter().any(|open| open.tag == tag) {
			return Ok(());
		}
		while let Some(open) = stack.pop() {
			let matched = open.tag == tag;
			let node = MarkupNode::Element {
				tag: open.tag,
				attrs: open.attrs,
				children: open.children,
			};
			push_node(node, stack, root);
			if matched {
				break;
			}
		}
		Ok(())
	}

	fn start_tag(
		&mut self,
		stack: &mut Vec<OpenElement>,
		root: &mut Vec<MarkupNode>,
	) -> Result<(), String> {
		self.pos += 1;
		let mut tag = String::new();
		while let Some(c) = self.peek() {
			if !is_name_char(c) {
				break;
			}
			tag.push(c.to_ascii_lowercase());
			self.pos += 1;
		}
		if self.peek().is_some_and(|c| self.is_hole(c)) {
			return Err("hole in tag name".to_string());
		}

		let mut attrs = Vec::new();
		let mut self_closing = false;
		loop {
			self.skip_whitespace();
			match self.peek() {
				None => return Err(format!("unterminated <{tag}> tag")),
				Some('>') => {
					self.pos += 1;
					break;
				}
				Some('/') if self.peek_at(1) == Some('>') => {
					self.pos += 2;
					self_closing = true;
					break;
				}
				Some('/') => {
					self.pos += 1;
				}
				Some(c) if self.is_hole(c) => {
					self.pos += 1;
					if self
						.peek()
						.is_some_and(|c| !c.is_whitespace() && c != '>' && c != '/')
					{
						return Err(format!("hole in attribute name on <{tag}>"));
					}
					attrs.push(MarkupAttr::Spread);
				}
				Some(_) => attrs.push(self.attribute(&tag)?),
			}
		}

		if VOID_ELEMENTS.contains(&tag.as_str()) || self_closing {
			let node = MarkupNode::Element {
				tag,
				attrs,
				children: Vec::new(),
			};
			push_node(node, stack, root);
			return Ok(());
		}
		if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
			let children = self.raw_text(&tag)?;
			let node = MarkupNode::Element {
				tag,
				attrs,
				children,
			};
			push_node(node, stack, root);
			return Ok(());
		}
		stack.push(OpenElement {
			tag,
			attrs,
			children: Vec::new(),
		});
		Ok(())
	}

	fn attribute(&mut self, tag: &str) -> Result<MarkupAttr, String> {
		let mut name = String::new();
		while let Some(c) = self.peek() {
			if c.is_whitespace() || matches!(c, '=' | '>' | '/' | '"' | '\'') {
				break;
			}
			if self.is_hole(c) {
				return Err(format!("hole in attribute name `{name}` on <{tag}>"));
			}
			name.push(c.to_ascii_lowercase());
			self.pos += 1;
		}
		if name.is_empty() {
			return Err(format!("malformed attribute on <{tag}>"));
		}

		self.skip_whitespace();
		if self.peek() != Some('=') {
			return Ok(MarkupAttr::Named { name, value: None });
		}
		self.pos += 1;
		self.skip_whitespace();

		let value = match self.peek() {
			Some(quote @ ('"' | '\'')) => {
				self.pos += 1;
				self.attribute_value(|c| c == quote)
					.ok_or_else(|| format!("unterminated value of attribute `{name}` on <{tag}>"))?
			}
			Some(_) => {
				let pieces = self
					.attribute_value(|c| c.is_whitespace() || c == '>')
					.unwrap_or_default();
				// leave the terminator for the tag loop
				self.pos -= 1;
				pieces
			}
			None => return Err(format!("unterminated <{tag}> tag")),
		};
		Ok(MarkupAttr::Named {
			name,
			value: Some(value),
		})
	}

	/// Reads value pieces up to and including the terminator.
	///
	/// Returns `None` when the input ends first.
	fn attribute_value(&mut self, is_end: impl Fn(char) -> bool) -> Option<Vec<Piece>> {
		let mut pieces = Vec::new();
		let mut text = String::new();
		loop {
			let Some(c) = self.peek() else {
				if !text.is_empty() {
					pieces.push(Piece::Text(text));
				}
				self.pos += 1;
				return None;
			};
			if is_end(c) {
				self.pos += 1;
				break;
			}
			if self.is_hole(c) {
				if !text.is_empty() {
					pieces.push(Piece::Text(std::mem::take(&mut text)));
				}
				pieces.push(Piece::Hole);
				self.pos += 1;
			} else if c == '&' {
				text.push_str(&self.entity());
			} else {
				text.push(c);
				self.pos += 1;
			}
		}
		if !text.is_empty() {
			pieces.push(Piece::Text(text));
		}
		Some(pieces)
	}

	fn raw_text(&mut self, tag: &str) -> Result<Vec<MarkupNode>, String> {
		let escapable = ESCAPABLE_RAW_TEXT_ELEMENTS.contains(&tag);
		let closing = format!("</{tag}");
		let mut children = Vec::new();
		let mut text = String::new();
		loop {
			if self.starts_with_ignore_case(&closing) {
				self.pos += closing.chars().count();
				while self.peek().is_some_and(|c| c != '>') {
					self.pos += 1;
				}
				self.pos += 1;
				break;
			}
			match self.peek() {
				None if self.strict() => return Err(format!("unclosed <{tag}>")),
				None => break,
				Some(c) if self.is_hole(c) => {
					if !escapable {
						return Err(format!("holes are not allowed inside <{tag}>"));
					}
					if !text.is_empty() {
						children.push(MarkupNode::Text(std::mem::take(&mut text)));
					}
					children.push(MarkupNode::Hole);
					self.pos += 1;
				}
				Some('&') if escapable => text.push_str(&self.entity()),
				Some(c) => {
					text.push(c);
					self.pos += 1;
				}
			}
		}
		if !text.is_empty() {
			children.push(MarkupNode::Text(text));
		}
		Ok(children)
	}

	fn starts_with_ignore_case(&self, s: &str) -> bool {
		s.chars()
			.enumerate()
			.all(|(i, c)| self.peek_at(i).is_some_and(|p| p.eq_ignore_ascii_case(&c)))
	}

	/// Decodes a character reference at the cursor, or returns a literal `&`.
	fn entity(&mut self) -> String {
		let rest: String = self.chars[self.pos..].iter().take(12).collect();
		if let Some(end) = rest.find(';') {
			let name = &rest[1..end];
			let decoded = match name {
				"amp" => Some('&'),
				"lt" => Some('<'),
				"gt" => Some('>'),
				"quot" => Some('"'),
				"apos" => Some('\''),
				"nbsp" => Some('\u{a0}'),
				_ => name.strip_prefix('#').and_then(|num| {
					let code = match num.strip_prefix(['x', 'X']) {
						Some(hex) => u32::from_str_radix(hex, 16).ok(),
						None => num.parse().ok(),
					};
					code.and_then(char::from_u32)
				}),
			};
			if let Some(c) = decoded {
				self.pos += rest[..=end].chars().count();
				return c.to_string();
			}
		}
		self.pos += 1;
		"&".to_string()
	}
}

fn push_node(node: MarkupNode, stack: &mut [OpenElement], root: &mut Vec<MarkupNode>) {
	match stack.last_mut() {
		Some(open) => open.children.push(node),
		None => root.push(node),
	}
}

/// Emits pending text. Whitespace-only runs containing a newline are template
/// indentation and are dropped.
fn flush_text(text: &mut String, stack: &mut [OpenElement], root: &mut Vec<MarkupNode>) {
	if text.is_empty() {
		return;
	}
	let content = std::mem::take(text);
	if content.trim().is_empty() && content.contains('\n') {
		return;
	}
	push_node(MarkupNode::Text(content), stack, root);
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn template(markup: &str) -> Result<Vec<MarkupNode>, String> {
		parse(&markup.replace("{}", &HOLE.to_string()), Mode::Template)
	}

	fn element(tag: &str, attrs: Vec<MarkupAttr>, children: Vec<MarkupNode>) -> MarkupNode {
		MarkupNode::Element {
			tag: tag.to_string(),
			attrs,
			children,
		}
	}

	fn text(s: &str) -> MarkupNode {
		MarkupNode::Text(s.to_string())
	}

	#[rstest]
	fn test_parse_nested_elements_with_holes() {
		let nodes = template("<p class=\"a {}\">Count: {}</p>").unwrap();
		assert_eq!(
			nodes,
			vec![element(
				"p",
				vec![MarkupAttr::Named {
					name: "class".into(),
					value: Some(vec![Piece::Text("a ".into()), Piece::Hole]),
				}],
				vec![text("Count: "), MarkupNode::Hole],
			)]
		);
	}

	#[rstest]
	fn test_parse_void_and_self_closing() {
		let nodes = template("<input disabled><x-icon name=\"a\" /><br>").unwrap();
		assert_eq!(nodes.len(), 3);
		assert_eq!(
			nodes[0],
			element(
				"input",
				vec![MarkupAttr::Named {
					name: "disabled".into(),
					value: None
				}],
				vec![]
			)
		);
	}

	#[rstest]
	fn test_parse_spread_and_unquoted_hole() {
		let nodes = template("<div {} id={}></div>").unwrap();
		assert_eq!(
			nodes,
			vec![element(
				"div",
				vec![
					MarkupAttr::Spread,
					MarkupAttr::Named {
						name: "id".into(),
						value: Some(vec![Piece::Hole]),
					},
				],
				vec![],
			)]
		);
	}

	#[rstest]
	fn test_entities_are_decoded() {
		let nodes = template("<p title=\"&quot;x&quot;\">a &amp; b &#60; &unknown;</p>").unwrap();
		let MarkupNode::Element { attrs, children, .. } = &nodes[0] else {
			panic!("expected element");
		};
		assert_eq!(
			attrs[0],
			MarkupAttr::Named {
				name: "title".into(),
				value: Some(vec![Piece::Text("\"x\"".into())]),
			}
		);
		assert_eq!(children, &vec![text("a & b < &unknown;")]);
	}

	#[rstest]
	fn test_indentation_whitespace_dropped() {
		let nodes = template("<ul>\n  <li>a</li>\n  <li> </li>\n</ul>").unwrap();
		let MarkupNode::Element { children, .. } = &nodes[0] else {
			panic!("expected element");
		};
		assert_eq!(children.len(), 2);
		assert_eq!(children[1], element("li", vec![], vec![text(" ")]));
	}

	#[rstest]
	fn test_textarea_content_is_text() {
		let nodes = template("<textarea><b>{}</b></textarea>").unwrap();
		assert_eq!(
			nodes,
			vec![element(
				"textarea",
				vec![],
				vec![text("<b>"), MarkupNode::Hole, text("</b>")]
			)]
		);
	}

	#[rstest]
	#[case("<{}></{}>", "hole in tag name")]
	#[case("<div{}></div>", "hole in tag name")]
	#[case("<div></{}>", "hole in closing tag")]
	#[case("<!-- {} -->", "hole inside comment")]
	#[case("<div on-{}=\"x\"></div>", "hole in attribute name `on-` on <div>")]
	#[case("<div {}x></div>", "hole in attribute name on <div>")]
	#[case("<div class=\"a></div>", "unterminated value of attribute `class` on <div>")]
	#[case("<div", "unterminated <div> tag")]
	#[case("<div><span></div>", "mismatched closing tag </div>, expected </span>")]
	#[case("<div>", "unclosed <div>")]
	#[case("</p>", "unexpected closing tag </p>")]
	#[case("<style>{}</style>", "holes are not allowed inside <style>")]
	fn test_template_errors(#[case] markup: &str, #[case] message: &str) {
		assert_eq!(template(markup).unwrap_err(), message);
	}

	#[rstest]
	fn test_lenient_mode_recovers() {
		let nodes = parse("<b>bold</i> <em>open", Mode::Lenient).unwrap();
		assert_eq!(
			nodes,
			vec![
				element(
					"b",
					vec![],
					vec![
						text("bold"),
						text(" "),
						element("em", vec![], vec![text("open")])
					]
				),
			]
		);
	}

	#[rstest]
	fn test_lenient_mode_treats_placeholder_as_text() {
		let input = format!("<p>{HOLE}</p>");
		let nodes = parse(&input, Mode::Lenient).unwrap();
		assert_eq!(nodes, vec![element("p", vec![], vec![text(&HOLE.to_string())])]);
	}

	#[rstest]
	fn test_lone_angle_bracket_is_text() {
		let nodes = template("<p>a < b</p>").unwrap();
		assert_eq!(nodes, vec![element("p", vec![], vec![text("a < b")])]);
	}
}
