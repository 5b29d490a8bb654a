//! Templates: the `html!` authoring surface, hole values and compilation.
//!
//! A template is markup with `{}` holes, written at a fixed call site:
//!
//! ```ignore
//! use reinhardt_elements::html;
//!
//! fn view(count: i64, class: &str) -> TemplateResult {
//!     html!("<p class=\"{}\">Count: {}</p>", class, count)
//! }
//! ```
//!
//! The markup is compiled once per call site into a [`TemplateDescription`]; each call
//! of the macro only produces a [`TemplateResult`] pairing the call site with the
//! current values. Values never take part in parsing: a string in a hole is always
//! text, never markup. Use [`raw`](crate::directive::raw) to insert markup.
//!
//! ## Hole positions
//!
//! | Position | Kind | Accepts |
//! |----------|------|---------|
//! | element content | `Child` | scalars, templates, directives, sequences |
//! | `textarea` / `title` content | `Text` | scalars |
//! | attribute value | `Attribute` | scalars (booleans toggle the attribute) |
//! | `on-<event>` value | `Event` | [`Callback`] or a method name |
//! | attribute position | `Spread` | [`HoleValue::attrs`] or a reactive object |
//!
//! `{{` and `}}` write literal braces.

mod cache;
pub mod compiler;

pub use cache::{TemplateCache, with_template_cache};
pub use compiler::{
	EVENT_MODIFIERS, EVENT_PREFIX, Hole, HoleKind, Input, MODEL_ATTRIBUTE, TemplateDescription,
	compile, parse_event_attribute,
};

use std::ptr;
use std::rc::Rc;

use reinhardt_reactive::{ReactiveList, ReactiveObject, Value};

use crate::callback::Callback;
use crate::directive::{Choice, KeyedList, Raw};
use crate::error::TemplateError;

/// Markup of one `html!` call site.
#[derive(Debug)]
pub struct TemplateSource {
	site: &'static str,
	markup: &'static str,
}

impl TemplateSource {
	/// Creates a source. `site` identifies the call site (`file:line:column`).
	pub const fn new(site: &'static str, markup: &'static str) -> Self {
		Self { site, markup }
	}

	/// Call site.
	pub fn site(&self) -> &'static str {
		self.site
	}

	/// Markup with `{}` holes.
	pub fn markup(&self) -> &'static str {
		self.markup
	}

	/// Returns true if both sources describe the same call site.
	pub fn same_site(&self, other: &TemplateSource) -> bool {
		ptr::eq(self, other) || (self.site == other.site && self.markup == other.markup)
	}
}

/// One render of a template: its call site and the values for its holes.
#[derive(Debug, Clone)]
pub struct TemplateResult {
	source: &'static TemplateSource,
	values: Vec<HoleValue>,
}

impl TemplateResult {
	/// Pairs a source with hole values. Usually written through [`html!`](crate::html).
	pub fn new(source: &'static TemplateSource, values: Vec<HoleValue>) -> Self {
		Self { source, values }
	}

	/// Call site of the template.
	pub fn source(&self) -> &'static TemplateSource {
		self.source
	}

	/// Values for the holes, in order of appearance.
	pub fn values(&self) -> &[HoleValue] {
		&self.values
	}

	pub(crate) fn into_parts(self) -> (&'static TemplateSource, Vec<HoleValue>) {
		(self.source, self.values)
	}

	/// Returns true if both results come from the same call site and can be patched
	/// into one another.
	pub fn is_compatible(&self, other: &TemplateResult) -> bool {
		self.source.same_site(other.source)
	}

	/// Compiles (or fetches from the thread's cache) the template description.
	pub fn description(&self) -> Result<Rc<TemplateDescription>, TemplateError> {
		with_template_cache(|cache| cache.get_or_compile(self.source))
	}
}

/// A value bound to a hole.
#[derive(Debug, Clone)]
pub enum HoleValue {
	/// A scalar or reactive value; `Null` renders nothing
	Data(Value),
	/// A nested template
	Template(TemplateResult),
	/// Output of `when` / `when_else`
	Choice(Choice),
	/// Output of `each` / `each_keyed`
	List(KeyedList),
	/// Markup inserted verbatim
	Raw(Raw),
	/// Several values rendered one after another
	Seq(Vec<HoleValue>),
	/// An event handler
	Handler(Callback),
	/// Attribute pairs for a spread hole
	Attrs(Vec<(String, HoleValue)>),
}

impl Default for HoleValue {
	fn default() -> Self {
		HoleValue::Data(Value::Null)
	}
}

impl HoleValue {
	/// Builds a spread value from attribute pairs.
	pub fn attrs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<HoleValue>,
	{
		HoleValue::Attrs(
			pairs
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		)
	}

	/// Returns true for `Data(Null)`.
	pub fn is_empty(&self) -> bool {
		matches!(self, HoleValue::Data(Value::Null))
	}

	/// Short name used in error messages.
	pub fn type_name(&self) -> &'static str {
		match self {
			HoleValue::Data(_) => "data",
			HoleValue::Template(_) => "template",
			HoleValue::Choice(_) => "choice",
			HoleValue::List(_) => "keyed list",
			HoleValue::Raw(_) => "raw markup",
			HoleValue::Seq(_) => "sequence",
			HoleValue::Handler(_) => "handler",
			HoleValue::Attrs(_) => "attribute map",
		}
	}
}

macro_rules! impl_from_data {
	($($ty:ty),* $(,)?) => {
		$(
			impl From<$ty> for HoleValue {
				fn from(value: $ty) -> Self {
					HoleValue::Data(Value::from(value))
				}
			}
		)*
	};
}

impl_from_data!(
	i8,
	i16,
	i32,
	i64,
	u8,
	u16,
	u32,
	usize,
	f32,
	f64,
	bool,
	&str,
	String,
	&String,
	Rc<str>,
	ReactiveList,
	ReactiveObject,
	serde_json::Value,
);

impl From<Value> for HoleValue {
	fn from(value: Value) -> Self {
		HoleValue::Data(value)
	}
}

impl From<&Value> for HoleValue {
	fn from(value: &Value) -> Self {
		HoleValue::Data(value.clone())
	}
}

impl From<TemplateResult> for HoleValue {
	fn from(result: TemplateResult) -> Self {
		HoleValue::Template(result)
	}
}

impl From<Choice> for HoleValue {
	fn from(choice: Choice) -> Self {
		HoleValue::Choice(choice)
	}
}

impl From<KeyedList> for HoleValue {
	fn from(list: KeyedList) -> Self {
		HoleValue::List(list)
	}
}

impl From<Raw> for HoleValue {
	fn from(raw: Raw) -> Self {
		HoleValue::Raw(raw)
	}
}

impl From<Callback> for HoleValue {
	fn from(callback: Callback) -> Self {
		HoleValue::Handler(callback)
	}
}

impl<T: Into<HoleValue>> From<Option<T>> for HoleValue {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or_default()
	}
}

impl<T: Into<HoleValue>> From<Vec<T>> for HoleValue {
	fn from(values: Vec<T>) -> Self {
		HoleValue::Seq(values.into_iter().map(Into::into).collect())
	}
}

/// Builds a [`TemplateResult`] from markup with `{}` holes.
///
/// Each invocation is its own call site: the markup is compiled the first time the
/// site renders and reused afterwards.
///
/// ```ignore
/// html!("<li class=\"{}\">{}</li>", when_else(done, "done", ""), title)
/// ```
#[macro_export]
macro_rules! html {
	($markup:literal $(, $value:expr)* $(,)?) => {{
		static SOURCE: $crate::template::TemplateSource = $crate::template::TemplateSource::new(
			concat!(file!(), ":", line!(), ":", column!()),
			$markup,
		);
		$crate::template::TemplateResult::new(
			&SOURCE,
			vec![$($crate::template::HoleValue::from($value)),*],
		)
	}};
}
