//! Component definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use reinhardt_reactive::Store;

use crate::dom::Event;
use crate::error::{ComponentError, RenderError};
use crate::prop::Prop;
use crate::template::TemplateResult;

use super::Context;

/// Produces the initial state of an instance.
pub type DataFn = Rc<dyn Fn() -> serde_json::Value>;
/// A method bound to an instance.
pub type MethodFn = Rc<dyn Fn(&Context, &Event)>;
/// A lifecycle hook.
pub type HookFn = Rc<dyn Fn(&Context)>;
/// Called with `(name, new, old)` when a prop changes.
pub type PropsChangedFn = Rc<dyn Fn(&Context, &str, &Prop, &Prop)>;
/// Renders an instance.
pub type TemplateFn = Rc<dyn Fn(&Context) -> Result<TemplateResult, RenderError>>;
/// Renders the fallback of an error boundary.
pub type FallbackFn = Rc<dyn Fn(&Context, &[RenderError]) -> TemplateResult>;

/// Declaration of a component registered under a custom element tag.
///
/// # Example
///
/// ```ignore
/// use reinhardt_elements::{component::ComponentDefinition, html};
///
/// let counter = ComponentDefinition::new("x-counter")
///     .prop("label", "Count")
///     .data(|| serde_json::json!({ "count": 0 }))
///     .method("increment", |ctx, _event| {
///         ctx.state().update("count", |n| (n.as_i64().unwrap_or(0) + 1).into());
///     })
///     .template(|ctx| {
///         Ok(html!(
///             "<button on-click=\"increment\">{}: {}</button>",
///             ctx.prop_value("label"),
///             ctx.state().get("count"),
///         ))
///     })
///     .styles("button { font-weight: bold; }");
/// ```
#[derive(Clone)]
pub struct ComponentDefinition {
	pub(crate) tag: String,
	pub(crate) props: Vec<(String, Prop)>,
	pub(crate) data: Option<DataFn>,
	pub(crate) methods: BTreeMap<String, MethodFn>,
	pub(crate) mounted: Option<HookFn>,
	pub(crate) unmounted: Option<HookFn>,
	pub(crate) props_changed: Option<PropsChangedFn>,
	pub(crate) template: Option<TemplateFn>,
	pub(crate) styles: Option<String>,
	pub(crate) stores: BTreeMap<String, Store>,
	pub(crate) fallback: Option<FallbackFn>,
}

impl ComponentDefinition {
	/// Starts a definition for `tag`.
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			tag: tag.into(),
			props: Vec::new(),
			data: None,
			methods: BTreeMap::new(),
			mounted: None,
			unmounted: None,
			props_changed: None,
			template: None,
			styles: None,
			stores: BTreeMap::new(),
			fallback: None,
		}
	}

	/// Component tag.
	pub fn tag(&self) -> &str {
		&self.tag
	}

	/// Declares a prop with its default value.
	pub fn prop(mut self, name: impl Into<String>, default: impl Into<Prop>) -> Self {
		let name = name.into();
		let default = default.into();
		match self.props.iter_mut().find(|(n, _)| *n == name) {
			Some((_, slot)) => *slot = default,
			None => self.props.push((name, default)),
		}
		self
	}

	/// Sets the function producing each instance's initial state. It must return a
	/// JSON object.
	pub fn data<F>(mut self, f: F) -> Self
	where
		F: Fn() -> serde_json::Value + 'static,
	{
		self.data = Some(Rc::new(f));
		self
	}

	/// Adds a method, callable by name from event holes (`on-click="name"`).
	pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
	where
		F: Fn(&Context, &Event) + 'static,
	{
		self.methods.insert(name.into(), Rc::new(f));
		self
	}

	/// Runs after the first successful render.
	pub fn mounted<F>(mut self, f: F) -> Self
	where
		F: Fn(&Context) + 'static,
	{
		self.mounted = Some(Rc::new(f));
		self
	}

	/// Runs when the instance is unmounted.
	pub fn unmounted<F>(mut self, f: F) -> Self
	where
		F: Fn(&Context) + 'static,
	{
		self.unmounted = Some(Rc::new(f));
		self
	}

	/// Runs when a prop receives a different value, before the re-render.
	pub fn props_changed<F>(mut self, f: F) -> Self
	where
		F: Fn(&Context, &str, &Prop, &Prop) + 'static,
	{
		self.props_changed = Some(Rc::new(f));
		self
	}

	/// Sets the render function.
	pub fn template<F>(mut self, f: F) -> Self
	where
		F: Fn(&Context) -> Result<TemplateResult, RenderError> + 'static,
	{
		self.template = Some(Rc::new(f));
		self
	}

	/// Stylesheet injected into every instance's shadow root.
	pub fn styles(mut self, css: impl Into<String>) -> Self {
		self.styles = Some(css.into());
		self
	}

	/// Makes `store` available to the template as `ctx.store(name)`.
	pub fn store(mut self, name: impl Into<String>, store: Store) -> Self {
		self.stores.insert(name.into(), store);
		self
	}

	/// Turns the component into an error boundary.
	///
	/// Render failures of descendant components are captured here: the boundary renders
	/// `fallback` until the built-in `retry` method is called.
	pub fn error_boundary<F>(mut self, fallback: F) -> Self
	where
		F: Fn(&Context, &[RenderError]) -> TemplateResult + 'static,
	{
		self.fallback = Some(Rc::new(fallback));
		self
	}

	/// Returns true if the component captures descendant render errors.
	pub fn is_error_boundary(&self) -> bool {
		self.fallback.is_some()
	}

	/// Default value of a declared prop.
	pub fn default_prop(&self, name: &str) -> Option<&Prop> {
		self.props.iter().find(|(n, _)| n == name).map(|(_, p)| p)
	}

	pub(crate) fn validate(&self) -> Result<(), ComponentError> {
		if !is_valid_tag(&self.tag) {
			return Err(ComponentError::InvalidTagName(self.tag.clone()));
		}
		if self.template.is_none() {
			return Err(ComponentError::MissingTemplate(self.tag.clone()));
		}
		Ok(())
	}
}

impl fmt::Debug for ComponentDefinition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentDefinition")
			.field("tag", &self.tag)
			.field("props", &self.props)
			.field("methods", &self.methods.keys().collect::<Vec<_>>())
			.field("stores", &self.stores.keys().collect::<Vec<_>>())
			.field("error_boundary", &self.fallback.is_some())
			.finish_non_exhaustive()
	}
}

/// Custom element names: lowercase ASCII letter first, at least one hyphen, no
/// uppercase or whitespace.
pub(crate) fn is_valid_tag(tag: &str) -> bool {
	tag.starts_with(|c: char| c.is_ascii_lowercase())
		&& tag.contains('-')
		&& !tag.ends_with('-')
		&& tag
			.chars()
			.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("x-counter", true)]
	#[case("todo-item-2", true)]
	#[case("counter", false)]
	#[case("X-counter", false)]
	#[case("-counter", false)]
	#[case("x-", false)]
	#[case("x counter", false)]
	fn test_is_valid_tag(#[case] tag: &str, #[case] valid: bool) {
		assert_eq!(is_valid_tag(tag), valid);
	}

	#[rstest]
	fn test_validate_requires_template() {
		let err = ComponentDefinition::new("x-empty").validate().unwrap_err();
		assert!(matches!(err, ComponentError::MissingTemplate(tag) if tag == "x-empty"));
	}

	#[rstest]
	fn test_prop_redeclaration_replaces_default() {
		let def = ComponentDefinition::new("x-a").prop("label", "a").prop("label", "b");
		assert_eq!(def.props.len(), 1);
		assert!(def.default_prop("label").unwrap().same(&Prop::from("b")));
	}
}
