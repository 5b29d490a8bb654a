//! Error types for reinhardt-elements

use reinhardt_reactive::ReactiveError;
use thiserror::Error;

/// A template failed to compile.
///
/// Compile errors are cached together with successful compilations, so every render of
/// the offending call site reports the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
	/// The markup of the template at `site` is not valid
	#[error("Template compile error at {site}: {message}")]
	Compile {
		/// `file:line:column` of the `html!` invocation
		site: &'static str,
		/// What went wrong
		message: String,
	},
}

impl TemplateError {
	pub(crate) fn compile(site: &'static str, message: impl Into<String>) -> Self {
		Self::Compile {
			site,
			message: message.into(),
		}
	}
}

/// A render pass failed.
///
/// Render errors never leave the document half patched: every variant is raised during
/// the preparation pass, before the first mutation.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
	/// A template (possibly nested) failed to compile
	#[error(transparent)]
	Template(#[from] TemplateError),

	/// The number of values passed to a template does not match its holes
	#[error("Template at {site} expects {expected} values, got {actual}")]
	ValueCount {
		/// Template call site
		site: &'static str,
		/// Holes in the template
		expected: usize,
		/// Values supplied
		actual: usize,
	},

	/// A value is not accepted by the hole it was passed to
	#[error("Invalid value for {hole} hole at {site}: {message}")]
	InvalidHoleValue {
		/// Template call site
		site: &'static str,
		/// Hole kind
		hole: &'static str,
		/// What was wrong with the value
		message: String,
	},

	/// An event hole named a method the component does not define
	#[error("Unknown method `{0}`")]
	UnknownMethod(String),

	/// `x-model` was used outside a component
	#[error("x-model=\"{0}\" requires a component context")]
	ModelUnavailable(String),

	/// A component template returned an error
	#[error("Render failed: {0}")]
	Failed(String),

	/// A component template panicked
	#[error("Render panicked: {0}")]
	Panicked(String),
}

impl RenderError {
	/// Creates a [`RenderError::Failed`] from any message.
	pub fn msg(message: impl Into<String>) -> Self {
		Self::Failed(message.into())
	}

	pub(crate) fn invalid(site: &'static str, hole: &'static str, message: impl Into<String>) -> Self {
		Self::InvalidHoleValue {
			site,
			hole,
			message: message.into(),
		}
	}
}

impl From<ReactiveError> for RenderError {
	fn from(err: ReactiveError) -> Self {
		Self::Failed(err.to_string())
	}
}

/// Component registration and mounting errors
#[derive(Debug, Error)]
pub enum ComponentError {
	/// Tag names must contain a hyphen
	#[error("Invalid component tag `{0}`: custom element names must contain a hyphen")]
	InvalidTagName(String),

	/// A definition with this tag is already registered
	#[error("Component `{0}` is already defined")]
	AlreadyDefined(String),

	/// No definition is registered for this tag
	#[error("Component `{0}` is not defined")]
	NotDefined(String),

	/// The definition has no template function
	#[error("Component `{0}` has no template")]
	MissingTemplate(String),

	/// The node given as a container does not exist or cannot hold children
	#[error("Node {0} cannot be used as a mount container")]
	InvalidContainer(usize),

	/// No mounted component instance lives on this host element
	#[error("No component is mounted on node {0}")]
	NotMounted(usize),

	/// `data()` did not return a JSON object
	#[error("Initial state of `{tag}` is invalid: {source}")]
	InvalidState {
		/// Component tag
		tag: String,
		/// Underlying conversion error
		source: ReactiveError,
	},
}

/// Router errors
#[derive(Debug, Error)]
pub enum RouterError {
	/// A route pattern could not be parsed
	#[error("Invalid route pattern `{pattern}`: {message}")]
	InvalidPattern {
		/// The offending pattern
		pattern: String,
		/// Parser message
		message: String,
	},

	/// No route matched and no not-found component is configured
	#[error("No route matches `{0}`")]
	NotFound(String),

	/// `reverse` was asked for a tag no route renders
	#[error("No route renders component `{0}`")]
	UnknownRoute(String),

	/// `reverse` was called without a parameter the pattern needs
	#[error("Missing parameter `{param}` for route `{pattern}`")]
	MissingParam {
		/// Route pattern
		pattern: String,
		/// Missing parameter name
		param: String,
	},

	/// The routed component could not be mounted
	#[error(transparent)]
	Component(#[from] ComponentError),
}

/// Result type for component operations
pub type Result<T> = std::result::Result<T, ComponentError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_template_error_carries_site() {
		let err = TemplateError::compile("src/app.rs:10:5", "hole in tag name");
		assert_eq!(
			err.to_string(),
			"Template compile error at src/app.rs:10:5: hole in tag name"
		);
	}

	#[rstest]
	fn test_render_error_from_template_error_is_transparent() {
		let err: RenderError = TemplateError::compile("a.rs:1:1", "unclosed <div>").into();
		assert_eq!(err.to_string(), "Template compile error at a.rs:1:1: unclosed <div>");
	}

	#[rstest]
	#[case(ComponentError::InvalidTagName("counter".into()), "Invalid component tag `counter`: custom element names must contain a hyphen")]
	#[case(ComponentError::AlreadyDefined("x-a".into()), "Component `x-a` is already defined")]
	#[case(ComponentError::NotDefined("x-b".into()), "Component `x-b` is not defined")]
	fn test_component_error_messages(#[case] err: ComponentError, #[case] expected: &str) {
		assert_eq!(err.to_string(), expected);
	}
}
