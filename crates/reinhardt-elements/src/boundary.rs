//! Ready-made error boundary component.
//!
//! ```ignore
//! app.define(error_boundary("x-boundary"))?;
//!
//! html!("<x-boundary><x-widget></x-widget></x-boundary>")
//! ```
//!
//! While its descendants render fine the boundary shows them through a `<slot>`. When
//! one fails, the boundary swaps to an alert with the first error message and a
//! Retry button.

use crate::component::{ComponentDefinition, Context};
use crate::error::RenderError;
use crate::html;
use crate::template::TemplateResult;

/// An error boundary registered under `tag` with the default fallback.
pub fn error_boundary(tag: impl Into<String>) -> ComponentDefinition {
	ComponentDefinition::new(tag)
		.template(|_| Ok(html!("<slot></slot>")))
		.error_boundary(default_fallback)
}

/// The fallback [`error_boundary`] renders.
pub fn default_fallback(_ctx: &Context, errors: &[RenderError]) -> TemplateResult {
	let message = errors
		.first()
		.map(ToString::to_string)
		.unwrap_or_default();
	html!(
		"<div class=\"error-boundary\" role=\"alert\"><p>{}</p><button on-click=\"retry\">Retry</button></div>",
		message
	)
}
