//! Application options.
//!
//! Options can be built in code or deserialized from JSON. Missing fields take their
//! defaults.
//!
//! ```ignore
//! let options = AppOptions::from_json_str(r#"{ "max_flush_passes": 20 }"#)?;
//! let app = App::with_options(options);
//! ```

use serde::Deserialize;

use reinhardt_reactive::runtime::DEFAULT_MAX_FLUSH_PASSES;

/// Options for an [`App`](crate::component::App).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppOptions {
	/// Pass limit for one flush of the render queue.
	///
	/// A component whose render keeps writing state it depends on would otherwise loop
	/// forever; when the limit is hit the remaining work is dropped and an error is
	/// logged.
	pub max_flush_passes: usize,
	/// Whether duplicate keys in keyed lists are logged.
	pub warn_duplicate_keys: bool,
	/// Prefix of the location hash used by routers.
	pub hash_prefix: String,
	/// Whether component styles are injected into their shadow roots.
	pub inject_styles: bool,
}

impl Default for AppOptions {
	fn default() -> Self {
		Self {
			max_flush_passes: DEFAULT_MAX_FLUSH_PASSES,
			warn_duplicate_keys: true,
			hash_prefix: "#".to_string(),
			inject_styles: true,
		}
	}
}

impl AppOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses options from a JSON document.
	pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	/// Sets the flush pass limit.
	pub fn max_flush_passes(mut self, passes: usize) -> Self {
		self.max_flush_passes = passes;
		self
	}

	/// Silences duplicate-key warnings.
	pub fn quiet_duplicate_keys(mut self) -> Self {
		self.warn_duplicate_keys = false;
		self
	}

	/// Sets the location hash prefix (for example `#!`).
	pub fn hash_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.hash_prefix = prefix.into();
		self
	}

	/// Disables style injection.
	pub fn no_styles(mut self) -> Self {
		self.inject_styles = false;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_defaults() {
		let options = AppOptions::new();
		assert_eq!(options.max_flush_passes, DEFAULT_MAX_FLUSH_PASSES);
		assert!(options.warn_duplicate_keys);
		assert_eq!(options.hash_prefix, "#");
		assert!(options.inject_styles);
	}

	#[rstest]
	fn test_from_json_fills_missing_fields() {
		let options =
			AppOptions::from_json_str(r##"{ "max_flush_passes": 5, "hash_prefix": "#!" }"##).unwrap();
		assert_eq!(options.max_flush_passes, 5);
		assert_eq!(options.hash_prefix, "#!");
		assert!(options.inject_styles);
	}

	#[rstest]
	fn test_from_json_rejects_wrong_types() {
		assert!(AppOptions::from_json_str(r#"{ "inject_styles": "yes" }"#).is_err());
	}

	#[rstest]
	fn test_builder() {
		let options = AppOptions::new().max_flush_passes(3).quiet_duplicate_keys().no_styles();
		assert_eq!(options.max_flush_passes, 3);
		assert!(!options.warn_duplicate_keys);
		assert!(!options.inject_styles);
	}
}
