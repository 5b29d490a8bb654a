//! Error types for reinhardt-reactive

use thiserror::Error;

/// Error type for reactive state and store operations
#[derive(Debug, Error)]
pub enum ReactiveError {
	/// A JSON value that is not an object was given where an object is required
	#[error("Expected a JSON object, got {0}")]
	NotAnObject(&'static str),

	/// A JSON value that is not an array was given where an array is required
	#[error("Expected a JSON array, got {0}")]
	NotAnArray(&'static str),

	/// A store mutator was invoked by a name it does not define
	#[error("Store `{store}` has no mutator named `{name}`")]
	UnknownMutator {
		/// Store name
		store: String,
		/// Requested mutator
		name: String,
	},

	/// A snapshot could not be deserialized into the requested type
	#[error("Deserialization failed: {0}")]
	Deserialize(#[from] serde_json::Error),
}

/// Result type for reactive operations
pub type Result<T> = std::result::Result<T, ReactiveError>;
