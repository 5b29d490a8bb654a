//! Dynamic values stored in reactive objects and lists.

use core::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;

use crate::error::ReactiveError;
use crate::object::{ReactiveList, ReactiveObject};

/// A value held by a reactive container.
///
/// Scalars compare by value. Lists and objects compare by reference identity: replacing
/// a collection with a new one is a change, mutating it in place is not a change of the
/// field that holds it.
#[derive(Clone, Default)]
pub enum Value {
	/// Absent value
	#[default]
	Null,
	/// Boolean
	Bool(bool),
	/// Integer
	Int(i64),
	/// Floating point number
	Float(f64),
	/// String
	Str(Rc<str>),
	/// Reactive list
	List(ReactiveList),
	/// Reactive object
	Object(ReactiveObject),
}

impl Value {
	/// Returns true for `Null`, `Bool`, `Int`, `Float` and `Str`.
	pub fn is_scalar(&self) -> bool {
		!matches!(self, Value::List(_) | Value::Object(_))
	}

	/// Returns true for `Null`.
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Truthiness used by boolean attributes and conditions.
	///
	/// `Null`, `false`, `0`, `NaN` and the empty string are falsy; collections are truthy.
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Null => false,
			Value::Bool(b) => *b,
			Value::Int(n) => *n != 0,
			Value::Float(f) => *f != 0.0 && !f.is_nan(),
			Value::Str(s) => !s.is_empty(),
			Value::List(_) | Value::Object(_) => true,
		}
	}

	/// Returns the string slice if this is a `Str`.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Str(s) => Some(s),
			_ => None,
		}
	}

	/// Returns the boolean if this is a `Bool`.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	/// Returns the integer, converting integral floats and numeric strings.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Int(n) => Some(*n),
			Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
			Value::Str(s) => s.trim().parse().ok(),
			_ => None,
		}
	}

	/// Returns the number as `f64`, converting integers and numeric strings.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Int(n) => Some(*n as f64),
			Value::Float(f) => Some(*f),
			Value::Str(s) => s.trim().parse().ok(),
			_ => None,
		}
	}

	/// Returns the list if this is a `List`.
	pub fn as_list(&self) -> Option<&ReactiveList> {
		match self {
			Value::List(list) => Some(list),
			_ => None,
		}
	}

	/// Returns the object if this is an `Object`.
	pub fn as_object(&self) -> Option<&ReactiveObject> {
		match self {
			Value::Object(object) => Some(object),
			_ => None,
		}
	}

	/// Text rendering of a value as it appears in a text node or attribute.
	///
	/// `Null` renders as the empty string; integral floats drop the fraction.
	pub fn to_display(&self) -> String {
		match self {
			Value::Null => String::new(),
			Value::Bool(b) => b.to_string(),
			Value::Int(n) => n.to_string(),
			Value::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
				format!("{}", *f as i64)
			}
			Value::Float(f) => f.to_string(),
			Value::Str(s) => s.to_string(),
			Value::List(_) | Value::Object(_) => self.to_json().to_string(),
		}
	}

	/// Deep snapshot as JSON. Reads are tracked.
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Value::Null => serde_json::Value::Null,
			Value::Bool(b) => serde_json::Value::Bool(*b),
			Value::Int(n) => serde_json::Value::from(*n),
			Value::Float(f) => serde_json::Number::from_f64(*f)
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
			Value::Str(s) => serde_json::Value::String(s.to_string()),
			Value::List(list) => list.to_json(),
			Value::Object(object) => object.to_json(),
		}
	}

	/// Deserializes a deep snapshot into `T`.
	pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ReactiveError> {
		serde_json::from_value(self.to_json()).map_err(ReactiveError::from)
	}

	/// Converts plain JSON, wrapping collections eagerly at the top level.
	///
	/// Nested collections stay plain until first accessed.
	pub fn from_json(json: serde_json::Value) -> Self {
		match json {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => match n.as_i64() {
				Some(i) => Value::Int(i),
				None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
			},
			serde_json::Value::String(s) => Value::Str(s.into()),
			serde_json::Value::Array(items) => Value::List(ReactiveList::from_items(items)),
			serde_json::Value::Object(map) => Value::Object(ReactiveObject::from_map(map)),
		}
	}

	/// Short name of the variant, used in error messages.
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Int(_) => "int",
			Value::Float(_) => "float",
			Value::Str(_) => "string",
			Value::List(_) => "list",
			Value::Object(_) => "object",
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Int(a), Value::Int(b)) => a == b,
			(Value::Float(a), Value::Float(b)) => a == b,
			(Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
			(Value::Str(a), Value::Str(b)) => a == b,
			(Value::List(a), Value::List(b)) => a.ptr_eq(b),
			(Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
			_ => false,
		}
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => write!(f, "Null"),
			Value::Bool(b) => write!(f, "Bool({b})"),
			Value::Int(n) => write!(f, "Int({n})"),
			Value::Float(x) => write!(f, "Float({x})"),
			Value::Str(s) => write!(f, "Str({s:?})"),
			Value::List(list) => f.debug_tuple("List").field(list).finish(),
			Value::Object(object) => f.debug_tuple("Object").field(object).finish(),
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_display())
	}
}

macro_rules! impl_from_int {
	($($ty:ty),* $(,)?) => {
		$(
			impl From<$ty> for Value {
				fn from(n: $ty) -> Self {
					Value::Int(i64::from(n))
				}
			}
		)*
	};
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

// Unsigned values past `i64::MAX` become floats instead of wrapping.
macro_rules! impl_from_wide_int {
	($($ty:ty),* $(,)?) => {
		$(
			impl From<$ty> for Value {
				fn from(n: $ty) -> Self {
					match i64::try_from(n) {
						Ok(n) => Value::Int(n),
						Err(_) => Value::Float(n as f64),
					}
				}
			}
		)*
	};
}

impl_from_wide_int!(u64, usize);

impl From<f32> for Value {
	fn from(f: f32) -> Self {
		Value::Float(f as f64)
	}
}

impl From<f64> for Value {
	fn from(f: f64) -> Self {
		Value::Float(f)
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::Str(s.into())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::Str(s.into())
	}
}

impl From<&String> for Value {
	fn from(s: &String) -> Self {
		Value::Str(s.as_str().into())
	}
}

impl From<Rc<str>> for Value {
	fn from(s: Rc<str>) -> Self {
		Value::Str(s)
	}
}

impl From<ReactiveList> for Value {
	fn from(list: ReactiveList) -> Self {
		Value::List(list)
	}
}

impl From<ReactiveObject> for Value {
	fn from(object: ReactiveObject) -> Self {
		Value::Object(object)
	}
}

impl From<serde_json::Value> for Value {
	fn from(json: serde_json::Value) -> Self {
		Value::from_json(json)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or(Value::Null)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(Value::Null, "")]
	#[case(Value::Bool(true), "true")]
	#[case(Value::Int(99), "99")]
	#[case(Value::Float(2.0), "2")]
	#[case(Value::Float(2.5), "2.5")]
	#[case(Value::from("<b>"), "<b>")]
	fn test_to_display(#[case] value: Value, #[case] expected: &str) {
		assert_eq!(value.to_display(), expected);
	}

	#[rstest]
	#[case(Value::Null, false)]
	#[case(Value::Int(0), false)]
	#[case(Value::from(""), false)]
	#[case(Value::Float(f64::NAN), false)]
	#[case(Value::Int(3), true)]
	#[case(Value::from("no"), true)]
	fn test_truthiness(#[case] value: Value, #[case] expected: bool) {
		assert_eq!(value.is_truthy(), expected);
	}

	#[rstest]
	fn test_wide_unsigned_values_do_not_wrap() {
		assert_eq!(Value::from(42usize), Value::Int(42));
		assert_eq!(Value::from(i64::MAX as u64), Value::Int(i64::MAX));
		let big = Value::from(u64::MAX);
		assert!(matches!(big, Value::Float(f) if f > 0.0));
	}

	#[rstest]
	#[case(Value::Null, "null")]
	#[case(Value::Int(1), "int")]
	#[case(Value::from("a"), "string")]
	#[case(Value::from(json!([1])), "list")]
	#[case(Value::from(json!({ "a": 1 })), "object")]
	fn test_type_name(#[case] value: Value, #[case] expected: &str) {
		assert_eq!(value.type_name(), expected);
	}

	#[rstest]
	fn test_collections_compare_by_identity() {
		let a = Value::from(json!([1, 2]));
		let b = Value::from(json!([1, 2]));
		assert_ne!(a, b);
		assert_eq!(a, a.clone());
	}

	#[rstest]
	fn test_numeric_conversions() {
		assert_eq!(Value::from("42").as_i64(), Some(42));
		assert_eq!(Value::Float(3.0).as_i64(), Some(3));
		assert_eq!(Value::Int(1), Value::Float(1.0));
	}

	#[rstest]
	fn test_deserialize_snapshot() {
		let value = Value::from(json!({ "id": 7, "name": "lamp" }));

		#[derive(serde::Deserialize)]
		struct Product {
			id: u32,
			name: String,
		}

		let product: Product = value.deserialize().unwrap();
		assert_eq!(product.id, 7);
		assert_eq!(product.name, "lamp");
	}
}
