//! Component props.

use reinhardt_reactive::{ReactiveList, Value};

use crate::template::{HoleValue, TemplateResult};

/// A value passed from a parent to a child component.
///
/// Props are a closed set of variants. Scalars and objects compare by value equality
/// (objects by reference), lists by reference identity: mutating a list in place does
/// not re-deliver it, replacing it does.
#[derive(Debug, Clone)]
pub enum Prop {
	/// A scalar or object
	Value(Value),
	/// A list, compared by reference
	List(ReactiveList),
	/// Content rendered by the parent
	Render(TemplateResult),
}

impl Prop {
	/// Returns true if delivering `other` in place of `self` is not a change.
	///
	/// Render props are never considered unchanged.
	pub fn same(&self, other: &Prop) -> bool {
		match (self, other) {
			(Prop::Value(a), Prop::Value(b)) => a == b,
			(Prop::List(a), Prop::List(b)) => a.ptr_eq(b),
			_ => false,
		}
	}

	/// The prop as a value. Render props are `Null`.
	pub fn to_value(&self) -> Value {
		match self {
			Prop::Value(value) => value.clone(),
			Prop::List(list) => Value::List(list.clone()),
			Prop::Render(_) => Value::Null,
		}
	}

	/// Variant name used in diagnostics.
	pub fn kind(&self) -> &'static str {
		match self {
			Prop::Value(_) => "value",
			Prop::List(_) => "list",
			Prop::Render(_) => "render",
		}
	}
}

impl Default for Prop {
	fn default() -> Self {
		Prop::Value(Value::Null)
	}
}

impl From<Value> for Prop {
	fn from(value: Value) -> Self {
		match value {
			Value::List(list) => Prop::List(list),
			other => Prop::Value(other),
		}
	}
}

impl From<ReactiveList> for Prop {
	fn from(list: ReactiveList) -> Self {
		Prop::List(list)
	}
}

impl From<TemplateResult> for Prop {
	fn from(result: TemplateResult) -> Self {
		Prop::Render(result)
	}
}

impl From<&str> for Prop {
	fn from(value: &str) -> Self {
		Prop::Value(Value::from(value))
	}
}

impl From<String> for Prop {
	fn from(value: String) -> Self {
		Prop::Value(Value::from(value))
	}
}

impl From<i64> for Prop {
	fn from(value: i64) -> Self {
		Prop::Value(Value::Int(value))
	}
}

impl From<i32> for Prop {
	fn from(value: i32) -> Self {
		Prop::Value(Value::from(value))
	}
}

impl From<bool> for Prop {
	fn from(value: bool) -> Self {
		Prop::Value(Value::Bool(value))
	}
}

impl From<serde_json::Value> for Prop {
	fn from(value: serde_json::Value) -> Self {
		Prop::from(Value::from_json(value))
	}
}

impl From<Prop> for HoleValue {
	fn from(prop: Prop) -> Self {
		match prop {
			Prop::Value(value) => HoleValue::Data(value),
			Prop::List(list) => HoleValue::Data(Value::List(list)),
			Prop::Render(result) => HoleValue::Template(result),
		}
	}
}
