//! Preparation pass: validates a render and resolves every hole value.
//!
//! Nothing here touches the document. A render that fails preparation leaves the
//! previous frame exactly as it was.

use std::rc::Rc;

use reinhardt_reactive::Value;

use crate::callback::Callback;
use crate::directive::{Branch, Key};
use crate::dom::{ListenerOptions, is_boolean_attr};
use crate::error::RenderError;
use crate::prop::Prop;
use crate::template::{
	HoleKind, HoleValue, Input, TemplateDescription, TemplateResult, TemplateSource,
	with_template_cache,
};

use super::RenderHost;

/// Resolved content of a region.
#[derive(Debug)]
pub(crate) enum Prepared {
	Empty,
	Text(String),
	Raw(Rc<str>),
	Template(PreparedTemplate),
	Choice(Branch, Box<Prepared>),
	List(Vec<(Key, Prepared)>),
	Seq(Vec<Prepared>),
}

#[derive(Debug)]
pub(crate) struct PreparedTemplate {
	pub(crate) source: &'static TemplateSource,
	pub(crate) description: Rc<TemplateDescription>,
	pub(crate) holes: Vec<PreparedHole>,
}

/// Attribute state after applying the boolean rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrValue {
	Absent,
	Present(String),
}

/// Resolved value of one hole, in description order.
#[derive(Debug)]
pub(crate) enum PreparedHole {
	Content(Prepared),
	Attribute {
		name: String,
		value: AttrValue,
	},
	Prop {
		name: String,
		value: Prop,
	},
	Event {
		event: String,
		options: ListenerOptions,
		callback: Option<Callback>,
	},
	Spread(Vec<(String, AttrValue)>),
	SpreadProps(Vec<(String, Prop)>),
}

/// Values of one render, each taken at most once.
struct Values(Vec<Option<HoleValue>>);

impl Values {
	fn take(&mut self, index: usize) -> HoleValue {
		self.0
			.get_mut(index)
			.and_then(Option::take)
			.unwrap_or_default()
	}
}

pub(crate) fn prepare(value: HoleValue, host: &dyn RenderHost) -> Result<Prepared, RenderError> {
	prepare_content(value, "<root>", host)
}

fn prepare_content(
	value: HoleValue,
	site: &'static str,
	host: &dyn RenderHost,
) -> Result<Prepared, RenderError> {
	Ok(match value {
		HoleValue::Data(Value::Null) => Prepared::Empty,
		HoleValue::Data(Value::List(list)) => Prepared::Seq(
			list.iter()
				.map(|item| match item {
					Value::Null => Prepared::Empty,
					other => Prepared::Text(other.to_display()),
				})
				.collect(),
		),
		HoleValue::Data(value) => Prepared::Text(value.to_display()),
		HoleValue::Template(result) => Prepared::Template(prepare_template(result, host)?),
		HoleValue::Choice(choice) => {
			let (branch, value) = choice.into_parts();
			Prepared::Choice(branch, Box::new(prepare_content(value, site, host)?))
		}
		HoleValue::List(list) => {
			let (entries, duplicates) = list.into_parts();
			if !duplicates.is_empty() {
				host.duplicate_keys(site, &duplicates);
			}
			Prepared::List(
				entries
					.into_iter()
					.map(|(key, value)| Ok((key, prepare_content(value, site, host)?)))
					.collect::<Result<_, RenderError>>()?,
			)
		}
		HoleValue::Raw(raw) => Prepared::Raw(raw.into_inner()),
		HoleValue::Seq(items) => Prepared::Seq(
			items
				.into_iter()
				.map(|item| prepare_content(item, site, host))
				.collect::<Result<_, _>>()?,
		),
		other @ (HoleValue::Handler(_) | HoleValue::Attrs(_)) => {
			return Err(RenderError::invalid(
				site,
				"child",
				format!("a {} cannot be rendered as content", other.type_name()),
			));
		}
	})
}

pub(crate) fn prepare_template(
	result: TemplateResult,
	host: &dyn RenderHost,
) -> Result<PreparedTemplate, RenderError> {
	let (source, values) = result.into_parts();
	let description = with_template_cache(|cache| cache.get_or_compile(source))?;
	let site = source.site();
	if values.len() != description.value_count() {
		return Err(RenderError::ValueCount {
			site,
			expected: description.value_count(),
			actual: values.len(),
		});
	}

	let mut values = Values(values.into_iter().map(Some).collect());
	let mut holes = Vec::with_capacity(description.holes().len());
	for hole in description.holes() {
		let component = hole
			.element
			.as_deref()
			.is_some_and(|tag| host.is_component(tag));
		let prepared = match &hole.kind {
			HoleKind::Text => {
				let value = single_input(&hole.inputs, &mut values, host);
				PreparedHole::Content(text_content(value, site)?)
			}
			HoleKind::Child => {
				let value = single_input(&hole.inputs, &mut values, host);
				PreparedHole::Content(prepare_content(value, site, host)?)
			}
			HoleKind::Attribute { name, strings } => {
				let inputs: Vec<HoleValue> = hole
					.inputs
					.iter()
					.map(|input| resolve_input(input, &mut values, host))
					.collect();
				if component {
					PreparedHole::Prop {
						name: name.clone(),
						value: attribute_prop(inputs, strings, site)?,
					}
				} else {
					PreparedHole::Attribute {
						name: name.clone(),
						value: attribute_value(name, inputs, strings, site)?,
					}
				}
			}
			HoleKind::Event { event, options } => PreparedHole::Event {
				event: event.clone(),
				options: *options,
				callback: event_callback(hole.inputs.first(), &mut values, host, site)?,
			},
			HoleKind::Spread => {
				let value = single_input(&hole.inputs, &mut values, host);
				if component {
					PreparedHole::SpreadProps(spread_props(value, site)?)
				} else {
					PreparedHole::Spread(spread_attrs(value, site)?)
				}
			}
		};
		holes.push(prepared);
	}

	Ok(PreparedTemplate {
		source,
		description,
		holes,
	})
}

fn single_input(inputs: &[Input], values: &mut Values, host: &dyn RenderHost) -> HoleValue {
	inputs
		.first()
		.map(|input| resolve_input(input, values, host))
		.unwrap_or_default()
}

fn resolve_input(input: &Input, values: &mut Values, host: &dyn RenderHost) -> HoleValue {
	match input {
		Input::Value(index) => values.take(*index),
		Input::Model(key) => HoleValue::Data(host.model_value(key)),
		Input::Method(_) | Input::ModelWriter(_) => HoleValue::default(),
	}
}

fn text_content(value: HoleValue, site: &'static str) -> Result<Prepared, RenderError> {
	match value {
		HoleValue::Data(Value::Null) => Ok(Prepared::Empty),
		HoleValue::Data(value @ (Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_))) => {
			Ok(Prepared::Text(value.to_display()))
		}
		HoleValue::Data(value) => Err(RenderError::invalid(
			site,
			"text",
			format!("expected a scalar, got a `{}` value", value.type_name()),
		)),
		other => Err(RenderError::invalid(
			site,
			"text",
			format!("expected a scalar, got a {}", other.type_name()),
		)),
	}
}

fn data(value: HoleValue, site: &'static str, hole: &'static str) -> Result<Value, RenderError> {
	match value {
		HoleValue::Data(value) => Ok(value),
		other => Err(RenderError::invalid(
			site,
			hole,
			format!("expected a value, got a {}", other.type_name()),
		)),
	}
}

/// Boolean rule for an attribute whose whole value is one hole.
fn single_attribute(name: &str, value: Value) -> AttrValue {
	match value {
		Value::Null | Value::Bool(false) => AttrValue::Absent,
		Value::Bool(true) => AttrValue::Present(String::new()),
		value if is_boolean_attr(name) => {
			if value.is_truthy() {
				AttrValue::Present(String::new())
			} else {
				AttrValue::Absent
			}
		}
		value => AttrValue::Present(value.to_display()),
	}
}

fn is_whole_value(strings: &[String]) -> bool {
	strings.len() == 2 && strings.iter().all(String::is_empty)
}

fn interpolate(
	inputs: Vec<HoleValue>,
	strings: &[String],
	site: &'static str,
) -> Result<String, RenderError> {
	let mut out = strings.first().cloned().unwrap_or_default();
	for (input, tail) in inputs.into_iter().zip(strings.iter().skip(1)) {
		out.push_str(&data(input, site, "attribute")?.to_display());
		out.push_str(tail);
	}
	Ok(out)
}

fn attribute_value(
	name: &str,
	mut inputs: Vec<HoleValue>,
	strings: &[String],
	site: &'static str,
) -> Result<AttrValue, RenderError> {
	if is_whole_value(strings) && inputs.len() == 1 {
		let value = data(inputs.remove(0), site, "attribute")?;
		return Ok(single_attribute(name, value));
	}
	Ok(AttrValue::Present(interpolate(inputs, strings, site)?))
}

fn attribute_prop(
	mut inputs: Vec<HoleValue>,
	strings: &[String],
	site: &'static str,
) -> Result<Prop, RenderError> {
	if is_whole_value(strings) && inputs.len() == 1 {
		return hole_prop(inputs.remove(0), site);
	}
	Ok(Prop::Value(Value::from(interpolate(inputs, strings, site)?)))
}

fn hole_prop(value: HoleValue, site: &'static str) -> Result<Prop, RenderError> {
	match value {
		HoleValue::Data(value) => Ok(Prop::from(value)),
		HoleValue::Template(result) => Ok(Prop::Render(result)),
		other => Err(RenderError::invalid(
			site,
			"attribute",
			format!("a {} cannot be passed as a prop", other.type_name()),
		)),
	}
}

fn event_callback(
	input: Option<&Input>,
	values: &mut Values,
	host: &dyn RenderHost,
	site: &'static str,
) -> Result<Option<Callback>, RenderError> {
	match input {
		None => Ok(None),
		Some(Input::Value(index)) => match values.take(*index) {
			HoleValue::Handler(callback) => Ok(Some(callback)),
			HoleValue::Data(Value::Null) => Ok(None),
			HoleValue::Data(Value::Str(name)) => resolve_method(&name, host).map(Some),
			other => Err(RenderError::invalid(
				site,
				"event",
				format!("expected a handler or method name, got a {}", other.type_name()),
			)),
		},
		Some(Input::Method(name)) => resolve_method(name, host).map(Some),
		Some(Input::ModelWriter(key)) => host
			.model_writer(key)
			.map(Some)
			.ok_or_else(|| RenderError::ModelUnavailable(key.clone())),
		Some(Input::Model(key)) => Err(RenderError::invalid(
			site,
			"event",
			format!("model `{key}` cannot be bound as a handler"),
		)),
	}
}

fn resolve_method(name: &str, host: &dyn RenderHost) -> Result<Callback, RenderError> {
	host.resolve_method(name)
		.ok_or_else(|| RenderError::UnknownMethod(name.to_string()))
}

fn spread_pairs(value: HoleValue, site: &'static str) -> Result<Vec<(String, HoleValue)>, RenderError> {
	match value {
		HoleValue::Attrs(pairs) => Ok(pairs),
		HoleValue::Data(Value::Null) => Ok(Vec::new()),
		HoleValue::Data(Value::Object(object)) => Ok(object
			.keys()
			.into_iter()
			.map(|key| {
				let value = object.get(&key);
				(key, HoleValue::Data(value))
			})
			.collect()),
		other => Err(RenderError::invalid(
			site,
			"spread",
			format!("expected attribute pairs or an object, got a {}", other.type_name()),
		)),
	}
}

fn spread_attrs(value: HoleValue, site: &'static str) -> Result<Vec<(String, AttrValue)>, RenderError> {
	spread_pairs(value, site)?
		.into_iter()
		.map(|(name, value)| {
			let value = single_attribute(&name, data(value, site, "spread")?);
			Ok((name, value))
		})
		.collect()
}

fn spread_props(value: HoleValue, site: &'static str) -> Result<Vec<(String, Prop)>, RenderError> {
	spread_pairs(value, site)?
		.into_iter()
		.map(|(name, value)| Ok((name, hole_prop(value, site)?)))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reconcile::StaticHost;
	use rstest::rstest;

	fn holes(result: TemplateResult) -> Vec<PreparedHole> {
		prepare_template(result, &StaticHost).unwrap().holes
	}

	fn attr(result: TemplateResult) -> AttrValue {
		match holes(result).remove(0) {
			PreparedHole::Attribute { value, .. } => value,
			other => panic!("expected attribute, got {other:?}"),
		}
	}

	#[rstest]
	#[case(Value::Null, AttrValue::Absent)]
	#[case(Value::Bool(false), AttrValue::Absent)]
	#[case(Value::Bool(true), AttrValue::Present(String::new()))]
	#[case(Value::from("x"), AttrValue::Present("x".into()))]
	#[case(Value::Int(0), AttrValue::Present("0".into()))]
	fn test_single_hole_attribute(#[case] value: Value, #[case] expected: AttrValue) {
		assert_eq!(attr(crate::html!("<p title=\"{}\"></p>", value)), expected);
	}

	#[rstest]
	#[case(Value::from("yes"), AttrValue::Present(String::new()))]
	#[case(Value::from(""), AttrValue::Absent)]
	#[case(Value::Int(0), AttrValue::Absent)]
	fn test_boolean_attribute_follows_truthiness(#[case] value: Value, #[case] expected: AttrValue) {
		assert_eq!(attr(crate::html!("<input disabled=\"{}\">", value)), expected);
	}

	#[rstest]
	fn test_interpolated_attribute() {
		assert_eq!(
			attr(crate::html!("<p class=\"a {} b\"></p>", false)),
			AttrValue::Present("a false b".into())
		);
	}

	#[rstest]
	fn test_value_count_mismatch() {
		static SOURCE: TemplateSource = TemplateSource::new("prepare.rs:1:1", "<p>{}{}</p>");
		let err = prepare_template(TemplateResult::new(&SOURCE, vec![1.into()]), &StaticHost)
			.unwrap_err();
		assert!(matches!(
			err,
			RenderError::ValueCount {
				expected: 2,
				actual: 1,
				..
			}
		));
	}

	#[rstest]
	fn test_text_hole_rejects_templates() {
		let inner = crate::html!("<b>x</b>");
		let err = prepare_template(crate::html!("<textarea>{}</textarea>", inner), &StaticHost)
			.unwrap_err();
		assert!(matches!(err, RenderError::InvalidHoleValue { hole: "text", .. }));
	}

	#[rstest]
	fn test_text_hole_names_the_rejected_value() {
		let items = Value::from(serde_json::json!([1, 2]));
		let err = prepare_template(crate::html!("<title>{}</title>", items), &StaticHost)
			.unwrap_err();
		match err {
			RenderError::InvalidHoleValue { hole, message, .. } => {
				assert_eq!(hole, "text");
				assert_eq!(message, "expected a scalar, got a `list` value");
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[rstest]
	fn test_unknown_method_is_reported() {
		let err = prepare_template(crate::html!("<button on-click=\"save\"></button>"), &StaticHost)
			.unwrap_err();
		assert!(matches!(err, RenderError::UnknownMethod(name) if name == "save"));
	}

	#[rstest]
	fn test_model_requires_a_component() {
		let err = prepare_template(crate::html!("<input x-model=\"name\">"), &StaticHost)
			.unwrap_err();
		assert!(matches!(err, RenderError::ModelUnavailable(key) if key == "name"));
	}

	#[rstest]
	fn test_null_event_value_unbinds() {
		let prepared = holes(crate::html!("<button on-click=\"{}\"></button>", Value::Null));
		assert!(matches!(
			prepared.as_slice(),
			[PreparedHole::Event { callback: None, .. }]
		));
	}

	#[rstest]
	fn test_spread_applies_boolean_rule() {
		let prepared = holes(crate::html!(
			"<input {}>",
			HoleValue::attrs([("disabled", HoleValue::from(true)), ("title", HoleValue::from(Value::Null))])
		));
		let [PreparedHole::Spread(pairs)] = prepared.as_slice() else {
			panic!("expected spread");
		};
		assert_eq!(
			pairs,
			&vec![
				("disabled".to_string(), AttrValue::Present(String::new())),
				("title".to_string(), AttrValue::Absent),
			]
		);
	}

	#[rstest]
	fn test_handlers_are_not_content() {
		let handler = Callback::new(|_| {});
		let err = prepare(HoleValue::Handler(handler), &StaticHost).unwrap_err();
		assert!(matches!(err, RenderError::InvalidHoleValue { hole: "child", .. }));
	}
}
