//! Facade smoke tests: the prelude is enough to build and drive a component.

use reinhardt_ui::prelude::*;
use rstest::rstest;
use serial_test::serial;

#[rstest]
#[serial(reactive)]
fn test_counter_through_prelude() {
	let app = App::with_options(AppOptions::new().no_styles());
	app.define(
		ComponentDefinition::new("x-counter")
			.data(|| serde_json::json!({ "count": 0 }))
			.method("increment", |ctx, _| {
				ctx.state()
					.update("count", |n| Value::Int(n.as_i64().unwrap_or(0) + 1));
			})
			.template(|ctx| {
				Ok(html!(
					"<button on-click=\"increment\">{}</button>",
					ctx.state().get("count")
				))
			})
			.styles("button { margin: 0; }"),
	)
	.unwrap();
	let host: NodeId = app
		.mount(app.document().body(), "x-counter", Vec::<(String, Prop)>::new())
		.unwrap();
	let shadow = app.document().shadow_root(host).unwrap();
	let button = app.document().query(shadow, "button").unwrap();

	app.dispatch(button, Event::native("click"));
	app.dispatch(button, Event::native("click"));

	assert_eq!(app.document().inner_html(shadow), "<button>2</button>");
}

#[rstest]
#[serial(reactive)]
fn test_batch_defers_rendering_until_the_end() {
	let app = App::new();
	app.define(
		ComponentDefinition::new("x-pair")
			.data(|| serde_json::json!({ "a": 0, "b": 0 }))
			.template(|ctx| Ok(html!("<p>{}{}</p>", ctx.state().get("a"), ctx.state().get("b")))),
	)
	.unwrap();
	let host = app
		.mount(app.document().body(), "x-pair", Vec::<(String, Prop)>::new())
		.unwrap();
	let ctx = app.context(host).unwrap();

	batch(|| {
		ctx.state().set("a", 1);
		ctx.state().set("b", 2);
		assert_eq!(app.render_count(host), Some(1));
	});

	assert_eq!(app.render_count(host), Some(2));
}
