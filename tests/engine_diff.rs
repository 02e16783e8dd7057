use components_::{app, close_empty, engine, factory, init_logging, last_batch};

use compo_dom::{component::ComponentData, share, Component};
use std::sync::{Arc, Mutex};

/// Mounts `component`, applies `mutate` and re-renders it, then returns the description of the second batch.
fn diff<C: Component>(component: C, mutate: impl FnOnce(&mut C), components: usize, nodes: usize) -> Vec<String> {
	init_logging();
	let factory = factory();
	let (engine, batches) = engine(&factory);

	let component = share(component);
	engine.mount(component.clone()).unwrap();
	mutate(&mut *component.lock().unwrap());
	engine.render(&component).unwrap();

	assert_eq!(batches.lock().unwrap().len(), 2);
	assert_eq!(engine.component_count(), components);
	assert_eq!(engine.node_count(), nodes);
	assert!(engine.contains(&component));
	let batch = last_batch(&batches);

	close_empty(&engine);
	batch
}

#[test]
fn update_text() {
	let batch = diff(
		app::Foo {
			value: "hello".into(),
			disabled: false,
		},
		|foo| foo.value = "world".into(),
		1,
		3,
	);
	assert_eq!(batch, ["setText text world"]);
}

#[test]
fn append_child() {
	let batch = diff(app::Foo::default(), |foo| foo.value = "hello".into(), 1, 3);
	assert_eq!(batch, ["newNode text of app.foo", "setText text hello", "appendChild div text"]);
}

#[test]
fn remove_child() {
	let batch = diff(
		app::Foo {
			value: "hello".into(),
			disabled: false,
		},
		|foo| foo.value.clear(),
		1,
		2,
	);
	assert_eq!(batch, ["removeChild div text", "delNode text"]);
}

#[test]
fn set_attribute() {
	let batch = diff(app::Foo::default(), |foo| foo.disabled = true, 1, 2);
	assert_eq!(batch, ["setAttr div disabled="]);
}

#[test]
fn delete_attribute() {
	let batch = diff(
		app::Foo {
			value: String::new(),
			disabled: true,
		},
		|foo| foo.disabled = false,
		1,
		2,
	);
	assert_eq!(batch, ["delAttr div disabled"]);
}

#[test]
fn unchanged_render_is_empty() {
	let batch = diff(
		app::Foo {
			value: "hello".into(),
			disabled: true,
		},
		|_| (),
		1,
		3,
	);
	assert!(batch.is_empty(), "{:#?}", batch);
}

#[test]
fn replace_text_by_node() {
	let batch = diff(app::Bar::default(), |bar| bar.replace_text_by_node = true, 1, 6);
	assert_eq!(
		batch,
		[
			"newNode span of app.bar",
			"newNode text of app.bar",
			"setText text hello",
			"appendChild span text",
			"replaceChild div text -> span",
			"delNode text",
		]
	);
}

#[test]
fn replace_node_by_text() {
	let batch = diff(
		app::Bar {
			replace_text_by_node: true,
			replace_node_by_node: false,
		},
		|bar| bar.replace_text_by_node = false,
		1,
		5,
	);
	assert_eq!(
		batch,
		[
			"newNode text of app.bar",
			"setText text hello",
			"replaceChild div span -> text",
			"delNode text",
			"delNode span",
		]
	);
}

#[test]
fn replace_node_by_node() {
	let batch = diff(app::Bar::default(), |bar| bar.replace_node_by_node = true, 1, 5);
	assert_eq!(
		batch,
		[
			"newNode h2 of app.bar",
			"newNode text of app.bar",
			"setText text world",
			"appendChild h2 text",
			"replaceChild div h1 -> h2",
			"delNode text",
			"delNode h1",
		]
	);
}

#[test]
fn add_component() {
	let batch = diff(app::Boo::default(), |boo| boo.add_compo = true, 3, 6);
	assert_eq!(
		batch,
		[
			"newNode app.foo component of app.boo",
			"newNode div of app.foo",
			"setAttr div class=test",
			"appendChild app.foo div",
			"appendChild div app.foo",
		]
	);
}

#[test]
fn remove_component() {
	let batch = diff(
		app::Boo {
			add_compo: true,
			..app::Boo::default()
		},
		|boo| boo.add_compo = false,
		2,
		4,
	);
	assert_eq!(batch, ["removeChild div app.foo", "delNode div", "delNode app.foo"]);
}

#[test]
fn replace_component_by_component() {
	let batch = diff(app::Boo::default(), |boo| boo.replace_compo_by_compo = true, 2, 4);
	assert_eq!(
		batch,
		[
			"newNode app.oob component of app.boo",
			"newNode p of app.oob",
			"appendChild app.oob p",
			"replaceChild div app.foo -> app.oob",
			"delNode div",
			"delNode app.foo",
		]
	);
}

#[test]
fn set_component_attribute() {
	let batch = diff(
		app::Boo {
			value: "hello".into(),
			..app::Boo::default()
		},
		|boo| boo.value = "world".into(),
		2,
		5,
	);
	assert_eq!(batch, ["setText text world"]);
}

#[test]
fn replace_component_by_node() {
	let batch = diff(app::Boo::default(), |boo| boo.replace_compo_by_node = true, 1, 4);
	assert_eq!(
		batch,
		[
			"newNode p of app.boo",
			"newNode text of app.boo",
			"setText text foo",
			"appendChild p text",
			"replaceChild div app.foo -> p",
			"delNode div",
			"delNode app.foo",
		]
	);
}

#[test]
fn replace_node_by_component() {
	let batch = diff(
		app::Boo {
			replace_compo_by_node: true,
			..app::Boo::default()
		},
		|boo| boo.replace_compo_by_node = false,
		2,
		4,
	);
	assert_eq!(
		batch,
		[
			"newNode app.foo component of app.boo",
			"newNode div of app.foo",
			"setAttr div class=test",
			"appendChild app.foo div",
			"replaceChild div p -> app.foo",
			"delNode text",
			"delNode p",
		]
	);
}

#[test]
fn replace_component_root() {
	let batch = diff(app::Nested::default(), |nested| nested.foo = true, 2, 3);
	assert_eq!(
		batch,
		[
			"newNode app.foo component of app.nested",
			"newNode div of app.foo",
			"setAttr div class=test",
			"appendChild app.foo div",
			"replaceChild app.nested app.oob -> app.foo",
			"delNode p",
			"delNode app.oob",
		]
	);
}

#[test]
fn replace_nested_component_root() {
	let batch = diff(app::NestedNested::default(), |nested| nested.foo = true, 3, 4);
	assert_eq!(
		batch,
		[
			"newNode app.foo component of app.nested",
			"newNode div of app.foo",
			"setAttr div class=test",
			"appendChild app.foo div",
			"replaceChild app.nested app.oob -> app.foo",
			"delNode p",
			"delNode app.oob",
		]
	);
}

#[test]
fn update_node_with_namespace() {
	let batch = diff(app::Svg::default(), |svg| svg.path = "M42".into(), 1, 4);
	assert_eq!(batch, ["setAttr path d=M42"]);
}

#[test]
fn self_closing_drops_children() {
	let batch = diff(
		app::SelfClosing {
			no_close: true,
			svg: false,
		},
		|closing| closing.no_close = false,
		1,
		4,
	);
	assert_eq!(batch, ["removeChild g path", "delNode path"]);
}

#[test]
fn render_nested_component_directly() {
	init_logging();
	let factory = factory();
	let (engine, batches) = engine(&factory);

	engine.mount(share(app::Boo::default())).unwrap();
	let root = engine.node(engine.root_id().unwrap().as_str()).unwrap();
	let div = engine.node(root.children[0].as_str()).unwrap();
	let foo_id = div.children[0].clone();
	let foo = engine.component_by_id(foo_id.as_str()).unwrap();

	{
		let mut foo = foo.lock().unwrap();
		let foo = foo.as_any_mut().downcast_mut::<app::Foo>().unwrap();
		foo.value = "direct".into();
	}
	engine.render(&foo).unwrap();
	assert_eq!(
		last_batch(&batches),
		["newNode text of app.foo", "setText text direct", "appendChild div text"]
	);

	// The parent's next render assigns the placeholder's attributes again.
	let boo = engine.component_by_id(root.id.as_str()).unwrap();
	engine.render(&boo).unwrap();
	assert_eq!(last_batch(&batches), ["removeChild div text", "delNode text"]);

	close_empty(&engine);
}

#[test]
fn placeholder_attributes_map_booleans_and_integers() {
	init_logging();

	#[derive(Debug, Default, serde::Serialize)]
	struct Parent {
		int: i64,
	}
	impl Component for Parent {
		fn render(&self) -> String {
			r#"<section><app.oob int="{{ int }}"><app.foo disabled></section>"#.into()
		}
	}

	let factory = factory();
	let (engine, batches) = engine(&factory);
	let parent = Arc::new(Mutex::new(Parent { int: 7 }));
	engine.mount(parent.clone()).unwrap();

	let batch = last_batch(&batches);
	assert!(batch.contains(&"setText text hello 7".to_owned()), "{:#?}", batch);
	assert!(batch.contains(&"setAttr div disabled=".to_owned()), "{:#?}", batch);

	parent.lock().unwrap().int = 0x2a;
	engine.render(&parent).unwrap();
	assert_eq!(last_batch(&batches), ["setText text hello 42"]);

	close_empty(&engine);
}
