//! Component Tests
//!
//! Mounting, batched updates, props, events, slots and lifecycle hooks,
//! driven through an app on the in-memory host.

use std::cell::RefCell;
use std::rc::Rc;

use trellis_core::component::{
    Component, ComponentInstance, PropOptions, PropType, SetupResult,
};
use trellis_core::host::{HostOp, MemoryHost};
use trellis_core::props;
use trellis_core::reactive::{Callback, Object, Runtime, Value};
use trellis_core::renderer::{App, HostAdapter, NodeHandle, Renderer};
use trellis_core::vnode::{component, h, Slots};
use trellis_core::RenderError;

type Log = Rc<RefCell<Vec<String>>>;

struct Fixture {
    rt: Runtime,
    renderer: Renderer<MemoryHost>,
    root: NodeHandle,
}

impl Fixture {
    fn new() -> Self {
        let rt = Runtime::new();
        let mut host = MemoryHost::new();
        let root = host.create_root("app");
        let renderer = Renderer::new(&rt, host);
        Self { rt, renderer, root }
    }

    fn mount(&self, def: &Rc<Component>) -> App<MemoryHost> {
        let app = self.renderer.create_app(def);
        app.mount("#app").unwrap();
        app
    }

    fn html(&self) -> String {
        self.renderer.host().inner_html(self.root)
    }
}

fn root_of(app: &App<MemoryHost>) -> Rc<ComponentInstance> {
    app.root_instance().unwrap()
}

/// The instance mounted as the root of `parent`'s subtree, or as one of the
/// root element's direct children.
fn child_of(parent: &ComponentInstance) -> Rc<ComponentInstance> {
    let subtree = parent.subtree().unwrap();
    if let Some(child) = subtree.component() {
        return child;
    }
    subtree
        .children()
        .as_array()
        .unwrap()
        .iter()
        .find_map(|node| node.component())
        .unwrap()
}

fn counter_component() -> Rc<Component> {
    Component::builder("Counter")
        .setup(|_props, ctx| ctx.runtime().reactive(Object::from_iter([("count", 0)])))
        .render(|ctx| h("span", props! {}, ctx.get("count").to_string()))
        .build()
}

fn logging_hooks(name: &'static str, log: &Log) -> impl Fn(&trellis_core::component::SetupContext<'_>) {
    let log = Rc::clone(log);
    move |ctx| {
        let entry = |hook: &'static str| {
            let log = Rc::clone(&log);
            move || log.borrow_mut().push(format!("{name}:{hook}"))
        };
        ctx.on_before_mount(entry("before_mount"));
        ctx.on_mounted(entry("mounted"));
        ctx.on_before_update(entry("before_update"));
        ctx.on_updated(entry("updated"));
        ctx.on_before_unmount(entry("before_unmount"));
        ctx.on_unmounted(entry("unmounted"));
    }
}

#[test]
fn many_writes_render_once_after_tick() {
    let fx = Fixture::new();
    let app = fx.mount(&counter_component());
    let instance = root_of(&app);
    assert_eq!(fx.html(), "<span>0</span>");
    assert_eq!(instance.render_count(), 1);

    let state = instance.setup_state().unwrap();
    for n in 1..=3 {
        state.set("count", n);
    }
    assert_eq!(instance.render_count(), 1);
    assert_eq!(fx.html(), "<span>0</span>");

    assert!(fx.rt.tick());
    assert_eq!(instance.render_count(), 2);
    assert_eq!(fx.html(), "<span>3</span>");
}

#[test]
fn setup_can_return_a_render_function() {
    let fx = Fixture::new();
    let def = Component::builder("Greeting")
        .setup(|_props, _ctx| {
            let name = "world";
            SetupResult::render(move |_| h("p", props! {}, format!("hello {name}")))
        })
        .build();
    fx.mount(&def);
    assert_eq!(fx.html(), "<p>hello world</p>");
}

#[test]
fn parent_state_flows_into_child_props() {
    let fx = Fixture::new();
    let child = Component::builder("Label")
        .props(["text"])
        .render(|ctx| h("b", props! {}, ctx.get("text").to_string()))
        .build();
    let parent = {
        let child = Rc::clone(&child);
        Component::builder("Parent")
            .setup(|_props, ctx| {
                ctx.runtime()
                    .reactive(Object::from_iter([("label", "a"), ("other", "x")]))
            })
            .render(move |ctx| {
                let _ = ctx.get("other");
                h(
                    "div",
                    props! {},
                    vec![component(&child, props! { "text" => ctx.get("label") }, ())],
                )
            })
            .build()
    };

    let app = fx.mount(&parent);
    let parent_instance = root_of(&app);
    let child_instance = child_of(&parent_instance);
    assert_eq!(fx.html(), "<div><b>a</b></div>");

    parent_instance.setup_state().unwrap().set("label", "b");
    fx.rt.tick();
    assert_eq!(fx.html(), "<div><b>b</b></div>");
    assert_eq!(child_instance.render_count(), 2);

    // unrelated parent state leaves the child alone
    parent_instance.setup_state().unwrap().set("other", "y");
    fx.rt.tick();
    assert_eq!(parent_instance.render_count(), 3);
    assert_eq!(child_instance.render_count(), 2);
}

#[test]
fn props_defaults_and_boolean_casting() {
    let fx = Fixture::new();
    let def = Component::builder("Flags")
        .prop("disabled", PropOptions::new().ty(PropType::Bool))
        .prop("size", PropOptions::new().default_value(3))
        .render(|ctx| {
            h(
                "i",
                props! {},
                format!("{}/{}", ctx.get("disabled"), ctx.get("size")),
            )
        })
        .build();
    fx.mount(&def);
    assert_eq!(fx.html(), "<i>false/3</i>");
}

#[test]
fn setup_props_are_readonly() {
    let fx = Fixture::new();
    let seen = Rc::new(RefCell::new(None));
    let def = {
        let seen = Rc::clone(&seen);
        Component::builder("Ro")
            .props(["value"])
            .setup(move |props, _ctx| {
                *seen.borrow_mut() = Some(props.set("value", 2));
                SetupResult::None
            })
            .render(|ctx| h("i", props! {}, ctx.get("value").to_string()))
            .build()
    };
    fx.renderer
        .create_app(&def)
        .with_props(props! { "value" => 1 })
        .mount("#app")
        .unwrap();

    assert_eq!(*seen.borrow(), Some(false));
    assert_eq!(fx.html(), "<i>1</i>");
}

#[test]
fn emitted_events_reach_parent_handlers() {
    let fx = Fixture::new();
    let button = Component::builder("Increment")
        .render(|ctx| {
            let emitter = ctx.emitter();
            let on_click = Callback::new(move |_| emitter.emit("increment", &[Value::from(2)]));
            h("button", props! { "onClick" => on_click }, "+")
        })
        .inherit_attrs(false)
        .build();
    let parent = {
        let button = Rc::clone(&button);
        Component::builder("Parent")
            .setup(|_props, ctx| ctx.runtime().reactive(Object::from_iter([("count", 0)])))
            .render(move |ctx| {
                let state = ctx.instance().setup_state();
                let on_increment = Callback::new(move |args| {
                    if let Some(state) = &state {
                        let step = args.first().and_then(Value::as_number).unwrap_or(1.0);
                        let count = state.get("count").as_number().unwrap_or(0.0);
                        state.set("count", count + step);
                    }
                    Value::Null
                });
                h(
                    "div",
                    props! {},
                    vec![
                        h("span", props! {}, ctx.get("count").to_string()),
                        component(&button, props! { "onIncrement" => on_increment }, ()),
                    ],
                )
            })
            .build()
    };
    fx.mount(&parent);

    let node = fx.renderer.host().query_selector("button").unwrap();
    let handler = fx.renderer.host().listener(node, "click").unwrap();
    handler.call(&[]);
    handler.call(&[]);
    fx.rt.tick();

    assert_eq!(fx.html(), "<div><span>4</span><button>+</button></div>");
}

#[test]
fn attrs_fall_through_to_the_root_element() {
    let fx = Fixture::new();
    let child = Component::builder("Box")
        .render(|_| h("div", props! { "class" => "base" }, ()))
        .build();
    let parent = {
        let child = Rc::clone(&child);
        Component::builder("Parent")
            .render(move |_| component(&child, props! { "class" => "extra", "id" => "x" }, ()))
            .build()
    };
    fx.mount(&parent);
    assert_eq!(fx.html(), r#"<div class="base extra" id="x"></div>"#);
}

#[test]
fn inherited_handler_keeps_its_identity_across_updates() {
    let fx = Fixture::new();
    let hits: Log = Rc::new(RefCell::new(Vec::new()));

    let own = {
        let hits = hits.clone();
        Callback::new(move |_| {
            hits.borrow_mut().push("own".into());
            Value::Null
        })
    };
    let inherited = {
        let hits = hits.clone();
        Callback::new(move |_| {
            hits.borrow_mut().push("inherited".into());
            Value::Null
        })
    };

    let child = Component::builder("Button")
        .props(["label"])
        .render(move |ctx| h("button", props! { "onClick" => own.clone() }, ctx.get("label").to_string()))
        .build();
    let parent = {
        let child = Rc::clone(&child);
        Component::builder("Parent")
            .setup(|_props, ctx| ctx.runtime().reactive(Object::from_iter([("label", "a")])))
            .render(move |ctx| {
                component(
                    &child,
                    props! { "label" => ctx.get("label"), "onClick" => inherited.clone() },
                    (),
                )
            })
            .build()
    };
    let app = fx.mount(&parent);
    fx.renderer.host_mut().clear_ops();

    root_of(&app).setup_state().unwrap().set("label", "b");
    fx.rt.tick();

    assert_eq!(fx.html(), "<button>b</button>");
    let listener_patches = fx
        .renderer
        .host()
        .ops()
        .iter()
        .filter(|op| matches!(op, HostOp::PatchProp { key, .. } if key == "onClick"))
        .count();
    assert_eq!(listener_patches, 0);

    let node = fx.renderer.host().query_selector("button").unwrap();
    fx.renderer.host().listener(node, "click").unwrap().call(&[]);
    assert_eq!(*hits.borrow(), vec!["own".to_string(), "inherited".to_string()]);
}

#[test]
fn inherit_attrs_can_be_disabled() {
    let fx = Fixture::new();
    let child = Component::builder("Plain")
        .render(|ctx| h("div", props! {}, ctx.attrs().len().to_string()))
        .inherit_attrs(false)
        .build();
    let parent = {
        let child = Rc::clone(&child);
        Component::builder("Parent")
            .render(move |_| component(&child, props! { "title" => "t" }, ()))
            .build()
    };
    fx.mount(&parent);
    assert_eq!(fx.html(), "<div>1</div>");
}

#[test]
fn slots_render_parent_content() {
    let fx = Fixture::new();
    let card = Component::builder("Card")
        .render(|ctx| {
            let mut children = ctx.slot("header");
            children.extend(ctx.slot(Slots::DEFAULT));
            h("section", props! {}, children)
        })
        .build();
    let parent = {
        let card = Rc::clone(&card);
        Component::builder("Parent")
            .render(move |_| {
                let slots = Slots::new()
                    .with("header", |_| vec![h("h2", props! {}, "title")])
                    .with(Slots::DEFAULT, |_| vec![h("p", props! {}, "body")]);
                component(&card, props! {}, slots)
            })
            .build()
    };
    fx.mount(&parent);
    assert_eq!(fx.html(), "<section><h2>title</h2><p>body</p></section>");
}

#[test]
fn lifecycle_hooks_run_in_order() {
    let fx = Fixture::new();
    let log: Log = Rc::default();

    let child = {
        let hooks = logging_hooks("child", &log);
        Component::builder("Child")
            .setup(move |_props, ctx| {
                hooks(ctx);
                SetupResult::None
            })
            .render(|_| h("i", props! {}, ()))
            .build()
    };
    let parent = {
        let hooks = logging_hooks("parent", &log);
        let child = Rc::clone(&child);
        Component::builder("Parent")
            .setup(move |_props, ctx| {
                hooks(ctx);
                ctx.runtime().reactive(Object::from_iter([("n", 0)]))
            })
            .render(move |ctx| {
                h(
                    "div",
                    props! {},
                    vec![
                        h("b", props! {}, ctx.get("n").to_string()),
                        component(&child, props! {}, ()),
                    ],
                )
            })
            .build()
    };

    let app = fx.mount(&parent);
    assert_eq!(
        *log.borrow(),
        ["parent:before_mount", "child:before_mount", "child:mounted", "parent:mounted"]
    );

    log.borrow_mut().clear();
    root_of(&app).setup_state().unwrap().set("n", 1);
    fx.rt.tick();
    assert_eq!(*log.borrow(), ["parent:before_update", "parent:updated"]);

    log.borrow_mut().clear();
    app.unmount();
    assert_eq!(
        *log.borrow(),
        [
            "parent:before_unmount",
            "child:before_unmount",
            "child:unmounted",
            "parent:unmounted"
        ]
    );
    assert_eq!(fx.html(), "");
}

#[test]
fn pending_update_of_unmounted_component_is_skipped() {
    let fx = Fixture::new();
    let app = fx.mount(&counter_component());
    let instance = root_of(&app);

    instance.setup_state().unwrap().set("count", 5);
    app.unmount();
    fx.rt.tick();

    assert!(instance.is_unmounted());
    assert_eq!(instance.render_count(), 1);
    assert!(fx.rt.scheduler().take_failures().is_empty());
    assert_eq!(fx.html(), "");
}

#[test]
fn app_mount_errors() {
    let fx = Fixture::new();
    let app = fx.renderer.create_app(&counter_component());

    assert_eq!(
        app.mount("#missing"),
        Err(RenderError::ContainerNotFound("#missing".to_string()))
    );
    assert!(!app.is_mounted());

    app.mount(fx.root).unwrap();
    assert_eq!(app.mount("#app"), Err(RenderError::AlreadyMounted));
    assert_eq!(app.container(), Some(fx.root));
}

#[test]
fn mount_replaces_existing_container_content() {
    let fx = Fixture::new();
    fx.renderer.host_mut().set_element_text(fx.root, "loading");
    fx.mount(&counter_component());
    assert_eq!(fx.html(), "<span>0</span>");
}

#[test]
fn render_panic_is_isolated_to_its_job() {
    let fx = Fixture::new();
    let def = Component::builder("Fragile")
        .setup(|_props, ctx| ctx.runtime().reactive(Object::from_iter([("ok", true)])))
        .render(|ctx| {
            if !ctx.get("ok").is_truthy() {
                panic!("render failed");
            }
            h("p", props! {}, "fine")
        })
        .build();
    let app = fx.mount(&def);

    root_of(&app).setup_state().unwrap().set("ok", false);
    fx.rt.tick();

    let failures = fx.rt.scheduler().take_failures();
    assert_eq!(failures.len(), 1);
    assert!(!fx.rt.scheduler().is_flushing());
}
