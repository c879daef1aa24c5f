//! Component descriptors.
//!
//! A [`Component`] is the static definition shared by every instance: its
//! name, declared props, setup function and render function. Descriptors are
//! built once with [`Component::builder`] and referenced by `Rc` from vnodes;
//! two vnodes have the same component type iff they point at the same
//! descriptor.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::instance::{RenderContext, SetupContext};
use super::props::camelize;
use crate::reactive::{Object, Proxy, Value};
use crate::vnode::VNodeRef;

pub type SetupFn = Rc<dyn Fn(&Proxy, &SetupContext<'_>) -> SetupResult>;
pub type RenderFn = Rc<dyn Fn(&RenderContext<'_>) -> VNodeRef>;

/// Runtime type check for a declared prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropType {
    Bool,
    Number,
    String,
    List,
    Object,
    Function,
}

impl PropType {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            PropType::Bool => matches!(value, Value::Bool(_)),
            PropType::Number => matches!(value, Value::Number(_)),
            PropType::String => matches!(value, Value::Str(_)),
            PropType::List => matches!(value, Value::List(_)),
            PropType::Object => value.is_object_like(),
            PropType::Function => matches!(value, Value::Func(_)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PropType::Bool => "boolean",
            PropType::Number => "number",
            PropType::String => "string",
            PropType::List => "list",
            PropType::Object => "object",
            PropType::Function => "function",
        }
    }
}

/// Default for an absent prop. Factories run once per resolution, so object
/// defaults are never shared between instances.
#[derive(Clone)]
pub enum PropDefault {
    Value(Value),
    Factory(Rc<dyn Fn() -> Value>),
}

impl PropDefault {
    pub fn resolve(&self) -> Value {
        match self {
            PropDefault::Value(value) => value.clone(),
            PropDefault::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for PropDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropDefault::Value(value) => f.debug_tuple("Value").field(value).finish(),
            PropDefault::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// Declaration of a single prop.
#[derive(Clone, Debug, Default)]
pub struct PropOptions {
    pub ty: Option<PropType>,
    pub default: Option<PropDefault>,
    pub required: bool,
}

impl PropOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ty(mut self, ty: PropType) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(PropDefault::Value(value.into()));
        self
    }

    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        self.default = Some(PropDefault::Factory(Rc::new(factory)));
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Declared props keyed by camelized name.
pub type PropsOptions = IndexMap<Rc<str>, PropOptions>;

/// What a setup function hands back to its instance.
pub enum SetupResult {
    /// Nothing: the descriptor's render function is used.
    None,
    /// Bindings exposed to the render function. Ref fields are unwrapped.
    State(Value),
    /// A render function that replaces the descriptor's.
    Render(RenderFn),
}

impl SetupResult {
    pub fn render<F>(render: F) -> Self
    where
        F: Fn(&RenderContext<'_>) -> VNodeRef + 'static,
    {
        SetupResult::Render(Rc::new(render))
    }
}

impl From<Value> for SetupResult {
    fn from(state: Value) -> Self {
        SetupResult::State(state)
    }
}

impl From<Proxy> for SetupResult {
    fn from(state: Proxy) -> Self {
        SetupResult::State(state.into())
    }
}

impl From<Object> for SetupResult {
    fn from(state: Object) -> Self {
        SetupResult::State(state.into())
    }
}

pub struct Component {
    name: Rc<str>,
    props: Option<PropsOptions>,
    setup: Option<SetupFn>,
    render: Option<RenderFn>,
    inherit_attrs: bool,
}

impl Component {
    pub fn builder(name: &str) -> ComponentBuilder {
        ComponentBuilder {
            component: Component {
                name: Rc::from(name),
                props: None,
                setup: None,
                render: None,
                inherit_attrs: true,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared props, or `None` when the component declares none (every
    /// passed prop is then an attribute).
    pub fn props(&self) -> Option<&PropsOptions> {
        self.props.as_ref()
    }

    pub fn setup(&self) -> Option<&SetupFn> {
        self.setup.as_ref()
    }

    pub fn render(&self) -> Option<&RenderFn> {
        self.render.as_ref()
    }

    pub fn inherit_attrs(&self) -> bool {
        self.inherit_attrs
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("props", &self.props.as_ref().map(|props| props.keys().collect::<Vec<_>>()))
            .field("has_setup", &self.setup.is_some())
            .field("has_render", &self.render.is_some())
            .field("inherit_attrs", &self.inherit_attrs)
            .finish()
    }
}

pub struct ComponentBuilder {
    component: Component,
}

impl ComponentBuilder {
    /// Declare props by name only (no type, no default).
    pub fn props<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let props = self.component.props.get_or_insert_with(PropsOptions::new);
        for name in names {
            props.insert(Rc::from(camelize(name.as_ref())), PropOptions::default());
        }
        self
    }

    /// Declare one prop with options.
    pub fn prop(mut self, name: &str, options: PropOptions) -> Self {
        self.component
            .props
            .get_or_insert_with(PropsOptions::new)
            .insert(Rc::from(camelize(name)), options);
        self
    }

    pub fn setup<F, R>(mut self, setup: F) -> Self
    where
        F: Fn(&Proxy, &SetupContext<'_>) -> R + 'static,
        R: Into<SetupResult>,
    {
        self.component.setup = Some(Rc::new(
            move |props: &Proxy, ctx: &SetupContext<'_>| -> SetupResult { setup(props, ctx).into() },
        ));
        self
    }

    pub fn render<F>(mut self, render: F) -> Self
    where
        F: Fn(&RenderContext<'_>) -> VNodeRef + 'static,
    {
        self.component.render = Some(Rc::new(render));
        self
    }

    pub fn inherit_attrs(mut self, inherit: bool) -> Self {
        self.component.inherit_attrs = inherit;
        self
    }

    pub fn build(self) -> Rc<Component> {
        Rc::new(self.component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prop_names_are_camelized() {
        let def = Component::builder("Item")
            .props(["item-label", "count"])
            .prop("is-active", PropOptions::new().ty(PropType::Bool))
            .build();
        let names: Vec<&str> = def.props().map(|p| p.keys().map(|k| k.as_ref()).collect()).unwrap_or_default();
        assert_eq!(names, vec!["itemLabel", "count", "isActive"]);
    }

    #[test]
    fn without_declared_props_there_are_none() {
        let def = Component::builder("Bare").build();
        assert!(def.props().is_none());
        assert!(def.inherit_attrs());
    }

    #[test]
    fn prop_types_match_values() {
        assert!(PropType::Number.matches(&Value::from(1)));
        assert!(!PropType::Number.matches(&Value::from("1")));
        assert!(PropType::Object.matches(&Value::from(crate::reactive::Object::new())));
    }

    #[test]
    fn factory_defaults_are_fresh() {
        let options = PropOptions::new().default_factory(|| Value::from(crate::reactive::Object::new()));
        let default = options.default.as_ref().map(PropDefault::resolve);
        let again = options.default.as_ref().map(PropDefault::resolve);
        assert_ne!(default, again);
    }
}
