//! VNode Construction
//!
//! A vnode describes what one piece of output should look like. Render
//! functions build a fresh tree on every run; the reconciler diffs it
//! against the previous tree and only then touches the host.
//!
//! # Normalization
//!
//! Construction normalizes everything the reconciler relies on up front:
//!
//! - the `class` prop is flattened to one space-separated string;
//! - the reserved `key` prop is lifted out of the props into [`VNode::key`];
//! - children passed to a component become slots;
//! - the shape bitmask is derived from the type and the final children.
//!
//! After construction a vnode's description is immutable. Only the
//! bookkeeping written by the reconciler (the mounted host node, the
//! fragment end anchor, the component instance) changes.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::class::normalize_class;
use super::shape::ShapeFlags;
use super::slots::{Slot, Slots};
use crate::component::{Component, ComponentInstance};
use crate::reactive::{Callback, Value};
use crate::renderer::NodeHandle;

pub type VNodeRef = Rc<VNode>;

/// Props in declaration order.
pub type Props = IndexMap<Rc<str>, Value>;

/// Build a [`Props`] map: `props! { "id" => "app", "count" => 3 }`.
#[macro_export]
macro_rules! props {
    () => {
        $crate::vnode::Props::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut props = $crate::vnode::Props::new();
        $(
            props.insert(
                ::std::rc::Rc::<str>::from($key),
                $crate::reactive::Value::from($value),
            );
        )+
        props
    }};
}

#[derive(Clone)]
pub enum VNodeType {
    Element(Rc<str>),
    Component(Rc<Component>),
    Text,
    Fragment,
}

impl VNodeType {
    /// Type identity: same tag, same descriptor, or same marker.
    pub fn same(a: &VNodeType, b: &VNodeType) -> bool {
        match (a, b) {
            (VNodeType::Element(x), VNodeType::Element(y)) => x == y,
            (VNodeType::Component(x), VNodeType::Component(y)) => Rc::ptr_eq(x, y),
            (VNodeType::Text, VNodeType::Text) => true,
            (VNodeType::Fragment, VNodeType::Fragment) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for VNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNodeType::Element(tag) => write!(f, "<{tag}>"),
            VNodeType::Component(def) => write!(f, "Component({})", def.name()),
            VNodeType::Text => f.write_str("Text"),
            VNodeType::Fragment => f.write_str("Fragment"),
        }
    }
}

/// Explicit list identity, taken from the reserved `key` prop.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VNodeKey {
    Int(i64),
    Str(Rc<str>),
}

impl VNodeKey {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(VNodeKey::Int(*n as i64)),
            Value::Str(s) => Some(VNodeKey::Str(Rc::clone(s))),
            other => Some(VNodeKey::Str(Rc::from(other.to_string()))),
        }
    }
}

impl fmt::Display for VNodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNodeKey::Int(n) => write!(f, "{n}"),
            VNodeKey::Str(s) => f.write_str(s),
        }
    }
}

#[derive(Clone, Default)]
pub enum Children {
    #[default]
    None,
    Text(Rc<str>),
    Array(Vec<VNodeRef>),
    Slots(Slots),
}

impl Children {
    fn shape(&self) -> ShapeFlags {
        match self {
            Children::None => ShapeFlags::empty(),
            Children::Text(_) => ShapeFlags::TEXT_CHILDREN,
            Children::Array(_) => ShapeFlags::ARRAY_CHILDREN,
            Children::Slots(_) => ShapeFlags::SLOTS_CHILDREN,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Children::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[VNodeRef]> {
        match self {
            Children::Array(children) => Some(children),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Children::None)
    }
}

impl fmt::Debug for Children {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Children::None => f.write_str("None"),
            Children::Text(text) => write!(f, "Text({text:?})"),
            Children::Array(children) => f.debug_list().entries(children.iter()).finish(),
            Children::Slots(slots) => f.debug_set().entries(slots.names()).finish(),
        }
    }
}

impl From<Vec<VNodeRef>> for Children {
    fn from(children: Vec<VNodeRef>) -> Self {
        Children::Array(children)
    }
}

impl From<&str> for Children {
    fn from(text: &str) -> Self {
        Children::Text(Rc::from(text))
    }
}

impl From<String> for Children {
    fn from(text: String) -> Self {
        Children::Text(Rc::from(text))
    }
}

impl From<Slots> for Children {
    fn from(slots: Slots) -> Self {
        Children::Slots(slots)
    }
}

impl From<()> for Children {
    fn from(_: ()) -> Self {
        Children::None
    }
}

pub struct VNode {
    ty: VNodeType,
    props: Props,
    key: Option<VNodeKey>,
    children: Children,
    shape: ShapeFlags,

    /// Host node produced by mounting. For fragments this is the start
    /// anchor; for components it is the root host node of the subtree.
    el: Cell<Option<NodeHandle>>,
    /// Fragment end anchor.
    anchor: Cell<Option<NodeHandle>>,
    component: RefCell<Option<Rc<ComponentInstance>>>,
}

impl VNode {
    pub fn new(ty: VNodeType, mut props: Props, children: Children) -> VNodeRef {
        let key = props.shift_remove("key").and_then(|key| VNodeKey::from_value(&key));

        if let Some(class) = props.get_mut("class") {
            *class = Value::from(normalize_class(class));
        }

        let children = match (&ty, children) {
            (VNodeType::Component(_), Children::Array(nodes)) => {
                let mut slots = Slots::new();
                slots.insert(Slots::DEFAULT, Slot::fixed(nodes));
                Children::Slots(slots)
            }
            (VNodeType::Component(_), Children::Text(text)) => {
                let mut slots = Slots::new();
                slots.insert(Slots::DEFAULT, Slot::fixed(vec![self::text(text)]));
                Children::Slots(slots)
            }
            (_, children) => children,
        };

        let kind = match &ty {
            VNodeType::Element(_) => ShapeFlags::ELEMENT,
            VNodeType::Component(_) => ShapeFlags::STATEFUL_COMPONENT,
            VNodeType::Text | VNodeType::Fragment => ShapeFlags::empty(),
        };
        let shape = kind | children.shape();

        Rc::new(Self {
            ty,
            props,
            key,
            children,
            shape,
            el: Cell::new(None),
            anchor: Cell::new(None),
            component: RefCell::new(None),
        })
    }

    pub fn ty(&self) -> &VNodeType {
        &self.ty
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn key(&self) -> Option<&VNodeKey> {
        self.key.as_ref()
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    pub fn shape(&self) -> ShapeFlags {
        self.shape
    }

    pub fn el(&self) -> Option<NodeHandle> {
        self.el.get()
    }

    pub(crate) fn set_el(&self, el: Option<NodeHandle>) {
        self.el.set(el);
    }

    pub fn anchor(&self) -> Option<NodeHandle> {
        self.anchor.get()
    }

    pub(crate) fn set_anchor(&self, anchor: Option<NodeHandle>) {
        self.anchor.set(anchor);
    }

    /// The component instance occupying this vnode, once mounted.
    pub fn component(&self) -> Option<Rc<ComponentInstance>> {
        self.component.borrow().clone()
    }

    pub(crate) fn set_component(&self, instance: Option<Rc<ComponentInstance>>) {
        *self.component.borrow_mut() = instance;
    }

    /// Text content of a text vnode.
    pub fn text(&self) -> &str {
        self.children.as_text().unwrap_or("")
    }

    /// A fresh copy of this vnode with `extra` merged over its props.
    ///
    /// Classes are concatenated and event handlers present on both sides are
    /// chained; any other extra prop overrides the original.
    pub fn with_merged_props(&self, extra: &Props) -> VNodeRef {
        let mut props = self.props.clone();
        if let Some(key) = &self.key {
            props.insert(Rc::from("key"), key_value(key));
        }
        merge_props(&mut props, extra);
        VNode::new(self.ty.clone(), props, self.children.clone())
    }

    /// Like [`with_merged_props`](Self::with_merged_props), reusing chained
    /// handlers from `chains` while both halves are unchanged.
    pub fn with_fallthrough(&self, extra: &Props, chains: &HandlerChains) -> VNodeRef {
        let mut props = self.props.clone();
        if let Some(key) = &self.key {
            props.insert(Rc::from("key"), key_value(key));
        }
        merge_into(&mut props, extra, Some(chains));
        VNode::new(self.ty.clone(), props, self.children.clone())
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNode")
            .field("ty", &self.ty)
            .field("key", &self.key)
            .field("shape", &self.shape)
            .field("children", &self.children)
            .field("el", &self.el.get())
            .finish()
    }
}

fn key_value(key: &VNodeKey) -> Value {
    match key {
        VNodeKey::Int(n) => Value::from(*n),
        VNodeKey::Str(s) => Value::from(Rc::clone(s)),
    }
}

pub(crate) fn is_event_key(key: &str) -> bool {
    key.len() > 2 && key.starts_with("on") && key.as_bytes()[2].is_ascii_uppercase()
}

/// Merge `extra` into `props` with attribute fallthrough rules.
pub fn merge_props(props: &mut Props, extra: &Props) {
    merge_into(props, extra, None);
}

fn merge_into(props: &mut Props, extra: &Props, chains: Option<&HandlerChains>) {
    for (key, value) in extra {
        if key.as_ref() == "class" {
            let merged = match props.get("class") {
                Some(existing) => {
                    Value::from(vec![existing.clone(), value.clone()])
                }
                None => value.clone(),
            };
            props.insert(Rc::clone(key), Value::from(normalize_class(&merged)));
        } else if is_event_key(key) {
            let merged = match (props.get(key.as_ref()), value) {
                (Some(Value::Func(first)), Value::Func(second))
                    if !Callback::ptr_eq(first, second) =>
                {
                    Value::Func(match chains {
                        Some(chains) => chains.chain(key, first, second),
                        None => chain_handlers(first, second),
                    })
                }
                _ => value.clone(),
            };
            props.insert(Rc::clone(key), merged);
        } else {
            props.insert(Rc::clone(key), value.clone());
        }
    }
}

fn chain_handlers(first: &Callback, second: &Callback) -> Callback {
    let (first, second) = (first.clone(), second.clone());
    Callback::new(move |args| {
        first.call(args);
        second.call(args)
    })
}

/// Handlers chained by earlier merges, keyed by prop name.
///
/// A chain is reused while both of its halves are the same callbacks, so a
/// merged handler keeps its identity from one render to the next.
#[derive(Default)]
pub struct HandlerChains {
    chains: RefCell<HashMap<Rc<str>, (Callback, Callback, Callback)>>,
}

impl HandlerChains {
    pub fn new() -> Self {
        Self::default()
    }

    fn chain(&self, key: &Rc<str>, first: &Callback, second: &Callback) -> Callback {
        let mut chains = self.chains.borrow_mut();
        if let Some((a, b, chained)) = chains.get(key) {
            if Callback::ptr_eq(a, first) && Callback::ptr_eq(b, second) {
                return chained.clone();
            }
        }
        let chained = chain_handlers(first, second);
        chains.insert(Rc::clone(key), (first.clone(), second.clone(), chained.clone()));
        chained
    }
}

impl fmt::Debug for HandlerChains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChains")
            .field("keys", &self.chains.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Two vnodes can be patched into each other iff they have the same type
/// and the same key (two absent keys are equal).
pub fn is_same_vnode_type(a: &VNode, b: &VNode) -> bool {
    VNodeType::same(&a.ty, &b.ty) && a.key == b.key
}

/// Element vnode.
pub fn h(tag: &str, props: Props, children: impl Into<Children>) -> VNodeRef {
    VNode::new(VNodeType::Element(Rc::from(tag)), props, children.into())
}

/// Text vnode.
pub fn text(content: impl Into<Rc<str>>) -> VNodeRef {
    VNode::new(VNodeType::Text, Props::new(), Children::Text(content.into()))
}

/// Fragment: a list of siblings without a wrapping element.
pub fn fragment(children: Vec<VNodeRef>) -> VNodeRef {
    VNode::new(VNodeType::Fragment, Props::new(), Children::Array(children))
}

/// Keyed fragment, for fragments inside keyed lists.
pub fn keyed_fragment(key: impl Into<Value>, children: Vec<VNodeRef>) -> VNodeRef {
    let mut props = Props::new();
    props.insert(Rc::from("key"), key.into());
    VNode::new(VNodeType::Fragment, props, Children::Array(children))
}

/// Component vnode. Array or text children become the default slot.
pub fn component(def: &Rc<Component>, props: Props, children: impl Into<Children>) -> VNodeRef {
    VNode::new(VNodeType::Component(Rc::clone(def)), props, children.into())
}
