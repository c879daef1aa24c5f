//! Named slots passed from a parent to a component.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::node::VNodeRef;
use crate::reactive::Value;

type SlotFn = Rc<dyn Fn(&[Value]) -> Vec<VNodeRef>>;

/// A slot renders a list of vnodes, optionally from arguments supplied by the
/// component (scoped slots).
#[derive(Clone)]
pub struct Slot(SlotFn);

impl Slot {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&[Value]) -> Vec<VNodeRef> + 'static,
    {
        Self(Rc::new(render))
    }

    /// A slot that always yields the same vnodes.
    pub fn fixed(nodes: Vec<VNodeRef>) -> Self {
        Self::new(move |_| nodes.clone())
    }

    pub fn render(&self, args: &[Value]) -> Vec<VNodeRef> {
        (self.0)(args)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({:p})", Rc::as_ptr(&self.0))
    }
}

/// Slot name to slot, in declaration order.
#[derive(Clone, Default, Debug)]
pub struct Slots(IndexMap<Rc<str>, Slot>);

impl Slots {
    pub const DEFAULT: &'static str = "default";

    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with<F>(mut self, name: &str, render: F) -> Self
    where
        F: Fn(&[Value]) -> Vec<VNodeRef> + 'static,
    {
        self.insert(name, Slot::new(render));
        self
    }

    pub fn insert(&mut self, name: &str, slot: Slot) {
        self.0.insert(Rc::from(name), slot);
    }

    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|name| name.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
