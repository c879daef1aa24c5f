//! Virtual Nodes
//!
//! Description nodes produced by render functions and consumed by the
//! reconciler. See [`VNode`] for the normalization rules applied at
//! construction.

mod class;
mod node;
mod shape;
mod slots;

pub use class::normalize_class;
pub use node::{
    component, fragment, h, is_same_vnode_type, keyed_fragment, merge_props, text, Children,
    HandlerChains, Props, VNode, VNodeKey, VNodeRef, VNodeType,
};
pub(crate) use node::is_event_key;
pub use shape::ShapeFlags;
pub use slots::{Slot, Slots};
