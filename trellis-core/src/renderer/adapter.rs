//! Host seam.
//!
//! The reconciler never touches an output medium directly. Everything it
//! does to the host goes through [`HostAdapter`], which a platform implements
//! over its own node type and exposes as opaque [`NodeHandle`]s.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reactive::Value;

/// Opaque reference to a host node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHandle(u64);

impl NodeHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Node operations a platform provides to the renderer.
///
/// Semantics follow the DOM: `insert` moves a node that is already attached,
/// an anchor means "insert before", and `set_element_text` replaces every
/// child of the element.
pub trait HostAdapter {
    fn create_element(&mut self, tag: &str) -> NodeHandle;

    fn create_text(&mut self, content: &str) -> NodeHandle;

    /// Update the content of a text node.
    fn set_text(&mut self, node: NodeHandle, content: &str);

    fn set_element_text(&mut self, node: NodeHandle, content: &str);

    fn insert(&mut self, node: NodeHandle, parent: NodeHandle, anchor: Option<NodeHandle>);

    fn remove(&mut self, node: NodeHandle);

    /// Apply one prop change. `next == None` removes the prop.
    fn patch_prop(
        &mut self,
        node: NodeHandle,
        key: &str,
        prev: Option<&Value>,
        next: Option<&Value>,
    );

    fn parent_node(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn next_sibling(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn query_selector(&self, selector: &str) -> Option<NodeHandle>;
}
