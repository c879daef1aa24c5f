//! In-Memory Host
//!
//! An arena of element and text nodes with DOM-like semantics. Every
//! mutation the renderer performs is appended to an operation log, which is
//! what the diff tests count.
//!
//! # Node Lifetime
//!
//! Nodes are never freed: `remove` only detaches. Handles index into the
//! arena and are never reused, so a stale handle in the op log always refers
//! to the node it was recorded for.

use std::collections::HashSet;
use std::fmt::Write as _;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::reactive::{Callback, Value};
use crate::renderer::{HostAdapter, NodeHandle};
use crate::vnode::is_event_key;

/// One host mutation, as recorded in the op log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostOp {
    CreateElement { node: NodeHandle, tag: String },
    CreateText { node: NodeHandle, content: String },
    SetText { node: NodeHandle, content: String },
    SetElementText { node: NodeHandle, content: String },
    /// First attachment of a detached node.
    Insert {
        node: NodeHandle,
        parent: NodeHandle,
        anchor: Option<NodeHandle>,
    },
    /// Re-insertion of an attached node.
    Move {
        node: NodeHandle,
        parent: NodeHandle,
        anchor: Option<NodeHandle>,
    },
    Remove { node: NodeHandle },
    PatchProp {
        node: NodeHandle,
        key: String,
        value: Option<String>,
    },
}

/// Op log summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpStats {
    pub created: usize,
    pub inserted: usize,
    pub moved: usize,
    pub removed: usize,
    pub text_updates: usize,
    pub prop_patches: usize,
}

enum NodeKind {
    Element {
        tag: String,
        attrs: IndexMap<String, Value>,
        /// Event name (`click`) to handler.
        listeners: IndexMap<String, Callback>,
    },
    Text(String),
}

struct HostNode {
    kind: NodeKind,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
}

impl HostNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Host adapter over an in-memory node tree.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<HostNode>,
    roots: HashSet<NodeHandle>,
    ops: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A detached `<div id="{id}">` that queries can find. Not logged.
    pub fn create_root(&mut self, id: &str) -> NodeHandle {
        let mut attrs = IndexMap::new();
        attrs.insert("id".to_string(), Value::from(id));
        let root = self.alloc(NodeKind::Element {
            tag: "div".to_string(),
            attrs,
            listeners: IndexMap::new(),
        });
        self.roots.insert(root);
        root
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeHandle {
        let handle = NodeHandle::new(self.nodes.len() as u64);
        self.nodes.push(HostNode::new(kind));
        handle
    }

    fn node(&self, handle: NodeHandle) -> Option<&HostNode> {
        self.nodes.get(handle.raw() as usize)
    }

    fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut HostNode> {
        self.nodes.get_mut(handle.raw() as usize)
    }

    /// Unlink `node` from its parent. Returns whether it had one.
    fn detach(&mut self, node: NodeHandle) -> bool {
        let Some(parent) = self.node_mut(node).and_then(|n| n.parent.take()) else {
            return false;
        };
        if let Some(parent) = self.node_mut(parent) {
            parent.children.retain(|&child| child != node);
        }
        true
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn stats(&self) -> OpStats {
        let mut stats = OpStats::default();
        for op in &self.ops {
            match op {
                HostOp::CreateElement { .. } | HostOp::CreateText { .. } => stats.created += 1,
                HostOp::Insert { .. } => stats.inserted += 1,
                HostOp::Move { .. } => stats.moved += 1,
                HostOp::Remove { .. } => stats.removed += 1,
                HostOp::SetText { .. } | HostOp::SetElementText { .. } => stats.text_updates += 1,
                HostOp::PatchProp { .. } => stats.prop_patches += 1,
            }
        }
        stats
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, node: NodeHandle) -> &[NodeHandle] {
        match self.node(node) {
            Some(n) => &n.children,
            None => &[],
        }
    }

    pub fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.node(node)?.parent
    }

    pub fn tag(&self, node: NodeHandle) -> Option<&str> {
        match &self.node(node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn prop(&self, node: NodeHandle, key: &str) -> Option<&Value> {
        match &self.node(node)?.kind {
            NodeKind::Element { attrs, .. } => attrs.get(key),
            NodeKind::Text(_) => None,
        }
    }

    /// Handler bound for `event` (`"click"` for an `onClick` prop).
    pub fn listener(&self, node: NodeHandle, event: &str) -> Option<Callback> {
        match &self.node(node)?.kind {
            NodeKind::Element { listeners, .. } => listeners.get(event).cloned(),
            NodeKind::Text(_) => None,
        }
    }

    /// Invoke the handler for `event`; `Null` when nothing is bound.
    pub fn dispatch(&self, node: NodeHandle, event: &str, args: &[Value]) -> Value {
        match self.listener(node, event) {
            Some(handler) => handler.call(args),
            None => Value::Null,
        }
    }

    /// Whether `node` hangs below one of the created roots.
    pub fn is_connected(&self, node: NodeHandle) -> bool {
        let mut current = node;
        loop {
            if self.roots.contains(&current) {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeHandle) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeHandle, out: &mut String) {
        let Some(n) = self.node(node) else {
            return;
        };
        match &n.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for &child in &n.children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Serialize `node` (and its subtree) as HTML. Listeners are omitted.
    pub fn to_html(&self, node: NodeHandle) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    /// HTML of the children of `node`.
    pub fn inner_html(&self, node: NodeHandle) -> String {
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeHandle, out: &mut String) {
        let Some(n) = self.node(node) else {
            return;
        };
        match &n.kind {
            NodeKind::Text(text) => out.push_str(&escape(text, false)),
            NodeKind::Element { tag, attrs, .. } => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in attrs {
                    match value {
                        Value::Bool(true) => {
                            let _ = write!(out, " {key}");
                        }
                        value => {
                            let _ = write!(out, " {key}=\"{}\"", escape(&value.to_string(), true));
                        }
                    }
                }
                out.push('>');
                for &child in &n.children {
                    self.write_html(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape(text: &str, attr: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// `onClick` to `click`.
fn event_name(key: &str) -> String {
    key[2..].to_ascii_lowercase()
}

impl HostAdapter for MemoryHost {
    fn create_element(&mut self, tag: &str) -> NodeHandle {
        let node = self.alloc(NodeKind::Element {
            tag: tag.to_string(),
            attrs: IndexMap::new(),
            listeners: IndexMap::new(),
        });
        self.ops.push(HostOp::CreateElement {
            node,
            tag: tag.to_string(),
        });
        node
    }

    fn create_text(&mut self, content: &str) -> NodeHandle {
        let node = self.alloc(NodeKind::Text(content.to_string()));
        self.ops.push(HostOp::CreateText {
            node,
            content: content.to_string(),
        });
        node
    }

    fn set_text(&mut self, node: NodeHandle, content: &str) {
        match self.node_mut(node).map(|n| &mut n.kind) {
            Some(NodeKind::Text(text)) => {
                *text = content.to_string();
                self.ops.push(HostOp::SetText {
                    node,
                    content: content.to_string(),
                });
            }
            _ => warn!(%node, "set_text on a node that is not a text node"),
        }
    }

    fn set_element_text(&mut self, node: NodeHandle, content: &str) {
        let children = match self.node_mut(node) {
            Some(n) => std::mem::take(&mut n.children),
            None => return,
        };
        for child in children {
            if let Some(child) = self.node_mut(child) {
                child.parent = None;
            }
        }
        if !content.is_empty() {
            let text = self.alloc(NodeKind::Text(content.to_string()));
            if let Some(n) = self.node_mut(text) {
                n.parent = Some(node);
            }
            if let Some(n) = self.node_mut(node) {
                n.children.push(text);
            }
        }
        self.ops.push(HostOp::SetElementText {
            node,
            content: content.to_string(),
        });
    }

    fn insert(&mut self, node: NodeHandle, parent: NodeHandle, anchor: Option<NodeHandle>) {
        if self.node(node).is_none() || self.node(parent).is_none() {
            warn!(%node, %parent, "insert with an unknown handle");
            return;
        }
        let moved = self.detach(node);

        let Some(p) = self.node_mut(parent) else {
            return;
        };
        let position = anchor.and_then(|anchor| p.children.iter().position(|&c| c == anchor));
        match position {
            Some(index) => p.children.insert(index, node),
            None => p.children.push(node),
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = Some(parent);
        }

        trace!(%node, %parent, ?anchor, moved, "host insert");
        self.ops.push(if moved {
            HostOp::Move { node, parent, anchor }
        } else {
            HostOp::Insert { node, parent, anchor }
        });
    }

    fn remove(&mut self, node: NodeHandle) {
        if self.detach(node) {
            self.ops.push(HostOp::Remove { node });
        }
    }

    fn patch_prop(
        &mut self,
        node: NodeHandle,
        key: &str,
        _prev: Option<&Value>,
        next: Option<&Value>,
    ) {
        let Some(NodeKind::Element {
            attrs, listeners, ..
        }) = self.node_mut(node).map(|n| &mut n.kind)
        else {
            warn!(%node, key, "patch_prop on a node that is not an element");
            return;
        };

        if is_event_key(key) {
            match next {
                Some(Value::Func(handler)) => {
                    listeners.insert(event_name(key), handler.clone());
                }
                _ => {
                    listeners.shift_remove(&event_name(key));
                }
            }
        } else {
            match next {
                None | Some(Value::Null) | Some(Value::Bool(false)) => {
                    attrs.shift_remove(key);
                }
                Some(value) => {
                    attrs.insert(key.to_string(), value.clone());
                }
            }
        }

        self.ops.push(HostOp::PatchProp {
            node,
            key: key.to_string(),
            value: next.map(|value| value.to_string()),
        });
    }

    fn parent_node(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.parent(node)
    }

    fn next_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
        let siblings = self.children(self.parent(node)?);
        let index = siblings.iter().position(|&c| c == node)?;
        siblings.get(index + 1).copied()
    }

    fn query_selector(&self, selector: &str) -> Option<NodeHandle> {
        let matches = |kind: &NodeKind| match (kind, selector.strip_prefix('#')) {
            (NodeKind::Element { attrs, .. }, Some(id)) => {
                attrs.get("id").and_then(Value::as_str) == Some(id)
            }
            (NodeKind::Element { tag, .. }, None) => tag == selector,
            (NodeKind::Text(_), _) => false,
        };
        (0..self.nodes.len())
            .map(|index| NodeHandle::new(index as u64))
            .find(|&handle| {
                self.node(handle).is_some_and(|n| matches(&n.kind)) && self.is_connected(handle)
            })
    }
}

impl std::fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHost")
            .field("nodes", &self.nodes.len())
            .field("roots", &self.roots.len())
            .field("ops", &self.ops.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
