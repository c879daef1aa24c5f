//! Child list reconciliation.
//!
//! # How Children Are Patched
//!
//! The old and new child shapes pick one of six paths:
//!
//! | old \ new | text              | array            | none          |
//! |-----------|-------------------|------------------|---------------|
//! | array     | unmount, set text | keyed diff       | unmount all   |
//! | text      | set text if diff  | clear, mount all | clear text    |
//! | none      | set text          | mount all        | nothing       |
//!
//! # Keyed Diff
//!
//! 1. Patch the common prefix, then the common suffix.
//! 2. If only new nodes remain, mount them before the first suffix node.
//!    If only old nodes remain, unmount them.
//! 3. Otherwise match the remaining old nodes against the remaining new
//!    window by key (or by a linear compatibility scan for unkeyed nodes),
//!    patching matches and unmounting the rest.
//! 4. If the matches came out of order, walk the window backwards and move
//!    every matched node outside the longest increasing subsequence of old
//!    positions. Unmatched slots are mounted on the same walk.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{trace, warn};

use super::adapter::{HostAdapter, NodeHandle};
use super::lis::longest_increasing_subsequence;
use super::RendererInner;
use crate::component::ComponentInstance;
use crate::vnode::{is_same_vnode_type, Children, ShapeFlags, VNode, VNodeKey, VNodeRef};

impl<H: HostAdapter + 'static> RendererInner<H> {
    pub(crate) fn patch_children(
        self: &Rc<Self>,
        old: &VNode,
        new: &VNode,
        container: NodeHandle,
        anchor: Option<NodeHandle>,
        parent: Option<&Rc<ComponentInstance>>,
    ) {
        let (old_shape, new_shape) = (old.shape(), new.shape());

        if new_shape.contains(ShapeFlags::TEXT_CHILDREN) {
            if let Children::Array(children) = old.children() {
                self.unmount_children(children);
            }
            let next = new.children().as_text().unwrap_or("");
            if old.children().as_text() != Some(next) {
                self.host_mut().set_element_text(container, next);
            }
            return;
        }

        let (Children::Array(next), true) = (
            new.children(),
            new_shape.contains(ShapeFlags::ARRAY_CHILDREN),
        ) else {
            match old.children() {
                Children::Array(children) => self.unmount_children(children),
                Children::Text(_) => self.host_mut().set_element_text(container, ""),
                Children::None | Children::Slots(_) => {}
            }
            return;
        };

        match old.children() {
            Children::Array(prev) if old_shape.contains(ShapeFlags::ARRAY_CHILDREN) => {
                self.patch_keyed_children(prev, next, container, anchor, parent);
            }
            Children::Text(_) => {
                self.host_mut().set_element_text(container, "");
                self.mount_children(next, container, anchor, parent);
            }
            _ => self.mount_children(next, container, anchor, parent),
        }
    }

    fn unmount_children(&self, children: &[VNodeRef]) {
        for child in children {
            self.unmount(child, true);
        }
    }

    /// Reconcile two child lists with the minimum number of host moves.
    pub(crate) fn patch_keyed_children(
        self: &Rc<Self>,
        c1: &[VNodeRef],
        c2: &[VNodeRef],
        container: NodeHandle,
        parent_anchor: Option<NodeHandle>,
        parent: Option<&Rc<ComponentInstance>>,
    ) {
        let mut i = 0;
        let mut old_end = c1.len();
        let mut new_end = c2.len();

        // prefix
        while i < old_end && i < new_end && is_same_vnode_type(&c1[i], &c2[i]) {
            self.patch(Some(&c1[i]), &c2[i], container, None, parent);
            i += 1;
        }

        // suffix
        while i < old_end && i < new_end && is_same_vnode_type(&c1[old_end - 1], &c2[new_end - 1])
        {
            self.patch(Some(&c1[old_end - 1]), &c2[new_end - 1], container, None, parent);
            old_end -= 1;
            new_end -= 1;
        }

        if i >= old_end {
            if i < new_end {
                let anchor = c2.get(new_end).and_then(|n| n.el()).or(parent_anchor);
                for node in &c2[i..new_end] {
                    self.patch(None, node, container, anchor, parent);
                }
            }
            return;
        }

        if i >= new_end {
            self.unmount_children(&c1[i..old_end]);
            return;
        }

        let (s1, s2) = (i, i);
        let to_be_patched = new_end - s2;

        let mut key_to_new: HashMap<&VNodeKey, usize> = HashMap::with_capacity(to_be_patched);
        for (index, node) in c2.iter().enumerate().take(new_end).skip(s2) {
            if let Some(key) = node.key() {
                if key_to_new.insert(key, index).is_some() {
                    warn!(%key, "duplicate key in child list; keys must be unique among siblings");
                }
            }
        }

        // Old position + 1 for every slot of the window; 0 means "mount fresh".
        let mut new_to_old = vec![0usize; to_be_patched];
        let mut patched = 0;
        let mut moved = false;
        let mut max_new_index_so_far = 0;

        for (old_index, prev) in c1.iter().enumerate().take(old_end).skip(s1) {
            if patched >= to_be_patched {
                self.unmount(prev, true);
                continue;
            }

            let new_index = match prev.key() {
                Some(key) => key_to_new.get(key).copied(),
                None => (s2..new_end).find(|&j| {
                    new_to_old[j - s2] == 0 && is_same_vnode_type(prev, &c2[j])
                }),
            };

            match new_index {
                Some(j) if new_to_old[j - s2] == 0 => {
                    new_to_old[j - s2] = old_index + 1;
                    if j >= max_new_index_so_far {
                        max_new_index_so_far = j;
                    } else {
                        moved = true;
                    }
                    self.patch(Some(prev), &c2[j], container, None, parent);
                    patched += 1;
                }
                _ => self.unmount(prev, true),
            }
        }

        let stable = if moved {
            longest_increasing_subsequence(&new_to_old)
        } else {
            Vec::new()
        };
        trace!(window = to_be_patched, patched, moved, stable = stable.len(), "keyed diff");

        let mut cursor = stable.len();
        for offset in (0..to_be_patched).rev() {
            let index = s2 + offset;
            let node = &c2[index];
            let anchor = c2.get(index + 1).and_then(|n| n.el()).or(parent_anchor);

            if new_to_old[offset] == 0 {
                self.patch(None, node, container, anchor, parent);
            } else if moved {
                if cursor > 0 && stable[cursor - 1] == offset {
                    cursor -= 1;
                } else {
                    self.move_node(node, container, anchor);
                }
            }
        }
    }
}
