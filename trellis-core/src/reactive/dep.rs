//! Subscriber sets.
//!
//! A `Dep` is the set of effects that read one reactive source during their
//! last run: one (subject, field) pair of the dependency graph, the private
//! set of a `Ref`, or the private set of a `Computed`.
//!
//! The set holds weak references only. Effects own their memberships (they
//! keep the `Dep` alive through their own dependency list), so a dropped
//! effect never lingers in the graph. A field set registered in a runtime's
//! graph unregisters itself once its last subscriber leaves.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::effect::EffectInner;
use super::object::ObjectId;
use super::runtime::{RuntimeInner, TrackKey};
use super::subscriber::EffectId;

/// Where a field set is registered in the dependency graph.
struct GraphSlot {
    runtime: Weak<RuntimeInner>,
    subject: ObjectId,
    key: TrackKey,
}

#[derive(Default)]
pub(crate) struct Dep {
    subscribers: RefCell<IndexMap<EffectId, Weak<EffectInner>>>,
    slot: Option<GraphSlot>,
}

impl Dep {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// A set for one (subject, key) pair of `runtime`'s graph.
    pub(crate) fn in_graph(runtime: Weak<RuntimeInner>, subject: ObjectId, key: TrackKey) -> Rc<Self> {
        Rc::new(Self {
            subscribers: RefCell::default(),
            slot: Some(GraphSlot { runtime, subject, key }),
        })
    }

    /// Add a subscriber. Returns false when it was already present.
    pub(crate) fn insert(&self, id: EffectId, effect: Weak<EffectInner>) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        if subscribers.contains_key(&id) {
            return false;
        }
        subscribers.insert(id, effect);
        true
    }

    pub(crate) fn remove(&self, id: EffectId) {
        let now_empty = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.shift_remove(&id).is_some() && subscribers.is_empty()
        };
        if !now_empty {
            return;
        }
        if let Some(slot) = &self.slot {
            if let Some(runtime) = slot.runtime.upgrade() {
                runtime.release_dep(slot.subject, &slot.key, self);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Copy the live subscribers out so they can be run while the set itself
    /// is being rewritten by their re-runs.
    pub(crate) fn snapshot(&self) -> Vec<Rc<EffectInner>> {
        self.subscribers
            .borrow()
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("subscribers", &self.subscribers.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
