//! Raw subjects.
//!
//! An [`Object`] is the plain data structure that proxies wrap: a shared,
//! insertion-ordered map from field names to [`Value`]s with a stable
//! identity. Reading or writing an `Object` directly never tracks or
//! triggers; go through a [`Proxy`](super::Proxy) for that.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::runtime::RuntimeInner;
use super::value::Value;

/// Unique identity of a raw subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

pub(crate) struct ObjectData {
    id: ObjectId,
    fields: RefCell<IndexMap<Rc<str>, Value>>,
    /// Runtimes holding a graph entry for this subject. The graph never owns
    /// the subject; instead the subject clears its entries when it dies.
    observers: RefCell<SmallVec<[Weak<RuntimeInner>; 1]>>,
}

impl Drop for ObjectData {
    fn drop(&mut self) {
        for runtime in self.observers.get_mut().drain(..) {
            if let Some(runtime) = runtime.upgrade() {
                runtime.forget_subject(self.id);
            }
        }
    }
}

/// A shared, identity-bearing field map.
#[derive(Clone)]
pub struct Object(Rc<ObjectData>);

impl Object {
    pub fn new() -> Self {
        Self(Rc::new(ObjectData {
            id: ObjectId::new(),
            fields: RefCell::new(IndexMap::new()),
            observers: RefCell::new(SmallVec::new()),
        }))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Read a field without tracking.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.fields.borrow().get(key).cloned()
    }

    /// Write a field without triggering. Returns the previous value.
    pub fn insert(&self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Option<Value> {
        self.0.fields.borrow_mut().insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.fields.borrow_mut().shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.fields.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<Rc<str>> {
        self.0.fields.borrow().keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
        self.0
            .fields
            .borrow()
            .iter()
            .map(|(key, value)| (Rc::clone(key), value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.fields.borrow().is_empty()
    }

    pub fn clear(&self) {
        let old = std::mem::take(&mut *self.0.fields.borrow_mut());
        drop(old);
    }

    pub fn ptr_eq(a: &Object, b: &Object) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn observe(&self, runtime: Weak<RuntimeInner>) {
        let mut observers = self.0.observers.borrow_mut();
        if !observers.iter().any(|existing| existing.ptr_eq(&runtime)) {
            observers.push(runtime);
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for Object
where
    K: Into<Rc<str>>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let object = Object::new();
        {
            let mut fields = object.0.fields.borrow_mut();
            for (key, value) in iter {
                fields.insert(key.into(), value.into());
            }
        }
        object
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.fields.try_borrow() {
            Ok(fields) => f
                .debug_struct("Object")
                .field("id", &self.0.id)
                .field("fields", &fields.keys().collect::<Vec<_>>())
                .finish(),
            Err(_) => f.debug_struct("Object").field("id", &self.0.id).finish_non_exhaustive(),
        }
    }
}
