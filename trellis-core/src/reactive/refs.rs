//! Refs
//!
//! A [`Ref`] is a single reactive cell. It owns its own subscriber set
//! instead of living in the runtime's subject graph, so it needs no
//! identity beyond the handle itself.
//!
//! # How Refs Work
//!
//! 1. `get` subscribes the running effect to the ref's subscriber set.
//!
//! 2. `set` compares the raw new value with the raw stored value. Only a real
//!    change stores the value and notifies subscribers.
//!
//! 3. Unless the ref is shallow, objects stored in it are exposed through a
//!    deep reactive proxy.
//!
//! [`ProxyRefs`] is the read-side companion: a view over an object whose
//! ref-valued fields read as their contents and accept plain writes.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::dep::Dep;
use super::object::Object;
use super::proxy::{is_readonly, to_raw, Proxy};
use super::runtime::Runtime;
use super::value::{has_changed, Value};

struct RefInner {
    /// Exposed value: the raw value, or a proxy over it for deep refs.
    value: RefCell<Value>,
    raw: RefCell<Value>,
    dep: Rc<Dep>,
    shallow: bool,
    runtime: Runtime,
}

/// A reactive cell holding one [`Value`].
///
/// Cloning a `Ref` yields the same cell.
#[derive(Clone)]
pub struct Ref {
    inner: Rc<RefInner>,
}

impl Ref {
    /// Create a deep ref. Passing an existing ref returns that ref.
    pub fn new(runtime: &Runtime, value: impl Into<Value>) -> Self {
        Self::create(runtime, value.into(), false)
    }

    /// Create a ref whose contents are stored and exposed as-is.
    pub fn shallow(runtime: &Runtime, value: impl Into<Value>) -> Self {
        Self::create(runtime, value.into(), true)
    }

    fn create(runtime: &Runtime, value: Value, shallow: bool) -> Self {
        if let Value::Ref(existing) = value {
            return existing;
        }
        let (raw, exposed) = if shallow {
            (value.clone(), value)
        } else {
            let raw = to_raw(&value);
            let exposed = to_reactive(runtime, value);
            (raw, exposed)
        };
        Self {
            inner: Rc::new(RefInner {
                value: RefCell::new(exposed),
                raw: RefCell::new(raw),
                dep: Dep::new(),
                shallow,
                runtime: runtime.clone(),
            }),
        }
    }

    /// Read the value, subscribing the running effect.
    pub fn get(&self) -> Value {
        self.inner.runtime.track_dep(&self.inner.dep);
        self.get_untracked()
    }

    pub fn get_untracked(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    /// Write the value. Subscribers are notified only on a real change.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();
        let direct = self.inner.shallow || is_readonly(&value);
        let raw = if direct { value.clone() } else { to_raw(&value) };

        if !has_changed(&self.inner.raw.borrow(), &raw) {
            return;
        }

        let exposed = if direct {
            value
        } else {
            to_reactive(&self.inner.runtime, raw.clone())
        };
        *self.inner.raw.borrow_mut() = raw;
        *self.inner.value.borrow_mut() = exposed;
        self.inner.runtime.trigger_dep(&self.inner.dep);
    }

    pub fn is_shallow(&self) -> bool {
        self.inner.shallow
    }

    /// Number of effects currently subscribed to this ref.
    pub fn subscriber_count(&self) -> usize {
        self.inner.dep.len()
    }

    pub fn ptr_eq(a: &Ref, b: &Ref) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.value.try_borrow() {
            Ok(value) => f
                .debug_struct("Ref")
                .field("value", &*value)
                .field("shallow", &self.inner.shallow)
                .finish(),
            Err(_) => f.debug_struct("Ref").finish_non_exhaustive(),
        }
    }
}

fn to_reactive(runtime: &Runtime, value: Value) -> Value {
    match value {
        Value::Object(object) => Value::Proxy(runtime.reactive(object)),
        other => other,
    }
}

/// Notify a shallow ref's subscribers after mutating its contents in place.
pub fn trigger_ref(r: &Ref) {
    r.inner.runtime.trigger_dep(&r.inner.dep);
}

pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

/// The contents of a ref (tracked), or the value itself.
pub fn unref(value: &Value) -> Value {
    match value {
        Value::Ref(r) => r.get(),
        other => other.clone(),
    }
}

/// A view that unwraps ref-valued fields on read and writes through them on
/// plain writes.
#[derive(Clone, Debug)]
pub struct ProxyRefs {
    target: Value,
}

/// Wrap `target` (an object or a proxy) so its ref fields read transparently.
pub fn proxy_refs(target: impl Into<Value>) -> ProxyRefs {
    ProxyRefs {
        target: target.into(),
    }
}

impl ProxyRefs {
    pub fn target(&self) -> &Value {
        &self.target
    }

    pub fn get(&self, key: &str) -> Value {
        match &self.target {
            Value::Proxy(proxy) => unref(&proxy.get(key)),
            Value::Object(object) => unref(&object.get(key).unwrap_or_default()),
            _ => Value::Null,
        }
    }

    /// Write a field. A plain value written over a ref updates the ref.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        match &self.target {
            Value::Proxy(proxy) => write_through_proxy(proxy, key, value),
            Value::Object(object) => {
                write_through_object(object, key, value);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        match &self.target {
            Value::Proxy(proxy) => proxy.has(key),
            Value::Object(object) => object.contains_key(key),
            _ => false,
        }
    }

    pub fn keys(&self) -> Vec<Rc<str>> {
        match &self.target {
            Value::Proxy(proxy) => proxy.keys(),
            Value::Object(object) => object.keys(),
            _ => Vec::new(),
        }
    }
}

fn write_through_proxy(proxy: &Proxy, key: &str, value: Value) -> bool {
    if proxy.is_shallow() && !proxy.is_readonly() {
        if let Some(Value::Ref(old)) = proxy.raw().get(key) {
            if !is_ref(&value) {
                old.set(value);
                return true;
            }
        }
    }
    proxy.set(key, value)
}

fn write_through_object(object: &Object, key: &str, value: Value) {
    if let Some(Value::Ref(old)) = object.get(key) {
        if !is_ref(&value) {
            old.set(value);
            return;
        }
    }
    object.insert(key, value);
}
