//! Reactive proxies.
//!
//! A [`Proxy`] wraps a raw [`Object`] (or another proxy) and routes every
//! field access through explicit accessor methods:
//!
//! - `get` tracks the field, unwraps nested refs, and lazily wraps nested
//!   objects so reactivity is deep;
//! - `set` commits the write and triggers dependents only when the value
//!   actually changed.
//!
//! Two independent flags give the four variants: reactive, shallow-reactive,
//! readonly, and shallow-readonly. A readonly proxy never tracks or writes;
//! write attempts emit a warning and return `false`.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use tracing::warn;

use super::object::Object;
use super::runtime::{Runtime, TrackKey, TriggerOp};
use super::value::{has_changed, Value};

bitflags! {
    /// The two independent axes a proxy is configured on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProxyFlags: u8 {
        const READONLY = 1;
        const SHALLOW = 1 << 1;
    }
}

#[derive(Clone)]
enum Target {
    Object(Object),
    /// Readonly view over a mutable proxy; reads still track through it.
    Proxy(Proxy),
}

struct ProxyInner {
    target: Target,
    flags: ProxyFlags,
    runtime: Runtime,
}

#[derive(Clone)]
pub struct Proxy {
    inner: Rc<ProxyInner>,
}

impl Proxy {
    pub(crate) fn over_object(runtime: &Runtime, target: Object, flags: ProxyFlags) -> Self {
        Self {
            inner: Rc::new(ProxyInner {
                target: Target::Object(target),
                flags,
                runtime: runtime.clone(),
            }),
        }
    }

    fn over_proxy(runtime: &Runtime, target: Proxy, flags: ProxyFlags) -> Self {
        Self {
            inner: Rc::new(ProxyInner {
                target: Target::Proxy(target),
                flags,
                runtime: runtime.clone(),
            }),
        }
    }

    /// Wrap a nested value the way a deep proxy exposes it.
    fn wrap(runtime: &Runtime, value: Value, readonly: bool) -> Value {
        match value {
            Value::Object(object) => {
                let flags = if readonly {
                    ProxyFlags::READONLY
                } else {
                    ProxyFlags::empty()
                };
                Value::Proxy(Proxy::over_object(runtime, object, flags))
            }
            Value::Proxy(proxy) if readonly && !proxy.is_readonly() => {
                Value::Proxy(Proxy::over_proxy(runtime, proxy, ProxyFlags::READONLY))
            }
            other => other,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    pub fn flags(&self) -> ProxyFlags {
        self.inner.flags
    }

    pub fn is_readonly(&self) -> bool {
        self.inner.flags.contains(ProxyFlags::READONLY)
    }

    pub fn is_shallow(&self) -> bool {
        self.inner.flags.contains(ProxyFlags::SHALLOW)
    }

    /// True for mutable proxies and for readonly views over a mutable proxy.
    pub fn is_reactive(&self) -> bool {
        if !self.is_readonly() {
            return true;
        }
        match &self.inner.target {
            Target::Proxy(proxy) => proxy.is_reactive(),
            Target::Object(_) => false,
        }
    }

    /// The raw subject, unwrapping every proxy layer.
    pub fn raw(&self) -> Object {
        match &self.inner.target {
            Target::Object(object) => object.clone(),
            Target::Proxy(proxy) => proxy.raw(),
        }
    }

    /// Readonly view over this proxy. Reads through the view still track.
    pub fn to_readonly(&self) -> Proxy {
        if self.is_readonly() {
            return self.clone();
        }
        Proxy::over_proxy(&self.inner.runtime, self.clone(), ProxyFlags::READONLY)
    }

    pub fn to_shallow_readonly(&self) -> Proxy {
        if self.is_readonly() {
            return self.clone();
        }
        Proxy::over_proxy(
            &self.inner.runtime,
            self.clone(),
            ProxyFlags::READONLY | ProxyFlags::SHALLOW,
        )
    }

    /// Read a field. Missing fields read as `Value::Null`.
    pub fn get(&self, key: &str) -> Value {
        let inner = &self.inner;
        let readonly = self.is_readonly();

        let value = match &inner.target {
            Target::Object(object) => {
                if !readonly {
                    inner.runtime.track_key(object, TrackKey::field(key));
                }
                object.get(key).unwrap_or_default()
            }
            Target::Proxy(proxy) => proxy.get(key),
        };

        if self.is_shallow() {
            return value;
        }
        if let Value::Ref(r) = &value {
            return r.get();
        }
        Proxy::wrap(&inner.runtime, value, readonly)
    }

    /// Write a field. Returns `false` when the write was refused.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let inner = &self.inner;

        if self.is_readonly() {
            if inner.runtime.config().warn_readonly_writes {
                warn!(key, "set operation failed: target is readonly");
            }
            return false;
        }

        let object = match &inner.target {
            Target::Object(object) => object,
            Target::Proxy(proxy) => return proxy.set(key, value),
        };

        let old = object.get(key);
        let mut value = value;
        if !self.is_shallow() {
            if !is_readonly(&value) {
                value = to_raw(&value);
            }
            if let Some(Value::Ref(old_ref)) = &old {
                if !matches!(value, Value::Ref(_)) {
                    old_ref.set(value);
                    return true;
                }
            }
        }

        object.insert(key, value.clone());
        match old {
            None => inner
                .runtime
                .trigger_key(object.id(), TrackKey::field(key), TriggerOp::Add),
            Some(old) if has_changed(&to_raw(&old), &value) => inner
                .runtime
                .trigger_key(object.id(), TrackKey::field(key), TriggerOp::Set),
            Some(_) => {}
        }
        true
    }

    pub fn has(&self, key: &str) -> bool {
        match &self.inner.target {
            Target::Object(object) => {
                if !self.is_readonly() {
                    self.inner.runtime.track_key(object, TrackKey::field(key));
                }
                object.contains_key(key)
            }
            Target::Proxy(proxy) => proxy.has(key),
        }
    }

    /// Field names, tracking structural changes (adds and removals).
    pub fn keys(&self) -> Vec<Rc<str>> {
        match &self.inner.target {
            Target::Object(object) => {
                if !self.is_readonly() {
                    self.inner.runtime.track_key(object, TrackKey::Iterate);
                }
                object.keys()
            }
            Target::Proxy(proxy) => proxy.keys(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remove(&self, key: &str) -> bool {
        if self.is_readonly() {
            if self.inner.runtime.config().warn_readonly_writes {
                warn!(key, "delete operation failed: target is readonly");
            }
            return false;
        }
        match &self.inner.target {
            Target::Object(object) => {
                if object.remove(key).is_some() {
                    self.inner.runtime.trigger_key(
                        object.id(),
                        TrackKey::field(key),
                        TriggerOp::Delete,
                    );
                }
                true
            }
            Target::Proxy(proxy) => proxy.remove(key),
        }
    }

    /// Structural identity: same runtime, same flags, same target chain.
    pub fn same(a: &Proxy, b: &Proxy) -> bool {
        if Rc::ptr_eq(&a.inner, &b.inner) {
            return true;
        }
        a.inner.flags == b.inner.flags
            && a.inner.runtime.ptr_eq(&b.inner.runtime)
            && match (&a.inner.target, &b.inner.target) {
                (Target::Object(x), Target::Object(y)) => Object::ptr_eq(x, y),
                (Target::Proxy(x), Target::Proxy(y)) => Proxy::same(x, y),
                _ => false,
            }
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("flags", &self.inner.flags)
            .field("raw", &self.raw().id())
            .field("nested", &matches!(self.inner.target, Target::Proxy(_)))
            .finish()
    }
}

/// True for proxies whose writes reach a mutable proxy.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Proxy(proxy) if proxy.is_reactive())
}

pub fn is_readonly(value: &Value) -> bool {
    matches!(value, Value::Proxy(proxy) if proxy.is_readonly())
}

pub fn is_proxy(value: &Value) -> bool {
    matches!(value, Value::Proxy(_))
}

/// Strip every proxy layer; non-proxies are returned unchanged.
pub fn to_raw(value: &Value) -> Value {
    match value {
        Value::Proxy(proxy) => Value::Object(proxy.raw()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Effect, Ref};
    use std::cell::Cell;

    fn counting_effect(rt: &Runtime, read: impl Fn() + 'static) -> (Effect, Rc<Cell<usize>>) {
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let effect = Effect::new(rt, move || {
            read();
            counter.set(counter.get() + 1);
        });
        (effect, runs)
    }

    #[test]
    fn get_tracks_and_set_triggers() {
        let rt = Runtime::new();
        let state = rt.reactive(Object::from_iter([("a", 1)]));

        let reader = state.clone();
        let (_effect, runs) = counting_effect(&rt, move || {
            let _ = reader.get("a");
        });

        assert!(state.set("a", 2));
        assert_eq!(runs.get(), 2);
        assert_eq!(state.get("a"), Value::from(2));
    }

    #[test]
    fn unchanged_write_does_not_trigger() {
        let rt = Runtime::new();
        let state = rt.reactive(Object::from_iter([("a", f64::NAN)]));

        let reader = state.clone();
        let (_effect, runs) = counting_effect(&rt, move || {
            let _ = reader.get("a");
        });

        state.set("a", f64::NAN);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn nested_objects_are_wrapped_lazily() {
        let rt = Runtime::new();
        let nested = Object::from_iter([("b", 1)]);
        let state = rt.reactive(Object::from_iter([("a", nested.clone())]));

        let child = state.get("a");
        assert!(is_reactive(&child));

        let reader = state.clone();
        let (_effect, runs) = counting_effect(&rt, move || {
            if let Value::Proxy(a) = reader.get("a") {
                let _ = a.get("b");
            }
        });

        if let Some(child) = child.as_proxy() {
            child.set("b", 2);
        }
        assert_eq!(runs.get(), 2);
        assert_eq!(nested.get("b"), Some(Value::from(2)));
    }

    #[test]
    fn shallow_proxy_does_not_wrap_nested_objects() {
        let rt = Runtime::new();
        let nested = Object::new();
        let state = rt.shallow_reactive(Object::from_iter([("a", nested)]));
        assert!(matches!(state.get("a"), Value::Object(_)));
    }

    #[test]
    fn readonly_refuses_writes_and_never_tracks() {
        let rt = Runtime::new();
        let raw = Object::from_iter([("a", 1)]);
        let view = rt.readonly(raw.clone());

        let reader = view.clone();
        let (effect, _runs) = counting_effect(&rt, move || {
            let _ = reader.get("a");
        });
        assert_eq!(effect.dependency_count(), 0);

        assert!(!view.set("a", 5));
        assert!(!view.remove("a"));
        assert_eq!(raw.get("a"), Some(Value::from(1)));
    }

    #[test]
    fn readonly_nested_values_are_readonly() {
        let rt = Runtime::new();
        let state = rt.readonly(Object::from_iter([("a", Object::new())]));
        let nested = state.get("a");
        assert!(is_readonly(&nested));
        assert!(!is_reactive(&nested));
    }

    #[test]
    fn readonly_over_reactive_tracks_through_inner_proxy() {
        let rt = Runtime::new();
        let state = rt.reactive(Object::from_iter([("a", 1)]));
        let view = state.to_readonly();
        assert!(view.is_readonly());
        assert!(view.is_reactive());

        let reader = view.clone();
        let (_effect, runs) = counting_effect(&rt, move || {
            let _ = reader.get("a");
        });

        state.set("a", 2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn to_raw_unwraps_proxy_of_proxy() {
        let rt = Runtime::new();
        let raw = Object::new();
        let view = rt.reactive(raw.clone()).to_readonly();
        assert_eq!(to_raw(&Value::from(view)), Value::from(raw));
    }

    #[test]
    fn adding_and_removing_fields_triggers_key_iteration() {
        let rt = Runtime::new();
        let state = rt.reactive(Object::new());

        let reader = state.clone();
        let (_effect, runs) = counting_effect(&rt, move || {
            let _ = reader.keys();
        });

        state.set("a", 1);
        assert_eq!(runs.get(), 2);
        state.set("a", 2);
        assert_eq!(runs.get(), 2);
        state.remove("a");
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn nested_refs_are_unwrapped_and_written_through() {
        let rt = Runtime::new();
        let count = Ref::new(&rt, 1);
        let state = rt.reactive(Object::from_iter([("count", count.clone())]));

        assert_eq!(state.get("count"), Value::from(1));
        state.set("count", 2);
        assert_eq!(count.get(), Value::from(2));
        assert!(matches!(state.raw().get("count"), Some(Value::Ref(_))));
    }

    #[test]
    fn proxies_over_same_object_are_equal() {
        let rt = Runtime::new();
        let raw = Object::new();
        assert_eq!(Value::from(rt.reactive(raw.clone())), Value::from(rt.reactive(raw.clone())));
        assert_ne!(Value::from(rt.reactive(raw.clone())), Value::from(rt.readonly(raw)));
    }
}
