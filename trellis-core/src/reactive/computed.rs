//! Computed Values
//!
//! A `Computed` is a cached derived value that re-evaluates only when one of
//! the reactive sources it read has changed.
//!
//! # How Computed Values Work
//!
//! 1. The getter runs inside a lazy effect, so its reads are tracked like any
//!    other effect's reads. Nothing runs until the first `get`.
//!
//! 2. When a source changes, the effect's scheduler marks the value dirty and
//!    notifies whoever read the computed value. It does not recompute.
//!
//! 3. The next `get` on a dirty value re-runs the getter and caches the
//!    result. Values that are never read again stay dirty and cost nothing.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::dep::Dep;
use super::effect::{Effect, EffectOptions};
use super::runtime::Runtime;

struct ComputedInner<T> {
    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
    dep: Rc<Dep>,
    runtime: Runtime,
}

/// A lazily evaluated, cached derived value.
#[derive(Clone)]
pub struct Computed<T>
where
    T: Clone + 'static,
{
    inner: Rc<ComputedInner<T>>,
    getter: Rc<dyn Fn() -> T>,
    effect: Effect,
}

impl<T> Computed<T>
where
    T: Clone + 'static,
{
    pub fn new<F>(runtime: &Runtime, getter: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let inner = Rc::new(ComputedInner {
            value: RefCell::new(None),
            dirty: Cell::new(true),
            dep: Dep::new(),
            runtime: runtime.clone(),
        });
        let getter: Rc<dyn Fn() -> T> = Rc::new(getter);

        let body = {
            let inner = Rc::downgrade(&inner);
            let getter = Rc::clone(&getter);
            move || {
                let value = getter();
                if let Some(inner) = inner.upgrade() {
                    *inner.value.borrow_mut() = Some(value);
                }
            }
        };
        let scheduler = {
            let inner = Rc::downgrade(&inner);
            move || {
                if let Some(inner) = inner.upgrade() {
                    if !inner.dirty.replace(true) {
                        inner.runtime.trigger_dep(&inner.dep);
                    }
                }
            }
        };

        let effect = Effect::with_options(
            runtime,
            body,
            EffectOptions::default().lazy().scheduler(scheduler),
        );

        Self {
            inner,
            getter,
            effect,
        }
    }

    /// Read the value, recomputing first if a source changed.
    pub fn get(&self) -> T {
        self.inner.runtime.track_dep(&self.inner.dep);
        if self.inner.dirty.replace(false) {
            self.effect.run();
        }

        let cached = self.inner.value.borrow().clone();
        match cached {
            Some(value) => value,
            // The getter re-entered this value while it was being computed.
            None => (self.getter)(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Number of times the getter ran through the tracked path.
    pub fn compute_count(&self) -> usize {
        self.effect.run_count()
    }

    /// Stop tracking sources. The last cached value is kept.
    pub fn stop(&self) {
        self.effect.stop();
    }
}

impl<T> std::fmt::Debug for Computed<T>
where
    T: Clone + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("dirty", &self.is_dirty())
            .field("value", &self.inner.value.try_borrow().ok())
            .field("compute_count", &self.compute_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Object, Value};

    #[test]
    fn computes_lazily_on_first_access() {
        let rt = Runtime::new();
        let state = rt.reactive(Object::from_iter([("n", 2)]));

        let reader = state.clone();
        let doubled = Computed::new(&rt, move || reader.get("n").as_number().unwrap_or(0.0) * 2.0);
        assert_eq!(doubled.compute_count(), 0);

        assert_eq!(doubled.get(), 4.0);
        assert_eq!(doubled.compute_count(), 1);
    }

    #[test]
    fn caches_until_a_source_changes() {
        let rt = Runtime::new();
        let state = rt.reactive(Object::from_iter([("n", 2)]));

        let reader = state.clone();
        let doubled = Computed::new(&rt, move || reader.get("n").as_number().unwrap_or(0.0) * 2.0);

        doubled.get();
        doubled.get();
        assert_eq!(doubled.compute_count(), 1);

        state.set("n", 5);
        assert!(doubled.is_dirty());
        assert_eq!(doubled.compute_count(), 1);
        assert_eq!(doubled.get(), 10.0);
        assert_eq!(doubled.compute_count(), 2);
    }

    #[test]
    fn effects_reading_a_computed_rerun_when_it_changes() {
        let rt = Runtime::new();
        let state = rt.reactive(Object::from_iter([("n", 1)]));

        let reader = state.clone();
        let label = Computed::new(&rt, move || format!("n={}", reader.get("n")));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let observed = label.clone();
        let _effect = Effect::new(&rt, move || log.borrow_mut().push(observed.get()));

        state.set("n", 2);
        assert_eq!(*seen.borrow(), vec!["n=1".to_string(), "n=2".to_string()]);
    }

    #[test]
    fn stopped_computed_keeps_last_value() {
        let rt = Runtime::new();
        let state = rt.reactive(Object::from_iter([("n", 1)]));

        let reader = state.clone();
        let value = Computed::new(&rt, move || reader.get("n"));
        assert_eq!(value.get(), Value::from(1));

        value.stop();
        state.set("n", 2);
        assert_eq!(value.get(), Value::from(1));
    }
}
