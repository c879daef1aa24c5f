//! Integration Tests for the Reactive System
//!
//! These tests verify that proxies, refs, computed values, effects and the
//! job queue work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_core::reactive::{
    proxy_refs, Computed, Effect, EffectOptions, Object, Ref, Runtime, Value,
};
use trellis_core::scheduler::Job;
use trellis_core::{JobError, RuntimeConfig};

fn counter() -> (Rc<Cell<usize>>, impl Fn() + Clone) {
    let count = Rc::new(Cell::new(0));
    let bump = {
        let count = Rc::clone(&count);
        move || count.set(count.get() + 1)
    };
    (count, bump)
}

/// A branch that stops reading a field stops depending on it.
#[test]
fn switching_branch_drops_stale_dependency() {
    let rt = Runtime::new();
    let state = rt.reactive(Object::from_iter([
        ("show", Value::Bool(true)),
        ("detail", Value::from("a")),
    ]));
    let (runs, bump) = counter();

    let observed = state.clone();
    let _effect = Effect::new(&rt, move || {
        bump();
        if observed.get("show").is_truthy() {
            let _ = observed.get("detail");
        }
    });
    assert_eq!(runs.get(), 1);

    state.set("detail", "b");
    assert_eq!(runs.get(), 2);

    state.set("show", false);
    assert_eq!(runs.get(), 3);

    // no longer read
    state.set("detail", "c");
    assert_eq!(runs.get(), 3);
}

/// An effect that reads and writes the same field does not re-enter itself.
#[test]
fn effect_writing_its_own_dependency_runs_once() {
    let rt = Runtime::new();
    let state = rt.reactive(Object::from_iter([("n", 0)]));
    let (runs, bump) = counter();

    let observed = state.clone();
    let _effect = Effect::new(&rt, move || {
        bump();
        let n = observed.get("n").as_number().unwrap_or(0.0);
        observed.set("n", n + 1.0);
    });

    assert_eq!(runs.get(), 1);
    assert_eq!(state.get("n"), Value::from(1));
}

/// A scheduled effect turns any number of writes into one queued job.
#[test]
fn scheduled_effect_batches_writes() {
    let rt = Runtime::new();
    let state = rt.reactive(Object::from_iter([("n", 0)]));
    let (runs, bump) = counter();

    let slot: Rc<RefCell<Option<Effect>>> = Rc::new(RefCell::new(None));
    let job = {
        let slot = Rc::clone(&slot);
        Job::new(move || {
            let effect = slot.borrow().clone();
            if let Some(effect) = effect {
                effect.run();
            }
        })
    };

    let observed = state.clone();
    let scheduler = {
        let rt = rt.clone();
        let job = Rc::clone(&job);
        move || rt.scheduler().queue_job(&job)
    };
    let effect = Effect::with_options(
        &rt,
        move || {
            bump();
            let _ = observed.get("n");
        },
        EffectOptions::default().scheduler(scheduler),
    );
    *slot.borrow_mut() = Some(effect);
    assert_eq!(runs.get(), 1);

    for i in 1..=5 {
        state.set("n", i);
    }
    assert_eq!(runs.get(), 1);
    assert!(rt.scheduler().is_flush_pending());

    assert!(rt.tick());
    assert_eq!(runs.get(), 2);
    assert!(!rt.tick());
}

/// Stopping an effect turns its pending job into a no-op.
#[test]
fn stopped_job_is_skipped_at_flush() {
    let rt = Runtime::new();
    let (runs, bump) = counter();
    let job = Job::new(bump);

    rt.scheduler().queue_job(&job);
    job.deactivate();
    rt.tick();

    assert_eq!(runs.get(), 0);
    assert!(rt.scheduler().take_failures().is_empty());
}

/// `proxy_refs` unwraps refs on read and writes through them on set.
#[test]
fn proxy_refs_unwrap_and_write_through() {
    let rt = Runtime::new();
    let a = Ref::new(&rt, 1);
    let refs = proxy_refs(Object::from_iter([("a", Value::from(a.clone()))]));

    assert_eq!(refs.get("a"), Value::from(1));

    refs.set("a", 2);
    assert_eq!(a.get_untracked(), Value::from(2));
    assert!(matches!(
        refs.target().as_object().and_then(|o| o.get("a")),
        Some(Value::Ref(_))
    ));
}

/// A readonly view refuses writes without touching the raw value or
/// triggering dependents.
#[test]
fn readonly_write_is_a_noop() {
    let rt = Runtime::new();
    let raw = Object::from_iter([("x", 1)]);
    let reactive = rt.reactive(raw.clone());
    let readonly = reactive.to_readonly();
    let (runs, bump) = counter();

    let observed = reactive.clone();
    let _effect = Effect::new(&rt, move || {
        bump();
        let _ = observed.get("x");
    });

    assert!(!readonly.set("x", 2));
    assert_eq!(raw.get("x"), Some(Value::from(1)));
    assert_eq!(readonly.get("x"), Value::from(1));
    assert_eq!(runs.get(), 1);
}

/// Computed values and effects compose.
#[test]
fn computed_feeds_effect() {
    let rt = Runtime::new();
    let price = Ref::new(&rt, 10);
    let qty = Ref::new(&rt, 2);

    let total = {
        let (price, qty) = (price.clone(), qty.clone());
        Computed::new(&rt, move || {
            let p = price.get().as_number().unwrap_or(0.0);
            let q = qty.get().as_number().unwrap_or(0.0);
            p * q
        })
    };

    let seen = Rc::new(Cell::new(0.0));
    let _effect = {
        let (seen, total) = (Rc::clone(&seen), total.clone());
        Effect::new(&rt, move || seen.set(total.get()))
    };
    assert_eq!(seen.get(), 20.0);

    qty.set(3);
    assert_eq!(seen.get(), 30.0);
    assert_eq!(total.compute_count(), 2);
}

/// Two runtimes never share dependency state.
#[test]
fn runtimes_are_isolated() {
    let rt_a = Runtime::new();
    let rt_b = Runtime::new();
    let subject = Object::from_iter([("v", 0)]);
    let a = rt_a.reactive(subject.clone());
    let b = rt_b.reactive(subject);
    let (runs, bump) = counter();

    let observed = a.clone();
    let _effect = Effect::new(&rt_a, move || {
        bump();
        let _ = observed.get("v");
    });

    b.set("v", 1);
    assert_eq!(runs.get(), 1);
    a.set("v", 2);
    assert_eq!(runs.get(), 2);
}

/// A job that keeps re-queueing itself is stopped by the recursion limit.
#[test]
fn runaway_job_hits_recursion_limit() {
    let rt = Runtime::with_config(RuntimeConfig {
        recursion_limit: 5,
        ..RuntimeConfig::default()
    });
    let (runs, bump) = counter();

    let slot: Rc<RefCell<Option<Rc<Job>>>> = Rc::new(RefCell::new(None));
    let job = {
        let (slot, rt) = (Rc::clone(&slot), rt.clone());
        Job::new(move || {
            bump();
            if let Some(job) = slot.borrow().as_ref() {
                rt.scheduler().queue_job(job);
            }
        })
    };
    *slot.borrow_mut() = Some(Rc::clone(&job));

    rt.scheduler().queue_job(&job);
    rt.tick();

    assert_eq!(runs.get(), 5);
    let failures = rt.scheduler().take_failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], JobError::RecursionLimit { limit: 5, .. }));
}
