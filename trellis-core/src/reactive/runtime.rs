//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects reactive data,
//! effects, and the job queue. It owns the dependency graph and the stack of
//! running effects.
//!
//! # How It Works
//!
//! 1. When a proxy field is read inside a running effect, the runtime looks
//!    up (or creates) the subscriber set for that (subject, field) pair and
//!    links it with the effect in both directions.
//!
//! 2. When a proxy field is written and the value actually changed, the
//!    runtime copies the subscriber set and notifies each subscriber except
//!    the effect that is currently running.
//!
//! 3. Subscribers with a scheduler (component render effects) enqueue a job
//!    instead of re-running; the job queue flushes on the next `tick`.
//!
//! # Threading
//!
//! A runtime is single-threaded by construction (`Rc`, not `Arc`). There is
//! no global state: every runtime has its own graph, stack and queue, so
//! independent runtimes can coexist in one process or one test.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{trace, warn};

use super::context::ReactiveContext;
use super::dep::Dep;
use super::object::{Object, ObjectId};
use super::proxy::{Proxy, ProxyFlags};
use crate::config::RuntimeConfig;
use crate::scheduler::Scheduler;

/// The key a subscriber set is registered under within one subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TrackKey {
    Field(Rc<str>),
    /// Pseudo-field read by key enumeration; triggered when fields are added
    /// or removed.
    Iterate,
}

impl TrackKey {
    pub(crate) fn field(name: &str) -> Self {
        Self::Field(Rc::from(name))
    }
}

/// What kind of write caused a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TriggerOp {
    Set,
    Add,
    Delete,
}

type TargetMap = HashMap<ObjectId, HashMap<TrackKey, Rc<Dep>>>;

pub(crate) struct RuntimeInner {
    context: ReactiveContext,
    targets: RefCell<TargetMap>,
    scheduler: Scheduler,
    config: RuntimeConfig,
}

impl RuntimeInner {
    /// Drop the graph entry of a subject that is being deallocated.
    pub(crate) fn forget_subject(&self, id: ObjectId) {
        match self.targets.try_borrow_mut() {
            Ok(mut targets) => {
                targets.remove(&id);
            }
            Err(_) => trace!(subject = %id, "graph busy, subject entry left for later"),
        }
    }

    /// Unregister `dep` from its (subject, key) slot once it has no
    /// subscribers left. A later read registers a fresh set.
    pub(crate) fn release_dep(&self, subject: ObjectId, key: &TrackKey, dep: &Dep) {
        let Ok(mut targets) = self.targets.try_borrow_mut() else {
            trace!(%subject, ?key, "graph busy, empty dep left in place");
            return;
        };
        if let Some(entry) = targets.get_mut(&subject) {
            let registered = entry
                .get(key)
                .is_some_and(|current| std::ptr::eq(Rc::as_ptr(current), dep));
            if registered && dep.len() == 0 {
                entry.remove(key);
            }
        }
    }
}

/// Handle to a reactive runtime.
///
/// Cloning the handle is cheap and yields the same runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                context: ReactiveContext::new(),
                targets: RefCell::new(HashMap::new()),
                scheduler: Scheduler::new(config.recursion_limit),
                config,
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub(crate) fn context(&self) -> &ReactiveContext {
        &self.inner.context
    }

    pub(crate) fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether a read right now would be recorded as a dependency.
    pub fn is_tracking(&self) -> bool {
        self.inner.context.is_tracking()
    }

    /// Run `f` without recording any dependency.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let _pause = self.inner.context.pause();
        f()
    }

    // ------------------------------------------------------------------
    // Proxy constructors
    // ------------------------------------------------------------------

    /// Deep, mutable proxy over `target`.
    pub fn reactive(&self, target: Object) -> Proxy {
        Proxy::over_object(self, target, ProxyFlags::empty())
    }

    /// Proxy that tracks and triggers top-level fields only.
    pub fn shallow_reactive(&self, target: Object) -> Proxy {
        Proxy::over_object(self, target, ProxyFlags::SHALLOW)
    }

    /// Deep proxy that never tracks and refuses writes.
    pub fn readonly(&self, target: Object) -> Proxy {
        Proxy::over_object(self, target, ProxyFlags::READONLY)
    }

    pub fn shallow_readonly(&self, target: Object) -> Proxy {
        Proxy::over_object(self, target, ProxyFlags::READONLY | ProxyFlags::SHALLOW)
    }

    // ------------------------------------------------------------------
    // Track / trigger
    // ------------------------------------------------------------------

    /// Subscribe the running effect to `field` of `subject`.
    ///
    /// No-op when no effect is running or tracking is paused.
    pub fn track(&self, subject: &Object, field: &str) {
        self.track_key(subject, TrackKey::field(field));
    }

    /// Notify every effect subscribed to `field` of `subject`.
    pub fn trigger(&self, subject: &Object, field: &str) {
        self.trigger_key(subject.id(), TrackKey::field(field), TriggerOp::Set);
    }

    pub(crate) fn track_key(&self, subject: &Object, key: TrackKey) {
        if !self.is_tracking() {
            return;
        }

        let dep = {
            let mut targets = self.inner.targets.borrow_mut();
            let entry = targets.entry(subject.id()).or_insert_with(|| {
                subject.observe(Rc::downgrade(&self.inner));
                HashMap::new()
            });
            let slot = key.clone();
            Rc::clone(
                entry
                    .entry(key)
                    .or_insert_with(|| Dep::in_graph(Rc::downgrade(&self.inner), subject.id(), slot)),
            )
        };

        self.track_dep(&dep);
    }

    /// Link the running effect with `dep` in both directions.
    pub(crate) fn track_dep(&self, dep: &Rc<Dep>) {
        if !self.is_tracking() {
            return;
        }
        if let Some(effect) = self.inner.context.current() {
            if dep.insert(effect.id(), Rc::downgrade(&effect)) {
                trace!(effect = %effect.id(), "tracked dependency");
                effect.add_dep(Rc::clone(dep));
            }
        }
    }

    pub(crate) fn trigger_key(&self, subject: ObjectId, key: TrackKey, op: TriggerOp) {
        let deps: Vec<Rc<Dep>> = {
            let targets = self.inner.targets.borrow();
            let Some(entry) = targets.get(&subject) else {
                return;
            };
            let mut deps = Vec::with_capacity(2);
            if let Some(dep) = entry.get(&key) {
                deps.push(Rc::clone(dep));
            }
            if matches!(op, TriggerOp::Add | TriggerOp::Delete) {
                if let Some(dep) = entry.get(&TrackKey::Iterate) {
                    deps.push(Rc::clone(dep));
                }
            }
            deps
        };

        if deps.is_empty() {
            return;
        }

        trace!(%subject, ?key, ?op, "trigger");
        let mut effects = IndexMap::new();
        for dep in &deps {
            for effect in dep.snapshot() {
                effects.entry(effect.id()).or_insert(effect);
            }
        }
        self.notify_effects(effects.into_values());
    }

    pub(crate) fn trigger_dep(&self, dep: &Dep) {
        self.notify_effects(dep.snapshot());
    }

    fn notify_effects(&self, effects: impl IntoIterator<Item = Rc<super::effect::EffectInner>>) {
        let current = self.inner.context.current();
        for effect in effects {
            if current.as_ref().is_some_and(|running| Rc::ptr_eq(running, &effect)) {
                continue;
            }
            effect.notify();
        }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Number of effects subscribed to `field` of `subject`.
    pub fn subscriber_count(&self, subject: &Object, field: &str) -> usize {
        self.inner
            .targets
            .borrow()
            .get(&subject.id())
            .and_then(|entry| entry.get(&TrackKey::field(field)))
            .map_or(0, |dep| dep.len())
    }

    /// Number of keys of `subject` that currently have a subscriber set.
    pub fn tracked_keys(&self, subject: &Object) -> usize {
        self.inner
            .targets
            .borrow()
            .get(&subject.id())
            .map_or(0, HashMap::len)
    }

    /// Number of subjects that currently have a graph entry.
    pub fn tracked_subjects(&self) -> usize {
        self.inner.targets.borrow().len()
    }

    // ------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------

    /// The microtask boundary: flush the job queue if a flush was requested.
    ///
    /// Returns whether a flush happened.
    pub fn tick(&self) -> bool {
        self.inner.scheduler.tick()
    }

    /// Tick until no flush is pending. Returns the number of flushes.
    pub fn run_until_idle(&self) -> usize {
        let mut flushes = 0;
        while self.tick() {
            flushes += 1;
            if flushes >= self.inner.config.recursion_limit {
                warn!(flushes, "giving up: updates keep scheduling further updates");
                break;
            }
        }
        flushes
    }

    /// Queue `f` to run after the next flush completes.
    pub fn next_tick<F>(&self, f: F)
    where
        F: Fn() + 'static,
    {
        self.inner.scheduler.next_tick(f);
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("tracked_subjects", &self.tracked_subjects())
            .field("depth", &self.inner.context.depth())
            .field("config", &self.inner.config)
            .finish()
    }
}
