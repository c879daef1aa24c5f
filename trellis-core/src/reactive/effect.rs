//! Effect Implementation
//!
//! An Effect is a re-runnable computation that re-executes whenever one of
//! the reactive sources it read during its last run changes.
//!
//! # How Effects Work
//!
//! 1. Unless created lazily, the effect runs its body immediately to
//!    establish initial dependencies.
//!
//! 2. Each run pushes the effect onto the runtime's context stack, drops
//!    every membership from the previous run, and executes the body. Reads
//!    performed by the body re-populate the membership list, so after a run
//!    the effect is subscribed to exactly what it read, nothing stale.
//!
//! 3. When a dependency changes, the effect's scheduler is invoked if it has
//!    one; otherwise the effect re-runs synchronously.
//!
//! # Ownership
//!
//! Subscriber sets hold effects weakly. An effect lives as long as some
//! `Effect` handle (or a component instance) keeps it; dropping the last
//! handle unsubscribes it from everything.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::trace;

use super::dep::Dep;
use super::runtime::Runtime;
use super::subscriber::EffectId;

type Body = Box<dyn Fn()>;
type SchedulerFn = Box<dyn Fn()>;
type StopFn = Box<dyn FnOnce()>;

pub(crate) struct EffectInner {
    id: EffectId,
    body: Body,
    scheduler: Option<SchedulerFn>,
    /// The subscriber sets this effect joined during its most recent run.
    deps: RefCell<SmallVec<[Rc<Dep>; 4]>>,
    active: Cell<bool>,
    on_stop: RefCell<Option<StopFn>>,
    run_count: Cell<usize>,
    runtime: Runtime,
}

impl EffectInner {
    pub(crate) fn id(&self) -> EffectId {
        self.id
    }

    pub(crate) fn add_dep(&self, dep: Rc<Dep>) {
        self.deps.borrow_mut().push(dep);
    }

    pub(crate) fn run(self: &Rc<Self>) {
        if !self.active.get() {
            return;
        }

        let context = self.runtime.context();
        if context.contains(self.id) {
            trace!(effect = %self.id, "skipping recursive effect run");
            return;
        }

        let _guard = context.enter(Rc::clone(self));
        self.cleanup();
        self.run_count.set(self.run_count.get() + 1);
        (self.body)();
    }

    /// Called by a trigger: defer to the scheduler when there is one.
    pub(crate) fn notify(self: &Rc<Self>) {
        match &self.scheduler {
            Some(scheduler) => scheduler(),
            None => self.run(),
        }
    }

    fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        for dep in deps {
            dep.remove(self.id);
        }
    }

    fn stop(&self) {
        if !self.active.get() {
            return;
        }
        self.cleanup();
        self.active.set(false);
        let on_stop = self.on_stop.borrow_mut().take();
        if let Some(on_stop) = on_stop {
            on_stop();
        }
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        for dep in self.deps.get_mut().drain(..) {
            dep.remove(self.id);
        }
    }
}

/// Options for [`Effect::with_options`].
#[derive(Default)]
pub struct EffectOptions {
    lazy: bool,
    scheduler: Option<SchedulerFn>,
    on_stop: Option<StopFn>,
}

impl EffectOptions {
    /// Do not run the body on creation.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Invoke `scheduler` instead of re-running when a dependency changes.
    pub fn scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.scheduler = Some(Box::new(scheduler));
        self
    }

    /// Callback invoked exactly once, the first time the effect is stopped.
    pub fn on_stop<F>(mut self, on_stop: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        self.on_stop = Some(Box::new(on_stop));
        self
    }
}

/// A re-runnable computation with its own dependency subscriptions.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::{Effect, Object, Runtime};
///
/// let rt = Runtime::new();
/// let state = rt.reactive(Object::from_iter([("count", 0)]));
///
/// let observed = state.clone();
/// let effect = Effect::new(&rt, move || {
///     let _ = observed.get("count");
/// });
///
/// state.set("count", 5); // effect re-runs
/// assert_eq!(effect.run_count(), 2);
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Create a new effect and run it immediately to establish dependencies.
    pub fn new<F>(runtime: &Runtime, body: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::with_options(runtime, body, EffectOptions::default())
    }

    /// Create a new effect without running it.
    pub fn new_lazy<F>(runtime: &Runtime, body: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::with_options(runtime, body, EffectOptions::default().lazy())
    }

    pub fn with_options<F>(runtime: &Runtime, body: F, options: EffectOptions) -> Self
    where
        F: Fn() + 'static,
    {
        let effect = Self {
            inner: Rc::new(EffectInner {
                id: EffectId::new(),
                body: Box::new(body),
                scheduler: options.scheduler,
                deps: RefCell::new(SmallVec::new()),
                active: Cell::new(true),
                on_stop: RefCell::new(options.on_stop),
                run_count: Cell::new(0),
                runtime: runtime.clone(),
            }),
        };

        if !options.lazy {
            effect.run();
        }

        effect
    }

    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// Run the body, re-collecting dependencies.
    ///
    /// A stopped effect does not run. An effect that is already on the
    /// context stack does not re-enter itself.
    pub fn run(&self) {
        self.inner.run();
    }

    /// Unsubscribe from every dependency and mark the effect inactive.
    ///
    /// Idempotent; the `on_stop` callback fires on the first call only.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Number of times the body has executed.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Number of subscriber sets this effect currently belongs to.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
