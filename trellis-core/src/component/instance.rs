//! Component Instances
//!
//! One instance exists per mounted component vnode. It owns the resolved
//! props, the setup bindings, the last rendered subtree, the lifecycle hooks
//! and the render effect that keeps the subtree up to date.
//!
//! # Ownership
//!
//! The vnode occupying a mount point owns the instance. The instance refers
//! back to its vnode and to its parent weakly, and the render effect and the
//! update job only hold weak handles to the instance, so an unmounted tree is
//! freed as soon as the renderer lets go of it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use super::descriptor::{Component, RenderFn, SetupResult};
use super::props::{init_props, to_handler_key, update_props};
use crate::reactive::{proxy_refs, Effect, Object, Proxy, ProxyRefs, Runtime, Value};
use crate::scheduler::{Job, JobId};
use crate::vnode::{Children, HandlerChains, Slots, VNode, VNodeRef};

/// Unique identifier for a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleHook {
    BeforeMount,
    /// Runs after the flush that attached the subtree.
    Mounted,
    BeforeUpdate,
    /// Runs after the flush that patched the subtree.
    Updated,
    BeforeUnmount,
    Unmounted,
}

pub struct ComponentInstance {
    uid: InstanceId,
    def: Rc<Component>,
    vnode: RefCell<Weak<VNode>>,
    /// Vnode stashed by a parent-driven update, consumed by the next render.
    next: RefCell<Option<VNodeRef>>,
    subtree: RefCell<Option<VNodeRef>>,
    is_mounted: Cell<bool>,
    is_unmounted: Cell<bool>,
    props_raw: Object,
    props: Proxy,
    attrs: Object,
    handler_chains: HandlerChains,
    setup_state: RefCell<Option<ProxyRefs>>,
    render: RefCell<Option<RenderFn>>,
    hooks: RefCell<HashMap<LifecycleHook, Vec<Rc<Job>>>>,
    parent: Option<Weak<ComponentInstance>>,
    effect: RefCell<Option<Effect>>,
    job: RefCell<Option<Rc<Job>>>,
    runtime: Runtime,
}

impl ComponentInstance {
    pub(crate) fn new(
        runtime: &Runtime,
        def: Rc<Component>,
        vnode: &VNodeRef,
        parent: Option<&Rc<ComponentInstance>>,
    ) -> Rc<Self> {
        let props_raw = Object::new();
        Rc::new(Self {
            uid: InstanceId::new(),
            def,
            vnode: RefCell::new(Rc::downgrade(vnode)),
            next: RefCell::new(None),
            subtree: RefCell::new(None),
            is_mounted: Cell::new(false),
            is_unmounted: Cell::new(false),
            props: runtime.shallow_reactive(props_raw.clone()),
            props_raw,
            attrs: Object::new(),
            handler_chains: HandlerChains::new(),
            setup_state: RefCell::new(None),
            render: RefCell::new(None),
            hooks: RefCell::new(HashMap::new()),
            parent: parent.map(Rc::downgrade),
            effect: RefCell::new(None),
            job: RefCell::new(None),
            runtime: runtime.clone(),
        })
    }

    /// Resolve props and run the descriptor's setup function.
    ///
    /// Setup runs untracked: whatever it reads never becomes a dependency of
    /// the parent render effect that is mounting this component.
    pub(crate) fn setup(self: &Rc<Self>) {
        if let Some(vnode) = self.vnode() {
            init_props(&self.def, vnode.props(), &self.props_raw, &self.attrs);
        }

        if let Some(setup) = self.def.setup().cloned() {
            let props = self.props.to_shallow_readonly();
            let ctx = SetupContext { instance: self };
            let result = self.runtime.untrack(|| setup(&props, &ctx));
            match result {
                SetupResult::None => {}
                SetupResult::State(state) => {
                    if state.is_object_like() {
                        *self.setup_state.borrow_mut() = Some(proxy_refs(state));
                    } else {
                        warn!(
                            component = self.def.name(),
                            got = state.type_name(),
                            "setup() should return an object"
                        );
                    }
                }
                SetupResult::Render(render) => {
                    *self.render.borrow_mut() = Some(render);
                }
            }
        }

        if self.render_fn().is_none() {
            warn!(component = self.def.name(), "component is missing a render function");
        }
    }

    pub fn uid(&self) -> InstanceId {
        self.uid
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn def(&self) -> &Rc<Component> {
        &self.def
    }

    /// The vnode currently occupying this instance's mount point.
    pub fn vnode(&self) -> Option<VNodeRef> {
        self.vnode.borrow().upgrade()
    }

    pub(crate) fn set_vnode(&self, vnode: &VNodeRef) {
        *self.vnode.borrow_mut() = Rc::downgrade(vnode);
    }

    pub fn parent(&self) -> Option<Rc<ComponentInstance>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Declared props, as a shallow-reactive proxy.
    pub fn props(&self) -> &Proxy {
        &self.props
    }

    /// Passed props that are not declared.
    pub fn attrs(&self) -> &Object {
        &self.attrs
    }

    pub(crate) fn handler_chains(&self) -> &HandlerChains {
        &self.handler_chains
    }

    pub fn setup_state(&self) -> Option<ProxyRefs> {
        self.setup_state.borrow().clone()
    }

    pub fn subtree(&self) -> Option<VNodeRef> {
        self.subtree.borrow().clone()
    }

    pub(crate) fn replace_subtree(&self, subtree: VNodeRef) -> Option<VNodeRef> {
        self.subtree.borrow_mut().replace(subtree)
    }

    pub fn is_mounted(&self) -> bool {
        self.is_mounted.get()
    }

    pub(crate) fn mark_mounted(&self) {
        self.is_mounted.set(true);
    }

    pub fn is_unmounted(&self) -> bool {
        self.is_unmounted.get()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub(crate) fn render_fn(&self) -> Option<RenderFn> {
        self.render
            .borrow()
            .clone()
            .or_else(|| self.def.render().cloned())
    }

    pub(crate) fn set_next(&self, next: VNodeRef) {
        *self.next.borrow_mut() = Some(next);
    }

    pub(crate) fn take_next(&self) -> Option<VNodeRef> {
        self.next.borrow_mut().take()
    }

    /// Adopt a new vnode from the parent and re-resolve props from it.
    pub(crate) fn update_from_vnode(&self, next: &VNodeRef) {
        self.set_vnode(next);
        update_props(&self.def, next.props(), &self.props, &self.attrs);
    }

    pub(crate) fn install(&self, effect: Effect, job: Rc<Job>) {
        *self.effect.borrow_mut() = Some(effect);
        *self.job.borrow_mut() = Some(job);
    }

    pub(crate) fn job(&self) -> Option<Rc<Job>> {
        self.job.borrow().clone()
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.job.borrow().as_ref().map(|job| job.id())
    }

    /// Re-render synchronously.
    pub fn update(&self) {
        let effect = self.effect.borrow().clone();
        if let Some(effect) = effect {
            effect.run();
        }
    }

    /// Number of times the render effect has run.
    pub fn render_count(&self) -> usize {
        self.effect.borrow().as_ref().map_or(0, Effect::run_count)
    }

    /// Stop the render effect and cancel any pending update.
    pub(crate) fn teardown(&self) {
        if let Some(effect) = self.effect.borrow().as_ref() {
            effect.stop();
        }
        if let Some(job) = self.job.borrow().as_ref() {
            job.deactivate();
        }
        self.is_unmounted.set(true);
        debug!(component = self.def.name(), uid = %self.uid, "component torn down");
    }

    pub(crate) fn add_hook<F>(&self, hook: LifecycleHook, f: F)
    where
        F: Fn() + 'static,
    {
        self.hooks.borrow_mut().entry(hook).or_default().push(Job::new(f));
    }

    fn hook_jobs(&self, hook: LifecycleHook) -> Vec<Rc<Job>> {
        self.hooks.borrow().get(&hook).cloned().unwrap_or_default()
    }

    /// Run the hooks registered for `hook` now, untracked.
    pub(crate) fn call_hook(&self, hook: LifecycleHook) {
        let jobs = self.hook_jobs(hook);
        if jobs.is_empty() {
            return;
        }
        self.runtime.untrack(|| {
            for job in &jobs {
                job.run();
            }
        });
    }

    /// Run the hooks registered for `hook` after the current flush.
    pub(crate) fn queue_hook(&self, hook: LifecycleHook) {
        for job in self.hook_jobs(hook) {
            self.runtime.scheduler().queue_post_flush_cb(&job);
        }
    }

    pub fn slots(&self) -> Slots {
        match self.vnode().as_deref().map(VNode::children) {
            Some(Children::Slots(slots)) => slots.clone(),
            _ => Slots::new(),
        }
    }

    /// Invoke the `on<Event>` handler passed by the parent, if any.
    pub fn emit(&self, event: &str, args: &[Value]) -> Value {
        let handler_key = to_handler_key(event);
        let handler = self
            .vnode()
            .and_then(|vnode| vnode.prop(&handler_key).cloned());
        match handler {
            Some(Value::Func(handler)) => handler.call(args),
            Some(other) => {
                warn!(
                    component = self.def.name(),
                    event,
                    got = other.type_name(),
                    "event handler is not a function"
                );
                Value::Null
            }
            None => {
                trace!(component = self.def.name(), event, "emitted event has no handler");
                Value::Null
            }
        }
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("uid", &self.uid)
            .field("name", &self.def.name())
            .field("is_mounted", &self.is_mounted.get())
            .field("is_unmounted", &self.is_unmounted.get())
            .finish()
    }
}

/// Emits events from an instance after setup has returned.
#[derive(Clone, Debug)]
pub struct Emitter {
    instance: Weak<ComponentInstance>,
}

impl Emitter {
    /// Invoke the parent's handler. A no-op once the instance is gone.
    pub fn emit(&self, event: &str, args: &[Value]) -> Value {
        match self.instance.upgrade() {
            Some(instance) => instance.emit(event, args),
            None => Value::Null,
        }
    }
}

/// What a setup function can reach besides its props.
pub struct SetupContext<'a> {
    instance: &'a Rc<ComponentInstance>,
}

impl SetupContext<'_> {
    pub fn runtime(&self) -> &Runtime {
        &self.instance.runtime
    }

    pub fn emit(&self, event: &str, args: &[Value]) -> Value {
        self.instance.emit(event, args)
    }

    /// A handle for emitting from callbacks created during setup.
    pub fn emitter(&self) -> Emitter {
        Emitter {
            instance: Rc::downgrade(self.instance),
        }
    }

    pub fn attrs(&self) -> &Object {
        &self.instance.attrs
    }

    pub fn slots(&self) -> Slots {
        self.instance.slots()
    }

    pub fn on_before_mount<F: Fn() + 'static>(&self, f: F) {
        self.instance.add_hook(LifecycleHook::BeforeMount, f);
    }

    pub fn on_mounted<F: Fn() + 'static>(&self, f: F) {
        self.instance.add_hook(LifecycleHook::Mounted, f);
    }

    pub fn on_before_update<F: Fn() + 'static>(&self, f: F) {
        self.instance.add_hook(LifecycleHook::BeforeUpdate, f);
    }

    pub fn on_updated<F: Fn() + 'static>(&self, f: F) {
        self.instance.add_hook(LifecycleHook::Updated, f);
    }

    pub fn on_before_unmount<F: Fn() + 'static>(&self, f: F) {
        self.instance.add_hook(LifecycleHook::BeforeUnmount, f);
    }

    pub fn on_unmounted<F: Fn() + 'static>(&self, f: F) {
        self.instance.add_hook(LifecycleHook::Unmounted, f);
    }
}

/// The view a render function has of its instance.
///
/// `get` resolves setup bindings first, then declared props, then the
/// `$attrs` and `$props` pseudo-fields. Reads are tracked, so the render
/// effect re-runs when any of them change.
pub struct RenderContext<'a> {
    instance: &'a Rc<ComponentInstance>,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(instance: &'a Rc<ComponentInstance>) -> Self {
        Self { instance }
    }

    pub fn instance(&self) -> &Rc<ComponentInstance> {
        self.instance
    }

    pub fn runtime(&self) -> &Runtime {
        &self.instance.runtime
    }

    pub fn get(&self, key: &str) -> Value {
        if let Some(state) = self.instance.setup_state.borrow().as_ref() {
            if state.contains(key) {
                return state.get(key);
            }
        }
        if self.instance.props_raw.contains_key(key) {
            return self.instance.props.get(key);
        }
        match key {
            "$attrs" => Value::from(self.instance.attrs.clone()),
            "$props" => Value::from(self.instance.props.to_shallow_readonly()),
            _ => {
                trace!(component = self.instance.name(), key, "render read of unknown key");
                Value::Null
            }
        }
    }

    /// Write a setup binding. Props are read-only from the inside.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let state = self.instance.setup_state.borrow().clone();
        if let Some(state) = state {
            if state.contains(key) {
                return state.set(key, value);
            }
        }
        if self.instance.props_raw.contains_key(key) {
            warn!(component = self.instance.name(), key, "attempting to mutate prop");
        } else {
            warn!(component = self.instance.name(), key, "write to unknown render key");
        }
        false
    }

    pub fn props(&self) -> &Proxy {
        &self.instance.props
    }

    pub fn attrs(&self) -> &Object {
        &self.instance.attrs
    }

    /// Render the named slot; empty when the parent did not provide it.
    pub fn slot(&self, name: &str) -> Vec<VNodeRef> {
        self.slot_with(name, &[])
    }

    pub fn slot_with(&self, name: &str, args: &[Value]) -> Vec<VNodeRef> {
        match self.instance.slots().get(name) {
            Some(slot) => slot.render(args),
            None => Vec::new(),
        }
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.instance.slots().contains(name)
    }

    pub fn emit(&self, event: &str, args: &[Value]) -> Value {
        self.instance.emit(event, args)
    }

    pub fn emitter(&self) -> Emitter {
        Emitter {
            instance: Rc::downgrade(self.instance),
        }
    }
}
