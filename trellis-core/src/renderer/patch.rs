//! Patch dispatch, element and component processing, unmount and move.

use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::adapter::{HostAdapter, NodeHandle};
use super::RendererInner;
use crate::component::{
    should_update_component, ComponentInstance, LifecycleHook, RenderContext,
};
use crate::reactive::{Effect, EffectOptions};
use crate::scheduler::Job;
use crate::vnode::{self, is_same_vnode_type, Children, Props, VNode, VNodeRef, VNodeType};

type Parent<'a> = Option<&'a Rc<ComponentInstance>>;

impl<H: HostAdapter + 'static> RendererInner<H> {
    /// Bring the host in line with `new`, starting from `old`.
    pub(crate) fn patch(
        self: &Rc<Self>,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        container: NodeHandle,
        anchor: Option<NodeHandle>,
        parent: Parent<'_>,
    ) {
        let mut old = old;
        let mut anchor = anchor;

        if let Some(prev) = old {
            if Rc::ptr_eq(prev, new) {
                return;
            }
            if !is_same_vnode_type(prev, new) {
                trace!(old = ?prev.ty(), new = ?new.ty(), "replacing node of different type");
                anchor = self.next_host_node(prev);
                self.unmount(prev, true);
                old = None;
            }
        }

        match new.ty() {
            VNodeType::Text => self.process_text(old, new, container, anchor),
            VNodeType::Fragment => self.process_fragment(old, new, container, anchor, parent),
            VNodeType::Element(_) => match old {
                None => self.mount_element(new, container, anchor, parent),
                Some(prev) => self.patch_element(prev, new, parent),
            },
            VNodeType::Component(_) => match old {
                None => self.mount_component(new, container, anchor, parent),
                Some(prev) => self.update_component(prev, new),
            },
        }
    }

    fn process_text(
        &self,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        container: NodeHandle,
        anchor: Option<NodeHandle>,
    ) {
        match old.and_then(|prev| prev.el().map(|el| (prev, el))) {
            None => {
                let mut host = self.host_mut();
                let el = host.create_text(new.text());
                host.insert(el, container, anchor);
                new.set_el(Some(el));
            }
            Some((prev, el)) => {
                new.set_el(Some(el));
                if prev.text() != new.text() {
                    self.host_mut().set_text(el, new.text());
                }
            }
        }
    }

    fn process_fragment(
        self: &Rc<Self>,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        container: NodeHandle,
        anchor: Option<NodeHandle>,
        parent: Parent<'_>,
    ) {
        match old {
            None => {
                let (start, end) = {
                    let mut host = self.host_mut();
                    let start = host.create_text("");
                    let end = host.create_text("");
                    host.insert(start, container, anchor);
                    host.insert(end, container, anchor);
                    (start, end)
                };
                new.set_el(Some(start));
                new.set_anchor(Some(end));
                if let Children::Array(children) = new.children() {
                    self.mount_children(children, container, Some(end), parent);
                }
            }
            Some(prev) => {
                new.set_el(prev.el());
                new.set_anchor(prev.anchor());
                self.patch_children(prev, new, container, prev.anchor(), parent);
            }
        }
    }

    pub(crate) fn mount_children(
        self: &Rc<Self>,
        children: &[VNodeRef],
        container: NodeHandle,
        anchor: Option<NodeHandle>,
        parent: Parent<'_>,
    ) {
        for child in children {
            self.patch(None, child, container, anchor, parent);
        }
    }

    fn mount_element(
        self: &Rc<Self>,
        vnode: &VNodeRef,
        container: NodeHandle,
        anchor: Option<NodeHandle>,
        parent: Parent<'_>,
    ) {
        let VNodeType::Element(tag) = vnode.ty() else {
            return;
        };
        let el = self.host_mut().create_element(tag);
        vnode.set_el(Some(el));

        match vnode.children() {
            Children::Text(text) => self.host_mut().set_element_text(el, text),
            Children::Array(children) => self.mount_children(children, el, None, parent),
            Children::None | Children::Slots(_) => {}
        }

        {
            let mut host = self.host_mut();
            for (key, value) in vnode.props() {
                host.patch_prop(el, key, None, Some(value));
            }
            host.insert(el, container, anchor);
        }
    }

    /// Children first, then props.
    fn patch_element(self: &Rc<Self>, old: &VNodeRef, new: &VNodeRef, parent: Parent<'_>) {
        let Some(el) = old.el() else {
            warn!(ty = ?old.ty(), "patching an element that was never mounted");
            return;
        };
        new.set_el(Some(el));
        self.patch_children(old, new, el, None, parent);
        self.patch_props(el, old.props(), new.props());
    }

    fn patch_props(&self, el: NodeHandle, old: &Props, new: &Props) {
        let mut host = self.host_mut();
        for (key, next) in new {
            let prev = old.get(key);
            if prev != Some(next) {
                host.patch_prop(el, key, prev, Some(next));
            }
        }
        for (key, prev) in old {
            if !new.contains_key(key) {
                host.patch_prop(el, key, Some(prev), None);
            }
        }
    }

    fn mount_component(
        self: &Rc<Self>,
        vnode: &VNodeRef,
        container: NodeHandle,
        anchor: Option<NodeHandle>,
        parent: Parent<'_>,
    ) {
        let VNodeType::Component(def) = vnode.ty() else {
            return;
        };
        let instance = ComponentInstance::new(self.runtime(), Rc::clone(def), vnode, parent);
        vnode.set_component(Some(Rc::clone(&instance)));
        instance.setup();
        self.setup_render_effect(&instance, container, anchor);
    }

    /// Wire the instance's render effect to the job queue and run it once.
    fn setup_render_effect(
        self: &Rc<Self>,
        instance: &Rc<ComponentInstance>,
        container: NodeHandle,
        anchor: Option<NodeHandle>,
    ) {
        let body = {
            let renderer = Rc::downgrade(self);
            let instance = Rc::downgrade(instance);
            move || {
                if let (Some(renderer), Some(instance)) = (renderer.upgrade(), instance.upgrade()) {
                    renderer.component_update(&instance, container, anchor);
                }
            }
        };
        let scheduler = {
            let runtime = self.runtime().clone();
            let instance = Rc::downgrade(instance);
            move || {
                if let Some(job) = instance.upgrade().and_then(|instance| instance.job()) {
                    runtime.scheduler().queue_job(&job);
                }
            }
        };
        let job = {
            let instance = Rc::downgrade(instance);
            Job::new(move || {
                if let Some(instance) = instance.upgrade() {
                    instance.update();
                }
            })
        };

        let effect = Effect::with_options(
            self.runtime(),
            body,
            EffectOptions::default().lazy().scheduler(scheduler),
        );
        instance.install(effect, job);
        instance.update();
    }

    /// Body of a component render effect.
    fn component_update(
        self: &Rc<Self>,
        instance: &Rc<ComponentInstance>,
        container: NodeHandle,
        anchor: Option<NodeHandle>,
    ) {
        if !instance.is_mounted() {
            instance.call_hook(LifecycleHook::BeforeMount);
            let subtree = self.render_component_root(instance);
            self.patch(None, &subtree, container, anchor, Some(instance));
            if let Some(vnode) = instance.vnode() {
                vnode.set_el(subtree.el());
            }
            instance.replace_subtree(subtree);
            instance.queue_hook(LifecycleHook::Mounted);
            instance.mark_mounted();
            debug!(component = instance.name(), uid = %instance.uid(), "component mounted");
            return;
        }

        let next = instance.take_next();
        if let Some(next) = &next {
            if let Some(current) = instance.vnode() {
                next.set_el(current.el());
            }
            instance.update_from_vnode(next);
        }

        instance.call_hook(LifecycleHook::BeforeUpdate);
        let next_tree = self.render_component_root(instance);
        let Some(prev_tree) = instance.replace_subtree(Rc::clone(&next_tree)) else {
            return;
        };

        let container = prev_tree
            .el()
            .and_then(|el| self.host().parent_node(el))
            .unwrap_or(container);
        let anchor = self.next_host_node(&prev_tree);
        self.patch(Some(&prev_tree), &next_tree, container, anchor, Some(instance));

        if let Some(vnode) = instance.vnode() {
            vnode.set_el(next_tree.el());
        }
        if next.is_none() {
            update_hoc_host_el(instance, next_tree.el());
        }
        instance.queue_hook(LifecycleHook::Updated);
        trace!(component = instance.name(), uid = %instance.uid(), "component updated");
    }

    /// Run the render function and apply attribute fallthrough.
    fn render_component_root(&self, instance: &Rc<ComponentInstance>) -> VNodeRef {
        let tree = match instance.render_fn() {
            Some(render) => render(&RenderContext::new(instance)),
            None => vnode::text(""),
        };

        let attrs = instance.attrs();
        if !instance.def().inherit_attrs() || attrs.is_empty() {
            return tree;
        }
        match tree.ty() {
            VNodeType::Element(_) | VNodeType::Component(_) => {
                let extra: Props = attrs.entries().into_iter().collect();
                tree.with_fallthrough(&extra, instance.handler_chains())
            }
            VNodeType::Text | VNodeType::Fragment => {
                warn!(
                    component = instance.name(),
                    attrs = attrs.len(),
                    "extraneous attributes could not be inherited by a text or fragment root"
                );
                tree
            }
        }
    }

    fn update_component(&self, old: &VNodeRef, new: &VNodeRef) {
        let Some(instance) = old.component() else {
            warn!(ty = ?old.ty(), "updating a component that was never mounted");
            return;
        };
        new.set_component(Some(Rc::clone(&instance)));

        if should_update_component(old, new) {
            instance.set_next(Rc::clone(new));
            if let Some(job) = instance.job_id() {
                self.runtime().scheduler().invalidate_job(job);
            }
            instance.update();
        } else {
            new.set_el(old.el());
            instance.set_vnode(new);
        }
    }

    /// Tear down `vnode`. `remove` says whether its host nodes must be
    /// detached (descendants of a removed element need not be).
    pub(crate) fn unmount(&self, vnode: &VNodeRef, remove: bool) {
        match vnode.ty() {
            VNodeType::Component(_) => {
                if let Some(instance) = vnode.component() {
                    self.unmount_component(&instance, remove);
                }
            }
            VNodeType::Fragment => {
                if let Children::Array(children) = vnode.children() {
                    for child in children {
                        self.unmount(child, true);
                    }
                }
                if remove {
                    let mut host = self.host_mut();
                    for node in [vnode.el(), vnode.anchor()].into_iter().flatten() {
                        host.remove(node);
                    }
                }
            }
            VNodeType::Element(_) => {
                if let Children::Array(children) = vnode.children() {
                    for child in children {
                        self.unmount(child, false);
                    }
                }
                if remove {
                    if let Some(el) = vnode.el() {
                        self.host_mut().remove(el);
                    }
                }
            }
            VNodeType::Text => {
                if remove {
                    if let Some(el) = vnode.el() {
                        self.host_mut().remove(el);
                    }
                }
            }
        }
    }

    fn unmount_component(&self, instance: &Rc<ComponentInstance>, remove: bool) {
        instance.call_hook(LifecycleHook::BeforeUnmount);
        instance.teardown();
        if let Some(subtree) = instance.subtree() {
            self.unmount(&subtree, remove);
        }
        instance.queue_hook(LifecycleHook::Unmounted);
        debug!(component = instance.name(), uid = %instance.uid(), "component unmounted");
    }

    /// Re-insert every host node of `vnode` before `anchor`.
    pub(crate) fn move_node(&self, vnode: &VNode, container: NodeHandle, anchor: Option<NodeHandle>) {
        match vnode.ty() {
            VNodeType::Component(_) => {
                if let Some(subtree) = vnode.component().and_then(|instance| instance.subtree()) {
                    self.move_node(&subtree, container, anchor);
                }
            }
            VNodeType::Fragment => {
                if let Some(start) = vnode.el() {
                    self.host_mut().insert(start, container, anchor);
                }
                if let Children::Array(children) = vnode.children() {
                    for child in children {
                        self.move_node(child, container, anchor);
                    }
                }
                if let Some(end) = vnode.anchor() {
                    self.host_mut().insert(end, container, anchor);
                }
            }
            VNodeType::Element(_) | VNodeType::Text => {
                if let Some(el) = vnode.el() {
                    self.host_mut().insert(el, container, anchor);
                }
            }
        }
    }

    /// The host node right after everything `vnode` rendered.
    pub(crate) fn next_host_node(&self, vnode: &VNode) -> Option<NodeHandle> {
        if let VNodeType::Component(_) = vnode.ty() {
            return vnode
                .component()
                .and_then(|instance| instance.subtree())
                .and_then(|subtree| self.next_host_node(&subtree));
        }
        let last = vnode.anchor().or_else(|| vnode.el())?;
        self.host().next_sibling(last)
    }
}

/// When a component's root is itself a component, the parent's vnode shares
/// the child's host node; keep it in sync after a self-triggered re-render.
fn update_hoc_host_el(instance: &Rc<ComponentInstance>, el: Option<NodeHandle>) {
    let Some(mut current) = instance.vnode() else {
        return;
    };
    let mut parent = instance.parent();
    while let Some(owner) = parent {
        let is_root = owner
            .subtree()
            .is_some_and(|subtree| Rc::ptr_eq(&subtree, &current));
        if !is_root {
            break;
        }
        let Some(owner_vnode) = owner.vnode() else {
            break;
        };
        owner_vnode.set_el(el);
        current = owner_vnode;
        parent = owner.parent();
    }
}
