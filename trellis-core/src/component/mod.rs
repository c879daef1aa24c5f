//! Components
//!
//! A component couples reactive state with a render function. The
//! descriptor ([`Component`]) is static; each mount creates a
//! [`ComponentInstance`] whose render effect re-renders the subtree when
//! anything it read changes.
//!
//! # Lifecycle
//!
//! 1. Props are split into declared props and fallthrough attributes.
//! 2. `setup` runs once, untracked, and returns bindings or a render
//!    function. Lifecycle hooks are registered through [`SetupContext`].
//! 3. The render effect runs for the first time: before-mount hooks, render,
//!    mount the subtree, and queue the mounted hooks for after the flush.
//! 4. Later runs (self-triggered through the job queue, or forced by a parent
//!    passing new props) re-render and patch the previous subtree.
//! 5. Unmounting stops the effect, cancels any pending update, unmounts the
//!    subtree and queues the unmounted hooks.

mod descriptor;
mod instance;
mod props;

pub use descriptor::{
    Component, ComponentBuilder, PropDefault, PropOptions, PropType, PropsOptions, RenderFn,
    SetupFn, SetupResult,
};
pub use instance::{
    ComponentInstance, Emitter, InstanceId, LifecycleHook, RenderContext, SetupContext,
};
pub use props::{camelize, to_handler_key};
pub(crate) use props::should_update_component;
