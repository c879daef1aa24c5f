//! Reactive Primitives
//!
//! This module implements the dependency-tracking core: proxies over plain
//! objects, refs, computed values, and effects. Everything the renderer does
//! reactively is built from these pieces.
//!
//! # Concepts
//!
//! ## Subjects and Proxies
//!
//! An [`Object`] is plain data. A [`Proxy`] over it turns every field read
//! into a dependency of the running effect and every changing write into a
//! notification. Proxies come in four variants (reactive, shallow, readonly,
//! shallow-readonly) built from two independent flags.
//!
//! ## Refs
//!
//! A [`Ref`] is a single reactive cell with its own subscriber set.
//! [`proxy_refs`] gives a view over an object whose ref fields read
//! transparently.
//!
//! ## Effects
//!
//! An [`Effect`] re-runs whenever something it read changes. Each run first
//! drops every subscription from the previous run, so conditional reads never
//! leave stale dependencies behind. An effect with a scheduler defers to it
//! instead of re-running, which is how component updates get batched.
//!
//! ## Computed Values
//!
//! A [`Computed`] caches a derived value and recomputes only when read after
//! one of its sources changed.
//!
//! # Implementation Notes
//!
//! Tracking state lives in an explicit [`Runtime`] handle rather than in
//! globals: the stack of running effects, the subject graph, and the job
//! queue. The graph maps subject identity to per-field subscriber sets and
//! never keeps a subject alive.

mod computed;
mod context;
mod dep;
mod effect;
mod object;
mod proxy;
mod refs;
mod runtime;
mod subscriber;
mod value;

pub use computed::Computed;
pub use effect::{Effect, EffectOptions};
pub use object::{Object, ObjectId};
pub use proxy::{is_proxy, is_reactive, is_readonly, to_raw, Proxy, ProxyFlags};
pub use refs::{is_ref, proxy_refs, trigger_ref, unref, ProxyRefs, Ref};
pub use runtime::Runtime;
pub use subscriber::EffectId;
pub use value::{has_changed, Callback, Value};
