//! Trellis Core
//!
//! This crate provides the core runtime for the Trellis reactive UI framework.
//! It implements:
//!
//! - Reactive primitives (proxies, refs, computed values, effects)
//! - A batching job queue with post-flush callbacks
//! - Virtual nodes and a reconciler with a keyed, move-minimal child diff
//! - Components with props, attribute fallthrough, events and lifecycle hooks
//!
//! The reconciler only talks to its output through the
//! [`HostAdapter`](renderer::HostAdapter) trait. An in-memory host ships in
//! [`host`] for tests and tooling.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Dependency tracking, proxies, refs and effects
//! - `scheduler`: Job queue and flush loop
//! - `vnode`: Description nodes and shape flags
//! - `component`: Component descriptors, instances and props resolution
//! - `renderer`: Patch engine, keyed diff and the app handle
//! - `host`: In-memory host adapter
//!
//! Everything is single-threaded. State lives behind an explicit
//! [`Runtime`](reactive::Runtime) handle, so independent runtimes never
//! observe each other.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::component::Component;
//! use trellis_core::host::MemoryHost;
//! use trellis_core::props;
//! use trellis_core::reactive::{Object, Runtime};
//! use trellis_core::renderer::Renderer;
//! use trellis_core::vnode::h;
//!
//! let rt = Runtime::new();
//! let mut host = MemoryHost::new();
//! let root = host.create_root("app");
//! let renderer = Renderer::new(&rt, host);
//!
//! let counter = Component::builder("Counter")
//!     .setup(|_props, ctx| ctx.runtime().reactive(Object::from_iter([("count", 0)])))
//!     .render(|ctx| h("span", props! {}, ctx.get("count").to_string()))
//!     .build();
//!
//! let app = renderer.create_app(&counter);
//! app.mount("#app").unwrap();
//! assert_eq!(renderer.host().inner_html(root), "<span>0</span>");
//!
//! // Several writes, one re-render at the next tick.
//! app.root_instance().unwrap().setup_state().unwrap().set("count", 1);
//! app.root_instance().unwrap().setup_state().unwrap().set("count", 2);
//! rt.tick();
//! assert_eq!(renderer.host().inner_html(root), "<span>2</span>");
//! ```

pub mod component;
pub mod config;
pub mod error;
pub mod host;
pub mod reactive;
pub mod renderer;
pub mod scheduler;
pub mod vnode;

pub use config::RuntimeConfig;
pub use error::{JobError, RenderError, RenderResult};
