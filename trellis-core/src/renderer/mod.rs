//! Rendering Pipeline
//!
//! The renderer turns vnode trees into host nodes and keeps them in sync.
//!
//! # How Rendering Works
//!
//! 1. `render(vnode, container)` patches the new tree against whatever was
//!    rendered into that container before (nothing, on first render).
//!
//! 2. `patch` dispatches on the vnode type: text, fragment, element or
//!    component. Nodes of a different type (or key) are replaced wholesale;
//!    nodes of the same type are updated in place and keep their host node.
//!
//! 3. Children are reconciled by the six-way classification in
//!    [`children`](self::children); two child lists go through the keyed
//!    diff, which uses a longest increasing subsequence to keep host moves
//!    to the minimum.
//!
//! 4. Components mount behind a render effect whose scheduler enqueues an
//!    update job, so state changes re-render each component at most once per
//!    tick. Parent-driven prop changes update the child synchronously.
//!
//! The host is only borrowed for the duration of a single adapter call, never
//! across user code (render functions, setup, hooks, event handlers).

mod adapter;
mod app;
mod children;
mod lis;
mod patch;

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

pub use adapter::{HostAdapter, NodeHandle};
pub use app::{App, MountTarget};
pub use lis::longest_increasing_subsequence;

use crate::component::Component;
use crate::reactive::Runtime;
use crate::vnode::VNodeRef;

pub(crate) struct RendererInner<H: HostAdapter + 'static> {
    runtime: Runtime,
    host: RefCell<H>,
    /// Last tree rendered into each container.
    roots: RefCell<HashMap<NodeHandle, VNodeRef>>,
}

impl<H: HostAdapter + 'static> RendererInner<H> {
    pub(crate) fn host_mut(&self) -> RefMut<'_, H> {
        self.host.borrow_mut()
    }

    pub(crate) fn host(&self) -> Ref<'_, H> {
        self.host.borrow()
    }

    pub(crate) fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}

/// A renderer bound to one host and one reactive runtime.
///
/// # Example
///
/// ```rust
/// use trellis_core::host::MemoryHost;
/// use trellis_core::props;
/// use trellis_core::reactive::Runtime;
/// use trellis_core::renderer::Renderer;
/// use trellis_core::vnode::h;
///
/// let rt = Runtime::new();
/// let mut host = MemoryHost::new();
/// let root = host.create_root("app");
/// let renderer = Renderer::new(&rt, host);
///
/// renderer.render(Some(h("p", props! { "class" => "greeting" }, "hello")), root);
/// assert_eq!(renderer.host().inner_html(root), r#"<p class="greeting">hello</p>"#);
/// ```
pub struct Renderer<H: HostAdapter + 'static> {
    inner: Rc<RendererInner<H>>,
}

impl<H: HostAdapter + 'static> Clone for Renderer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H: HostAdapter + 'static> Renderer<H> {
    pub fn new(runtime: &Runtime, host: H) -> Self {
        Self {
            inner: Rc::new(RendererInner {
                runtime: runtime.clone(),
                host: RefCell::new(host),
                roots: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Borrow the host. Do not hold the borrow across a render or a tick.
    pub fn host(&self) -> Ref<'_, H> {
        self.inner.host()
    }

    pub fn host_mut(&self) -> RefMut<'_, H> {
        self.inner.host_mut()
    }

    /// Render `vnode` into `container`, patching the previous tree.
    ///
    /// `None` unmounts whatever the container holds. Post-flush callbacks
    /// (mounted and updated hooks) run before this returns.
    pub fn render(&self, vnode: Option<VNodeRef>, container: NodeHandle) {
        let prev = self.inner.roots.borrow_mut().remove(&container);
        match vnode {
            None => {
                if let Some(prev) = prev {
                    debug!(%container, "unmounting root");
                    self.inner.unmount(&prev, true);
                }
            }
            Some(vnode) => {
                self.inner
                    .patch(prev.as_ref(), &vnode, container, None, None);
                self.inner.roots.borrow_mut().insert(container, vnode);
            }
        }
        self.inner.runtime.scheduler().flush_post_flush_cbs();
    }

    /// The tree last rendered into `container`.
    pub fn root(&self, container: NodeHandle) -> Option<VNodeRef> {
        self.inner.roots.borrow().get(&container).cloned()
    }

    /// Application handle for `root`.
    pub fn create_app(&self, root: &Rc<Component>) -> App<H> {
        App::new(self.clone(), root)
    }
}

impl<H: HostAdapter + 'static> std::fmt::Debug for Renderer<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("roots", &self.inner.roots.borrow().len())
            .finish()
    }
}
