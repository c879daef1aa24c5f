//! Application handle.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, warn};

use super::adapter::{HostAdapter, NodeHandle};
use super::Renderer;
use crate::component::{Component, ComponentInstance};
use crate::error::{RenderError, RenderResult};
use crate::vnode::{component, Props};

/// Where to mount an app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountTarget {
    /// Resolved through the host's `query_selector`.
    Selector(String),
    Node(NodeHandle),
}

impl From<&str> for MountTarget {
    fn from(selector: &str) -> Self {
        MountTarget::Selector(selector.to_string())
    }
}

impl From<String> for MountTarget {
    fn from(selector: String) -> Self {
        MountTarget::Selector(selector)
    }
}

impl From<NodeHandle> for MountTarget {
    fn from(node: NodeHandle) -> Self {
        MountTarget::Node(node)
    }
}

/// A root component bound to a renderer.
///
/// # Example
///
/// ```rust
/// use trellis_core::component::Component;
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
/// let hello = Component::builder("Hello")
///     .render(|_| h("h1", props! {}, "hi"))
///     .build();
///
/// let app = renderer.create_app(&hello);
/// app.mount("#app").unwrap();
/// assert_eq!(renderer.host().inner_html(root), "<h1>hi</h1>");
///
/// app.unmount();
/// assert_eq!(renderer.host().inner_html(root), "");
/// ```
pub struct App<H: HostAdapter + 'static> {
    renderer: Renderer<H>,
    root: Rc<Component>,
    root_props: Props,
    container: Cell<Option<NodeHandle>>,
}

impl<H: HostAdapter + 'static> App<H> {
    pub(crate) fn new(renderer: Renderer<H>, root: &Rc<Component>) -> Self {
        Self {
            renderer,
            root: Rc::clone(root),
            root_props: Props::new(),
            container: Cell::new(None),
        }
    }

    /// Props passed to the root component on mount.
    pub fn with_props(mut self, props: Props) -> Self {
        self.root_props = props;
        self
    }

    /// Render the root component into `target`, replacing its content.
    pub fn mount(&self, target: impl Into<MountTarget>) -> RenderResult<()> {
        if self.container.get().is_some() {
            return Err(RenderError::AlreadyMounted);
        }

        let container = match target.into() {
            MountTarget::Node(node) => node,
            MountTarget::Selector(selector) => {
                let found = self.renderer.host().query_selector(&selector);
                found.ok_or(RenderError::ContainerNotFound(selector))?
            }
        };

        self.renderer.host_mut().set_element_text(container, "");
        let vnode = component(&self.root, self.root_props.clone(), ());
        self.renderer.render(Some(vnode), container);
        self.container.set(Some(container));
        debug!(component = self.root.name(), %container, "app mounted");
        Ok(())
    }

    /// Unmount the root component. Warns and does nothing if not mounted.
    pub fn unmount(&self) {
        match self.container.take() {
            Some(container) => {
                self.renderer.render(None, container);
                debug!(component = self.root.name(), %container, "app unmounted");
            }
            None => warn!(component = self.root.name(), "cannot unmount an app that is not mounted"),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.container.get().is_some()
    }

    pub fn container(&self) -> Option<NodeHandle> {
        self.container.get()
    }

    pub fn renderer(&self) -> &Renderer<H> {
        &self.renderer
    }

    /// Instance of the mounted root component.
    pub fn root_instance(&self) -> Option<Rc<ComponentInstance>> {
        let container = self.container.get()?;
        self.renderer.root(container)?.component()
    }
}

impl<H: HostAdapter + 'static> std::fmt::Debug for App<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root.name())
            .field("container", &self.container.get())
            .finish()
    }
}
