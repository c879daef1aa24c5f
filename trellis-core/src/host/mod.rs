//! Host Adapters
//!
//! Concrete implementations of [`HostAdapter`](crate::renderer::HostAdapter).
//! Only an in-memory host ships with the core; platform hosts live with the
//! platform.

mod memory;

pub use memory::{HostOp, MemoryHost, OpStats};
