//! Job Scheduling
//!
//! Effects with a scheduler (component render effects above all) do not
//! re-run when a dependency changes. They enqueue a [`Job`] here instead, and
//! the queue runs each job once at the next tick. Any number of synchronous
//! writes therefore collapse into a single re-render per component.
//!
//! # Components
//!
//! - [`Job`]: a callback with a stable identity used for deduplication.
//! - [`Scheduler`]: the FIFO queue, the post-flush callback set, and the
//!   flush loop.

mod job;
mod queue;

pub use job::{Job, JobId};
pub use queue::Scheduler;
