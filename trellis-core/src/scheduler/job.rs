//! Jobs
//!
//! This module defines the unit of work the queue schedules: a component
//! update, a lifecycle hook, or a `next_tick` callback.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a job. Deduplication is by this identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    /// Generate a new unique job ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// A schedulable callback.
pub struct Job {
    /// Unique identifier for this job.
    id: JobId,

    callback: Box<dyn Fn()>,

    /// Inactive jobs are skipped when they come up in the queue. A job is
    /// deactivated when its owner (usually a component) is torn down.
    active: Cell<bool>,
}

impl Job {
    pub fn new<F>(callback: F) -> Rc<Self>
    where
        F: Fn() + 'static,
    {
        Rc::new(Self {
            id: JobId::new(),
            callback: Box::new(callback),
            active: Cell::new(true),
        })
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Run the callback. No-op for a deactivated job.
    pub fn run(&self) {
        if self.active.get() {
            (self.callback)();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn deactivate(&self) {
        self.active.set(false);
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_are_unique_and_ordered() {
        let a = JobId::new();
        let b = JobId::new();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn deactivated_job_does_not_run() {
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let job = Job::new(move || counter.set(counter.get() + 1));

        job.run();
        job.deactivate();
        job.run();
        assert_eq!(runs.get(), 1);
        assert!(!job.is_active());
    }
}
