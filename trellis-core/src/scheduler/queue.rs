//! Job Queue
//!
//! A FIFO, de-duplicated queue of pending jobs plus a set of post-flush
//! callbacks.
//!
//! # Algorithm
//!
//! 1. `queue_job` appends a job unless it is already waiting, then requests a
//!    flush. Requests collapse: one pending flush serves any number of jobs.
//! 2. `tick` is the microtask boundary. If a flush was requested, the queue is
//!    drained in insertion order. The loop indexes the live queue, so jobs
//!    queued by running jobs are caught up in the same pass.
//! 3. While flushing, a job is only deduplicated against the part of the
//!    queue that has not started yet. A job that already ran is appended and
//!    runs again; a per-job run limit stops update loops.
//! 4. After the main queue drains, post-flush callbacks run once each. Those
//!    queued while post-flush callbacks are running wait for the next tick.
//!
//! Every job runs under `catch_unwind`. A panicking job is recorded and the
//! flush carries on, so the queue never gets stuck in the flushing state.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, error, trace};

use super::job::{Job, JobId};
use crate::error::JobError;

pub struct Scheduler {
    queue: RefCell<Vec<Rc<Job>>>,
    /// Position of the job currently running during a flush.
    flush_index: Cell<usize>,
    is_flushing: Cell<bool>,
    is_flush_pending: Cell<bool>,
    pending_post: RefCell<IndexMap<JobId, Rc<Job>>>,
    post_flushing: Cell<bool>,
    run_counts: RefCell<HashMap<JobId, usize>>,
    failures: RefCell<Vec<JobError>>,
    recursion_limit: usize,
}

impl Scheduler {
    pub fn new(recursion_limit: usize) -> Self {
        Self {
            queue: RefCell::new(Vec::new()),
            flush_index: Cell::new(0),
            is_flushing: Cell::new(false),
            is_flush_pending: Cell::new(false),
            pending_post: RefCell::new(IndexMap::new()),
            post_flushing: Cell::new(false),
            run_counts: RefCell::new(HashMap::new()),
            failures: RefCell::new(Vec::new()),
            recursion_limit,
        }
    }

    /// First queue position a new job is deduplicated against.
    fn dedup_start(&self) -> usize {
        if self.is_flushing.get() {
            self.flush_index.get() + 1
        } else {
            0
        }
    }

    /// Add `job` unless it is already waiting, and request a flush.
    pub fn queue_job(&self, job: &Rc<Job>) {
        {
            let mut queue = self.queue.borrow_mut();
            let start = self.dedup_start().min(queue.len());
            if queue[start..].iter().any(|queued| queued.id() == job.id()) {
                trace!(job = %job.id(), "job already queued");
                return;
            }
            trace!(job = %job.id(), position = queue.len(), "queue job");
            queue.push(Rc::clone(job));
        }
        self.queue_flush();
    }

    /// Request a flush at the next tick. Idempotent within one tick.
    pub fn queue_flush(&self) {
        if !self.is_flushing.get() && !self.is_flush_pending.replace(true) {
            trace!("flush requested");
        }
    }

    /// Remove a job that has not started yet. Returns whether it was queued.
    pub fn invalidate_job(&self, id: JobId) -> bool {
        let mut queue = self.queue.borrow_mut();
        let start = self.dedup_start().min(queue.len());
        match queue[start..].iter().position(|queued| queued.id() == id) {
            Some(offset) => {
                trace!(job = %id, "invalidate job");
                queue.remove(start + offset);
                true
            }
            None => false,
        }
    }

    /// Queue a callback to run after the current (or next) flush.
    pub fn queue_post_flush_cb(&self, job: &Rc<Job>) {
        self.pending_post
            .borrow_mut()
            .entry(job.id())
            .or_insert_with(|| Rc::clone(job));
        self.queue_flush();
    }

    /// Run `f` after the next flush completes.
    pub fn next_tick<F>(&self, f: F)
    where
        F: Fn() + 'static,
    {
        self.queue_post_flush_cb(&Job::new(f));
    }

    /// Run every pending post-flush callback once.
    ///
    /// Callbacks queued while this runs are kept for the next call.
    pub fn flush_post_flush_cbs(&self) {
        if self.post_flushing.get() {
            return;
        }
        let active: Vec<Rc<Job>> = std::mem::take(&mut *self.pending_post.borrow_mut())
            .into_values()
            .collect();
        if active.is_empty() {
            return;
        }

        debug!(callbacks = active.len(), "flushing post-flush callbacks");
        self.post_flushing.set(true);
        let _guard = PostFlushGuard { scheduler: self };
        for job in active {
            if job.is_active() {
                self.run_job(&job);
            }
        }
    }

    /// The microtask boundary: flush if a flush was requested.
    ///
    /// Returns whether a flush ran. Re-entrant calls from inside a flush are
    /// ignored.
    pub fn tick(&self) -> bool {
        if self.is_flushing.get() || self.post_flushing.get() {
            return false;
        }
        if !self.is_flush_pending.replace(false) {
            return false;
        }
        self.flush_jobs();
        true
    }

    fn flush_jobs(&self) {
        {
            self.is_flushing.set(true);
            let _guard = FlushGuard { scheduler: self };
            debug!(jobs = self.queue.borrow().len(), "flushing jobs");

            let mut index = 0;
            loop {
                let job = match self.queue.borrow().get(index) {
                    Some(job) => Rc::clone(job),
                    None => break,
                };
                self.flush_index.set(index);
                index += 1;

                if !job.is_active() {
                    trace!(job = %job.id(), "skipping inactive job");
                    continue;
                }
                if self.exceeds_recursion_limit(job.id()) {
                    continue;
                }
                self.run_job(&job);
            }
        }

        self.flush_post_flush_cbs();

        if self.has_pending_work() {
            self.is_flush_pending.set(true);
        }
    }

    fn exceeds_recursion_limit(&self, id: JobId) -> bool {
        let mut counts = self.run_counts.borrow_mut();
        let count = counts.entry(id).or_insert(0);
        *count += 1;
        if *count <= self.recursion_limit {
            return false;
        }
        if *count == self.recursion_limit + 1 {
            error!(job = %id, limit = self.recursion_limit, "maximum recursive updates exceeded");
            self.failures.borrow_mut().push(JobError::RecursionLimit {
                job: id,
                limit: self.recursion_limit,
            });
        }
        true
    }

    fn run_job(&self, job: &Job) {
        trace!(job = %job.id(), "run job");
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job.run())) {
            let message = panic_message(payload.as_ref());
            error!(job = %job.id(), %message, "job panicked");
            self.failures.borrow_mut().push(JobError::Panicked {
                job: job.id(),
                message,
            });
        }
    }

    /// Drain the failures recorded since the last call.
    pub fn take_failures(&self) -> Vec<JobError> {
        std::mem::take(&mut *self.failures.borrow_mut())
    }

    pub fn has_pending_work(&self) -> bool {
        !self.queue.borrow().is_empty() || !self.pending_post.borrow().is_empty()
    }

    pub fn is_flushing(&self) -> bool {
        self.is_flushing.get()
    }

    pub fn is_flush_pending(&self) -> bool {
        self.is_flush_pending.get()
    }

    /// Number of jobs waiting in the main queue.
    pub fn queued_jobs(&self) -> usize {
        let queue = self.queue.borrow();
        if self.is_flushing.get() {
            queue.len().saturating_sub(self.flush_index.get() + 1)
        } else {
            queue.len()
        }
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(100)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("queued_jobs", &self.queued_jobs())
            .field("pending_post", &self.pending_post.borrow().len())
            .field("is_flushing", &self.is_flushing.get())
            .field("is_flush_pending", &self.is_flush_pending.get())
            .finish()
    }
}

/// Resets the flushing state when the main pass ends.
struct FlushGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        let scheduler = self.scheduler;
        scheduler.queue.borrow_mut().clear();
        scheduler.run_counts.borrow_mut().clear();
        scheduler.flush_index.set(0);
        scheduler.is_flushing.set(false);
    }
}

struct PostFlushGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for PostFlushGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.post_flushing.set(false);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
