//! Error types.
//!
//! The reactive core never fails: tracking problems and readonly writes are
//! diagnostics, not errors. What remains are mount failures surfaced to the
//! caller and job failures recorded by the scheduler.

use thiserror::Error;

use crate::scheduler::JobId;

/// Failure to attach or detach an application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("no container matches selector `{0}`")]
    ContainerNotFound(String),

    #[error("app is already mounted")]
    AlreadyMounted,
}

/// A job that did not complete during a flush.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("{job} panicked: {message}")]
    Panicked { job: JobId, message: String },

    #[error("{job} exceeded the recursion limit of {limit} runs in one flush")]
    RecursionLimit { job: JobId, limit: usize },
}

impl JobError {
    pub fn job(&self) -> JobId {
        match self {
            JobError::Panicked { job, .. } | JobError::RecursionLimit { job, .. } => *job,
        }
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
