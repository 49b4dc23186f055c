use formica_core::{CoreError, ObjectId, TaskError, TrailId};
use thiserror::Error;

/// Perception dead-ends while navigating a trail. Behavior steps catch these
/// and route to a fallback branch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrailError {
    #[error("no candidate marks in sight")]
    NoCandidates,

    #[error("none of the visible marks belong to {0}")]
    NotOnTrail(TrailId),

    #[error("{0} does not exist")]
    UnknownTrail(TrailId),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Trail(#[from] TrailError),

    #[error("object {0} is not an ant")]
    NotAnAnt(ObjectId),

    #[error("task '{0}' was stepped after it completed")]
    TaskExhausted(&'static str),

    #[error("invalid world setup: {0}")]
    Setup(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
