use thiserror::Error;

use crate::object::ObjectId;

/// Errors raised by the scene, its index and the pheromone field.
///
/// Every variant is fatal to the tick loop: they signal a configuration
/// mistake or a broken invariant, never a transient condition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("world size {width}x{height} must be a multiple of grid step {step}")]
    InvalidGrid { step: f32, width: f32, height: f32 },

    #[error("object {id} at ({x}, {y}) is outside the world bounds")]
    OutOfBounds { id: ObjectId, x: f32, y: f32 },

    #[error("position ({x}, {y}) is outside the world bounds")]
    PositionOutOfBounds { x: f32, y: f32 },

    #[error("object {0} is not mounted")]
    UnknownObject(ObjectId),

    #[error("object {id} is not indexed at ({x}, {y})")]
    StaleIndexEntry { id: ObjectId, x: f32, y: f32 },

    #[error("batch length mismatch: {left} objects vs {right} positions")]
    BatchLengthMismatch { left: usize, right: usize },

    #[error("resource amount must not be negative, got {0}")]
    NegativeAmount(f32),

    #[error("object {0} does not hold the requested resource")]
    NoSuchResource(ObjectId),

    #[error("object {actor} is {distance} away from {target}, outside interaction range {range}")]
    OutOfInteractionRange {
        actor: ObjectId,
        target: ObjectId,
        distance: f32,
        range: f32,
    },

    #[error("clock frequency must be finite and non-negative, got {0}")]
    InvalidFrequency(f32),
}

pub type Result<T> = std::result::Result<T, CoreError>;
