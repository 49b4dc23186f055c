//! Engine primitives for the ant colony simulation: scene objects, the
//! spatial index, the pheromone field, the game clock and the resumable
//! task scheduler that drives agent behavior.

pub mod clock;
pub mod error;
pub mod geometry;
pub mod index;
pub mod object;
pub mod pheromap;
pub mod resource;
pub mod scene;
pub mod task;

pub use clock::{Calendar, ClockEvents, GameClock};
pub use error::{CoreError, Result};
pub use geometry::{Bounds, Vec2};
pub use index::GridIndex;
pub use object::{
    Body, BodyKind, DynamicBody, MotionState, ObjectId, ObjectKind, ObjectSpec, ResourceSlot,
    SceneObject, StaticBody, TrailId,
};
pub use pheromap::{Direction, Pheromap};
pub use resource::{Resource, ResourceTag};
pub use scene::{RenderSnapshot, Scene, SceneEvent, SceneSettings, UpdateReport};
pub use task::{
    GraphBuilder, NodeHandle, Progress, Start, Step, SubGraph, Task, TaskError, TaskGraph,
    TaskGraphExecutor,
};
