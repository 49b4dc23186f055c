//! Ant colony behavior on top of `formica-core`: the ant action surface,
//! trails, the resumable behavior steps, the scout and worker graphs and the
//! tick driver that runs them.

pub mod agents;
pub mod ant;
pub mod error;
pub mod simulation;
pub mod tasks;
pub mod trail;
pub mod world;

pub use agents::{Agent, Role};
pub use ant::Ant;
pub use error::{Result, SimError, TrailError};
pub use simulation::{Command, Simulation, TickReport};
pub use trail::{Trail, TrailBook};
pub use world::World;
