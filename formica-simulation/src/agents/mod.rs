//! Agents pair an ant with the behavior graph that drives it.

mod scout;
mod worker;

use std::fmt;

use formica_core::{ObjectId, Progress, TaskGraphExecutor};
use log::debug;

use crate::error::Result;
use crate::world::World;

pub use scout::Scan;
pub use worker::Haul;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Scout,
    Worker,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Scout => write!(f, "scout"),
            Role::Worker => write!(f, "worker"),
        }
    }
}

pub struct Agent {
    ant: ObjectId,
    role: Role,
    executor: TaskGraphExecutor<World, crate::error::SimError>,
}

impl Agent {
    /// Scouts lay trails from home until they find food, then advertise
    /// and patrol the trail.
    pub fn scout(ant: ObjectId, world: &mut World) -> Result<Self> {
        let (graph, start) = scout::graph(ant)?;
        Ok(Self {
            ant,
            role: Role::Scout,
            executor: TaskGraphExecutor::new(graph, start, world)?,
        })
    }

    /// Workers pick up advertised trails and haul food home along them.
    pub fn worker(ant: ObjectId, world: &mut World) -> Result<Self> {
        let (graph, start) = worker::graph(ant)?;
        Ok(Self {
            ant,
            role: Role::Worker,
            executor: TaskGraphExecutor::new(graph, start, world)?,
        })
    }

    pub fn ant(&self) -> ObjectId {
        self.ant
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Name of the behavior step currently running.
    pub fn current(&self) -> &'static str {
        self.executor.current()
    }

    /// Advances the agent's behavior by exactly one step.
    pub fn execute(&mut self, world: &mut World) -> Result<Progress> {
        let progress = self.executor.execute(world)?;
        if let Progress::Transitioned { from, to } = progress {
            debug!("{} {}: {} -> {}", self.role, self.ant, from, to);
        }
        Ok(progress)
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("ant", &self.ant)
            .field("role", &self.role)
            .field("current", &self.current())
            .finish()
    }
}

pub(crate) fn is_hungry(world: &mut World, ant: ObjectId) -> Result<bool> {
    world.ant(ant)?.is_hungry()
}
