use formica_core::geometry::heading;
use formica_core::pheromap::pheromone_by_direction;
use formica_core::{Direction, ObjectId, ObjectKind, Step, Task};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use super::Route;
use crate::error::{Result, SimError};
use crate::world::World;

const TURN_CHANCE: f64 = 0.1;
const STOP_CHANCE: f64 = 0.1;
const MOVE_CHANCE: f64 = 0.1;

/// Picks one of the eight compass headings, weighted by the pheromone read
/// in that direction. Empty directions keep a chance of half the faintest
/// non-empty reading. `None` when nothing is around.
pub(crate) fn pheromone_heading<R: Rng>(readings: &[f32; 8], rng: &mut R) -> Option<f32> {
    let faintest = readings
        .iter()
        .copied()
        .filter(|reading| *reading > 0.0)
        .fold(f32::INFINITY, f32::min);
    if !faintest.is_finite() {
        return None;
    }
    let weights = Direction::ALL.map(|direction| {
        let reading = pheromone_by_direction(direction, readings);
        if reading > 0.0 {
            reading
        } else {
            faintest / 2.0
        }
    });
    let chosen = WeightedIndex::new(weights).ok()?.sample(rng);
    Some(Direction::ALL[chosen].rotation())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// An attracting mark came into sight.
    Found(Route),
    /// The ant needs a meal before it can work.
    Hungry(ObjectId),
}

/// Roams around home until an attracting mark comes into sight, then
/// completes with the trail that mark belongs to. Completes early when the
/// ant gets hungry.
pub struct FindJob {
    ant: ObjectId,
}

impl FindJob {
    pub fn new(ant: ObjectId) -> Self {
        Self { ant }
    }

    fn attracting_trail(&self, world: &mut World) -> Result<Option<Route>> {
        let mark = world.ant(self.ant)?.nearest_visible(Some(ObjectKind::Mark), |world, id| {
            world
                .scene
                .get(id)
                .and_then(|object| object.mark())
                .map_or(false, |mark| mark.attracting)
        })?;
        Ok(mark
            .and_then(|mark| world.scene.get(mark))
            .and_then(|object| object.mark())
            .map(|mark| Route {
                ant: self.ant,
                trail: mark.trail,
            }))
    }
}

impl Task<World, SimError> for FindJob {
    type Output = Job;

    fn step(&mut self, world: &mut World) -> Result<Step<Job>> {
        if world.ant(self.ant)?.is_hungry()? {
            return Ok(Step::Completed(Job::Hungry(self.ant)));
        }
        if let Some(route) = self.attracting_trail(world)? {
            return Ok(Step::Completed(Job::Found(route)));
        }

        let readings = world.ant(self.ant)?.surrounding_pheromones()?;
        let turn = if world.rng.gen_bool(TURN_CHANCE) {
            pheromone_heading(&readings, &mut world.rng)
        } else {
            None
        };
        let stop = world.rng.gen_bool(STOP_CHANCE);
        let start = world.rng.gen_bool(MOVE_CHANCE);

        let mut ant = world.ant(self.ant)?;
        let home = ant.home()?;
        if ant.distance_to(home)? >= ant.config().ant.roaming_max_distance {
            ant.face_object(home)?;
        } else if let Some(rotation) = turn {
            let target = ant.position()? + heading(rotation);
            ant.face(target)?;
        } else {
            ant.wander()?;
        }
        if stop {
            ant.stop()?;
        }
        if start {
            ant.move_forward()?;
        }
        ant.keep_inside()?;
        Ok(Step::Pending)
    }
}
