use formica_core::{ObjectId, ObjectKind, Step, Task, TrailId};
use log::trace;

use super::{finish, peek, Navigation};
use crate::error::{Result, SimError, TrailError};
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailEnd {
    Start,
    End,
}

/// Outcome of walking a trail: either the ant got there, or it lost sight
/// of its trail and the graph must fall back.
#[derive(Debug, Clone, PartialEq)]
pub enum Walk<P> {
    Arrived(P),
    Lost(P),
}

/// The visible mark of `trail` nearest to `end` in laying order. The outer
/// error is fatal, the inner one is a perception dead-end.
fn closest_visible_mark(
    world: &mut World,
    ant: ObjectId,
    trail: TrailId,
    end: TrailEnd,
) -> Result<std::result::Result<ObjectId, TrailError>> {
    let marks = world.ant(ant)?.visible_objects(Some(ObjectKind::Mark))?;
    let trail = world.trails.get(trail)?;
    Ok(match end {
        TrailEnd::Start => trail.find_closest_to_start(&marks),
        TrailEnd::End => trail.find_closest_to_end(&marks),
    })
}

/// Walks mark to mark towards one end of the payload's trail.
pub struct FollowTrail<P> {
    towards: TrailEnd,
    payload: Option<P>,
}

impl<P: Navigation> FollowTrail<P> {
    pub fn new(payload: P, towards: TrailEnd) -> Self {
        Self {
            towards,
            payload: Some(payload),
        }
    }

    fn name(&self) -> &'static str {
        match self.towards {
            TrailEnd::Start => "follow trail to start",
            TrailEnd::End => "follow trail to end",
        }
    }
}

impl<P: Navigation> Task<World, SimError> for FollowTrail<P> {
    type Output = Walk<P>;

    fn step(&mut self, world: &mut World) -> Result<Step<Walk<P>>> {
        let name = self.name();
        let (id, trail) = {
            let payload = peek(&self.payload, name)?;
            (payload.ant(), payload.trail())
        };

        let closest = match closest_visible_mark(world, id, trail, self.towards)? {
            Ok(mark) => mark,
            Err(err) => {
                trace!("ant {} lost {}: {}", id, trail, err);
                world.ant(id)?.stop()?;
                let payload = finish(&mut self.payload, name)?;
                return Ok(Step::Completed(Walk::Lost(payload)));
            }
        };

        let mut ant = world.ant(id)?;
        if ant.distance_to(closest)? < ant.config().ant.interaction_distance {
            ant.stop()?;
            let payload = finish(&mut self.payload, name)?;
            return Ok(Step::Completed(Walk::Arrived(payload)));
        }
        ant.face_object(closest)?;
        ant.move_forward()?;
        Ok(Step::Pending)
    }
}

/// Leads the ant away from the newest visible mark of its trail and lays
/// a fresh mark once it is one adjacent-node distance away.
pub struct ExtendTrail<P> {
    anchor: Option<ObjectId>,
    payload: Option<P>,
}

impl<P: Navigation> ExtendTrail<P> {
    const NAME: &'static str = "extend trail";

    pub fn new(payload: P) -> Self {
        Self {
            anchor: None,
            payload: Some(payload),
        }
    }
}

impl<P: Navigation> Task<World, SimError> for ExtendTrail<P> {
    type Output = Walk<P>;

    fn step(&mut self, world: &mut World) -> Result<Step<Walk<P>>> {
        let (id, trail) = {
            let payload = peek(&self.payload, Self::NAME)?;
            (payload.ant(), payload.trail())
        };

        let anchor = match self.anchor {
            Some(anchor) => anchor,
            None => match closest_visible_mark(world, id, trail, TrailEnd::End)? {
                Ok(anchor) => {
                    self.anchor = Some(anchor);
                    world.ant(id)?.move_forward()?;
                    anchor
                }
                Err(_) => {
                    world.ant(id)?.stop()?;
                    let payload = finish(&mut self.payload, Self::NAME)?;
                    return Ok(Step::Completed(Walk::Lost(payload)));
                }
            },
        };

        let mut ant = world.ant(id)?;
        if ant.distance_to(anchor)? >= ant.config().trail.adjacent_distance {
            ant.stop()?;
            let mark = ant.mark(trail, false)?;
            trace!("ant {} extended {} with {}", id, trail, mark);
            let payload = finish(&mut self.payload, Self::NAME)?;
            return Ok(Step::Completed(Walk::Arrived(payload)));
        }
        ant.wander()?;
        ant.keep_inside()?;
        Ok(Step::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::testing::{run, world};
    use crate::tasks::Route;
    use formica_core::Vec2;

    fn laid_trail(world: &mut World, ant: ObjectId, points: &[Vec2]) -> TrailId {
        let trail = world.trails.create();
        for point in points {
            let mark = world
                .scene
                .mount(formica_core::ObjectSpec::mark(*point, ant, trail, false))
                .unwrap();
            world.trails.get_mut(trail).unwrap().append(mark);
        }
        trail
    }

    #[test]
    fn follows_marks_to_the_end_and_back() {
        let (mut world, home) = world();
        let ant = world.spawn_ant(Vec2::new(100.0, 100.0), 0.0, home).unwrap();
        let points: Vec<Vec2> = (0..5)
            .map(|i| Vec2::new(100.0 + 20.0 * i as f32, 100.0))
            .collect();
        let trail = laid_trail(&mut world, ant, &points);
        let route = Route { ant, trail };

        let mut to_end = FollowTrail::new(route, TrailEnd::End);
        assert_eq!(run(&mut to_end, &mut world, 200).unwrap(), Walk::Arrived(route));
        let position = world.scene.get(ant).unwrap().position();
        assert!(position.distance(points[4]) < 10.0);
        assert!(!world.scene.get(ant).unwrap().is_moving());

        let mut to_start = FollowTrail::new(route, TrailEnd::Start);
        assert_eq!(run(&mut to_start, &mut world, 200).unwrap(), Walk::Arrived(route));
        let position = world.scene.get(ant).unwrap().position();
        assert!(position.distance(points[0]) < 10.0);
    }

    #[test]
    fn no_marks_in_sight_means_lost() {
        let (mut world, home) = world();
        let ant = world.spawn_ant(Vec2::new(100.0, 100.0), 0.0, home).unwrap();
        let trail = laid_trail(&mut world, ant, &[Vec2::new(400.0, 400.0)]);
        let route = Route { ant, trail };

        let mut task = FollowTrail::new(route, TrailEnd::Start);
        assert_eq!(task.step(&mut world).unwrap(), Step::Completed(Walk::Lost(route)));
        assert!(matches!(task.step(&mut world), Err(SimError::TaskExhausted(_))));
    }

    #[test]
    fn extending_lays_a_mark_one_adjacent_distance_away() {
        let (mut world, home) = world();
        let ant = world.spawn_ant(Vec2::new(100.0, 100.0), 0.0, home).unwrap();
        let trail = laid_trail(&mut world, ant, &[Vec2::new(100.0, 100.0)]);
        let route = Route { ant, trail };

        let mut task = ExtendTrail::new(route);
        assert_eq!(run(&mut task, &mut world, 500).unwrap(), Walk::Arrived(route));

        let marks = world.trails.get(trail).unwrap().marks().to_vec();
        assert_eq!(marks.len(), 2);
        let first = world.scene.get(marks[0]).unwrap().position();
        let second = world.scene.get(marks[1]).unwrap().position();
        assert!(first.distance(second) >= 20.0);
    }
}
