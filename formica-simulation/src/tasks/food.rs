use formica_core::{ObjectId, Step, SubGraph, Task};
use log::trace;

use super::{
    finish, peek, Approach, Builder, EnterInteractionRange, FollowTrail, FoodFound, Navigation,
    Payload, TrailEnd, WaitForFood, Walk,
};
use crate::error::{Result, SimError};
use crate::world::World;

#[derive(Debug, Clone, PartialEq)]
pub enum Meal<P> {
    /// The ant is full.
    Eaten(P),
    /// The source ran dry before the ant was full.
    Aborted(P),
}

/// Eats from `source` one bite per tick until the ant is full.
pub struct Eat<P> {
    source: ObjectId,
    payload: Option<P>,
}

impl<P: Payload> Eat<P> {
    const NAME: &'static str = "eat";

    pub fn new(payload: P, source: ObjectId) -> Self {
        Self {
            source,
            payload: Some(payload),
        }
    }
}

impl<P: Payload> Task<World, SimError> for Eat<P> {
    type Output = Meal<P>;

    fn step(&mut self, world: &mut World) -> Result<Step<Meal<P>>> {
        let id = peek(&self.payload, Self::NAME)?.ant();
        let mut ant = world.ant(id)?;

        if ant.food()? >= ant.config().ant.food_max {
            trace!("ant {} is full", id);
            let payload = finish(&mut self.payload, Self::NAME)?;
            return Ok(Step::Completed(Meal::Eaten(payload)));
        }
        if !ant.can_eat_from(self.source) {
            let payload = finish(&mut self.payload, Self::NAME)?;
            return Ok(Step::Completed(Meal::Aborted(payload)));
        }
        ant.eat(self.source)?;
        Ok(Step::Pending)
    }
}

/// Wait for food, step into range of it and eat until full. The home
/// storage is preferred, wherever the ant stands.
pub fn eat_nearest<P: Payload>(builder: &mut Builder) -> Result<SubGraph<P, Meal<P>>> {
    let wait = builder.node("wait for food", |payload: P, _: &mut World| {
        Ok(WaitForFood::new(payload))
    });
    let enter = builder.node(
        "enter food range",
        |(payload, source): (P, ObjectId), _: &mut World| {
            Ok(EnterInteractionRange::new(payload, source).requiring_food())
        },
    );
    let eat = builder.node("eat", |(payload, source): (P, ObjectId), _: &mut World| {
        Ok(Eat::new(payload, source))
    });

    builder.then(wait, move |found: FoodFound<P>, _: &mut World| {
        Ok(enter.start((found.payload, found.source)))
    })?;
    builder.then(enter, move |approach: Approach<P>, _: &mut World| {
        Ok(match approach {
            Approach::Reached { target, payload } => eat.start((payload, target)),
            Approach::TargetLost(payload) => wait.start(payload),
        })
    })?;

    Ok(SubGraph {
        root: wait.entry(),
        terminal: eat.exit(),
    })
}

/// Walk back to the start of the trail, then [`eat_nearest`].
///
/// A lost trail is not fatal here: the ant still heads for whatever food it
/// can find, the home storage first.
pub fn eat_at_home<P: Navigation>(builder: &mut Builder) -> Result<SubGraph<P, Meal<P>>> {
    let reach_start = builder.node("reach start of trail", |payload: P, _: &mut World| {
        Ok(FollowTrail::new(payload, TrailEnd::Start))
    });
    let meal = eat_nearest::<P>(builder)?;

    builder.then(reach_start, move |walk: Walk<P>, _: &mut World| {
        let (Walk::Arrived(payload) | Walk::Lost(payload)) = walk;
        Ok(meal.root.start(payload))
    })?;

    Ok(SubGraph {
        root: reach_start.entry(),
        terminal: meal.terminal,
    })
}
