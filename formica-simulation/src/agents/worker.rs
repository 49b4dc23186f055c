use formica_core::{ObjectId, ObjectKind, Start, TaskGraph, TrailId};

use super::is_hungry;
use crate::error::{Result, SimError};
use crate::tasks::{
    eat_at_home, eat_nearest, once, Approach, Builder, EnterInteractionRange, FindJob, FollowTrail,
    Job, Meal, Navigation, Payload, Route, TrailEnd, Walk,
};
use crate::world::World;

/// Navigation payload of a loaded worker: the trail it mines and the food
/// source its pocket was filled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Haul {
    pub route: Route,
    pub source: ObjectId,
}

impl Payload for Haul {
    fn ant(&self) -> ObjectId {
        self.route.ant
    }
}

impl Navigation for Haul {
    fn trail(&self) -> TrailId {
        self.route.trail
    }
}

enum Load {
    Loaded(Haul),
    Dry(Route),
}

/// The source may have been emptied and removed by another ant since the
/// worker stepped into range.
fn load(world: &mut World, route: Route, source: ObjectId) -> Result<Load> {
    if !world.has_food(source) {
        return Ok(Load::Dry(route));
    }
    let mut ant = world.ant(route.ant)?;
    ant.grab(source)?;
    ant.set_emitting(true)?;
    Ok(Load::Loaded(Haul { route, source }))
}

fn unload(world: &mut World, haul: Haul) -> Result<Haul> {
    let mut ant = world.ant(haul.route.ant)?;
    let home = ant.home()?;
    ant.store(home)?;
    ant.set_emitting(false)?;
    Ok(haul)
}

pub(super) fn graph(ant: ObjectId) -> Result<(TaskGraph<World, SimError>, Start)> {
    let mut builder = Builder::new();

    let find_job = builder.node("find job", |ant: ObjectId, world: &mut World| {
        world.ant(ant)?.set_emitting(false)?;
        Ok(FindJob::new(ant))
    });
    let go_to_mine = builder.node("go to mine", |route: Route, _: &mut World| {
        Ok(FollowTrail::new(route, TrailEnd::End))
    });
    let enter_mine = builder.node(
        "enter mine",
        |(route, source): (Route, ObjectId), _: &mut World| {
            Ok(EnterInteractionRange::new(route, source).requiring_food())
        },
    );
    let load_food = builder.node("load", |(route, source): (Route, ObjectId), _: &mut World| {
        Ok(once("load", move |world: &mut World| load(world, route, source)))
    });
    let go_home = builder.node("go home", |haul: Haul, _: &mut World| {
        Ok(FollowTrail::new(haul, TrailEnd::Start))
    });
    let enter_home = builder.node("enter home", |haul: Haul, world: &mut World| {
        let home = world.ant(haul.route.ant)?.home()?;
        Ok(EnterInteractionRange::new(haul, home))
    });
    let unload_food = builder.node("unload", |haul: Haul, _: &mut World| {
        Ok(once("unload", move |world: &mut World| unload(world, haul)))
    });
    let meal = eat_at_home::<Route>(&mut builder)?;
    let jobless_meal = eat_nearest::<ObjectId>(&mut builder)?;

    builder.then(find_job, move |job: Job, _: &mut World| -> Result<Start> {
        Ok(match job {
            Job::Found(route) => go_to_mine.start(route),
            Job::Hungry(ant) => jobless_meal.root.start(ant),
        })
    })?;
    builder.then(go_to_mine, move |walk: Walk<Route>, world: &mut World| -> Result<Start> {
        let route = match walk {
            Walk::Arrived(route) => route,
            Walk::Lost(route) => return Ok(find_job.start(route.ant)),
        };
        let source = world
            .ant(route.ant)?
            .nearest_visible(Some(ObjectKind::FoodSource), |world, id| world.has_food(id))?;
        Ok(match source {
            Some(source) => enter_mine.start((route, source)),
            None => find_job.start(route.ant),
        })
    })?;
    builder.then(enter_mine, move |approach: Approach<Route>, _: &mut World| -> Result<Start> {
        Ok(match approach {
            Approach::Reached { target, payload } => load_food.start((payload, target)),
            Approach::TargetLost(route) => find_job.start(route.ant),
        })
    })?;
    builder.then(load_food, move |outcome: Load, _: &mut World| -> Result<Start> {
        Ok(match outcome {
            Load::Loaded(haul) => go_home.start(haul),
            Load::Dry(route) => find_job.start(route.ant),
        })
    })?;
    // A worker that lost its trail still knows the way home.
    builder.then(go_home, move |walk: Walk<Haul>, _: &mut World| -> Result<Start> {
        let (Walk::Arrived(haul) | Walk::Lost(haul)) = walk;
        Ok(enter_home.start(haul))
    })?;
    builder.then(enter_home, move |approach: Approach<Haul>, _: &mut World| -> Result<Start> {
        Ok(match approach {
            Approach::Reached { payload, .. } => unload_food.start(payload),
            Approach::TargetLost(haul) => find_job.start(haul.route.ant),
        })
    })?;
    builder.then(unload_food, move |haul: Haul, world: &mut World| -> Result<Start> {
        if !world.has_food(haul.source) {
            return Ok(find_job.start(haul.route.ant));
        }
        if is_hungry(world, haul.route.ant)? {
            return Ok(meal.root.start(haul.route));
        }
        Ok(go_to_mine.start(haul.route))
    })?;
    builder.then(meal.terminal, move |done: Meal<Route>, _: &mut World| -> Result<Start> {
        let (Meal::Eaten(route) | Meal::Aborted(route)) = done;
        Ok(go_to_mine.start(route))
    })?;

    builder.then(
        jobless_meal.terminal,
        move |done: Meal<ObjectId>, _: &mut World| -> Result<Start> {
            let (Meal::Eaten(ant) | Meal::Aborted(ant)) = done;
            Ok(find_job.start(ant))
        },
    )?;

    Ok((builder.build(), find_job.start(ant)))
}
