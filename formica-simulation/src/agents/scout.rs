use formica_core::{ObjectId, ObjectKind, Start, TaskGraph, TrailId};
use log::info;

use super::is_hungry;
use crate::error::{Result, SimError};
use crate::tasks::{
    eat_at_home, once, Approach, Builder, EnterInteractionRange, ExtendTrail, FollowTrail, Meal,
    Navigation, Payload, Route, TrailEnd, Walk,
};
use crate::world::World;

/// Navigation payload of a scout still looking for food: the trail it is
/// laying and how far it has been extended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scan {
    pub ant: ObjectId,
    pub trail: TrailId,
    pub distance: f32,
}

impl Payload for Scan {
    fn ant(&self) -> ObjectId {
        self.ant
    }
}

impl Navigation for Scan {
    fn trail(&self) -> TrailId {
        self.trail
    }
}

impl From<Scan> for Route {
    fn from(scan: Scan) -> Self {
        Route {
            ant: scan.ant,
            trail: scan.trail,
        }
    }
}

enum Lookup {
    Found { scan: Scan, food: ObjectId },
    TooFar(Scan),
    Hungry(Scan),
    Extend(Scan),
}

fn look_around(world: &mut World, scan: Scan) -> Result<Lookup> {
    let ant = world.ant(scan.ant)?;
    let food = ant.nearest_visible(Some(ObjectKind::FoodSource), |world, id| world.has_food(id))?;
    Ok(match food {
        Some(food) => Lookup::Found { scan, food },
        None if scan.distance >= ant.config().trail_max_distance() => Lookup::TooFar(scan),
        None if ant.is_hungry()? => Lookup::Hungry(scan),
        None => Lookup::Extend(scan),
    })
}

/// Marks the food end of the trail and turns every mark attracting.
fn advertise(world: &mut World, route: Route) -> Result<Route> {
    world.ant(route.ant)?.mark(route.trail, true)?;
    let marks = world.trails.get(route.trail)?.marks().to_vec();
    for mark in &marks {
        if let Some(mark) = world.scene.get_mut(*mark).and_then(|object| object.mark_mut()) {
            mark.attracting = true;
        }
    }
    info!("ant {} advertises {} ({} marks)", route.ant, route.trail, marks.len());
    Ok(route)
}

pub(super) fn graph(ant: ObjectId) -> Result<(TaskGraph<World, SimError>, Start)> {
    let mut builder = Builder::new();

    let init = builder.node("init trail", |ant: ObjectId, _: &mut World| {
        Ok(once("init trail", move |world: &mut World| {
            let trail = world.trails.create();
            world.ant(ant)?.mark(trail, false)?;
            Ok(Scan {
                ant,
                trail,
                distance: 0.0,
            })
        }))
    });
    let lookup = builder.node("lookup", |scan: Scan, _: &mut World| {
        Ok(once("lookup", move |world: &mut World| look_around(world, scan)))
    });
    let enter_food = builder.node(
        "enter food range",
        |(scan, food): (Scan, ObjectId), _: &mut World| {
            Ok(EnterInteractionRange::new(scan, food).requiring_food())
        },
    );
    let reset = builder.node("reset scan", |scan: Scan, _: &mut World| {
        Ok(FollowTrail::new(scan, TrailEnd::Start))
    });
    let extend = builder.node("extend trail", |scan: Scan, _: &mut World| {
        Ok(ExtendTrail::new(scan))
    });
    let recover = builder.node("recover scan position", |scan: Scan, _: &mut World| {
        Ok(FollowTrail::new(scan, TrailEnd::End))
    });
    let scan_meal = eat_at_home::<Scan>(&mut builder)?;

    let advertise_trail = builder.node("advertise trail", |route: Route, _: &mut World| {
        Ok(once("advertise trail", move |world: &mut World| {
            advertise(world, route)
        }))
    });
    let patrol_food = builder.node("patrol to food", |route: Route, _: &mut World| {
        Ok(FollowTrail::new(route, TrailEnd::End))
    });
    let patrol_home = builder.node("patrol to home", |route: Route, _: &mut World| {
        Ok(FollowTrail::new(route, TrailEnd::Start))
    });
    let patrol_meal = eat_at_home::<Route>(&mut builder)?;

    builder.chain(init, lookup)?;
    builder.then(lookup, move |found: Lookup, _: &mut World| -> Result<Start> {
        Ok(match found {
            Lookup::Found { scan, food } => enter_food.start((scan, food)),
            Lookup::TooFar(scan) => reset.start(scan),
            Lookup::Hungry(scan) => scan_meal.root.start(scan),
            Lookup::Extend(scan) => extend.start(scan),
        })
    })?;
    builder.then(enter_food, move |approach: Approach<Scan>, _: &mut World| -> Result<Start> {
        Ok(match approach {
            Approach::Reached { payload, .. } => advertise_trail.start(payload.into()),
            Approach::TargetLost(scan) => lookup.start(scan),
        })
    })?;
    builder.then(reset, move |walk: Walk<Scan>, _: &mut World| -> Result<Start> {
        let (Walk::Arrived(scan) | Walk::Lost(scan)) = walk;
        Ok(init.start(scan.ant))
    })?;
    builder.then(extend, move |walk: Walk<Scan>, world: &mut World| -> Result<Start> {
        Ok(match walk {
            Walk::Arrived(mut scan) => {
                scan.distance += world.config.trail.adjacent_distance;
                lookup.start(scan)
            }
            Walk::Lost(scan) => init.start(scan.ant),
        })
    })?;
    builder.then(scan_meal.terminal, move |meal: Meal<Scan>, _: &mut World| -> Result<Start> {
        let (Meal::Eaten(scan) | Meal::Aborted(scan)) = meal;
        Ok(recover.start(scan))
    })?;
    builder.then(recover, move |walk: Walk<Scan>, _: &mut World| -> Result<Start> {
        Ok(match walk {
            Walk::Arrived(scan) => lookup.start(scan),
            Walk::Lost(scan) => init.start(scan.ant),
        })
    })?;

    builder.chain(advertise_trail, patrol_food)?;
    builder.then(patrol_food, move |walk: Walk<Route>, world: &mut World| -> Result<Start> {
        Ok(match walk {
            Walk::Arrived(route) if is_hungry(world, route.ant)? => patrol_meal.root.start(route),
            Walk::Arrived(route) => patrol_home.start(route),
            Walk::Lost(route) => init.start(route.ant),
        })
    })?;
    builder.then(patrol_home, move |walk: Walk<Route>, world: &mut World| -> Result<Start> {
        Ok(match walk {
            Walk::Arrived(route) if is_hungry(world, route.ant)? => patrol_meal.root.start(route),
            Walk::Arrived(route) => patrol_food.start(route),
            Walk::Lost(route) => init.start(route.ant),
        })
    })?;
    builder.then(patrol_meal.terminal, move |meal: Meal<Route>, _: &mut World| -> Result<Start> {
        let (Meal::Eaten(route) | Meal::Aborted(route)) = meal;
        Ok(patrol_food.start(route))
    })?;

    Ok((builder.build(), init.start(ant)))
}
