//! Resumable behavior steps shared by the scout and worker graphs.
//!
//! Every step is a small state machine stepped once per tick. Inputs and
//! outputs carry a [`Payload`], so the same step works for any graph that
//! knows which ant it is driving. Trail steps need a [`Navigation`] payload
//! that also names the trail.

mod food;
mod interaction;
mod job;
mod trail;

use std::marker::PhantomData;

use formica_core::{GraphBuilder, ObjectId, Step, Task, TrailId};

use crate::error::{Result, SimError};
use crate::world::World;

pub use food::{eat_at_home, eat_nearest, Eat, Meal};
pub use interaction::{Approach, EnterInteractionRange, FoodFound, WaitForFood};
pub use job::{FindJob, Job};
pub use trail::{ExtendTrail, FollowTrail, TrailEnd, Walk};

pub type Builder = GraphBuilder<World, SimError>;

/// A value threaded through behavior steps that knows which ant it drives.
pub trait Payload: 'static {
    fn ant(&self) -> ObjectId;
}

impl Payload for ObjectId {
    fn ant(&self) -> ObjectId {
        *self
    }
}

/// A payload that also knows the trail its ant works on.
pub trait Navigation: Payload {
    fn trail(&self) -> TrailId;
}

/// The plain navigation payload: one ant and the trail it works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub ant: ObjectId,
    pub trail: TrailId,
}

impl Payload for Route {
    fn ant(&self) -> ObjectId {
        self.ant
    }
}

impl Navigation for Route {
    fn trail(&self) -> TrailId {
        self.trail
    }
}

/// Runs `action` on the first step and completes with its result.
pub struct Once<F, O> {
    name: &'static str,
    action: Option<F>,
    _output: PhantomData<fn() -> O>,
}

pub fn once<F, O>(name: &'static str, action: F) -> Once<F, O>
where
    F: FnOnce(&mut World) -> Result<O>,
{
    Once {
        name,
        action: Some(action),
        _output: PhantomData,
    }
}

impl<F, O> Task<World, SimError> for Once<F, O>
where
    O: 'static,
    F: FnOnce(&mut World) -> Result<O>,
{
    type Output = O;

    fn step(&mut self, world: &mut World) -> Result<Step<O>> {
        let action = self.action.take().ok_or(SimError::TaskExhausted(self.name))?;
        Ok(Step::Completed(action(world)?))
    }
}

/// Takes the payload out of a finishing step. A step polled after it
/// completed has nothing left to hand over.
pub(crate) fn finish<P>(payload: &mut Option<P>, name: &'static str) -> Result<P> {
    payload.take().ok_or(SimError::TaskExhausted(name))
}

pub(crate) fn peek<'a, P>(payload: &'a Option<P>, name: &'static str) -> Result<&'a P> {
    payload.as_ref().ok_or(SimError::TaskExhausted(name))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn once_completes_on_first_step_and_then_is_exhausted() {
        let (mut world, home) = testing::world();
        let mut task = once("count", move |world: &mut World| Ok(world.scene.contains(home)));

        assert_eq!(task.step(&mut world).unwrap(), Step::Completed(true));
        assert_eq!(
            task.step(&mut world),
            Err(SimError::TaskExhausted("count"))
        );
    }
}
