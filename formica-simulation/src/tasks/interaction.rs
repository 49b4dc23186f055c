use formica_core::{ObjectId, ObjectKind, Step, Task};

use super::{finish, peek, Payload};
use crate::error::{Result, SimError};
use crate::world::World;

#[derive(Debug, Clone, PartialEq)]
pub enum Approach<P> {
    Reached { target: ObjectId, payload: P },
    /// The target was dismounted, or ran out of food while the ant walked.
    TargetLost(P),
}

/// Walks straight at `target` until it is within interaction range.
pub struct EnterInteractionRange<P> {
    target: ObjectId,
    requires_food: bool,
    payload: Option<P>,
}

impl<P: Payload> EnterInteractionRange<P> {
    const NAME: &'static str = "enter interaction range";

    pub fn new(payload: P, target: ObjectId) -> Self {
        Self {
            target,
            requires_food: false,
            payload: Some(payload),
        }
    }

    /// Gives up as soon as the target holds no more food.
    pub fn requiring_food(mut self) -> Self {
        self.requires_food = true;
        self
    }

    fn target_available(&self, world: &World) -> bool {
        if self.requires_food {
            world.has_food(self.target)
        } else {
            world.scene.contains(self.target)
        }
    }
}

impl<P: Payload> Task<World, SimError> for EnterInteractionRange<P> {
    type Output = Approach<P>;

    fn step(&mut self, world: &mut World) -> Result<Step<Approach<P>>> {
        let id = peek(&self.payload, Self::NAME)?.ant();
        let available = self.target_available(world);
        let mut ant = world.ant(id)?;

        if !available {
            ant.stop()?;
            let payload = finish(&mut self.payload, Self::NAME)?;
            return Ok(Step::Completed(Approach::TargetLost(payload)));
        }
        if ant.is_within_interaction_range(self.target)? {
            ant.stop()?;
            let payload = finish(&mut self.payload, Self::NAME)?;
            return Ok(Step::Completed(Approach::Reached {
                target: self.target,
                payload,
            }));
        }
        ant.face_object(self.target)?;
        ant.move_forward()?;
        Ok(Step::Pending)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoodFound<P> {
    pub source: ObjectId,
    pub payload: P,
}

/// Waits, without moving, until food is available. The home storage wins
/// over any visible food source.
pub struct WaitForFood<P> {
    payload: Option<P>,
}

impl<P: Payload> WaitForFood<P> {
    const NAME: &'static str = "wait for food";

    pub fn new(payload: P) -> Self {
        Self {
            payload: Some(payload),
        }
    }
}

impl<P: Payload> Task<World, SimError> for WaitForFood<P> {
    type Output = FoodFound<P>;

    fn step(&mut self, world: &mut World) -> Result<Step<FoodFound<P>>> {
        let id = peek(&self.payload, Self::NAME)?.ant();
        let mut ant = world.ant(id)?;
        ant.stop()?;

        let home = ant.home()?;
        let source = if ant.can_eat_from(home) {
            Some(home)
        } else {
            ant.nearest_visible(Some(ObjectKind::FoodSource), |world, id| world.has_food(id))?
        };

        match source {
            Some(source) => {
                let payload = finish(&mut self.payload, Self::NAME)?;
                Ok(Step::Completed(FoodFound { source, payload }))
            }
            None => Ok(Step::Pending),
        }
    }
}
