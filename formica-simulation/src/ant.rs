//! The action and perception surface behavior steps use to drive one ant.

use std::f32::consts::FRAC_PI_2;

use formica_config::Config;
use formica_core::geometry::{angular_distance, heading, rotation_of};
use formica_core::{
    CoreError, DynamicBody, MotionState, ObjectId, ObjectKind, ObjectSpec, ResourceSlot,
    SceneObject, TrailId, Vec2,
};
use log::trace;
use ordered_float::OrderedFloat;
use rand::Rng;
use smallvec::SmallVec;

use crate::error::{Result, SimError};
use crate::world::World;

pub type Sighting = SmallVec<[ObjectId; 16]>;

/// Objects within this angle of the heading count as "in front".
const VISIBILITY_HALF_ANGLE: f32 = FRAC_PI_2;

/// Chance per step of a random turn while wandering.
const NOISE_CHANCE: f64 = 0.1;

pub struct Ant<'w> {
    id: ObjectId,
    world: &'w mut World,
}

impl<'w> Ant<'w> {
    pub(crate) fn new(id: ObjectId, world: &'w mut World) -> Result<Self> {
        let object = world.scene.require(id)?;
        if object.dynamic().is_none() {
            return Err(SimError::NotAnAnt(id));
        }
        Ok(Self { id, world })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    fn object(&self) -> Result<&SceneObject> {
        Ok(self.world.scene.require(self.id)?)
    }

    fn body(&self) -> Result<&DynamicBody> {
        self.object()?.dynamic().ok_or(SimError::NotAnAnt(self.id))
    }

    fn body_mut(&mut self) -> Result<&mut DynamicBody> {
        let id = self.id;
        self.world
            .scene
            .require_mut(id)?
            .dynamic_mut()
            .ok_or(SimError::NotAnAnt(id))
    }

    pub fn position(&self) -> Result<Vec2> {
        Ok(self.object()?.position())
    }

    pub fn rotation(&self) -> Result<f32> {
        Ok(self.object()?.renderable.rotation())
    }

    pub fn food(&self) -> Result<f32> {
        Ok(self.body()?.ant.food.amount())
    }

    pub fn pocket(&self) -> Result<f32> {
        Ok(self.body()?.ant.pocket.amount())
    }

    pub fn home(&self) -> Result<ObjectId> {
        Ok(self.body()?.ant.home)
    }

    pub fn is_hungry(&self) -> Result<bool> {
        Ok(self.food()? < self.world.config.ant.food_low)
    }

    pub fn is_moving(&self) -> Result<bool> {
        Ok(self.body()?.motion == MotionState::Moving)
    }

    pub fn move_forward(&mut self) -> Result<()> {
        self.body_mut()?.motion = MotionState::Moving;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.body_mut()?.motion = MotionState::Idle;
        Ok(())
    }

    /// Turns clockwise by `radians`.
    pub fn rotate(&mut self, radians: f32) -> Result<()> {
        let id = self.id;
        let renderable = &mut self.world.scene.require_mut(id)?.renderable;
        let rotation = renderable.rotation() + radians;
        renderable.set_rotation(rotation);
        Ok(())
    }

    /// Turns towards `target`. Facing the own position is a no-op.
    pub fn face(&mut self, target: Vec2) -> Result<()> {
        let direction = target - self.position()?;
        if direction == Vec2::ZERO {
            return Ok(());
        }
        let id = self.id;
        self.world
            .scene
            .require_mut(id)?
            .renderable
            .set_rotation(rotation_of(direction));
        Ok(())
    }

    pub fn face_object(&mut self, target: ObjectId) -> Result<()> {
        let position = self.world.scene.require(target)?.position();
        self.face(position)
    }

    pub fn set_emitting(&mut self, emitting: bool) -> Result<()> {
        self.body_mut()?.emitting_pheromone = emitting;
        Ok(())
    }

    /// Objects within vision distance, optionally of one kind. The ant
    /// itself is never included.
    pub fn visible_objects(&self, kind: Option<ObjectKind>) -> Result<Sighting> {
        let position = self.position()?;
        let scene = &self.world.scene;
        Ok(scene
            .find_objects_in_radius(position, self.world.config.ant.vision_distance)
            .into_iter()
            .filter(|id| *id != self.id)
            .filter(|id| {
                kind.map_or(true, |kind| {
                    scene.get(*id).map_or(false, |object| object.kind() == kind)
                })
            })
            .collect())
    }

    /// Visible objects within a half-plane cone around the heading.
    pub fn visible_objects_in_front(&self, kind: Option<ObjectKind>) -> Result<Sighting> {
        let position = self.position()?;
        let rotation = self.rotation()?;
        let scene = &self.world.scene;
        Ok(self
            .visible_objects(kind)?
            .into_iter()
            .filter(|id| {
                scene.get(*id).map_or(false, |object| {
                    let direction = object.position() - position;
                    direction == Vec2::ZERO
                        || angular_distance(rotation_of(direction), rotation) <= VISIBILITY_HALF_ANGLE
                })
            })
            .collect())
    }

    /// The visible object nearest to the ant among those accepted by `accept`.
    pub fn nearest_visible<F>(&self, kind: Option<ObjectKind>, accept: F) -> Result<Option<ObjectId>>
    where
        F: Fn(&World, ObjectId) -> bool,
    {
        let position = self.position()?;
        let world: &World = &*self.world;
        Ok(self
            .visible_objects(kind)?
            .into_iter()
            .filter(|id| accept(world, *id))
            .filter_map(|id| world.scene.get(id).map(|object| (id, object.position())))
            .min_by_key(|(id, target)| (OrderedFloat(target.distance(position)), *id))
            .map(|(id, _)| id))
    }

    /// True when `target` is a food source or building that still holds food.
    pub fn can_eat_from(&self, target: ObjectId) -> bool {
        self.world.has_food(target)
    }

    pub fn distance_to(&self, target: ObjectId) -> Result<f32> {
        let target = self.world.scene.require(target)?.position();
        Ok(self.position()?.distance(target))
    }

    pub fn is_within_interaction_range(&self, target: ObjectId) -> Result<bool> {
        Ok(self.distance_to(target)? <= self.world.config.ant.interaction_distance)
    }

    fn assert_within_interaction_range(&self, target: ObjectId) -> Result<()> {
        let distance = self.distance_to(target)?;
        let range = self.world.config.ant.interaction_distance;
        if distance > range {
            return Err(CoreError::OutOfInteractionRange {
                actor: self.id,
                target,
                distance,
                range,
            }
            .into());
        }
        Ok(())
    }

    fn edible_slot(&self, source: ObjectId) -> Result<ResourceSlot> {
        match self.world.scene.require(source)?.kind() {
            ObjectKind::FoodSource => Ok(ResourceSlot::FoodSource(source)),
            ObjectKind::Building => Ok(ResourceSlot::Storage(source)),
            _ => Err(CoreError::NoSuchResource(source).into()),
        }
    }

    /// Eats one tick's worth from `source`, never past a full stomach.
    pub fn eat(&mut self, source: ObjectId) -> Result<f32> {
        self.assert_within_interaction_range(source)?;
        let slot = self.edible_slot(source)?;
        let ant = &self.world.config.ant;
        let bite = ant.food_consumption_per_second * self.world.config.clock.tick_seconds;
        let room = (ant.food_max - self.food()?).max(0.0);
        let eaten = self
            .world
            .scene
            .transfer(slot, ResourceSlot::AntFood(self.id), bite.min(room))?;
        trace!("ant {} ate {} from {}", self.id, eaten, source);
        Ok(eaten)
    }

    /// Fills the pocket from `source` up to the carry capacity.
    pub fn grab(&mut self, source: ObjectId) -> Result<f32> {
        self.assert_within_interaction_range(source)?;
        let slot = self.edible_slot(source)?;
        let room = (self.world.config.ant.carry_capacity - self.pocket()?).max(0.0);
        let grabbed = self
            .world
            .scene
            .transfer(slot, ResourceSlot::AntPocket(self.id), room)?;
        trace!("ant {} grabbed {} from {}", self.id, grabbed, source);
        Ok(grabbed)
    }

    /// Empties the pocket into the storage of `building`.
    pub fn store(&mut self, building: ObjectId) -> Result<f32> {
        self.assert_within_interaction_range(building)?;
        let carried = self.pocket()?;
        let stored = self.world.scene.transfer(
            ResourceSlot::AntPocket(self.id),
            ResourceSlot::Storage(building),
            carried,
        )?;
        trace!("ant {} stored {} in {}", self.id, stored, building);
        Ok(stored)
    }

    /// Drops a mark at the current position and appends it to `trail`.
    pub fn mark(&mut self, trail: TrailId, attracting: bool) -> Result<ObjectId> {
        let position = self.position()?;
        let trail_entry = self.world.trails.get_mut(trail)?;
        let mark = self
            .world
            .scene
            .mount(ObjectSpec::mark(position, self.id, trail, attracting))?;
        trail_entry.append(mark);
        Ok(mark)
    }

    pub fn surrounding_pheromones(&self) -> Result<[f32; 8]> {
        let position = self.position()?;
        Ok(self.world.scene.pheromap().read_surrounding_at(position)?)
    }

    /// Random turn of up to the configured noise, taken with a fixed chance.
    pub fn wander(&mut self) -> Result<()> {
        if self.world.rng.gen_bool(NOISE_CHANCE) {
            let noise = self.world.config.ant.noise_rotation;
            let side = if self.world.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            self.rotate(side * noise)?;
        }
        Ok(())
    }

    /// Turns towards the world center when the next move would bring the ant
    /// within one step of the border.
    pub fn keep_inside(&mut self) -> Result<()> {
        let step = self.body()?.velocity * self.world.config.clock.tick_seconds;
        let next = self.position()? + heading(self.rotation()?) * step;
        let bounds = self.world.scene.bounds();
        if !bounds.contains_with_margin(next, step) {
            self.face(bounds.center())?;
        }
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.world.config
    }
}
