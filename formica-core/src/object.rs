//! Scene objects: a closed sum type over every kind of thing placed in the world.

use std::fmt;

use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::geometry::{normalize_rotation, Vec2};
use crate::resource::Resource;

/// Scene-assigned identity. Ids grow monotonically and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a trail; marks carry it so other ants can join the trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TrailId(pub u32);

impl fmt::Display for TrailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trail-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderableKind {
    Ant,
    Mark,
    Chamber,
    FoodSource,
    Corpse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualState {
    Default,
    Dead,
}

/// Everything the renderer needs to draw an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderable {
    pub kind: RenderableKind,
    pub(crate) position: Vec2,
    rotation: f32,
    pub state: VisualState,
}

impl Renderable {
    pub fn new(kind: RenderableKind, position: Vec2) -> Self {
        Self {
            kind,
            position,
            rotation: 0.0,
            state: VisualState::Default,
        }
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.set_rotation(rotation);
        self
    }

    /// Only the scene's update pass moves objects, so there is no public setter.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Stores the heading wrapped into `[0, 2π)`.
    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = normalize_rotation(rotation);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionState {
    Moving,
    Idle,
}

/// Agent payload of an ant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntBody {
    /// Own fuel level.
    pub food: Resource,
    /// What the ant is carrying.
    pub pocket: Resource,
    pub home: ObjectId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicBody {
    pub velocity: f32,
    pub motion: MotionState,
    pub emitting_pheromone: bool,
    pub ant: AntBody,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mark {
    pub owner: ObjectId,
    pub trail: TrailId,
    pub attracting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Building {
    pub storage: Resource,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodSource {
    pub food: Resource,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corpse {
    pub remains: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StaticBody {
    Mark(Mark),
    Building(Building),
    FoodSource(FoodSource),
    Corpse(Corpse),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Body {
    Dynamic(DynamicBody),
    Static(StaticBody),
}

/// Discriminant of [`Body`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Dynamic,
    Static,
}

/// Filter tag for `Scene::all` and perception queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    Ant,
    Mark,
    Building,
    FoodSource,
    Corpse,
}

/// Addresses one resource held by a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceSlot {
    AntFood(ObjectId),
    AntPocket(ObjectId),
    Storage(ObjectId),
    FoodSource(ObjectId),
}

impl ResourceSlot {
    pub fn owner(&self) -> ObjectId {
        match *self {
            ResourceSlot::AntFood(id)
            | ResourceSlot::AntPocket(id)
            | ResourceSlot::Storage(id)
            | ResourceSlot::FoodSource(id) => id,
        }
    }
}

pub trait HasRenderable {
    fn renderable(&self) -> &Renderable;
}

/// Teardown hook run when an object leaves the scene.
pub trait Disposable {
    fn dispose(&mut self);
    fn is_disposed(&self) -> bool;
}

/// An object before the scene has assigned it an id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectSpec {
    pub renderable: Renderable,
    pub body: Body,
}

impl ObjectSpec {
    pub fn ant(position: Vec2, rotation: f32, velocity: f32, home: ObjectId, food: Resource) -> Self {
        Self {
            renderable: Renderable::new(RenderableKind::Ant, position).with_rotation(rotation),
            body: Body::Dynamic(DynamicBody {
                velocity,
                motion: MotionState::Idle,
                emitting_pheromone: false,
                ant: AntBody {
                    food,
                    pocket: Resource::empty(food.tag()),
                    home,
                },
            }),
        }
    }

    pub fn mark(position: Vec2, owner: ObjectId, trail: TrailId, attracting: bool) -> Self {
        Self {
            renderable: Renderable::new(RenderableKind::Mark, position),
            body: Body::Static(StaticBody::Mark(Mark {
                owner,
                trail,
                attracting,
            })),
        }
    }

    pub fn building(position: Vec2, storage: Resource) -> Self {
        Self {
            renderable: Renderable::new(RenderableKind::Chamber, position),
            body: Body::Static(StaticBody::Building(Building { storage })),
        }
    }

    pub fn food_source(position: Vec2, food: Resource) -> Self {
        Self {
            // Sprites for sources are drawn pointing up.
            renderable: Renderable::new(RenderableKind::FoodSource, position)
                .with_rotation(-std::f32::consts::FRAC_PI_2),
            body: Body::Static(StaticBody::FoodSource(FoodSource { food })),
        }
    }

    pub fn corpse(position: Vec2, remains: f32) -> Self {
        let mut renderable = Renderable::new(RenderableKind::Corpse, position);
        renderable.state = VisualState::Dead;
        Self {
            renderable,
            body: Body::Static(StaticBody::Corpse(Corpse { remains })),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    id: ObjectId,
    pub renderable: Renderable,
    pub body: Body,
    disposed: bool,
}

impl SceneObject {
    pub(crate) fn from_spec(id: ObjectId, spec: ObjectSpec) -> Self {
        Self {
            id,
            renderable: spec.renderable,
            body: spec.body,
            disposed: false,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn position(&self) -> Vec2 {
        self.renderable.position
    }

    pub fn body_kind(&self) -> BodyKind {
        match self.body {
            Body::Dynamic(_) => BodyKind::Dynamic,
            Body::Static(_) => BodyKind::Static,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self.body {
            Body::Dynamic(_) => ObjectKind::Ant,
            Body::Static(StaticBody::Mark(_)) => ObjectKind::Mark,
            Body::Static(StaticBody::Building(_)) => ObjectKind::Building,
            Body::Static(StaticBody::FoodSource(_)) => ObjectKind::FoodSource,
            Body::Static(StaticBody::Corpse(_)) => ObjectKind::Corpse,
        }
    }

    pub fn dynamic(&self) -> Option<&DynamicBody> {
        match &self.body {
            Body::Dynamic(body) => Some(body),
            Body::Static(_) => None,
        }
    }

    pub fn dynamic_mut(&mut self) -> Option<&mut DynamicBody> {
        match &mut self.body {
            Body::Dynamic(body) => Some(body),
            Body::Static(_) => None,
        }
    }

    pub fn mark(&self) -> Option<&Mark> {
        match &self.body {
            Body::Static(StaticBody::Mark(mark)) => Some(mark),
            _ => None,
        }
    }

    pub fn mark_mut(&mut self) -> Option<&mut Mark> {
        match &mut self.body {
            Body::Static(StaticBody::Mark(mark)) => Some(mark),
            _ => None,
        }
    }

    pub fn building(&self) -> Option<&Building> {
        match &self.body {
            Body::Static(StaticBody::Building(building)) => Some(building),
            _ => None,
        }
    }

    pub fn food_source(&self) -> Option<&FoodSource> {
        match &self.body {
            Body::Static(StaticBody::FoodSource(source)) => Some(source),
            _ => None,
        }
    }

    pub fn corpse_mut(&mut self) -> Option<&mut Corpse> {
        match &mut self.body {
            Body::Static(StaticBody::Corpse(corpse)) => Some(corpse),
            _ => None,
        }
    }

    /// Moving dynamic objects are the only ones the update pass integrates.
    pub fn is_moving(&self) -> bool {
        matches!(
            self.body,
            Body::Dynamic(DynamicBody {
                motion: MotionState::Moving,
                ..
            })
        )
    }

    /// Food this object can hand out: a source's food or a building's storage.
    pub fn edible_amount(&self) -> Option<f32> {
        match &self.body {
            Body::Static(StaticBody::FoodSource(source)) => Some(source.food.amount()),
            Body::Static(StaticBody::Building(building)) => Some(building.storage.amount()),
            _ => None,
        }
    }

    pub(crate) fn resource(&self, slot: ResourceSlot) -> Result<Resource> {
        match (slot, &self.body) {
            (ResourceSlot::AntFood(_), Body::Dynamic(body)) => Ok(body.ant.food),
            (ResourceSlot::AntPocket(_), Body::Dynamic(body)) => Ok(body.ant.pocket),
            (ResourceSlot::Storage(_), Body::Static(StaticBody::Building(b))) => Ok(b.storage),
            (ResourceSlot::FoodSource(_), Body::Static(StaticBody::FoodSource(s))) => Ok(s.food),
            _ => Err(CoreError::NoSuchResource(self.id)),
        }
    }

    pub(crate) fn resource_mut(&mut self, slot: ResourceSlot) -> Result<&mut Resource> {
        let id = self.id;
        match (slot, &mut self.body) {
            (ResourceSlot::AntFood(_), Body::Dynamic(body)) => Ok(&mut body.ant.food),
            (ResourceSlot::AntPocket(_), Body::Dynamic(body)) => Ok(&mut body.ant.pocket),
            (ResourceSlot::Storage(_), Body::Static(StaticBody::Building(b))) => Ok(&mut b.storage),
            (ResourceSlot::FoodSource(_), Body::Static(StaticBody::FoodSource(s))) => {
                Ok(&mut s.food)
            }
            _ => Err(CoreError::NoSuchResource(id)),
        }
    }
}

impl HasRenderable for SceneObject {
    fn renderable(&self) -> &Renderable {
        &self.renderable
    }
}

impl Disposable for SceneObject {
    fn dispose(&mut self) {
        if let Body::Dynamic(body) = &mut self.body {
            body.motion = MotionState::Idle;
            body.emitting_pheromone = false;
        }
        if self.kind() == ObjectKind::Ant {
            self.renderable.state = VisualState::Dead;
        }
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispose_stops_ants() {
        let spec = ObjectSpec::ant(
            Vec2::new(1.0, 1.0),
            0.0,
            1.0,
            ObjectId(0),
            Resource::food(10.0).unwrap(),
        );
        let mut ant = SceneObject::from_spec(ObjectId(1), spec);
        ant.dynamic_mut().unwrap().motion = MotionState::Moving;

        ant.dispose();

        assert!(ant.is_disposed());
        assert!(!ant.is_moving());
        assert_eq!(ant.renderable.state, VisualState::Dead);
    }

    #[test]
    fn resource_slots_match_body() {
        let spec = ObjectSpec::building(Vec2::ZERO, Resource::food(5.0).unwrap());
        let building = SceneObject::from_spec(ObjectId(3), spec);
        assert_eq!(
            building.resource(ResourceSlot::Storage(ObjectId(3))).unwrap().amount(),
            5.0
        );
        assert_eq!(
            building.resource(ResourceSlot::AntFood(ObjectId(3))),
            Err(CoreError::NoSuchResource(ObjectId(3)))
        );
    }
}
