//! Authoritative object store plus the per-tick movement pass.

use std::collections::BTreeMap;

use log::trace;
use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::geometry::{heading, Bounds, Vec2};
use crate::index::GridIndex;
use crate::object::{
    Disposable, ObjectId, ObjectKind, ObjectSpec, RenderableKind, ResourceSlot, SceneObject,
    VisualState,
};
use crate::pheromap::Pheromap;
use crate::resource;

/// What a renderer needs to draw one object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub id: ObjectId,
    pub kind: RenderableKind,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub state: VisualState,
}

impl From<&SceneObject> for RenderSnapshot {
    fn from(object: &SceneObject) -> Self {
        let position = object.position();
        Self {
            id: object.id(),
            kind: object.renderable.kind,
            x: position.x,
            y: position.y,
            rotation: object.renderable.rotation(),
            state: object.renderable.state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneEvent {
    Mounted(RenderSnapshot),
    Dismounted(RenderSnapshot),
}

/// Outcome of one `update_batch` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub moved: usize,
    pub emitting: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSettings {
    pub size: Vec2,
    pub index_step: f32,
    pub pheromone_step: f32,
    pub pheromone_deposit: f32,
}

#[derive(Debug)]
pub struct Scene {
    bounds: Bounds,
    objects: BTreeMap<ObjectId, SceneObject>,
    next_id: u64,
    index: GridIndex,
    pheromap: Pheromap,
    pheromone_deposit: f32,
    events: Vec<SceneEvent>,
}

impl Scene {
    pub fn new(settings: SceneSettings) -> Result<Self> {
        Ok(Self {
            bounds: Bounds {
                size: settings.size,
            },
            objects: BTreeMap::new(),
            next_id: 0,
            index: GridIndex::new(settings.index_step, settings.size)?,
            pheromap: Pheromap::new(settings.pheromone_step, settings.size)?,
            pheromone_deposit: settings.pheromone_deposit,
            events: Vec::new(),
        })
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn pheromap(&self) -> &Pheromap {
        &self.pheromap
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn mount(&mut self, spec: ObjectSpec) -> Result<ObjectId> {
        let position = spec.renderable.position();
        if !self.bounds.contains(position) {
            return Err(CoreError::PositionOutOfBounds {
                x: position.x,
                y: position.y,
            });
        }
        let id = ObjectId(self.next_id);
        self.index.register(id, position)?;
        self.next_id += 1;

        let object = SceneObject::from_spec(id, spec);
        trace!("mounted {:?} {}", object.kind(), id);
        self.events.push(SceneEvent::Mounted(RenderSnapshot::from(&object)));
        self.objects.insert(id, object);
        Ok(id)
    }

    pub fn dismount(&mut self, id: ObjectId) -> Result<SceneObject> {
        let position = self.require(id)?.position();
        self.index.unregister(id, position)?;
        let mut object = self
            .objects
            .remove(&id)
            .ok_or(CoreError::UnknownObject(id))?;
        object.dispose();
        trace!("dismounted {:?} {}", object.kind(), id);
        self.events
            .push(SceneEvent::Dismounted(RenderSnapshot::from(&object)));
        Ok(object)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    pub fn require(&self, id: ObjectId) -> Result<&SceneObject> {
        self.objects.get(&id).ok_or(CoreError::UnknownObject(id))
    }

    pub fn require_mut(&mut self, id: ObjectId) -> Result<&mut SceneObject> {
        self.objects.get_mut(&id).ok_or(CoreError::UnknownObject(id))
    }

    /// Mounted objects in mount order, optionally restricted to one kind.
    pub fn all(&self, kind: Option<ObjectKind>) -> impl Iterator<Item = &SceneObject> + '_ {
        self.objects
            .values()
            .filter(move |object| kind.map_or(true, |kind| object.kind() == kind))
    }

    /// Objects within `radius` of `center`, including any object at `center`.
    pub fn find_objects_in_radius(&self, center: Vec2, radius: f32) -> Vec<ObjectId> {
        self.index.all_in_radius(center, radius)
    }

    /// Moves up to `amount` between two resource slots, capped by what the
    /// source holds. Returns the amount moved. A slot never moves food into
    /// itself.
    pub fn transfer(&mut self, from: ResourceSlot, to: ResourceSlot, amount: f32) -> Result<f32> {
        if from == to {
            self.require(from.owner())?.resource(from)?;
            if amount < 0.0 {
                return Err(CoreError::NegativeAmount(amount));
            }
            return Ok(0.0);
        }
        let mut source = self.require(from.owner())?.resource(from)?;
        let mut target = self.require(to.owner())?.resource(to)?;
        let moved = resource::transfer(&mut source, &mut target, amount)?;
        *self.require_mut(from.owner())?.resource_mut(from)? = source;
        *self.require_mut(to.owner())?.resource_mut(to)? = target;
        Ok(moved)
    }

    /// Integrates every moving dynamic object over `dt`, reindexes the moved
    /// objects and deposits pheromone behind the emitting ones.
    ///
    /// All next positions are validated before any is written: a result
    /// outside the world fails the whole pass and leaves the scene untouched.
    pub fn update_batch(&mut self, dt: f32) -> Result<UpdateReport> {
        let mut emitting: Vec<(ObjectId, Vec2, Vec2)> = Vec::new();
        let mut silent: Vec<(ObjectId, Vec2, Vec2)> = Vec::new();

        for object in self.objects.values() {
            let body = match object.dynamic() {
                Some(body) if object.is_moving() => body,
                _ => continue,
            };
            let previous = object.position();
            let next = previous + heading(object.renderable.rotation()) * body.velocity * dt;
            if !self.bounds.contains(next) {
                return Err(CoreError::OutOfBounds {
                    id: object.id(),
                    x: next.x,
                    y: next.y,
                });
            }
            let batch = if body.emitting_pheromone {
                &mut emitting
            } else {
                &mut silent
            };
            batch.push((object.id(), previous, next));
        }

        let moved: Vec<(ObjectId, Vec2)> = emitting
            .iter()
            .chain(&silent)
            .map(|(id, _, next)| (*id, *next))
            .collect();
        let previous: Vec<Vec2> = emitting
            .iter()
            .chain(&silent)
            .map(|(_, previous, _)| *previous)
            .collect();
        self.index.notify_position_update_batch(&moved, &previous)?;

        for (id, next) in &moved {
            if let Some(object) = self.objects.get_mut(id) {
                object.renderable.position = *next;
            }
        }

        let starts: Vec<Vec2> = emitting.iter().map(|(_, start, _)| *start).collect();
        let ends: Vec<Vec2> = emitting.iter().map(|(_, _, end)| *end).collect();
        self.pheromap
            .update_batch(&starts, &ends, self.pheromone_deposit)?;

        Ok(UpdateReport {
            moved: moved.len(),
            emitting: emitting.len(),
        })
    }

    pub fn evaporate(&mut self, amount: f32) {
        self.pheromap.evaporate(amount);
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> Vec<RenderSnapshot> {
        self.objects.values().map(RenderSnapshot::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{MotionState, TrailId};
    use crate::pheromap::Direction;
    use crate::resource::Resource;
    use std::f32::consts::FRAC_PI_2;

    fn scene() -> Scene {
        Scene::new(SceneSettings {
            size: Vec2::splat(100.0),
            index_step: 10.0,
            pheromone_step: 5.0,
            pheromone_deposit: 10.0,
        })
        .unwrap()
    }

    fn mount_ant(scene: &mut Scene, position: Vec2, rotation: f32, emitting: bool) -> ObjectId {
        let id = scene
            .mount(ObjectSpec::ant(
                position,
                rotation,
                2.0,
                ObjectId(999),
                Resource::food(10.0).unwrap(),
            ))
            .unwrap();
        let body = scene.get_mut(id).unwrap().dynamic_mut().unwrap();
        body.motion = MotionState::Moving;
        body.emitting_pheromone = emitting;
        id
    }

    #[test]
    fn invalid_grid_step_is_rejected() {
        let result = Scene::new(SceneSettings {
            size: Vec2::new(100.0, 95.0),
            index_step: 10.0,
            pheromone_step: 5.0,
            pheromone_deposit: 1.0,
        });
        assert!(matches!(result, Err(CoreError::InvalidGrid { .. })));
    }

    #[test]
    fn mount_and_dismount_emit_events() {
        let mut scene = scene();
        let id = scene
            .mount(ObjectSpec::food_source(Vec2::new(10.0, 20.0), Resource::food(5.0).unwrap()))
            .unwrap();
        assert_eq!(scene.find_objects_in_radius(Vec2::new(10.0, 20.0), 1.0), vec![id]);

        let removed = scene.dismount(id).unwrap();
        assert!(removed.is_disposed());
        assert!(scene.find_objects_in_radius(Vec2::new(10.0, 20.0), 1.0).is_empty());

        let events = scene.drain_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SceneEvent::Mounted(snapshot) if snapshot.id == id));
        assert!(matches!(events[1], SceneEvent::Dismounted(snapshot) if snapshot.id == id));
        assert!(scene.drain_events().is_empty());
    }

    #[test]
    fn mount_outside_bounds_fails() {
        let mut scene = scene();
        let result = scene.mount(ObjectSpec::corpse(Vec2::new(-1.0, 5.0), 1.0));
        assert!(matches!(result, Err(CoreError::PositionOutOfBounds { .. })));
        assert!(scene.is_empty());
        assert!(scene.drain_events().is_empty());
    }

    #[test]
    fn dismount_unknown_object_fails() {
        let mut scene = scene();
        assert_eq!(
            scene.dismount(ObjectId(3)).unwrap_err(),
            CoreError::UnknownObject(ObjectId(3))
        );
    }

    #[test]
    fn all_filters_by_kind_in_mount_order() {
        let mut scene = scene();
        let a = scene.mount(ObjectSpec::corpse(Vec2::new(1.0, 1.0), 1.0)).unwrap();
        let _ = scene
            .mount(ObjectSpec::mark(Vec2::new(2.0, 2.0), a, TrailId(0), false))
            .unwrap();
        let c = scene.mount(ObjectSpec::corpse(Vec2::new(3.0, 3.0), 1.0)).unwrap();

        let corpses: Vec<ObjectId> = scene.all(Some(ObjectKind::Corpse)).map(|o| o.id()).collect();
        assert_eq!(corpses, vec![a, c]);
        assert_eq!(scene.all(None).count(), 3);
    }

    #[test]
    fn update_moves_along_heading() {
        let mut scene = scene();
        let east = mount_ant(&mut scene, Vec2::new(50.0, 50.0), 0.0, false);
        let south = mount_ant(&mut scene, Vec2::new(20.0, 20.0), FRAC_PI_2, false);

        let report = scene.update_batch(1.5).unwrap();

        assert_eq!(report.moved, 2);
        let east = scene.get(east).unwrap().position();
        assert!((east - Vec2::new(53.0, 50.0)).length() < 1e-4);
        let south = scene.get(south).unwrap().position();
        assert!((south - Vec2::new(20.0, 23.0)).length() < 1e-4);
    }

    #[test]
    fn idle_objects_do_not_move() {
        let mut scene = scene();
        let id = mount_ant(&mut scene, Vec2::new(50.0, 50.0), 0.0, false);
        scene.get_mut(id).unwrap().dynamic_mut().unwrap().motion = MotionState::Idle;

        assert_eq!(scene.update_batch(1.0).unwrap().moved, 0);
        assert_eq!(scene.get(id).unwrap().position(), Vec2::new(50.0, 50.0));
    }

    #[test]
    fn leaving_bounds_fails_without_partial_update() {
        let mut scene = scene();
        let inside = mount_ant(&mut scene, Vec2::new(50.0, 50.0), 0.0, false);
        let escaping = mount_ant(&mut scene, Vec2::new(99.0, 50.0), 0.0, false);

        let result = scene.update_batch(1.0);

        assert!(matches!(result, Err(CoreError::OutOfBounds { id, .. }) if id == escaping));
        assert_eq!(scene.get(inside).unwrap().position(), Vec2::new(50.0, 50.0));
        assert_eq!(scene.get(escaping).unwrap().position(), Vec2::new(99.0, 50.0));
    }

    #[test]
    fn update_keeps_index_in_sync() {
        let mut scene = scene();
        let id = mount_ant(&mut scene, Vec2::new(9.0, 5.0), 0.0, false);

        for _ in 0..3 {
            scene.update_batch(1.0).unwrap();
        }

        assert!(scene.find_objects_in_radius(Vec2::new(9.0, 5.0), 1.0).is_empty());
        assert_eq!(scene.find_objects_in_radius(Vec2::new(15.0, 5.0), 0.5), vec![id]);
    }

    #[test]
    fn only_emitting_ants_deposit_pheromone() {
        let mut scene = scene();
        mount_ant(&mut scene, Vec2::new(4.0, 2.0), 0.0, true);
        mount_ant(&mut scene, Vec2::new(4.0, 52.0), 0.0, false);

        let report = scene.update_batch(1.0).unwrap();

        assert_eq!(report.emitting, 1);
        // The emitting ant left cell (0, 0); the other one left (0, 10) silently.
        let above = scene.pheromap().read_surrounding_at(Vec2::new(2.0, 7.0)).unwrap();
        assert_eq!(above[Direction::North.index()], 10.0);
        let below = scene.pheromap().read_surrounding_at(Vec2::new(2.0, 57.0)).unwrap();
        assert_eq!(below[Direction::North.index()], 0.0);
    }

    #[test]
    fn transfer_between_slots_conserves_food() {
        let mut scene = scene();
        let source = scene
            .mount(ObjectSpec::food_source(Vec2::new(10.0, 10.0), Resource::food(8.0).unwrap()))
            .unwrap();
        let ant = mount_ant(&mut scene, Vec2::new(12.0, 10.0), 0.0, false);

        let moved = scene
            .transfer(ResourceSlot::FoodSource(source), ResourceSlot::AntPocket(ant), 5.0)
            .unwrap();
        assert_eq!(moved, 5.0);
        let moved = scene
            .transfer(ResourceSlot::FoodSource(source), ResourceSlot::AntPocket(ant), 5.0)
            .unwrap();
        assert_eq!(moved, 3.0);

        assert_eq!(scene.get(source).unwrap().edible_amount(), Some(0.0));
        let pocket = scene.get(ant).unwrap().dynamic().unwrap().ant.pocket;
        assert_eq!(pocket.amount(), 8.0);
    }

    #[test]
    fn transfer_into_the_same_slot_moves_nothing() {
        let mut scene = scene();
        let building = scene
            .mount(ObjectSpec::building(Vec2::new(30.0, 30.0), Resource::food(10.0).unwrap()))
            .unwrap();

        let moved = scene
            .transfer(ResourceSlot::Storage(building), ResourceSlot::Storage(building), 4.0)
            .unwrap();

        assert_eq!(moved, 0.0);
        assert_eq!(scene.get(building).unwrap().edible_amount(), Some(10.0));
    }

    #[test]
    fn transfer_within_one_object() {
        let mut scene = scene();
        let ant = mount_ant(&mut scene, Vec2::new(12.0, 10.0), 0.0, false);
        scene
            .transfer(ResourceSlot::AntFood(ant), ResourceSlot::AntPocket(ant), 4.0)
            .unwrap();
        let body = scene.get(ant).unwrap().dynamic().unwrap().ant;
        assert_eq!(body.food.amount(), 6.0);
        assert_eq!(body.pocket.amount(), 4.0);
    }
}
