use formica_config::Config;
use formica_core::{ObjectId, ObjectKind, ObjectSpec, Resource, Scene, SceneSettings, Vec2};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ant::Ant;
use crate::error::{Result, SimError};
use crate::trail::TrailBook;

/// Everything a behavior step may read or mutate. Passed by `&mut` into
/// every task step and resolver.
#[derive(Debug)]
pub struct World {
    pub scene: Scene,
    pub trails: TrailBook,
    pub config: Config,
    pub rng: StdRng,
}

impl World {
    pub fn new(config: Config) -> Result<Self> {
        let scene = Scene::new(SceneSettings {
            size: Vec2::new(config.world.width, config.world.height),
            index_step: config.world.index_step,
            pheromone_step: config.pheromone.step,
            pheromone_deposit: config.pheromone.deposit,
        })?;
        let rng = match config.colony.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            scene,
            trails: TrailBook::default(),
            config,
            rng,
        })
    }

    /// Borrows the ant `id` for one behavior step.
    pub fn ant(&mut self, id: ObjectId) -> Result<Ant<'_>> {
        Ant::new(id, self)
    }

    pub fn spawn_home(&mut self, position: Vec2, storage: f32) -> Result<ObjectId> {
        let id = self
            .scene
            .mount(ObjectSpec::building(position, Resource::food(storage)?))?;
        debug!("home {} at {}", id, position);
        Ok(id)
    }

    pub fn spawn_food(&mut self, position: Vec2, amount: f32) -> Result<ObjectId> {
        let id = self
            .scene
            .mount(ObjectSpec::food_source(position, Resource::food(amount)?))?;
        debug!("food source {} at {} holding {}", id, position, amount);
        Ok(id)
    }

    pub fn spawn_ant(&mut self, position: Vec2, rotation: f32, home: ObjectId) -> Result<ObjectId> {
        match self.scene.get(home).map(|object| object.kind()) {
            Some(ObjectKind::Building) => {}
            _ => return Err(SimError::Setup(format!("{} is not a home building", home))),
        }
        let ant = &self.config.ant;
        let spec = ObjectSpec::ant(
            position,
            rotation,
            ant.velocity,
            home,
            Resource::food(ant.initial_food)?,
        );
        Ok(self.scene.mount(spec)?)
    }

    /// True for a food source or building that still holds food.
    pub fn has_food(&self, id: ObjectId) -> bool {
        self.scene
            .get(id)
            .and_then(|object| object.edible_amount())
            .map_or(false, |amount| amount > 0.0)
    }
}
