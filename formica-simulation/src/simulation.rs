//! The colony driver: seeds the world from configuration and runs ticks.

use std::f32::consts::TAU;

use formica_config::Config;
use formica_core::{
    Calendar, ClockEvents, GameClock, ObjectId, ObjectKind, ObjectSpec, RenderSnapshot,
    SceneEvent, Vec2,
};
use log::{debug, info, trace};
use rand::Rng;

use crate::agents::{Agent, Role};
use crate::error::Result;
use crate::world::World;

/// Inbound mutations applied between ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Pause,
    Resume,
    SetFrequency(f32),
    SpawnFood { position: Vec2, amount: f32 },
    SpawnScout { position: Vec2 },
    SpawnWorker { position: Vec2 },
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub calendar: Calendar,
    pub clock: ClockEvents,
    pub moved: usize,
    pub emitting: usize,
    /// Ants that starved this tick. Each left a corpse behind.
    pub deaths: Vec<ObjectId>,
    /// Corpses that decayed away this tick.
    pub decayed: Vec<ObjectId>,
    /// Food sources removed because they ran dry.
    pub depleted: Vec<ObjectId>,
}

pub struct Simulation {
    world: World,
    agents: Vec<Agent>,
    clock: GameClock,
    home: ObjectId,
    tick: u64,
}

impl Simulation {
    /// Mounts the home, the configured food sources and the initial ants.
    /// The clock starts paused.
    pub fn new(config: Config) -> Result<Self> {
        let clock = GameClock::new(config.clock.frequency)?;
        let home_position = config.home_position();
        let home_position = Vec2::new(home_position.x, home_position.y);
        let home_storage = config.colony.home_storage;
        let sources = config.colony.food_sources.clone();
        let (scouts, workers) = (config.colony.scouts, config.colony.workers);

        let mut world = World::new(config)?;
        let home = world.spawn_home(home_position, home_storage)?;
        let mut simulation = Self {
            world,
            agents: Vec::new(),
            clock,
            home,
            tick: 0,
        };

        for source in sources {
            simulation.spawn_food(Vec2::new(source.x, source.y), source.amount)?;
        }
        for _ in 0..scouts {
            simulation.spawn_ant(home_position, Role::Scout)?;
        }
        for _ in 0..workers {
            simulation.spawn_ant(home_position, Role::Worker)?;
        }
        info!(
            "colony seeded: {} scouts, {} workers, home {} at {}",
            scouts, workers, home, home_position
        );
        Ok(simulation)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut GameClock {
        &mut self.clock
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn home(&self) -> ObjectId {
        self.home
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn spawn_food(&mut self, position: Vec2, amount: f32) -> Result<ObjectId> {
        self.world.spawn_food(position, amount)
    }

    /// Mounts an ant with a random heading and registers its agent.
    pub fn spawn_ant(&mut self, position: Vec2, role: Role) -> Result<ObjectId> {
        let rotation = self.world.rng.gen_range(0.0..TAU);
        let ant = self.world.spawn_ant(position, rotation, self.home)?;
        let agent = match role {
            Role::Scout => Agent::scout(ant, &mut self.world)?,
            Role::Worker => Agent::worker(ant, &mut self.world)?,
        };
        debug!("{} {} spawned at {}", role, ant, position);
        self.agents.push(agent);
        Ok(ant)
    }

    pub fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Pause => self.clock.pause(),
            Command::Resume => self.clock.resume(),
            Command::SetFrequency(frequency) => self.clock.set_frequency(frequency)?,
            Command::SpawnFood { position, amount } => {
                self.spawn_food(position, amount)?;
            }
            Command::SpawnScout { position } => {
                self.spawn_ant(position, Role::Scout)?;
            }
            Command::SpawnWorker { position } => {
                self.spawn_ant(position, Role::Worker)?;
            }
        }
        Ok(())
    }

    /// Runs one tick: every agent steps once in spawn order, then the scene
    /// integrates motion, pheromone evaporates and the calendar bookkeeping
    /// runs. Any error is fatal to the run.
    pub fn tick(&mut self) -> Result<TickReport> {
        let clock = self.clock.tick();
        self.tick += 1;

        for agent in &mut self.agents {
            agent.execute(&mut self.world)?;
        }

        let dt = self.world.config.clock.tick_seconds;
        let update = self.world.scene.update_batch(dt)?;
        let evaporation = self.world.config.pheromone.evaporation;
        self.world.scene.evaporate(evaporation);

        let mut report = TickReport {
            tick: self.tick,
            calendar: self.clock.calendar(),
            clock,
            moved: update.moved,
            emitting: update.emitting,
            ..TickReport::default()
        };
        if clock.minute {
            report.decayed = self.decay_corpses()?;
            report.deaths = self.deplete_fuel()?;
        }
        report.depleted = self.remove_depleted_food()?;

        trace!(
            "tick {}: {} moved, {} emitting, {} agents",
            self.tick,
            report.moved,
            report.emitting,
            self.agents.len()
        );
        Ok(report)
    }

    fn deplete_fuel(&mut self) -> Result<Vec<ObjectId>> {
        let depletion = self.world.config.ant.food_depletion_per_minute;
        let ants: Vec<ObjectId> = self
            .world
            .scene
            .all(Some(ObjectKind::Ant))
            .map(|object| object.id())
            .collect();

        let mut starved = Vec::new();
        for id in ants {
            let object = self.world.scene.require_mut(id)?;
            if let Some(body) = object.dynamic_mut() {
                body.ant.food.withdraw(depletion)?;
                if body.ant.food.is_empty() {
                    starved.push(id);
                }
            }
        }

        for id in &starved {
            self.agents.retain(|agent| agent.ant() != *id);
            let body = self.world.scene.dismount(*id)?;
            let remains = self.world.config.ant.corpse_remains;
            self.world
                .scene
                .mount(ObjectSpec::corpse(body.position(), remains))?;
            info!("ant {} starved at {}", id, body.position());
        }
        Ok(starved)
    }

    fn decay_corpses(&mut self) -> Result<Vec<ObjectId>> {
        let decay = self.world.config.ant.corpse_decay_per_minute;
        let corpses: Vec<ObjectId> = self
            .world
            .scene
            .all(Some(ObjectKind::Corpse))
            .map(|object| object.id())
            .collect();

        let mut gone = Vec::new();
        for id in corpses {
            if let Some(corpse) = self.world.scene.require_mut(id)?.corpse_mut() {
                corpse.remains -= decay;
                if corpse.remains <= 0.0 {
                    gone.push(id);
                }
            }
        }
        for id in &gone {
            self.world.scene.dismount(*id)?;
            trace!("corpse {} decayed", id);
        }
        Ok(gone)
    }

    fn remove_depleted_food(&mut self) -> Result<Vec<ObjectId>> {
        let depleted: Vec<ObjectId> = self
            .world
            .scene
            .all(Some(ObjectKind::FoodSource))
            .filter(|object| object.edible_amount().map_or(false, |amount| amount <= 0.0))
            .map(|object| object.id())
            .collect();
        for id in &depleted {
            self.world.scene.dismount(*id)?;
            debug!("food source {} depleted", id);
        }
        Ok(depleted)
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.world.scene.drain_events()
    }

    pub fn snapshot(&self) -> Vec<RenderSnapshot> {
        self.world.scene.snapshot()
    }
}
