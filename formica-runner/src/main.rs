mod commands;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{Receiver, TryRecvError};
use formica_config::{load_config, Config, ConfigError, ConfigLoader};
use formica_simulation::{SimError, Simulation, TickReport};
use formica_transport::{TransportController, TransportError};
use hdrhistogram::Histogram;
use log::{error, info, warn};
use thiserror::Error;

use crate::commands::Input;

/// Upper bound on one pacing sleep so stdin commands stay responsive.
const MAX_IDLE: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(author, version, about = "Ant colony simulation runner", long_about = None)]
struct Args {
    /// Path to a JSON or TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured RNG seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Runs this many ticks as fast as possible, then exits
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Overrides the configured tick frequency (ticks per second)
    #[arg(short, long)]
    frequency: Option<f32>,

    /// Starts with the clock paused until a `resume` command arrives
    #[arg(long)]
    paused: bool,
}

#[derive(Debug, Error)]
enum RunnerError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("simulation: {0}")]
    Simulation(#[from] SimError),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("failed to install the Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("failed to create the tick histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn load(args: &Args) -> Result<Config, RunnerError> {
    let mut config = match &args.config {
        Some(path) => {
            info!("using configuration from {}", path.display());
            load_config(path)?
        }
        None => Config::default(),
    };
    if let Some(seed) = args.seed {
        config.colony.seed = Some(seed);
    }
    if let Some(frequency) = args.frequency {
        config.clock.frequency = frequency;
    }
    ConfigLoader::validate(&config)?;
    Ok(config)
}

/// Forwards stdin lines until stdin closes or the receiver is dropped.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Applies every pending command. Returns false once `quit` was read.
fn drain_commands(simulation: &mut Simulation, commands: &Receiver<String>) -> bool {
    loop {
        let line = match commands.try_recv() {
            Ok(line) => line,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return true,
        };
        match commands::parse(&line) {
            Ok(Input::Quit) => return false,
            Ok(Input::Command(command)) => match simulation.apply(command) {
                Ok(()) => info!("applied {:?}", command),
                Err(e) => warn!("rejected {:?}: {}", command, e),
            },
            Err(e) => warn!("{}", e),
        }
    }
}

struct Stats {
    durations: Histogram<u64>,
    deaths: usize,
}

impl Stats {
    fn new() -> Result<Self, RunnerError> {
        Ok(Self {
            durations: Histogram::new(3)?,
            deaths: 0,
        })
    }

    fn record(&mut self, report: &TickReport, elapsed: Duration) {
        self.durations.saturating_record(elapsed.as_micros() as u64);
        self.deaths += report.deaths.len();
        if report.clock.day {
            info!(
                "day {} month {} year {}",
                report.calendar.day, report.calendar.month, report.calendar.year
            );
        }
    }

    fn log(&self) {
        if self.durations.is_empty() {
            return;
        }
        info!(
            "{} ticks, {} deaths; tick time p50 {}us p99 {}us max {}us",
            self.durations.len(),
            self.deaths,
            self.durations.value_at_quantile(0.5),
            self.durations.value_at_quantile(0.99),
            self.durations.max()
        );
    }
}

fn step(
    simulation: &mut Simulation,
    transport: &mut TransportController,
    stats: &mut Stats,
) -> Result<(), RunnerError> {
    let started = Instant::now();
    let report = simulation.tick()?;
    stats.record(&report, started.elapsed());

    let events = simulation.drain_events();
    transport.publish(report.tick, report.calendar, events, || simulation.snapshot())?;
    Ok(())
}

fn run(args: Args) -> Result<(), RunnerError> {
    let config = load(&args)?;
    let mut transport = TransportController::from_config(&config.transport);
    let mut simulation = Simulation::new(config)?;
    let mut stats = Stats::new()?;

    let running = Arc::new(AtomicBool::new(true));
    let handler = running.clone();
    ctrlc::set_handler(move || handler.store(false, Ordering::SeqCst))?;

    let commands = spawn_stdin_reader();
    let result = match args.ticks {
        Some(ticks) => run_headless(&mut simulation, &mut transport, &mut stats, &running, ticks),
        None => {
            if !args.paused {
                simulation.clock_mut().resume();
            }
            info!(
                "running at {} ticks per second",
                simulation.clock().frequency()
            );
            run_paced(
                &mut simulation,
                &mut transport,
                &mut stats,
                &running,
                &commands,
            )
        }
    };

    stats.log();
    info!(
        "stopped after {} ticks, {} agents alive, {} frames sent",
        simulation.tick_count(),
        simulation.agents().len(),
        transport.sent()
    );
    result
}

fn run_headless(
    simulation: &mut Simulation,
    transport: &mut TransportController,
    stats: &mut Stats,
    running: &AtomicBool,
    ticks: u64,
) -> Result<(), RunnerError> {
    info!("running {} ticks headless", ticks);
    while running.load(Ordering::SeqCst) && simulation.tick_count() < ticks {
        step(simulation, transport, stats)?;
    }
    Ok(())
}

fn run_paced(
    simulation: &mut Simulation,
    transport: &mut TransportController,
    stats: &mut Stats,
    running: &AtomicBool,
    commands: &Receiver<String>,
) -> Result<(), RunnerError> {
    let mut last = Instant::now();
    while running.load(Ordering::SeqCst) {
        if !drain_commands(simulation, commands) {
            break;
        }

        let now = Instant::now();
        let due = simulation.clock_mut().advance(now - last);
        last = now;
        for _ in 0..due {
            step(simulation, transport, stats)?;
        }

        let idle = simulation
            .clock()
            .until_next_tick()
            .map_or(MAX_IDLE, |wait| wait.min(MAX_IDLE));
        spin_sleep::sleep(idle);
    }
    Ok(())
}
