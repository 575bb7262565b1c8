//! # RAGAMUFFIN Headless Runner
//!
//! Builds a town, lets a scripted wanderer loose in it for a while and logs
//! what happened. No window, no audio, just the log.
//!
//! ```bash
//! # Ten minutes in the default town
//! ragamuffin_headless --seconds 600
//!
//! # A different town, chatty logs, modifications saved at the end
//! RUST_LOG=debug ragamuffin_headless --seed 7 --save town.rgm
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ragamuffin::economy::Material;
use ragamuffin::{Game, GameConfig, GameError, GameEvent, GameLoop, GameLoopConfig, GameResult};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ragamuffin_headless", about = "Runs the town without a window", version)]
struct Cli {
    /// TOML config file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// World seed, overriding the config
    #[arg(short, long)]
    seed: Option<u64>,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 120.0)]
    seconds: f32,

    /// Simulation steps per second
    #[arg(long, default_value_t = ragamuffin::game_loop::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    /// Write the player's changes to the town here when done
    #[arg(long)]
    save: Option<PathBuf>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn run(cli: &Cli) -> GameResult<()> {
    let mut config = match &cli.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.world.seed = seed;
    }
    if cli.seconds.is_nan() || cli.seconds <= 0.0 {
        return Err(GameError::Config("--seconds must be positive".to_owned()));
    }

    info!(seed = config.world.seed, seconds = cli.seconds, tick_rate = cli.tick_rate, "starting town");
    let mut game = Game::new(config)?;
    let mut game_loop = GameLoop::new(GameLoopConfig::with_tick_rate(cli.tick_rate));
    let mut wanderer = Wanderer::default();
    let mut tally: BTreeMap<String, u64> = BTreeMap::new();

    let frame = game_loop.timestep();
    let frames = (cli.seconds / frame).ceil() as u64;
    for _ in 0..frames {
        game_loop.advance(frame, |dt| {
            wanderer.act(&mut game, dt);
            game.update(dt);
        });
        for event in game.events() {
            log_event(&event);
            *tally.entry(event_name(&event)).or_default() += 1;
        }
    }

    if let Some(path) = &cli.save {
        game.save(path)?;
    }

    let player = game.player();
    info!(
        day = game.clock().day(),
        time = %game.clock().time_string(),
        health = player.stats.health.value(),
        hunger = player.stats.hunger.value(),
        warmth = player.stats.warmth.value(),
        notoriety = player.notoriety(),
        crimes = player.record().total(),
        arrests = game.arrests().arrests(),
        money = %game.wallet(),
        npcs = game.npcs().count(),
        cars = game.vehicles().count(),
        chunks = game.world().loaded_chunk_count(),
        "run finished"
    );
    for (name, count) in &tally {
        info!(event = %name, count, "event total");
    }
    game_loop.stats().log_summary();
    Ok(())
}

fn event_name(event: &GameEvent) -> String {
    let debug = format!("{event:?}");
    debug
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or_default()
        .to_owned()
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::NpcSpoke { id, text } => debug!(npc = id, "\"{text}\""),
        GameEvent::PlayerArrested { fine, confiscated } => {
            info!(fine, items = confiscated.len(), "nicked");
        }
        GameEvent::PlayerDied { cause } => info!(?cause, "died"),
        GameEvent::NewDay { day } => info!(day, "new day"),
        GameEvent::GangHostilityChanged { territory, to, .. } => info!(territory, ?to, "gang mood"),
        _ => debug!(?event, "event"),
    }
}

/// Walks the town in long legs, scavenging and eating as it goes.
#[derive(Default)]
struct Wanderer {
    leg_timer: f32,
    legs: u32,
    punch_timer: f32,
    last_position: [f32; 3],
    stuck_for: f32,
}

impl Wanderer {
    /// Seconds walked in one direction.
    const LEG_TIME: f32 = 12.0;
    /// Seconds between punches at whatever is ahead.
    const PUNCH_INTERVAL: f32 = 0.4;
    /// Turn per leg, in degrees. Not a divisor of 360 so the walk drifts.
    const TURN: f32 = 97.0;
    /// Eat below this hunger fraction.
    const HUNGRY: f32 = 0.5;

    fn act(&mut self, game: &mut Game, dt: f32) {
        if game.player().is_dead() {
            return;
        }

        self.leg_timer -= dt;
        if self.leg_timer <= 0.0 {
            self.leg_timer = Self::LEG_TIME;
            self.legs += 1;
            let yaw = game.player().yaw + Self::TURN;
            game.look(yaw, -20.0);
        }

        if game.player().stats.hunger.fraction() < Self::HUNGRY {
            Self::try_to_eat(game);
        }

        let position = game.player().position();
        let moved = ragamuffin::physics::horizontal_distance(position, self.last_position);
        self.last_position = position;
        self.stuck_for = if moved < 0.01 { self.stuck_for + dt } else { 0.0 };

        // Walked into something: hop, then start knocking it down
        if self.stuck_for > 0.3 {
            let _ = game.jump();
            self.punch_timer -= dt;
            if self.punch_timer <= 0.0 {
                self.punch_timer = Self::PUNCH_INTERVAL;
                match game.punch_block() {
                    Ok(outcome) => debug!(?outcome, "punched"),
                    Err(err) => debug!(%err, "punch missed"),
                }
            }
        }

        let sprint = self.legs % 3 == 0;
        if let Err(err) = game.move_player(1.0, 0.0, sprint) {
            debug!(%err, "cannot move");
        }
    }

    fn try_to_eat(game: &mut Game) {
        let food = game
            .inventory()
            .stacks()
            .find(|(slot, stack)| *slot < ragamuffin::economy::HOTBAR_SIZE && stack.material.food_value().is_some())
            .map(|(slot, _)| slot);
        match food {
            Some(slot) => {
                game.select_hotbar(slot);
                if let Ok(food) = game.eat_selected() {
                    info!(food = food.name(), "ate");
                }
            }
            None => {
                // Anything edible in a shop we happen to be standing in
                if game.buy(Material::SausageRoll, 1).is_ok() || game.buy(Material::Bread, 1).is_ok() {
                    info!("bought food");
                }
            }
        }
    }
}
