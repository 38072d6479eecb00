//! Headless host for kickback.
//!
//! Wires a [`GameSession`] to a headless stage and a scripted hit feed,
//! then runs the fixed-step host loop until the tick limit is reached or
//! the feed has played its rounds.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `kickback-config.yaml` (or `KICKBACK_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Create the task runtime from the configured tick rate
//! 4. Start the game session on a headless stage
//! 5. Run the host loop with the hit feed as the step callback
//! 6. Log the result

mod error;
mod feed;
mod headless;

use std::cell::RefCell;
use std::rc::Rc;

use kickback_core::Runtime;
use kickback_core::config::{GameConfig, LogFormat, LoggingConfig};
use kickback_core::runner::{self, RunBounds};
use kickback_game::{GameSession, SharedStage, TextSlot};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::feed::{FeedSettings, HitFeed};
use crate::headless::HeadlessStage;

/// Application entry point for the headless host.
///
/// # Errors
///
/// Returns an error if the config is invalid, the session cannot be built,
/// or the host loop fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration. Logging depends on it, so this comes first.
    let config_path = GameConfig::resolve_path();
    let (config, found) = GameConfig::load_or_default(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);

    info!("kickback-engine starting");
    info!(
        path = %config_path.display(),
        found,
        ticks_per_second = config.time.ticks_per_second,
        seed = config.simulation.seed,
        "Configuration loaded"
    );

    // 3. Create the task runtime.
    let runtime = Runtime::new(config.time.tick_rate()?);
    info!(rate = runtime.rate().per_second(), "Runtime initialized");

    // 4. Start the session.
    let stage = Rc::new(RefCell::new(HeadlessStage::new()));
    let shared: SharedStage = Rc::clone(&stage) as SharedStage;
    let session = GameSession::from_config(&runtime, shared, &config)?;
    let mut feed = HitFeed::new(
        session,
        Rc::clone(&stage),
        FeedSettings::default(),
        config.simulation.seed,
    );

    // 5. Run the host loop.
    let result =
        runner::run_fixed_steps(&runtime, RunBounds::from(&config.simulation), &mut feed).await?;

    // 6. Log results.
    runner::log_run_end(&result);

    let fed = feed.tally();
    let staged = stage.borrow().tally();
    info!(
        victories = fed.victories,
        score = feed.session().score(),
        hits = fed.hits,
        accepted = fed.accepted,
        contacts = fed.contacts,
        spawned = staged.spawned,
        destroyed = staged.destroyed,
        explosions = staged.explosions,
        misses = staged.misses,
        launches = staged.launches,
        strikes = staged.strikes,
        balls_in_reach = stage.borrow().balls_in_reach(),
        banner = %stage.borrow().text(TextSlot::GameOver),
        "kickback-engine shutdown complete"
    );

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}
