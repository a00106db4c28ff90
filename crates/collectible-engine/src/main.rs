//! Headless session binary for replicated collectibles.
//!
//! Wires an in-process loopback hub, one authority, and a configurable
//! number of guest participants, each controlling a wandering avatar bot.
//! Runs the tick loop until the tick limit, then checks that every
//! participant converged on the same state.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `collectible-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the session (hub, participants, mirrored avatars)
//! 4. Create run controls from session settings
//! 5. Run the session loop with the bot driver
//! 6. Verify convergence and log the result

mod bots;
mod error;
mod session;

use std::path::Path;

use collectible_core::config::{LoggingConfig, SessionConfig};
use collectible_core::runner::{self, RunControl};
use collectible_events::{ReplayCheck, StateSnapshot};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::bots::BotDriver;
use crate::error::EngineError;
use crate::session::EngineParticipant;

/// Default configuration file, relative to the working directory.
const CONFIG_FILE: &str = "collectible-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, session setup, or the run fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        session = %config.session.name,
        seed = config.session.seed,
        tick_interval_ms = config.session.tick_interval_ms,
        max_ticks = config.session.max_ticks,
        guests = config.bots.count,
        "Configuration loaded"
    );

    // 3. Build the session.
    let mut session = session::build(&config)?;

    // 4. Create run controls.
    let control = RunControl::new(config.session.tick_interval_ms, config.session.max_ticks);

    // 5. Run the session.
    let mut driver = BotDriver::new(
        session.avatars.clone(),
        config.bots.speed,
        config.spawn.half_extent,
        config.spawn.height,
        config.session.seed,
    );
    let result = runner::run_session(&mut session.participants, &control, &mut driver).await?;
    runner::log_session_end(&result);

    // 6. Verify and report.
    report(&session.participants)?;
    info!(
        frames = session.hub.history_len()?,
        total_ticks = result.total_ticks,
        "collectible-engine shutdown complete"
    );
    Ok(())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Load the session configuration from `collectible-config.yaml`.
///
/// Looks for the config file relative to the current working directory.
fn load_config() -> Result<SessionConfig, EngineError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        let config = SessionConfig::from_file(config_path)?;
        Ok(config)
    } else {
        let mut config = SessionConfig::default();
        config.logging.apply_env_overrides();
        Ok(config)
    }
}

/// Log final scores and check that every participant agrees.
fn report(participants: &[EngineParticipant]) -> Result<(), EngineError> {
    let Some(authority) = participants.first() else {
        warn!("Session had no participants");
        return Ok(());
    };

    for (user, count) in authority.state().scores().iter() {
        info!(%user, count, "Final score");
    }

    for participant in participants {
        let state = participant.state();
        let agrees = state.items() == authority.state().items()
            && state.scores() == authority.state().scores();
        let replay = participant.log().verify_against(state);
        let violations = state.audit();

        if agrees && replay == ReplayCheck::Consistent && violations.is_empty() {
            info!(
                participant = participant.name(),
                log_entries = participant.log().len(),
                version = state.version(),
                "Participant converged"
            );
        } else {
            warn!(
                participant = participant.name(),
                agrees,
                ?replay,
                violations = violations.len(),
                "Participant diverged"
            );
        }
    }

    let snapshot = StateSnapshot::capture(authority.tick(), authority.state());
    debug!(snapshot = %snapshot.to_json_pretty()?, "Authority final snapshot");
    Ok(())
}
