//! reveal-engine: Headless engine for sequential text reveal
//!
//! This crate provides the core of reveal, including:
//! - The reveal state machine and its tick algorithm
//! - An async engine that drives it on a fixed cadence with restart safety
//! - A clock-free timeline of the snapshots a reveal produces
//! - Configuration with the canned chat scripts hosts play

pub mod config;
pub mod engine;
pub mod state;
pub mod timeline;

// Re-export commonly used types
pub use config::{ConfigError, RevealConfig, Script, Speed, DEFAULT_SPEED_MS, MIN_SPEED_MS};
pub use engine::{EngineError, RevealSubscription, SequentialRevealEngine};
pub use state::{RevealPhase, RevealSnapshot, RevealState, TickOutcome};
pub use timeline::{timeline, TimedSnapshot, Timeline};

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_version() {
        let version = engine_version();
        assert!(!version.is_empty());
        assert!(version.starts_with("0."));
    }
}
