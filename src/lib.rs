//! # Workout Timers
//!
//! An asynchronous workout-timer playlist engine for Rust built on top of Tokio.
//!
//! A playlist holds stopwatch, countdown, XY (work/rest intervals) and tabata
//! timers. Only one timer runs at a time; when it completes, control passes to
//! the next one until the playlist runs out.
//!
//! ## Features
//!
//! - **Deterministic core**: [`Playlist`] is a plain synchronous state machine,
//!   stepped one [`TICK_MS`] tick at a time
//! - **Asynchronous driver**: [`PlaylistDriver`] owns the playlist and ticks the
//!   running timer from a single Tokio task
//! - **Interval phases**: XY and tabata timers walk work/rest phases round by round
//! - **Graceful Shutdown**: Support for cancellation tokens and clean shutdowns
//! - **Serializable read model**: [`PlaylistSnapshot`] derives `serde::Serialize`
//!
//! ## Quick Start
//!
//! ```rust
//! use workout_timers::{CancellationToken, DriverConfig, PlaylistDriver, PlaylistEvent, Timer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cancel_token = CancellationToken::new();
//!     let (driver, mut handle) = PlaylistDriver::new(DriverConfig::new("gym"), cancel_token);
//!
//!     // Spawn the driver task
//!     tokio::spawn(driver.run());
//!
//!     handle.add_timer(Timer::countdown_ms(50)).await?;
//!     handle.toggle_start_pause().await?;
//!
//!     while let Some(event) = handle.recv_event().await {
//!         if event == PlaylistEvent::PlaylistFinished {
//!             break;
//!         }
//!     }
//!
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod driver;
mod error;
mod playlist;
mod timer;

pub use config::DriverConfig;
pub use driver::{PlaylistCommand, PlaylistDriver, PlaylistHandle};
pub use error::TimerError;
pub use playlist::{Playlist, PlaylistEvent, PlaylistSnapshot, TickReport};
pub use timer::{
    is_phase_exhausted, Intervals, StepOutcome, Timer, TimerId, TimerKind, TimerStatus,
    STOPWATCH_MAX_MS, TICK_MS,
};

// Re-export commonly used types for convenience
pub use tokio_util::sync::CancellationToken;
