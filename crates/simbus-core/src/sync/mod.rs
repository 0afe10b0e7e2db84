//! # Sync Module
//!
//! Tick clock for the simulation loop.
//!
//! - [`Synchronize`]: tick counter, sequential tick listeners and the stall
//!   watchdog
//! - [`SynchronizeConfig`]: mode and timer periods
//! - [`TickListener`]: async per-tick callback
//!
//! ## Usage
//!
//! ```rust,ignore
//! let clock = Synchronize::new();
//! clock.on_stall(|report| {
//!     eprintln!("{}", report);
//!     std::process::exit(1);
//! });
//! clock.init(SynchronizeConfig::synchronous(5000))?;
//! clock.register(Arc::new(Physics::default()))?;
//!
//! loop {
//!     clock.next_tick().await?;
//! }
//! ```

mod clock;
mod config;
mod listener;

pub use clock::*;
pub use config::*;
pub use listener::*;
