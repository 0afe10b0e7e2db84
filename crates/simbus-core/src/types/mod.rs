//! Type system utilities and aliases.
//!
//! - [`aliases`]: shared-state wrappers and callback types used by the bus,
//!   the debug session and the tick clock.

pub mod aliases;

pub use aliases::*;
