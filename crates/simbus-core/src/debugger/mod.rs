//! # Debugger Module
//!
//! Interactive breakpoint debugging for event dispatch.
//!
//! - [`Breakpoint`]: a named filter with count/once/every/disabled state
//! - [`DebugSession`]: the ordered breakpoint registry and the dispatch gate
//!   that can suspend a send until the operator resumes it
//! - [`Trace`]: history of every dispatched event
//!
//! ## Usage
//!
//! ```rust,ignore
//! let session = DebugSession::with_clock(&clock);
//! session.add_breakpoint_json(&json!({"eventType": "died", "any": true}), Some("deaths"))?;
//!
//! // elsewhere, once `session.is_paused()`
//! for line in session.list() {
//!     println!("{}", line);
//! }
//! session.run()?;
//! ```

mod breakpoint;
mod session;
mod trace;

pub use breakpoint::*;
pub use session::*;
pub use trace::*;
