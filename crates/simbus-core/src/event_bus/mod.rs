//! # Event Bus Module
//!
//! Typed publish/subscribe channels with declarative filters.
//!
//! ## Overview
//!
//! - [`EventType`] and [`event_family!`](crate::event_family) declare a closed
//!   family of event type tags
//! - [`EventBus`] binds to one family and gates every dispatch through a
//!   [`DebugSession`](crate::debugger::DebugSession)
//! - [`EventFilter`] compiles criteria into a reusable predicate
//! - [`EventListener`] subscribes a callback behind a priority-ordered
//!   filter chain
//!
//! ## Usage
//!
//! ```rust,ignore
//! use simbus_core::debugger::DebugSession;
//! use simbus_core::event_bus::{Event, EventBus, EventFilter, EventListener, FilterCriteria};
//!
//! simbus_core::event_family! {
//!     pub enum PlayerEvent: "player" {
//!         Spawned => "spawned",
//!         Died => "died",
//!     }
//! }
//!
//! let session = DebugSession::new();
//! let bus = EventBus::<PlayerEvent>::new(&session);
//!
//! let listener = EventListener::new(
//!     &bus,
//!     [EventFilter::allow(FilterCriteria::default().event_type("died").any())?],
//!     |event| {
//!         println!("{}", event);
//!         Ok(())
//!     },
//! )?;
//!
//! bus.send(Event::new("p1", "player", PlayerEvent::Died, serde_json::Value::Null)).await?;
//! ```

mod bus;
mod events;
mod filter;
mod listener;

pub use bus::*;
pub use events::*;
pub use filter::*;
pub use listener::*;
