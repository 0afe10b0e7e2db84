//! Event type definitions for the event bus.
//!
//! An event family is a closed enumeration of type tags. Each bus is bound
//! to exactly one family, declared with [`event_family!`](crate::event_family).
//! [`EventRecord`] is the family-erased wire shape kept by the trace and
//! consumed by debugger front ends.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::Hash;

/// A closed set of event type tags belonging to one family
pub trait EventType:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Family name, used to reject events sent to the wrong bus.
    const FAMILY: &'static str;

    /// Every tag the family allows, in declaration order.
    fn all() -> &'static [Self];

    /// The string tag for this type.
    fn as_str(&self) -> &'static str;

    /// Look up a tag by its string form.
    fn parse(tag: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.as_str() == tag)
    }
}

/// Declare an event family.
///
/// ```rust,ignore
/// simbus_core::event_family! {
///     /// Player lifecycle events
///     pub enum PlayerEvent: "player" {
///         Spawned => "spawned",
///         Died => "died",
///     }
/// }
/// ```
#[macro_export]
macro_rules! event_family {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $family:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $tag:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $crate::event_bus::EventType for $name {
            const FAMILY: &'static str = $family;

            fn all() -> &'static [Self] {
                &[ $( $name::$variant, )+ ]
            }

            fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $tag, )+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::event_bus::EventType::as_str(self))
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::error::FilterError;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                <$name as $crate::event_bus::EventType>::parse(s).ok_or_else(|| {
                    $crate::error::FilterError::UnknownEventType {
                        family: $family.to_string(),
                        event_type: s.to_string(),
                    }
                })
            }
        }
    };
}

/// Read-only view of the attributes filters match on
pub trait EventView {
    /// Name of the object that produced the event.
    fn source_name(&self) -> &str;
    /// Kind of the object that produced the event.
    fn source_type(&self) -> &str;
    /// String tag of the event type.
    fn event_type(&self) -> &str;
}

/// A typed event of family `T`
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T: EventType> {
    source_name: String,
    source_type: String,
    kind: T,
    data: Value,
}

impl<T: EventType> Event<T> {
    /// Create an event from its source identity, type and payload
    pub fn new(
        source_name: impl Into<String>,
        source_type: impl Into<String>,
        kind: T,
        data: Value,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            source_type: source_type.into(),
            kind,
            data,
        }
    }

    /// The event type
    pub fn kind(&self) -> T {
        self.kind
    }

    /// The event payload
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Family-erased copy of this event
    pub fn to_record(&self) -> EventRecord {
        EventRecord {
            source_name: self.source_name.clone(),
            source_type: self.source_type.clone(),
            event_type: self.kind.as_str().to_string(),
            data: self.data.clone(),
            family: T::FAMILY.to_string(),
        }
    }
}

impl<T: EventType> EventView for Event<T> {
    fn source_name(&self) -> &str {
        &self.source_name
    }

    fn source_type(&self) -> &str {
        &self.source_type
    }

    fn event_type(&self) -> &str {
        self.kind.as_str()
    }
}

impl<T: EventType> fmt::Display for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{} => {}", self.source_name, self.source_type, self.kind)
    }
}

/// Family-erased event in its wire shape
///
/// Serializes as `{sourceName, sourceType, type, data}`. The family is kept
/// alongside for validation but is not part of the wire shape; records
/// decoded from the wire carry an empty family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Name of the object that produced the event.
    pub source_name: String,
    /// Kind of the object that produced the event.
    pub source_type: String,
    /// String tag of the event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload.
    #[serde(default)]
    pub data: Value,
    /// Family the event belongs to, empty when unknown.
    #[serde(skip)]
    pub family: String,
}

impl EventRecord {
    /// Create a record for the given family
    pub fn new(
        family: impl Into<String>,
        source_name: impl Into<String>,
        source_type: impl Into<String>,
        event_type: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            source_type: source_type.into(),
            event_type: event_type.into(),
            data,
            family: family.into(),
        }
    }
}

impl EventView for EventRecord {
    fn source_name(&self) -> &str {
        &self.source_name
    }

    fn source_type(&self) -> &str {
        &self.source_type
    }

    fn event_type(&self) -> &str {
        &self.event_type
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{} => {}",
            self.source_name, self.source_type, self.event_type
        )
    }
}
