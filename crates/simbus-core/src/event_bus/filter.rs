//! Event filters.
//!
//! A filter is compiled once from a declarative criteria object into a
//! closed predicate: a list of atomic attribute tests folded by one
//! combinator. Malformed criteria fail at construction, never at match time.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use super::events::EventView;
use crate::error::FilterError;

/// Priority given to filters that do not set one
pub const DEFAULT_PRIORITY: i32 = 100;

/// Criteria keys accepted by [`FilterCriteria::from_json`].
const CRITERIA_KEYS: &[&str] = &["sourceType", "sourceName", "eventType", "any", "all", "none"];

/// Whether a matching filter lets an event through or drops it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// Matching events are delivered.
    Allow,
    /// Matching events are dropped.
    Deny,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Allow => write!(f, "allow"),
            Polarity::Deny => write!(f, "deny"),
        }
    }
}

/// Rule folding the atomic tests into one result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// At least one test passes (OR).
    Any,
    /// Every test passes (AND).
    All,
    /// No test passes (NOR).
    None,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::Any => write!(f, "any"),
            Combinator::All => write!(f, "all"),
            Combinator::None => write!(f, "none"),
        }
    }
}

/// User supplied predicate, the `fn` criteria key
#[derive(Clone)]
pub struct CustomPredicate(Arc<dyn Fn(&dyn EventView) -> bool + Send + Sync>);

impl CustomPredicate {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&dyn EventView) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    fn call(&self, event: &dyn EventView) -> bool {
        (self.0)(event)
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomPredicate(..)")
    }
}

/// Declarative filter criteria
///
/// ```rust,ignore
/// let criteria = FilterCriteria::default().source_name("orc-1").all();
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    /// Exact source type to test for.
    pub source_type: Option<String>,
    /// Exact source name to test for.
    pub source_name: Option<String>,
    /// Exact event type tag to test for.
    pub event_type: Option<String>,
    /// Custom predicate, treated as one more atomic test.
    pub custom: Option<CustomPredicate>,
    /// OR combinator.
    pub any: bool,
    /// AND combinator.
    pub all: bool,
    /// NOR combinator.
    pub none: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCriteria {
    source_type: Option<String>,
    source_name: Option<String>,
    event_type: Option<String>,
    #[serde(default)]
    any: bool,
    #[serde(default)]
    all: bool,
    #[serde(default)]
    none: bool,
}

impl FilterCriteria {
    /// Test `source_type` for equality
    pub fn source_type(mut self, value: impl Into<String>) -> Self {
        self.source_type = Some(value.into());
        self
    }

    /// Test `source_name` for equality
    pub fn source_name(mut self, value: impl Into<String>) -> Self {
        self.source_name = Some(value.into());
        self
    }

    /// Test the event type tag for equality
    pub fn event_type(mut self, value: impl Into<String>) -> Self {
        self.event_type = Some(value.into());
        self
    }

    /// Add a custom predicate
    pub fn custom<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn EventView) -> bool + Send + Sync + 'static,
    {
        self.custom = Some(CustomPredicate::new(f));
        self
    }

    /// Combine with OR
    pub fn any(mut self) -> Self {
        self.any = true;
        self
    }

    /// Combine with AND
    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    /// Combine with NOR
    pub fn none(mut self) -> Self {
        self.none = true;
        self
    }

    /// Decode criteria from a JSON object such as `{"sourceName": "X", "all": true}`
    ///
    /// Unknown keys are rejected by name. The `fn` key cannot be expressed
    /// in JSON and is reported as malformed.
    pub fn from_json(value: &Value) -> Result<Self, FilterError> {
        let map = value.as_object().ok_or_else(|| FilterError::Malformed {
            reason: "criteria must be a JSON object".to_string(),
        })?;
        Self::from_map(map)
    }

    pub(crate) fn from_map(map: &Map<String, Value>) -> Result<Self, FilterError> {
        if map.contains_key("fn") {
            return Err(FilterError::Malformed {
                reason: "custom predicates cannot be decoded from JSON".to_string(),
            });
        }
        if let Some(key) = map
            .keys()
            .find(|key| !CRITERIA_KEYS.contains(&key.as_str()))
        {
            return Err(FilterError::UnknownKey { key: key.clone() });
        }

        let raw: RawCriteria = serde_json::from_value(Value::Object(map.clone())).map_err(|e| {
            FilterError::Malformed {
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            source_type: raw.source_type,
            source_name: raw.source_name,
            event_type: raw.event_type,
            custom: None,
            any: raw.any,
            all: raw.all,
            none: raw.none,
        })
    }

    /// The combinator these criteria select, if exactly one is set
    pub fn combinator(&self) -> Option<Combinator> {
        match (self.any, self.all, self.none) {
            (true, false, false) => Some(Combinator::Any),
            (false, true, false) => Some(Combinator::All),
            (false, false, true) => Some(Combinator::None),
            _ => None,
        }
    }

    /// Atomic tests as `key:value` pairs, in compile order
    pub fn describe_tests(&self) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(value) = &self.source_type {
            parts.push(format!("sourceType:{}", value));
        }
        if let Some(value) = &self.source_name {
            parts.push(format!("sourceName:{}", value));
        }
        if let Some(value) = &self.event_type {
            parts.push(format!("eventType:{}", value));
        }
        if self.custom.is_some() {
            parts.push("fn:<custom>".to_string());
        }
        parts
    }
}

#[derive(Debug, Clone)]
enum AtomicTest {
    SourceType(String),
    SourceName(String),
    EventType(String),
    Custom(CustomPredicate),
}

impl AtomicTest {
    fn test(&self, event: &dyn EventView) -> bool {
        match self {
            AtomicTest::SourceType(value) => event.source_type() == value,
            AtomicTest::SourceName(value) => event.source_name() == value,
            AtomicTest::EventType(value) => event.event_type() == value,
            AtomicTest::Custom(predicate) => predicate.call(event),
        }
    }
}

/// Compiled criteria
#[derive(Debug, Clone)]
pub struct Predicate {
    combinator: Combinator,
    tests: Vec<AtomicTest>,
}

impl Predicate {
    /// Compile criteria, validating them
    pub fn compile(criteria: &FilterCriteria) -> Result<Self, FilterError> {
        let mut tests = Vec::new();
        if let Some(value) = &criteria.source_type {
            tests.push(AtomicTest::SourceType(value.clone()));
        }
        if let Some(value) = &criteria.source_name {
            tests.push(AtomicTest::SourceName(value.clone()));
        }
        if let Some(value) = &criteria.event_type {
            tests.push(AtomicTest::EventType(value.clone()));
        }
        if let Some(predicate) = &criteria.custom {
            tests.push(AtomicTest::Custom(predicate.clone()));
        }

        let set: Vec<&str> = [
            (criteria.any, "any"),
            (criteria.all, "all"),
            (criteria.none, "none"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect();
        if set.len() > 1 {
            return Err(FilterError::MultipleCombinators {
                combinators: set.join(","),
            });
        }
        let combinator = criteria
            .combinator()
            .ok_or(FilterError::MissingCombinator)?;

        if tests.is_empty() {
            return Err(FilterError::NoCriteria);
        }

        Ok(Self { combinator, tests })
    }

    /// The folding rule
    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    /// Evaluate against an event
    pub fn evaluate(&self, event: &dyn EventView) -> bool {
        match self.combinator {
            Combinator::Any => self.tests.iter().any(|t| t.test(event)),
            Combinator::All => self.tests.iter().all(|t| t.test(event)),
            Combinator::None => !self.tests.iter().any(|t| t.test(event)),
        }
    }
}

/// A compiled allow or deny filter with a priority
#[derive(Debug, Clone)]
pub struct EventFilter {
    polarity: Polarity,
    predicate: Predicate,
    priority: i32,
    event_type: Option<String>,
}

impl EventFilter {
    /// Compile a filter from criteria
    pub fn new(polarity: Polarity, criteria: FilterCriteria) -> Result<Self, FilterError> {
        let predicate = Predicate::compile(&criteria)?;
        tracing::debug!(
            "Compiled {} filter: {}::{}",
            polarity,
            predicate.combinator(),
            criteria.describe_tests().join(",")
        );
        Ok(Self {
            polarity,
            predicate,
            priority: DEFAULT_PRIORITY,
            event_type: criteria.event_type,
        })
    }

    /// Compile an allow filter
    pub fn allow(criteria: FilterCriteria) -> Result<Self, FilterError> {
        Self::new(Polarity::Allow, criteria)
    }

    /// Compile a deny filter
    pub fn deny(criteria: FilterCriteria) -> Result<Self, FilterError> {
        Self::new(Polarity::Deny, criteria)
    }

    /// Set the priority; lower values are evaluated first
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Evaluation priority
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Allow or deny
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Combinator the criteria were folded with
    pub fn combinator(&self) -> Combinator {
        self.predicate.combinator()
    }

    /// Event type tag explicitly named by the criteria
    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    /// Run the compiled predicate
    pub fn match_event(&self, event: &dyn EventView) -> bool {
        self.predicate.evaluate(event)
    }

    /// True when this is an allow filter and it matches
    pub fn allow_event(&self, event: &dyn EventView) -> bool {
        self.polarity == Polarity::Allow && self.match_event(event)
    }

    /// True when this is a deny filter and it matches
    pub fn deny_event(&self, event: &dyn EventView) -> bool {
        self.polarity == Polarity::Deny && self.match_event(event)
    }
}
