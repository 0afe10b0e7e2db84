//! Breakpoints.
//!
//! A breakpoint is an allow filter with extra trigger state: an optional
//! `count` threshold (trigger on every Nth match), `once` (disable after the
//! first trigger), `every` (match unconditionally) and `disabled`.
//!
//! The rendered form is consumed by debugger front ends and must stay
//! stable:
//!
//! ```text
//! <name>: "<scope>::<k1:v1,k2:v2,...>"[ (<current>/<count>)][ [<flags>]]
//! ```

use serde_json::Value;
use std::fmt;

use crate::error::FilterError;
use crate::event_bus::{EventFilter, EventView, FilterCriteria};

/// Filter criteria plus breakpoint control keys
#[derive(Debug, Clone, Default)]
pub struct BreakpointCriteria {
    /// Matching criteria, ignored when `every` is set.
    pub filter: FilterCriteria,
    /// Trigger on every Nth match.
    pub count: Option<u32>,
    /// Disable after the first trigger.
    pub once: bool,
    /// Match every event.
    pub every: bool,
    /// Start disabled.
    pub disabled: bool,
}

impl BreakpointCriteria {
    /// Break on events matching `filter`
    pub fn new(filter: FilterCriteria) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Break on every event
    pub fn every() -> Self {
        Self {
            every: true,
            ..Self::default()
        }
    }

    /// Trigger on every `n`th match
    pub fn count(mut self, n: u32) -> Self {
        self.count = Some(n);
        self
    }

    /// Disable after the first trigger
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Register disabled
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Decode criteria such as `{"eventType": "died", "any": true, "count": 3}`
    ///
    /// Control keys are extracted first; the remainder is decoded as
    /// [`FilterCriteria`].
    pub fn from_json(value: &Value) -> Result<Self, FilterError> {
        let mut map = value
            .as_object()
            .cloned()
            .ok_or_else(|| FilterError::Malformed {
                reason: "breakpoint criteria must be a JSON object".to_string(),
            })?;

        let count = match map.remove("count") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let n = value
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| FilterError::Malformed {
                        reason: format!("count must be a positive integer, got {}", value),
                    })?;
                Some(n)
            }
        };
        let once = take_flag(&mut map, "once")?;
        let every = take_flag(&mut map, "every")?;
        let disabled = take_flag(&mut map, "disabled")?;
        let filter = FilterCriteria::from_map(&map)?;

        Ok(Self {
            filter,
            count,
            once,
            every,
            disabled,
        })
    }
}

fn take_flag(map: &mut serde_json::Map<String, Value>, key: &str) -> Result<bool, FilterError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(flag),
        Some(other) => Err(FilterError::Malformed {
            reason: format!("{} must be a boolean, got {}", key, other),
        }),
    }
}

/// A named, stateful filter that can suspend dispatch
#[derive(Debug, Clone)]
pub struct Breakpoint {
    name: String,
    criteria: FilterCriteria,
    filter: Option<EventFilter>,
    count: Option<u32>,
    current_count: u32,
    once: bool,
    every: bool,
    disabled: bool,
}

impl Breakpoint {
    /// Compile a breakpoint
    ///
    /// With `every` set the criteria are kept for display only and are not
    /// compiled.
    pub fn new(name: impl Into<String>, criteria: BreakpointCriteria) -> Result<Self, FilterError> {
        if criteria.count == Some(0) {
            return Err(FilterError::InvalidCount);
        }
        let filter = if criteria.every {
            None
        } else {
            Some(EventFilter::allow(criteria.filter.clone())?)
        };

        Ok(Self {
            name: name.into(),
            criteria: criteria.filter,
            filter,
            count: criteria.count,
            current_count: 0,
            once: criteria.once,
            every: criteria.every,
            disabled: criteria.disabled,
        })
    }

    /// Display label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trigger threshold
    pub fn count(&self) -> Option<u32> {
        self.count
    }

    /// Matches seen since the last trigger
    pub fn current_count(&self) -> u32 {
        self.current_count
    }

    /// Disables itself after the first trigger
    pub fn is_once(&self) -> bool {
        self.once
    }

    /// Matches unconditionally
    pub fn is_every(&self) -> bool {
        self.every
    }

    /// Currently ignored by the gate
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Stop matching without removing the breakpoint
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    /// Resume matching
    pub fn enable(&mut self) {
        self.disabled = false;
    }

    /// Check whether this breakpoint triggers on `event`
    ///
    /// With a `count` threshold, every predicate match advances the counter
    /// and only the Nth reports true, after which the counter restarts.
    pub fn match_event(&mut self, event: &dyn EventView) -> bool {
        if self.disabled {
            return false;
        }
        if self.every {
            return true;
        }
        let matched = self
            .filter
            .as_ref()
            .is_some_and(|filter| filter.match_event(event));
        if !matched {
            return false;
        }

        match self.count {
            None => true,
            Some(threshold) => {
                self.current_count += 1;
                if self.current_count >= threshold {
                    self.current_count = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn scope(&self) -> String {
        if self.every {
            return "*".to_string();
        }
        match self.criteria.combinator() {
            Some(combinator) => combinator.to_string(),
            None => "<unknown>".to_string(),
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: \"{}::{}\"",
            self.name,
            self.scope(),
            self.criteria.describe_tests().join(",")
        )?;
        if let Some(count) = self.count {
            write!(f, " ({}/{})", self.current_count, count)?;
        }
        let flags: Vec<&str> = [(self.disabled, "disabled"), (self.once, "once")]
            .into_iter()
            .filter_map(|(set, flag)| set.then_some(flag))
            .collect();
        if !flags.is_empty() {
            write!(f, " [{}]", flags.join(","))?;
        }
        Ok(())
    }
}
