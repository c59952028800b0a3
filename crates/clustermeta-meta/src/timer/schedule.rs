//! Timer schedules
//!
//! Schedules are validated once, when built. Nothing here evaluates a
//! schedule: deciding when a timer fires belongs to the timer service.

use clustermeta_common::{Error, Result, Timestamp, truncate_millis};
use std::time::Duration;

/// Calendar-based schedule with the EJB field defaults
/// (`0 0 0 * * * *`: every day at midnight)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScheduleExpression {
    pub(crate) second: String,
    pub(crate) minute: String,
    pub(crate) hour: String,
    pub(crate) day_of_month: String,
    pub(crate) month: String,
    pub(crate) day_of_week: String,
    pub(crate) year: String,
    pub(crate) zone_id: Option<String>,
    pub(crate) start: Option<Timestamp>,
    pub(crate) end: Option<Timestamp>,
}

impl ScheduleExpression {
    /// Start building an expression from the defaults
    #[must_use]
    pub fn builder() -> ScheduleExpressionBuilder {
        ScheduleExpressionBuilder::default()
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn minute(&self) -> &str {
        &self.minute
    }

    pub fn hour(&self) -> &str {
        &self.hour
    }

    pub fn day_of_month(&self) -> &str {
        &self.day_of_month
    }

    pub fn month(&self) -> &str {
        &self.month
    }

    pub fn day_of_week(&self) -> &str {
        &self.day_of_week
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    /// Time zone the fields are evaluated in; `None` means the server's
    pub fn zone_id(&self) -> Option<&str> {
        self.zone_id.as_deref()
    }

    /// No expiration before this instant
    pub const fn start(&self) -> Option<Timestamp> {
        self.start
    }

    /// No expiration after this instant
    pub const fn end(&self) -> Option<Timestamp> {
        self.end
    }

    /// Re-check every field, e.g. after decoding
    pub(crate) fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("second", &self.second),
            ("minute", &self.minute),
            ("hour", &self.hour),
            ("day_of_month", &self.day_of_month),
            ("month", &self.month),
            ("day_of_week", &self.day_of_week),
            ("year", &self.year),
        ] {
            validate_field(name, value)?;
        }
        if let Some(zone) = &self.zone_id {
            if zone.trim().is_empty() {
                return Err(Error::invalid_schedule("zone id is blank"));
            }
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(Error::invalid_schedule(format!("start {start} is after end {end}")));
            }
        }
        Ok(())
    }
}

impl Default for ScheduleExpression {
    fn default() -> Self {
        Self {
            second: "0".into(),
            minute: "0".into(),
            hour: "0".into(),
            day_of_month: "*".into(),
            month: "*".into(),
            day_of_week: "*".into(),
            year: "*".into(),
            zone_id: None,
            start: None,
            end: None,
        }
    }
}

fn validate_field(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_schedule(format!("{name} is empty")));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '*' | ',' | '/' | '-' | ' ');
    if let Some(bad) = value.chars().find(|&c| !allowed(c)) {
        return Err(Error::invalid_schedule(format!(
            "{name} '{value}' contains '{bad}'"
        )));
    }
    Ok(())
}

/// Builder for [`ScheduleExpression`]; [`build`](Self::build) validates
#[derive(Clone, Debug, Default)]
pub struct ScheduleExpressionBuilder {
    expression: ScheduleExpression,
}

impl ScheduleExpressionBuilder {
    #[must_use]
    pub fn second(mut self, value: impl Into<String>) -> Self {
        self.expression.second = value.into();
        self
    }

    #[must_use]
    pub fn minute(mut self, value: impl Into<String>) -> Self {
        self.expression.minute = value.into();
        self
    }

    #[must_use]
    pub fn hour(mut self, value: impl Into<String>) -> Self {
        self.expression.hour = value.into();
        self
    }

    #[must_use]
    pub fn day_of_month(mut self, value: impl Into<String>) -> Self {
        self.expression.day_of_month = value.into();
        self
    }

    #[must_use]
    pub fn month(mut self, value: impl Into<String>) -> Self {
        self.expression.month = value.into();
        self
    }

    #[must_use]
    pub fn day_of_week(mut self, value: impl Into<String>) -> Self {
        self.expression.day_of_week = value.into();
        self
    }

    #[must_use]
    pub fn year(mut self, value: impl Into<String>) -> Self {
        self.expression.year = value.into();
        self
    }

    #[must_use]
    pub fn zone_id(mut self, value: impl Into<String>) -> Self {
        self.expression.zone_id = Some(value.into());
        self
    }

    #[must_use]
    pub fn start(mut self, start: Timestamp) -> Self {
        self.expression.start = Some(start);
        self
    }

    #[must_use]
    pub fn end(mut self, end: Timestamp) -> Self {
        self.expression.end = Some(end);
        self
    }

    /// Validate and return the expression
    pub fn build(self) -> Result<ScheduleExpression> {
        self.expression.validate()?;
        Ok(self.expression)
    }
}

/// Identifies the timeout callback a calendar timer invokes
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimeoutMatcher {
    pub(crate) declaring_class: String,
    pub(crate) method_name: String,
    pub(crate) parameter_types: Vec<String>,
}

impl TimeoutMatcher {
    pub fn new(
        declaring_class: impl Into<String>,
        method_name: impl Into<String>,
        parameter_types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        let matcher = Self {
            declaring_class: declaring_class.into(),
            method_name: method_name.into(),
            parameter_types: parameter_types.into_iter().map(Into::into).collect(),
        };
        matcher.validate()?;
        Ok(matcher)
    }

    pub fn declaring_class(&self) -> &str {
        &self.declaring_class
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn parameter_types(&self) -> &[String] {
        &self.parameter_types
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.declaring_class.trim().is_empty() || self.method_name.trim().is_empty() {
            return Err(Error::invalid_schedule("timeout matcher needs a class and a method"));
        }
        Ok(())
    }
}

/// When a timer fires
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimerSchedule {
    /// Fires once at creation + initial expiration, then every `interval`
    /// if one is set (a single-action timer has none)
    Interval { interval: Option<Duration> },
    /// Fires on the calendar `expression`. Without a matcher the bean's
    /// default timeout callback is invoked.
    Calendar {
        expression: ScheduleExpression,
        timeout_matcher: Option<TimeoutMatcher>,
    },
}

impl TimerSchedule {
    /// Timer that fires once
    #[must_use]
    pub const fn single_action() -> Self {
        Self::Interval { interval: None }
    }

    /// Timer that repeats every `interval` (millisecond precision)
    pub fn interval(interval: Duration) -> Result<Self> {
        let interval = truncate_millis(interval);
        if interval.is_zero() {
            return Err(Error::invalid_schedule("interval must be at least 1ms"));
        }
        Ok(Self::Interval {
            interval: Some(interval),
        })
    }

    /// Calendar timer
    #[must_use]
    pub const fn calendar(
        expression: ScheduleExpression,
        timeout_matcher: Option<TimeoutMatcher>,
    ) -> Self {
        Self::Calendar {
            expression,
            timeout_matcher,
        }
    }

    pub const fn is_calendar(&self) -> bool {
        matches!(self, Self::Calendar { .. })
    }

    /// Repeat interval of an interval timer
    pub const fn interval_duration(&self) -> Option<Duration> {
        match self {
            Self::Interval { interval } => *interval,
            Self::Calendar { .. } => None,
        }
    }
}
