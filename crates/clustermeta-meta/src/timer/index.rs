//! Addressing of declarative timers
//!
//! A bean method may carry several schedules; each one is a distinct timer
//! addressed by the method's signature plus the schedule's position on it.
//! Both derive from signature strings, so an index built on another node or
//! after a restart compares and encodes identically.

use clustermeta_common::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Signature of a timeout callback
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodIdentifier {
    return_type: String,
    name: String,
    parameter_types: Vec<String>,
}

/// Characters that delimit the string form
const RESERVED: [char; 4] = ['(', ')', ',', '#'];

fn validate_part(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::invalid_argument(format!("{what} is empty")));
    }
    if value.len() > usize::from(u16::MAX) {
        return Err(Error::invalid_argument(format!("{what} is too long")));
    }
    if value.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c)) {
        return Err(Error::invalid_argument(format!(
            "{what} '{value}' contains a reserved character"
        )));
    }
    Ok(())
}

impl MethodIdentifier {
    pub fn new(
        return_type: impl Into<String>,
        name: impl Into<String>,
        parameter_types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        let method = Self {
            return_type: return_type.into(),
            name: name.into(),
            parameter_types: parameter_types.into_iter().map(Into::into).collect(),
        };
        validate_part("return type", &method.return_type)?;
        validate_part("method name", &method.name)?;
        if method.parameter_types.len() > usize::from(u16::MAX) {
            return Err(Error::invalid_argument("too many parameters"));
        }
        for parameter in &method.parameter_types {
            validate_part("parameter type", parameter)?;
        }
        Ok(method)
    }

    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_types(&self) -> &[String] {
        &self.parameter_types
    }
}

impl fmt::Display for MethodIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}({})", self.return_type, self.name, self.parameter_types.join(","))
    }
}

impl FromStr for MethodIdentifier {
    type Err = Error;

    /// Parses `<return type> <name>(<p1>,<p2>)`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::invalid_argument(format!("invalid method signature '{s}'"));

        let (return_type, rest) = s.split_once(' ').ok_or_else(invalid)?;
        let (name, parameters) = rest
            .strip_suffix(')')
            .and_then(|rest| rest.split_once('('))
            .ok_or_else(invalid)?;
        let parameters: Vec<&str> = if parameters.is_empty() {
            Vec::new()
        } else {
            parameters.split(',').collect()
        };
        Self::new(return_type, name, parameters)
    }
}

/// The `occurrence`-th schedule declared on `method`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerIndex {
    method: MethodIdentifier,
    occurrence: u32,
}

impl TimerIndex {
    #[must_use]
    pub const fn new(method: MethodIdentifier, occurrence: u32) -> Self {
        Self { method, occurrence }
    }

    pub const fn method(&self) -> &MethodIdentifier {
        &self.method
    }

    pub const fn occurrence(&self) -> u32 {
        self.occurrence
    }
}

impl fmt::Display for TimerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.method, self.occurrence)
    }
}

impl FromStr for TimerIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (method, occurrence) = s
            .rsplit_once('#')
            .ok_or_else(|| {
                Error::invalid_argument(format!("timer index '{s}' has no occurrence"))
            })?;
        let occurrence = occurrence
            .parse()
            .map_err(|e| Error::invalid_argument(format!("invalid occurrence in '{s}': {e}")))?;
        Ok(Self::new(method.parse()?, occurrence))
    }
}
