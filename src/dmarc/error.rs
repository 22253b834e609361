use std::fmt;

use thiserror::Error;

use super::types::{Tag, TagValue};

/// Guidance appended to every lookup failure.
pub const PUNYCODE_HINT: &str =
    "Internationalized domain names must be converted to punycode (IDNA) before querying";

/// The value a rule was checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActualValue {
    /// `None` when the tag (or its effective fallback) is unset.
    Scalar(Option<String>),
    Sequence(Vec<String>),
}

impl ActualValue {
    pub fn is_blank(&self) -> bool {
        match self {
            ActualValue::Scalar(v) => v.as_deref().map_or(true, str::is_empty),
            ActualValue::Sequence(items) => items.iter().all(String::is_empty),
        }
    }
}

impl fmt::Display for ActualValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_blank() {
            return f.write_str("blank");
        }
        match self {
            ActualValue::Scalar(v) => f.write_str(v.as_deref().unwrap_or_default()),
            ActualValue::Sequence(items) => f.write_str(&items.join(":")),
        }
    }
}

/// Constraint a tag value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// Exact, case-sensitive text.
    Literal(&'static str),
    /// One of the listed names (case-insensitive).
    OneOf(&'static [&'static str]),
    /// Decimal integer within the inclusive bounds.
    Range(u32, u32),
}

impl Expected {
    /// Whether a single raw value satisfies the constraint.
    pub fn admits(&self, value: &str) -> bool {
        match self {
            Expected::Literal(lit) => value == *lit,
            Expected::OneOf(names) => names.iter().any(|n| n.eq_ignore_ascii_case(value)),
            Expected::Range(lo, hi) => u32::from_tag(value).is_some_and(|n| (*lo..=*hi).contains(&n)),
        }
    }

    /// Whether every element of a list satisfies the constraint; empty lists never do.
    pub fn admits_all(&self, values: &[String]) -> bool {
        !values.is_empty() && values.iter().all(|v| self.admits(v))
    }

    fn describe(&self, actual: &ActualValue) -> String {
        match (self, actual) {
            (Expected::OneOf(names), ActualValue::Sequence(_)) => format!(
                "one or more colon-separated list of characters from {}",
                names.join(", ")
            ),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Literal(lit) => f.write_str(lit),
            Expected::OneOf(names) => write!(f, "one of these: {}", names.join(", ")),
            Expected::Range(lo, hi) => write!(f, "between {} and {}", lo, hi),
        }
    }
}

/// One problem found with a DMARC record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// A tag's value (or a required tag's absence) violates its rule.
    #[error("Invalid {tag} tag. Current value is {actual}. Value should be {}", .expected.describe(.actual))]
    TagViolation {
        tag: Tag,
        actual: ActualValue,
        expected: Expected,
    },
    /// The DNS lookup for the record failed; `cause` is the resolver's message.
    #[error("{cause}. {}", PUNYCODE_HINT)]
    LookupFailure { cause: String },
}

impl RecordError {
    pub fn violation(tag: Tag, actual: ActualValue, expected: Expected) -> Self {
        RecordError::TagViolation { tag, actual, expected }
    }

    pub fn lookup(cause: impl fmt::Display) -> Self {
        RecordError::LookupFailure { cause: cause.to_string() }
    }

    /// Offending tag; `None` for lookup failures.
    pub fn tag(&self) -> Option<Tag> {
        match self {
            RecordError::TagViolation { tag, .. } => Some(*tag),
            RecordError::LookupFailure { .. } => None,
        }
    }

    pub fn actual_value(&self) -> Option<&ActualValue> {
        match self {
            RecordError::TagViolation { actual, .. } => Some(actual),
            RecordError::LookupFailure { .. } => None,
        }
    }

    pub fn expected_constraint(&self) -> Option<&Expected> {
        match self {
            RecordError::TagViolation { expected, .. } => Some(expected),
            RecordError::LookupFailure { .. } => None,
        }
    }

    pub fn underlying_cause(&self) -> Option<&str> {
        match self {
            RecordError::TagViolation { .. } => None,
            RecordError::LookupFailure { cause } => Some(cause),
        }
    }
}
