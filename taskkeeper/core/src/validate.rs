use thiserror::Error;

/// The first rule an inbound document violated.
///
/// Carries the offending field and the rule it was expected to satisfy, so
/// callers can pick a response without parsing the message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} field required as {rule}")]
pub struct ValidationError {
    field: &'static str,
    rule: &'static str,
}

impl ValidationError {
    pub const fn new(field: &'static str, rule: &'static str) -> Self {
        Self { field, rule }
    }

    /// Name of the field that failed validation.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// The rule the field was expected to satisfy.
    pub fn rule(&self) -> &'static str {
        self.rule
    }
}

/// Rejects `None` and empty strings.
pub(crate) fn require_non_empty(
    field: &'static str,
    value: Option<&str>,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(ValidationError::new(field, "non-empty string")),
    }
}

/// Rejects a present-but-empty string. Absent values pass.
pub(crate) fn reject_empty(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some("") => Err(ValidationError::new(field, "non-empty string")),
        _ => Ok(()),
    }
}
