use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;
use crate::validate::{ValidationError, reject_empty, require_non_empty};

/// A closed interval of Unix timestamps.
///
/// Both bounds are optional so that inbound documents can be validated
/// before they are trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeRange {
    pub start: Option<i64>,
    pub finish: Option<i64>,
}

impl TimeRange {
    pub fn new(start: i64, finish: i64) -> Self {
        Self {
            start: Some(start),
            finish: Some(finish),
        }
    }

    /// Checks start, then finish, then their order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let start = match self.start {
            Some(start) if start != 0 => start,
            _ => return Err(ValidationError::new("start", "unix timestamp")),
        };
        let finish = match self.finish {
            Some(finish) if finish != 0 => finish,
            _ => return Err(ValidationError::new("finish", "unix timestamp")),
        };
        if start > finish {
            return Err(ValidationError::new("start", "less than finish"));
        }
        Ok(())
    }
}

/// Secure projection of a user. Never carries credential material.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub preferred_hours: Option<TimeRange>,
}

/// Inbound document for creating a user.
#[derive(Clone, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub preferred_hours: Option<TimeRange>,
}

impl NewUser {
    /// Checks email, username, password, then preferred hours if present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("email", self.email.as_deref())?;
        require_non_empty("username", self.username.as_deref())?;
        require_non_empty("password", self.password.as_deref())?;
        if let Some(hours) = &self.preferred_hours {
            hours.validate()?;
        }
        Ok(())
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("role", &self.role)
            .field("preferred_hours", &self.preferred_hours)
            .finish()
    }
}

/// Partial user document. Only present fields are written.
#[derive(Clone, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Current password, required when users change their own password.
    pub old_password: Option<String>,
    pub role: Option<Role>,
    pub preferred_hours: Option<TimeRange>,
}

impl UserPatch {
    /// True when the patch would not change any stored field.
    pub fn no_change(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.role.is_none()
            && self.preferred_hours.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        reject_empty("email", self.email.as_deref())?;
        reject_empty("username", self.username.as_deref())?;
        reject_empty("password", self.password.as_deref())?;
        if let Some(hours) = &self.preferred_hours {
            hours.validate()?;
        }
        Ok(())
    }
}

impl fmt::Debug for UserPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("UserPatch")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &redact(&self.password))
            .field("old_password", &redact(&self.old_password))
            .field("role", &self.role)
            .field("preferred_hours", &self.preferred_hours)
            .finish()
    }
}

/// A stored task. Exactly one owner; `start <= finish`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Task {
    pub id: Uuid,
    #[cfg_attr(feature = "serde", serde(rename = "userID"))]
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub start: i64,
    pub finish: i64,
}

impl Task {
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start, self.finish)
    }

    /// Re-checks the invariants of a stored task, e.g. after a merge-update.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("title", Some(&self.title))?;
        self.time_range().validate()
    }
}

/// Inbound document for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct NewTask {
    #[cfg_attr(feature = "serde", serde(rename = "userID"))]
    pub user_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub start: Option<i64>,
    pub finish: Option<i64>,
}

impl NewTask {
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            finish: self.finish,
        }
    }

    /// Checks owner, title, then the time range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.is_none() {
            return Err(ValidationError::new("userID", "user id"));
        }
        require_non_empty("title", Some(&self.title))?;
        self.time_range().validate()
    }
}

/// Partial task document. Time bounds are patched independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start: Option<i64>,
    pub finish: Option<i64>,
}

impl TaskPatch {
    /// True iff title, description and both bounds are all absent.
    pub fn no_change(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start.is_none()
            && self.finish.is_none()
    }
}
