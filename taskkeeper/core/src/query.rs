use uuid::Uuid;

use crate::validate::ValidationError;

/// Conjunctive task filter. Absent parts do not constrain the result.
///
/// The time bounds implement interval overlap: a task `[start, finish]`
/// matches the window `[from, to]` iff `start <= to` and `finish >= from`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub user_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    /// `finish >= from`
    pub finish_from: Option<i64>,
    /// `start <= to`
    pub start_to: Option<i64>,
}

impl TaskQuery {
    /// Query for exactly one task, regardless of owner.
    pub fn by_id(task_id: Uuid) -> Self {
        Self {
            task_id: Some(task_id),
            ..Default::default()
        }
    }
}

/// Builds a task query from request-scoped filters.
///
/// Identities must already be parsed by the caller. `from` and `to` are raw
/// query-string values; an empty string means the bound is absent.
pub fn build_task_query(
    user_id: Option<Uuid>,
    task_id: Option<Uuid>,
    from: &str,
    to: &str,
) -> Result<TaskQuery, ValidationError> {
    Ok(TaskQuery {
        user_id,
        task_id,
        finish_from: parse_bound("from", from)?,
        start_to: parse_bound("to", to)?,
    })
}

fn parse_bound(field: &'static str, raw: &str) -> Result<Option<i64>, ValidationError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| ValidationError::new(field, "int"))
}
