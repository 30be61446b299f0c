use sea_orm::*;
use std::sync::Arc;
use taskkeeper_core::{NewTask, Task, TaskPatch, TaskQuery};
use uuid::Uuid;

use crate::entities::task;
use crate::store::{StoreError, ensure_live};

pub mod api;

/// State shared by the task handlers.
#[derive(Clone)]
pub struct TaskState {
    pub db: Arc<DatabaseConnection>,
}

/// Translates a task query into a conjunctive `WHERE` clause.
fn condition(query: &TaskQuery) -> Condition {
    Condition::all()
        .add_option(query.user_id.map(|id| task::Column::UserId.eq(id)))
        .add_option(query.task_id.map(|id| task::Column::Id.eq(id)))
        .add_option(query.finish_from.map(|from| task::Column::Finish.gte(from)))
        .add_option(query.start_to.map(|to| task::Column::Start.lte(to)))
}

/// Data access for the `tasks` table.
pub struct TaskStore<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TaskStore<'a> {
    /// Checks the connection is alive and returns a store bound to it.
    pub async fn open(db: &'a DatabaseConnection) -> Result<TaskStore<'a>, StoreError> {
        ensure_live(db).await?;
        Ok(TaskStore { db })
    }

    /// Inserts a task with a fresh id.
    ///
    /// The owner must already be set; its absence is a validation error
    /// raised before the database is touched.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, new_task: NewTask) -> Result<Task, StoreError> {
        new_task.validate()?;
        let range = new_task.time_range();
        let active_model = task::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(new_task.user_id.unwrap_or_default()),
            title: ActiveValue::Set(new_task.title),
            description: ActiveValue::Set(new_task.description),
            start: ActiveValue::Set(range.start.unwrap_or_default()),
            finish: ActiveValue::Set(range.finish.unwrap_or_default()),
        };
        let created = active_model.insert(self.db).await?;
        tracing::info!("Created task {} for user {}", created.id, created.user_id);
        Ok(Task::from(created))
    }

    /// Returns every task matching `query`, earliest start first.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let tasks = task::Entity::find()
            .filter(condition(query))
            .order_by_asc(task::Column::Start)
            .all(self.db)
            .await?;
        Ok(tasks.into_iter().map(Task::from).collect())
    }

    /// Returns the single task matching `query`.
    #[tracing::instrument(skip(self))]
    pub async fn get_task(&self, query: &TaskQuery) -> Result<Task, StoreError> {
        task::Entity::find()
            .filter(condition(query))
            .one(self.db)
            .await?
            .map(Task::from)
            .ok_or(StoreError::NotFound("task"))
    }

    /// Merge-updates the present fields of `patch`.
    ///
    /// The merged task is re-validated inside the transaction, so a patch
    /// that only moves one bound cannot leave `start > finish` behind.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> Result<Task, StoreError> {
        let txn = self.db.begin().await?;
        let current = task::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .map(Task::from)
            .ok_or(StoreError::NotFound("task"))?;

        let merged = Task {
            title: patch.title.clone().unwrap_or(current.title),
            description: patch.description.clone().unwrap_or(current.description),
            start: patch.start.unwrap_or(current.start),
            finish: patch.finish.unwrap_or(current.finish),
            ..current
        };
        // Dropping the transaction on error rolls it back.
        merged.validate()?;

        let mut active_model = task::ActiveModel {
            id: ActiveValue::Unchanged(id),
            ..Default::default()
        };
        if let Some(title) = &patch.title {
            active_model.title = ActiveValue::Set(title.clone());
        }
        if let Some(description) = &patch.description {
            active_model.description = ActiveValue::Set(description.clone());
        }
        if let Some(start) = patch.start {
            active_model.start = ActiveValue::Set(start);
        }
        if let Some(finish) = patch.finish {
            active_model.finish = ActiveValue::Set(finish);
        }
        if !active_model.is_changed() {
            txn.commit().await?;
            return Ok(merged);
        }

        let updated = active_model
            .update(&txn)
            .await
            .map_err(StoreError::missing_as("task"))?;
        txn.commit().await?;
        Ok(Task::from(updated))
    }

    /// Removes a task and returns it as it was before removal.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: Uuid) -> Result<Task, StoreError> {
        let deleted = self.get_task(&TaskQuery::by_id(id)).await?;
        let result = task::Entity::delete_by_id(id).exec(self.db).await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound("task"));
        }
        tracing::info!("Deleted task {}", id);
        Ok(deleted)
    }

    /// Removes every task owned by `user_id` and returns how many went.
    #[tracing::instrument(skip(self))]
    pub async fn delete_tasks_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = task::Entity::delete_many()
            .filter(task::Column::UserId.eq(user_id))
            .exec(self.db)
            .await?;
        tracing::info!("Deleted {} tasks of user {}", result.rows_affected, user_id);
        Ok(result.rows_affected)
    }
}
