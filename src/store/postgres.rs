use async_trait::async_trait;
use sqlx::PgPool;

use super::{StoreError, StoreResult, TaskStore, UserStore};
use crate::models::{NewTask, NewUser, Task, TaskChanges, User, UserChanges};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, picture, is_active, lang, \
     is_dark_mode, is_promotional_emails, created_at, updated_at";

const TASK_COLUMNS: &str = "id, title, category, description, status, start_at, end_at, \
     user_id, created_at, updated_at";

/// Derives the column name from a constraint named `<table>_<column>_key`.
fn field_from_constraint(constraint: &str) -> String {
    let trimmed = constraint.strip_suffix("_key").unwrap_or(constraint);
    match trimmed.split_once('_') {
        Some((_, field)) if !field.is_empty() => field.to_string(),
        _ => trimmed.to_string(),
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::RecordNotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let fields = db_err
                    .constraint()
                    .map(field_from_constraint)
                    .into_iter()
                    .collect();
                StoreError::UniqueViolation { fields }
            }
            other => StoreError::Other(other.to_string()),
        }
    }
}

/// `UserStore` backed by the `users` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, full_name, picture, is_active, lang, \
             is_dark_mode, is_promotional_emails) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.full_name)
            .bind(user.picture)
            .bind(user.is_active)
            .bind(user.lang)
            .bind(user.is_dark_mode)
            .bind(user.is_promotional_emails)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update(&self, id: i32, changes: UserChanges) -> StoreResult<User> {
        // COALESCE keeps the stored value for every column left as NULL.
        let sql = format!(
            "UPDATE users SET \
             email = COALESCE($2, email), \
             password_hash = COALESCE($3, password_hash), \
             full_name = COALESCE($4, full_name), \
             picture = COALESCE($5, picture), \
             is_active = COALESCE($6, is_active), \
             lang = COALESCE($7, lang), \
             is_dark_mode = COALESCE($8, is_dark_mode), \
             is_promotional_emails = COALESCE($9, is_promotional_emails), \
             updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.full_name)
            .bind(changes.picture)
            .bind(changes.is_active)
            .bind(changes.lang)
            .bind(changes.is_dark_mode)
            .bind(changes.is_promotional_emails)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }
}

/// `TaskStore` backed by the `tasks` table.
#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn insert(&self, task: NewTask) -> StoreResult<Task> {
        let sql = format!(
            "INSERT INTO tasks (title, category, description, status, start_at, end_at, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {}",
            TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, Task>(&sql)
            .bind(task.title)
            .bind(task.category)
            .bind(task.description)
            .bind(task.status)
            .bind(task.start)
            .bind(task.end)
            .bind(task.user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_all(&self) -> StoreResult<Vec<Task>> {
        let sql = format!("SELECT {} FROM tasks ORDER BY id", TASK_COLUMNS);
        let rows = sqlx::query_as::<_, Task>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let row = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update(&self, id: i32, changes: TaskChanges) -> StoreResult<Task> {
        let sql = format!(
            "UPDATE tasks SET \
             title = COALESCE($2, title), \
             category = COALESCE($3, category), \
             description = COALESCE($4, description), \
             status = COALESCE($5, status), \
             start_at = COALESCE($6, start_at), \
             end_at = COALESCE($7, end_at), \
             updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.category)
            .bind(changes.description)
            .bind(changes.status)
            .bind(changes.start)
            .bind(changes.end)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RecordNotFound);
        }
        Ok(())
    }
}
