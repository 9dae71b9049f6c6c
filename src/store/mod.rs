//! Persistence seam for users and tasks.
//!
//! The managers only talk to these traits. `postgres` holds the `sqlx` implementation used
//! by the server; `memory` holds a lock-guarded in-process implementation for tests and for
//! embedding the crate without a database.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::fmt;

use crate::models::{NewTask, NewUser, Task, TaskChanges, User, UserChanges};

pub use memory::{InMemoryTaskStore, InMemoryUserStore};
pub use postgres::{PgTaskStore, PgUserStore};

/// Typed outcome of a failed store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A write would duplicate a value in a unique column.
    UniqueViolation { fields: Vec<String> },
    /// The record targeted by an update or delete does not exist.
    RecordNotFound,
    /// Anything else the backend reported.
    Other(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::UniqueViolation { fields } => {
                write!(f, "unique constraint failed on {}", fields.join(", "))
            }
            StoreError::RecordNotFound => write!(f, "record not found"),
            StoreError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Applies `changes` and returns the updated row, or `RecordNotFound`.
    async fn update(&self, id: i32, changes: UserChanges) -> StoreResult<User>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: NewTask) -> StoreResult<Task>;

    /// Every task, oldest first.
    async fn find_all(&self) -> StoreResult<Vec<Task>>;

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Task>>;

    /// Applies `changes` and returns the updated row, or `RecordNotFound`.
    async fn update(&self, id: i32, changes: TaskChanges) -> StoreResult<Task>;

    /// Removes the task, or returns `RecordNotFound`.
    async fn delete(&self, id: i32) -> StoreResult<()>;
}
