use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{StoreError, StoreResult, TaskStore, UserStore};
use crate::models::{NewTask, NewUser, Task, TaskChanges, User, UserChanges};

struct Table<T> {
    next_id: i32,
    rows: BTreeMap<i32, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// In-process `UserStore`. Enforces the unique email constraint like the database does.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<Table<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(table: &Table<User>, email: &str, except: Option<i32>) -> bool {
    table
        .rows
        .values()
        .any(|user| user.email == email && Some(user.id) != except)
}

fn email_violation() -> StoreError {
    StoreError::UniqueViolation {
        fields: vec!["email".to_string()],
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut table = self.users.write().await;
        if email_taken(&table, &user.email, None) {
            return Err(email_violation());
        }

        let now = Utc::now();
        let row = User {
            id: table.allocate_id(),
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            picture: user.picture,
            is_active: user.is_active,
            lang: user.lang,
            is_dark_mode: user.is_dark_mode,
            is_promotional_emails: user.is_promotional_emails,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let table = self.users.read().await;
        Ok(table.rows.values().find(|user| user.email == email).cloned())
    }

    async fn update(&self, id: i32, changes: UserChanges) -> StoreResult<User> {
        let mut table = self.users.write().await;
        if let Some(email) = &changes.email {
            if email_taken(&table, email, Some(id)) {
                return Err(email_violation());
            }
        }

        let user = table.rows.get_mut(&id).ok_or(StoreError::RecordNotFound)?;
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = Some(hash);
        }
        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(picture) = changes.picture {
            user.picture = Some(picture);
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        if let Some(lang) = changes.lang {
            user.lang = lang;
        }
        if let Some(is_dark_mode) = changes.is_dark_mode {
            user.is_dark_mode = is_dark_mode;
        }
        if let Some(opt_in) = changes.is_promotional_emails {
            user.is_promotional_emails = opt_in;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

/// In-process `TaskStore`.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<Table<Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: NewTask) -> StoreResult<Task> {
        let mut table = self.tasks.write().await;
        let now = Utc::now();
        let row = Task {
            id: table.allocate_id(),
            title: task.title,
            category: task.category,
            description: task.description,
            status: task.status,
            start: task.start,
            end: task.end,
            user_id: task.user_id,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_all(&self) -> StoreResult<Vec<Task>> {
        Ok(self.tasks.read().await.rows.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Task>> {
        Ok(self.tasks.read().await.rows.get(&id).cloned())
    }

    async fn update(&self, id: i32, changes: TaskChanges) -> StoreResult<Task> {
        let mut table = self.tasks.write().await;
        let task = table.rows.get_mut(&id).ok_or(StoreError::RecordNotFound)?;
        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(category) = changes.category {
            task.category = category;
        }
        if let Some(description) = changes.description {
            task.description = Some(description);
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(start) = changes.start {
            task.start = start;
        }
        if let Some(end) = changes.end {
            task.end = end;
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let mut table = self.tasks.write().await;
        table
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RecordNotFound)
    }
}
