use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use super::{new_todo, TodoStore};
use crate::error::{AppError, BackendError};
use crate::models::*;

/// In-process record store with the same conditional-write semantics as the
/// DynamoDB table. Used for tests and `serve --in-memory`.
#[derive(Clone, Default)]
pub struct MemoryTodoStore {
    items: Arc<Mutex<Vec<TodoItem>>>,
}

impl MemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, bypassing id generation and timestamps.
    pub fn insert(&self, todo: TodoItem) -> Result<(), AppError> {
        let mut items = self.items.lock().expect("record store lock poisoned");
        if items.iter().any(|t| t.id == todo.id) {
            return Err(condition_failed());
        }
        items.push(todo);
        Ok(())
    }
}

fn condition_failed() -> AppError {
    AppError::Store(BackendError::new(
        "ConditionalCheckFailedException",
        "The conditional request failed",
    ))
}

#[async_trait]
impl TodoStore for MemoryTodoStore {
    async fn list_all(&self) -> Result<Vec<TodoItem>, AppError> {
        let items = self.items.lock().expect("record store lock poisoned");
        Ok(items.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<TodoItem>, AppError> {
        let items = self.items.lock().expect("record store lock poisoned");
        Ok(items.iter().find(|t| t.id == id).cloned())
    }

    async fn create(&self, input: CreateTodoInput) -> Result<TodoItem, AppError> {
        let todo = new_todo(Uuid::new_v4().to_string(), input, now_canonical());
        self.insert(todo.clone())?;
        Ok(todo)
    }

    async fn update(
        &self,
        id: &str,
        input: UpdateTodoInput,
    ) -> Result<Option<TodoItem>, AppError> {
        let mut items = self.items.lock().expect("record store lock poisoned");
        let Some(todo) = items.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };

        if let Some(description) = input.description {
            todo.description = description;
        }
        if let Some(due_date) = input.due_date {
            todo.due_date = due_date;
        }
        if let Some(priority) = input.priority {
            todo.priority = priority;
        }
        if let Some(status) = input.status {
            todo.status = status;
        }
        todo.updated_at = now_canonical();

        Ok(Some(todo.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut items = self.items.lock().expect("record store lock poisoned");
        let before = items.len();
        items.retain(|t| t.id != id);
        Ok(items.len() < before)
    }
}
