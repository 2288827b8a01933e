//! Record store: persistence for [`TodoItem`]s.
//!
//! Every write is a single conditional request against the `id` key:
//! create requires the id to be absent, update and delete require it to be
//! present. A failed precondition on update/delete is an ordinary "absent"
//! outcome (`None` / `false`), never an error.

mod dynamo;
mod expression;
mod memory;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::*;

pub use dynamo::DynamoTodoStore;
pub use expression::{build_update_expression, UpdateExpression};
pub use memory::MemoryTodoStore;

/// Storage interface for task records.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Every record in the table, in store order.
    async fn list_all(&self) -> Result<Vec<TodoItem>, AppError>;

    /// `Ok(None)` when no record has this id.
    async fn get_by_id(&self, id: &str) -> Result<Option<TodoItem>, AppError>;

    /// Assigns a fresh id and sets `created_at == updated_at == now`.
    async fn create(&self, input: CreateTodoInput) -> Result<TodoItem, AppError>;

    /// Replaces only the supplied fields and refreshes `updated_at`.
    /// Returns the full updated record, or `Ok(None)` if the id is absent.
    async fn update(&self, id: &str, input: UpdateTodoInput)
        -> Result<Option<TodoItem>, AppError>;

    /// `Ok(false)` if the id is absent.
    async fn delete(&self, id: &str) -> Result<bool, AppError>;
}

/// Build a new record from validated input, stamping both timestamps with
/// the same instant.
pub fn new_todo(id: String, input: CreateTodoInput, now: String) -> TodoItem {
    TodoItem {
        id,
        description: input.description,
        due_date: input.due_date,
        priority: input.priority,
        status: input.status,
        created_at: now.clone(),
        updated_at: now,
    }
}
