use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use uuid::Uuid;

use super::{build_update_expression, new_todo, TodoStore};
use crate::error::{AppError, BackendError};
use crate::models::*;

type Item = HashMap<String, AttributeValue>;

const FALLBACK_MESSAGE: &str = "Database operation failed";

const CONDITION_FAILED: &str = "ConditionalCheckFailedException";

/// Record store backed by a DynamoDB table keyed on `id`.
#[derive(Clone)]
pub struct DynamoTodoStore {
    client: Client,
    table_name: String,
}

impl DynamoTodoStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    fn backend_error<E>(&self, operation: &str, err: &E) -> AppError
    where
        E: ProvideErrorMetadata + std::error::Error,
    {
        let normalized = BackendError::from_aws(err, FALLBACK_MESSAGE);
        tracing::error!(
            table = %self.table_name,
            operation,
            code = %normalized.code,
            "DynamoDB error: {}",
            normalized.message
        );
        AppError::Store(normalized)
    }
}

/// True when the service rejected a write because its condition expression
/// did not hold. Transport failures never count.
fn is_condition_failed<E, R>(err: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata,
{
    err.as_service_error().and_then(|e| e.code()) == Some(CONDITION_FAILED)
}

fn key(id: &str) -> AttributeValue {
    AttributeValue::S(id.to_string())
}

fn to_item(todo: &TodoItem) -> Item {
    HashMap::from([
        ("id".to_string(), AttributeValue::S(todo.id.clone())),
        ("description".to_string(), AttributeValue::S(todo.description.clone())),
        ("dueDate".to_string(), AttributeValue::S(todo.due_date.clone())),
        ("priority".to_string(), AttributeValue::S(todo.priority.as_str().to_string())),
        ("status".to_string(), AttributeValue::S(todo.status.as_str().to_string())),
        ("createdAt".to_string(), AttributeValue::S(todo.created_at.clone())),
        ("updatedAt".to_string(), AttributeValue::S(todo.updated_at.clone())),
    ])
}

fn from_item(item: &Item) -> Result<TodoItem, AppError> {
    let id_value = string_attr(item, "id", None)?;
    let id = Some(id_value.as_str());

    let priority_raw = string_attr(item, "priority", id)?;
    let priority = Priority::from_str(&priority_raw)
        .ok_or_else(|| malformed(id, "priority", Some(&priority_raw)))?;

    let status_raw = string_attr(item, "status", id)?;
    let status =
        Status::from_str(&status_raw).ok_or_else(|| malformed(id, "status", Some(&status_raw)))?;

    Ok(TodoItem {
        id: id_value.clone(),
        description: string_attr(item, "description", id)?,
        due_date: string_attr(item, "dueDate", id)?,
        priority,
        status,
        created_at: string_attr(item, "createdAt", id)?,
        updated_at: string_attr(item, "updatedAt", id)?,
    })
}

fn string_attr(item: &Item, name: &str, id: Option<&str>) -> Result<String, AppError> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or_else(|| malformed(id, name, None))
}

fn malformed(id: Option<&str>, attribute: &str, value: Option<&str>) -> AppError {
    AppError::Store(
        BackendError::new(
            "MALFORMED_ITEM",
            format!("Stored item has a missing or invalid '{attribute}' attribute"),
        )
        .with_details(serde_json::json!({
            "id": id,
            "attribute": attribute,
            "value": value,
        })),
    )
}

#[async_trait]
impl TodoStore for DynamoTodoStore {
    async fn list_all(&self) -> Result<Vec<TodoItem>, AppError> {
        let mut todos = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| self.backend_error("scan", &e))?;

            for item in output.items() {
                todos.push(from_item(item)?);
            }

            match output.last_evaluated_key() {
                Some(last) if !last.is_empty() => start_key = Some(last.clone()),
                _ => break,
            }
        }

        Ok(todos)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<TodoItem>, AppError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", key(id))
            .send()
            .await
            .map_err(|e| self.backend_error("get_item", &e))?;

        output.item().map(from_item).transpose()
    }

    async fn create(&self, input: CreateTodoInput) -> Result<TodoItem, AppError> {
        let todo = new_todo(Uuid::new_v4().to_string(), input, now_canonical());

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(&todo)))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await
            .map_err(|e| self.backend_error("put_item", &e))?;

        Ok(todo)
    }

    async fn update(
        &self,
        id: &str,
        input: UpdateTodoInput,
    ) -> Result<Option<TodoItem>, AppError> {
        let update = build_update_expression(&input, &now_canonical());
        let values = update
            .values
            .into_iter()
            .map(|(placeholder, value)| (placeholder, AttributeValue::S(value)))
            .collect();

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("id", key(id))
            .update_expression(update.expression)
            .set_expression_attribute_names(Some(update.names))
            .set_expression_attribute_values(Some(values))
            .condition_expression("attribute_exists(id)")
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => output.attributes().map(from_item).transpose(),
            Err(err) if is_condition_failed(&err) => Ok(None),
            Err(err) => Err(self.backend_error("update_item", &err)),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("id", key(id))
            .condition_expression("attribute_exists(id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) if is_condition_failed(&err) => Ok(false),
            Err(err) => Err(self.backend_error("delete_item", &err)),
        }
    }
}
