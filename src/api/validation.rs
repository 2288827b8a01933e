//! Request validation. Runs before any adapter is called; the check order is
//! fixed so the same bad input always produces the same error.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::AppError;
use crate::models::*;

const REQUIRED_FIELDS: [&str; 4] = ["description", "dueDate", "priority", "status"];

/// Query string for `GET /todos`.
#[derive(Debug, Default, Deserialize)]
pub struct ListTodosQuery {
    pub sort: Option<String>,
    pub direction: Option<String>,
}

/// Unwraps a JSON body, requiring a top-level object.
pub fn body_object(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Map<String, Value>, AppError> {
    match body {
        Ok(Json(Value::Object(map))) => Ok(map),
        Ok(Json(other)) => Err(AppError::validation(
            "Request body must be a JSON object",
            json!({ "received": other }),
        )),
        Err(rejection) => Err(AppError::validation(
            "Invalid JSON body",
            json!({ "reason": rejection.body_text() }),
        )),
    }
}

/// Missing in the loose sense: absent, null, empty string, `false` or zero.
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

/// Supplied for a partial update: present and not null.
fn supplied<'a>(body: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    body.get(field).filter(|v| !v.is_null())
}

fn parse_priority(value: &Value) -> Result<Priority, AppError> {
    value
        .as_str()
        .and_then(Priority::from_str)
        .ok_or_else(|| {
            AppError::validation(
                "Invalid priority value",
                json!({ "valid": Priority::VALID, "received": value }),
            )
        })
}

fn parse_status(value: &Value) -> Result<Status, AppError> {
    value.as_str().and_then(Status::from_str).ok_or_else(|| {
        AppError::validation(
            "Invalid status value",
            json!({ "valid": Status::VALID, "received": value }),
        )
    })
}

/// Parses and canonicalizes a due date.
fn parse_due_date(value: &Value) -> Result<String, AppError> {
    value
        .as_str()
        .and_then(parse_timestamp)
        .map(to_canonical)
        .ok_or_else(|| {
            AppError::validation(
                "Invalid due date format",
                json!({
                    "hint": "Please provide a valid ISO 8601 date string",
                    "received": value,
                }),
            )
        })
}

fn parse_description(value: &Value) -> Result<String, AppError> {
    match value {
        Value::String(s) if s.is_empty() => Err(AppError::validation(
            "Description cannot be empty",
            json!({ "received": value }),
        )),
        Value::String(s) => Ok(s.clone()),
        other => Err(AppError::validation(
            "Description must be a string",
            json!({ "received": other }),
        )),
    }
}

/// Required fields, then priority, status, due date.
pub fn create_input(body: &Map<String, Value>) -> Result<CreateTodoInput, AppError> {
    if REQUIRED_FIELDS.iter().any(|f| is_blank(body.get(*f))) {
        return Err(AppError::validation(
            "Missing required fields",
            json!({
                "required": REQUIRED_FIELDS,
                "received": body.keys().collect::<Vec<_>>(),
            }),
        ));
    }

    let priority = parse_priority(&body["priority"])?;
    let status = parse_status(&body["status"])?;
    let due_date = parse_due_date(&body["dueDate"])?;
    let description = parse_description(&body["description"])?;

    Ok(CreateTodoInput {
        description,
        due_date,
        priority,
        status,
    })
}

/// Same checks as create, applied only to supplied fields.
pub fn update_input(body: &Map<String, Value>) -> Result<UpdateTodoInput, AppError> {
    let priority = supplied(body, "priority").map(parse_priority).transpose()?;
    let status = supplied(body, "status").map(parse_status).transpose()?;
    let due_date = supplied(body, "dueDate").map(parse_due_date).transpose()?;
    let description = supplied(body, "description").map(parse_description).transpose()?;

    Ok(UpdateTodoInput {
        description,
        due_date,
        priority,
        status,
    })
}

pub fn sort_order(
    query: &ListTodosQuery,
) -> Result<Option<(SortField, SortDirection)>, AppError> {
    let direction = match query.direction.as_deref() {
        None => SortDirection::default(),
        Some(raw) => SortDirection::from_str(raw).ok_or_else(|| {
            AppError::validation(
                "Invalid sort direction",
                json!({ "valid": SortDirection::VALID, "received": raw }),
            )
        })?,
    };

    let Some(raw) = query.sort.as_deref() else {
        return Ok(None);
    };
    let field = SortField::from_str(raw).ok_or_else(|| {
        AppError::validation(
            "Invalid sort field",
            json!({ "valid": SortField::VALID, "received": raw }),
        )
    })?;

    Ok(Some((field, direction)))
}
