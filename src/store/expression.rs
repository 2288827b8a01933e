use std::collections::HashMap;

use crate::models::UpdateTodoInput;

/// A DynamoDB `SET` expression with its placeholder maps.
///
/// Attribute names always go through `#name` placeholders; `status` is a
/// reserved word and the rest are aliased for uniformity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateExpression {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, String>,
}

impl UpdateExpression {
    fn new() -> Self {
        Self {
            expression: String::new(),
            names: HashMap::new(),
            values: HashMap::new(),
        }
    }

    fn set(&mut self, attribute: &str, value: impl Into<String>) {
        if self.expression.is_empty() {
            self.expression.push_str("SET ");
        } else {
            self.expression.push_str(", ");
        }
        self.expression
            .push_str(&format!("#{attribute} = :{attribute}"));
        self.names
            .insert(format!("#{attribute}"), attribute.to_string());
        self.values.insert(format!(":{attribute}"), value.into());
    }
}

/// Builds the update for a partial input. `updatedAt` is always set; the
/// other attributes appear only when supplied.
pub fn build_update_expression(input: &UpdateTodoInput, updated_at: &str) -> UpdateExpression {
    let mut update = UpdateExpression::new();
    update.set("updatedAt", updated_at);

    if let Some(description) = &input.description {
        update.set("description", description.as_str());
    }
    if let Some(due_date) = &input.due_date {
        update.set("dueDate", due_date.as_str());
    }
    if let Some(priority) = input.priority {
        update.set("priority", priority.as_str());
    }
    if let Some(status) = input.status {
        update.set("status", status.as_str());
    }

    update
}
