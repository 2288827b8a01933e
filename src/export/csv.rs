use crate::models::{parse_timestamp, TodoItem};

const HEADERS: [&str; 7] = [
    "ID",
    "Description",
    "Due Date",
    "Priority",
    "Status",
    "Created At",
    "Updated At",
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Serializes records to CSV: a header row, then one row per record in the
/// given order, joined with `\n` and no trailing newline.
///
/// Pure and deterministic: the same records always yield the same bytes.
pub fn generate_csv(todos: &[TodoItem]) -> String {
    let mut lines = Vec::with_capacity(todos.len() + 1);
    lines.push(HEADERS.join(","));

    for todo in todos {
        let row = [
            escape_field(&todo.id),
            escape_field(&todo.description),
            escape_field(&format_date(&todo.due_date)),
            escape_field(todo.priority.as_str()),
            escape_field(todo.status.as_str()),
            escape_field(&format_date(&todo.created_at)),
            escape_field(&format_date(&todo.updated_at)),
        ];
        lines.push(row.join(","));
    }

    lines.join("\n")
}

/// Quotes a field containing a comma, double quote or newline, doubling any
/// inner quotes. Other fields pass through untouched.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// `yyyy-MM-dd HH:mm:ss` in UTC, or the input unchanged if it does not parse.
pub fn format_date(value: &str) -> String {
    parse_timestamp(value)
        .map(|at| at.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| value.to_string())
}
