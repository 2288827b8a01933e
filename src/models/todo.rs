use serde::{Deserialize, Serialize};

/// A single tracked task.
///
/// Timestamps are kept in their canonical string form (RFC 3339, UTC,
/// millisecond precision) exactly as they are persisted. `id` and
/// `created_at` are fixed at creation; `updated_at` moves on every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: String,
    pub description: String,
    pub due_date: String,
    pub priority: Priority,
    pub status: Status,
    pub created_at: String,
    pub updated_at: String,
}

/// How urgent a task is.
///
/// Variants are declared in ascending rank so the derived `Ord` sorts
/// `Low < Medium < High`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Accepted wire values, in the order they are reported to clients.
    pub const VALID: [&'static str; 3] = ["High", "Medium", "Low"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "High" => Some(Self::High),
            "Medium" => Some(Self::Medium),
            "Low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Where a task is in its lifecycle.
///
/// - `NotStarted`: Created, no work yet
/// - `InProgress`: Being worked on
/// - `Done`: Finished
/// - `Canceled`: Dropped without completion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
    Canceled,
}

impl Status {
    pub const VALID: [&'static str; 4] = ["Not Started", "In Progress", "Done", "Canceled"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
            Self::Canceled => "Canceled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Not Started" => Some(Self::NotStarted),
            "In Progress" => Some(Self::InProgress),
            "Done" => Some(Self::Done),
            "Canceled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

/// Validated input for creating a task. `due_date` is already canonical.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoInput {
    pub description: String,
    pub due_date: String,
    pub priority: Priority,
    pub status: Status,
}

/// Validated partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoInput {
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
}

/// Fields a list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Description,
    DueDate,
    Priority,
    Status,
    CreatedAt,
}

impl SortField {
    pub const VALID: [&'static str; 5] = ["description", "dueDate", "priority", "status", "createdAt"];

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "description" => Some(Self::Description),
            "dueDate" => Some(Self::DueDate),
            "priority" => Some(Self::Priority),
            "status" => Some(Self::Status),
            "createdAt" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub const VALID: [&'static str; 2] = ["asc", "desc"];

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Orders `todos` in place. The sort is stable, so ties keep store order.
pub fn sort_todos(todos: &mut [TodoItem], field: SortField, direction: SortDirection) {
    todos.sort_by(|a, b| {
        let ordering = match field {
            SortField::Description => a.description.cmp(&b.description),
            SortField::DueDate => a.due_date.cmp(&b.due_date),
            SortField::Priority => a.priority.cmp(&b.priority),
            SortField::Status => a.status.cmp(&b.status),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}
