use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use todo_tracker::api::{create_router, ApiResponse, AppState};
use todo_tracker::config::Environment;
use todo_tracker::error::{AppError, BackendError};
use todo_tracker::export::{ExportStorage, MemoryExportStorage};
use todo_tracker::flags::{StaticFlagSource, EXPORT_QUEUE_FLAG};
use todo_tracker::models::*;
use todo_tracker::queue::{MemoryExportQueue, SqsExportQueue};
use todo_tracker::store::{MemoryTodoStore, TodoStore};

struct Harness {
    server: TestServer,
    store: MemoryTodoStore,
    storage: MemoryExportStorage,
    queue: MemoryExportQueue,
    flags: StaticFlagSource,
}

fn setup() -> Harness {
    setup_with(|state| state)
}

fn setup_with(customize: impl FnOnce(AppState) -> AppState) -> Harness {
    let store = MemoryTodoStore::new();
    let storage = MemoryExportStorage::new("todo-exports-test");
    let queue = MemoryExportQueue::new();
    let flags = StaticFlagSource::default();

    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(storage.clone()),
        Arc::new(queue.clone()),
        Arc::new(flags.clone()),
    )
    .with_environment(Environment::Test);

    let app = create_router(customize(state));
    Harness {
        server: TestServer::new(app).expect("Failed to create test server"),
        store,
        storage,
        queue,
        flags,
    }
}

fn todo_body(description: &str) -> Value {
    json!({
        "description": description,
        "dueDate": "2025-03-01T09:00:00Z",
        "priority": "Medium",
        "status": "Not Started",
    })
}

async fn create_test_todo(server: &TestServer, description: &str) -> TodoItem {
    server
        .post("/api/todos")
        .json(&todo_body(description))
        .await
        .json::<ApiResponse<TodoItem>>()
        .data
        .expect("create returned no data")
}

fn error_of(response: &axum_test::TestResponse) -> Value {
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    body["error"].clone()
}

/// Store whose every call fails like a missing DynamoDB table.
struct UnavailableStore;

fn table_missing() -> AppError {
    AppError::Store(
        BackendError::new(
            "ResourceNotFoundException",
            "Requested resource not found",
        )
        .with_details(json!({ "name": "ResourceNotFoundException" })),
    )
}

#[async_trait]
impl TodoStore for UnavailableStore {
    async fn list_all(&self) -> Result<Vec<TodoItem>, AppError> {
        Err(table_missing())
    }

    async fn get_by_id(&self, _id: &str) -> Result<Option<TodoItem>, AppError> {
        Err(table_missing())
    }

    async fn create(&self, _input: CreateTodoInput) -> Result<TodoItem, AppError> {
        Err(table_missing())
    }

    async fn update(
        &self,
        _id: &str,
        _input: UpdateTodoInput,
    ) -> Result<Option<TodoItem>, AppError> {
        Err(table_missing())
    }

    async fn delete(&self, _id: &str) -> Result<bool, AppError> {
        Err(table_missing())
    }
}

/// Store whose listing panics mid-request.
struct PanickingStore;

#[async_trait]
impl TodoStore for PanickingStore {
    async fn list_all(&self) -> Result<Vec<TodoItem>, AppError> {
        panic!("scan cursor corrupted")
    }

    async fn get_by_id(&self, _id: &str) -> Result<Option<TodoItem>, AppError> {
        Ok(None)
    }

    async fn create(&self, _input: CreateTodoInput) -> Result<TodoItem, AppError> {
        Err(table_missing())
    }

    async fn update(
        &self,
        _id: &str,
        _input: UpdateTodoInput,
    ) -> Result<Option<TodoItem>, AppError> {
        Ok(None)
    }

    async fn delete(&self, _id: &str) -> Result<bool, AppError> {
        Ok(false)
    }
}

/// Storage that rejects every upload like a missing bucket.
struct MissingBucket;

#[async_trait]
impl ExportStorage for MissingBucket {
    async fn put_csv(&self, _key: &str, _content: String) -> Result<(), AppError> {
        Err(AppError::ObjectStore(BackendError::new(
            "NoSuchBucket",
            "The specified bucket does not exist",
        )))
    }

    async fn presign_download(
        &self,
        _key: &str,
        _issued_at: DateTime<Utc>,
        _ttl: Duration,
    ) -> Result<String, AppError> {
        unreachable!("presign after failed upload")
    }
}

fn offline_sqs_client() -> aws_sdk_sqs::Client {
    let config = aws_sdk_sqs::Config::builder()
        .behavior_version(aws_sdk_sqs::config::BehaviorVersion::latest())
        .region(aws_sdk_sqs::config::Region::new("us-east-1"))
        .build();
    aws_sdk_sqs::Client::from_conf(config)
}

// ============================================================
// Health endpoint
// ============================================================

mod health {
    use super::*;

    #[tokio::test]
    async fn returns_ok() {
        let h = setup();

        let response = h.server.get("/api/health").await;

        response.assert_status_ok();
        response.assert_json(&json!({ "status": "ok" }));
    }
}

// ============================================================
// Todo CRUD
// ============================================================

mod todos {
    use super::*;

    #[tokio::test]
    async fn list_returns_empty_envelope_when_no_todos() {
        let h = setup();

        let response = h.server.get("/api/todos").await;

        response.assert_status_ok();
        response.assert_json(&json!({ "success": true, "data": [] }));
    }

    #[tokio::test]
    async fn create_returns_created_status() {
        let h = setup();

        let response = h.server.post("/api/todos").json(&todo_body("Renew passport")).await;

        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<TodoItem> = response.json();
        assert!(body.success);
        let todo = body.data.unwrap();
        assert!(!todo.id.is_empty());
        assert_eq!(todo.description, "Renew passport");
        assert_eq!(todo.due_date, "2025-03-01T09:00:00.000Z");
        assert_eq!(todo.priority, Priority::Medium);
        assert_eq!(todo.status, Status::NotStarted);
        assert_eq!(todo.created_at, todo.updated_at);
    }

    #[tokio::test]
    async fn create_then_get_round_trips_fields() {
        let h = setup();
        let created = create_test_todo(&h.server, "File taxes").await;

        let response = h.server.get(&format!("/api/todos/{}", created.id)).await;

        response.assert_status_ok();
        let fetched = response.json::<ApiResponse<TodoItem>>().data.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[tokio::test]
    async fn create_normalizes_date_only_due_date() {
        let h = setup();
        let mut body = todo_body("Dentist");
        body["dueDate"] = json!("2025-07-04");

        let todo = h
            .server
            .post("/api/todos")
            .json(&body)
            .await
            .json::<ApiResponse<TodoItem>>()
            .data
            .unwrap();

        assert_eq!(todo.due_date, "2025-07-04T00:00:00.000Z");
    }

    #[tokio::test]
    async fn create_rejects_missing_fields() {
        let h = setup();

        let response = h
            .server
            .post("/api/todos")
            .json(&json!({ "description": "No date", "priority": "Low" }))
            .await;

        response.assert_status_bad_request();
        let error = error_of(&response);
        assert_eq!(error["code"], "VALIDATION_ERROR");
        assert_eq!(error["message"], "Missing required fields");
        assert_eq!(
            error["details"]["required"],
            json!(["description", "dueDate", "priority", "status"])
        );
        assert_eq!(error["details"]["received"], json!(["description", "priority"]));
        assert!(h.store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_unknown_priority_listing_valid_values() {
        let h = setup();
        let mut body = todo_body("Urgent thing");
        body["priority"] = json!("Urgent");

        let response = h.server.post("/api/todos").json(&body).await;

        response.assert_status_bad_request();
        let error = error_of(&response);
        assert_eq!(error["code"], "VALIDATION_ERROR");
        assert_eq!(error["message"], "Invalid priority value");
        assert_eq!(error["details"]["valid"], json!(["High", "Medium", "Low"]));
        assert_eq!(error["details"]["received"], "Urgent");
    }

    #[tokio::test]
    async fn create_rejects_unknown_status() {
        let h = setup();
        let mut body = todo_body("Blocked thing");
        body["status"] = json!("Blocked");

        let response = h.server.post("/api/todos").json(&body).await;

        response.assert_status_bad_request();
        let error = error_of(&response);
        assert_eq!(error["message"], "Invalid status value");
        assert_eq!(
            error["details"]["valid"],
            json!(["Not Started", "In Progress", "Done", "Canceled"])
        );
    }

    #[tokio::test]
    async fn create_rejects_unparseable_due_date() {
        let h = setup();
        let mut body = todo_body("Someday");
        body["dueDate"] = json!("next tuesday");

        let response = h.server.post("/api/todos").json(&body).await;

        response.assert_status_bad_request();
        let error = error_of(&response);
        assert_eq!(error["message"], "Invalid due date format");
        assert_eq!(error["details"]["received"], "next tuesday");
    }

    #[tokio::test]
    async fn create_rejects_malformed_json() {
        let h = setup();

        let response = h
            .server
            .post("/api/todos")
            .text("{ not json")
            .content_type("application/json")
            .await;

        response.assert_status_bad_request();
        let error = error_of(&response);
        assert_eq!(error["code"], "VALIDATION_ERROR");
        assert_eq!(error["message"], "Invalid JSON body");
    }

    #[tokio::test]
    async fn get_returns_not_found_for_nonexistent_todo() {
        let h = setup();

        let response = h.server.get("/api/todos/does-not-exist").await;

        response.assert_status_not_found();
        let error = error_of(&response);
        assert_eq!(error["code"], "NOT_FOUND");
        assert_eq!(error["message"], "Todo not found");
        assert_eq!(error["details"]["id"], "does-not-exist");
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let h = setup();
        let created = create_test_todo(&h.server, "Write report").await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let response = h
            .server
            .put(&format!("/api/todos/{}", created.id))
            .json(&json!({ "status": "Done" }))
            .await;

        response.assert_status_ok();
        let updated = response.json::<ApiResponse<TodoItem>>().data.unwrap();
        assert_eq!(updated.status, Status::Done);
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.due_date, created.due_date);
        assert_eq!(updated.priority, created.priority);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn update_canonicalizes_supplied_due_date() {
        let h = setup();
        let created = create_test_todo(&h.server, "Move date").await;

        let updated = h
            .server
            .put(&format!("/api/todos/{}", created.id))
            .json(&json!({ "dueDate": "2025-12-31T18:00:00+01:00" }))
            .await
            .json::<ApiResponse<TodoItem>>()
            .data
            .unwrap();

        assert_eq!(updated.due_date, "2025-12-31T17:00:00.000Z");
    }

    #[tokio::test]
    async fn update_validates_supplied_fields() {
        let h = setup();
        let created = create_test_todo(&h.server, "Keep me").await;

        let response = h
            .server
            .put(&format!("/api/todos/{}", created.id))
            .json(&json!({ "priority": "Urgent" }))
            .await;

        response.assert_status_bad_request();
        assert_eq!(error_of(&response)["message"], "Invalid priority value");

        let unchanged = h.store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(unchanged, created);
    }

    #[tokio::test]
    async fn update_returns_not_found_without_creating() {
        let h = setup();

        let response = h
            .server
            .put("/api/todos/ghost")
            .json(&json!({ "status": "Done" }))
            .await;

        response.assert_status_not_found();
        assert_eq!(error_of(&response)["code"], "NOT_FOUND");
        assert!(h.store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_todo() {
        let h = setup();
        let created = create_test_todo(&h.server, "Throw away").await;

        let response = h.server.delete(&format!("/api/todos/{}", created.id)).await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "success": true,
            "data": { "message": "Todo deleted successfully", "id": created.id },
        }));

        h.server
            .get(&format!("/api/todos/{}", created.id))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn delete_twice_returns_not_found() {
        let h = setup();
        let created = create_test_todo(&h.server, "Once only").await;

        h.server
            .delete(&format!("/api/todos/{}", created.id))
            .await
            .assert_status_ok();
        let response = h.server.delete(&format!("/api/todos/{}", created.id)).await;

        response.assert_status_not_found();
        assert!(!h.store.delete(&created.id).await.unwrap());
    }

    #[tokio::test]
    async fn list_sorts_by_priority_descending() {
        let h = setup();
        for (description, priority) in [("low", "Low"), ("high", "High"), ("medium", "Medium")] {
            let mut body = todo_body(description);
            body["priority"] = json!(priority);
            h.server.post("/api/todos").json(&body).await;
        }

        let response = h.server.get("/api/todos?sort=priority&direction=desc").await;

        response.assert_status_ok();
        let todos = response.json::<ApiResponse<Vec<TodoItem>>>().data.unwrap();
        let order: Vec<_> = todos.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(order, vec!["high", "medium", "low"]);
    }

    #[tokio::test]
    async fn list_rejects_unknown_sort_field() {
        let h = setup();

        let response = h.server.get("/api/todos?sort=owner").await;

        response.assert_status_bad_request();
        assert_eq!(error_of(&response)["message"], "Invalid sort field");
    }

    #[tokio::test]
    async fn store_failure_passes_backend_code_through() {
        let h = setup_with(|mut state| {
            state.store = Arc::new(UnavailableStore);
            state
        });

        let response = h.server.get("/api/todos").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let error = error_of(&response);
        assert_eq!(error["code"], "ResourceNotFoundException");
        assert_eq!(error["message"], "Requested resource not found");
        assert_eq!(error["details"]["name"], "ResourceNotFoundException");
        assert!(error["stack"].is_string());
    }

    #[tokio::test]
    async fn handler_panic_becomes_internal_error() {
        let h = setup_with(|mut state| {
            state.store = Arc::new(PanickingStore);
            state
        });

        let response = h.server.get("/api/todos").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let error = error_of(&response);
        assert_eq!(error["code"], "INTERNAL_ERROR");
        assert_eq!(error["message"], "scan cursor corrupted");
        assert!(error["stack"].is_string());

        h.server.get("/api/health").await.assert_status_ok();
    }

    #[tokio::test]
    async fn production_responses_omit_stack() {
        let h = setup_with(|mut state| {
            state.store = Arc::new(UnavailableStore);
            state.with_environment(Environment::Production)
        });

        let response = h.server.get("/api/todos/anything").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error_of(&response).get("stack").is_none());
    }
}

// ============================================================
// Export
// ============================================================

mod export {
    use super::*;

    #[tokio::test]
    async fn empty_table_returns_no_data() {
        let h = setup();

        let response = h.server.post("/api/export").await;

        response.assert_status_bad_request();
        let error = error_of(&response);
        assert_eq!(error["code"], "NO_DATA");
        assert_eq!(error["message"], "No todos to export");
        assert!(h.storage.is_empty());
    }

    #[tokio::test]
    async fn empty_table_returns_no_data_before_queueing() {
        let h = setup();
        h.flags.set(EXPORT_QUEUE_FLAG, true);

        let response = h.server.post("/api/export").await;

        response.assert_status_bad_request();
        assert_eq!(error_of(&response)["code"], "NO_DATA");
        assert!(h.queue.messages().is_empty());
    }

    #[tokio::test]
    async fn uploads_csv_and_returns_signed_link() {
        let h = setup();
        create_test_todo(&h.server, "He said \"hi\", then left").await;

        let response = h.server.post("/api/export").await;

        response.assert_status_ok();
        let export = match response.json::<ApiResponse<ExportOutcome>>().data.unwrap() {
            ExportOutcome::Ready(export) => export,
            other => panic!("expected a ready export, got {other:?}"),
        };
        assert!(export.file_name.starts_with("todo-export-"));
        assert!(export.file_name.ends_with(".csv"));
        assert!(!export.file_name.contains(':'));
        assert!(export.download_url.contains(&export.file_name));
        assert!(parse_timestamp(&export.expires_at).is_some());

        let object = h.storage.object(&export.file_name).expect("object not uploaded");
        assert_eq!(object.content_type, "text/csv");
        assert_eq!(
            object.content_disposition,
            format!("attachment; filename=\"{}\"", export.file_name)
        );
        assert!(object
            .content
            .starts_with("ID,Description,Due Date,Priority,Status,Created At,Updated At\n"));
        assert!(object.content.contains(",\"He said \"\"hi\"\", then left\","));
        assert!(h.queue.messages().is_empty());
    }

    #[tokio::test]
    async fn queue_flag_enqueues_instead_of_uploading() {
        let h = setup();
        create_test_todo(&h.server, "Queued").await;
        h.flags.set(EXPORT_QUEUE_FLAG, true);

        let response = h.server.post("/api/export").await;

        response.assert_status_ok();
        let body: Value = response.json();
        let data = &body["data"];
        assert!(data["exportId"].is_string());
        assert!(data["queuedAt"].is_string());
        assert!(data["message"].is_string());
        assert!(data.get("downloadUrl").is_none());

        let messages = h.queue.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].export_id, data["exportId"].as_str().unwrap());
        assert_eq!(messages[0].requested_at, data["queuedAt"].as_str().unwrap());
        assert_eq!(messages[0].export_type, ExportType::Csv);
        assert!(h.storage.is_empty());
    }

    #[tokio::test]
    async fn flag_set_to_false_keeps_synchronous_export() {
        let h = setup();
        create_test_todo(&h.server, "Inline").await;
        h.flags.set(EXPORT_QUEUE_FLAG, false);

        let response = h.server.post("/api/export").await;

        response.assert_status_ok();
        assert_eq!(h.storage.len(), 1);
        assert!(h.queue.messages().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_queue_is_a_configuration_error() {
        let h = setup_with(|mut state| {
            state.queue = Arc::new(SqsExportQueue::new(offline_sqs_client(), None));
            state
        });
        create_test_todo(&h.server, "Nowhere to go").await;
        h.flags.set(EXPORT_QUEUE_FLAG, true);

        let response = h.server.post("/api/export").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let error = error_of(&response);
        assert_eq!(error["code"], "CONFIGURATION_ERROR");
        assert_eq!(error["details"]["environmentVariable"], "SQS_QUEUE_URL");
    }

    #[tokio::test]
    async fn malformed_queue_url_is_a_configuration_error() {
        let h = setup_with(|mut state| {
            state.queue = Arc::new(SqsExportQueue::new(
                offline_sqs_client(),
                Some("http://localhost:4566/000000000000/exports".to_string()),
            ));
            state
        });
        create_test_todo(&h.server, "Wrong address").await;
        h.flags.set(EXPORT_QUEUE_FLAG, true);

        let response = h.server.post("/api/export").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_of(&response)["code"], "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn storage_failure_surfaces_backend_code() {
        let h = setup_with(|mut state| {
            state.storage = Arc::new(MissingBucket);
            state
        });
        create_test_todo(&h.server, "No bucket").await;

        let response = h.server.post("/api/export").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let error = error_of(&response);
        assert_eq!(error["code"], "NoSuchBucket");
        assert_eq!(error["message"], "The specified bucket does not exist");
    }

    #[tokio::test]
    async fn configured_delay_precedes_synchronous_export() {
        let delay = Duration::from_millis(50);
        let h = setup_with(|state| state.with_export_delay(Some(delay)));
        create_test_todo(&h.server, "Slow").await;

        let started = Instant::now();
        let response = h.server.post("/api/export").await;

        response.assert_status_ok();
        assert!(started.elapsed() >= delay);
    }
}

// ============================================================
// Feature flags
// ============================================================

mod feature_flags {
    use super::*;

    #[tokio::test]
    async fn returns_empty_map_when_no_flags() {
        let h = setup();

        let response = h.server.get("/api/feature-flags").await;

        response.assert_status_ok();
        response.assert_json(&json!({ "success": true, "data": {} }));
    }

    #[tokio::test]
    async fn returns_current_flags() {
        let h = setup();
        h.flags.set("showFooter", true);
        h.flags.set(EXPORT_QUEUE_FLAG, false);

        let response = h.server.get("/api/feature-flags").await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "success": true,
            "data": { "showFooter": true, "useQueueForExports": false },
        }));
    }
}

// ============================================================
// System info
// ============================================================

mod system_info {
    use super::*;

    #[tokio::test]
    async fn reports_platform_and_environment() {
        let h = setup();

        let response = h.server.get("/api/system-info").await;

        response.assert_status_ok();
        let info = response.json::<ApiResponse<SystemInfo>>().data.unwrap();
        assert_eq!(info.platform, std::env::consts::OS);
        assert_eq!(info.environment, "test");
    }
}
