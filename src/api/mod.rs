mod envelope;
mod handlers;
mod state;
mod validation;

use std::any::Any;

use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::error::AppError;

pub use envelope::{ApiError, ApiResponse, ErrorBody, Success};
pub use state::AppState;
pub use validation::ListTodosQuery;

pub fn create_router(state: AppState) -> Router {
    let expose_stack = state.environment.exposes_stack();

    let api = Router::new()
        // Todos
        .route("/todos", get(handlers::list_todos).post(handlers::create_todo))
        .route(
            "/todos/{id}",
            get(handlers::get_todo)
                .put(handlers::update_todo)
                .delete(handlers::delete_todo),
        )
        // Export
        .route("/export", post(handlers::export_todos))
        // Flags
        .route("/feature-flags", get(handlers::feature_flags))
        // System
        .route("/system-info", get(handlers::system_info))
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send>| {
                    panic_response(panic, expose_stack)
                })),
        )
        .with_state(state)
}

/// Last-resort 500 for a handler that panicked.
fn panic_response(panic: Box<dyn Any + Send>, expose_stack: bool) -> Response {
    let reason = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };

    tracing::error!("Handler panicked: {}", reason);
    ApiError::from_app_error(&AppError::Internal(reason), expose_stack).into_response()
}
