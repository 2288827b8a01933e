use std::sync::Arc;
use std::time::Duration;

use aws_config::SdkConfig;

use super::envelope::ApiError;
use crate::config::{AppConfig, Environment};
use crate::error::AppError;
use crate::export::{ExportStorage, MemoryExportStorage, S3ExportStorage};
use crate::flags::{FlagSource, SsmFlagSource, StaticFlagSource};
use crate::queue::{ExportQueue, MemoryExportQueue, SqsExportQueue};
use crate::store::{DynamoTodoStore, MemoryTodoStore, TodoStore};

/// Adapters and settings shared by every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TodoStore>,
    pub storage: Arc<dyn ExportStorage>,
    pub queue: Arc<dyn ExportQueue>,
    pub flags: Arc<dyn FlagSource>,
    pub export_delay: Option<Duration>,
    pub environment: Environment,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TodoStore>,
        storage: Arc<dyn ExportStorage>,
        queue: Arc<dyn ExportQueue>,
        flags: Arc<dyn FlagSource>,
    ) -> Self {
        Self {
            store,
            storage,
            queue,
            flags,
            export_delay: None,
            environment: Environment::default(),
        }
    }

    /// AWS-backed adapters sharing one SDK configuration.
    pub fn from_aws(sdk_config: &SdkConfig, config: &AppConfig) -> Self {
        let store = DynamoTodoStore::new(
            aws_sdk_dynamodb::Client::new(sdk_config),
            &config.table_name,
        );
        let storage =
            S3ExportStorage::new(aws_sdk_s3::Client::new(sdk_config), &config.bucket_name);
        let queue = SqsExportQueue::new(
            aws_sdk_sqs::Client::new(sdk_config),
            config.queue_url.clone(),
        );
        let flags = SsmFlagSource::new(aws_sdk_ssm::Client::new(sdk_config), &config.flag_prefix);

        Self::new(
            Arc::new(store),
            Arc::new(storage),
            Arc::new(queue),
            Arc::new(flags),
        )
        .with_settings(config)
    }

    /// In-process adapters with no external dependencies.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(MemoryTodoStore::new()),
            Arc::new(MemoryExportStorage::new(&config.bucket_name)),
            Arc::new(MemoryExportQueue::new()),
            Arc::new(StaticFlagSource::default()),
        )
        .with_settings(config)
    }

    pub fn with_settings(mut self, config: &AppConfig) -> Self {
        self.export_delay = config.export_delay;
        self.environment = config.environment;
        self
    }

    pub fn with_export_delay(mut self, delay: Option<Duration>) -> Self {
        self.export_delay = delay;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Log a failed request and convert it for the client.
    ///
    /// Server errors are logged at error level; client errors (validation,
    /// not found, no data) at warn.
    pub fn reject(&self, err: AppError) -> ApiError {
        if err.status().is_server_error() {
            tracing::error!(code = err.code(), "Request failed: {}", err);
        } else {
            tracing::warn!(code = err.code(), "Request rejected: {}", err);
        }
        ApiError::from_app_error(&err, self.environment.exposes_stack())
    }
}
