//! Task tracking service.
//!
//! Records live in a DynamoDB table, CSV exports go to S3 behind a signed
//! link (or onto an SQS queue when the export-queue flag is on), and feature
//! flags are read from the SSM parameter store.

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod flags;
pub mod models;
pub mod queue;
pub mod store;
pub mod system;
