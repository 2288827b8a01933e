//! CSV export pipeline: serialize records, upload, hand back a signed link.

mod csv;
mod storage;

pub use csv::{escape_field, format_date, generate_csv};
pub use storage::{
    content_disposition, export_file_name, upload_and_sign, ExportStorage, MemoryExportStorage,
    S3ExportStorage, StoredObject, CSV_CONTENT_TYPE, SIGNED_URL_TTL_SECS,
};
