use serde::{Deserialize, Serialize};

/// Host details reported by `GET /system-info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub hostname: String,
    pub platform: String,
    pub arch: String,
    pub version: String,
    pub environment: String,
}
