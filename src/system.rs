//! Host details for `GET /system-info`.

use sysinfo::System;

use crate::config::Environment;
use crate::models::SystemInfo;

pub fn collect_system_info(environment: Environment) -> SystemInfo {
    SystemInfo {
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: environment.as_str().to_string(),
    }
}
