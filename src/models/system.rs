//! Daemon-wide information

use serde::Deserialize;

use crate::codec::Resource;

/// Snapshot of `GET /info`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DaemonInfo {
    #[serde(default, rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub containers: i64,
    #[serde(default)]
    pub containers_running: i64,
    #[serde(default)]
    pub containers_paused: i64,
    #[serde(default)]
    pub containers_stopped: i64,
    #[serde(default)]
    pub images: i64,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub memory_limit: bool,
    #[serde(default)]
    pub swap_limit: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub n_fd: i64,
    #[serde(default)]
    pub n_goroutines: i64,
    #[serde(default, rename = "NCPU")]
    pub ncpu: i64,
    #[serde(default)]
    pub mem_total: i64,
    #[serde(default)]
    pub kernel_version: String,
    #[serde(default)]
    pub operating_system: String,
    #[serde(default)]
    pub server_version: String,
    #[serde(default)]
    pub docker_root_dir: String,
}

impl Resource for DaemonInfo {
    const SHAPE: &'static str = "daemon info";
}

/// Snapshot of `GET /version`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionInfo {
    pub version: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default, rename = "MinAPIVersion")]
    pub min_api_version: String,
    #[serde(default)]
    pub git_commit: String,
    #[serde(default)]
    pub go_version: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub kernel_version: String,
    #[serde(default)]
    pub build_time: String,
}

impl Resource for VersionInfo {
    const SHAPE: &'static str = "version";
}
