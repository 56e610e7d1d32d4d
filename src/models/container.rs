//! Container models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{null_as_default, Resource};
use crate::{Error, Result};

/// Marker value for the daemon's `{"80/tcp": {}}` style sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Configuration sent when creating a container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    /// Image reference the container runs
    #[serde(default)]
    pub image: String,
    /// Command and arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,
    /// `KEY=value` pairs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<String>>,
    /// Keys like `80/tcp`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed_ports: Option<BTreeMap<String, Empty>>,
    /// Container paths backed by anonymous volumes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<BTreeMap<String, Empty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tty: bool,
    /// Only meaningful at create time; never present in inspect output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_config: Option<HostConfig>,
}

impl ContainerConfig {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    pub fn with_cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd = Some(cmd.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_entrypoint<I, S>(mut self, entrypoint: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entrypoint = Some(entrypoint.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.get_or_insert_with(Vec::new).push(format!("{}={}", key, value));
        self
    }

    pub fn with_exposed_port(mut self, port: impl Into<String>) -> Self {
        self.exposed_ports
            .get_or_insert_with(BTreeMap::new)
            .insert(port.into(), Empty {});
        self
    }

    pub fn with_volume(mut self, path: impl Into<String>) -> Self {
        self.volumes.get_or_insert_with(BTreeMap::new).insert(path.into(), Empty {});
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.get_or_insert_with(BTreeMap::new).insert(key.into(), value.into());
        self
    }

    pub fn with_tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    pub fn with_host_config(mut self, host_config: HostConfig) -> Self {
        self.host_config = Some(host_config);
        self
    }

    /// Checks done before anything is sent to the daemon
    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            return Err(Error::Validation("container image cannot be empty".into()));
        }
        if let Some(env) = &self.env {
            if let Some(bad) = env.iter().find(|e| !e.contains('=') || e.starts_with('=')) {
                return Err(Error::Validation(format!("environment entry {:?} is not KEY=value", bad)));
            }
        }
        if let Some(ports) = &self.exposed_ports {
            if let Some(bad) = ports.keys().find(|p| !is_port_spec(p)) {
                return Err(Error::Validation(format!("invalid exposed port {:?}", bad)));
            }
        }
        Ok(())
    }
}

/// `80`, `80/tcp`, `53/udp`
fn is_port_spec(spec: &str) -> bool {
    let (port, proto) = spec.split_once('/').unwrap_or((spec, "tcp"));
    port.parse::<u16>().is_ok_and(|p| p > 0) && matches!(proto, "tcp" | "udp" | "sctp")
}

/// Host-side settings applied when the container is created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    /// `host-path:container-path[:ro]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binds: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_bindings: Option<BTreeMap<String, Vec<PortBinding>>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub publish_all_ports: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub privileged: bool,
}

impl HostConfig {
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.binds.get_or_insert_with(Vec::new).push(bind.into());
        self
    }

    pub fn with_port_binding(mut self, container_port: impl Into<String>, host_port: u16) -> Self {
        self.port_bindings
            .get_or_insert_with(BTreeMap::new)
            .entry(container_port.into())
            .or_default()
            .push(PortBinding {
                host_ip: None,
                host_port: Some(host_port.to_string()),
            });
        self
    }

    pub fn with_publish_all_ports(mut self, publish: bool) -> Self {
        self.publish_all_ports = publish;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerCreateResult {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub warnings: Vec<String>,
}

impl Resource for ContainerCreateResult {
    const SHAPE: &'static str = "container create";
}

/// Snapshot returned by `GET /containers/{id}/json`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInspectResult {
    /// Full identifier; the id used in the request is a prefix of it
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub args: Vec<String>,
    /// Identifier of the image the container was created from
    #[serde(default)]
    pub image: String,
    pub config: Option<ContainerConfig>,
    #[serde(default)]
    pub state: ContainerState,
    pub network_settings: Option<NetworkSettings>,
    #[serde(default)]
    pub restart_count: i64,
}

impl Resource for ContainerInspectResult {
    const SHAPE: &'static str = "container inspect";
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    /// `created`, `running`, `exited`, ... (newer daemons only)
    pub status: Option<String>,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub restarting: bool,
    #[serde(default, rename = "OOMKilled")]
    pub oom_killed: bool,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub pid: i64,
    #[serde(default)]
    pub exit_code: i64,
    #[serde(default)]
    pub error: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ContainerState {
    /// Stopped, killed or exited on its own
    pub fn is_terminal(&self) -> bool {
        !self.running && !self.restarting && self.finished_at.is_some_and(|t| t.timestamp() > 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkSettings {
    #[serde(default, rename = "IPAddress")]
    pub ip_address: String,
    #[serde(default)]
    pub gateway: String,
    /// `"80/tcp" -> [bindings]`, `null` when the port is exposed but unbound
    #[serde(default, deserialize_with = "null_as_default")]
    pub ports: BTreeMap<String, Option<Vec<PortBinding>>>,
}

impl NetworkSettings {
    /// First host port bound to `container_port` (e.g. `"80/tcp"`)
    pub fn host_port(&self, container_port: &str) -> Option<u16> {
        self.ports
            .get(container_port)?
            .as_ref()?
            .iter()
            .find_map(|b| b.host_port.as_deref()?.parse().ok())
    }
}

/// Entry of `GET /containers/json`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub names: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default, rename = "ImageID")]
    pub image_id: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub created: i64,
    pub state: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ports: Vec<PortSummary>,
}

impl Resource for ContainerSummary {
    const SHAPE: &'static str = "container summary";
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortSummary {
    #[serde(rename = "IP")]
    pub ip: Option<String>,
    pub private_port: u16,
    pub public_port: Option<u16>,
    #[serde(rename = "Type")]
    pub kind: String,
}

/// Filesystem change between a container and its image
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeLogEntry {
    pub path: String,
    pub kind: ChangeKind,
}

impl Resource for ChangeLogEntry {
    const SHAPE: &'static str = "change log";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum ChangeKind {
    Modified,
    Added,
    Deleted,
}

impl TryFrom<u8> for ChangeKind {
    type Error = String;

    fn try_from(kind: u8) -> std::result::Result<Self, Self::Error> {
        match kind {
            0 => Ok(ChangeKind::Modified),
            1 => Ok(ChangeKind::Added),
            2 => Ok(ChangeKind::Deleted),
            other => Err(format!("unknown change kind {}", other)),
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Modified => write!(f, "C"),
            ChangeKind::Added => write!(f, "A"),
            ChangeKind::Deleted => write!(f, "D"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WaitResult {
    pub status_code: i64,
}

impl Resource for WaitResult {
    const SHAPE: &'static str = "container wait";
}

/// Options for `DELETE /containers/{id}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Also remove anonymous volumes
    pub volumes: bool,
    /// Kill a running container first
    pub force: bool,
}

/// Options for `GET /containers/{id}/logs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    pub stdout: bool,
    pub stderr: bool,
    /// Keep the stream open until the container exits
    pub follow: bool,
    pub timestamps: bool,
    /// Number of trailing lines, `None` for all
    pub tail: Option<usize>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            stdout: true,
            stderr: true,
            follow: false,
            timestamps: false,
            tail: None,
        }
    }
}

impl LogOptions {
    pub fn follow() -> Self {
        Self {
            follow: true,
            ..Default::default()
        }
    }
}
