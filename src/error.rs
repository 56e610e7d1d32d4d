//! Error types for the Docker remote client

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Daemon rejected request ({status}, {kind}): {message}")]
    Client {
        status: u16,
        kind: ClientErrorKind,
        message: String,
    },

    #[error("Daemon error ({status}): {message}")]
    Engine { status: u16, message: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Malformed {shape} response: {source}")]
    MalformedResponse {
        shape: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Discriminant of [`Error`], for callers that branch on the failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Client,
    Engine,
    Transport,
    Stream,
    MalformedResponse,
}

/// Sub-kind of a 4xx (or 304) answer from the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    NotModified,
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    Other(u16),
}

impl ClientErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            304 => ClientErrorKind::NotModified,
            400 => ClientErrorKind::BadRequest,
            401 | 403 => ClientErrorKind::Unauthorized,
            404 => ClientErrorKind::NotFound,
            409 => ClientErrorKind::Conflict,
            other => ClientErrorKind::Other(other),
        }
    }
}

impl std::fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientErrorKind::NotModified => write!(f, "not modified"),
            ClientErrorKind::BadRequest => write!(f, "bad request"),
            ClientErrorKind::Unauthorized => write!(f, "unauthorized"),
            ClientErrorKind::NotFound => write!(f, "not found"),
            ClientErrorKind::Conflict => write!(f, "conflict"),
            ClientErrorKind::Other(status) => write!(f, "status {}", status),
        }
    }
}

#[derive(Deserialize)]
struct DaemonMessage {
    message: String,
}

impl Error {
    /// Classify a non-2xx status and its (already drained) body
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let message = daemon_message(body);
        if (500..600).contains(&status) {
            Error::Engine { status, message }
        } else {
            Error::Client {
                status,
                kind: ClientErrorKind::from_status(status),
                message,
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Client { .. } => ErrorKind::Client,
            Error::Engine { .. } => ErrorKind::Engine,
            Error::Transport(_) | Error::Io(_) => ErrorKind::Transport,
            Error::Stream(_) => ErrorKind::Stream,
            Error::MalformedResponse { .. } => ErrorKind::MalformedResponse,
        }
    }

    pub fn client_kind(&self) -> Option<ClientErrorKind> {
        match self {
            Error::Client { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.client_kind() == Some(ClientErrorKind::NotFound)
    }

    pub fn is_conflict(&self) -> bool {
        self.client_kind() == Some(ClientErrorKind::Conflict)
    }

    /// Connection-level failures; the whole operation may be retried after
    /// re-inspecting the resource.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Stream)
    }
}

/// Daemons answer errors either as `{"message": "..."}` or as plain text.
fn daemon_message(body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<DaemonMessage>(body) {
        return parsed.message;
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        "no message".to_string()
    } else {
        text
    }
}
