//! Docker Remote API client
//!
//! A blocking Rust client for the Docker engine's HTTP API: container
//! lifecycle, image management and the daemon's streaming endpoints
//! (pull, push, build and logs).
//!
//! # Key Features
//!
//! - **Typed resources** - every response decodes into a concrete struct
//! - **Live streams** - progress and log bodies are consumed incrementally
//! - **Classified errors** - each failure maps to exactly one [`ErrorKind`]
//! - **No hidden state** - container state is only known through `inspect`
//!
//! # Example
//!
//! ```no_run
//! use docker_remote::{ClientConfig, DockerClient};
//! use docker_remote::models::ContainerConfig;
//!
//! let config = ClientConfig::builder()
//!     .endpoint("http://localhost:2375")
//!     .api_version("1.41")
//!     .build_validated()?;
//! let docker = DockerClient::new(config)?;
//!
//! docker.pull("busybox:latest")?.finish()?;
//!
//! let created = docker.create_container(&ContainerConfig::new("busybox").with_cmd(["true"]))?;
//! docker.start_container(&created.id)?;
//! let exit_code = docker.wait_container(&created.id)?;
//! println!("exited with {}", exit_code);
//!
//! docker.remove_container(&created.id)?;
//! # Ok::<(), docker_remote::Error>(())
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod stream;
pub mod transport;

pub use client::DockerClient;
pub use config::{AuthConfig, ClientConfig, Endpoint};
pub use error::{ClientErrorKind, Error, ErrorKind, Result};
pub use stream::{Completion, LogStream, ProgressKind, ProgressOutcome, ProgressStream, StreamEvent};
pub use transport::{HttpTransport, Transport};
