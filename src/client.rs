//! Lifecycle client for containers and images
//!
//! Every method is one fixed request sequence against the daemon. Nothing is
//! cached: state is only known through a fresh `inspect` round trip, and
//! nothing is retried. Streaming methods hand back a live, single-consumer
//! stream that owns its connection.

use std::path::Path;

use crate::codec::{self, Resource};
use crate::config::{AuthConfig, ClientConfig};
use crate::models::*;
use crate::stream::{LogStream, ProgressKind, ProgressStream};
use crate::transport::{Body, HttpTransport, RawResponse, Request, Transport};
use crate::{Error, Result};

const MULTIPLEXED_STREAM: &str = "application/vnd.docker.multiplexed-stream";
const REGISTRY_AUTH_HEADER: &str = "X-Registry-Auth";

/// Client for one daemon endpoint
#[derive(Clone)]
pub struct DockerClient<T = HttpTransport> {
    transport: T,
    auth: Option<AuthConfig>,
}

impl DockerClient<HttpTransport> {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self {
            transport,
            auth: config.auth,
        })
    }

    /// Configure from `DOCKER_HOST` / `DOCKER_API_VERSION`
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> DockerClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport, auth: None }
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    fn execute(&self, request: Request) -> Result<RawResponse> {
        self.transport.send(request)?.error_for_status()
    }

    fn fetch<R: Resource>(&self, request: Request) -> Result<R> {
        let bytes = self.execute(request)?.into_bytes()?;
        codec::decode(&bytes)
    }

    fn fetch_list<R: Resource>(&self, request: Request) -> Result<Vec<R>> {
        let bytes = self.execute(request)?.into_bytes()?;
        codec::decode_list(&bytes)
    }

    fn discard(&self, request: Request) -> Result<()> {
        self.execute(request)?.into_bytes()?;
        Ok(())
    }

    fn registry_auth(&self) -> Result<String> {
        match &self.auth {
            Some(auth) => auth.header_value(),
            None => AuthConfig::default().header_value(),
        }
    }

    // === System ===

    pub fn ping(&self) -> Result<()> {
        self.discard(Request::get("/_ping"))
    }

    pub fn version(&self) -> Result<VersionInfo> {
        self.fetch(Request::get("/version"))
    }

    pub fn info(&self) -> Result<DaemonInfo> {
        self.fetch(Request::get("/info"))
    }

    // === Containers ===

    pub fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        self.fetch_list(Request::get("/containers/json").flag("all", all))
    }

    pub fn create_container(&self, config: &ContainerConfig) -> Result<ContainerCreateResult> {
        self.create(config, None)
    }

    pub fn create_container_named(&self, config: &ContainerConfig, name: &str) -> Result<ContainerCreateResult> {
        self.create(config, Some(name))
    }

    fn create(&self, config: &ContainerConfig, name: Option<&str>) -> Result<ContainerCreateResult> {
        config.validate()?;
        let mut request = Request::post("/containers/create").body(Body::json(codec::encode(config)?));
        if let Some(name) = name {
            request = request.query("name", checked_id("container name", name)?);
        }

        let response = match self.execute(request) {
            Err(Error::Client { status: 400, message, .. }) => {
                return Err(Error::Validation(format!("daemon rejected container config: {}", message)));
            }
            other => other?,
        };
        let created: ContainerCreateResult = codec::decode(&response.into_bytes()?)?;
        for warning in &created.warnings {
            tracing::warn!(container = %created.id, warning = %warning, "Daemon warning on create");
        }
        tracing::info!(container = %created.id, image = %config.image, "Container created");
        Ok(created)
    }

    /// Always a fresh round trip
    pub fn inspect_container(&self, id: &str) -> Result<ContainerInspectResult> {
        let id = checked_id("container", id)?;
        self.fetch(Request::get(format!("/containers/{}/json", id)))
    }

    pub fn diff_container(&self, id: &str) -> Result<Vec<ChangeLogEntry>> {
        let id = checked_id("container", id)?;
        self.fetch_list(Request::get(format!("/containers/{}/changes", id)))
    }

    /// Starting a running container fails with a `NotModified` client error.
    pub fn start_container(&self, id: &str) -> Result<()> {
        let id = checked_id("container", id)?;
        self.discard(Request::post(format!("/containers/{}/start", id)))?;
        tracing::info!(container = %id, "Container started");
        Ok(())
    }

    /// Ask the process to stop, killing it after `timeout_secs`
    pub fn stop_container(&self, id: &str, timeout_secs: u32) -> Result<()> {
        let id = checked_id("container", id)?;
        let request = Request::post(format!("/containers/{}/stop", id)).query("t", timeout_secs.to_string());
        self.discard(request)?;
        tracing::info!(container = %id, timeout_secs, "Container stopped");
        Ok(())
    }

    pub fn kill_container(&self, id: &str) -> Result<()> {
        self.kill_container_with(id, None)
    }

    /// Send `signal` (e.g. `SIGTERM`) instead of the default `SIGKILL`
    pub fn kill_container_with(&self, id: &str, signal: Option<&str>) -> Result<()> {
        let id = checked_id("container", id)?;
        let request = Request::post(format!("/containers/{}/kill", id)).query_opt("signal", signal);
        self.discard(request)?;
        tracing::info!(container = %id, signal = signal.unwrap_or("SIGKILL"), "Container killed");
        Ok(())
    }

    pub fn restart_container(&self, id: &str, timeout_secs: u32) -> Result<()> {
        let id = checked_id("container", id)?;
        let request = Request::post(format!("/containers/{}/restart", id)).query("t", timeout_secs.to_string());
        self.discard(request)?;
        tracing::info!(container = %id, "Container restarted");
        Ok(())
    }

    /// Block until the container is no longer running and return its exit
    /// code. The calling thread is held for the whole duration; wait on
    /// several containers from several threads.
    pub fn wait_container(&self, id: &str) -> Result<i64> {
        let id = checked_id("container", id)?;
        let result: WaitResult = self.fetch(Request::post(format!("/containers/{}/wait", id)))?;
        tracing::debug!(container = %id, exit_code = result.status_code, "Container exited");
        Ok(result.status_code)
    }

    pub fn remove_container(&self, id: &str) -> Result<()> {
        self.remove_container_with(id, RemoveOptions::default())
    }

    pub fn remove_container_with(&self, id: &str, options: RemoveOptions) -> Result<()> {
        let id = checked_id("container", id)?;
        let request = Request::delete(format!("/containers/{}", id))
            .flag("v", options.volumes)
            .flag("force", options.force);
        self.discard(request)?;
        tracing::info!(container = %id, "Container removed");
        Ok(())
    }

    /// stdout and stderr produced so far
    pub fn logs(&self, id: &str) -> Result<LogStream> {
        self.logs_with(id, &LogOptions::default())
    }

    pub fn logs_with(&self, id: &str, options: &LogOptions) -> Result<LogStream> {
        let id = checked_id("container", id)?;
        if !options.stdout && !options.stderr {
            return Err(Error::Validation("logs need at least one of stdout or stderr".into()));
        }
        let tail = options.tail.map_or_else(|| "all".to_string(), |n| n.to_string());
        let request = Request::get(format!("/containers/{}/logs", id))
            .flag("stdout", options.stdout)
            .flag("stderr", options.stderr)
            .flag("follow", options.follow)
            .flag("timestamps", options.timestamps)
            .query("tail", tail);

        let response = self.execute(request)?;
        let multiplexed = response
            .content_type()
            .is_some_and(|ct| ct.starts_with(MULTIPLEXED_STREAM));
        let body = response.into_body();
        Ok(if multiplexed {
            LogStream::multiplexed(body)
        } else {
            LogStream::lines(body)
        })
    }

    // === Images ===

    pub fn list_images(&self, all: bool) -> Result<Vec<ImageRecord>> {
        self.fetch_list(Request::get("/images/json").flag("all", all))
    }

    pub fn inspect_image(&self, name: &str) -> Result<ImageInspectResult> {
        let name = checked_id("image", name)?;
        self.fetch(Request::get(format!("/images/{}/json", name)))
    }

    pub fn remove_image(&self, name: &str, force: bool) -> Result<Vec<ImageDeleteItem>> {
        let name = checked_id("image", name)?;
        let deleted = self.fetch_list(Request::delete(format!("/images/{}", name)).flag("force", force))?;
        tracing::info!(image = %name, "Image removed");
        Ok(deleted)
    }

    /// Tag `image` as `repo:tag`
    pub fn tag_image(&self, image: &str, repo: &str, tag: &str, force: bool) -> Result<()> {
        let image = checked_id("image", image)?;
        let repo = checked_id("repository", repo)?;
        let tag = checked_id("tag", tag)?;
        let request = Request::post(format!("/images/{}/tag", image))
            .query("repo", repo)
            .query("tag", tag)
            .flag("force", force);
        self.discard(request)?;
        tracing::info!(image = %image, repo = %repo, tag = %tag, "Image tagged");
        Ok(())
    }

    pub fn search(&self, term: &str) -> Result<Vec<SearchItem>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(Error::Validation("search term cannot be empty".into()));
        }
        self.fetch_list(Request::get("/images/search").query("term", term))
    }

    /// Create an image from a container's filesystem; returns the image id.
    pub fn commit(&self, commit: &CommitConfig) -> Result<String> {
        let container = checked_id("container", &commit.container)?;
        let mut request = Request::post("/commit")
            .query("container", container)
            .query_opt("repo", commit.repo.as_deref())
            .query_opt("tag", commit.tag.as_deref())
            .query_opt("comment", commit.message.as_deref())
            .query_opt("author", commit.author.as_deref());
        if let Some(pause) = commit.pause {
            request = request.flag("pause", pause);
        }
        if let Some(config) = &commit.config {
            request = request.body(Body::json(codec::encode(config)?));
        }

        let result: CommitResult = self.fetch(request)?;
        tracing::info!(container = %container, image = %result.id, "Container committed");
        Ok(result.id)
    }

    /// Pull an image. The stream must be drained for the pull to finish;
    /// see [`ProgressStream::finish`].
    pub fn pull(&self, image: &str) -> Result<ProgressStream> {
        let reference = ImageReference::parse(image)?;
        let tag = reference
            .tag
            .or(reference.digest)
            .unwrap_or_else(|| "latest".to_string());
        self.pull_reference(&reference.repository, &tag)
    }

    pub fn pull_with_tag(&self, repository: &str, tag: &str) -> Result<ProgressStream> {
        let repository = checked_id("repository", repository)?;
        let tag = checked_id("tag", tag)?;
        self.pull_reference(repository, tag)
    }

    fn pull_reference(&self, repository: &str, tag: &str) -> Result<ProgressStream> {
        let mut request = Request::post("/images/create")
            .query("fromImage", repository)
            .query("tag", tag);
        if self.auth.is_some() {
            request = request.header(REGISTRY_AUTH_HEADER, self.registry_auth()?);
        }
        tracing::info!(image = %repository, tag = %tag, "Pulling image");
        let response = self.execute(request)?;
        Ok(ProgressStream::new(ProgressKind::Pull, response.into_body()))
    }

    pub fn push(&self, image: &str) -> Result<ProgressStream> {
        let reference = ImageReference::parse(image)?;
        let repository = checked_id("image", &reference.repository)?;
        let request = Request::post(format!("/images/{}/push", repository))
            .query_opt("tag", reference.tag.as_deref())
            .header(REGISTRY_AUTH_HEADER, self.registry_auth()?);
        tracing::info!(image = %repository, "Pushing image");
        let response = self.execute(request)?;
        Ok(ProgressStream::new(ProgressKind::Push, response.into_body()))
    }

    /// Build from a directory holding a `Dockerfile`
    pub fn build(&self, context_dir: &Path) -> Result<ProgressStream> {
        self.build_with(context_dir, &BuildOptions::default())
    }

    pub fn build_with(&self, context_dir: &Path, options: &BuildOptions) -> Result<ProgressStream> {
        let context = package_context(context_dir, &options.dockerfile)?;
        let request = Request::post("/build")
            .query("dockerfile", options.dockerfile.clone())
            .query_opt("t", options.tag.as_deref())
            .flag("q", options.quiet)
            .flag("nocache", options.no_cache)
            .flag("rm", options.remove)
            .body(Body::tar(context));
        tracing::info!(context = %context_dir.display(), tag = ?options.tag, "Building image");
        let response = self.execute(request)?;
        Ok(ProgressStream::new(ProgressKind::Build, response.into_body()))
    }
}

/// Reject identifiers that cannot be placed in a request path or query
fn checked_id<'a>(what: &str, id: &'a str) -> Result<&'a str> {
    let id = id.trim();
    let bad_char = id.chars().any(|c| c.is_whitespace() || matches!(c, '?' | '#' | '%'));
    // `.`/`..` or empty segments would be normalised onto another endpoint
    let bad_segment = id.split('/').any(|segment| matches!(segment, "" | "." | ".."));
    if id.is_empty() || bad_char || bad_segment {
        return Err(Error::Validation(format!("invalid {} identifier {:?}", what, id)));
    }
    Ok(id)
}

/// Tar the build context in memory
fn package_context(dir: &Path, dockerfile: &str) -> Result<Vec<u8>> {
    if !dir.is_dir() {
        return Err(Error::Validation(format!(
            "build context {} is not a directory",
            dir.display()
        )));
    }
    if !dir.join(dockerfile).is_file() {
        return Err(Error::Validation(format!(
            "build context {} has no {}",
            dir.display(),
            dockerfile
        )));
    }

    let packaging_error =
        |e: std::io::Error| Error::Validation(format!("cannot package build context {}: {}", dir.display(), e));
    let mut archive = tar::Builder::new(Vec::new());
    archive.append_dir_all(".", dir).map_err(packaging_error)?;
    let bytes = archive.into_inner().map_err(packaging_error)?;
    tracing::debug!(context = %dir.display(), bytes = bytes.len(), "Build context packaged");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use crate::{ClientErrorKind, ErrorKind};
    use std::io::Cursor;

    fn respond(status: u16, body: &'static str) -> Result<RawResponse> {
        Ok(RawResponse::new(
            status,
            vec![("Content-Type".into(), "application/json".into())],
            Cursor::new(body.as_bytes()),
        ))
    }

    fn client(transport: MockTransport) -> DockerClient<MockTransport> {
        DockerClient::with_transport(transport)
    }

    #[test]
    fn test_create_sends_encoded_config() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                let body: serde_json::Value = serde_json::from_slice(&req.body.as_ref().unwrap().bytes).unwrap();
                req.path == "/containers/create"
                    && req.query_value("name") == Some("web")
                    && body == serde_json::json!({"Image": "busybox", "Cmd": ["true"]})
            })
            .times(1)
            .returning(|_| respond(201, r#"{"Id":"e90e34656806","Warnings":[]}"#));

        let config = ContainerConfig::new("busybox").with_cmd(["true"]);
        let created = client(transport).create_container_named(&config, "web").unwrap();
        assert_eq!(created.id, "e90e34656806");
    }

    #[test]
    fn test_create_rejected_config_is_validation() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_| respond(400, r#"{"message":"invalid port specification"}"#));

        let err = client(transport)
            .create_container(&ContainerConfig::new("busybox"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("invalid port specification"));
    }

    #[test]
    fn test_create_missing_image_is_not_found() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_| respond(404, r#"{"message":"No such image: nope:latest"}"#));

        let err = client(transport).create_container(&ContainerConfig::new("nope")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_input_never_reaches_daemon() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();
        let docker = client(transport);

        assert!(matches!(docker.create_container(&ContainerConfig::new(" ")), Err(Error::Validation(_))));
        assert!(matches!(docker.start_container(""), Err(Error::Validation(_))));
        assert!(matches!(docker.inspect_container("a b"), Err(Error::Validation(_))));
        assert!(matches!(docker.search("  "), Err(Error::Validation(_))));
        for id in ["..", ".", "/etc", "a/../json", "busybox/"] {
            assert!(matches!(docker.inspect_container(id), Err(Error::Validation(_))), "{:?} accepted", id);
        }
        assert!(matches!(docker.inspect_image("../../info"), Err(Error::Validation(_))));
        assert!(matches!(docker.pull("busybox:"), Err(Error::Validation(_))));
        let no_output = LogOptions {
            stdout: false,
            stderr: false,
            ..Default::default()
        };
        assert!(matches!(docker.logs_with("abc", &no_output), Err(Error::Validation(_))));
    }

    #[test]
    fn test_second_start_is_surfaced() {
        let mut transport = MockTransport::new();
        let mut calls = 0;
        transport.expect_send().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                respond(204, "")
            } else {
                respond(304, "")
            }
        });

        let docker = client(transport);
        docker.start_container("abc").unwrap();
        let err = docker.start_container("abc").unwrap_err();
        assert_eq!(err.client_kind(), Some(ClientErrorKind::NotModified));
    }

    #[test]
    fn test_stop_and_restart_pass_timeout() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.path == "/containers/abc/stop" && req.query_value("t") == Some("2"))
            .times(1)
            .returning(|_| respond(204, ""));
        transport
            .expect_send()
            .withf(|req| req.path == "/containers/abc/restart" && req.query_value("t") == Some("5"))
            .times(1)
            .returning(|_| respond(204, ""));

        let docker = client(transport);
        docker.stop_container("abc", 2).unwrap();
        docker.restart_container("abc", 5).unwrap();
    }

    #[test]
    fn test_wait_returns_exit_code() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.method == reqwest::Method::POST && req.path == "/containers/abc/wait")
            .returning(|_| respond(200, r#"{"StatusCode":137,"Error":null}"#));

        assert_eq!(client(transport).wait_container("abc").unwrap(), 137);
    }

    #[test]
    fn test_inspect_is_never_cached() {
        let mut transport = MockTransport::new();
        let mut running = true;
        transport.expect_send().times(2).returning(move |_| {
            let body = if running {
                r#"{"Id":"abcdef","State":{"Running":true}}"#
            } else {
                r#"{"Id":"abcdef","State":{"Running":false,"ExitCode":0}}"#
            };
            running = false;
            respond(200, body)
        });

        let docker = client(transport);
        assert!(docker.inspect_container("abc").unwrap().state.running);
        assert!(!docker.inspect_container("abc").unwrap().state.running);
    }

    #[test]
    fn test_transport_failure_propagates() {
        let mut transport = MockTransport::new();
        transport.expect_send().returning(|_| {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        });

        let err = client(transport).info().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_malformed_body() {
        let mut transport = MockTransport::new();
        transport.expect_send().returning(|_| respond(200, "<html>proxy</html>"));

        let err = client(transport).version().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_logs_pick_framing_from_content_type() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.query_value("tail") == Some("all") && req.query_value("follow") == Some("0"))
            .returning(|_| {
                let mut body = vec![1u8, 0, 0, 0, 0, 0, 0, 12];
                body.extend_from_slice(b"hello world\n");
                Ok(RawResponse::new(
                    200,
                    vec![("Content-Type".into(), "application/vnd.docker.multiplexed-stream".into())],
                    Cursor::new(body),
                ))
            });

        let logs = client(transport).logs("abc").unwrap();
        assert!(logs.is_multiplexed());
        assert_eq!(logs.text().unwrap(), "hello world");
    }

    #[test]
    fn test_pull_request_shape() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                req.path == "/images/create"
                    && req.query_value("fromImage") == Some("localhost:5000/app")
                    && req.query_value("tag") == Some("latest")
                    && req.headers.iter().any(|(k, _)| k == REGISTRY_AUTH_HEADER)
            })
            .returning(|_| respond(200, r#"{"status":"Status: Image is up to date for localhost:5000/app:latest"}"#));

        let docker = client(transport).with_auth(AuthConfig::new("jane", "secret"));
        let outcome = docker.pull("localhost:5000/app").unwrap().finish().unwrap();
        assert!(outcome.is_success());
    }

    #[test]
    fn test_commit_query() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                req.path == "/commit"
                    && req.query_value("container") == Some("abc")
                    && req.query_value("repo") == Some("snapshots/app")
                    && req.query_value("comment") == Some("after touch")
                    && req.body.is_none()
            })
            .returning(|_| respond(201, r#"{"Id":"sha256:7f2e"}"#));

        let commit = CommitConfig::new("abc")
            .with_repo("snapshots/app")
            .with_message("after touch");
        assert_eq!(client(transport).commit(&commit).unwrap(), "sha256:7f2e");
    }

    #[test]
    fn test_build_packages_context() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM busybox\nCMD [\"true\"]\n").unwrap();
        std::fs::create_dir(dir.path().join("scripts")).unwrap();
        std::fs::write(dir.path().join("scripts").join("run.sh"), "echo hi\n").unwrap();

        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                let body = req.body.as_ref().unwrap();
                let mut archive = tar::Archive::new(Cursor::new(body.bytes.clone()));
                let names: Vec<String> = archive
                    .entries()
                    .unwrap()
                    .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
                    .collect();
                req.path == "/build"
                    && req.query_value("t") == Some("demo:1")
                    && body.content_type == "application/x-tar"
                    && names.iter().any(|n| n.ends_with("Dockerfile"))
                    && names.iter().any(|n| n.ends_with("scripts/run.sh"))
            })
            .returning(|_| respond(200, r#"{"stream":"Successfully built 4dd97cefde62\n"}"#));

        let outcome = client(transport)
            .build_with(dir.path(), &BuildOptions::tagged("demo:1"))
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(outcome.built_image_id().as_deref(), Some("4dd97cefde62"));
    }

    #[test]
    fn test_build_requires_dockerfile() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut transport = MockTransport::new();
        transport.expect_send().never();

        let err = client(transport).build(dir.path()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_tag_and_search_queries() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                req.path == "/images/busybox/tag"
                    && req.query_value("repo") == Some("docker-java/busybox")
                    && req.query_value("tag") == Some("42")
                    && req.query_value("force") == Some("0")
            })
            .times(1)
            .returning(|_| respond(201, ""));
        transport
            .expect_send()
            .withf(|req| req.path == "/images/search" && req.query_value("term") == Some("busybox"))
            .times(1)
            .returning(|_| {
                respond(
                    200,
                    r#"[{"name":"busybox","description":"Busybox base image.","star_count":2800,"is_official":true}]"#,
                )
            });

        let docker = client(transport);
        docker.tag_image("busybox", "docker-java/busybox", "42", false).unwrap();
        let found = docker.search("busybox").unwrap();
        assert!(found[0].is_official);
        assert_eq!(found[0].star_count, 2800);
    }

    #[test]
    fn test_kill_signal_is_optional() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.path == "/containers/abc/kill" && req.query_value("signal").is_none())
            .times(1)
            .returning(|_| respond(204, ""));
        transport
            .expect_send()
            .withf(|req| req.path == "/containers/abc/kill" && req.query_value("signal") == Some("SIGTERM"))
            .times(1)
            .returning(|_| respond(204, ""));

        let docker = client(transport);
        docker.kill_container("abc").unwrap();
        docker.kill_container_with("abc", Some("SIGTERM")).unwrap();
    }

    #[test]
    fn test_pull_with_tag_skips_auth_without_credentials() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                req.query_value("fromImage") == Some("busybox")
                    && req.query_value("tag") == Some("1.36")
                    && req.headers.is_empty()
            })
            .returning(|_| respond(200, r#"{"status":"Status: Downloaded newer image for busybox:1.36"}"#));

        let stream = client(transport).pull_with_tag("busybox", "1.36").unwrap();
        assert_eq!(stream.kind(), ProgressKind::Pull);
        assert!(stream.finish().unwrap().is_success());
    }

    #[test]
    fn test_remove_image_decodes_items() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.method == reqwest::Method::DELETE && req.path == "/images/docker-java/busybox:42")
            .returning(|_| respond(200, r#"[{"Untagged":"docker-java/busybox:42"}]"#));

        let items = client(transport).remove_image("docker-java/busybox:42", false).unwrap();
        assert_eq!(items[0].untagged.as_deref(), Some("docker-java/busybox:42"));
    }

    #[test]
    fn test_daemon_message_reaches_caller() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_| respond(404, r#"{"message":"No such container: gone"}"#));

        let err = client(transport).wait_container("gone").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("No such container: gone"));
    }
}
