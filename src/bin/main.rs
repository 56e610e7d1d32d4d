//! Docker Remote CLI

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docker_remote::models::{BuildOptions, ContainerConfig, LogOptions, RemoveOptions};
use docker_remote::{ClientConfig, Completion, DockerClient, ProgressStream};

#[derive(Parser)]
#[command(name = "docker-remote")]
#[command(about = "Talk to a Docker daemon over its remote API", long_about = None)]
struct Cli {
    /// Daemon endpoint (default: $DOCKER_HOST or http://localhost:2375)
    #[arg(long, global = true)]
    host: Option<String>,
    /// API version prefix, e.g. 1.41
    #[arg(long, global = true)]
    api_version: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon version
    Version,
    /// Show daemon-wide information
    Info,
    /// List containers
    Ps {
        /// Include stopped containers
        #[arg(short, long)]
        all: bool,
    },
    /// List images
    Images {
        /// Include intermediate images
        #[arg(short, long)]
        all: bool,
    },
    /// Pull an image
    Pull {
        /// Image reference, e.g. busybox:latest
        image: String,
    },
    /// Print a container's output
    Logs {
        /// Container name or ID
        container: String,
        #[arg(short, long)]
        follow: bool,
        /// Only the last N lines
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Build an image from a directory with a Dockerfile
    Build {
        /// Build context directory
        dir: PathBuf,
        /// Name the resulting image
        #[arg(short, long)]
        tag: Option<String>,
        #[arg(long)]
        no_cache: bool,
    },
    /// Create, start and wait for a container
    Run {
        image: String,
        /// Command to run
        cmd: Vec<String>,
        /// Remove the container after it exits
        #[arg(long)]
        rm: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("docker_remote=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let docker = connect(cli.host, cli.api_version)?;

    match cli.command {
        Some(Commands::Version) | None => cmd_version(&docker)?,
        Some(Commands::Info) => cmd_info(&docker)?,
        Some(Commands::Ps { all }) => cmd_ps(&docker, all)?,
        Some(Commands::Images { all }) => cmd_images(&docker, all)?,
        Some(Commands::Pull { image }) => cmd_pull(&docker, &image)?,
        Some(Commands::Logs { container, follow, tail }) => cmd_logs(&docker, &container, follow, tail)?,
        Some(Commands::Build { dir, tag, no_cache }) => cmd_build(&docker, dir, tag, no_cache)?,
        Some(Commands::Run { image, cmd, rm }) => cmd_run(&docker, &image, cmd, rm)?,
    }

    Ok(())
}

fn connect(host: Option<String>, api_version: Option<String>) -> docker_remote::Result<DockerClient> {
    let mut config = ClientConfig::from_env()?;
    if let Some(host) = host {
        config.endpoint = host;
    }
    if let Some(version) = api_version {
        config.api_version = Some(version);
    }
    config.validate()?;
    DockerClient::new(config)
}

fn cmd_version(docker: &DockerClient) -> Result<(), Box<dyn std::error::Error>> {
    let version = docker.version()?;
    println!("Version:     {}", version.version);
    println!("API version: {} (min {})", version.api_version, version.min_api_version);
    println!("Go version:  {}", version.go_version);
    println!("OS/Arch:     {}/{}", version.os, version.arch);
    Ok(())
}

fn cmd_info(docker: &DockerClient) -> Result<(), Box<dyn std::error::Error>> {
    let info = docker.info()?;
    println!("=== Daemon {} ===\n", info.name);
    println!("Containers: {} ({} running, {} stopped)", info.containers, info.containers_running, info.containers_stopped);
    println!("Images:     {}", info.images);
    println!("Driver:     {}", info.driver);
    println!("CPUs:       {}", info.ncpu);
    println!("Memory:     {} MB", info.mem_total / (1024 * 1024));
    println!("Kernel:     {}", info.kernel_version);
    Ok(())
}

fn cmd_ps(docker: &DockerClient, all: bool) -> Result<(), Box<dyn std::error::Error>> {
    let containers = docker.list_containers(all)?;
    if containers.is_empty() {
        println!("No containers found.");
        return Ok(());
    }

    println!("{:<14} {:<25} {:<25} {:<20}", "ID", "IMAGE", "STATUS", "NAME");
    println!("{}", "-".repeat(84));
    for c in containers {
        println!(
            "{:<14} {:<25} {:<25} {:<20}",
            &c.id[..c.id.len().min(12)],
            c.image,
            c.status,
            c.names.first().map(|n| n.trim_start_matches('/')).unwrap_or("-")
        );
    }
    Ok(())
}

fn cmd_images(docker: &DockerClient, all: bool) -> Result<(), Box<dyn std::error::Error>> {
    let images = docker.list_images(all)?;
    println!("{:<35} {:<15} {:<20} {:>10}", "REPOSITORY", "TAG", "ID", "SIZE");
    println!("{}", "-".repeat(83));
    for image in images {
        let id = image.id.trim_start_matches("sha256:");
        println!(
            "{:<35} {:<15} {:<20} {:>7} MB",
            image.repository().unwrap_or("<none>"),
            image.tag().unwrap_or("<none>"),
            &id[..id.len().min(12)],
            image.size / (1000 * 1000)
        );
    }
    Ok(())
}

fn cmd_pull(docker: &DockerClient, image: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("Pulling {}...", image);
    report_progress(docker.pull(image)?)
}

fn cmd_logs(
    docker: &DockerClient,
    container: &str,
    follow: bool,
    tail: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = LogOptions {
        follow,
        tail,
        ..Default::default()
    };
    for event in docker.logs_with(container, &options)? {
        println!("{}", event?.text());
    }
    Ok(())
}

fn cmd_build(
    docker: &DockerClient,
    dir: PathBuf,
    tag: Option<String>,
    no_cache: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = BuildOptions {
        tag,
        no_cache,
        ..Default::default()
    };
    println!("Building {}...", dir.display());
    report_progress(docker.build_with(&dir, &options)?)
}

fn cmd_run(docker: &DockerClient, image: &str, cmd: Vec<String>, rm: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ContainerConfig::new(image);
    if !cmd.is_empty() {
        config = config.with_cmd(cmd);
    }

    let created = docker.create_container(&config)?;
    docker.start_container(&created.id)?;
    let exit_code = docker.wait_container(&created.id)?;

    print!("{}", docker.logs(&created.id)?.text()?);
    println!("\nContainer {} exited with {}", &created.id[..created.id.len().min(12)], exit_code);

    if rm {
        docker.remove_container_with(&created.id, RemoveOptions { volumes: true, force: false })?;
    }
    Ok(())
}

/// Print each record as it arrives, then the outcome
fn report_progress(mut stream: ProgressStream) -> Result<(), Box<dyn std::error::Error>> {
    for record in stream.by_ref() {
        let text = record?.text();
        if !text.is_empty() {
            println!("  {}", text);
        }
    }

    match stream.finish()?.completion {
        Completion::Succeeded => println!("Done."),
        Completion::Failed(message) => return Err(message.into()),
        Completion::Unconfirmed => println!("Finished without a completion message."),
    }
    Ok(())
}
