//! TrailGuard command-line client: entry point.
//!
//! Drives the data-sync layer from a terminal.  Every command builds the
//! same hooks a graphical front end would use (`ProjectSync`, `BatchSync`,
//! `ImageAnalysis`, ...) on top of a fresh `ResourceCache` and the reqwest
//! transport, then prints the result as pretty JSON.
//!
//! # Usage
//!
//! ```text
//! trailguard [OPTIONS] <COMMAND>
//!
//! Commands:
//!   health                                   Check the back end is up
//!   projects list                            List projects
//!   projects create --name <NAME> [--description <TEXT>]
//!   projects results <ID> [--page N] [--limit N]
//!   projects sessions <ID>
//!   species                                  List the species catalogue
//!   analyze <FILE>                           Analyse one image
//!   analyze-batch <FILES>...                 Analyse several images
//!   batch start <PROJECT> <PATHS>... [--watch]
//!   batch status <PROJECT> <TASK> [--watch]
//!   live <PROJECT>                           Stream realtime events
//!   config show|init
//!
//! Options:
//!   --config <PATH>      Config file [default: platform config dir]
//!   --api-url <URL>      Back-end base URL (env TRAILGUARD_API_URL)
//!   --log-level <LEVEL>  Fallback log level when RUST_LOG is unset
//! ```
//!
//! Logs go to stderr so stdout carries only JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trailguard_client::application::api::{self, SharedTransport};
use trailguard_client::application::batch_processing::{is_finished, BatchSync};
use trailguard_client::application::cache::{Query, ResourceCache};
use trailguard_client::application::image_analysis::ImageAnalysis;
use trailguard_client::application::live_updates::LiveUpdates;
use trailguard_client::application::projects::ProjectSync;
use trailguard_client::application::species::SpeciesSync;
use trailguard_client::infrastructure::http::HttpTransport;
use trailguard_client::infrastructure::realtime;
use trailguard_client::infrastructure::storage::config::{
    config_file_path, load_config_from, save_config_to, AppConfig,
};
use trailguard_core::domain::analysis::ImageFile;
use trailguard_core::{NewProject, ResultsPage};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// TrailGuard wildlife image analysis client.
#[derive(Debug, Parser)]
#[command(name = "trailguard", about = "Client for the TrailGuard analysis service", version)]
struct Cli {
    /// Path of the TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the back end, overriding `api.base_url`.
    #[arg(long, global = true, env = "TRAILGUARD_API_URL")]
    api_url: Option<String>,

    /// Log level used when `RUST_LOG` is not set, overriding `logging.level`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the back end answers `/health`.
    Health,
    /// Project listing, creation, results and sessions.
    Projects {
        #[command(subcommand)]
        action: ProjectsCommand,
    },
    /// List the species catalogue.
    Species,
    /// Analyse one image file.
    Analyze { file: PathBuf },
    /// Analyse several image files in one request.
    AnalyzeBatch {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Server-side batch processing of stored images.
    Batch {
        #[command(subcommand)]
        action: BatchCommand,
    },
    /// Print realtime events of a project until interrupted.
    Live { project: String },
    /// Inspect or create the config file.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ProjectsCommand {
    List,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Results {
        project: String,
        #[arg(long, default_value_t = trailguard_core::domain::project::DEFAULT_PAGE)]
        page: u32,
        #[arg(long, default_value_t = trailguard_core::domain::project::DEFAULT_LIMIT)]
        limit: u32,
    },
    Sessions {
        project: String,
    },
}

#[derive(Debug, Subcommand)]
enum BatchCommand {
    /// Start processing server-side image paths.
    Start {
        project: String,
        #[arg(required = true)]
        paths: Vec<String>,
        /// Poll the new task until it finishes.
        #[arg(long)]
        watch: bool,
    },
    /// Show the status of a task.
    Status {
        project: String,
        task: String,
        /// Keep polling until the task finishes.
        #[arg(long)]
        watch: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration.
    Show,
    /// Write the effective configuration to the config file.
    Init,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path()?,
    };
    let mut config = load_config_from(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }

    // `RUST_LOG` wins; otherwise --log-level, then the config file.
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(api = %config.api.base_url, "trailguard starting");
    run(cli.command, config, &config_path).await
}

async fn run(command: Command, config: AppConfig, config_path: &Path) -> anyhow::Result<()> {
    let connect = || -> anyhow::Result<SharedTransport> {
        let transport =
            HttpTransport::new(&config.api).context("failed to build the HTTP client")?;
        Ok(Arc::new(transport))
    };
    let cache = ResourceCache::new(config.cache.to_cache_config());

    match command {
        Command::Health => {
            let transport = connect()?;
            let health = api::health(transport.as_ref()).await?;
            if !health.is_ok() {
                warn!(status = %health.status, "back end reports a degraded status");
            }
            print_json(&health)
        }
        Command::Projects { action } => projects(action, cache, connect()?).await,
        Command::Species => {
            let mut query = SpeciesSync::new(cache, connect()?).list_species();
            print_json(&settled(&mut query).await?)
        }
        Command::Analyze { file } => {
            let analysis = ImageAnalysis::new(connect()?);
            analysis.select_file(read_image(&file)?)?;
            let result = analysis.analyze_selected().await?;
            println!("{}", result.pretty());
            Ok(())
        }
        Command::AnalyzeBatch { files } => {
            let images = files
                .iter()
                .map(|path| read_image(path))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let summary = ImageAnalysis::new(connect()?).analyze_images(&images).await?;
            print_json(&summary)
        }
        Command::Batch { action } => {
            let every = config.polling.batch_status_interval();
            batch(action, cache, connect()?, every).await
        }
        Command::Live { project } => live(cache, &config.api.base_url, &project).await,
        Command::Config { action } => config_command(action, &config, config_path),
    }
}

async fn projects(
    action: ProjectsCommand,
    cache: ResourceCache,
    transport: SharedTransport,
) -> anyhow::Result<()> {
    let sync = ProjectSync::new(cache, transport);
    match action {
        ProjectsCommand::List => print_json(&settled(&mut sync.list_projects()).await?),
        ProjectsCommand::Create { name, description } => {
            let mut draft = NewProject::named(name);
            if let Some(description) = description {
                draft = draft.with_description(description);
            }
            print_json(&sync.create_project(draft).await?)
        }
        ProjectsCommand::Results {
            project,
            page,
            limit,
        } => {
            let page = ResultsPage::new(page, limit)?;
            let mut query = sync.project_results(Some(&project), page)?;
            print_json(&settled(&mut query).await?)
        }
        ProjectsCommand::Sessions { project } => {
            print_json(&settled(&mut sync.project_sessions(Some(&project))).await?)
        }
    }
}

async fn batch(
    action: BatchCommand,
    cache: ResourceCache,
    transport: SharedTransport,
    every: std::time::Duration,
) -> anyhow::Result<()> {
    match action {
        BatchCommand::Start {
            project,
            paths,
            watch,
        } => {
            let sync = BatchSync::new(cache, transport, project).with_poll_interval(every);
            let task = sync.start_batch(&paths).await?;
            print_json(&task)?;
            if watch {
                watch_batch(&sync, &task.task_id).await?;
            }
            Ok(())
        }
        BatchCommand::Status {
            project,
            task,
            watch,
        } => {
            let sync = BatchSync::new(cache, transport, project).with_poll_interval(every);
            if watch {
                watch_batch(&sync, &task).await
            } else {
                print_json(&settled(&mut sync.watch_status(Some(&task))).await?)
            }
        }
    }
}

/// Prints each distinct status of `task_id` until the task finishes.
async fn watch_batch(sync: &BatchSync, task_id: &str) -> anyhow::Result<()> {
    let mut query = sync.watch_status(Some(task_id));
    let mut last = None;
    loop {
        let state = query.changed().await;
        if state.is_fetching {
            continue;
        }
        if let Some(err) = state.error {
            return Err(err).with_context(|| format!("polling task {task_id} failed"));
        }
        let Some(status) = state.data else { continue };
        if last != Some(status.status) {
            print_json(&status)?;
            last = Some(status.status);
        }
        if is_finished(&status) {
            return Ok(());
        }
    }
}

async fn live(cache: ResourceCache, base_url: &str, project: &str) -> anyhow::Result<()> {
    let feed = realtime::connect(base_url, project).await?;
    let mut updates = LiveUpdates::start(cache, project, feed);
    loop {
        tokio::select! {
            event = updates.next() => match event {
                Some(event) => print_json(&event)?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }
    updates.stop();
    Ok(())
}

fn config_command(action: ConfigCommand, config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    match action {
        ConfigCommand::Show => {
            println!("# {}", path.display());
            print!("{}", toml::to_string_pretty(config)?);
        }
        ConfigCommand::Init => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            save_config_to(config, path)?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Waits for the first settled state of `query` and returns its data.
async fn settled<T: DeserializeOwned>(query: &mut Query<T>) -> anyhow::Result<T> {
    let state = query.wait_settled().await;
    if let Some(err) = state.error {
        return Err(err.into());
    }
    state.data.context("the back end returned no data")
}

fn read_image(path: &Path) -> anyhow::Result<ImageFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(ImageFile::new(name, bytes))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_results_defaults_to_first_page_of_fifty() {
        // Arrange / Act
        let cli = Cli::parse_from(["trailguard", "projects", "results", "p1"]);

        // Assert
        match cli.command {
            Command::Projects {
                action: ProjectsCommand::Results { project, page, limit },
            } => {
                assert_eq!(project, "p1");
                assert_eq!(page, 1);
                assert_eq!(limit, 50);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_create_accepts_optional_description() {
        let cli = Cli::parse_from([
            "trailguard",
            "projects",
            "create",
            "--name",
            "Kruger",
            "--description",
            "dry season",
        ]);
        assert!(matches!(
            cli.command,
            Command::Projects {
                action: ProjectsCommand::Create { ref name, description: Some(ref d) }
            } if name == "Kruger" && d == "dry season"
        ));
    }

    #[test]
    fn test_global_flags_are_accepted_after_subcommand() {
        let cli = Cli::parse_from([
            "trailguard",
            "species",
            "--api-url",
            "http://10.0.0.5:8000",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.api_url.as_deref(), Some("http://10.0.0.5:8000"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_batch_start_collects_paths_and_watch_flag() {
        let cli = Cli::parse_from([
            "trailguard",
            "batch",
            "start",
            "p1",
            "/data/a.jpg",
            "/data/b.jpg",
            "--watch",
        ]);
        match cli.command {
            Command::Batch {
                action: BatchCommand::Start { project, paths, watch },
            } => {
                assert_eq!(project, "p1");
                assert_eq!(paths, vec!["/data/a.jpg", "/data/b.jpg"]);
                assert!(watch);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_analyze_batch_requires_files() {
        let result = Cli::try_parse_from(["trailguard", "analyze-batch"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_image_uses_file_name_and_infers_type() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("trailguard-cli-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cam1.jpg");
        std::fs::write(&path, [0xFF, 0xD8]).unwrap();

        // Act
        let image = read_image(&path).unwrap();

        // Assert
        assert_eq!(image.name, "cam1.jpg");
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(image.bytes, vec![0xFF, 0xD8]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_read_missing_file_reports_path() {
        let err = read_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.png"));
    }
}
