//! MediaManager CLI - manage a media library stored in a GitHub repository
//!
//! Usage:
//!   mediamanager-cli login --owner <o> --repo <r>   Validate and store credentials
//!   mediamanager-cli ls [--category c] [--search s] List the library
//!   mediamanager-cli upload <files>...              Upload images, videos, audio
//!   mediamanager-cli rm <path>                      Delete a stored file
//!   mediamanager-cli embed <path>                   Print the HTML embed snippet

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mediamanager::config::{self, AppConfig};
use mediamanager::providers::GitHubConfig;
use mediamanager::upload::UploadItem;
use mediamanager::{
    init_logging, Catalog, Category, GitHubFactory, LocalFile, SessionFile, SessionStore, UploadQueue,
    UploadStatus, UploadWorkflow, EMPTY_CATALOG_MESSAGE,
};

#[derive(Parser)]
#[command(
    name = "mediamanager-cli",
    about = "MediaManager CLI - media library stored in a GitHub repository",
    version
)]
struct Cli {
    /// Config file (default: <config dir>/mediamanager/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Warnings and errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate credentials against the repository and store them
    Login {
        /// Personal access token
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: String,
        /// Repository owner
        #[arg(long)]
        owner: String,
        /// Repository name
        #[arg(long)]
        repo: String,
        /// Branch (default from config, normally "main")
        #[arg(long)]
        branch: Option<String>,
    },
    /// Forget the stored credentials
    Logout,
    /// Show the active session
    Status,
    /// List stored media
    Ls {
        /// all, images, videos or audio
        #[arg(long, default_value = "all")]
        category: Category,
        /// Case-insensitive name filter
        #[arg(long, default_value = "")]
        search: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Upload local files into their category folder
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Delete a stored file
    Rm {
        /// Repository path, e.g. images/cat.png
        path: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Print the HTML embed snippet of a stored file
    Embed {
        /// Repository path, e.g. videos/clip.mp4
        path: String,
        /// Print the raw content URL instead
        #[arg(long)]
        raw: bool,
    },
}

struct App {
    config: AppConfig,
    store: SessionStore,
}

fn open(config_path: Option<&Path>) -> Result<App> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path);
    let config = config::load_config(&config_path);
    if !config_path.exists() {
        if let Err(e) = config::save_config(&config_path, &config) {
            tracing::warn!("Could not write default config {}: {}", config_path.display(), e);
        }
    }
    config::validate_config(&config).with_context(|| format!("Invalid config {}", config_path.display()))?;

    let session_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(config::config_dir);
    let factory = Arc::new(GitHubFactory::new(GitHubConfig::from_app_config(&config)));
    let store = SessionStore::new(SessionFile::in_dir(&session_dir), factory)
        .with_default_branch(&config.default_branch);

    Ok(App { config, store })
}

fn require_login(store: &mut SessionStore) -> Result<()> {
    if !store.restore_session()? {
        bail!("Not logged in. Run `mediamanager-cli login` first.");
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    Ok(pb)
}

fn report_item(pb: &ProgressBar, item: &UploadItem) {
    match item.status {
        UploadStatus::Uploading => pb.set_message(item.name.clone()),
        UploadStatus::Completed => {
            pb.inc(1);
            pb.println(format!("  ok    {}", item.name));
        }
        UploadStatus::Error => {
            pb.inc(1);
            pb.println(format!(
                "  error {}: {}",
                item.name,
                item.error.as_deref().unwrap_or_default()
            ));
        }
        UploadStatus::Pending => {}
    }
}

async fn run(cli: Cli) -> Result<()> {
    let App { config, mut store } = open(cli.config.as_deref())?;

    match cli.command {
        Commands::Login { token, owner, repo, branch } => {
            let session = store
                .login(SecretString::from(token), &owner, &repo, branch.as_deref())
                .await?;
            println!("Logged in to {}", session.describe());
        }

        Commands::Logout => {
            store.logout()?;
            println!("Logged out");
        }

        Commands::Status => {
            if store.restore_session()? {
                if let (Some(session), Some(client)) = (store.session(), store.client()) {
                    println!("Logged in to {} ({})", session.describe(), client.display_name());
                }
            } else {
                println!("Not logged in");
            }
            println!("Session file: {}", store.file().path().display());
        }

        Commands::Ls { category, search, json } => {
            require_login(&mut store)?;
            let (session, client) = store.require()?;
            let mut catalog = Catalog::new();
            catalog.refresh(&client, &session).await?;
            let visible = catalog.filtered(category, &search);

            if json {
                let rows: Vec<serde_json::Value> = visible
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "name": e.name,
                            "path": e.path,
                            "sha": e.sha,
                            "size": e.size,
                            "media_type": e.media_type,
                            "raw_url": e.raw_url(&config.raw_host, &session),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }

            let tabs: Vec<String> = Category::ALL
                .iter()
                .map(|c| {
                    let count = catalog.entries().iter().filter(|e| c.matches(e.media_type)).count();
                    let marker = if *c == category { "*" } else { "" };
                    format!("{}{} ({})", marker, c.label(), count)
                })
                .collect();
            println!("{}", tabs.join("  "));
            println!();

            if visible.is_empty() {
                println!("{}", EMPTY_CATALOG_MESSAGE);
            }
            for entry in visible {
                println!(
                    "{:<7} {:>10}  {}",
                    entry.media_type.folder(),
                    entry.size,
                    entry.path
                );
            }
        }

        Commands::Upload { files } => {
            require_login(&mut store)?;
            let (session, client) = store.require()?;

            let mut locals = Vec::with_capacity(files.len());
            for path in &files {
                let file = LocalFile::from_path(path)
                    .await
                    .with_context(|| format!("Cannot read {}", path.display()))?;
                locals.push(file);
            }
            let mut queue = UploadQueue::new();
            let added = queue.add_files(locals);
            if added < files.len() {
                println!("Skipped {} duplicate name(s)", files.len() - added);
            }
            for item in queue.items() {
                println!("  {:<40} {:>10}  {}", item.name, item.size_mb_label(), item.type_label());
            }

            let workflow = UploadWorkflow::new(client.clone(), session.clone(), config.completion_delay());
            let pb = progress_bar(queue.len())?;
            let report = workflow
                .run_with_progress(&mut queue, |item| report_item(&pb, item))
                .await;
            pb.finish_and_clear();

            println!(
                "{} uploaded, {} failed, {} unsupported",
                report.uploaded, report.failed, report.unsupported
            );

            if workflow.await_completion(&queue).await {
                let mut catalog = Catalog::new();
                let total = catalog.refresh(&client, &session).await?;
                println!("Library now holds {} files", total);
            } else {
                bail!("{} of {} files were not uploaded", queue.len() - queue.completed_count(), queue.len());
            }
        }

        Commands::Rm { path, yes } => {
            require_login(&mut store)?;
            let (session, client) = store.require()?;
            if !yes && !confirm(&format!("Delete {} from {}?", path, session.describe()))? {
                println!("Aborted");
                return Ok(());
            }
            let mut catalog = Catalog::new();
            let outcome = catalog
                .delete(&client, &session, &path)
                .await
                .with_context(|| format!("Failed to delete {}", path))?;
            match outcome.remaining {
                Some(count) => println!("Deleted {}; {} files remain", path, count),
                None => println!("Deleted {}", path),
            }
        }

        Commands::Embed { path, raw } => {
            require_login(&mut store)?;
            let (session, client) = store.require()?;
            let mut catalog = Catalog::new();
            catalog.refresh(&client, &session).await?;
            let Some(entry) = catalog.find_by_path(&path) else {
                bail!("No media file at {}", path);
            };
            if raw {
                println!("{}", entry.raw_url(&config.raw_host, &session));
            } else {
                println!("{}", entry.embed_code(&config.raw_host, &session));
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    init_logging(level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
