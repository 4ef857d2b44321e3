use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use ghmirror::github::client::DEFAULT_API_BASE;
use ghmirror::github::{Comment, Thread};
use ghmirror::{
    ClientOptions, Config, GhMirror, GithubClient, MirrorStore, ReconcileOutcome, RepoRef,
    RepoTarget, SyncOptions, SyncReport,
};

#[derive(Parser)]
#[command(name = "ghmirror", about = "Mirror GitHub issue and PR comments into local text files")]
struct Cli {
    /// Config file (default: ~/.ghmirror/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// GitHub API token (optional, but helps with rate limits). Falls back to
    /// $GITHUB_TOKEN, then the config file.
    #[arg(long)]
    token: Option<String>,

    /// GitHub API base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Items per page for GitHub API requests (max 100)
    #[arg(long)]
    page_size: Option<u32>,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up one repository into a folder
    Sync {
        /// Repository, e.g. https://github.com/Akuli/porcupine or Akuli/porcupine
        repo: String,
        /// Folder where to back up the repository (e.g. ./issues)
        dest: PathBuf,
        /// Ignore the stored cursor and list every issue and PR
        #[arg(long)]
        full: bool,
        /// Print the sync report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update existing backup folders, using the GithubURL in their info.txt
    Update {
        #[arg(required = true)]
        folders: Vec<PathBuf>,
        #[arg(long)]
        full: bool,
        #[arg(long)]
        json: bool,
    },
    /// Sync every repository listed in the config file
    All {
        /// Repositories to sync at the same time
        #[arg(long)]
        jobs: Option<usize>,
        #[arg(long)]
        full: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show what a backup folder contains
    Status {
        folder: PathBuf,
    },
}

/// Progress reporter that writes to stderr.
struct StderrProgress;

impl ghmirror::SyncProgress for StderrProgress {
    fn on_repo_start(&self, repo: &RepoRef, since: Option<chrono::DateTime<chrono::Utc>>) {
        eprintln!("Backing up issue and PR comments: {}", repo.html_url());
        if let Some(since) = since {
            eprintln!("  Updating only what has changed since {since}.");
        }
    }

    fn on_thread_found(&self, thread: &Thread) {
        eprintln!("  Found {thread}");
    }

    fn on_thread_skipped(&self, _thread: &Thread) {
        eprintln!("    Already up to date");
    }

    fn on_comment(&self, _thread: &Thread, comment: &Comment, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::New(n) => {
                eprintln!("    New comment number {n} from {}", comment.author)
            }
            ReconcileOutcome::Overwritten(n) => eprintln!(
                "    Comment number {n} from {} has been edited, overwriting",
                comment.author
            ),
            ReconcileOutcome::Unchanged(n) => {
                eprintln!("    Comment number {n} from {} unchanged", comment.author)
            }
        }
    }

    fn on_repo_complete(&self, report: &SyncReport) {
        eprintln!(
            "  Done: {} threads listed, {} updated, {} new comments, {} edited",
            report.threads_seen,
            report.threads_updated,
            report.comments_new,
            report.comments_overwritten
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = Config::load_or_default(cli.config.as_deref())?;
    let token = cli
        .token
        .clone()
        .or_else(|| std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty()))
        .or_else(|| config.token.clone());
    let client = GithubClient::new(ClientOptions {
        api_base: cli
            .api_base
            .clone()
            .or_else(|| config.api_base.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        token,
        timeout: Duration::from_secs(cli.timeout.max(1)),
        ..ClientOptions::default()
    })?;
    let mirror = GhMirror::new(client);
    let page_size = cli
        .page_size
        .or(config.page_size)
        .unwrap_or(SyncOptions::default().page_size);
    let progress = StderrProgress;

    match cli.command {
        Commands::Sync {
            repo,
            dest,
            full,
            json,
        } => {
            let repo = ghmirror::resolve_repo(&repo)?;
            let options = SyncOptions { page_size, full };
            let report = mirror.sync_repo(&repo, &dest, &options, &progress).await?;
            print_reports(&[report], json)?;
        }
        Commands::Update {
            folders,
            full,
            json,
        } => {
            let options = SyncOptions { page_size, full };
            let mut reports = Vec::new();
            for folder in &folders {
                reports.push(mirror.update_folder(folder, &options, &progress).await?);
            }
            print_reports(&reports, json)?;
        }
        Commands::All { jobs, full, json } => {
            let targets: Vec<RepoTarget> = config.targets()?;
            if targets.is_empty() {
                println!("No repositories configured. Add [[repos]] entries to the config file.");
                return Ok(());
            }
            let options = SyncOptions { page_size, full };
            let jobs = jobs.or(config.jobs).unwrap_or(1);
            let reports = mirror.sync_all(&targets, jobs, &options, &progress).await?;
            print_reports(&reports, json)?;
        }
        Commands::Status { folder } => print_status(&folder)?,
    }

    Ok(())
}

fn print_reports(reports: &[SyncReport], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
        return Ok(());
    }
    for report in reports {
        println!("Synced {}", report.repo);
        println!(
            "  Threads:  {} listed, {} updated, {} up to date",
            report.threads_seen, report.threads_updated, report.threads_skipped
        );
        println!(
            "  Comments: {} new, {} edited, {} unchanged",
            report.comments_new, report.comments_overwritten, report.comments_unchanged
        );
    }
    Ok(())
}

fn print_status(folder: &std::path::Path) -> anyhow::Result<()> {
    if !folder.is_dir() {
        anyhow::bail!("{} does not exist", folder.display());
    }
    let store = MirrorStore::open(folder)?;
    let record = store.read_repo_record()?;
    let summary = store.summary()?;

    println!("Mirror Status");
    println!(
        "  Repository:    {}",
        record.github_url.as_deref().unwrap_or("unknown")
    );
    println!(
        "  Last sync:     {}",
        record
            .last_updated
            .map(|ts| ts.to_string())
            .unwrap_or_else(|| "never".to_string())
    );
    println!("  Issues:        {}", summary.issues);
    println!("  Pull requests: {}", summary.pull_requests);
    println!("  Comments:      {}", summary.comments);
    if summary.incomplete > 0 {
        println!("  Incomplete:    {} (will be resynced)", summary.incomplete);
    }
    Ok(())
}
