//! Tasklist CLI - offline-first to-do list backed by SQLite and a remote
//! document collection.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tasklist::{
    AutoSync, Config, ConnectivityMonitor, ConnectivitySignal, HttpRemote, Probe, RemoteWrite,
    RemoteWriteOutcome, Repository, SqliteStore, SyncOutcome, Task,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "tasklist", version, about = "Offline-first to-do list")]
struct Cli {
    /// User whose tasks to work on (overrides TASKLIST_USER)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Local database file (overrides TASKLIST_DATABASE)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Remote server base URL (overrides TASKLIST_REMOTE_URL)
    #[arg(long, global = true)]
    remote: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List tasks
    List,
    /// Add a task
    Add { title: String },
    /// Change a task's title
    Rename { id: String, title: String },
    /// Check or uncheck a task
    Toggle { id: String },
    /// Delete a task
    Delete { id: String },
    /// Pull the remote collection into the local store
    Sync,
    /// Push queued writes, then sync
    Refresh,
    /// Show queued remote writes
    Pending,
    /// Keep syncing whenever connectivity comes back
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasklist=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(user) = cli.user {
        config.user_id = Some(user);
    }
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    if let Some(remote) = cli.remote {
        config.remote_url = remote;
    }
    let owner = config.require_user()?.to_string();

    let store = match SqliteStore::open(&config.database_path).await {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(
                path = %config.database_path.display(),
                error = %err,
                "Failed to open local store"
            );
            return Err(err.into());
        }
    };

    let mut remote = HttpRemote::new(&config.remote_url)?;
    if let Some(token) = &config.token {
        remote = remote.with_token(token.clone());
    }
    let remote = Arc::new(remote);

    let signal = ConnectivitySignal::new(remote.is_reachable().await);
    if !signal.is_connected() {
        tracing::warn!(remote = %config.remote_url, "Remote unreachable, working offline");
    }

    let repo = Arc::new(Repository::new(store, remote.clone(), signal.clone()));

    match cli.command {
        Command::List => print_tasks(&repo.tasks(&owner).await?),
        Command::Add { title } => {
            let (task, write) = repo.create(&owner, &title).await?;
            println!("added {}", task.id);
            report_write(write).await;
        }
        Command::Rename { id, title } => match repo.rename(&owner, &id, &title).await? {
            Some((_, write)) => {
                println!("renamed {id}");
                report_write(write).await;
            }
            None => println!("no task {id}"),
        },
        Command::Toggle { id } => match repo.toggle(&owner, &id).await? {
            Some((task, write)) => {
                println!("{} {id}", if task.is_done { "done" } else { "undone" });
                report_write(write).await;
            }
            None => println!("no task {id}"),
        },
        Command::Delete { id } => match repo.delete(&owner, &id).await? {
            Some(write) => {
                println!("deleted {id}");
                report_write(write).await;
            }
            None => println!("no task {id}"),
        },
        Command::Sync => print_outcome(repo.sync(&owner).await?),
        Command::Refresh => print_outcome(repo.refresh(&owner).await?),
        Command::Pending => {
            for pending in repo.pending_writes(&owner).await? {
                println!(
                    "#{} {} {}{}",
                    pending.seq,
                    pending.kind.label(),
                    pending.task_id,
                    pending
                        .last_error
                        .map(|e| format!(" ({e})"))
                        .unwrap_or_default()
                );
            }
        }
        Command::Watch => watch(&repo, &owner, remote, signal, &config).await?,
    }

    repo.close().await;
    Ok(())
}

async fn watch(
    repo: &Arc<Repository>,
    owner: &str,
    probe: Arc<HttpRemote>,
    signal: ConnectivitySignal,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    if signal.is_connected() {
        print_outcome(repo.refresh(owner).await?);
    }

    let monitor = ConnectivityMonitor::spawn(probe, signal.clone(), config.probe_interval);
    let (autosync, mut outcomes) = AutoSync::spawn(repo.clone(), owner, signal);
    tracing::info!(owner = %owner, "Watching for connectivity changes, Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            outcome = outcomes.recv() => match outcome {
                Some(outcome) => {
                    print_outcome(outcome);
                    print_tasks(&repo.tasks(owner).await?);
                }
                None => break,
            },
        }
    }

    autosync.shutdown();
    monitor.shutdown();
    Ok(())
}

async fn report_write(write: RemoteWrite) {
    match write.wait().await {
        RemoteWriteOutcome::Sent => {}
        RemoteWriteOutcome::Queued => println!("remote unreachable, change queued"),
        RemoteWriteOutcome::Squashed => println!("never pushed, queued writes dropped"),
        RemoteWriteOutcome::Lost => println!("remote write failed and could not be queued"),
    }
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("no tasks");
    }
    for task in tasks {
        let mark = if task.is_done { 'x' } else { ' ' };
        println!("[{mark}] {}  {}", task.id, task.title);
    }
}

fn print_outcome(outcome: SyncOutcome) {
    match outcome {
        SyncOutcome::Completed(stats) => println!(
            "synced: {} inserted, {} updated, {} deleted, {} unchanged",
            stats.inserted, stats.updated, stats.deleted, stats.unchanged
        ),
        SyncOutcome::RemoteUnavailable => println!("remote unavailable, local tasks kept"),
        SyncOutcome::Offline => println!("offline, nothing synced"),
        SyncOutcome::Deferred { pending } => {
            println!("{pending} queued writes could not be pushed, sync deferred")
        }
    }
}
