//! Widgets - dom-dispatch example
//!
//! Mounts the widget board into an in-memory page and drives it from stdin:
//! 1. A line command is turned into a DOM interaction (click, type, set)
//! 2. Bound handlers run and call `set_state`
//! 3. Components whose dependencies changed re-render; focus survives
//! 4. Task results (GitHub fetch, countdown ticks) arrive as deferred work
//!
//! # Usage
//!
//! ```sh
//! cargo run -p widgets-demo
//! cargo run -p widgets-demo -- --user octocat --note-file /tmp/note.txt
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use widgets_demo::app::{App, AppConfig, DEFAULT_CONTAINER};
use widgets_demo::commands::{self, Command, Outcome, HELP};
use widgets_demo::github::DEFAULT_API;
use widgets_demo::notes::NoteStore;

/// Headless widget board - dom-dispatch example
#[derive(Parser, Debug)]
#[command(name = "widgets")]
#[command(about = "A widget board demonstrating dom-dispatch patterns")]
struct Args {
    /// Id of the container the board mounts into
    #[arg(long, default_value = DEFAULT_CONTAINER)]
    container: String,

    /// GitHub user to fetch at startup
    #[arg(long, short, default_value = "torvalds")]
    user: String,

    /// Skip the startup fetch
    #[arg(long)]
    no_fetch: bool,

    /// GitHub REST API base URL
    #[arg(long, default_value = DEFAULT_API)]
    github_api: String,

    /// File the note widget persists to (default: platform data dir)
    #[arg(long)]
    note_file: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `dom_dispatch_core=trace` (overrides RUST_LOG)
    #[arg(long)]
    log: Option<String>,
}

fn init_tracing(log: Option<&str>) -> Result<()> {
    let filter = match log {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(log.is_some())
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Err(e) = init_tracing(args.log.as_deref()) {
        eprintln!("logging disabled: {e:#}");
    }

    let config = AppConfig {
        container: args.container,
        github_api: args.github_api,
        initial_user: (!args.no_fetch).then_some(args.user),
        note_file: args.note_file.or_else(NoteStore::default_path),
    };
    let mut app = App::new(config).context("failed to build the widget board")?;
    app.start().context("failed to mount the widget board")?;

    println!("{}", app.html());
    println!("\n{HELP}");

    run(&mut app).await
}

async fn run(app: &mut App) -> Result<()> {
    let mut deferred = app
        .runtime_mut()
        .take_deferred_receiver()
        .context("deferred receiver already taken")?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            Some(work) = deferred.recv() => {
                if let Err(e) = app.runtime_mut().apply_deferred(work) {
                    tracing::error!(error = %e, "Deferred update failed");
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = match Command::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        eprintln!("{e}");
                        continue;
                    }
                };
                match commands::execute(app, command) {
                    Ok(Outcome::Print(text)) => println!("{text}"),
                    Ok(Outcome::Continue) => {}
                    Ok(Outcome::Quit) => break,
                    Err(e) => eprintln!("error: {e:#}"),
                }
            }
        }
    }

    app.runtime_mut().tasks_mut().cancel_all();
    tracing::info!("Widget board stopped");
    Ok(())
}
