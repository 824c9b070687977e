//! Replay a navigation script against the engine
//!
//! Usage:
//!   cargo run --features cli --bin nav_replay -- demos/login_resync.json
//!   cargo run --features cli --bin nav_replay -- script.json --format pretty
//!
//! Without a `user_tree` in the script, user trees are fetched over HTTP
//! using `NavConfig::from_env()` (see `SMP_NAV_*` env vars, `.env` honoured).
//!
//! Prints one JSON line per selection broadcast and per navigation command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use smp_nav::{
    public_tree, AuthEvent, EngineEvent, EventBus, HttpTreeProvider, NavConfig, NavigationCommand,
    NavigationNode, NavigationOutbox, NavigationTree, NavigationTreeProvider, SelectionChange,
    SelectionController, SessionAuthState, StaticTreeProvider, SyncEngine,
};

#[derive(Parser)]
#[command(name = "nav_replay")]
#[command(about = "Replay auth and location events against the navigation engine")]
struct Args {
    /// Script file (JSON)
    script: PathBuf,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "json")]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Pretty,
}

#[derive(Debug, Deserialize)]
struct Script {
    /// Browser location before the first event
    #[serde(default = "default_location")]
    location: String,

    /// User the session belongs to once logged in
    #[serde(default = "default_user")]
    user_id: String,

    /// Whether the session is already authenticated at start
    #[serde(default)]
    authenticated: bool,

    /// Tree served to the user; fetched over HTTP when absent
    user_tree: Option<NavigationNode>,

    events: Vec<EngineEvent>,
}

fn default_location() -> String {
    "/".to_string()
}

fn default_user() -> String {
    "user".to_string()
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Output<'a> {
    Selection { step: usize, change: &'a SelectionChange },
    Navigate { step: usize, location: String, command: &'a NavigationCommand },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,smp_nav=debug".into()),
        )
        .init();

    let args = Args::parse();
    let raw = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading {}", args.script.display()))?;
    let script: Script = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.script.display()))?;

    let config = NavConfig::from_env()?;
    let trees: Arc<dyn NavigationTreeProvider> = match script.user_tree.clone() {
        Some(tree) => Arc::new(StaticTreeProvider::new(tree)),
        None => Arc::new(HttpTreeProvider::new(&config)?),
    };
    let auth = Arc::new(if script.authenticated {
        SessionAuthState::logged_in(script.user_id.clone())
    } else {
        SessionAuthState::anonymous()
    });

    let (navigator, outbox) = NavigationOutbox::channel();
    let controller = SelectionController::new(
        NavigationTree::from_root(public_tree()),
        navigator,
        config.broadcast_capacity,
    )
    .with_location(script.location.clone());
    let mut updates = controller.subscribe();

    // events are fed through `handle` so every step can be flushed in order
    let (_publisher, subscription) = EventBus::new();
    let mut engine = SyncEngine::new(controller, trees, auth.clone(), subscription);

    engine.start().await;
    engine.settle().await;
    flush(0, &mut updates, &outbox, args.format)?;

    for (index, event) in script.events.into_iter().enumerate() {
        let step = index + 1;
        match &event {
            EngineEvent::Auth {
                event: AuthEvent::LoginSuccess,
            } => auth.login(script.user_id.clone()),
            EngineEvent::Auth { .. } => auth.logout(),
            _ => {}
        }
        let keep_going = engine.handle(event);
        engine.settle().await;
        flush(step, &mut updates, &outbox, args.format)?;
        if !keep_going {
            break;
        }
    }

    tracing::info!(state = ?engine.state(), "replay finished");
    Ok(())
}

fn flush(
    step: usize,
    updates: &mut broadcast::Receiver<SelectionChange>,
    outbox: &NavigationOutbox,
    format: Format,
) -> Result<()> {
    loop {
        match updates.try_recv() {
            Ok(change) => emit(&Output::Selection { step, change: &change }, format)?,
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                tracing::warn!(missed, "selection output lagged");
            }
            Err(_) => break,
        }
    }
    for command in outbox.drain() {
        let location = command.location();
        emit(
            &Output::Navigate {
                step,
                location,
                command: &command,
            },
            format,
        )?;
    }
    Ok(())
}

fn emit(output: &Output<'_>, format: Format) -> Result<()> {
    let line = match format {
        Format::Json => serde_json::to_string(output)?,
        Format::Pretty => serde_json::to_string_pretty(output)?,
    };
    println!("{line}");
    Ok(())
}
