//! RecordWatch: "who is viewing this record" presence engine
//!
//! Runs one watch session against in-process host stand-ins, driven by a
//! JSON-lines script of host events, and prints every update the session
//! sends to the UI as a JSON line on stdout.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt};

use watch_cache::CachePresenceStore;
use watch_core::config::AppConfig;
use watch_core::config::logging::LogFormat;
use watch_core::error::AppError;
use watch_core::traits::channel::PushChannel;
use watch_core::traits::store::PresenceStore;
use watch_core::types::{ObjectType, RecordId, RecordKey, TabDescriptor, UserId, UserProfile};
use watch_engine::bridge::MemoryPushChannel;
use watch_engine::host::{ProfileDirectory, StaticTabSource};
use watch_engine::{Collaborators, SessionHandle, WatchSession};

#[derive(Debug, Parser)]
#[command(name = "record-watch", version, about = "Record presence engine driven by a host event script")]
struct Args {
    /// Configuration environment (loads config/{env}.toml on top of defaults)
    #[arg(long, default_value = "development")]
    env: String,

    /// Local user id
    #[arg(long)]
    user: String,

    /// Object types to subscribe to (repeatable)
    #[arg(long = "object-type")]
    object_types: Vec<String>,

    /// JSON-lines script of host events; stdin when omitted
    #[arg(long)]
    script: Option<PathBuf>,

    /// JSON array of user profiles known to the identity lookup
    #[arg(long)]
    profiles: Option<PathBuf>,
}

/// One line of the driver script.
#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
enum Step {
    /// Replace the open tabs and signal a snapshot change.
    Tabs { tabs: Vec<TabDescriptor> },
    /// The current tab was reloaded.
    Refresh,
    /// Close the tab bound to a record.
    Close {
        object_type: String,
        record_id: String,
    },
    /// Another client marks itself watching a record.
    Peer {
        user: String,
        object_type: String,
        record_id: String,
    },
    /// Let time pass so ticks and push events are processed.
    Wait { ms: u64 },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match AppConfig::load(&args.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(args, config).await {
        tracing::error!("record-watch error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

async fn run(args: Args, config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting record-watch v{}", env!("CARGO_PKG_VERSION"));

    let user = UserId::new(args.user)?;
    let object_types = args
        .object_types
        .into_iter()
        .map(ObjectType::new)
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!("Initializing presence store (provider: {})...", config.cache.provider);
    let store = Arc::new(CachePresenceStore::from_config(&config.cache).await?);

    let buffer = config.notifier.event_buffer;
    let channel = Arc::new(MemoryPushChannel::new(buffer, buffer));
    let tabs = Arc::new(StaticTabSource::default());
    let profiles = Arc::new(ProfileDirectory::new(load_profiles(args.profiles.as_ref()).await?));

    let collaborators = Collaborators {
        store: store.clone(),
        tabs: tabs.clone(),
        channel: channel.clone(),
        profiles,
    };
    let (mut session, mut updates) = WatchSession::new(&config, user, object_types, collaborators)?;
    session.start().await?;

    let printer = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            match serde_json::to_string(&update) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!("Failed to encode update: {}", e),
            }
        }
    });

    let handle = session.handle();
    let runner = tokio::spawn(async move {
        session.run().await;
    });

    let driver = Driver {
        handle: handle.clone(),
        tabs,
        store,
        channel,
        channel_name: config.notifier.channel.clone(),
    };
    let outcome = driver.run_script(args.script.as_ref()).await;

    handle.shutdown().await;
    if let Err(e) = runner.await {
        tracing::error!("Session task failed: {}", e);
    }
    let _ = printer.await;

    outcome
}

async fn load_profiles(path: Option<&PathBuf>) -> Result<Vec<UserProfile>, AppError> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::configuration(format!("Cannot read profiles '{}': {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Feeds script steps into the session.
struct Driver {
    handle: SessionHandle,
    tabs: Arc<StaticTabSource>,
    store: Arc<CachePresenceStore>,
    channel: Arc<MemoryPushChannel>,
    channel_name: String,
}

impl Driver {
    async fn run_script(&self, path: Option<&PathBuf>) -> Result<(), AppError> {
        match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    AppError::configuration(format!("Cannot read script '{}': {}", path.display(), e))
                })?;
                for (number, line) in raw.lines().enumerate() {
                    self.run_line(number + 1, line).await?;
                }
            }
            None => {
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                let mut number = 0;
                while let Some(line) = lines
                    .next_line()
                    .await
                    .map_err(|e| AppError::internal(format!("Failed to read stdin: {}", e)))?
                {
                    number += 1;
                    self.run_line(number, &line).await?;
                }
            }
        }
        Ok(())
    }

    async fn run_line(&self, number: usize, line: &str) -> Result<(), AppError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }
        let step: Step = serde_json::from_str(line)
            .map_err(|e| AppError::validation(format!("Script line {}: {}", number, e)))?;
        tracing::debug!(line = number, ?step, "Running script step");
        self.apply(step).await
    }

    async fn apply(&self, step: Step) -> Result<(), AppError> {
        match step {
            Step::Tabs { tabs } => {
                self.tabs.set_tabs(tabs).await;
                self.handle.snapshot_changed().await
            }
            Step::Refresh => self.handle.tab_refreshed().await,
            Step::Close {
                object_type,
                record_id,
            } => {
                let key = RecordKey::new(ObjectType::new(object_type)?, RecordId::new(record_id)?);
                self.tabs.close_record(key.record_id().as_str()).await;
                self.handle.tab_closed(key).await
            }
            Step::Peer {
                user,
                object_type,
                record_id,
            } => {
                let key = RecordKey::new(ObjectType::new(object_type)?, RecordId::new(record_id)?);
                let mut entry = self.store.get(&key).await?.unwrap_or_default();
                entry.mark(UserId::new(user)?, Utc::now());
                self.store.put(&key, &entry).await?;
                self.channel.publish(&self.channel_name, &key).await?;
                Ok(())
            }
            Step::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(())
            }
        }
    }
}
