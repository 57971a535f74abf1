use std::path::Path;

use marknote_core::config::ClientConfig;
use marknote_core::sync::NotesGateway;
use marknote_core::util::{is_http_url, normalize_text_option};
use serde::Serialize;

use crate::commands::common::{build_orchestrator, format_report, format_timestamp, open_store};
use crate::error::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusItem {
    pub cloud_sync: bool,
    pub server_url: Option<String>,
    pub user_id: String,
    pub last_sync: Option<String>,
    pub error: Option<String>,
    pub pending_deletions: usize,
}

pub async fn run_sync(config: &ClientConfig, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let document = store.load_settings().await?;
    if !document.settings.cloud_sync {
        return Err(CliError::SyncDisabled);
    }

    let orchestrator = build_orchestrator(store, config).await?;
    match orchestrator.sync_now().await? {
        Some(report) => println!("Sync completed: {}", format_report(&report)),
        None => println!("A sync is already running"),
    }
    Ok(())
}

pub async fn run_sync_enable(
    server_url: Option<&str>,
    config: &ClientConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let mut document = store.load_settings().await?;

    if let Some(url) = normalize_text_option(server_url.map(ToString::to_string)) {
        if !is_http_url(&url) {
            return Err(marknote_core::Error::validation(
                "server URL must include http:// or https://",
            )
            .into());
        }
        document.settings.server_url = Some(url.trim_end_matches('/').to_string());
    }
    if document.settings.ensure_user_id() {
        println!("Generated user id {}", document.settings.user_id);
    }
    store.save_settings(&document).await?;

    let orchestrator = build_orchestrator(store, config).await?;
    let report = orchestrator.enable_cloud_sync().await?;
    println!("Cloud sync enabled: {}", format_report(&report));
    Ok(())
}

pub async fn run_sync_disable(config: &ClientConfig, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    match build_orchestrator(store.clone(), config).await {
        Ok(orchestrator) => orchestrator.disable_cloud_sync().await?,
        Err(CliError::SyncNotConfigured) => {
            let mut document = store.load_settings().await?;
            document.settings.cloud_sync = false;
            store.save_settings(&document).await?;
        }
        Err(error) => return Err(error),
    }
    println!("Cloud sync disabled");
    Ok(())
}

pub async fn run_sync_status(
    as_json: bool,
    config: &ClientConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let document = store.load_settings().await?;
    let persisted = store.load_sync_status().await?;
    let pending = store.tombstones().await?.len();

    let item = SyncStatusItem {
        cloud_sync: document.settings.cloud_sync,
        server_url: config
            .server_url
            .clone()
            .or_else(|| document.settings.server_url.clone()),
        user_id: config
            .user_id
            .clone()
            .unwrap_or_else(|| document.settings.user_id.clone()),
        last_sync: persisted.last_sync.map(format_timestamp),
        error: persisted.error,
        pending_deletions: pending,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&item)?);
        return Ok(());
    }

    println!(
        "cloud sync:        {}",
        if item.cloud_sync { "on" } else { "off" }
    );
    println!(
        "server:            {}",
        item.server_url.as_deref().unwrap_or("(not set)")
    );
    println!("user:              {}", item.user_id);
    println!(
        "last sync:         {}",
        item.last_sync.as_deref().unwrap_or("never")
    );
    if let Some(error) = item.error.as_deref() {
        println!("last error:        {error}");
    }
    println!("pending deletions: {}", item.pending_deletions);
    Ok(())
}

pub async fn run_sync_remote(config: &ClientConfig, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let orchestrator = build_orchestrator(store, config).await?;

    let gateway = orchestrator.gateway();
    gateway.health().await?;
    let status = gateway.status(orchestrator.user_id()).await?;

    println!("server:      {} (reachable)", gateway.base_url());
    println!("notes:       {}", status.notes_count);
    println!(
        "last sync:   {}",
        status
            .last_sync
            .map_or_else(|| "never".to_string(), format_timestamp)
    );
    Ok(())
}
