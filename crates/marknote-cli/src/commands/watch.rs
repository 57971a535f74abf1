use std::path::Path;

use marknote_core::config::ClientConfig;
use marknote_core::sync::SyncTrigger;

use crate::commands::common::{build_orchestrator, format_status_line, open_store};
use crate::error::CliError;

/// Sync on start-up, then on every timer tick, printing status changes
/// until Ctrl-C.
pub async fn run_watch(config: &ClientConfig, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    if !store.load_settings().await?.settings.cloud_sync {
        return Err(CliError::SyncDisabled);
    }

    let orchestrator = build_orchestrator(store, config).await?;
    let mut status = orchestrator.subscribe();

    orchestrator.trigger(SyncTrigger::Startup).await;
    println!("{}", format_status_line(&orchestrator.status()));
    orchestrator.start();
    println!(
        "Watching for changes every {:?} (Ctrl-C to stop)",
        config.sync_interval
    );

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                if !current.syncing {
                    println!("{}", format_status_line(&current));
                }
            }
        }
    }

    orchestrator.stop();
    println!("Stopped");
    Ok(())
}
