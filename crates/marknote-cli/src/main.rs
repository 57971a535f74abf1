//! Marknote CLI - Markdown notes with offline-first cloud sync
//!
//! Local notes live in SQLite; `marknote sync` reconciles them with a
//! marknote-api backend.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};
use marknote_core::ai::AiTask;
use marknote_core::config::ClientConfig;

use crate::cli::{
    AiCommands, Cli, Commands, SettingsCommands, SyncCommands, TombstoneCommands,
    WorkspaceCommands,
};
use crate::commands::add::run_add;
use crate::commands::ai::{run_ai_chat, run_ai_task, run_ai_trigger};
use crate::commands::common::resolve_db_path;
use crate::commands::completions::run_completions;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::export::run_export;
use crate::commands::import::run_import;
use crate::commands::list::run_list;
use crate::commands::search::run_search;
use crate::commands::settings::{run_settings_set, run_settings_show};
use crate::commands::show::run_show;
use crate::commands::sync::{
    run_sync, run_sync_disable, run_sync_enable, run_sync_remote, run_sync_status,
};
use crate::commands::tombstones::{run_tombstones_clear, run_tombstones_list};
use crate::commands::watch::run_watch;
use crate::commands::workspace::{run_workspace_add, run_workspace_list};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("marknote=info".parse().expect("valid directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let config = ClientConfig::from_env()?;

    match cli.command {
        Some(Commands::Add {
            content,
            title,
            workspace,
        }) => run_add(&content, title.as_deref(), &workspace, &config, &db_path).await?,
        Some(Commands::List {
            limit,
            workspace,
            json,
        }) => run_list(limit, workspace.as_deref(), json, &db_path).await?,
        Some(Commands::Show { id, json }) => run_show(&id, json, &db_path).await?,
        Some(Commands::Search {
            query,
            workspace,
            limit,
            json,
        }) => run_search(&query, workspace.as_deref(), limit, json, &db_path).await?,
        Some(Commands::Edit {
            id,
            title,
            content,
            workspace,
        }) => {
            run_edit(
                &id,
                title.as_deref(),
                content.as_deref(),
                workspace.as_deref(),
                &config,
                &db_path,
            )
            .await?;
        }
        Some(Commands::Delete { id }) => run_delete(&id, &config, &db_path).await?,
        Some(Commands::Sync { command }) => match command {
            None | Some(SyncCommands::Run) => run_sync(&config, &db_path).await?,
            Some(SyncCommands::Enable { server_url }) => {
                run_sync_enable(server_url.as_deref(), &config, &db_path).await?;
            }
            Some(SyncCommands::Disable) => run_sync_disable(&config, &db_path).await?,
            Some(SyncCommands::Status { json }) => {
                run_sync_status(json, &config, &db_path).await?;
            }
            Some(SyncCommands::Remote) => run_sync_remote(&config, &db_path).await?,
        },
        Some(Commands::Tombstones { command }) => match command {
            TombstoneCommands::List => run_tombstones_list(&db_path).await?,
            TombstoneCommands::Clear => run_tombstones_clear(&db_path).await?,
        },
        Some(Commands::Settings { command }) => match command {
            SettingsCommands::Show { json } => run_settings_show(json, &db_path).await?,
            SettingsCommands::Set { key, value } => {
                run_settings_set(&key, &value, &db_path).await?;
            }
        },
        Some(Commands::Workspace { command }) => match command {
            WorkspaceCommands::List => run_workspace_list(&db_path).await?,
            WorkspaceCommands::Add { name } => run_workspace_add(&name, &db_path).await?,
        },
        Some(Commands::Export { format, output }) => {
            run_export(format, output.as_deref(), &db_path).await?;
        }
        Some(Commands::Import { path }) => run_import(&path, &db_path).await?,
        Some(Commands::Ai { command }) => match command {
            AiCommands::Summarize { id } => {
                run_ai_task(&id, AiTask::Summarize, false, &config, &db_path).await?;
            }
            AiCommands::Improve { id, apply } => {
                run_ai_task(&id, AiTask::Improve, apply, &config, &db_path).await?;
            }
            AiCommands::Translate { id, to } => {
                let task = AiTask::Translate {
                    target_language: to,
                };
                run_ai_task(&id, task, false, &config, &db_path).await?;
            }
            AiCommands::Chat { prompt, stream } => {
                run_ai_chat(&prompt, stream, &config, &db_path).await?;
            }
            AiCommands::Run { id } => run_ai_trigger(&id, &config, &db_path).await?,
        },
        Some(Commands::Watch) => run_watch(&config, &db_path).await?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            // Quick capture mode: marknote "my thought"
            if cli.note.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_add(&cli.note, None, "public", &config, &db_path).await?;
            }
        }
    }

    Ok(())
}
