use std::path::{Path, PathBuf};

use marknote_core::export::{
    render_backup_json, render_markdown_export, suggested_export_file_name, Backup,
    ExportFormat as BackupFormat,
};
use marknote_core::util;

use crate::cli::ExportFormat;
use crate::commands::common::open_store;
use crate::error::CliError;

pub async fn run_export(
    format: ExportFormat,
    output_path: Option<&Path>,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let notes = store.list_notes(None).await?;
    let format = match format {
        ExportFormat::Json => BackupFormat::Json,
        ExportFormat::Markdown => BackupFormat::Markdown,
    };
    let rendered = match format {
        BackupFormat::Json => {
            let document = store.load_settings().await?;
            render_backup_json(&Backup::new(notes, &document))?
        }
        BackupFormat::Markdown => render_markdown_export(&notes),
    };

    if let Some(path) = output_path {
        let path = export_target(path, format);
        std::fs::write(&path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}

/// A directory gets a dated file name inside it.
pub fn export_target(path: &Path, format: BackupFormat) -> PathBuf {
    if path.is_dir() {
        path.join(suggested_export_file_name(format, util::now()))
    } else {
        path.to_path_buf()
    }
}
