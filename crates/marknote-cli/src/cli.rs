use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "marknote")]
#[command(about = "Markdown notes with offline-first cloud sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Quick capture: marknote "my thought here"
    #[arg(trailing_var_arg = true)]
    pub note: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note content (stdin or $EDITOR when omitted)
        content: Vec<String>,
        /// Note title
        #[arg(short, long)]
        title: Option<String>,
        /// Workspace to file the note under
        #[arg(short, long, default_value = "public")]
        workspace: String,
    },
    /// List recent notes
    List {
        /// Number of notes to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Only notes from this workspace
        #[arg(short, long)]
        workspace: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one note
    Show {
        /// Note ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search titles and content
    Search {
        /// Search query
        query: String,
        /// Only notes from this workspace
        #[arg(short, long)]
        workspace: Option<String>,
        /// Number of notes to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing note ($EDITOR when no field is given)
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New content
        #[arg(long)]
        content: Option<String>,
        /// Move to another workspace
        #[arg(long)]
        workspace: Option<String>,
    },
    /// Delete a note (and its cloud copy when sync is on)
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Cloud sync
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Pending deletions not yet propagated to the cloud
    Tombstones {
        #[command(subcommand)]
        command: TombstoneCommands,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Manage workspaces
    Workspace {
        #[command(subcommand)]
        command: WorkspaceCommands,
    },
    /// Export notes
    Export {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Output file or directory (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Import a JSON backup
    Import {
        /// Backup file
        path: PathBuf,
    },
    /// AI helpers
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },
    /// Keep syncing in the foreground until Ctrl-C
    Watch,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Run one push/pull round trip
    Run,
    /// Turn cloud sync on and run a first round trip
    Enable {
        /// Backend URL, e.g. http://localhost:8080
        #[arg(long, value_name = "URL")]
        server_url: Option<String>,
    },
    /// Turn cloud sync off
    Disable,
    /// Show the local sync status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask the backend for its view of this user
    Remote,
}

#[derive(Subcommand)]
pub enum TombstoneCommands {
    /// List pending deletions
    List,
    /// Forget every pending deletion
    Clear,
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print all settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change one setting, e.g. `settings set font-size 16`
    Set {
        /// Setting name
        key: String,
        /// New value (empty clears optional values)
        value: String,
    },
}

#[derive(Subcommand)]
pub enum WorkspaceCommands {
    /// List workspaces
    List,
    /// Add a workspace
    Add {
        /// Workspace name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum AiCommands {
    /// Summarize a note
    Summarize {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Rewrite a note for clarity
    Improve {
        /// Note ID or unique ID prefix
        id: String,
        /// Replace the note content with the result
        #[arg(long)]
        apply: bool,
    },
    /// Translate a note
    Translate {
        /// Note ID or unique ID prefix
        id: String,
        /// Target language
        #[arg(long, default_value = "English")]
        to: String,
    },
    /// Ask a free-form question
    Chat {
        /// Prompt text
        prompt: Vec<String>,
        /// Print the reply as it arrives
        #[arg(long)]
        stream: bool,
    },
    /// Answer the last @chat or @writer line in a note
    Run {
        /// Note ID or unique ID prefix
        id: String,
    },
}
