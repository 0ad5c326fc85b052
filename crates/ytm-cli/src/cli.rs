use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "ytm")]
#[command(about = "Versioned YouTube playlist backups with time travel")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Back up every playlist as one new version
    Backup {
        /// Directory holding saved source responses
        #[arg(long, value_name = "DIR")]
        source: PathBuf,
        /// Also back up Watch Later from its flat dump
        #[arg(long)]
        watch_later: bool,
        /// Roll the whole run back if any playlist fails to fetch
        #[arg(long)]
        strict: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List backed-up playlists or items
    List {
        #[command(subcommand)]
        command: ListCommands,
    },
    /// Inspect versions and differences between them
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Plan (and optionally execute) removals from a playlist
    Prune(PruneArgs),
    /// Re-add a playlist's videos, as they stood at one version, to a remote playlist
    Restore(RestoreArgs),
    /// Export a playlist as it stood at one version
    Export {
        /// Playlist id
        playlist_id: String,
        #[command(flatten)]
        at: AtArgs,
        /// Include items removed upstream
        #[arg(long)]
        include_removed: bool,
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
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

/// Point in history to read at (latest when neither is given)
#[derive(Args, Clone, Debug, Default, PartialEq, Eq)]
pub struct AtArgs {
    /// Read as of this version
    #[arg(long, value_name = "N", conflicts_with = "at")]
    pub version: Option<i64>,
    /// Read as of this time (RFC 3339, or local "YYYY-MM-DD [HH:MM:SS]")
    #[arg(long, value_name = "TIME")]
    pub at: Option<String>,
}

#[derive(Subcommand)]
pub enum ListCommands {
    /// List playlists
    Playlists {
        #[command(flatten)]
        at: AtArgs,
        /// Include playlists removed upstream
        #[arg(long)]
        include_removed: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the items of one playlist
    Items {
        /// Playlist id
        playlist_id: String,
        #[command(flatten)]
        at: AtArgs,
        /// Include items removed upstream
        #[arg(long)]
        include_removed: bool,
        /// Number of items to show (all when omitted)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List committed versions, newest first
    Versions {
        /// Number of versions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what changed between two versions
    Diff {
        /// Older version (0 is the empty store)
        from: i64,
        /// Newer version (latest when omitted)
        to: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct PruneArgs {
    /// Playlist id
    pub playlist_id: String,
    /// Remove items older than this many days (e.g. 30 or 30d); the
    /// configured retention applies when no value is given
    #[arg(
        long,
        value_name = "DAYS",
        num_args = 0..=1,
        conflicts_with_all = ["count", "all"]
    )]
    pub older_than: Option<Option<String>>,
    /// Remove the N oldest items
    #[arg(short, long, value_name = "N", conflicts_with = "all")]
    pub count: Option<usize>,
    /// Remove every item
    #[arg(short, long)]
    pub all: bool,
    /// Items per executor session (config default when omitted)
    #[arg(short, long, value_name = "N")]
    pub batch_size: Option<usize>,
    /// Command that performs the removals; receives the plan as JSON on
    /// stdin and prints the removed item ids as a JSON array
    #[arg(long, value_name = "CMD")]
    pub exec: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct RestoreArgs {
    /// Playlist id to restore from
    pub playlist_id: String,
    #[command(flatten)]
    pub at: AtArgs,
    /// Existing playlist to add the videos to
    #[arg(
        short,
        long,
        value_name = "ID",
        conflicts_with = "create_new",
        required_unless_present = "create_new"
    )]
    pub to_playlist: Option<String>,
    /// Create a new playlist with this title instead
    #[arg(short, long, value_name = "TITLE")]
    pub create_new: Option<String>,
    /// Only show what would be restored
    #[arg(short = 'n', long)]
    pub dry_run: bool,
    /// Command that performs the additions; receives the plan as JSON on
    /// stdin and prints `{"playlist_id": .., "added": [..]}`
    #[arg(long, value_name = "CMD", required_unless_present = "dry_run")]
    pub exec: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
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
    #[value(name = "powershell")]
    PowerShell,
}
