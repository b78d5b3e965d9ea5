use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tasktrack_core::{ItemId, ItemKind, Status};

#[derive(Parser)]
#[command(
    name = "tasktrack",
    about = "Tasktrack: tasks, epics and subtasks with a conflict-checked schedule",
    version
)]
pub struct Cli {
    /// Path to a TOML config file (default: .tasktrack/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the items JSONL store (overrides the config file)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a task, epic or subtask
    Add {
        /// Item kind: task, epic or subtask
        kind: ItemKind,

        /// Item name
        #[arg(long)]
        name: String,

        /// Item description
        #[arg(long, default_value = "")]
        description: String,

        /// Initial status (ignored for epics)
        #[arg(long, default_value = "NEW")]
        status: Status,

        /// Parent epic ID (required for subtasks)
        #[arg(long)]
        epic: Option<ItemId>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one item and record the access in history
    Get {
        /// Item kind
        kind: ItemKind,

        /// Item ID
        id: ItemId,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all items of one kind
    List {
        /// Item kind
        kind: ItemKind,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the subtasks of an epic
    Subtasks {
        /// Epic ID
        epic_id: ItemId,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update the name, description or status of an item
    Update {
        /// Item ID
        id: ItemId,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New status (ignored for epics)
        #[arg(long)]
        status: Option<Status>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Give a task or subtask a time window
    Schedule {
        /// Item ID
        id: ItemId,

        /// Window start, in the configured time format
        #[arg(long)]
        start: String,

        /// Window length in minutes
        #[arg(long, allow_negative_numbers = true)]
        minutes: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove the time window of a task or subtask
    Unschedule {
        /// Item ID
        id: ItemId,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete one item (epics take their subtasks with them)
    Delete {
        /// Item kind
        kind: ItemKind,

        /// Item ID
        id: ItemId,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every item of one kind
    Clear {
        /// Item kind
        kind: ItemKind,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show accessed items, oldest access first
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List scheduled tasks and subtasks by start time
    Prioritized {
        /// Latest start first
        #[arg(long)]
        descending: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a window would collide with the schedule
    Overlaps {
        /// Window start, in the configured time format
        #[arg(long)]
        start: String,

        /// Window length in minutes
        #[arg(long, allow_negative_numbers = true)]
        minutes: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
