//! CLI command definitions for the `competences` binary.
//!
//! Uses clap derive macros for argument parsing. Player commands
//! (`adjust`, `confirm`) work on any character; admin commands require
//! `--admin`.

pub mod admin;
pub mod bonus;
pub mod sheet;
pub mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Allocate competence points on a character sheet.
#[derive(Parser)]
#[command(name = "competences", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Character to work on (defaults to the one created by `init`).
    #[arg(long, global = true, env = "COMPETENCE_CHARACTER")]
    pub character: Option<String>,

    /// Run with administrator rights.
    #[arg(long, global = true)]
    pub admin: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, hide = true)]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, hide = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a character and make it the active one.
    Init {
        /// Display name of the character.
        name: String,
    },

    /// Show the competence sheet.
    Show,

    /// Move points between a category budget and a skill.
    Adjust {
        /// Category id (e.g. `combat`).
        category: String,

        /// Skill name (case and accents are ignored).
        skill: String,

        /// Points to add (negative to take back).
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },

    /// Commit the pending points of a category and lock it.
    Confirm {
        /// Category id.
        category: String,
    },

    /// Admin: refund every allocation of a category and unlock it.
    Reset {
        /// Category id.
        category: String,
    },

    /// Admin: set the point budget of a category.
    #[command(name = "set-budget")]
    SetBudget {
        /// Category id.
        category: String,

        /// New budget (clamped to the configured maximum).
        #[arg(allow_negative_numbers = true)]
        points: i64,
    },

    /// Admin: add a custom skill to a category.
    #[command(name = "add-skill")]
    AddSkill {
        /// Category id.
        category: String,

        /// Name of the new skill.
        name: String,

        /// Icon shown next to the skill.
        #[arg(long)]
        icon: Option<String>,

        /// Maximum value of the skill.
        #[arg(long, allow_negative_numbers = true)]
        cap: Option<i64>,
    },

    /// Admin: rename, rebase, recap or re-icon a skill.
    #[command(name = "edit-skill")]
    EditSkill {
        /// Category id.
        category: String,

        /// Current skill name.
        skill: String,

        /// New name (custom skills only).
        #[arg(long)]
        name: Option<String>,

        /// New committed base value.
        #[arg(long, allow_negative_numbers = true)]
        base: Option<i64>,

        /// New cap.
        #[arg(long, allow_negative_numbers = true)]
        cap: Option<i64>,

        /// New icon.
        #[arg(long)]
        icon: Option<String>,
    },

    /// Admin: delete a skill and refund its points.
    #[command(name = "delete-skill", alias = "rm-skill")]
    DeleteSkill {
        /// Category id.
        category: String,

        /// Skill name.
        skill: String,
    },

    /// Admin: restore a deleted built-in skill.
    #[command(name = "restore-skill")]
    RestoreSkill {
        /// Category id.
        category: String,

        /// Skill name.
        skill: String,
    },

    /// Show per-skill bonuses from equipment, consumables and companion.
    Bonuses {
        /// Equipment snapshot file (default: {data_dir}/equipment.json).
        #[arg(long)]
        equipment: Option<PathBuf>,

        /// Item catalog file (default: {data_dir}/items.json).
        #[arg(long)]
        items: Option<PathBuf>,

        /// Companion bonus file (default: {data_dir}/companion.json).
        #[arg(long)]
        companion: Option<PathBuf>,
    },

    /// Push the current sheet to the character store.
    Sync,
}
