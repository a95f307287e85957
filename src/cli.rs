//! CLI argument parsing for the consultation workflow.
//!
//! The CLI is intentionally thin: it resolves settings, wires services once,
//! and invokes the pipeline; all policy lives in the library.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "fieldguard",
    version,
    about = "LLM-driven field consultation pipeline",
    after_help = "Examples:\n  fieldguard init\n  fieldguard consult --farmer-id F1 --field-id A1\n  fieldguard consult --farmer-id F1 --field-id A1 --json\n  fieldguard consult --farmer-id F1 --field-id A1 --demo",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Settings file (defaults to $FIELDGUARD_CONFIG, then the platform
    /// config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Consult(ConsultArgs),
}

/// Write a settings stub to the resolved settings path.
#[derive(Parser, Debug)]
#[command(about = "Write a settings stub")]
pub struct InitArgs {
    /// Overwrite an existing settings file
    #[arg(long)]
    pub force: bool,
}

/// Run one consultation for a farmer's field.
#[derive(Parser, Debug)]
#[command(about = "Run one consultation and print problems/solutions")]
pub struct ConsultArgs {
    /// Farmer identifier
    #[arg(long, value_name = "ID")]
    pub farmer_id: String,

    /// Field identifier
    #[arg(long, value_name = "ID")]
    pub field_id: String,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Use canned offline providers and the local store
    #[arg(long)]
    pub demo: bool,
}
