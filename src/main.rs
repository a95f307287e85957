use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use field_guardian::cli::{Command, ConsultArgs, InitArgs, RootArgs};
use field_guardian::pipeline::run_consultation;
use field_guardian::providers::build_services;
use field_guardian::settings::{
    default_settings, load_settings, resolve_settings_path, validate_settings, write_settings,
};

fn main() -> Result<()> {
    init_tracing();
    let args = RootArgs::parse();
    match args.command {
        Command::Init(init) => cmd_init(args.config.as_deref(), &init),
        Command::Consult(consult) => cmd_consult(args.config.as_deref(), &consult),
    }
}

/// Dev diagnostics via `RUST_LOG`, stderr, compact format; defaults to
/// `warn` so normal runs stay quiet.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn cmd_init(config: Option<&Path>, args: &InitArgs) -> Result<()> {
    let path = resolve_settings_path(config)?;
    if path.exists() && !args.force {
        return Err(anyhow!(
            "settings already exist at {}; use --force to overwrite",
            path.display()
        ));
    }
    write_settings(&path, &default_settings())?;
    println!("Wrote settings stub to {}", path.display());
    println!("Set GROQ_API_KEY in the environment before running consultations.");
    Ok(())
}

fn cmd_consult(config: Option<&Path>, args: &ConsultArgs) -> Result<()> {
    let path = resolve_settings_path(config)?;
    let mut settings = if path.is_file() {
        load_settings(&path)?
    } else {
        let mut settings = default_settings();
        settings.apply_env(|key| std::env::var(key).ok());
        settings
    };
    if args.demo {
        settings.demo_mode = true;
    }
    validate_settings(&settings)?;

    let services = build_services(&settings)?;
    let outcome = run_consultation(&services, &args.farmer_id, &args.field_id);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("Problems:");
    if outcome.problems.is_empty() {
        println!("  (none)");
    }
    for problem in &outcome.problems {
        println!("  - {problem}");
    }
    println!("Solutions:");
    if outcome.solutions.is_empty() {
        println!("  (none)");
    }
    for solution in &outcome.solutions {
        println!("  - {solution}");
    }
    Ok(())
}
