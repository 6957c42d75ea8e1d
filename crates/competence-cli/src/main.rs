//! Competence engine CLI entry point.
//!
//! Binary name: `competences`
//!
//! Parses CLI arguments, wires the local cache, character store and catalog,
//! opens an allocation session for the active character and dispatches to
//! the command handler. Every command ends by closing the session, which
//! forces a final flush.

mod cli;
mod state;

use clap::Parser;
use competence_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,competence=debug",
        _ => "trace",
    };
    init_tracing(&TracingOptions {
        filter: filter.to_string(),
        json: cli.log_json,
        otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init().await?;

    // `init` creates the character the session is then opened on.
    let character = match &cli.command {
        Commands::Init { name } => Some(cli::sheet::init_character(&state, name, cli.json).await?),
        _ => state.active_character(cli.character.as_deref()),
    };

    let mut session = state.open_session(character.as_ref(), cli.admin).await?;

    let result = match cli.command {
        Commands::Init { .. } | Commands::Show => cli::sheet::show(&session, cli.json),
        Commands::Adjust {
            category,
            skill,
            delta,
        } => cli::sheet::adjust(&mut session, &category, &skill, delta, cli.json),
        Commands::Confirm { category } => cli::sheet::confirm(&mut session, &category, cli.json),
        Commands::Reset { category } => cli::admin::reset(&mut session, &category, cli.json),
        Commands::SetBudget { category, points } => {
            cli::admin::set_budget(&mut session, &category, points, cli.json)
        }
        Commands::AddSkill {
            category,
            name,
            icon,
            cap,
        } => cli::admin::add_skill(&mut session, &category, name, icon, cap, cli.json),
        Commands::EditSkill {
            category,
            skill,
            name,
            base,
            cap,
            icon,
        } => cli::admin::edit_skill(
            &mut session,
            &category,
            &skill,
            cli::admin::EditArgs {
                name,
                base,
                cap,
                icon,
            },
            cli.json,
        ),
        Commands::DeleteSkill { category, skill } => {
            cli::admin::delete_skill(&mut session, &category, &skill, cli.json)
        }
        Commands::RestoreSkill { category, skill } => {
            cli::admin::restore_skill(&mut session, &category, &skill, cli.json)
        }
        Commands::Bonuses {
            equipment,
            items,
            companion,
        } => {
            let files = state.bonus_files(equipment, items, companion);
            cli::bonus::show_bonuses(&session, &files, cli.json).await
        }
        Commands::Sync => cli::sync::sync(&session, cli.json).await,
    };

    // Close even when the command failed so nothing recorded is lost.
    let outcome = session.close().await;
    cli::sync::report_close(&outcome, cli.json);
    result
}
