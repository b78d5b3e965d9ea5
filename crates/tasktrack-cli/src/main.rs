//! Tasktrack CLI: the `tasktrack` command.

mod cli;
mod commands;
mod config;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use support::{Context, EXIT_FAILURE, fail};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TASKTRACK_LOG";

fn main() {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| fail(EXIT_FAILURE, e));
    init_tracing(&config.log);
    let ctx = Context::new(config, cli.store);
    tracing::debug!(target: "tasktrack::cli", store = %ctx.store_display(), "resolved store path");

    match cli.command {
        Commands::Add {
            kind,
            name,
            description,
            status,
            epic,
            json,
        } => commands::add::run(
            &ctx,
            commands::add::Args {
                kind,
                name,
                description,
                status,
                epic,
                json,
            },
        ),

        Commands::Get { kind, id, json } => commands::read::run_get(&ctx, kind, id, json),

        Commands::List { kind, json } => commands::read::run_list(&ctx, kind, json),

        Commands::Subtasks { epic_id, json } => {
            commands::read::run_subtasks(&ctx, epic_id, json)
        }

        Commands::Update {
            id,
            name,
            description,
            status,
            json,
        } => commands::update::run(&ctx, id, name, description, status, json),

        Commands::Schedule {
            id,
            start,
            minutes,
            json,
        } => commands::schedule::run_schedule(&ctx, id, &start, minutes, json),

        Commands::Unschedule { id, json } => commands::schedule::run_unschedule(&ctx, id, json),

        Commands::Delete { kind, id, json } => commands::delete::run_delete(&ctx, kind, id, json),

        Commands::Clear { kind, json } => commands::delete::run_clear(&ctx, kind, json),

        Commands::History { json } => commands::read::run_history(&ctx, json),

        Commands::Prioritized { descending, json } => {
            commands::schedule::run_prioritized(&ctx, descending, json)
        }

        Commands::Overlaps {
            start,
            minutes,
            json,
        } => commands::schedule::run_overlaps(&ctx, &start, minutes, json),
    }
}

/// Log to stderr. `TASKTRACK_LOG` wins over the configured filter.
fn init_tracing(configured: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(configured));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
