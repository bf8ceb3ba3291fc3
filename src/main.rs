use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use fixture_scout::config::{ScoutConfig, load_dotenv};
use fixture_scout::fixtures::{Fixture, load_upcoming_fixtures};
use fixture_scout::game_stats::{StatsResponse, generate_game_stats};
use fixture_scout::loader::{load_data_context, load_roster, reload_roster_if_changed};
use fixture_scout::tables::{DataContext, SharedRoster};

#[derive(Debug, Parser)]
#[command(name = "fixture_scout", about = "Pre-match statistics for two clubs")]
struct Cli {
    /// Directory holding clubs.csv, games.csv and the other match tables.
    #[arg(long, env = "SCOUT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// League roster CSV; defaults to the roster file inside the data dir.
    #[arg(long)]
    roster: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Statistics for one pairing, printed as a single JSON object.
    Stats { team1: String, team2: String },
    /// Statistics for every upcoming fixture in a directory of season files,
    /// one JSON object per line.
    Batch {
        #[arg(long)]
        fixtures: PathBuf,
        /// Only fixtures on or after this date (YYYY-MM-DD).
        #[arg(long)]
        from: Option<NaiveDate>,
    },
}

#[derive(Serialize)]
struct FixtureStats<'a> {
    fixture: &'a Fixture,
    stats: StatsResponse,
}

fn main() -> ExitCode {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut cfg = ScoutConfig::from_env();
    if let Some(dir) = cli.data_dir.clone() {
        cfg = cfg.with_data_dir(dir);
    }
    if let Some(roster) = cli.roster.clone() {
        cfg.roster_path = roster;
    }

    let (ctx, roster) = match load_tables(&cfg) {
        Ok(loaded) => loaded,
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to load tables");
            print_json(&json!({ "error": format!("Error loading CSV files: {err:#}") }));
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Stats { team1, team2 } => {
            info!(%team1, %team2, "generating game stats");
            let response = generate_game_stats(&ctx, &roster, &cfg, &team1, &team2);
            print_json(&response);
            ExitCode::SUCCESS
        }
        Command::Batch { fixtures, from } => match run_batch(&ctx, &roster, &cfg, &fixtures, from) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!(error = %format!("{err:#}"), "batch failed");
                print_json(&json!({ "error": format!("{err:#}") }));
                ExitCode::FAILURE
            }
        },
    }
}

fn load_tables(cfg: &ScoutConfig) -> Result<(DataContext, SharedRoster)> {
    let ctx = load_data_context(&cfg.data_dir)?;
    let roster = SharedRoster::new(load_roster(&cfg.roster_path)?);
    Ok((ctx, roster))
}

fn run_batch(
    ctx: &DataContext,
    roster: &SharedRoster,
    cfg: &ScoutConfig,
    dir: &std::path::Path,
    from: Option<NaiveDate>,
) -> Result<()> {
    let fixtures = load_upcoming_fixtures(dir, from)?;
    info!(count = fixtures.len(), "computing fixture stats");
    if reload_roster_if_changed(roster, &cfg.roster_path)? {
        info!("roster changed on disk since startup");
    }

    let results: Vec<FixtureStats<'_>> = fixtures
        .par_iter()
        .map(|fixture| FixtureStats {
            fixture,
            stats: generate_game_stats(ctx, roster, cfg, &fixture.team1, &fixture.team2),
        })
        .collect();
    for row in &results {
        print_json(row);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(err) => {
            error!(error = %err, "failed to serialize result");
            println!("{}", json!({ "error": "Error serializing result to JSON" }));
        }
    }
}
