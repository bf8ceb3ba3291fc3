use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Weekday;
use clap::Parser;

use fixture_scout::config::{ScoutConfig, load_dotenv};
use fixture_scout::refresh::{self, RefreshOptions};

#[derive(Debug, Parser)]
#[command(name = "roster_refresh", about = "Download and install the league roster CSV")]
struct Args {
    /// Source URL of the roster CSV.
    #[arg(long, env = "SCOUT_ROSTER_URL")]
    url: Option<String>,

    /// Roster file to replace; defaults to the configured roster path.
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Keep running and refresh every week.
    #[arg(long)]
    weekly: bool,

    /// Weekday of the weekly refresh.
    #[arg(long, default_value = "mon")]
    weekday: Weekday,

    /// Local hour of the weekly refresh.
    #[arg(long, default_value_t = 1)]
    hour: u32,

    /// Print recorded refresh runs and exit.
    #[arg(long)]
    history: bool,
}

fn main() -> Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut cfg = ScoutConfig::from_env();
    if let Some(url) = args.url.clone() {
        cfg.roster_url = Some(url);
    }
    if let Some(roster) = args.roster.clone() {
        cfg.roster_path = roster;
    }

    if args.history {
        let conn = refresh::open_db(&cfg.refresh_db)?;
        for run in refresh::load_runs(&conn)? {
            println!(
                "#{} {} -> {} [{}] rows={} sha256={} {}",
                run.run_id,
                run.started_at,
                run.finished_at.as_deref().unwrap_or("-"),
                run.status,
                run.rows.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()),
                run.sha256.as_deref().unwrap_or("-"),
                run.error.as_deref().unwrap_or(""),
            );
        }
        return Ok(());
    }

    let opts = RefreshOptions::from_config(&cfg).context("resolve refresh options")?;
    if args.weekly {
        println!(
            "Automatic roster refresh scheduled every {:?} at {:02}:00",
            args.weekday, args.hour
        );
        return refresh::run_weekly(&opts, args.weekday, args.hour);
    }

    let outcome = refresh::refresh_roster(&opts)?;
    println!("Roster refresh: {:?}", outcome.status);
    println!("Roster: {}", opts.roster_path.display());
    println!("Rows: {}", outcome.rows);
    println!("SHA-256: {}", outcome.sha256);
    if let Some(backup) = outcome.backup {
        println!("Backup: {}", backup.display());
    }
    Ok(())
}
