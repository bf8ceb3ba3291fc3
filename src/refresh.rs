//! Replaces the league roster CSV with a freshly downloaded copy.
//!
//! The existing file is backed up first, the download is validated as a
//! roster before it is installed, and installation is a temp-file rename so
//! readers only ever see a whole file. Each run is recorded in SQLite.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, Local, NaiveDateTime, Utc, Weekday};
use rusqlite::{Connection, params};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::ScoutConfig;
use crate::http_client::fetch_bytes;
use crate::loader::read_table_from;
use crate::tables::RosterEntry;

const MAX_SLEEP: Duration = Duration::from_secs(3600);
pub const DEFAULT_KEEP_BACKUPS: usize = 10;

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    pub roster_path: PathBuf,
    pub backup_dir: PathBuf,
    pub source_url: String,
    pub db_path: PathBuf,
    /// Newest backups kept after each run; older ones are deleted.
    pub keep_backups: usize,
}

impl RefreshOptions {
    pub fn from_config(cfg: &ScoutConfig) -> Result<Self> {
        let source_url = cfg
            .roster_url
            .clone()
            .ok_or_else(|| anyhow!("SCOUT_ROSTER_URL is not set"))?;
        let backup_dir = cfg
            .roster_path
            .parent()
            .map(|p| p.join("backups"))
            .unwrap_or_else(|| PathBuf::from("backups"));
        Ok(Self {
            roster_path: cfg.roster_path.clone(),
            backup_dir,
            source_url,
            db_path: cfg.refresh_db.clone(),
            keep_backups: cfg.keep_backups,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    Updated,
    Unchanged,
}

impl RefreshStatus {
    fn as_str(self) -> &'static str {
        match self {
            RefreshStatus::Updated => "updated",
            RefreshStatus::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub status: RefreshStatus,
    pub rows: usize,
    pub sha256: String,
    pub backup: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RefreshRun {
    pub run_id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub source_url: String,
    pub status: String,
    pub rows: Option<i64>,
    pub sha256: Option<String>,
    pub error: Option<String>,
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS refresh_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            source_url TEXT NOT NULL,
            status TEXT NOT NULL,
            rows INTEGER NULL,
            sha256 TEXT NULL,
            backup_path TEXT NULL,
            error TEXT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn load_runs(conn: &Connection) -> Result<Vec<RefreshRun>> {
    let mut stmt = conn
        .prepare(
            "SELECT run_id, started_at, finished_at, source_url, status, rows, sha256, error
             FROM refresh_runs ORDER BY run_id ASC",
        )
        .context("prepare load runs query")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RefreshRun {
                run_id: row.get(0)?,
                started_at: row.get(1)?,
                finished_at: row.get(2)?,
                source_url: row.get(3)?,
                status: row.get(4)?,
                rows: row.get(5)?,
                sha256: row.get(6)?,
                error: row.get(7)?,
            })
        })
        .context("query refresh runs")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode refresh run row")?);
    }
    Ok(out)
}

/// Downloads, validates and installs the roster, recording the run.
pub fn refresh_roster(opts: &RefreshOptions) -> Result<RefreshOutcome> {
    let conn = open_db(&opts.db_path)?;
    refresh_roster_with(&conn, opts, fetch_bytes)
}

pub fn refresh_roster_with(
    conn: &Connection,
    opts: &RefreshOptions,
    fetch: impl FnOnce(&str) -> Result<Vec<u8>>,
) -> Result<RefreshOutcome> {
    conn.execute(
        "INSERT INTO refresh_runs(started_at, source_url, status) VALUES (?1, ?2, 'running')",
        params![Utc::now().to_rfc3339(), opts.source_url],
    )
    .context("insert refresh run")?;
    let run_id = conn.last_insert_rowid();

    let result = install_download(opts, fetch);
    let finished_at = Utc::now().to_rfc3339();
    match &result {
        Ok(outcome) => {
            conn.execute(
                "UPDATE refresh_runs
                 SET finished_at = ?1, status = ?2, rows = ?3, sha256 = ?4, backup_path = ?5
                 WHERE run_id = ?6",
                params![
                    finished_at,
                    outcome.status.as_str(),
                    outcome.rows as i64,
                    outcome.sha256,
                    outcome.backup.as_ref().map(|p| p.display().to_string()),
                    run_id
                ],
            )
            .context("update refresh run")?;
            info!(
                status = outcome.status.as_str(),
                rows = outcome.rows,
                "roster refresh finished"
            );
        }
        Err(err) => {
            conn.execute(
                "UPDATE refresh_runs SET finished_at = ?1, status = 'failed', error = ?2
                 WHERE run_id = ?3",
                params![finished_at, format!("{err:#}"), run_id],
            )
            .context("update failed refresh run")?;
            warn!(error = %format!("{err:#}"), "roster refresh failed");
        }
    }
    result
}

fn install_download(
    opts: &RefreshOptions,
    fetch: impl FnOnce(&str) -> Result<Vec<u8>>,
) -> Result<RefreshOutcome> {
    let backup = backup_existing(&opts.roster_path, &opts.backup_dir, Local::now().naive_local())?;
    if backup.is_some() {
        prune_backups(&opts.roster_path, &opts.backup_dir, opts.keep_backups)?;
    }

    let body = fetch(&opts.source_url).context("download roster")?;
    let rows = validate_roster(&body)?;
    let sha256 = sha256_hex(&body);

    let current = fs::read(&opts.roster_path).ok();
    if current.as_deref().map(sha256_hex).as_deref() == Some(sha256.as_str()) {
        return Ok(RefreshOutcome {
            status: RefreshStatus::Unchanged,
            rows,
            sha256,
            backup,
        });
    }

    if let Some(parent) = opts.roster_path.parent() {
        fs::create_dir_all(parent).ok();
    }
    let tmp = opts.roster_path.with_extension("csv.tmp");
    fs::write(&tmp, &body).context("write roster temp file")?;
    fs::rename(&tmp, &opts.roster_path).context("swap roster file")?;

    Ok(RefreshOutcome {
        status: RefreshStatus::Updated,
        rows,
        sha256,
        backup,
    })
}

/// Copies the current roster into `backup_dir` under a timestamped name.
pub fn backup_existing(
    roster_path: &Path,
    backup_dir: &Path,
    now: NaiveDateTime,
) -> Result<Option<PathBuf>> {
    if !roster_path.exists() {
        return Ok(None);
    }
    fs::create_dir_all(backup_dir)
        .with_context(|| format!("create backup dir {}", backup_dir.display()))?;
    let name = format!(
        "{}_backup_{}.csv",
        backup_stem(roster_path),
        now.format("%Y%m%d_%H%M%S")
    );
    let target = backup_dir.join(name);
    fs::copy(roster_path, &target)
        .with_context(|| format!("back up roster to {}", target.display()))?;
    info!(backup = %target.display(), "roster backed up");
    Ok(Some(target))
}

/// Deletes all but the newest `keep` backups of `roster_path`. The timestamp
/// in the file name orders them.
pub fn prune_backups(roster_path: &Path, backup_dir: &Path, keep: usize) -> Result<Vec<PathBuf>> {
    let prefix = format!("{}_backup_", backup_stem(roster_path));
    let entries = fs::read_dir(backup_dir)
        .with_context(|| format!("read backup dir {}", backup_dir.display()))?;
    let mut backups = Vec::new();
    for entry in entries {
        let path = entry.context("read backup dir entry")?.path();
        let is_backup = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".csv"));
        if is_backup {
            backups.push(path);
        }
    }
    backups.sort();

    let excess = backups.len().saturating_sub(keep);
    let removed: Vec<PathBuf> = backups.into_iter().take(excess).collect();
    for path in &removed {
        fs::remove_file(path).with_context(|| format!("remove old backup {}", path.display()))?;
    }
    if !removed.is_empty() {
        info!(removed = removed.len(), kept = keep, "old roster backups pruned");
    }
    Ok(removed)
}

fn backup_stem(roster_path: &Path) -> &str {
    roster_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("roster")
}

/// Row count of a downloaded roster; rejects anything that is not one.
pub fn validate_roster(body: &[u8]) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(body);
    let table = read_table_from::<RosterEntry, _>(&mut reader).context("validate roster")?;
    if table.is_empty() {
        return Err(anyhow!("downloaded roster has no rows"));
    }
    Ok(table.len())
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// First `weekday` at `hour`:00 strictly after `now`.
pub fn next_weekly_run(now: NaiveDateTime, weekday: Weekday, hour: u32) -> Option<NaiveDateTime> {
    let ahead = (7 + weekday.num_days_from_monday() - now.weekday().num_days_from_monday()) % 7;
    let candidate = (now.date() + chrono::Duration::days(i64::from(ahead))).and_hms_opt(hour, 0, 0)?;
    if candidate > now {
        Some(candidate)
    } else {
        Some(candidate + chrono::Duration::days(7))
    }
}

/// Runs a refresh now and then every week at `weekday` `hour`:00 local time.
/// Never returns; individual failures are logged and recorded.
pub fn run_weekly(opts: &RefreshOptions, weekday: Weekday, hour: u32) -> Result<()> {
    if let Err(err) = refresh_roster(opts) {
        warn!(error = %format!("{err:#}"), "initial roster refresh failed");
    }
    loop {
        let now = Local::now().naive_local();
        let next = next_weekly_run(now, weekday, hour)
            .ok_or_else(|| anyhow!("invalid schedule hour {hour}"))?;
        info!(next = %next, "next roster refresh scheduled");
        loop {
            let now = Local::now().naive_local();
            if now >= next {
                break;
            }
            let remaining = (next - now).to_std().unwrap_or(Duration::ZERO);
            std::thread::sleep(remaining.min(MAX_SLEEP));
        }
        if let Err(err) = refresh_roster(opts) {
            warn!(error = %format!("{err:#}"), "scheduled roster refresh failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn next_run_later_same_week() {
        // 2024-09-04 is a Wednesday.
        let next = next_weekly_run(at(2024, 9, 4, 12, 0), Weekday::Mon, 1).unwrap();
        assert_eq!(next, at(2024, 9, 9, 1, 0));
    }

    #[test]
    fn next_run_skips_a_week_once_passed() {
        // Monday 2024-09-09, already past 01:00.
        let next = next_weekly_run(at(2024, 9, 9, 1, 0), Weekday::Mon, 1).unwrap();
        assert_eq!(next, at(2024, 9, 16, 1, 0));
        let early = next_weekly_run(at(2024, 9, 9, 0, 30), Weekday::Mon, 1).unwrap();
        assert_eq!(early, at(2024, 9, 9, 1, 0));
    }

    #[test]
    fn bad_hour_has_no_schedule() {
        assert!(next_weekly_run(at(2024, 9, 9, 0, 0), Weekday::Mon, 24).is_none());
    }

    #[test]
    fn validate_rejects_non_roster() {
        assert!(validate_roster(b"Club,Name\nx,y\n").is_err());
        assert!(validate_roster(b"Team,Player\n").is_err());
        assert_eq!(validate_roster(b"Team,Player\nGirona,Dovbyk\n").unwrap(), 1);
    }
}
