use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::anyhow;
use fixture_scout::loader::{load_roster, reload_roster_if_changed};
use fixture_scout::refresh::{self, RefreshOptions, RefreshStatus};
use fixture_scout::tables::SharedRoster;

const ROSTER_V1: &str = "Team,Player,Position,Goals,Assists\nGirona,Artem Dovbyk,FW,1,0\n";
const ROSTER_V2: &str =
    "Team,Player,Position,Goals,Assists\nGirona,Artem Dovbyk,FW,1,0\nGirona,Savinho,FW,0,1\n";

fn options(dir: &Path) -> RefreshOptions {
    RefreshOptions {
        roster_path: dir.join("la_liga_players.csv"),
        backup_dir: dir.join("backups"),
        source_url: "https://example.invalid/roster.csv".to_string(),
        db_path: dir.join("refresh.sqlite"),
        keep_backups: refresh::DEFAULT_KEEP_BACKUPS,
    }
}

#[test]
fn first_download_installs_roster() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path());
    let conn = refresh::open_db(&opts.db_path).unwrap();

    let outcome =
        refresh::refresh_roster_with(&conn, &opts, |_| Ok(ROSTER_V1.as_bytes().to_vec())).unwrap();
    assert_eq!(outcome.status, RefreshStatus::Updated);
    assert_eq!(outcome.rows, 1);
    assert!(outcome.backup.is_none());
    assert_eq!(fs::read_to_string(&opts.roster_path).unwrap(), ROSTER_V1);
    assert!(!opts.roster_path.with_extension("csv.tmp").exists());
}

#[test]
fn identical_download_is_unchanged_but_backed_up() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path());
    fs::write(&opts.roster_path, ROSTER_V1).unwrap();
    let conn = refresh::open_db(&opts.db_path).unwrap();

    let outcome =
        refresh::refresh_roster_with(&conn, &opts, |_| Ok(ROSTER_V1.as_bytes().to_vec())).unwrap();
    assert_eq!(outcome.status, RefreshStatus::Unchanged);

    let backup = outcome.backup.expect("existing roster is backed up");
    assert!(backup.starts_with(&opts.backup_dir));
    let name = backup.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("la_liga_players_backup_"), "{name}");
    assert!(name.ends_with(".csv"));
    assert_eq!(fs::read_to_string(&backup).unwrap(), ROSTER_V1);
}

#[test]
fn changed_download_replaces_roster() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path());
    fs::write(&opts.roster_path, ROSTER_V1).unwrap();
    let conn = refresh::open_db(&opts.db_path).unwrap();

    let outcome =
        refresh::refresh_roster_with(&conn, &opts, |_| Ok(ROSTER_V2.as_bytes().to_vec())).unwrap();
    assert_eq!(outcome.status, RefreshStatus::Updated);
    assert_eq!(outcome.rows, 2);
    assert_eq!(outcome.sha256.len(), 64);
    assert_eq!(fs::read_to_string(&opts.roster_path).unwrap(), ROSTER_V2);
}

#[test]
fn failures_leave_roster_alone_and_are_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path());
    fs::write(&opts.roster_path, ROSTER_V1).unwrap();
    let conn = refresh::open_db(&opts.db_path).unwrap();

    let offline = refresh::refresh_roster_with(&conn, &opts, |_| Err(anyhow!("connection refused")));
    assert!(offline.is_err());
    let garbage =
        refresh::refresh_roster_with(&conn, &opts, |_| Ok(b"<html>not a csv</html>".to_vec()));
    assert!(garbage.is_err());
    assert_eq!(fs::read_to_string(&opts.roster_path).unwrap(), ROSTER_V1);

    let ok = refresh::refresh_roster_with(&conn, &opts, |url| {
        assert_eq!(url, "https://example.invalid/roster.csv");
        Ok(ROSTER_V1.as_bytes().to_vec())
    })
    .unwrap();
    assert_eq!(ok.status, RefreshStatus::Unchanged);

    let runs = refresh::load_runs(&conn).unwrap();
    let statuses: Vec<&str> = runs.iter().map(|r| r.status.as_str()).collect();
    assert_eq!(statuses, vec!["failed", "failed", "unchanged"]);
    assert!(runs[0].error.as_deref().unwrap().contains("connection refused"));
    assert!(runs.iter().all(|r| r.finished_at.is_some()));
    assert_eq!(runs[2].rows, Some(1));
}

#[test]
fn shared_roster_picks_up_replaced_file() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path());
    fs::write(&opts.roster_path, ROSTER_V1).unwrap();

    let shared = SharedRoster::new(load_roster(&opts.roster_path).unwrap());
    let before = shared.current();
    assert!(!reload_roster_if_changed(&shared, &opts.roster_path).unwrap());

    fs::write(&opts.roster_path, ROSTER_V2).unwrap();
    fs::File::options()
        .write(true)
        .open(&opts.roster_path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();

    assert!(reload_roster_if_changed(&shared, &opts.roster_path).unwrap());
    assert_eq!(shared.current().table.len(), 2);
    // Readers holding the old snapshot keep seeing it whole.
    assert_eq!(before.table.len(), 1);
}

#[test]
fn old_backups_are_pruned() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = options(dir.path());
    opts.keep_backups = 2;
    fs::create_dir_all(&opts.backup_dir).unwrap();
    for stamp in ["20240101_010000", "20240108_010000", "20240115_010000"] {
        let name = format!("la_liga_players_backup_{stamp}.csv");
        fs::write(opts.backup_dir.join(name), ROSTER_V1).unwrap();
    }
    fs::write(opts.backup_dir.join("notes.txt"), "keep me").unwrap();
    fs::write(&opts.roster_path, ROSTER_V1).unwrap();
    let conn = refresh::open_db(&opts.db_path).unwrap();

    let outcome =
        refresh::refresh_roster_with(&conn, &opts, |_| Ok(ROSTER_V1.as_bytes().to_vec())).unwrap();
    let fresh = outcome.backup.expect("existing roster is backed up");

    let mut left: Vec<String> = fs::read_dir(&opts.backup_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left.len(), 3);
    assert!(left.contains(&"la_liga_players_backup_20240115_010000.csv".to_string()));
    assert!(left.contains(&"notes.txt".to_string()));
    assert!(fresh.exists());
}
