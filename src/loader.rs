use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::tables::{DataContext, Record, RosterEntry, RosterSnapshot, SharedRoster, Table};

pub const CLUBS_FILE: &str = "clubs.csv";
pub const GAMES_FILE: &str = "games.csv";
pub const CLUB_GAMES_FILE: &str = "club_games.csv";
pub const GAME_EVENTS_FILE: &str = "game_events.csv";
pub const PLAYERS_FILE: &str = "players.csv";
pub const PLAYER_VALUATIONS_FILE: &str = "player_valuations.csv";

pub fn read_table<T>(path: &Path) -> Result<Table<T>>
where
    T: Record + DeserializeOwned,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("open {} csv {}", T::TABLE, path.display()))?;
    read_table_from(&mut reader).with_context(|| format!("read {}", path.display()))
}

pub fn read_table_from<T, R>(reader: &mut csv::Reader<R>) -> Result<Table<T>>
where
    T: Record + DeserializeOwned,
    R: std::io::Read,
{
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("read {} header", T::TABLE))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if let Some(missing) = T::REQUIRED
        .iter()
        .find(|col| !headers.iter().any(|h| h == *col))
    {
        return Err(anyhow!("{} is missing required column '{missing}'", T::TABLE));
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<T>().enumerate() {
        let row = record.with_context(|| format!("decode {} row {}", T::TABLE, idx + 1))?;
        rows.push(row);
    }
    debug!(table = T::TABLE, rows = rows.len(), "loaded table");
    Ok(Table::new(headers, rows))
}

/// Reads the six primary-database tables from `dir`. Any failure is fatal.
pub fn load_data_context(dir: &Path) -> Result<DataContext> {
    let ctx = DataContext {
        clubs: read_table(&dir.join(CLUBS_FILE))?,
        games: read_table(&dir.join(GAMES_FILE))?,
        club_games: read_table(&dir.join(CLUB_GAMES_FILE))?,
        events: read_table(&dir.join(GAME_EVENTS_FILE))?,
        players: read_table(&dir.join(PLAYERS_FILE))?,
        valuations: read_table(&dir.join(PLAYER_VALUATIONS_FILE))?,
    };
    info!(
        clubs = ctx.clubs.len(),
        games = ctx.games.len(),
        players = ctx.players.len(),
        "primary tables loaded"
    );
    Ok(ctx)
}

pub fn load_roster(path: &Path) -> Result<RosterSnapshot> {
    let source_modified = fs::metadata(path).and_then(|m| m.modified()).ok();
    let table = read_table::<RosterEntry>(path)?;
    info!(rows = table.len(), path = %path.display(), "league roster loaded");
    Ok(RosterSnapshot {
        table,
        source_modified,
    })
}

/// Swaps in a fresh roster when the file on disk changed since the current
/// snapshot was read. Returns whether a swap happened.
pub fn reload_roster_if_changed(shared: &SharedRoster, path: &Path) -> Result<bool> {
    let on_disk = fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("stat roster {}", path.display()))?;
    if shared.current().source_modified == Some(on_disk) {
        return Ok(false);
    }
    let snapshot = load_roster(path)?;
    shared.replace(snapshot);
    info!(path = %path.display(), "league roster snapshot replaced");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{Club, Game};

    fn reader(raw: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(raw.as_bytes())
    }

    #[test]
    fn records_present_columns() {
        let raw = "game_id,date,home_club_id,away_club_id,extra\n1,2024-01-01,10,20,x\n";
        let table: Table<Game> = read_table_from(&mut reader(raw)).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.has_column("date"));
        assert!(!table.has_column("home_club_goals"));
        assert_eq!(table.rows()[0].home_club_goals, None);
        assert_eq!(table.rows()[0].away_club_id, Some(20));
    }

    #[test]
    fn empty_cells_are_none() {
        let raw = "game_id,date,home_club_id,away_club_id,home_club_goals,away_club_goals\n7,,10,20,,1\n";
        let table: Table<Game> = read_table_from(&mut reader(raw)).unwrap();
        assert_eq!(table.rows()[0].date, None);
        assert_eq!(table.rows()[0].home_club_goals, None);
        assert_eq!(table.rows()[0].away_club_goals, Some(1));
    }

    #[test]
    fn missing_key_column_is_load_failure() {
        let raw = "club_id,club_code\n1,fc-x\n";
        let err = read_table_from::<Club, _>(&mut reader(raw)).unwrap_err();
        assert!(err.to_string().contains("name"), "{err}");
    }

    #[test]
    fn bad_value_is_load_failure() {
        let raw = "club_id,name\nabc,Somewhere\n";
        assert!(read_table_from::<Club, _>(&mut reader(raw)).is_err());
    }

    #[test]
    fn roster_headers_are_trimmed() {
        let raw = " Team , Player ,Goals\nGirona,Dovbyk,2\n";
        let table: Table<RosterEntry> = read_table_from(&mut reader(raw)).unwrap();
        assert!(table.has_column("Team"));
        assert_eq!(table.rows()[0].goals, Some(2.0));
        assert!(table.require(&["Assists"]).is_err());
    }
}
