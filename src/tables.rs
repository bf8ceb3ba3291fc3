use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use serde::Deserialize;

pub type ClubId = i64;
pub type GameId = i64;
pub type PlayerId = i64;

/// A row type backed by one CSV file.
pub trait Record {
    const TABLE: &'static str;
    /// Every column the row type reads.
    const COLUMNS: &'static [&'static str];
    /// Columns without which the table cannot be loaded at all.
    const REQUIRED: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingColumn {
    pub table: &'static str,
    pub column: String,
}

impl std::fmt::Display for MissingColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "column '{}' not found in {}", self.column, self.table)
    }
}

impl std::error::Error for MissingColumn {}

/// Loaded rows plus the set of columns the source actually carried.
#[derive(Debug, Clone)]
pub struct Table<T> {
    columns: HashSet<String>,
    rows: Vec<T>,
}

impl<T: Record> Table<T> {
    pub fn new<I, S>(columns: I, rows: Vec<T>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    /// Table whose source carried every column the row type knows about.
    pub fn complete(rows: Vec<T>) -> Self {
        Self::new(T::COLUMNS.iter().copied(), rows)
    }

    pub fn empty() -> Self {
        Self::complete(Vec::new())
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn require(&self, columns: &[&str]) -> Result<(), MissingColumn> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(column) => Err(MissingColumn {
                table: T::TABLE,
                column: column.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Club {
    pub club_id: ClubId,
    pub name: String,
}

impl Record for Club {
    const TABLE: &'static str = "clubs";
    const COLUMNS: &'static [&'static str] = &["club_id", "name"];
    const REQUIRED: &'static [&'static str] = &["club_id", "name"];
}

#[derive(Debug, Clone, Deserialize)]
pub struct Game {
    pub game_id: GameId,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub home_club_id: Option<ClubId>,
    #[serde(default)]
    pub away_club_id: Option<ClubId>,
    #[serde(default)]
    pub home_club_goals: Option<i64>,
    #[serde(default)]
    pub away_club_goals: Option<i64>,
}

impl Game {
    pub fn involves(&self, club_id: ClubId) -> bool {
        self.home_club_id == Some(club_id) || self.away_club_id == Some(club_id)
    }

    pub fn is_between(&self, a: ClubId, b: ClubId) -> bool {
        matches!(
            (self.home_club_id, self.away_club_id),
            (Some(h), Some(w)) if (h == a && w == b) || (h == b && w == a)
        )
    }

    /// Goals scored against `club_id`, when the club played and the score is known.
    pub fn goals_conceded_by(&self, club_id: ClubId) -> Option<i64> {
        if self.home_club_id == Some(club_id) {
            self.away_club_goals
        } else if self.away_club_id == Some(club_id) {
            self.home_club_goals
        } else {
            None
        }
    }
}

impl Record for Game {
    const TABLE: &'static str = "games";
    const COLUMNS: &'static [&'static str] = &[
        "game_id",
        "date",
        "home_club_id",
        "away_club_id",
        "home_club_goals",
        "away_club_goals",
    ];
    const REQUIRED: &'static [&'static str] = &["game_id"];
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClubGame {
    pub game_id: GameId,
    pub club_id: ClubId,
    #[serde(default)]
    pub is_win: Option<i64>,
}

impl Record for ClubGame {
    const TABLE: &'static str = "club_games";
    const COLUMNS: &'static [&'static str] = &["game_id", "club_id", "is_win"];
    const REQUIRED: &'static [&'static str] = &["game_id", "club_id"];
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameEvent {
    pub game_id: GameId,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl Record for GameEvent {
    const TABLE: &'static str = "game_events";
    const COLUMNS: &'static [&'static str] = &["game_id", "type"];
    const REQUIRED: &'static [&'static str] = &["game_id"];
}

#[derive(Debug, Clone, Deserialize)]
pub struct Player {
    pub player_id: PlayerId,
    #[serde(default)]
    pub current_club_id: Option<ClubId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub market_value_in_eur: Option<f64>,
}

impl Record for Player {
    const TABLE: &'static str = "players";
    const COLUMNS: &'static [&'static str] = &[
        "player_id",
        "current_club_id",
        "name",
        "position",
        "market_value_in_eur",
    ];
    const REQUIRED: &'static [&'static str] = &["player_id"];
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerValuation {
    pub player_id: PlayerId,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub market_value_in_eur: Option<f64>,
}

impl Record for PlayerValuation {
    const TABLE: &'static str = "player_valuations";
    const COLUMNS: &'static [&'static str] = &["player_id", "date", "market_value_in_eur"];
    const REQUIRED: &'static [&'static str] = &["player_id"];
}

/// One appearance row of the league player-stats roster.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterEntry {
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(default, rename = "Player")]
    pub player: Option<String>,
    #[serde(default, rename = "Position")]
    pub position: Option<String>,
    #[serde(default, rename = "Goals")]
    pub goals: Option<f64>,
    #[serde(default, rename = "Assists")]
    pub assists: Option<f64>,
    #[serde(default, rename = "Minutes")]
    pub minutes: Option<f64>,
    #[serde(default, rename = "xG")]
    pub expected_goals: Option<f64>,
    #[serde(default, rename = "Passes Completed")]
    pub passes_completed: Option<f64>,
    #[serde(default, rename = "Passes Attempted")]
    pub passes_attempted: Option<f64>,
}

impl Record for RosterEntry {
    const TABLE: &'static str = "league_roster";
    const COLUMNS: &'static [&'static str] = &[
        "Team",
        "Player",
        "Position",
        "Goals",
        "Assists",
        "Minutes",
        "xG",
        "Passes Completed",
        "Passes Attempted",
    ];
    const REQUIRED: &'static [&'static str] = &["Team"];
}

pub type RosterTable = Table<RosterEntry>;

/// The primary match database, loaded once and only ever read.
#[derive(Debug, Clone)]
pub struct DataContext {
    pub clubs: Table<Club>,
    pub games: Table<Game>,
    pub club_games: Table<ClubGame>,
    pub events: Table<GameEvent>,
    pub players: Table<Player>,
    pub valuations: Table<PlayerValuation>,
}

impl DataContext {
    pub fn club_name(&self, club_id: ClubId) -> Option<&str> {
        self.clubs
            .rows()
            .iter()
            .find(|c| c.club_id == club_id)
            .map(|c| c.name.as_str())
    }
}

#[derive(Debug)]
pub struct RosterSnapshot {
    pub table: RosterTable,
    /// Modification time of the file the table was read from, if any.
    pub source_modified: Option<SystemTime>,
}

/// Holder for the league roster, which a refresh may swap while readers run.
///
/// Readers take one `Arc` per invocation through [`SharedRoster::current`];
/// replacement swaps the whole snapshot and never touches rows in place.
#[derive(Debug)]
pub struct SharedRoster {
    inner: RwLock<Arc<RosterSnapshot>>,
}

impl SharedRoster {
    pub fn new(snapshot: RosterSnapshot) -> Self {
        Self {
            inner: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn from_table(table: RosterTable) -> Self {
        Self::new(RosterSnapshot {
            table,
            source_modified: None,
        })
    }

    pub fn current(&self) -> Arc<RosterSnapshot> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Installs `snapshot` and returns the one it replaced.
    pub fn replace(&self, snapshot: RosterSnapshot) -> Arc<RosterSnapshot> {
        let next = Arc::new(snapshot);
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}
