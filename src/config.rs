use std::path::PathBuf;
use std::str::FromStr;

use crate::resolve::DEFAULT_SIMILARITY_FLOOR;
use crate::stats::Thresholds;

pub const DEFAULT_DATA_DIR: &str = "data/stats";
pub const DEFAULT_ROSTER_FILE: &str = "la_liga_players.csv";

#[derive(Debug, Clone)]
pub struct ScoutConfig {
    pub data_dir: PathBuf,
    pub roster_path: PathBuf,
    pub similarity_floor: u8,
    pub thresholds: Thresholds,
    pub roster_url: Option<String>,
    pub refresh_db: PathBuf,
    pub keep_backups: usize,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(DEFAULT_DATA_DIR);
        Self {
            roster_path: data_dir.join(DEFAULT_ROSTER_FILE),
            refresh_db: data_dir.join("backups").join("refresh_runs.sqlite"),
            data_dir,
            similarity_floor: DEFAULT_SIMILARITY_FLOOR,
            thresholds: Thresholds::default(),
            roster_url: None,
            keep_backups: crate::refresh::DEFAULT_KEEP_BACKUPS,
        }
    }
}

/// Loads `.env.local` then `.env` into the process environment, ignoring
/// missing files.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

impl ScoutConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Values that fail to parse keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let data_dir = lookup("SCOUT_DATA_DIR")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let roster_file = lookup("SCOUT_ROSTER_FILE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ROSTER_FILE.to_string());
        let refresh_db = lookup("SCOUT_REFRESH_DB")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("backups").join("refresh_runs.sqlite"));

        let t = defaults.thresholds;
        let thresholds = Thresholds {
            form_games: parsed(&lookup, "SCOUT_FORM_GAMES").unwrap_or(t.form_games),
            clean_sheet_games: parsed(&lookup, "SCOUT_CLEAN_SHEET_GAMES")
                .unwrap_or(t.clean_sheet_games),
            high_scoring_avg_goals: parsed(&lookup, "SCOUT_HIGH_SCORING_GOALS")
                .unwrap_or(t.high_scoring_avg_goals),
            high_card_games: parsed(&lookup, "SCOUT_HIGH_CARD_GAMES").unwrap_or(t.high_card_games),
            high_card_min_events: parsed(&lookup, "SCOUT_HIGH_CARD_EVENTS")
                .unwrap_or(t.high_card_min_events),
            high_card_share_pct: parsed(&lookup, "SCOUT_HIGH_CARD_SHARE")
                .unwrap_or(t.high_card_share_pct),
            card_event_type: lookup("SCOUT_CARD_EVENT_TYPE")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(t.card_event_type),
        };

        Self {
            roster_path: data_dir.join(roster_file),
            similarity_floor: parsed::<u8>(&lookup, "SCOUT_SIMILARITY_FLOOR")
                .map(|v| v.min(100))
                .unwrap_or(defaults.similarity_floor),
            thresholds,
            roster_url: lookup("SCOUT_ROSTER_URL")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            refresh_db,
            keep_backups: parsed(&lookup, "SCOUT_KEEP_BACKUPS")
                .unwrap_or(defaults.keep_backups),
            data_dir,
        }
    }

    /// Points the config at another data directory, keeping the roster file
    /// name.
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        let roster_file = self
            .roster_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROSTER_FILE));
        self.roster_path = dir.join(roster_file);
        self.data_dir = dir;
        self
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> ScoutConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ScoutConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_documented_constants() {
        let cfg = config_from(&[]);
        assert_eq!(cfg.similarity_floor, 80);
        assert_eq!(cfg.thresholds.form_games, 5);
        assert_eq!(cfg.thresholds.clean_sheet_games, 10);
        assert_eq!(cfg.thresholds.high_card_games, 3);
        assert_eq!(cfg.thresholds.high_card_min_events, 4);
        assert_eq!(cfg.thresholds.high_scoring_avg_goals, 2.5);
        assert_eq!(cfg.thresholds.high_card_share_pct, 30.0);
        assert_eq!(cfg.roster_path, PathBuf::from("data/stats/la_liga_players.csv"));
        assert!(cfg.roster_url.is_none());
        assert_eq!(cfg.keep_backups, 10);
    }

    #[test]
    fn overrides_and_bad_values() {
        let cfg = config_from(&[
            ("SCOUT_DATA_DIR", "/srv/scout"),
            ("SCOUT_SIMILARITY_FLOOR", "85"),
            ("SCOUT_FORM_GAMES", "not-a-number"),
            ("SCOUT_HIGH_CARD_SHARE", "50"),
            ("SCOUT_ROSTER_URL", "  "),
            ("SCOUT_KEEP_BACKUPS", "3"),
        ]);
        assert_eq!(cfg.keep_backups, 3);
        assert_eq!(cfg.similarity_floor, 85);
        assert_eq!(cfg.thresholds.form_games, 5);
        assert_eq!(cfg.thresholds.high_card_share_pct, 50.0);
        assert_eq!(cfg.roster_path, PathBuf::from("/srv/scout/la_liga_players.csv"));
        assert_eq!(
            cfg.refresh_db,
            PathBuf::from("/srv/scout/backups/refresh_runs.sqlite")
        );
        assert!(cfg.roster_url.is_none());
    }

    #[test]
    fn with_data_dir_keeps_roster_file_name() {
        let cfg = config_from(&[("SCOUT_ROSTER_FILE", "roster.csv")])
            .with_data_dir(PathBuf::from("other"));
        assert_eq!(cfg.roster_path, PathBuf::from("other/roster.csv"));
    }
}
