use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

pub const TIME_TBD: &str = "TBD";

/// An upcoming (unplayed) match from a season file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fixture {
    pub round: String,
    pub date: String,
    pub time: String,
    pub team1: String,
    pub team2: String,
    pub league: String,
}

/// Unplayed matches of one season file shaped
/// `{ "name": ..., "matches": [{ round, date, time, team1, team2, score }] }`.
pub fn parse_season_json(raw: &str) -> Result<Vec<Fixture>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid season json")?;
    let league = v
        .get("name")
        .and_then(|x| x.as_str())
        .unwrap_or("")
        .to_string();

    let mut out = Vec::new();
    let Some(matches) = v.get("matches").and_then(|x| x.as_array()) else {
        return Ok(out);
    };
    for m in matches {
        if has_result(m.get("score")) {
            continue;
        }
        let text = |key: &str| {
            m.get(key)
                .and_then(|x| x.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("N/A")
                .to_string()
        };
        let time = m
            .get("time")
            .and_then(|x| x.as_str())
            .filter(|t| t.contains(':'))
            .unwrap_or(TIME_TBD)
            .to_string();
        out.push(Fixture {
            round: text("round"),
            date: text("date"),
            time,
            team1: text("team1"),
            team2: text("team2"),
            league: league.clone(),
        });
    }
    Ok(out)
}

fn has_result(score: Option<&Value>) -> bool {
    match score {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Object(obj)) => obj
            .get("ft")
            .and_then(|ft| ft.as_array())
            .is_some_and(|ft| ft.len() == 2),
        _ => false,
    }
}

/// Date order, then kickoff time with `TBD` last. Unparseable dates sort last.
pub fn sort_fixtures(fixtures: &mut [Fixture]) {
    fixtures.sort_by(|a, b| {
        let da = NaiveDate::parse_from_str(&a.date, "%Y-%m-%d").ok();
        let db = NaiveDate::parse_from_str(&b.date, "%Y-%m-%d").ok();
        let by_date = match (da, db) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_date.then_with(|| match (a.time == TIME_TBD, b.time == TIME_TBD) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => a.time.cmp(&b.time),
        })
    });
}

/// Upcoming fixtures across every season file in `dir`, on or after `from`
/// when given. Files with `clubs` in the name are club lists and skipped;
/// unreadable files are logged and skipped.
pub fn load_upcoming_fixtures(dir: &Path, from: Option<NaiveDate>) -> Result<Vec<Fixture>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("read fixtures dir {}", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.context("read fixtures dir entry")?.path();
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let is_clubs = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains("clubs"));
        if is_json && !is_clubs {
            paths.push(path);
        }
    }
    paths.sort();

    let mut all = Vec::new();
    for path in paths {
        let parsed = fs::read_to_string(&path)
            .context("read season file")
            .and_then(|raw| parse_season_json(&raw));
        match parsed {
            Ok(fixtures) => {
                debug!(file = %path.display(), count = fixtures.len(), "season file parsed");
                all.extend(fixtures);
            }
            Err(err) => warn!(file = %path.display(), error = %format!("{err:#}"), "skipping season file"),
        }
    }

    if let Some(from) = from {
        all.retain(|f| {
            NaiveDate::parse_from_str(&f.date, "%Y-%m-%d").is_ok_and(|d| d >= from)
        });
    }
    sort_fixtures(&mut all);
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEASON: &str = r#"{
        "name": "Primera División 2024/25",
        "matches": [
            {"round": "Matchday 1", "date": "2024-08-15", "time": "19:00",
             "team1": "Athletic Club", "team2": "Getafe CF", "score": {"ft": [1, 1]}},
            {"round": "Matchday 20", "date": "2025-01-19", "time": "21:00",
             "team1": "Real Madrid CF", "team2": "UD Las Palmas"},
            {"round": "Matchday 20", "date": "2025-01-18",
             "team1": "Girona FC", "team2": "Sevilla FC"},
            {"round": "Matchday 20", "date": "2025-01-18", "time": "14:00",
             "team1": "Valencia CF", "team2": "Real Betis", "score": ""},
            {"round": "Matchday 19", "date": "2025-01-12", "time": "16:15",
             "team1": "FC Barcelona", "team2": "RCD Espanyol", "score": "2-0"}
        ]
    }"#;

    #[test]
    fn skips_played_matches() {
        let fixtures = parse_season_json(SEASON).unwrap();
        assert_eq!(fixtures.len(), 3);
        assert!(fixtures.iter().all(|f| f.league == "Primera División 2024/25"));
        assert!(!fixtures.iter().any(|f| f.team1 == "Athletic Club"));
    }

    #[test]
    fn missing_time_is_tbd_and_sorts_last_within_day() {
        let mut fixtures = parse_season_json(SEASON).unwrap();
        sort_fixtures(&mut fixtures);
        let order: Vec<&str> = fixtures.iter().map(|f| f.team1.as_str()).collect();
        assert_eq!(order, vec!["Valencia CF", "Girona FC", "Real Madrid CF"]);
        assert_eq!(fixtures[1].time, TIME_TBD);
    }

    #[test]
    fn null_is_empty() {
        assert!(parse_season_json("null").unwrap().is_empty());
        assert!(parse_season_json("{\"name\": \"x\"}").unwrap().is_empty());
    }
}
