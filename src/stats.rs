use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::tables::{
    ClubId, DataContext, Game, MissingColumn, PlayerId, Record, RosterEntry, RosterTable, Table,
};

const GAME_SCORE_COLUMNS: &[&str] = &[
    "date",
    "home_club_id",
    "away_club_id",
    "home_club_goals",
    "away_club_goals",
];

/// Result slot of one aggregator. Every variant is data; aggregators never
/// fail past their own boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum StatOutcome<T> {
    Value(T),
    NoData(String),
    SchemaError { table: String, column: String },
    InternalError(String),
}

impl<T> StatOutcome<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            StatOutcome::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, StatOutcome::NoData(_))
    }
}

impl<T> From<MissingColumn> for StatOutcome<T> {
    fn from(err: MissingColumn) -> Self {
        StatOutcome::SchemaError {
            table: err.table.to_string(),
            column: err.column,
        }
    }
}

/// Tunable constants behind the heuristics.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub form_games: usize,
    pub clean_sheet_games: usize,
    pub high_scoring_avg_goals: f64,
    pub high_card_games: usize,
    /// A match is high-card when it has strictly more card events than this.
    pub high_card_min_events: usize,
    pub high_card_share_pct: f64,
    pub card_event_type: String,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            form_games: 5,
            clean_sheet_games: 10,
            high_scoring_avg_goals: 2.5,
            high_card_games: 3,
            high_card_min_events: 4,
            high_card_share_pct: 30.0,
            card_event_type: "Cards".to_string(),
        }
    }
}

macro_rules! try_stat {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(err) => return err.into(),
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormCode {
    Win,
    Draw,
    Loss,
    Unknown,
}

impl FormCode {
    pub fn as_char(self) -> char {
        match self {
            FormCode::Win => 'W',
            FormCode::Draw => 'D',
            FormCode::Loss => 'L',
            FormCode::Unknown => 'U',
        }
    }

    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            'W' => Some(FormCode::Win),
            'D' => Some(FormCode::Draw),
            'L' => Some(FormCode::Loss),
            'U' => Some(FormCode::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentForm {
    /// One code per match, oldest first.
    pub form: String,
    pub games_found: usize,
    pub games_requested: usize,
    /// Fewer matches exist than were requested.
    pub partial: bool,
}

impl RecentForm {
    pub fn codes(&self) -> Vec<FormCode> {
        self.form.chars().filter_map(FormCode::from_char).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideRecord {
    pub club_id: ClubId,
    pub name: String,
    pub wins: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadToHead {
    pub total_games: usize,
    /// Date of the earliest dated meeting.
    pub first_game_date: Option<String>,
    pub draws: u32,
    pub sides: [SideRecord; 2],
    /// `"<display name>_wins"` per side.
    #[serde(flatten)]
    pub wins_by_name: BTreeMap<String, u32>,
}

impl HeadToHead {
    pub fn wins_for(&self, club_id: ClubId) -> Option<u32> {
        self.sides
            .iter()
            .find(|s| s.club_id == club_id)
            .map(|s| s.wins)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyPlayer {
    pub player_id: PlayerId,
    pub name: String,
    pub position: String,
    pub market_value: f64,
    /// Date of the valuation used, `None` when the embedded value was used.
    pub valuation_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanSheet {
    pub games_considered: usize,
    pub clean_sheets: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueKeyPlayer {
    pub name: String,
    pub position: String,
    pub goals: f64,
    pub assists: f64,
    pub combined_score: f64,
    pub minutes_played: f64,
    pub games_played: usize,
    pub expected_goals: f64,
    pub passes_completed: f64,
    pub passes_attempted: f64,
    pub pass_rate: f64,
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| format!("unparseable date '{raw}'"))
}

/// Games passing `keep`, newest first. Rows without a date are left out.
fn games_newest_first<'a>(
    games: &'a Table<Game>,
    keep: impl Fn(&Game) -> bool,
) -> Result<Vec<&'a Game>, String> {
    let mut dated = Vec::new();
    for game in games.rows() {
        if !keep(game) {
            continue;
        }
        let Some(raw) = game.date.as_deref() else {
            continue;
        };
        if raw.trim().is_empty() {
            continue;
        }
        dated.push((parse_date(raw)?, game));
    }
    dated.sort_by(|(da, ga), (db, gb)| db.cmp(da).then(gb.game_id.cmp(&ga.game_id)));
    Ok(dated.into_iter().map(|(_, g)| g).collect())
}

/// Every meeting of two clubs, oldest first. Undated meetings are kept and
/// follow the dated ones in table order.
fn meetings_oldest_first(
    games: &Table<Game>,
    club_a: ClubId,
    club_b: ClubId,
) -> Result<Vec<&Game>, String> {
    let mut dated = Vec::new();
    let mut undated = Vec::new();
    for game in games.rows() {
        if !game.is_between(club_a, club_b) {
            continue;
        }
        match game.date.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(raw) => dated.push((parse_date(raw)?, game)),
            None => undated.push(game),
        }
    }
    dated.sort_by(|(da, ga), (db, gb)| da.cmp(db).then(ga.game_id.cmp(&gb.game_id)));
    let mut out: Vec<&Game> = dated.into_iter().map(|(_, g)| g).collect();
    out.extend(undated);
    Ok(out)
}

fn internal<T>(msg: String) -> StatOutcome<T> {
    StatOutcome::InternalError(msg)
}

/// Last `num_games` results of a club, oldest first.
pub fn recent_form(ctx: &DataContext, club_id: ClubId, num_games: usize) -> StatOutcome<RecentForm> {
    try_stat!(ctx.games.require(GAME_SCORE_COLUMNS));
    try_stat!(ctx.club_games.require(&["is_win"]));

    let games = match games_newest_first(&ctx.games, |g| g.involves(club_id)) {
        Ok(games) => games,
        Err(msg) => return internal(msg),
    };
    if games.is_empty() || num_games == 0 {
        return StatOutcome::NoData("No recent games found".to_string());
    }

    let mut codes: Vec<FormCode> = games
        .iter()
        .take(num_games)
        .map(|game| {
            let row = ctx
                .club_games
                .rows()
                .iter()
                .find(|cg| cg.game_id == game.game_id && cg.club_id == club_id);
            match row {
                None => FormCode::Unknown,
                Some(cg) if cg.is_win == Some(1) => FormCode::Win,
                Some(_) => match (game.home_club_goals, game.away_club_goals) {
                    (Some(h), Some(a)) if h == a => FormCode::Draw,
                    _ => FormCode::Loss,
                },
            }
        })
        .collect();
    codes.reverse();

    let games_found = codes.len();
    StatOutcome::Value(RecentForm {
        form: codes.iter().map(|c| c.as_char()).collect(),
        games_found,
        games_requested: num_games,
        partial: games_found < num_games,
    })
}

/// Every meeting between two clubs, tallied per side.
pub fn head_to_head(ctx: &DataContext, club_a: ClubId, club_b: ClubId) -> StatOutcome<HeadToHead> {
    try_stat!(ctx.games.require(GAME_SCORE_COLUMNS));

    let games = match meetings_oldest_first(&ctx.games, club_a, club_b) {
        Ok(games) => games,
        Err(msg) => return internal(msg),
    };
    if games.is_empty() {
        return StatOutcome::NoData("No head-to-head games found".to_string());
    }

    let mut wins_a = 0u32;
    let mut wins_b = 0u32;
    let mut draws = 0u32;
    for game in &games {
        let (Some(home), Some(away), Some(hg), Some(ag)) = (
            game.home_club_id,
            game.away_club_id,
            game.home_club_goals,
            game.away_club_goals,
        ) else {
            continue;
        };
        let winner = if hg > ag {
            home
        } else if ag > hg {
            away
        } else {
            draws += 1;
            continue;
        };
        if winner == club_a {
            wins_a += 1;
        } else {
            wins_b += 1;
        }
    }

    let (Some(name_a), Some(name_b)) = (ctx.club_name(club_a), ctx.club_name(club_b)) else {
        return internal(format!(
            "club ids {club_a}/{club_b} not both present in clubs table"
        ));
    };
    let first_game_date = games
        .iter()
        .filter_map(|g| g.date.as_deref())
        .map(str::trim)
        .find(|d| !d.is_empty())
        .map(str::to_string);

    let mut wins_by_name = BTreeMap::new();
    wins_by_name.insert(format!("{name_a}_wins"), wins_a);
    let key_b = if name_a == name_b {
        format!("{name_b} ({club_b})_wins")
    } else {
        format!("{name_b}_wins")
    };
    wins_by_name.insert(key_b, wins_b);

    StatOutcome::Value(HeadToHead {
        total_games: games.len(),
        first_game_date,
        draws,
        sides: [
            SideRecord {
                club_id: club_a,
                name: name_a.to_string(),
                wins: wins_a,
            },
            SideRecord {
                club_id: club_b,
                name: name_b.to_string(),
                wins: wins_b,
            },
        ],
        wins_by_name,
    })
}

/// Mean goals per meeting above `avg_goals`.
pub fn is_high_scoring(
    ctx: &DataContext,
    club_a: ClubId,
    club_b: ClubId,
    avg_goals: f64,
) -> StatOutcome<bool> {
    try_stat!(ctx.games.require(&[
        "home_club_id",
        "away_club_id",
        "home_club_goals",
        "away_club_goals",
    ]));

    let meetings: Vec<&Game> = ctx
        .games
        .rows()
        .iter()
        .filter(|g| g.is_between(club_a, club_b))
        .collect();
    if meetings.is_empty() {
        return StatOutcome::NoData("No head-to-head games found".to_string());
    }

    let total_goals: i64 = meetings
        .iter()
        .map(|g| g.home_club_goals.unwrap_or(0) + g.away_club_goals.unwrap_or(0))
        .sum();
    let avg = total_goals as f64 / meetings.len() as f64;
    StatOutcome::Value(avg > avg_goals)
}

/// Most valuable player currently attached to a club.
pub fn key_player(ctx: &DataContext, club_id: ClubId) -> StatOutcome<KeyPlayer> {
    try_stat!(ctx.players.require(&["current_club_id", "name", "position"]));
    try_stat!(ctx.valuations.require(&["date", "market_value_in_eur"]));

    let squad: Vec<_> = ctx
        .players
        .rows()
        .iter()
        .filter(|p| p.current_club_id == Some(club_id))
        .collect();
    if squad.is_empty() {
        return StatOutcome::NoData(format!("No players found for club ID {club_id}"));
    }

    let wanted: HashSet<PlayerId> = squad.iter().map(|p| p.player_id).collect();
    let mut latest: HashMap<PlayerId, (NaiveDate, &str, Option<f64>)> = HashMap::new();
    for row in ctx.valuations.rows() {
        if !wanted.contains(&row.player_id) {
            continue;
        }
        let Some(raw) = row.date.as_deref().filter(|d| !d.trim().is_empty()) else {
            continue;
        };
        let date = match parse_date(raw) {
            Ok(d) => d,
            Err(msg) => return internal(msg),
        };
        let newer = latest
            .get(&row.player_id)
            .is_none_or(|(seen, _, _)| date > *seen);
        if newer {
            latest.insert(row.player_id, (date, raw, row.market_value_in_eur));
        }
    }

    let embedded_known = ctx.players.has_column("market_value_in_eur");
    let mut best: Option<KeyPlayer> = None;
    for player in squad {
        let from_valuation = latest.get(&player.player_id);
        let (value, valuation_date) = match from_valuation.and_then(|(_, d, v)| v.map(|v| (v, d))) {
            Some((v, d)) => (Some(v), Some(d.to_string())),
            None if embedded_known => (player.market_value_in_eur, None),
            None => (None, None),
        };
        let Some(value) = value.filter(|v| v.is_finite()) else {
            continue;
        };
        if best.as_ref().is_none_or(|b| value > b.market_value) {
            best = Some(KeyPlayer {
                player_id: player.player_id,
                name: player.name.clone().unwrap_or_default(),
                position: player.position.clone().unwrap_or_default(),
                market_value: value,
                valuation_date,
            });
        }
    }

    match best {
        Some(kp) => StatOutcome::Value(kp),
        None => StatOutcome::NoData(format!(
            "No valuation data found for players of club ID {club_id}"
        )),
    }
}

/// Share of the last `num_games` matches in which the opponent did not score.
pub fn clean_sheet_rate(
    ctx: &DataContext,
    club_id: ClubId,
    num_games: usize,
) -> StatOutcome<CleanSheet> {
    try_stat!(ctx.games.require(GAME_SCORE_COLUMNS));

    let games = match games_newest_first(&ctx.games, |g| g.involves(club_id)) {
        Ok(games) => games,
        Err(msg) => return internal(msg),
    };
    let recent: Vec<&Game> = games.into_iter().take(num_games).collect();
    if recent.is_empty() {
        return StatOutcome::NoData("No recent games found".to_string());
    }

    let clean_sheets = recent
        .iter()
        .filter(|g| g.goals_conceded_by(club_id) == Some(0))
        .count();
    StatOutcome::Value(CleanSheet {
        games_considered: recent.len(),
        clean_sheets,
        percentage: round2(clean_sheets as f64 / recent.len() as f64 * 100.0),
    })
}

/// Whether recent meetings tend to produce many cards.
pub fn is_high_card(
    ctx: &DataContext,
    club_a: ClubId,
    club_b: ClubId,
    thresholds: &Thresholds,
) -> StatOutcome<bool> {
    try_stat!(ctx.games.require(&["date", "home_club_id", "away_club_id"]));
    try_stat!(ctx.events.require(&["type"]));

    let games = match games_newest_first(&ctx.games, |g| g.is_between(club_a, club_b)) {
        Ok(games) => games,
        Err(msg) => return internal(msg),
    };
    let recent: Vec<&Game> = games.into_iter().take(thresholds.high_card_games).collect();
    if recent.is_empty() {
        return StatOutcome::NoData("No head-to-head games found".to_string());
    }

    let high_card_games = recent
        .iter()
        .filter(|game| {
            let cards = ctx
                .events
                .rows()
                .iter()
                .filter(|e| {
                    e.game_id == game.game_id
                        && e.kind.as_deref() == Some(thresholds.card_event_type.as_str())
                })
                .count();
            cards > thresholds.high_card_min_events
        })
        .count();

    let share = high_card_games as f64 / recent.len() as f64 * 100.0;
    StatOutcome::Value(share > thresholds.high_card_share_pct)
}

#[derive(Debug, Default)]
struct PlayerTotals {
    name: String,
    position: String,
    goals: f64,
    assists: f64,
    minutes: f64,
    expected_goals: f64,
    passes_completed: f64,
    passes_attempted: f64,
}

impl PlayerTotals {
    fn add(&mut self, row: &RosterEntry) {
        self.goals += row.goals.unwrap_or(0.0);
        self.assists += row.assists.unwrap_or(0.0);
        self.minutes += row.minutes.unwrap_or(0.0);
        self.expected_goals += row.expected_goals.unwrap_or(0.0);
        self.passes_completed += row.passes_completed.unwrap_or(0.0);
        self.passes_attempted += row.passes_attempted.unwrap_or(0.0);
    }

    fn combined(&self) -> f64 {
        self.goals + self.assists
    }
}

/// Top goal contributor of a roster team, by its roster spelling.
pub fn league_key_player(roster: &RosterTable, team: &str) -> StatOutcome<LeagueKeyPlayer> {
    try_stat!(roster.require(&RosterEntry::COLUMNS[1..]));

    let rows: Vec<&RosterEntry> = roster.rows().iter().filter(|r| r.team == team).collect();
    if rows.is_empty() {
        return StatOutcome::NoData(format!("No roster rows found for team {team}"));
    }

    let mut order: Vec<PlayerTotals> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut appearances: HashMap<&str, usize> = HashMap::new();
    for row in &rows {
        let Some(player) = row.player.as_deref() else {
            continue;
        };
        let position = row.position.as_deref().unwrap_or("");
        *appearances.entry(player).or_default() += 1;
        let idx = *index.entry((player, position)).or_insert_with(|| {
            order.push(PlayerTotals {
                name: player.to_string(),
                position: position.to_string(),
                ..Default::default()
            });
            order.len() - 1
        });
        order[idx].add(row);
    }

    let mut best: Option<&PlayerTotals> = None;
    for totals in &order {
        if best.is_none_or(|b| totals.combined() > b.combined()) {
            best = Some(totals);
        }
    }
    let Some(best) = best else {
        return StatOutcome::NoData(format!("No named players in roster rows for team {team}"));
    };

    let pass_rate = if best.passes_attempted > 0.0 {
        round2(best.passes_completed / best.passes_attempted * 100.0)
    } else {
        0.0
    };
    StatOutcome::Value(LeagueKeyPlayer {
        name: best.name.clone(),
        position: best.position.clone(),
        goals: best.goals,
        assists: best.assists,
        combined_score: best.combined(),
        minutes_played: best.minutes,
        games_played: appearances.get(best.name.as_str()).copied().unwrap_or(0),
        expected_goals: round2(best.expected_goals),
        passes_completed: best.passes_completed,
        passes_attempted: best.passes_attempted,
        pass_rate,
    })
}
