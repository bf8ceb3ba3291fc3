use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, error};

use crate::config::ScoutConfig;
use crate::reconcile::{Reconciliation, reconcile_pair};
use crate::resolve::resolve_club;
use crate::stats::{
    self, CleanSheet, HeadToHead, KeyPlayer, LeagueKeyPlayer, RecentForm, StatOutcome,
};
use crate::tables::{ClubId, DataContext, SharedRoster};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamMatch {
    pub input_name: String,
    pub matched_name: String,
    pub club_id: ClubId,
}

/// One value per side, serialized as a map keyed by each side's raw input
/// name, first side first. The two names are always distinct.
#[derive(Debug, Clone, PartialEq)]
pub struct PerTeam<T> {
    pub team1: (String, T),
    pub team2: (String, T),
}

impl<T> PerTeam<T> {
    fn build(team1: &str, team2: &str, mut f: impl FnMut(&str) -> T) -> Self {
        Self {
            team1: (team1.to_string(), f(team1)),
            team2: (team2.to_string(), f(team2)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        [&self.team1, &self.team2]
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

impl<T: Serialize> Serialize for PerTeam<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(&self.team1.0, &self.team1.1)?;
        map.serialize_entry(&self.team2.0, &self.team2.1)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameStats {
    pub team1: TeamMatch,
    pub team2: TeamMatch,
    pub league_confirmed: bool,
    pub league_names: BTreeMap<String, String>,
    pub recent_form: PerTeam<StatOutcome<RecentForm>>,
    pub head_to_head: StatOutcome<HeadToHead>,
    pub key_players: PerTeam<StatOutcome<KeyPlayer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub league_key_players: Option<PerTeam<StatOutcome<LeagueKeyPlayer>>>,
    pub high_scoring: StatOutcome<bool>,
    pub high_card: StatOutcome<bool>,
    pub clean_sheet: PerTeam<StatOutcome<CleanSheet>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatsResponse {
    Stats(Box<GameStats>),
    Error { error: String },
}

impl StatsResponse {
    pub fn stats(&self) -> Option<&GameStats> {
        match self {
            StatsResponse::Stats(s) => Some(s),
            StatsResponse::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            StatsResponse::Error { error } => Some(error),
            StatsResponse::Stats(_) => None,
        }
    }
}

/// One or both raw names matched no club above the similarity floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    pub unresolved: Vec<String>,
}

impl std::fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.unresolved.as_slice() {
            [one] => write!(
                f,
                "Could not find club ID for {one}. Please check the team name."
            ),
            [a, b] => write!(
                f,
                "Could not find club IDs for both {a} and {b}. Please check the team names."
            ),
            names => write!(f, "Could not find club IDs for {}", names.join(", ")),
        }
    }
}

impl std::error::Error for ResolutionFailure {}

pub fn resolve_pair(
    ctx: &DataContext,
    team1: &str,
    team2: &str,
    floor: u8,
) -> Result<(TeamMatch, TeamMatch), ResolutionFailure> {
    let to_match = |raw: &str| {
        resolve_club(raw, &ctx.clubs, floor).map(|club| TeamMatch {
            input_name: raw.to_string(),
            matched_name: club.name.clone(),
            club_id: club.club_id,
        })
    };
    match (to_match(team1), to_match(team2)) {
        (Some(a), Some(b)) => Ok((a, b)),
        (a, b) => {
            let mut unresolved = Vec::new();
            if a.is_none() {
                unresolved.push(team1.to_string());
            }
            if b.is_none() {
                unresolved.push(team2.to_string());
            }
            Err(ResolutionFailure { unresolved })
        }
    }
}

/// Full statistics bundle for `team1` vs `team2`.
///
/// Identical raw names, or resolution failure on either side, short-circuit
/// to an error response and no aggregator runs. Aggregator-level problems stay inside their slot.
pub fn generate_game_stats(
    ctx: &DataContext,
    roster: &SharedRoster,
    cfg: &ScoutConfig,
    team1: &str,
    team2: &str,
) -> StatsResponse {
    debug!(team1, team2, "generating game stats");
    if team1 == team2 {
        let error =
            format!("Cannot compare {team1} with itself. Please provide two different teams.");
        error!(%error, "identical team names");
        return StatsResponse::Error { error };
    }
    let (m1, m2) = match resolve_pair(ctx, team1, team2, cfg.similarity_floor) {
        Ok(pair) => pair,
        Err(failure) => {
            let error = failure.to_string();
            error!(%error, "club resolution failed");
            return StatsResponse::Error { error };
        }
    };
    debug!(club_id_1 = m1.club_id, club_id_2 = m2.club_id, "clubs resolved");

    let roster = roster.current();
    let reconciliation: Reconciliation =
        reconcile_pair(team1, team2, &roster.table, cfg.similarity_floor);

    let t = &cfg.thresholds;
    let id_of = |raw: &str| if raw == team1 { m1.club_id } else { m2.club_id };

    let league_key_players = reconciliation.confirmed.then(|| {
        PerTeam::build(team1, team2, |raw| match reconciliation.roster_name(raw) {
            Some(team) => stats::league_key_player(&roster.table, team),
            None => StatOutcome::InternalError(format!("no roster team recorded for {raw}")),
        })
    });

    let bundle = GameStats {
        recent_form: PerTeam::build(team1, team2, |raw| {
            stats::recent_form(ctx, id_of(raw), t.form_games)
        }),
        head_to_head: stats::head_to_head(ctx, m1.club_id, m2.club_id),
        key_players: PerTeam::build(team1, team2, |raw| stats::key_player(ctx, id_of(raw))),
        league_key_players,
        high_scoring: stats::is_high_scoring(
            ctx,
            m1.club_id,
            m2.club_id,
            t.high_scoring_avg_goals,
        ),
        high_card: stats::is_high_card(ctx, m1.club_id, m2.club_id, t),
        clean_sheet: PerTeam::build(team1, team2, |raw| {
            stats::clean_sheet_rate(ctx, id_of(raw), t.clean_sheet_games)
        }),
        league_confirmed: reconciliation.confirmed,
        league_names: reconciliation.matches,
        team1: m1,
        team2: m2,
    };
    StatsResponse::Stats(Box::new(bundle))
}
