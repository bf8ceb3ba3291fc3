use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::normalize::normalize_club_name;
use crate::resolve::{Scored, best_candidate};
use crate::tables::RosterTable;

/// Outcome of matching a pair of raw names against the league roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub confirmed: bool,
    /// Raw input name to the roster's own spelling. Empty unless confirmed.
    pub matches: BTreeMap<String, String>,
}

impl Reconciliation {
    pub fn roster_name(&self, raw: &str) -> Option<&str> {
        self.matches.get(raw).map(String::as_str)
    }
}

/// Distinct `Team` values in order of first appearance.
pub fn distinct_teams(roster: &RosterTable) -> Vec<&str> {
    let mut seen = HashSet::new();
    roster
        .rows()
        .iter()
        .map(|row| row.team.as_str())
        .filter(|team| seen.insert(*team))
        .collect()
}

/// Best roster team for one raw name, regardless of the floor.
pub fn best_roster_team<'a>(raw_name: &str, teams: &[&'a str]) -> Option<Scored<&'a str>> {
    let normalized = normalize_club_name(raw_name);
    best_candidate(
        &normalized,
        teams.iter().map(|team| (*team, normalize_club_name(team))),
    )
}

/// Confirms a pair only when both names clear `floor` against the roster.
///
/// A single confident side is not enough: the pair either maps as a whole or
/// not at all.
pub fn reconcile_pair(
    name_a: &str,
    name_b: &str,
    roster: &RosterTable,
    floor: u8,
) -> Reconciliation {
    let teams = distinct_teams(roster);
    let best_a = best_roster_team(name_a, &teams);
    let best_b = best_roster_team(name_b, &teams);

    let (Some(a), Some(b)) = (best_a, best_b) else {
        debug!(name_a, name_b, "roster has no candidate for one side");
        return Reconciliation::default();
    };
    if a.score <= floor || b.score <= floor {
        debug!(
            name_a,
            score_a = a.score,
            name_b,
            score_b = b.score,
            "pair not confirmed against league roster"
        );
        return Reconciliation::default();
    }

    info!(
        name_a,
        team_a = a.item,
        name_b,
        team_b = b.item,
        "pair confirmed against league roster"
    );
    let mut matches = BTreeMap::new();
    matches.insert(name_a.to_string(), a.item.to_string());
    matches.insert(name_b.to_string(), b.item.to_string());
    Reconciliation {
        confirmed: true,
        matches,
    }
}
