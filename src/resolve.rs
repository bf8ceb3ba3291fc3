use tracing::{debug, warn};

use crate::normalize::normalize_club_name;
use crate::similarity::partial_ratio;
use crate::tables::{Club, ClubId, Table};

pub const DEFAULT_SIMILARITY_FLOOR: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scored<T> {
    pub item: T,
    pub score: u8,
    pub kind: MatchKind,
}

/// Linear scan for the candidate whose normalized name best matches
/// `normalized_input`.
///
/// The first exact normalized match returns immediately with score 100.
/// Otherwise the highest partial score wins and the earliest candidate keeps
/// a tie. Candidates scoring 0 are never picked.
pub fn best_candidate<T, I>(normalized_input: &str, candidates: I) -> Option<Scored<T>>
where
    I: IntoIterator<Item = (T, String)>,
{
    let mut best: Option<Scored<T>> = None;
    for (item, normalized) in candidates {
        if normalized == normalized_input {
            return Some(Scored {
                item,
                score: 100,
                kind: MatchKind::Exact,
            });
        }
        let score = partial_ratio(normalized_input, &normalized);
        if score > best.as_ref().map(|b| b.score).unwrap_or(0) {
            best = Some(Scored {
                item,
                score,
                kind: MatchKind::Fuzzy,
            });
        }
    }
    best
}

/// Maps a free-text club name onto a row of `clubs`.
///
/// Exact normalized matches always win; a fuzzy match is accepted only when
/// its score is strictly above `floor`.
pub fn resolve_club<'a>(raw_name: &str, clubs: &'a Table<Club>, floor: u8) -> Option<&'a Club> {
    let normalized = normalize_club_name(raw_name);
    let candidates = clubs
        .rows()
        .iter()
        .map(|club| (club, normalize_club_name(&club.name)));

    match best_candidate(&normalized, candidates) {
        Some(found) if found.kind == MatchKind::Exact => {
            debug!(input = raw_name, matched = %found.item.name, "exact club match");
            Some(found.item)
        }
        Some(found) if found.score > floor => {
            debug!(
                input = raw_name,
                matched = %found.item.name,
                score = found.score,
                "fuzzy club match"
            );
            Some(found.item)
        }
        best => {
            warn!(
                input = raw_name,
                best_score = best.map(|b| b.score).unwrap_or(0),
                "no suitable club match"
            );
            None
        }
    }
}

pub fn resolve_club_id(raw_name: &str, clubs: &Table<Club>, floor: u8) -> Option<ClubId> {
    resolve_club(raw_name, clubs, floor).map(|c| c.club_id)
}
