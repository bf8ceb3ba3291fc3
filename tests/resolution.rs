use fixture_scout::normalize::normalize_club_name;
use fixture_scout::reconcile::{distinct_teams, reconcile_pair};
use fixture_scout::resolve::{DEFAULT_SIMILARITY_FLOOR, resolve_club, resolve_club_id};
use fixture_scout::similarity::partial_ratio;
use fixture_scout::tables::{Club, RosterEntry, RosterTable, Table};

const FLOOR: u8 = DEFAULT_SIMILARITY_FLOOR;

fn clubs() -> Table<Club> {
    let names = [
        (418, "Real Madrid Club de Fútbol"),
        (131, "Futbol Club Barcelona"),
        (13, "Club Atlético de Madrid S.A.D."),
        (11, "Arsenal Football Club"),
        (985, "Manchester United Football Club"),
        (281, "Manchester City Football Club"),
        (31, "Liverpool Football Club"),
        (5, "Associazione Calcio Milan"),
    ];
    Table::complete(
        names
            .iter()
            .map(|(id, name)| Club {
                club_id: *id,
                name: name.to_string(),
            })
            .collect(),
    )
}

fn roster(teams: &[&str]) -> RosterTable {
    Table::complete(
        teams
            .iter()
            .map(|team| RosterEntry {
                team: team.to_string(),
                player: Some(format!("{team} Player")),
                ..RosterEntry::default()
            })
            .collect(),
    )
}

#[test]
fn common_spellings_resolve() {
    let table = clubs();
    for (input, id) in [
        ("Real Madrid", 418),
        ("Barcelona", 131),
        ("Arsenal", 11),
        ("Liverpool FC", 31),
        ("Liverpool", 31),
    ] {
        assert_eq!(resolve_club_id(input, &table, FLOOR), Some(id), "{input}");
    }
}

#[test]
fn stop_tokens_collapse_manchester_clubs() {
    // "United" and "City" are stripped, so both sides normalize the same and
    // the first Manchester row in table order wins.
    let table = clubs();
    assert_eq!(normalize_club_name("Manchester United"), "manchester");
    assert_eq!(normalize_club_name("Manchester City"), "manchester");
    assert_eq!(resolve_club_id("Manchester City", &table, FLOOR), Some(985));
}

#[test]
fn resolution_is_deterministic() {
    let table = clubs();
    let first = resolve_club("Atletico Madrid", &table, FLOOR).map(|c| c.club_id);
    for _ in 0..5 {
        assert_eq!(
            resolve_club("Atletico Madrid", &table, FLOOR).map(|c| c.club_id),
            first
        );
    }
}

#[test]
fn accepted_matches_clear_the_floor() {
    let table = clubs();
    for input in ["Real Madrid", "Barca", "Arsenl", "Tottenham", "Milan", "xyz"] {
        if let Some(club) = resolve_club(input, &table, FLOOR) {
            let a = normalize_club_name(input);
            let b = normalize_club_name(&club.name);
            assert!(a == b || partial_ratio(&a, &b) > FLOOR, "{input} -> {}", club.name);
        }
    }
}

#[test]
fn unknown_names_do_not_resolve() {
    let table = clubs();
    assert_eq!(resolve_club_id("Qwxyz Zzzq", &table, FLOOR), None);
    assert_eq!(resolve_club_id("", &table, FLOOR), None);
    assert_eq!(resolve_club_id("FC", &table, FLOOR), None);
}

#[test]
fn reconciliation_needs_both_sides() {
    let roster = roster(&["Real Madrid", "Barcelona", "Atlético Madrid", "Girona"]);
    assert_eq!(
        distinct_teams(&roster),
        vec!["Real Madrid", "Barcelona", "Atlético Madrid", "Girona"]
    );

    let both = reconcile_pair("Real Madrid CF", "FC Barcelona", &roster, FLOOR);
    assert!(both.confirmed);
    assert_eq!(both.roster_name("Real Madrid CF"), Some("Real Madrid"));
    assert_eq!(both.roster_name("FC Barcelona"), Some("Barcelona"));

    let one = reconcile_pair("Real Madrid", "Liverpool", &roster, FLOOR);
    assert!(!one.confirmed);
    assert!(one.matches.is_empty());
}

#[test]
fn empty_roster_never_confirms() {
    let roster = roster(&[]);
    let rec = reconcile_pair("Real Madrid", "Barcelona", &roster, FLOOR);
    assert!(!rec.confirmed);
    assert!(rec.matches.is_empty());
}
