use chrono::{TimeZone, Utc};

use rostermerge::{
    ClanTag, EntityId, Identifier, MatchCategory, Mergeable, MergeOrchestrator, Player, PassResults,
    Source, SourceRef, TagLayout, Team,
};

fn cup(name: &str, month: u32) -> SourceRef {
    SourceRef::dated(name, Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap())
}

fn rostered(name: &str, team: &Team, source: &SourceRef) -> Player {
    let mut player = Player::named(name, source).unwrap();
    player.teams.add(team.id, source.clone());
    player
}

fn assert_complete(results: &PassResults, players: usize, teams: usize) {
    for (batch, expected) in [(&results.players, players), (&results.teams, teams)] {
        assert_eq!(batch.len(), expected);
        assert_eq!(
            batch.added_count() + batch.unchanged_count() + batch.merge_count(),
            expected
        );
    }
}

#[test]
fn teams_sharing_bracket_id_merge_across_sources() {
    let mut engine = MergeOrchestrator::default();

    let s1 = cup("cup-1", 1);
    let mut alpha1 = Team::named("Alpha", &s1).unwrap();
    alpha1.tags.add(ClanTag::new("A", TagLayout::Prefix), s1.clone());
    alpha1.identifiers.add(Identifier::bracket_team_id("T1"), s1.clone());
    let players1: Vec<Player> = ["p1", "p2", "p3"]
        .iter()
        .map(|n| rostered(n, &alpha1, &s1))
        .collect();
    let first = engine
        .merge_source(Source::with_entities(s1, players1, vec![alpha1.clone()]))
        .unwrap();
    assert_complete(&first, 3, 1);

    let s2 = cup("cup-2", 2);
    let mut alpha2 = Team::named("Alpha", &s2).unwrap();
    alpha2.tags.add(ClanTag::new("A", TagLayout::Prefix), s2.clone());
    alpha2.identifiers.add(Identifier::bracket_team_id("T1"), s2.clone());
    let p4 = rostered("p4", &alpha2, &s2);
    let second = engine
        .merge_source(Source::with_entities(s2, vec![p4.clone()], vec![alpha2.clone()]))
        .unwrap();
    assert_complete(&second, 1, 1);

    let merge = second.teams.merged().next().expect("team merge record");
    assert_eq!(merge.item, alpha2.id);
    assert_eq!(merge.resultant, alpha1.id);
    let reason = merge.reason().unwrap();
    assert!(reason.contains(MatchCategory::BracketTeamId));
    assert!(reason.contains(MatchCategory::Name));

    let with_t1: Vec<&Team> = engine
        .teams()
        .iter()
        .filter(|t| t.identifiers.contains(&Identifier::bracket_team_id("T1")))
        .collect();
    assert_eq!(with_t1.len(), 1);
    assert_eq!(engine.teams().len(), 1);

    let survivor = with_t1[0].id;
    assert_eq!(engine.players().len(), 4);
    assert!(engine.players().iter().all(|p| p.is_on_team(survivor)));
    assert!(engine.players().iter().all(|p| !p.is_on_team(alpha2.id)));
    assert_eq!(engine.player(p4.id).unwrap().current_team(), Some(survivor));
}

#[test]
fn teams_with_one_shared_player_stay_separate() {
    let mut engine = MergeOrchestrator::default();

    let s1 = cup("cup-1", 1);
    let squad1 = Team::named("Squad", &s1).unwrap();
    let players1 = vec![rostered("Jane", &squad1, &s1), rostered("Joe", &squad1, &s1)];
    engine
        .merge_source(Source::with_entities(s1, players1, vec![squad1]))
        .unwrap();

    let s2 = cup("cup-2", 2);
    let squad2 = Team::named("Squad", &s2).unwrap();
    let players2 = vec![rostered("Jane", &squad2, &s2), rostered("Joe2", &squad2, &s2)];
    let results = engine
        .merge_source(Source::with_entities(s2, players2, vec![squad2.clone()]))
        .unwrap();

    assert_eq!(results.teams.merge_count(), 0);
    assert_eq!(results.teams.added_ids(), vec![squad2.id]);
    assert_eq!(engine.teams().len(), 2);

    assert!(engine.merge_known().converged());
    assert_eq!(engine.teams().len(), 2);
}

#[test]
fn teams_with_two_shared_players_merge() {
    let mut engine = MergeOrchestrator::default();

    let s1 = cup("cup-1", 1);
    let squad1 = Team::named("Squad", &s1).unwrap();
    let players1 = vec![rostered("Jane", &squad1, &s1), rostered("Joe", &squad1, &s1)];
    engine
        .merge_source(Source::with_entities(s1, players1, vec![squad1.clone()]))
        .unwrap();

    let s2 = cup("cup-2", 2);
    let squad2 = Team::named("Squad", &s2).unwrap();
    let players2 = vec![rostered("Jane", &squad2, &s2), rostered("Joe", &squad2, &s2)];
    let results = engine
        .merge_source(Source::with_entities(s2, players2, vec![squad2.clone()]))
        .unwrap();

    assert_eq!(results.teams.merge_count(), 1);
    assert_eq!(engine.teams().len(), 1);
    assert_eq!(engine.canonical_id(squad2.id).unwrap(), squad1.id);

    // Same name plus same team now clears the threshold for the players.
    let report = engine.merge_known();
    assert!(report.converged());
    assert_eq!(engine.players().len(), 2);
    assert!(engine.players().iter().all(|p| p.current_team() == Some(squad1.id)));
}

#[test]
fn clan_tag_on_one_side_still_corroborates() {
    let mut engine = MergeOrchestrator::default();

    let s1 = cup("cup-1", 1);
    let mut tagged = Team::named("Squad", &s1).unwrap();
    tagged.tags.add(ClanTag::new("SQ", TagLayout::Prefix), s1.clone());
    let players1 = vec![rostered("SQ Jane", &tagged, &s1), rostered("SQ Joe", &tagged, &s1)];
    engine
        .merge_source(Source::with_entities(s1, players1, vec![tagged]))
        .unwrap();

    let s2 = cup("cup-2", 2);
    let bare = Team::named("Squad", &s2).unwrap();
    let players2 = vec![rostered("Jane", &bare, &s2), rostered("Joe", &bare, &s2)];
    let results = engine
        .merge_source(Source::with_entities(s2, players2, vec![bare]))
        .unwrap();

    assert_eq!(results.teams.merge_count(), 1);
    assert_eq!(engine.teams().len(), 1);
}

#[test]
fn persistent_id_outweighs_name() {
    let mut engine = MergeOrchestrator::default();

    let s1 = cup("cup-1", 1);
    let mut y = Player::named("Bar", &s1).unwrap();
    y.identifiers.add(Identifier::chat_id("P"), s1.clone());
    let z = Player::named("Foo", &s1).unwrap();
    engine
        .merge_source(Source::with_entities(s1, vec![y.clone(), z.clone()], vec![]))
        .unwrap();

    let s2 = cup("cup-2", 2);
    let mut x = Player::named("Foo", &s2).unwrap();
    x.identifiers.add(Identifier::chat_id("P"), s2.clone());
    let results = engine
        .merge_source(Source::with_entities(s2, vec![x], vec![]))
        .unwrap();

    let merge = results.players.merged().next().expect("merge record");
    assert_eq!(merge.resultant, y.id);
    assert!(engine.player(z.id).is_some());
    assert_eq!(engine.players().len(), 2);
}

#[test]
fn merge_preserves_every_source_and_tracks_current_name() {
    let mut engine = MergeOrchestrator::default();

    let early = cup("cup-1", 1);
    let mut old = Player::named("JaneOld", &early).unwrap();
    old.identifiers.add(Identifier::chat_id("77"), early.clone());
    let before_old = old.sources();
    engine
        .merge_source(Source::with_entities(early, vec![old.clone()], vec![]))
        .unwrap();

    let late = cup("cup-2", 6);
    let mut new = Player::named("JaneNew", &late).unwrap();
    new.identifiers.add(Identifier::chat_id("77"), late.clone());
    let before_new = new.sources();
    engine
        .merge_source(Source::with_entities(late, vec![new], vec![]))
        .unwrap();

    let merged = engine.player(old.id).unwrap();
    let after = merged.sources();
    assert!(before_old.is_subset(&after));
    assert!(before_new.is_subset(&after));
    assert_eq!(merged.names.len(), 2);
    assert_eq!(merged.current_name().unwrap().as_str(), "JaneNew");
}

#[test]
fn large_batches_take_the_parallel_path() {
    let mut engine = MergeOrchestrator::default();
    let s1 = cup("cup-1", 1);
    let batch: Vec<Player> = (0..200)
        .map(|i| {
            let mut p = Player::with_id(EntityId::from_u128(i + 1));
            p.names.add(rostermerge::Name::new(format!("player{i}")).unwrap(), s1.clone());
            p.identifiers.add(Identifier::chat_id(format!("{}", i / 2)), s1.clone());
            p
        })
        .collect();
    let results = engine
        .merge_source(Source::with_entities(s1, batch, vec![]))
        .unwrap();
    assert_complete(&results, 200, 0);
    assert_eq!(results.players.added_count(), 200);

    let report = engine.merge_known();
    assert!(report.converged());
    assert_eq!(report.merge_count(), 100);
    assert_eq!(engine.players().len(), 100);
}
