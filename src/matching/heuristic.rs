//! Shared-player corroboration for teams.
//!
//! A bare team-name or clan-tag match is weak evidence: tags are short and
//! names are reused. Two teams that only share a name are merged when at least
//! two distinct pairs of their rostered players have matching names, where
//! names are compared with and without each team's clan tags applied.

use std::collections::{HashMap, HashSet};

use crate::attribute::ClanTag;
use crate::entity::{EntityId, Player, Team};
use crate::matching::normalize::{fold, normalize_name};

/// Number of shared rostered players required to corroborate a team match.
pub const REQUIRED_SHARED_PLAYERS: usize = 2;

/// Index from team id to the players that reference it.
///
/// A player is on a team if any of its sourced team references equals the
/// team's id.
#[derive(Debug, Default)]
pub struct PlayerRoster<'a> {
    by_team: HashMap<EntityId, Vec<&'a Player>>,
}

impl<'a> PlayerRoster<'a> {
    /// Indexes `players` by every team they reference.
    pub fn build(players: impl IntoIterator<Item = &'a Player>) -> Self {
        let mut by_team: HashMap<EntityId, Vec<&'a Player>> = HashMap::new();
        for player in players {
            let teams: HashSet<EntityId> = player.teams.values().copied().collect();
            for team in teams {
                by_team.entry(team).or_default().push(player);
            }
        }
        Self { by_team }
    }

    /// Players on `team`.
    #[must_use]
    pub fn members(&self, team: EntityId) -> &[&'a Player] {
        self.by_team.get(&team).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of indexed teams.
    #[must_use]
    pub fn team_count(&self) -> usize {
        self.by_team.len()
    }
}

/// Every normalized form a player's names can take on a team with `tags`.
fn name_variants(player: &Player, tags: &[&ClanTag]) -> HashSet<String> {
    let mut variants = HashSet::new();
    for name in player.names.values() {
        let folded = fold(name.as_str());
        variants.insert(normalize_name(&folded));
        for tag in tags {
            if let Some(stripped) = tag.strip(&folded) {
                variants.insert(normalize_name(&stripped));
            }
            if let Some(applied) = tag.apply(&folded) {
                variants.insert(normalize_name(&applied));
            }
        }
    }
    variants.remove("");
    variants
}

/// Counts distinct player pairs with matching names across two teams.
///
/// Pairs form a maximum matching over the name-overlap graph, so each player
/// is used in at most one pair and the count does not depend on roster
/// order. Counting stops at `limit`.
#[must_use]
pub fn shared_player_count(a: &Team, b: &Team, roster: &PlayerRoster<'_>, limit: usize) -> usize {
    let a_tags: Vec<&ClanTag> = a.tags.values().collect();
    let b_tags: Vec<&ClanTag> = b.tags.values().collect();

    let b_members: Vec<HashSet<String>> = roster
        .members(b.id)
        .iter()
        .map(|p| name_variants(p, &b_tags))
        .collect();
    let edges: Vec<Vec<usize>> = roster
        .members(a.id)
        .iter()
        .map(|p| {
            let variants = name_variants(p, &a_tags);
            b_members
                .iter()
                .enumerate()
                .filter(|(_, other)| !variants.is_disjoint(other))
                .map(|(idx, _)| idx)
                .collect()
        })
        .collect();

    let mut partner: Vec<Option<usize>> = vec![None; b_members.len()];
    let mut count = 0;
    for left in 0..edges.len() {
        if count >= limit {
            break;
        }
        let mut visited = vec![false; b_members.len()];
        if augment(left, &edges, &mut partner, &mut visited) {
            count += 1;
        }
    }
    count
}

/// Kuhn's augmenting path step: tries to pair `left`, re-pairing earlier
/// players if that frees a partner.
fn augment(left: usize, edges: &[Vec<usize>], partner: &mut [Option<usize>], visited: &mut [bool]) -> bool {
    for &right in &edges[left] {
        if visited[right] {
            continue;
        }
        visited[right] = true;
        let free = match partner[right] {
            None => true,
            Some(other) => augment(other, edges, partner, visited),
        };
        if free {
            partner[right] = Some(left);
            return true;
        }
    }
    false
}

/// Returns true if the two teams share enough rostered players to merge.
#[must_use]
pub fn shares_players(a: &Team, b: &Team, roster: &PlayerRoster<'_>) -> bool {
    shared_player_count(a, b, roster, REQUIRED_SHARED_PLAYERS) >= REQUIRED_SHARED_PLAYERS
}
