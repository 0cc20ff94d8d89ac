//! Scoring rules: pure functions over feature groups.
//!
//! Nothing here mutates match state. The match state machine decides *when*
//! to award (live sweep after each commit, fields only at match end); this
//! module only answers *how much* and *to whom*.

use crate::analysis::{BoardAnalysis, FeatureGroup, GroupKey};
use crate::player::PlayerSlot;
use crate::tile::FeatureKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A road is worth its tile span, complete or not.
pub fn score_road(group: &FeatureGroup) -> u32 {
    group.tile_count()
}

/// A city is worth tiles + pennants, doubled once complete.
pub fn score_city(group: &FeatureGroup, completed: bool) -> u32 {
    let base = group.tile_count() + group.pennants;
    if completed {
        2 * base
    } else {
        base
    }
}

/// A cloister is worth 9 complete, otherwise 1 plus its occupied neighbors.
pub fn score_cloister(group: &FeatureGroup, completed: bool) -> u32 {
    if completed {
        9
    } else {
        1 + group.adjacent_tiles
    }
}

/// A field is worth 3 per adjacent completed city.
pub fn score_field(group: &FeatureGroup) -> u32 {
    3 * group.adj_completed_cities.len() as u32
}

/// Value awarded when the group is scored as complete during live play.
pub fn completed_value(group: &FeatureGroup) -> u32 {
    match group.kind {
        FeatureKind::Road => score_road(group),
        FeatureKind::City => score_city(group, true),
        FeatureKind::Cloister => score_cloister(group, true),
        FeatureKind::Field => score_field(group),
    }
}

/// Value the group settles for if the match ended right now: cities at
/// their current completion, roads at their span (identical either way),
/// cloisters and fields as incomplete.
pub fn end_value(group: &FeatureGroup) -> u32 {
    match group.kind {
        FeatureKind::Road => score_road(group),
        FeatureKind::City => score_city(group, group.complete),
        FeatureKind::Cloister => score_cloister(group, false),
        FeatureKind::Field => score_field(group),
    }
}

/// Players holding the maximum meeple count on the group, provided it is
/// positive. Ties produce multiple winners; every winner receives full
/// points, nothing is split.
pub fn winners(group: &FeatureGroup) -> Vec<PlayerSlot> {
    let max = group.meeples.values().copied().max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }
    group
        .meeples
        .iter()
        .filter(|(_, &count)| count == max)
        .map(|(&slot, _)| slot)
        .collect()
}

/// Non-authoritative per-group summary for score panels and move hints.
/// Carries both "value if the game ended now" and "value if this feature
/// were completed right now" without touching committed score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupProjection {
    pub key: GroupKey,
    pub kind: FeatureKind,
    pub tiles: u32,
    pub meeples: BTreeMap<PlayerSlot, u32>,
    pub complete: bool,
    pub end_value: u32,
    pub completed_value: u32,
    pub winners: Vec<PlayerSlot>,
}

/// Project every group not yet scored.
pub fn project(analysis: &BoardAnalysis, scored: &BTreeSet<GroupKey>) -> Vec<GroupProjection> {
    analysis
        .groups
        .iter()
        .filter(|g| !scored.contains(&g.key))
        .map(|g| GroupProjection {
            key: g.key.clone(),
            kind: g.kind,
            tiles: g.tile_count(),
            meeples: g.meeples.clone(),
            complete: g.complete,
            end_value: end_value(g),
            completed_value: completed_value(g),
            winners: winners(g),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn group(kind: FeatureKind, tiles: u32, pennants: u32) -> FeatureGroup {
        FeatureGroup {
            key: format!("{}|test", kind),
            kind,
            nodes: Vec::new(),
            tiles: (1..=tiles).collect(),
            meeples: BTreeMap::new(),
            pennants,
            complete: false,
            open_ports: 0,
            adjacent_tiles: 0,
            adj_completed_cities: BTreeSet::new(),
        }
    }

    #[test]
    fn city_scoring_doubles_on_completion() {
        // A 2-tile city with 1 pennant: 6 complete, 3 as a live projection.
        let mut city = group(FeatureKind::City, 2, 1);
        assert_eq!(score_city(&city, true), 6);
        assert_eq!(score_city(&city, false), 3);
        assert_eq!(end_value(&city), 3);
        city.complete = true;
        assert_eq!(end_value(&city), 6);
    }

    #[test]
    fn road_value_is_identical_open_or_complete() {
        let road = group(FeatureKind::Road, 3, 0);
        assert_eq!(score_road(&road), 3);
        assert_eq!(completed_value(&road), 3);
        assert_eq!(end_value(&road), 3);
    }

    #[test]
    fn cloister_values() {
        let mut cloister = group(FeatureKind::Cloister, 1, 0);
        cloister.adjacent_tiles = 4;
        assert_eq!(score_cloister(&cloister, false), 5);
        assert_eq!(score_cloister(&cloister, true), 9);
        assert_eq!(end_value(&cloister), 5);
        assert_eq!(completed_value(&cloister), 9);
    }

    #[test]
    fn field_counts_completed_cities() {
        let mut field = group(FeatureKind::Field, 5, 0);
        assert_eq!(score_field(&field), 0);
        field.adj_completed_cities.insert("city|a".to_string());
        field.adj_completed_cities.insert("city|b".to_string());
        assert_eq!(score_field(&field), 6);
        assert_eq!(end_value(&field), 6);
    }

    #[test]
    fn tied_meeple_counts_make_both_players_winners() {
        let mut g = group(FeatureKind::City, 2, 0);
        g.meeples.insert(1, 2);
        g.meeples.insert(2, 2);
        assert_eq!(winners(&g), vec![1, 2]);
    }

    #[test]
    fn majority_meeple_count_wins_alone() {
        let mut g = group(FeatureKind::Road, 4, 0);
        g.meeples.insert(1, 1);
        g.meeples.insert(2, 2);
        assert_eq!(winners(&g), vec![2]);
    }

    #[test]
    fn empty_group_has_no_winners() {
        let g = group(FeatureKind::Road, 4, 0);
        assert!(winners(&g).is_empty());
        let mut zeroed = group(FeatureKind::Road, 4, 0);
        zeroed.meeples.insert(1, 0);
        assert!(winners(&zeroed).is_empty());
    }
}
