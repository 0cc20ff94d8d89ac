//! The authoritative match state machine.
//!
//! A [`Match`] owns everything a host needs to arbitrate one two-player
//! game: the board, the roster, the shuffled draw queue, the scored-region
//! ledger, and the turn bookkeeping. Every operation either fully commits
//! or fully rejects — validation happens on candidate state before the
//! authoritative board changes, so a rejected turn leaves no trace.
//!
//! The machine moves `Waiting` → `Active` → `Finished`. The catalog is
//! external read-only input and is passed in per call; the match itself
//! stays a plain value, which keeps snapshots trivial.

use crate::actions::{MatchEvent, TurnIntent, TurnRequest};
use crate::analysis::{analyze, GroupKey};
use crate::board::{Board, BoardEntry, GridPos, InstanceId, Meeple, PlacedTile};
use crate::catalog::TileCatalog;
use crate::placement::{can_place, has_any_placement, PlacementError};
use crate::player::{opponent, Player, PlayerSlot, MEEPLES_PER_PLAYER};
use crate::scoring::{completed_value, end_value, project, winners, GroupProjection};
use crate::tile::Rotation;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Lifecycle of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    /// One player present, awaiting the opponent.
    Waiting,
    /// Both slots filled, turns progressing.
    Active,
    /// Supply exhausted, no legal placement remained, or a player resigned.
    /// State is retained for result display.
    Finished,
}

/// Errors an operation against a match can return. The match never mutates
/// state when returning one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MatchError {
    #[error("{0}")]
    IllegalPlacement(#[from] PlacementError),

    #[error("It is not your turn.")]
    NotYourTurn,

    #[error("Match is not active.")]
    NotActive,

    #[error("Both player slots are already taken.")]
    MatchFull,

    #[error("No tile is currently assigned for this turn.")]
    NoTileDrawn,

    #[error("No meeples remaining for this player.")]
    NoMeeplesRemaining,

    #[error("Meeple feature id is invalid for the placed tile.")]
    UnknownFeature,

    #[error("Meeple rule: that connected feature is already occupied.")]
    FeatureOccupied,

    #[error("The draw supply is exhausted.")]
    SupplyExhausted,

    #[error("No such player in this match.")]
    UnknownPlayer,
}

/// Per-match rule knobs, proposed on invites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRules {
    /// One meeple per connected feature. Always enforced in networked play;
    /// the flag exists as the explicit override hook and as a testing aid.
    pub single_meeple_per_feature: bool,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            single_meeple_per_feature: true,
        }
    }
}

/// The authoritative state of one match.
#[derive(Debug, Clone)]
pub struct Match {
    phase: MatchPhase,
    players: Vec<Player>,
    rules: MatchRules,
    board: Board,
    /// Next instance id to assign.
    inst_seq: InstanceId,
    /// Shuffled supply; the back is the next draw.
    draw_queue: Vec<String>,
    /// Reserved upcoming tile per slot, so each player can preview their
    /// own next draw without leaking the opponent's.
    next_tiles: [Option<String>; 2],
    /// Stable keys of regions already awarded.
    scored_keys: BTreeSet<GroupKey>,
    turn_player: PlayerSlot,
    turn_index: u32,
    current_tile: Option<String>,
    /// Tiles discarded this turn because nothing on the frontier took them.
    burned_turn: Vec<String>,
    turn_intent: Option<TurnIntent>,
    last_event: String,
}

impl Match {
    /// Create a match with the host in slot 1: start tile on the origin,
    /// deck shuffled, phase `Waiting`.
    pub fn new(catalog: &TileCatalog, host_name: impl Into<String>, rules: MatchRules) -> Self {
        Self::new_with_rng(catalog, host_name, rules, &mut rand::thread_rng())
    }

    /// Like [`Match::new`] with a caller-provided RNG for deterministic
    /// setup.
    pub fn new_with_rng<R: Rng>(
        catalog: &TileCatalog,
        host_name: impl Into<String>,
        rules: MatchRules,
        rng: &mut R,
    ) -> Self {
        let start_id = catalog.start_tile_id().to_string();
        let mut deck = catalog.deck();
        if let Some(at) = deck.iter().position(|id| *id == start_id) {
            deck.remove(at);
        }
        deck.shuffle(rng);

        let mut board = Board::new();
        board.place(
            GridPos::new(0, 0),
            PlacedTile {
                instance: 1,
                tile: start_id,
                rotation: Rotation::R0,
                meeples: Vec::new(),
            },
        );

        Self {
            phase: MatchPhase::Waiting,
            players: vec![Player::new(1, host_name)],
            rules,
            board,
            inst_seq: 2,
            draw_queue: deck,
            next_tiles: [None, None],
            scored_keys: BTreeSet::new(),
            turn_player: 1,
            turn_index: 0,
            current_tile: None,
            burned_turn: Vec::new(),
            turn_intent: None,
            last_event: "Waiting for an opponent.".to_string(),
        }
    }

    // ==================== Accessors ====================

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == MatchPhase::Finished
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn rules(&self) -> MatchRules {
        self.rules
    }

    /// Replace the rule set. Hosts apply invite-proposed rules here before
    /// the match activates.
    pub fn set_rules(&mut self, rules: MatchRules) {
        self.rules = rules;
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, slot: PlayerSlot) -> Option<&Player> {
        self.players.iter().find(|p| p.slot == slot)
    }

    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn turn_player(&self) -> PlayerSlot {
        self.turn_player
    }

    pub fn turn_index(&self) -> u32 {
        self.turn_index
    }

    pub fn current_tile(&self) -> Option<&str> {
        self.current_tile.as_deref()
    }

    /// The tile reserved as `slot`'s next draw, if one is set aside.
    pub fn reserved_tile(&self, slot: PlayerSlot) -> Option<&str> {
        self.next_tiles
            .get(slot as usize - 1)
            .and_then(|t| t.as_deref())
    }

    pub fn burned_turn(&self) -> &[String] {
        &self.burned_turn
    }

    pub fn turn_intent(&self) -> Option<&TurnIntent> {
        self.turn_intent.as_ref()
    }

    pub fn last_event(&self) -> &str {
        &self.last_event
    }

    pub fn scored_keys(&self) -> &BTreeSet<GroupKey> {
        &self.scored_keys
    }

    /// Undrawn supply per tile id.
    pub fn supply_counts(&self) -> BTreeMap<String, u32> {
        let mut counts = BTreeMap::new();
        for id in &self.draw_queue {
            *counts.entry(id.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn supply_total(&self) -> u32 {
        self.draw_queue.len() as u32
    }

    /// Non-authoritative score panel data for every unscored group.
    pub fn projections(&self, catalog: &TileCatalog) -> Vec<GroupProjection> {
        project(&analyze(&self.board, catalog), &self.scored_keys)
    }

    fn player_mut(&mut self, slot: PlayerSlot) -> &mut Player {
        self.players
            .iter_mut()
            .find(|p| p.slot == slot)
            .expect("player slot exists")
    }

    // ==================== Joining ====================

    /// Join or rejoin by name. A known name reconnects and keeps its slot,
    /// score, and meeples; an unknown name fills slot 2 and activates the
    /// match.
    pub fn join(
        &mut self,
        catalog: &TileCatalog,
        name: &str,
    ) -> Result<(PlayerSlot, Vec<MatchEvent>), MatchError> {
        self.join_with_rng(catalog, name, &mut rand::thread_rng())
    }

    /// Like [`Match::join`] with a caller-provided RNG for the first-player
    /// draw.
    pub fn join_with_rng<R: Rng>(
        &mut self,
        catalog: &TileCatalog,
        name: &str,
        rng: &mut R,
    ) -> Result<(PlayerSlot, Vec<MatchEvent>), MatchError> {
        if let Some(player) = self.players.iter_mut().find(|p| p.name == name) {
            player.connected = true;
            let slot = player.slot;
            self.last_event = format!("{} reconnected.", name);
            return Ok((
                slot,
                vec![MatchEvent::PlayerReconnected {
                    slot,
                    name: name.to_string(),
                }],
            ));
        }

        if self.players.len() >= 2 {
            return Err(MatchError::MatchFull);
        }

        self.players.push(Player::new(2, name));
        let mut events = vec![MatchEvent::PlayerJoined {
            slot: 2,
            name: name.to_string(),
        }];

        self.phase = MatchPhase::Active;
        self.turn_player = rng.gen_range(1..=2);
        self.turn_index = 1;
        events.push(MatchEvent::MatchStarted {
            first_player: self.turn_player,
        });
        self.last_event = format!(
            "Match started: {} vs {}.",
            self.players[0].name, self.players[1].name
        );

        self.ensure_next_tiles();
        self.draw_placeable(catalog, &mut events);
        Ok((2, events))
    }

    // ==================== Drawing ====================

    fn draw_from_queue(&mut self) -> Option<String> {
        self.draw_queue.pop()
    }

    /// Keep a next tile set aside for every player who is not on turn.
    fn ensure_next_tiles(&mut self) {
        if self.phase != MatchPhase::Active {
            return;
        }
        for slot in [1u8, 2u8] {
            if slot == self.turn_player {
                continue;
            }
            let idx = slot as usize - 1;
            if self.next_tiles[idx].is_none() {
                self.next_tiles[idx] = self.draw_from_queue();
            }
        }
    }

    /// Draw until the turn player holds a placeable tile, burning tiles
    /// that fit nowhere. An empty supply finalizes the match.
    fn draw_placeable(&mut self, catalog: &TileCatalog, events: &mut Vec<MatchEvent>) {
        self.burned_turn.clear();
        loop {
            let idx = self.turn_player as usize - 1;
            let tile = match self.next_tiles[idx].take() {
                Some(tile) => Some(tile),
                None => self.draw_from_queue(),
            };
            let Some(tile) = tile else {
                self.current_tile = None;
                self.finalize(catalog, events);
                return;
            };

            if has_any_placement(&self.board, catalog, &tile) {
                self.current_tile = Some(tile.clone());
                self.turn_intent = None;
                self.ensure_next_tiles();
                events.push(MatchEvent::TurnAdvanced {
                    player: self.turn_player,
                    tile,
                });
                return;
            }

            self.last_event = format!("Tile {} had no legal placement and was burned.", tile);
            self.burned_turn.push(tile.clone());
            events.push(MatchEvent::TileBurned { tile });
        }
    }

    // ==================== Turn submission ====================

    /// Commit one turn: place the current tile, optionally claim a feature,
    /// sweep completed regions, advance the turn, and draw the next tile.
    pub fn submit_turn(
        &mut self,
        catalog: &TileCatalog,
        player: PlayerSlot,
        request: &TurnRequest,
    ) -> Result<Vec<MatchEvent>, MatchError> {
        if self.phase != MatchPhase::Active {
            return Err(MatchError::NotActive);
        }
        if player != self.turn_player {
            return Err(MatchError::NotYourTurn);
        }
        let tile_id = self.current_tile.clone().ok_or(MatchError::NoTileDrawn)?;

        can_place(&self.board, catalog, &tile_id, request.rotation, request.pos)?;

        let instance = self.inst_seq;
        let mut placed = PlacedTile {
            instance,
            tile: tile_id.clone(),
            rotation: request.rotation,
            meeples: Vec::new(),
        };

        if let Some(feature_id) = &request.meeple {
            if self.player(player).map_or(0, |p| p.meeples) == 0 {
                return Err(MatchError::NoMeeplesRemaining);
            }
            let tile_type = catalog
                .tile(&tile_id)
                .expect("current tile type is present in the catalog");
            if tile_type.feature(feature_id).is_none() {
                return Err(MatchError::UnknownFeature);
            }
            if self.rules.single_meeple_per_feature {
                // Occupancy is checked on a candidate board so a rejection
                // leaves the authoritative board untouched.
                let mut candidate = self.board.clone();
                candidate.place(request.pos, placed.clone());
                let analysis = analyze(&candidate, catalog);
                let group = analysis
                    .group_of(instance, feature_id)
                    .ok_or(MatchError::UnknownFeature)?;
                if group.total_meeples() > 0 {
                    return Err(MatchError::FeatureOccupied);
                }
            }
            placed.meeples.push(Meeple {
                player,
                feature: feature_id.clone(),
            });
        }

        // Commit.
        let mut events = Vec::new();
        self.board.place(request.pos, placed);
        self.inst_seq += 1;
        events.push(MatchEvent::TilePlaced {
            player,
            tile: tile_id.clone(),
            pos: request.pos,
            rotation: request.rotation,
        });
        if let Some(feature_id) = &request.meeple {
            self.player_mut(player).meeples -= 1;
            events.push(MatchEvent::MeeplePlaced {
                player,
                feature: feature_id.clone(),
            });
        }

        self.recompute_and_score(catalog, &mut events);

        let name = self.player(player).map_or_else(String::new, |p| p.name.clone());
        let meeple_note = match &request.meeple {
            Some(f) => format!(" + meeple {}.", f),
            None => ".".to_string(),
        };
        self.last_event = format!(
            "{} placed {} at ({},{}) r{}{}",
            name,
            tile_id,
            request.pos.x,
            request.pos.y,
            request.rotation.degrees(),
            meeple_note
        );

        self.turn_intent = None;
        self.current_tile = None;
        self.turn_player = opponent(player);
        self.turn_index += 1;
        self.draw_placeable(catalog, &mut events);

        Ok(events)
    }

    /// Award every newly completed non-field region whose key is unscored,
    /// then return the meeples of just-scored regions to their owners.
    /// Fields are skipped here; they settle only when the match ends.
    fn recompute_and_score(&mut self, catalog: &TileCatalog, events: &mut Vec<MatchEvent>) {
        let analysis = analyze(&self.board, catalog);
        let mut scored_now: BTreeSet<GroupKey> = BTreeSet::new();

        for group in &analysis.groups {
            if group.kind == crate::tile::FeatureKind::Field || !group.complete {
                continue;
            }
            if self.scored_keys.contains(&group.key) {
                continue;
            }
            let group_winners = winners(group);
            if group_winners.is_empty() {
                // Still marked so the region is never re-evaluated.
                self.scored_keys.insert(group.key.clone());
                continue;
            }
            let points = completed_value(group);
            for &slot in &group_winners {
                self.player_mut(slot).score += points;
            }
            self.scored_keys.insert(group.key.clone());
            scored_now.insert(group.key.clone());
            events.push(MatchEvent::GroupScored {
                key: group.key.clone(),
                kind: group.kind,
                points,
                winners: group_winners,
            });
        }

        if scored_now.is_empty() {
            return;
        }
        let mut returned: BTreeMap<PlayerSlot, u32> = BTreeMap::new();
        for (_pos, placed) in self.board.iter_mut() {
            let instance = placed.instance;
            placed.meeples.retain(|meeple| {
                let scored = analysis
                    .group_of(instance, &meeple.feature)
                    .is_some_and(|g| scored_now.contains(&g.key));
                if scored {
                    *returned.entry(meeple.player).or_insert(0) += 1;
                }
                !scored
            });
        }
        for (slot, count) in returned {
            let player = self.player_mut(slot);
            player.meeples = (player.meeples + count).min(MEEPLES_PER_PLAYER);
        }
    }

    /// Settle the end of the match: every group with winners scores its
    /// end value, except complete non-field regions already awarded live.
    fn finalize(&mut self, catalog: &TileCatalog, events: &mut Vec<MatchEvent>) {
        if self.phase != MatchPhase::Active {
            return;
        }

        let analysis = analyze(&self.board, catalog);
        for group in &analysis.groups {
            let group_winners = winners(group);
            if group_winners.is_empty() {
                continue;
            }
            if group.kind != crate::tile::FeatureKind::Field
                && group.complete
                && self.scored_keys.contains(&group.key)
            {
                continue;
            }
            let points = end_value(group);
            if points == 0 {
                continue;
            }
            for &slot in &group_winners {
                self.player_mut(slot).score += points;
            }
            events.push(MatchEvent::GroupScored {
                key: group.key.clone(),
                kind: group.kind,
                points,
                winners: group_winners,
            });
        }

        self.phase = MatchPhase::Finished;
        self.current_tile = None;
        self.burned_turn.clear();
        self.turn_intent = None;
        self.next_tiles = [None, None];

        let p1 = self.player(1).map_or(0, |p| p.score);
        let p2 = self.player(2).map_or(0, |p| p.score);
        let n1 = self.player(1).map_or_else(|| "P1".to_string(), |p| p.name.clone());
        let n2 = self.player(2).map_or_else(|| "P2".to_string(), |p| p.name.clone());
        let winner = if p1 > p2 {
            self.last_event = format!("Match finished: {} won {}-{}.", n1, p1, p2);
            Some(1)
        } else if p2 > p1 {
            self.last_event = format!("Match finished: {} won {}-{}.", n2, p2, p1);
            Some(2)
        } else {
            self.last_event = format!("Match finished: draw {}-{}.", p1, p2);
            None
        };
        events.push(MatchEvent::MatchFinished { winner });
    }

    /// Concede. The match finishes immediately; fields are not settled.
    pub fn resign(&mut self, player: PlayerSlot) -> Result<Vec<MatchEvent>, MatchError> {
        if self.phase != MatchPhase::Active {
            return Err(MatchError::NotActive);
        }
        let name = self
            .player(player)
            .ok_or(MatchError::UnknownPlayer)?
            .name
            .clone();

        self.phase = MatchPhase::Finished;
        self.current_tile = None;
        self.burned_turn.clear();
        self.turn_intent = None;
        self.next_tiles = [None, None];
        self.last_event = format!("Match ended early: {} resigned.", name);
        Ok(vec![
            MatchEvent::PlayerResigned { slot: player },
            MatchEvent::MatchFinished {
                winner: Some(opponent(player)),
            },
        ])
    }

    // ==================== Turn intent ====================

    /// Publish the acting player's in-progress move. Advisory only: the
    /// preview is overwritten in place and discarded on any turn change. A
    /// locked intent must be placement-valid; an unlocked one may preview
    /// an illegal spot and is marked with `valid: false`.
    pub fn publish_intent(
        &mut self,
        catalog: &TileCatalog,
        player: PlayerSlot,
        pos: GridPos,
        rotation: Rotation,
        meeple: Option<String>,
        locked: bool,
    ) -> Result<(), MatchError> {
        if self.phase != MatchPhase::Active {
            return Err(MatchError::NotActive);
        }
        if player != self.turn_player {
            return Err(MatchError::NotYourTurn);
        }
        let tile_id = self.current_tile.clone().ok_or(MatchError::NoTileDrawn)?;

        if self.board.contains(pos) {
            return Err(MatchError::IllegalPlacement(PlacementError::CellOccupied));
        }
        let placement = can_place(&self.board, catalog, &tile_id, rotation, pos);
        if locked {
            placement.clone()?;
        }
        if let Some(feature_id) = &meeple {
            let tile_type = catalog
                .tile(&tile_id)
                .expect("current tile type is present in the catalog");
            if tile_type.feature(feature_id).is_none() {
                return Err(MatchError::UnknownFeature);
            }
        }

        self.turn_intent = Some(TurnIntent {
            player,
            tile: tile_id,
            pos,
            rotation,
            meeple,
            locked,
            valid: placement.is_ok(),
        });
        Ok(())
    }

    /// Drop the player's own intent, if it is theirs to drop.
    pub fn clear_intent(&mut self, player: PlayerSlot) {
        if self
            .turn_intent
            .as_ref()
            .is_some_and(|intent| intent.player == player)
        {
            self.turn_intent = None;
        }
    }

    // ==================== Connection flags ====================

    /// Flip a slot's connected flag. Disconnection never forfeits; it only
    /// drops the player's advisory intent.
    pub fn set_connected(&mut self, slot: PlayerSlot, connected: bool) {
        if let Some(player) = self.players.iter_mut().find(|p| p.slot == slot) {
            player.connected = connected;
        }
        if !connected {
            self.clear_intent(slot);
        }
    }

    // ==================== Snapshots ====================

    /// The serializable form of the match. Turn intents are advisory and
    /// are not persisted.
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            phase: self.phase,
            players: self.players.clone(),
            rules: self.rules,
            board: self.board.entries(),
            inst_seq: self.inst_seq,
            draw_queue: self.draw_queue.clone(),
            next_tiles: self.next_tiles.clone(),
            scored_keys: self.scored_keys.iter().cloned().collect(),
            turn_player: self.turn_player,
            turn_index: self.turn_index,
            current_tile: self.current_tile.clone(),
            burned_turn: self.burned_turn.clone(),
            last_event: self.last_event.clone(),
        }
    }

    /// Rebuild a match from its snapshot. Analysis and scoring over the
    /// restored state reproduce the live results exactly.
    pub fn from_snapshot(snapshot: MatchSnapshot) -> Self {
        Self {
            phase: snapshot.phase,
            players: snapshot.players,
            rules: snapshot.rules,
            board: Board::from_entries(snapshot.board),
            inst_seq: snapshot.inst_seq,
            draw_queue: snapshot.draw_queue,
            next_tiles: snapshot.next_tiles,
            scored_keys: snapshot.scored_keys.into_iter().collect(),
            turn_player: snapshot.turn_player,
            turn_index: snapshot.turn_index,
            current_tile: snapshot.current_tile,
            burned_turn: snapshot.burned_turn,
            turn_intent: None,
            last_event: snapshot.last_event,
        }
    }
}

/// Serialized match state: everything needed to reconstruct the engine's
/// view of the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub phase: MatchPhase,
    pub players: Vec<Player>,
    pub rules: MatchRules,
    pub board: Vec<BoardEntry>,
    pub inst_seq: InstanceId,
    pub draw_queue: Vec<String>,
    pub next_tiles: [Option<String>; 2],
    pub scored_keys: Vec<GroupKey>,
    pub turn_player: PlayerSlot,
    pub turn_index: u32,
    pub current_tile: Option<String>,
    pub burned_turn: Vec<String>,
    pub last_event: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::MEEPLES_PER_PLAYER;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// A catalog restricted to a few base tile types, for scripted decks.
    fn catalog_of(counts: &[(&str, u32)]) -> TileCatalog {
        let base = TileCatalog::base_game();
        let tiles = counts
            .iter()
            .map(|(id, _)| base.tile(id).unwrap().clone())
            .collect();
        let counts = counts.iter().map(|(id, c)| (id.to_string(), *c)).collect();
        TileCatalog::new(tiles, counts).unwrap()
    }

    fn active_match(catalog: &TileCatalog, seed: u64) -> Match {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut m = Match::new_with_rng(catalog, "Ada", MatchRules::default(), &mut rng);
        m.join_with_rng(catalog, "Bea", &mut rng).unwrap();
        m
    }

    #[test]
    fn match_waits_for_an_opponent() {
        let catalog = catalog_of(&[("D", 1), ("A", 2)]);
        let mut rng = StdRng::seed_from_u64(1);
        let m = Match::new_with_rng(&catalog, "Ada", MatchRules::default(), &mut rng);
        assert_eq!(m.phase(), MatchPhase::Waiting);
        assert!(m.current_tile().is_none());
        assert_eq!(m.board().len(), 1);
        assert_eq!(m.supply_total(), 2);
    }

    #[test]
    fn second_join_activates_and_draws() {
        let catalog = catalog_of(&[("D", 1), ("A", 2)]);
        let m = active_match(&catalog, 1);
        assert_eq!(m.phase(), MatchPhase::Active);
        assert_eq!(m.current_tile(), Some("A"));
        assert_eq!(m.turn_index(), 1);
        // The off-turn player has a tile reserved for their next turn.
        assert_eq!(m.reserved_tile(opponent(m.turn_player())), Some("A"));
        assert_eq!(m.reserved_tile(m.turn_player()), None);
    }

    #[test]
    fn reconnect_preserves_slot_score_and_meeples() {
        let catalog = catalog_of(&[("D", 1), ("A", 2)]);
        let mut m = active_match(&catalog, 1);
        m.set_connected(1, false);
        let (slot, _) = m.join(&catalog, "Ada").unwrap();
        assert_eq!(slot, 1);
        let (again, _) = m.join(&catalog, "Ada").unwrap();
        assert_eq!(again, 1);
        assert_eq!(m.players().len(), 2);
        let ada = m.player(1).unwrap();
        assert!(ada.connected);
        assert_eq!(ada.meeples, MEEPLES_PER_PLAYER);
    }

    #[test]
    fn third_player_is_rejected() {
        let catalog = catalog_of(&[("D", 1), ("A", 2)]);
        let mut m = active_match(&catalog, 1);
        assert_eq!(m.join(&catalog, "Cai").unwrap_err(), MatchError::MatchFull);
    }

    #[test]
    fn submit_requires_active_phase_and_turn() {
        let catalog = catalog_of(&[("D", 1), ("A", 2)]);
        let mut rng = StdRng::seed_from_u64(1);
        let mut waiting = Match::new_with_rng(&catalog, "Ada", MatchRules::default(), &mut rng);
        let request = TurnRequest::place(-1, 0, Rotation::R270);
        assert_eq!(
            waiting.submit_turn(&catalog, 1, &request).unwrap_err(),
            MatchError::NotActive
        );

        let mut m = active_match(&catalog, 1);
        let idle = opponent(m.turn_player());
        assert_eq!(
            m.submit_turn(&catalog, idle, &request).unwrap_err(),
            MatchError::NotYourTurn
        );
    }

    #[test]
    fn rejected_placement_mutates_nothing() {
        let catalog = catalog_of(&[("D", 1), ("A", 2)]);
        let mut m = active_match(&catalog, 1);
        let acting = m.turn_player();
        let before = m.snapshot();
        let err = m
            .submit_turn(&catalog, acting, &TurnRequest::place(5, 5, Rotation::R0))
            .unwrap_err();
        assert!(matches!(err, MatchError::IllegalPlacement(_)));
        assert_eq!(m.snapshot(), before);
    }

    #[test]
    fn completed_road_scores_its_claimant_once() {
        // Deck of two dead-end road tiles closing the start tile's road.
        let catalog = catalog_of(&[("D", 1), ("A", 2)]);
        let mut m = active_match(&catalog, 7);
        let first = m.turn_player();
        let second = opponent(first);

        // First player caps the west end and claims the road.
        let events = m
            .submit_turn(
                &catalog,
                first,
                &TurnRequest::place(-1, 0, Rotation::R270).with_meeple("r1"),
            )
            .unwrap();
        assert!(!events
            .iter()
            .any(|e| matches!(e, MatchEvent::GroupScored { .. })));
        assert_eq!(m.player(first).unwrap().score, 0);
        assert_eq!(m.player(first).unwrap().meeples, MEEPLES_PER_PLAYER - 1);

        // Second player caps the east end; the road completes at 3 tiles.
        let events = m
            .submit_turn(&catalog, second, &TurnRequest::place(1, 0, Rotation::R90))
            .unwrap();
        let scored: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                MatchEvent::GroupScored { points, winners, .. } => Some((*points, winners.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(scored, vec![(3, vec![first])]);
        assert_eq!(m.player(first).unwrap().score, 3);
        assert_eq!(m.player(second).unwrap().score, 0);
        // The meeple came back when the road settled.
        assert_eq!(m.player(first).unwrap().meeples, MEEPLES_PER_PLAYER);

        // Supply is gone, so the match finished right after.
        assert_eq!(m.phase(), MatchPhase::Finished);
        assert!(events
            .iter()
            .any(|e| matches!(e, MatchEvent::MatchFinished { winner: Some(w) } if *w == first)));
        assert_eq!(m.scored_keys().len(), 1);
    }

    #[test]
    fn meeple_rule_rejects_an_occupied_region() {
        let catalog = catalog_of(&[("D", 1), ("U", 2)]);
        let mut m = active_match(&catalog, 3);
        let first = m.turn_player();
        let second = opponent(first);

        m.submit_turn(
            &catalog,
            first,
            &TurnRequest::place(1, 0, Rotation::R90).with_meeple("r1"),
        )
        .unwrap();

        // The same connected road is already claimed.
        let err = m
            .submit_turn(
                &catalog,
                second,
                &TurnRequest::place(-1, 0, Rotation::R90).with_meeple("r1"),
            )
            .unwrap_err();
        assert_eq!(err, MatchError::FeatureOccupied);
        // Rejection left the turn untouched.
        assert_eq!(m.turn_player(), second);
        assert_eq!(m.current_tile(), Some("U"));
        assert_eq!(m.board().len(), 2);

        // Without the meeple the placement commits, the supply runs dry,
        // and the still-open road settles at its span for the claimant.
        m.submit_turn(&catalog, second, &TurnRequest::place(-1, 0, Rotation::R90))
            .unwrap();
        assert_eq!(m.phase(), MatchPhase::Finished);
        assert_eq!(m.player(first).unwrap().score, 3);
        assert_eq!(m.player(second).unwrap().score, 0);
    }

    #[test]
    fn meeple_rule_override_allows_sharing() {
        let catalog = catalog_of(&[("D", 1), ("U", 2)]);
        let mut rng = StdRng::seed_from_u64(3);
        let rules = MatchRules {
            single_meeple_per_feature: false,
        };
        let mut m = Match::new_with_rng(&catalog, "Ada", rules, &mut rng);
        m.join_with_rng(&catalog, "Bea", &mut rng).unwrap();
        let first = m.turn_player();
        let second = opponent(first);

        m.submit_turn(
            &catalog,
            first,
            &TurnRequest::place(1, 0, Rotation::R90).with_meeple("r1"),
        )
        .unwrap();
        m.submit_turn(
            &catalog,
            second,
            &TurnRequest::place(-1, 0, Rotation::R90).with_meeple("r1"),
        )
        .unwrap();
        // Both claimed the shared road; the tie pays both in full.
        assert_eq!(m.phase(), MatchPhase::Finished);
        assert_eq!(m.player(first).unwrap().score, 3);
        assert_eq!(m.player(second).unwrap().score, 3);
    }

    #[test]
    fn no_meeples_remaining_is_rejected() {
        let catalog = catalog_of(&[("D", 1), ("U", 2)]);
        let mut m = active_match(&catalog, 3);
        let acting = m.turn_player();
        let mut snapshot = m.snapshot();
        for p in &mut snapshot.players {
            p.meeples = 0;
        }
        let mut broke = Match::from_snapshot(snapshot);
        let err = broke
            .submit_turn(
                &catalog,
                acting,
                &TurnRequest::place(1, 0, Rotation::R90).with_meeple("r1"),
            )
            .unwrap_err();
        assert_eq!(err, MatchError::NoMeeplesRemaining);
    }

    #[test]
    fn unplaceable_draw_is_burned_and_supply_exhaustion_finishes() {
        let catalog = catalog_of(&[("D", 1), ("U", 2), ("C", 1)]);
        // Handcrafted position: a lone straight road, with an all-city tile
        // waiting in the queue that can never attach to it.
        let snapshot = MatchSnapshot {
            phase: MatchPhase::Active,
            players: vec![Player::new(1, "Ada"), Player::new(2, "Bea")],
            rules: MatchRules::default(),
            board: vec![BoardEntry {
                x: 0,
                y: 0,
                placed: PlacedTile {
                    instance: 1,
                    tile: "U".to_string(),
                    rotation: Rotation::R0,
                    meeples: Vec::new(),
                },
            }],
            inst_seq: 2,
            draw_queue: vec!["C".to_string()],
            next_tiles: [None, None],
            scored_keys: Vec::new(),
            turn_player: 1,
            turn_index: 1,
            current_tile: Some("U".to_string()),
            burned_turn: Vec::new(),
            last_event: String::new(),
        };
        let mut m = Match::from_snapshot(snapshot);

        let events = m
            .submit_turn(&catalog, 1, &TurnRequest::place(0, 1, Rotation::R0))
            .unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, MatchEvent::TileBurned { tile } if tile == "C")));
        assert!(events
            .iter()
            .any(|e| matches!(e, MatchEvent::MatchFinished { winner: None })));
        assert_eq!(m.phase(), MatchPhase::Finished);
    }

    #[test]
    fn intent_lifecycle() {
        let catalog = catalog_of(&[("D", 1), ("C", 2)]);
        let mut m = active_match(&catalog, 5);
        let acting = m.turn_player();
        let idle = opponent(acting);

        assert_eq!(
            m.publish_intent(&catalog, idle, GridPos::new(0, -1), Rotation::R0, None, false)
                .unwrap_err(),
            MatchError::NotYourTurn
        );

        // An unlocked preview may hover over an illegal spot.
        m.publish_intent(&catalog, acting, GridPos::new(1, 0), Rotation::R0, None, false)
            .unwrap();
        assert!(!m.turn_intent().unwrap().valid);

        // A locked intent must be placement-valid.
        assert!(matches!(
            m.publish_intent(&catalog, acting, GridPos::new(1, 0), Rotation::R0, None, true)
                .unwrap_err(),
            MatchError::IllegalPlacement(_)
        ));

        // Occupied cells are refused outright, even unlocked.
        assert_eq!(
            m.publish_intent(&catalog, acting, GridPos::new(0, 0), Rotation::R0, None, false)
                .unwrap_err(),
            MatchError::IllegalPlacement(PlacementError::CellOccupied)
        );

        // A bogus meeple feature is refused.
        assert_eq!(
            m.publish_intent(
                &catalog,
                acting,
                GridPos::new(0, -1),
                Rotation::R0,
                Some("zz".to_string()),
                false
            )
            .unwrap_err(),
            MatchError::UnknownFeature
        );

        m.publish_intent(
            &catalog,
            acting,
            GridPos::new(0, -1),
            Rotation::R0,
            Some("c1".to_string()),
            true,
        )
        .unwrap();
        let intent = m.turn_intent().unwrap().clone();
        assert!(intent.valid && intent.locked);
        assert_eq!(intent.player, acting);

        // Only the owner clears it.
        m.clear_intent(idle);
        assert!(m.turn_intent().is_some());
        m.clear_intent(acting);
        assert!(m.turn_intent().is_none());

        // A committed turn discards whatever intent is left.
        m.publish_intent(&catalog, acting, GridPos::new(0, -1), Rotation::R0, None, false)
            .unwrap();
        m.submit_turn(&catalog, acting, &TurnRequest::place(0, -1, Rotation::R0))
            .unwrap();
        assert!(m.turn_intent().is_none());
    }

    #[test]
    fn disconnect_drops_own_intent_but_not_the_match() {
        let catalog = catalog_of(&[("D", 1), ("C", 2)]);
        let mut m = active_match(&catalog, 5);
        let acting = m.turn_player();
        m.publish_intent(&catalog, acting, GridPos::new(0, -1), Rotation::R0, None, false)
            .unwrap();
        m.set_connected(acting, false);
        assert!(m.turn_intent().is_none());
        assert_eq!(m.phase(), MatchPhase::Active);
        assert!(!m.player(acting).unwrap().connected);
    }

    #[test]
    fn resign_finishes_for_the_opponent() {
        let catalog = catalog_of(&[("D", 1), ("A", 2)]);
        let mut m = active_match(&catalog, 1);
        let events = m.resign(1).unwrap();
        assert_eq!(m.phase(), MatchPhase::Finished);
        assert!(events
            .iter()
            .any(|e| matches!(e, MatchEvent::MatchFinished { winner: Some(2) })));
        assert_eq!(
            m.resign(2).unwrap_err(),
            MatchError::NotActive
        );
    }

    #[test]
    fn snapshot_round_trips_and_reproduces_analysis() {
        let catalog = catalog_of(&[("D", 1), ("U", 4)]);
        let mut m = active_match(&catalog, 11);
        let acting = m.turn_player();
        m.submit_turn(
            &catalog,
            acting,
            &TurnRequest::place(1, 0, Rotation::R90).with_meeple("r1"),
        )
        .unwrap();

        let json = serde_json::to_string(&m.snapshot()).unwrap();
        let restored = Match::from_snapshot(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.snapshot(), m.snapshot());
        assert_eq!(restored.projections(&catalog), m.projections(&catalog));
        assert_eq!(restored.supply_counts(), m.supply_counts());
        assert_eq!(restored.turn_player(), m.turn_player());
    }
}
