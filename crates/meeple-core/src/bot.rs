//! Automated move selection.
//!
//! Bots pick turns from the same `legal_placements` candidates the preview
//! UI uses:
//! - Easy: a uniform random legal placement, sometimes with a random legal
//!   meeple
//! - Greedy: one-ply lookahead — simulate each candidate commit on a cloned
//!   match and take the best immediate score swing
//!
//! Matches are plain values, so the greedy bot simulates by cloning and
//! calling `submit_turn` for real, meeple rule and scoring sweep included.

use crate::actions::TurnRequest;
use crate::catalog::TileCatalog;
use crate::game::{Match, MatchPhase};
use crate::placement::legal_placements;
use crate::player::{opponent, PlayerSlot};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Bot skill level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    Greedy,
}

/// A bot player bound to one slot.
pub struct Bot {
    pub slot: PlayerSlot,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(slot: PlayerSlot, difficulty: BotDifficulty) -> Self {
        Self {
            slot,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(slot: PlayerSlot, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            slot,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Choose a turn for the current draw, or `None` when it is not this
    /// bot's turn or nothing is legal.
    pub fn choose_turn(&mut self, game: &Match, catalog: &TileCatalog) -> Option<TurnRequest> {
        if game.phase() != MatchPhase::Active || game.turn_player() != self.slot {
            return None;
        }
        let tile = game.current_tile()?.to_string();
        let spots = legal_placements(game.board(), catalog, &tile);
        if spots.is_empty() {
            return None;
        }
        match self.difficulty {
            BotDifficulty::Easy => self.choose_easy(game, catalog, &tile, &spots),
            BotDifficulty::Greedy => self.choose_greedy(game, catalog, &tile, &spots),
        }
    }

    /// Random placement; half the time, try to claim a random feature.
    fn choose_easy(
        &mut self,
        game: &Match,
        catalog: &TileCatalog,
        tile: &str,
        spots: &[(crate::board::GridPos, crate::tile::Rotation)],
    ) -> Option<TurnRequest> {
        let &(pos, rotation) = spots.choose(&mut self.rng)?;
        let base = TurnRequest {
            pos,
            rotation,
            meeple: None,
        };
        if !self.rng.gen_bool(0.5) {
            return Some(base);
        }

        let mut features: Vec<String> = catalog
            .tile(tile)
            .map(|t| t.features.iter().map(|f| f.id.clone()).collect())
            .unwrap_or_default();
        features.shuffle(&mut self.rng);
        for feature in features {
            let request = base.clone().with_meeple(feature);
            if Self::simulate(game, catalog, self.slot, &request).is_some() {
                return Some(request);
            }
        }
        Some(base)
    }

    /// Try every placement, bare and with each claimable feature, and keep
    /// the one with the best immediate score swing.
    fn choose_greedy(
        &mut self,
        game: &Match,
        catalog: &TileCatalog,
        tile: &str,
        spots: &[(crate::board::GridPos, crate::tile::Rotation)],
    ) -> Option<TurnRequest> {
        let own_before = game.player(self.slot).map_or(0, |p| p.score);
        let opp = opponent(self.slot);
        let opp_before = game.player(opp).map_or(0, |p| p.score);
        let supply = game.player(self.slot).map_or(0, |p| p.meeples);

        let feature_ids: Vec<Option<String>> = std::iter::once(None)
            .chain(
                catalog
                    .tile(tile)
                    .into_iter()
                    .flat_map(|t| t.features.iter().map(|f| Some(f.id.clone()))),
            )
            .collect();

        let mut best: Option<(i64, TurnRequest)> = None;
        for &(pos, rotation) in spots {
            for feature in &feature_ids {
                let request = TurnRequest {
                    pos,
                    rotation,
                    meeple: feature.clone(),
                };
                let Some(after) = Self::simulate(game, catalog, self.slot, &request) else {
                    continue;
                };
                let own_gain = i64::from(after.0) - i64::from(own_before);
                let opp_gain = i64::from(after.1) - i64::from(opp_before);
                let mut value = 2 * own_gain - opp_gain;
                // A speculative claim is worth a little while supply lasts.
                if request.meeple.is_some() && own_gain == 0 {
                    value += if supply > 3 { 1 } else { -1 };
                }
                if best.as_ref().map_or(true, |(v, _)| value > *v) {
                    best = Some((value, request));
                }
            }
        }
        best.map(|(_, request)| request)
    }

    /// Commit the request on a clone; `Some((own, opp))` scores on success.
    fn simulate(
        game: &Match,
        catalog: &TileCatalog,
        slot: PlayerSlot,
        request: &TurnRequest,
    ) -> Option<(u32, u32)> {
        let mut clone = game.clone();
        clone.submit_turn(catalog, slot, request).ok()?;
        Some((
            clone.player(slot).map_or(0, |p| p.score),
            clone.player(opponent(slot)).map_or(0, |p| p.score),
        ))
    }
}
