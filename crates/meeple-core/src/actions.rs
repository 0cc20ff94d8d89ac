//! Turn requests, turn intents, and the events a match emits.
//!
//! A [`TurnRequest`] is the only way a player changes the board; a
//! [`TurnIntent`] is the non-authoritative preview of a move still being
//! decided, overwritten in place and discarded on any turn-state change.
//! Every committed transition emits [`MatchEvent`]s for callers that want a
//! structured account of what happened alongside the match's `last_event`
//! line.

use crate::analysis::GroupKey;
use crate::board::GridPos;
use crate::player::PlayerSlot;
use crate::tile::{FeatureKind, Rotation};
use serde::{Deserialize, Serialize};

/// A move submitted for commit: place the currently drawn tile, optionally
/// dropping one meeple on a named local feature of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub pos: GridPos,
    pub rotation: Rotation,
    /// Local feature id on the placed tile to claim with a meeple.
    pub meeple: Option<String>,
}

impl TurnRequest {
    pub fn place(x: i32, y: i32, rotation: Rotation) -> Self {
        Self {
            pos: GridPos::new(x, y),
            rotation,
            meeple: None,
        }
    }

    pub fn with_meeple(mut self, feature: impl Into<String>) -> Self {
        self.meeple = Some(feature.into());
        self
    }
}

/// The acting player's in-progress move, broadcast to the opponent while
/// they are still deciding. Carries no authority: the board only changes
/// through `submit_turn`, which re-validates everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnIntent {
    pub player: PlayerSlot,
    /// The tile the intent is about (always the current draw).
    pub tile: String,
    pub pos: GridPos,
    pub rotation: Rotation,
    pub meeple: Option<String>,
    /// The player has settled on this move and is about to submit.
    pub locked: bool,
    /// Whether the previewed placement was legal when published.
    pub valid: bool,
}

/// Structured record of one state transition inside a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchEvent {
    /// A slot was filled for the first time.
    PlayerJoined { slot: PlayerSlot, name: String },

    /// A known player re-established their session.
    PlayerReconnected { slot: PlayerSlot, name: String },

    /// Both slots are filled; play begins.
    MatchStarted { first_player: PlayerSlot },

    /// A tile was committed to the board.
    TilePlaced {
        player: PlayerSlot,
        tile: String,
        pos: GridPos,
        rotation: Rotation,
    },

    /// A meeple was committed along with the placement.
    MeeplePlaced {
        player: PlayerSlot,
        feature: String,
    },

    /// A completed group was awarded during the live sweep, or any group
    /// settled at match end.
    GroupScored {
        key: GroupKey,
        kind: FeatureKind,
        points: u32,
        winners: Vec<PlayerSlot>,
    },

    /// A drawn tile had no legal placement anywhere and was discarded.
    TileBurned { tile: String },

    /// The next turn began with this player holding this draw.
    TurnAdvanced { player: PlayerSlot, tile: String },

    /// A player conceded.
    PlayerResigned { slot: PlayerSlot },

    /// The match is over. `winner` is `None` on a draw.
    MatchFinished { winner: Option<PlayerSlot> },
}
