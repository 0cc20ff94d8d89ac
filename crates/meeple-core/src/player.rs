//! Player slot records.
//!
//! A match has at most two slots, numbered 1 and 2. Disconnection is a flag
//! on the record, never a removal: the slot, score, and meeple supply
//! survive for reconnection by name.

use serde::{Deserialize, Serialize};

/// Player slot number (1 or 2).
pub type PlayerSlot = u8;

/// Meeples each player starts with and can never exceed.
pub const MEEPLES_PER_PLAYER: u32 = 7;

/// The other slot in a two-player match.
pub fn opponent(slot: PlayerSlot) -> PlayerSlot {
    if slot == 1 {
        2
    } else {
        1
    }
}

/// One player's slot in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub slot: PlayerSlot,
    pub name: String,
    pub connected: bool,
    /// Meeples still in supply.
    pub meeples: u32,
    /// Cumulative committed score.
    pub score: u32,
}

impl Player {
    pub fn new(slot: PlayerSlot, name: impl Into<String>) -> Self {
        Self {
            slot,
            name: name.into(),
            connected: true,
            meeples: MEEPLES_PER_PLAYER,
            score: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_player_has_full_supply() {
        let p = Player::new(1, "Ada");
        assert_eq!(p.meeples, MEEPLES_PER_PLAYER);
        assert_eq!(p.score, 0);
        assert!(p.connected);
    }

    #[test]
    fn opponent_swaps_slots() {
        assert_eq!(opponent(1), 2);
        assert_eq!(opponent(2), 1);
    }
}
