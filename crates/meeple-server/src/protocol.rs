//! WebSocket protocol messages for Meeple multiplayer.
//!
//! Clients drive everything through request/response pairs carrying a
//! bearer token; the host never pushes unsolicited state. `Poll` returns a
//! [`MatchView`] filtered to what that token's player may see.

use meeple_core::{
    BoardEntry, GroupProjection, MatchPhase, MatchRules, PlayerSlot, TurnIntent,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Join the match, or reconnect under a known name.
    Join { name: String },

    /// Refresh session liveness.
    Heartbeat { token: Uuid },

    /// Drop the connection's session; the slot stays reserved for
    /// reconnection by name.
    Leave { token: Uuid },

    /// Invite a named opponent, proposing a rule set.
    Invite {
        token: Uuid,
        to: String,
        rules: MatchRules,
    },

    /// Accept or decline an invite. The invite id is the capability: the
    /// invited party may not have a session yet.
    RespondInvite { invite_id: Uuid, accept: bool },

    /// Read the current match state.
    Poll { token: Uuid },

    /// Commit a turn.
    SubmitTurn {
        token: Uuid,
        x: i32,
        y: i32,
        rot_deg: i32,
        meeple: Option<String>,
    },

    /// Publish a move preview for the opponent.
    PublishIntent {
        token: Uuid,
        x: i32,
        y: i32,
        rot_deg: i32,
        meeple: Option<String>,
        locked: bool,
    },

    /// Withdraw one's own preview.
    ClearIntent { token: Uuid },

    /// Concede the match.
    Resign { token: Uuid },

    /// Ping for keepalive
    Ping,
}

/// Messages sent from host to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Session established; carry this token on every later request.
    Joined {
        token: Uuid,
        slot: PlayerSlot,
        view: MatchView,
    },

    /// Current match state, filtered for the requesting player.
    View { view: MatchView },

    /// Invite created or updated.
    InviteSent { invite: InviteInfo },

    /// Invite accepted, declined, or expired.
    InviteResolved { invite: InviteInfo },

    /// Liveness acknowledged.
    HeartbeatAck,

    /// Session dropped.
    Left,

    /// Request rejected; nothing was mutated.
    Error { message: String },

    /// Pong response
    Pong,
}

/// Lifecycle of an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
    /// Consumed by a successful join.
    Used,
}

/// Invite state for clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteInfo {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub rules: MatchRules,
    pub status: InviteStatus,
}

/// One player as shown to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub slot: PlayerSlot,
    pub name: String,
    pub connected: bool,
    pub score: u32,
    pub meeples: u32,
}

/// The turn in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnView {
    pub player: PlayerSlot,
    pub name: String,
    /// The tile the acting player must place.
    pub tile: String,
    /// Tiles discarded this turn for having no legal placement.
    pub burned: Vec<String>,
    pub turn_index: u32,
}

/// Match state filtered for one player: their own reserved next tile only,
/// the (shared) current draw, and whatever intent is published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchView {
    pub phase: MatchPhase,
    pub you: PlayerSlot,
    pub can_act: bool,
    pub players: Vec<PlayerView>,
    pub board: Vec<BoardEntry>,
    pub current_turn: Option<TurnView>,
    /// This player's reserved upcoming tile; the opponent's is never shown.
    pub your_next_tile: Option<String>,
    pub supply_remaining: u32,
    /// Score-panel projections for every unscored group.
    pub groups: Vec<GroupProjection>,
    /// The published move preview; one's own intent comes back as an echo.
    pub turn_intent: Option<TurnIntent>,
    pub scored_keys: Vec<String>,
    pub last_event: String,
    pub invites_for_you: Vec<InviteInfo>,
    pub invites_from_you: Vec<InviteInfo>,
}
