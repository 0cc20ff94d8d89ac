//! The hosted match: sessions, invites, and token-gated operations.
//!
//! One `MatchRoom` is the whole consistency domain of the host. The server
//! wraps it in a single mutex, so session bookkeeping, invite bookkeeping,
//! and match mutation can never race each other; every operation here is
//! short synchronous CPU work. Operations resolve the bearer token first
//! and mutate nothing when they reject.

use crate::protocol::{InviteInfo, InviteStatus, MatchView, PlayerView, TurnView};
use meeple_core::{
    GridPos, Match, MatchError, MatchPhase, MatchRules, PlayerSlot, Rotation, TileCatalog,
    TurnRequest,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

/// Sessions without a heartbeat for this long may be treated as
/// disconnected. Never a forfeit; the slot survives for reconnection.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(60);

/// Pending invites expire after this long.
pub const INVITE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Invalid or expired session token.")]
    InvalidToken,

    #[error("Joining requires an accepted invite.")]
    InviteRequired,

    #[error("No such invite.")]
    NoSuchInvite,

    #[error("Invite is no longer pending.")]
    InviteAlreadyResolved,

    #[error("Cannot invite yourself.")]
    SelfInvite,

    #[error("Rotation must be one of 0, 90, 180, 270.")]
    BadRotation,

    #[error(transparent)]
    Match(#[from] MatchError),
}

/// One live session: a bearer token bound to a player slot and name.
#[derive(Debug, Clone)]
struct Session {
    name: String,
    slot: PlayerSlot,
    last_seen: Instant,
}

/// One invite, keyed by the invited name. Re-inviting the same name
/// updates the pending record in place instead of duplicating it.
#[derive(Debug, Clone)]
struct Invite {
    id: Uuid,
    from: String,
    to: String,
    rules: MatchRules,
    status: InviteStatus,
    created_at: Instant,
}

impl Invite {
    fn to_info(&self) -> InviteInfo {
        InviteInfo {
            id: self.id,
            from: self.from.clone(),
            to: self.to.clone(),
            rules: self.rules,
            status: self.status,
        }
    }
}

fn sanitize_name(raw: &str) -> String {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return "Player".to_string();
    }
    cleaned.chars().take(28).collect()
}

/// The host-side match plus everything that gates access to it.
pub struct MatchRoom {
    catalog: TileCatalog,
    game: Option<Match>,
    sessions: HashMap<Uuid, Session>,
    invites: Vec<Invite>,
}

impl MatchRoom {
    pub fn new(catalog: TileCatalog) -> Self {
        Self {
            catalog,
            game: None,
            sessions: HashMap::new(),
            invites: Vec::new(),
        }
    }

    /// Resolve a bearer token to its player, refreshing liveness.
    fn auth(&mut self, token: Uuid) -> Result<(PlayerSlot, String), RoomError> {
        let session = self
            .sessions
            .get_mut(&token)
            .ok_or(RoomError::InvalidToken)?;
        session.last_seen = Instant::now();
        Ok((session.slot, session.name.clone()))
    }

    fn game_mut(&mut self) -> &mut Match {
        self.game.as_mut().expect("sessions imply a created match")
    }

    /// Join or reconnect by name. The first join creates the match and
    /// becomes the host; later joins of unknown names need an accepted
    /// invite. A known name always reconnects: the previous token for that
    /// name is invalidated and a fresh one issued, with slot, score, and
    /// meeples preserved.
    pub fn join(&mut self, raw_name: &str) -> Result<(Uuid, PlayerSlot, MatchView), RoomError> {
        let name = sanitize_name(raw_name);

        let known = self
            .game
            .as_ref()
            .is_some_and(|g| g.player_by_name(&name).is_some());

        let slot = if self.game.is_none() {
            self.game = Some(Match::new(&self.catalog, name.clone(), MatchRules::default()));
            1
        } else if known {
            let game = self.game.as_mut().expect("match exists");
            let (slot, _events) = game.join(&self.catalog, &name)?;
            slot
        } else {
            let invite_at = self
                .invites
                .iter()
                .position(|i| i.to == name && i.status == InviteStatus::Accepted)
                .ok_or(RoomError::InviteRequired)?;
            let rules = self.invites[invite_at].rules;
            let game = self.game.as_mut().expect("match exists");
            game.set_rules(rules);
            let (slot, _events) = game.join(&self.catalog, &name)?;
            self.invites[invite_at].status = InviteStatus::Used;
            slot
        };

        // One token per name: reconnecting rotates the credential.
        self.sessions.retain(|_, s| s.name != name);
        let token = Uuid::new_v4();
        self.sessions.insert(
            token,
            Session {
                name,
                slot,
                last_seen: Instant::now(),
            },
        );
        Ok((token, slot, self.build_view(slot)))
    }

    /// Create or update the pending invite for a named opponent.
    pub fn invite(
        &mut self,
        token: Uuid,
        to_raw: &str,
        rules: MatchRules,
    ) -> Result<InviteInfo, RoomError> {
        let (_slot, from) = self.auth(token)?;
        let to = sanitize_name(to_raw);
        if to == from {
            return Err(RoomError::SelfInvite);
        }

        if let Some(existing) = self
            .invites
            .iter_mut()
            .find(|i| i.to == to && i.status == InviteStatus::Pending)
        {
            existing.rules = rules;
            existing.from = from;
            existing.created_at = Instant::now();
            return Ok(existing.to_info());
        }

        let invite = Invite {
            id: Uuid::new_v4(),
            from,
            to,
            rules,
            status: InviteStatus::Pending,
            created_at: Instant::now(),
        };
        let info = invite.to_info();
        self.invites.push(invite);
        Ok(info)
    }

    /// Accept or decline a pending invite. Accepting does not create the
    /// session; the invited party still calls `join`.
    pub fn respond_invite(&mut self, invite_id: Uuid, accept: bool) -> Result<InviteInfo, RoomError> {
        let invite = self
            .invites
            .iter_mut()
            .find(|i| i.id == invite_id)
            .ok_or(RoomError::NoSuchInvite)?;
        if invite.status != InviteStatus::Pending {
            return Err(RoomError::InviteAlreadyResolved);
        }
        invite.status = if accept {
            InviteStatus::Accepted
        } else {
            InviteStatus::Declined
        };
        Ok(invite.to_info())
    }

    pub fn heartbeat(&mut self, token: Uuid) -> Result<(), RoomError> {
        self.auth(token).map(|_| ())
    }

    /// Drop the session. The slot stays reserved under its name.
    pub fn leave(&mut self, token: Uuid) -> Result<(), RoomError> {
        let (slot, _name) = self.auth(token)?;
        self.sessions.remove(&token);
        if let Some(game) = &mut self.game {
            game.set_connected(slot, false);
        }
        Ok(())
    }

    pub fn poll(&mut self, token: Uuid) -> Result<MatchView, RoomError> {
        let (slot, _name) = self.auth(token)?;
        Ok(self.build_view(slot))
    }

    pub fn submit_turn(
        &mut self,
        token: Uuid,
        x: i32,
        y: i32,
        rot_deg: i32,
        meeple: Option<String>,
    ) -> Result<MatchView, RoomError> {
        let (slot, _name) = self.auth(token)?;
        let rotation = Rotation::from_degrees(rot_deg).ok_or(RoomError::BadRotation)?;
        let request = TurnRequest {
            pos: GridPos::new(x, y),
            rotation,
            meeple,
        };
        let game = self.game.as_mut().expect("sessions imply a created match");
        game.submit_turn(&self.catalog, slot, &request)?;
        Ok(self.build_view(slot))
    }

    pub fn publish_intent(
        &mut self,
        token: Uuid,
        x: i32,
        y: i32,
        rot_deg: i32,
        meeple: Option<String>,
        locked: bool,
    ) -> Result<MatchView, RoomError> {
        let (slot, _name) = self.auth(token)?;
        let rotation = Rotation::from_degrees(rot_deg).ok_or(RoomError::BadRotation)?;
        let game = self.game.as_mut().expect("sessions imply a created match");
        game.publish_intent(&self.catalog, slot, GridPos::new(x, y), rotation, meeple, locked)?;
        Ok(self.build_view(slot))
    }

    pub fn clear_intent(&mut self, token: Uuid) -> Result<MatchView, RoomError> {
        let (slot, _name) = self.auth(token)?;
        self.game_mut().clear_intent(slot);
        Ok(self.build_view(slot))
    }

    pub fn resign(&mut self, token: Uuid) -> Result<MatchView, RoomError> {
        let (slot, _name) = self.auth(token)?;
        self.game_mut().resign(slot)?;
        Ok(self.build_view(slot))
    }

    /// Expire silent sessions and stale invites. Expired sessions mark the
    /// slot disconnected and invalidate the token; the match itself is
    /// untouched.
    pub fn sweep(&mut self, now: Instant) {
        let expired: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|(_, s)| now.duration_since(s.last_seen) > SESSION_TIMEOUT)
            .map(|(t, _)| *t)
            .collect();
        for token in expired {
            if let Some(session) = self.sessions.remove(&token) {
                if let Some(game) = &mut self.game {
                    game.set_connected(session.slot, false);
                }
            }
        }

        for invite in &mut self.invites {
            if invite.status == InviteStatus::Pending
                && now.duration_since(invite.created_at) > INVITE_TIMEOUT
            {
                invite.status = InviteStatus::Expired;
            }
        }
    }

    fn build_view(&self, slot: PlayerSlot) -> MatchView {
        let game = self.game.as_ref().expect("views imply a created match");
        let you_name = game
            .player(slot)
            .map_or_else(String::new, |p| p.name.clone());

        let players = game
            .players()
            .iter()
            .map(|p| PlayerView {
                slot: p.slot,
                name: p.name.clone(),
                connected: p.connected,
                score: p.score,
                meeples: p.meeples,
            })
            .collect();

        let current_turn = match (game.phase(), game.current_tile()) {
            (MatchPhase::Active, Some(tile)) => {
                let acting = game.turn_player();
                Some(TurnView {
                    player: acting,
                    name: game
                        .player(acting)
                        .map_or_else(String::new, |p| p.name.clone()),
                    tile: tile.to_string(),
                    burned: game.burned_turn().to_vec(),
                    turn_index: game.turn_index(),
                })
            }
            _ => None,
        };

        MatchView {
            phase: game.phase(),
            you: slot,
            can_act: game.phase() == MatchPhase::Active && game.turn_player() == slot,
            players,
            board: game.board().entries(),
            current_turn,
            your_next_tile: game.reserved_tile(slot).map(str::to_string),
            supply_remaining: game.supply_total(),
            groups: game.projections(&self.catalog),
            turn_intent: game.turn_intent().cloned(),
            scored_keys: game.scored_keys().iter().cloned().collect(),
            last_event: game.last_event().to_string(),
            invites_for_you: self
                .invites
                .iter()
                .filter(|i| i.status == InviteStatus::Pending && i.to == you_name)
                .map(Invite::to_info)
                .collect(),
            invites_from_you: self
                .invites
                .iter()
                .filter(|i| i.status == InviteStatus::Pending && i.from == you_name)
                .map(Invite::to_info)
                .collect(),
        }
    }
}
