//! Meeple - a two-player networked tile-placement game engine
//!
//! This crate provides the authoritative game logic for Meeple, including:
//! - Tile geometry, rotations, and the immutable tile catalog
//! - The sparse board of placed tile instances
//! - Placement legality checking and frontier search
//! - Cross-tile feature connectivity (union-find over the feature graph)
//! - Scoring rules, winner sets, and live projections
//! - The match state machine: joins, turns, draws, and snapshots
//!
//! # Architecture
//!
//! The engine is designed to be platform-agnostic. It can be compiled to:
//! - Native Rust for server-side match hosting
//! - WebAssembly for client-side single-player or local play
//!
//! All state is plain values: the host owns a [`Match`], every operation is
//! a short synchronous call, and anything derived from the board is
//! recomputed on demand rather than cached across turns.

pub mod actions;
pub mod analysis;
pub mod board;
pub mod bot;
pub mod catalog;
pub mod game;
pub mod placement;
pub mod player;
pub mod scoring;
pub mod tile;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{MatchEvent, TurnIntent, TurnRequest};
pub use analysis::{analyze, BoardAnalysis, FeatureGroup, GroupKey};
pub use board::{
    Board, BoardEntry, GridPos, InstanceId, Meeple, PlacedTile, BOARD_HALF_SPAN,
};
pub use bot::{Bot, BotDifficulty};
pub use catalog::{CatalogError, CatalogSpec, TileCatalog};
pub use game::{Match, MatchError, MatchPhase, MatchRules, MatchSnapshot};
pub use placement::{can_place, has_any_placement, legal_placements, PlacementError};
pub use player::{opponent, Player, PlayerSlot, MEEPLES_PER_PLAYER};
pub use scoring::{
    completed_value, end_value, project, score_city, score_cloister, score_field, score_road,
    winners, GroupProjection,
};
pub use tile::{Edge, FeatureKind, LocalFeature, Port, Rotation, Terrain, TileEdges, TileType};
