//! Tile placement legality.
//!
//! `can_place` is a pure function over the board: it never mutates anything
//! and can be called speculatively for previews. The checks run in a fixed
//! order so callers always get the most specific reason first: bounds, cell
//! occupancy, edge terrain against each occupied neighbor (scanning N, E,
//! S, W), and finally the contiguity rule.

use crate::board::{Board, GridPos};
use crate::catalog::TileCatalog;
use crate::tile::{Edge, Rotation, Terrain};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a candidate placement is illegal.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PlacementError {
    #[error("Out of board bounds.")]
    OutOfBounds,

    #[error("Cell occupied.")]
    CellOccupied,

    #[error("Edge mismatch {edge}: {candidate} vs neighbor {opposite}: {neighbor}")]
    EdgeMismatch {
        edge: Edge,
        candidate: Terrain,
        opposite: Edge,
        neighbor: Terrain,
    },

    #[error("Tile must touch at least one placed tile.")]
    Disconnected,

    #[error("Unknown tile type: {0}")]
    UnknownTile(String),
}

/// Check whether `tile_id` may be placed at `pos` under `rotation`.
pub fn can_place(
    board: &Board,
    catalog: &TileCatalog,
    tile_id: &str,
    rotation: Rotation,
    pos: GridPos,
) -> Result<(), PlacementError> {
    if !pos.in_bounds() {
        return Err(PlacementError::OutOfBounds);
    }
    if board.contains(pos) {
        return Err(PlacementError::CellOccupied);
    }
    let tile = catalog
        .tile(tile_id)
        .ok_or_else(|| PlacementError::UnknownTile(tile_id.to_string()))?;

    let mut touches = false;
    for edge in Edge::ALL {
        let Some(adjacent) = board.get(pos.neighbor(edge)) else {
            continue;
        };
        touches = true;
        let adjacent_tile = catalog
            .tile(&adjacent.tile)
            .ok_or_else(|| PlacementError::UnknownTile(adjacent.tile.clone()))?;
        let opposite = edge.opposite();
        let candidate = tile.edge(edge, rotation);
        let neighbor = adjacent_tile.edge(opposite, adjacent.rotation);
        if candidate != neighbor {
            return Err(PlacementError::EdgeMismatch {
                edge,
                candidate,
                opposite,
                neighbor,
            });
        }
    }

    if !board.is_empty() && !touches {
        return Err(PlacementError::Disconnected);
    }
    Ok(())
}

/// Whether the tile fits anywhere on the frontier under any rotation.
pub fn has_any_placement(board: &Board, catalog: &TileCatalog, tile_id: &str) -> bool {
    board.frontier().into_iter().any(|pos| {
        Rotation::ALL
            .into_iter()
            .any(|rotation| can_place(board, catalog, tile_id, rotation, pos).is_ok())
    })
}

/// Every legal (position, rotation) pair for the tile, in deterministic
/// coordinate order. Candidate source for previews and automated play.
pub fn legal_placements(
    board: &Board,
    catalog: &TileCatalog,
    tile_id: &str,
) -> Vec<(GridPos, Rotation)> {
    let mut out = Vec::new();
    for pos in board.frontier() {
        for rotation in Rotation::ALL {
            if can_place(board, catalog, tile_id, rotation, pos).is_ok() {
                out.push((pos, rotation));
            }
        }
    }
    out
}
