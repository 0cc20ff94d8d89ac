//! The board: a sparse grid of placed tile instances.
//!
//! The board is the core data structure shared by the validator, the
//! analyzer, and the match state machine. It stores only what was committed:
//! which tile type sits at which cell, under which rotation, carrying which
//! meeples. Everything derived (connectivity, scores) is recomputed from it.

use crate::player::PlayerSlot;
use crate::tile::{Edge, Rotation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The board is clamped to `|x|, |y| <= BOARD_HALF_SPAN`.
pub const BOARD_HALF_SPAN: i32 = 12;

/// Monotonically increasing id of a placed tile instance.
pub type InstanceId = u32;

/// Integer grid coordinate. North is `y - 1`, south is `y + 1`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell across the given edge.
    pub fn neighbor(self, edge: Edge) -> GridPos {
        let (dx, dy) = edge.delta();
        GridPos::new(self.x + dx, self.y + dy)
    }

    /// The four 4-adjacent cells, in edge-scan order (N, E, S, W).
    pub fn neighbors(self) -> [GridPos; 4] {
        [
            self.neighbor(Edge::N),
            self.neighbor(Edge::E),
            self.neighbor(Edge::S),
            self.neighbor(Edge::W),
        ]
    }

    /// The eight surrounding cells (cloister neighborhood).
    pub fn ring(self) -> [GridPos; 8] {
        [
            GridPos::new(self.x - 1, self.y - 1),
            GridPos::new(self.x, self.y - 1),
            GridPos::new(self.x + 1, self.y - 1),
            GridPos::new(self.x - 1, self.y),
            GridPos::new(self.x + 1, self.y),
            GridPos::new(self.x - 1, self.y + 1),
            GridPos::new(self.x, self.y + 1),
            GridPos::new(self.x + 1, self.y + 1),
        ]
    }

    pub fn in_bounds(self) -> bool {
        self.x.abs() <= BOARD_HALF_SPAN && self.y.abs() <= BOARD_HALF_SPAN
    }
}

/// A meeple standing on one local feature of a placed tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeple {
    pub player: PlayerSlot,
    /// Local feature id within the instance's tile type.
    pub feature: String,
}

/// One committed tile on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedTile {
    pub instance: InstanceId,
    /// Tile type id in the catalog.
    pub tile: String,
    pub rotation: Rotation,
    pub meeples: Vec<Meeple>,
}

/// A board cell in serialized form. Grid-keyed maps do not survive JSON,
/// so snapshots and views carry boards as entry lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardEntry {
    pub x: i32,
    pub y: i32,
    pub placed: PlacedTile,
}

/// Sparse map from grid coordinates to placed tiles.
///
/// Invariants: at most one tile per cell; after the first tile, every
/// placement is 4-adjacent to an existing tile. The placement validator
/// enforces them; the board itself only stores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Board {
    tiles: BTreeMap<GridPos, PlacedTile>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pos: GridPos) -> Option<&PlacedTile> {
        self.tiles.get(&pos)
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        self.tiles.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Put a tile on the board. Legality is the validator's concern; this
    /// only stores the committed instance.
    pub fn place(&mut self, pos: GridPos, placed: PlacedTile) {
        self.tiles.insert(pos, placed);
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridPos, &PlacedTile)> {
        self.tiles.iter().map(|(pos, t)| (*pos, t))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (GridPos, &mut PlacedTile)> {
        self.tiles.iter_mut().map(|(pos, t)| (*pos, t))
    }

    /// Empty in-bounds cells adjacent to at least one occupied cell; the
    /// origin alone when the board is empty. These are the only candidate
    /// cells for the next placement.
    pub fn frontier(&self) -> Vec<GridPos> {
        if self.tiles.is_empty() {
            return vec![GridPos::new(0, 0)];
        }
        let mut out = std::collections::BTreeSet::new();
        for pos in self.tiles.keys() {
            for n in pos.neighbors() {
                if n.in_bounds() && !self.tiles.contains_key(&n) {
                    out.insert(n);
                }
            }
        }
        out.into_iter().collect()
    }

    /// How many of the eight surrounding cells are occupied.
    pub fn occupied_around(&self, pos: GridPos) -> u32 {
        pos.ring()
            .iter()
            .filter(|p| self.tiles.contains_key(p))
            .count() as u32
    }

    /// The board as a serializable entry list, in coordinate order.
    pub fn entries(&self) -> Vec<BoardEntry> {
        self.tiles
            .iter()
            .map(|(pos, placed)| BoardEntry {
                x: pos.x,
                y: pos.y,
                placed: placed.clone(),
            })
            .collect()
    }

    /// Rebuild a board from serialized entries.
    pub fn from_entries(entries: Vec<BoardEntry>) -> Self {
        let mut board = Board::new();
        for entry in entries {
            board.place(GridPos::new(entry.x, entry.y), entry.placed);
        }
        board
    }
}
