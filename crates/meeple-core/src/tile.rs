//! Tile geometry: edges, half-edge ports, rotations, and tile type records.
//!
//! This module provides the foundational vocabulary for the square tile grid:
//! - `Edge`: the four cardinal edges of a tile
//! - `Port`: where a local feature touches the tile boundary (full edges for
//!   roads and cities, half edges for fields)
//! - `Rotation`: quarter-turn tile rotations applied by cyclic relabeling
//! - `TileType` / `LocalFeature`: the immutable tile definitions a catalog
//!   supplies to the engine
//!
//! Rotation never mutates a tile definition; rotated views are computed on
//! demand so placement checks can run speculatively.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary terrain of a tile edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Road,
    City,
    Field,
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Terrain::Road => "road",
            Terrain::City => "city",
            Terrain::Field => "field",
        };
        write!(f, "{}", s)
    }
}

/// The kind of a local feature. A closed set: the engine matches on it
/// exhaustively in placement, analysis, and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Road,
    City,
    Field,
    Cloister,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeatureKind::Road => "road",
            FeatureKind::City => "city",
            FeatureKind::Field => "field",
            FeatureKind::Cloister => "cloister",
        };
        write!(f, "{}", s)
    }
}

/// Cardinal edge of a tile, in the board's screen-style coordinates
/// (north is `y - 1`, south is `y + 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    N,
    E,
    S,
    W,
}

impl Edge {
    /// All edges in the order placement checks scan neighbors.
    pub const ALL: [Edge; 4] = [Edge::N, Edge::E, Edge::S, Edge::W];

    /// The edge a 4-adjacent neighbor presents back to this one.
    pub fn opposite(self) -> Edge {
        match self {
            Edge::N => Edge::S,
            Edge::E => Edge::W,
            Edge::S => Edge::N,
            Edge::W => Edge::E,
        }
    }

    /// Relabel after a single clockwise quarter turn.
    pub fn rotated_cw(self) -> Edge {
        match self {
            Edge::N => Edge::E,
            Edge::E => Edge::S,
            Edge::S => Edge::W,
            Edge::W => Edge::N,
        }
    }

    /// Grid offset toward the neighbor across this edge.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Edge::N => (0, -1),
            Edge::E => (1, 0),
            Edge::S => (0, 1),
            Edge::W => (-1, 0),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Edge::N => "N",
            Edge::E => "E",
            Edge::S => "S",
            Edge::W => "W",
        };
        write!(f, "{}", s)
    }
}

/// Where a feature touches the tile boundary.
///
/// Roads and cities attach through full edges (`N`/`E`/`S`/`W`); fields
/// attach through half edges, read as (edge, half): `En` is the northern
/// half of the east edge, `Sw` the western half of the south edge, and so
/// on around the tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Port {
    N,
    E,
    S,
    W,
    Nw,
    Ne,
    En,
    Es,
    Se,
    Sw,
    Ws,
    Wn,
}

impl Port {
    /// Relabel after a single clockwise quarter turn.
    pub fn rotated_cw(self) -> Port {
        match self {
            Port::N => Port::E,
            Port::E => Port::S,
            Port::S => Port::W,
            Port::W => Port::N,
            Port::Nw => Port::En,
            Port::Ne => Port::Es,
            Port::En => Port::Se,
            Port::Es => Port::Sw,
            Port::Se => Port::Ws,
            Port::Sw => Port::Wn,
            Port::Ws => Port::Nw,
            Port::Wn => Port::Ne,
        }
    }

    /// Apply a full tile rotation to this port label.
    pub fn rotated(self, rotation: Rotation) -> Port {
        let mut port = self;
        for _ in 0..rotation.steps() {
            port = port.rotated_cw();
        }
        port
    }

    /// The full edge this port names, if it is a full-edge port.
    pub fn as_edge(self) -> Option<Edge> {
        match self {
            Port::N => Some(Edge::N),
            Port::E => Some(Edge::E),
            Port::S => Some(Edge::S),
            Port::W => Some(Edge::W),
            _ => None,
        }
    }

    /// Whether this is one of the eight half-edge labels.
    pub fn is_half(self) -> bool {
        self.as_edge().is_none()
    }

    /// The edge this port sits on; the edge itself for full-edge ports.
    pub fn on_edge(self) -> Edge {
        match self {
            Port::N | Port::Nw | Port::Ne => Edge::N,
            Port::E | Port::En | Port::Es => Edge::E,
            Port::S | Port::Se | Port::Sw => Edge::S,
            Port::W | Port::Ws | Port::Wn => Edge::W,
        }
    }

    /// The full-edge port for a cardinal edge.
    pub fn from_edge(edge: Edge) -> Port {
        match edge {
            Edge::N => Port::N,
            Edge::E => Port::E,
            Edge::S => Port::S,
            Edge::W => Port::W,
        }
    }
}

/// A quarter-turn rotation applied to a whole placed tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// All rotations, in the order placement search tries them.
    pub const ALL: [Rotation; 4] = [
        Rotation::R0,
        Rotation::R90,
        Rotation::R180,
        Rotation::R270,
    ];

    /// Parse a rotation from degrees. Any multiple of 90 is accepted and
    /// normalized into `0..360`; anything else is rejected.
    pub fn from_degrees(deg: i32) -> Option<Rotation> {
        match deg.rem_euclid(360) {
            0 => Some(Rotation::R0),
            90 => Some(Rotation::R90),
            180 => Some(Rotation::R180),
            270 => Some(Rotation::R270),
            _ => None,
        }
    }

    /// The rotation in degrees, one of 0, 90, 180, 270.
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Number of clockwise quarter turns.
    pub fn steps(self) -> u8 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }
}

/// Per-edge primary terrain of a tile type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileEdges {
    pub north: Terrain,
    pub east: Terrain,
    pub south: Terrain,
    pub west: Terrain,
}

impl TileEdges {
    pub const fn new(north: Terrain, east: Terrain, south: Terrain, west: Terrain) -> Self {
        Self {
            north,
            east,
            south,
            west,
        }
    }

    /// Terrain on a given edge of the unrotated tile.
    pub fn get(&self, edge: Edge) -> Terrain {
        match edge {
            Edge::N => self.north,
            Edge::E => self.east,
            Edge::S => self.south,
            Edge::W => self.west,
        }
    }

    /// The edge map after a single clockwise quarter turn: the old north
    /// edge faces east, and so on around.
    pub fn rotated_cw(self) -> TileEdges {
        TileEdges {
            north: self.west,
            east: self.north,
            south: self.east,
            west: self.south,
        }
    }

    /// The edge map after a full tile rotation.
    pub fn rotated(self, rotation: Rotation) -> TileEdges {
        let mut edges = self;
        for _ in 0..rotation.steps() {
            edges = edges.rotated_cw();
        }
        edges
    }
}

fn default_meeple_point() -> (f32, f32) {
    (0.5, 0.5)
}

/// A feature fragment local to one tile type: a road, city, or field piece,
/// or a cloister. Fragments merge with adjacent tiles' fragments through
/// their ports once placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalFeature {
    /// Identifier unique within the owning tile type.
    pub id: String,
    pub kind: FeatureKind,
    /// Boundary contacts. Empty for cloisters.
    #[serde(default)]
    pub ports: Vec<Port>,
    /// Normalized anchor for meeple display, in unrotated tile space.
    /// Never rotated here; callers apply the tile rotation when mapping to
    /// world space.
    #[serde(default = "default_meeple_point")]
    pub meeple_point: (f32, f32),
    /// Pennant count; only meaningful for cities.
    #[serde(default)]
    pub pennants: u32,
}

/// An immutable tile type definition, supplied by the catalog and never
/// mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileType {
    pub id: String,
    pub edges: TileEdges,
    pub features: Vec<LocalFeature>,
    /// Whether a match opens with this tile at the origin.
    #[serde(default)]
    pub start_tile: bool,
}

impl TileType {
    /// Terrain presented on `edge` when the tile is placed with `rotation`.
    pub fn edge(&self, edge: Edge, rotation: Rotation) -> Terrain {
        self.edges.rotated(rotation).get(edge)
    }

    /// Look up a local feature by id.
    pub fn feature(&self, id: &str) -> Option<&LocalFeature> {
        self.features.iter().find(|f| f.id == id)
    }

    /// The ports of `feature` as they sit on the board under `rotation`.
    pub fn rotated_ports<'a>(
        &self,
        feature: &'a LocalFeature,
        rotation: Rotation,
    ) -> impl Iterator<Item = Port> + 'a {
        feature.ports.iter().map(move |p| p.rotated(rotation))
    }
}
