//! The immutable tile catalog: tile type definitions and supply counts.
//!
//! A catalog is loaded once at match creation and treated as read-only
//! thereafter. It can come from an external JSON document (the
//! [`CatalogSpec`] format) or from the built-in base tileset
//! ([`TileCatalog::base_game`]): 24 lettered tile types, 72 tiles total,
//! with tile `D` opening the match.
//!
//! Construction validates the definitions and precomputes the per-tile-type
//! map of which local fields touch which local cities. That contact map
//! depends only on the fixed local geometry of each tile type, never on the
//! live board, so it is cached here and consumed by the analyzer when
//! scoring fields against completed cities.

use crate::tile::{Edge, FeatureKind, LocalFeature, Port, TileEdges, TileType, Terrain};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

/// Errors raised while building or loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog has no tiles with a positive count")]
    EmptySupply,

    #[error("Catalog has no start tile with a positive count")]
    NoStartTile,

    #[error("Duplicate tile id: {0}")]
    DuplicateTile(String),

    #[error("Supply references unknown tile id: {0}")]
    UnknownTile(String),

    #[error("Tile {tile}: duplicate feature id {feature}")]
    DuplicateFeature { tile: String, feature: String },

    #[error("Tile {tile}: {kind} feature {feature} carries port {port}, which is not valid for that kind")]
    BadPort {
        tile: String,
        feature: String,
        kind: FeatureKind,
        port: String,
    },

    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// External catalog document: a finite list of tile types plus an
/// id-to-count supply map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSpec {
    pub tiles: Vec<TileType>,
    pub tile_counts: BTreeMap<String, u32>,
}

/// The validated, immutable tile catalog.
#[derive(Debug, Clone)]
pub struct TileCatalog {
    tiles: HashMap<String, TileType>,
    counts: BTreeMap<String, u32>,
    start_tile_id: String,
    /// tile id -> field feature id -> city feature ids it touches.
    field_city_contacts: HashMap<String, BTreeMap<String, BTreeSet<String>>>,
}

/// Field ports that physically touch a city occupying the given edge:
/// the two halves of that edge plus the nearer halves of the two
/// neighboring edges.
fn field_ports_beside_city_edge(edge: Edge) -> [Port; 4] {
    match edge {
        Edge::N => [Port::Nw, Port::Ne, Port::Wn, Port::En],
        Edge::E => [Port::En, Port::Es, Port::Ne, Port::Se],
        Edge::S => [Port::Sw, Port::Se, Port::Ws, Port::Es],
        Edge::W => [Port::Wn, Port::Ws, Port::Nw, Port::Sw],
    }
}

impl TileCatalog {
    /// Build and validate a catalog from tile definitions and supply counts.
    pub fn new(
        tiles: Vec<TileType>,
        counts: BTreeMap<String, u32>,
    ) -> Result<Self, CatalogError> {
        let mut by_id: HashMap<String, TileType> = HashMap::new();
        for tile in tiles {
            let mut seen = BTreeSet::new();
            for feature in &tile.features {
                if !seen.insert(feature.id.clone()) {
                    return Err(CatalogError::DuplicateFeature {
                        tile: tile.id.clone(),
                        feature: feature.id.clone(),
                    });
                }
                for port in &feature.ports {
                    let ok = match feature.kind {
                        FeatureKind::Road | FeatureKind::City => port.as_edge().is_some(),
                        FeatureKind::Field => port.is_half(),
                        FeatureKind::Cloister => false,
                    };
                    if !ok {
                        return Err(CatalogError::BadPort {
                            tile: tile.id.clone(),
                            feature: feature.id.clone(),
                            kind: feature.kind,
                            port: format!("{:?}", port),
                        });
                    }
                }
            }
            if by_id.insert(tile.id.clone(), tile.clone()).is_some() {
                return Err(CatalogError::DuplicateTile(tile.id));
            }
        }

        for id in counts.keys() {
            if !by_id.contains_key(id) {
                return Err(CatalogError::UnknownTile(id.clone()));
            }
        }
        if counts.values().all(|&c| c == 0) {
            return Err(CatalogError::EmptySupply);
        }

        let start_tile_id = by_id
            .values()
            .filter(|t| t.start_tile && counts.get(&t.id).copied().unwrap_or(0) > 0)
            .map(|t| t.id.clone())
            .min()
            .ok_or(CatalogError::NoStartTile)?;

        let field_city_contacts = Self::build_field_city_contacts(&by_id);

        Ok(Self {
            tiles: by_id,
            counts,
            start_tile_id,
            field_city_contacts,
        })
    }

    /// Load a catalog from its external JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let spec: CatalogSpec = serde_json::from_str(json)?;
        Self::new(spec.tiles, spec.tile_counts)
    }

    fn build_field_city_contacts(
        tiles: &HashMap<String, TileType>,
    ) -> HashMap<String, BTreeMap<String, BTreeSet<String>>> {
        let mut out = HashMap::new();
        for (tile_id, tile) in tiles {
            let mut per_field: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
            for field in tile.features.iter().filter(|f| f.kind == FeatureKind::Field) {
                let field_ports: BTreeSet<Port> = field.ports.iter().copied().collect();
                if field_ports.is_empty() {
                    continue;
                }
                let mut hits = BTreeSet::new();
                for city in tile.features.iter().filter(|f| f.kind == FeatureKind::City) {
                    let touches = city
                        .ports
                        .iter()
                        .filter_map(|p| p.as_edge())
                        .any(|edge| {
                            field_ports_beside_city_edge(edge)
                                .iter()
                                .any(|candidate| field_ports.contains(candidate))
                        });
                    if touches {
                        hits.insert(city.id.clone());
                    }
                }
                if !hits.is_empty() {
                    per_field.insert(field.id.clone(), hits);
                }
            }
            out.insert(tile_id.clone(), per_field);
        }
        out
    }

    /// Look up a tile type by id.
    pub fn tile(&self, id: &str) -> Option<&TileType> {
        self.tiles.get(id)
    }

    /// The supply count map this catalog was built with.
    pub fn counts(&self) -> &BTreeMap<String, u32> {
        &self.counts
    }

    /// Total number of tiles in the supply, start tile included.
    pub fn total_tiles(&self) -> u32 {
        self.counts.values().sum()
    }

    /// The tile type a match opens with.
    pub fn start_tile_id(&self) -> &str {
        &self.start_tile_id
    }

    /// Which local cities each local field of a tile type touches.
    pub fn field_city_contacts(&self, tile_id: &str) -> Option<&BTreeMap<String, BTreeSet<String>>> {
        self.field_city_contacts.get(tile_id)
    }

    /// The full supply expanded to one entry per physical tile, in id order.
    /// Callers shuffle this into a draw queue.
    pub fn deck(&self) -> Vec<String> {
        let mut deck = Vec::with_capacity(self.total_tiles() as usize);
        for (id, &count) in &self.counts {
            for _ in 0..count {
                deck.push(id.clone());
            }
        }
        deck
    }

    /// The built-in base tileset: 24 tile types lettered `A`-`X`, 72 tiles,
    /// start tile `D`.
    pub fn base_game() -> Self {
        use FeatureKind::{City, Cloister, Field, Road};
        use Port::*;
        use Terrain::{City as C, Field as F, Road as R};

        fn feat(
            id: &str,
            kind: FeatureKind,
            ports: Vec<Port>,
            meeple_point: (f32, f32),
            pennants: u32,
        ) -> LocalFeature {
            LocalFeature {
                id: id.to_string(),
                kind,
                ports,
                meeple_point,
                pennants,
            }
        }

        fn tile(
            id: &str,
            edges: [Terrain; 4],
            features: Vec<LocalFeature>,
            start_tile: bool,
        ) -> TileType {
            let [north, east, south, west] = edges;
            TileType {
                id: id.to_string(),
                edges: TileEdges::new(north, east, south, west),
                features,
                start_tile,
            }
        }

        let tiles = vec![
            // A: cloister with a road stub running off the south edge.
            tile(
                "A",
                [F, F, R, F],
                vec![
                    feat("m1", Cloister, vec![], (0.5, 0.5), 0),
                    feat("r1", Road, vec![S], (0.5, 0.85), 0),
                    feat("f1", Field, vec![Nw, Ne, En, Es, Se, Sw, Ws, Wn], (0.2, 0.2), 0),
                ],
                false,
            ),
            // B: plain cloister.
            tile(
                "B",
                [F, F, F, F],
                vec![
                    feat("m1", Cloister, vec![], (0.5, 0.5), 0),
                    feat("f1", Field, vec![Nw, Ne, En, Es, Se, Sw, Ws, Wn], (0.2, 0.2), 0),
                ],
                false,
            ),
            // C: one city covering the whole tile, with a pennant.
            tile(
                "C",
                [C, C, C, C],
                vec![feat("c1", City, vec![N, E, S, W], (0.5, 0.5), 1)],
                false,
            ),
            // D: city on the north edge, road running west-east. Start tile.
            tile(
                "D",
                [C, R, F, R],
                vec![
                    feat("c1", City, vec![N], (0.5, 0.15), 0),
                    feat("r1", Road, vec![E, W], (0.5, 0.5), 0),
                    feat("f1", Field, vec![En, Wn], (0.5, 0.35), 0),
                    feat("f2", Field, vec![Es, Se, Sw, Ws], (0.5, 0.75), 0),
                ],
                true,
            ),
            // E: city on the north edge.
            tile(
                "E",
                [C, F, F, F],
                vec![
                    feat("c1", City, vec![N], (0.5, 0.15), 0),
                    feat("f1", Field, vec![En, Es, Se, Sw, Ws, Wn], (0.5, 0.65), 0),
                ],
                false,
            ),
            // F: city band across west-east, with a pennant.
            tile(
                "F",
                [F, C, F, C],
                vec![
                    feat("c1", City, vec![E, W], (0.5, 0.5), 1),
                    feat("f1", Field, vec![Nw, Ne], (0.5, 0.1), 0),
                    feat("f2", Field, vec![Se, Sw], (0.5, 0.9), 0),
                ],
                false,
            ),
            // G: city band across north-south.
            tile(
                "G",
                [C, F, C, F],
                vec![
                    feat("c1", City, vec![N, S], (0.5, 0.5), 0),
                    feat("f1", Field, vec![En, Es], (0.9, 0.5), 0),
                    feat("f2", Field, vec![Ws, Wn], (0.1, 0.5), 0),
                ],
                false,
            ),
            // H: two separate city caps on the east and west edges.
            tile(
                "H",
                [F, C, F, C],
                vec![
                    feat("c1", City, vec![E], (0.85, 0.5), 0),
                    feat("c2", City, vec![W], (0.15, 0.5), 0),
                    feat("f1", Field, vec![Nw, Ne, Sw, Se], (0.5, 0.5), 0),
                ],
                false,
            ),
            // I: two separate city caps on the east and south edges.
            tile(
                "I",
                [F, C, C, F],
                vec![
                    feat("c1", City, vec![E], (0.85, 0.5), 0),
                    feat("c2", City, vec![S], (0.5, 0.85), 0),
                    feat("f1", Field, vec![Nw, Ne, Ws, Wn], (0.3, 0.3), 0),
                ],
                false,
            ),
            // J: city north, road bending east-south.
            tile(
                "J",
                [C, R, R, F],
                vec![
                    feat("c1", City, vec![N], (0.5, 0.15), 0),
                    feat("r1", Road, vec![E, S], (0.65, 0.65), 0),
                    feat("f1", Field, vec![Es, Se], (0.85, 0.85), 0),
                    feat("f2", Field, vec![En, Sw, Ws, Wn], (0.3, 0.55), 0),
                ],
                false,
            ),
            // K: city north, road bending south-west.
            tile(
                "K",
                [C, F, R, R],
                vec![
                    feat("c1", City, vec![N], (0.5, 0.15), 0),
                    feat("r1", Road, vec![S, W], (0.35, 0.65), 0),
                    feat("f1", Field, vec![Sw, Ws], (0.15, 0.85), 0),
                    feat("f2", Field, vec![En, Es, Se, Wn], (0.7, 0.55), 0),
                ],
                false,
            ),
            // L: city north, three road ends meeting at a junction.
            tile(
                "L",
                [C, R, R, R],
                vec![
                    feat("c1", City, vec![N], (0.5, 0.15), 0),
                    feat("r1", Road, vec![E], (0.8, 0.5), 0),
                    feat("r2", Road, vec![S], (0.5, 0.8), 0),
                    feat("r3", Road, vec![W], (0.2, 0.5), 0),
                    feat("f1", Field, vec![En], (0.85, 0.35), 0),
                    feat("f2", Field, vec![Es, Se], (0.85, 0.85), 0),
                    feat("f3", Field, vec![Sw, Ws], (0.15, 0.85), 0),
                    feat("f4", Field, vec![Wn], (0.15, 0.35), 0),
                ],
                false,
            ),
            // M: city corner on north and west, with a pennant.
            tile(
                "M",
                [C, F, F, C],
                vec![
                    feat("c1", City, vec![N, W], (0.3, 0.3), 1),
                    feat("f1", Field, vec![En, Es, Se, Sw], (0.7, 0.7), 0),
                ],
                false,
            ),
            // N: city corner on north and west.
            tile(
                "N",
                [C, F, F, C],
                vec![
                    feat("c1", City, vec![N, W], (0.3, 0.3), 0),
                    feat("f1", Field, vec![En, Es, Se, Sw], (0.7, 0.7), 0),
                ],
                false,
            ),
            // O: city corner north-west with a pennant, road bending east-south.
            tile(
                "O",
                [C, R, R, C],
                vec![
                    feat("c1", City, vec![N, W], (0.3, 0.3), 1),
                    feat("r1", Road, vec![E, S], (0.65, 0.65), 0),
                    feat("f1", Field, vec![En, Sw], (0.5, 0.5), 0),
                    feat("f2", Field, vec![Es, Se], (0.85, 0.85), 0),
                ],
                false,
            ),
            // P: city corner north-west, road bending east-south.
            tile(
                "P",
                [C, R, R, C],
                vec![
                    feat("c1", City, vec![N, W], (0.3, 0.3), 0),
                    feat("r1", Road, vec![E, S], (0.65, 0.65), 0),
                    feat("f1", Field, vec![En, Sw], (0.5, 0.5), 0),
                    feat("f2", Field, vec![Es, Se], (0.85, 0.85), 0),
                ],
                false,
            ),
            // Q: city on three edges, pennant.
            tile(
                "Q",
                [C, C, F, C],
                vec![
                    feat("c1", City, vec![N, E, W], (0.5, 0.35), 1),
                    feat("f1", Field, vec![Se, Sw], (0.5, 0.9), 0),
                ],
                false,
            ),
            // R: city on three edges.
            tile(
                "R",
                [C, C, F, C],
                vec![
                    feat("c1", City, vec![N, E, W], (0.5, 0.35), 0),
                    feat("f1", Field, vec![Se, Sw], (0.5, 0.9), 0),
                ],
                false,
            ),
            // S: city on three edges with a pennant, road stub south.
            tile(
                "S",
                [C, C, R, C],
                vec![
                    feat("c1", City, vec![N, E, W], (0.5, 0.35), 1),
                    feat("r1", Road, vec![S], (0.5, 0.85), 0),
                    feat("f1", Field, vec![Sw], (0.3, 0.9), 0),
                    feat("f2", Field, vec![Se], (0.7, 0.9), 0),
                ],
                false,
            ),
            // T: city on three edges, road stub south.
            tile(
                "T",
                [C, C, R, C],
                vec![
                    feat("c1", City, vec![N, E, W], (0.5, 0.35), 0),
                    feat("r1", Road, vec![S], (0.5, 0.85), 0),
                    feat("f1", Field, vec![Sw], (0.3, 0.9), 0),
                    feat("f2", Field, vec![Se], (0.7, 0.9), 0),
                ],
                false,
            ),
            // U: straight road north-south.
            tile(
                "U",
                [R, F, R, F],
                vec![
                    feat("r1", Road, vec![N, S], (0.5, 0.5), 0),
                    feat("f1", Field, vec![Ne, En, Es, Se], (0.8, 0.5), 0),
                    feat("f2", Field, vec![Sw, Ws, Wn, Nw], (0.2, 0.5), 0),
                ],
                false,
            ),
            // V: road bending south-west.
            tile(
                "V",
                [F, F, R, R],
                vec![
                    feat("r1", Road, vec![S, W], (0.35, 0.65), 0),
                    feat("f1", Field, vec![Sw, Ws], (0.15, 0.85), 0),
                    feat("f2", Field, vec![Wn, Nw, Ne, En, Es, Se], (0.65, 0.35), 0),
                ],
                false,
            ),
            // W: three road ends meeting at a junction.
            tile(
                "W",
                [F, R, R, R],
                vec![
                    feat("r1", Road, vec![E], (0.8, 0.5), 0),
                    feat("r2", Road, vec![S], (0.5, 0.8), 0),
                    feat("r3", Road, vec![W], (0.2, 0.5), 0),
                    feat("f1", Field, vec![Nw, Ne, En, Wn], (0.5, 0.15), 0),
                    feat("f2", Field, vec![Es, Se], (0.85, 0.85), 0),
                    feat("f3", Field, vec![Sw, Ws], (0.15, 0.85), 0),
                ],
                false,
            ),
            // X: crossroads, four road ends.
            tile(
                "X",
                [R, R, R, R],
                vec![
                    feat("r1", Road, vec![N], (0.5, 0.2), 0),
                    feat("r2", Road, vec![E], (0.8, 0.5), 0),
                    feat("r3", Road, vec![S], (0.5, 0.8), 0),
                    feat("r4", Road, vec![W], (0.2, 0.5), 0),
                    feat("f1", Field, vec![Ne, En], (0.8, 0.2), 0),
                    feat("f2", Field, vec![Es, Se], (0.8, 0.8), 0),
                    feat("f3", Field, vec![Sw, Ws], (0.2, 0.8), 0),
                    feat("f4", Field, vec![Wn, Nw], (0.2, 0.2), 0),
                ],
                false,
            ),
        ];

        let counts: BTreeMap<String, u32> = [
            ("A", 2),
            ("B", 4),
            ("C", 1),
            ("D", 4),
            ("E", 5),
            ("F", 2),
            ("G", 1),
            ("H", 3),
            ("I", 2),
            ("J", 3),
            ("K", 3),
            ("L", 3),
            ("M", 2),
            ("N", 3),
            ("O", 2),
            ("P", 3),
            ("Q", 1),
            ("R", 3),
            ("S", 2),
            ("T", 1),
            ("U", 8),
            ("V", 9),
            ("W", 4),
            ("X", 1),
        ]
        .into_iter()
        .map(|(id, count)| (id.to_string(), count))
        .collect();

        Self::new(tiles, counts).expect("base tileset is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Rotation;

    #[test]
    fn base_game_supply_is_seventy_two() {
        let catalog = TileCatalog::base_game();
        assert_eq!(catalog.total_tiles(), 72);
        assert_eq!(catalog.deck().len(), 72);
        assert_eq!(catalog.start_tile_id(), "D");
    }

    #[test]
    fn base_game_ports_sit_on_matching_terrain() {
        let catalog = TileCatalog::base_game();
        for (id, count) in catalog.counts() {
            assert!(*count > 0, "tile {} has zero supply", id);
            let tile = catalog.tile(id).unwrap();
            for feature in &tile.features {
                for port in &feature.ports {
                    let terrain = tile.edges.get(port.on_edge());
                    match feature.kind {
                        FeatureKind::Road => {
                            assert_eq!(terrain, Terrain::Road, "tile {} feature {}", id, feature.id)
                        }
                        FeatureKind::City => {
                            assert_eq!(terrain, Terrain::City, "tile {} feature {}", id, feature.id)
                        }
                        // Field halves flank roads and fields, never cities.
                        FeatureKind::Field => {
                            assert_ne!(terrain, Terrain::City, "tile {} feature {}", id, feature.id)
                        }
                        FeatureKind::Cloister => unreachable!("cloisters carry no ports"),
                    }
                }
            }
        }
    }

    #[test]
    fn start_tile_has_matched_edges_and_features() {
        let catalog = TileCatalog::base_game();
        let start = catalog.tile(catalog.start_tile_id()).unwrap();
        assert!(start.start_tile);
        assert_eq!(start.edge(Edge::N, Rotation::R0), Terrain::City);
        assert_eq!(start.edge(Edge::E, Rotation::R0), Terrain::Road);
        assert_eq!(start.edge(Edge::W, Rotation::R0), Terrain::Road);
        // Rotating a quarter turn moves the city cap to the east edge.
        assert_eq!(start.edge(Edge::E, Rotation::R90), Terrain::City);
    }

    #[test]
    fn field_city_contacts_cover_strip_fields() {
        let catalog = TileCatalog::base_game();
        // On D the narrow strip between road and city touches the city;
        // the big southern field does not.
        let contacts = catalog.field_city_contacts("D").unwrap();
        assert_eq!(
            contacts.get("f1").map(|s| s.contains("c1")),
            Some(true)
        );
        assert!(!contacts.contains_key("f2"));
        // The full-tile city C has no fields at all.
        assert!(catalog.field_city_contacts("C").unwrap().is_empty());
    }

    #[test]
    fn catalog_round_trips_through_json() {
        let catalog = TileCatalog::base_game();
        let spec = CatalogSpec {
            tiles: {
                let mut ids: Vec<_> = catalog.counts().keys().cloned().collect();
                ids.sort();
                ids.iter().map(|id| catalog.tile(id).unwrap().clone()).collect()
            },
            tile_counts: catalog.counts().clone(),
        };
        let json = serde_json::to_string(&spec).unwrap();
        let reloaded = TileCatalog::from_json_str(&json).unwrap();
        assert_eq!(reloaded.total_tiles(), 72);
        assert_eq!(reloaded.start_tile_id(), "D");
    }

    #[test]
    fn rejects_field_with_full_edge_port() {
        let bad = TileType {
            id: "bad".to_string(),
            edges: TileEdges::new(Terrain::Field, Terrain::Field, Terrain::Field, Terrain::Field),
            features: vec![LocalFeature {
                id: "f1".to_string(),
                kind: FeatureKind::Field,
                ports: vec![Port::N],
                meeple_point: (0.5, 0.5),
                pennants: 0,
            }],
            start_tile: true,
        };
        let counts = [("bad".to_string(), 1)].into_iter().collect();
        assert!(matches!(
            TileCatalog::new(vec![bad], counts),
            Err(CatalogError::BadPort { .. })
        ));
    }
}
