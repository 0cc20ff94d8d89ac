//! Cross-tile feature connectivity.
//!
//! `analyze` rebuilds the whole feature graph from the board on every call:
//! one node per local feature of every placed instance, unioned across
//! shared edges (roads and cities) and shared half edges (fields), then
//! coalesced into scorable groups. No incremental state is kept — the board
//! is small and the result must always reflect exactly the committed board.
//!
//! Nodes live in an integer-indexed arena; the union-find runs over those
//! indices. Group identity is the stable key derived from the kind plus the
//! sorted member node keys, so the same physical region yields the same key
//! across recomputation — which is what lets the match track already-scored
//! regions idempotently.

use crate::board::{Board, GridPos, InstanceId};
use crate::catalog::TileCatalog;
use crate::player::PlayerSlot;
use crate::tile::{Edge, FeatureKind, Port};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Stable identity of a feature group across recomputation.
pub type GroupKey = String;

/// Disjoint-set over arena indices, path halving + union by rank.
#[derive(Debug, Default)]
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn push(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        self.rank.push(0);
        id
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let (hi, lo) = if self.rank[ra] < self.rank[rb] {
            (rb, ra)
        } else {
            (ra, rb)
        };
        self.parent[lo] = hi;
        if self.rank[hi] == self.rank[lo] {
            self.rank[hi] += 1;
        }
    }
}

/// A maximal connected region of same-kind features across the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureGroup {
    pub key: GroupKey,
    pub kind: FeatureKind,
    /// Member node keys (`"instance:feature"`), sorted.
    pub nodes: Vec<String>,
    /// Instances the group covers.
    pub tiles: BTreeSet<InstanceId>,
    /// Meeple counts per player slot; absent slots hold none.
    pub meeples: BTreeMap<PlayerSlot, u32>,
    /// Pennant total (cities only).
    pub pennants: u32,
    pub complete: bool,
    /// Edge ports still facing empty space or a non-matching neighbor
    /// (roads and cities only).
    pub open_ports: u32,
    /// Occupied cells of the surrounding eight (cloisters only).
    pub adjacent_tiles: u32,
    /// Stable keys of completed city groups this field touches
    /// (fields only).
    pub adj_completed_cities: BTreeSet<GroupKey>,
}

impl FeatureGroup {
    pub fn tile_count(&self) -> u32 {
        self.tiles.len() as u32
    }

    pub fn meeple_count(&self, slot: PlayerSlot) -> u32 {
        self.meeples.get(&slot).copied().unwrap_or(0)
    }

    pub fn total_meeples(&self) -> u32 {
        self.meeples.values().sum()
    }
}

/// Result of one analysis pass.
#[derive(Debug, Clone)]
pub struct BoardAnalysis {
    pub groups: Vec<FeatureGroup>,
    node_to_group: HashMap<(InstanceId, String), usize>,
}

impl BoardAnalysis {
    /// The group containing a given instance's local feature.
    pub fn group_of(&self, instance: InstanceId, feature: &str) -> Option<&FeatureGroup> {
        self.node_to_group
            .get(&(instance, feature.to_string()))
            .map(|&idx| &self.groups[idx])
    }
}

/// One arena node: a local feature of a placed instance, with its ports
/// already rotated into board space.
#[derive(Debug)]
struct Node {
    instance: InstanceId,
    feature: String,
    kind: FeatureKind,
    pos: GridPos,
    ports: Vec<Port>,
    pennants: u32,
    tile: String,
}

/// Which node sits behind each boundary port of one placed tile.
#[derive(Debug, Default)]
struct TilePorts {
    road: HashMap<Edge, usize>,
    city: HashMap<Edge, usize>,
    field: HashMap<Port, usize>,
}

/// Field half-edge pairings across an east/west adjacency, matched by
/// northern and southern half.
const EW_FIELD_PAIRS: [(Port, Port); 2] = [(Port::En, Port::Wn), (Port::Es, Port::Ws)];
/// Field half-edge pairings across a south/north adjacency.
const SN_FIELD_PAIRS: [(Port, Port); 2] = [(Port::Sw, Port::Nw), (Port::Se, Port::Ne)];

/// Build the feature graph for the current board and coalesce it into
/// groups. Deterministic for a given board and catalog.
pub fn analyze(board: &Board, catalog: &TileCatalog) -> BoardAnalysis {
    let mut uf = UnionFind::default();
    let mut nodes: Vec<Node> = Vec::new();
    let mut per_pos: HashMap<GridPos, TilePorts> = HashMap::new();

    // Arena construction: one node per local feature.
    for (pos, placed) in board.iter() {
        let tile = catalog
            .tile(&placed.tile)
            .expect("placed tile type is present in the catalog");
        let mut ports_here = TilePorts::default();
        for feature in &tile.features {
            let idx = uf.push();
            let rotated: Vec<Port> = tile.rotated_ports(feature, placed.rotation).collect();
            for port in &rotated {
                match feature.kind {
                    FeatureKind::Road => {
                        if let Some(edge) = port.as_edge() {
                            ports_here.road.insert(edge, idx);
                        }
                    }
                    FeatureKind::City => {
                        if let Some(edge) = port.as_edge() {
                            ports_here.city.insert(edge, idx);
                        }
                    }
                    FeatureKind::Field => {
                        ports_here.field.insert(*port, idx);
                    }
                    FeatureKind::Cloister => {}
                }
            }
            nodes.push(Node {
                instance: placed.instance,
                feature: feature.id.clone(),
                kind: feature.kind,
                pos,
                ports: rotated,
                pennants: feature.pennants,
                tile: placed.tile.clone(),
            });
        }
        per_pos.insert(pos, ports_here);
    }

    // Union across each shared boundary. Scanning east and south from every
    // tile visits each adjacency exactly once.
    for (pos, _) in board.iter() {
        let here = &per_pos[&pos];

        if let Some(there) = per_pos.get(&pos.neighbor(Edge::E)) {
            if let (Some(&a), Some(&b)) = (here.road.get(&Edge::E), there.road.get(&Edge::W)) {
                uf.union(a, b);
            }
            if let (Some(&a), Some(&b)) = (here.city.get(&Edge::E), there.city.get(&Edge::W)) {
                uf.union(a, b);
            }
            for (pa, pb) in EW_FIELD_PAIRS {
                if let (Some(&a), Some(&b)) = (here.field.get(&pa), there.field.get(&pb)) {
                    uf.union(a, b);
                }
            }
        }

        if let Some(there) = per_pos.get(&pos.neighbor(Edge::S)) {
            if let (Some(&a), Some(&b)) = (here.road.get(&Edge::S), there.road.get(&Edge::N)) {
                uf.union(a, b);
            }
            if let (Some(&a), Some(&b)) = (here.city.get(&Edge::S), there.city.get(&Edge::N)) {
                uf.union(a, b);
            }
            for (pa, pb) in SN_FIELD_PAIRS {
                if let (Some(&a), Some(&b)) = (here.field.get(&pa), there.field.get(&pb)) {
                    uf.union(a, b);
                }
            }
        }
    }

    // Coalesce nodes into groups by root.
    let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for idx in 0..nodes.len() {
        by_root.entry(uf.find(idx)).or_default().push(idx);
    }

    let mut groups: Vec<FeatureGroup> = Vec::new();
    let mut members_of: Vec<Vec<usize>> = Vec::new();
    let mut node_to_group: HashMap<(InstanceId, String), usize> = HashMap::new();

    for (_root, members) in by_root {
        let kind = nodes[members[0]].kind;
        let mut node_keys: Vec<String> = members
            .iter()
            .map(|&i| format!("{}:{}", nodes[i].instance, nodes[i].feature))
            .collect();
        node_keys.sort();
        let tiles: BTreeSet<InstanceId> = members.iter().map(|&i| nodes[i].instance).collect();
        let pennants = if kind == FeatureKind::City {
            members.iter().map(|&i| nodes[i].pennants).sum()
        } else {
            0
        };
        let key = format!("{}|{}", kind, node_keys.join("/"));

        let gidx = groups.len();
        for &i in &members {
            node_to_group.insert((nodes[i].instance, nodes[i].feature.clone()), gidx);
        }
        groups.push(FeatureGroup {
            key,
            kind,
            nodes: node_keys,
            tiles,
            meeples: BTreeMap::new(),
            pennants,
            complete: false,
            open_ports: 0,
            adjacent_tiles: 0,
            adj_completed_cities: BTreeSet::new(),
        });
        members_of.push(members);
    }

    // Meeple counts come from the committed tokens on covered tiles.
    for (_pos, placed) in board.iter() {
        for meeple in &placed.meeples {
            if let Some(&gidx) = node_to_group.get(&(placed.instance, meeple.feature.clone())) {
                *groups[gidx].meeples.entry(meeple.player).or_insert(0) += 1;
            }
        }
    }

    // Completion.
    for gidx in 0..groups.len() {
        match groups[gidx].kind {
            FeatureKind::Road | FeatureKind::City => {
                let kind = groups[gidx].kind;
                let mut open = 0u32;
                for &i in &members_of[gidx] {
                    let node = &nodes[i];
                    for port in &node.ports {
                        let Some(edge) = port.as_edge() else { continue };
                        let closed = per_pos
                            .get(&node.pos.neighbor(edge))
                            .is_some_and(|there| match kind {
                                FeatureKind::Road => there.road.contains_key(&edge.opposite()),
                                _ => there.city.contains_key(&edge.opposite()),
                            });
                        if !closed {
                            open += 1;
                        }
                    }
                }
                groups[gidx].open_ports = open;
                groups[gidx].complete = open == 0;
            }
            FeatureKind::Cloister => {
                // Cloisters never merge; the group covers exactly one tile.
                let node = &nodes[members_of[gidx][0]];
                let around = board.occupied_around(node.pos);
                groups[gidx].adjacent_tiles = around;
                groups[gidx].complete = around == 8;
            }
            FeatureKind::Field => {}
        }
    }

    // Field-to-completed-city contact, via the catalog's cached per-type map.
    let mut field_adjacency: Vec<(usize, BTreeSet<GroupKey>)> = Vec::new();
    for (gidx, group) in groups.iter().enumerate() {
        if group.kind != FeatureKind::Field {
            continue;
        }
        let mut adjacent = BTreeSet::new();
        for &i in &members_of[gidx] {
            let node = &nodes[i];
            let Some(contacts) = catalog.field_city_contacts(&node.tile) else {
                continue;
            };
            let Some(city_locals) = contacts.get(&node.feature) else {
                continue;
            };
            for city_local in city_locals {
                if let Some(&cg) = node_to_group.get(&(node.instance, city_local.clone())) {
                    let city_group = &groups[cg];
                    if city_group.kind == FeatureKind::City && city_group.complete {
                        adjacent.insert(city_group.key.clone());
                    }
                }
            }
        }
        field_adjacency.push((gidx, adjacent));
    }
    for (gidx, adjacent) in field_adjacency {
        groups[gidx].adj_completed_cities = adjacent;
    }

    BoardAnalysis {
        groups,
        node_to_group,
    }
}
