//! Integration tests for the Meeple game engine.
//!
//! These tests drive complete matches through the public API: scripted
//! endgames for the scoring rules and bot-driven random playouts for the
//! full turn loop.

use meeple_core::*;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A catalog restricted to a few base tile types, for scripted decks.
fn catalog_of(counts: &[(&str, u32)]) -> TileCatalog {
    let base = TileCatalog::base_game();
    let tiles = counts
        .iter()
        .map(|(id, _)| base.tile(id).unwrap().clone())
        .collect();
    let counts = counts.iter().map(|(id, c)| (id.to_string(), *c)).collect();
    TileCatalog::new(tiles, counts).unwrap()
}

fn active_match(catalog: &TileCatalog, seed: u64) -> Match {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut m = Match::new_with_rng(catalog, "Ada", MatchRules::default(), &mut rng);
    m.join_with_rng(catalog, "Bea", &mut rng).unwrap();
    m
}

/// Meeples on the board plus meeples in supply always add up to the full
/// allotment, for both players.
fn assert_meeples_conserved(m: &Match) {
    for slot in [1u8, 2u8] {
        let on_board: u32 = m
            .board()
            .iter()
            .flat_map(|(_, placed)| placed.meeples.iter())
            .filter(|meeple| meeple.player == slot)
            .count() as u32;
        let in_supply = m.player(slot).map_or(0, |p| p.meeples);
        assert_eq!(
            on_board + in_supply,
            MEEPLES_PER_PLAYER,
            "meeples leaked for slot {}",
            slot
        );
    }
}

#[test]
fn bot_match_on_the_full_base_game_terminates() {
    let catalog = TileCatalog::base_game();
    let mut m = active_match(&catalog, 42);
    let mut bots = [
        Bot::with_seed(1, BotDifficulty::Easy, 1),
        Bot::with_seed(2, BotDifficulty::Easy, 2),
    ];

    let mut iterations = 0;
    while !m.is_finished() && iterations < 200 {
        let slot = m.turn_player();
        let bot = &mut bots[slot as usize - 1];
        let request = bot
            .choose_turn(&m, &catalog)
            .expect("the drawn tile always has a legal placement");
        m.submit_turn(&catalog, slot, &request).unwrap();
        assert_meeples_conserved(&m);
        iterations += 1;
    }

    assert!(m.is_finished(), "match should end within {} turns", 200);
    assert_eq!(m.supply_total(), 0);
    // 1 start tile + 71 draws, minus whatever burned.
    assert!(m.board().len() <= 72);
    assert!(m.board().len() > 2);
}

#[test]
fn greedy_beats_nobody_but_terminates_too() {
    let catalog = catalog_of(&[("D", 1), ("E", 4), ("U", 6), ("V", 4), ("B", 2)]);
    let mut m = active_match(&catalog, 7);
    let mut bots = [
        Bot::with_seed(1, BotDifficulty::Greedy, 3),
        Bot::with_seed(2, BotDifficulty::Greedy, 4),
    ];

    let mut iterations = 0;
    while !m.is_finished() && iterations < 60 {
        let slot = m.turn_player();
        let request = bots[slot as usize - 1].choose_turn(&m, &catalog).unwrap();
        m.submit_turn(&catalog, slot, &request).unwrap();
        assert_meeples_conserved(&m);
        iterations += 1;
    }
    assert!(m.is_finished());
}

#[test]
fn unclaimed_city_scores_nobody_and_fields_settle_at_the_end() {
    // Deck of two single-cap city tiles against the start tile's city.
    let catalog = catalog_of(&[("D", 1), ("E", 2)]);
    let mut m = active_match(&catalog, 9);
    let first = m.turn_player();
    let second = opponent(first);

    // First player completes the start city but claims the surrounding
    // field instead of the city itself.
    let events = m
        .submit_turn(
            &catalog,
            first,
            &TurnRequest::place(0, -1, Rotation::R180).with_meeple("f1"),
        )
        .unwrap();
    // The city completed with no meeples on it: marked scored, no points.
    assert!(!events
        .iter()
        .any(|e| matches!(e, MatchEvent::GroupScored { .. })));
    assert_eq!(m.scored_keys().len(), 1);
    assert_eq!(m.player(first).unwrap().score, 0);

    // Second player opens a fresh city cap of their own and claims it.
    let events = m
        .submit_turn(
            &catalog,
            second,
            &TurnRequest::place(0, 1, Rotation::R180).with_meeple("c1"),
        )
        .unwrap();

    // Supply is dry: the match finalized. The field pays 3 for its one
    // adjacent completed city; the still-open one-tile city pays 1.
    assert!(m.is_finished());
    assert_eq!(m.player(first).unwrap().score, 3);
    assert_eq!(m.player(second).unwrap().score, 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, MatchEvent::MatchFinished { winner: Some(w) } if *w == first)));
}

#[test]
fn merged_city_pays_tied_claimants_in_full() {
    // Two separately claimed city caps merged by a connecting band: both
    // players hold one meeple on the completed city and both get full value.
    let catalog = catalog_of(&[("D", 1), ("E", 2), ("G", 1)]);
    let snapshot = MatchSnapshot {
        phase: MatchPhase::Active,
        players: vec![Player::new(1, "Ada"), Player::new(2, "Bea")],
        rules: MatchRules::default(),
        board: vec![
            BoardEntry {
                x: -1,
                y: 0,
                placed: PlacedTile {
                    instance: 1,
                    tile: "E".to_string(),
                    rotation: Rotation::R90,
                    meeples: vec![Meeple {
                        player: 1,
                        feature: "c1".to_string(),
                    }],
                },
            },
            BoardEntry {
                x: 1,
                y: 0,
                placed: PlacedTile {
                    instance: 2,
                    tile: "E".to_string(),
                    rotation: Rotation::R270,
                    meeples: vec![Meeple {
                        player: 2,
                        feature: "c1".to_string(),
                    }],
                },
            },
        ],
        inst_seq: 3,
        draw_queue: Vec::new(),
        next_tiles: [None, None],
        scored_keys: Vec::new(),
        turn_player: 1,
        turn_index: 3,
        current_tile: Some("G".to_string()),
        burned_turn: Vec::new(),
        last_event: String::new(),
    };
    let mut m = Match::from_snapshot(snapshot);

    let events = m
        .submit_turn(&catalog, 1, &TurnRequest::place(0, 0, Rotation::R90))
        .unwrap();

    let scored: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            MatchEvent::GroupScored {
                points, winners, ..
            } => Some((*points, winners.clone())),
            _ => None,
        })
        .collect();
    // 3 tiles, no pennants, complete: 6 points — to both, unsplit.
    assert_eq!(scored, vec![(6, vec![1, 2])]);
    assert_eq!(m.player(1).unwrap().score, 6);
    assert_eq!(m.player(2).unwrap().score, 6);
    assert!(m.is_finished());
    assert!(events
        .iter()
        .any(|e| matches!(e, MatchEvent::MatchFinished { winner: None })));
}

#[test]
fn snapshot_restore_reproduces_a_live_game_mid_flight() {
    let catalog = TileCatalog::base_game();
    let mut m = active_match(&catalog, 13);
    let mut bots = [
        Bot::with_seed(1, BotDifficulty::Easy, 5),
        Bot::with_seed(2, BotDifficulty::Easy, 6),
    ];

    for _ in 0..10 {
        if m.is_finished() {
            break;
        }
        let slot = m.turn_player();
        let request = bots[slot as usize - 1].choose_turn(&m, &catalog).unwrap();
        m.submit_turn(&catalog, slot, &request).unwrap();
    }

    let json = serde_json::to_string(&m.snapshot()).unwrap();
    let restored = Match::from_snapshot(serde_json::from_str(&json).unwrap());

    assert_eq!(restored.snapshot(), m.snapshot());
    // The analyzer and scorer see identical worlds.
    assert_eq!(restored.projections(&catalog), m.projections(&catalog));
    let live = analyze(m.board(), &catalog);
    let back = analyze(restored.board(), &catalog);
    let live_keys: Vec<_> = live.groups.iter().map(|g| &g.key).collect();
    let back_keys: Vec<_> = back.groups.iter().map(|g| &g.key).collect();
    assert_eq!(live_keys, back_keys);
}

#[test]
fn scoring_is_deterministic_across_repeated_analysis() {
    let catalog = TileCatalog::base_game();
    let mut m = active_match(&catalog, 21);
    let mut bots = [
        Bot::with_seed(1, BotDifficulty::Easy, 7),
        Bot::with_seed(2, BotDifficulty::Easy, 8),
    ];
    for _ in 0..8 {
        if m.is_finished() {
            break;
        }
        let slot = m.turn_player();
        let request = bots[slot as usize - 1].choose_turn(&m, &catalog).unwrap();
        m.submit_turn(&catalog, slot, &request).unwrap();
    }

    let first = m.projections(&catalog);
    for _ in 0..3 {
        assert_eq!(m.projections(&catalog), first);
    }
}
