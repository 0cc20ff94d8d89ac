//! WebAssembly bindings for the Meeple game engine.
//!
//! This module exposes the engine to JavaScript through wasm-bindgen, for
//! the browser build of the game. State crosses the boundary as JSON
//! strings of the same snapshot and request types the native API uses.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use crate::actions::TurnRequest;
#[cfg(feature = "wasm")]
use crate::bot::{Bot, BotDifficulty};
#[cfg(feature = "wasm")]
use crate::catalog::TileCatalog;
#[cfg(feature = "wasm")]
use crate::game::{Match, MatchRules, MatchSnapshot};
#[cfg(feature = "wasm")]
use crate::placement::legal_placements;

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed match wrapper over the built-in base tileset.
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct WasmMatch {
    catalog: TileCatalog,
    state: Match,
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl WasmMatch {
    /// Create a waiting match hosted by the named player.
    #[wasm_bindgen(constructor)]
    pub fn new(host_name: &str) -> WasmMatch {
        let catalog = TileCatalog::base_game();
        let state = Match::new(&catalog, host_name, MatchRules::default());
        WasmMatch { catalog, state }
    }

    /// Restore a match from a snapshot JSON string.
    #[wasm_bindgen(js_name = fromSnapshot)]
    pub fn from_snapshot(snapshot_json: &str) -> Result<WasmMatch, JsValue> {
        let snapshot: MatchSnapshot = serde_json::from_str(snapshot_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid snapshot JSON: {}", e)))?;
        Ok(WasmMatch {
            catalog: TileCatalog::base_game(),
            state: Match::from_snapshot(snapshot),
        })
    }

    /// Join or rejoin by name; returns the assigned slot.
    pub fn join(&mut self, name: &str) -> Result<u8, JsValue> {
        self.state
            .join(&self.catalog, name)
            .map(|(slot, _)| slot)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// The current match snapshot as JSON.
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.state.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// The slot whose turn it is.
    #[wasm_bindgen(js_name = getCurrentPlayer)]
    pub fn get_current_player(&self) -> u8 {
        self.state.turn_player()
    }

    /// Legal (position, rotation) candidates for the current draw, as JSON.
    #[wasm_bindgen(js_name = getLegalPlacements)]
    pub fn get_legal_placements(&self) -> String {
        let Some(tile) = self.state.current_tile() else {
            return "[]".to_string();
        };
        let spots = legal_placements(self.state.board(), &self.catalog, tile);
        serde_json::to_string(&spots).unwrap_or_else(|_| "[]".to_string())
    }

    /// Score-panel projections for every unscored group, as JSON.
    #[wasm_bindgen(js_name = getProjections)]
    pub fn get_projections(&self) -> String {
        serde_json::to_string(&self.state.projections(&self.catalog))
            .unwrap_or_else(|_| "[]".to_string())
    }

    /// Commit a turn from a request JSON string; returns events JSON.
    #[wasm_bindgen(js_name = submitTurn)]
    pub fn submit_turn(&mut self, player: u8, request_json: &str) -> Result<String, JsValue> {
        let request: TurnRequest = serde_json::from_str(request_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid request JSON: {}", e)))?;
        match self.state.submit_turn(&self.catalog, player, &request) {
            Ok(events) => Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())),
            Err(e) => Err(JsValue::from_str(&e.to_string())),
        }
    }

    /// Let a greedy bot play the given slot's turn; returns events JSON, or
    /// null when the bot has no move.
    #[wasm_bindgen(js_name = botMove)]
    pub fn bot_move(&mut self, slot: u8) -> Result<Option<String>, JsValue> {
        let mut bot = Bot::new(slot, BotDifficulty::Greedy);
        let Some(request) = bot.choose_turn(&self.state, &self.catalog) else {
            return Ok(None);
        };
        match self.state.submit_turn(&self.catalog, slot, &request) {
            Ok(events) => Ok(Some(
                serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string()),
            )),
            Err(e) => Err(JsValue::from_str(&e.to_string())),
        }
    }
}
