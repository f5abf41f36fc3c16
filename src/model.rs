use serde::{Deserialize, Serialize};

use crate::order;

/// A single gated question. The letter is revealed on the tile once the puzzle is solved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    pub target_letter: char,
    pub prompt: String,
    pub accepted_answers: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileState {
    pub solved: bool,
    pub wrong: bool,
}

impl TileState {
    /// The wrong marker only matters for tiles that are still unsolved.
    pub fn shows_wrong(&self) -> bool {
        self.wrong && !self.solved
    }
}

/// Where the gate is in its lifecycle. Derived from [`EngineState`], never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Playing,
    AllSolved,
    Reordering,
    Revealed,
}

/// Everything the rendering layer reads. Mutated only through `PuzzleEngine` commands and the
/// two reveal timers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    /// Display slot -> puzzle index.
    pub display_order: Vec<usize>,
    /// Indexed by display slot.
    pub tiles: Vec<TileState>,
    pub active_slot: Option<usize>,
    pub input: String,
    pub revealed: bool,
}

impl EngineState {
    pub fn new(display_order: Vec<usize>) -> Self {
        let tiles = vec![TileState::default(); display_order.len()];
        Self {
            display_order,
            tiles,
            active_slot: None,
            input: String::new(),
            revealed: false,
        }
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn all_solved(&self) -> bool {
        self.tiles.iter().all(|tile| tile.solved)
    }

    pub fn solved_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.solved).count()
    }

    /// Puzzle index currently shown in `slot`.
    pub fn puzzle_index(&self, slot: usize) -> usize {
        self.display_order[slot]
    }

    pub fn phase(&self) -> Phase {
        if self.revealed {
            Phase::Revealed
        } else if !self.all_solved() {
            Phase::Playing
        } else if order::is_identity(&self.display_order) {
            Phase::Reordering
        } else {
            Phase::AllSolved
        }
    }
}
