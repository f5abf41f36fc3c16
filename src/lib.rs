pub mod answer;
pub mod app;
pub mod config;
pub mod model;
pub mod order;
pub mod sequencer;

pub use answer::{check, normalize, AnswerPolicy};
pub use config::{ConfigError, GateConfig};
pub use model::{EngineState, Phase, Puzzle, TileState};
pub use sequencer::{ManualScheduler, PuzzleEngine, SubmitOutcome};

#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    use crate::app::*;
    console_error_panic_hook::set_once();
    leptos::mount::hydrate_body(App);
}
