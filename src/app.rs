use leptos::ev::SubmitEvent;
use leptos::leptos_dom::helpers::{set_timeout_with_handle, TimeoutHandle};
use leptos::logging::{log, warn};
use leptos::prelude::*;
use leptos_meta::{provide_meta_context, MetaTags, Stylesheet, Title};
use leptos_router::{
    components::{Route, Router, Routes},
    hooks::use_params_map,
    path,
};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{GateConfig, DEFAULT_DEPLOYMENT};
use crate::model::EngineState;
use crate::sequencer::{EngineStore, PuzzleEngine, Scheduler, SubmitOutcome, TimerHandle};

/// The engine as the page runs it: state in a signal, timers on the browser's event loop.
pub type GateEngine = PuzzleEngine<RwSignal<EngineState>, BrowserScheduler>;

impl EngineStore for RwSignal<EngineState> {
    fn create(initial: EngineState) -> Self {
        RwSignal::new(initial)
    }

    fn read<R>(&self, f: impl FnOnce(&EngineState) -> R) -> Option<R> {
        self.try_with_untracked(f)
    }

    fn update<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> Option<R> {
        self.try_update(f)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserScheduler;

/// `None` when the browser refused the timeout; there is nothing to cancel then.
#[derive(Debug)]
pub struct BrowserTimer(Option<TimeoutHandle>);

impl TimerHandle for BrowserTimer {
    fn cancel(self) {
        if let Some(handle) = self.0 {
            handle.clear();
        }
    }
}

impl Scheduler for BrowserScheduler {
    type Handle = BrowserTimer;

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + 'static>) -> BrowserTimer {
        match set_timeout_with_handle(task, delay) {
            Ok(handle) => BrowserTimer(Some(handle)),
            Err(e) => {
                warn!("Failed to schedule timer for {:?}: {:?}", delay, e);
                BrowserTimer(None)
            }
        }
    }
}

pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <meta name="viewport" content="width=device-width, initial-scale=1" />
                <AutoReload options=options.clone() />
                <HydrationScripts options />
                <MetaTags />
            </head>
            <body>
                <App />
            </body>
        </html>
    }
}

#[component]
pub fn App() -> impl IntoView {
    // Provides context that manages stylesheets, titles, meta tags, etc.
    provide_meta_context();

    view! {
        // id=leptos means cargo-leptos will hot-reload this stylesheet
        <Stylesheet id="leptos" href="/pkg/puzzle-gate.css" />

        <Router>
            <main>
                <Routes fallback=|| "Page not found.".into_view()>
                    <Route path=path!("/") view=DefaultGate />
                    <Route path=path!("/secret") view=DefaultGate />
                    <Route path=path!("/secret/:deployment") view=DeploymentGate />
                </Routes>
            </main>
        </Router>
    }
}

#[component]
fn DefaultGate() -> impl IntoView {
    gate_for(DEFAULT_DEPLOYMENT)
}

#[component]
fn DeploymentGate() -> impl IntoView {
    let params = use_params_map();
    move || {
        let name = params.read().get("deployment").unwrap_or_default();
        gate_for(&name)
    }
}

fn gate_for(name: &str) -> AnyView {
    match GateConfig::builtin(name) {
        Ok(config) => view! { <PuzzleGate config=Arc::new(config) /> }.into_any(),
        Err(e) => {
            warn!("Cannot load deployment {:?}: {}", name, e);
            view! {
                <div class="gate-error">
                    <h1>"Nothing to unlock here"</h1>
                    <p>{e.to_string()}</p>
                </div>
            }
            .into_any()
        }
    }
}

/// The whole gate: the tile grid and answer dialog until the secret is revealed, then only the
/// secret image.
#[component]
pub fn PuzzleGate(config: Arc<GateConfig>) -> impl IntoView {
    let engine = StoredValue::new(GateEngine::new(Arc::clone(&config), BrowserScheduler));
    let state = engine.with_value(|e| *e.store());
    // Lookups go through their own handle so views never wait on the engine.
    let gate = StoredValue::new(Arc::clone(&config));

    // Unmounting the page must not leave a reveal pending.
    on_cleanup(move || {
        engine.try_update_value(|e| e.dispose());
    });

    let tile_count = config.tile_count();
    let title = config.title.clone();
    let secret_image = config.secret_image.clone();
    let background = config
        .background_image
        .as_ref()
        .map(|url| format!("background-image: url({})", url));
    let columns = format!(
        "grid-template-columns: repeat({}, minmax(0, 1fr));",
        tile_count
    );

    view! {
        <Title text=title.clone() />
        <Show
            when=move || !state.with(|s| s.revealed)
            fallback=move || {
                view! {
                    <div class="secret">
                        <img src=secret_image.clone() alt="secret" />
                    </div>
                }
            }
        >
            <div class="gate" style=background.clone()>
                <div class="gate-overlay" />
                <div class="gate-content">
                    <h1 class="gate-title">{title.clone()}</h1>
                    <div class="tile-grid" style=columns.clone()>
                        {(0..tile_count)
                            .map(|slot| view! { <LetterBox tile=slot engine state gate /> })
                            .collect_view()}
                    </div>
                    <Show when=move || state.with(EngineState::all_solved)>
                        <p class="gate-solved">"Unlocked!"</p>
                    </Show>
                </div>
                <AnswerDialog engine state gate />
            </div>
        </Show>
    }
}

#[component]
fn LetterBox(
    tile: usize,
    engine: StoredValue<GateEngine>,
    state: RwSignal<EngineState>,
    gate: StoredValue<Arc<GateConfig>>,
) -> impl IntoView {
    let class = move || {
        let status = state.with(|s| s.tiles[tile]);
        if status.solved {
            "tile tile-solved"
        } else if status.shows_wrong() {
            "tile tile-wrong"
        } else {
            "tile"
        }
    };

    // Solved tiles show their letter; follows the display order, so it moves on reorder.
    let letter = move || {
        let index = state.with(|s| s.tiles[tile].solved.then(|| s.puzzle_index(tile)));
        index
            .map(|index| gate.with_value(|c| c.puzzle(index).target_letter.to_string()))
            .unwrap_or_default()
    };

    view! {
        <button class=class on:click=move |_| engine.update_value(|e| e.open(tile))>
            {letter}
        </button>
    }
}

#[component]
fn AnswerDialog(
    engine: StoredValue<GateEngine>,
    state: RwSignal<EngineState>,
    gate: StoredValue<Arc<GateConfig>>,
) -> impl IntoView {
    let close = move |_| engine.update_value(|e| e.close());

    let submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        match engine.try_update_value(|e| e.submit()) {
            Some(SubmitOutcome::Wrong { slot }) => log!("Wrong answer for puzzle {}", slot + 1),
            Some(SubmitOutcome::Solved { slot, all_solved }) => {
                log!("Puzzle {} solved (all solved: {})", slot + 1, all_solved)
            }
            _ => {}
        }
    };

    let heading = move || {
        state
            .with(|s| s.active_slot)
            .map(|slot| format!("Puzzle {}", slot + 1))
            .unwrap_or_default()
    };

    let prompt = move || {
        state
            .with(|s| s.active_slot.map(|slot| s.puzzle_index(slot)))
            .map(|index| gate.with_value(|c| c.puzzle(index).prompt.clone()))
            .unwrap_or_default()
    };

    let wrong = move || state.with(|s| s.active_slot.is_some_and(|slot| s.tiles[slot].wrong));

    view! {
        <Show when=move || state.with(|s| s.active_slot.is_some())>
            <div class="dialog-backdrop" on:click=close />
            <div class="dialog" role="dialog">
                <h2>{heading}</h2>
                <p class="dialog-prompt">{prompt}</p>
                <form on:submit=submit>
                    <input
                        class="form-input"
                        type="text"
                        placeholder="Type answer"
                        autofocus
                        prop:value=move || state.with(|s| s.input.clone())
                        on:input=move |ev| {
                            engine.update_value(|e| e.update_input(event_target_value(&ev)))
                        }
                    />
                    {move || {
                        wrong().then(|| view! { <p class="dialog-error">"Not quite. Try again."</p> })
                    }}
                    <div class="dialog-actions">
                        <button type="button" class="btn-secondary" on:click=close>
                            "Cancel"
                        </button>
                        <button type="submit">"Submit"</button>
                    </div>
                </form>
            </div>
        </Show>
    }
}
