use leptos::logging::log;
use rand::Rng;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

use crate::answer;
use crate::config::GateConfig;
use crate::model::{EngineState, Phase};
use crate::order;

pub trait TimerHandle {
    fn cancel(self);
}

pub trait Scheduler {
    type Handle: TimerHandle;

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + 'static>) -> Self::Handle;
}

/// Where the engine keeps its [`EngineState`]. Timer tasks hold a clone of the store, so a clone
/// must refer to the same state.
pub trait EngineStore: Clone + 'static {
    fn create(initial: EngineState) -> Self;

    /// Returns `None` once the underlying state has been disposed.
    fn read<R>(&self, f: impl FnOnce(&EngineState) -> R) -> Option<R>;

    fn update<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> Option<R>;
}

impl EngineStore for Rc<RefCell<EngineState>> {
    fn create(initial: EngineState) -> Self {
        Rc::new(RefCell::new(initial))
    }

    fn read<R>(&self, f: impl FnOnce(&EngineState) -> R) -> Option<R> {
        Some(f(&self.borrow()))
    }

    fn update<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> Option<R> {
        Some(f(&mut self.borrow_mut()))
    }
}

/// The reorder and reveal timers, armed together at the all-solved instant. Both are cancelled
/// when this is dropped.
pub struct RevealTimers<H: TimerHandle> {
    reorder: Option<H>,
    reveal: Option<H>,
}

impl<H: TimerHandle> RevealTimers<H> {
    pub fn new(reorder: H, reveal: H) -> Self {
        Self {
            reorder: Some(reorder),
            reveal: Some(reveal),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.reorder.take() {
            handle.cancel();
        }
        if let Some(handle) = self.reveal.take() {
            handle.cancel();
        }
    }
}

impl<H: TimerHandle> Drop for RevealTimers<H> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    NoActiveSlot,
    /// The answer did not match. The dialog stays open on `slot`.
    Wrong { slot: usize },
    Solved { slot: usize, all_solved: bool },
}

pub struct PuzzleEngine<St: EngineStore, S: Scheduler> {
    config: Arc<GateConfig>,
    store: St,
    scheduler: S,
    timers: Option<RevealTimers<S::Handle>>,
    disposed: bool,
}

impl<St: EngineStore, S: Scheduler> PuzzleEngine<St, S> {
    pub fn new(config: Arc<GateConfig>, scheduler: S) -> Self {
        Self::with_rng(config, scheduler, &mut rand::rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(config: Arc<GateConfig>, scheduler: S, rng: &mut R) -> Self {
        let display_order = order::initialize(config.tile_count(), rng);
        Self::with_order(config, scheduler, display_order)
    }

    /// Panics if `display_order` is not a permutation of the config's puzzles.
    pub fn with_order(config: Arc<GateConfig>, scheduler: S, display_order: Vec<usize>) -> Self {
        assert!(
            order::is_permutation(&display_order, config.tile_count()),
            "display order {:?} is not a permutation of {} puzzles",
            display_order,
            config.tile_count()
        );
        Self {
            store: St::create(EngineState::new(display_order)),
            config,
            scheduler,
            timers: None,
            disposed: false,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub fn snapshot(&self) -> Option<EngineState> {
        self.store.read(EngineState::clone)
    }

    pub fn phase(&self) -> Option<Phase> {
        self.store.read(EngineState::phase)
    }

    /// The letter behind the tile in `slot`, following the current display order.
    pub fn letter_for(&self, slot: usize) -> Option<char> {
        let index = self.store.read(|state| state.puzzle_index(slot))?;
        Some(self.config.puzzle(index).target_letter)
    }

    pub fn active_prompt(&self) -> Option<&str> {
        let index = self
            .store
            .read(|state| state.active_slot.map(|slot| state.puzzle_index(slot)))??;
        Some(self.config.puzzle(index).prompt.as_str())
    }

    /// Panics if `slot` is out of range.
    pub fn open(&mut self, slot: usize) {
        let tile_count = self.config.tile_count();
        assert!(
            slot < tile_count,
            "slot {} out of range for {} tiles",
            slot,
            tile_count
        );
        if self.disposed {
            return;
        }
        self.store.update(|state| {
            if state.revealed || state.tiles[slot].solved {
                return;
            }
            state.active_slot = Some(slot);
            state.tiles[slot].wrong = false;
            state.input.clear();
        });
    }

    pub fn update_input(&mut self, text: impl Into<String>) {
        if self.disposed {
            return;
        }
        let text = text.into();
        self.store.update(|state| {
            if state.active_slot.is_some() {
                state.input = text;
            }
        });
    }

    /// Checks the input buffer against the open tile's puzzle.
    pub fn submit(&mut self) -> SubmitOutcome {
        if self.disposed {
            return SubmitOutcome::NoActiveSlot;
        }
        let config = Arc::clone(&self.config);
        let outcome = self
            .store
            .update(|state| {
                let Some(slot) = state.active_slot else {
                    return SubmitOutcome::NoActiveSlot;
                };
                let puzzle = config.puzzle(state.puzzle_index(slot));
                if answer::check(config.policy, puzzle, &state.input) {
                    state.tiles[slot].solved = true;
                    state.active_slot = None;
                    SubmitOutcome::Solved {
                        slot,
                        all_solved: state.all_solved(),
                    }
                } else {
                    state.tiles[slot].wrong = true;
                    SubmitOutcome::Wrong { slot }
                }
            })
            .unwrap_or(SubmitOutcome::NoActiveSlot);

        if let SubmitOutcome::Solved {
            all_solved: true, ..
        } = outcome
        {
            self.arm_reveal();
        }
        outcome
    }

    pub fn close(&mut self) {
        if self.disposed {
            return;
        }
        self.store.update(|state| {
            state.active_slot = None;
        });
    }

    /// Cancels any pending transition. The engine ignores commands afterwards.
    pub fn dispose(&mut self) {
        if let Some(mut timers) = self.timers.take() {
            timers.cancel();
        }
        self.disposed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.timers.is_some()
    }

    // All-solved is monotonic, so the timers are armed at most once.
    fn arm_reveal(&mut self) {
        if self.timers.is_some() {
            return;
        }
        let tile_count = self.config.tile_count();
        log!(
            "{}: all {} tiles solved, reordering in {:?}, revealing in {:?}",
            self.config.name,
            tile_count,
            self.config.reorder_delay,
            self.config.reveal_delay
        );

        let store = self.store.clone();
        let reorder = self.scheduler.schedule(
            self.config.reorder_delay,
            Box::new(move || {
                store.update(|state| state.display_order = order::collapse(tile_count));
            }),
        );

        let store = self.store.clone();
        let name = self.config.name.clone();
        let reveal = self.scheduler.schedule(
            self.config.reveal_delay,
            Box::new(move || {
                if store.update(|state| state.revealed = true).is_some() {
                    log!("{}: secret revealed", name);
                }
            }),
        );

        self.timers = Some(RevealTimers::new(reorder, reveal));
    }
}

struct PendingTask {
    id: u64,
    due: Duration,
    task: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_id: u64,
    pending: Vec<PendingTask>,
}

/// A scheduler driven by hand instead of by wall-clock time. Tasks run, in due order, from
/// [`ManualScheduler::advance`].
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<ManualClock>>,
}

pub struct ManualTimer {
    id: u64,
    clock: Weak<RefCell<ManualClock>>,
}

impl TimerHandle for ManualTimer {
    fn cancel(self) {
        if let Some(clock) = self.clock.upgrade() {
            clock.borrow_mut().pending.retain(|task| task.id != self.id);
        }
    }
}

impl Scheduler for ManualScheduler {
    type Handle = ManualTimer;

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + 'static>) -> ManualTimer {
        let mut clock = self.clock.borrow_mut();
        let id = clock.next_id;
        clock.next_id += 1;
        let due = clock.now + delay;
        clock.pending.push(PendingTask { id, due, task });
        ManualTimer {
            id,
            clock: Rc::downgrade(&self.clock),
        }
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    pub fn pending(&self) -> usize {
        self.clock.borrow().pending.len()
    }

    /// Moves the clock forward by `by`, running every task that falls due on the way.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        loop {
            // The borrow ends before the task runs; tasks may schedule or cancel.
            let next = {
                let mut clock = self.clock.borrow_mut();
                let position = clock
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, task)| task.due <= target)
                    .min_by_key(|(_, task)| (task.due, task.id))
                    .map(|(position, _)| position);
                position.map(|position| {
                    let task = clock.pending.remove(position);
                    clock.now = task.due;
                    task.task
                })
            };
            match next {
                Some(task) => task(),
                None => break,
            }
        }
        self.clock.borrow_mut().now = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    type TestEngine = PuzzleEngine<Rc<RefCell<EngineState>>, ManualScheduler>;

    fn birthday() -> Arc<GateConfig> {
        Arc::new(GateConfig::builtin("birthday").expect("birthday should load"))
    }

    fn engine_with(config: Arc<GateConfig>) -> (TestEngine, ManualScheduler) {
        let scheduler = ManualScheduler::new();
        let mut rng = StdRng::seed_from_u64(2025);
        let engine = TestEngine::with_rng(config, scheduler.clone(), &mut rng);
        (engine, scheduler)
    }

    fn state(engine: &TestEngine) -> EngineState {
        engine.snapshot().expect("state should be readable")
    }

    fn slot_of(engine: &TestEngine, puzzle_index: usize) -> usize {
        state(engine)
            .display_order
            .iter()
            .position(|&index| index == puzzle_index)
            .expect("every puzzle has a slot")
    }

    fn solve_slot(engine: &mut TestEngine, slot: usize) -> SubmitOutcome {
        let index = state(engine).puzzle_index(slot);
        let answer = engine.config().puzzle(index).accepted_answers[0].clone();
        engine.open(slot);
        engine.update_input(answer);
        engine.submit()
    }

    fn solve_all(engine: &mut TestEngine) {
        for slot in 0..engine.config().tile_count() {
            solve_slot(engine, slot);
        }
    }

    #[test]
    fn test_new_engine_is_shuffled_and_playing() {
        let (engine, scheduler) = engine_with(birthday());
        let state = state(&engine);
        assert!(order::is_permutation(&state.display_order, 9));
        assert_eq!(state.tile_count(), 9);
        assert_eq!(state.active_slot, None);
        assert!(!state.revealed);
        assert_eq!(engine.phase(), Some(Phase::Playing));
        assert!(!engine.is_armed());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_correct_answer_solves_and_closes() {
        let (mut engine, _) = engine_with(birthday());
        // Puzzle 0 is the "sunset" one.
        let slot = slot_of(&engine, 0);

        engine.open(slot);
        assert_eq!(engine.snapshot().unwrap().active_slot, Some(slot));
        assert_eq!(
            engine.active_prompt(),
            Some("Ani originally bought the digi camera to take ____ pictures.")
        );

        engine.update_input("Sun Set");
        let outcome = engine.submit();
        assert_eq!(
            outcome,
            SubmitOutcome::Solved {
                slot,
                all_solved: false
            }
        );

        let state = state(&engine);
        assert!(state.tiles[slot].solved);
        assert_eq!(state.active_slot, None);
        assert_eq!(engine.active_prompt(), None);
        assert_eq!(engine.letter_for(slot), Some('S'));
    }

    #[test]
    fn test_wrong_answer_keeps_dialog_open() {
        let (mut engine, _) = engine_with(birthday());
        let slot = slot_of(&engine, 0);

        engine.open(slot);
        engine.update_input("wrongtext");
        assert_eq!(engine.submit(), SubmitOutcome::Wrong { slot });

        let state = state(&engine);
        assert!(state.tiles[slot].wrong);
        assert!(!state.tiles[slot].solved);
        assert!(state.tiles[slot].shows_wrong());
        assert_eq!(state.active_slot, Some(slot));
        assert_eq!(state.input, "wrongtext");

        // The user may try again without reopening.
        engine.update_input("sunset");
        assert!(matches!(engine.submit(), SubmitOutcome::Solved { .. }));
        let tile = engine.snapshot().unwrap().tiles[slot];
        assert!(tile.solved);
        assert!(!tile.shows_wrong());
    }

    #[test]
    fn test_reopen_after_wrong_clears_wrong() {
        let (mut engine, _) = engine_with(birthday());
        let slot = slot_of(&engine, 3);

        engine.open(slot);
        engine.update_input("taxi");
        engine.submit();
        engine.close();
        assert!(state(&engine).tiles[slot].wrong);

        engine.open(slot);
        let state = state(&engine);
        assert!(!state.tiles[slot].wrong);
        assert!(!state.tiles[slot].solved);
        assert_eq!(state.input, "");
        assert_eq!(state.active_slot, Some(slot));
    }

    #[test]
    fn test_open_solved_tile_is_noop() {
        let (mut engine, _) = engine_with(birthday());
        solve_slot(&mut engine, 4);
        let before = state(&engine);

        engine.open(4);
        assert_eq!(state(&engine), before);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut engine, _) = engine_with(birthday());
        let before = state(&engine);
        engine.close();
        engine.close();
        assert_eq!(state(&engine), before);

        engine.open(2);
        engine.update_input("half an answer");
        engine.close();
        let state = state(&engine);
        assert_eq!(state.active_slot, None);
        assert_eq!(state.tiles, before.tiles);
    }

    #[test]
    fn test_submit_without_open_is_noop() {
        let (mut engine, _) = engine_with(birthday());
        let before = state(&engine);
        assert_eq!(engine.submit(), SubmitOutcome::NoActiveSlot);
        engine.update_input("sunset");
        assert_eq!(state(&engine), before);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_open_out_of_range_panics() {
        let (mut engine, _) = engine_with(birthday());
        engine.open(9);
    }

    #[test]
    #[should_panic(expected = "not a permutation")]
    fn test_with_order_rejects_bad_order() {
        TestEngine::with_order(birthday(), ManualScheduler::new(), vec![0, 0, 1]);
    }

    #[test]
    fn test_reorder_then_reveal() {
        let (mut engine, scheduler) = engine_with(birthday());
        let shuffled = state(&engine).display_order;

        // Some time passes before the last tile is solved.
        solve_all_but_last(&mut engine);
        scheduler.advance(Duration::from_secs(3));
        assert!(!engine.is_armed());
        let outcome = solve_slot(&mut engine, 8);
        assert_eq!(
            outcome,
            SubmitOutcome::Solved {
                slot: 8,
                all_solved: true
            }
        );
        assert!(engine.is_armed());
        assert_eq!(scheduler.pending(), 2);
        let expected = if order::is_identity(&shuffled) {
            Phase::Reordering
        } else {
            Phase::AllSolved
        };
        assert_eq!(engine.phase(), Some(expected));

        scheduler.advance(Duration::from_millis(399));
        assert_eq!(state(&engine).display_order, shuffled);

        scheduler.advance(Duration::from_millis(1));
        assert_eq!(state(&engine).display_order, order::collapse(9));
        assert_eq!(engine.phase(), Some(Phase::Reordering));
        assert!(!state(&engine).revealed);

        // D2 counts from the all-solved instant, not from the reorder.
        scheduler.advance(Duration::from_millis(9_599));
        assert!(!state(&engine).revealed);
        scheduler.advance(Duration::from_millis(1));
        assert!(state(&engine).revealed);
        assert_eq!(engine.phase(), Some(Phase::Revealed));
        assert_eq!(scheduler.pending(), 0);

        // Letters now read in original order.
        let letters: String = (0..9).filter_map(|slot| engine.letter_for(slot)).collect();
        assert_eq!(letters, engine.config().secret_message());
    }

    fn solve_all_but_last(engine: &mut TestEngine) {
        for slot in 0..8 {
            solve_slot(engine, slot);
        }
    }

    #[test]
    fn test_dispose_before_reveal_prevents_it() {
        let (mut engine, scheduler) = engine_with(birthday());
        solve_all(&mut engine);
        scheduler.advance(Duration::from_millis(500));
        assert_eq!(state(&engine).display_order, order::collapse(9));

        engine.dispose();
        assert_eq!(scheduler.pending(), 0);
        scheduler.advance(Duration::from_secs(60));
        assert!(!state(&engine).revealed);

        // Commands after disposal do nothing.
        engine.open(0);
        assert_eq!(state(&engine).active_slot, None);
    }

    #[test]
    fn test_drop_cancels_timers() {
        let (mut engine, scheduler) = engine_with(birthday());
        solve_all(&mut engine);
        let store = engine.store().clone();
        let shuffled = store.borrow().display_order.clone();

        drop(engine);
        assert_eq!(scheduler.pending(), 0);
        scheduler.advance(Duration::from_secs(60));
        assert_eq!(store.borrow().display_order, shuffled);
        assert!(!store.borrow().revealed);
    }

    #[test]
    fn test_timers_armed_once() {
        let (mut engine, scheduler) = engine_with(birthday());
        solve_all(&mut engine);
        assert_eq!(scheduler.pending(), 2);

        // Nothing can be opened or solved any more, so nothing re-arms.
        for slot in 0..9 {
            engine.open(slot);
            assert_eq!(engine.submit(), SubmitOutcome::NoActiveSlot);
        }
        assert_eq!(scheduler.pending(), 2);
    }

    #[test]
    fn test_exact_policy_deployment() {
        let config = Arc::new(GateConfig::builtin("anniversary").expect("anniversary should load"));
        let (mut engine, scheduler) = engine_with(config);
        let slot = slot_of(&engine, 0);

        engine.open(slot);
        engine.update_input("f.");
        assert_eq!(engine.submit(), SubmitOutcome::Wrong { slot });
        engine.update_input("f");
        assert!(matches!(engine.submit(), SubmitOutcome::Solved { .. }));

        solve_all(&mut engine);
        scheduler.advance(Duration::from_secs(5));
        assert!(state(&engine).revealed);
        assert_eq!(engine.config().secret_message(), "FOREVER");
    }

    #[test]
    fn test_manual_scheduler_runs_in_due_order() {
        let scheduler = ManualScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let push = |label: &'static str| {
            let log = Rc::clone(&log);
            Box::new(move || log.borrow_mut().push(label)) as Box<dyn FnOnce()>
        };
        let _late = scheduler.schedule(Duration::from_millis(20), push("late"));
        let _early = scheduler.schedule(Duration::from_millis(10), push("early"));
        let cancelled = scheduler.schedule(Duration::from_millis(15), push("cancelled"));
        cancelled.cancel();

        scheduler.advance(Duration::from_millis(5));
        assert!(log.borrow().is_empty());
        scheduler.advance(Duration::from_millis(100));
        assert_eq!(*log.borrow(), vec!["early", "late"]);
        assert_eq!(scheduler.now(), Duration::from_millis(105));
    }
}
