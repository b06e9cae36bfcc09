use crate::clock::TimeSource;
use crate::notify::{Notifier, Signal};
use crate::runtime::{TickPhase, TickerHandle, TickerSlot};
use crate::scramble::{ParseMoveError, Scramble};
use crate::stats::SessionStats;
use crate::store::SolveStore;
use crate::util::format_time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Inspection ticks inside this many remaining milliseconds raise a warning
pub const WARNING_WINDOW_MS: u64 = 3000;

/// One recorded solve.
///
/// The scramble is kept as recorded text so a history written with notation
/// this build does not parse still loads; `moves` parses it on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solve {
    #[serde(rename = "duration", alias = "time", deserialize_with = "whole_millis")]
    pub duration_ms: u64,
    pub scramble: String,
    #[serde(alias = "date")]
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "dnf")]
    pub not_finished: bool,
}

impl Solve {
    pub fn new(duration_ms: u64, scramble: Scramble, created_at: DateTime<Utc>) -> Self {
        Self {
            duration_ms,
            scramble: scramble.to_string(),
            created_at,
            not_finished: false,
        }
    }

    pub fn moves(&self) -> Result<Scramble, ParseMoveError> {
        self.scramble.parse()
    }
}

// older histories stored fractional milliseconds
fn whole_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Whole(u64),
        Fractional(f64),
    }

    Ok(match Millis::deserialize(deserializer)? {
        Millis::Whole(ms) => ms,
        Millis::Fractional(ms) => ms.max(0.0).trunc() as u64,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TimerState {
    Ready,
    Inspecting,
    Solving,
    Complete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub inspection_ms: u64,
    pub inspection_tick: Duration,
    pub solving_tick: Duration,
    pub live_window: usize,
    pub history_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inspection_ms: 15_000,
            inspection_tick: Duration::from_millis(100),
            solving_tick: Duration::from_millis(10),
            live_window: 50,
            history_limit: 1000,
        }
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No ticker armed
    Idle,
    Inspecting { remaining_ms: u64, warning: bool },
    /// Inspection ran out and solving started on this tick
    InspectionElapsed,
    Solving { elapsed_ms: u64 },
}

/// Timer state machine plus solve history.
///
/// The driving layer owns the session, forwards user actions (`toggle`,
/// `start`, `stop`, `reset`) and calls `tick` at the armed ticker's interval.
pub struct SolveSession<C: TimeSource, S: SolveStore, N: Notifier> {
    config: SessionConfig,
    clock: C,
    store: S,
    notifier: N,
    state: TimerState,
    ticker: TickerSlot,
    inspection_started_at: Option<u64>,
    solve_started_at: Option<u64>,
    elapsed_ms: u64,
    scramble: Scramble,
    // scramble shown when the current cycle began
    active_scramble: Option<Scramble>,
    history: Vec<Solve>,
    live: Vec<Solve>,
    stats: SessionStats,
}

impl<C: TimeSource, S: SolveStore, N: Notifier> SolveSession<C, S, N> {
    pub fn new(
        config: SessionConfig,
        clock: C,
        store: S,
        mut notifier: N,
        scramble: Scramble,
    ) -> Self {
        let mut history = match store.load() {
            Ok(solves) => solves,
            Err(err) => {
                warn!(%err, "could not load solve history, starting empty");
                notifier.signal(Signal::StorageWarning(format!("could not load history: {err}")));
                Vec::new()
            }
        };
        keep_tail(&mut history, config.history_limit);

        let mut live = history.clone();
        keep_tail(&mut live, config.live_window);
        let stats = SessionStats::compute(&live);
        info!(history = history.len(), live = live.len(), "session started");

        Self {
            config,
            clock,
            store,
            notifier,
            state: TimerState::Ready,
            ticker: TickerSlot::new(),
            inspection_started_at: None,
            solve_started_at: None,
            elapsed_ms: 0,
            scramble,
            active_scramble: None,
            history,
            live,
            stats,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn history(&self) -> &[Solve] {
        &self.history
    }

    pub fn live_window(&self) -> &[Solve] {
        &self.live
    }

    pub fn scramble(&self) -> &Scramble {
        &self.scramble
    }

    /// Replaces the displayed scramble. A cycle already under way keeps the
    /// scramble it started with.
    pub fn set_scramble(&mut self, scramble: Scramble) {
        self.scramble = scramble;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    /// The armed ticker, if any. Drivers call `tick` every `interval`.
    pub fn ticker(&self) -> Option<TickerHandle> {
        self.ticker.armed()
    }

    /// Solve time to display: live while solving, final once complete
    pub fn elapsed_ms(&self) -> u64 {
        match (self.state, self.solve_started_at) {
            (TimerState::Solving, Some(start)) => self.clock.now_ms().saturating_sub(start),
            _ => self.elapsed_ms,
        }
    }

    pub fn display(&self) -> String {
        format_time(self.elapsed_ms())
    }

    pub fn inspection_remaining_ms(&self) -> Option<u64> {
        match (self.state, self.inspection_started_at) {
            (TimerState::Inspecting, Some(start)) => {
                let elapsed = self.clock.now_ms().saturating_sub(start);
                Some(self.config.inspection_ms.saturating_sub(elapsed))
            }
            _ => None,
        }
    }

    /// Space-bar semantics: start inspection, end it early, or stop the solve
    pub fn toggle(&mut self) -> TimerState {
        match self.state {
            TimerState::Solving => {
                self.stop();
            }
            _ => {
                self.start();
            }
        }
        self.state
    }

    /// Ready/Complete begin inspection, Inspecting begins solving. No effect while solving.
    pub fn start(&mut self) -> TimerState {
        match self.state {
            TimerState::Ready | TimerState::Complete => self.begin_inspection(),
            TimerState::Inspecting => self.begin_solving(),
            TimerState::Solving => {}
        }
        self.state
    }

    /// Commits the running solve. Returns `None` unless a solve was running.
    pub fn stop(&mut self) -> Option<&Solve> {
        if self.state != TimerState::Solving {
            return None;
        }
        self.ticker.cancel();

        let start = self.solve_started_at.take().unwrap_or_else(|| self.clock.now_ms());
        self.elapsed_ms = self.clock.now_ms().saturating_sub(start);
        let scramble = self
            .active_scramble
            .take()
            .unwrap_or_else(|| self.scramble.clone());
        let solve = Solve::new(self.elapsed_ms, scramble, self.clock.wall_clock());

        self.transition(TimerState::Complete);
        self.record(solve);
        self.history.last()
    }

    /// Back to Ready from anywhere. Recorded solves are kept.
    pub fn reset(&mut self) {
        self.ticker.cancel();
        self.inspection_started_at = None;
        self.solve_started_at = None;
        self.active_scramble = None;
        self.elapsed_ms = 0;
        self.transition(TimerState::Ready);
    }

    /// Advances whichever phase has its ticker armed
    pub fn tick(&mut self) -> TickOutcome {
        let Some(handle) = self.ticker.armed() else {
            return TickOutcome::Idle;
        };

        match handle.phase {
            TickPhase::Inspection => {
                let remaining_ms = self.inspection_remaining_ms().unwrap_or(0);
                if remaining_ms == 0 {
                    self.begin_solving();
                    return TickOutcome::InspectionElapsed;
                }
                let warning = remaining_ms <= WARNING_WINDOW_MS;
                if warning {
                    self.notifier.signal(Signal::InspectionWarning);
                }
                TickOutcome::Inspecting {
                    remaining_ms,
                    warning,
                }
            }
            TickPhase::Solving => {
                self.elapsed_ms = self.elapsed_ms();
                TickOutcome::Solving {
                    elapsed_ms: self.elapsed_ms,
                }
            }
        }
    }

    fn begin_inspection(&mut self) {
        self.elapsed_ms = 0;
        self.solve_started_at = None;
        self.active_scramble = Some(self.scramble.clone());
        self.inspection_started_at = Some(self.clock.now_ms());
        self.ticker.arm(TickPhase::Inspection, self.config.inspection_tick);
        self.transition(TimerState::Inspecting);
    }

    fn begin_solving(&mut self) {
        self.inspection_started_at = None;
        self.elapsed_ms = 0;
        self.solve_started_at = Some(self.clock.now_ms());
        self.ticker.arm(TickPhase::Solving, self.config.solving_tick);
        self.transition(TimerState::Solving);
    }

    fn transition(&mut self, next: TimerState) {
        debug!(from = %self.state, to = %next, "timer transition");
        self.state = next;
    }

    fn record(&mut self, solve: Solve) {
        info!(
            duration_ms = solve.duration_ms,
            time = %format_time(solve.duration_ms),
            "solve recorded"
        );

        self.history.push(solve.clone());
        keep_tail(&mut self.history, self.config.history_limit);
        self.live.push(solve);
        keep_tail(&mut self.live, self.config.live_window);
        self.stats = SessionStats::compute(&self.live);

        if let Err(err) = self.store.save(&self.history) {
            warn!(%err, "could not save solve history");
            self.notifier
                .signal(Signal::StorageWarning(format!("could not save history: {err}")));
        }
    }
}

/// Drops the oldest entries so at most `limit` remain
fn keep_tail<T>(items: &mut Vec<T>, limit: usize) {
    if items.len() > limit {
        let excess = items.len() - limit;
        items.drain(..excess);
    }
}
