use std::cell::Cell;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};
use tracing::debug;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum TimerEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<TimerEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if tx.send(TimerEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(TimerEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<TimerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TimerEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time.
///
/// Ticks for the armed ticker fall due on a fixed schedule. Events that arrive
/// in between are handed out first but never push the next tick back.
pub struct Runner<E: EventSource> {
    event_source: E,
    idle_interval: Duration,
    // (generation, instant) of the next tick owed to the armed ticker
    next_tick: Cell<Option<(u64, Instant)>>,
}

impl<E: EventSource> Runner<E> {
    /// `idle_interval` bounds the wait when no ticker is armed, so the UI
    /// still redraws occasionally.
    pub fn new(event_source: E, idle_interval: Duration) -> Self {
        Self {
            event_source,
            idle_interval,
            next_tick: Cell::new(None),
        }
    }

    /// Returns the next event, or Tick once the armed ticker is due
    pub fn step(&self, armed: Option<TickerHandle>) -> TimerEvent {
        let Some(handle) = armed else {
            self.next_tick.set(None);
            let deadline = Instant::now() + self.idle_interval;
            return self.wait_until(deadline).unwrap_or(TimerEvent::Tick);
        };

        let now = Instant::now();
        let due = match self.next_tick.get() {
            Some((generation, at)) if generation == handle.generation => at,
            _ => now + handle.interval,
        };
        if now >= due {
            // behind schedule: tick now, then restart the cadence
            self.next_tick.set(Some((handle.generation, now + handle.interval)));
            return TimerEvent::Tick;
        }

        self.next_tick.set(Some((handle.generation, due)));
        match self.wait_until(due) {
            Some(ev) => ev,
            None => {
                self.next_tick
                    .set(Some((handle.generation, due + handle.interval)));
                TimerEvent::Tick
            }
        }
    }

    fn wait_until(&self, deadline: Instant) -> Option<TimerEvent> {
        let timeout = deadline.saturating_duration_since(Instant::now());
        match self.event_source.recv_timeout(timeout) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                // no more input; still honour the tick cadence
                thread::sleep(deadline.saturating_duration_since(Instant::now()));
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    Inspection,
    Solving,
}

/// Identifies one armed periodic ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerHandle {
    pub phase: TickPhase,
    pub interval: Duration,
    pub generation: u64,
}

/// Holds at most one armed ticker. Arming always cancels the previous one
/// first, so two phases never tick at once.
#[derive(Debug, Default)]
pub struct TickerSlot {
    armed: Option<TickerHandle>,
    generation: u64,
}

impl TickerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, phase: TickPhase, interval: Duration) -> TickerHandle {
        self.cancel();
        self.generation += 1;
        let handle = TickerHandle {
            phase,
            interval,
            generation: self.generation,
        };
        debug!(?phase, generation = handle.generation, "ticker armed");
        self.armed = Some(handle);
        handle
    }

    pub fn cancel(&mut self) -> Option<TickerHandle> {
        let cancelled = self.armed.take();
        if let Some(handle) = cancelled {
            debug!(phase = ?handle.phase, generation = handle.generation, "ticker cancelled");
        }
        cancelled
    }

    pub fn armed(&self) -> Option<TickerHandle> {
        self.armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let es = TestEventSource::new(rx);
        let runner = Runner::new(es, Duration::from_millis(1));

        // With no events available, step should yield Tick
        let ev = runner.step(None);
        match ev {
            TimerEvent::Tick => {}
            _ => panic!("expected Tick on timeout"),
        }
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(TimerEvent::Resize).unwrap();
        let es = TestEventSource::new(rx);
        let runner = Runner::new(es, Duration::from_millis(10));

        let mut slot = TickerSlot::new();
        let handle = slot.arm(TickPhase::Inspection, Duration::from_millis(10));
        match runner.step(Some(handle)) {
            TimerEvent::Resize => {}
            _ => panic!("expected Resize event"),
        }
    }

    #[test]
    fn queued_events_do_not_delay_a_due_tick() {
        let (tx, rx) = mpsc::channel();
        for _ in 0..10 {
            tx.send(TimerEvent::Resize).unwrap();
        }
        let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(250));
        let mut slot = TickerSlot::new();
        let handle = slot.arm(TickPhase::Inspection, Duration::from_millis(20));

        assert!(matches!(runner.step(Some(handle)), TimerEvent::Resize));
        std::thread::sleep(Duration::from_millis(30));
        assert!(matches!(runner.step(Some(handle)), TimerEvent::Tick));
        // the backlog is still there for the following steps
        assert!(matches!(runner.step(Some(handle)), TimerEvent::Resize));
    }

    #[test]
    fn rearming_starts_a_fresh_schedule() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(250));
        let mut slot = TickerSlot::new();

        let slow = slot.arm(TickPhase::Inspection, Duration::from_millis(200));
        let fast = slot.arm(TickPhase::Solving, Duration::from_millis(5));
        let started = Instant::now();
        assert!(matches!(runner.step(Some(fast)), TimerEvent::Tick));
        assert!(started.elapsed() < Duration::from_millis(150));
        assert!(slow.generation < fast.generation);
    }

    #[test]
    fn arming_replaces_previous_ticker() {
        let mut slot = TickerSlot::new();
        let first = slot.arm(TickPhase::Inspection, Duration::from_millis(100));
        let second = slot.arm(TickPhase::Solving, Duration::from_millis(10));

        assert_eq!(slot.armed(), Some(second));
        assert_ne!(slot.armed(), Some(first));
        assert_eq!(slot.armed().map(|h| h.phase), Some(TickPhase::Solving));
        assert!(second.generation > first.generation);
    }

    #[test]
    fn cancel_clears_the_slot() {
        let mut slot = TickerSlot::new();
        assert_eq!(slot.cancel(), None);
        let handle = slot.arm(TickPhase::Inspection, Duration::from_millis(100));
        assert_eq!(slot.cancel(), Some(handle));
        assert_eq!(slot.armed(), None);
    }
}
