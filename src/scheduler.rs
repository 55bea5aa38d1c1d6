//! `Scheduler` — owns the event queue and the simulation clock.
//!
//! Two ways to drive it:
//!
//! - **Paced**: [`Scheduler::tick`] runs one cooperative pass that lets
//!   simulated time catch up with wall time at `simulation_rate` ticks per
//!   second, then tells the host how long to wait before the next pass.
//!   [`Scheduler::run`] wraps that in a blocking loop.
//! - **Deterministic**: [`Scheduler::step`], [`Scheduler::advance_to`] and
//!   [`Scheduler::run_until_steady`] ignore the wall clock entirely.
//!
//! Either way events are processed in `(when, group, order)` order, the
//! last event of each `(when, group)` batch is flagged, and follow-ups go
//! straight back into the queue.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, trace, warn};

use crate::circuit::Circuit;
use crate::config::{validate_housekeeping, validate_rate, SchedulerConfig};
use crate::error::{SimError, SimResult};
use crate::event::{Event, Group};
use crate::pacing::{SystemClock, WallClock};
use crate::queue::EventQueue;
use crate::time::SimTime;

/// Called with the clock value whenever the queue runs dry.
pub type SteadyStateFn = Box<dyn FnMut(SimTime)>;

// ── StopHandle ────────────────────────────────────────────────────────

/// A cloneable, thread-safe way to stop a running scheduler.
///
/// The stop takes effect at the scheduler's next yield point; events
/// already taken off the queue are processed to the end.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    /// Request a stop. Returns `false` if the scheduler was not running.
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

// ── Tick ──────────────────────────────────────────────────────────────

/// Outcome of one paced pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Events processed during the pass.
    pub processed: usize,
    /// How long the host should wait before the next pass.
    pub next_wake: Duration,
    /// Whether the queue was empty at the end of the pass.
    pub steady: bool,
}

// ── Scheduler ─────────────────────────────────────────────────────────

pub struct Scheduler {
    queue: EventQueue,
    clock: SimTime,
    /// Fractional ticks not yet added to the clock.
    carry: f64,
    active_group: Option<Group>,
    config: SchedulerConfig,
    running: Arc<AtomicBool>,
    /// Set when the queue head changed since the last pass.
    immediate: bool,
    steady: bool,
    next_wake: Duration,
    wall: Rc<dyn WallClock>,
    last_tick: Instant,
    events_processed: u64,
    steady_listeners: Vec<SteadyStateFn>,
}

impl Scheduler {
    /// A stopped scheduler at time zero, paced by the system clock.
    pub fn new(config: SchedulerConfig) -> SimResult<Self> {
        Self::with_wall_clock(config, Rc::new(SystemClock))
    }

    /// A stopped scheduler at time zero, paced by `wall`.
    pub fn with_wall_clock(config: SchedulerConfig, wall: Rc<dyn WallClock>) -> SimResult<Self> {
        config.validate()?;
        Ok(Self::build(config, wall))
    }

    fn build(config: SchedulerConfig, wall: Rc<dyn WallClock>) -> Self {
        let last_tick = wall.now();
        Scheduler {
            queue: EventQueue::new(),
            clock: SimTime::ZERO,
            carry: 0.0,
            active_group: None,
            config,
            running: Arc::new(AtomicBool::new(false)),
            immediate: false,
            steady: true,
            next_wake: config.housekeeping_interval,
            wall,
            last_tick,
            events_processed: 0,
            steady_listeners: Vec::new(),
        }
    }

    // ── Scheduling ────────────────────────────────────────────────

    /// Queue one event.
    ///
    /// If it becomes the new head of the queue the next pass is due
    /// immediately (see [`wake_delay`](Self::wake_delay)).
    pub fn schedule(&mut self, event: Event) {
        trace!(when = %event.when(), kind = %event.kind(), "scheduled");
        let order = self.queue.insert(event);
        if self.queue.peek_min().and_then(Event::order) == Some(order) {
            self.immediate = true;
        }
        self.steady = false;
    }

    /// Queue several events.
    pub fn schedule_many<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = Event>,
    {
        for event in events {
            self.schedule(event);
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────

    /// Start paced execution. Returns `false` if already running.
    pub fn start(&mut self) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("start ignored, scheduler already running");
            return false;
        }
        self.last_tick = self.wall.now();
        self.immediate = true;
        info!(clock = %self.clock, rate = self.config.simulation_rate, "scheduler started");
        true
    }

    /// Request a stop at the next yield point. Returns `false` if the
    /// scheduler was not running.
    pub fn stop(&mut self) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("stop ignored, scheduler not running");
            return false;
        }
        info!(clock = %self.clock, "scheduler stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// A handle that can stop this scheduler from callbacks or threads.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: Arc::clone(&self.running),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────

    /// Current simulated time.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// Group of the batch being (or last) processed.
    pub fn active_group(&self) -> Option<Group> {
        self.active_group
    }

    pub fn simulation_rate(&self) -> f64 {
        self.config.simulation_rate
    }

    /// Change the pacing rate. Negative and NaN rates are rejected.
    pub fn set_simulation_rate(&mut self, rate: f64) -> SimResult<()> {
        validate_rate(rate)?;
        debug!(rate, "simulation rate changed");
        self.config.simulation_rate = rate;
        self.immediate = true;
        Ok(())
    }

    pub fn housekeeping_interval(&self) -> Duration {
        self.config.housekeeping_interval
    }

    pub fn set_housekeeping_interval(&mut self, interval: Duration) -> SimResult<()> {
        validate_housekeeping(interval)?;
        self.config.housekeeping_interval = interval;
        Ok(())
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Whether no event is pending.
    pub fn is_steady_state(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Total events processed since creation.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// The next event due.
    pub fn peek_next(&self) -> Option<&Event> {
        self.queue.peek_min()
    }

    /// Register a callback for every transition into steady state.
    pub fn on_steady_state<F>(&mut self, listener: F)
    where
        F: FnMut(SimTime) + 'static,
    {
        self.steady_listeners.push(Box::new(listener));
    }

    /// How long the host should wait before the next [`tick`](Self::tick).
    pub fn wake_delay(&self) -> Duration {
        if self.immediate {
            Duration::ZERO
        } else {
            self.next_wake
        }
    }

    // ── Paced execution ───────────────────────────────────────────

    /// Run one paced pass.
    ///
    /// Advances the target time by `simulation_rate` times the wall time
    /// since the previous pass and processes every event due by then.
    /// Yields early once `housekeeping_interval` of wall time has been
    /// spent. Does nothing while the scheduler is stopped.
    #[instrument(skip_all, level = "trace")]
    pub fn tick(&mut self, circuit: &mut Circuit) -> Tick {
        self.immediate = false;
        if !self.is_running() {
            self.next_wake = self.config.housekeeping_interval;
            return Tick {
                processed: 0,
                next_wake: self.next_wake,
                steady: self.is_steady_state(),
            };
        }

        let now = self.wall.now();
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        let target = self.pacing_target(elapsed);
        let deadline = now + self.config.housekeeping_interval;

        let mut processed = 0;
        while self.is_running() {
            if !self.queue.peek_min().is_some_and(|e| e.when() <= target) {
                break;
            }
            self.process_next(circuit);
            processed += 1;
            if self.wall.now() >= deadline {
                break;
            }
        }
        if !self.queue.peek_min().is_some_and(|e| e.when() <= target) {
            self.clock = self.clock.max(target);
        }
        self.check_steady_state();

        self.next_wake = self.compute_next_wake();
        trace!(processed, clock = %self.clock, wake = ?self.next_wake, "pass finished");
        Tick {
            processed,
            next_wake: self.next_wake,
            steady: self.is_steady_state(),
        }
    }

    /// Start if needed, then tick and sleep until stopped.
    pub fn run(&mut self, circuit: &mut Circuit) {
        self.start();
        while self.is_running() {
            self.tick(circuit);
            if !self.is_running() {
                break;
            }
            std::thread::sleep(self.wake_delay());
        }
    }

    fn pacing_target(&mut self, elapsed: Duration) -> SimTime {
        let progress = self.config.simulation_rate * elapsed.as_secs_f64() + self.carry;
        if !progress.is_finite() {
            warn!(progress, "pacing progress not finite, carry reset");
            self.carry = 0.0;
            return self.clock;
        }
        let whole = progress.floor();
        self.carry = progress - whole;
        if whole >= u64::MAX as f64 {
            SimTime::MAX
        } else {
            self.clock.after(whole as u64)
        }
    }

    fn compute_next_wake(&self) -> Duration {
        let housekeeping = self.config.housekeeping_interval;
        let Some(next) = self.queue.peek_min() else {
            return housekeeping;
        };
        let Some(ticks) = next.when().duration_since(self.clock) else {
            return Duration::ZERO;
        };
        if ticks == 0 {
            return Duration::ZERO;
        }
        let rate = self.config.simulation_rate;
        if rate <= 0.0 {
            return housekeeping;
        }
        let secs = ((ticks as f64 - self.carry) / rate).max(0.0);
        if secs >= housekeeping.as_secs_f64() {
            housekeeping
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    // ── Deterministic execution ───────────────────────────────────

    /// Process exactly one event, regardless of the wall clock.
    ///
    /// Returns its timestamp, or `None` if the queue was empty.
    pub fn step(&mut self, circuit: &mut Circuit) -> Option<SimTime> {
        let when = self.process_next(circuit)?;
        self.check_steady_state();
        Some(when)
    }

    /// Process every event due at or before `target`, then move the clock
    /// to `target`. Returns the number of events processed.
    pub fn advance_to(&mut self, target: SimTime, circuit: &mut Circuit) -> usize {
        let mut processed = 0;
        while self.queue.peek_min().is_some_and(|e| e.when() <= target) {
            self.process_next(circuit);
            processed += 1;
        }
        self.clock = self.clock.max(target);
        self.check_steady_state();
        processed
    }

    /// Process events until the queue is empty.
    ///
    /// Fails with [`SimError::Unsettled`] once `limit` events have been
    /// processed and more are pending. Returns the time steady state was
    /// reached.
    pub fn run_until_steady(&mut self, circuit: &mut Circuit, limit: usize) -> SimResult<SimTime> {
        let mut processed = 0;
        while !self.queue.is_empty() {
            if processed == limit {
                return Err(SimError::Unsettled { limit });
            }
            self.process_next(circuit);
            processed += 1;
        }
        self.check_steady_state();
        Ok(self.clock)
    }

    // ── Internals ─────────────────────────────────────────────────

    /// Pop, process and requeue the follow-ups of the queue head.
    fn process_next(&mut self, circuit: &mut Circuit) -> Option<SimTime> {
        let event = self.queue.pop_min()?;
        let when = event.when();
        // An event scheduled in the past runs now; the clock never goes back.
        self.clock = self.clock.max(when);
        self.active_group = Some(event.group());
        let last = self
            .queue
            .peek_min()
            .map_or(true, |next| !event.same_batch(next));
        trace!(%when, kind = %event.kind(), last, "processing");

        let followups = event.process(last, circuit);
        for followup in followups {
            self.queue.insert(followup);
        }
        self.events_processed += 1;
        Some(when)
    }

    fn check_steady_state(&mut self) {
        if !self.queue.is_empty() {
            self.steady = false;
            return;
        }
        if self.steady {
            return;
        }
        self.steady = true;
        debug!(clock = %self.clock, "steady state reached");
        let clock = self.clock;
        for listener in &mut self.steady_listeners {
            listener(clock);
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::build(SchedulerConfig::default(), Rc::new(SystemClock))
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("clock", &self.clock)
            .field("pending", &self.queue.len())
            .field("running", &self.is_running())
            .field("config", &self.config)
            .field("events_processed", &self.events_processed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::component::{builtin, Component, ComponentId, Detached};
    use crate::pacing::ManualClock;

    fn t(ticks: u64) -> SimTime {
        SimTime::new(ticks)
    }

    fn paced(rate: f64) -> (Scheduler, Rc<ManualClock>) {
        let wall = Rc::new(ManualClock::new());
        let config = SchedulerConfig::default().with_rate(rate);
        let scheduler = Scheduler::with_wall_clock(config, wall.clone()).unwrap();
        (scheduler, wall)
    }

    #[test]
    fn test_start_stop_idempotent() {
        let mut scheduler = Scheduler::default();
        assert!(!scheduler.stop());
        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert!(scheduler.is_running());
        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        // Restart after stop.
        assert!(scheduler.start());
    }

    #[test]
    fn test_rejects_invalid_rate() {
        let mut scheduler = Scheduler::default();
        assert_eq!(
            scheduler.set_simulation_rate(-5.0),
            Err(SimError::InvalidSimulationRate(-5.0))
        );
        assert!(scheduler.set_simulation_rate(f64::NAN).is_err());
        assert_eq!(
            scheduler.set_simulation_rate(f64::INFINITY),
            Err(SimError::InvalidSimulationRate(f64::INFINITY))
        );
        assert_eq!(scheduler.simulation_rate(), 1000.0);
        assert!(scheduler.set_simulation_rate(0.0).is_ok());
        assert!(scheduler.set_housekeeping_interval(Duration::ZERO).is_err());
        assert!(Scheduler::new(SchedulerConfig::default().with_rate(-1.0)).is_err());
    }

    #[test]
    fn test_step_follows_total_order() {
        let mut scheduler = Scheduler::default();
        let mut circuit = Circuit::new();
        scheduler.schedule_many([
            Event::marker(t(30), 0),
            Event::marker(t(10), 1),
            Event::marker(t(10), 0),
            Event::marker(t(20), 0),
        ]);

        let mut seen = Vec::new();
        while let Some(when) = scheduler.step(&mut circuit) {
            seen.push((when, scheduler.active_group()));
        }
        assert_eq!(
            seen,
            vec![
                (t(10), Some(Group::Tag(0))),
                (t(10), Some(Group::Tag(1))),
                (t(20), Some(Group::Tag(0))),
                (t(30), Some(Group::Tag(0))),
            ]
        );
        assert_eq!(scheduler.clock(), t(30));
        assert!(scheduler.is_steady_state());
        assert_eq!(scheduler.events_processed(), 4);
    }

    #[test]
    fn test_schedule_requests_immediate_pass() {
        let (mut scheduler, _wall) = paced(1000.0);
        let mut circuit = Circuit::new();
        scheduler.start();
        scheduler.tick(&mut circuit);
        assert_eq!(scheduler.wake_delay(), Duration::from_millis(50));

        scheduler.schedule(Event::marker(t(100), 0));
        assert_eq!(scheduler.wake_delay(), Duration::ZERO);
        scheduler.tick(&mut circuit);

        // A later event does not displace the head.
        scheduler.schedule(Event::marker(t(200), 0));
        assert_ne!(scheduler.wake_delay(), Duration::ZERO);
    }

    #[test]
    fn test_tick_paces_clock_against_wall_time() {
        let (mut scheduler, wall) = paced(1000.0);
        let mut circuit = Circuit::new();
        scheduler.schedule_many([Event::marker(t(5), 0), Event::marker(t(50), 0)]);
        scheduler.start();

        wall.advance(Duration::from_millis(10));
        let tick = scheduler.tick(&mut circuit);
        assert_eq!(tick.processed, 1);
        assert_eq!(scheduler.clock(), t(10));
        assert!(!tick.steady);
        assert!((tick.next_wake.as_secs_f64() - 0.040).abs() < 1e-6);

        wall.advance(Duration::from_millis(40));
        let tick = scheduler.tick(&mut circuit);
        assert_eq!(tick.processed, 1);
        assert_eq!(scheduler.clock(), t(50));
        assert!(tick.steady);
        assert_eq!(tick.next_wake, Duration::from_millis(50));
    }

    #[test]
    fn test_fractional_rate_carries() {
        let (mut scheduler, wall) = paced(1.0);
        let mut circuit = Circuit::new();
        scheduler.start();
        wall.advance(Duration::from_millis(600));
        scheduler.tick(&mut circuit);
        assert_eq!(scheduler.clock(), t(0));
        wall.advance(Duration::from_millis(600));
        scheduler.tick(&mut circuit);
        assert_eq!(scheduler.clock(), t(1));
    }

    #[test]
    fn test_infinite_rate_rejected_and_pacing_continues() {
        let (mut scheduler, wall) = paced(1000.0);
        let mut circuit = Circuit::new();
        assert!(scheduler.set_simulation_rate(f64::INFINITY).is_err());
        scheduler.start();
        scheduler.tick(&mut circuit);

        scheduler.schedule(Event::marker(t(5), 0));
        wall.advance(Duration::from_millis(10));
        let tick = scheduler.tick(&mut circuit);
        assert_eq!(tick.processed, 1);
        assert_eq!(scheduler.clock(), t(10));
    }

    #[test]
    fn test_clock_reaches_target_when_deadline_hits_last_event() {
        let (mut scheduler, wall) = paced(1000.0);
        let mut circuit = Circuit::new();
        let slow = Rc::clone(&wall);
        scheduler.schedule(Event::action(t(1), move |_| {
            // Overruns the housekeeping interval.
            slow.advance(Duration::from_millis(100));
            Vec::new()
        }));
        scheduler.start();

        wall.advance(Duration::from_millis(10));
        let tick = scheduler.tick(&mut circuit);
        assert_eq!(tick.processed, 1);
        assert_eq!(scheduler.clock(), t(10));
        assert!(tick.steady);
    }

    #[test]
    fn test_zero_rate_pauses_time() {
        let (mut scheduler, wall) = paced(0.0);
        let mut circuit = Circuit::new();
        scheduler.schedule(Event::marker(t(1), 0));
        scheduler.start();
        wall.advance(Duration::from_secs(5));
        let tick = scheduler.tick(&mut circuit);
        assert_eq!(tick.processed, 0);
        assert_eq!(scheduler.clock(), t(0));
        assert_eq!(tick.next_wake, Duration::from_millis(50));
    }

    #[test]
    fn test_tick_does_nothing_while_stopped() {
        let (mut scheduler, wall) = paced(1000.0);
        let mut circuit = Circuit::new();
        scheduler.schedule(Event::marker(t(0), 0));
        wall.advance(Duration::from_millis(10));
        let tick = scheduler.tick(&mut circuit);
        assert_eq!(tick.processed, 0);
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn test_stop_from_action_ends_pass() {
        let (mut scheduler, wall) = paced(1000.0);
        let mut circuit = Circuit::new();
        let handle = scheduler.stop_handle();
        scheduler.schedule(Event::action(t(1), move |_| {
            handle.stop();
            Vec::new()
        }));
        scheduler.schedule(Event::marker(t(2), 0));
        scheduler.start();

        wall.advance(Duration::from_millis(100));
        let tick = scheduler.tick(&mut circuit);
        assert_eq!(tick.processed, 1);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(scheduler.clock(), t(1));
    }

    #[test]
    fn test_run_returns_once_stopped() {
        let mut scheduler = Scheduler::default();
        let mut circuit = Circuit::new();
        let handle = scheduler.stop_handle();
        scheduler.schedule(Event::action(t(0), move |_| {
            handle.stop();
            Vec::new()
        }));
        scheduler.run(&mut circuit);
        assert!(!scheduler.is_running());
        assert!(scheduler.is_steady_state());
    }

    #[test]
    fn test_steady_state_listener_fires_per_transition() {
        let mut scheduler = Scheduler::default();
        let mut circuit = Circuit::new();
        let hits = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&hits);
        scheduler.on_steady_state(move |at| sink.borrow_mut().push(at));

        scheduler.schedule_many([Event::marker(t(3), 0), Event::marker(t(4), 0)]);
        scheduler.run_until_steady(&mut circuit, 10).unwrap();
        scheduler.run_until_steady(&mut circuit, 10).unwrap();
        scheduler.schedule(Event::marker(t(9), 0));
        scheduler.advance_to(t(20), &mut circuit);

        assert_eq!(*hits.borrow(), vec![t(4), t(20)]);
    }

    #[test]
    fn test_advance_to_stops_at_target() {
        let mut scheduler = Scheduler::default();
        let mut circuit = Circuit::new();
        scheduler.schedule_many([Event::marker(t(5), 0), Event::marker(t(15), 0)]);
        assert_eq!(scheduler.advance_to(t(10), &mut circuit), 1);
        assert_eq!(scheduler.clock(), t(10));
        assert_eq!(scheduler.peek_next().map(Event::when), Some(t(15)));
    }

    #[test]
    fn test_oscillator_never_settles() {
        let mut scheduler = Scheduler::default();
        let mut circuit = Circuit::new();
        let id = ComponentId::new(0);
        circuit
            .add(Component::new(id, &builtin::not(), Rc::new(Detached)))
            .unwrap();
        assert!(circuit.connect(id, 0, id, 0, 1).unwrap());
        scheduler.schedule(Event::clock_only(t(0), id));

        assert_eq!(
            scheduler.run_until_steady(&mut circuit, 100),
            Err(SimError::Unsettled { limit: 100 })
        );
        assert!(!scheduler.is_steady_state());
    }
}
