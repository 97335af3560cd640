//! Progress tracking of a training run, with event listeners.

use std::{
    fmt,
    ops::{BitOr, BitOrAssign},
    time::{Duration, Instant},
};

use log::{debug, info};

use crate::err::NeuraConfigErr;

/// Set of statistics events, used both to describe what happened and to subscribe to events
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NeuraEvent(u8);

impl NeuraEvent {
    pub const NONE: Self = Self(0);
    pub const ERROR: Self = Self(1);
    pub const ITERATION: Self = Self(1 << 1);
    pub const BEST_ERROR: Self = Self(1 << 2);
    pub const FINISH: Self = Self(1 << 3);
    pub const START: Self = Self(1 << 4);
    pub const ALL: Self = Self(0b11111);

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if every event of `other` is also in `self`
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for NeuraEvent {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for NeuraEvent {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for NeuraEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::ERROR, "ERROR"),
            (Self::ITERATION, "ITERATION"),
            (Self::BEST_ERROR, "BEST_ERROR"),
            (Self::FINISH, "FINISH"),
            (Self::START, "START"),
        ];

        let mut list = f.debug_set();
        for (event, name) in names {
            if self.contains(event) {
                list.entry(&format_args!("{}", name));
            }
        }
        list.finish()
    }
}

/// Observable state of a training run
#[derive(Clone, Debug, Default)]
pub struct NeuraRunState {
    iteration: usize,
    error: f64,
    best_error: Option<f64>,
    start: Option<Instant>,
    finish: Option<Instant>,
}

impl NeuraRunState {
    /// Number of completed iterations
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    /// Lowest error seen since the start of the run, `f64::INFINITY` if no error was reported yet
    pub fn best_error(&self) -> f64 {
        self.best_error.unwrap_or(f64::INFINITY)
    }

    /// Time spent between the start and the end of the run, or since the start if the run is still going
    pub fn elapsed(&self) -> Duration {
        match (self.start, self.finish) {
            (Some(start), Some(finish)) => finish.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }
}

pub trait NeuraStatisticsListener {
    fn update(&mut self, state: &NeuraRunState, event: NeuraEvent);
}

impl<F: FnMut(&NeuraRunState, NeuraEvent)> NeuraStatisticsListener for F {
    fn update(&mut self, state: &NeuraRunState, event: NeuraEvent) {
        (self)(state, event)
    }
}

/// Tracks the iteration count, the current and best error, and the duration of a training run,
/// and notifies its listeners of every change they subscribed to.
#[derive(Default)]
pub struct NeuraStatistics {
    state: NeuraRunState,
    listeners: Vec<(Box<dyn NeuraStatisticsListener>, NeuraEvent)>,
}

impl NeuraStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for the events in `mask`
    pub fn add_listener(&mut self, listener: impl NeuraStatisticsListener + 'static, mask: NeuraEvent) {
        self.listeners.push((Box::new(listener), mask));
    }

    pub fn state(&self) -> &NeuraRunState {
        &self.state
    }

    pub fn iteration(&self) -> usize {
        self.state.iteration
    }

    pub fn error(&self) -> f64 {
        self.state.error
    }

    pub fn best_error(&self) -> f64 {
        self.state.best_error()
    }

    /// Resets the state of the run and emits `START`
    pub fn start(&mut self) {
        self.state = NeuraRunState {
            start: Some(Instant::now()),
            ..Default::default()
        };
        self.emit(NeuraEvent::START);
    }

    /// Records a new error, emits `ERROR`, then `BEST_ERROR` if it is strictly lower than the best error so far
    pub fn set_error(&mut self, error: f64) {
        self.state.error = error;
        self.emit(NeuraEvent::ERROR);

        if error < self.state.best_error() {
            self.state.best_error = Some(error);
            self.emit(NeuraEvent::BEST_ERROR);
        }
    }

    pub fn increment_iteration(&mut self) {
        self.state.iteration += 1;
        self.emit(NeuraEvent::ITERATION);
    }

    pub fn finish(&mut self) {
        self.state.finish = Some(Instant::now());
        self.emit(NeuraEvent::FINISH);
    }

    fn emit(&mut self, event: NeuraEvent) {
        for (listener, mask) in self.listeners.iter_mut() {
            if mask.intersects(event) {
                listener.update(&self.state, event);
            }
        }
    }
}

impl fmt::Debug for NeuraStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeuraStatistics")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Logs the progress of a run every `interval` iterations
#[derive(Clone, Debug)]
pub struct NeuraLogListener {
    interval: usize,
}

impl NeuraLogListener {
    pub fn new(interval: usize) -> Result<Self, NeuraConfigErr> {
        if interval == 0 {
            return Err(NeuraConfigErr::ZeroLogInterval);
        }

        Ok(Self { interval })
    }

    pub fn interval(&self) -> usize {
        self.interval
    }
}

impl NeuraStatisticsListener for NeuraLogListener {
    fn update(&mut self, state: &NeuraRunState, event: NeuraEvent) {
        if event.contains(NeuraEvent::START) {
            info!("Training started");
        } else if event.contains(NeuraEvent::FINISH) {
            info!(
                "Training finished: {} iterations in {:.3}s, best error {:.6e}",
                state.iteration(),
                state.elapsed().as_secs_f64(),
                state.best_error()
            );
        } else if state.iteration() % self.interval != 0 {
            return;
        } else if event.contains(NeuraEvent::ITERATION) {
            info!(
                "Iteration {}: error {:.6e}",
                state.iteration(),
                state.error()
            );
        } else if event.contains(NeuraEvent::BEST_ERROR) {
            debug!("New best error: {:.6e}", state.best_error());
        }
    }
}

#[cfg(test)]
mod test {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    fn recorder(statistics: &mut NeuraStatistics, mask: NeuraEvent) -> Rc<RefCell<Vec<NeuraEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        statistics.add_listener(
            move |_: &NeuraRunState, event: NeuraEvent| sink.borrow_mut().push(event),
            mask,
        );
        events
    }

    #[test]
    fn test_mask() {
        let mask = NeuraEvent::ERROR | NeuraEvent::FINISH;

        assert!(mask.contains(NeuraEvent::ERROR));
        assert!(!mask.contains(NeuraEvent::ITERATION));
        assert!(NeuraEvent::ALL.contains(mask));
        assert_eq!(NeuraEvent::ALL.bits(), 31);
        assert_eq!(NeuraEvent::default(), NeuraEvent::NONE);
        assert!(mask.contains(NeuraEvent::NONE));
        assert!(!NeuraEvent::ALL.intersects(NeuraEvent::NONE));
        assert_eq!(format!("{:?}", mask), "{ERROR, FINISH}");
    }

    #[test]
    fn test_event_order() {
        let mut statistics = NeuraStatistics::new();
        let events = recorder(&mut statistics, NeuraEvent::ALL);

        statistics.start();
        statistics.set_error(1.0);
        statistics.set_error(0.5);
        statistics.increment_iteration();
        statistics.set_error(0.7);
        statistics.increment_iteration();
        statistics.finish();

        assert_eq!(
            *events.borrow(),
            vec![
                NeuraEvent::START,
                NeuraEvent::ERROR,
                NeuraEvent::BEST_ERROR,
                NeuraEvent::ERROR,
                NeuraEvent::BEST_ERROR,
                NeuraEvent::ITERATION,
                NeuraEvent::ERROR,
                NeuraEvent::ITERATION,
                NeuraEvent::FINISH,
            ]
        );
        assert_eq!(statistics.iteration(), 2);
        assert_eq!(statistics.error(), 0.7);
        assert_eq!(statistics.best_error(), 0.5);
    }

    #[test]
    fn test_filtering() {
        let mut statistics = NeuraStatistics::new();
        let best = recorder(&mut statistics, NeuraEvent::BEST_ERROR);
        let bounds = recorder(&mut statistics, NeuraEvent::START | NeuraEvent::FINISH);
        let silent = recorder(&mut statistics, NeuraEvent::NONE);

        statistics.start();
        statistics.set_error(2.0);
        statistics.set_error(2.0);
        statistics.set_error(1.0);
        statistics.finish();

        assert_eq!(best.borrow().len(), 2);
        assert_eq!(*bounds.borrow(), vec![NeuraEvent::START, NeuraEvent::FINISH]);
        assert!(silent.borrow().is_empty());
    }

    #[test]
    fn test_start_resets() {
        let mut statistics = NeuraStatistics::new();
        statistics.start();
        statistics.set_error(0.1);
        statistics.increment_iteration();

        statistics.start();
        assert_eq!(statistics.iteration(), 0);
        assert_eq!(statistics.best_error(), f64::INFINITY);
    }

    #[test]
    fn test_log_listener() {
        assert_eq!(
            NeuraLogListener::new(0).unwrap_err(),
            NeuraConfigErr::ZeroLogInterval
        );

        let mut statistics = NeuraStatistics::new();
        statistics.add_listener(NeuraLogListener::new(2).unwrap(), NeuraEvent::ALL);
        statistics.start();
        statistics.set_error(1.0);
        statistics.increment_iteration();
        statistics.finish();
    }
}
