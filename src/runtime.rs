//! The event loop's plumbing: where input comes from and how much game time
//! each loop turn is worth.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

#[derive(Clone, Debug)]
pub enum HarkEvent {
    Key(KeyEvent),
    Resize,
    /// Nothing arrived within one frame interval
    Tick,
}

/// Source of terminal events
pub trait HarkEventSource: Send + 'static {
    /// Blocks for up to `timeout` waiting for an event
    fn recv_timeout(&self, timeout: Duration) -> Result<HarkEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a background thread
pub struct CrosstermEventSource {
    rx: Receiver<HarkEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // Key releases would count as a second selection on some terminals
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    Some(HarkEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => Some(HarkEvent::Resize),
                Ok(_) => None,
                Err(_) => break,
            };
            if let Some(ev) = forwarded {
                if tx.send(ev).is_err() {
                    break;
                }
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

impl HarkEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<HarkEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Events pushed through a channel, for headless drivers and tests
pub struct ChannelEventSource {
    rx: Receiver<HarkEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<HarkEvent>) -> Self {
        Self { rx }
    }
}

impl HarkEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<HarkEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// How much time passed since the previous frame
pub trait FrameClock {
    fn lap(&mut self) -> Duration;
}

/// Wall-clock time between laps
#[derive(Debug)]
pub struct Stopwatch {
    last: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            last: Instant::now(),
        }
    }
}

impl FrameClock for Stopwatch {
    fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        elapsed
    }
}

/// Every frame is worth the same fixed amount of game time
#[derive(Debug, Clone, Copy)]
pub struct FixedStepClock {
    step: Duration,
}

impl FixedStepClock {
    pub fn new(step: Duration) -> Self {
        Self { step }
    }
}

impl FrameClock for FixedStepClock {
    fn lap(&mut self) -> Duration {
        self.step
    }
}

/// One turn of the event loop
#[derive(Debug, Clone)]
pub struct Frame {
    pub event: HarkEvent,
    /// Time to feed the game clock before handling `event`
    pub elapsed: Duration,
}

/// Waits for input, at most one frame interval, and times each turn
pub struct Runner<E: HarkEventSource, C: FrameClock = Stopwatch> {
    events: E,
    interval: Duration,
    clock: C,
}

impl<E: HarkEventSource> Runner<E, Stopwatch> {
    pub fn new(events: E, interval: Duration) -> Self {
        Self::with_clock(events, interval, Stopwatch::start())
    }
}

impl<E: HarkEventSource, C: FrameClock> Runner<E, C> {
    pub fn with_clock(events: E, interval: Duration, clock: C) -> Self {
        Self {
            events,
            interval,
            clock,
        }
    }

    pub fn next_frame(&mut self) -> Frame {
        let event = match self.events.recv_timeout(self.interval) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => HarkEvent::Tick,
        };
        Frame {
            event,
            elapsed: self.clock.lap(),
        }
    }
}
