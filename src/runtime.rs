use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, MouseEventKind};

use crate::motion::MotionSample;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug, PartialEq)]
pub enum AlarmEvent {
    Key(KeyEvent),
    /// Confirmation gesture: a mouse button press
    Tap,
    Motion(MotionSample),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, mouse, resize, sensor samples)
pub trait AlarmEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AlarmEvent, RecvTimeoutError>;

    /// Producer handle for additional sources such as a motion sensor
    fn sender(&self) -> Sender<AlarmEvent>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<AlarmEvent>,
    rx: Receiver<AlarmEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                Ok(CtEvent::Key(key)) => Some(AlarmEvent::Key(key)),
                Ok(CtEvent::Mouse(mouse)) => match mouse.kind {
                    MouseEventKind::Down(_) => Some(AlarmEvent::Tap),
                    _ => None,
                },
                Ok(CtEvent::Resize(_, _)) => Some(AlarmEvent::Resize),
                Ok(_) => None,
                Err(_) => break,
            };

            if let Some(evt) = evt {
                if input_tx.send(evt).is_err() {
                    break;
                }
            }
        });

        Self { tx, rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AlarmEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<AlarmEvent> {
        self.tx.clone()
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-backed event source for tests and headless runs
pub struct TestEventSource {
    tx: Sender<AlarmEvent>,
    rx: Receiver<AlarmEvent>,
}

impl TestEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl Default for TestEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AlarmEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<AlarmEvent> {
        self.tx.clone()
    }
}

/// Runner that advances the application one event/tick at a time.
///
/// This is the only consumer of the channel, so events are handled one at
/// a time in the order they were sent.
pub struct Runner<E: AlarmEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: AlarmEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    pub fn sender(&self) -> Sender<AlarmEvent> {
        self.event_source.sender()
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> AlarmEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                AlarmEvent::Tick
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_returns_tick_on_timeout() {
        let es = TestEventSource::new();
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        // With no events available, step should yield Tick
        match runner.step() {
            AlarmEvent::Tick => {}
            _ => panic!("expected Tick on timeout"),
        }
    }

    #[test]
    fn step_passes_through_events() {
        let es = TestEventSource::new();
        es.sender().send(AlarmEvent::Resize).unwrap();
        let ticker = FixedTicker::new(Duration::from_millis(10));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            AlarmEvent::Resize => {}
            _ => panic!("expected Resize event"),
        }
    }

    #[test]
    fn events_arrive_in_send_order() {
        let es = TestEventSource::new();
        let tx = es.sender();
        let runner = Runner::new(es, FixedTicker::new(Duration::from_millis(10)));

        tx.send(AlarmEvent::Motion(MotionSample::new(1.0, 0.0))).unwrap();
        tx.send(AlarmEvent::Motion(MotionSample::new(0.0, 1.0))).unwrap();
        tx.send(AlarmEvent::Tap).unwrap();

        assert_eq!(runner.step(), AlarmEvent::Motion(MotionSample::new(1.0, 0.0)));
        assert_eq!(runner.step(), AlarmEvent::Motion(MotionSample::new(0.0, 1.0)));
        assert_eq!(runner.step(), AlarmEvent::Tap);
        assert_eq!(runner.step(), AlarmEvent::Tick);
    }
}
