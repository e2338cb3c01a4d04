use std::fs::{File, OpenOptions};
use std::io::{self, Read};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use log::{debug, info, warn};

use crate::motion::MotionSample;
use crate::runtime::AlarmEvent;

#[cfg(unix)]
use nix::fcntl::OFlag;

/// Pause between reads while the stream has nothing new
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A source of angular-rate samples for the dismissal screen
pub trait MotionSensor {
    /// Checked once when the alarm presentation starts
    fn is_available(&self) -> bool;

    /// Start forwarding samples into the event channel until the subscription is dropped
    fn subscribe(&self, tx: Sender<AlarmEvent>) -> SensorSubscription;

    /// Translate a key press into a sample, for sensors driven from the keyboard
    fn sample_for_key(&self, _key: &KeyEvent) -> Option<MotionSample> {
        None
    }
}

/// Live sensor registration. Releasing it stops delivery and, for a
/// background reader, waits until the reader has closed its stream.
#[derive(Debug)]
pub struct SensorSubscription {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    released: bool,
}

impl SensorSubscription {
    fn new(stop: Arc<AtomicBool>, worker: Option<JoinHandle<()>>) -> Self {
        Self {
            stop,
            worker,
            released: false,
        }
    }

    /// Subscription with no background producer
    pub fn inert() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)), None)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("sensor reader panicked");
            }
        }
        self.released = true;
        debug!("sensor subscription released");
    }
}

impl Drop for SensorSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Parse one line of a rate stream: `axis0 axis1 [axis2]`, whitespace or comma separated
pub fn parse_sample_line(line: &str) -> Option<MotionSample> {
    let mut fields = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|f| !f.is_empty());
    let rate_axis0 = fields.next()?.parse::<f64>().ok()?;
    let rate_axis1 = fields.next()?.parse::<f64>().ok()?;
    if !rate_axis0.is_finite() || !rate_axis1.is_finite() {
        return None;
    }
    Some(MotionSample::new(rate_axis0, rate_axis1))
}

/// Gyroscope readings streamed as text lines from a file, FIFO or character device
#[derive(Debug, Clone)]
pub struct StreamSensor {
    path: PathBuf,
}

impl StreamSensor {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl MotionSensor for StreamSensor {
    fn is_available(&self) -> bool {
        self.path.exists()
    }

    fn subscribe(&self, tx: Sender<AlarmEvent>) -> SensorSubscription {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let path = self.path.clone();

        let worker = thread::spawn(move || {
            let file = match open_stream(&path) {
                Ok(f) => f,
                Err(e) => {
                    warn!("cannot open sensor stream {}: {}", path.display(), e);
                    return;
                }
            };
            info!("reading angular rate from {}", path.display());
            follow(file, &flag, &tx);
            debug!("stopped reading {}", path.display());
        });

        SensorSubscription::new(stop, Some(worker))
    }
}

fn open_stream(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);
    // a FIFO without a writer must not block the open, and reads must return
    // so the stop flag gets checked
    #[cfg(unix)]
    options.custom_flags(OFlag::O_NONBLOCK.bits());
    options.open(path)
}

/// Forward every complete line until `stop` is set or the receiver is gone.
/// End of stream is polled like `tail -f`.
fn follow(mut file: File, stop: &AtomicBool, tx: &Sender<AlarmEvent>) {
    let mut chunk = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();

    while !stop.load(Ordering::SeqCst) {
        match file.read(&mut chunk) {
            Ok(0) => thread::sleep(POLL_INTERVAL),
            Ok(n) => {
                pending.extend_from_slice(&chunk[..n]);
                while let Some(end) = pending.iter().position(|b| *b == b'\n') {
                    let raw: Vec<u8> = pending.drain(..=end).collect();
                    let line = String::from_utf8_lossy(&raw);
                    if stop.load(Ordering::SeqCst) || !forward_line(&line, tx) {
                        return;
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                warn!("sensor stream read failed: {}", e);
                return;
            }
        }
    }
}

/// False once nobody is listening
fn forward_line(line: &str, tx: &Sender<AlarmEvent>) -> bool {
    match parse_sample_line(line) {
        Some(sample) => tx.send(AlarmEvent::Motion(sample)).is_ok(),
        None => {
            if !line.trim().is_empty() {
                debug!("skipping malformed sensor line {:?}", line.trim_end());
            }
            true
        }
    }
}

/// Arrow keys or hjkl stand in for tilting the device
#[derive(Debug, Clone, Copy)]
pub struct KeyboardTilt {
    rate: f64,
}

impl KeyboardTilt {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl MotionSensor for KeyboardTilt {
    fn is_available(&self) -> bool {
        true
    }

    fn subscribe(&self, _tx: Sender<AlarmEvent>) -> SensorSubscription {
        SensorSubscription::inert()
    }

    fn sample_for_key(&self, key: &KeyEvent) -> Option<MotionSample> {
        let r = self.rate;
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => Some(MotionSample::new(0.0, -r)),
            KeyCode::Right | KeyCode::Char('l') => Some(MotionSample::new(0.0, r)),
            KeyCode::Up | KeyCode::Char('k') => Some(MotionSample::new(-r, 0.0)),
            KeyCode::Down | KeyCode::Char('j') => Some(MotionSample::new(r, 0.0)),
            _ => None,
        }
    }
}

/// Device without a gyroscope
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSensor;

impl MotionSensor for NoSensor {
    fn is_available(&self) -> bool {
        false
    }

    fn subscribe(&self, _tx: Sender<AlarmEvent>) -> SensorSubscription {
        SensorSubscription::inert()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use std::io::Write;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn parses_two_and_three_axis_lines() {
        assert_eq!(
            parse_sample_line("0.5 -1.25"),
            Some(MotionSample::new(0.5, -1.25))
        );
        assert_eq!(
            parse_sample_line("0.5,-1.25,9.0"),
            Some(MotionSample::new(0.5, -1.25))
        );
        assert_eq!(
            parse_sample_line("  1\t2   3 "),
            Some(MotionSample::new(1.0, 2.0))
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_sample_line(""), None);
        assert_eq!(parse_sample_line("1.0"), None);
        assert_eq!(parse_sample_line("x y z"), None);
        assert_eq!(parse_sample_line("NaN 1"), None);
    }

    #[test]
    fn missing_stream_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let sensor = StreamSensor::new(dir.path().join("gyro"));
        assert!(!sensor.is_available());
    }

    #[test]
    fn stream_forwards_samples_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1 0 0").unwrap();
        writeln!(file, "garbage").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "0 1 7").unwrap();
        file.flush().unwrap();

        let sensor = StreamSensor::new(file.path());
        assert!(sensor.is_available());

        let (tx, rx) = mpsc::channel();
        let _sub = sensor.subscribe(tx);

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first, AlarmEvent::Motion(MotionSample::new(1.0, 0.0)));
        assert_eq!(second, AlarmEvent::Motion(MotionSample::new(0.0, 1.0)));
    }

    /// Drain `rx` and report how the channel ended
    fn drain(rx: &mpsc::Receiver<AlarmEvent>) -> (usize, mpsc::RecvTimeoutError) {
        let mut received = 0;
        loop {
            match rx.recv_timeout(Duration::from_secs(2)) {
                Ok(_) => received += 1,
                Err(e) => return (received, e),
            }
        }
    }

    #[test]
    fn release_stops_the_reader() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1 1").unwrap();
        file.flush().unwrap();

        let sensor = StreamSensor::new(file.path());
        let (tx, rx) = mpsc::channel();
        let mut sub = sensor.subscribe(tx);
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)).unwrap(),
            AlarmEvent::Motion(MotionSample::new(1.0, 1.0))
        );

        // the reader follows the file until released, then drops its sender
        sub.release();
        writeln!(file, "2 2").unwrap();
        file.flush().unwrap();
        assert_eq!(drain(&rx), (0, mpsc::RecvTimeoutError::Disconnected));
    }

    #[test]
    fn appended_lines_are_followed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let sensor = StreamSensor::new(file.path());
        let (tx, rx) = mpsc::channel();
        let _sub = sensor.subscribe(tx);

        thread::sleep(Duration::from_millis(50));
        write!(file, "0.5 ").unwrap();
        file.flush().unwrap();
        thread::sleep(Duration::from_millis(50));
        writeln!(file, "0.25").unwrap();
        file.flush().unwrap();

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)).unwrap(),
            AlarmEvent::Motion(MotionSample::new(0.5, 0.25))
        );
    }

    #[cfg(unix)]
    #[test]
    fn released_fifo_reader_leaves_samples_to_the_next_session() {
        use nix::sys::stat::Mode;
        use nix::unistd::mkfifo;
        use std::fs::OpenOptions;

        let dir = tempfile::tempdir().unwrap();
        let fifo = dir.path().join("gyro");
        mkfifo(&fifo, Mode::S_IRWXU).unwrap();
        let sensor = StreamSensor::new(&fifo);
        assert!(sensor.is_available());

        let (first_tx, first_rx) = mpsc::channel();
        let first = sensor.subscribe(first_tx);
        thread::sleep(Duration::from_millis(50));
        drop(first);

        let (second_tx, second_rx) = mpsc::channel();
        let _second = sensor.subscribe(second_tx);

        // blocks until the second reader has the FIFO open
        let mut writer = OpenOptions::new().write(true).open(&fifo).unwrap();
        for i in 0..20 {
            writeln!(writer, "{} 1", i).unwrap();
        }
        writer.flush().unwrap();

        let received: Vec<AlarmEvent> = (0..20)
            .map(|_| second_rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        let expected: Vec<AlarmEvent> = (0..20)
            .map(|i| AlarmEvent::Motion(MotionSample::new(i as f64, 1.0)))
            .collect();
        assert_eq!(received, expected);
        assert_eq!(drain(&first_rx), (0, mpsc::RecvTimeoutError::Disconnected));
    }

    #[test]
    fn subscription_release_is_idempotent() {
        let mut sub = SensorSubscription::inert();
        assert!(!sub.is_released());
        sub.release();
        sub.release();
        assert!(sub.is_released());
    }

    #[test]
    fn keyboard_tilt_maps_axes() {
        let tilt = KeyboardTilt::new(2.0);
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);

        assert_eq!(
            tilt.sample_for_key(&key(KeyCode::Right)),
            Some(MotionSample::new(0.0, 2.0))
        );
        assert_eq!(
            tilt.sample_for_key(&key(KeyCode::Char('k'))),
            Some(MotionSample::new(-2.0, 0.0))
        );
        assert_eq!(tilt.sample_for_key(&key(KeyCode::Char(' '))), None);
        assert!(tilt.is_available());
        assert!(!NoSensor.is_available());
    }
}
