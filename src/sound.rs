use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sound backends selectable from config or the command line
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SoundKind {
    /// Terminal bell, repeated while ringing
    Bell,
    /// Synthesized tone through the default audio device (needs the `audio` feature)
    Tone,
    Silent,
}

/// A looping alarm sound
pub trait AlarmSound {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    /// Called on every event-loop tick while the sound is owned
    fn tick(&mut self) {}
}

/// Rings the terminal bell on start and then every `interval`
pub struct TerminalBell<W: Write> {
    out: W,
    interval: Duration,
    last_ring: Option<Instant>,
    playing: bool,
}

impl TerminalBell<io::Stdout> {
    pub fn stdout(interval: Duration) -> Self {
        Self::new(io::stdout(), interval)
    }
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W, interval: Duration) -> Self {
        Self {
            out,
            interval,
            last_ring: None,
            playing: false,
        }
    }

    fn ring(&mut self) -> io::Result<()> {
        self.out.write_all(b"\x07")?;
        self.out.flush()?;
        self.last_ring = Some(Instant::now());
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> AlarmSound for TerminalBell<W> {
    fn start(&mut self) -> Result<()> {
        self.playing = true;
        self.ring()?;
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn tick(&mut self) {
        if !self.playing {
            return;
        }
        let due = self
            .last_ring
            .map_or(true, |last| last.elapsed() >= self.interval);
        if due {
            if let Err(e) = self.ring() {
                warn!("bell failed: {}", e);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Silent {
    playing: bool,
}

impl AlarmSound for Silent {
    fn start(&mut self) -> Result<()> {
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

#[cfg(feature = "audio")]
pub use tone::RodioTone;

#[cfg(feature = "audio")]
mod tone {
    use std::f32::consts::TAU;
    use std::fs::File;
    use std::io::BufReader;
    use std::path::PathBuf;
    use std::time::Duration;

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

    use super::AlarmSound;
    use crate::error::{AlarmError, Result};

    const SAMPLE_RATE: u32 = 44_100;
    const PITCH_HZ: f32 = 880.0;
    // half a second on, half a second off
    const BEEP_SAMPLES: u32 = SAMPLE_RATE / 2;

    /// Endless beep-beep pattern
    struct Beeper {
        n: u32,
    }

    impl Iterator for Beeper {
        type Item = f32;

        fn next(&mut self) -> Option<f32> {
            let n = self.n;
            self.n = (self.n + 1) % (BEEP_SAMPLES * 2);
            if n >= BEEP_SAMPLES {
                return Some(0.0);
            }
            let t = n as f32 / SAMPLE_RATE as f32;
            Some((TAU * PITCH_HZ * t).sin() * 0.4)
        }
    }

    impl Source for Beeper {
        fn current_frame_len(&self) -> Option<usize> {
            None
        }

        fn channels(&self) -> u16 {
            1
        }

        fn sample_rate(&self) -> u32 {
            SAMPLE_RATE
        }

        fn total_duration(&self) -> Option<Duration> {
            None
        }
    }

    /// Plays a looping tone, or a looping audio file when one is given
    pub struct RodioTone {
        file: Option<PathBuf>,
        output: Option<(OutputStream, OutputStreamHandle, Sink)>,
    }

    impl RodioTone {
        pub fn new(file: Option<PathBuf>) -> Self {
            Self { file, output: None }
        }
    }

    impl AlarmSound for RodioTone {
        fn start(&mut self) -> Result<()> {
            let (stream, handle) =
                OutputStream::try_default().map_err(|e| AlarmError::Audio(e.to_string()))?;
            let sink = Sink::try_new(&handle).map_err(|e| AlarmError::Audio(e.to_string()))?;

            match &self.file {
                Some(path) => {
                    let decoder = Decoder::new(BufReader::new(File::open(path)?))
                        .map_err(|e| AlarmError::Audio(e.to_string()))?;
                    sink.append(decoder.repeat_infinite());
                }
                None => sink.append(Beeper { n: 0 }),
            }

            self.output = Some((stream, handle, sink));
            Ok(())
        }

        fn stop(&mut self) {
            if let Some((_stream, _handle, sink)) = self.output.take() {
                sink.stop();
            }
        }

        fn is_playing(&self) -> bool {
            self.output.is_some()
        }
    }
}

/// Owns the single alarm sound of a presentation and releases it exactly once
pub struct SoundHandle {
    sound: Option<Box<dyn AlarmSound>>,
}

impl SoundHandle {
    pub fn new(sound: Box<dyn AlarmSound>) -> Self {
        Self { sound: Some(sound) }
    }

    /// Start looping playback. Failure is logged and the alarm stays silent.
    pub fn start(&mut self) {
        if let Some(sound) = self.sound.as_mut() {
            if let Err(e) = sound.start() {
                warn!("alarm sound failed to start: {}", e);
            }
        }
    }

    pub fn tick(&mut self) {
        if let Some(sound) = self.sound.as_mut() {
            sound.tick();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.sound.as_ref().is_some_and(|s| s.is_playing())
    }

    pub fn is_released(&self) -> bool {
        self.sound.is_none()
    }

    /// Stop if playing and drop the sound. Later calls do nothing.
    pub fn release(&mut self) {
        if let Some(mut sound) = self.sound.take() {
            if sound.is_playing() {
                sound.stop();
            }
            debug!("alarm sound released");
        }
    }
}

impl Drop for SoundHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Build the sound for `kind`, falling back to the bell where audio is not compiled in.
/// `file` replaces the synthesized tone with a looping audio file.
pub fn build(kind: SoundKind, bell_interval: Duration, file: Option<&Path>) -> Box<dyn AlarmSound> {
    match kind {
        SoundKind::Bell => Box::new(TerminalBell::stdout(bell_interval)),
        SoundKind::Silent => Box::new(Silent::default()),
        #[cfg(feature = "audio")]
        SoundKind::Tone => Box::new(RodioTone::new(file.map(Path::to_path_buf))),
        #[cfg(not(feature = "audio"))]
        SoundKind::Tone => {
            if let Some(file) = file {
                warn!("cannot play {} without the `audio` feature", file.display());
            }
            warn!("built without the `audio` feature, using the terminal bell");
            Box::new(TerminalBell::stdout(bell_interval))
        }
    }
}
