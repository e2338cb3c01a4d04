use std::sync::mpsc::Sender;

use crossterm::event::{KeyCode, KeyEvent};
use log::{info, warn};
use rand::Rng;

use crate::{
    dismissal::{DismissalSession, TapOutcome, Tuning},
    geometry::Geometry,
    motion::MotionSample,
    runtime::AlarmEvent,
    sensor::{MotionSensor, SensorSubscription},
    sound::{AlarmSound, SoundHandle},
};

pub const SENSOR_MISSING_MESSAGE: &str = "Gyroscope sensor not available on this device.";
pub const INSTRUCTIONS: &str =
    "Tilt your device to move the blue circle over the red circle, then tap to dismiss the alarm.";

/// The full-screen ringing alarm.
///
/// Owns the looping sound, the sensor subscription and the dismissal
/// session. `close` releases all of them and also runs on drop, so every
/// way out of the ringing screen leaves the sound stopped.
pub struct AlarmPresentation {
    sound: SoundHandle,
    sensor: Box<dyn MotionSensor>,
    subscription: Option<SensorSubscription>,
    session: Option<DismissalSession>,
    closed: bool,
}

impl AlarmPresentation {
    pub fn launch<R: Rng + ?Sized>(
        geometry: Geometry,
        tuning: Tuning,
        sound: Box<dyn AlarmSound>,
        sensor: Box<dyn MotionSensor>,
        events: Sender<AlarmEvent>,
        rng: &mut R,
    ) -> Self {
        let mut sound = SoundHandle::new(sound);
        sound.start();

        let (subscription, session) = if sensor.is_available() {
            let mut session = DismissalSession::new(geometry, tuning);
            session.place_target(rng);
            (Some(sensor.subscribe(events)), Some(session))
        } else {
            warn!("no motion sensor, alarm cannot be dismissed by tilting");
            (None, None)
        };

        info!(
            "alarm presentation started on a {:.0}x{:.0} screen",
            geometry.screen_width, geometry.screen_height
        );

        Self {
            sound,
            sensor,
            subscription,
            session,
            closed: false,
        }
    }

    pub fn sensor_available(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DismissalSession> {
        self.session.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_sound_playing(&self) -> bool {
        self.sound.is_playing()
    }

    pub fn is_sensor_released(&self) -> bool {
        self.subscription
            .as_ref()
            .map_or(true, SensorSubscription::is_released)
    }

    pub fn on_tick(&mut self) {
        self.sound.tick();
    }

    pub fn on_motion(&mut self, sample: MotionSample) {
        if self.closed {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.on_motion(sample);
        }
    }

    /// Space or Enter taps; other keys may steer, depending on the sensor
    pub fn on_key(&mut self, key: &KeyEvent) -> Option<TapOutcome> {
        match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => Some(self.on_tap()),
            _ => {
                if let Some(sample) = self.sensor.sample_for_key(key) {
                    self.on_motion(sample);
                }
                None
            }
        }
    }

    pub fn on_tap(&mut self) -> TapOutcome {
        if self.closed {
            return TapOutcome::Ignored;
        }
        let outcome = match self.session.as_mut() {
            Some(session) => session.on_tap(),
            None => TapOutcome::Ignored,
        };
        if let TapOutcome::Hit(_) = outcome {
            self.close();
        }
        outcome
    }

    /// Stop the sound and release the sensor. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.sound.release();
        if let Some(subscription) = self.subscription.as_mut() {
            subscription.release();
        }
        info!("alarm presentation closed");
    }
}

impl Drop for AlarmPresentation {
    fn drop(&mut self) {
        self.close();
    }
}
