use std::path::PathBuf;
use std::sync::mpsc::Sender;

use chrono::{DateTime, Local, NaiveTime, Timelike};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{error, info};

use crate::{
    config::Config,
    dismissal::TapOutcome,
    geometry::Geometry,
    presentation::AlarmPresentation,
    runtime::AlarmEvent,
    schedule::{format_12h, AlarmKey, AlarmRegistry},
    sensor::{KeyboardTilt, MotionSensor, NoSensor, StreamSensor},
    sound::{self, AlarmSound},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Scheduling,
    Ringing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Where motion samples come from
#[derive(Debug, Clone, PartialEq)]
pub enum SensorChoice {
    Keyboard,
    Stream(PathBuf),
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Hour,
    Minute,
}

/// Hour and minute fields of the scheduler screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePicker {
    pub hour: u32,
    pub minute: u32,
    pub field: Field,
}

impl TimePicker {
    pub fn from_time<T: Timelike>(t: &T) -> Self {
        Self {
            hour: t.hour(),
            minute: t.minute(),
            field: Field::Hour,
        }
    }

    pub fn time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }

    pub fn switch_field(&mut self) {
        self.field = match self.field {
            Field::Hour => Field::Minute,
            Field::Minute => Field::Hour,
        };
    }

    /// Step the focused field, wrapping around
    pub fn adjust(&mut self, delta: i32) {
        match self.field {
            Field::Hour => self.hour = (self.hour as i32 + delta).rem_euclid(24) as u32,
            Field::Minute => self.minute = (self.minute as i32 + delta).rem_euclid(60) as u32,
        }
    }
}

pub struct App {
    pub state: AppState,
    pub picker: TimePicker,
    pub registry: AlarmRegistry,
    pub alarm_key: AlarmKey,
    pub status: Option<String>,
    pub config: Config,
    pub sensor: SensorChoice,
    /// Quit after the first dismissed alarm
    pub once: bool,
    pub presentation: Option<AlarmPresentation>,
    screen_px: (f64, f64),
    events: Sender<AlarmEvent>,
}

impl App {
    pub fn new(config: Config, sensor: SensorChoice, events: Sender<AlarmEvent>) -> Self {
        Self {
            state: AppState::Scheduling,
            picker: TimePicker::from_time(&Local::now()),
            registry: AlarmRegistry::new(),
            alarm_key: AlarmKey::default(),
            status: None,
            config,
            sensor,
            once: false,
            presentation: None,
            screen_px: (0.0, 0.0),
            events,
        }
    }

    pub fn set_screen_px(&mut self, width: f64, height: f64) {
        self.screen_px = (width, height);
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::new(
            self.screen_px.0,
            self.screen_px.1,
            self.config.cursor_diameter,
            self.config.target_diameter,
        )
    }

    /// Arm the picker's time, rolled to tomorrow if it already passed
    pub fn set_alarm(&mut self, now: &DateTime<Local>) {
        let time = self.picker.time();
        match self.registry.arm_at_time_of_day(self.alarm_key, time, now) {
            Ok(_) => self.status = Some(format!("Alarm set for {}", format_12h(&time))),
            Err(e) => {
                error!("could not arm alarm: {}", e);
                self.status = Some(e.to_string());
            }
        }
    }

    pub fn cancel_alarm(&mut self) {
        if self.registry.cancel(self.alarm_key).is_some() {
            self.status = Some("Alarm cancelled".to_string());
        }
    }

    fn build_sensor(&self) -> Box<dyn MotionSensor> {
        match &self.sensor {
            SensorChoice::Keyboard => Box::new(KeyboardTilt::new(self.config.keyboard_rate)),
            SensorChoice::Stream(path) => Box::new(StreamSensor::new(path)),
            SensorChoice::Absent => Box::new(NoSensor),
        }
    }

    /// Replace whatever is on screen with the ringing alarm
    pub fn ring(&mut self) {
        let sound = sound::build(
            self.config.sound,
            self.config.bell_interval(),
            self.config.sound_file.as_deref(),
        );
        let sensor = self.build_sensor();
        self.ring_with(sound, sensor);
    }

    pub fn ring_with(&mut self, sound: Box<dyn AlarmSound>, sensor: Box<dyn MotionSensor>) {
        if self.presentation.is_some() {
            return;
        }
        let mut rng = rand::thread_rng();
        self.presentation = Some(AlarmPresentation::launch(
            self.geometry(),
            self.config.tuning(),
            sound,
            sensor,
            self.events.clone(),
            &mut rng,
        ));
        self.status = None;
        self.state = AppState::Ringing;
    }

    fn finish_ringing(&mut self) -> Flow {
        // dropping the presentation closes it if it is still open
        self.presentation = None;
        self.state = AppState::Scheduling;
        self.status = Some("Alarm dismissed".to_string());
        info!("back to scheduling");
        if self.once {
            Flow::Quit
        } else {
            Flow::Continue
        }
    }

    pub fn handle(&mut self, event: AlarmEvent, now: &DateTime<Local>) -> Flow {
        match event {
            AlarmEvent::Tick => self.on_tick(now),
            AlarmEvent::Resize => Flow::Continue,
            AlarmEvent::Motion(sample) => {
                if let Some(p) = self.presentation.as_mut() {
                    p.on_motion(sample);
                }
                Flow::Continue
            }
            AlarmEvent::Tap => match self.presentation.as_mut() {
                Some(p) => {
                    let outcome = p.on_tap();
                    self.after_tap(outcome)
                }
                None => Flow::Continue,
            },
            AlarmEvent::Key(key) => self.on_key(key, now),
        }
    }

    fn after_tap(&mut self, outcome: TapOutcome) -> Flow {
        match outcome {
            TapOutcome::Hit(_) => self.finish_ringing(),
            TapOutcome::Miss(_) | TapOutcome::Ignored => Flow::Continue,
        }
    }

    fn on_tick(&mut self, now: &DateTime<Local>) -> Flow {
        match self.state {
            AppState::Scheduling => {
                if !self.registry.take_due(now).is_empty() {
                    self.ring();
                }
            }
            AppState::Ringing => {
                if let Some(p) = self.presentation.as_mut() {
                    p.on_tick();
                }
            }
        }
        Flow::Continue
    }

    fn on_key(&mut self, key: KeyEvent, now: &DateTime<Local>) -> Flow {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }

        match self.state {
            AppState::Ringing => {
                let outcome = self.presentation.as_mut().and_then(|p| p.on_key(&key));
                match outcome {
                    Some(outcome) => self.after_tap(outcome),
                    None => Flow::Continue,
                }
            }
            AppState::Scheduling => {
                match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
                    KeyCode::Up | KeyCode::Char('k') => self.picker.adjust(1),
                    KeyCode::Down | KeyCode::Char('j') => self.picker.adjust(-1),
                    KeyCode::Left | KeyCode::Right | KeyCode::Tab => self.picker.switch_field(),
                    KeyCode::Enter => self.set_alarm(now),
                    KeyCode::Char('c') => self.cancel_alarm(),
                    KeyCode::Char('r') => self.ring(),
                    _ => {}
                }
                Flow::Continue
            }
        }
    }
}

/// Screen size in pixels, estimated from the cell grid when the terminal
/// does not report pixels
pub fn screen_pixels(columns: u16, rows: u16, width_px: u16, height_px: u16, cfg: &Config) -> (f64, f64) {
    if width_px > 0 && height_px > 0 {
        (width_px as f64, height_px as f64)
    } else {
        (
            columns as f64 * cfg.cell_width_px as f64,
            rows as f64 * cfg.cell_height_px as f64,
        )
    }
}
