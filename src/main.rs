use chrono::{Local, NaiveTime};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{
        self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
    },
    tty::IsTty,
};
use log::{info, warn};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};
use tilt_o_clock::{
    app::{screen_pixels, App, AppState, Flow, SensorChoice, TimePicker},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    runtime::{AlarmEvent, AlarmEventSource, CrosstermEventSource, FixedTicker, Runner, Ticker},
    schedule::parse_time_of_day,
    sound::SoundKind,
};

const TICK_RATE_MS: u64 = 100;

/// alarm clock you silence by tilting a cursor into a target
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal alarm clock. When it rings, steer the blue circle into the red one by tilting (gyroscope stream or arrow keys) and tap to dismiss."
)]
pub struct Cli {
    /// arm the alarm for HH:MM (24h) right away, rolled to tomorrow if already past
    #[clap(short = 'a', long, value_parser = parse_time_of_day)]
    at: Option<NaiveTime>,

    /// ring immediately instead of waiting for an alarm
    #[clap(long)]
    ring_now: bool,

    /// exit once the alarm has been dismissed
    #[clap(long)]
    once: bool,

    /// read angular rate samples ("axis0 axis1 [axis2]" per line) from this file, FIFO or device
    #[clap(short = 's', long, conflicts_with = "no_sensor")]
    sensor: Option<PathBuf>,

    /// behave as a device without a gyroscope
    #[clap(long)]
    no_sensor: bool,

    /// cursor pixels per unit of angular rate
    #[clap(short = 'g', long)]
    gain: Option<f64>,

    /// fraction of the summed radii the centers must be within to dismiss
    #[clap(long)]
    overlap_factor: Option<f64>,

    /// cursor diameter in pixels
    #[clap(long)]
    cursor_diameter: Option<f64>,

    /// target diameter in pixels
    #[clap(long)]
    target_diameter: Option<f64>,

    /// alarm sound
    #[clap(long, value_enum)]
    sound: Option<SoundKind>,

    /// audio file to loop with `--sound tone`
    #[clap(long)]
    sound_file: Option<PathBuf>,

    /// config file to use instead of the default location
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// write the effective settings back to the config file
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Command line flags win over the config file
    fn apply(&self, mut config: Config) -> Config {
        if let Some(gain) = self.gain {
            config.gain = gain;
        }
        if let Some(factor) = self.overlap_factor {
            config.overlap_factor = factor;
        }
        if let Some(d) = self.cursor_diameter {
            config.cursor_diameter = d;
        }
        if let Some(d) = self.target_diameter {
            config.target_diameter = d;
        }
        if let Some(sound) = self.sound {
            config.sound = sound;
        }
        if let Some(file) = &self.sound_file {
            config.sound_file = Some(file.clone());
        }
        config
    }

    fn sensor_choice(&self) -> SensorChoice {
        match (&self.sensor, self.no_sensor) {
            (_, true) => SensorChoice::Absent,
            (Some(path), false) => SensorChoice::Stream(path.clone()),
            (None, false) => SensorChoice::Keyboard,
        }
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let log_path = AppDirs::log_path();
    if let Err(e) = logging::init_file_logger(&log_path) {
        eprintln!("logging disabled ({}): {}", log_path.display(), e);
    }

    let store = cli.config_store();
    let config = cli.apply(store.load());
    if let Err(e) = config.validate() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::InvalidValue, e).exit();
    }
    if cli.save_config {
        store.save(&config)?;
        info!("saved config to {}", store.path().display());
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut app = App::new(config, cli.sensor_choice(), runner.sender());
    app.once = cli.once;
    measure_screen(&mut app);

    if let Some(at) = cli.at {
        app.picker = TimePicker::from_time(&at);
        app.set_alarm(&Local::now());
    }
    if cli.ring_now {
        app.ring();
    }

    let result = start_tui(&mut terminal, &mut app, &runner);

    // release sound and sensor before handing the terminal back
    drop(app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn measure_screen(app: &mut App) {
    let (columns, rows, width, height) = match terminal::window_size() {
        Ok(ws) => (ws.columns, ws.rows, ws.width, ws.height),
        Err(e) => {
            warn!("terminal did not report its size: {}", e);
            match terminal::size() {
                Ok((columns, rows)) => (columns, rows, 0, 0),
                Err(_) => (0, 0, 0, 0),
            }
        }
    };
    let (w, h) = screen_pixels(columns, rows, width, height, &app.config);
    app.set_screen_px(w, h);
}

fn start_tui<B: Backend, E: AlarmEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    let mut shown = app.state;
    if shown == AppState::Ringing {
        terminal.clear()?;
    }

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        let event = runner.step();
        if event == AlarmEvent::Resize {
            measure_screen(app);
        }

        if app.handle(event, &Local::now()) == Flow::Quit {
            break;
        }

        // the ringing screen replaces whatever was shown before it
        if app.state != shown {
            terminal.clear()?;
            shown = app.state;
        }
    }

    Ok(())
}
