use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use hark::{
    answer::ChordSize,
    app::{App, AppAction},
    app_dirs::AppDirs,
    audio::{SilentSink, ToneSink},
    config::{Config, ConfigStore, FileConfigStore},
    runtime::{CrosstermEventSource, HarkEvent, Runner},
    score::ScoreFormula,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use tracing_subscriber::EnvFilter;

const FRAME_INTERVAL_MS: u64 = 25;

/// ear training in the terminal: hear a chord, find its notes
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A chord plays; press the keys of all its pitch classes before the countdown ends. Keys a w s e d f t g y h u j map to C through B."
)]
pub struct Cli {
    /// length of a session in seconds
    #[clap(short = 's', long)]
    seconds: Option<u32>,

    /// lowest note (MIDI number) a chord may contain
    #[clap(long)]
    min_note: Option<u8>,

    /// highest note (MIDI number) a chord may contain
    #[clap(long)]
    max_note: Option<u8>,

    /// how many notes each chord has
    #[clap(short = 'c', long, value_enum)]
    chord_size: Option<ChordSize>,

    /// random pitch shift of each playback, in semitones (0 disables)
    #[clap(long)]
    detune: Option<f64>,

    /// how the final score is computed
    #[clap(long, value_enum)]
    score_formula: Option<ScoreFormula>,

    /// output volume between 0.0 and 1.0
    #[clap(long)]
    volume: Option<f32>,

    /// play no sound
    #[clap(long)]
    mute: bool,

    /// seed for reproducible chords
    #[clap(long)]
    seed: Option<u64>,

    /// write the effective settings to the config file
    #[clap(long)]
    save_config: bool,

    /// log file (filter with HARK_LOG, e.g. HARK_LOG=debug)
    #[clap(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Command line values win over the config file
    fn apply(&self, config: &mut Config) {
        if let Some(secs) = self.seconds {
            config.session_secs = secs;
        }
        if let Some(min) = self.min_note {
            config.min_note = min;
        }
        if let Some(max) = self.max_note {
            config.max_note = max;
        }
        if let Some(size) = self.chord_size {
            config.chord_size = size;
        }
        if let Some(detune) = self.detune {
            config.detune_semitones = detune;
        }
        if let Some(formula) = self.score_formula {
            config.score_formula = formula;
        }
        if let Some(volume) = self.volume {
            config.volume = volume;
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging(cli.log_file.clone().or_else(AppDirs::log_path))?;

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply(&mut config);
    if let Err(err) = config.validate() {
        Cli::command().error(ErrorKind::InvalidValue, err).exit();
    }
    if cli.save_config {
        store.save(&config)?;
        tracing::info!(path = %store.path().display(), "config saved");
    }

    let sink = tone_sink(config.volume, cli.mute);
    let mut app = match cli.seed {
        Some(seed) => App::with_seed(config, sink, seed)?,
        None => App::new(config, sink)?,
    };

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    outcome?;

    if let Some(summary) = app.board().summary() {
        println!(
            "last session: score {} | {} / {} correct | {}% acc",
            summary.score_label(),
            summary.correct_clicks,
            summary.total_clicks,
            summary.accuracy_label()
        );
    }

    Ok(())
}

/// Logs go to a file because the terminal belongs to the UI
fn init_logging(path: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("HARK_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

#[cfg(feature = "audio")]
fn tone_sink(volume: f32, mute: bool) -> Box<dyn ToneSink> {
    if mute {
        return Box::new(SilentSink::default());
    }
    match hark::audio::Synth::new(volume) {
        Ok(synth) => Box::new(synth),
        Err(err) => {
            tracing::warn!(%err, "falling back to silent output");
            Box::new(SilentSink::default())
        }
    }
}

#[cfg(not(feature = "audio"))]
fn tone_sink(_volume: f32, mute: bool) -> Box<dyn ToneSink> {
    if !mute {
        tracing::warn!("built without the `audio` feature; tones are silent");
    }
    Box::new(SilentSink::default())
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(FRAME_INTERVAL_MS),
    );

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        let frame = runner.next_frame();
        app.on_elapsed(frame.elapsed);

        if let HarkEvent::Key(key) = frame.event {
            if app.on_key(key) == AppAction::Quit {
                break;
            }
        }

        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}
