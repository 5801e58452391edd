use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::audio::{Tone, ToneSink};
use crate::config::Config;
use crate::error::Result;
use crate::feedback::{Feedback, KeyState};
use crate::pitch::{PitchClass, PITCH_CLASS_COUNT};
use crate::score::{Metrics, ResultSummary};
use crate::session::{Phase, SessionController};

/// What the terminal shows, kept up to date by the session
pub struct Board {
    key_states: [KeyState; PITCH_CLASS_COUNT as usize],
    metrics: Metrics,
    summary: Option<ResultSummary>,
    sink: Box<dyn ToneSink>,
}

impl Board {
    pub fn new(sink: Box<dyn ToneSink>) -> Self {
        Self {
            key_states: Default::default(),
            metrics: Metrics::default(),
            summary: None,
            sink,
        }
    }

    pub fn key_state(&self, pitch_class: PitchClass) -> KeyState {
        self.key_states[pitch_class.index()]
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn summary(&self) -> Option<&ResultSummary> {
        self.summary.as_ref()
    }
}

impl Feedback for Board {
    fn play_tone(&mut self, tone: Tone) {
        self.sink.play_tone(tone);
    }

    fn set_visual_state(&mut self, pitch_class: PitchClass, state: KeyState) {
        self.key_states[pitch_class.index()] = state;
    }

    fn render_metrics(&mut self, metrics: &Metrics) {
        self.metrics = *metrics;
    }

    fn on_session_finished(&mut self, summary: &ResultSummary) {
        self.summary = Some(summary.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Continue,
    Quit,
}

pub struct App {
    pub config: Config,
    pub session: SessionController<Board>,
}

impl App {
    pub fn new(config: Config, sink: Box<dyn ToneSink>) -> Result<Self> {
        let settings = config.session_settings()?;
        Ok(Self {
            session: SessionController::new(settings, Board::new(sink)),
            config,
        })
    }

    /// Same as [`App::new`] but with reproducible chords
    pub fn with_seed(config: Config, sink: Box<dyn ToneSink>, seed: u64) -> Result<Self> {
        let settings = config.session_settings()?;
        Ok(Self {
            session: SessionController::with_rng(
                settings,
                Board::new(sink),
                StdRng::seed_from_u64(seed),
            ),
            config,
        })
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn board(&self) -> &Board {
        self.session.feedback()
    }

    pub fn on_elapsed(&mut self, elapsed: Duration) {
        self.session.advance(elapsed);
    }

    pub fn on_key(&mut self, key: KeyEvent) -> AppAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return AppAction::Quit;
        }

        match (self.phase(), key.code) {
            (Phase::Idle, KeyCode::Esc) | (Phase::Idle | Phase::Finished, KeyCode::Char('q')) => {
                return AppAction::Quit;
            }
            (_, KeyCode::Esc) => self.session.request_return_to_idle(),
            (Phase::Idle, KeyCode::Char(' ') | KeyCode::Enter) => self.session.request_start(),
            (_, KeyCode::Char('r')) => self.session.request_replay(),
            (Phase::Playing, KeyCode::Char(' ')) => self.session.request_replay(),
            (Phase::Playing, KeyCode::Char(c)) => {
                if let Some(pc) = PitchClass::from_key(c) {
                    self.session.handle_user_pitch_selection(pc.value());
                }
            }
            (Phase::Finished, KeyCode::Enter | KeyCode::Char('b') | KeyCode::Backspace) => {
                self.session.request_return_to_idle();
            }
            _ => {}
        }

        AppAction::Continue
    }
}
