use crate::audio::Tone;
use crate::pitch::{PitchClass, PITCH_CLASS_COUNT};
use crate::score::{Metrics, ResultSummary};

/// Visual state of one key on the relative keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyState {
    #[default]
    None,
    Correct,
    Wrong,
}

/// The session's outgoing calls: sound, key colours, numbers, end of game
pub trait Feedback {
    fn play_tone(&mut self, tone: Tone);
    fn set_visual_state(&mut self, pitch_class: PitchClass, state: KeyState);
    fn render_metrics(&mut self, metrics: &Metrics);
    fn on_session_finished(&mut self, summary: &ResultSummary);
}

/// Remembers everything it was told. Handy for headless drivers and tests.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    pub tones: Vec<Tone>,
    pub key_states: [KeyState; PITCH_CLASS_COUNT as usize],
    pub visual_log: Vec<(PitchClass, KeyState)>,
    pub metrics: Option<Metrics>,
    pub finished: Vec<ResultSummary>,
}

impl RecordingFeedback {
    pub fn key_state(&self, pitch_class: PitchClass) -> KeyState {
        self.key_states[pitch_class.index()]
    }

    pub fn clear_tones(&mut self) {
        self.tones.clear();
    }
}

impl Feedback for RecordingFeedback {
    fn play_tone(&mut self, tone: Tone) {
        self.tones.push(tone);
    }

    fn set_visual_state(&mut self, pitch_class: PitchClass, state: KeyState) {
        self.key_states[pitch_class.index()] = state;
        self.visual_log.push((pitch_class, state));
    }

    fn render_metrics(&mut self, metrics: &Metrics) {
        self.metrics = Some(*metrics);
    }

    fn on_session_finished(&mut self, summary: &ResultSummary) {
        self.finished.push(summary.clone());
    }
}
