//! The timed game: countdown, click counters, phase changes and the round
//! lifecycle. Everything time-based goes through the [`Scheduler`], so the
//! session is driven purely by calls to its methods.

use crate::answer::{AnswerGenerator, AnswerSet, ChordSize, ChordSizePolicy};
use crate::audio::Tone;
use crate::evaluator::{evaluate, ClickCounters, Judgement};
use crate::feedback::{Feedback, KeyState};
use crate::pitch::PitchClass;
use crate::round::RoundState;
use crate::score::{accuracy_percent, Metrics, ResultSummary, ScoreFormula};
use crate::timers::{MillisCarry, Scheduler, Task, TaskHandle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::{debug, info};

pub const COUNTDOWN_PERIOD_MS: u64 = 1000;
pub const WRONG_LOCK_MS: u64 = 300;
pub const ROUND_ADVANCE_DELAY_MS: u64 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Playing,
    Finished,
}

/// Game rules for one session, usually derived from [`crate::config::Config`]
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub session_secs: u32,
    pub generator: AnswerGenerator,
    pub chord_size: ChordSize,
    /// Each playback is shifted by a random amount within ± this many semitones
    pub detune_semitones: f64,
    pub tone_secs: f64,
    pub score_formula: ScoreFormula,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_secs: 60,
            generator: AnswerGenerator::default(),
            chord_size: ChordSize::default(),
            detune_semitones: 0.2,
            tone_secs: 0.3,
            score_formula: ScoreFormula::default(),
        }
    }
}

pub struct SessionController<F, R = StdRng> {
    settings: SessionSettings,
    sizes: ChordSizePolicy,
    rng: R,
    feedback: F,
    scheduler: Scheduler,
    phase: Phase,
    counters: ClickCounters,
    remaining_seconds: i64,
    round: Option<RoundState>,
    countdown: Option<TaskHandle>,
    lock_release: Option<(TaskHandle, PitchClass)>,
    // in flight while a completed round waits for its successor
    advance: Option<TaskHandle>,
    carry: MillisCarry,
    last_response_secs: Option<f64>,
    response_times: Vec<f64>,
    summary: Option<ResultSummary>,
}

impl<F: Feedback> SessionController<F, StdRng> {
    pub fn new(settings: SessionSettings, feedback: F) -> Self {
        Self::with_rng(settings, feedback, StdRng::from_entropy())
    }
}

impl<F: Feedback, R: Rng> SessionController<F, R> {
    pub fn with_rng(settings: SessionSettings, feedback: F, rng: R) -> Self {
        Self {
            sizes: ChordSizePolicy::new(settings.chord_size),
            remaining_seconds: settings.session_secs as i64,
            settings,
            rng,
            feedback,
            scheduler: Scheduler::new(),
            phase: Phase::Idle,
            counters: ClickCounters::default(),
            round: None,
            countdown: None,
            lock_release: None,
            advance: None,
            carry: MillisCarry::default(),
            last_response_secs: None,
            response_times: Vec::new(),
            summary: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn counters(&self) -> ClickCounters {
        self.counters
    }

    pub fn remaining_seconds(&self) -> i64 {
        self.remaining_seconds
    }

    pub fn round(&self) -> Option<&RoundState> {
        self.round.as_ref()
    }

    pub fn summary(&self) -> Option<&ResultSummary> {
        self.summary.as_ref()
    }

    pub fn last_response_secs(&self) -> Option<f64> {
        self.last_response_secs
    }

    pub fn is_advance_pending(&self) -> bool {
        self.advance.is_some()
    }

    pub fn is_countdown_running(&self) -> bool {
        self.countdown.is_some()
    }

    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending_count()
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn feedback_mut(&mut self) -> &mut F {
        &mut self.feedback
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            correct_clicks: self.counters.correct,
            total_clicks: self.counters.total,
            score: self
                .settings
                .score_formula
                .score(self.counters.correct, self.counters.total),
            accuracy_percent: accuracy_percent(self.counters.correct, self.counters.total),
            response_time_secs: self.last_response_secs,
            remaining_seconds: self.remaining_seconds,
        }
    }

    /// Starts a fresh session. Ignored unless the session is idle.
    pub fn start_session(&mut self) {
        if self.phase != Phase::Idle {
            debug!(phase = ?self.phase, "start ignored");
            return;
        }

        self.counters = ClickCounters::default();
        self.remaining_seconds = self.settings.session_secs as i64;
        self.last_response_secs = None;
        self.response_times.clear();
        self.summary = None;
        self.sizes.reset();
        self.carry.reset();

        self.phase = Phase::Playing;
        self.begin_round();
        self.countdown = Some(
            self.scheduler
                .schedule_repeating(COUNTDOWN_PERIOD_MS, Task::CountdownTick),
        );
        self.render_metrics();

        info!(
            session_secs = self.settings.session_secs,
            chord_size = %self.settings.chord_size,
            "session started"
        );
    }

    pub fn request_start(&mut self) {
        self.start_session();
    }

    /// One second of countdown. The session finishes on the first tick that
    /// takes the clock below zero.
    pub fn tick(&mut self) {
        if self.phase != Phase::Playing {
            return;
        }

        self.remaining_seconds -= 1;
        self.render_metrics();

        if self.remaining_seconds < 0 {
            self.finish();
        }
    }

    fn finish(&mut self) {
        if let Some(handle) = self.countdown.take() {
            self.scheduler.cancel(handle);
        }
        self.release_input();
        if let Some(handle) = self.advance.take() {
            self.scheduler.cancel(handle);
        }

        let summary = ResultSummary::compute(
            self.settings.score_formula,
            self.counters.correct,
            self.counters.total,
            &self.response_times,
        );
        self.phase = Phase::Finished;

        info!(
            score = summary.score,
            correct = summary.correct_clicks,
            total = summary.total_clicks,
            accuracy = summary.accuracy_percent,
            rounds = summary.rounds_completed,
            "session finished"
        );

        self.feedback.on_session_finished(&summary);
        self.summary = Some(summary);
    }

    /// Plays the current chord again. Does nothing before the first round.
    pub fn replay_current_answer(&mut self) {
        if self.round.is_some() {
            self.play_answer();
        }
    }

    pub fn request_replay(&mut self) {
        self.replay_current_answer();
    }

    /// Abandons whatever is running and goes back to the idle screen.
    /// The last round is kept so it can still be replayed.
    pub fn request_return_to_idle(&mut self) {
        self.release_input();
        self.scheduler.cancel_all();
        self.countdown = None;
        self.advance = None;
        self.clear_keys();
        if self.phase != Phase::Idle {
            info!(from = ?self.phase, "returned to idle");
        }
        self.phase = Phase::Idle;
    }

    /// Entry point for keyboard and pointer input. Returns `None` when the
    /// selection was dropped before evaluation: no session running, no
    /// round, or a value outside 0..=11.
    pub fn handle_user_pitch_selection(&mut self, value: u8) -> Option<Judgement> {
        if self.phase != Phase::Playing {
            return None;
        }
        let pc = PitchClass::new(value)?;
        let round = self.round.as_mut()?;

        let judgement = evaluate(round, &mut self.counters, pc);
        let complete = round.is_complete();
        debug!(pitch_class = %pc, ?judgement, "selection evaluated");

        match judgement {
            Judgement::Correct { .. } => {
                self.feedback.set_visual_state(pc, KeyState::Correct);
            }
            Judgement::Wrong => {
                self.feedback.set_visual_state(pc, KeyState::Wrong);
                let handle = self
                    .scheduler
                    .schedule_once(WRONG_LOCK_MS, Task::ReleaseInput { pitch_class: pc });
                self.lock_release = Some((handle, pc));
            }
            Judgement::AlreadySolved | Judgement::Locked | Judgement::Ignored => {}
        }

        if complete {
            self.schedule_advance();
        }
        self.render_metrics();

        Some(judgement)
    }

    fn schedule_advance(&mut self) {
        if self.advance.is_some() {
            return;
        }
        let Some(round) = self.round.as_ref() else {
            return;
        };

        let secs = round.elapsed_secs(self.scheduler.now_ms());
        self.last_response_secs = Some(secs);
        self.response_times.push(secs);
        self.advance = Some(
            self.scheduler
                .schedule_once(ROUND_ADVANCE_DELAY_MS, Task::AdvanceRound),
        );
        debug!(response_secs = secs, "round complete");
    }

    /// Moves the session clock forward, running every task that falls due.
    /// Sub-millisecond remainders accumulate across calls.
    pub fn advance(&mut self, elapsed: Duration) {
        let elapsed_ms = self.carry.take(elapsed);
        self.advance_ms(elapsed_ms);
    }

    pub fn advance_ms(&mut self, elapsed_ms: u64) {
        let target = self.scheduler.now_ms() + elapsed_ms;
        while let Some((_, task)) = self.scheduler.pop_due(target) {
            self.run_task(task);
        }
        self.scheduler.settle(target);
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::CountdownTick => self.tick(),
            Task::ReleaseInput { pitch_class } => {
                if matches!(self.lock_release, Some((_, pc)) if pc == pitch_class) {
                    self.release_input();
                }
            }
            Task::AdvanceRound => {
                self.advance = None;
                if self.phase == Phase::Playing {
                    self.begin_round();
                    self.render_metrics();
                }
            }
        }
    }

    /// Ends the wrong-answer lock early or on time: cancels the pending
    /// release, unlocks the round and clears the wrong key.
    fn release_input(&mut self) {
        if let Some((handle, pitch_class)) = self.lock_release.take() {
            self.scheduler.cancel(handle);
            self.feedback.set_visual_state(pitch_class, KeyState::None);
        }
        if let Some(round) = self.round.as_mut() {
            round.unlock_input();
        }
    }

    fn begin_round(&mut self) {
        self.release_input();

        let count = self.sizes.next_count();
        let answer = self.settings.generator.generate(count, &mut self.rng);
        debug!(notes = ?answer.notes(), "new round");

        self.round = Some(RoundState::new(answer, self.scheduler.now_ms()));
        self.clear_keys();
        self.play_answer();
    }

    /// Swaps in a specific chord as the current round and plays it.
    /// Only meaningful while playing; ignored otherwise.
    pub fn replace_round(&mut self, answer: AnswerSet) {
        if self.phase != Phase::Playing {
            return;
        }
        self.release_input();
        if let Some(handle) = self.advance.take() {
            self.scheduler.cancel(handle);
        }
        self.round = Some(RoundState::new(answer, self.scheduler.now_ms()));
        self.clear_keys();
        self.play_answer();
    }

    fn play_answer(&mut self) {
        let Some(round) = self.round.as_ref() else {
            return;
        };

        let detune = if self.settings.detune_semitones > 0.0 {
            let d = self.settings.detune_semitones;
            self.rng.gen_range(-d..=d)
        } else {
            0.0
        };

        for &note in round.answer().notes() {
            self.feedback.play_tone(Tone {
                note: note as f64 + detune,
                start_offset_secs: 0.0,
                duration_secs: self.settings.tone_secs,
            });
        }
    }

    fn clear_keys(&mut self) {
        for pc in PitchClass::all() {
            self.feedback.set_visual_state(pc, KeyState::None);
        }
    }

    fn render_metrics(&mut self) {
        let metrics = self.metrics();
        self.feedback.render_metrics(&metrics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::RecordingFeedback;

    fn session(seed: u64) -> SessionController<RecordingFeedback> {
        SessionController::with_rng(
            SessionSettings::default(),
            RecordingFeedback::default(),
            StdRng::seed_from_u64(seed),
        )
    }

    fn answer_classes(s: &SessionController<RecordingFeedback>) -> Vec<u8> {
        s.round()
            .unwrap()
            .answer()
            .pitch_classes()
            .map(|pc| pc.value())
            .collect()
    }

    fn wrong_class(s: &SessionController<RecordingFeedback>) -> u8 {
        let answer = answer_classes(s);
        (0..12).find(|c| !answer.contains(c)).unwrap()
    }

    #[test]
    fn test_new_session_is_idle() {
        let s = session(1);
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.round().is_none());
        assert_eq!(s.remaining_seconds(), 60);
    }

    #[test]
    fn test_start_plays_first_round() {
        let mut s = session(1);
        s.start_session();

        assert_eq!(s.phase(), Phase::Playing);
        assert!(s.is_countdown_running());
        assert_eq!(s.round().unwrap().answer().len(), 3);
        assert_eq!(s.feedback().tones.len(), 3);
        for tone in &s.feedback().tones {
            assert_eq!(tone.duration_secs, 0.3);
            assert_eq!(tone.start_offset_secs, 0.0);
        }
    }

    #[test]
    fn test_start_while_playing_is_noop() {
        let mut s = session(2);
        s.start_session();
        let notes = s.round().unwrap().answer().notes().to_vec();
        s.handle_user_pitch_selection(wrong_class(&s));

        s.start_session();
        assert_eq!(s.round().unwrap().answer().notes(), notes.as_slice());
        assert_eq!(s.counters().total, 1);
    }

    #[test]
    fn test_input_ignored_when_not_playing() {
        let mut s = session(3);
        assert_eq!(s.handle_user_pitch_selection(0), None);
        assert_eq!(s.counters(), ClickCounters::default());
    }

    #[test]
    fn test_out_of_range_pitch_class_ignored() {
        let mut s = session(3);
        s.start_session();
        assert_eq!(s.handle_user_pitch_selection(12), None);
        assert_eq!(s.handle_user_pitch_selection(200), None);
        assert_eq!(s.counters(), ClickCounters::default());
    }

    #[test]
    fn test_detune_is_shared_and_bounded() {
        let mut s = session(4);
        s.start_session();
        let notes = s.round().unwrap().answer().notes().to_vec();
        let offsets: Vec<f64> = s
            .feedback()
            .tones
            .iter()
            .zip(&notes)
            .map(|(t, &n)| t.note - n as f64)
            .collect();
        assert!(offsets.iter().all(|o| o.abs() <= 0.2 + 1e-12));
        assert!(offsets.windows(2).all(|w| (w[0] - w[1]).abs() < 1e-12));
    }

    #[test]
    fn test_no_detune_when_disabled() {
        let settings = SessionSettings {
            detune_semitones: 0.0,
            ..SessionSettings::default()
        };
        let mut s = SessionController::with_rng(
            settings,
            RecordingFeedback::default(),
            StdRng::seed_from_u64(5),
        );
        s.start_session();
        let notes: Vec<f64> = s
            .round()
            .unwrap()
            .answer()
            .notes()
            .iter()
            .map(|&n| n as f64)
            .collect();
        let played: Vec<f64> = s.feedback().tones.iter().map(|t| t.note).collect();
        assert_eq!(played, notes);
    }

    #[test]
    fn test_completion_records_response_time_and_advances() {
        let mut s = session(6);
        s.start_session();
        s.advance_ms(1234);

        for class in answer_classes(&s) {
            s.handle_user_pitch_selection(class);
        }
        assert!(s.is_advance_pending());
        assert_eq!(s.last_response_secs(), Some(1.234));
        assert_eq!(s.feedback().metrics.unwrap().response_label(), "1.234");

        s.advance_ms(149);
        assert!(s.round().unwrap().is_complete());
        s.advance_ms(1);
        assert!(!s.is_advance_pending());
        assert_eq!(s.round().unwrap().solved_count(), 0);
        assert_eq!(s.round().unwrap().answer().len(), 2);
        assert_eq!(s.round().unwrap().started_at_ms(), 1384);
    }

    #[test]
    fn test_wrong_lock_releases_after_window() {
        let mut s = session(7);
        s.start_session();
        let wrong = wrong_class(&s);
        let pc = PitchClass::new(wrong).unwrap();

        assert_eq!(s.handle_user_pitch_selection(wrong), Some(Judgement::Wrong));
        assert_eq!(s.feedback().key_state(pc), KeyState::Wrong);

        let right = answer_classes(&s)[0];
        s.advance_ms(299);
        assert_eq!(s.handle_user_pitch_selection(right), Some(Judgement::Locked));
        assert_eq!(s.feedback().key_state(pc), KeyState::Wrong);

        s.advance_ms(1);
        assert_eq!(s.feedback().key_state(pc), KeyState::None);
        assert_eq!(
            s.handle_user_pitch_selection(right),
            Some(Judgement::Correct { slot: 0 })
        );
        assert_eq!(s.counters(), ClickCounters { correct: 1, total: 2 });
    }

    #[test]
    fn test_countdown_drives_finish() {
        let mut s = session(8);
        s.start_session();

        s.advance_ms(60_000);
        assert_eq!(s.phase(), Phase::Playing);
        assert_eq!(s.remaining_seconds(), 0);

        s.advance_ms(1_000);
        assert_eq!(s.phase(), Phase::Finished);
        assert_eq!(s.remaining_seconds(), -1);
        assert!(!s.is_countdown_running());
        assert_eq!(s.pending_tasks(), 0);
        assert_eq!(s.feedback().finished.len(), 1);

        s.advance_ms(10_000);
        assert_eq!(s.remaining_seconds(), -1);
        assert_eq!(s.feedback().finished.len(), 1);
    }

    #[test]
    fn test_finish_cancels_pending_advance() {
        let mut s = session(9);
        s.start_session();
        s.advance_ms(60_950);
        for class in answer_classes(&s) {
            s.handle_user_pitch_selection(class);
        }
        assert!(s.is_advance_pending());

        s.advance_ms(100);
        assert_eq!(s.phase(), Phase::Finished);
        assert!(!s.is_advance_pending());
        let summary = s.summary().unwrap();
        assert_eq!(summary.rounds_completed, 1);
        assert_eq!(summary.correct_clicks, 3);
    }

    #[test]
    fn test_return_to_idle_and_restart() {
        let mut s = session(10);
        s.start_session();
        s.handle_user_pitch_selection(wrong_class(&s));
        s.request_return_to_idle();

        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.pending_tasks(), 0);
        assert!(!s.round().unwrap().is_input_locked());

        s.feedback_mut().clear_tones();
        s.replay_current_answer();
        assert_eq!(s.feedback().tones.len(), 3);

        s.start_session();
        assert_eq!(s.phase(), Phase::Playing);
        assert_eq!(s.counters(), ClickCounters::default());
        assert_eq!(s.remaining_seconds(), 60);
    }

    #[test]
    fn test_replay_before_any_round_is_silent() {
        let mut s = session(11);
        s.replay_current_answer();
        assert!(s.feedback().tones.is_empty());
    }

    #[test]
    fn test_fractional_advances_keep_pace_with_wall_clock() {
        let mut s = session(12);
        s.start_session();

        for _ in 0..2000 {
            s.advance(Duration::from_micros(25_900));
        }
        assert_eq!(s.now_ms(), 51_800);
        assert_eq!(s.remaining_seconds(), 60 - 51);
    }

    #[test]
    fn test_finish_inside_lock_window_clears_wrong_key() {
        let mut s = session(13);
        s.start_session();
        s.advance_ms(60_900);
        let wrong = wrong_class(&s);
        let pc = PitchClass::new(wrong).unwrap();
        let log_start = s.feedback().visual_log.len();

        assert_eq!(s.handle_user_pitch_selection(wrong), Some(Judgement::Wrong));
        s.advance_ms(100);

        assert_eq!(s.phase(), Phase::Finished);
        assert_eq!(s.feedback().key_state(pc), KeyState::None);
        assert!(!s.round().unwrap().is_input_locked());
        let updates: Vec<KeyState> = s.feedback().visual_log[log_start..]
            .iter()
            .filter(|(key, _)| *key == pc)
            .map(|(_, state)| *state)
            .collect();
        assert_eq!(updates, vec![KeyState::Wrong, KeyState::None]);
    }
}
