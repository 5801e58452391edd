use crate::answer::AnswerSet;
use crate::pitch::PitchClass;

/// One cycle of "play a chord, wait for every pitch class to be found".
/// Replaced wholesale when the next round begins.
#[derive(Debug, Clone)]
pub struct RoundState {
    answer: AnswerSet,
    correct: Vec<bool>,
    started_at_ms: u64,
    input_locked: bool,
}

impl RoundState {
    pub fn new(answer: AnswerSet, started_at_ms: u64) -> Self {
        let correct = vec![false; answer.len()];
        Self {
            answer,
            correct,
            started_at_ms,
            input_locked: false,
        }
    }

    pub fn answer(&self) -> &AnswerSet {
        &self.answer
    }

    pub fn correctness(&self) -> &[bool] {
        &self.correct
    }

    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    pub fn is_slot_correct(&self, slot: usize) -> bool {
        self.correct.get(slot).copied().unwrap_or(false)
    }

    pub fn solved_count(&self) -> usize {
        self.correct.iter().filter(|&&c| c).count()
    }

    pub fn is_complete(&self) -> bool {
        self.correct.iter().all(|&c| c)
    }

    /// First slot, in answer order, that is still unsolved and has this pitch class
    pub fn find_unsolved(&self, pc: PitchClass) -> Option<usize> {
        (0..self.answer.len()).find(|&slot| !self.correct[slot] && self.answer.pitch_class(slot) == pc)
    }

    pub fn is_solved_pitch_class(&self, pc: PitchClass) -> bool {
        (0..self.answer.len()).any(|slot| self.correct[slot] && self.answer.pitch_class(slot) == pc)
    }

    /// Flags a slot as solved. Returns false if it already was.
    pub fn mark_correct(&mut self, slot: usize) -> bool {
        match self.correct.get_mut(slot) {
            Some(flag) if !*flag => {
                *flag = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_input_locked(&self) -> bool {
        self.input_locked
    }

    pub fn lock_input(&mut self) {
        self.input_locked = true;
    }

    pub fn unlock_input(&mut self) {
        self.input_locked = false;
    }

    /// Seconds between the round starting and `now_ms`
    pub fn elapsed_secs(&self, now_ms: u64) -> f64 {
        now_ms.saturating_sub(self.started_at_ms) as f64 / 1000.0
    }
}
