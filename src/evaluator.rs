use crate::pitch::PitchClass;
use crate::round::RoundState;

/// Click counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickCounters {
    pub correct: u32,
    pub total: u32,
}

/// What a single pitch-class selection did to the round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgement {
    /// First match for this slot
    Correct { slot: usize },
    /// The pitch class belongs to a slot that was already found
    AlreadySolved,
    /// Not part of the chord: counts against accuracy and locks input
    Wrong,
    /// Input arrived while the wrong-answer lock was held
    Locked,
    /// Round already complete and waiting for the next one
    Ignored,
}

impl Judgement {
    /// Whether this selection was charged to `total`
    pub fn is_counted(self) -> bool {
        matches!(self, Judgement::Correct { .. } | Judgement::Wrong)
    }
}

/// Applies one selection to the round and the counters.
///
/// Only the first match of each slot counts. Repeating a pitch class that was
/// already found is neither rewarded nor charged; anything else outside the
/// chord is a miss and takes the input lock, which the caller releases later.
pub fn evaluate(round: &mut RoundState, counters: &mut ClickCounters, pc: PitchClass) -> Judgement {
    if round.is_input_locked() {
        return Judgement::Locked;
    }
    if round.is_complete() {
        return Judgement::Ignored;
    }

    if let Some(slot) = round.find_unsolved(pc) {
        round.mark_correct(slot);
        counters.correct += 1;
        counters.total += 1;
        return Judgement::Correct { slot };
    }

    if round.is_solved_pitch_class(pc) {
        return Judgement::AlreadySolved;
    }

    counters.total += 1;
    round.lock_input();
    Judgement::Wrong
}
