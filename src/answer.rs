use crate::error::{HarkError, Result};
use crate::pitch::{Note, PitchClass, PITCH_CLASS_COUNT};
use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_NOTE: Note = 36;
pub const DEFAULT_MAX_NOTE: Note = 96;

/// The notes of one round's target chord, in the order they were drawn.
/// No two notes share a pitch class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSet {
    notes: Vec<Note>,
}

impl AnswerSet {
    /// Builds a set from explicit notes. Returns `None` if two notes share a
    /// pitch class or the set is empty.
    pub fn from_notes(notes: Vec<Note>) -> Option<Self> {
        if notes.is_empty() || notes.len() > PITCH_CLASS_COUNT as usize {
            return None;
        }
        let mut seen = [false; PITCH_CLASS_COUNT as usize];
        for &note in &notes {
            let pc = PitchClass::of(note).index();
            if seen[pc] {
                return None;
            }
            seen[pc] = true;
        }
        Some(Self { notes })
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn pitch_class(&self, slot: usize) -> PitchClass {
        PitchClass::of(self.notes[slot])
    }

    pub fn pitch_classes(&self) -> impl Iterator<Item = PitchClass> + '_ {
        self.notes.iter().map(|&n| PitchClass::of(n))
    }

    pub fn contains_pitch_class(&self, pc: PitchClass) -> bool {
        self.pitch_classes().any(|p| p == pc)
    }
}

/// How many notes each new round asks for
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChordSize {
    /// 3, 2, 3, 2, ... starting with three notes
    #[default]
    Alternating,
    Dyads,
    Triads,
}

/// Tracks the alternation state of [`ChordSize::Alternating`] across rounds
#[derive(Debug, Clone)]
pub struct ChordSizePolicy {
    size: ChordSize,
    flip: bool,
}

impl ChordSizePolicy {
    pub fn new(size: ChordSize) -> Self {
        Self { size, flip: false }
    }

    pub fn reset(&mut self) {
        self.flip = false;
    }

    pub fn next_count(&mut self) -> usize {
        match self.size {
            ChordSize::Dyads => 2,
            ChordSize::Triads => 3,
            ChordSize::Alternating => {
                self.flip = !self.flip;
                if self.flip {
                    3
                } else {
                    2
                }
            }
        }
    }
}

/// Draws answer sets from an inclusive range of absolute notes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerGenerator {
    min_note: Note,
    max_note: Note,
}

impl Default for AnswerGenerator {
    fn default() -> Self {
        Self {
            min_note: DEFAULT_MIN_NOTE,
            max_note: DEFAULT_MAX_NOTE,
        }
    }
}

impl AnswerGenerator {
    /// The range must cover a full octave so that every pitch class can be
    /// drawn; otherwise rejection sampling could spin forever.
    pub fn new(min_note: Note, max_note: Note) -> Result<Self> {
        if max_note > 127 {
            return Err(HarkError::InvalidConfig(format!(
                "max note {max_note} is above 127"
            )));
        }
        if min_note > max_note {
            return Err(HarkError::InvalidConfig(format!(
                "note range {min_note}..={max_note} is inverted"
            )));
        }
        if max_note - min_note < PITCH_CLASS_COUNT - 1 {
            return Err(HarkError::InvalidConfig(format!(
                "note range {min_note}..={max_note} is narrower than an octave"
            )));
        }
        Ok(Self { min_note, max_note })
    }

    pub fn min_note(&self) -> Note {
        self.min_note
    }

    pub fn max_note(&self) -> Note {
        self.max_note
    }

    /// Rejection-samples `count` notes with pairwise-distinct pitch classes.
    /// `count` is clamped to 1..=12.
    pub fn generate<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> AnswerSet {
        let count = count.clamp(1, PITCH_CLASS_COUNT as usize);
        let mut notes: Vec<Note> = Vec::with_capacity(count);

        while notes.len() < count {
            let candidate = rng.gen_range(self.min_note..=self.max_note);
            let pc = PitchClass::of(candidate);
            if notes.iter().all(|&n| PitchClass::of(n) != pc) {
                notes.push(candidate);
            }
        }

        AnswerSet { notes }
    }
}
