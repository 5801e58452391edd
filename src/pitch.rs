use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute pitch, MIDI numbering (middle C = 60)
pub type Note = u8;

pub const PITCH_CLASS_COUNT: u8 = 12;

const NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Home-row piano layout: white keys on `asdfghj`, black keys on `wetyu`
const KEY_MAP: [char; 12] = ['a', 'w', 's', 'e', 'd', 'f', 't', 'g', 'y', 'h', 'u', 'j'];

/// A note's position within one octave, independent of octave number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PitchClass(u8);

impl PitchClass {
    /// Returns `None` for anything outside 0..=11
    pub fn new(value: u8) -> Option<Self> {
        (value < PITCH_CLASS_COUNT).then_some(Self(value))
    }

    pub fn of(note: Note) -> Self {
        Self(note % PITCH_CLASS_COUNT)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn name(self) -> &'static str {
        NAMES[self.index()]
    }

    /// Sharps sit on the black keys
    pub fn is_black_key(self) -> bool {
        matches!(self.0, 1 | 3 | 6 | 8 | 10)
    }

    pub fn key(self) -> char {
        KEY_MAP[self.index()]
    }

    pub fn from_key(c: char) -> Option<Self> {
        let lower = c.to_ascii_lowercase();
        KEY_MAP
            .iter()
            .position(|&k| k == lower)
            .map(|idx| Self(idx as u8))
    }

    pub fn all() -> impl Iterator<Item = PitchClass> {
        (0..PITCH_CLASS_COUNT).map(Self)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Equal temperament, A4 = 440 Hz. Takes a fractional note so playback can detune.
pub fn note_to_freq(note: f64) -> f64 {
    440.0 * 2.0_f64.powf((note - 69.0) / 12.0)
}
