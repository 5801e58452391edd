use crate::answer::{AnswerGenerator, ChordSize, DEFAULT_MAX_NOTE, DEFAULT_MIN_NOTE};
use crate::app_dirs::AppDirs;
use crate::error::{HarkError, Result};
use crate::pitch::Note;
use crate::score::ScoreFormula;
use crate::session::SessionSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub session_secs: u32,
    pub min_note: Note,
    pub max_note: Note,
    pub chord_size: ChordSize,
    pub detune_semitones: f64,
    pub tone_secs: f64,
    pub volume: f32,
    pub score_formula: ScoreFormula,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_secs: 60,
            min_note: DEFAULT_MIN_NOTE,
            max_note: DEFAULT_MAX_NOTE,
            chord_size: ChordSize::Alternating,
            detune_semitones: 0.2,
            tone_secs: 0.3,
            volume: 0.2,
            score_formula: ScoreFormula::Curved,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.session_secs == 0 {
            return Err(HarkError::InvalidConfig(
                "session length must be at least one second".into(),
            ));
        }
        if !(0.0..12.0).contains(&self.detune_semitones) {
            return Err(HarkError::InvalidConfig(format!(
                "detune of {} semitones is out of range",
                self.detune_semitones
            )));
        }
        if self.tone_secs.is_nan() || self.tone_secs <= 0.0 {
            return Err(HarkError::InvalidConfig(
                "tone length must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(HarkError::InvalidConfig(format!(
                "volume {} is outside 0.0..=1.0",
                self.volume
            )));
        }
        AnswerGenerator::new(self.min_note, self.max_note)?;
        Ok(())
    }

    pub fn session_settings(&self) -> Result<SessionSettings> {
        self.validate()?;
        Ok(SessionSettings {
            session_secs: self.session_secs,
            generator: AnswerGenerator::new(self.min_note, self.max_note)?,
            chord_size: self.chord_size,
            detune_semitones: self.detune_semitones,
            tone_secs: self.tone_secs,
            score_formula: self.score_formula,
        })
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Falls back to defaults when the file is missing or unreadable
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "ignoring unreadable config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
