// Library surface: the game core plus the terminal front end pieces the
// binary and the integration tests share.
pub mod answer;
pub mod app;
pub mod app_dirs;
pub mod audio;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod feedback;
pub mod pitch;
pub mod round;
pub mod runtime;
pub mod score;
pub mod session;
pub mod timers;
pub mod ui;

pub use error::{HarkError, Result};
