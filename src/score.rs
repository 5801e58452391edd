use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Correct clicks beyond this no longer raise a curved score
pub const CURVED_CLICK_CAP: u32 = 100;
pub const CURVED_DISPLAY_CAP: f64 = 100.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScoreFormula {
    /// `1.22 * min(correct, 100) * (accuracy/100)^1.25`, shown capped at 100
    #[default]
    Curved,
    /// `(correct/90)*80 + (accuracy/100)*20`, uncapped
    Linear,
}

impl ScoreFormula {
    pub fn score(self, correct: u32, total: u32) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let accuracy = accuracy_percent(correct, total) / 100.0;
        match self {
            ScoreFormula::Curved => {
                1.22 * correct.min(CURVED_CLICK_CAP) as f64 * accuracy.powf(1.25)
            }
            ScoreFormula::Linear => (correct as f64 / 90.0) * 80.0 + accuracy * 20.0,
        }
    }

    /// Score with one decimal. A curved score above 100 shows the overflow separately.
    pub fn format(self, score: f64) -> String {
        match self {
            ScoreFormula::Curved if score > CURVED_DISPLAY_CAP => {
                format!("100 + {:.1}", score - CURVED_DISPLAY_CAP)
            }
            _ => format!("{score:.1}"),
        }
    }
}

/// Zero when nothing has been clicked
pub fn accuracy_percent(correct: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    }
}

pub fn format_accuracy(accuracy: f64) -> String {
    format!("{accuracy:.2}")
}

pub fn format_response_time(secs: f64) -> String {
    format!("{secs:.3}")
}

/// `MM:SS`, clamping negative values to zero
pub fn format_clock(remaining_seconds: i64) -> String {
    let secs = remaining_seconds.max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> Option<f64> {
    let centre = mean(values)?;
    let variance = values
        .iter()
        .map(|v| (v - centre) * (v - centre))
        .sum::<f64>()
        / values.len() as f64;
    Some(variance.sqrt())
}

/// Live numbers shown while a session runs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    pub correct_clicks: u32,
    pub total_clicks: u32,
    pub score: f64,
    pub accuracy_percent: f64,
    pub response_time_secs: Option<f64>,
    pub remaining_seconds: i64,
}

impl Metrics {
    pub fn clock(&self) -> String {
        format_clock(self.remaining_seconds)
    }

    pub fn accuracy_label(&self) -> String {
        format_accuracy(self.accuracy_percent)
    }

    pub fn response_label(&self) -> String {
        format_response_time(self.response_time_secs.unwrap_or(0.0))
    }
}

/// Final outcome of a session, computed once when the clock runs out
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    pub formula: ScoreFormula,
    pub score: f64,
    pub correct_clicks: u32,
    pub total_clicks: u32,
    pub accuracy_percent: f64,
    pub rounds_completed: usize,
    pub mean_response_secs: Option<f64>,
    pub response_std_dev: Option<f64>,
}

impl ResultSummary {
    pub fn compute(
        formula: ScoreFormula,
        correct_clicks: u32,
        total_clicks: u32,
        response_times: &[f64],
    ) -> Self {
        Self {
            formula,
            score: formula.score(correct_clicks, total_clicks),
            correct_clicks,
            total_clicks,
            accuracy_percent: accuracy_percent(correct_clicks, total_clicks),
            rounds_completed: response_times.len(),
            mean_response_secs: mean(response_times),
            response_std_dev: std_dev(response_times),
        }
    }

    pub fn score_label(&self) -> String {
        self.formula.format(self.score)
    }

    pub fn accuracy_label(&self) -> String {
        format_accuracy(self.accuracy_percent)
    }

    pub fn mean_response_label(&self) -> String {
        self.mean_response_secs
            .map(format_response_time)
            .unwrap_or_else(|| "-".to_string())
    }
}
