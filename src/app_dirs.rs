use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "hark";

/// Where hark keeps its files
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/hark/hark.log`, or the platform's local data dir
    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME);
            Some(state_dir.join("hark.log"))
        } else {
            ProjectDirs::from("", "", APP_NAME)
                .map(|proj_dirs| proj_dirs.data_local_dir().join("hark.log"))
        }
    }

    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("hark_config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_end_in_expected_files() {
        let config = AppDirs::config_path();
        assert!(config.ends_with("config.json") || config.ends_with("hark_config.json"));
        if let Some(log) = AppDirs::log_path() {
            assert!(log.ends_with("hark.log"));
        }
    }
}
