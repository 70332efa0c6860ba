use std::path::PathBuf;

pub const DEFAULT_DAILY_COUNT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub log_level: String,
    pub daily_count: usize,
    pub seed: Option<u64>,
    /// Daily log files are written here when set
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("KATSUYO_DATA_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));

        let log_level = lookup("RUST_LOG").unwrap_or_else(|| crate::logging::DEFAULT_FILTER.to_string());

        let daily_count = lookup("KATSUYO_DAILY_COUNT")
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|&count| count > 0)
            .unwrap_or(DEFAULT_DAILY_COUNT);

        let seed = lookup("KATSUYO_SEED").and_then(|value| value.trim().parse::<u64>().ok());

        let log_dir = lookup("KATSUYO_LOG_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Self {
            data_dir,
            log_level,
            daily_count,
            seed,
            log_dir,
        }
    }
}
