use std::env;
use std::path::PathBuf;

use crate::forest::ForestConfig;

pub const DEFAULT_DATASET_PATH: &str = "player_stats_final.csv";
pub const DEFAULT_LOG_FILE: &str = "scout_terminal.log";
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TREES: usize = 100;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainConfig {
    pub test_fraction: f64,
    pub seed: u64,
    pub forest: ForestConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
            forest: ForestConfig {
                n_trees: DEFAULT_TREES,
                seed: DEFAULT_SEED,
                ..ForestConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub dataset_path: PathBuf,
    pub export_dir: PathBuf,
    pub log_file: PathBuf,
    pub train: TrainConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            export_dir: PathBuf::from("."),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            train: TrainConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads `.env.local` / `.env` if present, then overlays environment variables on the defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(path) = lookup("PLAYER_STATS_PATH").filter(|v| !v.trim().is_empty()) {
            cfg.dataset_path = PathBuf::from(path.trim());
        }
        if let Some(dir) = lookup("EXPORT_DIR").filter(|v| !v.trim().is_empty()) {
            cfg.export_dir = PathBuf::from(dir.trim());
        }
        if let Some(file) = lookup("SCOUT_LOG_FILE").filter(|v| !v.trim().is_empty()) {
            cfg.log_file = PathBuf::from(file.trim());
        }

        let seed = lookup("FOREST_SEED")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_SEED);
        cfg.train.seed = seed;
        cfg.train.forest.seed = seed;

        cfg.train.forest.n_trees = lookup("FOREST_TREES")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_TREES)
            .max(1);
        cfg.train.forest.max_depth = lookup("FOREST_MAX_DEPTH")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .filter(|depth| *depth > 0);
        cfg.train.test_fraction = lookup("TEST_FRACTION")
            .and_then(|val| val.trim().parse::<f64>().ok())
            .filter(|f| f.is_finite())
            .unwrap_or(DEFAULT_TEST_FRACTION)
            .clamp(0.05, 0.95);

        cfg
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_constants() {
        let cfg = AppConfig::from_lookup(|_| None);
        assert_eq!(cfg.dataset_path, PathBuf::from("player_stats_final.csv"));
        assert_eq!(cfg.train.seed, 42);
        assert_eq!(cfg.train.forest.n_trees, 100);
        assert_eq!(cfg.train.forest.max_depth, None);
        assert_eq!(cfg.train.test_fraction, 0.2);
    }

    #[test]
    fn env_overrides_are_parsed_and_bounded() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("PLAYER_STATS_PATH", " data/players.csv "),
            ("FOREST_TREES", "0"),
            ("FOREST_SEED", "7"),
            ("FOREST_MAX_DEPTH", "12"),
            ("TEST_FRACTION", "3.0"),
        ]));
        assert_eq!(cfg.dataset_path, PathBuf::from("data/players.csv"));
        assert_eq!(cfg.train.forest.n_trees, 1);
        assert_eq!(cfg.train.seed, 7);
        assert_eq!(cfg.train.forest.seed, 7);
        assert_eq!(cfg.train.forest.max_depth, Some(12));
        assert_eq!(cfg.train.test_fraction, 0.95);
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("FOREST_TREES", "many"),
            ("TEST_FRACTION", "NaN"),
        ]));
        assert_eq!(cfg.train.forest.n_trees, 100);
        assert_eq!(cfg.train.test_fraction, 0.2);
    }
}
