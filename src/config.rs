use std::env;
use std::path::PathBuf;

pub const DEFAULT_DATASET: &str = "fifa_players_15_22_clean.csv";
pub const DEFAULT_IMAGE_DIR: &str = "player_images";
pub const DEFAULT_IMAGE_SEASON: i32 = 2022;
const DEFAULT_FETCH_PARALLELISM: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub dataset_path: PathBuf,
    pub image_dir: PathBuf,
    pub fetch_parallelism: usize,
    pub image_season: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET),
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            fetch_parallelism: DEFAULT_FETCH_PARALLELISM,
            image_season: DEFAULT_IMAGE_SEASON,
        }
    }
}

impl AppConfig {
    /// Reads `FIFA_DATASET_PATH`, `PLAYER_IMAGES_DIR`, `FETCH_PARALLELISM`
    /// and `IMAGE_SEASON`; anything unset or unparseable keeps its default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            dataset_path: non_empty("FIFA_DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset_path),
            image_dir: non_empty("PLAYER_IMAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.image_dir),
            fetch_parallelism: non_empty("FETCH_PARALLELISM")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(defaults.fetch_parallelism)
                .clamp(1, 128),
            image_season: non_empty("IMAGE_SEASON")
                .and_then(|v| v.trim().parse::<i32>().ok())
                .unwrap_or(defaults.image_season),
        }
    }
}

/// Loads `.env.local` then `.env`; absent files are fine.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_values_override_defaults() {
        let vars: HashMap<&str, &str> = [
            ("FIFA_DATASET_PATH", "data/players.csv"),
            ("FETCH_PARALLELISM", "500"),
            ("IMAGE_SEASON", "2019"),
            ("PLAYER_IMAGES_DIR", "  "),
        ]
        .into_iter()
        .collect();
        let cfg = AppConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.dataset_path, PathBuf::from("data/players.csv"));
        assert_eq!(cfg.fetch_parallelism, 128);
        assert_eq!(cfg.image_season, 2019);
        assert_eq!(cfg.image_dir, PathBuf::from(DEFAULT_IMAGE_DIR));
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let cfg = AppConfig::from_lookup(|k| (k == "FETCH_PARALLELISM").then(|| "many".to_string()));
        assert_eq!(cfg, AppConfig::default());
    }
}
