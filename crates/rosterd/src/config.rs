use anyhow::{Context, Result};
use roster_core::{AccuracyMode, DistanceMatcher, PresenceTracker};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Frame downscale hint forwarded to capture backends that honor it.
const DEFAULT_FRAME_SCALE: f32 = 0.25;

/// Daemon configuration: `ROSTER_*` environment variables over an optional
/// TOML file (`ROSTER_CONFIG`), over built-in defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite attendance database.
    pub db_path: PathBuf,
    /// Path to the JSON gallery file.
    pub gallery_path: PathBuf,
    /// Detection feed to consume; "-" reads newline-delimited JSON from stdin.
    pub feed_path: PathBuf,
    /// Match acceptance distance; lower is stricter.
    pub distance_threshold: f32,
    /// Seconds after the last sighting before an identity has left.
    pub presence_timeout_secs: u64,
    /// Downscale factor applied by capture backends before detection.
    pub frame_scale_factor: f32,
    /// Synthetic angle markers used to replicate gallery entries.
    pub augmentation_angles: Vec<i32>,
    /// Detector quality/latency trade-off requested from the engine.
    pub accuracy_mode: AccuracyMode,
}

impl Config {
    pub fn load() -> Result<Self> {
        let file = match std::env::var_os("ROSTER_CONFIG") {
            Some(raw) => {
                let path = PathBuf::from(raw);
                FileConfig::read(&path)
                    .with_context(|| format!("reading config file {}", path.display()))?
            }
            None => FileConfig::default(),
        };
        Self::resolve(file)
    }

    fn resolve(file: FileConfig) -> Result<Self> {
        let accuracy_mode = match env_string("ROSTER_ACCURACY_MODE").or(file.accuracy_mode) {
            Some(raw) => raw.parse().context("ROSTER_ACCURACY_MODE")?,
            None => AccuracyMode::default(),
        };

        let augmentation_angles = match env_string("ROSTER_AUGMENTATION_ANGLES") {
            Some(raw) => parse_angles(&raw).context("ROSTER_AUGMENTATION_ANGLES")?,
            None => file.augmentation_angles.unwrap_or_else(default_angles),
        };

        Ok(Self {
            db_path: env_path("ROSTER_DB_PATH")
                .or(file.db_path)
                .unwrap_or_else(roster_store::default_db_path),
            gallery_path: env_path("ROSTER_GALLERY_PATH")
                .or(file.gallery_path)
                .unwrap_or_else(roster_store::default_gallery_path),
            feed_path: env_path("ROSTER_FEED")
                .or(file.feed)
                .unwrap_or_else(|| PathBuf::from("-")),
            distance_threshold: env_f32("ROSTER_DISTANCE_THRESHOLD")
                .or(file.distance_threshold)
                .unwrap_or(DistanceMatcher::DEFAULT_THRESHOLD),
            presence_timeout_secs: env_u64("ROSTER_PRESENCE_TIMEOUT_SECS")
                .or(file.presence_timeout_secs)
                .unwrap_or(PresenceTracker::DEFAULT_TIMEOUT_SECS),
            frame_scale_factor: env_f32("ROSTER_FRAME_SCALE")
                .or(file.frame_scale_factor)
                .unwrap_or(DEFAULT_FRAME_SCALE),
            augmentation_angles,
            accuracy_mode,
        })
    }
}

/// Optional TOML layer underneath the environment.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    db_path: Option<PathBuf>,
    gallery_path: Option<PathBuf>,
    feed: Option<PathBuf>,
    distance_threshold: Option<f32>,
    presence_timeout_secs: Option<u64>,
    frame_scale_factor: Option<f32>,
    augmentation_angles: Option<Vec<i32>>,
    accuracy_mode: Option<String>,
}

impl FileConfig {
    fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

fn default_angles() -> Vec<i32> {
    vec![-10, 0, 10]
}

fn parse_angles(raw: &str) -> Result<Vec<i32>> {
    raw.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<i32>()
                .with_context(|| format!("bad angle marker {part:?}"))
        })
        .collect()
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key).map(PathBuf::from)
}

// Unparseable numeric values fall through to the next layer.
fn env_f32(key: &str) -> Option<f32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_angles() {
        assert_eq!(parse_angles("-10, 0, 10").unwrap(), vec![-10, 0, 10]);
        assert_eq!(parse_angles("5").unwrap(), vec![5]);
        assert!(parse_angles("-10, sideways").is_err());
    }

    #[test]
    fn test_file_config_parses() {
        let file: FileConfig = toml::from_str(
            r#"
            db_path = "/var/lib/roster/attendance.db"
            distance_threshold = 0.5
            presence_timeout_secs = 45
            augmentation_angles = [-5, 0, 5]
            accuracy_mode = "accurate"
            "#,
        )
        .unwrap();

        assert_eq!(
            file.db_path.as_deref(),
            Some(Path::new("/var/lib/roster/attendance.db"))
        );
        assert_eq!(file.distance_threshold, Some(0.5));
        assert_eq!(file.presence_timeout_secs, Some(45));
        assert_eq!(file.augmentation_angles, Some(vec![-5, 0, 5]));
        assert_eq!(file.accuracy_mode.as_deref(), Some("accurate"));
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        assert!(toml::from_str::<FileConfig>("similarity = 0.4").is_err());
    }
}
