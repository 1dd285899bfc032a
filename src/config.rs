use std::path::PathBuf;
use std::time::Duration;

use crate::query::ResponseOrdering;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub timeout: Option<Duration>,
    pub ordering: ResponseOrdering,
}

impl Config {
    pub fn new(
        api_url: String,
        db_path: Option<PathBuf>,
        timeout_secs: Option<u64>,
        latest_only: bool,
    ) -> Self {
        let data_dir = data_dir();
        Self {
            api_url,
            db_path: db_path.unwrap_or_else(|| data_dir.join("jobboard.db")),
            log_path: data_dir.join("jobboard.log"),
            timeout: timeout_secs.map(Duration::from_secs),
            ordering: if latest_only {
                ResponseOrdering::LatestOnly
            } else {
                ResponseOrdering::AsCompleted
            },
        }
    }
}

fn data_dir() -> PathBuf {
    // XDG data directory, or the working directory as a fallback
    directories::ProjectDirs::from("", "", "jobboard")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
