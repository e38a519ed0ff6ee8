use std::time::Duration;

use hubsync_core::{DEFAULT_BASE_URL, DEFAULT_BRANCH};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub default_branch: String,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let api_url = non_empty("HUBSYNC_API_URL")
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let default_branch = non_empty("HUBSYNC_DEFAULT_BRANCH")
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        let timeout = Duration::from_secs(read_u64(
            lookup("HUBSYNC_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        ));

        Self {
            api_url,
            default_branch,
            timeout,
        }
    }
}

fn read_u64(value: Option<String>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
