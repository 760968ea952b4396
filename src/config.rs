use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::DEFAULT_PAGE_LIMIT;
use crate::reddit::{SortOption, DEFAULT_BASE_URL};

const DEFAULT_ENV_PREFIX: &str = "FEEDSCROLL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedditConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            base_url: default_base_url(),
            timeout: default_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    format!("feedscroll/{} (terminal feed viewer)", crate::VERSION)
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_feed")]
    pub default_feed: String,
    #[serde(default)]
    pub default_sort: SortOption,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_feed: default_feed(),
            default_sort: SortOption::default(),
            page_limit: default_page_limit(),
        }
    }
}

fn default_feed() -> String {
    "reactjs".into()
}

fn default_page_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    /// Rows from the bottom of the list at which the next page is requested.
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold: u32,
    #[serde(default = "default_tick_rate", with = "humantime_serde")]
    pub tick_rate: Duration,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            scroll_threshold: default_scroll_threshold(),
            tick_rate: default_tick_rate(),
        }
    }
}

fn default_scroll_threshold() -> u32 {
    8
}

fn default_tick_rate() -> Duration {
    Duration::from_millis(120)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("feedscroll").join("feedscroll.log"))
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.reddit.user_agent.trim().is_empty() {
        base.reddit.user_agent = other.reddit.user_agent;
    }
    if !other.reddit.base_url.trim().is_empty() {
        base.reddit.base_url = other.reddit.base_url;
    }
    if !other.reddit.timeout.is_zero() {
        base.reddit.timeout = other.reddit.timeout;
    }

    if !other.feed.default_feed.trim().is_empty() {
        base.feed.default_feed = other.feed.default_feed;
    }
    base.feed.default_sort = other.feed.default_sort;
    if other.feed.page_limit != 0 {
        base.feed.page_limit = other.feed.page_limit;
    }

    base.ui.scroll_threshold = other.ui.scroll_threshold;
    if !other.ui.tick_rate.is_zero() {
        base.ui.tick_rate = other.ui.tick_rate;
    }

    if !other.logging.level.trim().is_empty() {
        base.logging.level = other.logging.level;
    }
    if other.logging.file.is_some() {
        base.logging.file = other.logging.file;
    }

    base
}

/// Applies `<PREFIX>_<SECTION>__<KEY>` variables on top of `cfg`.
/// Unparseable values are logged and ignored.
fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "reddit.user_agent" => cfg.reddit.user_agent = value,
        "reddit.base_url" => cfg.reddit.base_url = value,
        "reddit.timeout" => match humantime::parse_duration(&value) {
            Ok(duration) => cfg.reddit.timeout = duration,
            Err(err) => log::warn!("ignoring {key}={value}: {err}"),
        },
        "feed.default_feed" => cfg.feed.default_feed = value,
        "feed.default_sort" => match value.parse::<SortOption>() {
            Ok(sort) => cfg.feed.default_sort = sort,
            Err(err) => log::warn!("ignoring {key}: {err}"),
        },
        "feed.page_limit" => match value.parse::<u32>() {
            Ok(parsed) if parsed > 0 => cfg.feed.page_limit = parsed,
            _ => log::warn!("ignoring {key}={value}: expected a positive integer"),
        },
        "ui.scroll_threshold" => match value.parse::<u32>() {
            Ok(parsed) => cfg.ui.scroll_threshold = parsed,
            Err(err) => log::warn!("ignoring {key}={value}: {err}"),
        },
        "ui.tick_rate" => match humantime::parse_duration(&value) {
            Ok(duration) => cfg.ui.tick_rate = duration,
            Err(err) => log::warn!("ignoring {key}={value}: {err}"),
        },
        "logging.level" => cfg.logging.level = value,
        "logging.file" => cfg.logging.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("feedscroll").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn isolated() -> LoadOptions {
        LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/feedscroll.yaml")),
            env_prefix: Some("FEEDSCROLL_TEST_DEFAULTS".into()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(isolated()).unwrap();
        assert_eq!(cfg.feed.default_feed, "reactjs");
        assert_eq!(cfg.feed.default_sort, SortOption::Hot);
        assert_eq!(cfg.feed.page_limit, 10);
        assert_eq!(cfg.ui.scroll_threshold, 8);
        assert_eq!(cfg.reddit.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "feed:\n  default_feed: rust\n  default_sort: top\n  page_limit: 25\nreddit:\n  timeout: 5s\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("FEEDSCROLL_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.feed.default_feed, "rust");
        assert_eq!(cfg.feed.default_sort, SortOption::Top);
        assert_eq!(cfg.feed.page_limit, 25);
        assert_eq!(cfg.reddit.timeout, Duration::from_secs(5));
        assert_eq!(cfg.ui.scroll_threshold, 8);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "feed: [not, a, map]\n").unwrap();
        let err = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("FEEDSCROLL_TEST_BAD".into()),
        })
        .unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn env_overrides() {
        env::set_var("FEEDSCROLL_TEST_ENV_FEED__DEFAULT_SORT", "rising");
        env::set_var("FEEDSCROLL_TEST_ENV_FEED__PAGE_LIMIT", "0");
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/feedscroll.yaml")),
            env_prefix: Some("FEEDSCROLL_TEST_ENV".into()),
        })
        .unwrap();
        assert_eq!(cfg.feed.default_sort, SortOption::Rising);
        assert_eq!(cfg.feed.page_limit, 10);
        env::remove_var("FEEDSCROLL_TEST_ENV_FEED__DEFAULT_SORT");
        env::remove_var("FEEDSCROLL_TEST_ENV_FEED__PAGE_LIMIT");
    }
}
