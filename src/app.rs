use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config;
use crate::data::{ListingSource, RedditListingSource};
use crate::feed::{FeedOptions, FeedView};
use crate::logging;
use crate::model::{FeedContext, SortMode};
use crate::reddit;
use crate::ui;

/// Command-line overrides applied on top of the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub feed: Option<String>,
    pub sort: Option<SortMode>,
}

pub fn run(options: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: options.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    logging::initialize(&cfg.logging);
    log::info!("feedscroll {} starting", crate::VERSION);
    if let Some(path) = options.config_file.clone().or_else(config::default_path) {
        log::debug!("config path: {}", path.display());
    }

    let client = reddit::Client::new(reddit::ClientConfig {
        user_agent: cfg.reddit.user_agent.clone(),
        base_url: Some(cfg.reddit.base_url.clone()),
        timeout: Some(cfg.reddit.timeout),
        http_client: None,
    })
    .context("create reddit client")?;
    let source: Arc<dyn ListingSource> = Arc::new(RedditListingSource::new(Arc::new(client)));

    let feed = FeedView::new(
        source,
        FeedOptions {
            page_limit: cfg.feed.page_limit,
            scroll_threshold: cfg.ui.scroll_threshold,
        },
    );
    let initial_context = initial_context(&cfg, &options);

    let mut model = ui::Model::new(ui::Options {
        feed,
        initial_context,
        tick_rate: cfg.ui.tick_rate,
    });
    let result = model.run();
    if let Err(err) = &result {
        log::error!("exiting with error: {err:?}");
    } else {
        log::info!("feedscroll exiting");
    }
    result
}

pub fn initial_context(cfg: &config::Config, options: &RunOptions) -> FeedContext {
    let feed = options
        .feed
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(cfg.feed.default_feed.as_str());
    FeedContext::new(feed, options.sort.unwrap_or(cfg.feed.default_sort))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_config_defaults() {
        let cfg = config::Config::default();
        let ctx = initial_context(
            &cfg,
            &RunOptions {
                feed: Some(" rust ".into()),
                sort: Some(SortMode::Top),
                ..Default::default()
            },
        );
        assert_eq!(ctx, FeedContext::new("rust", SortMode::Top));
    }

    #[test]
    fn blank_feed_falls_back_to_config() {
        let cfg = config::Config::default();
        let ctx = initial_context(
            &cfg,
            &RunOptions {
                feed: Some("   ".into()),
                ..Default::default()
            },
        );
        assert_eq!(ctx, FeedContext::new("reactjs", SortMode::Hot));
    }
}
