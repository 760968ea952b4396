use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::reddit::{self, PERMALINK_BASE};

// Sort modes are exactly the listing sorts the remote source understands.
pub use crate::reddit::SortOption as SortMode;

/// One entry of a feed. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub author: String,
    pub score: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
    pub target_url: String,
    pub permalink: String,
}

impl Item {
    pub fn from_post(post: reddit::Post) -> Self {
        let created_at = Utc
            .timestamp_opt(post.created_utc.trunc() as i64, 0)
            .single()
            .unwrap_or_default();
        let thumbnail_url = if post.thumbnail.starts_with("http://")
            || post.thumbnail.starts_with("https://")
        {
            Some(post.thumbnail)
        } else {
            None
        };
        let permalink = if post.permalink.starts_with('/') {
            format!("{}{}", PERMALINK_BASE, post.permalink)
        } else {
            post.permalink
        };
        Item {
            id: post.id,
            title: post.title,
            author: post.author,
            score: post.score,
            comment_count: post.num_comments,
            created_at,
            thumbnail_url,
            target_url: post.url,
            permalink,
        }
    }

    pub fn created_date(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }
}

/// The (feed, sort) pair being paginated. Changing either field starts over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedContext {
    pub feed_id: String,
    pub sort: SortMode,
}

impl FeedContext {
    pub fn new(feed_id: impl Into<String>, sort: SortMode) -> Self {
        Self {
            feed_id: feed_id.into(),
            sort,
        }
    }

    pub fn with_sort(&self, sort: SortMode) -> Self {
        Self {
            feed_id: self.feed_id.clone(),
            sort,
        }
    }

    pub fn with_feed(&self, feed_id: impl Into<String>) -> Self {
        Self {
            feed_id: feed_id.into(),
            sort: self.sort,
        }
    }
}

impl fmt::Display for FeedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "r/{} ({})",
            reddit::normalize_subreddit(&self.feed_id),
            self.sort.label()
        )
    }
}
