use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com/";
pub const PERMALINK_BASE: &str = "https://reddit.com";

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, Clone, Default)]
pub struct ListingOptions {
    pub after: Option<String>,
    pub limit: Option<u32>,
}

impl ListingOptions {
    fn into_params(self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(limit) = self.limit {
            params.push(("limit".into(), limit.to_string()));
        }
        if let Some(after) = self.after {
            params.push(("after".into(), after));
        }
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    #[default]
    Hot,
    New,
    Top,
    Rising,
}

pub const SORT_OPTIONS: [SortOption; 4] = [
    SortOption::Hot,
    SortOption::New,
    SortOption::Top,
    SortOption::Rising,
];

impl SortOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Hot => "hot",
            SortOption::New => "new",
            SortOption::Top => "top",
            SortOption::Rising => "rising",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOption::Hot => "Hot",
            SortOption::New => "New",
            SortOption::Top => "Top",
            SortOption::Rising => "Rising",
        }
    }

    pub fn next(self) -> SortOption {
        let index = SORT_OPTIONS
            .iter()
            .position(|sort| *sort == self)
            .unwrap_or(0);
        SORT_OPTIONS[(index + 1) % SORT_OPTIONS.len()]
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hot" => Ok(SortOption::Hot),
            "new" => Ok(SortOption::New),
            "top" => Ok(SortOption::Top),
            "rising" => Ok(SortOption::Rising),
            other => Err(format!(
                "unknown sort '{other}' (expected hot, new, top or rising)"
            )),
        }
    }
}

/// Unauthenticated client for Reddit's public `.json` listings.
pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        if config.user_agent.trim().is_empty() {
            anyhow::bail!("reddit client user agent required");
        }
        let base = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base)?;
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn subreddit_listing(
        &self,
        subreddit: &str,
        sort: SortOption,
        opts: ListingOptions,
    ) -> Result<Listing<Post>, FetchError> {
        let url = self.listing_url(subreddit, sort, opts)?;
        let resp = self.get(url)?;
        let listing: ListingEnvelope<Post> = resp
            .json()
            .map_err(|err| FetchError::from_reqwest("reddit: decode listing", err))?;
        Ok(listing.data)
    }

    pub fn listing_url(
        &self,
        subreddit: &str,
        sort: SortOption,
        opts: ListingOptions,
    ) -> Result<Url, FetchError> {
        let name = normalize_subreddit(subreddit);
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| FetchError::api(None, "reddit: base url cannot hold a path"))?;
            segments.pop_if_empty();
            if !name.is_empty() {
                segments.push("r").push(name);
            }
            segments.push(&format!("{}.json", sort.as_str()));
        }
        let params = opts.into_params();
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    fn get(&self, url: Url) -> Result<Response, FetchError> {
        let resp = self
            .http
            .get(url)
            .header(USER_AGENT, self.user_agent.clone())
            .send()
            .map_err(|err| FetchError::from_reqwest("reddit", err))?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        let code = Some(status.as_u16());
        let err = match status.as_u16() {
            403 => FetchError::api(code, "reddit: feed is private or quarantined"),
            404 => FetchError::api(code, "reddit: feed not found"),
            429 => FetchError::api(code, "reddit: rate limited"),
            _ => FetchError::api(code, format!("reddit: api error {status}")),
        };
        let body = body.trim();
        Err(if body.is_empty() {
            err
        } else {
            err.with_cause(truncate_body(body))
        })
    }
}

/// Accepts `rust`, `r/rust` and `/r/rust/`.
pub fn normalize_subreddit(name: &str) -> &str {
    name.trim()
        .trim_matches('/')
        .trim_start_matches("r/")
        .trim_matches('/')
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing<T> {
    pub after: Option<String>,
    pub before: Option<String>,
    pub children: Vec<Thing<T>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub thumbnail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ListingEnvelope<T> {
    kind: String,
    data: Listing<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new(ClientConfig {
            user_agent: "feedscroll-test/0.1".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn listing_url_includes_sort_and_cursor() {
        let url = client()
            .listing_url(
                "r/rust",
                SortOption::Top,
                ListingOptions {
                    after: Some("t3_abc".into()),
                    limit: Some(10),
                },
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.reddit.com/r/rust/top.json?limit=10&after=t3_abc"
        );
    }

    #[test]
    fn listing_url_without_feed_targets_front_page() {
        let url = client()
            .listing_url("", SortOption::Hot, ListingOptions::default())
            .unwrap();
        assert_eq!(url.as_str(), "https://www.reddit.com/hot.json");
    }

    #[test]
    fn listing_url_escapes_feed_name() {
        let url = client()
            .listing_url("a b", SortOption::New, ListingOptions::default())
            .unwrap();
        assert_eq!(url.as_str(), "https://www.reddit.com/r/a%20b/new.json");
    }

    #[test]
    fn empty_user_agent_is_rejected() {
        assert!(Client::new(ClientConfig::default()).is_err());
    }

    #[test]
    fn sort_parses_case_insensitively() {
        assert_eq!("Rising".parse::<SortOption>(), Ok(SortOption::Rising));
        assert!("best".parse::<SortOption>().is_err());
        assert_eq!(SortOption::Rising.next(), SortOption::Hot);
    }

    #[test]
    fn listing_envelope_decodes_reddit_payload() {
        let payload = r#"{
            "kind": "Listing",
            "data": {
                "after": "t3_b",
                "before": null,
                "children": [
                    {"kind": "t3", "data": {"id": "a", "name": "t3_a", "title": "Hello",
                     "author": "someone", "permalink": "/r/rust/comments/a/hello/",
                     "score": 12, "num_comments": 3, "created_utc": 1700000000.0,
                     "thumbnail": "self", "url": "https://example.com"}}
                ]
            }
        }"#;
        let envelope: ListingEnvelope<Post> = serde_json::from_str(payload).unwrap();
        assert_eq!(envelope.data.after.as_deref(), Some("t3_b"));
        assert_eq!(envelope.data.children[0].data.title, "Hello");
        assert_eq!(envelope.data.children[0].data.num_comments, 3);
    }
}
