use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::FetchError;
use crate::model::{FeedContext, Item, SortMode};
use crate::reddit::{self, ListingOptions};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Everything a listing source needs to produce one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub feed_id: String,
    pub sort: SortMode,
    pub cursor: Option<String>,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(context: &FeedContext, cursor: Option<String>, limit: u32) -> Self {
        Self {
            feed_id: context.feed_id.clone(),
            sort: context.sort,
            cursor,
            limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub items: Vec<Item>,
    pub next_cursor: Option<String>,
}

impl Page {
    /// The continuation token, treating an empty string as absent.
    pub fn continuation(&self) -> Option<&str> {
        self.next_cursor
            .as_deref()
            .map(str::trim)
            .filter(|cursor| !cursor.is_empty())
    }
}

pub trait ListingSource: Send + Sync {
    fn fetch_page(&self, request: &PageRequest) -> Result<Page, FetchError>;
}

pub struct RedditListingSource {
    client: Arc<reddit::Client>,
}

impl RedditListingSource {
    pub fn new(client: Arc<reddit::Client>) -> Self {
        Self { client }
    }
}

impl ListingSource for RedditListingSource {
    fn fetch_page(&self, request: &PageRequest) -> Result<Page, FetchError> {
        let listing = self.client.subreddit_listing(
            &request.feed_id,
            request.sort,
            ListingOptions {
                after: request.cursor.clone(),
                limit: Some(request.limit),
            },
        )?;
        Ok(Page {
            items: listing
                .children
                .into_iter()
                .map(|thing| Item::from_post(thing.data))
                .collect(),
            next_cursor: listing.after,
        })
    }
}

/// In-memory source serving canned pages keyed by (feed, sort, cursor).
///
/// Requests with no scripted page get an empty page, which ends pagination.
/// Every request is recorded so callers can assert on what was fetched.
#[derive(Default)]
pub struct MockListingSource {
    pages: Mutex<HashMap<(String, SortMode, Option<String>), Result<Page, FetchError>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl MockListingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(
        self,
        context: &FeedContext,
        cursor: Option<&str>,
        result: Result<Page, FetchError>,
    ) -> Self {
        self.set_page(context, cursor, result);
        self
    }

    pub fn set_page(
        &self,
        context: &FeedContext,
        cursor: Option<&str>,
        result: Result<Page, FetchError>,
    ) {
        let key = (
            context.feed_id.clone(),
            context.sort,
            cursor.map(str::to_string),
        );
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(key, result);
        }
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl ListingSource for MockListingSource {
    fn fetch_page(&self, request: &PageRequest) -> Result<Page, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let key = (request.feed_id.clone(), request.sort, request.cursor.clone());
        let pages = self
            .pages
            .lock()
            .map_err(|_| FetchError::api(None, "mock: page table poisoned"))?;
        pages.get(&key).cloned().unwrap_or_else(|| Ok(Page::default()))
    }
}
