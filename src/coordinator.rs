//! Fetch-state coordination for one paginated feed.
//!
//! The coordinator owns the collection and decides when a fetch may start. It does
//! no I/O: entry points hand back a [`FetchTicket`] describing the page to load and
//! the host reports the outcome through [`FetchCoordinator::complete`]. Each ticket
//! carries the context and request id it was issued for, so a result that arrives
//! after a newer reset is recognised and dropped instead of being merged.

use crate::data::{Page, PageRequest, DEFAULT_PAGE_LIMIT};
use crate::error::{ErrorInfo, FetchError};
use crate::merge::{merge_counted, MergeMode};
use crate::model::{FeedContext, Item};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchState {
    pub items: Vec<Item>,
    pub cursor: Option<String>,
    pub is_loading: bool,
    pub has_more: bool,
    pub error: Option<ErrorInfo>,
    pub page_count: usize,
}

impl Default for FetchState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: None,
            is_loading: false,
            has_more: true,
            error: None,
            page_count: 0,
        }
    }
}

/// A fetch the coordinator has authorised. Hand `request` to a listing source and
/// pass the ticket back with the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub request_id: u64,
    pub context: FeedContext,
    pub mode: MergeMode,
    pub request: PageRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied { added: usize, duplicates: usize },
    Failed,
    /// The ticket was superseded; the result was discarded untouched.
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    request_id: u64,
    mode: MergeMode,
}

#[derive(Debug)]
pub struct FetchCoordinator {
    context: Option<FeedContext>,
    state: FetchState,
    in_flight: Option<InFlight>,
    next_request_id: u64,
    page_limit: u32,
}

impl Default for FetchCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}

impl FetchCoordinator {
    pub fn new(page_limit: u32) -> Self {
        Self {
            context: None,
            state: FetchState::default(),
            in_flight: None,
            next_request_id: 1,
            page_limit: page_limit.max(1),
        }
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn context(&self) -> Option<&FeedContext> {
        self.context.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts the feed over for `context`. Always issues a fetch; any fetch still
    /// outstanding loses its authority and its result will come back `Stale`.
    pub fn request_reset(&mut self, context: FeedContext) -> FetchTicket {
        if let Some(previous) = self.in_flight.take() {
            log::debug!(
                "reset to {} supersedes request #{}",
                context,
                previous.request_id
            );
        }
        self.state = FetchState {
            is_loading: true,
            ..FetchState::default()
        };
        self.context = Some(context.clone());
        log::info!("loading {}", context);
        self.issue(context, None, MergeMode::Reset)
    }

    /// Reloads the current context from its first page.
    pub fn refresh(&mut self) -> Option<FetchTicket> {
        let context = self.context.clone()?;
        Some(self.request_reset(context))
    }

    /// Fetches the next page unless a fetch is already running or the feed is
    /// exhausted. Dropped requests are not queued.
    pub fn request_more(&mut self) -> Option<FetchTicket> {
        let context = self.context.clone()?;
        if self.in_flight.is_some() || !self.state.has_more {
            return None;
        }
        self.state.is_loading = true;
        let cursor = self.state.cursor.clone();
        log::debug!(
            "loading more from {} after {}",
            context,
            cursor.as_deref().unwrap_or("<start>")
        );
        Some(self.issue(context, cursor, MergeMode::Append))
    }

    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Page, FetchError>,
    ) -> Completion {
        let Some(pending) = self.in_flight else {
            log::debug!("dropping request #{}: nothing in flight", ticket.request_id);
            return Completion::Stale;
        };
        if pending.request_id != ticket.request_id
            || self.context.as_ref() != Some(&ticket.context)
        {
            log::debug!(
                "dropping stale result #{} for {}",
                ticket.request_id,
                ticket.context
            );
            return Completion::Stale;
        }
        self.in_flight = None;
        self.state.is_loading = false;

        match result {
            Ok(page) => {
                let outcome = merge_counted(&self.state.items, &page.items, pending.mode);
                let added = outcome.items.len()
                    - match pending.mode {
                        MergeMode::Reset => 0,
                        MergeMode::Append => self.state.items.len(),
                    };
                if outcome.duplicates > 0 {
                    log::debug!(
                        "skipped {} duplicate item(s) from {}",
                        outcome.duplicates,
                        ticket.context
                    );
                }
                let next = page.continuation().map(str::to_string);
                self.state.has_more = !page.items.is_empty() && next.is_some();
                if next.is_some() {
                    self.state.cursor = next;
                }
                self.state.items = outcome.items;
                self.state.error = None;
                self.state.page_count += 1;
                if self.state.has_more {
                    log::info!(
                        "loaded {} item(s) from {} ({} total)",
                        added,
                        ticket.context,
                        self.state.items.len()
                    );
                } else {
                    log::info!(
                        "reached end of {} ({} total)",
                        ticket.context,
                        self.state.items.len()
                    );
                }
                Completion::Applied {
                    added,
                    duplicates: outcome.duplicates,
                }
            }
            Err(err) => {
                let info = ErrorInfo::from(&err);
                log::warn!("fetch for {} failed: {}", ticket.context, info);
                self.state.error = Some(info);
                Completion::Failed
            }
        }
    }

    fn issue(
        &mut self,
        context: FeedContext,
        cursor: Option<String>,
        mode: MergeMode,
    ) -> FetchTicket {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.in_flight = Some(InFlight { request_id, mode });
        FetchTicket {
            request_id,
            request: PageRequest::new(&context, cursor, self.page_limit),
            context,
            mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SortMode;
    use chrono::Utc;

    fn item(id: &str) -> Item {
        Item {
            id: id.into(),
            title: format!("post {id}"),
            author: "someone".into(),
            score: 1,
            comment_count: 0,
            created_at: Utc::now(),
            thumbnail_url: None,
            target_url: String::new(),
            permalink: String::new(),
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> Page {
        Page {
            items: ids.iter().map(|id| item(id)).collect(),
            next_cursor: next.map(str::to_string),
        }
    }

    fn ids(state: &FetchState) -> Vec<&str> {
        state.items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn request_more_without_context_is_ignored() {
        let mut coordinator = FetchCoordinator::default();
        assert!(coordinator.request_more().is_none());
        assert!(coordinator.refresh().is_none());
    }

    #[test]
    fn reset_issues_first_page_request() {
        let mut coordinator = FetchCoordinator::new(25);
        let ticket = coordinator.request_reset(FeedContext::new("rust", SortMode::New));
        assert_eq!(ticket.mode, MergeMode::Reset);
        assert_eq!(ticket.request.cursor, None);
        assert_eq!(ticket.request.limit, 25);
        assert_eq!(ticket.request.sort, SortMode::New);
        assert!(coordinator.state().is_loading);
    }

    #[test]
    fn continuation_uses_cursor_and_appends() {
        let mut coordinator = FetchCoordinator::default();
        let ticket = coordinator.request_reset(FeedContext::new("rust", SortMode::Hot));
        coordinator.complete(&ticket, Ok(page(&["a", "b", "c"], Some("t3_c"))));

        let more = coordinator.request_more().unwrap();
        assert_eq!(more.request.cursor.as_deref(), Some("t3_c"));
        let completion = coordinator.complete(&more, Ok(page(&["c", "d", "e"], Some("t3_e"))));

        assert_eq!(
            completion,
            Completion::Applied {
                added: 2,
                duplicates: 1
            }
        );
        assert_eq!(ids(coordinator.state()), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(coordinator.state().cursor.as_deref(), Some("t3_e"));
        assert_eq!(coordinator.state().page_count, 2);
        assert!(coordinator.state().has_more);
    }

    #[test]
    fn empty_page_ends_pagination() {
        let mut coordinator = FetchCoordinator::default();
        let ticket = coordinator.request_reset(FeedContext::new("rust", SortMode::Hot));
        coordinator.complete(&ticket, Ok(page(&["a"], Some("t3_a"))));
        let more = coordinator.request_more().unwrap();
        coordinator.complete(&more, Ok(page(&[], None)));

        assert!(!coordinator.state().has_more);
        assert_eq!(coordinator.state().cursor.as_deref(), Some("t3_a"));
        assert!(coordinator.request_more().is_none());
    }

    #[test]
    fn missing_cursor_ends_pagination() {
        let mut coordinator = FetchCoordinator::default();
        let ticket = coordinator.request_reset(FeedContext::new("rust", SortMode::Hot));
        coordinator.complete(&ticket, Ok(page(&["a", "b"], Some(""))));
        assert_eq!(ids(coordinator.state()), vec!["a", "b"]);
        assert!(!coordinator.state().has_more);
    }

    #[test]
    fn failure_keeps_collection_and_records_error() {
        let mut coordinator = FetchCoordinator::default();
        let ticket = coordinator.request_reset(FeedContext::new("rust", SortMode::Hot));
        coordinator.complete(&ticket, Ok(page(&["a"], Some("t3_a"))));
        let more = coordinator.request_more().unwrap();
        let completion = coordinator.complete(
            &more,
            Err(FetchError::network("reddit: request timed out").with_cause("deadline")),
        );

        assert_eq!(completion, Completion::Failed);
        let state = coordinator.state();
        assert_eq!(ids(state), vec!["a"]);
        assert_eq!(state.cursor.as_deref(), Some("t3_a"));
        assert!(state.has_more);
        assert!(!state.is_loading);
        let error = state.error.as_ref().unwrap();
        assert_eq!(error.message, "reddit: request timed out");
        assert_eq!(error.cause.as_deref(), Some("deadline"));

        let retry = coordinator.request_more().unwrap();
        coordinator.complete(&retry, Ok(page(&["b"], Some("t3_b"))));
        assert!(coordinator.state().error.is_none());
        assert_eq!(ids(coordinator.state()), vec!["a", "b"]);
    }

    #[test]
    fn failed_reset_still_allows_request_more() {
        let mut coordinator = FetchCoordinator::default();
        let ticket = coordinator.request_reset(FeedContext::new("rust", SortMode::Hot));
        coordinator.complete(&ticket, Err(FetchError::api(Some(503), "reddit: api error")));
        assert!(coordinator.state().items.is_empty());
        assert!(coordinator.state().has_more);

        let more = coordinator.request_more().unwrap();
        assert_eq!(more.request.cursor, None);
    }

    #[test]
    fn refresh_supersedes_in_flight_request_of_same_context() {
        let mut coordinator = FetchCoordinator::default();
        let context = FeedContext::new("rust", SortMode::Hot);
        let first = coordinator.request_reset(context.clone());
        let second = coordinator.refresh().unwrap();
        assert_ne!(first.request_id, second.request_id);

        assert_eq!(
            coordinator.complete(&first, Ok(page(&["old"], Some("t3_old")))),
            Completion::Stale
        );
        assert!(coordinator.state().is_loading);
        coordinator.complete(&second, Ok(page(&["new"], Some("t3_new"))));
        assert_eq!(ids(coordinator.state()), vec!["new"]);
    }

    #[test]
    fn completing_twice_is_stale() {
        let mut coordinator = FetchCoordinator::default();
        let ticket = coordinator.request_reset(FeedContext::new("rust", SortMode::Hot));
        coordinator.complete(&ticket, Ok(page(&["a"], Some("t3_a"))));
        assert_eq!(
            coordinator.complete(&ticket, Ok(page(&["b"], Some("t3_b")))),
            Completion::Stale
        );
        assert_eq!(ids(coordinator.state()), vec!["a"]);
    }

    #[test]
    fn late_failure_for_superseded_context_leaves_no_error() {
        let mut coordinator = FetchCoordinator::default();
        let old = coordinator.request_reset(FeedContext::new("old", SortMode::Hot));
        let new = coordinator.request_reset(FeedContext::new("new", SortMode::Hot));
        coordinator.complete(&new, Ok(page(&["n1"], Some("t3_n1"))));

        assert_eq!(
            coordinator.complete(&old, Err(FetchError::api(Some(404), "reddit: not found"))),
            Completion::Stale
        );
        let state = coordinator.state();
        assert!(state.error.is_none());
        assert_eq!(ids(state), vec!["n1"]);
        assert!(state.has_more);
    }
}
