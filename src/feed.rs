use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::coordinator::{Completion, FetchCoordinator, FetchTicket};
use crate::data::{ListingSource, Page, DEFAULT_PAGE_LIMIT};
use crate::error::{ErrorInfo, FetchError};
use crate::filter;
use crate::model::{FeedContext, Item};
use crate::scroll::{Geometry, ScrollTrigger, DEFAULT_THRESHOLD};

#[derive(Debug, Clone, Copy)]
pub struct FeedOptions {
    pub page_limit: u32,
    pub scroll_threshold: u32,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            scroll_threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Read-only view of the feed handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub context: Option<FeedContext>,
    pub visible_items: Vec<Item>,
    pub total_items: usize,
    pub search_term: String,
    pub is_loading: bool,
    pub error: Option<ErrorInfo>,
    pub has_more: bool,
    pub page_count: usize,
}

struct FetchResponse {
    ticket: FetchTicket,
    result: Result<Page, FetchError>,
}

/// A paginated feed backed by a listing source.
///
/// All state lives on the thread that owns the `FeedView`. Fetches run on
/// background threads and report back over a channel that [`FeedView::poll`]
/// drains; dropping the view drops the receiver, so late workers exit quietly.
pub struct FeedView {
    source: Arc<dyn ListingSource>,
    coordinator: FetchCoordinator,
    trigger: ScrollTrigger,
    search_term: String,
    response_tx: Sender<FetchResponse>,
    response_rx: Receiver<FetchResponse>,
}

impl FeedView {
    pub fn new(source: Arc<dyn ListingSource>, options: FeedOptions) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            source,
            coordinator: FetchCoordinator::new(options.page_limit),
            trigger: ScrollTrigger::new(options.scroll_threshold),
            search_term: String::new(),
            response_tx,
            response_rx,
        }
    }

    pub fn context(&self) -> Option<&FeedContext> {
        self.coordinator.context()
    }

    pub fn is_loading(&self) -> bool {
        self.coordinator.is_loading()
    }

    pub fn request_reset(&mut self, context: FeedContext) {
        let ticket = self.coordinator.request_reset(context);
        self.dispatch(ticket);
    }

    /// Returns whether a fetch was started.
    pub fn request_more(&mut self) -> bool {
        match self.coordinator.request_more() {
            Some(ticket) => {
                self.dispatch(ticket);
                true
            }
            None => false,
        }
    }

    pub fn refresh(&mut self) -> bool {
        match self.coordinator.refresh() {
            Some(ticket) => {
                self.dispatch(ticket);
                true
            }
            None => false,
        }
    }

    /// Only changes what is visible; never fetches.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Feeds a scroll/resize measurement in; asks for more when near the bottom.
    pub fn on_geometry(&mut self, geometry: Geometry) -> bool {
        if !self.trigger.near_bottom(geometry) {
            return false;
        }
        self.request_more()
    }

    /// Applies every completed fetch. Returns whether anything was received.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(response) = self.response_rx.try_recv() {
            self.apply(response);
            changed = true;
        }
        changed
    }

    /// Blocks until no fetch is in flight or `timeout` elapses, applying results as
    /// they arrive. Returns whether the feed went idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.poll();
        while self.coordinator.is_loading() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) => {
                    self.apply(response);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false;
                }
            }
        }
        true
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.coordinator.state();
        Snapshot {
            context: self.coordinator.context().cloned(),
            visible_items: filter::visible(&state.items, &self.search_term),
            total_items: state.items.len(),
            search_term: self.search_term.clone(),
            is_loading: state.is_loading,
            error: state.error.clone(),
            has_more: state.has_more,
            page_count: state.page_count,
        }
    }

    fn apply(&mut self, response: FetchResponse) -> Completion {
        self.coordinator.complete(&response.ticket, response.result)
    }

    fn dispatch(&self, ticket: FetchTicket) {
        let tx = self.response_tx.clone();
        let source = self.source.clone();
        thread::spawn(move || {
            // A panicking source still has to settle the ticket, or the view stays loading.
            let result =
                panic::catch_unwind(AssertUnwindSafe(|| source.fetch_page(&ticket.request)))
                    .unwrap_or_else(|payload| {
                        let message = panic_message(payload.as_ref());
                        log::error!("fetch worker for {} panicked: {message}", ticket.context);
                        Err(FetchError::network("fetch worker panicked").with_cause(message))
                    });
            let _ = tx.send(FetchResponse { ticket, result });
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
