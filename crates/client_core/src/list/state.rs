//! Reducer-style state of a searchable, paginated list.
//!
//! Every transition that may need data returns the request to issue; the caller
//! runs it and feeds the outcome back through [`ListState::apply`]. Nothing here
//! touches a timer or the network.

use shared::protocol::{Page, PageMeta, PageQuery};
use tracing::{debug, warn};

use crate::error::{ClientError, DEFAULT_ERROR_MESSAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Credentials are missing or expired; the user has to sign in again.
    Unauthenticated,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    Idle,
    Loaded,
    Failed(FailureKind),
}

/// Effective parameters of a fetch: the page and the trimmed search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub page: u32,
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: u64,
    pub query: PageQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The response belonged to a superseded request and was dropped.
    Stale,
    Loaded,
    Failed(FailureKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot<T> {
    pub phase: ListPhase,
    pub query: String,
    pub settled_query: String,
    pub page: u32,
    pub per_page: u32,
    pub items: Vec<T>,
    pub meta: Option<PageMeta>,
    pub error: Option<String>,
    pub loading: bool,
}

impl<T> ListSnapshot<T> {
    pub fn can_next(&self) -> bool {
        self.meta.is_some_and(|meta| meta.has_next)
    }

    pub fn can_prev(&self) -> bool {
        self.meta.is_some_and(|meta| meta.has_prev)
    }

    pub fn page_label(&self) -> String {
        self.meta
            .map(|meta| meta.label())
            .unwrap_or_else(|| "— / —".to_string())
    }

    /// Empty rows needed to pad the current page to a full page height.
    pub fn placeholder_rows(&self) -> usize {
        (self.per_page as usize).saturating_sub(self.items.len())
    }

    pub fn requires_reauth(&self) -> bool {
        self.phase == ListPhase::Failed(FailureKind::Unauthenticated)
    }
}

#[derive(Debug, Clone)]
pub struct ListState<T> {
    per_page: u32,
    query: String,
    settled_query: String,
    page: u32,
    items: Vec<T>,
    meta: Option<PageMeta>,
    /// Trimmed query of the request that produced `meta`.
    meta_query: Option<String>,
    phase: ListPhase,
    error: Option<String>,
    next_seq: u64,
    in_flight: Option<u64>,
    latest_seq: Option<u64>,
    last_issued: Option<FetchParams>,
}

impl<T: Clone> ListState<T> {
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
            query: String::new(),
            settled_query: String::new(),
            page: 1,
            items: Vec::new(),
            meta: None,
            meta_query: None,
            phase: ListPhase::Idle,
            error: None,
            next_seq: 1,
            in_flight: None,
            latest_seq: None,
            last_issued: None,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn phase(&self) -> ListPhase {
        self.phase
    }

    /// Metadata of the last loaded page, as long as it belongs to the settled query.
    /// A newly settled search hides it until its own first page arrives.
    pub fn meta(&self) -> Option<PageMeta> {
        self.meta.filter(|_| self.meta_query == self.desired().query)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Records the text as typed. Fetching waits for [`ListState::settle_query`].
    pub fn edit_query(&mut self, text: impl Into<String>) {
        self.query = text.into();
    }

    /// Applies a debounced query. A changed query starts over from page 1.
    pub fn settle_query(&mut self, text: &str) -> Option<FetchRequest> {
        if self.settled_query != text {
            self.settled_query = text.to_string();
            self.page = 1;
        }
        self.sync()
    }

    pub fn desired(&self) -> FetchParams {
        let trimmed = self.settled_query.trim();
        FetchParams {
            page: self.page,
            query: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }

    /// Issues a request when the desired parameters differ from the last issued ones.
    pub fn sync(&mut self) -> Option<FetchRequest> {
        let desired = self.desired();
        if self.last_issued.as_ref() == Some(&desired) {
            return None;
        }
        Some(self.issue(desired))
    }

    /// Re-issues the current parameters, e.g. after a failure.
    pub fn refresh(&mut self) -> FetchRequest {
        let desired = self.desired();
        self.issue(desired)
    }

    pub fn next_page(&mut self) -> Option<FetchRequest> {
        let meta = self.meta().filter(|meta| meta.has_next)?;
        self.move_to(meta.clamp_page(self.page.saturating_add(1)))
    }

    pub fn prev_page(&mut self) -> Option<FetchRequest> {
        let meta = self.meta().filter(|meta| meta.has_prev)?;
        self.move_to(meta.clamp_page(self.page.saturating_sub(1)))
    }

    pub fn go_to_page(&mut self, page: u32) -> Option<FetchRequest> {
        let meta = self.meta()?;
        self.move_to(meta.clamp_page(page))
    }

    fn move_to(&mut self, page: u32) -> Option<FetchRequest> {
        if page == self.page {
            return None;
        }
        self.page = page;
        self.sync()
    }

    fn issue(&mut self, params: FetchParams) -> FetchRequest {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.latest_seq = Some(seq);
        self.in_flight = Some(seq);
        let query = PageQuery {
            page: params.page,
            per_page: self.per_page,
            q: params.query.clone(),
        };
        debug!(seq, page = params.page, q = ?params.query, "issuing list fetch");
        self.last_issued = Some(params);
        FetchRequest { seq, query }
    }

    /// Applies the outcome of request `seq`. Only the latest issued request may
    /// change the visible state; items and metadata always move together.
    pub fn apply(&mut self, seq: u64, result: Result<Page<T>, ClientError>) -> Applied {
        if self.latest_seq != Some(seq) {
            warn!(seq, latest = ?self.latest_seq, "discarding superseded list response");
            return Applied::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                self.items = page.items;
                self.meta = Some(page.meta);
                self.meta_query = self
                    .last_issued
                    .as_ref()
                    .and_then(|params| params.query.clone());
                self.error = None;
                self.phase = ListPhase::Loaded;
                Applied::Loaded
            }
            Err(err) => {
                let kind = if err.requires_reauth() {
                    FailureKind::Unauthenticated
                } else {
                    FailureKind::Error
                };
                let message = err.user_message();
                warn!(seq, error = %message, ?kind, "list fetch failed");
                self.items.clear();
                self.meta = None;
                self.meta_query = None;
                self.error = Some(if message.is_empty() {
                    DEFAULT_ERROR_MESSAGE.to_string()
                } else {
                    message
                });
                self.phase = ListPhase::Failed(kind);
                Applied::Failed(kind)
            }
        }
    }

    pub fn snapshot(&self) -> ListSnapshot<T> {
        ListSnapshot {
            phase: self.phase,
            query: self.query.clone(),
            settled_query: self.settled_query.clone(),
            page: self.page,
            per_page: self.per_page,
            items: self.items.clone(),
            meta: self.meta(),
            error: self.error.clone(),
            loading: self.in_flight.is_some(),
        }
    }
}

#[cfg(test)]
#[path = "../tests/list_state_tests.rs"]
mod tests;
