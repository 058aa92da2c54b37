//! Async driver for [`ListState`]: one task owns the state, the debounce timer
//! and the fetch bookkeeping; callers talk to it through commands.

use std::{sync::Arc, time::Duration};

use shared::protocol::Page;
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    debounce::{Debouncer, DEFAULT_DEBOUNCE},
    error::ClientError,
    source::PageSource,
};

use super::state::{Applied, FailureKind, FetchRequest, ListSnapshot, ListState};

pub const DEFAULT_PER_PAGE: u32 = 10;

#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    pub per_page: u32,
    pub debounce: Duration,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    Loaded { page: u32, items: usize },
    Failed { message: String },
    /// The backend rejected the credentials; the caller should send the user to sign in.
    ReauthRequired { message: String },
}

#[derive(Debug, Clone)]
enum ListCommand {
    SetQuery(String),
    NextPage,
    PrevPage,
    GoToPage(u32),
    Refresh,
}

struct FetchOutcome<T> {
    seq: u64,
    result: Result<Page<T>, ClientError>,
}

pub struct ListController<T> {
    commands: mpsc::UnboundedSender<ListCommand>,
    snapshot: watch::Receiver<ListSnapshot<T>>,
    events: broadcast::Sender<ListEvent>,
    task: JoinHandle<()>,
}

impl<T> ListController<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Starts the controller loop and issues the first fetch (page 1, no search).
    pub fn spawn(source: Arc<dyn PageSource<T>>, options: ListOptions) -> Self {
        let state = ListState::new(options.per_page);
        let (snapshot_tx, snapshot) = watch::channel(state.snapshot());
        let (events, _) = broadcast::channel(64);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let worker = ListWorker {
            source,
            state,
            debouncer: Debouncer::new(String::new(), options.debounce),
            snapshot: snapshot_tx,
            events: events.clone(),
            results: results_tx,
        };
        let task = tokio::spawn(worker.run(command_rx, results_rx));

        Self {
            commands,
            snapshot,
            events,
            task,
        }
    }

    pub fn set_query(&self, text: impl Into<String>) {
        self.send(ListCommand::SetQuery(text.into()));
    }

    pub fn next_page(&self) {
        self.send(ListCommand::NextPage);
    }

    pub fn prev_page(&self) {
        self.send(ListCommand::PrevPage);
    }

    pub fn go_to_page(&self, page: u32) {
        self.send(ListCommand::GoToPage(page));
    }

    pub fn refresh(&self) {
        self.send(ListCommand::Refresh);
    }

    pub fn snapshot(&self) -> ListSnapshot<T> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot<T>> {
        self.snapshot.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    fn send(&self, command: ListCommand) {
        if self.commands.send(command).is_err() {
            warn!("list controller loop has stopped; command dropped");
        }
    }
}

impl<T> Drop for ListController<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct ListWorker<T> {
    source: Arc<dyn PageSource<T>>,
    state: ListState<T>,
    debouncer: Debouncer<String>,
    snapshot: watch::Sender<ListSnapshot<T>>,
    events: broadcast::Sender<ListEvent>,
    results: mpsc::UnboundedSender<FetchOutcome<T>>,
}

impl<T> ListWorker<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<ListCommand>,
        mut results: mpsc::UnboundedReceiver<FetchOutcome<T>>,
    ) {
        let mut settled = self.debouncer.subscribe();
        let initial = self.state.sync();
        self.dispatch(initial);
        self.publish();

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command);
                }
                changed = settled.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let query = settled.borrow_and_update().clone();
                    let request = self.state.settle_query(&query);
                    self.dispatch(request);
                }
                Some(outcome) = results.recv() => self.handle_outcome(outcome),
            }
            self.publish();
        }
        debug!("list controller loop stopped");
    }

    fn handle_command(&mut self, command: ListCommand) {
        let request = match command {
            ListCommand::SetQuery(text) => {
                self.state.edit_query(text.clone());
                self.debouncer.set(text);
                None
            }
            ListCommand::NextPage => self.state.next_page(),
            ListCommand::PrevPage => self.state.prev_page(),
            ListCommand::GoToPage(page) => self.state.go_to_page(page),
            ListCommand::Refresh => Some(self.state.refresh()),
        };
        self.dispatch(request);
    }

    fn dispatch(&self, request: Option<FetchRequest>) {
        let Some(FetchRequest { seq, query }) = request else {
            return;
        };
        let source = Arc::clone(&self.source);
        let results = self.results.clone();
        tokio::spawn(async move {
            let result = source.fetch_page(&query).await;
            let _ = results.send(FetchOutcome { seq, result });
        });
    }

    fn handle_outcome(&mut self, outcome: FetchOutcome<T>) {
        let event = match self.state.apply(outcome.seq, outcome.result) {
            Applied::Stale => return,
            Applied::Loaded => ListEvent::Loaded {
                page: self.state.page(),
                items: self.state.items().len(),
            },
            Applied::Failed(kind) => {
                let message = self.state.error().unwrap_or_default().to_string();
                match kind {
                    FailureKind::Unauthenticated => ListEvent::ReauthRequired { message },
                    FailureKind::Error => ListEvent::Failed { message },
                }
            }
        };
        let _ = self.events.send(event);
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.state.snapshot());
    }
}

#[cfg(test)]
#[path = "../tests/list_controller_tests.rs"]
mod tests;
