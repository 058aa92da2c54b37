use super::*;
use std::collections::VecDeque;

use async_trait::async_trait;
use shared::protocol::{PageMeta, PageQuery};
use tokio::{
    sync::Mutex,
    time::{sleep, timeout},
};

use crate::{error::ClientResult, list::ListPhase};

const FETCH_DELAY: Duration = Duration::from_millis(10);

/// Serves `<query>#<page>/<index>` items. Unfiltered lists hold 30 entries,
/// "engineer" 23 and any other search 5.
#[derive(Default)]
struct ScriptedSource {
    calls: Mutex<Vec<PageQuery>>,
    delays: Mutex<VecDeque<Duration>>,
    fail_with: Mutex<Option<(u16, String)>>,
}

impl ScriptedSource {
    fn with_delays(delays: impl IntoIterator<Item = u64>) -> Self {
        Self {
            delays: Mutex::new(delays.into_iter().map(Duration::from_millis).collect()),
            ..Self::default()
        }
    }

    async fn calls(&self) -> Vec<PageQuery> {
        self.calls.lock().await.clone()
    }

    async fn fail_next_with(&self, status: u16, message: &str) {
        *self.fail_with.lock().await = Some((status, message.to_string()));
    }
}

#[async_trait]
impl PageSource<String> for ScriptedSource {
    async fn fetch_page(&self, query: &PageQuery) -> ClientResult<Page<String>> {
        self.calls.lock().await.push(query.clone());
        let delay = self.delays.lock().await.pop_front().unwrap_or(FETCH_DELAY);
        sleep(delay).await;

        if let Some((status, message)) = self.fail_with.lock().await.take() {
            return Err(ClientError::from_status(status, message));
        }

        let total: u64 = match query.q.as_deref() {
            None => 30,
            Some("engineer") => 23,
            Some(_) => 5,
        };
        let per_page = query.per_page as u64;
        let total_pages = total.div_ceil(per_page) as u32;
        let offset = (query.page as u64 - 1) * per_page;
        let count = total.saturating_sub(offset).min(per_page);
        let tag = query.q.clone().unwrap_or_else(|| "*".to_string());

        Ok(Page {
            items: (0..count)
                .map(|index| format!("{tag}#{}/{index}", query.page))
                .collect(),
            meta: PageMeta {
                page: query.page,
                per_page: query.per_page,
                total,
                total_pages,
                has_next: query.page < total_pages,
                has_prev: query.page > 1,
            },
        })
    }
}

fn spawn_controller(source: Arc<ScriptedSource>) -> ListController<String> {
    ListController::spawn(source, ListOptions::default())
}

async fn wait_until(
    rx: &mut watch::Receiver<ListSnapshot<String>>,
    condition: impl FnMut(&ListSnapshot<String>) -> bool,
) -> ListSnapshot<String> {
    timeout(Duration::from_secs(30), rx.wait_for(condition))
        .await
        .expect("condition reached in time")
        .expect("controller still running")
        .clone()
}

fn settled_on(query: &'static str) -> impl FnMut(&ListSnapshot<String>) -> bool {
    move |snapshot| {
        snapshot.settled_query == query && snapshot.phase == ListPhase::Loaded && !snapshot.loading
    }
}

fn loaded_page(page: u32) -> impl FnMut(&ListSnapshot<String>) -> bool {
    move |snapshot| {
        snapshot.phase == ListPhase::Loaded
            && !snapshot.loading
            && snapshot.meta.is_some_and(|meta| meta.page == page)
    }
}

#[tokio::test(start_paused = true)]
async fn first_page_is_fetched_on_spawn() {
    let source = Arc::new(ScriptedSource::default());
    let controller = spawn_controller(source.clone());
    let mut rx = controller.subscribe();

    let snapshot = wait_until(&mut rx, loaded_page(1)).await;
    assert_eq!(snapshot.items.len(), 10);
    assert!(snapshot.can_next());
    assert!(!snapshot.can_prev());

    let calls = source.calls().await;
    assert_eq!(calls, vec![PageQuery::new(1, 10, "")]);
}

#[tokio::test(start_paused = true)]
async fn rapid_query_edits_issue_one_fetch_for_the_final_text() {
    let source = Arc::new(ScriptedSource::default());
    let controller = spawn_controller(source.clone());
    let mut rx = controller.subscribe();
    wait_until(&mut rx, loaded_page(1)).await;

    for text in ["e", "en", "eng", "engi", "engineer"] {
        controller.set_query(text);
        sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(controller.snapshot().query, "engineer");

    let snapshot = wait_until(&mut rx, settled_on("engineer")).await;
    assert_eq!(snapshot.meta.map(|meta| meta.total), Some(23));
    assert!(snapshot.can_next());
    assert!(!snapshot.can_prev());

    sleep(Duration::from_secs(2)).await;
    let calls = source.calls().await;
    assert_eq!(calls.len(), 2, "initial fetch plus one search: {calls:?}");
    assert_eq!(calls[1].q.as_deref(), Some("engineer"));
    assert_eq!(calls[1].page, 1);
}

#[tokio::test(start_paused = true)]
async fn query_change_resets_to_first_page() {
    let source = Arc::new(ScriptedSource::default());
    let controller = spawn_controller(source.clone());
    let mut rx = controller.subscribe();
    wait_until(&mut rx, loaded_page(1)).await;

    controller.next_page();
    wait_until(&mut rx, loaded_page(2)).await;
    controller.next_page();
    wait_until(&mut rx, loaded_page(3)).await;
    assert_eq!(controller.snapshot().page, 3);

    controller.set_query("rust");
    let snapshot = wait_until(&mut rx, settled_on("rust")).await;
    assert_eq!(snapshot.page, 1);
    assert_eq!(snapshot.items.first().map(String::as_str), Some("rust#1/0"));

    let last = source.calls().await.pop().expect("a call");
    assert_eq!(last.page, 1);
    assert_eq!(last.q.as_deref(), Some("rust"));
}

#[tokio::test(start_paused = true)]
async fn next_on_last_page_issues_nothing() {
    let source = Arc::new(ScriptedSource::default());
    let controller = spawn_controller(source.clone());
    let mut rx = controller.subscribe();
    wait_until(&mut rx, loaded_page(1)).await;

    controller.go_to_page(3);
    let snapshot = wait_until(&mut rx, loaded_page(3)).await;
    assert!(!snapshot.can_next());
    let before = source.calls().await.len();

    controller.next_page();
    sleep(Duration::from_secs(1)).await;

    assert_eq!(source.calls().await.len(), before);
    assert_eq!(controller.snapshot().page, 3);
}

#[tokio::test(start_paused = true)]
async fn go_to_page_is_clamped() {
    let source = Arc::new(ScriptedSource::default());
    let controller = spawn_controller(source.clone());
    let mut rx = controller.subscribe();
    wait_until(&mut rx, loaded_page(1)).await;

    controller.go_to_page(40);
    let snapshot = wait_until(&mut rx, loaded_page(3)).await;
    assert_eq!(snapshot.page, 3);
    assert!(source.calls().await.iter().all(|call| call.page <= 3));
}

#[tokio::test(start_paused = true)]
async fn late_response_from_older_search_is_discarded() {
    // initial fetch, then "slow" (resolves last), then "fast"
    let source = Arc::new(ScriptedSource::with_delays([10, 500, 10]));
    let controller = spawn_controller(source.clone());
    let mut rx = controller.subscribe();
    wait_until(&mut rx, loaded_page(1)).await;

    controller.set_query("slow");
    sleep(Duration::from_millis(400)).await;
    assert!(controller.snapshot().loading, "slow search is in flight");
    controller.set_query("fast");

    wait_until(&mut rx, settled_on("fast")).await;
    sleep(Duration::from_secs(2)).await;

    let calls = source.calls().await;
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].q.as_deref(), Some("slow"));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.settled_query, "fast");
    assert!(snapshot
        .items
        .iter()
        .all(|item| item.starts_with("fast#")));
    assert_eq!(snapshot.phase, ListPhase::Loaded);
}

#[tokio::test(start_paused = true)]
async fn paging_while_a_search_loads_stays_on_its_first_page() {
    // initial fetch, then a slow "rust" search (5 results, one page)
    let source = Arc::new(ScriptedSource::with_delays([10, 500]));
    let controller = spawn_controller(source.clone());
    let mut rx = controller.subscribe();
    wait_until(&mut rx, loaded_page(1)).await;

    controller.set_query("rust");
    sleep(Duration::from_millis(400)).await;
    assert!(controller.snapshot().loading, "search is in flight");

    controller.next_page();
    controller.go_to_page(3);
    let snapshot = wait_until(&mut rx, settled_on("rust")).await;
    assert_eq!(snapshot.page, 1);
    assert_eq!(snapshot.items.len(), 5);
    assert!(!snapshot.can_next());

    sleep(Duration::from_secs(1)).await;
    let calls = source.calls().await;
    assert_eq!(calls.len(), 2, "no page request for the pending search: {calls:?}");
    assert_eq!(calls[1], PageQuery::new(1, 10, "rust"));
}

#[tokio::test(start_paused = true)]
async fn next_after_the_search_loads_uses_its_page_count() {
    let source = Arc::new(ScriptedSource::default());
    let controller = spawn_controller(source.clone());
    let mut rx = controller.subscribe();
    wait_until(&mut rx, loaded_page(1)).await;

    controller.set_query("engineer");
    wait_until(&mut rx, settled_on("engineer")).await;
    controller.go_to_page(10);
    let snapshot = wait_until(&mut rx, loaded_page(3)).await;
    assert_eq!(snapshot.items.len(), 3);

    let last = source.calls().await.pop().expect("a call");
    assert_eq!(last, PageQuery::new(3, 10, "engineer"));
}

#[tokio::test(start_paused = true)]
async fn search_settled_during_a_page_move_wins() {
    // initial fetch, a slow move to page 3, then a quick "rust" search
    let source = Arc::new(ScriptedSource::with_delays([10, 500, 10]));
    let controller = spawn_controller(source.clone());
    let mut rx = controller.subscribe();
    wait_until(&mut rx, loaded_page(1)).await;

    controller.go_to_page(3);
    controller.set_query("rust");
    let snapshot = wait_until(&mut rx, settled_on("rust")).await;
    assert_eq!(snapshot.page, 1);

    sleep(Duration::from_secs(2)).await;
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.page, 1);
    assert!(snapshot.items.iter().all(|item| item.starts_with("rust#1/")));

    let calls = source.calls().await;
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].page, 3);
    assert_eq!(calls[2], PageQuery::new(1, 10, "rust"));
}

#[tokio::test(start_paused = true)]
async fn server_error_clears_items_without_forcing_reauth() {
    let source = Arc::new(ScriptedSource::default());
    let controller = spawn_controller(source.clone());
    let mut events = controller.events();
    let mut rx = controller.subscribe();
    wait_until(&mut rx, loaded_page(1)).await;

    source.fail_next_with(503, "Service unavailable").await;
    controller.refresh();
    let snapshot = wait_until(&mut rx, |s| matches!(s.phase, ListPhase::Failed(_))).await;

    assert!(snapshot.items.is_empty());
    assert!(snapshot.meta.is_none());
    assert_eq!(snapshot.error.as_deref(), Some("Service unavailable"));
    assert!(!snapshot.requires_reauth());

    assert_eq!(
        events.recv().await.expect("loaded event"),
        ListEvent::Loaded { page: 1, items: 10 }
    );
    assert_eq!(
        events.recv().await.expect("failed event"),
        ListEvent::Failed {
            message: "Service unavailable".into()
        }
    );

    // No automatic retry.
    let before = source.calls().await.len();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(source.calls().await.len(), before);

    controller.refresh();
    let recovered = wait_until(&mut rx, loaded_page(1)).await;
    assert!(recovered.error.is_none());
    assert_eq!(recovered.items.len(), 10);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_response_requests_reauthentication() {
    let source = Arc::new(ScriptedSource::default());
    source.fail_next_with(401, "Invalid token").await;
    let controller = spawn_controller(source.clone());
    let mut events = controller.events();
    let mut rx = controller.subscribe();

    let snapshot = wait_until(&mut rx, |s| matches!(s.phase, ListPhase::Failed(_))).await;
    assert!(snapshot.requires_reauth());
    assert_eq!(
        events.recv().await.expect("event"),
        ListEvent::ReauthRequired {
            message: "Invalid token".into()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn navigation_is_ignored_after_a_failure() {
    let source = Arc::new(ScriptedSource::default());
    source.fail_next_with(500, "boom").await;
    let controller = spawn_controller(source.clone());
    let mut rx = controller.subscribe();
    wait_until(&mut rx, |s| matches!(s.phase, ListPhase::Failed(_))).await;

    controller.next_page();
    controller.go_to_page(2);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(source.calls().await.len(), 1);
    assert_eq!(controller.snapshot().page, 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_controller_stops_its_loop() {
    let source = Arc::new(ScriptedSource::default());
    let controller = spawn_controller(source);
    let mut rx = controller.subscribe();
    wait_until(&mut rx, loaded_page(1)).await;

    drop(controller);
    let closed = timeout(Duration::from_secs(1), async {
        while rx.changed().await.is_ok() {}
    })
    .await;
    assert!(closed.is_ok(), "snapshot channel closes once the loop stops");
}
