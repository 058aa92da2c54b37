//! Interactive list view: every stdin line is either a search edit or a pager command.

use std::sync::Arc;

use anyhow::Context;
use client_core::{ListController, ListEvent, ListOptions, ResumeClient};
use shared::protocol::Resume;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};

use crate::render;

const HELP: &str = "type to search · :n next · :p previous · :g N go to page · :r refresh · :q quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseInput {
    Query(String),
    Next,
    Prev,
    GoTo(u32),
    Refresh,
    Help,
    Quit,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseOutcome {
    Quit,
    ReauthRequired(String),
}

pub fn parse_input(line: &str) -> BrowseInput {
    let Some(command) = line.trim_end_matches(['\r', '\n']).strip_prefix(':') else {
        return BrowseInput::Query(line.trim_end_matches(['\r', '\n']).to_string());
    };
    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("n"), None) => BrowseInput::Next,
        (Some("p"), None) => BrowseInput::Prev,
        (Some("r"), None) => BrowseInput::Refresh,
        (Some("q"), None) => BrowseInput::Quit,
        (Some("h" | "?"), None) => BrowseInput::Help,
        (Some("g"), Some(page)) => match page.parse() {
            Ok(page) => BrowseInput::GoTo(page),
            Err(_) => BrowseInput::Invalid(format!("not a page number: {page}")),
        },
        _ => BrowseInput::Invalid(format!("unknown command :{command}")),
    }
}

pub async fn run(
    client: Arc<ResumeClient>,
    options: ListOptions,
    initial_query: Option<String>,
) -> anyhow::Result<BrowseOutcome> {
    let controller: ListController<Resume> = ListController::spawn(client, options);
    let mut snapshots = controller.subscribe();
    let mut events = controller.events();
    if let Some(query) = initial_query {
        controller.set_query(query);
    }

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read from stdin")? else {
                    return Ok(BrowseOutcome::Quit);
                };
                match parse_input(&line) {
                    BrowseInput::Query(text) => controller.set_query(text),
                    BrowseInput::Next => controller.next_page(),
                    BrowseInput::Prev => controller.prev_page(),
                    BrowseInput::GoTo(page) => controller.go_to_page(page),
                    BrowseInput::Refresh => controller.refresh(),
                    BrowseInput::Help => println!("{HELP}"),
                    BrowseInput::Quit => return Ok(BrowseOutcome::Quit),
                    BrowseInput::Invalid(message) => println!("{message}"),
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return Ok(BrowseOutcome::Quit);
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if !snapshot.loading {
                    println!("\n{}", render::snapshot(&snapshot));
                }
            }
            event = events.recv() => match event {
                Ok(ListEvent::ReauthRequired { message }) => {
                    return Ok(BrowseOutcome::ReauthRequired(message));
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Ok(BrowseOutcome::Quit),
            },
        }
    }
}
