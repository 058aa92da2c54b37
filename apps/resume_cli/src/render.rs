//! Plain-text rendering of resumes, pages and list snapshots.

use chrono::{DateTime, Local, Utc};
use client_core::{list::ListPhase, ListSnapshot};
use shared::protocol::{Resume, ResumePage, ResumeRevision, RevisionPage};

const EMPTY_LIST: &str = "Nothing found";

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn resume_row(resume: &Resume) -> String {
    format!("#{:<6} {}", resume.id.0, resume.title)
}

pub fn resume_detail(resume: &Resume) -> String {
    let mut out = format!("#{} {}\n", resume.id, resume.title);
    if let Some(updated_at) = resume.updated_at.or(resume.created_at) {
        out.push_str(&format!("updated {}\n", local_time(updated_at)));
    }
    out.push('\n');
    out.push_str(&resume.content);
    out
}

pub fn resume_page(page: &ResumePage) -> String {
    if page.items.is_empty() {
        return EMPTY_LIST.to_string();
    }
    let rows: Vec<String> = page.items.iter().map(resume_row).collect();
    format!(
        "{}\npage {} · {} total",
        rows.join("\n"),
        page.meta.label(),
        page.meta.total
    )
}

fn revision_row(revision: &ResumeRevision) -> String {
    let mut out = format!("v{} · {}", revision.version, local_time(revision.created_at));
    if let Some(comment) = revision.comment.as_deref().filter(|c| !c.is_empty()) {
        out.push_str(&format!(" · {comment}"));
    }
    out.push_str("\n    ");
    out.push_str(&revision.content.replace('\n', "\n    "));
    out
}

pub fn revision_page(page: &RevisionPage) -> String {
    let mut out = format!(
        "Total: {} · page {}\n",
        page.meta.total,
        page.meta.label()
    );
    if page.items.is_empty() {
        out.push_str("No revisions yet");
        return out;
    }
    for revision in &page.items {
        out.push_str(&revision_row(revision));
        out.push('\n');
    }
    out
}

/// Renders the browse view: search line, rows padded to a full page, pager line.
pub fn snapshot(snapshot: &ListSnapshot<Resume>) -> String {
    let mut out = format!("search: {}\n", snapshot.query);
    match snapshot.phase {
        ListPhase::Idle => out.push_str("loading…\n"),
        ListPhase::Failed(_) => {
            let message = snapshot.error.as_deref().unwrap_or("Request failed");
            out.push_str(&format!("error: {message}\n"));
        }
        ListPhase::Loaded if snapshot.items.is_empty() => {
            out.push_str(EMPTY_LIST);
            out.push('\n');
        }
        ListPhase::Loaded => {
            for resume in &snapshot.items {
                out.push_str(&resume_row(resume));
                out.push('\n');
            }
            out.push_str(&"·\n".repeat(snapshot.placeholder_rows()));
        }
    }
    let prev = if snapshot.can_prev() { "[:p] ←" } else { "     " };
    let next = if snapshot.can_next() { "→ [:n]" } else { "" };
    out.push_str(&format!("{prev}  {}  {next}", snapshot.page_label()));
    out
}
