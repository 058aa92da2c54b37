//! Searchable, paginated list view: pure state plus its async controller.

pub mod controller;
pub mod state;

pub use controller::{ListController, ListEvent, ListOptions, DEFAULT_PER_PAGE};
pub use state::{Applied, FailureKind, FetchParams, FetchRequest, ListPhase, ListSnapshot, ListState};
