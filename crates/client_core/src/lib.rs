//! Client side of the resume service: HTTP access, token lifecycle and the
//! debounced, paginated list controller used by the front ends.

pub mod api;
pub mod debounce;
pub mod error;
pub mod list;
pub mod source;
pub mod token;

pub use api::{ResponseBody, ResumeClient};
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE};
pub use error::{ClientError, ClientResult};
pub use list::{ListController, ListEvent, ListOptions, ListPhase, ListSnapshot};
pub use source::{PageSource, RevisionSource};
pub use token::{FileTokenStorage, MemoryTokenStorage, TokenStorage, TokenStore};
