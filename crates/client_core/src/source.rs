use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::ResumeId,
    protocol::{Page, PageQuery, Resume, ResumeRevision},
};

use crate::{api::ResumeClient, error::ClientResult};

/// Anything that can serve one page of a collection.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> ClientResult<Page<T>>;
}

#[async_trait]
impl PageSource<Resume> for ResumeClient {
    async fn fetch_page(&self, query: &PageQuery) -> ClientResult<Page<Resume>> {
        self.list_resumes(query).await
    }
}

/// Revision history of one resume. The history endpoint has no search, so `q` is ignored.
pub struct RevisionSource {
    client: Arc<ResumeClient>,
    resume_id: ResumeId,
}

impl RevisionSource {
    pub fn new(client: Arc<ResumeClient>, resume_id: ResumeId) -> Self {
        Self { client, resume_id }
    }
}

#[async_trait]
impl PageSource<ResumeRevision> for RevisionSource {
    async fn fetch_page(&self, query: &PageQuery) -> ClientResult<Page<ResumeRevision>> {
        self.client
            .resume_history(self.resume_id, query.page, query.per_page)
            .await
    }
}
