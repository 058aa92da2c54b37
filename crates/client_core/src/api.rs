//! Typed HTTP client for the resume backend.

use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use shared::{
    domain::ResumeId,
    protocol::{
        Credentials, ErrorBody, PageQuery, Resume, ResumeCreate, ResumePage, ResumeUpdate,
        RevisionPage, TokenResponse,
    },
};
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, ClientResult, DEFAULT_ERROR_MESSAGE},
    token::TokenStore,
};

/// Successful response body: decoded JSON when the server says so, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn into_json<T: DeserializeOwned>(self) -> ClientResult<T> {
        match self {
            Self::Json(value) => T::deserialize(&value).map_err(|err| ClientError::MalformedResponse {
                raw: value.to_string(),
                reason: err.to_string(),
            }),
            Self::Text(raw) => Err(ClientError::MalformedResponse {
                raw,
                reason: "expected a JSON body".to_string(),
            }),
        }
    }
}

pub struct ResumeClient {
    http: Client,
    base_url: String,
    tokens: TokenStore,
}

impl ResumeClient {
    pub fn new(base_url: impl Into<String>, tokens: TokenStore) -> Self {
        Self::with_http(Client::new(), base_url, tokens)
    }

    pub fn with_http(http: Client, base_url: impl Into<String>, tokens: TokenStore) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub async fn login(&self, credentials: &Credentials) -> ClientResult<TokenResponse> {
        self.authenticate("login", credentials).await
    }

    pub async fn register(&self, credentials: &Credentials) -> ClientResult<TokenResponse> {
        self.authenticate("register", credentials).await
    }

    async fn authenticate(
        &self,
        action: &str,
        credentials: &Credentials,
    ) -> ClientResult<TokenResponse> {
        let token: TokenResponse = self
            .send_json(
                self.http
                    .post(self.url(&format!("/auth/{action}")))
                    .json(credentials),
            )
            .await?;
        self.tokens.set(&token.access_token)?;
        info!(email = %credentials.email, action, "signed in");
        Ok(token)
    }

    pub fn logout(&self) -> ClientResult<()> {
        self.tokens.clear()
    }

    pub async fn list_resumes(&self, query: &PageQuery) -> ClientResult<ResumePage> {
        self.send_json(self.http.get(self.url("/resume")).query(query))
            .await
    }

    pub async fn get_resume(&self, id: ResumeId) -> ClientResult<Resume> {
        self.send_json(self.http.get(self.url(&format!("/resume/{id}"))))
            .await
    }

    pub async fn create_resume(&self, resume: &ResumeCreate) -> ClientResult<Resume> {
        self.send_json(self.http.post(self.url("/resume")).json(resume))
            .await
    }

    /// The backend replaces both fields on every update, so a partial update is
    /// completed from the stored resume first.
    pub async fn update_resume(&self, id: ResumeId, update: &ResumeUpdate) -> ClientResult<Resume> {
        let body = match (&update.title, &update.content) {
            (Some(title), Some(content)) => ResumeCreate {
                title: title.clone(),
                content: content.clone(),
            },
            _ => update.clone().fill_from(self.get_resume(id).await?),
        };
        self.send_json(
            self.http
                .patch(self.url(&format!("/resume/{id}")))
                .json(&body),
        )
        .await
    }

    pub async fn delete_resume(&self, id: ResumeId) -> ClientResult<ResponseBody> {
        self.send(self.http.delete(self.url(&format!("/resume/{id}"))))
            .await
    }

    pub async fn improve_resume(&self, id: ResumeId) -> ClientResult<Resume> {
        self.send_json(self.http.post(self.url(&format!("/resume/{id}/improve"))))
            .await
    }

    pub async fn resume_history(
        &self,
        id: ResumeId,
        page: u32,
        per_page: u32,
    ) -> ClientResult<RevisionPage> {
        self.send_json(
            self.http
                .get(self.url(&format!("/resume/{id}/history")))
                .query(&[("page", page.max(1)), ("per_page", per_page)]),
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        self.send(request).await?.into_json()
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<ResponseBody> {
        let request = match self.tokens.get() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));
        let raw = response.text().await?;

        if !status.is_success() {
            let message =
                ErrorBody::message_from(&raw).unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
            warn!(status = status.as_u16(), path = %url, error = %message, "request rejected");
            return Err(ClientError::from_status(status.as_u16(), message));
        }

        debug!(status = status.as_u16(), path = %url, "request completed");
        if !is_json {
            return Ok(ResponseBody::Text(raw));
        }
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(ResponseBody::Json(value)),
            Err(err) => {
                warn!(path = %url, error = %err, "JSON response did not parse; keeping raw text");
                Ok(ResponseBody::Text(raw))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
