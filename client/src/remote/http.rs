//! HTTP client for `tasklist-server`.

use super::{RemoteCollection, RemoteError};
use crate::connectivity::Probe;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tasklist_engine::{FieldUpdate, RawDocument, TaskDocument, TaskId};

/// Response body of `GET /users/{user_id}/todos`.
#[derive(Debug, Deserialize)]
struct ListResponse {
    documents: Vec<RawDocument>,
}

/// Remote collection served over HTTP.
///
/// Requests carry a bearer token naming the user: the configured token, or
/// the owner id itself when none is configured.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpRemote {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url).map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client: Client::new(),
            base_url,
            token: None,
        })
    }

    /// Use a fixed bearer token instead of the owner id.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn document_url(&self, owner: &str, task_id: &str) -> Result<Url, RemoteError> {
        self.url(&["users", owner, "todos", task_id])
    }

    fn authorized(&self, request: RequestBuilder, owner: &str) -> RequestBuilder {
        request.bearer_auth(self.token.as_deref().unwrap_or(owner))
    }
}

/// Map non-success statuses to errors.
async fn check(response: Response, task_id: Option<&str>) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        if let Some(id) = task_id {
            return Err(RemoteError::NotFound(id.to_string()));
        }
    }

    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RemoteCollection for HttpRemote {
    fn new_document_id(&self) -> TaskId {
        uuid::Uuid::new_v4().simple().to_string()
    }

    async fn create(&self, owner: &str, document: &TaskDocument) -> Result<(), RemoteError> {
        let url = self.document_url(owner, &document.id)?;
        let response = self
            .authorized(self.client.put(url), owner)
            .json(document)
            .send()
            .await?;
        check(response, None).await?;
        Ok(())
    }

    async fn update_field(
        &self,
        owner: &str,
        task_id: &str,
        update: &FieldUpdate,
    ) -> Result<(), RemoteError> {
        let url = self.document_url(owner, task_id)?;
        let response = self
            .authorized(self.client.patch(url), owner)
            .json(update)
            .send()
            .await?;
        check(response, Some(task_id)).await?;
        Ok(())
    }

    async fn fetch_all(&self, owner: &str) -> Result<Vec<RawDocument>, RemoteError> {
        let url = self.url(&["users", owner, "todos"])?;
        let response = self.authorized(self.client.get(url), owner).send().await?;
        let list: ListResponse = check(response, None).await?.json().await?;
        Ok(list.documents)
    }

    async fn delete(&self, owner: &str, task_id: &str) -> Result<(), RemoteError> {
        let url = self.document_url(owner, task_id)?;
        let response = self.authorized(self.client.delete(url), owner).send().await?;
        check(response, None).await?;
        Ok(())
    }
}

#[async_trait]
impl Probe for HttpRemote {
    async fn is_reachable(&self) -> bool {
        let Ok(url) = self.url(&["health"]) else {
            return false;
        };
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::debug!(error = %err, "Health probe failed");
                false
            }
        }
    }
}
