use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Request, Response};

use super::{decode, ChatBackend};
use crate::error::ApiError;
use crate::models::{ChatAppRequest, ChatReply, Session, SessionHistory, SessionLoadRequest};
use crate::session_api::SessionApi;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session_api: SessionApi,
}

impl ApiClient {
    pub fn new(base_url: &str, session_api: SessionApi) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_api,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session_api(&self) -> SessionApi {
        self.session_api
    }

    /// URL the backend serves a citation's document from. No I/O.
    pub fn citation_file_path(&self, citation: &str) -> String {
        format!("{}/content/{}", self.base_url, citation)
    }

    // Request builders. Pure: nothing is sent until `execute`.

    pub fn chat_request(&self, request: &ChatAppRequest) -> Result<Request, ApiError> {
        Ok(self
            .client
            .post(format!("{}/ai", self.base_url))
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .build()?)
    }

    pub fn citation_request(&self, citation: &str) -> Result<Request, ApiError> {
        Ok(self.client.get(self.citation_file_path(citation)).build()?)
    }

    pub fn sessions_request(&self) -> Result<Request, ApiError> {
        let url = match self.session_api {
            SessionApi::PathParams => format!("{}/session/list", self.base_url),
            SessionApi::JsonBody => format!("{}/sessions", self.base_url),
        };
        Ok(self.client.get(url).build()?)
    }

    pub fn session_history_request(&self, session_id: &str) -> Result<Request, ApiError> {
        let request = match self.session_api {
            SessionApi::PathParams => self
                .client
                .get(format!("{}/session/load/{}", self.base_url, session_id)),
            SessionApi::JsonBody => self
                .client
                .post(format!("{}/sessions/load", self.base_url))
                .json(&SessionLoadRequest { session_id }),
        };
        Ok(request.build()?)
    }

    pub async fn chat(&self, request: &ChatAppRequest) -> Result<ChatReply, ApiError> {
        let http_request = self.chat_request(request)?;
        tracing::debug!(
            url = %http_request.url(),
            session_id = %request.session_id,
            "sending chat request"
        );

        let response = self.client.execute(http_request).await?;
        let status = response.status();
        let content_type = content_type(&response);
        let body = response.text().await?;
        tracing::debug!(%status, content_type = ?content_type, "chat response received");

        decode::chat_reply(status, content_type.as_deref(), &body)
    }

    pub async fn citation_content(&self, citation: &str) -> Result<String, ApiError> {
        let response = self.client.execute(self.citation_request(citation)?).await?;

        if !response.status().is_success() {
            return Err(ApiError::status(response.status()));
        }
        Ok(response.text().await?)
    }

    pub async fn sessions(&self) -> Result<Vec<Session>, ApiError> {
        let response = self.client.execute(self.sessions_request()?).await?;
        let status = response.status();
        let body = response.text().await?;

        decode::session_list(self.session_api, status, &body)
    }

    pub async fn session_history(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionHistory>, ApiError> {
        let request = self.session_history_request(session_id)?;
        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        decode::session_history(self.session_api, status, &body)
    }
}

fn content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn chat(&self, request: &ChatAppRequest) -> Result<ChatReply, ApiError> {
        ApiClient::chat(self, request).await
    }

    async fn sessions(&self) -> Result<Vec<Session>, ApiError> {
        ApiClient::sessions(self).await
    }

    async fn session_history(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionHistory>, ApiError> {
        ApiClient::session_history(self, session_id).await
    }

    async fn citation_content(&self, citation: &str) -> Result<String, ApiError> {
        ApiClient::citation_content(self, citation).await
    }
}
