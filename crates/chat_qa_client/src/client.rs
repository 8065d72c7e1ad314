//! HTTP client for OpenAI-compatible `/chat/completions`: streamed replies
//! arrive as server-sent events and are handed out as text fragments.

use std::pin::Pin;

use async_stream::try_stream;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use reqwest::header::{self, HeaderMap, HeaderValue};
use thiserror::Error;

use crate::messages::{ApiErrorBody, ChatCompletion, ChatRequest, StreamPayload};

/// Lazy, forward-only sequence of response fragments. An `Err` item ends it.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("event stream error: {0}")]
    Stream(String),
    #[error("response contained no answer")]
    EmptyResponse,
    #[error("invalid API key header: {0}")]
    InvalidKey(#[from] header::InvalidHeaderValue),
}

/// Connection settings for one API endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
}

impl Client {
    /// `base_url` is the API root, e.g. `https://integrate.api.nvidia.com/v1`.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            headers,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<reqwest::Response, ClientError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            model = request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "sending chat completion request"
        );
        let response = self
            .http
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        tracing::error!(status = %status, endpoint = %self.endpoint, "API request failed: {}", message);
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Start a streamed completion. Fails only if the request itself is
    /// rejected; errors after that arrive as the last item of the stream.
    pub async fn stream_chat(&self, request: &ChatRequest<'_>) -> Result<FragmentStream, ClientError> {
        let request = request.clone().streaming(true);
        let response = self.send(&request).await?;

        Ok(Box::pin(fragments(response)))
    }

    /// Non-streaming completion; returns the whole answer at once.
    pub async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, ClientError> {
        let request = request.clone().streaming(false);
        let text = self.send(&request).await?.text().await?;
        tracing::trace!(body = %text, "completion response");
        let completion: ChatCompletion = serde_json::from_str(&text)?;
        completion.into_content().ok_or(ClientError::EmptyResponse)
    }
}

/// Turn an SSE response body into text fragments, stopping at `[DONE]`.
fn fragments(response: reqwest::Response) -> impl Stream<Item = Result<String, ClientError>> + Send {
    try_stream! {
        let mut events = std::pin::pin!(response.bytes_stream().eventsource());
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| ClientError::Stream(e.to_string()))?;
            tracing::trace!(data = %event.data, "sse event");
            match StreamPayload::from_data(&event.data)? {
                StreamPayload::Fragment(text) => {
                    yield text;
                }
                StreamPayload::Empty => {}
                StreamPayload::Done => break,
            }
        }
    }
}
