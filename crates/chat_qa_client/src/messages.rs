//! OpenAI-compatible chat completion wire types (request body, SSE chunks,
//! non-streaming response, error body).

use serde::{Deserialize, Serialize};

use crate::config::SamplingSection;
use crate::transcript::Message;

/// Client → server: `POST /chat/completions` body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    pub stream: bool,
}

impl<'a> ChatRequest<'a> {
    pub fn new(model: &'a str, messages: &'a [Message], sampling: &SamplingSection) -> Self {
        Self {
            model,
            messages,
            temperature: sampling.temperature(),
            top_p: sampling.top_p(),
            max_tokens: sampling.max_tokens(),
            frequency_penalty: Some(sampling.frequency_penalty()),
            presence_penalty: Some(sampling.presence_penalty()),
            stream: true,
        }
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Leave both penalties out of the request body.
    pub fn without_penalties(mut self) -> Self {
        self.frequency_penalty = None;
        self.presence_penalty = None;
        self
    }
}

/// Server → client: one `data:` payload of a streamed response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Delta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatChunk {
    /// Text carried by the first choice, if any.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Server → client: non-streaming response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletion {
    pub fn into_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

/// Server → client: error body (`{"error": {"message": ...}}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
}

/// What one SSE `data:` payload means for the fragment stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPayload {
    Fragment(String),
    /// Role-only deltas, usage reports, keep-alives.
    Empty,
    Done,
}

impl StreamPayload {
    pub fn from_data(data: &str) -> Result<Self, serde_json::Error> {
        let data = data.trim();
        if data == "[DONE]" {
            return Ok(StreamPayload::Done);
        }
        if data.is_empty() {
            return Ok(StreamPayload::Empty);
        }
        let chunk: ChatChunk = serde_json::from_str(data)?;
        Ok(match chunk.content() {
            Some(text) => StreamPayload::Fragment(text.to_owned()),
            None => StreamPayload::Empty,
        })
    }
}
