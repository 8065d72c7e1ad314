//! Streaming chat and document Q&A client for OpenAI-compatible LLM APIs.
//! Reasoning regions (`<think>…</think>`) are split from the visible answer
//! incrementally as the response streams in.

pub mod accumulator;
pub mod client;
pub mod config;
pub mod document;
pub mod messages;
pub mod render;
pub mod session;
pub mod splitter;
pub mod transcript;

pub use accumulator::{StreamAccumulator, StreamState};
pub use client::{Client, ClientError, FragmentStream};
pub use config::{default_config_path, ApiSection, ChatSection, Config, ConfigError, SamplingSection};
pub use document::{Document, DocumentError};
pub use messages::ChatRequest;
pub use render::{render_history, Recorder, Renderer, TerminalRenderer};
pub use session::{Outcome, StreamSession, Turn};
pub use splitter::{MarkerPair, MarkerSplitter, SplitResult};
pub use transcript::{Message, Role, Transcript};
