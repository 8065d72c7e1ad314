//! One in-flight response: fragments in, previews out, a transcript entry at
//! the end.

use std::fmt::Display;

use futures_util::{Stream, StreamExt};

use crate::accumulator::StreamAccumulator;
use crate::render::Renderer;
use crate::splitter::{MarkerSplitter, SplitResult};
use crate::transcript::{Message, Transcript};

/// A finished response: the raw message appended to the transcript and the
/// view that was rendered for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub message: Message,
    pub view: SplitResult,
}

/// Result of [`StreamSession::drive`]. A stream that failed part-way still
/// produces a turn; `aborted` carries the error that ended it.
#[derive(Debug)]
pub struct Outcome<E> {
    pub turn: Turn,
    pub aborted: Option<E>,
}

pub struct StreamSession {
    accumulator: StreamAccumulator,
    splitter: MarkerSplitter,
    reveal_reasoning: bool,
}

impl StreamSession {
    pub fn new(splitter: MarkerSplitter, reveal_reasoning: bool) -> Self {
        Self {
            accumulator: StreamAccumulator::new(),
            splitter,
            reveal_reasoning,
        }
    }

    /// Takes effect from the next render on; message content is unaffected.
    pub fn set_reveal_reasoning(&mut self, reveal: bool) {
        self.reveal_reasoning = reveal;
    }

    pub fn current(&self) -> &str {
        self.accumulator.current()
    }

    /// Append one fragment and render a preview of the buffer so far.
    pub fn push<R: Renderer + ?Sized>(&mut self, fragment: &str, renderer: &mut R) -> SplitResult {
        let buffer = self.accumulator.append(fragment);
        let view = self.splitter.preview(buffer, self.reveal_reasoning);
        renderer.preview(&view);
        view
    }

    /// End the stream: render the final view and record the raw text.
    pub fn finish<R: Renderer + ?Sized>(self, transcript: &mut Transcript, renderer: &mut R) -> Turn {
        let state = self.accumulator.finish();
        let view = self.splitter.split(&state.buffer, self.reveal_reasoning);
        renderer.finish(&view);
        let message = transcript.push_assistant(state.buffer).clone();
        Turn { message, view }
    }

    /// Consume `fragments` to the end, then finish.
    ///
    /// An `Err` item stops consumption; the text received before it is
    /// finalized exactly as a normal end of stream would be.
    pub async fn drive<S, E, R>(
        mut self,
        fragments: S,
        transcript: &mut Transcript,
        renderer: &mut R,
    ) -> Outcome<E>
    where
        S: Stream<Item = Result<String, E>>,
        E: Display,
        R: Renderer + ?Sized,
    {
        let mut fragments = std::pin::pin!(fragments);
        let mut aborted = None;
        let mut count = 0usize;
        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => {
                    count += 1;
                    self.push(&fragment, renderer);
                }
                Err(e) => {
                    tracing::warn!(
                        fragments = count,
                        buffered = self.current().len(),
                        "response stream aborted: {}",
                        e
                    );
                    aborted = Some(e);
                    break;
                }
            }
        }
        tracing::debug!(fragments = count, "response stream finished");
        let turn = self.finish(transcript, renderer);
        Outcome { turn, aborted }
    }
}
