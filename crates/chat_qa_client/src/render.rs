//! Renderers consume split results: one preview per fragment, one final view.

use std::io::{self, Write};

use crate::splitter::{MarkerSplitter, SplitResult};
use crate::transcript::{Role, Transcript};

const CURSOR: &str = "▌";

pub trait Renderer {
    /// Called after every fragment with the split of the buffer so far.
    fn preview(&mut self, view: &SplitResult);

    /// Called once when the stream has ended.
    fn finish(&mut self, view: &SplitResult);
}

/// Streams the visible text to a terminal (or any writer).
///
/// Visible text only ever grows in the common case, so each preview writes
/// just the new suffix. If the text changes in some other way the new view
/// starts on a fresh line.
pub struct TerminalRenderer<W: Write> {
    out: W,
    shown: String,
    cursor: bool,
    show_reasoning: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown: String::new(),
            cursor: false,
            show_reasoning: false,
        }
    }

    /// Draw a block cursor after the text while streaming.
    pub fn with_cursor(mut self, cursor: bool) -> Self {
        self.cursor = cursor;
        self
    }

    /// Print extracted reasoning under the answer once the stream ends.
    pub fn with_reasoning(mut self, show: bool) -> Self {
        self.show_reasoning = show;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, visible: &str) {
        match visible.strip_prefix(self.shown.as_str()) {
            Some(suffix) => {
                let _ = write!(self.out, "{}", suffix);
            }
            None => {
                if self.cursor {
                    let _ = write!(self.out, "\x1b[K");
                }
                let _ = write!(self.out, "\n{}", visible);
            }
        }
        self.shown.clear();
        self.shown.push_str(visible);
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn preview(&mut self, view: &SplitResult) {
        self.emit(&view.visible);
        if self.cursor {
            // Draw the cursor, then step back so the next write covers it.
            let _ = write!(self.out, "{}\u{8}", CURSOR);
        }
        let _ = self.out.flush();
    }

    fn finish(&mut self, view: &SplitResult) {
        self.emit(&view.visible);
        if self.cursor {
            let _ = write!(self.out, "\x1b[K");
        }
        let _ = writeln!(self.out);
        if self.show_reasoning {
            if let Some(reasoning) = view.reasoning.as_deref().filter(|r| !r.is_empty()) {
                let _ = writeln!(self.out, "\n[thinking]\n{}", reasoning);
            }
        }
        let _ = self.out.flush();
        self.shown.clear();
    }
}

/// Keeps every frame; handy for replays and tests.
#[derive(Debug, Default)]
pub struct Recorder {
    pub previews: Vec<SplitResult>,
    pub finished: Option<SplitResult>,
}

impl Renderer for Recorder {
    fn preview(&mut self, view: &SplitResult) {
        self.previews.push(view.clone());
    }

    fn finish(&mut self, view: &SplitResult) {
        self.finished = Some(view.clone());
    }
}

/// Re-render the visible history of a transcript, one message per block.
/// User input is shown as typed; assistant replies go through the splitter.
pub fn render_history<W: Write>(
    out: &mut W,
    transcript: &Transcript,
    splitter: &MarkerSplitter,
    reveal_reasoning: bool,
) -> io::Result<()> {
    for message in transcript.rendered() {
        let text = match message.role {
            Role::Assistant => splitter.split(&message.content, reveal_reasoning).visible,
            _ => message.content.clone(),
        };
        writeln!(out, "{}> {}\n", message.role, text)?;
    }
    out.flush()
}
