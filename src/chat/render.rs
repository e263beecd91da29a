//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction that allows
//! for different output styles. The default implementation uses ANSI
//! escape codes for styling reasoning text differently from regular text.

use std::io::{self, Write};

use crate::chat::session::SessionSnapshot;
use crate::types::Usage;

/// ANSI escape code for dim text (used for reasoning and usage).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text (used for reasoning).
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Capturing output in tests
pub trait Renderer: Send {
    /// Print a chunk of regular response text.
    ///
    /// This is called incrementally as tokens are streamed from the API.
    fn print_text(&mut self, text: &str);

    /// Print a chunk of reasoning text.
    ///
    /// Reasoning is displayed differently (dim/italic) to distinguish it
    /// from the main response.
    fn print_thinking(&mut self, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print the token usage of a finished response.
    fn print_usage(&mut self, usage: &Usage);

    /// Called when a response is complete.
    ///
    /// Used to ensure proper newlines and cleanup after streaming.
    fn finish_response(&mut self);

    /// Called when the stream is interrupted by the user.
    fn print_interrupted(&mut self);
}

/// Formats a usage snapshot as a single line.
pub fn format_usage(usage: &Usage) -> String {
    let mut parts = Vec::new();
    if let Some(prompt) = usage.prompt_tokens {
        parts.push(format!("prompt {prompt}"));
    }
    if let Some(completion) = usage.completion_tokens {
        parts.push(format!("completion {completion}"));
    }
    if let Some(reasoning) = usage.reasoning_tokens() {
        parts.push(format!("reasoning {reasoning}"));
    }
    if let Some(total) = usage.total_tokens {
        parts.push(format!("total {total}"));
    }
    if parts.is_empty() {
        "[tokens: unknown]".to_string()
    } else {
        format!("[tokens: {}]", parts.join(", "))
    }
}

/// Plain text renderer with optional ANSI styling.
///
/// This renderer writes response text to stdout (or any writer) with optional
/// ANSI escape codes for styling reasoning and usage.
pub struct PlainTextRenderer {
    out: Box<dyn Write + Send>,
    use_color: bool,
    in_thinking: bool,
    line_start: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(Box::new(io::stdout()), use_color)
    }

    /// Creates a renderer that writes to `out` instead of stdout.
    pub fn with_writer(out: Box<dyn Write + Send>, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            in_thinking: false,
            line_start: true,
        }
    }

    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
        self.line_start = text.ends_with('\n');
    }

    fn reset_thinking(&mut self) {
        if self.in_thinking {
            if self.use_color {
                self.write(ANSI_RESET);
            }
            self.write("\n");
            self.in_thinking = false;
        }
    }

    fn ensure_line_start(&mut self) {
        if !self.line_start {
            self.write("\n");
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, text: &str) {
        self.reset_thinking();
        self.write(text);
    }

    fn print_thinking(&mut self, text: &str) {
        if !self.in_thinking {
            if self.use_color {
                self.write(ANSI_DIM);
                self.write(ANSI_ITALIC);
            } else {
                self.write("[thinking] ");
            }
            self.in_thinking = true;
        }
        self.write(text);
    }

    fn print_error(&mut self, error: &str) {
        self.reset_thinking();
        self.ensure_line_start();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.reset_thinking();
        self.ensure_line_start();
        self.write(&format!("{info}\n"));
    }

    fn print_usage(&mut self, usage: &Usage) {
        self.reset_thinking();
        self.ensure_line_start();
        let line = format_usage(usage);
        if self.use_color {
            self.write(&format!("{ANSI_DIM}{line}{ANSI_RESET}\n"));
        } else {
            self.write(&format!("{line}\n"));
        }
    }

    fn finish_response(&mut self) {
        self.reset_thinking();
        self.ensure_line_start();
    }

    fn print_interrupted(&mut self) {
        self.reset_thinking();
        self.ensure_line_start();
        self.write("[interrupted]\n");
    }
}

/// Tracks how much of a streaming session has been printed.
///
/// Snapshots can be coalesced by the watch channel, so each call prints only the part of the
/// buffer that has not been printed yet.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    text: usize,
    reasoning: usize,
}

impl StreamPrinter {
    /// Creates a printer for a new response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints whatever `snapshot` holds beyond what was already printed.
    pub fn render(&mut self, snapshot: &SessionSnapshot, renderer: &mut dyn Renderer) {
        if !snapshot.active {
            return;
        }
        if let Some(reasoning) = snapshot.reasoning.get(self.reasoning..)
            && !reasoning.is_empty()
        {
            renderer.print_thinking(reasoning);
            self.reasoning = snapshot.reasoning.len();
        }
        if let Some(text) = snapshot.buffer.get(self.text..)
            && !text.is_empty()
        {
            renderer.print_text(text);
            self.text = snapshot.buffer.len();
        }
    }

    /// Prints the tail of a committed response that no snapshot showed.
    pub fn finish(&mut self, committed: &str, renderer: &mut dyn Renderer) {
        if let Some(tail) = committed.get(self.text..)
            && !tail.is_empty()
        {
            renderer.print_text(tail);
        }
        self.text = committed.len();
    }

    /// Returns true if any response text was printed.
    pub fn printed_text(&self) -> bool {
        self.text > 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::chat::session::SessionState;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Renderer for Recorder {
        fn print_text(&mut self, text: &str) {
            self.events.push(format!("text:{text}"));
        }
        fn print_thinking(&mut self, text: &str) {
            self.events.push(format!("thinking:{text}"));
        }
        fn print_error(&mut self, error: &str) {
            self.events.push(format!("error:{error}"));
        }
        fn print_info(&mut self, info: &str) {
            self.events.push(format!("info:{info}"));
        }
        fn print_usage(&mut self, usage: &Usage) {
            self.events.push(format_usage(usage));
        }
        fn finish_response(&mut self) {
            self.events.push("finish".to_string());
        }
        fn print_interrupted(&mut self) {
            self.events.push("interrupted".to_string());
        }
    }

    fn streaming(buffer: &str, reasoning: &str) -> SessionSnapshot {
        SessionSnapshot {
            state: SessionState::Streaming,
            active: true,
            buffer: buffer.to_string(),
            reasoning: reasoning.to_string(),
            usage: None,
            messages: Arc::from(Vec::new()),
            last_error: None,
        }
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn plain_output_marks_reasoning() {
        let buffer = SharedBuffer::default();
        let mut renderer = PlainTextRenderer::with_writer(Box::new(buffer.clone()), false);
        renderer.print_thinking("hmm");
        renderer.print_text("Hello");
        renderer.finish_response();
        renderer.print_usage(&Usage::new(5, 2));
        assert_eq!(
            buffer.contents(),
            "[thinking] hmm\nHello\n[tokens: prompt 5, completion 2, total 7]\n"
        );
    }

    #[test]
    fn colored_reasoning_is_reset() {
        let buffer = SharedBuffer::default();
        let mut renderer = PlainTextRenderer::with_writer(Box::new(buffer.clone()), true);
        renderer.print_thinking("hmm");
        renderer.print_text("ok");
        let contents = buffer.contents();
        assert!(contents.starts_with(ANSI_DIM));
        assert!(contents.contains(&format!("hmm{ANSI_RESET}\nok")));
    }

    #[test]
    fn usage_formatting() {
        assert_eq!(format_usage(&Usage::default()), "[tokens: unknown]");
        assert_eq!(format_usage(&Usage::total(9)), "[tokens: total 9]");
        assert_eq!(
            format_usage(&Usage::new(3, 4).with_reasoning_tokens(2)),
            "[tokens: prompt 3, completion 4, reasoning 2, total 7]"
        );
    }

    #[test]
    fn stream_printer_prints_only_new_text() {
        let mut printer = StreamPrinter::new();
        let mut recorder = Recorder::default();
        printer.render(&streaming("", "why"), &mut recorder);
        printer.render(&streaming("He", "why"), &mut recorder);
        printer.render(&streaming("Hello", "why"), &mut recorder);
        printer.render(&streaming("Hello", "why"), &mut recorder);
        printer.finish("Hello, world", &mut recorder);
        assert_eq!(
            recorder.events,
            vec!["thinking:why", "text:He", "text:llo", "text:, world"]
        );
        assert!(printer.printed_text());
    }

    #[test]
    fn stream_printer_ignores_inactive_snapshots() {
        let mut printer = StreamPrinter::new();
        let mut recorder = Recorder::default();
        let mut snapshot = streaming("stale", "");
        snapshot.active = false;
        printer.render(&snapshot, &mut recorder);
        assert!(recorder.events.is_empty());
        assert!(!printer.printed_text());
    }
}
