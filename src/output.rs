//! Output rendering abstraction for tether.
//!
//! Defines the [`Renderer`] trait that decouples the agent loop from the
//! display layer. [`StdoutRenderer`] streams raw model text to the terminal
//! as it arrives, then replaces it with the formatted message once the
//! directive has been parsed.

use colored::Colorize;
use std::io::{self, Write};

use crate::format;
use crate::message::Message;

/// Observer of a running turn. Every call happens on the loop's task, in
/// order.
pub trait Renderer {
    /// The model's text so far. Always cumulative, never a delta.
    fn render_partial(&mut self, cumulative: &str);

    /// The current completion stream ended (successfully or not).
    fn end_stream(&mut self);

    /// A message was appended to the conversation.
    fn render_message(&mut self, msg: &Message);

    /// The turn finished normally.
    fn render_done(&mut self);

    /// The turn was aborted.
    fn render_error(&mut self, err: &str);
}

/// Renders streaming output directly to stdout.
///
/// Raw text is printed as it arrives with an explicit flush so the user
/// sees a "typing" effect, then erased when the stream ends. Tracks the
/// number of partial updates received and buffers the printed text for
/// accurate visual line counting.
pub struct StdoutRenderer {
    update_count: usize,
    buffer: String,
    show_tools: bool,
}

impl StdoutRenderer {
    pub fn new() -> Self {
        Self {
            update_count: 0,
            buffer: String::new(),
            show_tools: true,
        }
    }

    /// Suppress tool result bodies, printing only their labels.
    pub fn quiet_tools(mut self) -> Self {
        self.show_tools = false;
        self
    }

    /// Returns the number of partial updates rendered this stream.
    pub fn update_count(&self) -> usize {
        self.update_count
    }

    /// Calculates the number of cursor-up movements needed to erase
    /// all streamed output.
    ///
    /// Accounts for terminal line wrapping by using the actual terminal width.
    pub fn visual_line_count(&self) -> usize {
        let width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80)
            .max(1); // prevent division by zero

        // Count visual lines the raw text occupies (including wrapping)
        let content_lines: usize = self
            .buffer
            .split('\n')
            .map(|line| {
                let len = line.chars().count();
                if len == 0 {
                    1
                } else {
                    len.div_ceil(width)
                }
            })
            .sum();

        // The first line doesn't need a cursor-up to reach
        content_lines.saturating_sub(1)
    }
}

impl Default for StdoutRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for StdoutRenderer {
    fn render_partial(&mut self, cumulative: &str) {
        // Print only what is new since the last update
        let Some(suffix) = cumulative.strip_prefix(self.buffer.as_str()) else {
            return;
        };
        print!("{}", suffix.dimmed());
        // Flush immediately so each update appears as it arrives
        io::stdout().flush().ok();
        self.buffer.push_str(suffix);
        self.update_count += 1;
    }

    fn end_stream(&mut self) {
        if !self.buffer.is_empty() {
            // Move to the start of the raw text, then clear to end of screen
            let up = self.visual_line_count();
            if up > 0 {
                print!("\r\x1b[{}A\x1b[J", up);
            } else {
                print!("\r\x1b[J");
            }
            io::stdout().flush().ok();
        }
        self.buffer.clear();
        self.update_count = 0;
    }

    fn render_message(&mut self, msg: &Message) {
        if self.show_tools || msg.tool_name.is_none() {
            println!("{}", format::format_message(msg));
        } else {
            println!("{}", format::format_tool_label(msg));
        }
        println!();
    }

    fn render_done(&mut self) {}

    fn render_error(&mut self, err: &str) {
        eprintln!();
        eprintln!("{} {}", "error:".red().bold(), err);
    }
}
