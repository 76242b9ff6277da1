//! Chat transcript pane.
//!
//! Shows the user's prompt right-aligned, then the assistant's revealed
//! messages, one paragraph per entry.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::ui::text::{visual_width, wrap_text};
use crate::ui::theme::{Styles, Symbols};

/// Default name shown above the assistant's messages.
pub const ASSISTANT_NAME: &str = "Chroney";

/// Chat transcript pane.
///
/// ```text
/// ┌ sales ─────────────────────┐
/// │             Do you have it?│
/// │                            │
/// │Chroney                     │
/// │Yes! Sizes 7–11.            │
/// │                            │
/// │Want▌                       │
/// └────────────────────────────┘
/// ```
pub struct ChatPane<'a> {
    title: Option<&'a str>,
    prompt: &'a str,
    assistant: &'a str,
    revealed: &'a [String],
    typing: bool,
}

impl<'a> ChatPane<'a> {
    /// Create a new pane for `prompt` and the assistant's revealed messages.
    pub fn new(prompt: &'a str, revealed: &'a [String]) -> Self {
        Self {
            title: None,
            prompt,
            assistant: ASSISTANT_NAME,
            revealed,
            typing: false,
        }
    }

    /// Set the pane title.
    #[must_use]
    pub fn title(mut self, title: &'a str) -> Self {
        self.title = Some(title);
        self
    }

    /// Set the assistant label.
    #[must_use]
    pub fn assistant(mut self, name: &'a str) -> Self {
        self.assistant = name;
        self
    }

    /// Show the typing cursor after the last revealed character.
    #[must_use]
    pub fn typing(mut self, typing: bool) -> Self {
        self.typing = typing;
        self
    }

    /// Build the transcript lines for an inner width.
    fn lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        if !self.prompt.is_empty() {
            let bubble_width = (width * 4 / 5).max(1);
            for line in wrap_text(self.prompt, bubble_width) {
                let pad = width.saturating_sub(visual_width(&line));
                lines.push(Line::from(vec![
                    Span::raw(" ".repeat(pad)),
                    Span::styled(line, Styles::user()),
                ]));
            }
            lines.push(Line::default());
        }

        lines.push(Line::from(Span::styled(
            self.assistant.to_string(),
            Styles::assistant_label(),
        )));

        for (index, entry) in self.revealed.iter().enumerate() {
            if index > 0 {
                lines.push(Line::default());
            }
            lines.extend(wrap_text(entry, width).into_iter().map(Line::from));
        }

        if self.typing {
            let cursor = Span::styled(Symbols::CURSOR, Styles::cursor());
            match lines.last_mut() {
                Some(last) if !self.revealed.is_empty() => last.spans.push(cursor),
                _ => lines.push(Line::from(cursor)),
            }
        }

        lines
    }
}

impl Widget for ChatPane<'_> {
    #[allow(clippy::cast_possible_truncation)]
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(if self.typing {
                Styles::border_active()
            } else {
                Styles::border()
            });

        if let Some(title) = self.title {
            block = block.title(format!(" {title} ")).title_style(Styles::title());
        }

        let inner = block.inner(area);
        block.render(area, buf);

        let lines = self.lines(inner.width as usize);

        // Keep the newest text in view
        let overflow = lines.len().saturating_sub(inner.height as usize);
        let scroll = u16::try_from(overflow).unwrap_or(u16::MAX);

        Paragraph::new(lines)
            .style(Styles::default())
            .scroll((scroll, 0))
            .render(inner, buf);
    }
}
