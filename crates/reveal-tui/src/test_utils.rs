//! Test utilities for reveal-tui rendering tests.

use crate::app::App;
use ratatui::{backend::TestBackend, Terminal};

pub use crate::headless::buffer_to_string;

/// Create a test terminal with custom dimensions.
pub fn create_test_terminal_sized(width: u16, height: u16) -> Terminal<TestBackend> {
    let backend = TestBackend::new(width, height);
    Terminal::new(backend).expect("Failed to create test terminal")
}

/// Render the app and return the screen as a string.
pub fn render_app_to_string(terminal: &mut Terminal<TestBackend>, app: &App) -> String {
    terminal
        .draw(|frame| app.render(frame))
        .expect("Failed to draw");
    buffer_to_string(terminal.backend().buffer())
}
