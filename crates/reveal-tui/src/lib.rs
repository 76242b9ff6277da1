//! reveal-tui: Terminal host for the reveal engine
//!
//! This crate mounts a `SequentialRevealEngine` and renders what it reveals:
//! - Chat transcript pane, one paragraph per revealed message
//! - Script switching, replay and speed control
//! - Headless mode for testing and automation

mod app;
mod event;
pub mod headless;
#[cfg(test)]
pub mod test_utils;
mod ui;

pub use app::App;
pub use event::{key_to_action, Action, Event, EventHandler};
pub use reveal_engine;

use crossterm::{
    cursor::Show as ShowCursor,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use reveal_engine::RevealConfig;
use std::io::{self, stdout};

/// Tick rate for input polling, in milliseconds.
const TICK_RATE_MS: u64 = 250;

/// RAII guard for terminal state restoration.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), LeaveAlternateScreen, ShowCursor);
    }
}

/// What woke the main loop.
enum Step {
    Event(Option<Event>),
    Redraw,
}

/// Run the TUI application.
///
/// Plays `script` (or the first configured script) and returns when the user
/// quits. The terminal is restored on exit, including on error.
pub async fn run_tui(
    config: RevealConfig,
    script: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Create the app first so a missing runtime never leaves raw mode on
    let mut app = App::new(config, script)?;

    enable_raw_mode()?;
    let _guard = TerminalGuard;

    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut events = EventHandler::new(TICK_RATE_MS);

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    terminal.show_cursor()?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventHandler,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|frame| app.render(frame))?;

        if app.should_quit {
            return Ok(());
        }

        let step = tokio::select! {
            event = events.next() => Step::Event(event),
            () = app.next_snapshot() => Step::Redraw,
        };

        match step {
            Step::Event(Some(Event::Key(key))) => app.handle_action(key_to_action(key)),
            Step::Event(Some(Event::Tick | Event::Resize(..))) | Step::Redraw => {}
            Step::Event(None) => return Ok(()),
        }
    }
}
