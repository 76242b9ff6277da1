//! Headless mode for the reveal TUI.
//!
//! This module runs the app without a real terminal, enabling E2E testing
//! and automation. Actions are sent via channels and screen state is
//! captured after each render.

use crate::app::App;
use crate::event::Action;
use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};
use reveal_engine::{RevealConfig, RevealSnapshot};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Default terminal dimensions for headless mode.
pub const DEFAULT_WIDTH: u16 = 80;
pub const DEFAULT_HEIGHT: u16 = 24;

/// State captured from the headless TUI after each render.
#[derive(Debug, Clone, Default)]
pub struct HeadlessState {
    /// Name of the script being played.
    pub script: Option<String>,
    /// Snapshot that was rendered.
    pub snapshot: RevealSnapshot,
    /// Text contents of the terminal buffer.
    pub screen_contents: String,
    /// Whether the TUI should quit.
    pub should_quit: bool,
    /// Whether help overlay is visible.
    pub show_help: bool,
}

/// Handle to control a headless TUI instance.
///
/// Use this to send actions and observe state changes.
pub struct HeadlessHandle {
    action_tx: mpsc::UnboundedSender<Action>,
    state_rx: watch::Receiver<HeadlessState>,
}

impl HeadlessHandle {
    /// Send an action to the TUI.
    ///
    /// Returns `true` if the action was sent successfully.
    pub fn send_action(&self, action: Action) -> bool {
        self.action_tx.send(action).is_ok()
    }

    /// Get the current state of the TUI.
    pub fn state(&self) -> HeadlessState {
        self.state_rx.borrow().clone()
    }

    /// Wait until a condition is met on the state.
    ///
    /// Returns the state when the condition is met, or `None` if timed out.
    pub async fn wait_for<F>(&mut self, condition: F, timeout: Duration) -> Option<HeadlessState>
    where
        F: Fn(&HeadlessState) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let state = self.state();
            if condition(&state) {
                return Some(state);
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }

            match tokio::time::timeout(remaining, self.state_rx.changed()).await {
                Ok(Ok(())) => {}
                _ => return None,
            }
        }
    }

    /// Wait for specific text to appear on screen.
    pub async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> Option<HeadlessState> {
        self.wait_for(|s| s.screen_contents.contains(text), timeout)
            .await
    }

    /// Check if the TUI has quit.
    pub fn has_quit(&self) -> bool {
        self.state().should_quit
    }
}

/// Configuration for headless mode.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Terminal width.
    pub width: u16,
    /// Terminal height.
    pub height: u16,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// Run the TUI in headless mode.
///
/// Returns a handle to control the TUI and a join handle for the background task.
///
/// # Example
///
/// ```ignore
/// let (mut handle, task) = run_tui_headless(RevealConfig::default(), None, HeadlessConfig::default());
///
/// handle.send_action(Action::NextScript);
/// let state = handle.wait_for_text("I can help with that.", Duration::from_secs(5)).await;
///
/// handle.send_action(Action::Quit);
/// task.await.unwrap();
/// ```
pub fn run_tui_headless(
    config: RevealConfig,
    script: Option<String>,
    headless: HeadlessConfig,
) -> (HeadlessHandle, JoinHandle<Result<(), String>>) {
    let (action_tx, action_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(HeadlessState::default());

    let task = tokio::spawn(async move {
        run_headless_loop(config, script, headless, action_rx, state_tx)
            .await
            .map_err(|e| e.to_string())
    });

    let handle = HeadlessHandle {
        action_tx,
        state_rx,
    };

    (handle, task)
}

/// What woke the headless loop.
enum Step {
    Action(Option<Action>),
    Redraw,
}

async fn run_headless_loop(
    config: RevealConfig,
    script: Option<String>,
    headless: HeadlessConfig,
    mut action_rx: mpsc::UnboundedReceiver<Action>,
    state_tx: watch::Sender<HeadlessState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let backend = TestBackend::new(headless.width, headless.height);
    let mut terminal = Terminal::new(backend)?;
    let mut app = App::new(config, script.as_deref())?;

    loop {
        terminal.draw(|frame| app.render(frame))?;

        state_tx.send_replace(HeadlessState {
            script: app.script().map(|s| s.name.clone()),
            snapshot: app.snapshot.clone(),
            screen_contents: buffer_to_string(terminal.backend().buffer()),
            should_quit: app.should_quit,
            show_help: app.show_help,
        });

        if app.should_quit {
            return Ok(());
        }

        let step = tokio::select! {
            action = action_rx.recv() => Step::Action(action),
            () = app.next_snapshot() => Step::Redraw,
        };

        match step {
            Step::Action(Some(action)) => app.handle_action(action),
            // Every handle is gone; nobody is watching anymore
            Step::Action(None) => return Ok(()),
            Step::Redraw => {}
        }
    }
}

/// Convert a buffer to a string representation.
///
/// One line per row, trailing whitespace trimmed.
pub fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut result = String::new();

    for y in area.y..area.y + area.height {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buffer.cell((x, y)) {
                result.push_str(cell.symbol());
            }
        }
        while result.ends_with(' ') {
            result.pop();
        }
        result.push('\n');
    }

    if result.ends_with('\n') {
        result.pop();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use reveal_engine::Script;

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[tokio::test(start_paused = true)]
    async fn test_plays_default_script() {
        let (mut handle, task) =
            run_tui_headless(RevealConfig::default(), None, HeadlessConfig::default());

        let state = handle
            .wait_for_text("Yes! Nike Air Max 90 is available in sizes 7–11.", TIMEOUT)
            .await
            .unwrap();
        assert_eq!(state.script.as_deref(), Some("sales"));
        assert!(state.screen_contents.contains("Do you have Nike Air Max 90 in stock?"));

        let done = handle.wait_for(|s| s.snapshot.is_done(), TIMEOUT).await.unwrap();
        assert!(done
            .screen_contents
            .contains("Would you like to see the color options"));

        assert!(handle.send_action(Action::Quit));
        assert!(task.await.unwrap().is_ok());
        assert!(handle.has_quit());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_script_clears_old_text() {
        let config = RevealConfig {
            speed_ms: 10,
            scripts: vec![
                Script::new("one", "first?", &["Alpha alpha alpha"]),
                Script::new("two", "second?", &["Beta"]),
            ],
        };
        let (mut handle, task) = run_tui_headless(config, None, HeadlessConfig::default());

        handle.wait_for_text("Alpha", TIMEOUT).await.unwrap();
        handle.send_action(Action::NextScript);

        let state = handle
            .wait_for(
                |s| s.script.as_deref() == Some("two") && s.snapshot.is_done(),
                TIMEOUT,
            )
            .await
            .unwrap();
        assert!(state.screen_contents.contains("Beta"));
        assert!(!state.screen_contents.contains("Alpha"));
        assert_eq!(state.snapshot.generation, 2);

        handle.send_action(Action::Quit);
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_help_overlay() {
        let (mut handle, task) =
            run_tui_headless(RevealConfig::default(), None, HeadlessConfig::default());

        handle.send_action(Action::Help);
        let state = handle.wait_for(|s| s.show_help, TIMEOUT).await.unwrap();
        assert!(state.screen_contents.contains("Toggle this help"));

        handle.send_action(Action::Back);
        handle.wait_for(|s| !s.show_help, TIMEOUT).await.unwrap();

        handle.send_action(Action::Quit);
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_loop() {
        let (handle, task) =
            run_tui_headless(RevealConfig::default(), None, HeadlessConfig::default());
        drop(handle);
        assert!(task.await.unwrap().is_ok());
    }
}
