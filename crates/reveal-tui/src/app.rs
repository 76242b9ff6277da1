//! Application state for the reveal TUI.
//!
//! The app mounts one [`SequentialRevealEngine`] and feeds it the replies of
//! the selected script. Switching scripts hands the engine a new input, which
//! restarts the reveal; the app only ever renders the latest snapshot.

use crate::event::Action;
use crate::ui::{centered_fixed, main_layout, ChatPane, KeyHint, StatusBar, Styles};
use ratatui::{
    layout::Rect,
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use reveal_engine::{
    EngineError, RevealConfig, RevealPhase, RevealSnapshot, RevealSubscription, Script,
    SequentialRevealEngine, Speed,
};
use tracing::debug;

/// Main application state.
pub struct App {
    /// Loaded configuration (scripts and initial speed).
    pub config: RevealConfig,

    /// Index of the script being played.
    pub selected: usize,

    /// Latest snapshot from the engine.
    pub snapshot: RevealSnapshot,

    /// Whether the app should quit.
    pub should_quit: bool,

    /// Whether the help overlay is visible.
    pub show_help: bool,

    engine: SequentialRevealEngine,
    subscription: RevealSubscription,
}

impl App {
    /// Create the app and start playing `script` (or the first script).
    pub fn new(config: RevealConfig, script: Option<&str>) -> Result<Self, EngineError> {
        let selected = script
            .and_then(|name| config.scripts.iter().position(|s| s.name == name))
            .unwrap_or(0);
        let engine = SequentialRevealEngine::new(config.speed())?;
        let subscription = engine.subscribe();

        let mut app = Self {
            config,
            selected,
            snapshot: RevealSnapshot::default(),
            should_quit: false,
            show_help: false,
            engine,
            subscription,
        };
        app.play_selected();
        Ok(app)
    }

    /// The script being played, if any are configured.
    pub fn script(&self) -> Option<&Script> {
        self.config.scripts.get(self.selected)
    }

    /// Current reveal speed.
    pub fn speed(&self) -> Speed {
        self.engine.speed()
    }

    /// Current engine generation.
    pub fn generation(&self) -> u64 {
        self.engine.generation()
    }

    /// Handle a user action.
    pub fn handle_action(&mut self, action: Action) {
        if self.show_help {
            // Any key closes help; quit still quits
            self.show_help = false;
            if action == Action::Quit {
                self.should_quit = true;
            }
            return;
        }

        match action {
            Action::Quit => self.should_quit = true,
            Action::Help => self.show_help = true,
            Action::NextScript => self.select_adjacent(true),
            Action::PrevScript => self.select_adjacent(false),
            Action::Replay => self.replay(),
            Action::Faster => self.set_speed(self.speed().faster()),
            Action::Slower => self.set_speed(self.speed().slower()),
            Action::Back | Action::None => {}
        }
    }

    /// Pull the latest snapshot without waiting.
    ///
    /// Returns `true` if it differs from the one already held.
    pub fn sync(&mut self) -> bool {
        let latest = self.subscription.latest();
        let changed = latest != self.snapshot;
        self.snapshot = latest;
        changed
    }

    /// Wait for the engine to publish, then store the snapshot.
    pub async fn next_snapshot(&mut self) {
        match self.subscription.changed().await {
            Some(snapshot) => self.snapshot = snapshot,
            // The engine lives as long as the app, so this never resolves early
            None => std::future::pending::<()>().await,
        }
    }

    fn select_adjacent(&mut self, forward: bool) {
        let count = self.config.scripts.len();
        if count == 0 {
            return;
        }
        self.selected = if forward {
            (self.selected + 1) % count
        } else {
            (self.selected + count - 1) % count
        };
        self.play_selected();
    }

    fn set_speed(&mut self, speed: Speed) {
        self.engine.set_speed(speed);
    }

    fn replies(&self) -> Vec<String> {
        self.script().map(|s| s.replies.clone()).unwrap_or_default()
    }

    fn play_selected(&mut self) {
        let texts = self.replies();
        if self.engine.set_texts(texts) {
            debug!(
                script = self.script().map_or("", |s| s.name.as_str()),
                generation = self.engine.generation(),
                "Playing script"
            );
        }
        self.sync();
    }

    fn replay(&mut self) {
        let texts = self.replies();
        self.engine.initialize(texts);
        self.sync();
    }

    /// Render the whole screen.
    pub fn render(&self, frame: &mut Frame<'_>) {
        let (main, status) = main_layout(frame.area());

        let title = self.title();
        let prompt = self.script().map_or("", |s| s.prompt.as_str());
        let typing = matches!(self.snapshot.phase, RevealPhase::Revealing { .. });
        frame.render_widget(
            ChatPane::new(prompt, &self.snapshot.revealed)
                .title(&title)
                .typing(typing),
            main,
        );

        let speed = self.speed().to_string();
        frame.render_widget(
            StatusBar::new(self.mode_label())
                .hints(vec![
                    KeyHint::new("←/→", "Script"),
                    KeyHint::new("r", "Replay"),
                    KeyHint::new("+/-", "Speed"),
                    KeyHint::new("?", "Help"),
                    KeyHint::new("q", "Quit"),
                ])
                .right(&speed),
            status,
        );

        if self.show_help {
            let area = frame.area();
            render_help_overlay(frame, area);
        }
    }

    fn title(&self) -> String {
        match self.script() {
            Some(script) => format!(
                "{} ({}/{})",
                script.name,
                self.selected + 1,
                self.config.scripts.len()
            ),
            None => "no scripts".to_string(),
        }
    }

    fn mode_label(&self) -> &'static str {
        match self.snapshot.phase {
            RevealPhase::Idle => "IDLE",
            RevealPhase::Revealing { .. } => "TYPING",
            RevealPhase::Done => "DONE",
        }
    }
}

/// Render the help overlay.
fn render_help_overlay(frame: &mut Frame<'_>, area: Rect) {
    let help_text = r"
  Left/Right, Tab   Previous/next script
  r, Enter          Replay from the start
  + / -             Type faster/slower
  ?                 Toggle this help
  q                 Quit

  [Press any key to close]
";

    let width = 46.min(area.width.saturating_sub(4));
    let height = 11.min(area.height.saturating_sub(2));
    let overlay_area = centered_fixed(width, height, area);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
        .title(" Help ")
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border_active())
        .style(Styles::default());

    frame.render_widget(
        Paragraph::new(help_text).block(block).style(Styles::dim()),
        overlay_area,
    );
}
