//! Reusable widgets for the reveal TUI.

pub mod status_bar;
pub mod transcript;

pub use status_bar::{KeyHint, StatusBar};
pub use transcript::ChatPane;
