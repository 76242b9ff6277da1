//! UI module for the reveal TUI.

pub mod layout;
pub mod text;
pub mod theme;
pub mod widgets;

pub use layout::*;
pub use theme::*;
pub use widgets::*;
