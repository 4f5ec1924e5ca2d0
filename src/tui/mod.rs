//! Terminal User Interface module.
//!
//! Renders the application state with ratatui and maps key presses to
//! state machine events.

mod app;
mod input;
mod theme;
mod ui;

pub use app::run_tui;
pub use input::map_key;
pub use theme::Theme;
pub use ui::draw;
