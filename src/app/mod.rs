//! Interactive application core.
//!
//! Holds the mode-based state machine, the per-SOP execution session, the
//! line layout used for scrolling, and the runtime that carries out effects.

mod edit;
mod runtime;
mod session;
mod state;
mod viewport;

pub use edit::{EditKey, LineEditor};
pub use runtime::Runtime;
pub use session::{ExecuteSession, RunnableStepState};
pub use state::{
    App, DirList, Effect, Event, LogBrowser, LogTarget, LogView, Mode, Scroll, CHROME_HEIGHT,
    DEFAULT_CONTENT_HEIGHT,
};
pub use viewport::{badge_text, layout_log, layout_session, wrap, Layout, LayoutLine, LineKind, Viewport};
