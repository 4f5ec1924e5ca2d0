//! TUI application runner.
//!
//! Handles the main event loop and terminal setup/teardown.

use std::io::{self, stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event as TermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use super::{draw, map_key, Theme};
use crate::app::{App, Event, Runtime};
use crate::core::Config;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Run the interactive SOP runner until the user quits.
pub fn run_tui(config: &Config) -> Result<()> {
    let runtime = Runtime::new(config);
    let app = App::new(config);

    setup_terminal()?;
    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run_main_loop(&mut terminal, app, &runtime);

    restore_terminal()?;
    terminal.show_cursor()?;

    result
}

/// Setup the terminal for TUI mode.
fn setup_terminal() -> Result<()> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    Ok(())
}

/// Restore the terminal to normal mode.
fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Main event loop.
fn run_main_loop(terminal: &mut Term, mut app: App, runtime: &Runtime) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let theme = Theme::default();

    let size = terminal.size()?;
    app = runtime.dispatch(app, Event::Resize { width: size.width, height: size.height });
    app = runtime.dispatch(app, Event::Start);

    loop {
        terminal.draw(|frame| draw(frame, &app, &theme))?;

        if event::poll(tick_rate)? {
            let event = match event::read()? {
                TermEvent::Key(key) => map_key(key, &app),
                TermEvent::Resize(width, height) => Some(Event::Resize { width, height }),
                _ => None,
            };

            if let Some(event) = event {
                tracing::trace!(?event, mode = ?app.mode, "Dispatching event");
                app = runtime.dispatch_with(app, event, |state| {
                    if let Err(e) = terminal.draw(|frame| draw(frame, state, &theme)) {
                        tracing::debug!(error = %e, "Redraw before effect failed");
                    }
                });
            }
        }

        if app.should_quit {
            tracing::info!("Quitting");
            break;
        }
    }

    Ok(())
}
