//! Input handling for the TUI.
//!
//! Maps keyboard events to state machine events for the current mode.

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{App, EditKey, Event, Mode, Scroll};

/// Translate a key press into an [`Event`], if it means anything in the
/// current mode.
pub fn map_key(key: KeyEvent, app: &App) -> Option<Event> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(Event::Quit);
    }

    match app.mode {
        Mode::Browse => browse_key(key),
        Mode::Execute => execute_key(key, ctrl),
        Mode::Edit => edit_key(key, ctrl),
        Mode::Logs if app.logs.viewing.is_some() => log_view_key(key, ctrl),
        Mode::Logs => log_list_key(key),
    }
}

fn list_scroll(code: KeyCode) -> Option<Event> {
    let scroll = match code {
        KeyCode::PageUp => Scroll::PageUp,
        KeyCode::PageDown => Scroll::PageDown,
        KeyCode::Home => Scroll::Top,
        KeyCode::End => Scroll::Bottom,
        _ => return None,
    };
    Some(Event::Scroll(scroll))
}

fn browse_key(key: KeyEvent) -> Option<Event> {
    match key.code {
        KeyCode::Char('q') => Some(Event::Quit),
        KeyCode::Char('h') => Some(Event::Home),
        KeyCode::Char('l') => Some(Event::OpenLogs),
        KeyCode::Backspace | KeyCode::Left => Some(Event::Parent),
        KeyCode::Enter | KeyCode::Right => Some(Event::Select),
        KeyCode::Up | KeyCode::Char('k') => Some(Event::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Event::Down),
        code => list_scroll(code),
    }
}

fn execute_key(key: KeyEvent, ctrl: bool) -> Option<Event> {
    match key.code {
        KeyCode::Char('u') if ctrl => Some(Event::Scroll(Scroll::HalfPageUp)),
        KeyCode::Char('d') if ctrl => Some(Event::Scroll(Scroll::HalfPageDown)),
        KeyCode::Char('q') | KeyCode::Esc => Some(Event::Back),
        KeyCode::Up | KeyCode::Char('k') => Some(Event::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Event::Down),
        KeyCode::Enter | KeyCode::Char(' ') => Some(Event::Run),
        KeyCode::Char('e') => Some(Event::Edit),
        KeyCode::Char('s') => Some(Event::Skip { at: Local::now().naive_local() }),
        KeyCode::Char('l') => Some(Event::OpenLogs),
        code => list_scroll(code),
    }
}

fn edit_key(key: KeyEvent, ctrl: bool) -> Option<Event> {
    let edit = match key.code {
        KeyCode::Enter => return Some(Event::EditConfirm),
        KeyCode::Esc => return Some(Event::EditCancel),
        KeyCode::Char(c) if !ctrl => EditKey::Char(c),
        KeyCode::Backspace => EditKey::Backspace,
        KeyCode::Delete => EditKey::Delete,
        KeyCode::Left => EditKey::Left,
        KeyCode::Right => EditKey::Right,
        KeyCode::Home => EditKey::Home,
        KeyCode::End => EditKey::End,
        _ => return None,
    };
    Some(Event::EditKey(edit))
}

fn log_list_key(key: KeyEvent) -> Option<Event> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Event::Back),
        KeyCode::Char('h') => Some(Event::Home),
        KeyCode::Backspace | KeyCode::Left => Some(Event::Parent),
        KeyCode::Enter | KeyCode::Right => Some(Event::Select),
        KeyCode::Up | KeyCode::Char('k') => Some(Event::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Event::Down),
        code => list_scroll(code),
    }
}

fn log_view_key(key: KeyEvent, ctrl: bool) -> Option<Event> {
    match key.code {
        KeyCode::Char('u') if ctrl => Some(Event::Scroll(Scroll::HalfPageUp)),
        KeyCode::Char('d') if ctrl => Some(Event::Scroll(Scroll::HalfPageDown)),
        KeyCode::Char('q') | KeyCode::Esc | KeyCode::Backspace | KeyCode::Left => {
            Some(Event::Back)
        }
        KeyCode::Char('h') => Some(Event::Home),
        KeyCode::Up | KeyCode::Char('k') => Some(Event::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Event::Down),
        KeyCode::Char(' ') => Some(Event::Scroll(Scroll::PageDown)),
        code => list_scroll(code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(mode: Mode) -> App {
        let mut app = App::new(&Config::default());
        app.mode = mode;
        app
    }

    #[test]
    fn test_q_depends_on_mode() {
        assert!(matches!(map_key(key(KeyCode::Char('q')), &app(Mode::Browse)), Some(Event::Quit)));
        assert!(matches!(map_key(key(KeyCode::Char('q')), &app(Mode::Execute)), Some(Event::Back)));
        assert!(matches!(
            map_key(key(KeyCode::Char('q')), &app(Mode::Edit)),
            Some(Event::EditKey(EditKey::Char('q')))
        ));
    }

    #[test]
    fn test_ctrl_c_quits_everywhere() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        for mode in [Mode::Browse, Mode::Execute, Mode::Edit, Mode::Logs] {
            assert!(matches!(map_key(ctrl_c, &app(mode)), Some(Event::Quit)));
        }
    }

    #[test]
    fn test_execute_keys() {
        let execute = app(Mode::Execute);
        assert!(matches!(map_key(key(KeyCode::Enter), &execute), Some(Event::Run)));
        assert!(matches!(map_key(key(KeyCode::Char(' ')), &execute), Some(Event::Run)));
        assert!(matches!(map_key(key(KeyCode::Char('s')), &execute), Some(Event::Skip { .. })));
        assert!(matches!(
            map_key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL), &execute),
            Some(Event::Scroll(Scroll::HalfPageDown))
        ));
    }

    #[test]
    fn test_backspace_in_lists_goes_to_parent() {
        assert!(matches!(map_key(key(KeyCode::Backspace), &app(Mode::Browse)), Some(Event::Parent)));
        assert!(matches!(map_key(key(KeyCode::Backspace), &app(Mode::Logs)), Some(Event::Parent)));
    }
}
