use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    Quit,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{Char, Down, Esc, Home, Up};

    // Global quit shortcuts
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    match key.code {
        Char('q') | Esc => return Action::Quit,
        Up | Char('k') => app.select_previous(),
        Down | Char('j') => app.select_next(),
        Home | Char('g') => app.entity_index = 0,
        _ => {}
    }
    Action::None
}
