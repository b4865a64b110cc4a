/*
 * This file is part of Sensorview.
 *
 * Copyright (C) 2025 Sensorview contributors
 *
 * Sensorview is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Sensorview is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Sensorview. If not, see <https://www.gnu.org/licenses/>.
 */

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

/// Main event handler. Returns `Ok(true)` when the viewer should exit.
pub fn handle_key_event(app: &mut App, key_event: KeyEvent) -> anyhow::Result<bool> {
    let KeyEvent { code, modifiers, .. } = key_event;

    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(true);
    }

    if app.show_help_popup {
        if matches!(code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.show_help_popup = false;
        }
        return Ok(false);
    }

    if app.search_mode {
        handle_search_input(app, code);
        return Ok(false);
    }

    handle_global_events(app, code)
}

fn handle_search_input(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.cancel_search(),
        KeyCode::Enter => app.finish_search(),
        KeyCode::Backspace => app.pop_search_char(),
        KeyCode::Up => app.move_up(1),
        KeyCode::Down => app.move_down(1),
        KeyCode::Char(c) => app.push_search_char(c),
        _ => {}
    }
}

fn handle_global_events(app: &mut App, code: KeyCode) -> anyhow::Result<bool> {
    match code {
        KeyCode::Char('q') => return Ok(true),
        KeyCode::Esc => {
            // Esc first clears a finished search, then quits
            if app.search_input.is_empty() {
                return Ok(true);
            }
            app.cancel_search();
        }
        KeyCode::Up | KeyCode::Char('k') => app.move_up(1),
        KeyCode::Down | KeyCode::Char('j') => app.move_down(1),
        KeyCode::PageUp => app.page_up(),
        KeyCode::PageDown => app.page_down(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Enter | KeyCode::Char(' ') => app.toggle_selected(),
        KeyCode::Left | KeyCode::Char('h') => app.collapse_selected(),
        KeyCode::Right | KeyCode::Char('l') => app.expand_selected(),
        KeyCode::Char('e') => app.expand_all(),
        KeyCode::Char('c') => app.collapse_all(),
        KeyCode::Char('i') => app.toggle_info_column(),
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Char('r') | KeyCode::Char('R') => {
            app.force_refresh();
            app.status = "Refreshing...".to_string();
        }
        KeyCode::Char('?') => app.show_help_popup = true,
        _ => {}
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::DEFAULT_STATUS;
    use crate::backend::Adapter;
    use crate::discovery::Sensors;
    use crate::test_utils::test_helpers::*;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use std::time::{Duration, Instant};

    fn create_test_key_event(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn create_test_app() -> App {
        let mut adapter = Adapter::new(create_mock_board());
        adapter.initialize().unwrap();
        let mut app = App::new(Duration::from_millis(1000), true);
        app.tick(Instant::now(), &Sensors::new(&adapter)).unwrap();
        app
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key_event(app, create_test_key_event(code)).unwrap()
    }

    #[test]
    fn test_quit_keys() {
        let mut app = create_test_app();
        assert!(press(&mut app, KeyCode::Char('q')));
        assert!(press(&mut app, KeyCode::Esc));

        let ctrl_c = KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        };
        assert!(handle_key_event(&mut app, ctrl_c).unwrap());
    }

    #[test]
    fn test_navigation_keys() {
        let mut app = create_test_app();
        assert!(!press(&mut app, KeyCode::Down));
        assert!(!press(&mut app, KeyCode::Char('j')));
        assert_eq!(app.selected, 2);
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.selected, 1);
        press(&mut app, KeyCode::End);
        assert_eq!(app.selected, 12);
        press(&mut app, KeyCode::Home);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_expand_collapse_keys() {
        let mut app = create_test_app();
        press(&mut app, KeyCode::Char('c'));
        let snap = app.refresher.snapshot();
        assert_eq!(app.visible_rows(&snap).len(), 2);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.visible_rows(&snap).len(), 4);
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.visible_rows(&snap).len(), 13);
    }

    #[test]
    fn test_search_mode_captures_keys() {
        let mut app = create_test_app();
        press(&mut app, KeyCode::Char('/'));
        assert!(app.search_mode);
        // 'q' is text while searching
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert_eq!(app.search_input, "q");
        press(&mut app, KeyCode::Backspace);
        for c in "vcore".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        assert!(!app.search_mode);
        let snap = app.refresher.snapshot();
        assert_eq!(app.visible_rows(&snap).len(), 3);

        // Esc clears the search before it quits
        assert!(!press(&mut app, KeyCode::Esc));
        assert!(app.search_input.is_empty());
        assert!(press(&mut app, KeyCode::Esc));
    }

    #[test]
    fn test_help_popup() {
        let mut app = create_test_app();
        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help_popup);
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert!(!app.show_help_popup);
    }

    #[test]
    fn test_info_and_refresh_keys() {
        let mut app = create_test_app();
        assert!(app.show_info_column);
        press(&mut app, KeyCode::Char('i'));
        assert!(!app.show_info_column);

        assert_eq!(app.status, DEFAULT_STATUS);
        press(&mut app, KeyCode::Char('r'));
        assert!(app.refresher.is_due(Instant::now()));
        assert_eq!(app.status, "Refreshing...");
    }
}
