//! Input handling for the TUI.
//!
//! Keys go to the title dialog while it is open, otherwise to the tree.

use crate::app::{App, AppEvent};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use forumtree::tree::NodeKind;
use forumtree::util::MAX_TITLE_CHARS;
use tokio::sync::mpsc;

use super::helpers::{start_load, start_request};
use super::Action;

/// Main input dispatch function.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Ok(Action::Quit);
    }

    if app.dialog.is_some() {
        handle_dialog_input(app, code, event_tx);
        return Ok(Action::Continue);
    }

    match code {
        KeyCode::Char('q') | KeyCode::Esc => return Ok(Action::Quit),
        KeyCode::Char('j') | KeyCode::Down => app.nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.nav_up(),
        KeyCode::Enter | KeyCode::Char(' ') => app.toggle_selected(),
        KeyCode::Char('E') => app.expand_all(),
        KeyCode::Char('r') => {
            app.set_status("Reloading...");
            start_load(app, event_tx);
        }
        KeyCode::Char('g') => app.open_create_dialog(NodeKind::Group),
        KeyCode::Char('f') => app.open_create_dialog(NodeKind::Forum),
        KeyCode::Char('e') => app.open_rename_dialog(),
        _ => {}
    }
    Ok(Action::Continue)
}

/// Keys while the title dialog is open.
///
/// Input is frozen while the request is in flight. Esc closes the dialog
/// but does not cancel a submitted request; its result still lands in the tree.
fn handle_dialog_input(app: &mut App, code: KeyCode, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(dialog) = app.dialog.as_mut() else {
        return;
    };

    match code {
        KeyCode::Esc => {
            app.dialog = None;
        }
        _ if dialog.pending.is_some() => {}
        KeyCode::Char(c) => {
            if dialog.input.chars().count() < MAX_TITLE_CHARS {
                dialog.input.push(c);
            }
        }
        KeyCode::Backspace => {
            dialog.input.pop();
        }
        KeyCode::Enter => submit_dialog(app, event_tx),
        _ => {}
    }
}

fn submit_dialog(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let outcome = app
        .dialog_request()
        .and_then(|request| start_request(app, request, event_tx).map_err(|e| e.to_string()));

    if let Some(dialog) = app.dialog.as_mut() {
        match outcome {
            Ok(ticket) => {
                dialog.pending = Some(ticket);
                dialog.error = None;
            }
            Err(message) => dialog.error = Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::loaded_app;
    use forumtree::sync::Phase;
    use forumtree::tree::NodeKey;

    fn press(app: &mut App, tx: &mpsc::Sender<AppEvent>, code: KeyCode) -> Action {
        handle_input(app, code, KeyModifiers::NONE, tx).unwrap()
    }

    fn type_text(app: &mut App, tx: &mpsc::Sender<AppEvent>, text: &str) {
        for c in text.chars() {
            press(app, tx, KeyCode::Char(c));
        }
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let (mut app, _) = loaded_app().await;
        let (tx, _rx) = mpsc::channel(4);
        assert!(matches!(press(&mut app, &tx, KeyCode::Char('q')), Action::Quit));
        assert!(matches!(
            handle_input(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL, &tx).unwrap(),
            Action::Quit
        ));
    }

    #[tokio::test]
    async fn test_navigation_and_toggle() {
        let (mut app, _) = loaded_app().await;
        let (tx, _rx) = mpsc::channel(4);

        press(&mut app, &tx, KeyCode::Char('j'));
        assert_eq!(app.selected, Some(NodeKey::group(2)));
        press(&mut app, &tx, KeyCode::Enter);
        assert_eq!(app.visible_keys().len(), 4);
        press(&mut app, &tx, KeyCode::Char(' '));
        assert_eq!(app.visible_keys().len(), 3);
    }

    #[tokio::test]
    async fn test_dialog_captures_typing() {
        let (mut app, _) = loaded_app().await;
        let (tx, _rx) = mpsc::channel(4);

        press(&mut app, &tx, KeyCode::Char('g'));
        type_text(&mut app, &tx, "qj");
        press(&mut app, &tx, KeyCode::Backspace);

        assert_eq!(app.dialog.as_ref().unwrap().input, "q");
        assert_eq!(app.selected, Some(NodeKey::group(1)));
    }

    #[tokio::test]
    async fn test_submit_marks_dialog_pending() {
        let (mut app, _) = loaded_app().await;
        let (tx, _rx) = mpsc::channel(4);

        press(&mut app, &tx, KeyCode::Char('f'));
        type_text(&mut app, &tx, "Chess");
        press(&mut app, &tx, KeyCode::Enter);

        let dialog = app.dialog.as_ref().unwrap();
        assert!(dialog.pending.is_some());
        assert_eq!(app.sync.phase(), Phase::Mutating);

        // Frozen while in flight
        press(&mut app, &tx, KeyCode::Char('x'));
        assert_eq!(app.dialog.as_ref().unwrap().input, "Chess");
    }

    #[tokio::test]
    async fn test_empty_submit_shows_error() {
        let (mut app, _) = loaded_app().await;
        let (tx, _rx) = mpsc::channel(4);

        press(&mut app, &tx, KeyCode::Char('g'));
        press(&mut app, &tx, KeyCode::Enter);

        let dialog = app.dialog.as_ref().unwrap();
        assert_eq!(dialog.error.as_deref(), Some("Title cannot be empty"));
        assert!(dialog.pending.is_none());
    }

    #[tokio::test]
    async fn test_escape_closes_dialog() {
        let (mut app, _) = loaded_app().await;
        let (tx, _rx) = mpsc::channel(4);

        press(&mut app, &tx, KeyCode::Char('e'));
        assert!(app.dialog.is_some());
        assert!(matches!(press(&mut app, &tx, KeyCode::Esc), Action::Continue));
        assert!(app.dialog.is_none());
    }

    #[tokio::test]
    async fn test_reload_enters_loading() {
        let (mut app, _) = loaded_app().await;
        let (tx, _rx) = mpsc::channel(4);

        press(&mut app, &tx, KeyCode::Char('r'));
        assert_eq!(app.sync.phase(), Phase::Loading);
        assert!(app.request_handle.is_some());
    }
}
