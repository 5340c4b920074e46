//! Render functions for the TUI.

use crate::app::{App, Dialog};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::{status, tree_view};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 8;

/// Main render function: tree panel, status bar, and the dialog on top.
pub(super) fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    tree_view::render(f, app, chunks[0]);
    status::render(f, app, chunks[1]);

    if let Some(dialog) = &app.dialog {
        render_dialog_overlay(f, dialog);
    }
}

/// Render the title dialog centered on screen.
fn render_dialog_overlay(f: &mut Frame, dialog: &Dialog) {
    let area = f.area();

    let footer = if dialog.pending.is_some() {
        "Saving..."
    } else {
        "(Enter) Save  (Esc) Cancel"
    };
    let mut text = format!("Title:\n\n> {}_\n\n", dialog.input);
    if let Some(error) = &dialog.error {
        text.push_str(&format!("Error: {}\n\n", error));
    }
    text.push_str(footer);

    let content_lines = text.lines().count() as u16 + 2; // +2 for borders
    let width = 60u16.min(area.width.saturating_sub(4));
    let height = (content_lines + 1).min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay = Rect::new(x, y, width, height);

    if overlay.width < 20 || overlay.height < 5 {
        return;
    }

    f.render_widget(Clear, overlay);

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(dialog.purpose.title()),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, overlay);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::loaded_app;
    use forumtree::tree::NodeKind;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[tokio::test]
    async fn test_tree_rows_rendered() {
        let (app, _) = loaded_app().await;
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();

        terminal.draw(|f| render(f, &app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("v R"));
        assert!(text.contains("  > Sports"));
        assert!(text.contains("Welcome (0 topics, 0 comments)"));
    }

    #[tokio::test]
    async fn test_dialog_error_rendered() {
        let (mut app, _) = loaded_app().await;
        app.open_create_dialog(NodeKind::Group);
        let dialog = app.dialog.as_mut().unwrap();
        dialog.input = "Games".to_string();
        dialog.error = Some("HTTP error: status 500".to_string());
        let mut terminal = Terminal::new(TestBackend::new(70, 20)).unwrap();

        terminal.draw(|f| render(f, &app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("New Group"));
        assert!(text.contains("> Games_"));
        assert!(text.contains("status 500"));
    }

    #[tokio::test]
    async fn test_too_small_terminal() {
        let (app, _) = loaded_app().await;
        let mut terminal = Terminal::new(TestBackend::new(30, 5)).unwrap();

        terminal.draw(|f| render(f, &app)).unwrap();
        assert!(screen_text(&terminal).contains("too small"));
    }
}
