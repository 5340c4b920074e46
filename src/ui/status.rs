use crate::app::App;
use forumtree::sync::Phase;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg)
    } else if app.dialog.is_some() {
        Cow::Borrowed("Type a title | ENTER save | ESC close")
    } else {
        match app.sync.phase() {
            Phase::Loading => Cow::Borrowed("Loading..."),
            Phase::Mutating => Cow::Borrowed("Saving..."),
            Phase::Failed(_) => Cow::Borrowed("Load failed | [r]etry [q]uit"),
            Phase::Idle | Phase::Ready => Cow::Borrowed(
                "[j/k]move [Enter]toggle [E]xpand all [g]roup [f]orum [e]dit [r]eload [q]uit",
            ),
        }
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);

    let paragraph = Paragraph::new(text).style(style);
    f.render_widget(paragraph, area);
}
