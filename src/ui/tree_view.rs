use crate::app::App;
use forumtree::sync::Phase;
use forumtree::tree::{DisplayRow, Node};
use forumtree::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

/// Render the hierarchy panel.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Forums ");

    let rows = app.sync.display_rows();
    if rows.is_empty() {
        let text = match app.sync.phase() {
            Phase::Failed(message) => {
                format!("Failed to load the hierarchy:\n{}\n\npress r to retry", message)
            }
            Phase::Loading => "Loading hierarchy...".to_string(),
            _ => String::new(),
        };
        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center);
        f.render_widget(paragraph, area);
        return;
    }

    let selected_idx = app.selected_index();
    // Borders take 2 columns
    let max_width = area.width.saturating_sub(2) as usize;

    let style_selected = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let style_group = Style::default().fg(Color::Yellow);
    let style_forum = Style::default();

    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let style = if i == selected_idx {
                style_selected
            } else if matches!(row.node, Node::Group(_)) {
                style_group
            } else {
                style_forum
            };
            ListItem::new(row_line(row, max_width, style))
        })
        .collect();

    let list = List::new(items).block(block).highlight_style(Style::default());

    let mut state = ListState::default().with_selected(Some(selected_idx));
    f.render_stateful_widget(list, area, &mut state);
}

fn row_line(row: &DisplayRow<'_>, max_width: usize, style: Style) -> Line<'static> {
    let indent = "  ".repeat(row.depth);
    let icon = if !row.has_children {
        "  "
    } else if row.is_expanded {
        "v "
    } else {
        "> "
    };

    let prefix = format!("{}{}", indent, icon);
    let suffix = match row.node {
        Node::Forum(forum) => format!(
            " ({} topics, {} comments)",
            forum.stats.topic_count, forum.stats.comment_count
        ),
        Node::Group(_) => String::new(),
    };

    let title = strip_control_chars(row.node.title());
    let available = max_width.saturating_sub(prefix.chars().count() + suffix.chars().count());
    let title = truncate_to_width(&title, available.max(4)).into_owned();

    Line::from(vec![
        Span::styled(prefix, style),
        Span::styled(title, style),
        Span::styled(suffix, style.add_modifier(Modifier::DIM)),
    ])
}
