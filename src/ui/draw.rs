use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use ratatui_image::{Resize, StatefulImage};
use tui_widgets::popup::Popup;

use crate::avatar::AvatarState;
use crate::config::RgbColor;
use crate::view::{display_name, ContactView};

use super::app::{App, EditScreen, Screen};
use super::keys::describe;
use super::panes::EditField;

const CONFIRM_HELP: &str = "Y/Enter: confirm  N/Esc: cancel";
const EDITOR_HELP: &str = "Type to edit  Enter: keep  Esc: discard";

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_body(frame, layout[1], app);
    draw_footer(frame, layout[2], app);
    draw_confirm_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let mut spans = vec![Span::styled("ROLODEX://", header_text_style(app))];
    spans.push(Span::styled(
        app.location.trim_start_matches('/').to_string(),
        header_text_style(app),
    ));
    if app.is_submitting() {
        spans.push(Span::raw("   "));
        spans.push(Span::styled("SAVING", selection_style(app)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_body(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(0)])
        .split(area);
    draw_contact_list(frame, chunks[0], app);

    let content = chunks[1];
    if let Some(view) = app.current_view() {
        draw_detail(frame, content, app, &view);
        return;
    }
    match &app.screen {
        Screen::Edit(screen) => draw_edit_form(frame, content, app, screen),
        Screen::Error(message) => draw_message(frame, content, app, "ERROR", message),
        Screen::Empty => draw_message(frame, content, app, "CONTACTS", "NO CONTACTS"),
        Screen::Detail(_) => {}
    }
}

fn draw_contact_list(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let icons = &app.config().ui.icons;
    let items: Vec<ListItem> = if app.contacts.is_empty() {
        vec![ListItem::new(Line::from("No contacts"))]
    } else {
        app.contacts
            .iter()
            .map(|contact| {
                let glyph = if contact.favorite {
                    icons.favorite.as_str()
                } else {
                    " "
                };
                let name = display_name(contact.first.as_deref(), contact.last.as_deref());
                let mut item = ListItem::new(Line::from(format!("{} {}", glyph, name.text())));
                if name.is_placeholder() {
                    item = item.style(Style::default().add_modifier(Modifier::ITALIC));
                }
                item
            })
            .collect()
    };

    let mut state = ListState::default();
    state.select(app.selected_index());

    let list = List::new(items)
        .highlight_style(selection_style(app))
        .highlight_symbol(" ")
        .repeat_highlight_symbol(false);

    frame.render_stateful_widget(list, inner, &mut state);
}

fn draw_detail(frame: &mut Frame<'_>, area: Rect, app: &mut App, view: &ContactView) {
    let image_height = app.image_pane_height().min(area.height);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(image_height), Constraint::Min(0)])
        .split(area);

    let upper = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(app.image_pane_width()),
        ])
        .split(layout[0]);

    draw_card(frame, upper[0], app, view);
    draw_avatar(frame, upper[1], app, view);
    if layout[1].height > 0 {
        draw_notes(frame, layout[1], app, view);
    }
}

fn draw_card(frame: &mut Frame<'_>, area: Rect, app: &App, view: &ContactView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    let icons = &app.config().ui.icons;
    let glyph = if view.favorite.favorite {
        icons.favorite.as_str()
    } else {
        icons.not_favorite.as_str()
    };

    let header = Line::from(vec![
        name_span(view, header_text_style(app)),
        Span::raw(" "),
        Span::styled(glyph.to_string(), accent_style(app)),
    ]);
    render_header_with_separator(frame, layout[0], header, app, area.width);

    let keys = &app.config().keys.detail;
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("[{}] ", describe(&keys.favorite)), label_style(app)),
        Span::raw(format!("{} {}", glyph, view.favorite.label())),
    ])];

    if let Some(link) = &view.twitter {
        lines.push(Line::from(vec![
            Span::styled("Twitter: ", label_style(app)),
            Span::raw(link.text.clone()),
            Span::raw(" "),
            Span::styled(
                link.href.clone(),
                Style::default().add_modifier(Modifier::UNDERLINED),
            ),
        ]));
    }
    if view.external_link().is_some() {
        lines.push(Line::from(vec![
            Span::styled(format!("[{}] ", describe(&keys.open_link)), label_style(app)),
            Span::raw("Open in browser"),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(format!("[{}] ", describe(&keys.edit)), label_style(app)),
        Span::raw("Edit  "),
        Span::styled(format!("[{}] ", describe(&keys.delete)), label_style(app)),
        Span::raw("Delete"),
    ]));

    frame.render_widget(Paragraph::new(lines), layout[1]);
}

/// The contact name as stored; the placeholder is set in italics.
fn name_span(view: &ContactView, style: Style) -> Span<'_> {
    let style = if view.name.is_placeholder() {
        style.add_modifier(Modifier::ITALIC)
    } else {
        style
    };
    Span::styled(view.name.text(), style)
}

fn draw_notes(frame: &mut Frame<'_>, area: Rect, app: &App, view: &ContactView) {
    let Some(notes) = &view.notes else {
        return;
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title("Notes");
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(
        Paragraph::new(notes.clone()).wrap(Wrap { trim: false }),
        inner,
    );
}

fn draw_avatar(frame: &mut Frame<'_>, area: Rect, app: &mut App, view: &ContactView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title("Avatar");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    frame.render_widget(Clear, inner);

    if let Some(state) = app.avatar_state() {
        let widget = StatefulImage::new(None).resize(Resize::Fit);
        frame.render_stateful_widget(widget, inner, state);
        return;
    }

    // Fallback: initials stand in when there is no image to show
    let message = match app.avatar_status() {
        AvatarState::Loading => "LOADING".to_string(),
        AvatarState::Failed(_) => "IMAGE UNAVAILABLE".to_string(),
        AvatarState::Empty | AvatarState::Ready => initials(view),
    };
    render_centered_words(frame, inner, &message);
}

fn initials(view: &ContactView) -> String {
    if view.name.is_placeholder() {
        return "?".to_string();
    }
    view.name
        .text()
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

fn draw_edit_form(frame: &mut Frame<'_>, area: Rect, app: &App, screen: &EditScreen) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    let header = Line::from(Span::styled("EDIT CONTACT", header_text_style(app)));
    render_header_with_separator(frame, layout[0], header, app, area.width);

    let label_width = EditField::ALL
        .iter()
        .map(|field| field.title().len() + 1)
        .max()
        .unwrap_or(0);

    let mut lines: Vec<Line> = Vec::new();
    let mut cursor = None;
    for field in EditField::ALL {
        let editing = app.editor.active && app.editor.target() == Some(field);
        let highlight = field == screen.field;
        let style = if highlight || editing {
            selection_style(app)
        } else {
            Style::default()
        };
        let label = format!(
            "{:width$} ",
            format!("{}:", field.title()),
            width = label_width
        );
        let value = if editing {
            let column = Span::raw(&label).width() + app.editor.visual_cursor();
            cursor = Some((lines.len(), column));
            app.editor.value().to_string()
        } else {
            field.get(&screen.form).to_string()
        };
        lines.push(Line::from(vec![
            Span::styled(label, if highlight { style } else { label_style(app) }),
            Span::styled(value, style),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), layout[1]);

    if let Some((line_idx, column)) = cursor {
        let x = layout[1].x.saturating_add(column as u16);
        let y = layout[1].y.saturating_add(line_idx as u16);
        frame.set_cursor_position((x, y));
    }
}

fn draw_message(frame: &mut Frame<'_>, area: Rect, app: &App, title: &str, message: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title(Span::styled(title.to_string(), header_text_style(app)));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    render_centered_words(frame, inner, message);
}

fn draw_confirm_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.confirm_modal.as_ref() else {
        return;
    };

    let body = Text::from(vec![
        Line::from(modal.intent.message()),
        Line::from(""),
        Line::from(CONFIRM_HELP),
    ]);
    let title = Line::from(Span::styled(modal.title.clone(), header_text_style(app)));
    let popup = Popup::new(body)
        .title(title)
        .border_style(border_style(app));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let message = if app.confirm_modal.is_some() {
        CONFIRM_HELP.to_string()
    } else if app.editor.active {
        EDITOR_HELP.to_string()
    } else if let Some(status) = &app.status {
        status.clone()
    } else {
        help_line(app)
    };

    let colors = app.ui_colors();
    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);

    frame.render_widget(Paragraph::new(message).style(style), area);
}

fn help_line(app: &App) -> String {
    let keys = &app.config().keys;
    match app.screen {
        Screen::Edit(_) => format!(
            "{}: field  {}: edit  {}: save  {}: cancel",
            describe(&keys.form.next),
            describe(&keys.form.edit),
            describe(&keys.form.save),
            describe(&keys.form.cancel),
        ),
        _ => format!(
            "{}/{}: contacts  {}: reload  {}: quit",
            describe(&keys.detail.next),
            describe(&keys.detail.prev),
            describe(&keys.global.refresh),
            describe(&keys.global.quit),
        ),
    }
}

fn selection_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(app: &App) -> Style {
    Style::default().fg(color(app.ui_colors().border))
}

fn header_text_style(app: &App) -> Style {
    Style::default().fg(color(app.ui_colors().accent))
}

fn accent_style(app: &App) -> Style {
    header_text_style(app).add_modifier(Modifier::BOLD)
}

fn label_style(app: &App) -> Style {
    header_text_style(app)
}

fn render_centered_words(frame: &mut Frame<'_>, area: Rect, text: &str) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let mut lines: Vec<Line> = text
        .split_whitespace()
        .map(|word| Line::from(word.to_string()))
        .collect();

    if lines.is_empty() {
        return;
    }

    if lines.len() as u16 > area.height {
        lines.truncate(area.height as usize);
    }

    let height = lines.len() as u16;
    let start_y = area.y + (area.height.saturating_sub(height)) / 2;
    let target = Rect {
        x: area.x,
        y: start_y,
        width: area.width,
        height,
    };

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), target);
}

/// Render a header line with a separator below it, connected to the side
/// borders of a pane `outer_width` wide.
fn render_header_with_separator(
    frame: &mut Frame<'_>,
    area: Rect,
    content: Line<'_>,
    app: &App,
    outer_width: u16,
) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    if area.height == 1 {
        frame.render_widget(Paragraph::new(content), area);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    frame.render_widget(Paragraph::new(content), layout[0]);

    let inner_width = outer_width.saturating_sub(2) as usize;
    let separator = format!(
        "{}{}{}",
        LINE.vertical_right,
        LINE.horizontal.repeat(inner_width),
        LINE.vertical_left
    );
    let separator_line = Line::from(Span::styled(separator, border_style(app)));

    let separator_area = Rect {
        x: layout[1].x.saturating_sub(1),
        y: layout[1].y,
        width: outer_width,
        height: 1,
    };
    frame.render_widget(Paragraph::new(separator_line), separator_area);
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::contact;
    use crate::view::DEFAULT_TWITTER_URL;

    #[test]
    fn test_initials() {
        let view = ContactView::build(
            &contact("a", Some("ada"), Some("Lovelace")),
            None,
            DEFAULT_TWITTER_URL,
        );
        assert_eq!(initials(&view), "AL");

        let view = ContactView::build(&contact("a", None, None), None, DEFAULT_TWITTER_URL);
        assert_eq!(initials(&view), "?");
    }

    #[test]
    fn test_name_span_keeps_stored_case() {
        let view = ContactView::build(
            &contact("a", Some("ada"), Some("Lovelace")),
            None,
            DEFAULT_TWITTER_URL,
        );
        let span = name_span(&view, Style::default());
        assert_eq!(span.content, "ada Lovelace");
        assert!(!span.style.add_modifier.contains(Modifier::ITALIC));

        let view = ContactView::build(&contact("a", None, None), None, DEFAULT_TWITTER_URL);
        let span = name_span(&view, Style::default());
        assert_eq!(span.content, "No Name");
        assert!(span.style.add_modifier.contains(Modifier::ITALIC));
    }
}
