use crate::app::{AppState, Focus};
use crate::model::{DisplayMessage, Sender};
use crate::prompt::INVESTMENT_LINK;
use crate::text::{char_width, visual_width, wrap_text};
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

const HEADER_HEIGHT: u16 = 2;
const COMPOSER_HEIGHT: u16 = 3;
const STATUS_HEIGHT: u16 = 1;
const MESSAGE_INDENT: &str = "  ";
const CONTEXT_PANEL_WIDTH: u16 = 42;
const COMPOSER_PLACEHOLDER: &str = "Ask about AlphaRose Therapeutics...";

fn sender_label(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "You: ",
        Sender::Assistant => "AlphaRose AI: ",
        Sender::SystemNotice => "• ",
    }
}

fn label_style(sender: Sender) -> Style {
    match sender {
        Sender::User => Style::default()
            .fg(Color::LightYellow)
            .add_modifier(Modifier::BOLD),
        Sender::Assistant => Style::default()
            .fg(Color::LightCyan)
            .add_modifier(Modifier::BOLD),
        Sender::SystemNotice => Style::default().fg(Color::Cyan),
    }
}

fn body_style(sender: Sender) -> Style {
    match sender {
        Sender::User => Style::default().fg(Color::White),
        Sender::Assistant => Style::default().fg(Color::White),
        Sender::SystemNotice => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::DIM),
    }
}

/// Renders one message as a label-prefixed first line plus indented
/// continuation lines, followed by a blank spacer.
fn message_lines(message: &DisplayMessage, width: usize) -> Vec<Line<'static>> {
    let label = sender_label(message.sender);
    let body_width = width.saturating_sub(visual_width(label)).max(1);
    let wrapped = wrap_text(&message.text, body_width);

    let mut lines = Vec::with_capacity(wrapped.len() + 1);
    let mut wrapped = wrapped.into_iter();
    let first = wrapped.next().unwrap_or_default();
    lines.push(Line::from(vec![
        Span::styled(label.to_string(), label_style(message.sender)),
        Span::styled(first, body_style(message.sender)),
    ]));
    for rest in wrapped {
        lines.push(Line::from(Span::styled(
            format!("{MESSAGE_INDENT}{rest}"),
            body_style(message.sender),
        )));
    }
    lines.push(Line::from(""));
    lines
}

fn transcript_lines(messages: &[DisplayMessage], width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in messages {
        lines.extend(message_lines(message, width));
    }
    // Drop the trailing spacer so the newest text hugs the composer.
    if lines.last().is_some_and(|line| line.width() == 0) {
        lines.pop();
    }
    lines
}

/// Tail window of a single-line input so the cursor is always visible.
/// Returns the rendered slice and the cursor column inside it.
fn visible_input_window(buffer: &[char], cursor: usize, width: usize) -> (String, u16) {
    if width == 0 {
        return (String::new(), 0);
    }
    let cursor = cursor.min(buffer.len());
    let mut start = 0usize;
    loop {
        let cursor_col: usize = buffer[start..cursor].iter().map(|ch| char_width(*ch)).sum();
        if cursor_col < width || start >= cursor {
            break;
        }
        start += 1;
    }

    let mut rendered = String::new();
    let mut used = 0usize;
    let mut cursor_col = 0u16;
    for (index, ch) in buffer[start..].iter().enumerate() {
        if start + index == cursor {
            cursor_col = used as u16;
        }
        let w = char_width(*ch);
        if used + w >= width {
            break;
        }
        rendered.push(*ch);
        used += w;
    }
    if cursor >= start + rendered.chars().count() {
        cursor_col = used as u16;
    }
    (rendered, cursor_col)
}

/// Hard char wrap (no word breaks) used by the context editor, tracking the
/// cursor's (row, col) through the wrap.
fn wrap_editor(buffer: &[char], cursor: usize, width: usize) -> (Vec<String>, (u16, u16)) {
    let width = width.max(1);
    let mut lines = vec![String::new()];
    let mut col = 0usize;
    let mut cursor_pos = (0u16, 0u16);
    let cursor = cursor.min(buffer.len());

    for (index, ch) in buffer.iter().enumerate() {
        if index == cursor {
            cursor_pos = ((lines.len() - 1) as u16, col as u16);
        }
        if *ch == '\n' {
            lines.push(String::new());
            col = 0;
            continue;
        }
        let w = char_width(*ch);
        if col + w > width {
            lines.push(String::new());
            col = 0;
        }
        if index == cursor {
            cursor_pos = ((lines.len() - 1) as u16, col as u16);
        }
        lines.last_mut().expect("never empty").push(*ch);
        col += w;
    }
    if cursor == buffer.len() {
        if col >= width {
            lines.push(String::new());
            col = 0;
        }
        cursor_pos = ((lines.len() - 1) as u16, col as u16);
    }
    (lines, cursor_pos)
}

pub fn draw_ui(f: &mut Frame, app: &mut AppState) {
    let area = f.area();
    let banner_lines = app
        .banner
        .as_deref()
        .map(|banner| wrap_text(banner, area.width.saturating_sub(2).max(1) as usize))
        .unwrap_or_default();
    let banner_height = (banner_lines.len() as u16).min(4);

    let [header_area, banner_area, main_area, composer_area, status_area] = Layout::vertical([
        Constraint::Length(HEADER_HEIGHT),
        Constraint::Length(banner_height),
        Constraint::Min(3),
        Constraint::Length(COMPOSER_HEIGHT),
        Constraint::Length(STATUS_HEIGHT),
    ])
    .areas(area);

    render_header(f, header_area);
    if !banner_lines.is_empty() {
        render_banner(f, banner_area, &banner_lines);
    }

    let (transcript_area, panel_area) = if app.operator_panel_visible {
        let panel_width = CONTEXT_PANEL_WIDTH.min(main_area.width / 2);
        let [left, right] = Layout::horizontal([
            Constraint::Min(10),
            Constraint::Length(panel_width),
        ])
        .areas(main_area);
        (left, Some(right))
    } else {
        (main_area, None)
    };

    render_transcript(f, transcript_area, app);
    if let Some(panel_area) = panel_area {
        render_context_panel(f, panel_area, app);
    }
    render_composer(f, composer_area, app);
    render_status(f, status_area, app);
}

fn render_header(f: &mut Frame, area: Rect) {
    let title = Line::from(Span::styled(
        "AlphaRose Therapeutics — Investor AI",
        Style::default()
            .fg(Color::LightCyan)
            .add_modifier(Modifier::BOLD),
    ));
    let subtitle = Line::from(Span::styled(
        format!("Invest: {INVESTMENT_LINK}"),
        Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
    ));
    f.render_widget(Paragraph::new(Text::from(vec![title, subtitle])), area);
}

fn render_banner(f: &mut Frame, area: Rect, lines: &[String]) {
    let text: Vec<Line> = lines
        .iter()
        .map(|line| {
            Line::from(Span::styled(
                line.clone(),
                Style::default()
                    .fg(Color::White)
                    .bg(Color::Red)
                    .add_modifier(Modifier::BOLD),
            ))
        })
        .collect();
    f.render_widget(Paragraph::new(Text::from(text)), area);
}

fn render_transcript(f: &mut Frame, area: Rect, app: &mut AppState) {
    let width = area.width.max(1) as usize;
    let height = area.height as usize;
    app.last_transcript_height = height;

    let lines = transcript_lines(app.transcript.all(), width);
    let total = lines.len();
    let max_scroll = total.saturating_sub(height);
    app.scroll_from_bottom = app.scroll_from_bottom.min(max_scroll);

    let end = total - app.scroll_from_bottom;
    let start = end.saturating_sub(height);
    let visible: Vec<Line> = lines[start..end].to_vec();
    f.render_widget(Paragraph::new(Text::from(visible)), area);
}

fn render_composer(f: &mut Frame, area: Rect, app: &AppState) {
    let focused = app.focus == Focus::Composer;
    let border_style = if focused {
        Style::default().fg(Color::LightCyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(" Message ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.input.is_empty() && !focused {
        f.render_widget(
            Paragraph::new(Span::styled(
                COMPOSER_PLACEHOLDER,
                Style::default().fg(Color::DarkGray),
            )),
            inner,
        );
        return;
    }

    let (rendered, cursor_col) = visible_input_window(
        &app.input.buffer,
        app.input.cursor,
        inner.width.max(1) as usize,
    );
    f.render_widget(Paragraph::new(rendered), inner);
    if focused {
        f.set_cursor_position(Position {
            x: inner.x + cursor_col,
            y: inner.y,
        });
    }
}

fn render_context_panel(f: &mut Frame, area: Rect, app: &AppState) {
    let focused = app.focus == Focus::ContextPanel;
    let border_style = if focused {
        Style::default().fg(Color::LightYellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(" CEO context ")
        .title_bottom(Line::from(" Enter apply · Esc close ").right_aligned());
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let (lines, (cursor_row, cursor_col)) = wrap_editor(
        &app.context_input.buffer,
        app.context_input.cursor,
        inner.width as usize,
    );
    // Keep the cursor row on screen.
    let height = inner.height as usize;
    let first_row = (cursor_row as usize + 1).saturating_sub(height);
    let visible: Vec<Line> = lines
        .iter()
        .skip(first_row)
        .take(height)
        .map(|line| Line::from(line.clone()))
        .collect();
    f.render_widget(Paragraph::new(Text::from(visible)), inner);
    if focused {
        f.set_cursor_position(Position {
            x: inner.x + cursor_col,
            y: inner.y + (cursor_row as usize - first_row) as u16,
        });
    }
}

fn render_status(f: &mut Frame, area: Rect, app: &AppState) {
    let dim = Style::default().fg(Color::Gray).add_modifier(Modifier::DIM);
    let mut spans: Vec<Span> = Vec::new();
    if app.is_loading {
        spans.push(Span::styled(
            format!("{} Thinking... ", app.spinner_frame()),
            Style::default().fg(Color::Blue),
        ));
    } else if app.session_active {
        spans.push(Span::styled("Chat ready ", Style::default().fg(Color::Green)));
    } else {
        spans.push(Span::styled("Chat unavailable ", Style::default().fg(Color::Red)));
    }
    let hints = match app.focus {
        Focus::Composer => "Enter send · Esc browse · Ctrl+C quit",
        Focus::Browse => "Enter compose · ↑/↓ scroll · Ctrl+C quit",
        Focus::ContextPanel => "Enter apply · Esc back · Ctrl+C quit",
    };
    spans.push(Span::styled(format!("· {hints}"), dim));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
