use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use ragchat_core::{parse_answer, AnswerFragment, SettingsField};
use crate::app::{App, FocusPane, InputMode};

/// Ensure the selected item in a list is visible by adjusting the ListState offset.
fn ensure_selected_visible(state: &mut ListState, visible_height: usize) {
    // Need at least 1 visible row to make sense
    let visible_height = visible_height.max(1);

    if let Some(selected) = state.selected() {
        let min_offset = selected.saturating_sub(visible_height - 1);
        let max_offset = selected;

        let new_offset = state.offset().clamp(min_offset, max_offset);
        if new_offset != state.offset() {
            *state.offset_mut() = new_offset;
        }
    }
}

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(bold_text, Style::default().add_modifier(Modifier::BOLD)));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }
    spans
}

/// Badge for numbered suggestions
fn number_style() -> Style {
    Style::default().bg(Color::DarkGray).fg(Color::White)
}

/// Centered popup area, clamped to the frame
fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_body(app, frame, body_area);
    render_footer(app, frame, footer_area);

    // Render popups (in order of priority)
    if app.chat.citation_preview.is_some() {
        render_citation_preview(app, frame, area);
    } else if app.show_settings {
        render_settings(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Chat with your data ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!(" session {} ", app.chat.session_id),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!(
                " {} ({}) ",
                app.client.base_url(),
                app.client.session_api().display_name()
            ),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" ASK ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &str, label: &str| {
        vec![
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let mut spans = vec![Span::styled(mode_text, mode_style)];

    if app.chat.citation_preview.is_some() {
        spans.extend(hint("Esc", "close"));
    } else if app.show_settings {
        if app.settings_edit.is_some() {
            spans.extend(hint("Enter", "save"));
            spans.extend(hint("Esc", "cancel"));
        } else {
            spans.extend(hint("j/k", "nav"));
            spans.extend(hint("Space", "toggle"));
            spans.extend(hint("+/-", "count"));
            spans.extend(hint("Esc", "close"));
        }
    } else if app.input_mode == InputMode::Editing {
        spans.extend(hint("Enter", "send"));
        spans.extend(hint("Esc", "normal"));
        spans.extend(hint("Tab", "chat"));
    } else {
        match app.focus {
            FocusPane::Sessions => {
                spans.extend(hint("j/k", "sessions"));
                spans.extend(hint("Enter", "open"));
            }
            FocusPane::Chat => {
                spans.extend(hint("j/k", "answer"));
                spans.extend(hint("h/l", "citation"));
                spans.extend(hint("o", "open"));
            }
            FocusPane::Input => {
                spans.extend(hint("i", "ask"));
            }
        }
        if app.chat.error.is_some() {
            spans.extend(hint("r", "retry"));
        }
        if app.chat.can_clear() {
            spans.extend(hint("x", "clear"));
        }
        if !app.suggestions().is_empty() {
            spans.extend(hint("1-9", "suggest"));
        }
        spans.extend(hint("Tab", "focus"));
        spans.extend(hint("s", "settings"));
        spans.extend(hint("q", "quit"));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_body(app: &mut App, frame: &mut Frame, area: Rect) {
    // Session list only appears when the backend supports it
    let (sessions_area, main_area) = if app.chat.has_sessions {
        let [left, right] =
            Layout::horizontal([Constraint::Length(30), Constraint::Min(0)]).areas(area);
        (Some(left), right)
    } else {
        (None, area)
    };

    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(main_area);

    // Store areas for mouse hit-testing
    app.sessions_area = sessions_area;
    app.chat_area = Some(chat_area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    if let Some(sessions_area) = sessions_area {
        render_sessions(app, frame, sessions_area);
    }
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
}

fn render_sessions(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Sessions;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Chat Sessions ");

    if app.chat.sessions.is_empty() {
        let placeholder = Paragraph::new("No chat history yet.")
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let items: Vec<ListItem> = app
        .chat
        .sessions
        .iter()
        .map(|session| {
            let title = if session.title.is_empty() { &session.session_id } else { &session.title };
            let style = if session.session_id == app.chat.session_id {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", title)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(if focused {
            Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        })
        .highlight_symbol("> ");

    let visible_height = area.height.saturating_sub(2) as usize;
    ensure_selected_visible(&mut app.session_state, visible_height);

    frame.render_stateful_widget(list, area, &mut app.session_state);
}

fn answer_lines(app: &App, index: usize) -> Vec<Line<'static>> {
    let (_, response) = &app.chat.answers[index];
    let parsed = parse_answer(response);
    let is_selected = index == app.chat.selected_answer && app.focus == FocusPane::Chat;
    let selected_citation = if is_selected { app.selected_citation() } else { None };

    let citation_style = |name: &str| {
        if selected_citation.as_deref() == Some(name) {
            Style::default().bg(Color::Magenta).fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Magenta)
        }
    };

    let mut lines: Vec<Line<'static>> = Vec::new();
    let marker = if is_selected { "> Answer:" } else { "Answer:" };
    lines.push(Line::from(Span::styled(
        marker,
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )));

    // Fragments may span several lines; stitch spans back into lines
    let mut current: Vec<Span<'static>> = Vec::new();
    for fragment in &parsed.fragments {
        match fragment {
            AnswerFragment::Text(text) => {
                let mut parts = text.split('\n').peekable();
                while let Some(part) = parts.next() {
                    current.extend(parse_markdown_line(part));
                    if parts.peek().is_some() {
                        lines.push(Line::from(std::mem::take(&mut current)));
                    }
                }
            }
            AnswerFragment::Citation { name, number } => {
                current.push(Span::styled(format!("[{}]", number), citation_style(name)));
            }
        }
    }
    if !current.is_empty() {
        lines.push(Line::from(current));
    }

    if !parsed.citations.is_empty() {
        let mut spans = vec![Span::styled(
            "Citations: ",
            Style::default().fg(Color::DarkGray),
        )];
        for (i, name) in parsed.citations.iter().enumerate() {
            spans.push(Span::styled(format!("{}. {}", i + 1, name), citation_style(name)));
            spans.push(Span::raw("  "));
        }
        lines.push(Line::from(spans));
    }

    let is_last = index + 1 == app.chat.answers.len();
    if is_last && app.chat.settings.suggest_followup_questions && !app.chat.is_loading {
        for (i, question) in parsed.followup_questions.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(format!(" {} ", i + 1), number_style()),
                Span::styled(format!(" {}", question), Style::default().fg(Color::Cyan)),
            ]));
        }
    }

    lines
}

fn question_lines(question: &str) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        "You:",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))];
    lines.extend(question.lines().map(|l| Line::from(l.to_string())));
    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    // Empty state: nothing asked yet in this session
    if app.chat.last_question.is_empty() && app.chat.answers.is_empty() {
        let mut lines = vec![
            Line::default(),
            Line::from(Span::styled(
                "Chat with your data",
                Style::default().fg(Color::Cyan).bold(),
            )),
            Line::from(Span::styled(
                "Ask anything or try an example",
                Style::default().fg(Color::DarkGray),
            )),
            Line::default(),
        ];
        for (i, example) in app.suggestions().iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(format!(" {} ", i + 1), number_style()),
                Span::raw(format!(" {}", example)),
            ]));
        }
        let empty = Paragraph::new(Text::from(lines))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false })
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let mut lines: Vec<Line<'static>> = Vec::new();
    for (index, (question, _)) in app.chat.answers.iter().enumerate() {
        lines.extend(question_lines(question));
        lines.push(Line::default());
        lines.extend(answer_lines(app, index));
        lines.push(Line::default());
    }

    if app.chat.is_loading {
        lines.extend(question_lines(&app.chat.last_question));
        lines.push(Line::default());
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Generating answer{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    } else if let Some(error) = &app.chat.error {
        lines.extend(question_lines(&app.chat.last_question));
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Error:",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        let error_style = Style::default().fg(Color::Red);
        lines.extend(
            error
                .lines()
                .map(|l| Line::from(Span::styled(l.to_string(), error_style))),
        );
        lines.push(Line::from(Span::styled(
            "Press 'r' to retry",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0))
        .block(block);
    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if app.chat.is_loading {
        Color::DarkGray
    } else if editing || app.focus == FocusPane::Input {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ask ");

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.query_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.query_input.is_empty() && !editing {
        Paragraph::new("Type a new question (e.g. what is product FR-R92B-58?)")
            .style(Style::default().fg(Color::DarkGray))
    } else {
        let visible_text: String = app
            .query_input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };
    frame.render_widget(input.block(block), area);

    // Show cursor when editing
    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_settings(app: &mut App, frame: &mut Frame, area: Rect) {
    let fields = SettingsField::all();
    let popup_area = popup_rect(area, 90, fields.len() as u16 * 2 + 2);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Configure answer generation ");

    let settings = &app.chat.settings;
    let items: Vec<ListItem> = fields
        .iter()
        .map(|&field| {
            let enabled = settings.is_enabled(field);
            let label_style = if enabled {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            let value = match &app.settings_edit {
                Some(edit) if edit.field == field => format!("{}_", edit.buffer),
                _ => settings.display_value(field),
            };
            let value = if value.is_empty() { "(none)".to_string() } else { value };

            ListItem::new(vec![
                Line::from(Span::styled(field.label().to_string(), label_style)),
                Line::from(Span::styled(
                    format!("  {}", value),
                    Style::default().fg(Color::Yellow),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("> ");

    let visible_height = (popup_area.height.saturating_sub(2) / 2) as usize;
    ensure_selected_visible(&mut app.settings_state, visible_height);

    frame.render_stateful_widget(list, popup_area, &mut app.settings_state);
}

fn render_citation_preview(app: &App, frame: &mut Frame, area: Rect) {
    let Some(preview) = &app.chat.citation_preview else {
        return;
    };
    let popup_area = popup_rect(area, area.width * 4 / 5, area.height * 4 / 5);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(format!(" {} ", preview.citation));

    let mut lines = vec![
        Line::from(Span::styled(
            app.client.citation_file_path(&preview.citation),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::UNDERLINED),
        )),
        Line::default(),
    ];
    match &preview.content {
        None => lines.push(Line::from(Span::styled(
            "Loading...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))),
        Some(Ok(content)) => lines.extend(content.lines().map(|l| Line::from(l.to_string()))),
        Some(Err(e)) => lines.push(Line::from(Span::styled(
            format!("Could not load citation: {}", e),
            Style::default().fg(Color::Red),
        ))),
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .block(block);
    frame.render_widget(paragraph, popup_area);
}
