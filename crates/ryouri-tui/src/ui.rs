use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use ryouri_core::{persona, ChatRole};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use crate::app::{App, InputMode};

const ACCENT: Color = Color::Rgb(249, 115, 22); // orange

/// Render one line of a reply: `**bold**` spans, `#` headings and `-` bullets
fn markdown_line(text: &str) -> Line<'static> {
    let trimmed = text.trim_start();
    let after_hashes = trimmed.trim_start_matches('#');
    if after_hashes.len() < trimmed.len() && after_hashes.starts_with(' ') {
        return Line::from(Span::styled(
            after_hashes.trim().to_string(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ));
    }

    let (prefix, body) = match trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
        Some(rest) => {
            let indent = &text[..text.len() - trimmed.len()];
            (format!("{indent}• "), rest)
        }
        None => (String::new(), text),
    };

    let mut spans: Vec<Span<'static>> = Vec::new();
    if !prefix.is_empty() {
        spans.push(Span::raw(prefix));
    }

    // Odd segments between `**` markers are bold; an unmatched marker stays literal
    let segments: Vec<&str> = body.split("**").collect();
    let balanced = segments.len() % 2 == 1;
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        let last_unmatched = !balanced && i == segments.len() - 1;
        if i % 2 == 1 && !last_unmatched {
            spans.push(Span::styled(
                (*segment).to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        } else if last_unmatched {
            spans.push(Span::raw(format!("**{segment}")));
        } else {
            spans.push(Span::raw((*segment).to_string()));
        }
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let suggestions_height = if app.session.shows_suggestions() {
        persona::SUGGESTED_PROMPTS.len() as u16 + 2
    } else {
        0
    };

    let [header_area, chat_area, suggestions_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(suggestions_height),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_suggestions(app, frame, suggestions_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_api_key_input {
        render_api_key_input(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" 🍳 {} ", persona::TITLE), Style::default().fg(ACCENT).bold()),
        Span::styled(persona::SUBTITLE, Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::styled(
            format!("{}: {}", app.provider.display_name(), app.provider.model()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn role_label(role: ChatRole) -> Line<'static> {
    match role {
        ChatRole::User => Line::from(Span::styled(
            "あなた:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        ChatRole::Assistant => Line::from(Span::styled(
            "アシスタント:",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
    }
}

/// Transcript lines for the chat pane, plus the thinking indicator while pending
pub(crate) fn chat_text(app: &App) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for turn in app.session.turns() {
        lines.push(role_label(turn.role));
        match turn.role {
            ChatRole::User => {
                for line in turn.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant => {
                for line in turn.content.lines() {
                    lines.push(markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.session.is_pending() {
        lines.push(role_label(ChatRole::Assistant));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("考え中{dots}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Text::from(lines)
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(area);
    app.chat_height = inner.height;
    app.chat_width = inner.width;

    // Wrapped without a block so `App::chat_line_count` sees the same rows
    let chat = Paragraph::new(chat_text(app))
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, inner);
}

fn render_suggestions(app: &mut App, frame: &mut Frame, area: Rect) {
    app.suggestion_areas.clear();
    if area.height == 0 {
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .title(" よくある質問 ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    for (i, prompt) in persona::SUGGESTED_PROMPTS.iter().enumerate() {
        let row = Rect::new(inner.x, inner.y + i as u16, inner.width, 1);
        if row.y >= inner.y + inner.height {
            break;
        }
        let line = Line::from(vec![
            Span::styled(format!(" {} ", i + 1), Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" "),
            Span::raw(*prompt),
        ]);
        frame.render_widget(Paragraph::new(line), row);
        app.suggestion_areas.push(row);
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && !app.show_api_key_input;
    let sending = app.is_sending();

    let border_color = if sending {
        Color::DarkGray
    } else if editing {
        ACCENT
    } else {
        Color::Gray
    };

    let title = if sending { " 返信を待っています " } else { " メッセージ " };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Slide the view right once the cursor would leave the box
    let draft = app.session.draft();
    let inner_width = area.width.saturating_sub(2) as usize;
    let first_visible = input_scroll_start(draft, app.input_cursor, inner_width);
    let visible = &draft[char_byte_offset(draft, first_visible)..];

    let content = if draft.is_empty() {
        Span::styled(persona::INPUT_PLACEHOLDER, Style::default().fg(Color::DarkGray))
    } else if sending {
        Span::styled(visible, Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(visible)
    };

    frame.render_widget(Paragraph::new(Line::from(content)).block(block), area);

    if editing && !sending {
        let before_cursor: String = draft
            .chars()
            .skip(first_visible)
            .take(app.input_cursor.saturating_sub(first_visible))
            .collect();
        let max_x = area.x + area.width.saturating_sub(2);
        let x = (area.x + 1).saturating_add(before_cursor.width() as u16).min(max_x);
        frame.set_cursor_position(Position::new(x, area.y + 1));
    }
}

/// First visible char of a single-line input, keeping a column for the cursor
fn input_scroll_start(text: &str, cursor: usize, width: usize) -> usize {
    let before: Vec<char> = text.chars().take(cursor).collect();
    let mut shown: usize = before.iter().map(|c| c.width().unwrap_or(0)).sum();
    let mut start = 0;
    while shown >= width && start < before.len() {
        shown -= before[start].width().unwrap_or(0);
        start += 1;
    }
    start
}

fn char_byte_offset(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map(|(i, _)| i).unwrap_or(s.len())
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = Vec::new();
    if app.input_mode == InputMode::Normal && app.session.shows_suggestions() {
        hints.extend([
            Span::styled(" 1-4 ", key_style),
            Span::styled(" suggestion ", label_style),
        ]);
    }

    hints.extend(match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" K ", key_style),
            Span::styled(" API key ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    });

    if app.config.key_source().is_none() {
        hints.push(Span::styled(" no API key ", Style::default().bg(Color::Red).fg(Color::White)));
    }

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

/// Centered popup for entering the Anthropic API key
fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 5;
    let popup_area = Rect::new(
        area.x + area.width.saturating_sub(popup_width) / 2,
        area.y + area.height.saturating_sub(popup_height) / 2,
        popup_width,
        popup_height.min(area.height),
    );

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .title(" Anthropic API key ")
        .title_bottom(" Enter save  Esc cancel ");

    // Never echo the key itself
    let masked = "*".repeat(app.api_key_input.chars().count());
    let source_hint = match app.config.key_source() {
        Some("env") => "currently from ANTHROPIC_API_KEY (takes precedence)",
        Some(_) => "currently from config file",
        None => "not configured",
    };

    let text = Text::from(vec![
        Line::from(Span::styled(source_hint, Style::default().fg(Color::DarkGray))),
        Line::from(masked.clone()),
    ]);

    frame.render_widget(Paragraph::new(text).block(block), popup_area);

    let x = (popup_area.x + 1).saturating_add(masked.len() as u16);
    frame.set_cursor_position(Position::new(
        x.min(popup_area.x + popup_area.width.saturating_sub(2)),
        popup_area.y + 2,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};
    use ryouri_core::Turn;

    /// Flatten a buffer into text, skipping the filler cells after wide glyphs
    fn buffer_text(buffer: &Buffer) -> String {
        let mut out = String::new();
        for y in 0..buffer.area.height {
            let mut skip = 0;
            for x in 0..buffer.area.width {
                if skip > 0 {
                    skip -= 1;
                    continue;
                }
                let symbol = buffer[(x, y)].symbol();
                skip = symbol.width().saturating_sub(1);
                out.push_str(symbol);
            }
            out.push('\n');
        }
        out
    }

    fn draw_sized(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        buffer_text(terminal.backend().buffer())
    }

    fn draw(app: &mut App) -> String {
        draw_sized(app, 100, 30)
    }

    fn long_spaced_reply() -> String {
        let mut lines: Vec<String> = (0..12)
            .map(|i| format!("aaaaaaaaaaaaa{i:02} bbbbbbbbbbbbbbb ccc"))
            .collect();
        lines.push("LASTLINE".to_string());
        lines.join("\n")
    }

    #[test]
    fn test_initial_screen_shows_greeting_and_suggestions() {
        let mut app = test_app(None);
        let screen = draw(&mut app);

        assert!(screen.contains(persona::TITLE));
        assert!(screen.contains("アシスタント:"));
        assert!(screen.contains("よくある質問"));
        for prompt in persona::SUGGESTED_PROMPTS {
            assert!(screen.contains(prompt), "missing suggestion {prompt}");
        }
        assert_eq!(app.suggestion_areas.len(), persona::SUGGESTED_PROMPTS.len());
        assert!(screen.contains(persona::INPUT_PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_pending_hides_suggestions_and_shows_thinking() {
        let mut app = test_app(Some("ok"));
        app.session.set_draft("パスタ");
        app.start_send();

        let screen = draw(&mut app);

        assert!(!screen.contains("よくある質問"));
        assert!(app.suggestion_areas.is_empty());
        assert!(screen.contains("あなた:"));
        assert!(screen.contains("考え中."));
        assert!(screen.contains("返信を待っています"));
    }

    #[test]
    fn test_completed_cycle_renders_reply() {
        let mut app = test_app(None);
        app.session.submit("カレーの作り方").unwrap();
        app.session.complete(Ok("**材料**を用意します".to_string())).unwrap();

        let screen = draw(&mut app);

        assert!(screen.contains("カレーの作り方"));
        assert!(screen.contains("材料を用意します"));
        assert!(!screen.contains("**"));
        assert!(!screen.contains("よくある質問"));
    }

    #[test]
    fn test_api_key_popup_masks_input() {
        let mut app = test_app(None);
        app.open_api_key_input();
        app.api_key_input = "sk-secret".to_string();

        let screen = draw(&mut app);

        assert!(screen.contains("Anthropic API key"));
        assert!(screen.contains("*********"));
        assert!(!screen.contains("sk-secret"));
    }

    #[test]
    fn test_header_shows_provider_model() {
        let mut app = test_app(None);
        let screen = draw(&mut app);
        assert!(screen.contains("Static: static-model"));
    }

    #[test]
    fn test_markdown_line_bold_and_bullets() {
        let line = markdown_line("- **卵** 2個");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "• 卵 2個");
        assert!(line.spans.iter().any(|s| s.content == "卵"
            && s.style.add_modifier.contains(Modifier::BOLD)));
    }

    #[test]
    fn test_markdown_line_unmatched_marker_stays_literal() {
        let line = markdown_line("a **b");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "a **b");
    }

    #[test]
    fn test_markdown_heading() {
        let line = markdown_line("## 作り方");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "作り方");

        let hashtag = markdown_line("#料理");
        let text: String = hashtag.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "#料理");
    }

    #[test]
    fn test_user_turn_is_not_markdown_rendered() {
        let mut app = test_app(None);
        app.session.submit("**そのまま**").unwrap();
        app.session.complete(Ok("ok".to_string())).unwrap();

        let screen = draw(&mut app);
        assert!(screen.contains("**そのまま**"));
        assert_eq!(app.session.turns()[1], Turn::user("**そのまま**"));
    }

    #[test]
    fn test_scroll_down_reaches_end_of_word_wrapped_reply() {
        let mut app = test_app(None);
        app.session.submit("レシピ").unwrap();
        app.session.complete(Ok(long_spaced_reply())).unwrap();

        draw_sized(&mut app, 20, 20);
        app.scroll_down(10_000);
        let screen = draw_sized(&mut app, 20, 20);

        assert!(screen.contains("LASTLINE"), "last reply line not visible:\n{screen}");
    }

    #[test]
    fn test_scroll_to_bottom_shows_end_of_word_wrapped_reply() {
        let mut app = test_app(None);
        app.session.submit("レシピ").unwrap();
        app.session.complete(Ok(long_spaced_reply())).unwrap();

        draw_sized(&mut app, 20, 20);
        app.scroll_to_bottom();
        let screen = draw_sized(&mut app, 20, 20);

        assert!(screen.contains("LASTLINE"));
        assert!(screen.contains("aaaaaaaaaaaaa11"));
    }

    #[test]
    fn test_input_scroll_start_keeps_cursor_in_view() {
        assert_eq!(input_scroll_start("ab", 2, 4), 0);
        assert_eq!(input_scroll_start("abcdef", 6, 4), 3);
        assert_eq!(input_scroll_start("abcdef", 1, 4), 0);
        // Wide glyphs take two columns each
        assert_eq!(input_scroll_start("食食食", 3, 4), 2);
    }

    #[test]
    fn test_long_draft_scrolls_to_cursor() {
        let mut app = test_app(None);
        let draft = format!("{}終わり", "食".repeat(60));
        app.session.set_draft(&draft);
        app.input_cursor = draft.chars().count();

        let screen = draw(&mut app);

        assert!(screen.contains("食終わり"));
    }
}
