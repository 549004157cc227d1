//! Interactive chat loop: draw the conversation, capture input, and drain
//! stream events.
//!
//! Single-threaded and cooperative: one logical turn proceeds at a time,
//! stream events arrive over the app's channel and are folded in between
//! frames. The loop never blocks on a turn; a hung transport just leaves the
//! loading indicator active.

use std::error::Error;
use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use crate::core::app::App;
use crate::core::config::Config;
use crate::core::message::Sender;
use crate::core::turn::StreamEvent;

/// Blink period of the placeholder cursor, in milliseconds per half-cycle.
const CURSOR_BLINK_MS: u128 = 500;

pub async fn run_chat(config: &Config) -> Result<(), Box<dyn Error>> {
    let (mut app, mut rx) = App::new(config);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &mut app, &mut rx).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    rx: &mut mpsc::UnboundedReceiver<(StreamEvent, u64)>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(());
                    }
                    KeyCode::Enter => {
                        let text = app.input.clone();
                        if app.submit(&text) {
                            app.input.clear();
                            app.auto_scroll = true;
                        }
                    }
                    KeyCode::Char(c) => {
                        if !app.is_disabled() {
                            app.input.push(c);
                        }
                    }
                    KeyCode::Backspace => {
                        app.input.pop();
                    }
                    KeyCode::Up => {
                        app.auto_scroll = false;
                        app.scroll_offset = app.scroll_offset.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        app.scroll_offset = app.scroll_offset.saturating_add(1);
                    }
                    _ => {}
                }
            }
        }

        // Drain all available stream events before the next frame.
        while let Ok((stream_event, turn_id)) = rx.try_recv() {
            app.handle_stream_event(stream_event, turn_id).await;
        }
    }
}

fn placeholder_cursor_visible(app: &App) -> bool {
    (app.pulse_start.elapsed().as_millis() / CURSOR_BLINK_MS) % 2 == 0
}

// Lines are owned so `draw` can adjust the scroll state after building them.
fn build_display_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let cursor_on = placeholder_cursor_visible(app);

    for msg in app.conversation.iter() {
        match msg.sender {
            Sender::User => {
                lines.push(Line::from(vec![
                    Span::styled(
                        "You: ",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(msg.text.clone(), Style::default().fg(Color::Cyan)),
                ]));
                lines.push(Line::from(""));
            }
            Sender::Bot if msg.text.is_empty() => {
                // The open placeholder: a blinking cursor while awaiting the
                // first fragment.
                let cursor = if cursor_on { "▌" } else { " " };
                lines.push(Line::from(Span::styled(
                    cursor,
                    Style::default().fg(Color::White),
                )));
                lines.push(Line::from(""));
            }
            Sender::Bot => {
                for content_line in msg.text.lines() {
                    lines.push(Line::from(Span::styled(
                        content_line.to_string(),
                        Style::default().fg(Color::White),
                    )));
                }
                lines.push(Line::from(""));
            }
        }
    }

    lines
}

fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    let lines = build_display_lines(app);
    let available_height = chunks[0].height.saturating_sub(1);
    let total_lines = lines.len() as u16;
    let max_offset = total_lines.saturating_sub(available_height);

    if app.auto_scroll {
        app.scroll_offset = max_offset;
    }
    let scroll_offset = app.scroll_offset.min(max_offset);

    let messages = Paragraph::new(lines)
        .block(Block::default().title("Chat - gemterm"))
        .wrap(Wrap { trim: true })
        .scroll((scroll_offset, 0));
    f.render_widget(messages, chunks[0]);

    let (input_title, input_style) = if app.is_disabled() {
        (
            "Input disabled (API_KEY not set)",
            Style::default().fg(Color::DarkGray),
        )
    } else if app.is_loading() {
        (
            "Waiting for response...",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (
            "Type your message (Enter to send, Ctrl+C to quit)",
            Style::default().fg(Color::Yellow),
        )
    };

    let input = Paragraph::new(app.input.as_str())
        .style(input_style)
        .block(Block::default().borders(Borders::ALL).title(input_title))
        .wrap(Wrap { trim: true });
    f.render_widget(input, chunks[1]);

    if !app.is_disabled() {
        f.set_cursor_position((
            chunks[1].x + app.input.chars().count() as u16 + 1,
            chunks[1].y + 1,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TransportMode;

    fn proxied_app() -> App {
        App::with_api_key(&Config::default(), None).0
    }

    #[tokio::test]
    async fn display_lines_show_user_prefix_and_bot_text() {
        let mut app = proxied_app();
        app.submit("Hi");

        let lines = build_display_lines(&app);
        // Greeting + spacer, user line + spacer, placeholder + spacer.
        assert_eq!(lines.len(), 6);
        let user_line = &lines[2];
        assert_eq!(user_line.spans[0].content, "You: ");
        assert_eq!(user_line.spans[1].content, "Hi");
    }

    #[tokio::test]
    async fn disabled_app_still_renders_its_seeded_notice() {
        let config = Config {
            mode: TransportMode::Direct,
            ..Config::default()
        };
        let (app, _rx) = App::with_api_key(&config, None);
        assert!(app.is_disabled());

        let lines = build_display_lines(&app);
        assert!(lines
            .iter()
            .any(|line| line.spans.iter().any(|s| s.content.contains("API_KEY"))));
    }

    #[tokio::test]
    async fn draw_snaps_scroll_to_the_bottom_when_auto_scroll_is_on() {
        use ratatui::backend::TestBackend;

        let mut app = proxied_app();
        for i in 0..20 {
            app.conversation.begin_turn(format!("message {i}"));
        }
        app.auto_scroll = true;
        app.scroll_offset = 0;

        let mut terminal = Terminal::new(TestBackend::new(40, 12)).expect("terminal");
        terminal.draw(|f| draw(f, &mut app)).expect("frame");

        assert!(app.scroll_offset > 0);

        // A second frame with unchanged content keeps the offset stable.
        let settled_offset = app.scroll_offset;
        terminal.draw(|f| draw(f, &mut app)).expect("frame");
        assert_eq!(app.scroll_offset, settled_offset);
    }
}
