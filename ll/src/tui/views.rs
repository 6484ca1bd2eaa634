//! TUI views and rendering
//!
//! Pure rendering from the UI state and the flow state; nothing here mutates
//! either.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap};
use tracing::trace;

use super::state::{AppState, AuthField};
use crate::api::Exercise;
use crate::flow::{FlowState, Phase};
use crate::progress::{MasteryLabel, format_probability};
use crate::report::{NO_DATA, probability_change};

mod colors {
    use ratatui::style::Color;

    pub const HEADER: Color = Color::Rgb(0, 255, 255); // Cyan
    pub const KEYBIND: Color = Color::Rgb(0, 255, 255);
    pub const SUCCESS: Color = Color::Rgb(50, 205, 50); // Lime green
    pub const WARNING: Color = Color::Rgb(255, 215, 0); // Gold
    pub const FAILED: Color = Color::Rgb(220, 20, 60); // Crimson
    pub const SELECTED_BG: Color = Color::Rgb(40, 40, 40);
    pub const DIM: Color = Color::DarkGray;
}

fn label_color(label: MasteryLabel) -> Color {
    match label {
        MasteryLabel::Mastered => colors::SUCCESS,
        MasteryLabel::InProgress => colors::WARNING,
        MasteryLabel::NeedsReinforcement => colors::FAILED,
        MasteryLabel::Unknown => colors::DIM,
    }
}

/// Main render function
pub fn render(app: &AppState, flow: &FlowState, frame: &mut Frame) {
    trace!(phase = ?flow.phase(), "render: called");
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(flow, frame, chunks[0]);

    match flow.phase() {
        Phase::Loading => render_loading(frame, chunks[1]),
        Phase::Unauthenticated => render_auth(app, flow, frame, chunks[1]),
        Phase::Calibration { .. } | Phase::Recommendation => render_main(app, flow, frame, chunks[1]),
    }

    render_footer(flow, frame, chunks[2]);

    if app.show_help {
        render_help_overlay(frame, frame.area());
    }
}

fn render_header(flow: &FlowState, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(
        " learnloop",
        Style::default().fg(colors::HEADER).add_modifier(Modifier::BOLD),
    )];
    if let Some(user) = &flow.user {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(user.name.clone(), Style::default().add_modifier(Modifier::BOLD)));
        spans.push(Span::styled(format!(" ({})", user.user_id), Style::default().fg(colors::DIM)));
    }
    if flow.busy || flow.auth_busy {
        spans.push(Span::styled("  working…", Style::default().fg(colors::WARNING)));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors::HEADER)),
    );
    frame.render_widget(header, area);
}

fn render_loading(frame: &mut Frame, area: Rect) {
    render_empty_message(frame, area, "Loading…");
}

fn render_auth(app: &AppState, flow: &FlowState, frame: &mut Frame, area: Rect) {
    trace!("render_auth: called");
    let form = &app.form;
    let popup = centered_rect(60, 70, area);

    let mut lines = vec![Line::from("")];
    for field in form.mode.fields() {
        let value = form.value(*field);
        let shown = if *field == AuthField::Password {
            "•".repeat(value.chars().count())
        } else {
            value.to_string()
        };
        let focused = *field == form.focus;
        let label_style = if focused {
            Style::default().fg(colors::KEYBIND).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let mut spans = vec![
            Span::styled(format!("  {:<18}", field.label()), label_style),
            Span::raw(shown),
        ];
        if focused {
            spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
        }
        lines.push(Line::from(spans));
        lines.push(Line::from(""));
    }

    let message = app.form_error.as_ref().or(flow.auth_error.as_ref());
    if let Some(message) = message {
        lines.push(Line::from(Span::styled(
            format!("  {}", message),
            Style::default().fg(colors::FAILED),
        )));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        "  Enter: submit  Tab: next field  Ctrl-T: switch login/register",
        Style::default().fg(colors::DIM),
    )));

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", form.mode.title()))
            .border_style(Style::default().fg(colors::HEADER)),
    );
    frame.render_widget(panel, popup);
}

fn render_main(app: &AppState, flow: &FlowState, frame: &mut Frame, area: Rect) {
    trace!("render_main: called");
    let banners = usize::from(flow.error.is_some()) + usize::from(flow.mastery_message.is_some());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(banners as u16), Constraint::Min(0)])
        .split(columns[0]);

    render_banners(flow, frame, left[0]);

    let exercise_area = if flow.recommendation.is_some() {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(6)])
            .split(left[1]);
        render_recommendation(flow, frame, split[1]);
        split[0]
    } else {
        left[1]
    };
    render_exercise(app, flow, frame, exercise_area);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[1]);
    render_history(app, flow, frame, right[0]);
    render_progress(flow, frame, right[1]);
}

fn render_banners(flow: &FlowState, frame: &mut Frame, area: Rect) {
    let mut lines = Vec::new();
    if let Some(error) = &flow.error {
        lines.push(Line::from(Span::styled(
            format!(" ✗ {}", error),
            Style::default().fg(colors::FAILED),
        )));
    }
    if let Some(message) = &flow.mastery_message {
        lines.push(Line::from(Span::styled(
            format!(" ✓ {}", message),
            Style::default().fg(colors::SUCCESS).add_modifier(Modifier::BOLD),
        )));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn exercise_title(flow: &FlowState) -> String {
    match flow.phase() {
        Phase::Calibration { index, total } => format!(" Calibration {}/{} ", index + 1, total),
        _ => " Recommended exercise ".to_string(),
    }
}

fn render_exercise(app: &AppState, flow: &FlowState, frame: &mut Frame, area: Rect) {
    trace!("render_exercise: called");
    let block = Block::default()
        .borders(Borders::ALL)
        .title(exercise_title(flow))
        .border_style(Style::default().fg(colors::HEADER));

    let Some(exercise) = flow.current_exercise() else {
        let message = if flow.mastery_message.is_some() {
            "Nothing left to practise here."
        } else {
            "No exercise. Ctrl-R: next recommendation  Ctrl-B: calibration"
        };
        frame.render_widget(block, area);
        render_empty_message(frame, area, message);
        return;
    };

    let mut lines = exercise_lines(exercise);
    lines.push(Line::from(""));
    match exercise.choices() {
        Some(options) => {
            for (i, option) in options.iter().enumerate() {
                let style = if i == app.selected_option {
                    Style::default().bg(colors::SELECTED_BG).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let marker = if i == app.selected_option { "›" } else { " " };
                lines.push(Line::from(Span::styled(format!(" {} {}", marker, option), style)));
            }
        }
        None => lines.push(Line::from(vec![
            Span::styled(" Answer: ", Style::default().fg(colors::KEYBIND)),
            Span::raw(app.answer.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ])),
    }

    let card = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(card, area);
}

fn exercise_lines(exercise: &Exercise) -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(
            exercise.prompt.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("skill {} · {}", exercise.skill_id, exercise.difficulty),
            Style::default().fg(colors::DIM),
        )),
    ]
}

fn render_recommendation(flow: &FlowState, frame: &mut Frame, area: Rect) {
    let Some(reco) = &flow.recommendation else {
        return;
    };
    let exercise_id = if reco.exercise_id.is_empty() {
        "-"
    } else {
        reco.exercise_id.as_str()
    };
    let lines = vec![
        Line::from(format!(" Exercise:   {}", exercise_id)),
        Line::from(format!(" Skill:      {}", reco.skill_id)),
        Line::from(format!(" Difficulty: {}", reco.difficulty)),
        Line::from(format!(
            " Estimated success: {}",
            format_probability(Some(reco.probability))
        )),
    ];
    let card = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Recommendation "));
    frame.render_widget(card, area);
}

fn render_history(app: &AppState, flow: &FlowState, frame: &mut Frame, area: Rect) {
    trace!("render_history: called");
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Recent history ({}) ", flow.history.len()));

    if flow.history.is_empty() {
        frame.render_widget(block, area);
        render_empty_message(frame, area, NO_DATA);
        return;
    }

    let lines: Vec<Line> = flow
        .recent_history(app.history_limit)
        .map(|interaction| {
            let (icon, color) = if interaction.correct {
                ("✓", colors::SUCCESS)
            } else {
                ("✗", colors::FAILED)
            };
            Line::from(vec![
                Span::styled(format!(" {} ", icon), Style::default().fg(color)),
                Span::raw(format!("{} ", interaction.exercise_id)),
                Span::styled(format!("({}) ", interaction.skill_id), Style::default().fg(colors::DIM)),
                Span::raw(probability_change(interaction)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_progress(flow: &FlowState, frame: &mut Frame, area: Rect) {
    trace!("render_progress: called");
    let progress = flow.progress();
    let block = Block::default().borders(Borders::ALL).title(" Progress by skill ");

    if progress.is_empty() {
        frame.render_widget(block, area);
        render_empty_message(frame, area, NO_DATA);
        return;
    }

    let rows: Vec<Row> = progress
        .iter()
        .map(|row| {
            let label = row.label();
            Row::new(vec![
                row.skill_id.clone(),
                row.attempts.to_string(),
                format!("{:.1}%", row.success_rate()),
                format_probability(row.latest_probability),
                label.to_string(),
            ])
            .style(Style::default().fg(label_color(label)))
        })
        .collect();

    let widths = [
        Constraint::Min(10),    // SKILL
        Constraint::Length(8),  // ATTEMPTS
        Constraint::Length(7),  // SUCCESS
        Constraint::Length(7),  // P(L)
        Constraint::Length(19), // STATUS
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["SKILL", "ATTEMPTS", "SUCCESS", "P(L)", "STATUS"])
                .style(Style::default().add_modifier(Modifier::BOLD).fg(colors::HEADER)),
        )
        .block(block);
    frame.render_widget(table, area);
}

fn render_footer(flow: &FlowState, frame: &mut Frame, area: Rect) {
    let keys: &[(&str, &str)] = match flow.phase() {
        Phase::Unauthenticated => &[("Enter", "submit"), ("Ctrl-T", "login/register"), ("F1", "help"), ("Esc", "quit")],
        Phase::Loading => &[("Ctrl-L", "log out"), ("Esc", "quit")],
        _ => &[
            ("Enter", "answer"),
            ("Ctrl-R", "recommend"),
            ("Ctrl-B", "calibration"),
            ("F5", "history"),
            ("Ctrl-L", "log out"),
            ("F1", "help"),
            ("Esc", "quit"),
        ],
    };
    let mut spans = Vec::new();
    for (key, desc) in keys {
        spans.push(Span::styled(format!(" {}", key), Style::default().fg(colors::KEYBIND)));
        spans.push(Span::raw(format!(" {} ", desc)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    trace!("render_help_overlay: called");
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                .fg(colors::HEADER),
        )]),
        Line::from(""),
        Line::from(vec![Span::styled("Sign in", Style::default().add_modifier(Modifier::BOLD))]),
        key_line("Tab/S-Tab", "Next / previous field"),
        key_line("Ctrl-T", "Switch between login and registration"),
        key_line("Enter", "Submit"),
        Line::from(""),
        Line::from(vec![Span::styled("Exercises", Style::default().add_modifier(Modifier::BOLD))]),
        key_line("↑/↓", "Choose an option"),
        key_line("Enter", "Submit the answer"),
        key_line("Ctrl-R", "Next recommendation"),
        key_line("Ctrl-B", "Reload the calibration exercises"),
        key_line("F5", "Refresh the history"),
        Line::from(""),
        Line::from(vec![Span::styled("Global", Style::default().add_modifier(Modifier::BOLD))]),
        key_line("Ctrl-L", "Log out"),
        key_line("F1", "Toggle help"),
        key_line("Esc/Ctrl-C", "Quit"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help (F1 to close) ")
                .style(Style::default().bg(Color::Black)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(help, popup_area);
}

fn key_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{:<12}", key), Style::default().fg(colors::KEYBIND)),
        Span::raw(desc),
    ])
}

fn render_empty_message(frame: &mut Frame, area: Rect, message: &str) {
    let inner = area.inner(Margin {
        horizontal: 2,
        vertical: 2,
    });
    let empty = Paragraph::new(message)
        .style(Style::default().fg(colors::DIM))
        .alignment(Alignment::Center);
    frame.render_widget(empty, inner);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Difficulty, Interaction, UserProfile};
    use crate::session::Session;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn draw(app: &AppState, flow: &FlowState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| render(app, flow, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn learner() -> FlowState {
        FlowState {
            token_checked: true,
            session: Session::with_token("t"),
            user: Some(UserProfile {
                id: "u1".to_string(),
                user_id: "alice".to_string(),
                name: "Alice".to_string(),
                level: None,
                created_at: String::new(),
            }),
            bundle: vec![Exercise {
                id: "e1".to_string(),
                skill_id: "fractions".to_string(),
                skill_external_id: None,
                prompt: "What is 1/2 + 1/2?".to_string(),
                difficulty: Difficulty::Easy,
                options: Some(vec!["1".to_string(), "2".to_string()]),
                answer: Some("1".to_string()),
                solution: None,
            }],
            ..FlowState::default()
        }
    }

    #[test]
    fn test_render_auth_masks_password() {
        let mut app = AppState::new(10);
        app.form.user_id = "alice".to_string();
        app.form.password = "hunter2".to_string();
        let flow = FlowState {
            token_checked: true,
            auth_error: Some("Invalid credentials".to_string()),
            ..FlowState::default()
        };

        let screen = draw(&app, &flow);
        assert!(screen.contains("Log in"));
        assert!(screen.contains("alice"));
        assert!(!screen.contains("hunter2"));
        assert!(screen.contains("Invalid credentials"));
    }

    #[test]
    fn test_render_calibration_without_history() {
        let app = AppState::new(10);
        let screen = draw(&app, &learner());

        assert!(screen.contains("Calibration 1/1"));
        assert!(screen.contains("What is 1/2 + 1/2?"));
        assert!(screen.contains("Alice"));
        assert!(screen.contains(NO_DATA));
    }

    #[test]
    fn test_render_progress_and_error() {
        let app = AppState::new(10);
        let mut flow = learner();
        flow.error = Some("Error while saving the answer".to_string());
        flow.history = vec![Interaction {
            id: "i1".to_string(),
            user_id: "alice".to_string(),
            exercise_id: "e1".to_string(),
            skill_id: "fractions".to_string(),
            correct: true,
            timestamp: None,
            probability_before: Some(0.3),
            probability_after: Some(0.8),
        }];

        let screen = draw(&app, &flow);
        assert!(screen.contains("Error while saving the answer"));
        assert!(screen.contains("mastered"));
        assert!(screen.contains("80.0%"));
    }

    #[test]
    fn test_render_success_rate_with_one_decimal() {
        let app = AppState::new(10);
        let mut flow = learner();
        flow.history = ["i1", "i2", "i3"]
            .iter()
            .enumerate()
            .map(|(n, id)| Interaction {
                id: id.to_string(),
                user_id: "alice".to_string(),
                exercise_id: "e1".to_string(),
                skill_id: "fractions".to_string(),
                correct: n != 1,
                timestamp: None,
                probability_before: None,
                probability_after: Some(0.5),
            })
            .collect();

        let screen = draw(&app, &flow);
        assert!(screen.contains("66.7%"));
    }

    #[test]
    fn test_render_help_overlay() {
        let mut app = AppState::new(10);
        app.show_help = true;
        let screen = draw(&app, &learner());
        assert!(screen.contains("Keyboard Shortcuts"));
    }
}
