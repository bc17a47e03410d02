//! UI rendering for the adaptive quiz.

use crate::app::{App, View};
use quiz_engine::summary::format_duration;
use quiz_engine::{EndReason, QuizSummary};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &App) {
    match app.view {
        View::Login => draw_login(f, app),
        View::Quiz => draw_quiz(f, app),
        View::Results => draw_results(f, app),
    }

    if let Some(msg) = &app.message {
        draw_message(f, msg);
    }

    if app.confirm_quit {
        draw_confirm_quit(f);
    }
}

fn draw_login(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    let header = Paragraph::new("Adaptive Quiz")
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let info = format!(
        "{} questions in the bank. Each quiz has up to {} questions and lasts {}.",
        app.bank.len(),
        app.config.quiz.questions_per_quiz,
        format_duration(app.config.to_session_config().duration),
    );
    let body = Paragraph::new(info)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(body, chunks[1]);

    let area = centered_rect(50, 15, chunks[1]);
    f.render_widget(Clear, area);
    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(" Username "));
    f.render_widget(input, area);
    if !app.confirm_quit {
        f.set_cursor_position((area.x + 1 + app.input_buffer.len() as u16, area.y + 1));
    }

    let footer = Paragraph::new("Enter:Start quiz  Esc:Quit")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[2]);
}

fn draw_quiz(f: &mut Frame, app: &App) {
    let Some(session) = &app.session else {
        return;
    };
    let Some(question) = session.current() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Progress and timer
            Constraint::Min(5),    // Question
            Constraint::Length(question.choices().len() as u16 + 2),
            Constraint::Length(3), // Feedback
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    let remaining = app.countdown().unwrap_or_default();
    let timer_color = if session.remaining().num_seconds() < 60 {
        Color::Red
    } else {
        Color::Green
    };
    let progress = Line::from(vec![
        Span::raw(format!(
            "{}  |  Question {} of {}  |  Score {}  |  ",
            session.username(),
            session.position() + 1,
            session.total(),
            session.score(),
        )),
        Span::styled(remaining, Style::default().fg(timer_color).add_modifier(Modifier::BOLD)),
    ]);
    f.render_widget(
        Paragraph::new(progress)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        chunks[0],
    );

    let prompt = Paragraph::new(format!("Q{}: {}", session.position() + 1, question.prompt()))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Question "));
    f.render_widget(prompt, chunks[1]);

    let items: Vec<ListItem> = question
        .choices()
        .iter()
        .enumerate()
        .map(|(i, choice)| {
            let style = match &app.feedback {
                Some(fb) if choice.trim() == fb.answer.trim() => Style::default().fg(Color::Green),
                Some(fb) if fb.picked == i => Style::default().fg(Color::Red),
                _ => Style::default(),
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("[{}] ", i + 1),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(choice.as_str()),
            ]))
            .style(style)
        })
        .collect();
    f.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title(" Choices ")),
        chunks[2],
    );

    let feedback = match &app.feedback {
        Some(fb) => {
            let mut spans = if fb.correct {
                vec![Span::styled("Correct!", Style::default().fg(Color::Green))]
            } else {
                vec![
                    Span::styled("Wrong. ", Style::default().fg(Color::Red)),
                    Span::raw(format!("The answer is: {}", fb.answer)),
                ]
            };
            if app.config.display.show_question_tally {
                spans.push(Span::styled(
                    format!("  [{}/{}]", fb.times_correct, fb.times_chosen),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Line::from(spans)
        }
        None => Line::from(""),
    };
    f.render_widget(
        Paragraph::new(feedback)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        chunks[3],
    );

    let footer = Paragraph::new("1-9:Answer  Enter:Next  Esc:Quit")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[4]);
}

fn draw_results(f: &mut Frame, app: &App) {
    let Some(summary) = &app.summary else {
        return;
    };

    let chart_height = if app.config.display.show_history_chart { 12 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(7),
            Constraint::Length(chart_height),
            Constraint::Length(3),
        ])
        .split(f.area());

    let title = match summary.reason {
        Some(EndReason::TimeExpired) => "Time's up!",
        _ => "Quiz complete",
    };
    f.render_widget(
        Paragraph::new(title)
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL)),
        chunks[0],
    );

    f.render_widget(
        Paragraph::new(summary_lines(summary))
            .block(Block::default().borders(Borders::ALL).title(" Results ")),
        chunks[1],
    );

    if app.config.display.show_history_chart {
        draw_history(f, summary, chunks[2]);
    }

    let footer = Paragraph::new("Enter:New quiz  Esc:Quit")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[3]);
}

fn summary_lines(summary: &QuizSummary) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            Span::raw("Score: "),
            Span::styled(
                format!("{}/{}", summary.score, summary.total),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(format!(
            "Questions seen so far: {}/{} ({:.1}%)",
            summary.answered_ever,
            summary.bank_size,
            summary.coverage_percent()
        )),
        Line::from(format!(
            "Answered correctly at least once: {}/{} ({:.1}%)",
            summary.correct_ever,
            summary.answered_ever,
            summary.mastery_percent()
        )),
        Line::from(format!("Time taken: {}", format_duration(summary.elapsed))),
        Line::from(format!(
            "Time per question: {}",
            format_duration(summary.per_question)
        )),
    ]
}

fn draw_history(f: &mut Frame, summary: &QuizSummary, area: Rect) {
    let labels: Vec<String> = (1..=summary.history.len()).map(|i| i.to_string()).collect();
    let data: Vec<(&str, u64)> = labels
        .iter()
        .zip(&summary.history)
        .map(|(label, score)| (label.as_str(), u64::from(*score)))
        .collect();

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" Score history "))
        .data(data.as_slice())
        .bar_width(3)
        .bar_gap(1)
        .max(summary.total as u64)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, area);
}

fn draw_message(f: &mut Frame, msg: &str) {
    let area = Rect::new(
        f.area().x + 2,
        f.area().height.saturating_sub(6),
        f.area().width.saturating_sub(4),
        3,
    );
    f.render_widget(Clear, area);

    let message = Paragraph::new(msg)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(message, area);
}

fn draw_confirm_quit(f: &mut Frame) {
    let area = centered_rect(40, 20, f.area());
    f.render_widget(Clear, area);

    let popup = Paragraph::new("Quit the quiz? (y/n)")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(" Quit "));
    f.render_widget(popup, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

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
    use crate::config::Config;
    use quiz_engine::{PerformanceStore, Question, QuestionBank};
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_login_screen_renders() {
        let bank = QuestionBank::new(vec![Question::new("1", "Q", vec!["a".into()], "a")]).unwrap();
        let mut app = App::with_parts(Config::default(), bank, PerformanceStore::in_memory(), None);
        app.input_buffer = "alice".into();
        let screen = render(&app);
        assert!(screen.contains("Adaptive Quiz"));
        assert!(screen.contains("alice"));
    }

    #[test]
    fn test_summary_lines_show_percentages() {
        let summary = QuizSummary {
            score: 3,
            total: 4,
            reason: Some(EndReason::Finished),
            elapsed: chrono::Duration::seconds(130),
            per_question: chrono::Duration::seconds(32),
            answered_ever: 8,
            bank_size: 16,
            correct_ever: 6,
            history: vec![2, 3],
        };
        let text: Vec<String> = summary_lines(&summary).iter().map(|l| l.to_string()).collect();
        assert_eq!(text[0], "Score: 3/4");
        assert_eq!(text[1], "Questions seen so far: 8/16 (50.0%)");
        assert_eq!(text[2], "Answered correctly at least once: 6/8 (75.0%)");
        assert_eq!(text[3], "Time taken: 2 min 10 sec");
    }
}
