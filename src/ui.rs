use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

use crate::{
    app::App,
    feedback::KeyState,
    pitch::PitchClass,
    score::{format_response_time, ScoreFormula},
    session::Phase,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const KEY_WIDTH: usize = 5;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.phase() {
            Phase::Idle => render_idle(self, area, buf),
            Phase::Playing => render_playing(self, area, buf),
            Phase::Finished => render_results(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

fn key_style(pc: PitchClass, state: KeyState) -> Style {
    match state {
        KeyState::Correct => Style::default().fg(Color::Black).bg(Color::Green).patch(bold()),
        KeyState::Wrong => Style::default().fg(Color::White).bg(Color::Red).patch(bold()),
        KeyState::None if pc.is_black_key() => Style::default().fg(Color::White).bg(Color::DarkGray),
        KeyState::None => Style::default().fg(Color::Black).bg(Color::White),
    }
}

/// Two rows: note names coloured by state, then the key that plays each one
fn keyboard_lines(states: impl Fn(PitchClass) -> KeyState) -> Vec<Line<'static>> {
    let names = PitchClass::all()
        .map(|pc| {
            Span::styled(
                format!("{:^width$}", pc.name(), width = KEY_WIDTH),
                key_style(pc, states(pc)),
            )
        })
        .collect::<Vec<Span>>();

    let keys = PitchClass::all()
        .map(|pc| {
            Span::styled(
                format!("{:^width$}", pc.key(), width = KEY_WIDTH),
                Style::default().add_modifier(Modifier::DIM),
            )
        })
        .collect::<Vec<Span>>();

    vec![Line::from(names), Line::from(keys)]
}

fn vertical(area: Rect, constraints: &[Constraint]) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(constraints)
        .split(area)
}

fn render_idle(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = vertical(
        area,
        &[
            Constraint::Length(2), // title
            Constraint::Length(3), // instructions
            Constraint::Length(3), // keyboard
            Constraint::Length(2), // settings
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ],
    );

    Paragraph::new(Span::styled("hark", bold().fg(Color::Cyan)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    Paragraph::new(
        "A chord plays. Press the key of every note in it before the clock runs out.",
    )
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .render(chunks[1], buf);

    Paragraph::new(keyboard_lines(|_| KeyState::None))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let config = &app.config;
    let settings = format!(
        "{}s | notes {}..={} | {} | score: {}",
        config.session_secs, config.min_note, config.max_note, config.chord_size, config.score_formula
    );
    Paragraph::new(Span::styled(settings, italic().fg(Color::Gray)))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(Span::styled("(space) start / (r) replay / (esc) quit", italic()))
        .render(chunks[5], buf);
}

fn render_playing(app: &App, area: Rect, buf: &mut Buffer) {
    let board = app.board();
    let metrics = board.metrics();

    let chunks = vertical(
        area,
        &[
            Constraint::Length(2), // timer
            Constraint::Length(2), // metrics
            Constraint::Min(0),
            Constraint::Length(3), // keyboard
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ],
    );

    Paragraph::new(Span::styled(metrics.clock(), bold().add_modifier(Modifier::DIM)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let stats = [
        format!("score {}", app.config.score_formula.format(metrics.score)),
        format!("{} / {} correct", metrics.correct_clicks, metrics.total_clicks),
        format!("{}% acc", metrics.accuracy_label()),
        format!("{}s response", metrics.response_label()),
    ]
    .iter()
    .join("   ");
    Paragraph::new(Span::styled(stats, bold()))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(keyboard_lines(|pc| board.key_state(pc)))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(Span::styled("(r) replay / (esc) back", italic())).render(chunks[5], buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(summary) = app.board().summary() else {
        return;
    };

    let chunks = vertical(
        area,
        &[
            Constraint::Min(0),
            Constraint::Length(2), // score
            Constraint::Length(4), // details
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ],
    );

    let score_color = match summary.formula {
        ScoreFormula::Curved if summary.score > 100.0 => Color::Magenta,
        _ => Color::Cyan,
    };
    Paragraph::new(Span::styled(
        format!("score {}", summary.score_label()),
        bold().fg(score_color),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let spread = summary
        .response_std_dev
        .map(|sd| format!(" (sd {})", format_response_time(sd)))
        .unwrap_or_default();
    let details = vec![
        Line::from(format!(
            "{} correct of {} clicks   {}% acc",
            summary.correct_clicks,
            summary.total_clicks,
            summary.accuracy_label()
        )),
        Line::from(format!(
            "{} chords   {}s mean response{}",
            summary.rounds_completed,
            summary.mean_response_label(),
            spread
        )),
    ];
    Paragraph::new(details)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    Paragraph::new(Span::styled("(enter) back / (r) replay / (q) quit", italic()))
        .render(chunks[4], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentSink;
    use crate::config::Config;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::time::Duration;

    fn create_test_app() -> App {
        App::with_seed(Config::default(), Box::new(SilentSink::default()), 7).unwrap()
    }

    fn rendered(app: &App, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect::<String>()
    }

    fn press(app: &mut App, c: char) {
        app.on_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
    }

    #[test]
    fn test_idle_screen() {
        let app = create_test_app();
        let text = rendered(&app, Rect::new(0, 0, 100, 24));
        assert!(text.contains("hark"));
        assert!(text.contains("(space) start"));
        assert!(text.contains("C#"));
        assert!(text.contains("60s"));
    }

    #[test]
    fn test_playing_screen_shows_metrics() {
        let mut app = create_test_app();
        press(&mut app, ' ');
        let text = rendered(&app, Rect::new(0, 0, 100, 24));
        assert!(text.contains("01:00"));
        assert!(text.contains("0.00% acc"));
        assert!(text.contains("0.000s response"));
    }

    #[test]
    fn test_playing_key_colours() {
        let mut app = create_test_app();
        press(&mut app, ' ');
        let right = app.session.round().unwrap().answer().pitch_class(0);
        press(&mut app, right.key());

        let area = Rect::new(0, 0, 100, 24);
        let mut buffer = Buffer::empty(area);
        (&app).render(area, &mut buffer);

        let green = buffer.content().iter().any(|c| c.bg == Color::Green);
        assert!(green, "a solved key should be highlighted");
        assert!(rendered(&app, area).contains("1 / 1 correct"));
    }

    #[test]
    fn test_live_score_uses_curved_display() {
        let mut app = create_test_app();
        press(&mut app, ' ');

        // 100 clean clicks push the curved score to 122
        while app.session.counters().correct < 100 {
            let keys: Vec<char> = app
                .session
                .round()
                .unwrap()
                .answer()
                .pitch_classes()
                .map(|pc| pc.key())
                .collect();
            for key in keys {
                press(&mut app, key);
            }
            app.on_elapsed(Duration::from_millis(150));
        }

        let text = rendered(&app, Rect::new(0, 0, 120, 24));
        let live = app.board().metrics().score;
        assert!(live > 100.0);
        assert!(text.contains(&format!("score {}", ScoreFormula::Curved.format(live))));
        assert!(text.contains("score 100 + "));
    }

    #[test]
    fn test_results_screen() {
        let mut app = create_test_app();
        press(&mut app, ' ');
        app.on_elapsed(Duration::from_secs(61));
        let text = rendered(&app, Rect::new(0, 0, 100, 24));
        assert!(text.contains("score 0.0"));
        assert!(text.contains("0 correct of 0 clicks"));
        assert!(text.contains("0.00% acc"));
        assert!(text.contains("(enter) back"));
    }

    #[test]
    fn test_tiny_and_huge_areas() {
        let mut app = create_test_app();
        for area in [Rect::new(0, 0, 10, 5), Rect::new(0, 0, 400, 200)] {
            let mut buffer = Buffer::empty(area);
            (&app).render(area, &mut buffer);
            assert!(*buffer.area() == area);
        }
        press(&mut app, ' ');
        let area = Rect::new(0, 0, 8, 3);
        let mut buffer = Buffer::empty(area);
        (&app).render(area, &mut buffer);
        assert!(*buffer.area() == area);
    }

    #[test]
    fn test_ui_constants() {
        assert_eq!(HORIZONTAL_MARGIN, 5);
        assert_eq!(VERTICAL_MARGIN, 2);
        assert_eq!(KEY_WIDTH, 5);
    }
}
