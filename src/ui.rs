use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::pattern::{percussion_for_phase, Drum, PHASES};

const BUTTON_WIDTH:  u16 = 16;
const BUTTON_HEIGHT: u16 = 3;
/// Beat indicator and note line drawn under the button.
const BELOW_BUTTON:  u16 = 3;

// ── Layout ────────────────────────────────────────────────────────────────────

fn chunks(area: Rect) -> [Rect; 4] {
    let c = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title bar
            Constraint::Min(0),    // stage: button + beat indicator
            Constraint::Length(4), // status
            Constraint::Length(3), // help
        ])
        .split(area);
    [c[0], c[1], c[2], c[3]]
}

/// Where the Start/Stop button sits for a given screen size.  Shared by
/// drawing and mouse hit-testing.
pub fn button_area(area: Rect) -> Rect {
    let stage = chunks(area)[1];
    let w = BUTTON_WIDTH.min(stage.width);
    let h = BUTTON_HEIGHT.min(stage.height);
    let x = stage.x + (stage.width - w) / 2;
    let y = stage.y + stage.height.saturating_sub(h + BELOW_BUTTON) / 2;
    Rect::new(x, y, w, h)
}

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();
    let [title, stage, status, help] = chunks(area);

    draw_title(f, title, app);
    draw_stage(f, stage, area, app);
    draw_status(f, status, app);
    draw_help(f, help);
}

// ── Title bar ─────────────────────────────────────────────────────────────────

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let ind = if app.is_playing() { "  ▶ PLAYING" } else { "  ■ STOPPED" };
    let text = format!("  BPM Beat{}  ─  Space/Enter/click: start/stop  Esc: quit", ind);
    f.render_widget(
        Paragraph::new(text)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        area,
    );
}

// ── Button + beat indicator ───────────────────────────────────────────────────

fn drum_color(drums: &[Drum]) -> Color {
    if drums.contains(&Drum::Kick) {
        Color::Red
    } else if drums.contains(&Drum::Snare) {
        Color::Yellow
    } else {
        Color::Cyan
    }
}

fn draw_stage(f: &mut Frame, stage: Rect, screen: Rect, app: &App) {
    let playing = app.is_playing();
    let button = button_area(screen);
    let color = if playing { Color::Red } else { Color::Green };

    f.render_widget(
        Paragraph::new(app.button_label())
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(color))),
        button,
    );

    let below = Rect::new(
        stage.x,
        (button.y + button.height + 1).min(stage.y + stage.height),
        stage.width,
        (BELOW_BUTTON - 1).min((stage.y + stage.height).saturating_sub(button.y + button.height + 1)),
    );
    if below.height == 0 { return; }

    let last = app.last_beat();
    let current = last.map(|b| b.phase);

    let mut cells: Vec<Span> = Vec::new();
    for phase in 0..PHASES {
        let drums = percussion_for_phase(phase);
        let lit = playing && current == Some(phase);
        let sty = if lit {
            Style::default().fg(Color::Black).bg(drum_color(drums)).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(drum_color(drums))
        };
        let glyph = if lit { " ● " } else { " · " };
        if phase > 0 { cells.push(Span::raw(" ")); }
        cells.push(Span::styled(glyph, sty));
    }

    let note = match last {
        Some(beat) if playing => app.note_label(&beat),
        _ => "—".to_string(),
    };
    let lines = vec![
        Line::from(cells),
        Line::from(vec![
            Span::styled("Note: ", Style::default().fg(Color::DarkGray)),
            Span::styled(note, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        ]),
    ];
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), below);
}

// ── Status bar ────────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let extra = if app.status_msg.is_empty() { String::new() } else { format!("  │  {}", app.status_msg) };
    let clips = app.loaded_clips();

    let text = vec![
        Line::from(vec![
            Span::styled("BPM: ",   Style::default().fg(Color::DarkGray)),
            Span::styled(format!("{:.0}", app.bpm()), Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw("  │  "),
            Span::styled("Vol: ",   Style::default().fg(Color::DarkGray)),
            Span::styled(format!("{:.0}%", app.volume() * 100.0),
                         Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
            Span::raw("  │  "),
            Span::styled("Clips: ", Style::default().fg(Color::DarkGray)),
            Span::styled(format!("{}/{}", clips, crate::clips::ClipId::COUNT),
                         Style::default().fg(if clips == crate::clips::ClipId::COUNT { Color::Cyan } else { Color::Yellow })),
            Span::styled(extra,     Style::default().fg(Color::Yellow)),
        ]),
    ];

    f.render_widget(
        Paragraph::new(text)
            .block(Block::default().title(" Status ").borders(Borders::ALL))
            .wrap(Wrap { trim: false }),
        area,
    );
}

// ── Help ──────────────────────────────────────────────────────────────────────

fn draw_help(f: &mut Frame, area: Rect) {
    let w = Style::default().fg(Color::White);
    let line = Line::from(vec![
        Span::styled("[Space/Enter] ", w), Span::raw("Start/Stop  │  "),
        Span::styled("[↑↓] ",          w), Span::raw("Volume  │  "),
        Span::styled("[Esc/q] ",       w), Span::raw("Quit"),
    ]);
    f.render_widget(
        Paragraph::new(line)
            .block(Block::default().title(" Help ").borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray)),
        area,
    );
}
