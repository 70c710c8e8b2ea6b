use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use fmseq::pitch::{is_black_key, row_label};
use fmseq::viewport::VISIBLE_ROWS;
use fmseq::{note_name, Pitch, MAX_STEPS};

use crate::app::{App, InputMode};

/// Width of the piano key column, in terminal cells.
pub const KEY_W: u16 = 5;
/// Width of one step column.
pub const CELL_W: u16 = 2;

// ── Layout ────────────────────────────────────────────────────────────────────

/// Title, piano roll, status and help areas for a frame.
fn panels(area: Rect) -> [Rect; 4] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title bar   chunks[0]
            Constraint::Min(6),    // piano roll  chunks[1]
            Constraint::Length(3), // status      chunks[2]
            Constraint::Length(4), // help        chunks[3]
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2], chunks[3]]
}

/// Inside of the piano-roll border: timeline row on top, pitch rows below.
pub fn roll_area(frame: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(panels(frame)[1])
}

/// Step columns that fit next to the key column.
pub fn visible_steps(frame: Rect) -> usize {
    (roll_area(frame).width.saturating_sub(KEY_W) / CELL_W) as usize
}

/// First pitch row drawn, so the cursor row stays on screen in short terminals.
fn row_offset(rows_fit: usize, cursor_row: usize) -> usize {
    if rows_fit == 0 || cursor_row < rows_fit { 0 } else { cursor_row + 1 - rows_fit }
}

fn cursor_row(app: &App) -> usize {
    app.seq.viewport().rows().position(|p| p == app.cursor_pitch).unwrap_or(0)
}

/// Map a terminal cell to the (step, pitch) drawn there.
pub fn hit_test(frame: Rect, app: &App, column: u16, row: u16) -> Option<(usize, Pitch)> {
    let inner = roll_area(frame);
    if column < inner.x + KEY_W || column >= inner.x + inner.width
        || row <= inner.y || row >= inner.y + inner.height
    {
        return None;
    }
    let rows_fit = inner.height.saturating_sub(1) as usize;
    let offset = row_offset(rows_fit, cursor_row(app));
    let row_idx = offset + (row - inner.y - 1) as usize;
    let pitch = app.seq.viewport().rows().nth(row_idx)?;
    let step = app.first_visible_step() + ((column - inner.x - KEY_W) / CELL_W) as usize;
    (step < MAX_STEPS).then_some((step, pitch))
}

// ── Top-level routing ─────────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = panels(f.area());
    draw_title(f, chunks[0], app);
    draw_roll(f, chunks[1], app);
    draw_status(f, chunks[2], app);
    draw_help(f, chunks[3]);
}

// ── Title bar ─────────────────────────────────────────────────────────────────

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let vp = app.seq.viewport();
    let low = vp.lowest_pitch();
    let high = low + VISIBLE_ROWS as u16 - 1;
    let range = match (Pitch::try_from(low), Pitch::try_from(high)) {
        (Ok(l), Ok(h)) => format!("{}-{}", note_name(l), note_name(h)),
        (Ok(l), Err(_)) => format!("{}-", note_name(l)),
        _ => String::new(),
    };
    let d = Style::default().fg(Color::DarkGray);
    let v = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let line = Line::from(vec![
        Span::styled("fmseq  ─  ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Span::styled("BPM: ", d),    Span::styled(app.seq.bpm().to_string(), v),
        Span::raw("  │  "),
        Span::styled("Note: ", d),   Span::styled(app.seq.note_length().to_string(), v),
        Span::raw("  │  "),
        Span::styled("Step: ", d),   Span::styled(format!("{:.3}s", app.seq.step_secs()), v),
        Span::raw("  │  "),
        Span::styled("Octave: ", d), Span::styled(format!("{} ({})", vp.base_octave(), range), v),
    ]);
    f.render_widget(
        Paragraph::new(line)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        area,
    );
}

// ── Piano roll ────────────────────────────────────────────────────────────────

fn draw_roll(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Sequencer — [Click/Space] Toggle  [Wheel] Octave  [Shift+Wheel] Scroll ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let first = app.first_visible_step();
    let last = (first + (inner.width.saturating_sub(KEY_W) / CELL_W) as usize).min(MAX_STEPS);
    let rows_fit = inner.height.saturating_sub(1) as usize;
    let offset = row_offset(rows_fit, cursor_row(app));

    let mut lines: Vec<Line> = Vec::with_capacity(rows_fit + 1);
    lines.push(timeline(first, last, app.cursor_step));

    for pitch in app.seq.viewport().rows().skip(offset).take(rows_fit) {
        let black = is_black_key(pitch);
        let label = row_label(pitch).unwrap_or_default();
        let key_sty = if pitch == app.cursor_pitch {
            Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else if black {
            Style::default().fg(Color::White).bg(Color::Black)
        } else {
            Style::default().fg(Color::Black).bg(Color::White)
        };
        let mut spans = vec![Span::styled(format!("{:<4}", label), key_sty), Span::raw(" ")];

        for step in first..last {
            let active = app.seq.is_active(step, pitch);
            let is_cu = step == app.cursor_step && pitch == app.cursor_pitch;
            let downbeat = (step / 4) % 2 == 0;
            let sty = if is_cu && active { Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD) }
                      else if is_cu      { Style::default().fg(Color::Black).bg(Color::Yellow) }
                      else if active     { Style::default().fg(Color::Green).add_modifier(Modifier::BOLD) }
                      else if black      { Style::default().fg(Color::DarkGray).bg(Color::Black) }
                      else if downbeat   { Style::default().fg(Color::DarkGray) }
                      else               { Style::default().fg(Color::Gray) };
            let cell = if active { "██" } else if step % 4 == 0 { "┊·" } else { " ·" };
            spans.push(Span::styled(cell, sty));
        }
        lines.push(Line::from(spans));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

/// Measure numbers every four steps, cursor column highlighted.
fn timeline(first: usize, last: usize, cursor: usize) -> Line<'static> {
    let mut spans = vec![Span::raw(" ".repeat(KEY_W as usize))];
    for step in first..last {
        let text = if step % 4 == 0 { format!("{:<2}", step / 4 + 1) } else { "  ".to_string() };
        let sty = if step == cursor { Style::default().fg(Color::Black).bg(Color::Yellow) }
                  else              { Style::default().fg(Color::DarkGray) };
        spans.push(Span::styled(text, sty));
    }
    Line::from(spans)
}

// ── Status / prompt ───────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let prompt = match &app.input_mode {
        InputMode::None                => None,
        InputMode::SaveName            => Some("Save as: "),
        InputMode::ConfirmOverwrite(_) => Some("Overwrite? (y/n): "),
        InputMode::LoadIndex           => Some("Load #: "),
        InputMode::Bpm                 => Some("BPM: "),
    };
    let notes = app.seq.grid().step(app.cursor_step)
        .map(|s| s.notes().iter().map(|&p| note_name(p)).collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "·".to_string());

    let mut spans = vec![
        Span::styled("Step ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{}/{}", app.cursor_step + 1, MAX_STEPS), Style::default().fg(Color::White)),
        Span::styled("  ", Style::default()),
        Span::styled(notes, Style::default().fg(Color::Green)),
        Span::raw("  │  "),
    ];
    match prompt {
        Some(label) => {
            spans.push(Span::styled(label, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)));
            spans.push(Span::styled(format!("{}_", app.input_buf), Style::default().fg(Color::White)));
            spans.push(Span::styled(format!("   {}", app.status_msg), Style::default().fg(Color::DarkGray)));
        }
        None => spans.push(Span::styled(app.status_msg.as_str(), Style::default().fg(Color::Yellow))),
    }

    f.render_widget(
        Paragraph::new(Line::from(spans))
            .block(Block::default().title(" Status ").borders(Borders::ALL))
            .wrap(Wrap { trim: false }),
        area,
    );
}

// ── Help ──────────────────────────────────────────────────────────────────────

fn draw_help(f: &mut Frame, area: Rect) {
    let w = Style::default().fg(Color::White);

    let edit = Line::from(vec![
        Span::styled("[Arrows] ", w),  Span::raw("Cursor  │  "),
        Span::styled("[Space] ", w),   Span::raw("Toggle  │  "),
        Span::styled("[[ ]] ", w),     Span::raw("Octave  │  "),
        Span::styled("[- =] ", w),     Span::raw("Transpose ±1  │  "),
        Span::styled("[_ +] ", w),     Span::raw("±12  │  "),
        Span::styled("[c] ", w),       Span::raw("Clear"),
    ]);
    let global = Line::from(vec![
        Span::styled("[PgUp/Dn] ", w), Span::raw("BPM ±5  │  "),
        Span::styled("[b] ", w),       Span::raw("Type BPM  │  "),
        Span::styled("[n/N] ", w),     Span::raw("Note length  │  "),
        Span::styled("[^S] ", w),      Span::raw("Save  │  "),
        Span::styled("[^L] ", w),      Span::raw("Load  │  "),
        Span::styled("[^E] ", w),      Span::raw("Export  │  "),
        Span::styled("[Esc] ", w),     Span::raw("Quit"),
    ]);

    f.render_widget(
        Paragraph::new(vec![edit, global])
            .block(Block::default().title(" Help ").borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray)),
        area,
    );
}
