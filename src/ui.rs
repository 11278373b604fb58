//! Layout and drawing: playfield, sidebar, next preview, pause and game-over overlays.

use crate::game::{BOARD_HEIGHT, BOARD_WIDTH, Cell, GameState, Status};
use crate::shapes::PieceKind;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each board cell is two terminal columns wide so squares look square.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;

const SIDEBAR_WIDTH: u16 = 24;

/// Duration of the line-clear flash in ms.
const LINE_CLEAR_FADE_MS: u32 = 180;

/// How many leaderboard entries the game-over screen lists.
const GAME_OVER_SCORES_SHOWN: usize = 5;

const CONTROLS: [(&str, &str); 6] = [
    ("← →", "Move"),
    ("↓", "Soft drop"),
    ("↑", "Rotate"),
    ("Space", "Hard drop"),
    ("P", "Pause"),
    ("R", "Restart"),
];

/// Board size in terminal cells including the border.
fn playfield_pixel_size() -> (u16, u16) {
    (
        BOARD_WIDTH as u16 * CELL_WIDTH + 2,
        BOARD_HEIGHT as u16 * CELL_HEIGHT + 2,
    )
}

/// Rows removed by the latest lock and the fade effect playing over them.
#[derive(Default)]
pub struct LineClearFlash {
    rows: Vec<usize>,
    effect: Option<Effect>,
    process_time: Option<Instant>,
}

impl LineClearFlash {
    /// Start a new flash over `rows` (board row indices).
    pub fn start(&mut self, rows: &[usize]) {
        self.rows = rows.to_vec();
        self.effect = None;
        self.process_time = None;
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.effect = None;
        self.process_time = None;
    }

    pub fn is_active(&self) -> bool {
        !self.rows.is_empty()
    }

    /// True once the effect has played out.
    pub fn finished(&self) -> bool {
        self.effect.as_ref().is_some_and(Effect::done)
    }
}

/// Draw the whole screen: board, sidebar, then any overlay for the current status.
pub fn draw(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    flash: &mut LineClearFlash,
    now: Instant,
) {
    let area = frame.area();
    let board_rect = draw_game(frame, state, theme, area);
    if flash.is_active() {
        apply_line_clear_effect(frame, theme, board_rect, flash, now);
    }
    match state.status() {
        Status::Playing => {}
        Status::Paused => draw_pause_overlay(frame, theme, area),
        Status::GameOver => draw_game_over(frame, state, theme, area),
    }
}

/// Create or advance the fade over the cleared rows.
fn apply_line_clear_effect(
    frame: &mut Frame,
    theme: &Theme,
    board_rect: Rect,
    flash: &mut LineClearFlash,
    now: Instant,
) {
    let delta = flash
        .process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    flash.process_time = Some(now);

    if flash.effect.is_none() {
        let ys: HashSet<u16> = flash
            .rows
            .iter()
            .map(|&r| board_rect.y + r as u16 * CELL_HEIGHT)
            .collect();
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| ys.contains(&pos.y)));
        let effect = fx::fade_to(
            theme.main_fg,
            theme.main_fg,
            (LINE_CLEAR_FADE_MS, Interpolation::Linear),
        )
        .with_filter(filter)
        .with_area(board_rect);
        flash.effect = Some(effect);
    }

    if let Some(effect) = flash.effect.as_mut() {
        frame.render_effect(effect, board_rect, TfxDuration::from_millis(delta_ms));
    }
}

/// Draw playfield + sidebar centred in `area`. Returns the inner board rect.
fn draw_game(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) -> Rect {
    let (pw, ph) = playfield_pixel_size();
    let total_w = pw + SIDEBAR_WIDTH;

    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);

    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph),
            Constraint::Fill(1),
        ])
        .split(horiz_chunks[1]);

    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert_chunks[1]);

    let board_rect = draw_playfield(frame, state, theme, inner[0]);
    draw_sidebar(frame, state, theme, inner[1]);
    board_rect
}

fn draw_playfield(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Blocktui ", Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let board_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: (BOARD_WIDTH as u16 * CELL_WIDTH).min(inner.width),
        height: (BOARD_HEIGHT as u16 * CELL_HEIGHT).min(inner.height),
    };

    let piece_cells: Vec<(i32, i32)> = state
        .active()
        .map(|p| p.cells().collect())
        .unwrap_or_default();
    let piece_color = state.active().map(|p| theme.piece_color(p.kind));

    let buf = frame.buffer_mut();
    for (row, cells) in state.grid().rows().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            let rx = board_rect.x + col as u16 * CELL_WIDTH;
            let ry = board_rect.y + row as u16 * CELL_HEIGHT;
            if rx + CELL_WIDTH > board_rect.x + board_rect.width
                || ry >= board_rect.y + board_rect.height
            {
                continue;
            }
            let active_here = piece_cells.contains(&(row as i32, col as i32));
            let (symbol, style) = match (active_here, piece_color, cell) {
                (true, Some(color), _) => ("██", Style::default().fg(color).bg(theme.bg)),
                (_, _, Cell::Filled(kind)) => (
                    "██",
                    Style::default().fg(theme.piece_color(*kind)).bg(theme.bg),
                ),
                _ => (" ·", Style::default().fg(theme.div_line).bg(theme.bg)),
            };
            buf.set_string(rx, ry, symbol, style);
        }
    }
    board_rect
}

fn sidebar_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Next (border + title + 4 preview rows)
            Constraint::Length(6), // Stats (border + score, level, lines, high)
            Constraint::Length(CONTROLS.len() as u16 + 3), // Controls
            Constraint::Fill(1),
        ])
        .split(area);

    // --- Next ---
    let next_block = sidebar_block(theme);
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    let next_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(next_inner);
    Paragraph::new(Line::from(Span::styled("Next", title_style)))
        .render(next_layout[0], frame.buffer_mut());
    if let Some(kind) = state.next_kind() {
        draw_piece_preview(frame, theme, next_layout[1], kind);
    }

    // --- Stats ---
    let stats_block = sidebar_block(theme);
    let stats_inner = stats_block.inner(chunks[1]);
    stats_block.render(chunks[1], frame.buffer_mut());
    let mut stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Level: ", title_style),
            Span::styled(state.level().to_string(), fg_style),
            Span::styled(
                format!("  {}ms", state.fall_interval().as_millis()),
                Style::default().fg(theme.inactive_fg),
            ),
        ]),
        Line::from(vec![
            Span::styled("Lines: ", title_style),
            Span::styled(state.lines().to_string(), fg_style),
        ]),
    ];
    if let Some(best) = state.best_score() {
        stats_lines.push(Line::from(vec![
            Span::styled("High: ", title_style),
            Span::styled(best.to_string(), fg_style),
        ]));
    }
    Paragraph::new(Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    // --- Controls ---
    let controls_block = sidebar_block(theme);
    let controls_inner = controls_block.inner(chunks[2]);
    controls_block.render(chunks[2], frame.buffer_mut());
    let key_style = Style::default().fg(theme.main_fg);
    let help_style = Style::default().fg(theme.inactive_fg);
    let mut lines = vec![Line::from(Span::styled("Controls", title_style))];
    lines.extend(CONTROLS.iter().map(|(key, help)| {
        Line::from(vec![
            Span::styled(format!("{key:<6}"), key_style),
            Span::styled(*help, help_style),
        ])
    }));
    Paragraph::new(Text::from(lines)).render(controls_inner, frame.buffer_mut());
}

/// Draw the spawn rotation of `kind`, trimmed to its bounding box and centred.
fn draw_piece_preview(frame: &mut Frame, theme: &Theme, area: Rect, kind: PieceKind) {
    let cells: Vec<(usize, usize)> = kind.mask(0).cells().collect();
    let (row_lo, col_lo) = cells
        .iter()
        .fold((usize::MAX, usize::MAX), |(ar, ac), &(r, c)| (ar.min(r), ac.min(c)));
    let (row_hi, col_hi) = cells
        .iter()
        .fold((0, 0), |(ar, ac), &(r, c)| (ar.max(r), ac.max(c)));

    let bw = (col_hi - col_lo + 1) as u16 * CELL_WIDTH;
    let bh = (row_hi - row_lo + 1) as u16 * CELL_HEIGHT;
    let off_x = area.width.saturating_sub(bw) / 2;
    let off_y = area.height.saturating_sub(bh) / 2;
    let style = Style::default().fg(theme.piece_color(kind)).bg(theme.bg);

    for (r, c) in cells {
        let x = area.x + off_x + (c - col_lo) as u16 * CELL_WIDTH;
        let y = area.y + off_y + (r - row_lo) as u16 * CELL_HEIGHT;
        if x + CELL_WIDTH <= area.x + area.width && y < area.y + area.height {
            frame.buffer_mut().set_string(x, y, "██", style);
        }
    }
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 28, 6);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " PAUSED ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " Press P to resume ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let fg = Style::default().fg(theme.main_fg);
    let mut lines: Vec<Line> = vec![
        Line::from(""),
        Line::from(Span::styled(
            " GAME OVER ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Final Score: {} ", state.score()), fg)),
    ];
    if !state.high_scores().is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            " High Scores: ",
            Style::default().fg(theme.title).bold(),
        )));
        let top = state.high_scores().as_slice().iter().take(GAME_OVER_SCORES_SHOWN);
        for (i, score) in top.enumerate() {
            lines.push(Line::from(Span::styled(format!("{}. {}", i + 1, score), fg)));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R to restart · Esc to quit ",
        Style::default().fg(theme.inactive_fg),
    )));
    lines.push(Line::from(""));

    let popup = centered_popup(area, 34, lines.len() as u16 + 2);
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Blocktui ", Style::default().fg(theme.title))),
        )
        .render(popup, frame.buffer_mut());
}
