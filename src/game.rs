//! Game state: grid, active piece, collision, line clear, scoring, gravity.

use crate::highscores::{HighScores, ScoreStore};
use crate::shapes::{Mask, PieceKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 20;

/// Gravity interval at level 1.
pub const BASE_FALL_INTERVAL: Duration = Duration::from_millis(500);
/// Gravity never gets faster than this.
pub const MIN_FALL_INTERVAL: Duration = Duration::from_millis(50);
/// Interval reduction per level.
pub const FALL_INTERVAL_STEP: Duration = Duration::from_millis(50);

pub const LINES_PER_LEVEL: u32 = 10;

/// Points per lock by number of rows cleared, before the level multiplier.
const LINE_SCORES: [u32; 5] = [0, 100, 300, 500, 800];

/// Gravity interval for `level` (1-based).
pub fn fall_interval_for_level(level: u32) -> Duration {
    BASE_FALL_INTERVAL
        .saturating_sub(FALL_INTERVAL_STEP * level.saturating_sub(1))
        .max(MIN_FALL_INTERVAL)
}

/// Points for clearing `lines` rows at once at `level`.
pub fn line_clear_score(lines: usize, level: u32) -> u32 {
    LINE_SCORES.get(lines).copied().unwrap_or(0) * level
}

/// Single cell: empty or filled with the colour of the piece that locked there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Filled(PieceKind),
}

impl Cell {
    #[inline]
    pub fn is_filled(self) -> bool {
        matches!(self, Self::Filled(_))
    }
}

type Row = [Cell; BOARD_WIDTH];

const EMPTY_ROW: Row = [Cell::Empty; BOARD_WIDTH];

/// Playfield: 20 rows of 10 cells. Row 0 is the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: VecDeque<Row>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        Self {
            rows: (0..BOARD_HEIGHT).map(|_| EMPTY_ROW).collect(),
        }
    }

    /// Cell at `(row, col)`, or `None` outside the board.
    #[inline]
    pub fn get(&self, row: i32, col: i32) -> Option<Cell> {
        if row < 0 || col < 0 {
            return None;
        }
        self.rows
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .copied()
    }

    #[inline]
    pub fn is_filled(&self, row: i32, col: i32) -> bool {
        self.get(row, col).is_some_and(Cell::is_filled)
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if let Some(r) = self.rows.get_mut(row) {
            if col < BOARD_WIDTH {
                r[col] = cell;
            }
        }
    }

    /// Rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn row_is_full(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .is_some_and(|r| r.iter().all(|c| c.is_filled()))
    }

    /// Remove every full row at once and pad the top with empty rows.
    /// Returns the indices of the removed rows, top to bottom.
    pub fn clear_full_rows(&mut self) -> Vec<usize> {
        let full: Vec<usize> = (0..BOARD_HEIGHT).filter(|&r| self.row_is_full(r)).collect();
        if full.is_empty() {
            return full;
        }
        let mut index = 0;
        self.rows.retain(|r| {
            let keep = !full.contains(&index);
            index += 1;
            keep
        });
        for _ in 0..full.len() {
            self.rows.push_front(EMPTY_ROW);
        }
        full
    }

    #[cfg(test)]
    pub fn filled_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.iter())
            .filter(|c| c.is_filled())
            .count()
    }

    #[cfg(test)]
    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// The falling piece. `row`/`col` locate the top-left corner of its 5×5 mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePiece {
    pub kind: PieceKind,
    pub row: i32,
    pub col: i32,
    pub rotation: usize,
}

impl ActivePiece {
    /// Spawn position: mask origin on row 0, horizontally centred.
    pub fn spawn(kind: PieceKind) -> Self {
        Self {
            kind,
            row: 0,
            col: (BOARD_WIDTH / 2) as i32 - 2,
            rotation: 0,
        }
    }

    pub fn mask(&self) -> Mask {
        self.kind.mask(self.rotation)
    }

    /// Board coordinates `(row, col)` of the occupied cells. Rows may be negative.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> {
        let (row, col) = (self.row, self.col);
        self.mask()
            .cells()
            .map(move |(r, c)| (row + r as i32, col + c as i32))
    }

    fn shifted(self, dx: i32, dy: i32) -> Self {
        Self {
            row: self.row + dy,
            col: self.col + dx,
            ..self
        }
    }

    fn with_rotation(self, rotation: usize) -> Self {
        Self { rotation, ..self }
    }
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Playing,
    Paused,
    GameOver,
}

/// Game state: grid, active and next piece, score, level, timing and high scores.
#[derive(Debug)]
pub struct GameState<R = StdRng> {
    grid: Grid,
    active: Option<ActivePiece>,
    next: Option<PieceKind>,
    score: u32,
    level: u32,
    lines: u32,
    fall_interval: Duration,
    /// Time since the last gravity step.
    fall_timer: Duration,
    game_over: bool,
    paused: bool,
    /// Rows removed by the most recent lock (for the clear flash).
    last_cleared: Vec<usize>,
    high_scores: HighScores,
    store: Box<dyn ScoreStore>,
    rng: R,
}

impl GameState<StdRng> {
    /// New game with an entropy-seeded piece generator.
    pub fn new(store: Box<dyn ScoreStore>) -> Self {
        Self::with_rng(store, StdRng::from_entropy())
    }

    /// New game with a reproducible piece sequence.
    pub fn seeded(store: Box<dyn ScoreStore>, seed: u64) -> Self {
        Self::with_rng(store, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> GameState<R> {
    pub fn with_rng(store: Box<dyn ScoreStore>, rng: R) -> Self {
        let high_scores = match store.load() {
            Ok(scores) => HighScores::from_unsorted(scores),
            Err(e) if e.is_not_found() => {
                debug!("no high score file yet");
                HighScores::default()
            }
            Err(e) => {
                warn!(error = %e, "could not load high scores; starting with an empty list");
                HighScores::default()
            }
        };
        let mut state = Self {
            grid: Grid::new(),
            active: None,
            next: None,
            score: 0,
            level: 1,
            lines: 0,
            fall_interval: BASE_FALL_INTERVAL,
            fall_timer: Duration::ZERO,
            game_over: false,
            paused: false,
            last_cleared: Vec::new(),
            high_scores,
            store,
            rng,
        };
        state.spawn();
        state.generate_next();
        state
    }

    /// Start over. High scores stay as they are in memory.
    pub fn reset(&mut self) {
        self.grid = Grid::new();
        self.active = None;
        self.next = None;
        self.score = 0;
        self.level = 1;
        self.lines = 0;
        self.fall_interval = BASE_FALL_INTERVAL;
        self.fall_timer = Duration::ZERO;
        self.game_over = false;
        self.paused = false;
        self.last_cleared.clear();
        self.spawn();
        self.generate_next();
        info!("game reset");
    }

    fn random_kind(&mut self) -> PieceKind {
        PieceKind::ALL[self.rng.gen_range(0..PieceKind::ALL.len())]
    }

    /// Promote the next piece (or a random one if none is pending) to the active piece.
    /// Ends the game if it overlaps the stack.
    pub fn spawn(&mut self) {
        let kind = match self.next {
            Some(kind) => kind,
            None => self.random_kind(),
        };
        self.active = Some(ActivePiece::spawn(kind));
        debug!(kind = kind.name(), "spawned piece");
        if self.check_collision(0, 0, None) {
            self.game_over = true;
            info!(score = self.score, lines = self.lines, "game over");
        }
    }

    /// Draw a fresh pending piece, uniformly from all kinds.
    pub fn generate_next(&mut self) {
        self.next = Some(self.random_kind());
    }

    fn collides(&self, piece: &ActivePiece) -> bool {
        piece.cells().any(|(row, col)| {
            col < 0
                || col >= BOARD_WIDTH as i32
                || row >= BOARD_HEIGHT as i32
                || (row >= 0 && self.grid.is_filled(row, col))
        })
    }

    /// Whether the active piece would collide after moving by `(dx, dy)`
    /// and optionally switching to `rotation`.
    pub fn check_collision(&self, dx: i32, dy: i32, rotation: Option<usize>) -> bool {
        let Some(piece) = self.active else {
            return false;
        };
        let candidate = piece
            .shifted(dx, dy)
            .with_rotation(rotation.unwrap_or(piece.rotation));
        self.collides(&candidate)
    }

    /// Move the active piece. A blocked downward move locks it.
    pub fn move_piece(&mut self, dx: i32, dy: i32) {
        if self.game_over || self.paused {
            return;
        }
        if !self.check_collision(dx, dy, None) {
            if let Some(ref mut piece) = self.active {
                piece.col += dx;
                piece.row += dy;
            }
        } else if dy > 0 {
            self.place_piece();
        }
    }

    pub fn move_left(&mut self) {
        self.move_piece(-1, 0);
    }

    pub fn move_right(&mut self) {
        self.move_piece(1, 0);
    }

    pub fn soft_drop(&mut self) {
        self.move_piece(0, 1);
    }

    /// Rotate clockwise in place. No kicks: a colliding rotation is rejected.
    pub fn rotate(&mut self) {
        if self.game_over || self.paused {
            return;
        }
        let Some(piece) = self.active else {
            return;
        };
        let rotation = (piece.rotation + 1) % piece.kind.rotation_count();
        if !self.check_collision(0, 0, Some(rotation)) {
            self.active = Some(piece.with_rotation(rotation));
        }
    }

    /// Drop straight down as far as possible and lock.
    pub fn hard_drop(&mut self) {
        if self.game_over || self.paused || self.active.is_none() {
            return;
        }
        while !self.check_collision(0, 1, None) {
            if let Some(ref mut piece) = self.active {
                piece.row += 1;
            }
        }
        self.place_piece();
    }

    /// Lock the active piece into the grid, clear lines, bring in the next piece.
    fn place_piece(&mut self) {
        let Some(piece) = self.active.take() else {
            return;
        };
        for (row, col) in piece.cells() {
            if row >= 0 {
                self.grid.set(row as usize, col as usize, Cell::Filled(piece.kind));
            }
        }
        debug!(kind = piece.kind.name(), row = piece.row, col = piece.col, "locked piece");
        self.clear_lines();
        self.spawn();
        self.generate_next();
    }

    /// Remove full rows, then update score, line count, level and gravity.
    fn clear_lines(&mut self) -> usize {
        self.last_cleared = self.grid.clear_full_rows();
        let cleared = self.last_cleared.len();
        if cleared == 0 {
            return 0;
        }
        self.lines += cleared as u32;
        let points = line_clear_score(cleared, self.level);
        self.score += points;
        info!(cleared, points, score = self.score, total = self.lines, "cleared lines");

        let level = self.lines / LINES_PER_LEVEL + 1;
        if level > self.level {
            self.level = level;
            self.fall_interval = fall_interval_for_level(level);
            info!(level, interval_ms = self.fall_interval.as_millis() as u64, "level up");
        }
        cleared
    }

    /// Advance gravity by `elapsed`. Leftover time past the interval is dropped.
    pub fn tick(&mut self, elapsed: Duration) {
        if self.game_over || self.paused {
            return;
        }
        self.fall_timer += elapsed;
        if self.fall_timer >= self.fall_interval {
            self.move_piece(0, 1);
            self.fall_timer = Duration::ZERO;
        }
    }

    /// Toggle pause; ignored once the game is over. Returns the new paused flag.
    pub fn toggle_pause(&mut self) -> bool {
        if !self.game_over {
            self.paused = !self.paused;
        }
        self.paused
    }

    /// Record the current score and try to persist the list. Failures are logged and dropped.
    pub fn save_high_scores(&mut self) {
        self.high_scores.record(self.score);
        if let Err(e) = self.store.save(self.high_scores.as_slice()) {
            warn!(error = %e, "could not save high scores");
        } else {
            info!(score = self.score, best = self.high_scores.best(), "high scores saved");
        }
    }

    pub fn status(&self) -> Status {
        if self.game_over {
            Status::GameOver
        } else if self.paused {
            Status::Paused
        } else {
            Status::Playing
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn active(&self) -> Option<&ActivePiece> {
        self.active.as_ref()
    }

    pub fn next_kind(&self) -> Option<PieceKind> {
        self.next
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn fall_interval(&self) -> Duration {
        self.fall_interval
    }

    pub fn last_cleared(&self) -> &[usize] {
        &self.last_cleared
    }

    pub fn high_scores(&self) -> &HighScores {
        &self.high_scores
    }

    pub fn best_score(&self) -> Option<u32> {
        self.high_scores.best()
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}
