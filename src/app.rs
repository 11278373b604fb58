//! App: terminal init, main loop, tick and key handling.

use crate::Args;
use crate::game::{GameState, Status};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::LineClearFlash;
use anyhow::Result;
use crossterm::event::{self, Event};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Frame interval when `--frame-rate` is unusable (about 60 fps).
const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);
/// Upper bound on the wait between frames, so input stays responsive.
const MAX_FRAME_INTERVAL: Duration = Duration::from_secs(1);

/// Time between frames for `rate` frames per second. Zero, negative or non-finite rates fall
/// back to the default; tiny rates are capped at one frame a second.
fn frame_interval(rate: f64) -> Duration {
    if !(rate.is_finite() && rate > 0.0) {
        return DEFAULT_FRAME_INTERVAL;
    }
    Duration::try_from_secs_f64(1.0 / rate)
        .map_or(MAX_FRAME_INTERVAL, |d| d.min(MAX_FRAME_INTERVAL))
}

pub struct App {
    state: GameState,
    theme: Theme,
    frame_interval: Duration,
    no_animation: bool,
    flash: LineClearFlash,
    /// Line count at the last frame; a rise means the latest lock cleared rows.
    seen_lines: u32,
}

impl App {
    pub fn new(args: &Args, state: GameState, theme: Theme) -> Self {
        Self {
            seen_lines: state.lines(),
            state,
            theme,
            frame_interval: frame_interval(args.frame_rate),
            no_animation: args.no_animation,
            flash: LineClearFlash::default(),
        }
    }

    /// Apply one input action. Returns false when the player quits.
    fn apply_action(&mut self, action: Action) -> bool {
        let playing = self.state.status() == Status::Playing;
        match action {
            Action::Quit => {
                if self.state.score() > 0 {
                    self.state.save_high_scores();
                }
                return false;
            }
            Action::Restart => {
                if self.state.is_game_over() {
                    self.state.save_high_scores();
                }
                self.state.reset();
                self.flash.clear();
            }
            Action::Pause => {
                if !self.state.is_game_over() {
                    self.state.toggle_pause();
                    debug!(paused = self.state.is_paused(), "pause toggled");
                }
            }
            Action::MoveLeft if playing => self.state.move_left(),
            Action::MoveRight if playing => self.state.move_right(),
            Action::SoftDrop if playing => self.state.soft_drop(),
            Action::Rotate if playing => self.state.rotate(),
            Action::HardDrop if playing => self.state.hard_drop(),
            _ => {}
        }
        true
    }

    /// Start the flash when the line count rose since the last frame.
    fn sync_line_clear(&mut self) {
        let lines = self.state.lines();
        if lines > self.seen_lines && !self.no_animation {
            self.flash.start(self.state.last_cleared());
        }
        self.seen_lines = lines;
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        terminal.hide_cursor()?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = terminal.show_cursor();
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            let now = Instant::now();
            self.sync_line_clear();
            terminal.draw(|f| crate::ui::draw(f, &self.state, &self.theme, &mut self.flash, now))?;
            if self.flash.finished() {
                self.flash.clear();
            }

            let timeout = self.frame_interval.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        let action = key_to_action(key);
                        if action != Action::None {
                            debug!(?action, "input");
                        }
                        if !self.apply_action(action) {
                            info!(score = self.state.score(), "quit");
                            return Ok(());
                        }
                    }
                }
            }

            let elapsed = last_tick.elapsed();
            last_tick = Instant::now();
            self.state.tick(elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highscores::{MemoryScoreStore, ScoreStore};
    use clap::Parser;
    use std::rc::Rc;

    /// Store handle the test keeps while the engine owns a boxed clone.
    #[derive(Debug, Clone, Default)]
    struct SharedStore(Rc<MemoryScoreStore>);

    impl ScoreStore for SharedStore {
        fn load(&self) -> Result<Vec<u32>, crate::highscores::HighScoreError> {
            self.0.load()
        }

        fn save(&self, scores: &[u32]) -> Result<(), crate::highscores::HighScoreError> {
            self.0.save(scores)
        }
    }

    fn app(store: &SharedStore) -> App {
        let args = Args::parse_from(["blocktui", "--no-animation"]);
        let state = GameState::seeded(Box::new(store.clone()), 11);
        App::new(&args, state, Theme::classic())
    }

    fn top_out(app: &mut App) {
        while !app.state.is_game_over() {
            app.apply_action(Action::HardDrop);
        }
    }

    #[test]
    fn frame_rate_is_clamped() {
        assert_eq!(frame_interval(4.0), Duration::from_millis(250));
        assert_eq!(frame_interval(1e-30), MAX_FRAME_INTERVAL);
        assert_eq!(frame_interval(0.25), MAX_FRAME_INTERVAL);
        assert_eq!(frame_interval(0.0), DEFAULT_FRAME_INTERVAL);
        assert_eq!(frame_interval(-5.0), DEFAULT_FRAME_INTERVAL);
        assert_eq!(frame_interval(f64::NAN), DEFAULT_FRAME_INTERVAL);

        let args = Args::parse_from(["blocktui", "--frame-rate", "1e-30"]);
        let state = GameState::seeded(Box::new(MemoryScoreStore::default()), 1);
        let app = App::new(&args, state, Theme::classic());
        assert_eq!(app.frame_interval, MAX_FRAME_INTERVAL);
    }

    #[test]
    fn quit_without_score_does_not_save() {
        let store = SharedStore::default();
        let mut app = app(&store);
        assert!(!app.apply_action(Action::Quit));
        assert!(store.0.snapshot().is_empty());
    }

    #[test]
    fn restart_after_game_over_saves_then_resets() {
        let store = SharedStore::default();
        let mut app = app(&store);
        top_out(&mut app);
        assert!(app.apply_action(Action::Restart));
        assert_eq!(store.0.snapshot().len(), 1);
        assert_eq!(app.state.status(), Status::Playing);
        assert_eq!(app.state.grid().filled_count(), 0);
    }

    #[test]
    fn restart_mid_game_does_not_save() {
        let store = SharedStore::default();
        let mut app = app(&store);
        app.apply_action(Action::HardDrop);
        app.apply_action(Action::Restart);
        assert!(store.0.snapshot().is_empty());
        assert_eq!(app.state.grid().filled_count(), 0);
    }

    #[test]
    fn pause_blocks_movement_and_ignored_after_game_over() {
        let store = SharedStore::default();
        let mut app = app(&store);
        app.apply_action(Action::Pause);
        assert_eq!(app.state.status(), Status::Paused);
        let before = app.state.active().copied();
        app.apply_action(Action::MoveLeft);
        app.apply_action(Action::HardDrop);
        assert_eq!(app.state.active().copied(), before);
        app.apply_action(Action::Pause);
        assert_eq!(app.state.status(), Status::Playing);

        top_out(&mut app);
        app.apply_action(Action::Pause);
        assert_eq!(app.state.status(), Status::GameOver);
    }

    #[test]
    fn movement_reaches_the_engine() {
        let store = SharedStore::default();
        let mut app = app(&store);
        let col = app.state.active().unwrap().col;
        app.apply_action(Action::MoveRight);
        assert_eq!(app.state.active().unwrap().col, col + 1);
        app.apply_action(Action::SoftDrop);
        assert_eq!(app.state.active().unwrap().row, 1);
    }
}
