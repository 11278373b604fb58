//! Blocktui: the classic falling-block puzzle game in the terminal.

mod app;
mod game;
mod highscores;
mod input;
mod shapes;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use game::GameState;
use highscores::{JsonScoreStore, MemoryScoreStore, ScoreStore};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();

    let store: Box<dyn ScoreStore> = if args.no_save {
        Box::new(MemoryScoreStore::default())
    } else {
        Box::new(JsonScoreStore::new(&args.scores))
    };
    let state = match args.seed {
        Some(seed) => GameState::seeded(store, seed),
        None => GameState::new(store),
    };
    info!(
        scores = %args.scores.display(),
        seed = ?args.seed,
        frame_rate = args.frame_rate,
        "starting"
    );

    let mut app = App::new(&args, state, theme);
    app.run()?;
    Ok(())
}

/// Send tracing output to `--log-file`. The terminal belongs to the UI, so without a file
/// no subscriber is installed.
fn init_logging(args: &Args) -> Result<()> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_new(&args.log_level)
        .with_context(|| format!("invalid log level {:?}", args.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;
    Ok(())
}

/// Classic falling-block puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blocktui",
    version,
    about = "Classic falling-block puzzle in the terminal. Clear full rows to score; every ten lines the pieces fall faster.",
    long_about = "Blocktui is a terminal take on the classic falling-block puzzle.\n\n\
        Seven pieces fall onto a 10x20 board. Complete a row to clear it; clearing several \
        at once scores more (100/300/500/800 times the level). The level rises every ten \
        lines and the pieces fall faster.\n\n\
        CONTROLS:\n  Left/Right  Move    Up     Rotate    Down   Soft drop\n  Space       Hard drop   P  Pause   R  Restart   Esc/Q  Quit\n\n\
        Vim keys h/j/k/l also work. High scores are kept in a JSON file (top ten)."
)]
pub struct Args {
    /// High score file (JSON array of integers).
    #[arg(long, default_value = highscores::DEFAULT_FILENAME, value_name = "FILE")]
    pub scores: PathBuf,

    /// Keep high scores in memory only; nothing is written to disk.
    #[arg(long)]
    pub no_save: bool,

    /// Seed for the piece generator (reproducible piece sequence).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses the classic colours if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable the line-clear flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Write logs to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log filter (e.g. info, debug, blocktui=trace).
    #[arg(long, default_value = "info", value_name = "FILTER")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
