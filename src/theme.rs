//! Colour themes: classic piece colours, optional btop-style theme file, palette overrides.

use crate::shapes::PieceKind;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Piece colours plus the handful of UI colours the renderer needs.
#[derive(Debug, Clone)]
pub struct Theme {
    /// One colour per piece kind, indexed by `PieceKind::index()`.
    pub pieces: [Color; 7],
    /// Board background.
    pub bg: Color,
    /// Borders and empty-cell dots.
    pub div_line: Color,
    pub main_fg: Color,
    /// Panel titles and labels.
    pub title: Color,
    /// Controls legend.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("reading theme file: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a hex colour: {0:?}")]
    InvalidHex(String),
}

/// Theme keys that override each piece colour, in `PieceKind::ALL` order.
const PIECE_KEYS: [&str; 7] = [
    "hi_fg", "title", "net_box", "mem_box", "cpu_end", "cpu_box", "temp_mid",
];

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

impl Theme {
    /// Canonical piece colours on a black board.
    pub fn classic() -> Self {
        Self {
            pieces: PieceKind::ALL.map(PieceKind::color),
            bg: Color::Rgb(0, 0, 0),
            div_line: Color::Rgb(128, 128, 128),
            main_fg: Color::Rgb(255, 255, 255),
            title: Color::Rgb(255, 255, 255),
            inactive_fg: Color::Rgb(128, 128, 128),
        }
    }

    /// Read a theme file and apply `palette` on top. No path, or a path that does not exist,
    /// gives the classic colours.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path.filter(|p| p.exists()) {
            Some(p) => Self::from_map(&parse_theme_file(&std::fs::read_to_string(p)?)),
            None => Self::classic(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override piece colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.pieces = [
                    Color::Rgb(0x00, 0xFF, 0xFF), // I
                    Color::Rgb(0xFF, 0xFF, 0x00), // O
                    Color::Rgb(0xFF, 0x00, 0xFF), // T
                    Color::Rgb(0x00, 0xFF, 0x00), // S
                    Color::Rgb(0xFF, 0x00, 0x00), // Z
                    Color::Rgb(0x00, 0x88, 0xFF), // J
                    Color::Rgb(0xFF, 0x88, 0x00), // L
                ];
            }
            crate::Palette::Colorblind => {
                // Paul Tol "vibrant" set plus grey; no red/green pair.
                self.pieces = [
                    Color::Rgb(0x33, 0xBB, 0xEE), // I cyan
                    Color::Rgb(0xBB, 0xBB, 0x00), // O yellow
                    Color::Rgb(0xEE, 0x33, 0x77), // T magenta
                    Color::Rgb(0x00, 0x99, 0x88), // S teal
                    Color::Rgb(0xCC, 0x33, 0x11), // Z red
                    Color::Rgb(0x00, 0x77, 0xBB), // J blue
                    Color::Rgb(0xEE, 0x77, 0x33), // L orange
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let classic = Self::classic();
        let mut pieces = classic.pieces;
        for (slot, key) in pieces.iter_mut().zip(PIECE_KEYS) {
            if let Some(c) = get(key) {
                *slot = c;
            }
        }
        Self {
            pieces,
            bg: get("main_bg").or_else(|| get("meter_bg")).unwrap_or(classic.bg),
            div_line: get("div_line").unwrap_or(classic.div_line),
            main_fg: get("main_fg").unwrap_or(classic.main_fg),
            title: get("title").unwrap_or(classic.title),
            inactive_fg: get("inactive_fg").unwrap_or(classic.inactive_fg),
        }
    }

    #[inline]
    pub fn piece_color(&self, kind: PieceKind) -> Color {
        self.pieces[kind.index()]
    }
}

/// Collect `theme[key]=value` entries. Quotes around the value are optional; blank values and
/// any other line are skipped.
fn parse_theme_file(src: &str) -> HashMap<String, String> {
    src.lines()
        .filter_map(|line| {
            let (key, value) = line.trim().strip_prefix("theme[")?.split_once(']')?;
            let value = value.trim().strip_prefix('=')?.trim();
            let value = value.trim_matches(|c| c == '"' || c == '\'');
            (!value.is_empty()).then(|| (key.trim().to_owned(), value.to_owned()))
        })
        .collect()
}

fn hex_digits(s: &str, range: std::ops::Range<usize>) -> Result<u8, ThemeError> {
    s.get(range)
        .and_then(|d| u8::from_str_radix(d, 16).ok())
        .ok_or_else(|| ThemeError::InvalidHex(s.to_string()))
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let (r, g, b) = match s.len() {
        6 => (hex_digits(s, 0..2)?, hex_digits(s, 2..4)?, hex_digits(s, 4..6)?),
        3 => (
            hex_digits(s, 0..1)? * 17,
            hex_digits(s, 1..2)? * 17,
            hex_digits(s, 2..3)? * 17,
        ),
        _ => return Err(ThemeError::InvalidHex(s.to_string())),
    };
    Ok(Color::Rgb(r, g, b))
}
