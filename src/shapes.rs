//! Tetromino kinds and their rotation masks.
//!
//! Every rotation state is a 5×5 occupancy mask. Masks are parsed from row strings at compile
//! time, so a lookup by `(kind, rotation)` is a plain table index.

use ratatui::style::Color;

/// Side length of a rotation mask.
pub const MASK_SIZE: usize = 5;

/// 5×5 occupancy mask. Bit `c` of row `r` is set when that cell is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mask([u8; MASK_SIZE]);

impl Mask {
    /// Parse rows of `.`/`#` into a mask. Anything other than `#` counts as empty.
    const fn parse(rows: [&str; MASK_SIZE]) -> Self {
        let mut bits = [0u8; MASK_SIZE];
        let mut r = 0;
        while r < MASK_SIZE {
            let bytes = rows[r].as_bytes();
            let mut c = 0;
            while c < MASK_SIZE && c < bytes.len() {
                if bytes[c] == b'#' {
                    bits[r] |= 1 << c;
                }
                c += 1;
            }
            r += 1;
        }
        Self(bits)
    }

    #[inline]
    pub fn is_filled(&self, row: usize, col: usize) -> bool {
        row < MASK_SIZE && col < MASK_SIZE && self.0[row] & (1 << col) != 0
    }

    /// Occupied `(row, col)` offsets in row-major order.
    pub fn cells(self) -> impl Iterator<Item = (usize, usize)> {
        (0..MASK_SIZE).flat_map(move |r| {
            (0..MASK_SIZE)
                .filter(move |&c| self.is_filled(r, c))
                .map(move |c| (r, c))
        })
    }
}

static I_MASKS: [Mask; 2] = [
    Mask::parse([".....", "..#..", "..#..", "..#..", "..#.."]),
    Mask::parse([".....", ".....", "####.", ".....", "....."]),
];

static O_MASKS: [Mask; 1] = [Mask::parse([".....", ".....", ".##..", ".##..", "....."])];

static T_MASKS: [Mask; 4] = [
    Mask::parse([".....", ".....", ".#...", "###..", "....."]),
    Mask::parse([".....", ".....", ".#...", ".##..", ".#..."]),
    Mask::parse([".....", ".....", ".....", "###..", ".#..."]),
    Mask::parse([".....", ".....", ".#...", "##...", ".#..."]),
];

static S_MASKS: [Mask; 2] = [
    Mask::parse([".....", ".....", ".##..", "##...", "....."]),
    Mask::parse([".....", ".#...", ".##..", "..#..", "....."]),
];

static Z_MASKS: [Mask; 2] = [
    Mask::parse([".....", ".....", "##...", ".##..", "....."]),
    Mask::parse([".....", "..#..", ".##..", ".#...", "....."]),
];

static J_MASKS: [Mask; 4] = [
    Mask::parse([".....", ".#...", ".#...", "##...", "....."]),
    Mask::parse([".....", ".....", "#....", "###..", "....."]),
    Mask::parse([".....", ".##..", ".#...", ".#...", "....."]),
    Mask::parse([".....", ".....", "###..", "..#..", "....."]),
];

static L_MASKS: [Mask; 4] = [
    Mask::parse([".....", "..#..", "..#..", ".##..", "....."]),
    Mask::parse([".....", ".....", "###..", "#....", "....."]),
    Mask::parse([".....", "##...", ".#...", ".#...", "....."]),
    Mask::parse([".....", ".....", "..#..", "###..", "....."]),
];

/// Tetromino kinds (I, O, T, S, Z, J, L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::S, Self::Z, Self::J, Self::L];

    /// All rotation states in clockwise order.
    pub fn masks(self) -> &'static [Mask] {
        match self {
            Self::I => &I_MASKS,
            Self::O => &O_MASKS,
            Self::T => &T_MASKS,
            Self::S => &S_MASKS,
            Self::Z => &Z_MASKS,
            Self::J => &J_MASKS,
            Self::L => &L_MASKS,
        }
    }

    #[inline]
    pub fn rotation_count(self) -> usize {
        self.masks().len()
    }

    /// Mask for `rotation`, wrapped into range.
    #[inline]
    pub fn mask(self, rotation: usize) -> Mask {
        let masks = self.masks();
        masks[rotation % masks.len()]
    }

    /// Canonical display colour.
    pub fn color(self) -> Color {
        match self {
            Self::I => Color::Rgb(0, 255, 255),
            Self::O => Color::Rgb(255, 255, 0),
            Self::T => Color::Rgb(128, 0, 128),
            Self::S => Color::Rgb(0, 255, 0),
            Self::Z => Color::Rgb(255, 0, 0),
            Self::J => Color::Rgb(0, 0, 255),
            Self::L => Color::Rgb(255, 165, 0),
        }
    }

    /// Index into `ALL`; used for palette lookups.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I => "I",
            Self::O => "O",
            Self::T => "T",
            Self::S => "S",
            Self::Z => "Z",
            Self::J => "J",
            Self::L => "L",
        }
    }
}
