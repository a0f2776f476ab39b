//! Stored tile ids and their flip flags.

/// Horizontal flip flag.
pub const FLIP_H: u32 = 0x8000_0000; // bit 31
/// Vertical flip flag.
pub const FLIP_V: u32 = 0x4000_0000; // bit 30
/// Diagonal (anti-diagonal transpose) flag.
pub const FLIP_D: u32 = 0x2000_0000; // bit 29
/// All flag bits.
pub const FLIP_MASK: u32 = FLIP_H | FLIP_V | FLIP_D;
/// Keeps the lower 29 bits: the global tile id.
pub const GID_MASK: u32 = !FLIP_MASK;

/// A stored tile id: a global tile id with the flip flags packed in the top bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

impl TileId {
    /// The id as stored, flags included.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Global tile id with the flags masked off.
    pub fn clean(self) -> u32 {
        self.0 & GID_MASK
    }

    /// Flipped horizontally.
    pub fn flip_h(self) -> bool {
        self.0 & FLIP_H != 0
    }

    /// Flipped vertically.
    pub fn flip_v(self) -> bool {
        self.0 & FLIP_V != 0
    }

    /// Flipped along the anti-diagonal.
    pub fn flip_d(self) -> bool {
        self.0 & FLIP_D != 0
    }

    /// Global id 0: no tile.
    pub fn is_empty(self) -> bool {
        self.clean() == 0
    }
}

impl From<u32> for TileId {
    fn from(raw: u32) -> Self {
        TileId(raw)
    }
}

/// Parse a stored id the way Tiled writes it: possibly larger than `i32::MAX`,
/// truncated to the low 32 bits.
pub fn parse_raw_gid(text: &str) -> Option<u32> {
    text.trim().parse::<i64>().ok().map(|v| v as u32)
}
