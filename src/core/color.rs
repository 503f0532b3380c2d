//! Color definitions for frame rendering
//!
//! A frame paints with a color matrix: one row per selection state plus a
//! base row, each row holding `[background, default foreground, extra
//! foreground colors...]`. Per-rune color tags index into the active row.

/// A solid RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
}

/// Row index of the parenthesis-match highlight, when the matrix has one
pub const PMATCH_ROW: usize = 4;

/// Color tag of plainly rendered text
pub const TAG_PLAIN: u16 = 1;

/// Color tag used to mark fuzzy-match positions in search results
pub const TAG_COMMENT: u16 = 3;

/// The selection color matrix. Row 0 renders unselected text, row `k+1`
/// renders text inside selection color `k`, row [`PMATCH_ROW`] (if present)
/// renders the parenthesis-match highlight.
pub type ColorMatrix = Vec<Vec<Color>>;

/// A plain two-row matrix: white-on-dark text with an inverted selection.
/// Enough rows for a tick and one selection color, no pmatch row.
pub fn simple_matrix() -> ColorMatrix {
    vec![
        vec![Color::rgb(0x18, 0x18, 0x18), Color::rgb(0xd8, 0xd8, 0xd8)],
        vec![Color::rgb(0xd8, 0xd8, 0xd8), Color::rgb(0x18, 0x18, 0x18)],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_matrix_shape() {
        let m = simple_matrix();
        assert!(m.len() >= 2);
        for row in &m {
            assert!(row.len() >= 2);
        }
    }
}
