// Dither Module - ordered dithering patterns for a 1-bit display
//
// 33 gray levels, each an 8 wide x 4 high tile stored one byte per row.
// To render gray value g at (x, y):
//   framebuffer |= dither.row(g, y) & (0x1 << (x % 8))
// Several pixels can be rendered at once with a wider mask:
//   framebuffer |= dither.row(g, y) & (0xF << (x % 8))

pub const DITHER_LEVELS: usize = 33;
pub const DITHER_ROWS: usize = 4;

/// Extract the bit at `position` in `byte`
#[inline]
fn bit(byte: u8, position: u8) -> u8 {
    (byte >> position) & 1
}

/// Pixel coordinate inside the 8x4 tile that level `i + 1` switches on.
///
/// Every other bit of `i` goes to x and the rest to y, least significant
/// bits landing in the most significant coordinate bits, so consecutive
/// levels are spread as far apart as possible.
fn level_position(i: u8) -> (u8, u8) {
    let x = bit(i, 0) << 2 | bit(i, 2) << 1 | bit(i, 4);
    let y = bit(i, 1) << 1 | bit(i, 3);
    // a pair of bits should spell out an X, not a Z
    (x ^ y, y)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitherTable {
    patterns: [[u8; DITHER_ROWS]; DITHER_LEVELS],
}

impl DitherTable {
    pub fn new() -> Self {
        let mut patterns = [[0u8; DITHER_ROWS]; DITHER_LEVELS];
        for level in 1..DITHER_LEVELS {
            patterns[level] = patterns[level - 1];
            let (x, y) = level_position((level - 1) as u8);
            patterns[level][y as usize] |= 1 << x;
        }
        DitherTable { patterns }
    }

    /// All four rows of a gray level
    #[inline]
    pub fn pattern(&self, level: usize) -> [u8; DITHER_ROWS] {
        self.patterns[level]
    }

    /// One row of a gray level; `y` wraps around the tile height
    #[inline]
    pub fn row(&self, level: usize, y: usize) -> u8 {
        self.pattern(level)[y % DITHER_ROWS]
    }
}

impl Default for DitherTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_set(pattern: [u8; DITHER_ROWS]) -> u32 {
        pattern.iter().map(|row| row.count_ones()).sum()
    }

    #[test]
    fn test_level_zero_is_blank() {
        let table = DitherTable::new();
        assert_eq!(table.pattern(0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_levels_accumulate_one_bit_at_a_time() {
        let table = DitherTable::new();
        for level in 1..DITHER_LEVELS {
            let prev = table.pattern(level - 1);
            let cur = table.pattern(level);
            assert_eq!(bits_set(cur), level as u32, "level {}", level);
            for y in 0..DITHER_ROWS {
                assert_eq!(cur[y] & prev[y], prev[y], "level {} dropped a bit", level);
            }
        }
    }

    #[test]
    fn test_last_level_covers_whole_tile() {
        let table = DitherTable::new();
        assert_eq!(table.pattern(DITHER_LEVELS - 1), [0xFF; DITHER_ROWS]);

        let mut seen = [[false; 8]; DITHER_ROWS];
        for i in 0..32u8 {
            let (x, y) = level_position(i);
            assert!(!seen[y as usize][x as usize], "position ({}, {}) reused", x, y);
            seen[y as usize][x as usize] = true;
        }
    }

    #[test]
    fn test_first_levels_spread_out() {
        let table = DitherTable::new();
        // i = 0 -> (0, 0); i = 1 -> (4, 0); i = 2 -> (2, 2); i = 3 -> (6, 2)
        assert_eq!(table.pattern(1), [0b0000_0001, 0, 0, 0]);
        assert_eq!(table.pattern(2), [0b0001_0001, 0, 0, 0]);
        assert_eq!(table.pattern(3), [0b0001_0001, 0, 0b0000_0100, 0]);
        assert_eq!(table.pattern(4), [0b0001_0001, 0, 0b0100_0100, 0]);
        assert_eq!(table.pattern(5), [0b0001_0101, 0, 0b0100_0100, 0]);
    }

    #[test]
    fn test_row_wraps() {
        let table = DitherTable::new();
        for level in 0..DITHER_LEVELS {
            for y in 0..DITHER_ROWS {
                assert_eq!(table.row(level, y), table.row(level, y + DITHER_ROWS));
            }
        }
    }
}
