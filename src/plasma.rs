// Plasma Module - animated sine-interference noise dithered straight into a 1-bit raster
use crate::bitmap::RasterSink;
use crate::dither::{DitherTable, DITHER_LEVELS};
use crate::trig::SineTable;

pub const PLASMA_SCALE: u16 = 20;
pub const PLASMA_SPEED: i32 = 13;
/// Pixels written per dither lookup
pub const PLASMA_STRIDE: usize = 2;
pub const PLASMA_MASK: u8 = (1 << PLASMA_STRIDE) - 1;

// Per-row steps of the two row phases
const ROW_STEP_0: u16 = PLASMA_SCALE * 9;
const ROW_STEP_1: u16 = PLASMA_SCALE * 33;
// Per-group steps of the two column phases
const COL_STEP_0: u16 = PLASMA_SCALE * PLASMA_STRIDE as u16 * 47;
const COL_STEP_1: u16 = PLASMA_SCALE * PLASMA_STRIDE as u16 * 26;

// Decorrelates band order from raw magnitude
const BAND_ORDER: [usize; 8] = [0, 4, 2, 6, 1, 5, 3, 7];

/// How band indices spread over the gray levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banding {
    /// Light levels only, so a black overlay stays visible
    Pale,
    /// Full range, darker
    Dark,
}

impl Banding {
    pub fn for_overlay(model_enabled: bool) -> Self {
        if model_enabled {
            Banding::Pale
        } else {
            Banding::Dark
        }
    }
}

/// Fold a sum of four sine samples (about +/-512) into a gray level in 0..=32
#[inline]
pub fn remap(sum: i32, banding: Banding) -> usize {
    let index = ((sum >> 7) + 4) as usize; // 0..7
    let band = BAND_ORDER[index];
    match banding {
        Banding::Pale => band * 2 + 18,
        Banding::Dark => band * 4 + 2,
    }
}

/// Phase accumulators that move the field between frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlasmaState {
    pub fx0: u16,
    pub fx1: u16,
    pub fy0: u16,
    pub fy1: u16,
}

impl PlasmaState {
    /// Step all four phases by one frame
    pub fn advance(&mut self) {
        self.fx0 = self.fx0.wrapping_add((PLASMA_SPEED * 77) as u16);
        self.fy0 = self.fy0.wrapping_add((PLASMA_SPEED * 93) as u16);
        self.fx1 = self.fx1.wrapping_add((PLASMA_SPEED * -12) as u16);
        self.fy1 = self.fy1.wrapping_add((PLASMA_SPEED * 17) as u16);
    }
}

pub struct Plasma {
    pub state: PlasmaState,
    banding: Banding,
}

impl Plasma {
    pub fn new(banding: Banding) -> Self {
        Plasma {
            state: PlasmaState::default(),
            banding,
        }
    }

    /// Overwrite every byte of `raster` with the current frame, then advance the phases
    pub fn render(&mut self, raster: &mut RasterSink, sines: &SineTable, dither: &DitherTable) {
        let PlasmaState { fx0, fx1, fy0, fy1 } = self.state;
        let (mut y0, mut y1) = (fy0, fy1);

        for y in 0..raster.height {
            let row_plasma = sines.fast_sin(y0) as i32 + sines.fast_sin(y1) as i32;

            let (mut x0, mut x1) = (fx0, fx1);
            for byte in raster.row_mut(y).iter_mut() {
                let mut buf = 0u8;
                for shift in (0..8).step_by(PLASMA_STRIDE) {
                    let sum = row_plasma + sines.fast_sin(x0) as i32 + sines.fast_sin(x1) as i32;
                    let level = remap(sum, self.banding);
                    buf |= dither.row(level, y) & (PLASMA_MASK << shift);

                    x0 = x0.wrapping_add(COL_STEP_0);
                    x1 = x1.wrapping_add(COL_STEP_1);
                }
                *byte = buf;
            }

            y0 = y0.wrapping_add(ROW_STEP_0);
            y1 = y1.wrapping_add(ROW_STEP_1);
        }

        self.state.advance();
    }
}

// Keeps the level table and the banding math in agreement
const _: () = assert!(7 * 2 + 18 < DITHER_LEVELS && 7 * 4 + 2 < DITHER_LEVELS);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{fnv1a, Bitmap};
    use crate::types::{SCREEN_TOTAL_HEIGHT, SCREEN_TOTAL_WIDTH};

    fn screen() -> Bitmap {
        Bitmap::new(SCREEN_TOTAL_WIDTH, SCREEN_TOTAL_HEIGHT)
    }

    #[test]
    fn test_remap_stays_in_range() {
        for banding in [Banding::Pale, Banding::Dark] {
            for sum in -4 * 128..=4 * 127 {
                let level = remap(sum, banding);
                assert!(level < DITHER_LEVELS, "sum {} -> {}", sum, level);
            }
        }
    }

    #[test]
    fn test_remap_bands() {
        assert_eq!(remap(-512, Banding::Pale), 18);
        assert_eq!(remap(0, Banding::Pale), 20);
        assert_eq!(remap(-1, Banding::Pale), 30);
        assert_eq!(remap(508, Banding::Pale), 32);
        assert_eq!(remap(-512, Banding::Dark), 2);
        assert_eq!(remap(508, Banding::Dark), 30);
    }

    #[test]
    fn test_banding_follows_overlay() {
        assert_eq!(Banding::for_overlay(true), Banding::Pale);
        assert_eq!(Banding::for_overlay(false), Banding::Dark);
    }

    #[test]
    fn test_state_advance_wraps() {
        let mut state = PlasmaState::default();
        state.advance();
        assert_eq!(
            state,
            PlasmaState { fx0: 1001, fx1: 65380, fy0: 1209, fy1: 221 }
        );
        // fx1 keeps counting down through zero
        state.advance();
        assert_eq!(state.fx1, 0u16.wrapping_sub(312));
        assert_eq!(state.fx0, 2002);
    }

    #[test]
    fn test_render_advances_exactly_once() {
        let (sines, dither) = (SineTable::new(), DitherTable::new());
        let mut plasma = Plasma::new(Banding::Pale);
        let mut bmp = screen();
        plasma.render(&mut bmp.raster(), &sines, &dither);
        let mut expected = PlasmaState::default();
        expected.advance();
        assert_eq!(plasma.state, expected);
    }

    #[test]
    fn test_render_is_deterministic() {
        let (sines, dither) = (SineTable::new(), DitherTable::new());
        let run = || {
            let mut plasma = Plasma::new(Banding::Pale);
            let mut bmp = screen();
            for _ in 0..5 {
                plasma.render(&mut bmp.raster(), &sines, &dither);
            }
            bmp
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_render_overwrites_previous_contents() {
        let (sines, dither) = (SineTable::new(), DitherTable::new());
        let mut clean = screen();
        let mut dirty = screen();
        dirty.fill(crate::bitmap::Ink::White);
        Plasma::new(Banding::Dark).render(&mut clean.raster(), &sines, &dither);
        Plasma::new(Banding::Dark).render(&mut dirty.raster(), &sines, &dither);
        assert_eq!(clean, dirty);
    }

    #[test]
    fn test_frames_differ_as_phases_move() {
        let (sines, dither) = (SineTable::new(), DitherTable::new());
        let mut plasma = Plasma::new(Banding::Pale);
        let mut bmp = screen();
        plasma.render(&mut bmp.raster(), &sines, &dither);
        let first = bmp.checksum();
        plasma.render(&mut bmp.raster(), &sines, &dither);
        assert_ne!(first, bmp.checksum());
    }

    #[test]
    fn test_first_frame_regression() {
        let (sines, dither) = (SineTable::new(), DitherTable::new());
        let mut plasma = Plasma::new(Banding::Pale);
        let mut bmp = screen();
        plasma.render(&mut bmp.raster(), &sines, &dither);

        let bytes = bmp.bytes();
        assert!(bytes.iter().any(|&b| b != 0));
        assert_eq!(&bytes[..8], &FIRST_FRAME_HEAD);
        assert_eq!(&bytes[18..26], &FIRST_FRAME_ROW1);
        assert_eq!(fnv1a(bytes), FIRST_FRAME_FNV);
    }

    #[test]
    fn test_first_frame_dark_regression() {
        let (sines, dither) = (SineTable::new(), DitherTable::new());
        let mut plasma = Plasma::new(Banding::Dark);
        let mut bmp = screen();
        plasma.render(&mut bmp.raster(), &sines, &dither);
        assert_eq!(fnv1a(bmp.bytes()), FIRST_FRAME_DARK_FNV);
    }

    // Pinned from the first frame of a 144x168 screen, all phases zero
    const FIRST_FRAME_HEAD: [u8; 8] = [0x77, 0xFF, 0xFF, 0xFF, 0x7F, 0xF7, 0xFF, 0xFF];
    const FIRST_FRAME_ROW1: [u8; 8] = [0xAA, 0xBB, 0xBB, 0xBB, 0xAB, 0xEA, 0xFF, 0xFF];
    const FIRST_FRAME_FNV: u64 = 0x3bed_5e1d_4e5c_3f11;
    const FIRST_FRAME_DARK_FNV: u64 = 0x78e7_57cc_a5fa_d537;
}
