// Trig Module - coarse fixed-point sine lookup
use std::f64::consts::TAU;

/// Angle units in one full turn for the wide-precision source
pub const TRIG_MAX_ANGLE: u32 = 0x10000;
/// Amplitude of the wide-precision source (represents 1.0)
pub const TRIG_MAX_RATIO: i32 = 0xFFFF;

pub const SIN_TABLE_SIZE: usize = 256;

// Quarter turn in 16-bit angle units
const QUARTER_TURN: u16 = 0x4000;

/// Wide-precision sine of `angle` (TRIG_MAX_ANGLE per turn), amplitude TRIG_MAX_RATIO
pub fn native_sin(angle: u32) -> i32 {
    let radians = (angle % TRIG_MAX_ANGLE) as f64 * TAU / TRIG_MAX_ANGLE as f64;
    (radians.sin() * TRIG_MAX_RATIO as f64).round() as i32
}

/// 256 sine samples over one turn, squeezed into i8.
///
/// Only the top 8 bits of an angle pick the sample; the fractional part is
/// dropped on purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SineTable {
    values: [i8; SIN_TABLE_SIZE],
}

impl SineTable {
    pub fn new() -> Self {
        let mut values = [0i8; SIN_TABLE_SIZE];
        for (i, value) in values.iter_mut().enumerate() {
            *value = (native_sin((i as u32) << 8) >> 9) as i8;
        }
        SineTable { values }
    }

    #[inline]
    pub fn fast_sin(&self, angle: u16) -> i8 {
        self.values[(angle >> 8) as usize]
    }

    #[inline]
    pub fn fast_cos(&self, angle: u16) -> i8 {
        self.fast_sin(angle.wrapping_add(QUARTER_TURN))
    }

    #[cfg(test)]
    pub fn values(&self) -> &[i8; SIN_TABLE_SIZE] {
        &self.values
    }
}

impl Default for SineTable {
    fn default() -> Self {
        Self::new()
    }
}
