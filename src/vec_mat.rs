// Vector/Matrix Module - fixed-point 3x3 rotations and screen projection
//
// Matrices carry FIX_SHIFT fractional bits. Multiplying two of them doubles
// the scale, so every product is followed by mshift(.., FIX_SHIFT) before
// it is used again. Callers pick model_scale so that
// |m| * |v| * model_scale stays inside i32 for the model's vertex extents.
use crate::trig::SineTable;
use crate::types::{Point, SCREEN_CENTER_X, SCREEN_CENTER_Y};

pub const FIX_SHIFT: u32 = 8;
pub const FIX_ONE: i32 = 1 << FIX_SHIFT;
/// Fractional bits of the model scale factor
pub const MODEL_SHIFT: u32 = 8;

pub type Mat3 = [[i32; 3]; 3];
pub type Vec3 = [i32; 3];

/// Identity at FIX_SHIFT scale
pub const fn munit() -> Mat3 {
    [[FIX_ONE, 0, 0], [0, FIX_ONE, 0], [0, 0, FIX_ONE]]
}

// The sine table is i8 (one = 128), lift it to FIX_SHIFT
#[inline]
fn fix_sin(sines: &SineTable, angle: u16) -> i32 {
    (sines.fast_sin(angle) as i32) << (FIX_SHIFT - 7)
}

#[inline]
fn fix_cos(sines: &SineTable, angle: u16) -> i32 {
    (sines.fast_cos(angle) as i32) << (FIX_SHIFT - 7)
}

pub fn mmul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0i32; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// Rotation about z by `angle` applied after `base`
pub fn mrotz(base: &Mat3, angle: u16, sines: &SineTable) -> Mat3 {
    let (s, c) = (fix_sin(sines, angle), fix_cos(sines, angle));
    let rot = [[c, -s, 0], [s, c, 0], [0, 0, FIX_ONE]];
    mmul(&rot, base)
}

/// Rotation about x by `angle` applied after `base`
pub fn mrotx(base: &Mat3, angle: u16, sines: &SineTable) -> Mat3 {
    let (s, c) = (fix_sin(sines, angle), fix_cos(sines, angle));
    let rot = [[FIX_ONE, 0, 0], [0, c, -s], [0, s, c]];
    mmul(&rot, base)
}

/// Arithmetic right shift of every entry
pub fn mshift(m: &Mat3, shift: u32) -> Mat3 {
    m.map(|row| row.map(|v| v >> shift))
}

/// m * v, still at the matrix scale
pub fn transform(m: &Mat3, v: &Vec3) -> Vec3 {
    [0, 1, 2].map(|i| m[i][0] * v[0] + m[i][1] * v[1] + m[i][2] * v[2])
}

/// Orthographic projection of a model vertex onto the screen.
///
/// x goes right and y goes up in model space; z is dropped.
pub fn screen_transform(m: &Mat3, v: &Vec3, model_scale: i32) -> Point {
    let [x, y, _] = transform(m, v);
    let shift = FIX_SHIFT + MODEL_SHIFT;
    Point::new(
        SCREEN_CENTER_X + ((x * model_scale) >> shift),
        SCREEN_CENTER_Y - ((y * model_scale) >> shift),
    )
}
