// Model Module - the rotating cobra wireframe
use crate::bitmap::LineSink;
use crate::trig::SineTable;
use crate::types::Point;
use crate::vec_mat::{mrotx, mrotz, mshift, munit, screen_transform, Mat3, Vec3, FIX_SHIFT};

pub const MODEL_SPEED: u16 = 13;
/// Default projection scale, 8 fractional bits (112/256 px per model unit)
pub const MODEL_SCALE: i32 = 112;

// Per-frame angle steps; 50 and 37 share no factor so the pose rarely repeats
const ANGLE_Z_STEP: u16 = MODEL_SPEED * 50;
const ANGLE_X_STEP: u16 = MODEL_SPEED * 37;

/// Cobra Mk III hull, nose towards +z
pub const MODEL_VERTICES: [Vec3; 28] = [
    [32, 0, 76],
    [-32, 0, 76],
    [0, 26, 24],
    [-120, -3, -8],
    [120, -3, -8],
    [-88, 16, -40],
    [88, 16, -40],
    [128, -8, -40],
    [-128, -8, -40],
    [0, 26, -40],
    [-32, -24, -40],
    [32, -24, -40],
    // engine plates on the back face
    [-36, 8, -40],
    [-8, 12, -40],
    [8, 12, -40],
    [36, 8, -40],
    [36, -12, -40],
    [8, -16, -40],
    [-8, -16, -40],
    [-36, -12, -40],
    // nose gun
    [0, 0, 76],
    [0, 0, 90],
    // retro thrusters
    [-80, -6, -40],
    [-80, 6, -40],
    [-88, 0, -40],
    [80, 6, -40],
    [88, 0, -40],
    [80, -6, -40],
];

pub const MODEL_EDGES: [[usize; 2]; 38] = [
    [0, 1],
    [0, 4],
    [1, 3],
    [3, 8],
    [4, 7],
    [6, 7],
    [6, 9],
    [5, 9],
    [5, 8],
    [2, 5],
    [2, 6],
    [3, 5],
    [4, 6],
    [1, 2],
    [0, 2],
    [8, 10],
    [10, 11],
    [7, 11],
    [1, 10],
    [0, 11],
    [1, 5],
    [0, 6],
    [20, 21],
    [12, 13],
    [18, 19],
    [14, 15],
    [16, 17],
    [15, 16],
    [14, 17],
    [13, 18],
    [12, 19],
    [2, 9],
    [22, 24],
    [23, 24],
    [22, 23],
    [25, 26],
    [26, 27],
    [25, 27],
];

/// Rotation angles about z and x, 0x10000 per turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationState {
    pub anglez: u16,
    pub anglex: u16,
}

impl RotationState {
    pub fn advance(&mut self) {
        self.anglex = self.anglex.wrapping_add(ANGLE_X_STEP);
        self.anglez = self.anglez.wrapping_add(ANGLE_Z_STEP);
    }

    /// z rotation first, then x, renormalized after each step
    pub fn matrix(&self, sines: &SineTable) -> Mat3 {
        let m0 = mshift(&mrotz(&munit(), self.anglez, sines), FIX_SHIFT);
        mshift(&mrotx(&m0, self.anglex, sines), FIX_SHIFT)
    }
}

pub struct ModelRenderer {
    pub rotation: RotationState,
    pub model_scale: i32,
}

impl ModelRenderer {
    pub fn new(model_scale: i32) -> Self {
        ModelRenderer {
            rotation: RotationState::default(),
            model_scale,
        }
    }

    /// Screen endpoints of every edge for the current pose
    pub fn segments(&self, sines: &SineTable) -> Vec<(Point, Point)> {
        let m = self.rotation.matrix(sines);
        MODEL_EDGES
            .iter()
            .map(|&[a, b]| {
                (
                    screen_transform(&m, &MODEL_VERTICES[a], self.model_scale),
                    screen_transform(&m, &MODEL_VERTICES[b], self.model_scale),
                )
            })
            .collect()
    }

    /// Stroke every edge into `sink`, then advance the rotation
    pub fn render(&mut self, sink: &mut impl LineSink, sines: &SineTable) {
        for (a, b) in self.segments(sines) {
            sink.draw_line(a, b);
        }
        self.rotation.advance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SCREEN_BOTTOM, SCREEN_RIGHT, SCREEN_TOP};

    // Records line requests instead of rasterizing them
    #[derive(Default)]
    struct LineLog(Vec<(Point, Point)>);

    impl LineSink for LineLog {
        fn draw_line(&mut self, a: Point, b: Point) {
            self.0.push((a, b));
        }
    }

    #[test]
    fn test_edges_reference_real_vertices() {
        for &[a, b] in MODEL_EDGES.iter() {
            assert!(a < MODEL_VERTICES.len() && b < MODEL_VERTICES.len());
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_every_vertex_is_used() {
        for v in 0..MODEL_VERTICES.len() {
            assert!(MODEL_EDGES.iter().any(|e| e.contains(&v)), "vertex {} unused", v);
        }
    }

    #[test]
    fn test_render_issues_one_line_per_edge() {
        let sines = SineTable::new();
        let mut renderer = ModelRenderer::new(MODEL_SCALE);
        let mut log = LineLog::default();
        renderer.render(&mut log, &sines);
        assert_eq!(log.0.len(), MODEL_EDGES.len());
    }

    #[test]
    fn test_same_pose_same_lines() {
        let sines = SineTable::new();
        let renderer = ModelRenderer::new(MODEL_SCALE);
        let first = renderer.segments(&sines);
        for _ in 0..3 {
            assert_eq!(renderer.segments(&sines), first);
        }

        // a fresh renderer at zero angles strokes the identical sequence
        let mut a = ModelRenderer::new(MODEL_SCALE);
        let mut b = ModelRenderer::new(MODEL_SCALE);
        let (mut log_a, mut log_b) = (LineLog::default(), LineLog::default());
        a.render(&mut log_a, &sines);
        b.render(&mut log_b, &sines);
        assert_eq!(log_a.0, log_b.0);
        assert_eq!(log_a.0, first);
    }

    #[test]
    fn test_render_advances_rotation_once() {
        let sines = SineTable::new();
        let mut renderer = ModelRenderer::new(MODEL_SCALE);
        let before = renderer.segments(&sines);
        renderer.render(&mut LineLog::default(), &sines);
        assert_eq!(renderer.rotation, RotationState { anglez: 650, anglex: 481 });
        assert_ne!(renderer.segments(&sines), before);
    }

    #[test]
    fn test_rotation_wraps() {
        let mut rotation = RotationState { anglez: 0xFFFF, anglex: 0xFFFF };
        rotation.advance();
        assert_eq!(rotation, RotationState { anglez: 649, anglex: 480 });
    }

    #[test]
    fn test_model_stays_on_screen() {
        let sines = SineTable::new();
        let mut renderer = ModelRenderer::new(MODEL_SCALE);
        for _ in 0..400 {
            for (a, b) in renderer.segments(&sines) {
                for p in [a, b] {
                    assert!(p.x >= 0 && p.x < SCREEN_RIGHT, "{:?}", p);
                    assert!(p.y >= SCREEN_TOP && p.y < SCREEN_BOTTOM, "{:?}", p);
                }
            }
            renderer.rotation.advance();
        }
    }

    #[test]
    fn test_zero_pose_matches_flat_projection() {
        // at zero angles the model is seen from behind, x right and y up
        let sines = SineTable::new();
        let renderer = ModelRenderer::new(MODEL_SCALE);
        let m = renderer.rotation.matrix(&sines);
        for v in MODEL_VERTICES.iter() {
            let p = screen_transform(&m, v, MODEL_SCALE);
            let ideal = screen_transform(&munit(), v, MODEL_SCALE);
            assert!((p.x - ideal.x).abs() <= 1 && (p.y - ideal.y).abs() <= 1, "{:?}", v);
        }
    }
}
