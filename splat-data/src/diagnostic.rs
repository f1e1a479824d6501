//! Diagnostic analyzer (§4.G, adjunct). A CPU mirror of the GPU culling
//! chain (§4.E.1-4.E.6) used only for conformance testing; produces no
//! frames, only pass counts and an `r` distribution.

use glam::{Mat4, Vec2, Vec3};

use crate::scene::Scene;

const STOPPING_INFLUENCE: f32 = 0.01;
const BACKFACE_THRESHOLD: f32 = 0.001;
const PERIMETER_THRESHOLD: f32 = 1.0;
const DISTANCE_MIN: f32 = 1.0;
const DISTANCE_MAX: f32 = 1600.0;

/// Buckets: <0.5, 0.5-1, 1-100, 100-1600, >1600.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RDistribution {
    pub below_half: u32,
    pub half_to_one: u32,
    pub one_to_hundred: u32,
    pub hundred_to_max: u32,
    pub above_max: u32,
}

impl RDistribution {
    fn record(&mut self, r: f32) {
        if r < 0.5 {
            self.below_half += 1;
        } else if r < 1.0 {
            self.half_to_one += 1;
        } else if r < 100.0 {
            self.one_to_hundred += 1;
        } else if r <= 1600.0 {
            self.hundred_to_max += 1;
        } else {
            self.above_max += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticReport {
    pub total_triangles: u32,
    pub min_weight_filtered: u32,
    pub backface_filtered: u32,
    pub clip_filtered: u32,
    pub perimeter_filtered: u32,
    pub size_filtered: u32,
    pub passed: u32,
    pub r_distribution: RDistribution,
}

impl DiagnosticReport {
    pub fn min_weight_filter_percentage(&self) -> f32 {
        if self.total_triangles == 0 {
            return 0.0;
        }
        100.0 * self.min_weight_filtered as f32 / self.total_triangles as f32
    }
}

/// Pixel-space projection matching the ndc2Pix convention (§4.D/§4.E.4):
/// half-pixel shifted, `((ndc + 1) * size - 1) * 0.5` per axis (seed test 5).
pub fn pixel_from_ndc(ndc: Vec2, resolution: Vec2) -> Vec2 {
    (ndc + Vec2::ONE) * resolution * 0.5 - Vec2::splat(0.5)
}

/// Perimeter-weighted incenter of a screen-space triangle and its perimeter
/// (§4.E.5, seed test 7); the perimeter is also the gate 4.E.5 threshold
/// compares against, so callers get both from one set of edge lengths.
pub fn incenter_and_perimeter(p0: Vec2, p1: Vec2, p2: Vec2) -> (Vec2, f32) {
    let a = (p1 - p2).length();
    let b = (p2 - p0).length();
    let c = (p0 - p1).length();
    let perimeter = a + b + c;
    let incenter = (a * p0 + b * p1 + c * p2) / perimeter;
    (incenter, perimeter)
}

/// Mirrors §4.E.1-4.E.6 per triangle. Does not compute the fragment-stage
/// alpha test since that is inherently per-pixel; callers that need §4.F
/// conformance should additionally sample `soft_alpha_at` below.
pub fn analyze(
    scene: &Scene,
    view_matrix: Mat4,
    proj_matrix: Mat4,
    resolution: (f32, f32),
) -> DiagnosticReport {
    let mvp = proj_matrix * view_matrix;
    let resolution = Vec2::new(resolution.0, resolution.1);
    let mut report = DiagnosticReport {
        total_triangles: scene.triangle_indices.len() as u32,
        ..Default::default()
    };

    for indices in &scene.triangle_indices {
        let v0 = Vec3::from(scene.vertices[indices[0] as usize]);
        let v1 = Vec3::from(scene.vertices[indices[1] as usize]);
        let v2 = Vec3::from(scene.vertices[indices[2] as usize]);
        let w0 = scene.opacities[indices[0] as usize];
        let w1 = scene.opacities[indices[1] as usize];
        let w2 = scene.opacities[indices[2] as usize];
        let m = w0.min(w1).min(w2);

        if m < STOPPING_INFLUENCE {
            report.min_weight_filtered += 1;
            continue;
        }

        let world_normal = (v1 - v0).cross(v2 - v0);
        let view_normal = (view_matrix * world_normal.extend(0.0)).truncate();
        let centroid = (v0 + v1 + v2) / 3.0;
        let centroid_view = (view_matrix * centroid.extend(1.0)).truncate();
        let u = -centroid_view.normalize();
        let mut c = view_normal.dot(u);
        if c > 0.0 {
            c = -c;
        }
        if c.abs() < BACKFACE_THRESHOLD {
            report.backface_filtered += 1;
            continue;
        }

        let c0 = mvp * v0.extend(1.0);
        let c1 = mvp * v1.extend(1.0);
        let c2 = mvp * v2.extend(1.0);
        if c0.w <= 0.0 && c1.w <= 0.0 && c2.w <= 0.0 {
            report.clip_filtered += 1;
            continue;
        }

        let to_pixel = |c: glam::Vec4| -> Vec2 { pixel_from_ndc(c.truncate().truncate() / c.w, resolution) };
        let p0 = to_pixel(c0);
        let p1 = to_pixel(c1);
        let p2 = to_pixel(c2);

        let (incenter, perimeter) = incenter_and_perimeter(p0, p1, p2);
        if perimeter < PERIMETER_THRESHOLD {
            report.perimeter_filtered += 1;
            continue;
        }

        let r = (p0 - incenter)
            .length()
            .max((p1 - incenter).length())
            .max((p2 - incenter).length());
        report.r_distribution.record(r);

        if r > DISTANCE_MAX || r < DISTANCE_MIN {
            report.size_filtered += 1;
            continue;
        }

        report.passed += 1;
    }

    report
}

/// Mirrors §4.F's soft alpha computation at a single screen-space sample
/// point, given the already-computed incenter-relative edge half-planes.
/// Exposed for conformance tests (seed test 8, "safe phi").
pub fn soft_alpha(edges: [(Vec2, f32); 3], phi_scale: f32, sigma: f32, m: f32, p: Vec2) -> Option<f32> {
    let mut deltas = [0.0f32; 3];
    for (k, (n, o)) in edges.iter().enumerate() {
        deltas[k] = n.dot(p) + o;
        if deltas[k] > 0.0 {
            return None;
        }
    }
    let max_delta = deltas[0].max(deltas[1]).max(deltas[2]);
    let cx = (max_delta * phi_scale).max(0.0).powf(sigma);
    Some((m * cx).min(0.99))
}
