//! Spherical harmonic evaluator (§4.A). Pure function: degree, coefficients,
//! view direction in, RGB out. The GPU vertex stage re-implements this same
//! algorithm against its packed SH storage buffer; this copy exists for
//! CPU-side construction (when SH is absent at a given vertex we still need
//! a deterministic fallback color) and for the conformance tests in §8.

pub const SH_C0: f64 = 0.28209479177387814;
pub const SH_C1: f64 = 0.4886025119029199;

pub const SH_C2: [f64; 5] = [
    1.0925484305920792,
    -1.0925484305920792,
    0.31539156525252005,
    -1.0925484305920792,
    0.5462742152960396,
];

pub const SH_C3: [f64; 7] = [
    -0.5900435899266435,
    2.890611442640554,
    -0.4570457994644658,
    0.3731763325901154,
    -0.4570457994644658,
    1.445305721320277,
    -0.5900435899266435,
];

/// Number of higher-order coefficient triples for degree `d`: `(d+1)^2 - 1`.
pub fn rest_count(degree: u8) -> usize {
    let n = (degree as usize + 1).pow(2);
    n - 1
}

/// Evaluate the real SH basis at view direction `dir` (unit vector from
/// camera to point) for degree `d` in {0,1,2,3}. `dc` is the 3-channel DC
/// term; `rest` holds `rest_count(degree)` RGB triples in the canonical
/// 3D-GS order: y,z,x (degree 1); xy,yz,2z^2-x^2-y^2,xz,x^2-y^2 (degree 2);
/// the seven degree-3 terms. Adds the fixed `+0.5` offset and clamps to
/// >= 0 per channel (no upper clamp).
pub fn eval(degree: u8, dc: [f32; 3], rest: &[[f32; 3]], dir: glam::Vec3) -> [f32; 3] {
    debug_assert_eq!(rest.len(), rest_count(degree));

    let mut result = [
        SH_C0 * dc[0] as f64,
        SH_C0 * dc[1] as f64,
        SH_C0 * dc[2] as f64,
    ];

    if degree >= 1 {
        let (x, y, z) = (dir.x as f64, dir.y as f64, dir.z as f64);
        for c in 0..3 {
            result[c] -= SH_C1 * y * rest[0][c] as f64;
            result[c] += SH_C1 * z * rest[1][c] as f64;
            result[c] -= SH_C1 * x * rest[2][c] as f64;
        }

        if degree >= 2 {
            let (xx, yy, zz) = (x * x, y * y, z * z);
            let (xy, yz, xz) = (x * y, y * z, x * z);
            for c in 0..3 {
                result[c] += SH_C2[0] * xy * rest[3][c] as f64;
                result[c] += SH_C2[1] * yz * rest[4][c] as f64;
                result[c] += SH_C2[2] * (2.0 * zz - xx - yy) * rest[5][c] as f64;
                result[c] += SH_C2[3] * xz * rest[6][c] as f64;
                result[c] += SH_C2[4] * (xx - yy) * rest[7][c] as f64;
            }

            if degree >= 3 {
                for c in 0..3 {
                    result[c] += SH_C3[0] * y * (3.0 * xx - yy) * rest[8][c] as f64;
                    result[c] += SH_C3[1] * xy * z * rest[9][c] as f64;
                    result[c] += SH_C3[2] * y * (4.0 * zz - xx - yy) * rest[10][c] as f64;
                    result[c] += SH_C3[3] * z * (2.0 * zz - 3.0 * xx - 3.0 * yy) * rest[11][c] as f64;
                    result[c] += SH_C3[4] * x * (4.0 * zz - xx - yy) * rest[12][c] as f64;
                    result[c] += SH_C3[5] * z * (xx - yy) * rest[13][c] as f64;
                    result[c] += SH_C3[6] * x * (xx - 3.0 * yy) * rest[14][c] as f64;
                }
            }
        }
    }

    [
        (result[0] + 0.5).max(0.0) as f32,
        (result[1] + 0.5).max(0.0) as f32,
        (result[2] + 0.5).max(0.0) as f32,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn degree_zero_ignores_view_direction() {
        let dc = [1.0, 0.0, 0.0];
        let a = eval(0, dc, &[], Vec3::X);
        let b = eval(0, dc, &[], Vec3::Y);
        assert_eq!(a, b);
    }

    #[test]
    fn degree_zero_matches_closed_form() {
        let dc = [1.0, 2.0, -4.0];
        let out = eval(0, dc, &[], Vec3::Z);
        let expected = [
            (SH_C0 * 1.0 + 0.5) as f32,
            (SH_C0 * 2.0 + 0.5) as f32,
            ((SH_C0 * -4.0 + 0.5) as f32).max(0.0),
        ];
        for c in 0..3 {
            assert!((out[c] - expected[c]).abs() < 1e-6, "{out:?} vs {expected:?}");
        }
    }

    #[test]
    fn result_is_never_negative() {
        let dc = [-10.0, -10.0, -10.0];
        let out = eval(0, dc, &[], Vec3::X);
        for c in out {
            assert!(c >= 0.0);
        }
    }

    #[test]
    fn rest_count_matches_degree() {
        assert_eq!(rest_count(0), 0);
        assert_eq!(rest_count(1), 3);
        assert_eq!(rest_count(2), 8);
        assert_eq!(rest_count(3), 15);
    }

    #[test]
    fn degree_three_runs_with_full_coefficient_set() {
        let dc = [0.1, 0.1, 0.1];
        let rest = vec![[0.05, 0.05, 0.05]; rest_count(3)];
        let out = eval(3, dc, &rest, Vec3::new(0.3, 0.4, 0.866).normalize());
        for c in out {
            assert!(c.is_finite());
            assert!(c >= 0.0);
        }
    }
}
