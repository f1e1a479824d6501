//! Scene input (§6): the immutable-after-load description of vertices,
//! triangles, opacities, and optional color/SH data that the geometry
//! builder consumes.

use crate::sh;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("opacities length {got} does not match vertex count {expected}")]
    OpacityCountMismatch { expected: usize, got: usize },
    #[error("colors length {got} does not match vertex count {expected}")]
    ColorCountMismatch { expected: usize, got: usize },
    #[error("features_dc length {got} does not match vertex count {expected}")]
    FeaturesDcCountMismatch { expected: usize, got: usize },
    #[error("features_rest length {got} does not match vertex_count * R ({expected}), R = (d+1)^2 - 1 for degree {degree}")]
    FeaturesRestCountMismatch {
        expected: usize,
        got: usize,
        degree: u8,
    },
    #[error("sh degree {0} is out of range; must be 0..=3")]
    InvalidShDegree(u8),
    #[error("triangle {triangle} references vertex index {index}, but there are only {vertex_count} vertices")]
    TriangleIndexOutOfBounds {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("opacity at vertex {index} is {value}, outside [0, 1]")]
    OpacityOutOfRange { index: usize, value: f32 },
}

/// Optional view-dependent color data: a DC triple plus `R = (d+1)^2 - 1`
/// higher-order triples per vertex, stored flat in vertex order.
#[derive(Debug, Clone)]
pub struct SphericalHarmonics {
    pub degree: u8,
    pub features_dc: Vec<[f32; 3]>,
    /// `vertex_count` groups of `rest_count(degree)` triples each.
    pub features_rest: Vec<[f32; 3]>,
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub vertices: Vec<[f32; 3]>,
    pub triangle_indices: Vec<[u32; 3]>,
    pub opacities: Vec<f32>,
    pub colors: Option<Vec<[u8; 3]>>,
    pub sh: Option<SphericalHarmonics>,
    pub sigma: f32,
    pub debug: bool,
}

pub struct SceneBuilder {
    vertices: Vec<[f32; 3]>,
    triangle_indices: Vec<[u32; 3]>,
    opacities: Vec<f32>,
    colors: Option<Vec<[u8; 3]>>,
    sh: Option<SphericalHarmonics>,
    sigma: Option<f32>,
    debug: bool,
}

impl SceneBuilder {
    pub fn new(
        vertices: Vec<[f32; 3]>,
        triangle_indices: Vec<[u32; 3]>,
        opacities: Vec<f32>,
    ) -> Self {
        Self {
            vertices,
            triangle_indices,
            opacities,
            colors: None,
            sh: None,
            sigma: None,
            debug: false,
        }
    }

    pub fn with_colors(mut self, colors: Vec<[u8; 3]>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_sh(mut self, sh: SphericalHarmonics) -> Self {
        self.sh = Some(sh);
        self
    }

    pub fn with_sigma(mut self, sigma: f32) -> Self {
        self.sigma = Some(sigma);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[tracing::instrument(level = "info", skip(self), fields(
        vertex_count = self.vertices.len(),
        triangle_count = self.triangle_indices.len(),
    ))]
    pub fn build(self) -> Result<Scene, SceneError> {
        let vertex_count = self.vertices.len();

        if self.opacities.len() != vertex_count {
            return Err(SceneError::OpacityCountMismatch {
                expected: vertex_count,
                got: self.opacities.len(),
            });
        }

        for (index, &value) in self.opacities.iter().enumerate() {
            if !(0.0..=1.0).contains(&value) {
                return Err(SceneError::OpacityOutOfRange { index, value });
            }
        }

        if let Some(colors) = &self.colors {
            if colors.len() != vertex_count {
                return Err(SceneError::ColorCountMismatch {
                    expected: vertex_count,
                    got: colors.len(),
                });
            }
        }

        if let Some(sh) = &self.sh {
            if sh.degree > 3 {
                return Err(SceneError::InvalidShDegree(sh.degree));
            }
            if sh.features_dc.len() != vertex_count {
                return Err(SceneError::FeaturesDcCountMismatch {
                    expected: vertex_count,
                    got: sh.features_dc.len(),
                });
            }
            let expected_rest = vertex_count * sh::rest_count(sh.degree);
            if sh.features_rest.len() != expected_rest {
                return Err(SceneError::FeaturesRestCountMismatch {
                    expected: expected_rest,
                    got: sh.features_rest.len(),
                    degree: sh.degree,
                });
            }
        }

        for (triangle, indices) in self.triangle_indices.iter().enumerate() {
            for &index in indices {
                if index as usize >= vertex_count {
                    return Err(SceneError::TriangleIndexOutOfBounds {
                        triangle,
                        index,
                        vertex_count,
                    });
                }
            }
        }

        tracing::info!("scene constructed");

        Ok(Scene {
            vertices: self.vertices,
            triangle_indices: self.triangle_indices,
            opacities: self.opacities,
            colors: self.colors,
            sh: self.sh,
            sigma: self.sigma.unwrap_or(1.0),
            debug: self.debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> (Vec<[f32; 3]>, Vec<[u32; 3]>) {
        let vertices = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let triangle_indices = vec![[0, 1, 2], [0, 2, 3]];
        (vertices, triangle_indices)
    }

    #[test]
    fn empty_scene_is_valid() {
        let scene = SceneBuilder::new(vec![], vec![], vec![]).build().unwrap();
        assert_eq!(scene.triangle_indices.len(), 0);
    }

    #[test]
    fn default_sigma_is_one() {
        let (vertices, indices) = quad();
        let scene = SceneBuilder::new(vertices, indices, vec![0.5; 4])
            .build()
            .unwrap();
        assert_eq!(scene.sigma, 1.0);
    }

    #[test]
    fn opacity_count_mismatch_fails_construction() {
        let (vertices, indices) = quad();
        let err = SceneBuilder::new(vertices, indices, vec![0.5; 3])
            .build()
            .unwrap_err();
        assert!(matches!(err, SceneError::OpacityCountMismatch { .. }));
    }

    #[test]
    fn out_of_bounds_triangle_index_fails_construction() {
        let (vertices, _) = quad();
        let err = SceneBuilder::new(vertices, vec![[0, 1, 9]], vec![0.5; 4])
            .build()
            .unwrap_err();
        assert!(matches!(err, SceneError::TriangleIndexOutOfBounds { .. }));
    }

    #[test]
    fn mis_sized_features_rest_fails_construction() {
        let (vertices, indices) = quad();
        let sh = SphericalHarmonics {
            degree: 2,
            features_dc: vec![[0.0, 0.0, 0.0]; 4],
            features_rest: vec![[0.0, 0.0, 0.0]; 4], // should be 4 * 8
        };
        let err = SceneBuilder::new(vertices, indices, vec![0.5; 4])
            .with_sh(sh)
            .build()
            .unwrap_err();
        assert!(matches!(err, SceneError::FeaturesRestCountMismatch { .. }));
    }

    #[test]
    fn opacity_out_of_range_fails_construction() {
        let (vertices, indices) = quad();
        let err = SceneBuilder::new(vertices, indices, vec![1.5, 0.5, 0.5, 0.5])
            .build()
            .unwrap_err();
        assert!(matches!(err, SceneError::OpacityOutOfRange { .. }));
    }
}
