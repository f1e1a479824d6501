//! Render driver (§4.D): owns the mesh, the sorter worker handle, and the
//! per-frame throttle/install state machine for depth sorting.

use std::time::{Duration, Instant};

use glam::Mat4;
use tracing::{debug, info, instrument, warn};

use crate::sorter::{SortRequest, SortResponse, SorterHandle};

/// At most one sort per 100 ms per scene instance (§5, §6).
const SORT_THROTTLE_MS: u64 = 100;

/// Everything the driver needs to prepare a sort request; owned by whatever
/// builds the GPU mesh (geometry builder output).
pub struct Mesh {
    pub num_triangles: u32,
    /// Flattened `T x 3` centroid table, immutable for the scene's lifetime.
    pub centroids: Vec<f32>,
    /// Current `3*T` index buffer; rewritten in place when a sort installs.
    pub index_buffer: Vec<u32>,
    /// Set after `install_sort_result` rewrites `index_buffer`, so the
    /// caller knows to re-upload the GPU buffer.
    pub index_dirty: bool,
}

impl Mesh {
    pub fn new(num_triangles: u32, centroids: Vec<f32>) -> Self {
        let index_buffer: Vec<u32> = (0..num_triangles * 3).collect();
        Self {
            num_triangles,
            centroids,
            index_buffer,
            index_dirty: true,
        }
    }
}

/// Per-frame camera state supplied by the host (§6: render inputs).
pub struct FrameInputs {
    pub view_matrix: Mat4,
    pub proj_matrix: Mat4,
    pub camera_pos: glam::Vec3,
    pub resolution: (f32, f32),
    pub sigma: f32,
    pub debug: bool,
}

pub struct RenderDriver {
    mesh: Mesh,
    sorter: SorterHandle,
    prev_view_matrix: Option<Mat4>,
    last_sort_time: Option<Instant>,
    sort_in_flight: bool,
    current_request_id: u32,
}

impl RenderDriver {
    pub fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            sorter: SorterHandle::spawn(),
            prev_view_matrix: None,
            last_sort_time: None,
            sort_in_flight: false,
            current_request_id: 0,
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Drains any completed sort, advances the throttle state machine, and
    /// (re)builds the uniform block for this frame. Returns the uniforms;
    /// the caller uploads them and checks `mesh().index_dirty` to decide
    /// whether to re-upload the index buffer.
    #[instrument(level = "debug", skip(self, inputs))]
    pub fn tick(&mut self, inputs: &FrameInputs) -> crate::types::CameraUniforms {
        self.install_pending_result();
        self.mesh.index_dirty = false;

        self.maybe_dispatch_sort(inputs.view_matrix);

        crate::types::CameraUniforms::new(
            inputs.view_matrix,
            inputs.proj_matrix,
            inputs.camera_pos,
            inputs.sigma,
            inputs.resolution,
            inputs.debug,
        )
    }

    fn install_pending_result(&mut self) {
        let Some(response) = self.sorter.try_recv() else {
            return;
        };

        match response {
            SortResponse::Ok {
                prepared_index_array,
                request_id,
            } => {
                if request_id == self.current_request_id {
                    debug!(request_id, "installing sort result");
                    self.mesh.index_buffer = prepared_index_array;
                    self.mesh.index_dirty = true;
                } else {
                    debug!(
                        request_id,
                        current = self.current_request_id,
                        "discarding stale sort result"
                    );
                }
            }
            SortResponse::Err { error, request_id } => {
                warn!(request_id, %error, "sort request failed, keeping last permutation");
            }
        }
        self.sort_in_flight = false;
    }

    fn maybe_dispatch_sort(&mut self, view_matrix: Mat4) {
        if self.sort_in_flight {
            return;
        }
        let view_changed = self.prev_view_matrix != Some(view_matrix);
        let throttle_elapsed = self
            .last_sort_time
            .map(|t| t.elapsed() >= Duration::from_millis(SORT_THROTTLE_MS))
            .unwrap_or(true);

        if !view_changed || !throttle_elapsed {
            return;
        }

        self.current_request_id += 1;
        self.sort_in_flight = true;
        self.prev_view_matrix = Some(view_matrix);
        self.last_sort_time = Some(Instant::now());

        let view_matrix_array: [f32; 16] = view_matrix.to_cols_array();
        let request = SortRequest {
            num_triangles: self.mesh.num_triangles,
            centers: self.mesh.centroids.clone(),
            view_matrix: view_matrix_array,
            request_id: self.current_request_id,
        };

        info!(request_id = self.current_request_id, "dispatching sort");
        if self.sorter.post(request).is_err() {
            warn!("sorter worker unavailable, clearing in-flight flag");
            self.sort_in_flight = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn inputs(view: Mat4) -> FrameInputs {
        FrameInputs {
            view_matrix: view,
            proj_matrix: Mat4::IDENTITY,
            camera_pos: Vec3::ZERO,
            resolution: (800.0, 600.0),
            sigma: 1.0,
            debug: false,
        }
    }

    #[test]
    fn first_tick_dispatches_a_sort() {
        let mesh = Mesh::new(2, vec![0.0; 6]);
        let mut driver = RenderDriver::new(mesh);
        driver.tick(&inputs(Mat4::IDENTITY));
        assert_eq!(driver.current_request_id, 1);
        assert!(driver.sort_in_flight);
    }

    #[test]
    fn unchanged_view_does_not_redispatch_once_throttle_open() {
        let mesh = Mesh::new(2, vec![0.0; 6]);
        let mut driver = RenderDriver::new(mesh);
        driver.tick(&inputs(Mat4::IDENTITY));
        // Simulate the in-flight sort completing so a second dispatch is even
        // possible; view matrix hasn't changed, so no new request should fire.
        driver.sort_in_flight = false;
        driver.tick(&inputs(Mat4::IDENTITY));
        assert_eq!(driver.current_request_id, 1);
    }

    #[test]
    fn view_change_before_throttle_elapses_does_not_dispatch() {
        let mesh = Mesh::new(2, vec![0.0; 6]);
        let mut driver = RenderDriver::new(mesh);
        driver.tick(&inputs(Mat4::IDENTITY));
        driver.sort_in_flight = false;
        let moved = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        driver.tick(&inputs(moved));
        // last_sort_time was just set, so the 100ms throttle blocks a second
        // dispatch even though the view changed.
        assert_eq!(driver.current_request_id, 1);
    }

    #[test]
    fn stale_result_is_discarded_by_request_id() {
        let mesh = Mesh::new(1, vec![0.0; 3]);
        let mut driver = RenderDriver::new(mesh);
        driver.current_request_id = 5;
        driver.sort_in_flight = true;

        // Simulate a late arrival from an older request.
        let stale = SortResponse::Ok {
            prepared_index_array: vec![9, 9, 9],
            request_id: 3,
        };
        match stale {
            SortResponse::Ok {
                request_id,
                prepared_index_array,
            } if request_id == driver.current_request_id => {
                driver.mesh.index_buffer = prepared_index_array;
            }
            _ => {}
        }
        assert_eq!(driver.mesh.index_buffer, vec![0, 1, 2]);
    }
}
