//! Depth sorter actor (§4.C, §5). Runs on a dedicated background thread and
//! communicates with the render driver strictly by message passing —
//! self-contained request/response payloads, no shared mutable state.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, instrument, warn};

/// 16-bit depth buckets bound both memory (~256 KB of counts/offsets) and
/// time (O(T + 65536)) regardless of triangle count.
const BUCKET_COUNT: usize = 65536;

/// Below this depth spread the scene is effectively depth-flat; emit the
/// identity permutation rather than dividing by a near-zero range.
const DEPTH_RANGE_EPS: f64 = 1e-7;

#[derive(Debug, thiserror::Error)]
pub enum SortError {
    #[error("centers length {got} does not match 3*numTriangles ({expected})")]
    CenterCountMismatch { expected: usize, got: usize },
    #[error("sorter worker thread is gone")]
    WorkerDisconnected,
}

/// A depth-sort request. `view_matrix` is the row-major 4x4 model-view
/// matrix; `centers` is the flattened `T x 3` centroid table. Ownership
/// moves with the request — the sender must not touch it again.
#[derive(Debug, Clone)]
pub struct SortRequest {
    pub num_triangles: u32,
    pub centers: Vec<f32>,
    pub view_matrix: [f32; 16],
    pub request_id: u32,
}

#[derive(Debug, Clone)]
pub enum SortResponse {
    Ok {
        prepared_index_array: Vec<u32>,
        request_id: u32,
    },
    Err {
        error: String,
        request_id: u32,
    },
}

impl SortResponse {
    pub fn request_id(&self) -> u32 {
        match self {
            SortResponse::Ok { request_id, .. } => *request_id,
            SortResponse::Err { request_id, .. } => *request_id,
        }
    }
}

/// Handle the render driver holds to post requests and poll for results
/// without blocking. Dropping the handle terminates the worker thread.
pub struct SorterHandle {
    request_tx: Sender<SortRequest>,
    response_rx: Receiver<SortResponse>,
    _worker: JoinHandle<()>,
}

impl SorterHandle {
    pub fn spawn() -> Self {
        let (request_tx, request_rx) = mpsc::channel::<SortRequest>();
        let (response_tx, response_rx) = mpsc::channel::<SortResponse>();

        let worker = std::thread::Builder::new()
            .name("splat-sorter".into())
            .spawn(move || sorter_loop(request_rx, response_tx))
            .expect("failed to spawn sorter thread");

        Self {
            request_tx,
            response_rx,
            _worker: worker,
        }
    }

    /// Post a request. Never blocks the caller.
    pub fn post(&self, request: SortRequest) -> Result<(), SortError> {
        self.request_tx
            .send(request)
            .map_err(|_| SortError::WorkerDisconnected)
    }

    /// Non-blocking poll for a completed (or failed) sort.
    pub fn try_recv(&self) -> Option<SortResponse> {
        self.response_rx.try_recv().ok()
    }
}

fn sorter_loop(request_rx: Receiver<SortRequest>, response_tx: Sender<SortResponse>) {
    loop {
        match request_rx.recv_timeout(Duration::from_secs(1)) {
            Ok(request) => {
                let request_id = request.request_id;
                let response = match sort(request) {
                    Ok(prepared_index_array) => SortResponse::Ok {
                        prepared_index_array,
                        request_id,
                    },
                    Err(err) => {
                        warn!(%err, request_id, "depth sort failed");
                        SortResponse::Err {
                            error: err.to_string(),
                            request_id,
                        }
                    }
                };
                if response_tx.send(response).is_err() {
                    debug!("sorter response channel closed, exiting worker");
                    return;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("sorter request channel closed, exiting worker");
                return;
            }
        }
    }
}

/// Core algorithm (§4.C): camera-space z per triangle, 16-bit bucket
/// counting sort ascending (farthest bucket first), emit `3*T` corner
/// indices in back-to-front order.
#[instrument(level = "debug", skip(request), fields(num_triangles = request.num_triangles))]
fn sort(request: SortRequest) -> Result<Vec<u32>, SortError> {
    let SortRequest {
        num_triangles,
        centers,
        view_matrix: m,
        ..
    } = request;

    let t = num_triangles as usize;
    if centers.len() != t * 3 {
        return Err(SortError::CenterCountMismatch {
            expected: t * 3,
            got: centers.len(),
        });
    }

    if t == 0 {
        return Ok(Vec::new());
    }

    let depths: Vec<f64> = (0..t)
        .map(|i| {
            let cx = centers[i * 3] as f64;
            let cy = centers[i * 3 + 1] as f64;
            let cz = centers[i * 3 + 2] as f64;
            m[2] as f64 * cx + m[6] as f64 * cy + m[10] as f64 * cz + m[14] as f64
        })
        .collect();

    let min = depths.iter().copied().fold(f64::INFINITY, f64::min);
    let max = depths.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let permutation: Vec<usize> = if max - min <= DEPTH_RANGE_EPS {
        (0..t).collect()
    } else {
        let scale = (BUCKET_COUNT - 1) as f64 / (max - min);
        let buckets: Vec<usize> = depths
            .iter()
            .map(|&z| (((z - min) * scale).floor() as usize).min(BUCKET_COUNT - 1))
            .collect();

        let mut counts = vec![0u32; BUCKET_COUNT];
        for &b in &buckets {
            counts[b] += 1;
        }
        let mut offsets = vec![0u32; BUCKET_COUNT];
        let mut running = 0u32;
        for b in 0..BUCKET_COUNT {
            offsets[b] = running;
            running += counts[b];
        }

        let mut out = vec![0usize; t];
        let mut cursor = offsets;
        for (i, &b) in buckets.iter().enumerate() {
            out[cursor[b] as usize] = i;
            cursor[b] += 1;
        }
        out
    };

    let mut prepared_index_array = Vec::with_capacity(t * 3);
    for &tri in &permutation {
        let base = (tri * 3) as u32;
        prepared_index_array.push(base);
        prepared_index_array.push(base + 1);
        prepared_index_array.push(base + 2);
    }

    Ok(prepared_index_array)
}
