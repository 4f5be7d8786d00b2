//! Background region growing for the magic wand.
//!
//! A dedicated thread owns the flood fill so pointer handling never blocks
//! on it. Requests carry their own copy of the layer pixels; the worker
//! never sees project state. Each request gets exactly one response on its
//! own one-shot channel, wrapped in a [`GrowTicket`].

use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::region::{self, DEFAULT_EPSILON};
use crate::selection::Polygon;
use crate::{StudioError, StudioResult};

/// A region-grow job. `pixels` is an owned copy of premultiplied RGBA bytes.
#[derive(Debug, Clone)]
pub struct RegionGrowRequest {
    /// Correlation id, echoed in the response.
    pub id: u64,
    /// Seed in pixel-buffer coordinates.
    pub seed: (i32, i32),
    /// Max per-channel distance from the seed colour.
    pub tolerance: u8,
    /// Buffer width.
    pub width: u32,
    /// Buffer height.
    pub height: u32,
    /// Pixel bytes, moved into the request.
    pub pixels: Vec<u8>,
    /// Simplification tolerance in pixels.
    pub epsilon: f32,
}

impl RegionGrowRequest {
    /// Build a request with the default simplification tolerance.
    #[must_use]
    pub fn new(
        id: u64,
        seed: (i32, i32),
        tolerance: u8,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Self {
        Self {
            id,
            seed,
            tolerance,
            width,
            height,
            pixels,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

/// The worker's answer to one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionGrowResponse {
    /// Id of the request this answers.
    pub id: u64,
    /// Boundary polygons in pixel-buffer coordinates; empty means no region.
    pub polygons: Vec<Polygon>,
}

struct Job {
    request: RegionGrowRequest,
    reply: oneshot::Sender<RegionGrowResponse>,
}

/// Pending result of a submitted request.
#[derive(Debug)]
pub struct GrowTicket {
    id: u64,
    rx: oneshot::Receiver<RegionGrowResponse>,
}

impl GrowTicket {
    /// Id of the request.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Non-blocking poll.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker dropped the request without answering.
    pub fn try_take(&mut self) -> StudioResult<Option<RegionGrowResponse>> {
        match self.rx.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(oneshot::error::TryRecvError::Empty) => Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => Err(StudioError::Worker(format!(
                "region grow request {} was dropped",
                self.id
            ))),
        }
    }

    /// Await the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker dropped the request without answering.
    pub async fn wait(self) -> StudioResult<RegionGrowResponse> {
        let id = self.id;
        self.rx
            .await
            .map_err(|_| StudioError::Worker(format!("region grow request {id} was dropped")))
    }

    /// Block the current thread until the response arrives.
    ///
    /// Must not be called from inside an async runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker dropped the request without answering.
    pub fn blocking_wait(self) -> StudioResult<RegionGrowResponse> {
        let id = self.id;
        self.rx
            .blocking_recv()
            .map_err(|_| StudioError::Worker(format!("region grow request {id} was dropped")))
    }
}

/// Handle to the region-grow thread. Dropping it shuts the thread down.
pub struct RegionGrowWorker {
    tx: Option<mpsc::UnboundedSender<Job>>,
    handle: Option<JoinHandle<()>>,
    next_id: u64,
}

impl std::fmt::Debug for RegionGrowWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionGrowWorker")
            .field("running", &self.tx.is_some())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl RegionGrowWorker {
    /// Start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn() -> StudioResult<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let handle = std::thread::Builder::new()
            .name("region-grow".to_string())
            .spawn(move || {
                while let Some(Job { request, reply }) = rx.blocking_recv() {
                    let polygons = region::region_polygons(
                        &request.pixels,
                        request.width,
                        request.height,
                        request.seed,
                        request.tolerance,
                        request.epsilon,
                    );
                    debug!(
                        id = request.id,
                        polygons = polygons.len(),
                        "Region grow finished"
                    );
                    if reply
                        .send(RegionGrowResponse {
                            id: request.id,
                            polygons,
                        })
                        .is_err()
                    {
                        trace!(id = request.id, "Region grow ticket dropped before reply");
                    }
                }
                trace!("Region grow worker exiting");
            })
            .map_err(|e| StudioError::Worker(format!("failed to spawn region grow worker: {e}")))?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            next_id: 1,
        })
    }

    /// Allocate a fresh correlation id.
    pub fn next_request_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Queue a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread has stopped.
    pub fn submit(&self, request: RegionGrowRequest) -> StudioResult<GrowTicket> {
        let id = request.id;
        let (reply, rx) = oneshot::channel();
        self.tx
            .as_ref()
            .ok_or_else(|| StudioError::Worker("region grow worker stopped".to_string()))?
            .send(Job { request, reply })
            .map_err(|_| StudioError::Worker("region grow worker stopped".to_string()))?;
        debug!(id, "Region grow request submitted");
        Ok(GrowTicket { id, rx })
    }
}

impl Drop for RegionGrowWorker {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Region grow worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_layer() -> (u32, u32, Vec<u8>) {
        let (w, h) = (20_u32, 20_u32);
        let mut px = vec![0_u8; (w * h * 4) as usize];
        for y in 5..15 {
            for x in 5..15 {
                let i = ((y * w + x) * 4) as usize;
                px[i..i + 4].copy_from_slice(&[0, 0, 255, 255]);
            }
        }
        (w, h, px)
    }

    #[test]
    fn test_blocking_round_trip() {
        let mut worker = RegionGrowWorker::spawn().expect("spawn");
        let (w, h, px) = square_layer();
        let id = worker.next_request_id();
        let ticket = worker
            .submit(RegionGrowRequest::new(id, (10, 10), 0, w, h, px))
            .expect("submit");
        assert_eq!(ticket.id(), id);

        let response = ticket.blocking_wait().expect("response");
        assert_eq!(response.id, id);
        assert_eq!(response.polygons.len(), 1);
        assert!((response.polygons[0].area() - 100.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_await_ticket() {
        let mut worker = RegionGrowWorker::spawn().expect("spawn");
        let (w, h, px) = square_layer();
        let id = worker.next_request_id();
        let ticket = worker
            .submit(RegionGrowRequest::new(id, (0, 0), 0, w, h, px))
            .expect("submit");
        let response = ticket.wait().await.expect("response");
        assert!(response.polygons.is_empty());
    }

    #[test]
    fn test_ids_increase() {
        let mut worker = RegionGrowWorker::spawn().expect("spawn");
        let a = worker.next_request_id();
        let b = worker.next_request_id();
        assert!(b > a);
    }
}
