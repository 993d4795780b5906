//! Single-writer frame pipeline.
//!
//! One worker task owns the [`IdentityTracker`]; frames and enrollment
//! requests reach it over channels, so no two frames ever interleave
//! their reads and writes of the same track. Consumers receive only
//! immutable per-frame snapshots.

use std::time::Instant;

use glance_core::{
    Embedding, EnrollError, EnrollOutcome, IdentityTracker, LoginConfirmation, ObservedFace, Rect,
    TrackedFace,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::EngineConfig;
use crate::extractor::{EmbeddingExtractor, FaceCrop};
use crate::geometry;

const LOGIN_CHANNEL_CAPACITY: usize = 16;
const REQUEST_CHANNEL_CAPACITY: usize = 4;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Enroll(#[from] EnrollError),
    #[error("engine worker exited")]
    ChannelClosed,
}

/// One face detection as delivered by the external frame source.
#[derive(Debug, Clone)]
pub struct Detection {
    pub tracking_id: u32,
    /// Bounding box in source pixel space.
    pub bounding_box: Rect,
    pub rotation_degrees: i32,
    pub crop: FaceCrop,
}

/// One frame's worth of detections.
#[derive(Debug, Clone)]
pub struct FramePayload {
    pub detections: Vec<Detection>,
    /// Source frame dimensions, for screen-space scaling.
    pub camera_size: (u32, u32),
}

/// Immutable snapshot published after each processed frame. `seq` counts
/// processed frames; dropped or abandoned frames are simply absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub seq: u64,
    pub tracks: Vec<TrackedFace>,
}

enum EngineRequest {
    Enroll {
        name: String,
        identity_id: u32,
        embedding: Embedding,
        tracking_id: u32,
        reply: oneshot::Sender<Result<EnrollOutcome, EnrollError>>,
    },
}

/// Clone-safe handle to the engine worker.
#[derive(Clone)]
pub struct EngineHandle {
    frame_tx: watch::Sender<Option<FramePayload>>,
    request_tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Submit the newest frame. If the worker is still busy with the
    /// previous frame, this replaces whatever frame was pending: the
    /// pipeline keeps at most the latest unprocessed frame and never
    /// queues beyond that.
    pub fn submit_frame(&self, frame: FramePayload) {
        if self.frame_tx.send(Some(frame)).is_err() {
            tracing::warn!("engine worker gone; dropping frame");
        }
    }

    /// Enroll or merge an identity and bind the supplied track to it.
    /// Invoked interactively, e.g. for an operator selecting a
    /// still-unknown detected face.
    pub async fn enroll(
        &self,
        name: &str,
        identity_id: u32,
        embedding: Embedding,
        tracking_id: u32,
    ) -> Result<EnrollOutcome, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request_tx
            .send(EngineRequest::Enroll {
                name: name.to_string(),
                identity_id,
                embedding,
                tracking_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        let outcome = reply_rx.await.map_err(|_| EngineError::ChannelClosed)?;
        Ok(outcome?)
    }
}

/// Spawn the engine worker task.
///
/// Returns the request handle, the snapshot watch (holding an empty
/// snapshot until the first frame is processed), and the login event
/// receiver.
pub fn spawn_engine<E: EmbeddingExtractor>(
    config: EngineConfig,
    extractor: E,
) -> (
    EngineHandle,
    watch::Receiver<FrameSnapshot>,
    mpsc::Receiver<LoginConfirmation>,
) {
    let (frame_tx, frame_rx) = watch::channel(None);
    let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(FrameSnapshot::default());
    let (login_tx, login_rx) = mpsc::channel(LOGIN_CHANNEL_CAPACITY);

    let worker = Worker {
        tracker: IdentityTracker::new(config.tracker_config()),
        extractor,
        config,
        snapshot_tx,
        login_tx,
        seq: 0,
    };

    tokio::spawn(worker.run(frame_rx, request_rx));

    (
        EngineHandle {
            frame_tx,
            request_tx,
        },
        snapshot_rx,
        login_rx,
    )
}

struct Worker<E> {
    tracker: IdentityTracker,
    extractor: E,
    config: EngineConfig,
    snapshot_tx: watch::Sender<FrameSnapshot>,
    login_tx: mpsc::Sender<LoginConfirmation>,
    seq: u64,
}

impl<E: EmbeddingExtractor> Worker<E> {
    async fn run(
        mut self,
        mut frame_rx: watch::Receiver<Option<FramePayload>>,
        mut request_rx: mpsc::Receiver<EngineRequest>,
    ) {
        tracing::info!("engine worker started");
        loop {
            tokio::select! {
                changed = frame_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let frame = frame_rx.borrow_and_update().clone();
                    if let Some(frame) = frame {
                        self.process_frame(frame).await;
                    }
                }
                request = request_rx.recv() => {
                    match request {
                        Some(request) => self.handle_request(request),
                        None => break,
                    }
                }
            }
        }
        tracing::info!("engine worker exiting");
    }

    fn handle_request(&mut self, request: EngineRequest) {
        match request {
            EngineRequest::Enroll {
                name,
                identity_id,
                embedding,
                tracking_id,
                reply,
            } => {
                let result = self.tracker.enroll(
                    &name,
                    identity_id,
                    embedding,
                    tracking_id,
                    Instant::now(),
                );
                if let Err(err) = &result {
                    tracing::warn!(identity_id, error = %err, "enrollment rejected");
                }
                let _ = reply.send(result);
            }
        }
    }

    /// One frame pass: extraction (timeout-wrapped, nothing committed),
    /// then match + sweep + login scan in one commit, then publish.
    async fn process_frame(&mut self, frame: FramePayload) {
        let deadline = self.config.frame_timeout;
        let observed = match tokio::time::timeout(deadline, self.extract_all(&frame)).await {
            Ok(observed) => observed,
            Err(_) => {
                // Nothing was committed for this frame; the pipeline
                // simply proceeds to the next one.
                tracing::warn!(
                    timeout_ms = deadline.as_millis() as u64,
                    "frame pass timed out; abandoning frame"
                );
                return;
            }
        };

        let resolution = self.tracker.observe_frame(&observed, Instant::now());

        self.seq += 1;
        let _ = self.snapshot_tx.send(FrameSnapshot {
            seq: self.seq,
            tracks: resolution.tracks,
        });

        for login in resolution.logins {
            // The writer never blocks on a slow consumer.
            if let Err(err) = self.login_tx.try_send(login) {
                tracing::warn!(error = %err, "login event dropped");
            }
        }
    }

    /// Run the extractor over every detection. A failed extraction drops
    /// only that detection; the rest of the frame still processes.
    async fn extract_all(&mut self, frame: &FramePayload) -> Vec<ObservedFace> {
        let mut observed = Vec::with_capacity(frame.detections.len());

        for detection in &frame.detections {
            let embedding = match self
                .extractor
                .extract(&detection.crop, detection.rotation_degrees)
                .await
            {
                Ok(embedding) => embedding,
                Err(err) => {
                    tracing::warn!(
                        tracking_id = detection.tracking_id,
                        error = %err,
                        "embedding extraction failed; dropping detection"
                    );
                    continue;
                }
            };

            if embedding.len() != self.config.embedding_dim {
                tracing::debug!(
                    tracking_id = detection.tracking_id,
                    got = embedding.len(),
                    expected = self.config.embedding_dim,
                    "unexpected embedding length"
                );
            }

            let screen_box = geometry::scale_to_screen(
                detection.bounding_box,
                frame.camera_size,
                self.config.screen_size,
                detection.rotation_degrees,
            );

            observed.push(ObservedFace {
                tracking_id: detection.tracking_id,
                bounding_box: screen_box,
                embedding,
            });
        }

        observed
    }
}
