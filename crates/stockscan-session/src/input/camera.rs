//! # Camera Channel
//!
//! Decodes codes from camera frames on a background task.
//!
//! ## Task Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   spawn ──► open ──ok──► decode loop ──frame error──┐                   │
//! │              │  ▲             │                     │                   │
//! │              │  │             │ code decoded        │                   │
//! │              │  │             ▼                     │                   │
//! │              │  │       repeat filter ─► beep ─► InputEvent::Scan       │
//! │              │  │                                   │                   │
//! │         init error      backoff (250ms, 500ms, …) ◄─┘                   │
//! │              │  └──────────── Retry ◄── InitRetry                       │
//! │              │                          │                               │
//! │              │                      Exhausted ─► InputEvent::Fault      │
//! │              │                                   (ScannerInitFailure)   │
//! │   permission denied / no device ───────────────► InputEvent::Fault      │
//! │                                                                         │
//! │   The camera is held by a CameraLease. Dropping the task (abort, end    │
//! │   of loop, panic unwinding) drops the lease, which releases the stream. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use stockscan_core::codes;
use stockscan_core::retry::{InitRetry, RetryStep};
use stockscan_core::{ScanEvent, ScanSource};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::CameraSettings;
use crate::error::SessionError;
use crate::input::{InputEvent, InputMode};

// =============================================================================
// Camera Abstraction
// =============================================================================

/// Low-level camera failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Access refused; retrying will not help.
    PermissionDenied,
    /// No device; retrying will not help.
    NotFound,
    /// The device or decoder failed; worth another attempt.
    Device(String),
}

/// A frame source with a barcode decoder behind it.
pub trait Camera: Send + 'static {
    /// Acquires the stream.
    fn open(&mut self) -> impl Future<Output = Result<(), CameraError>> + Send;

    /// Grabs and decodes one frame; `None` when no code is visible.
    fn decode_frame(&mut self) -> impl Future<Output = Result<Option<String>, CameraError>> + Send;

    /// Stops decoding and releases the stream. Must be idempotent.
    fn release(&mut self);
}

/// Hands out a fresh camera each time camera mode starts.
pub trait CameraSource: Send + Sync + 'static {
    type Camera: Camera;

    fn camera(&self) -> Self::Camera;
}

impl<F, C> CameraSource for F
where
    F: Fn() -> C + Send + Sync + 'static,
    C: Camera,
{
    type Camera = C;

    fn camera(&self) -> C {
        self()
    }
}

/// A device without a camera.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCamera;

impl Camera for NoCamera {
    async fn open(&mut self) -> Result<(), CameraError> {
        Err(CameraError::NotFound)
    }

    async fn decode_frame(&mut self) -> Result<Option<String>, CameraError> {
        Err(CameraError::NotFound)
    }

    fn release(&mut self) {}
}

/// The confirmation tone played on every decoded code.
pub trait ScanFeedback: Send + Sync + 'static {
    fn confirm(&self);
}

/// No sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentFeedback;

impl ScanFeedback for SilentFeedback {
    fn confirm(&self) {}
}

// =============================================================================
// Camera Lease
// =============================================================================

/// Scoped ownership of an open camera; releases it on drop.
struct CameraLease<C: Camera> {
    camera: C,
}

impl<C: Camera> CameraLease<C> {
    fn new(camera: C) -> Self {
        CameraLease { camera }
    }
}

impl<C: Camera> std::ops::Deref for CameraLease<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.camera
    }
}

impl<C: Camera> std::ops::DerefMut for CameraLease<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.camera
    }
}

impl<C: Camera> Drop for CameraLease<C> {
    fn drop(&mut self) {
        self.camera.release();
        debug!("Camera released");
    }
}

// =============================================================================
// Repeat Filter
// =============================================================================

/// Consecutive frames decode the same label; emit it once per cooldown.
#[derive(Debug)]
pub struct RepeatFilter {
    cooldown: Duration,
    last: Option<(String, Instant)>,
}

impl RepeatFilter {
    pub fn new(cooldown: Duration) -> Self {
        RepeatFilter {
            cooldown,
            last: None,
        }
    }

    /// True if `code` seen at `at` should be emitted.
    pub fn admit(&mut self, code: &str, at: Instant) -> bool {
        if let Some((last, seen_at)) = &self.last {
            if codes::same_code(last, code)
                && at.saturating_duration_since(*seen_at) < self.cooldown
            {
                return false;
            }
        }
        self.last = Some((code.to_string(), at));
        true
    }
}

// =============================================================================
// Camera Task
// =============================================================================

/// Handle to a running camera task. Dropping it aborts the task.
#[derive(Debug)]
pub struct CameraTask {
    handle: Option<JoinHandle<()>>,
}

impl CameraTask {
    /// Spawns the decode loop for `camera`.
    pub fn spawn<C: Camera>(
        camera: C,
        settings: CameraSettings,
        events: mpsc::Sender<InputEvent>,
        feedback: Arc<dyn ScanFeedback>,
    ) -> Self {
        let handle = tokio::spawn(run_camera(camera, settings, events, feedback));
        CameraTask {
            handle: Some(handle),
        }
    }

    /// Stops the task and waits until the camera has been released.
    pub async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            // Cancelled is the expected outcome.
            let _ = handle.await;
        }
    }

    /// True once the loop has ended on its own (fatal fault or closed channel).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl Drop for CameraTask {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

fn init_backoff(settings: &CameraSettings) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: settings.retry_backoff(),
        max_interval: settings.retry_backoff() * 8,
        multiplier: 2.0,
        max_elapsed_time: None,
        ..Default::default()
    }
}

async fn run_camera<C: Camera>(
    camera: C,
    settings: CameraSettings,
    events: mpsc::Sender<InputEvent>,
    feedback: Arc<dyn ScanFeedback>,
) {
    let mut lease = CameraLease::new(camera);
    let mut retry = InitRetry::new(settings.max_init_attempts);
    let mut backoff = init_backoff(&settings);
    let mut repeats = RepeatFilter::new(settings.repeat_cooldown());

    loop {
        let failure = match lease.open().await {
            Ok(()) => {
                info!("Camera stream opened");
                backoff.reset();
                let decoded = decode_until_failure(
                    &mut lease,
                    &settings,
                    &events,
                    &*feedback,
                    &mut repeats,
                    &mut retry,
                )
                .await;
                match decoded {
                    Some(e) => e,
                    None => {
                        debug!("Scan receiver closed; camera task ending");
                        return;
                    }
                }
            }
            Err(e) => e,
        };

        let fatal = match failure {
            CameraError::PermissionDenied => SessionError::CameraPermissionDenied,
            CameraError::NotFound => SessionError::CameraNotFound,
            CameraError::Device(reason) => {
                lease.release();
                match retry.record_failure() {
                    RetryStep::Retry { attempt } => {
                        let delay = backoff.next_backoff().unwrap_or(settings.retry_backoff());
                        warn!(attempt, reason = %reason, ?delay, "Camera failed; retrying");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    RetryStep::Exhausted { attempts } => {
                        SessionError::ScannerInitFailure { attempts }
                    }
                }
            }
        };

        error!(error = %fatal, "Camera unavailable");
        // The receiver may already be gone if the session closed.
        let _ = events
            .send(InputEvent::Fault {
                mode: InputMode::Camera,
                error: fatal,
            })
            .await;
        return;
    }
}

/// Runs the frame loop until the camera fails (`Some`) or the receiver goes
/// away (`None`).
async fn decode_until_failure<C: Camera>(
    lease: &mut CameraLease<C>,
    settings: &CameraSettings,
    events: &mpsc::Sender<InputEvent>,
    feedback: &dyn ScanFeedback,
    repeats: &mut RepeatFilter,
    retry: &mut InitRetry,
) -> Option<CameraError> {
    let mut ticker = tokio::time::interval(settings.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match lease.decode_frame().await {
            Ok(Some(raw)) => {
                retry.reset();
                let code = codes::normalize(&raw);
                if code.is_empty() || !repeats.admit(&code, Instant::now()) {
                    continue;
                }

                feedback.confirm();
                debug!(code = %code, "Camera decoded code");
                let event = InputEvent::Scan(ScanEvent::new(code, ScanSource::Camera));
                if events.send(event).await.is_err() {
                    return None;
                }
            }
            Ok(None) => retry.reset(),
            Err(e) => return Some(e),
        }
    }
}
