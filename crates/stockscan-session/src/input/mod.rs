//! # Input Mode Arbiter
//!
//! Exactly one input channel is live at a time.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            switch_to(mode)                                              │
//! │                  │                                                      │
//! │                  ▼                                                      │
//! │        teardown current mode ──► camera task aborted + awaited          │
//! │                  │               keystroke listener detached            │
//! │                  ▼                                                      │
//! │        ┌─────────┴──────────┬─────────────────────┐                     │
//! │        ▼                    ▼                     ▼                     │
//! │     Camera              External               Manual                   │
//! │   CameraTask          KeystrokeListener      submit_manual              │
//! │        │                    │                     │                     │
//! │        └────────────────────┴──────────┬──────────┘                     │
//! │                                        ▼                                │
//! │                           mpsc<InputEvent> (FIFO)                       │
//! │                                                                         │
//! │   Camera fault ──► InputEvent::Fault ──► session calls                  │
//! │                                          degrade_to_manual()            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod camera;
pub mod keyboard;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stockscan_core::{codes, ScanEvent, ScanSource};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::{CameraSettings, ScanConfig};
use crate::error::{SessionError, SessionResult};

pub use camera::{
    Camera, CameraError, CameraSource, CameraTask, NoCamera, ScanFeedback, SilentFeedback,
};
pub use keyboard::{KeyInput, KeystrokeListener};

/// Capacity of the scan event queue.
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// The three ways a code can enter the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    Camera,
    External,
    Manual,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::Camera => write!(f, "camera"),
            InputMode::External => write!(f, "external scanner"),
            InputMode::Manual => write!(f, "manual"),
        }
    }
}

/// What the input side delivers to the session.
#[derive(Debug)]
pub enum InputEvent {
    /// A code to resolve.
    Scan(ScanEvent),
    /// A channel failed for good; the session should fall back to manual entry.
    Fault { mode: InputMode, error: SessionError },
}

/// Live input channel state.
#[derive(Debug)]
enum Active {
    Idle,
    Camera(CameraTask),
    External,
    Manual,
}

/// Owns the input channels and makes sure only one of them is live.
pub struct InputArbiter<P: CameraSource> {
    cameras: P,
    camera_settings: CameraSettings,
    keyboard: KeystrokeListener,
    feedback: Arc<dyn ScanFeedback>,
    events: mpsc::Sender<InputEvent>,
    active: Active,
}

impl<P: CameraSource> InputArbiter<P> {
    /// Creates an idle arbiter that delivers into `events`.
    pub fn new(
        cameras: P,
        config: &ScanConfig,
        feedback: Arc<dyn ScanFeedback>,
        events: mpsc::Sender<InputEvent>,
    ) -> Self {
        InputArbiter {
            cameras,
            camera_settings: config.camera.clone(),
            keyboard: KeystrokeListener::new(config.max_key_gap(), config.keyboard.min_code_len),
            feedback,
            events,
            active: Active::Idle,
        }
    }

    /// Replaces the confirmation tone used by camera sessions started later.
    pub fn set_feedback(&mut self, feedback: Arc<dyn ScanFeedback>) {
        self.feedback = feedback;
    }

    /// The live mode, `None` while idle.
    pub fn mode(&self) -> Option<InputMode> {
        match self.active {
            Active::Idle => None,
            Active::Camera(_) => Some(InputMode::Camera),
            Active::External => Some(InputMode::External),
            Active::Manual => Some(InputMode::Manual),
        }
    }

    /// Tears the current mode down, then starts `mode`.
    ///
    /// Switching to the mode already live restarts it.
    pub async fn switch_to(&mut self, mode: InputMode) {
        self.teardown().await;

        self.active = match mode {
            InputMode::Camera => {
                let camera = self.cameras.camera();
                Active::Camera(CameraTask::spawn(
                    camera,
                    self.camera_settings.clone(),
                    self.events.clone(),
                    Arc::clone(&self.feedback),
                ))
            }
            InputMode::External => {
                self.keyboard.attach();
                Active::External
            }
            InputMode::Manual => Active::Manual,
        };
        info!(mode = %mode, "Input mode switched");
    }

    /// Stops whatever is live. After this returns no camera resource is held.
    pub async fn teardown(&mut self) {
        match std::mem::replace(&mut self.active, Active::Idle) {
            Active::Camera(task) => {
                task.stop().await;
                debug!("Camera mode torn down");
            }
            Active::External => {
                self.keyboard.detach();
                debug!("Keystroke listener detached");
            }
            Active::Manual | Active::Idle => {}
        }
    }

    /// Drops to manual entry after a hardware fault.
    pub async fn degrade_to_manual(&mut self) {
        if self.mode() != Some(InputMode::Manual) {
            self.switch_to(InputMode::Manual).await;
        }
    }

    /// Feeds a key from the window's keyboard handler.
    ///
    /// ## Returns
    /// `Ok(true)` when the key completed a scanner burst and a scan was queued.
    ///
    /// ## Errors
    /// [`SessionError::ModeInactive`] unless the external scanner is live.
    pub fn key(&mut self, key: KeyInput) -> SessionResult<bool> {
        if !matches!(self.active, Active::External) {
            return Err(SessionError::ModeInactive {
                mode: InputMode::External.to_string(),
            });
        }

        match self.keyboard.handle_key(key, Instant::now()) {
            Some(event) => {
                self.enqueue(event)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Queues a code typed into the manual entry field.
    ///
    /// Blank input is ignored and returns `Ok(false)`.
    pub fn submit_manual(&mut self, text: &str) -> SessionResult<bool> {
        if !matches!(self.active, Active::Manual) {
            return Err(SessionError::ModeInactive {
                mode: InputMode::Manual.to_string(),
            });
        }

        let code = codes::normalize(text);
        if code.is_empty() {
            return Ok(false);
        }
        self.enqueue(ScanEvent::new(code, ScanSource::Manual))?;
        Ok(true)
    }

    fn enqueue(&self, event: ScanEvent) -> SessionResult<()> {
        self.events
            .try_send(InputEvent::Scan(event))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Closed(_) => SessionError::SessionClosed,
                mpsc::error::TrySendError::Full(_) => SessionError::QueueFull,
            })
    }
}

impl<P: CameraSource> fmt::Debug for InputArbiter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputArbiter")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
