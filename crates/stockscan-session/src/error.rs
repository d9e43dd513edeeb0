//! # Session Error Types
//!
//! Error types for the scan session runtime, and the notice shape the UI
//! displays for them.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Hardware     │  │      Persistence        │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  CameraPermis-  │  │  Persistence            │ │
//! │  │  ConfigLoad…    │  │   sionDenied    │  │  NotFound               │ │
//! │  │  ConfigSave…    │  │  CameraNotFound │  │  StockConflict          │ │
//! │  │                 │  │  ScannerInit…   │  │  StockPending           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │     Domain      │  │    Lifecycle    │                              │
//! │  │                 │  │                 │                              │
//! │  │  Core           │  │  SessionClosed  │                              │
//! │  │  Rejected       │  │  ModeInactive   │                              │
//! │  │  CodesAlready…  │  │  QueueFull      │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Hardware errors never block the workflow: the arbiter drops to manual
//! entry and the operator sees an [`OperatorNotice`].

use serde::{Deserialize, Serialize};
use stockscan_core::stock::StockAdjustment;
use stockscan_core::{CoreError, ScanRejection};
use stockscan_db::DbError;
use thiserror::Error;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Everything that can go wrong outside the pure core.
#[derive(Debug, Error)]
pub enum SessionError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid scan configuration.
    #[error("Invalid scan configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Hardware Errors
    // =========================================================================
    /// The operator (or the platform) refused camera access.
    #[error("Camera permission denied")]
    CameraPermissionDenied,

    /// No camera device is present.
    #[error("No camera found")]
    CameraNotFound,

    /// The camera scanner kept failing to start.
    #[error("Scanner failed to start after {attempts} attempts; switch to manual entry")]
    ScannerInitFailure { attempts: u32 },

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// Any backend read or write failed.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The stock counter kept changing under a compare-and-set write.
    #[error("Stock for {product} changed concurrently {attempts} times; write abandoned")]
    StockConflict { product: String, attempts: u32 },

    /// The lines are stored but some stock counters were not moved.
    ///
    /// ## When This Occurs
    /// A compare-and-set write failed after the batch insert. The transaction
    /// counts as committed; only `pending` still has to be applied.
    #[error(
        "Transaction {transaction_id} stored; stock not yet adjusted for {}: {reason}",
        product_names(.pending)
    )]
    StockPending {
        transaction_id: String,
        line_ids: Vec<String>,
        pending: Vec<StockAdjustment>,
        reason: String,
    },

    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// Business rule violation from the core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A code typed or scanned by the operator was refused.
    #[error(transparent)]
    Rejected(#[from] ScanRejection),

    /// Commit-time re-check found units that were sold meanwhile.
    #[error("Units already sold: {}", .codes.join(", "))]
    CodesAlreadySold { codes: Vec<String> },

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    /// The session has been closed; late results are discarded.
    #[error("Scan session is closed")]
    SessionClosed,

    /// Input arrived for a mode that is not the live one.
    #[error("{mode} input is not active")]
    ModeInactive { mode: String },

    /// Input arrives faster than the session drains it.
    #[error("Scan queue is full; wait for pending scans to be processed")]
    QueueFull,
}

fn product_names(adjustments: &[StockAdjustment]) -> String {
    adjustments
        .iter()
        .map(|a| a.product_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<DbError> for SessionError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => SessionError::NotFound { entity, id },
            DbError::InvalidData(validation) => SessionError::Core(validation.into()),
            other => SessionError::Persistence(other.to_string()),
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SessionError {
    fn from(err: toml::de::Error) -> Self {
        SessionError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SessionError {
    fn from(err: toml::ser::Error) -> Self {
        SessionError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SessionError {
    /// Machine-readable code for operator notices.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::InvalidConfig(_)
            | SessionError::ConfigLoadFailed(_)
            | SessionError::ConfigSaveFailed(_) => "CONFIG_ERROR",
            SessionError::CameraPermissionDenied => "CAMERA_PERMISSION_DENIED",
            SessionError::CameraNotFound => "CAMERA_NOT_FOUND",
            SessionError::ScannerInitFailure { .. } => "SCANNER_INIT_FAILURE",
            SessionError::Persistence(_) => "PERSISTENCE_FAILURE",
            SessionError::NotFound { .. } => "NOT_FOUND",
            SessionError::StockConflict { .. } => "STOCK_CONFLICT",
            SessionError::StockPending { .. } => "STOCK_PENDING",
            SessionError::Core(CoreError::InsufficientStock { .. }) => "INSUFFICIENT_STOCK",
            SessionError::Core(CoreError::Validation(_)) => "VALIDATION_ERROR",
            SessionError::Core(_) => "INVALID_OPERATION",
            SessionError::Rejected(rejection) => rejection.code(),
            SessionError::CodesAlreadySold { .. } => "ALREADY_SOLD",
            SessionError::SessionClosed => "SESSION_CLOSED",
            SessionError::ModeInactive { .. } => "MODE_INACTIVE",
            SessionError::QueueFull => "QUEUE_FULL",
        }
    }

    /// True for camera faults, which degrade input to manual entry.
    pub fn is_hardware_fault(&self) -> bool {
        matches!(
            self,
            SessionError::CameraPermissionDenied
                | SessionError::CameraNotFound
                | SessionError::ScannerInitFailure { .. }
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidConfig(_)
                | SessionError::ConfigLoadFailed(_)
                | SessionError::ConfigSaveFailed(_)
        )
    }
}

// =============================================================================
// Operator Notice
// =============================================================================

/// What the UI shows the operator for a rejection, warning or fault.
///
/// ## Serialization
/// ```json
/// {
///   "code": "ALREADY_SOLD",
///   "message": "Unit 356938035643809 has already been sold"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorNotice {
    /// Machine-readable code (SCREAMING_SNAKE_CASE).
    pub code: String,

    /// Human-readable message for display.
    pub message: String,
}

impl OperatorNotice {
    /// Creates a new notice.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        OperatorNotice {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The sold-unit lookup failed; scanning continues on a stale snapshot.
    pub fn cache_unavailable(reason: impl std::fmt::Display) -> Self {
        OperatorNotice::new(
            "CACHE_UNAVAILABLE",
            format!("Sold-unit check unavailable ({reason}); sold units may not be detected"),
        )
    }
}

impl From<&ScanRejection> for OperatorNotice {
    fn from(rejection: &ScanRejection) -> Self {
        OperatorNotice::new(rejection.code(), rejection.to_string())
    }
}

impl From<&SessionError> for OperatorNotice {
    fn from(err: &SessionError) -> Self {
        OperatorNotice::new(err.code(), err.to_string())
    }
}
