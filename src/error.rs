use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::id::{ListingId, TaskNumber, TransactionId};
use crate::domain::transaction::TransactionState;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors from a single automated source call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source answered with a non-2xx status.
    #[error("source call failed with status {status}: {body}")]
    CallFailed { status: u16, body: String },

    /// The deadline elapsed after the request was dispatched.
    #[error("source call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The credential handle could not be resolved, or a required one is absent.
    #[error("credential {reference} could not be resolved")]
    CredentialMissing { reference: String },

    /// No connection could be established; the request never reached the source.
    #[error("source unreachable: {0}")]
    Unreachable(String),

    /// The source answered 2xx with a body that is not usable.
    #[error("failed to decode source response: {0}")]
    Decode(String),
}

impl SourceError {
    /// Stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::CallFailed { .. } => "SOURCE_CALL_FAILED",
            Self::Timeout { .. } => "SOURCE_TIMEOUT",
            Self::CredentialMissing { .. } => "CREDENTIAL_MISSING",
            Self::Unreachable(_) => "SOURCE_UNREACHABLE",
            Self::Decode(_) => "SOURCE_DECODE",
        }
    }
}

/// Manual queue errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("task {0} not found")]
    TaskNotFound(TaskNumber),

    #[error("task {0} is already completed")]
    TaskAlreadyCompleted(TaskNumber),

    /// The sale behind the task was refunded; it can no longer be delivered.
    #[error("task {0} was cancelled")]
    TaskCancelled(TaskNumber),

    #[error("queue unavailable: {0}")]
    Unavailable(String),
}

impl QueueError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::TaskNotFound(_) => "TASK_NOT_FOUND",
            Self::TaskAlreadyCompleted(_) => "TASK_ALREADY_COMPLETED",
            Self::TaskCancelled(_) => "TASK_CANCELLED",
            Self::Unavailable(_) => "QUEUE_UNAVAILABLE",
        }
    }
}

impl From<std::io::Error> for QueueError {
    fn from(err: std::io::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Transaction store errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("transaction {0} not found")]
    NotFound(TransactionId),

    /// The compare-and-set lost: the persisted state was not the expected one.
    #[error("transaction {id} is {actual}, expected {expected}")]
    StateMismatch {
        id: TransactionId,
        expected: TransactionState,
        actual: TransactionState,
    },

    #[error("transaction {0} already has an output")]
    OutputAlreadySet(TransactionId),

    #[error("transaction {0} already exists")]
    Duplicate(TransactionId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Payment processor refund errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefundError {
    #[error("refund rejected by processor ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("refund call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("refund transport error: {0}")]
    Transport(String),
}

/// Router-level errors surfaced to callers of `process`, `complete_manual`,
/// and `refund`.
#[derive(Error, Debug)]
pub enum FulfillmentError {
    #[error("transaction {0} not found")]
    TransactionNotFound(TransactionId),

    #[error("listing {0} not found")]
    ListingNotFound(ListingId),

    /// The catalog could not be read. Nothing has been charged yet.
    #[error("listing catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Single-flight rejection: fulfillment or a refund is already in flight.
    #[error("transaction {id} is already being processed ({state})")]
    AlreadyProcessing {
        id: TransactionId,
        state: TransactionState,
    },

    #[error("transaction {id} is already {state}")]
    AlreadyTerminal {
        id: TransactionId,
        state: TransactionState,
    },

    #[error("transaction {id} is {state}, expected {expected}")]
    WrongState {
        id: TransactionId,
        state: TransactionState,
        expected: TransactionState,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The refund path errored; the transaction is `REFUND_FAILED`.
    #[error("refund failed for transaction {id}: {source}")]
    RefundFailed {
        id: TransactionId,
        #[source]
        source: RefundError,
    },
}

impl FulfillmentError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::ListingNotFound(_) => "LISTING_NOT_FOUND",
            Self::CatalogUnavailable(_) => "CATALOG_UNAVAILABLE",
            Self::AlreadyProcessing { .. } => "ALREADY_PROCESSING",
            Self::AlreadyTerminal { .. } => "ALREADY_TERMINAL",
            Self::WrongState { .. } => "WRONG_STATE",
            Self::Domain(DomainError::UnsupportedPlatform { .. }) => "UNSUPPORTED_PLATFORM",
            Self::Domain(e) if e.is_invalid_input() => "INVALID_INPUT",
            Self::Domain(_) => "DOMAIN",
            Self::Source(e) => e.code(),
            Self::Queue(e) => e.code(),
            Self::Store(_) => "STORE",
            Self::RefundFailed { .. } => "REFUND_FAILED",
        }
    }

    /// True only for infrastructure failures that happened before any money
    /// moved on the source side.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Queue(QueueError::Unavailable(_)) | Self::CatalogUnavailable(_)
        )
    }

    /// Translate a store error, turning a lost compare-and-set into the
    /// single-flight rejection the caller should see.
    #[must_use]
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::TransactionNotFound(id),
            StoreError::StateMismatch {
                id,
                expected,
                actual,
            } => Self::conflict(id, actual, expected),
            other => Self::Store(other),
        }
    }

    /// Rejection for an operation that needs `expected` but found `state`.
    #[must_use]
    pub fn conflict(id: TransactionId, state: TransactionState, expected: TransactionState) -> Self {
        if state.is_in_flight() {
            Self::AlreadyProcessing { id, state }
        } else if state.is_terminal() {
            Self::AlreadyTerminal { id, state }
        } else {
            Self::WrongState {
                id,
                state,
                expected,
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
