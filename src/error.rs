use thiserror::Error;

/// A bus message that could not be turned into a [`crate::models::Reading`].
///
/// Decode failures are per-message: callers log them and keep consuming.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("payload has no numeric `value` field")]
    MissingValue,

    #[error("topic '{0}' has no sensor kind segment")]
    EmptyKind(String),
}

/// Persistence failure in the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("database worker is no longer running")]
    WorkerGone,

    #[error("stored row is corrupt: {0}")]
    CorruptRow(String),
}

/// The broker could not be reached, or rejected us, before the first
/// successful CONNACK. Always fatal: there is no useful degraded mode
/// without a bus connection, so the process exits non-zero.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("mqtt connection failed: {0}")]
    Transport(#[from] rumqttc::ConnectionError),

    #[error("broker rejected connection: {0:?}")]
    Rejected(rumqttc::ConnectReturnCode),

    #[error("subscribe request failed: {0}")]
    Subscribe(#[from] rumqttc::ClientError),
}

/// Internal fault in the scaling/inference pipeline. Non-fatal: the
/// dashboard renders it as a warning and tries again next cycle.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("feature shape mismatch: artifact expects {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("scaler has a zero-variance column at index {0}")]
    DegenerateScale(usize),
}
