//! Error taxonomy shared by every stage of the pipeline.

/// Errors that can occur while planning, collecting, or transforming a run.
#[derive(Debug, thiserror::Error)]
pub enum GridScoutError {
    /// Bad grid parameters, coordinates, or region selectors.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Coordinate math evaluated where it has no finite answer (at a pole).
    #[error("degenerate geometry: {0}")]
    GeometryDegenerate(String),

    /// A place record is missing a field every downstream step needs.
    #[error("malformed record {id}: {reason}")]
    MalformedRecord {
        /// Identity of the offending record.
        id: String,
        /// What was missing.
        reason: String,
    },

    /// The places or region service failed or answered with an unexpected shape.
    #[error("external service error: {message}")]
    ExternalService {
        /// Description of the failure.
        message: String,
        /// Systemic failures (bad credentials) abort the whole run.
        fatal: bool,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON parse error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GridScoutError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// A failure scoped to a single request; the run may continue.
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self::ExternalService {
            message: message.into(),
            fatal: false,
        }
    }

    /// A failure that makes every further request pointless.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::ExternalService {
            message: message.into(),
            fatal: true,
        }
    }

    /// Whether this error should abort a collection run instead of being
    /// recorded against the point that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ExternalService { fatal: true, .. })
    }
}

pub type Result<T> = std::result::Result<T, GridScoutError>;
