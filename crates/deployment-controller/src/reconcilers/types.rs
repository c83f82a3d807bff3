use thiserror::Error;

/// Errors raised by a [`DeploymentStore`](super::deployment::store::DeploymentStore).
///
/// A missing object is not an error: `get` reports it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write was based on a stale read and was rejected
    #[error("Conflicting write: {0}")]
    Conflict(String),

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The object cannot be written as given
    #[error("Invalid object: {0}")]
    Invalid(String),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

impl StoreError {
    /// Whether repeating the whole reconcile later may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Conflict(_) | StoreError::Unavailable(_) => true,
            StoreError::Kube(kube::Error::Api(response)) => {
                response.code == 409 || response.code == 429 || response.code >= 500
            }
            StoreError::Kube(_) => true,
            StoreError::Invalid(_) => false,
        }
    }
}

/// Failures while comparing desired and observed state.
#[derive(Debug, Error)]
pub enum ComparisonError {
    /// A required part of the object is absent
    #[error("Required field '{0}' is missing")]
    MissingField(String),

    /// A resource quantity could not be parsed
    #[error("Invalid quantity '{value}' at {path}")]
    InvalidQuantity { path: String, value: String },

    /// A drifted value could not be rendered for reporting
    #[error("Failed to render {path}: {source}")]
    Render {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to fetch deployment {namespace}/{name}: {source}")]
    Fetch {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to compare deployment {namespace}/{name}: {source}")]
    Comparison {
        namespace: String,
        name: String,
        #[source]
        source: ComparisonError,
    },

    #[error("Failed to create deployment {namespace}/{name}: {source}")]
    Create {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to update deployment {namespace}/{name}: {source}")]
    Update {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("Missing object key")]
    MissingObjectKey,
}

impl Error {
    /// Whether the invoking control loop should schedule another attempt
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Fetch { source, .. }
            | Error::Create { source, .. }
            | Error::Update { source, .. } => source.is_retryable(),
            Error::Comparison { .. } | Error::MissingObjectKey => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
