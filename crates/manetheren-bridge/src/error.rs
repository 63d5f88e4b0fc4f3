/// Errors that can occur while bridging the link and local services.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] manetheren_transport::TransportError),

    /// Frame-level error, including service path resolution.
    #[error("frame error: {0}")]
    Frame(#[from] manetheren_frame::FrameError),

    /// The backend HTTP request failed.
    #[error("backend request to {url} failed: {source}")]
    Backend {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Plain I/O error on a local socket or thread spawn.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker pool no longer accepts jobs.
    #[error("worker pool '{0}' is closed")]
    PoolClosed(String),

    /// A bridge loop thread panicked.
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
