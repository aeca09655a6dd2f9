use thiserror::Error;

/// A failure that was isolated during discovery.
///
/// None of these abort a run; they are handed to the [`ErrorSink`] and the
/// failing step contributes nothing.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to enumerate installer products: {error:#}")]
    ProductEnumeration { error: anyhow::Error },

    #[error("collector `{name}` failed: {error:#}")]
    Collector { name: String, error: anyhow::Error },

    #[error("background collector worker panicked: {message}")]
    WorkerPanicked { message: String },

    #[error("enrichment unit `{unit}` failed on `{entry}`: {error:#}")]
    Enrichment {
        unit: String,
        entry: String,
        error: anyhow::Error,
    },

    #[error("uninstaller cache failure: {error:#}")]
    Cache { error: anyhow::Error },

    #[error("startup source `{name}` failed: {error:#}")]
    StartupSource { name: String, error: anyhow::Error },

    #[error("failed to attach startup entries: {error:#}")]
    StartupAttachment { error: anyhow::Error },
}

/// Receives isolated failures for user-facing surfacing.
pub trait ErrorSink {
    fn report(&self, error: &DiscoveryError);
}

impl<F> ErrorSink for F
where
    F: Fn(&DiscoveryError),
{
    fn report(&self, error: &DiscoveryError) {
        self(error)
    }
}

/// Default sink: writes every failure to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, error: &DiscoveryError) {
        log::error!("{}", error);
    }
}

/// Turns a panic payload from a joined thread into a readable message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
