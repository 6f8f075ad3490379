//! Console and log-file output built on [`tracing`].

mod logger;
mod subscriber;
mod summary;
mod utils;

pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use summary::{ItemRecord, ItemStatus, Summary};

/// A [`Logger`] whose events go to a fresh log file in a temporary
/// directory through a thread-local subscriber.
///
/// Keep the returned guard alive for the duration of the test.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::layer::SubscriberExt as _;
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("test.log");
    let file = subscriber::open_log_file(&path).expect("failed to open log file");
    let log = Logger::with_log_file(&path);
    let subscriber = tracing_subscriber::registry().with(subscriber::file_layer(file));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (log, tmp, guard)
}
