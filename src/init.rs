use crate::layer::FanoutLayer;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Install a [`Registry`] with a [`FanoutLayer::global`] as the global
/// `tracing` subscriber.
///
/// Every `tracing` event in the process is then routed through the
/// process-wide logger set up by [`crate::global::init`]. Events emitted
/// before that logger exists are discarded.
pub fn try_init_tracing() -> Result<(), SetGlobalDefaultError> {
    let subscriber = Registry::default().with(FanoutLayer::global());
    tracing::subscriber::set_global_default(subscriber)
}

/// Like [`try_init_tracing`], but panics if a global subscriber was
/// already installed.
pub fn init_tracing() {
    try_init_tracing().expect("set global subscriber");
}
