use std::sync::Arc;

use crate::config::RemoteConfig;
use crate::error::ConnectionError;
use crate::sink::LogSink;

/// Builds the transport for a remote client from its configuration.
///
/// The logger calls this every time a remote client is (re)constructed.
/// Tests and custom backends install their own; [`default_connector`]
/// builds a Loki push sink.
pub type Connector =
    Arc<dyn Fn(&RemoteConfig) -> Result<Arc<dyn LogSink>, ConnectionError> + Send + Sync>;

/// Connector used when none is supplied explicitly.
pub fn default_connector() -> Connector {
    Arc::new(make_sink_from_config)
}

/// Check the parts of a [`RemoteConfig`] that do not depend on the backend.
pub fn validate(config: &RemoteConfig) -> Result<(), ConnectionError> {
    if config.batch_size == 0 {
        return Err(ConnectionError::InvalidBatchSize);
    }
    if config.batch_wait.is_zero() {
        return Err(ConnectionError::InvalidBatchWait);
    }
    Ok(())
}

/// Extract the scheme of an endpoint, e.g. `http` from `http://host/path`.
pub fn endpoint_scheme(endpoint: &str) -> Result<String, ConnectionError> {
    let trimmed = endpoint.trim();
    match trimmed.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => {
            Ok(scheme.to_ascii_lowercase())
        }
        _ => Err(ConnectionError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "expected <scheme>://<host>[:port]/<path>".to_string(),
        }),
    }
}

/// Create a concrete `LogSink` from a `RemoteConfig`.
///
/// The endpoint is resolved here so that a bad URL is reported at
/// construction time instead of on the first failed push.
pub fn make_sink_from_config(config: &RemoteConfig) -> Result<Arc<dyn LogSink>, ConnectionError> {
    validate(config)?;
    let scheme = endpoint_scheme(&config.endpoint)?;
    if scheme != "http" && scheme != "https" {
        return Err(ConnectionError::UnsupportedScheme(scheme));
    }

    #[cfg(feature = "loki")]
    {
        use crate::loki::LokiSink;
        use reqwest::Url;

        let url = Url::parse(config.endpoint.trim()).map_err(|e| ConnectionError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ConnectionError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: "missing host".to_string(),
            });
        }

        let sink = LokiSink::new(url, config.labels.clone())
            .map_err(|e| ConnectionError::Client(e.to_string()))?;
        Ok(Arc::new(sink) as Arc<dyn LogSink>)
    }

    #[cfg(not(feature = "loki"))]
    {
        Err(ConnectionError::BackendDisabled)
    }
}
