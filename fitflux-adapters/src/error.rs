//! Errors raised while talking to the Fitbit Web API or InfluxDB.

use thiserror::Error;

/// Failure of a Fitbit or InfluxDB call.
///
/// Every variant except [`AdapterError::Config`] comes from a request that
/// was sent or attempted.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The server answered with an unexpected status, or the request could
    /// not be completed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A response body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Parse(String),

    /// Credentials or tokens were refused (HTTP 400/401/403).
    #[error("credentials rejected: {0}")]
    Auth(String),

    /// A Fitbit request was made before a token was obtained.
    #[error("no Fitbit access token; authorize first")]
    NotAuthorized,

    /// The server could not be reached.
    #[error("cannot reach server: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    /// InfluxDB refused a batch.
    #[error("InfluxDB write failed: {0}")]
    Write(String),

    /// The client settings are unusable.
    #[error("invalid client settings: {0}")]
    Config(String),
}

#[cfg(any(feature = "fitbit", feature = "influx"))]
impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return AdapterError::Timeout;
        }

        let target = err
            .url()
            .map(|url| format!("{}://{}", url.scheme(), url.authority()))
            .unwrap_or_else(|| "-".to_string());
        if err.is_connect() {
            AdapterError::Connection(format!("{}: {}", target, err))
        } else {
            AdapterError::Http(format!("{}: {}", target, err))
        }
    }
}
