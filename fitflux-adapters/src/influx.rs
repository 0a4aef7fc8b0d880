//! InfluxDB 1.x adapter using the HTTP API.
//!
//! Batches are encoded as line protocol and posted to `/write` with the
//! batch's database and precision. Credentials, when set, are sent with HTTP
//! basic auth.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fitflux_adapters::influx::InfluxClient;
//!
//! let influx = InfluxClient::builder()
//!     .endpoint("http://localhost:8086")
//!     .credentials("admin", "secret")
//!     .database("fitbit")
//!     .connect()
//!     .await?;
//!
//! influx.write_batch(&batch).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::debug;

use fitflux_pipeline::SeriesSink;
use fitflux_types::Batch;

use crate::AdapterError;

/// InfluxDB HTTP client.
#[derive(Debug, Clone)]
pub struct InfluxClient {
    client: Client,
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
    database: String,
}

impl InfluxClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> InfluxClientBuilder {
        InfluxClientBuilder::default()
    }

    /// The database this client was configured for.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Check that the server is reachable and accepts the credentials.
    pub async fn check_connection(&self) -> Result<(), AdapterError> {
        let url = format!("{}/query", self.endpoint);

        let response = self
            .authorize(self.client.get(&url))
            .query(&[("q", "SHOW DATABASES")])
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AdapterError::Auth("Invalid credentials".to_string()))
            }
            status if status.is_success() => Ok(()),
            status => Err(AdapterError::Connection(format!(
                "{} returned status {}",
                self.endpoint, status
            ))),
        }
    }

    /// Write a batch in a single request.
    ///
    /// The batch must target the database the client was built for.
    pub async fn write_batch(&self, batch: &Batch) -> Result<(), AdapterError> {
        if batch.database() != self.database {
            return Err(AdapterError::Config(format!(
                "batch for database '{}' sent to client for '{}'",
                batch.database(),
                self.database
            )));
        }

        let url = format!("{}/write", self.endpoint);
        let body = batch.to_line_protocol();

        debug!(
            "Writing {} points ({} bytes) to {}",
            batch.len(),
            body.len(),
            self.database
        );

        let response = self
            .authorize(self.client.post(&url))
            .query(&[
                ("db", self.database.as_str()),
                ("precision", batch.precision().as_query()),
            ])
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AdapterError::Auth("Invalid credentials".to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Write(write_error_message(status, &body)));
        }

        Ok(())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_ref()),
            None => request,
        }
    }
}

#[async_trait]
impl SeriesSink for InfluxClient {
    type Error = AdapterError;

    async fn write(&self, batch: Batch) -> Result<(), AdapterError> {
        self.write_batch(&batch).await
    }
}

/// Builder for InfluxClient.
#[derive(Debug, Default)]
pub struct InfluxClientBuilder {
    endpoint: Option<String>,
    username: Option<String>,
    password: Option<String>,
    database: Option<String>,
    timeout: Option<Duration>,
}

impl InfluxClientBuilder {
    /// Set the HTTP endpoint (e.g., "http://localhost:8086").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the username and password for authentication.
    ///
    /// An empty username disables authentication.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the database (default: "fitbit").
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the request timeout (default: 30 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client without contacting the server.
    pub fn build(self) -> Result<InfluxClient, AdapterError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(30));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Config(e.to_string()))?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| "http://localhost:8086".to_string());
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(AdapterError::Config(format!(
                "endpoint must start with http:// or https://, got '{}'",
                endpoint
            )));
        }

        let username = self.username.filter(|u| !u.is_empty());
        let password = username.as_ref().and(self.password);

        Ok(InfluxClient {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            username,
            password,
            database: self.database.unwrap_or_else(|| "fitbit".to_string()),
        })
    }

    /// Build the client and check the connection.
    pub async fn connect(self) -> Result<InfluxClient, AdapterError> {
        let client = self.build()?;
        client.check_connection().await?;
        Ok(client)
    }
}

fn write_error_message(status: StatusCode, body: &str) -> String {
    // InfluxDB reports write errors as {"error":"..."}
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    if detail.is_empty() {
        format!("status {}", status)
    } else {
        format!("status {}: {}", status, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::respond_once;
    use chrono::{TimeZone, Utc};
    use fitflux_types::{Precision, SeriesPoint};

    fn steps_batch(database: &str) -> Batch {
        let mut batch = Batch::new(database, Precision::Seconds);
        batch.add_point(
            SeriesPoint::builder("activity_steps")
                .tag("steps", "steps-total")
                .field("steps", 5000i64)
                .timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
                .build()
                .unwrap(),
        );
        batch
    }

    fn client(endpoint: &str) -> InfluxClient {
        InfluxClient::builder()
            .endpoint(endpoint)
            .credentials("admin", "secret")
            .database("fitbit")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let client = InfluxClient::builder().build().unwrap();
        assert_eq!(client.endpoint, "http://localhost:8086");
        assert_eq!(client.database(), "fitbit");
        assert_eq!(client.username, None);
        assert_eq!(client.password, None);
    }

    #[test]
    fn test_builder_custom() {
        let client = InfluxClient::builder()
            .endpoint("https://influx.local:8086/")
            .credentials("admin", "secret")
            .database("health")
            .build()
            .unwrap();

        assert_eq!(client.endpoint, "https://influx.local:8086");
        assert_eq!(client.username.as_deref(), Some("admin"));
        assert_eq!(client.password.as_deref(), Some("secret"));
        assert_eq!(client.database(), "health");
    }

    #[test]
    fn test_empty_username_disables_auth() {
        let client = InfluxClient::builder()
            .credentials("", "ignored")
            .build()
            .unwrap();
        assert_eq!(client.username, None);
        assert_eq!(client.password, None);
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        let err = InfluxClient::builder()
            .endpoint("localhost:8086")
            .build()
            .unwrap_err();
        assert!(matches!(err, AdapterError::Config(_)));
    }

    #[tokio::test]
    async fn test_connect_unreachable() {
        // Port 9 (discard) is almost never listening.
        let err = InfluxClient::builder()
            .endpoint("http://127.0.0.1:9")
            .timeout(Duration::from_secs(2))
            .connect()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Connection(_) | AdapterError::Timeout
        ));
    }

    #[tokio::test]
    async fn test_write_posts_line_protocol() {
        let (endpoint, request) = respond_once(204, "").await;

        client(&endpoint)
            .write_batch(&steps_batch("fitbit"))
            .await
            .unwrap();

        let request = request.await.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.target, "/write?db=fitbit&precision=s");
        assert_eq!(request.header("authorization"), Some("Basic YWRtaW46c2VjcmV0"));
        assert_eq!(
            request.body,
            "activity_steps,steps=steps-total steps=5000i 1709251200\n"
        );
    }

    #[tokio::test]
    async fn test_empty_batch_is_still_sent() {
        let (endpoint, request) = respond_once(204, "").await;

        client(&endpoint)
            .write(Batch::new("fitbit", Precision::Seconds))
            .await
            .unwrap();

        let request = request.await.unwrap();
        assert_eq!(request.target, "/write?db=fitbit&precision=s");
        assert_eq!(request.body, "");
    }

    #[tokio::test]
    async fn test_write_without_credentials() {
        let (endpoint, request) = respond_once(204, "").await;

        InfluxClient::builder()
            .endpoint(&endpoint)
            .build()
            .unwrap()
            .write_batch(&steps_batch("fitbit"))
            .await
            .unwrap();

        assert_eq!(request.await.unwrap().header("authorization"), None);
    }

    #[tokio::test]
    async fn test_write_unauthorized() {
        let (endpoint, _request) = respond_once(401, r#"{"error":"authorization failed"}"#).await;

        let err = client(&endpoint)
            .write_batch(&steps_batch("fitbit"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Auth(_)));
    }

    #[tokio::test]
    async fn test_write_rejected() {
        let (endpoint, _request) =
            respond_once(404, r#"{"error":"database not found: \"fitbit\""}"#).await;

        let err = client(&endpoint)
            .write_batch(&steps_batch("fitbit"))
            .await
            .unwrap_err();
        match err {
            AdapterError::Write(message) => {
                assert_eq!(message, "status 404 Not Found: database not found: \"fitbit\"")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_write_other_database() {
        // Nothing listens here; the batch is refused before any request.
        let err = client("http://127.0.0.1:9")
            .write_batch(&steps_batch("health"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Config(_)));
    }

    #[tokio::test]
    async fn test_check_connection() {
        let (endpoint, request) = respond_once(200, r#"{"results":[{"statement_id":0}]}"#).await;

        client(&endpoint).check_connection().await.unwrap();

        let request = request.await.unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.target, "/query?q=SHOW+DATABASES");
        assert_eq!(request.header("authorization"), Some("Basic YWRtaW46c2VjcmV0"));
    }

    #[tokio::test]
    async fn test_check_connection_bad_credentials() {
        let (endpoint, _request) = respond_once(403, "").await;
        let err = client(&endpoint).check_connection().await.unwrap_err();
        assert!(matches!(err, AdapterError::Auth(_)));
    }

    #[tokio::test]
    async fn test_check_connection_server_error() {
        let (endpoint, _request) = respond_once(500, "").await;
        let err = client(&endpoint).check_connection().await.unwrap_err();
        assert!(matches!(err, AdapterError::Connection(_)));
    }

    #[test]
    fn test_write_error_message() {
        assert_eq!(
            write_error_message(
                StatusCode::NOT_FOUND,
                r#"{"error":"database not found: \"fitbit\""}"#
            ),
            "status 404 Not Found: database not found: \"fitbit\""
        );
        assert_eq!(
            write_error_message(StatusCode::BAD_REQUEST, "partial write\n"),
            "status 400 Bad Request: partial write"
        );
        assert_eq!(
            write_error_message(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "status 500 Internal Server Error"
        );
    }
}
