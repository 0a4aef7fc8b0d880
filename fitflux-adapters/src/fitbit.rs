//! Fitbit Web API adapter.
//!
//! Covers the OAuth2 authorization code grant and the time series the
//! pipeline loads:
//!
//! - **Steps**: `activities/steps` daily totals
//! - **Body weight**: `body/weight` daily values
//! - **Resting heart rate**: `activities/heart` daily summaries
//! - **Intraday heart rate**: `activities/heart` at 1 second detail, one day
//!   per request
//!
//! Daily time series values arrive as JSON strings (`"value": "8523"`);
//! plain numbers are accepted too.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fitflux_adapters::fitbit::FitbitClient;
//!
//! let client = FitbitClient::builder()
//!     .credentials("23ABCD", "client-secret")
//!     .redirect_uri("http://localhost:4000/auth")
//!     .build()?;
//!
//! println!("Visit: {}", client.authorize_url());
//!
//! // Later, with the code from the callback
//! client.exchange_code(&code).await?;
//! println!("{}", client.fetch_profile().await?);
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use parking_lot::RwLock;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use fitflux_pipeline::FitnessSource;
use fitflux_types::{
    HeartValue, IntradaySample, IntradaySeries, RestingHeartRecord, StepRecord, WeightRecord,
};

use crate::AdapterError;

/// Base URL of the Web API.
pub const DEFAULT_API_BASE: &str = "https://api.fitbit.com";

/// Authorization page users are sent to.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://www.fitbit.com/oauth2/authorize";

/// Scopes needed for the loaded streams and the profile lookup.
pub const DEFAULT_SCOPES: &[&str] = &["activity", "heartrate", "weight", "profile"];

/// Fitbit Web API client.
///
/// Clones share the access token, so a token obtained through
/// [`FitbitClient::exchange_code`] is visible to every clone.
#[derive(Debug, Clone)]
pub struct FitbitClient {
    client: Client,
    api_base: String,
    authorize_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    period: String,
    token: Arc<RwLock<Option<String>>>,
}

impl FitbitClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> FitbitClientBuilder {
        FitbitClientBuilder::default()
    }

    /// The URL users visit to grant access.
    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    /// Check if an access token is available.
    pub fn is_authorized(&self) -> bool {
        self.token.read().is_some()
    }

    /// Replace the access token.
    pub fn set_access_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Exchange an authorization code for an access token and keep it.
    pub async fn exchange_code(&self, code: &str) -> Result<(), AdapterError> {
        let url = format!("{}/oauth2/token", self.api_base);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("client_id", self.client_id.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Auth(format!(
                "Token exchange rejected ({}): {}",
                status, body
            )));
        }

        if !status.is_success() {
            return Err(AdapterError::Http(format!(
                "Token endpoint returned status {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        debug!(
            "Obtained access token for user {} (expires in {:?}s)",
            token.user_id.as_deref().unwrap_or("-"),
            token.expires_in
        );
        self.set_access_token(token.access_token);
        Ok(())
    }

    /// Fetch the user's profile as raw JSON.
    pub async fn fetch_profile(&self) -> Result<String, AdapterError> {
        let response = self.get("/1/user/-/profile.json").await?;
        response
            .text()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))
    }

    async fn get(&self, path: &str) -> Result<Response, AdapterError> {
        let token = self
            .token
            .read()
            .clone()
            .ok_or(AdapterError::NotAuthorized)?;
        let url = format!("{}{}", self.api_base, path);

        debug!("GET {}", url);
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AdapterError::Auth("Access token rejected".to_string()));
        }

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(AdapterError::Http("Rate limit exceeded".to_string()));
        }

        if !response.status().is_success() {
            return Err(AdapterError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AdapterError> {
        self.get(path)
            .await?
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))
    }

    fn history_path(&self, resource: &str) -> String {
        format!("/1/user/-/{}/date/today/{}.json", resource, self.period)
    }
}

#[async_trait]
impl FitnessSource for FitbitClient {
    type Error = AdapterError;

    async fn fetch_step_history(&self) -> Result<Vec<StepRecord>, AdapterError> {
        let response: StepsResponse = self
            .get_json(&self.history_path("activities/steps"))
            .await?;
        step_records(response)
    }

    async fn fetch_weight_history(&self) -> Result<Vec<WeightRecord>, AdapterError> {
        let response: WeightResponse = self.get_json(&self.history_path("body/weight")).await?;
        weight_records(response)
    }

    async fn fetch_resting_heart_history(&self) -> Result<Vec<RestingHeartRecord>, AdapterError> {
        let response: HeartResponse = self
            .get_json(&self.history_path("activities/heart"))
            .await?;
        Ok(resting_heart_records(response))
    }

    async fn fetch_intraday_heart(&self, date: NaiveDate) -> Result<IntradaySeries, AdapterError> {
        let path = format!(
            "/1/user/-/activities/heart/date/{}/1d/1sec.json",
            date.format("%Y-%m-%d")
        );
        let response: IntradayResponse = self.get_json(&path).await?;
        intraday_series(date, response)
    }
}

/// Builder for FitbitClient.
#[derive(Debug, Default)]
pub struct FitbitClientBuilder {
    api_base: Option<String>,
    authorize_base: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    scopes: Option<Vec<String>>,
    period: Option<String>,
    access_token: Option<String>,
    timeout: Option<Duration>,
}

impl FitbitClientBuilder {
    /// Set the OAuth2 client id and secret.
    pub fn credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Set the redirect URI registered for the app
    /// (default: "http://localhost:4000/auth").
    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Set the requested scopes.
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Set the history period requested for daily series (default: "max").
    pub fn period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }

    /// Use a pre-issued access token.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Override the API base URL (default: "https://api.fitbit.com").
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Override the authorization page URL.
    pub fn authorize_base(mut self, base: impl Into<String>) -> Self {
        self.authorize_base = Some(base.into());
        self
    }

    /// Set the request timeout (default: 30 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<FitbitClient, AdapterError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(30));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Config(e.to_string()))?;

        let client_id = self.client_id.unwrap_or_default();
        let redirect_uri = self
            .redirect_uri
            .unwrap_or_else(|| "http://localhost:4000/auth".to_string());
        let scopes = self
            .scopes
            .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect())
            .join(" ");
        let authorize_base = self
            .authorize_base
            .unwrap_or_else(|| DEFAULT_AUTHORIZE_URL.to_string());

        let authorize_url = Url::parse_with_params(
            &authorize_base,
            &[
                ("response_type", "code"),
                ("client_id", client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("scope", scopes.as_str()),
            ],
        )
        .map_err(|e| AdapterError::Config(format!("invalid authorize URL: {}", e)))?;

        Ok(FitbitClient {
            client,
            api_base: self
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            authorize_url: authorize_url.to_string(),
            client_id,
            client_secret: self.client_secret.unwrap_or_default(),
            redirect_uri,
            period: self.period.unwrap_or_else(|| "max".to_string()),
            token: Arc::new(RwLock::new(self.access_token)),
        })
    }
}

fn step_records(response: StepsResponse) -> Result<Vec<StepRecord>, AdapterError> {
    response
        .steps
        .into_iter()
        .map(|entry| {
            Ok(StepRecord {
                value: entry.value.as_i64()?,
                date: entry.date_time,
            })
        })
        .collect()
}

fn weight_records(response: WeightResponse) -> Result<Vec<WeightRecord>, AdapterError> {
    response
        .weight
        .into_iter()
        .map(|entry| {
            Ok(WeightRecord {
                value: entry.value.as_f64()?,
                date: entry.date_time,
            })
        })
        .collect()
}

fn resting_heart_records(response: HeartResponse) -> Vec<RestingHeartRecord> {
    response
        .heart
        .into_iter()
        .map(|entry| RestingHeartRecord {
            date: entry.date_time,
            value: HeartValue {
                resting_heart_rate: entry.value.resting_heart_rate,
            },
        })
        .collect()
}

fn intraday_series(
    date: NaiveDate,
    response: IntradayResponse,
) -> Result<IntradaySeries, AdapterError> {
    let samples = response
        .intraday
        .dataset
        .into_iter()
        .map(|entry| {
            let time = NaiveTime::parse_from_str(&entry.time, "%H:%M:%S").map_err(|e| {
                AdapterError::Parse(format!("invalid sample time '{}': {}", entry.time, e))
            })?;
            Ok(IntradaySample {
                time,
                value: entry.value,
            })
        })
        .collect::<Result<Vec<_>, AdapterError>>()?;

    Ok(IntradaySeries::new(date, samples))
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    user_id: Option<String>,
}

/// A number the API may encode as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ApiNumber {
    fn as_f64(&self) -> Result<f64, AdapterError> {
        match self {
            ApiNumber::Int(v) => Ok(*v as f64),
            ApiNumber::Float(v) => Ok(*v),
            ApiNumber::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| AdapterError::Parse(format!("invalid number '{}'", s))),
        }
    }

    fn as_i64(&self) -> Result<i64, AdapterError> {
        match self {
            ApiNumber::Int(v) => Ok(*v),
            ApiNumber::Text(s) => match s.trim().parse::<i64>() {
                Ok(v) => Ok(v),
                Err(_) => self.as_f64().map(|v| v.round() as i64),
            },
            ApiNumber::Float(v) => Ok(v.round() as i64),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DailyEntry {
    #[serde(rename = "dateTime")]
    date_time: String,
    value: ApiNumber,
}

#[derive(Debug, Deserialize)]
struct StepsResponse {
    #[serde(rename = "activities-steps")]
    steps: Vec<DailyEntry>,
}

#[derive(Debug, Deserialize)]
struct WeightResponse {
    #[serde(rename = "body-weight")]
    weight: Vec<DailyEntry>,
}

#[derive(Debug, Deserialize)]
struct HeartResponse {
    #[serde(rename = "activities-heart")]
    heart: Vec<HeartEntry>,
}

#[derive(Debug, Deserialize)]
struct HeartEntry {
    #[serde(rename = "dateTime")]
    date_time: String,
    value: HeartSummary,
}

#[derive(Debug, Deserialize)]
struct HeartSummary {
    // Omitted on days without enough data.
    #[serde(default, rename = "restingHeartRate")]
    resting_heart_rate: i64,
}

#[derive(Debug, Deserialize)]
struct IntradayResponse {
    #[serde(rename = "activities-heart-intraday")]
    intraday: IntradayDataset,
}

#[derive(Debug, Deserialize)]
struct IntradayDataset {
    #[serde(default)]
    dataset: Vec<IntradayEntry>,
}

#[derive(Debug, Deserialize)]
struct IntradayEntry {
    time: String,
    value: i64,
}
