// Hotel API client
// One trait method per backend endpoint; the HTTP implementation owns transport
// details while the rest of the crate only talks to `HotelApi`.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::booking::BookingRequest;
use crate::config::ClientConfig;
use crate::details::DateContext;
use crate::models::{BookingRecord, HotelSummary, SearchQuery};
use crate::payload::{
    parse_booking_records, parse_booking_reply, parse_hotel_list, parse_offer_check,
    BookingReply, OfferCheck,
};

// Request-level failures, surfaced to the caller verbatim and never retried
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("API error: {status_code} - {message}")]
    Server { status_code: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Server,
    Timeout,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::Timeout(_) => ErrorKind::Timeout,
            ApiError::Server { .. } | ApiError::Decode(_) => ErrorKind::Server,
        }
    }

    // The text shown to the user
    pub fn message(&self) -> &str {
        match self {
            ApiError::Network(message)
            | ApiError::Timeout(message)
            | ApiError::Decode(message)
            | ApiError::Server { message, .. } => message,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

// Source of the bearer credential. `None` means the request goes out unauthenticated.
#[async_trait]
pub trait CredentialProvider: Send + Sync + 'static {
    async fn token(&self) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn token(&self) -> Option<String> {
        self.0.clone().filter(|t| !t.is_empty())
    }
}

#[async_trait]
pub trait HotelApi: Send + Sync + 'static {
    // POST /search
    async fn search_hotels(&self, query: &SearchQuery) -> Result<Vec<HotelSummary>, ApiError>;

    // GET /{hotelId}?checkInDate&checkOutDate&adults&children
    async fn hotel_details(
        &self,
        hotel_id: &str,
        context: &DateContext,
    ) -> Result<Vec<HotelSummary>, ApiError>;

    // GET /offers/{offerId}
    async fn check_offer(&self, offer_id: &str) -> Result<OfferCheck, ApiError>;

    // POST /book
    async fn book(&self, request: &BookingRequest) -> Result<BookingReply, ApiError>;

    // GET /bookings/user/{userId}
    async fn user_bookings(&self, user_id: &str) -> Result<Vec<BookingRecord>, ApiError>;
}

#[derive(Debug, Default, Clone)]
pub struct ClientStats {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub requests_timeout: usize,
    pub average_response_time_ms: f64,
    pub max_response_time_ms: f64,
}

pub struct HttpHotelApi {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
    stats: Mutex<ClientStats>,
}

impl HttpHotelApi {
    pub fn new(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ClientError> {
        if config.base_url.trim().is_empty() {
            return Err(ClientError::ConfigError("base_url is empty".to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
            stats: Mutex::new(ClientStats::default()),
        })
    }

    pub fn stats(&self) -> ClientStats {
        self.stats.lock().clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn record(&self, started: Instant, outcome: &Result<Value, ApiError>) {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let mut stats = self.stats.lock();

        stats.requests_sent += 1;
        match outcome {
            Ok(_) => stats.requests_succeeded += 1,
            Err(ApiError::Timeout(_)) => {
                stats.requests_failed += 1;
                stats.requests_timeout += 1;
            }
            Err(_) => stats.requests_failed += 1,
        }

        let n = stats.requests_sent as f64;
        stats.average_response_time_ms += (elapsed_ms - stats.average_response_time_ms) / n;
        stats.max_response_time_ms = stats.max_response_time_ms.max(elapsed_ms);
    }

    async fn send(&self, label: &str, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let mut request = request.header(CONTENT_TYPE, "application/json");
        match self.credentials.token().await {
            Some(token) => request = request.bearer_auth(token),
            None => debug!("No credential available for {}, sending without Authorization", label),
        }

        let started = Instant::now();
        let outcome = self.execute(request).await;
        self.record(started, &outcome);

        if let Err(e) = &outcome {
            warn!("API error on {}: {}", label, e);
        }
        outcome
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        let json = serde_json::from_str::<Value>(&body).ok();

        if !status.is_success() {
            let message = json
                .as_ref()
                .and_then(|v| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("API call failed: {}", status.as_u16()));
            return Err(ApiError::Server {
                status_code: status.as_u16(),
                message,
            });
        }

        json.ok_or_else(|| ApiError::Decode("Response body is not JSON".to_string()))
    }
}

#[async_trait]
impl HotelApi for HttpHotelApi {
    async fn search_hotels(&self, query: &SearchQuery) -> Result<Vec<HotelSummary>, ApiError> {
        debug!("Searching hotels in {}", query.city_name);
        let request = self.client.post(self.url("/search")).json(query);
        let body = self.send("POST /search", request).await?;
        Ok(parse_hotel_list(&body))
    }

    async fn hotel_details(
        &self,
        hotel_id: &str,
        context: &DateContext,
    ) -> Result<Vec<HotelSummary>, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("/{}", hotel_id)))
            .query(&context.query_params());
        let body = self.send("GET /{hotelId}", request).await?;
        Ok(parse_hotel_list(&body))
    }

    async fn check_offer(&self, offer_id: &str) -> Result<OfferCheck, ApiError> {
        let request = self.client.get(self.url(&format!("/offers/{}", offer_id)));
        let body = self.send("GET /offers/{offerId}", request).await?;
        Ok(parse_offer_check(&body))
    }

    async fn book(&self, booking: &BookingRequest) -> Result<BookingReply, ApiError> {
        let request = self.client.post(self.url("/book")).json(booking);
        let body = self.send("POST /book", request).await?;
        Ok(parse_booking_reply(&body))
    }

    async fn user_bookings(&self, user_id: &str) -> Result<Vec<BookingRecord>, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("/bookings/user/{}", user_id)));
        let body = self.send("GET /bookings/user/{userId}", request).await?;
        Ok(parse_booking_records(&body))
    }
}
