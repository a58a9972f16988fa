// Supplier sources: flight prices and hotel availability behind async traits.
// A source never propagates an error to its caller. Failures become an
// advisory outcome, so the composer only ever sees a possibly empty list.

use crate::config::{FlightApiConfig, HotelApiConfig, PlannerConfig};
use crate::offers::{
    nights_between, FlightOffer, HotelOffer, Normalized, OfferNormalizer, SearchConstraints,
    DEFAULT_LINK_BASE,
};
use crate::supplier::SupplierFlightsResponse;
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

// Error types for supplier requests
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

// Non-fatal reason a source contributed no candidates
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum SourceAdvisory {
    NoMatches,
    Unavailable(String),
}

impl fmt::Display for SourceAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceAdvisory::NoMatches => f.write_str("no offers matched the search"),
            SourceAdvisory::Unavailable(reason) => write!(f, "source unavailable: {}", reason),
        }
    }
}

// What a source returns: candidates, or why there are none
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome<T> {
    Offers(Vec<T>),
    NoMatches,
    Unavailable(SourceError),
}

impl<T> SourceOutcome<T> {
    pub fn from_offers(offers: Vec<T>) -> Self {
        if offers.is_empty() {
            SourceOutcome::NoMatches
        } else {
            SourceOutcome::Offers(offers)
        }
    }

    pub fn offers(&self) -> &[T] {
        match self {
            SourceOutcome::Offers(offers) => offers,
            SourceOutcome::NoMatches | SourceOutcome::Unavailable(_) => &[],
        }
    }

    pub fn into_offers(self) -> Vec<T> {
        match self {
            SourceOutcome::Offers(offers) => offers,
            SourceOutcome::NoMatches | SourceOutcome::Unavailable(_) => Vec::new(),
        }
    }

    pub fn advisory(&self) -> Option<SourceAdvisory> {
        match self {
            SourceOutcome::Offers(_) => None,
            SourceOutcome::NoMatches => Some(SourceAdvisory::NoMatches),
            SourceOutcome::Unavailable(e) => Some(SourceAdvisory::Unavailable(e.to_string())),
        }
    }
}

// Request shapes for the two source boundaries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightQuery {
    pub origin: String,
    pub destination: String,
    pub outbound_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub currency: String,
    pub direct_only: bool,
    pub passenger_count: u32,
}

impl FlightQuery {
    pub fn from_constraints(constraints: &SearchConstraints, currency: &str) -> Self {
        Self {
            origin: constraints.origin.clone(),
            destination: constraints.destination.clone(),
            outbound_date: constraints.departure_date,
            return_date: Some(constraints.return_date),
            currency: currency.to_string(),
            direct_only: constraints.direct_only,
            passenger_count: constraints.passengers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotelQuery {
    pub location: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: u32,
    pub min_stars: u8,
}

impl HotelQuery {
    pub fn from_constraints(constraints: &SearchConstraints) -> Self {
        Self {
            location: constraints.destination.clone(),
            check_in: constraints.departure_date,
            check_out: constraints.return_date,
            adults: constraints.passengers,
            min_stars: constraints.min_stars,
        }
    }

    pub fn nights(&self) -> u32 {
        nights_between(self.check_in, self.check_out)
    }
}

#[async_trait]
pub trait FlightSource: Send + Sync {
    async fn find_flights(&self, query: &FlightQuery) -> SourceOutcome<FlightOffer>;
}

#[async_trait]
pub trait HotelSource: Send + Sync {
    async fn find_hotels(&self, query: &HotelQuery) -> SourceOutcome<HotelOffer>;
}

// Per-client request statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SourceStats {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub requests_timeout: usize,
    pub offers_received: usize,
    pub offers_dropped: usize,
    pub average_response_time_ms: f64,
    pub max_response_time_ms: f64,
}

impl SourceStats {
    fn record<T>(&mut self, elapsed: Duration, result: &Result<Normalized<T>, SourceError>) {
        self.requests_sent += 1;
        match result {
            Ok(normalized) => {
                self.requests_succeeded += 1;
                self.offers_received += normalized.offers.len();
                self.offers_dropped += normalized.dropped;
            }
            Err(SourceError::Timeout(_)) => {
                self.requests_failed += 1;
                self.requests_timeout += 1;
            }
            Err(_) => self.requests_failed += 1,
        }

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let count = self.requests_sent as f64;
        self.average_response_time_ms += (elapsed_ms - self.average_response_time_ms) / count;
        self.max_response_time_ms = self.max_response_time_ms.max(elapsed_ms);
    }
}

fn build_http_client(api_token: &str, timeout_ms: u64) -> Result<Client, ClientError> {
    if api_token.trim().is_empty() {
        return Err(ClientError::ConfigError(
            "API token must not be empty".to_string(),
        ));
    }
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| ClientError::InitError(e.to_string()))
}

fn request_error(error: reqwest::Error, timeout_ms: u64) -> SourceError {
    if error.is_timeout() {
        SourceError::Timeout(timeout_ms)
    } else {
        SourceError::NetworkError(error.to_string())
    }
}

// GET the url and hand back the body of a 2xx response
async fn fetch_body(
    client: &Client,
    url: &str,
    params: &[(&str, String)],
    timeout_ms: u64,
) -> Result<String, SourceError> {
    let response = client
        .get(url)
        .query(params)
        .send()
        .await
        .map_err(|e| request_error(e, timeout_ms))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(SourceError::ApiResponseError {
            status_code: status.as_u16(),
            message,
        });
    }

    response
        .text()
        .await
        .map_err(|e| request_error(e, timeout_ms))
}

// Flight prices API client
pub struct FlightApiClient {
    client: Client,
    config: FlightApiConfig,
    api_token: String,
    normalizer: OfferNormalizer,
    stats: Mutex<SourceStats>,
}

impl FlightApiClient {
    pub fn new(config: &PlannerConfig) -> Result<Self, ClientError> {
        let client = build_http_client(&config.api_token, config.flights.timeout_ms)?;
        Ok(Self {
            client,
            config: config.flights.clone(),
            api_token: config.api_token.clone(),
            normalizer: OfferNormalizer::new(config.candidate_cap, &config.flights.link_base),
            stats: Mutex::new(SourceStats::default()),
        })
    }

    pub fn stats(&self) -> SourceStats {
        self.stats.lock().clone()
    }

    // Query parameters for the prices-for-dates endpoint
    pub fn request_params(&self, query: &FlightQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("origin", query.origin.clone()),
            ("destination", query.destination.clone()),
            (
                "departure_at",
                query.outbound_date.format(DATE_FORMAT).to_string(),
            ),
        ];
        if let Some(return_date) = query.return_date {
            params.push(("return_at", return_date.format(DATE_FORMAT).to_string()));
        }
        params.extend([
            ("currency", query.currency.clone()),
            ("token", self.api_token.clone()),
            ("direct", query.direct_only.to_string()),
            ("sorting", "price".to_string()),
            ("limit", self.config.request_limit.to_string()),
        ]);
        params
    }

    // Parse a prices-for-dates body into flight candidates
    pub fn parse_response(
        &self,
        body: &str,
        passengers: u32,
    ) -> Result<Normalized<FlightOffer>, SourceError> {
        let response: SupplierFlightsResponse =
            serde_json::from_str(body).map_err(|e| SourceError::InvalidPayload(e.to_string()))?;

        let records = response.data.unwrap_or_default();
        if !response.success && records.is_empty() {
            let reason = response
                .error
                .unwrap_or_else(|| "request was not successful".to_string());
            return Err(SourceError::InvalidPayload(reason));
        }

        Ok(self.normalizer.normalize_flights(records, passengers))
    }

    async fn fetch(&self, query: &FlightQuery) -> Result<Normalized<FlightOffer>, SourceError> {
        let url = format!(
            "{}/aviasales/v3/prices_for_dates",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(%url, origin = %query.origin, destination = %query.destination, "requesting flight prices");

        let body = fetch_body(
            &self.client,
            &url,
            &self.request_params(query),
            self.config.timeout_ms,
        )
        .await?;
        self.parse_response(&body, query.passenger_count)
    }
}

#[async_trait]
impl FlightSource for FlightApiClient {
    async fn find_flights(&self, query: &FlightQuery) -> SourceOutcome<FlightOffer> {
        let started = Instant::now();
        let result = self.fetch(query).await;
        self.stats.lock().record(started.elapsed(), &result);

        match result {
            Ok(normalized) => {
                info!(
                    offers = normalized.offers.len(),
                    dropped = normalized.dropped,
                    "flight search finished"
                );
                SourceOutcome::from_offers(normalized.offers)
            }
            Err(e) => {
                warn!(error = %e, "flight source unavailable");
                SourceOutcome::Unavailable(e)
            }
        }
    }
}

// Hotel cache API client
pub struct HotelApiClient {
    client: Client,
    config: HotelApiConfig,
    api_token: String,
    currency: String,
    normalizer: OfferNormalizer,
    stats: Mutex<SourceStats>,
}

impl HotelApiClient {
    pub fn new(config: &PlannerConfig) -> Result<Self, ClientError> {
        let client = build_http_client(&config.api_token, config.hotels.timeout_ms)?;
        Ok(Self {
            client,
            config: config.hotels.clone(),
            api_token: config.api_token.clone(),
            currency: config.currency.clone(),
            normalizer: OfferNormalizer::new(config.candidate_cap, DEFAULT_LINK_BASE),
            stats: Mutex::new(SourceStats::default()),
        })
    }

    pub fn stats(&self) -> SourceStats {
        self.stats.lock().clone()
    }

    pub fn request_params(&self, query: &HotelQuery) -> Vec<(&'static str, String)> {
        vec![
            ("location", query.location.clone()),
            ("checkIn", query.check_in.format(DATE_FORMAT).to_string()),
            ("checkOut", query.check_out.format(DATE_FORMAT).to_string()),
            ("adults", query.adults.to_string()),
            ("currency", self.currency.clone()),
            ("token", self.api_token.clone()),
            ("limit", self.config.request_limit.to_string()),
            ("sortBy", self.config.sort_by.clone()),
        ]
    }

    // The cache endpoint answers with a bare array of hotels
    pub fn parse_response(
        &self,
        body: &str,
        query: &HotelQuery,
    ) -> Result<Normalized<HotelOffer>, SourceError> {
        let records: Vec<serde_json::Value> =
            serde_json::from_str(body).map_err(|e| SourceError::InvalidPayload(e.to_string()))?;

        Ok(self
            .normalizer
            .normalize_hotels(records, query.nights(), query.min_stars))
    }

    async fn fetch(&self, query: &HotelQuery) -> Result<Normalized<HotelOffer>, SourceError> {
        let url = format!(
            "{}/api/v2/cache.json",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(%url, location = %query.location, "requesting hotel availability");

        let body = fetch_body(
            &self.client,
            &url,
            &self.request_params(query),
            self.config.timeout_ms,
        )
        .await?;
        self.parse_response(&body, query)
    }
}

#[async_trait]
impl HotelSource for HotelApiClient {
    async fn find_hotels(&self, query: &HotelQuery) -> SourceOutcome<HotelOffer> {
        let started = Instant::now();
        let result = self.fetch(query).await;
        self.stats.lock().record(started.elapsed(), &result);

        match result {
            Ok(normalized) => {
                info!(
                    offers = normalized.offers.len(),
                    dropped = normalized.dropped,
                    "hotel search finished"
                );
                SourceOutcome::from_offers(normalized.offers)
            }
            Err(e) => {
                warn!(error = %e, "hotel source unavailable");
                SourceOutcome::Unavailable(e)
            }
        }
    }
}
