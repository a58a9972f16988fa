// Configuration for the planner and its supplier clients.
// Passed explicitly to whoever needs it; nothing here is process-global.

use crate::composer::{MissingKeyPolicy, PricingPolicy};
use crate::offers::{DEFAULT_LINK_BASE, MAX_CANDIDATES};
use crate::selector::DEFAULT_TOP_N;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const API_TOKEN_ENV: &str = "TRAVEL_PLANNER_API_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

// Flight prices API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub request_limit: u32,
    // Prefix for the relative booking links the API returns
    pub link_base: String,
}

impl Default for FlightApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.travelpayouts.com".to_string(),
            timeout_ms: 15_000,
            request_limit: 100,
            link_base: DEFAULT_LINK_BASE.to_string(),
        }
    }
}

// Hotel cache API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub request_limit: u32,
    pub sort_by: String,
}

impl Default for HotelApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://engine.hotellook.com".to_string(),
            timeout_ms: 15_000,
            request_limit: 20,
            sort_by: "value".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub api_token: String,
    pub currency: String,
    pub flights: FlightApiConfig,
    pub hotels: HotelApiConfig,
    pub candidate_cap: usize,
    pub top_n: usize,
    pub pricing_policy: PricingPolicy,
    pub missing_key_policy: MissingKeyPolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            currency: "rub".to_string(),
            flights: FlightApiConfig::default(),
            hotels: HotelApiConfig::default(),
            candidate_cap: MAX_CANDIDATES,
            top_n: DEFAULT_TOP_N,
            pricing_policy: PricingPolicy::default(),
            missing_key_policy: MissingKeyPolicy::default(),
        }
    }
}

impl PlannerConfig {
    // Parse a JSON document; missing keys fall back to the defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    // Take the API token from the environment when it is set there
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var(API_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.api_token = token.trim().to_string();
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency.trim().is_empty() {
            return Err(invalid("currency", "must not be empty"));
        }
        if self.flights.base_url.trim().is_empty() {
            return Err(invalid("flights.base_url", "must not be empty"));
        }
        if self.hotels.base_url.trim().is_empty() {
            return Err(invalid("hotels.base_url", "must not be empty"));
        }
        if self.flights.timeout_ms == 0 {
            return Err(invalid("flights.timeout_ms", "must be greater than zero"));
        }
        if self.hotels.timeout_ms == 0 {
            return Err(invalid("hotels.timeout_ms", "must be greater than zero"));
        }
        if self.candidate_cap == 0 {
            return Err(invalid("candidate_cap", "must be greater than zero"));
        }
        if self.top_n == 0 {
            return Err(invalid("top_n", "must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        message: message.to_string(),
    }
}
