// Offer normalization: turns supplier records into flight and hotel candidates
// with guaranteed fields, and validates the user's search constraints.

use crate::supplier::{SupplierFlight, SupplierHotel};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

pub const MAX_CANDIDATES: usize = 100;
pub const MAX_STARS: u8 = 5;
pub const MAX_PASSENGERS: u32 = 10;
pub const DEFAULT_LINK_BASE: &str = "https://www.aviasales.com";

const UNKNOWN_AIRPORT: &str = "N/A";
const UNKNOWN_AIRLINE: &str = "Unknown";
const UNKNOWN_FLIGHT_NUMBER: &str = "N/A";

// Error for a single supplier record that cannot become a candidate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid timestamp in {field}: {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Invalid price: {0}")]
    InvalidPrice(f64),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintsError {
    #[error("Missing airport code: {0}")]
    MissingAirportCode(&'static str),

    #[error("Return date {return_date} is before departure date {departure_date}")]
    ReturnBeforeDeparture {
        departure_date: NaiveDate,
        return_date: NaiveDate,
    },

    #[error("Passenger count must be between 1 and 10, got {0}")]
    PassengersOutOfRange(u32),

    #[error("Minimum star rating must be at most 5, got {0}")]
    StarsOutOfRange(u8),

    #[error("Budget must be a positive amount, got {0}")]
    InvalidBudget(f64),
}

// Identity of a flight offer. Suppliers do not always report a flight
// number; such offers carry an unknown key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightNumber(Option<String>);

impl FlightNumber {
    pub fn new(number: impl Into<String>) -> Self {
        Self(Some(number.into()))
    }

    pub fn unknown() -> Self {
        Self(None)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_known(&self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Display for FlightNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or(UNKNOWN_FLIGHT_NUMBER))
    }
}

// Identity of a hotel offer, the hotel's display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotelName(Option<String>);

impl HotelName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }

    pub fn unknown() -> Self {
        Self(None)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_known(&self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Display for HotelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("Unnamed hotel"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightOffer {
    pub origin: String,
    pub destination: String,
    pub departure_at: DateTime<FixedOffset>,
    pub return_at: Option<DateTime<FixedOffset>>,
    pub origin_airport: String,
    pub destination_airport: String,
    // Total for all passengers
    pub price: f64,
    pub airline: String,
    pub flight_number: FlightNumber,
    pub transfers: u32,
    pub return_transfers: u32,
    // Minutes
    pub duration: u32,
    pub duration_to: u32,
    pub duration_back: u32,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotelOffer {
    pub name: HotelName,
    // Nightly rate
    pub price: f64,
    pub stars: u8,
    pub nights: u32,
}

impl HotelOffer {
    pub fn new(name: HotelName, price: f64, stars: u8, nights: u32) -> Self {
        Self {
            name,
            price,
            stars: stars.min(MAX_STARS),
            nights,
        }
    }

    pub fn stay_price(&self) -> f64 {
        self.price * f64::from(self.nights)
    }
}

// What the user asked for. Codes are IATA city or airport codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConstraints {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub passengers: u32,
    pub min_stars: u8,
    pub max_budget: f64,
    pub direct_only: bool,
}

impl SearchConstraints {
    // Constraints with the search form's defaults for everything but the route
    pub fn new(
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        return_date: NaiveDate,
    ) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date,
            return_date,
            passengers: 1,
            min_stars: 1,
            max_budget: 300_000.0,
            direct_only: true,
        }
    }

    // Returns a cleaned-up copy (trimmed, upper-cased codes) or the first violation
    pub fn validated(&self) -> Result<Self, ConstraintsError> {
        let origin = self.origin.trim().to_uppercase();
        if origin.is_empty() {
            return Err(ConstraintsError::MissingAirportCode("origin"));
        }
        let destination = self.destination.trim().to_uppercase();
        if destination.is_empty() {
            return Err(ConstraintsError::MissingAirportCode("destination"));
        }
        if self.return_date < self.departure_date {
            return Err(ConstraintsError::ReturnBeforeDeparture {
                departure_date: self.departure_date,
                return_date: self.return_date,
            });
        }
        if self.passengers == 0 || self.passengers > MAX_PASSENGERS {
            return Err(ConstraintsError::PassengersOutOfRange(self.passengers));
        }
        if self.min_stars > MAX_STARS {
            return Err(ConstraintsError::StarsOutOfRange(self.min_stars));
        }
        if !self.max_budget.is_finite() || self.max_budget <= 0.0 {
            return Err(ConstraintsError::InvalidBudget(self.max_budget));
        }

        Ok(Self {
            origin,
            destination,
            ..self.clone()
        })
    }

    pub fn nights(&self) -> u32 {
        nights_between(self.departure_date, self.return_date)
    }
}

pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> u32 {
    u32::try_from((check_out - check_in).num_days()).unwrap_or(0)
}

// Candidates that survived normalization plus how many records were dropped
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub offers: Vec<T>,
    pub dropped: usize,
}

impl<T> Normalized<T> {
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct OfferNormalizer {
    candidate_cap: usize,
    link_base: String,
}

impl Default for OfferNormalizer {
    fn default() -> Self {
        Self::new(MAX_CANDIDATES, DEFAULT_LINK_BASE)
    }
}

impl OfferNormalizer {
    pub fn new(candidate_cap: usize, link_base: &str) -> Self {
        Self {
            candidate_cap,
            link_base: link_base.trim_end_matches('/').to_string(),
        }
    }

    // Convert one supplier flight record. Price is scaled to the whole party.
    pub fn normalize_flight(
        &self,
        record: SupplierFlight,
        passengers: u32,
    ) -> Result<FlightOffer, NormalizationError> {
        let flight_number = record
            .flight_number_text()
            .map_or_else(FlightNumber::unknown, FlightNumber::new);

        let origin = record
            .origin
            .ok_or(NormalizationError::MissingField("origin"))?;
        let destination = record
            .destination
            .ok_or(NormalizationError::MissingField("destination"))?;
        let price = record
            .price
            .ok_or(NormalizationError::MissingField("price"))?;
        if !price.is_finite() || price < 0.0 {
            return Err(NormalizationError::InvalidPrice(price));
        }

        let departure_raw = record
            .departure_at
            .ok_or(NormalizationError::MissingField("departure_at"))?;
        let departure_at = parse_timestamp("departure_at", &departure_raw)?;
        let return_at = record
            .return_at
            .filter(|raw| !raw.is_empty())
            .map(|raw| parse_timestamp("return_at", &raw))
            .transpose()?;

        Ok(FlightOffer {
            origin,
            destination,
            departure_at,
            return_at,
            origin_airport: record
                .origin_airport
                .unwrap_or_else(|| UNKNOWN_AIRPORT.to_string()),
            destination_airport: record
                .destination_airport
                .unwrap_or_else(|| UNKNOWN_AIRPORT.to_string()),
            price: price * f64::from(passengers),
            airline: record
                .airline
                .unwrap_or_else(|| UNKNOWN_AIRLINE.to_string()),
            flight_number,
            transfers: record.transfers.unwrap_or(0),
            return_transfers: record.return_transfers.unwrap_or(0),
            duration: record.duration.unwrap_or(0),
            duration_to: record.duration_to.unwrap_or(0),
            duration_back: record.duration_back.unwrap_or(0),
            link: record
                .link
                .filter(|path| !path.is_empty())
                .map(|path| format!("{}{}", self.link_base, path)),
        })
    }

    // Convert a batch of raw flight records, dropping the malformed ones.
    // Supplier order is kept; the batch is capped at the candidate limit.
    pub fn normalize_flights(
        &self,
        records: Vec<serde_json::Value>,
        passengers: u32,
    ) -> Normalized<FlightOffer> {
        let mut offers = Vec::new();
        let mut dropped = 0;

        for (index, value) in records.into_iter().enumerate() {
            let converted = serde_json::from_value::<SupplierFlight>(value)
                .map_err(|e| NormalizationError::InvalidRecord(e.to_string()))
                .and_then(|record| self.normalize_flight(record, passengers));

            match converted {
                Ok(offer) => offers.push(offer),
                Err(e) => {
                    warn!(index, error = %e, "dropping malformed flight offer");
                    dropped += 1;
                }
            }
        }

        offers.truncate(self.candidate_cap);
        debug!(kept = offers.len(), dropped, "normalized flight offers");

        Normalized { offers, dropped }
    }

    pub fn normalize_hotel(
        &self,
        record: SupplierHotel,
        nights: u32,
    ) -> Result<HotelOffer, NormalizationError> {
        let price = record
            .price_from
            .or(record.price_avg)
            .ok_or(NormalizationError::MissingField("priceFrom"))?;
        if !price.is_finite() || price < 0.0 {
            return Err(NormalizationError::InvalidPrice(price));
        }

        let name = record
            .hotel_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .map_or_else(HotelName::unknown, HotelName::new);

        // Clamped into 0..=5 before narrowing
        let stars = record.stars.unwrap_or(0).clamp(0, i64::from(MAX_STARS)) as u8;

        Ok(HotelOffer::new(name, price, stars, nights))
    }

    // Convert a batch of raw hotel records: drop malformed ones, keep those
    // meeting the star floor, best-rated first and cheapest within a rating.
    pub fn normalize_hotels(
        &self,
        records: Vec<serde_json::Value>,
        nights: u32,
        min_stars: u8,
    ) -> Normalized<HotelOffer> {
        let mut offers = Vec::new();
        let mut dropped = 0;

        for (index, value) in records.into_iter().enumerate() {
            let converted = serde_json::from_value::<SupplierHotel>(value)
                .map_err(|e| NormalizationError::InvalidRecord(e.to_string()))
                .and_then(|record| self.normalize_hotel(record, nights));

            match converted {
                Ok(offer) if offer.stars >= min_stars => offers.push(offer),
                Ok(_) => {}
                Err(e) => {
                    warn!(index, error = %e, "dropping malformed hotel offer");
                    dropped += 1;
                }
            }
        }

        offers.sort_by(|a, b| {
            b.stars
                .cmp(&a.stars)
                .then_with(|| a.price.total_cmp(&b.price))
        });
        offers.truncate(self.candidate_cap);
        debug!(kept = offers.len(), dropped, min_stars, "normalized hotel offers");

        Normalized { offers, dropped }
    }
}

fn parse_timestamp(
    field: &'static str,
    raw: &str,
) -> Result<DateTime<FixedOffset>, NormalizationError> {
    DateTime::parse_from_rfc3339(raw).map_err(|_| NormalizationError::InvalidTimestamp {
        field,
        value: raw.to_string(),
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::{date, SAMPLE_FLIGHTS_PATH, SAMPLE_HOTELS_PATH};
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn raw_flight() -> serde_json::Value {
        json!({
            "origin": "MOW",
            "destination": "PAR",
            "origin_airport": "SVO",
            "destination_airport": "CDG",
            "price": 21500,
            "airline": "SU",
            "flight_number": "2454",
            "departure_at": "2025-03-01T10:35:00+03:00",
            "return_at": "2025-03-07T18:05:00+01:00",
            "transfers": 0,
            "return_transfers": 1,
            "duration": 610,
            "duration_to": 265,
            "duration_back": 345,
            "link": "/search/MOW0103PAR07031?t=SU1"
        })
    }

    #[test]
    fn test_flight_price_scales_with_passengers() {
        let normalizer = OfferNormalizer::default();
        let record: SupplierFlight = serde_json::from_value(raw_flight()).unwrap();

        let offer = normalizer.normalize_flight(record, 3).unwrap();

        assert_eq!(offer.price, 64500.0);
        assert_eq!(offer.flight_number, FlightNumber::new("2454"));
        assert_eq!(offer.return_transfers, 1);
        assert_eq!(offer.duration_back, 345);
        assert_eq!(
            offer.link.as_deref(),
            Some("https://www.aviasales.com/search/MOW0103PAR07031?t=SU1")
        );
        assert_eq!(offer.departure_at.to_rfc3339(), "2025-03-01T10:35:00+03:00");
        assert!(offer.return_at.is_some());
    }

    #[test]
    fn test_flight_optional_fields_get_defaults() {
        let normalizer = OfferNormalizer::default();
        let record: SupplierFlight = serde_json::from_value(json!({
            "origin": "MOW",
            "destination": "PAR",
            "price": 9000,
            "departure_at": "2025-03-01T06:00:00Z"
        }))
        .unwrap();

        let offer = normalizer.normalize_flight(record, 1).unwrap();

        assert_eq!(offer.origin_airport, "N/A");
        assert_eq!(offer.destination_airport, "N/A");
        assert_eq!(offer.airline, "Unknown");
        assert!(!offer.flight_number.is_known());
        assert_eq!(offer.flight_number.to_string(), "N/A");
        assert_eq!(offer.transfers, 0);
        assert_eq!(offer.return_at, None);
        assert_eq!(offer.link, None);
    }

    #[test]
    fn test_identity_keys_display() {
        assert_eq!(FlightNumber::new("2454").to_string(), "2454");
        assert_eq!(FlightNumber::unknown().to_string(), UNKNOWN_FLIGHT_NUMBER);
        assert_eq!(HotelName::new("Le Marais").to_string(), "Le Marais");
        assert_eq!(HotelName::unknown().to_string(), "Unnamed hotel");
    }

    #[test_case("origin"; "missing origin")]
    #[test_case("destination"; "missing destination")]
    #[test_case("price"; "missing price")]
    #[test_case("departure_at"; "missing departure")]
    fn test_flight_missing_required_field(field: &'static str) {
        let normalizer = OfferNormalizer::default();
        let mut raw = raw_flight();
        raw.as_object_mut().unwrap().remove(field);
        let record: SupplierFlight = serde_json::from_value(raw).unwrap();

        let result = normalizer.normalize_flight(record, 1);
        assert_eq!(result, Err(NormalizationError::MissingField(field)));
    }

    #[test]
    fn test_malformed_flight_records_are_dropped_individually() {
        let normalizer = OfferNormalizer::default();
        let mut bad_timestamp = raw_flight();
        bad_timestamp["departure_at"] = json!("tomorrow morning");
        let mut bad_type = raw_flight();
        bad_type["price"] = json!("cheap");

        let records = vec![raw_flight(), bad_timestamp, bad_type, json!(17), raw_flight()];
        let normalized = normalizer.normalize_flights(records, 1);

        assert_eq!(normalized.offers.len(), 2);
        assert_eq!(normalized.dropped, 3);
    }

    #[test]
    fn test_flight_batch_is_capped() {
        let normalizer = OfferNormalizer::new(100, DEFAULT_LINK_BASE);
        let records = (0..130).map(|_| raw_flight()).collect();

        let normalized = normalizer.normalize_flights(records, 1);

        assert_eq!(normalized.offers.len(), 100);
        assert_eq!(normalized.dropped, 0);
    }

    #[test]
    fn test_hotels_filtered_sorted_and_priced() {
        let normalizer = OfferNormalizer::default();
        let records = vec![
            json!({"hotelName": "Budget Inn", "priceFrom": 3000.0, "stars": 2}),
            json!({"hotelName": "Grand", "priceFrom": 12000.0, "stars": 5}),
            json!({"hotelName": "Riverside", "priceAvg": 6500.0, "stars": 4}),
            json!({"hotelName": "Palace", "priceFrom": 9000.0, "stars": 5}),
            json!({"hotelName": "Corner", "priceFrom": 4000.0, "priceAvg": 4800.0, "stars": 4}),
        ];

        let normalized = normalizer.normalize_hotels(records, 6, 3);
        let names: Vec<String> = normalized
            .offers
            .iter()
            .map(|h| h.name.to_string())
            .collect();

        assert_eq!(names, vec!["Palace", "Grand", "Corner", "Riverside"]);
        assert_eq!(normalized.offers[2].price, 4000.0);
        assert_eq!(normalized.offers[3].price, 6500.0);
        assert!(normalized.offers.iter().all(|h| h.nights == 6));
        assert_eq!(normalized.dropped, 0);
    }

    #[test]
    fn test_hotel_defaults_and_malformed_records() {
        let normalizer = OfferNormalizer::default();
        let records = vec![
            json!({"priceFrom": 5000.0}),
            json!({"hotelName": "Starry", "priceFrom": 7000.0, "stars": 9}),
            json!({"hotelName": "No Price", "stars": 3}),
            json!({"hotelName": "Negative", "priceFrom": -1.0}),
        ];

        let normalized = normalizer.normalize_hotels(records, 2, 0);

        assert_eq!(normalized.dropped, 2);
        assert_eq!(normalized.offers.len(), 2);
        assert_eq!(normalized.offers[0].name, HotelName::new("Starry"));
        assert_eq!(normalized.offers[0].stars, 5);
        assert!(!normalized.offers[1].name.is_known());
        assert_eq!(normalized.offers[1].stars, 0);
    }

    #[test]
    fn test_sample_payloads_normalize() {
        let normalizer = OfferNormalizer::default();

        let flights_json = std::fs::read_to_string(SAMPLE_FLIGHTS_PATH).unwrap();
        let flights: crate::supplier::SupplierFlightsResponse =
            serde_json::from_str(&flights_json).unwrap();
        let flights = normalizer.normalize_flights(flights.data.unwrap_or_default(), 2);
        assert_eq!(flights.offers.len(), 4);
        assert_eq!(flights.dropped, 1);

        let hotels_json = std::fs::read_to_string(SAMPLE_HOTELS_PATH).unwrap();
        let hotels: Vec<serde_json::Value> = serde_json::from_str(&hotels_json).unwrap();
        let hotels = normalizer.normalize_hotels(hotels, 6, 3);
        assert_eq!(hotels.offers.len(), 4);
        assert!(hotels.offers.iter().all(|h| h.stars >= 3));
    }

    #[test]
    fn test_constraints_are_cleaned_up() {
        let mut constraints =
            SearchConstraints::new(" mow", "par ", date("2025-03-01"), date("2025-03-07"));
        constraints.passengers = 2;

        let validated = constraints.validated().unwrap();

        assert_eq!(validated.origin, "MOW");
        assert_eq!(validated.destination, "PAR");
        assert_eq!(validated.passengers, 2);
        assert_eq!(validated.nights(), 6);
    }

    #[test]
    fn test_constraints_violations() {
        let base = SearchConstraints::new("MOW", "PAR", date("2025-03-01"), date("2025-03-07"));

        let mut reversed = base.clone();
        reversed.return_date = date("2025-02-27");
        assert!(matches!(
            reversed.validated(),
            Err(ConstraintsError::ReturnBeforeDeparture { .. })
        ));

        let mut empty_origin = base.clone();
        empty_origin.origin = "  ".to_string();
        assert_eq!(
            empty_origin.validated(),
            Err(ConstraintsError::MissingAirportCode("origin"))
        );

        let mut crowd = base.clone();
        crowd.passengers = 11;
        assert_eq!(
            crowd.validated(),
            Err(ConstraintsError::PassengersOutOfRange(11))
        );

        let mut stars = base.clone();
        stars.min_stars = 6;
        assert_eq!(stars.validated(), Err(ConstraintsError::StarsOutOfRange(6)));

        let mut budget = base;
        budget.max_budget = 0.0;
        assert_eq!(budget.validated(), Err(ConstraintsError::InvalidBudget(0.0)));
    }
}
