// Package Composer
// Pairs flight and hotel candidates into non-overlapping packages and ranks
// them by total price. The pairing is greedy: every flight, cheapest first,
// takes the cheapest hotel nobody has taken yet.

use crate::offers::{FlightOffer, HotelOffer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

// How the hotel part of a package total is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingPolicy {
    // The nightly rate alone, regardless of the length of stay.
    #[default]
    PerNight,
    // Nightly rate multiplied by the number of nights.
    PerStay,
}

impl PricingPolicy {
    pub fn hotel_cost(self, hotel: &HotelOffer) -> f64 {
        match self {
            PricingPolicy::PerNight => hotel.price,
            PricingPolicy::PerStay => hotel.stay_price(),
        }
    }
}

// How offers without an identity key (no flight number, no hotel name)
// take part in deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingKeyPolicy {
    // Every keyless offer is its own entity.
    #[default]
    Distinct,
    // All keyless offers share one key, so only the first is ever used.
    Collapse,
}

// One flight plus one hotel. Built only by the composer and read-only after.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Package {
    flight: FlightOffer,
    hotel: HotelOffer,
    total_price: f64,
}

impl Package {
    fn new(flight: FlightOffer, hotel: HotelOffer, pricing: PricingPolicy) -> Self {
        let total_price = flight.price + pricing.hotel_cost(&hotel);
        Self {
            flight,
            hotel,
            total_price,
        }
    }

    pub fn flight(&self) -> &FlightOffer {
        &self.flight
    }

    pub fn hotel(&self) -> &HotelOffer {
        &self.hotel
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    pub fn stars(&self) -> u8 {
        self.hotel.stars
    }
}

// Keys already taken by an earlier package
struct UsedKeys<'a> {
    keys: HashSet<Option<&'a str>>,
    missing: MissingKeyPolicy,
}

impl<'a> UsedKeys<'a> {
    fn new(missing: MissingKeyPolicy) -> Self {
        Self {
            keys: HashSet::new(),
            missing,
        }
    }

    fn contains(&self, key: Option<&'a str>) -> bool {
        match key {
            Some(_) => self.keys.contains(&key),
            None => self.missing == MissingKeyPolicy::Collapse && self.keys.contains(&None),
        }
    }

    fn insert(&mut self, key: Option<&'a str>) {
        if key.is_some() || self.missing == MissingKeyPolicy::Collapse {
            self.keys.insert(key);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Composer {
    pricing: PricingPolicy,
    missing_keys: MissingKeyPolicy,
}

impl Composer {
    pub fn new(pricing: PricingPolicy, missing_keys: MissingKeyPolicy) -> Self {
        Self {
            pricing,
            missing_keys,
        }
    }

    pub fn pricing(&self) -> PricingPolicy {
        self.pricing
    }

    // Build packages from the two candidate lists, cheapest total first.
    // Neither input is modified; the result holds copies of the paired offers.
    pub fn compose(&self, flights: &[FlightOffer], hotels: &[HotelOffer]) -> Vec<Package> {
        if flights.is_empty() || hotels.is_empty() {
            debug!(
                flights = flights.len(),
                hotels = hotels.len(),
                "nothing to compose"
            );
            return Vec::new();
        }

        // sort_by is stable, so equal prices keep their input order
        let mut sorted_flights: Vec<&FlightOffer> = flights.iter().collect();
        sorted_flights.sort_by(|a, b| a.price.total_cmp(&b.price));

        // A zero-night stay costs nothing per stay; the nightly rate still decides
        let mut sorted_hotels: Vec<&HotelOffer> = hotels.iter().collect();
        sorted_hotels.sort_by(|a, b| {
            self.pricing
                .hotel_cost(a)
                .total_cmp(&self.pricing.hotel_cost(b))
                .then_with(|| a.price.total_cmp(&b.price))
        });

        let mut used_flights = UsedKeys::new(self.missing_keys);
        let mut used_hotels = UsedKeys::new(self.missing_keys);
        // A keyless hotel can still only be booked once
        let mut taken = vec![false; sorted_hotels.len()];
        let mut packages = Vec::with_capacity(flights.len().min(hotels.len()));

        for flight in sorted_flights {
            let flight_key = flight.flight_number.as_str();
            if used_flights.contains(flight_key) {
                continue;
            }

            let slot = sorted_hotels
                .iter()
                .enumerate()
                .position(|(i, hotel)| !taken[i] && !used_hotels.contains(hotel.name.as_str()));

            // No hotel left: this flight stays out and is not marked used
            if let Some(slot) = slot {
                let hotel = sorted_hotels[slot];
                taken[slot] = true;
                used_hotels.insert(hotel.name.as_str());
                used_flights.insert(flight_key);
                packages.push(Package::new(flight.clone(), hotel.clone(), self.pricing));
            }
        }

        // Pairing followed flight price; rank by the package total instead
        packages.sort_by(|a, b| a.total_price.total_cmp(&b.total_price));

        debug!(
            flights = flights.len(),
            hotels = hotels.len(),
            packages = packages.len(),
            pricing = ?self.pricing,
            "composed packages"
        );

        packages
    }
}

// Compose with the default policies: nightly hotel rate, keyless offers distinct
pub fn compose(flights: &[FlightOffer], hotels: &[HotelOffer]) -> Vec<Package> {
    Composer::default().compose(flights, hotels)
}
