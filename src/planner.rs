// Travel planner: runs one search from user constraints to a ranked selection.
// Both sources are queried concurrently; their outcomes are summarized next
// to the selection so callers can tell a failed source from an empty one.

use crate::composer::{Composer, Package};
use crate::config::PlannerConfig;
use crate::offers::{ConstraintsError, SearchConstraints};
use crate::selector::{select, Selection};
use crate::sources::{
    ClientError, FlightApiClient, FlightQuery, FlightSource, HotelApiClient, HotelQuery,
    HotelSource, SourceAdvisory, SourceOutcome,
};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub candidates: usize,
    pub advisory: Option<SourceAdvisory>,
}

impl SourceSummary {
    fn of<T>(outcome: &SourceOutcome<T>) -> Self {
        Self {
            candidates: outcome.offers().len(),
            advisory: outcome.advisory(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchReport {
    pub constraints: SearchConstraints,
    pub flights: SourceSummary,
    pub hotels: SourceSummary,
    // Packages before the budget and top-N cut
    pub composed: usize,
    pub selection: Selection,
}

impl SearchReport {
    pub fn packages(&self) -> &[Package] {
        &self.selection.packages
    }
}

pub struct TravelPlanner<F, H> {
    flights: F,
    hotels: H,
    composer: Composer,
    currency: String,
    top_n: usize,
}

impl TravelPlanner<FlightApiClient, HotelApiClient> {
    // Planner backed by the HTTP supplier clients
    pub fn from_config(config: &PlannerConfig) -> Result<Self, ClientError> {
        config
            .validate()
            .map_err(|e| ClientError::ConfigError(e.to_string()))?;
        let flights = FlightApiClient::new(config)?;
        let hotels = HotelApiClient::new(config)?;
        Ok(Self::new(flights, hotels, config))
    }
}

impl<F: FlightSource, H: HotelSource> TravelPlanner<F, H> {
    pub fn new(flights: F, hotels: H, config: &PlannerConfig) -> Self {
        Self {
            flights,
            hotels,
            composer: Composer::new(config.pricing_policy, config.missing_key_policy),
            currency: config.currency.clone(),
            top_n: config.top_n,
        }
    }

    pub fn flight_source(&self) -> &F {
        &self.flights
    }

    pub fn hotel_source(&self) -> &H {
        &self.hotels
    }

    // Only invalid constraints are an error; an empty selection is a normal report
    pub async fn search(
        &self,
        constraints: &SearchConstraints,
    ) -> Result<SearchReport, ConstraintsError> {
        let constraints = constraints.validated()?;
        let flight_query = FlightQuery::from_constraints(&constraints, &self.currency);
        let hotel_query = HotelQuery::from_constraints(&constraints);

        let (flight_outcome, hotel_outcome) = futures::join!(
            self.flights.find_flights(&flight_query),
            self.hotels.find_hotels(&hotel_query)
        );

        let flights = SourceSummary::of(&flight_outcome);
        let hotels = SourceSummary::of(&hotel_outcome);

        let packages = self
            .composer
            .compose(flight_outcome.offers(), hotel_outcome.offers());
        let composed = packages.len();
        let selection = select(packages, constraints.max_budget, self.top_n);

        match selection.advisory {
            Some(advisory) => warn!(
                origin = %constraints.origin,
                destination = %constraints.destination,
                composed,
                %advisory,
                "no matching packages"
            ),
            None => info!(
                origin = %constraints.origin,
                destination = %constraints.destination,
                composed,
                selected = selection.packages.len(),
                "search finished"
            ),
        }

        Ok(SearchReport {
            constraints,
            flights,
            hotels,
            composed,
            selection,
        })
    }
}
