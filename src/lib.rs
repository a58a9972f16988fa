// Main library file for the travel package composer

// Offer model, normalization and the pairing pipeline
pub mod composer;
pub mod config;
pub mod offers;
pub mod planner;
pub mod selector;
pub mod sources;
pub mod supplier; // Raw supplier payload shapes

// Re-export key types for convenience
pub use composer::{compose, Composer, MissingKeyPolicy, Package, PricingPolicy};
pub use config::{ConfigError, FlightApiConfig, HotelApiConfig, PlannerConfig};
pub use offers::{
    ConstraintsError, FlightNumber, FlightOffer, HotelName, HotelOffer, NormalizationError,
    OfferNormalizer, SearchConstraints,
};
pub use planner::{SearchReport, SourceSummary, TravelPlanner};
pub use selector::{select, Selection, SelectionAdvisory};
pub use sources::{
    ClientError, FlightApiClient, FlightQuery, FlightSource, HotelApiClient, HotelQuery,
    HotelSource, SourceAdvisory, SourceError, SourceOutcome, SourceStats,
};
