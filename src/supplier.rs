use serde::{Deserialize, Serialize};

// Data structures for the flight prices JSON response.
// `data` stays untyped so a single bad record can be dropped without
// rejecting the whole payload.
#[derive(Debug, Deserialize, Serialize)]
pub struct SupplierFlightsResponse {
    #[serde(default)]
    pub success: bool,
    // Sent as null when the route has no prices
    #[serde(default)]
    pub data: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SupplierFlight {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub origin_airport: Option<String>,
    pub destination_airport: Option<String>,
    pub price: Option<f64>,
    pub airline: Option<String>,
    // Some routes report this as a number, others as a string
    pub flight_number: Option<serde_json::Value>,
    pub departure_at: Option<String>,
    pub return_at: Option<String>,
    pub transfers: Option<u32>,
    pub return_transfers: Option<u32>,
    pub duration: Option<u32>,
    pub duration_to: Option<u32>,
    pub duration_back: Option<u32>,
    pub link: Option<String>,
}

impl SupplierFlight {
    pub fn flight_number_text(&self) -> Option<String> {
        match self.flight_number.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

// Hotel cache responses are a bare JSON array of these records
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierHotel {
    pub hotel_id: Option<u64>,
    pub hotel_name: Option<String>,
    pub price_from: Option<f64>,
    pub price_avg: Option<f64>,
    pub stars: Option<i64>,
}
