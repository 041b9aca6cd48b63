//! Catalog records pointing at local endpoints.

use arbfill::domain::{ArbitrageListing, ListingId, ListingRecord};

pub fn api_record(id: &str, platform: &str, endpoint: &str, source_cost: i64) -> ListingRecord {
    ListingRecord {
        id: ListingId::new(id),
        name: format!("{id} api"),
        platform: platform.to_string(),
        source_url: format!("https://{platform}.example.test/{id}"),
        source_cost,
        api_endpoint: Some(endpoint.to_string()),
        api_method: Some("POST".to_string()),
        credential: None,
        usage_instructions: None,
    }
}

pub fn api_listing(platform: &str, endpoint: &str) -> ArbitrageListing {
    ArbitrageListing::try_from(api_record("lst", platform, endpoint, 500)).unwrap()
}
