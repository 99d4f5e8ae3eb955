//! Client for the BODIK open-data POI API.

use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::geo::LatLng;
use crate::models::{Category, FeatureCollection, PoiFeature};
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://wapi.bodik.jp";
pub const DEFAULT_SEARCH_RADIUS_M: u32 = 20_000;
pub const DEFAULT_MAX_RESULTS: u32 = 100;

/// Anything that can return the POIs of one category around a point
pub trait PoiSource {
    fn fetch(&self, category: Category, center: LatLng) -> Result<Vec<PoiFeature>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub search_radius_m: u32,
    pub max_results: u32,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            max_results: DEFAULT_MAX_RESULTS,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Blocking HTTP client for the geometry search endpoint
pub struct PoiClient {
    client: Client,
    config: ApiConfig,
}

impl PoiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn request_url(&self, category: Category, center: LatLng) -> String {
        format!(
            "{}/{}?select_type=geometry&lat={}&lon={}&distance={}&maxResults={}",
            self.config.base_url.trim_end_matches('/'),
            category.endpoint(),
            center.lat,
            center.lon,
            self.config.search_radius_m,
            self.config.max_results
        )
    }
}

impl PoiSource for PoiClient {
    fn fetch(&self, category: Category, center: LatLng) -> Result<Vec<PoiFeature>> {
        let url = self.request_url(category, center);
        debug!(%url, "fetching POIs");

        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api(format!("HTTP error! status: {}", status.as_u16())));
        }

        let body: Value = response.json()?;
        let features = parse_response(body)?;
        debug!(category = %category, count = features.len(), "POIs fetched");
        Ok(features)
    }
}

/// Pull the feature list out of a response body
pub fn parse_response(body: Value) -> Result<Vec<PoiFeature>> {
    let resultsets = match body {
        Value::Object(mut fields) => fields.remove("resultsets"),
        _ => None,
    }
    .filter(|v| !v.is_null())
    .ok_or_else(|| Error::Api("Response has no resultsets".to_string()))?;

    let collection: FeatureCollection = serde_json::from_value(resultsets)?;
    match collection.features {
        Some(features) => Ok(features),
        None => {
            warn!("response has no features");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_url() {
        let client = PoiClient::new(ApiConfig::default()).unwrap();
        let url = client.request_url(Category::FreeWifi, LatLng::new(33.5902, 130.351903));
        assert_eq!(
            url,
            "https://wapi.bodik.jp/public_wireless_lan?select_type=geometry&lat=33.5902&lon=130.351903&distance=20000&maxResults=100"
        );
    }

    #[test]
    fn test_request_url_custom_config() {
        let config = ApiConfig {
            base_url: "http://localhost:8080/".to_string(),
            search_radius_m: 500,
            max_results: 10,
            ..Default::default()
        };
        let client = PoiClient::new(config).unwrap();
        let url = client.request_url(Category::Toilet, LatLng::new(1.0, 2.5));
        assert_eq!(
            url,
            "http://localhost:8080/public_toilet?select_type=geometry&lat=1&lon=2.5&distance=500&maxResults=10"
        );
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "resultsets": {
                "features": [
                    {"properties": {"name": "AED A", "resource_id": "a1"},
                     "geometry": {"coordinates": [130.35, 33.59]}},
                    {"properties": {"name": "AED B"}}
                ]
            }
        });
        let features = parse_response(body).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].resource_id().as_deref(), Some("a1"));
        assert!(features[1].position().is_none());
    }

    #[test]
    fn test_parse_response_without_features() {
        let features = parse_response(json!({"resultsets": {}})).unwrap();
        assert!(features.is_empty());
    }

    #[test]
    fn test_parse_response_without_resultsets() {
        assert!(matches!(parse_response(json!({"status": "ok"})), Err(Error::Api(_))));
        assert!(matches!(parse_response(json!({"resultsets": null})), Err(Error::Api(_))));
        assert!(matches!(parse_response(json!([])), Err(Error::Api(_))));
    }

    #[test]
    fn test_unreachable_server() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let client = PoiClient::new(config).unwrap();
        let result = client.fetch(Category::Aed, LatLng::new(33.0, 130.0));
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
