//! Nominatim geocoding and autocomplete backend (OpenStreetMap)
//!
//! One client implements both reverse geocoding and place search over the
//! free Nominatim API. Requests carry a descriptive User-Agent as required by
//! the Nominatim usage policy, and reverse lookups are cached so repeated
//! fixes at the same spot do not re-query the service.

use crate::geo::{Coordinates, GeoError, Geocoder, Place, PlaceSearch, Result};
use async_trait::async_trait;
use lru::LruCache;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Default public Nominatim instance
pub const DEFAULT_URL: &str = "https://nominatim.openstreetmap.org";

const USER_AGENT: &str = concat!("whereabouts/", env!("CARGO_PKG_VERSION"));

/// Reverse lookups cached by fix rounded to roughly 100 m
const REVERSE_CACHE_SIZE: usize = 256;

/// Nominatim client implementing [`Geocoder`] and [`PlaceSearch`]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    max_candidates: usize,
    reverse_cache: Mutex<LruCache<(i64, i64), Option<Place>>>,
}

/// One item of a Nominatim response
#[derive(Debug, Deserialize)]
struct NominatimResult {
    #[serde(default)]
    lat: String,
    #[serde(default)]
    lon: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    address: Option<NominatimAddress>,
    /// Present instead of the other fields when a reverse lookup finds nothing
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

impl NominatimClient {
    /// Create a client against the given Nominatim base URL
    pub fn new(base_url: impl Into<String>, max_candidates: usize) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            max_candidates,
            reverse_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(REVERSE_CACHE_SIZE).unwrap(),
            )),
        }
    }

    /// Parse lat/lng strings to f64
    fn parse_coords(lat: &str, lon: &str) -> Result<(f64, f64)> {
        let latitude: f64 = lat
            .parse()
            .map_err(|_| GeoError::OperationFailed(format!("invalid latitude: {lat}")))?;
        let longitude: f64 = lon
            .parse()
            .map_err(|_| GeoError::OperationFailed(format!("invalid longitude: {lon}")))?;
        Ok((latitude, longitude))
    }

    /// Turn one response item into a [`Place`].
    ///
    /// The locality prefers the most specific settlement name in the address,
    /// then the first component of the display name. The country is the
    /// uppercased ISO code when present.
    fn to_place(result: NominatimResult) -> Result<Place> {
        let (latitude, longitude) = Self::parse_coords(&result.lat, &result.lon)?;
        let address = result.address.unwrap_or_default();

        let locality = address
            .city
            .or(address.town)
            .or(address.village)
            .or(address.hamlet)
            .or(address.municipality)
            .or(address.county)
            .or(address.state)
            .unwrap_or_else(|| {
                let first = result.display_name.split(',').next().unwrap_or("").trim();
                if first.is_empty() {
                    format!("{latitude:.4}, {longitude:.4}")
                } else {
                    first.to_string()
                }
            });

        let country = address
            .country_code
            .map(|code| code.to_uppercase())
            .or(address.country)
            .unwrap_or_default();

        Ok(Place {
            locality,
            country,
            coordinates: Coordinates::new(latitude, longitude),
        })
    }

    fn cache_key(coordinates: Coordinates) -> (i64, i64) {
        (
            (coordinates.latitude * 1000.0).round() as i64,
            (coordinates.longitude * 1000.0).round() as i64,
        )
    }

    fn check_status(status: reqwest::StatusCode) -> Result<()> {
        if status == reqwest::StatusCode::FORBIDDEN
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {
            return Err(GeoError::PermissionDenied(format!(
                "geocoding service refused the request: {status}"
            )));
        }
        if !status.is_success() {
            return Err(GeoError::OperationFailed(format!(
                "geocoding service returned {status}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<Option<Place>> {
        let key = Self::cache_key(coordinates);
        if let Some(cached) = self.reverse_cache.lock().unwrap().get(&key).cloned() {
            return Ok(cached);
        }

        let url = format!(
            "{}/reverse?lat={}&lon={}&format=jsonv2&addressdetails=1",
            self.base_url, coordinates.latitude, coordinates.longitude
        );

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            self.reverse_cache.lock().unwrap().put(key, None);
            return Ok(None);
        }
        Self::check_status(response.status())?;

        let result: NominatimResult = response.json().await?;
        let place = if result.error.is_some() {
            None
        } else {
            Some(Self::to_place(result)?)
        };

        self.reverse_cache.lock().unwrap().put(key, place.clone());
        Ok(place)
    }
}

#[async_trait]
impl PlaceSearch for NominatimClient {
    async fn search(&self, query: &str) -> Result<Vec<Place>> {
        let url = format!(
            "{}/search?q={}&format=jsonv2&addressdetails=1&limit={}",
            self.base_url,
            urlencoding::encode(query),
            self.max_candidates
        );

        let response = self.client.get(&url).send().await?;
        Self::check_status(response.status())?;

        let results: Vec<NominatimResult> = response.json().await?;
        Ok(results
            .into_iter()
            .filter_map(|result| match Self::to_place(result) {
                Ok(place) => Some(place),
                Err(e) => {
                    tracing::warn!("skipping malformed search result: {e}");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_coords() {
        let (lat, lon) = NominatimClient::parse_coords("40.7128", "-74.0060").unwrap();
        assert_relative_eq!(lat, 40.7128);
        assert_relative_eq!(lon, -74.0060);
    }

    #[test]
    fn test_parse_coords_invalid() {
        assert!(NominatimClient::parse_coords("invalid", "0").is_err());
        assert!(NominatimClient::parse_coords("0", "invalid").is_err());
    }

    #[test]
    fn test_to_place_prefers_city_and_country_code() {
        let result: NominatimResult = serde_json::from_str(
            r#"{
                "lat": "48.8566",
                "lon": "2.3522",
                "display_name": "Paris, Ile-de-France, Metropolitan France, France",
                "address": {
                    "city": "Paris",
                    "state": "Ile-de-France",
                    "country": "France",
                    "country_code": "fr"
                }
            }"#,
        )
        .unwrap();

        let place = NominatimClient::to_place(result).unwrap();
        assert_eq!(place.locality, "Paris");
        assert_eq!(place.country, "FR");
        assert_relative_eq!(place.coordinates.latitude, 48.8566);
        assert_relative_eq!(place.coordinates.longitude, 2.3522);
    }

    #[test]
    fn test_to_place_falls_back_to_display_name() {
        let result: NominatimResult = serde_json::from_str(
            r#"{
                "lat": "27.9881",
                "lon": "86.9250",
                "display_name": "Mount Everest, Khumbu, Nepal"
            }"#,
        )
        .unwrap();

        let place = NominatimClient::to_place(result).unwrap();
        assert_eq!(place.locality, "Mount Everest");
        assert_eq!(place.country, "");
    }

    #[test]
    fn test_search_response_parses_as_candidate_list() {
        let results: Vec<NominatimResult> = serde_json::from_str(
            r#"[
                {"lat": "48.8566", "lon": "2.3522", "display_name": "Paris, France",
                 "address": {"city": "Paris", "country_code": "fr"}},
                {"lat": "33.6617", "lon": "-95.5555", "display_name": "Paris, Texas, USA",
                 "address": {"city": "Paris", "country_code": "us"}}
            ]"#,
        )
        .unwrap();

        let places: Vec<Place> = results
            .into_iter()
            .filter_map(|r| NominatimClient::to_place(r).ok())
            .collect();

        assert_eq!(places.len(), 2);
        assert_eq!(places[0].country, "FR");
        assert_eq!(places[1].country, "US");
    }

    #[test]
    fn test_reverse_error_body_is_detected() {
        let result: NominatimResult =
            serde_json::from_str(r#"{"error": "Unable to geocode"}"#).unwrap();
        assert!(result.error.is_some());
    }

    #[test]
    fn test_cache_key_groups_nearby_fixes() {
        let a = NominatimClient::cache_key(Coordinates::new(48.85662, 2.35221));
        let b = NominatimClient::cache_key(Coordinates::new(48.85659, 2.35218));
        let far = NominatimClient::cache_key(Coordinates::new(48.9000, 2.3522));

        assert_eq!(a, b);
        assert_ne!(a, far);
    }
}
