//! Location services
//!
//! Core value types and the provider interfaces that abstract the external
//! geolocation, geocoding and place-search services. Concrete backends live
//! in the submodules; the view models only ever talk to these traits, so any
//! platform location service can be substituted without touching them.

pub mod ip_location;
pub mod nominatim;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

/// A coordinate pair in WGS84 degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees, positive north
    pub latitude: f64,
    /// Longitude in degrees, positive east
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A single fix emitted by a [`Geolocator`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    pub coordinates: Coordinates,
    /// Estimated horizontal accuracy in meters, when the backend reports one
    pub accuracy_meters: Option<f64>,
}

/// A named place produced by geocoding or autocomplete
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Human-readable place/city name
    pub locality: String,
    /// Uppercased country code when the backend provides one, country name otherwise
    pub country: String,
    pub coordinates: Coordinates,
}

impl Place {
    /// Label shown in candidate lists and the selection summary
    pub fn label(&self) -> String {
        if self.country.is_empty() {
            self.locality.clone()
        } else {
            format!("{} ({})", self.locality, self.country)
        }
    }
}

/// Subscription state of a [`Geolocator`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrackingStatus {
    /// No tracking session
    #[default]
    Idle,
    /// Tracking requested, waiting for the first fix
    Acquiring,
    /// Receiving location updates
    Tracking,
}

impl TrackingStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, TrackingStatus::Idle)
    }
}

/// Requested accuracy/power trade-off for a tracking session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Priority {
    HighAccuracy,
    #[default]
    Balanced,
    LowPower,
}

/// Options for [`Geolocator::start_tracking`]
#[derive(Clone, Copy, Debug, Default)]
pub struct TrackingRequest {
    pub priority: Priority,
}

impl TrackingRequest {
    pub fn high_accuracy() -> Self {
        Self {
            priority: Priority::HighAccuracy,
        }
    }
}

/// Errors produced by the location service backends
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("location not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for location service operations
pub type Result<T> = std::result::Result<T, GeoError>;

/// Continuous and point-query access to the device location
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Query the current location once, without starting a tracking session
    async fn current_location(&self) -> Result<Location>;

    /// Begin emitting fixes on the [`updates`](Self::updates) channel.
    ///
    /// Calling this while a tracking session is already running is a no-op;
    /// a single subscription is shared by all observers.
    async fn start_tracking(&self, request: TrackingRequest) -> Result<()>;

    /// End the tracking session, if any. Safe to call when idle.
    async fn stop_tracking(&self);

    /// Subscribe to the stream of location updates
    fn updates(&self) -> broadcast::Receiver<Location>;

    /// Observe the tracking status
    fn tracking_status(&self) -> watch::Receiver<TrackingStatus>;
}

/// Resolves coordinates to a named place
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Reverse geocode, returning `Ok(None)` when no place is known there
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<Option<Place>>;
}

/// Resolves a free-text query to a ranked list of place candidates
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Place>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_label() {
        let place = Place {
            locality: "Paris".to_string(),
            country: "FR".to_string(),
            coordinates: Coordinates::new(48.85, 2.35),
        };
        assert_eq!(place.label(), "Paris (FR)");
    }

    #[test]
    fn test_place_label_without_country() {
        let place = Place {
            locality: "Null Island".to_string(),
            country: String::new(),
            coordinates: Coordinates::new(0.0, 0.0),
        };
        assert_eq!(place.label(), "Null Island");
    }

    #[test]
    fn test_tracking_status_activity() {
        assert!(!TrackingStatus::Idle.is_active());
        assert!(TrackingStatus::Acquiring.is_active());
        assert!(TrackingStatus::Tracking.is_active());
    }

    #[test]
    fn test_place_serialization() {
        let place = Place {
            locality: "Berlin".to_string(),
            country: "DE".to_string(),
            coordinates: Coordinates::new(52.52, 13.405),
        };

        let json = serde_json::to_string(&place).unwrap();
        let parsed: Place = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, place);
    }
}
