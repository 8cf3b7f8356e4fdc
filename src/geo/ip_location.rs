//! IP-based geolocator
//!
//! Resolves the device position from its public IP address via ip-api.com.
//! Tracking is implemented as a polling loop whose interval follows the
//! requested priority. Accuracy is city-level at best, reported as a fixed
//! radius estimate with every fix.

use crate::geo::{
    Coordinates, GeoError, Geolocator, Location, Priority, Result, TrackingRequest, TrackingStatus,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Free IP geolocation endpoint, no key required
pub const DEFAULT_URL: &str = "http://ip-api.com/json";

/// Fan-out capacity for fixes; slow subscribers lose the oldest fixes first
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// City-level accuracy estimate attached to every fix, in meters
const IP_ACCURACY_METERS: f64 = 25_000.0;

/// Geolocator backed by an IP geolocation HTTP service
pub struct IpGeolocator {
    client: reqwest::Client,
    endpoint: String,
    base_interval: Duration,
    updates_tx: broadcast::Sender<Location>,
    status_tx: watch::Sender<TrackingStatus>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// ip-api.com response
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

impl IpGeolocator {
    /// Create a geolocator polling the given endpoint.
    ///
    /// `base_interval` is the poll interval at high accuracy; lower priorities
    /// poll proportionally less often.
    pub fn new(endpoint: impl Into<String>, base_interval: Duration) -> Self {
        let (updates_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let (status_tx, _) = watch::channel(TrackingStatus::Idle);

        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            base_interval,
            updates_tx,
            status_tx,
            worker: Mutex::new(None),
        }
    }

    /// Whether a tracking worker is currently alive
    #[allow(dead_code)] // Exercised by tests; the UI mirrors the status channel instead
    pub fn is_tracking(&self) -> bool {
        self.worker
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn poll_interval(&self, priority: Priority) -> Duration {
        match priority {
            Priority::HighAccuracy => self.base_interval,
            Priority::Balanced => self.base_interval * 2,
            Priority::LowPower => self.base_interval * 4,
        }
    }

    async fn fetch(client: &reqwest::Client, endpoint: &str) -> Result<Location> {
        let response = client.get(endpoint).send().await?;

        if !response.status().is_success() {
            return Err(GeoError::OperationFailed(format!(
                "IP geolocation service returned {}",
                response.status()
            )));
        }

        let data: IpApiResponse = response.json().await?;
        Self::location_from(data)
    }

    /// Turn a raw API response into a fix
    fn location_from(data: IpApiResponse) -> Result<Location> {
        if data.status != "success" {
            let message = data
                .message
                .unwrap_or_else(|| "IP geolocation lookup failed".to_string());
            // ip-api reports "private range" / "reserved range" for
            // addresses that cannot be located at all.
            return Err(if message.contains("range") {
                GeoError::NotSupported(message)
            } else {
                GeoError::NotFound(message)
            });
        }

        let latitude = data
            .lat
            .ok_or_else(|| GeoError::NotFound("no latitude in response".to_string()))?;
        let longitude = data
            .lon
            .ok_or_else(|| GeoError::NotFound("no longitude in response".to_string()))?;

        Ok(Location {
            coordinates: Coordinates::new(latitude, longitude),
            accuracy_meters: Some(IP_ACCURACY_METERS),
        })
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn current_location(&self) -> Result<Location> {
        Self::fetch(&self.client, &self.endpoint).await
    }

    async fn start_tracking(&self, request: TrackingRequest) -> Result<()> {
        let mut worker = self.worker.lock().unwrap();
        if let Some(handle) = worker.as_ref() {
            if !handle.is_finished() {
                tracing::debug!("tracking already active, ignoring start request");
                return Ok(());
            }
        }

        let interval = self.poll_interval(request.priority);
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let updates_tx = self.updates_tx.clone();
        let status_tx = self.status_tx.clone();

        let _ = status_tx.send(TrackingStatus::Acquiring);
        tracing::info!(
            priority = ?request.priority,
            interval_secs = interval.as_secs(),
            "starting location tracking"
        );

        *worker = Some(tokio::spawn(async move {
            loop {
                match Self::fetch(&client, &endpoint).await {
                    Ok(location) => {
                        let _ = status_tx.send(TrackingStatus::Tracking);
                        let _ = updates_tx.send(location);
                    }
                    Err(e) => tracing::warn!("location poll failed: {e}"),
                }
                tokio::time::sleep(interval).await;
            }
        }));

        Ok(())
    }

    async fn stop_tracking(&self) {
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::info!("stopped location tracking");
        }
        self.status_tx.send_if_modified(|status| {
            let was_active = status.is_active();
            *status = TrackingStatus::Idle;
            was_active
        });
    }

    fn updates(&self) -> broadcast::Receiver<Location> {
        self.updates_tx.subscribe()
    }

    fn tracking_status(&self) -> watch::Receiver<TrackingStatus> {
        self.status_tx.subscribe()
    }
}

impl Drop for IpGeolocator {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.lock().unwrap().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // Points at a closed local port so polls fail fast without touching
    // the network.
    fn offline_locator() -> IpGeolocator {
        IpGeolocator::new("http://127.0.0.1:9/json", Duration::from_secs(60))
    }

    #[test]
    fn test_location_from_success() {
        let data: IpApiResponse = serde_json::from_str(
            r#"{"status":"success","lat":51.5074,"lon":-0.1278,"city":"London","country":"United Kingdom"}"#,
        )
        .unwrap();

        let location = IpGeolocator::location_from(data).unwrap();
        assert_relative_eq!(location.coordinates.latitude, 51.5074);
        assert_relative_eq!(location.coordinates.longitude, -0.1278);
        assert!(location.accuracy_meters.is_some());
    }

    #[test]
    fn test_location_from_failure() {
        let data: IpApiResponse =
            serde_json::from_str(r#"{"status":"fail","message":"invalid query"}"#).unwrap();

        assert!(matches!(
            IpGeolocator::location_from(data),
            Err(GeoError::NotFound(_))
        ));
    }

    #[test]
    fn test_location_from_reserved_range() {
        let data: IpApiResponse =
            serde_json::from_str(r#"{"status":"fail","message":"private range"}"#).unwrap();

        assert!(matches!(
            IpGeolocator::location_from(data),
            Err(GeoError::NotSupported(_))
        ));
    }

    #[test]
    fn test_poll_interval_scales_with_priority() {
        let locator = IpGeolocator::new(DEFAULT_URL, Duration::from_secs(30));

        assert_eq!(
            locator.poll_interval(Priority::HighAccuracy),
            Duration::from_secs(30)
        );
        assert_eq!(
            locator.poll_interval(Priority::Balanced),
            Duration::from_secs(60)
        );
        assert_eq!(
            locator.poll_interval(Priority::LowPower),
            Duration::from_secs(120)
        );
    }

    #[tokio::test]
    async fn test_overlapping_starts_share_one_worker() {
        let locator = offline_locator();

        locator
            .start_tracking(TrackingRequest::high_accuracy())
            .await
            .unwrap();
        locator
            .start_tracking(TrackingRequest::high_accuracy())
            .await
            .unwrap();

        assert!(locator.is_tracking());
        assert!(locator.tracking_status().borrow().is_active());

        locator.stop_tracking().await;
        assert!(!locator.is_tracking());
        assert_eq!(*locator.tracking_status().borrow(), TrackingStatus::Idle);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let locator = offline_locator();

        locator.stop_tracking().await;
        locator.stop_tracking().await;

        assert!(!locator.is_tracking());
        assert_eq!(*locator.tracking_status().borrow(), TrackingStatus::Idle);
    }
}
