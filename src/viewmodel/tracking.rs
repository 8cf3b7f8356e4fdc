//! Live-location view model
//!
//! Mirrors the geolocator's tracking status and latest fix, and resolves each
//! fix to a locality name through the geocoder. A listener task subscribes to
//! the provider for the lifetime of the view model and forwards everything
//! through an event channel.

use crate::geo::{
    Coordinates, Geocoder, Geolocator, Location, TrackingRequest, TrackingStatus,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

enum TrackingEvent {
    Status(TrackingStatus),
    Fix(Location),
    Locality {
        fix: Coordinates,
        name: Option<String>,
    },
}

/// UI state for the live-location screen
pub struct TrackingViewModel {
    locator: Arc<dyn Geolocator>,
    status: TrackingStatus,
    position: Option<Coordinates>,
    accuracy_meters: Option<f64>,
    locality: Option<String>,
    last_fix: Option<instant::Instant>,
    events_rx: UnboundedReceiver<TrackingEvent>,
    listener: JoinHandle<()>,
}

impl TrackingViewModel {
    /// Create the view model and subscribe to the geolocator.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(locator: Arc<dyn Geolocator>, geocoder: Arc<dyn Geocoder>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let listener = tokio::spawn(Self::listen(
            locator.updates(),
            locator.tracking_status(),
            geocoder,
            events_tx,
        ));

        Self {
            locator,
            status: TrackingStatus::Idle,
            position: None,
            accuracy_meters: None,
            locality: None,
            last_fix: None,
            events_rx,
            listener,
        }
    }

    /// Forward provider events into the view-model channel, resolving each
    /// fix to a locality as it arrives
    async fn listen(
        mut updates: broadcast::Receiver<Location>,
        mut status: watch::Receiver<TrackingStatus>,
        geocoder: Arc<dyn Geocoder>,
        events: UnboundedSender<TrackingEvent>,
    ) {
        loop {
            tokio::select! {
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *status.borrow_and_update();
                    if events.send(TrackingEvent::Status(current)).is_err() {
                        break;
                    }
                }
                update = updates.recv() => match update {
                    Ok(location) => {
                        let fix = location.coordinates;
                        if events.send(TrackingEvent::Fix(location)).is_err() {
                            break;
                        }
                        let name = match geocoder.reverse_geocode(fix).await {
                            Ok(place) => place.map(|p| p.locality),
                            Err(e) => {
                                tracing::warn!("reverse geocoding failed: {e}");
                                None
                            }
                        };
                        if events.send(TrackingEvent::Locality { fix, name }).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("dropped {skipped} stale location updates");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    /// Request high-accuracy tracking. No-op while a session is active.
    pub fn start(&mut self) {
        if self.status.is_active() {
            return;
        }
        let locator = self.locator.clone();
        tokio::spawn(async move {
            if let Err(e) = locator.start_tracking(TrackingRequest::high_accuracy()).await {
                tracing::error!("failed to start tracking: {e}");
            }
        });
    }

    /// End tracking and clear the fix. Safe to call when idle.
    pub fn stop(&mut self) {
        let locator = self.locator.clone();
        tokio::spawn(async move {
            locator.stop_tracking().await;
        });
        self.position = None;
        self.accuracy_meters = None;
        self.locality = None;
        self.last_fix = None;
    }

    /// Drain pending provider events. Returns whether any state changed.
    pub fn process_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                TrackingEvent::Status(status) => self.status = status,
                TrackingEvent::Fix(location) => {
                    self.position = Some(location.coordinates);
                    self.accuracy_meters = location.accuracy_meters;
                    self.last_fix = Some(instant::Instant::now());
                }
                TrackingEvent::Locality { fix, name } => {
                    // A newer fix may have superseded the one this name was
                    // resolved for; only the latest fix gets a locality.
                    if self.position == Some(fix) {
                        self.locality = name;
                    }
                }
            }
            changed = true;
        }
        changed
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    pub fn position(&self) -> Option<Coordinates> {
        self.position
    }

    /// Estimated accuracy of the latest fix in meters, when reported
    pub fn accuracy_meters(&self) -> Option<f64> {
        self.accuracy_meters
    }

    pub fn locality(&self) -> Option<&str> {
        self.locality.as_deref()
    }

    /// Age of the latest fix, if any
    pub fn last_fix_age(&self) -> Option<Duration> {
        self.last_fix.map(|at| at.elapsed())
    }
}

impl Drop for TrackingViewModel {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
