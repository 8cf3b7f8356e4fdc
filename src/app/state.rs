//! Application state management
//!
//! This module owns the view models and UI settings, wires them to the
//! concrete providers, and funnels the one-shot startup fix back to the
//! UI thread.

use crate::app::settings::Settings;
use crate::geo::ip_location::IpGeolocator;
use crate::geo::nominatim::NominatimClient;
use crate::geo::{Coordinates, Geocoder, Geolocator};
use crate::viewmodel::{SearchViewModel, TrackingViewModel};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Main application state
pub struct AppState {
    /// Live-location view model
    pub tracking: TrackingViewModel,

    /// Place search view model
    pub search: SearchViewModel,

    /// Current UI settings
    pub ui_settings: UiSettings,

    /// Map recenter requested by the UI (e.g. a place selection)
    pub pending_center: Option<Coordinates>,

    /// Last fix the map was centered on while following
    pub last_centered: Option<Coordinates>,

    /// One-shot startup fix used to center the map initially
    initial_fix: Option<oneshot::Receiver<Coordinates>>,
}

/// UI-specific settings that can be adjusted at runtime
#[derive(Clone)]
pub struct UiSettings {
    /// Whether sidebar is open
    pub sidebar_open: bool,

    /// Current active tab in sidebar
    pub active_tab: SidebarTab,

    /// Map tiles provider
    pub tiles_provider: TilesProvider,

    /// Keep the map centered on the latest fix
    pub follow_position: bool,
}

/// Sidebar tabs
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SidebarTab {
    Location,
    Search,
    Settings,
}

/// Available map tile providers
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TilesProvider {
    OpenStreetMap,
    OpenTopoMap,
}

impl TilesProvider {
    pub fn attribution(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "© OpenStreetMap contributors",
            Self::OpenTopoMap => "© OpenTopoMap (CC-BY-SA)",
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::OpenStreetMap, Self::OpenTopoMap]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "OpenStreetMap",
            Self::OpenTopoMap => "OpenTopoMap",
        }
    }
}

impl AppState {
    /// Create application state and providers from CLI settings.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(settings: &Settings) -> Self {
        let locator: Arc<dyn Geolocator> = Arc::new(IpGeolocator::new(
            settings.locator_url.clone(),
            Duration::from_secs(settings.poll_interval_secs),
        ));
        let nominatim = Arc::new(NominatimClient::new(
            settings.geocoder_url.clone(),
            settings.max_candidates,
        ));
        let geocoder: Arc<dyn Geocoder> = nominatim.clone();

        let tracking = TrackingViewModel::new(locator.clone(), geocoder.clone());
        let search = SearchViewModel::new(nominatim);

        let initial_fix = Some(Self::query_startup_fix(locator, geocoder));

        let ui_settings = UiSettings {
            sidebar_open: true,
            active_tab: SidebarTab::Location,
            tiles_provider: TilesProvider::OpenStreetMap,
            follow_position: !settings.no_follow,
        };

        Self {
            tracking,
            search,
            ui_settings,
            pending_center: None,
            last_centered: None,
            initial_fix,
        }
    }

    /// Query the current location once at startup, log it, and hand the
    /// coordinates back for the initial map view
    fn query_startup_fix(
        locator: Arc<dyn Geolocator>,
        geocoder: Arc<dyn Geocoder>,
    ) -> oneshot::Receiver<Coordinates> {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            match locator.current_location().await {
                Ok(location) => {
                    let coordinates = location.coordinates;
                    tracing::info!(
                        latitude = coordinates.latitude,
                        longitude = coordinates.longitude,
                        "current location"
                    );
                    match geocoder.reverse_geocode(coordinates).await {
                        Ok(Some(place)) => {
                            tracing::info!(locality = %place.locality, "current location name");
                        }
                        Ok(None) => tracing::info!("current location has no known locality"),
                        Err(e) => tracing::warn!("reverse geocoding the startup fix failed: {e}"),
                    }
                    let _ = tx.send(coordinates);
                }
                Err(e) => tracing::error!("could not determine current location: {e}"),
            }
        });
        rx
    }

    /// Take the startup fix once it has arrived
    pub fn take_initial_fix(&mut self) -> Option<Coordinates> {
        let rx = self.initial_fix.as_mut()?;
        match rx.try_recv() {
            Ok(coordinates) => {
                self.initial_fix = None;
                Some(coordinates)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.initial_fix = None;
                None
            }
        }
    }

    /// Drain pending view-model events. Returns whether any state changed.
    pub fn process_events(&mut self) -> bool {
        let tracking_changed = self.tracking.process_events();
        let search_changed = self.search.process_events();
        tracking_changed || search_changed
    }

    /// Whether background work may still deliver events
    pub fn is_busy(&self) -> bool {
        self.tracking.status().is_active()
            || self.search.is_searching()
            || self.initial_fix.is_some()
    }
}
