//! Application module
//!
//! This module provides the main application structure:
//! - Full-screen map view with position and selection markers
//! - Toggleable sidebar with tabs (Location, Search and Settings)
//! - Follow mode keeping the map centered on the latest fix

mod plugin;
pub(crate) mod settings;
mod state;
mod ui_panels;

use crate::app::plugin::MarkerPlugin;
use crate::app::settings::Settings;
use crate::app::state::{AppState, TilesProvider};
use crate::geo::Coordinates;
use eframe::egui;
use std::time::Duration;
use walkers::{
    HttpTiles, Map, MapMemory, TileId,
    sources::{Attribution, OpenStreetMap, TileSource},
};

/// Custom OpenTopoMap tile source
pub struct OpenTopoMap;

impl TileSource for OpenTopoMap {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://tile.opentopomap.org/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© OpenTopoMap (CC-BY-SA)",
            url: "https://opentopomap.org/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        17 // OpenTopoMap serves no tiles beyond zoom 17
    }
}

/// Zoom level used when centering on a fix or a selected place
const CENTER_ZOOM: f64 = 11.0;

/// Main application structure
pub struct WhereaboutsApp {
    /// Application state (view models, UI settings)
    state: AppState,

    /// Map tiles provider (OpenStreetMap)
    tiles_osm: HttpTiles,

    /// Map tiles provider (OpenTopoMap)
    tiles_otm: HttpTiles,

    /// Map camera state (center, zoom)
    map_memory: MapMemory,

    /// Show help overlay
    show_help: bool,

    /// Start tracking on the first frame
    auto_track: bool,

    /// Whether the first frame has run
    started: bool,
}

impl WhereaboutsApp {
    pub fn new(settings: Settings, cc: &eframe::CreationContext<'_>) -> Self {
        let state = AppState::new(&settings);

        let tiles_osm = HttpTiles::new(OpenStreetMap, cc.egui_ctx.clone());
        let tiles_otm = HttpTiles::new(OpenTopoMap, cc.egui_ctx.clone());

        Self {
            state,
            tiles_osm,
            tiles_otm,
            map_memory: MapMemory::default(),
            show_help: false,
            auto_track: settings.auto_track,
            started: false,
        }
    }

    fn center_on(&mut self, coordinates: Coordinates) {
        self.map_memory
            .center_at(walkers::lat_lon(coordinates.latitude, coordinates.longitude));
        let _ = self.map_memory.set_zoom(CENTER_ZOOM);
    }
}

impl eframe::App for WhereaboutsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Keyboard shortcuts
        ctx.input(|i| {
            if i.key_pressed(egui::Key::F1) || (i.key_pressed(egui::Key::H) && i.modifiers.ctrl) {
                self.show_help = !self.show_help;
            }
        });

        if !self.started {
            self.started = true;
            if self.auto_track {
                self.state.tracking.start();
            }
        }

        // Marshal background results onto the UI thread
        if self.state.process_events() {
            ctx.request_repaint();
        }

        // Center the map once on the startup fix
        if let Some(coordinates) = self.state.take_initial_fix() {
            self.center_on(coordinates);
        }

        // Follow the newest fix
        if self.state.ui_settings.follow_position {
            if let Some(position) = self.state.tracking.position() {
                if self.state.last_centered != Some(position) {
                    self.state.last_centered = Some(position);
                    self.center_on(position);
                }
            }
        }

        // Recenter requested by the UI (place selection, 'Show on Map')
        if let Some(coordinates) = self.state.pending_center.take() {
            self.center_on(coordinates);
        }

        // Show help overlay if enabled
        if self.show_help {
            ui_panels::help_overlay(ctx, &mut self.show_help);
        }

        // Render the main sidebar (responsive: side or bottom based on orientation)
        ui_panels::render_sidebar(ctx, &mut self.state);

        // Values the map closure needs, read before self is mutably borrowed
        let position = self.state.tracking.position();
        let selected = self.state.search.selected().cloned();
        let tiles_provider = self.state.ui_settings.tiles_provider;
        let attribution_text = tiles_provider.attribution();

        // Central panel: Map view (full screen)
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let tiles: &mut HttpTiles = match tiles_provider {
                    TilesProvider::OpenStreetMap => &mut self.tiles_osm,
                    TilesProvider::OpenTopoMap => &mut self.tiles_otm,
                };

                let map = Map::new(
                    Some(tiles),
                    &mut self.map_memory,
                    walkers::lat_lon(0.0, 0.0),
                )
                .with_plugin(MarkerPlugin::new(position, selected));

                ui.add(map);

                ui_panels::sidebar_toggle_button(ui, &mut self.state);

                let painter = ui.painter();
                let screen_rect = ui.max_rect();
                painter.text(
                    screen_rect.center_bottom() + egui::vec2(0.0, -5.0),
                    egui::Align2::CENTER_BOTTOM,
                    attribution_text,
                    egui::FontId::proportional(10.0),
                    egui::Color32::from_black_alpha(180),
                );
            });

        // Keep polling for events while background work is pending
        if self.state.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}
