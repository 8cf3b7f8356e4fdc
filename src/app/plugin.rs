//! Walkers plugin drawing the location markers on the map
//!
//! Renders the current tracked position as a dot and the selected search
//! result as a labeled pin.

use crate::geo::{Coordinates, Place};
use egui::{Color32, Stroke};
use walkers::{Plugin, Projector};

const POSITION_COLOR: Color32 = Color32::from_rgb(70, 130, 220);
const SELECTION_COLOR: Color32 = Color32::from_rgb(220, 70, 70);

/// Plugin for rendering the position and selection markers
pub struct MarkerPlugin {
    position: Option<Coordinates>,
    selected: Option<Place>,
}

impl MarkerPlugin {
    pub fn new(position: Option<Coordinates>, selected: Option<Place>) -> Self {
        Self { position, selected }
    }

    fn screen_pos(projector: &Projector, coordinates: Coordinates) -> egui::Pos2 {
        let projected = projector.project(walkers::lat_lon(
            coordinates.latitude,
            coordinates.longitude,
        ));
        egui::Pos2::new(projected.x, projected.y)
    }
}

impl Plugin for MarkerPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        _response: &egui::Response,
        projector: &Projector,
        _map_memory: &walkers::MapMemory,
    ) {
        let painter = ui.painter();

        if let Some(position) = self.position {
            let center = Self::screen_pos(projector, position);
            painter.circle_filled(center, 7.0, POSITION_COLOR);
            painter.circle_stroke(center, 7.0, Stroke::new(2.0, Color32::WHITE));
        }

        if let Some(place) = &self.selected {
            let center = Self::screen_pos(projector, place.coordinates);
            painter.circle_filled(center, 6.0, SELECTION_COLOR);
            painter.circle_stroke(center, 6.0, Stroke::new(2.0, Color32::WHITE));
            painter.text(
                center + egui::vec2(0.0, -12.0),
                egui::Align2::CENTER_BOTTOM,
                place.label(),
                egui::FontId::proportional(13.0),
                Color32::from_black_alpha(200),
            );
        }
    }
}
