//! UI panels for the application
//!
//! This module provides the sidebar with its Location, Search and Settings
//! tabs, the sidebar toggle button overlaid on the map, and the help overlay.

use crate::app::state::{AppState, SidebarTab, TilesProvider};
use crate::geo::TrackingStatus;
use egui::{Color32, RichText, Ui};
use std::time::Duration;

/// Render the sidebar toggle button (overlaid on top-right of map)
pub fn sidebar_toggle_button(ui: &mut Ui, state: &mut AppState) {
    let button_size = egui::vec2(40.0, 40.0);
    let margin = 10.0;

    let rect = ui.max_rect();
    let button_pos = rect.right_top() + egui::vec2(-button_size.x - margin, margin);
    let button_rect = egui::Rect::from_min_size(button_pos, button_size);

    let response = ui.allocate_rect(button_rect, egui::Sense::click());

    if response.clicked() {
        state.ui_settings.sidebar_open = !state.ui_settings.sidebar_open;
    }

    let bg_color = if response.hovered() {
        ui.visuals().widgets.hovered.bg_fill
    } else {
        ui.visuals().widgets.inactive.bg_fill
    };

    ui.painter().rect_filled(button_rect, 5.0, bg_color);

    let icon = if state.ui_settings.sidebar_open {
        "✕"
    } else {
        "☰"
    };

    ui.painter().text(
        button_rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(20.0),
        ui.visuals().text_color(),
    );
}

/// Render the main sidebar (responsive: side on landscape, bottom on portrait)
pub fn render_sidebar(ctx: &egui::Context, state: &mut AppState) {
    if !state.ui_settings.sidebar_open {
        return;
    }

    let screen_size = ctx.viewport_rect().size();
    let is_portrait = screen_size.y > screen_size.x;

    if is_portrait {
        egui::TopBottomPanel::bottom("main_sidebar")
            .default_height(280.0)
            .min_height(180.0)
            .max_height(ctx.viewport_rect().height() * 0.6)
            .resizable(true)
            .show(ctx, |ui| {
                render_sidebar_content(ui, state);
            });
    } else {
        egui::SidePanel::right("main_sidebar")
            .default_width(300.0)
            .min_width(260.0)
            .max_width(450.0)
            .resizable(true)
            .show(ctx, |ui| {
                render_sidebar_content(ui, state);
            });
    }
}

/// Render the sidebar content (shared between portrait and landscape)
fn render_sidebar_content(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        ui.selectable_value(
            &mut state.ui_settings.active_tab,
            SidebarTab::Location,
            "📡 Location",
        );
        ui.selectable_value(
            &mut state.ui_settings.active_tab,
            SidebarTab::Search,
            "🔍 Search",
        );
        ui.selectable_value(
            &mut state.ui_settings.active_tab,
            SidebarTab::Settings,
            "⚙ Settings",
        );
    });

    ui.separator();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| match state.ui_settings.active_tab {
            SidebarTab::Location => render_location_tab(ui, state),
            SidebarTab::Search => render_search_tab(ui, state),
            SidebarTab::Settings => render_settings_tab(ui, state),
        });
}

/// Render the Location tab
fn render_location_tab(ui: &mut Ui, state: &mut AppState) {
    let status = state.tracking.status();

    ui.horizontal(|ui| {
        ui.label("Status:");
        let (text, color) = match status {
            TrackingStatus::Idle => ("Idle", Color32::GRAY),
            TrackingStatus::Acquiring => ("Acquiring…", Color32::YELLOW),
            TrackingStatus::Tracking => ("Tracking", Color32::GREEN),
        };
        ui.label(RichText::new(text).strong().color(color));
        if status == TrackingStatus::Acquiring {
            ui.spinner();
        }
    });

    ui.add_space(8.0);

    match state.tracking.locality() {
        Some(locality) => {
            ui.label(RichText::new(locality).heading());
        }
        None => {
            ui.label(RichText::new("Waiting…").italics().weak());
        }
    }

    ui.add_space(8.0);

    let position = state.tracking.position();
    egui::Grid::new("position_grid")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            ui.label("Latitude:");
            ui.label(
                RichText::new(format_coordinate(position.map(|p| p.latitude)))
                    .strong()
                    .monospace(),
            );
            ui.end_row();

            ui.label("Longitude:");
            ui.label(
                RichText::new(format_coordinate(position.map(|p| p.longitude)))
                    .strong()
                    .monospace(),
            );
            ui.end_row();

            if let Some(accuracy) = state.tracking.accuracy_meters() {
                ui.label("Accuracy:");
                ui.label(RichText::new(format_accuracy(accuracy)).strong());
                ui.end_row();
            }

            if let Some(age) = state.tracking.last_fix_age() {
                ui.label("Last fix:");
                ui.label(RichText::new(format_age(age)).strong());
                ui.end_row();
            }
        });

    ui.add_space(12.0);

    ui.horizontal(|ui| {
        if ui
            .add_enabled(status == TrackingStatus::Idle, egui::Button::new("▶ Start"))
            .clicked()
        {
            state.tracking.start();
        }
        if ui
            .add_enabled(status.is_active(), egui::Button::new("⏹ Stop"))
            .clicked()
        {
            state.tracking.stop();
        }
    });
}

/// Render the Search tab
fn render_search_tab(ui: &mut Ui, state: &mut AppState) {
    let response = ui.add(
        egui::TextEdit::singleline(&mut state.search.query)
            .hint_text("Search for a place…")
            .desired_width(f32::INFINITY),
    );
    let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

    ui.add_space(4.0);

    ui.horizontal(|ui| {
        if ui.button("🔍 Search").clicked() || submitted {
            state.search.search();
        }
        if state.search.is_searching() {
            ui.spinner();
        }
    });

    ui.add_space(8.0);

    if state.search.is_dropdown_open() {
        let mut picked = None;
        egui::ScrollArea::vertical()
            .id_salt("candidates_scroll")
            .max_height(180.0)
            .show(ui, |ui| {
                for place in state.search.candidates() {
                    if ui.selectable_label(false, place.label()).clicked() {
                        picked = Some(place.clone());
                    }
                }
                if state.search.candidates().is_empty()
                    && state.search.has_searched()
                    && !state.search.is_searching()
                {
                    ui.label(RichText::new("No matches").italics().weak());
                }
            });
        if let Some(place) = picked {
            state.pending_center = Some(place.coordinates);
            state.search.select(place);
        }
        ui.add_space(8.0);
    }

    ui.separator();
    ui.add_space(8.0);

    match state.search.selected() {
        Some(place) => {
            let place = place.clone();
            ui.label(RichText::new(place.label()).heading());
            ui.add_space(4.0);

            egui::Grid::new("selected_grid")
                .num_columns(2)
                .spacing([12.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Latitude:");
                    ui.label(
                        RichText::new(format_coordinate(Some(place.coordinates.latitude)))
                            .strong()
                            .monospace(),
                    );
                    ui.end_row();

                    ui.label("Longitude:");
                    ui.label(
                        RichText::new(format_coordinate(Some(place.coordinates.longitude)))
                            .strong()
                            .monospace(),
                    );
                    ui.end_row();
                });

            ui.add_space(8.0);
            if ui.button("🎯 Show on Map").clicked() {
                state.pending_center = Some(place.coordinates);
            }
        }
        None => {
            ui.label(RichText::new("No place selected").italics().weak());
        }
    }
}

/// Render the Settings tab
fn render_settings_tab(ui: &mut Ui, state: &mut AppState) {
    ui.label(RichText::new("🗺 Map Tiles").strong());
    ui.add_space(6.0);

    for provider in TilesProvider::all() {
        let selected = state.ui_settings.tiles_provider == *provider;
        if ui.selectable_label(selected, provider.name()).clicked() {
            state.ui_settings.tiles_provider = *provider;
        }
    }

    ui.add_space(4.0);
    ui.label(
        RichText::new(state.ui_settings.tiles_provider.attribution())
            .small()
            .italics()
            .weak(),
    );

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    ui.label(RichText::new("📡 Tracking").strong());
    ui.add_space(6.0);

    ui.checkbox(
        &mut state.ui_settings.follow_position,
        "Keep map centered on latest fix",
    );

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    ui.label(RichText::new("ℹ About").strong());
    ui.add_space(4.0);
    ui.label(RichText::new("Whereabouts").small());
    ui.label(
        RichText::new("Live location tracking and place search")
            .small()
            .weak(),
    );
    ui.add_space(4.0);
    ui.label(RichText::new("Keyboard shortcuts:").small());
    ui.label(RichText::new("  F1 / Ctrl+H - Toggle help").small().weak());
}

/// Help overlay
pub fn help_overlay(ctx: &egui::Context, show_help: &mut bool) {
    egui::Window::new("Help")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.heading("Whereabouts");
            ui.add_space(8.0);

            ui.label("Shows your live location on a map and finds places by name.");
            ui.add_space(12.0);

            ui.label(RichText::new("Tracking").strong());
            ui.label("• 'Start' begins polling your location");
            ui.label("• The locality of each fix appears once resolved");
            ui.label("• 'Stop' ends tracking and clears the fix");
            ui.add_space(8.0);

            ui.label(RichText::new("Search").strong());
            ui.label("• Type a place name and press Enter");
            ui.label("• Pick a candidate to select and show it on the map");
            ui.add_space(8.0);

            ui.label(RichText::new("Keyboard Shortcuts").strong());
            ui.label("• F1 or Ctrl+H - Toggle this help");
            ui.add_space(12.0);

            if ui.button("Close").clicked() {
                *show_help = false;
            }
        });
}

/// Format an optional coordinate for display
fn format_coordinate(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.5}°"),
        None => "—".to_string(),
    }
}

/// Format an accuracy radius for display
fn format_accuracy(meters: f64) -> String {
    if meters < 1000.0 {
        format!("±{meters:.0} m")
    } else {
        format!("±{:.0} km", meters / 1000.0)
    }
}

/// Format a fix age for display
fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    if secs < 1 {
        "just now".to_string()
    } else if secs < 60 {
        format!("{secs} s ago")
    } else {
        format!("{} min ago", secs / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_coordinate() {
        assert_eq!(format_coordinate(Some(12.3)), "12.30000°");
        assert_eq!(format_coordinate(None), "—");
    }

    #[test]
    fn test_format_accuracy() {
        assert_eq!(format_accuracy(120.0), "±120 m");
        assert_eq!(format_accuracy(25_000.0), "±25 km");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::from_millis(400)), "just now");
        assert_eq!(format_age(Duration::from_secs(12)), "12 s ago");
        assert_eq!(format_age(Duration::from_secs(150)), "2 min ago");
    }
}
