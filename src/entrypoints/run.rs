use crate::app::{WhereaboutsApp, settings::Settings};

/// Native entry point
pub async fn native_main() {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_cli();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title("Whereabouts"),
        ..Default::default()
    };

    let _ = eframe::run_native(
        "Whereabouts",
        native_options,
        Box::new(move |cc| Ok(Box::new(WhereaboutsApp::new(settings, cc)))),
    );
}
