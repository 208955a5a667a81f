mod action_bar;
mod annotation;
mod app;
mod canvas;
mod capture;
mod compositor;
mod config;
mod fonts;
mod history;
mod mapper;
mod records;
mod session;
mod theme;
mod toolbar;
mod ui_controls;
mod viewport;

use eframe::egui;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::EditorConfig::load_or_default();

    let viewport = egui::ViewportBuilder::default()
        .with_title("Tracemark")
        .with_inner_size([1080.0, 760.0])
        .with_min_inner_size([640.0, 480.0]);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Tracemark",
        options,
        Box::new(|cc| Box::new(app::TracemarkApp::new(cc, config))),
    )
}
