mod backend_bridge;
mod controller;
mod ui;

use client_core::{config::load_settings, Controller};
use crossbeam_channel::unbounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::ui::TranscriberApp;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let controller = Controller::new(settings.settle_delay());

    // Both queues carry state-machine traffic that must not be dropped.
    let (cmd_tx, cmd_rx) = unbounded::<BackendCommand>();
    let (ui_tx, ui_rx) = unbounded::<UiEvent>();
    backend_bridge::runtime::launch(settings, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Audio Transcriber")
            .with_inner_size([760.0, 720.0])
            .with_min_inner_size([520.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Audio Transcriber",
        options,
        Box::new(move |_cc| Ok(Box::new(TranscriberApp::new(controller, cmd_tx, ui_rx)))),
    )
}
