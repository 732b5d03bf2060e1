#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod annotator;
mod config;
mod landmarks;
mod model_download;
mod overlay;
mod pipeline;
mod types;
mod ui;

use anyhow::Result;
use crossbeam_channel::bounded;
use gpui::Application;

use config::AppConfig;

fn main() -> Result<()> {
    env_logger::init();

    let config = AppConfig::load()?;
    log::info!(
        "models in {}, camera #{}, detector input {}",
        config.models.dir.display(),
        config.camera.index,
        config.detector.input_size
    );

    let (camera_frame_tx, camera_frame_rx) = bounded(1);

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, config, camera_frame_tx, camera_frame_rx) {
                log::error!("failed to launch ui: {err:?}");
            }
        });

    Ok(())
}
