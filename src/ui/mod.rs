use std::{mem, sync::Arc, thread, time::Duration};

use crossbeam_channel::{Receiver, Sender, unbounded};
use gpui::{
    AnyElement, App, AppContext, Context, Hsla, InteractiveElement, IntoElement, ObjectFit,
    ParentElement, Render, RenderImage, Styled, StyledImage, TitlebarOptions, Window,
    WindowControlArea, WindowDecorations, WindowOptions, div, img, px,
};
use gpui_component::{ActiveTheme, Root, StyledExt, h_flex, tag::Tag, v_flex};
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::{
    config::AppConfig,
    model_download::{ModelDownloadEvent, ModelKind},
    pipeline::{
        BootstrapEvent, BootstrapMessage, Bootstrapped, CameraStream, DetectionLoop, OverlayFrame,
        TickRequest, TickSettings, bootstrap, detector::DetectorOptions,
    },
    types::{DisplaySize, Frame},
};

mod main_view;
mod render_util;
mod status_view;
mod titlebar;

const VIDEO_MAX_SIZE: (f32, f32) = (960.0, 720.0);
const VIDEO_MIN_SIZE: (f32, f32) = (320.0, 240.0);
// Live frames replace the annotated one once detection falls this far behind.
const OVERLAY_STALE_AFTER: Duration = Duration::from_millis(500);

pub fn launch_ui(
    app: &mut App,
    config: AppConfig,
    frame_tx: Sender<Frame>,
    frame_rx: Receiver<Frame>,
) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some("Face Distance Overlay".into()),
            appears_transparent: true,
            traffic_light_position: None,
        }),
        window_decorations: Some(WindowDecorations::Client),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|_| AppView::new(config, frame_tx, frame_rx));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct AppView {
    screen: Screen,
    settings: TickSettings,
    frame_rx: Receiver<Frame>,
    bootstrap_rx: Receiver<BootstrapMessage>,
    _bootstrap_handle: thread::JoinHandle<()>,
    overlay_tx: Sender<OverlayFrame>,
    overlay_rx: Receiver<OverlayFrame>,
    detection: Option<DetectionLoop>,
    camera: Option<CameraStream>,
    latest_frame: Option<Frame>,
    latest_overlay: Option<OverlayFrame>,
    latest_image: Option<Arc<RenderImage>>,
    shown_display: Option<DisplaySize>,
    annotated: bool,
    skipped_ticks: u64,
}

enum Screen {
    Bootstrapping(BootstrapState),
    Failed { message: String },
    Running,
}

struct ModelProgress {
    model: ModelKind,
    downloaded: u64,
    total: Option<u64>,
    ready: bool,
}

struct BootstrapState {
    models: Vec<ModelProgress>,
    message: String,
}

impl BootstrapState {
    fn new() -> Self {
        Self {
            models: ModelKind::ALL
                .iter()
                .map(|&model| ModelProgress {
                    model,
                    downloaded: 0,
                    total: None,
                    ready: false,
                })
                .collect(),
            message: "Checking face models...".to_string(),
        }
    }

    fn apply(&mut self, event: BootstrapEvent) {
        match event {
            BootstrapEvent::Model(event) => self.apply_model_event(event),
            BootstrapEvent::LoadingModels => {
                self.message = "Loading inference sessions...".to_string();
            }
            BootstrapEvent::ModelsReady => self.message = "Models ready".to_string(),
            BootstrapEvent::OpeningCamera => self.message = "Opening camera...".to_string(),
            BootstrapEvent::WaitingForFirstFrame { camera } => {
                self.message = format!("Waiting for the first frame from {camera}...");
            }
            BootstrapEvent::Ready => self.message = "Starting detection...".to_string(),
        }
    }

    fn apply_model_event(&mut self, event: ModelDownloadEvent) {
        let model = match &event {
            ModelDownloadEvent::AlreadyPresent { model }
            | ModelDownloadEvent::Started { model, .. }
            | ModelDownloadEvent::Progress { model, .. }
            | ModelDownloadEvent::Finished { model } => *model,
        };
        let Some(entry) = self.models.iter_mut().find(|m| m.model == model) else {
            return;
        };
        match event {
            ModelDownloadEvent::AlreadyPresent { .. } | ModelDownloadEvent::Finished { .. } => {
                entry.ready = true;
            }
            ModelDownloadEvent::Started { total, .. } => {
                entry.total = total;
                self.message = format!("Downloading {} model...", model.label());
            }
            ModelDownloadEvent::Progress {
                downloaded, total, ..
            } => {
                entry.downloaded = downloaded;
                entry.total = total;
            }
        }
    }
}

impl AppView {
    fn new(config: AppConfig, frame_tx: Sender<Frame>, frame_rx: Receiver<Frame>) -> Self {
        let (bootstrap_tx, bootstrap_rx) = unbounded();
        let (overlay_tx, overlay_rx) = crossbeam_channel::bounded(1);
        let settings = TickSettings {
            detector: DetectorOptions::from(&config.detector),
            expression_min_confidence: config.overlay.expression_min_confidence,
        };
        let handle = bootstrap::spawn(config, frame_tx, frame_rx.clone(), bootstrap_tx);

        Self {
            screen: Screen::Bootstrapping(BootstrapState::new()),
            settings,
            frame_rx,
            bootstrap_rx,
            _bootstrap_handle: handle,
            overlay_tx,
            overlay_rx,
            detection: None,
            camera: None,
            latest_frame: None,
            latest_overlay: None,
            latest_image: None,
            shown_display: None,
            annotated: false,
            skipped_ticks: 0,
        }
    }

    /// Applies pending bootstrap messages. Returns the next screen once the
    /// bootstrap has settled.
    fn poll_bootstrap(&mut self, state: &mut BootstrapState) -> Option<Screen> {
        while let Ok(msg) = self.bootstrap_rx.try_recv() {
            match msg {
                BootstrapMessage::Event(event) => state.apply(event),
                BootstrapMessage::Done(Ok(ready)) => {
                    self.start_detection(ready);
                    return Some(Screen::Running);
                }
                BootstrapMessage::Done(Err(err)) => {
                    return Some(Screen::Failed {
                        message: err.to_string(),
                    });
                }
            }
        }
        None
    }

    fn start_detection(&mut self, ready: Bootstrapped) {
        let Bootstrapped {
            detector,
            camera,
            first_frame,
        } = ready;
        self.detection = Some(DetectionLoop::start(
            detector,
            self.settings.clone(),
            self.overlay_tx.clone(),
        ));
        self.camera = Some(camera);
        self.latest_frame = Some(first_frame);
    }

    fn submit_tick(&mut self, frame: &Frame) {
        let Some(detection) = &self.detection else {
            return;
        };
        if detection.submit(frame.clone()) == TickRequest::Skipped {
            self.skipped_ticks += 1;
        }
    }
}

impl Drop for AppView {
    fn drop(&mut self) {
        // Stop detection before the camera it reads from.
        if let Some(detection) = self.detection.take() {
            detection.stop();
        }
        if let Some(camera) = self.camera.take() {
            camera.stop();
        }
    }
}

impl Render for AppView {
    fn render(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> impl gpui::IntoElement {
        // One tick per display refresh.
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        let screen = mem::replace(&mut self.screen, Screen::Running);
        let (screen, view) = match screen {
            Screen::Bootstrapping(mut state) => match self.poll_bootstrap(&mut state) {
                Some(Screen::Running) => (Screen::Running, self.render_main(window, cx)),
                Some(next) => {
                    let view = self.render_status(&next, window, cx);
                    (next, view)
                }
                None => {
                    let screen = Screen::Bootstrapping(state);
                    let view = self.render_status(&screen, window, cx);
                    (screen, view)
                }
            },
            Screen::Failed { message } => {
                let screen = Screen::Failed { message };
                let view = self.render_status(&screen, window, cx);
                (screen, view)
            }
            Screen::Running => (Screen::Running, self.render_main(window, cx)),
        };
        self.screen = screen;
        view
    }
}
