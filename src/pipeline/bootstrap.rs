//! One-shot startup: model bundles, detector sessions, camera, first frame.

use std::{thread, time::Duration};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use super::{
    camera::{CameraStream, start_camera_stream},
    detector::OrtFaceDetector,
};
use crate::{
    config::{AppConfig, ModelConfig},
    model_download::{self, ModelDownloadEvent, ModelKind},
    types::Frame,
};

const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub enum BootstrapEvent {
    Model(ModelDownloadEvent),
    LoadingModels,
    ModelsReady,
    OpeningCamera,
    WaitingForFirstFrame { camera: String },
    Ready,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to load face models: {0:#}")]
    ModelLoad(anyhow::Error),
    #[error("camera unavailable: {0:#}")]
    CameraUnavailable(anyhow::Error),
    #[error("camera produced no frame within {0:?}")]
    NoFrame(Duration),
}

pub struct Bootstrapped {
    pub detector: OrtFaceDetector,
    pub camera: CameraStream,
    pub first_frame: Frame,
}

pub enum BootstrapMessage {
    Event(BootstrapEvent),
    Done(Result<Bootstrapped, BootstrapError>),
}

/// Ensures all four bundles and builds the detector from the three it runs.
/// The recognition bundle is required on disk but never loaded.
pub fn load_detector<F>(models: &ModelConfig, on_event: F) -> Result<OrtFaceDetector, BootstrapError>
where
    F: Fn(BootstrapEvent) + Sync,
{
    model_download::ensure_all_models_ready(&models.dir, models.base_url.as_deref(), |event| {
        on_event(BootstrapEvent::Model(event))
    })
    .map_err(BootstrapError::ModelLoad)?;

    on_event(BootstrapEvent::LoadingModels);
    let path = |kind| model_download::model_path(&models.dir, kind);
    let detector = OrtFaceDetector::new(
        &path(ModelKind::TinyFaceDetector),
        &path(ModelKind::FaceLandmark68),
        &path(ModelKind::FaceExpression),
    )
    .map_err(BootstrapError::ModelLoad)?;
    on_event(BootstrapEvent::ModelsReady);
    Ok(detector)
}

pub fn wait_for_first_frame(
    frame_rx: &Receiver<Frame>,
    timeout: Duration,
) -> Result<Frame, BootstrapError> {
    match frame_rx.recv_timeout(timeout) {
        Ok(frame) => Ok(frame),
        Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
            Err(BootstrapError::NoFrame(timeout))
        }
    }
}

pub fn run<F>(
    config: &AppConfig,
    frame_tx: Sender<Frame>,
    frame_rx: &Receiver<Frame>,
    on_event: F,
) -> Result<Bootstrapped, BootstrapError>
where
    F: Fn(BootstrapEvent) + Sync,
{
    let detector = load_detector(&config.models, &on_event)?;

    on_event(BootstrapEvent::OpeningCamera);
    let camera = start_camera_stream(config.camera.index, frame_tx)
        .map_err(BootstrapError::CameraUnavailable)?;
    log::info!("camera opened: {}", camera.label());

    on_event(BootstrapEvent::WaitingForFirstFrame {
        camera: camera.label().to_string(),
    });
    let first_frame = wait_for_first_frame(frame_rx, FIRST_FRAME_TIMEOUT)?;
    on_event(BootstrapEvent::Ready);

    Ok(Bootstrapped {
        detector,
        camera,
        first_frame,
    })
}

/// Runs the bootstrap on its own thread and reports through `tx`.
pub fn spawn(
    config: AppConfig,
    frame_tx: Sender<Frame>,
    frame_rx: Receiver<Frame>,
    tx: Sender<BootstrapMessage>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let events = tx.clone();
        let result = run(&config, frame_tx, &frame_rx, |event| {
            let _ = events.send(BootstrapMessage::Event(event));
        });
        if let Err(err) = &result {
            log::error!("bootstrap failed: {err}");
        }
        let _ = tx.send(BootstrapMessage::Done(result));
    })
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Mutex,
        time::{Instant, SystemTime, UNIX_EPOCH},
    };

    use crossbeam_channel::bounded;

    use super::*;

    fn empty_model_dir() -> ModelConfig {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        ModelConfig {
            dir: std::env::temp_dir().join(format!("face-overlay-bootstrap-{nanos}")),
            base_url: None,
        }
    }

    #[test]
    fn missing_models_fail_as_model_load() {
        let models = empty_model_dir();
        let events = Mutex::new(Vec::new());
        let result = load_detector(&models, |event| events.lock().unwrap().push(event));

        let err = result.err().expect("bootstrap should fail without models");
        assert!(matches!(err, BootstrapError::ModelLoad(_)));
        assert!(err.to_string().contains("no download url configured"));
        assert!(
            !events
                .lock()
                .unwrap()
                .iter()
                .any(|e| matches!(e, BootstrapEvent::ModelsReady))
        );
        let _ = std::fs::remove_dir_all(&models.dir);
    }

    #[test]
    fn first_frame_is_returned() {
        let (tx, rx) = bounded(1);
        tx.send(Frame {
            rgba: vec![0; 4],
            width: 1,
            height: 1,
            timestamp: Instant::now(),
        })
        .unwrap();
        let frame = wait_for_first_frame(&rx, Duration::from_millis(10)).unwrap();
        assert_eq!((frame.width, frame.height), (1, 1));
    }

    #[test]
    fn silent_camera_is_no_frame() {
        let (_tx, rx) = bounded::<Frame>(1);
        let err = wait_for_first_frame(&rx, Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, BootstrapError::NoFrame(_)));
    }
}
