use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Instant,
};

use anyhow::{Result, anyhow};
use crossbeam_channel::Sender;
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
};

use super::rgba_converter;
use crate::types::Frame;

// Video is unconstrained; these are only tried in order until one opens.
// Built-in macOS cameras often reject YUYV even when Nokhwa lists it.
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

fn requested_formats() -> [RequestedFormat<'static>; 3] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

#[derive(Debug)]
pub struct CameraStream {
    label: String,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CameraStream {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn build_camera(index: &CameraIndex) -> Result<Camera> {
    let mut last_err = None;

    for requested in requested_formats() {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.into()),
            },
            Err(err) => last_err = Some(err.into()),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
}

/// Opens the camera and spawns the capture thread. Frames are dropped when
/// the receiver has not taken the previous one yet.
pub fn start_camera_stream(index: u32, frame_tx: Sender<Frame>) -> Result<CameraStream> {
    let index = CameraIndex::Index(index);
    // Surface permission and device errors before spawning.
    let label = build_camera(&index)?.info().human_name();

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        let mut camera = match build_camera(&index) {
            Ok(cam) => cam,
            Err(err) => {
                log::error!("failed to reopen camera: {err:?}");
                return;
            }
        };
        log::info!("camera capture started");
        while !stop_flag.load(Ordering::Relaxed) {
            let read_start = Instant::now();
            let buffer = match camera.frame() {
                Ok(buffer) => buffer,
                Err(err) => {
                    log::warn!(
                        "camera frame read failed (after {:?}): {err:?}",
                        read_start.elapsed()
                    );
                    continue;
                }
            };

            match rgba_converter::buffer_to_frame(&buffer) {
                Ok(frame) => {
                    let _ = frame_tx.try_send(frame);
                }
                Err(err) => log::warn!("failed to decode camera frame: {err:?}"),
            }
        }
        if let Err(err) = camera.stop_stream() {
            log::warn!("failed to stop camera stream: {err:?}");
        }
        log::info!("camera capture stopped");
    });

    Ok(CameraStream {
        label,
        stop,
        handle: Some(handle),
    })
}
