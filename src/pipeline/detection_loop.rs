use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, bounded};

use super::detector::{DetectorOptions, FaceDetector, resize_results};
use crate::{
    annotator,
    overlay::{self, DisplayList, Surface},
    types::{DisplaySize, Frame},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickRequest {
    Submitted,
    /// The previous detection is still pending; the frame was dropped.
    Skipped,
}

/// Everything one tick produces for the UI.
#[derive(Clone, Debug)]
pub struct OverlayFrame {
    pub frame: Frame,
    pub display: DisplaySize,
    pub overlay: DisplayList,
    pub faces: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TickSettings {
    pub detector: DetectorOptions,
    pub expression_min_confidence: f32,
}

/// Runs one detect, rescale, redraw, annotate pass over `frame`.
pub fn run_tick<D: FaceDetector + ?Sized>(
    detector: &mut D,
    frame: Frame,
    settings: &TickSettings,
) -> Result<OverlayFrame> {
    let display = frame.display_size();
    let detections = detector.detect_faces(&frame, &settings.detector)?;
    let faces = resize_results(&detections, frame.display_size(), display);

    let mut surface = DisplayList::new();
    surface.clear();
    overlay::draw_overlay(&mut surface, &faces, settings.expression_min_confidence);
    if let Some(first) = faces.first() {
        annotator::annotate(&mut surface, &first.landmarks.groups());
    }

    Ok(OverlayFrame {
        frame,
        display,
        overlay: surface,
        faces: faces.len(),
    })
}

/// Handle to the detection worker. Dropping it stops the worker.
pub struct DetectionLoop {
    request_tx: Option<Sender<Frame>>,
    in_flight: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl DetectionLoop {
    pub fn start<D: FaceDetector>(
        detector: D,
        settings: TickSettings,
        result_tx: Sender<OverlayFrame>,
    ) -> Self {
        let (request_tx, request_rx) = bounded(1);
        let in_flight = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let in_flight = in_flight.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                run_worker_loop(detector, settings, request_rx, result_tx, &in_flight, &stop)
            })
        };

        Self {
            request_tx: Some(request_tx),
            in_flight,
            stop,
            handle: Some(handle),
        }
    }

    /// Hands `frame` to the worker unless a detection is still pending.
    pub fn submit(&self, frame: Frame) -> TickRequest {
        let Some(tx) = &self.request_tx else {
            return TickRequest::Skipped;
        };
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return TickRequest::Skipped;
        }
        if tx.try_send(frame).is_err() {
            self.in_flight.store(false, Ordering::Release);
            return TickRequest::Skipped;
        }
        TickRequest::Submitted
    }

    pub fn state(&self) -> LoopState {
        match &self.handle {
            Some(handle) if !handle.is_finished() => LoopState::Running,
            _ => LoopState::Idle,
        }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Disconnecting the request channel wakes a worker blocked on recv.
        self.request_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker_loop<D: FaceDetector>(
    mut detector: D,
    settings: TickSettings,
    request_rx: Receiver<Frame>,
    result_tx: Sender<OverlayFrame>,
    in_flight: &AtomicBool,
    stop: &AtomicBool,
) {
    log::info!("detection loop running ({} backend)", detector.label());
    while let Ok(frame) = request_rx.recv() {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let captured_at = frame.timestamp;
        match run_tick(&mut detector, frame, &settings) {
            Ok(result) => {
                log::debug!(
                    "tick: {} face(s), {:?} since capture",
                    result.faces,
                    captured_at.elapsed()
                );
                if !stop.load(Ordering::Relaxed) {
                    let _ = result_tx.try_send(result);
                }
            }
            Err(err) => log::warn!("face detection failed: {err:?}"),
        }
        in_flight.store(false, Ordering::Release);
    }
    log::info!("detection loop stopped");
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::{
        annotator::{DISTANCE_FONT_SIZE, DISTANCE_TEXT_COLOR},
        overlay::{DrawCommand, tests::sample_face},
        types::FaceDetection,
    };

    struct FakeDetector {
        faces: Vec<FaceDetection>,
        delay: Duration,
    }

    impl FakeDetector {
        fn returning(faces: Vec<FaceDetection>) -> Self {
            Self {
                faces,
                delay: Duration::ZERO,
            }
        }
    }

    impl FaceDetector for FakeDetector {
        fn detect_faces(
            &mut self,
            _frame: &Frame,
            _options: &DetectorOptions,
        ) -> Result<Vec<FaceDetection>> {
            thread::sleep(self.delay);
            Ok(self.faces.clone())
        }

        fn label(&self) -> &'static str {
            "fake"
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect_faces(&mut self, _: &Frame, _: &DetectorOptions) -> Result<Vec<FaceDetection>> {
            Err(anyhow::anyhow!("inference exploded"))
        }

        fn label(&self) -> &'static str {
            "failing"
        }
    }

    fn frame() -> Frame {
        Frame {
            rgba: vec![0; 200 * 160 * 4],
            width: 200,
            height: 160,
            timestamp: Instant::now(),
        }
    }

    fn settings() -> TickSettings {
        TickSettings {
            detector: DetectorOptions::default(),
            expression_min_confidence: 0.1,
        }
    }

    #[test]
    fn no_faces_leaves_a_cleared_overlay() {
        let mut detector = FakeDetector::returning(Vec::new());
        let result = run_tick(&mut detector, frame(), &settings()).unwrap();
        assert_eq!(result.faces, 0);
        assert_eq!(result.overlay.commands(), &[DrawCommand::Clear]);
        assert_eq!(result.overlay.texts().count(), 0);
        assert_eq!(
            result.display,
            DisplaySize {
                width: 200,
                height: 160
            }
        );
    }

    #[test]
    fn first_face_gets_distance_labels() {
        let mut detector = FakeDetector::returning(vec![sample_face(), sample_face()]);
        let result = run_tick(&mut detector, frame(), &settings()).unwrap();
        assert_eq!(result.faces, 2);

        let distance_labels: Vec<_> = result
            .overlay
            .texts()
            .filter(|(_, _, style)| {
                style.color == DISTANCE_TEXT_COLOR && style.font_size == DISTANCE_FONT_SIZE
            })
            .collect();
        assert_eq!(distance_labels.len(), 21);
        assert_eq!(result.overlay.commands()[0], DrawCommand::Clear);
    }

    #[test]
    fn inference_error_propagates() {
        let err = run_tick(&mut FailingDetector, frame(), &settings()).unwrap_err();
        assert!(err.to_string().contains("exploded"));
    }

    #[test]
    fn tick_is_skipped_while_detection_is_in_flight() {
        let (result_tx, result_rx) = bounded(4);
        let detector = FakeDetector {
            faces: Vec::new(),
            delay: Duration::from_millis(200),
        };
        let detection = DetectionLoop::start(detector, settings(), result_tx);

        assert_eq!(detection.submit(frame()), TickRequest::Submitted);
        assert_eq!(detection.submit(frame()), TickRequest::Skipped);

        let first = result_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.faces, 0);
        // Only the submitted frame produced a result.
        assert!(result_rx.recv_timeout(Duration::from_millis(300)).is_err());

        assert_eq!(detection.submit(frame()), TickRequest::Submitted);
        assert!(result_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn failed_tick_publishes_nothing_and_frees_the_slot() {
        let (result_tx, result_rx) = bounded(4);
        let detection = DetectionLoop::start(FailingDetector, settings(), result_tx);
        assert_eq!(detection.submit(frame()), TickRequest::Submitted);
        assert!(result_rx.recv_timeout(Duration::from_millis(300)).is_err());
        assert_eq!(detection.submit(frame()), TickRequest::Submitted);
    }

    #[test]
    fn stop_ends_the_worker() {
        let (result_tx, result_rx) = bounded(1);
        let detection =
            DetectionLoop::start(FakeDetector::returning(Vec::new()), settings(), result_tx);
        assert_eq!(detection.state(), LoopState::Running);
        detection.stop();
        // The worker owned the only sender.
        assert!(result_rx.recv_timeout(Duration::from_secs(1)).is_err());
        assert!(result_rx.is_empty());
    }
}
