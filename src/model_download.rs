use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use reqwest::blocking::Client;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    TinyFaceDetector,
    FaceLandmark68,
    FaceRecognition,
    FaceExpression,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::TinyFaceDetector,
        ModelKind::FaceLandmark68,
        ModelKind::FaceRecognition,
        ModelKind::FaceExpression,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ModelKind::TinyFaceDetector => "tiny_face_detector.onnx",
            ModelKind::FaceLandmark68 => "face_landmark_68.onnx",
            ModelKind::FaceRecognition => "face_recognition.onnx",
            ModelKind::FaceExpression => "face_expression.onnx",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelKind::TinyFaceDetector => "tiny face detector",
            ModelKind::FaceLandmark68 => "68-point landmark",
            ModelKind::FaceRecognition => "face recognition",
            ModelKind::FaceExpression => "face expression",
        }
    }
}

pub fn model_path(dir: &Path, model: ModelKind) -> PathBuf {
    dir.join(model.file_name())
}

#[derive(Clone, Debug)]
pub enum ModelDownloadEvent {
    AlreadyPresent {
        model: ModelKind,
    },
    Started {
        model: ModelKind,
        total: Option<u64>,
    },
    Progress {
        model: ModelKind,
        downloaded: u64,
        total: Option<u64>,
    },
    Finished {
        model: ModelKind,
    },
}

/// Makes sure every bundle exists under `dir`, fetching the missing ones in
/// parallel. Fails with the first error once all fetches have settled.
pub fn ensure_all_models_ready<F>(
    dir: &Path,
    base_url: Option<&str>,
    on_event: F,
) -> anyhow::Result<Vec<PathBuf>>
where
    F: Fn(ModelDownloadEvent) + Sync,
{
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create model directory {}", dir.display()))?;

    let bars = MultiProgress::new();
    let results: Vec<anyhow::Result<PathBuf>> = ModelKind::ALL
        .par_iter()
        .map(|model| {
            let path = model_path(dir, *model);
            ensure_model_ready(*model, &path, base_url, &bars, &on_event)?;
            Ok(path)
        })
        .collect();

    results.into_iter().collect()
}

fn ensure_model_ready<F>(
    model: ModelKind,
    model_path: &Path,
    base_url: Option<&str>,
    bars: &MultiProgress,
    on_event: &F,
) -> anyhow::Result<()>
where
    F: Fn(ModelDownloadEvent) + Sync,
{
    if model_path.exists() {
        on_event(ModelDownloadEvent::AlreadyPresent { model });
        on_event(ModelDownloadEvent::Finished { model });
        return Ok(());
    }

    let Some(base_url) = base_url else {
        return Err(anyhow!(
            "{} model missing at {} and no download url configured",
            model.label(),
            model_path.display()
        ));
    };
    let url = format!("{}/{}", base_url.trim_end_matches('/'), model.file_name());

    let mut progress: Option<ProgressBar> = None;
    download_to_path(model, &url, model_path, &mut |event| {
        match &event {
            ModelDownloadEvent::Started { total, .. } => {
                progress = Some(bars.add(create_progress_bar(*total)));
            }
            ModelDownloadEvent::Progress { downloaded, .. } => {
                if let Some(pb) = progress.as_ref() {
                    pb.set_position(*downloaded);
                }
            }
            ModelDownloadEvent::Finished { model } => {
                if let Some(pb) = progress.take() {
                    pb.finish_with_message(format!("{} model ready", model.label()));
                }
            }
            ModelDownloadEvent::AlreadyPresent { .. } => {}
        }
        on_event(event);
    })
    .with_context(|| {
        format!(
            "failed to download {} model to {}",
            model.label(),
            model_path.display()
        )
    })
}

fn download_to_path<F>(
    model: ModelKind,
    url: &str,
    dest: &Path,
    on_event: &mut F,
) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    log::info!(
        "downloading {} model from {url} to {}",
        model.label(),
        dest.display()
    );

    let client = Client::new();
    let mut response = client
        .get(url)
        .send()
        .context("failed to start model download")?
        .error_for_status()
        .context("model download returned error status")?;

    let total_size = response.content_length();
    on_event(ModelDownloadEvent::Started {
        model,
        total: total_size,
    });

    let tmp_path = dest.with_extension("download");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let bytes_read = response
            .read(&mut buffer)
            .context("failed while reading model bytes")?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .context("failed while writing model to disk")?;
        downloaded += bytes_read as u64;
        on_event(ModelDownloadEvent::Progress {
            model,
            downloaded,
            total: total_size,
        });
    }

    file.sync_all()
        .context("failed to flush downloaded model to disk")?;
    fs::rename(&tmp_path, dest).with_context(|| {
        format!(
            "failed to move temp model {} into place at {}",
            tmp_path.display(),
            dest.display()
        )
    })?;

    on_event(ModelDownloadEvent::Finished { model });
    Ok(())
}

fn create_progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap()
            .progress_chars("=>-");
            pb.set_style(style);
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            let style = ProgressStyle::with_template("{spinner:.green} downloading model").unwrap();
            pb.set_style(style);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "face-overlay-models-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn present_bundles_are_reported_without_download() {
        let dir = scratch_dir("present");
        fs::create_dir_all(&dir).unwrap();
        for model in ModelKind::ALL {
            fs::write(model_path(&dir, model), b"onnx").unwrap();
        }

        let events = Mutex::new(Vec::new());
        let paths = ensure_all_models_ready(&dir, None, |evt| {
            events.lock().unwrap().push(evt);
        })
        .unwrap();

        assert_eq!(paths.len(), 4);
        assert_eq!(paths[0], dir.join("tiny_face_detector.onnx"));
        let finished = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, ModelDownloadEvent::Finished { .. }))
            .count();
        assert_eq!(finished, 4);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_bundle_without_url_fails() {
        let dir = scratch_dir("missing");
        fs::create_dir_all(&dir).unwrap();
        for model in [ModelKind::TinyFaceDetector, ModelKind::FaceLandmark68] {
            fs::write(model_path(&dir, model), b"onnx").unwrap();
        }

        let err = ensure_all_models_ready(&dir, None, |_| {}).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("no download url configured"), "{message}");
        let _ = fs::remove_dir_all(&dir);
    }
}
