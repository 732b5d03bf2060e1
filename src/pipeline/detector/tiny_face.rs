//! Decoding for the tiny YOLOv2-style face detector.

use std::cmp::Ordering;

use anyhow::{Result, anyhow};

use super::{DetectorOptions, preprocess::Letterbox};
use crate::types::BoundingBox;

/// Anchor box sizes in grid cells.
const ANCHORS: [(f32, f32); 5] = [
    (1.603_231, 2.094_468),
    (6.041_143, 7.080_126),
    (2.882_459, 3.518_061),
    (4.266_906, 5.178_857),
    (9.041_765, 10.663_08),
];
const VALUES_PER_ANCHOR: usize = 5;
const CHANNELS: usize = ANCHORS.len() * VALUES_PER_ANCHOR;

#[derive(Clone, Debug, PartialEq)]
pub struct FaceBox {
    pub bbox: BoundingBox,
    pub score: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Layout {
    ChannelsLast,
    ChannelsFirst,
}

/// Turns the raw `[1, g, g, 25]` (or `[1, 25, g, g]`) grid into face boxes in
/// source pixels, after score filtering and non-maximum suppression.
pub fn decode_tiny_face_output(
    raw: &[f32],
    shape: &[usize],
    letterbox: &Letterbox,
    input_size: u32,
    options: &DetectorOptions,
) -> Result<Vec<FaceBox>> {
    if shape.len() != 4 {
        return Err(anyhow!(
            "unexpected face detector output shape {shape:?}, need 4 dimensions"
        ));
    }
    let (layout, grid_h, grid_w) = if shape[3] == CHANNELS {
        (Layout::ChannelsLast, shape[1], shape[2])
    } else if shape[1] == CHANNELS {
        (Layout::ChannelsFirst, shape[2], shape[3])
    } else {
        return Err(anyhow!(
            "face detector output {shape:?} has no {CHANNELS}-channel axis"
        ));
    };
    let expected = grid_h * grid_w * CHANNELS;
    if raw.len() < expected {
        return Err(anyhow!(
            "face detector output too short: got {}, need {expected}",
            raw.len()
        ));
    }

    let value_at = |row: usize, col: usize, channel: usize| match layout {
        Layout::ChannelsLast => raw[(row * grid_w + col) * CHANNELS + channel],
        Layout::ChannelsFirst => raw[(channel * grid_h + row) * grid_w + col],
    };

    let cell_w = input_size as f32 / grid_w as f32;
    let cell_h = input_size as f32 / grid_h as f32;
    let mut candidates = Vec::new();
    for row in 0..grid_h {
        for col in 0..grid_w {
            for (anchor_idx, (anchor_w, anchor_h)) in ANCHORS.iter().enumerate() {
                let base = anchor_idx * VALUES_PER_ANCHOR;
                let score = sigmoid(value_at(row, col, base + 4));
                if score < options.score_threshold {
                    continue;
                }

                let cx = (col as f32 + sigmoid(value_at(row, col, base))) * cell_w;
                let cy = (row as f32 + sigmoid(value_at(row, col, base + 1))) * cell_h;
                let w = value_at(row, col, base + 2).exp() * anchor_w * cell_w;
                let h = value_at(row, col, base + 3).exp() * anchor_h * cell_h;

                let top_left = letterbox.to_source(cx - w / 2.0, cy - h / 2.0);
                let bottom_right = letterbox.to_source(cx + w / 2.0, cy + h / 2.0);
                let Some(bbox) = clamp_box(
                    top_left.x,
                    top_left.y,
                    bottom_right.x,
                    bottom_right.y,
                    letterbox.src_w,
                    letterbox.src_h,
                ) else {
                    continue;
                };
                candidates.push(FaceBox { bbox, score });
            }
        }
    }

    let kept = nms(&candidates, options.iou_threshold, options.max_faces);
    Ok(kept.into_iter().map(|idx| candidates[idx].clone()).collect())
}

fn nms(candidates: &[FaceBox], threshold: f32, top_k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|a, b| {
        candidates[*b]
            .score
            .partial_cmp(&candidates[*a].score)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<usize> = Vec::new();
    'outer: for &idx in &order {
        for &k in &keep {
            if iou(&candidates[idx].bbox, &candidates[k].bbox) > threshold {
                continue 'outer;
            }
        }
        keep.push(idx);
        if keep.len() >= top_k {
            break;
        }
    }
    keep
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter_w = (a.right().min(b.right()) - a.x.max(b.x)).max(0.0);
    let inter_h = (a.bottom().min(b.bottom()) - a.y.max(b.y)).max(0.0);
    let inter = inter_w * inter_h;
    if inter <= 0.0 {
        return 0.0;
    }
    let union = a.width * a.height + b.width * b.height - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn clamp_box(x1: f32, y1: f32, x2: f32, y2: f32, w: u32, h: u32) -> Option<BoundingBox> {
    if !(x1.is_finite() && y1.is_finite() && x2.is_finite() && y2.is_finite()) {
        return None;
    }
    let (max_w, max_h) = (w as f32, h as f32);
    let (x1, y1) = (x1.clamp(0.0, max_w), y1.clamp(0.0, max_h));
    let (x2, y2) = (x2.clamp(0.0, max_w), y2.clamp(0.0, max_h));
    (x2 > x1 && y2 > y1).then(|| BoundingBox::from_corners(x1, y1, x2, y2))
}
