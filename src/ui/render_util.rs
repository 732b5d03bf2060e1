use super::{
    Arc, Hsla, ImageBuffer, ImageFrame, OVERLAY_STALE_AFTER, OverlayFrame, RenderImage, Rgba,
    VIDEO_MAX_SIZE, VIDEO_MIN_SIZE,
};
use crate::{
    overlay::{Color, DisplayList, raster},
    types::{DisplaySize, Frame},
};

/// What the video box shows on this refresh.
#[derive(Debug)]
pub(super) enum VideoSource<'a> {
    /// The frame a detection ran on, drawn with that detection's overlay.
    Annotated(&'a OverlayFrame),
    /// A camera frame with no overlay.
    Live(&'a Frame),
}

/// Picks the latest detection result unless the camera has moved on by more
/// than `OVERLAY_STALE_AFTER` since the frame it was computed on.
pub(super) fn choose_source<'a>(
    result: Option<&'a OverlayFrame>,
    live: Option<&'a Frame>,
) -> Option<VideoSource<'a>> {
    match (result, live) {
        (Some(result), Some(live))
            if live.timestamp.saturating_duration_since(result.frame.timestamp)
                > OVERLAY_STALE_AFTER =>
        {
            Some(VideoSource::Live(live))
        }
        (Some(result), _) => Some(VideoSource::Annotated(result)),
        (None, Some(live)) => Some(VideoSource::Live(live)),
        (None, None) => None,
    }
}

/// Burns the overlay shapes into a copy of `frame` and hands it to gpui.
pub(super) fn frame_to_image(frame: &Frame, overlay: Option<&DisplayList>) -> Option<Arc<RenderImage>> {
    let bgra = overlay_bgra(frame, overlay);
    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(frame.width, frame.height, bgra)?;
    let frame = ImageFrame::new(buffer);

    Some(Arc::new(RenderImage::new(vec![frame])))
}

fn overlay_bgra(frame: &Frame, overlay: Option<&DisplayList>) -> Vec<u8> {
    let mut rgba = frame.rgba.clone();
    if let Some(list) = overlay {
        raster::rasterize(list.commands(), &mut rgba, frame.width, frame.height);
    }

    // GPUI expects BGRA; convert in place to avoid the async asset pipeline and flicker.
    for px in rgba.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    rgba
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct PlacedLabel {
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub font_size: f32,
    pub color: Color,
}

/// Maps the overlay's text commands into a `container` showing `result.frame`.
/// Returns nothing when the frame and overlay disagree on the canvas size.
pub(super) fn place_labels(result: &OverlayFrame, container: (f32, f32)) -> Vec<PlacedLabel> {
    if result.frame.display_size() != result.display {
        return Vec::new();
    }
    let fit = contain_fit(container, result.display);
    result
        .overlay
        .texts()
        .map(|(text, position, style)| {
            let (left, baseline) = fit.place(position.x, position.y);
            let font_size = style.font_size * fit.scale;
            PlacedLabel {
                text: text.to_string(),
                left,
                top: baseline - font_size,
                font_size,
                color: style.color,
            }
        })
        .collect()
}

/// Placement of content scaled to fit inside a container, aspect preserved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct ContainFit {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl ContainFit {
    pub fn place(&self, x: f32, y: f32) -> (f32, f32) {
        (self.offset_x + x * self.scale, self.offset_y + y * self.scale)
    }
}

pub(super) fn contain_fit(container: (f32, f32), content: DisplaySize) -> ContainFit {
    if content.width == 0 || content.height == 0 {
        return ContainFit {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        };
    }
    let (cw, ch) = (content.width as f32, content.height as f32);
    let scale = (container.0 / cw).min(container.1 / ch);
    ContainFit {
        scale,
        offset_x: (container.0 - cw * scale) / 2.0,
        offset_y: (container.1 - ch * scale) / 2.0,
    }
}

/// On-screen size of the video box: the frame at native size, clamped to the
/// window's video area with the aspect ratio kept.
pub(super) fn video_box_size(display: Option<DisplaySize>) -> (f32, f32) {
    let Some(display) = display.filter(|d| d.width > 0 && d.height > 0) else {
        return VIDEO_MIN_SIZE;
    };
    let (w, h) = (display.width as f32, display.height as f32);
    let shrink = (VIDEO_MAX_SIZE.0 / w).min(VIDEO_MAX_SIZE.1 / h).min(1.0);
    let grow = (VIDEO_MIN_SIZE.0 / w).max(VIDEO_MIN_SIZE.1 / h).max(1.0);
    let scale = if shrink < 1.0 { shrink } else { grow };
    (w * scale, h * scale)
}

pub(super) fn color_to_hsla(color: Color) -> Hsla {
    gpui::Rgba {
        r: color[0] as f32 / 255.0,
        g: color[1] as f32 / 255.0,
        b: color[2] as f32 / 255.0,
        a: color[3] as f32 / 255.0,
    }
    .into()
}

pub(super) fn progress_bar_string(downloaded: u64, total: Option<u64>, ready: bool) -> String {
    const BAR_LEN: usize = 24;
    if ready {
        return format!("[{}] ready", "=".repeat(BAR_LEN));
    }
    match total {
        Some(total) if total > 0 => {
            let pct = (downloaded as f64 / total as f64).clamp(0.0, 1.0);
            let filled = ((pct * BAR_LEN as f64).round() as usize).min(BAR_LEN);
            format!(
                "[{}{}] {:>5.1}%",
                "=".repeat(filled),
                " ".repeat(BAR_LEN - filled),
                pct * 100.0
            )
        }
        _ if downloaded > 0 => format!("[{:<BAR_LEN$}] {} KB", ">", downloaded / 1024),
        _ => format!("[{}] waiting", " ".repeat(BAR_LEN)),
    }
}
