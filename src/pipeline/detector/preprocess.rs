use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;
use rayon::prelude::*;

use crate::types::{BoundingBox, Frame, Point};

pub const FACE_CROP_SIZE: u32 = 112;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Image in the top-left corner, padding right and bottom.
    TopLeft,
    Centered,
}

/// How a source image was fitted into a square model input.
#[derive(Clone, Debug, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub src_w: u32,
    pub src_h: u32,
}

impl Letterbox {
    /// Maps a point in model input pixels back to source pixels.
    pub fn to_source(&self, x: f32, y: f32) -> Point {
        Point::new((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Maps landmark output of a face crop back into frame space.
#[derive(Clone, Debug, PartialEq)]
pub struct CropTransform {
    pub origin: Point,
    pub letterbox: Letterbox,
    pub input_size: u32,
}

impl CropTransform {
    /// `u`, `v` are relative to the square model input, in [0, 1].
    pub fn project(&self, u: f32, v: f32) -> Point {
        let size = self.input_size as f32;
        let local = self.letterbox.to_source(u * size, v * size);
        Point::new(self.origin.x + local.x, self.origin.y + local.y)
    }
}

fn check_frame(frame: &Frame) -> Result<()> {
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    if frame.rgba.len() != expected_len || expected_len == 0 {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgba.len(),
            expected_len
        ));
    }
    Ok(())
}

/// Fits the whole frame into a `target_size` square, padding at the bottom
/// and right.
pub fn prepare_frame(frame: &Frame, target_size: u32) -> Result<(Array4<f32>, Letterbox)> {
    check_frame(frame)?;
    letterbox_rgba(
        frame.rgba.clone(),
        frame.width,
        frame.height,
        target_size,
        Placement::TopLeft,
    )
}

/// Cuts `bbox` out of the frame and centers it in a `FACE_CROP_SIZE` square.
pub fn prepare_face_crop(frame: &Frame, bbox: &BoundingBox) -> Result<(Array4<f32>, CropTransform)> {
    check_frame(frame)?;
    if ![bbox.x, bbox.y, bbox.width, bbox.height]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(anyhow!("face box is not finite: {bbox:?}"));
    }
    let x0 = bbox.x.floor().clamp(0.0, (frame.width - 1) as f32) as u32;
    let y0 = bbox.y.floor().clamp(0.0, (frame.height - 1) as f32) as u32;
    let x1 = bbox.right().ceil().clamp(x0 as f32 + 1.0, frame.width as f32) as u32;
    let y1 = bbox.bottom().ceil().clamp(y0 as f32 + 1.0, frame.height as f32) as u32;
    let (crop_w, crop_h) = (x1 - x0, y1 - y0);

    let src_stride = frame.width as usize * 4;
    let row_len = crop_w as usize * 4;
    let mut crop = Vec::with_capacity(row_len * crop_h as usize);
    for row in y0..y1 {
        let offset = row as usize * src_stride + x0 as usize * 4;
        crop.extend_from_slice(&frame.rgba[offset..offset + row_len]);
    }

    let (input, letterbox) =
        letterbox_rgba(crop, crop_w, crop_h, FACE_CROP_SIZE, Placement::Centered)?;
    Ok((
        input,
        CropTransform {
            origin: Point::new(x0 as f32, y0 as f32),
            letterbox,
            input_size: FACE_CROP_SIZE,
        },
    ))
}

fn letterbox_rgba(
    rgba: Vec<u8>,
    width: u32,
    height: u32,
    target_size: u32,
    placement: Placement,
) -> Result<(Array4<f32>, Letterbox)> {
    let scale = target_size as f32 / (width.max(height) as f32);
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, target_size);

    let src_image = fir::images::Image::from_vec_u8(width, height, rgba, fir::PixelType::U8x4)?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    fir::Resizer::new()
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let (pad_x, pad_y) = match placement {
        Placement::TopLeft => (0, 0),
        Placement::Centered => (
            ((target_size - new_w) / 2) as usize,
            ((target_size - new_h) / 2) as usize,
        ),
    };

    let mut canvas = vec![0u8; (target_size as usize) * (target_size as usize) * 4];
    let dst_stride = target_size as usize * 4;
    let src_stride = new_w as usize * 4;
    for row in 0..(new_h as usize) {
        let dst_offset = (pad_y + row) * dst_stride + pad_x * 4;
        let src_offset = row * src_stride;
        canvas[dst_offset..dst_offset + src_stride]
            .copy_from_slice(&resized[src_offset..src_offset + src_stride]);
    }

    let normalized: Vec<f32> = canvas
        .par_chunks_exact(4)
        .flat_map_iter(|px| {
            [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ]
        })
        .collect();
    let input = Array4::<f32>::from_shape_vec(
        (1, target_size as usize, target_size as usize, 3),
        normalized,
    )
    .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

    Ok((
        input,
        Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
            src_w: width,
            src_h: height,
        },
    ))
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn solid_frame(width: u32, height: u32) -> Frame {
        Frame {
            rgba: vec![255; (width * height * 4) as usize],
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn whole_frame_is_padded_bottom_right() {
        let (input, letterbox) = prepare_frame(&solid_frame(64, 32), 32).unwrap();
        assert_eq!(input.shape(), &[1, 32, 32, 3]);
        assert_eq!(letterbox.scale, 0.5);
        assert_eq!((letterbox.pad_x, letterbox.pad_y), (0.0, 0.0));
        assert_eq!(input[[0, 0, 0, 0]], 1.0);
        assert_eq!(input[[0, 31, 0, 0]], 0.0);
        assert_eq!(letterbox.to_source(16.0, 8.0), Point::new(32.0, 16.0));
    }

    #[test]
    fn face_crop_is_centered_and_projects_back() {
        let frame = solid_frame(200, 200);
        let bbox = BoundingBox::from_corners(40.0, 20.0, 96.0, 132.0);
        let (input, transform) = prepare_face_crop(&frame, &bbox).unwrap();
        assert_eq!(input.shape(), &[1, 112, 112, 3]);

        // 56x112 crop scales 1:1 and sits in the middle columns.
        assert_eq!(transform.letterbox.scale, 1.0);
        assert_eq!(transform.letterbox.pad_x, 28.0);
        assert_eq!(input[[0, 50, 0, 0]], 0.0);
        assert_eq!(input[[0, 50, 56, 0]], 1.0);

        assert_eq!(transform.project(0.25, 0.0), Point::new(40.0, 20.0));
        assert_eq!(transform.project(0.5, 1.0), Point::new(68.0, 132.0));
    }

    #[test]
    fn crop_is_clamped_to_frame() {
        let frame = solid_frame(50, 50);
        let bbox = BoundingBox::from_corners(-10.0, 30.0, 80.0, 90.0);
        let (_, transform) = prepare_face_crop(&frame, &bbox).unwrap();
        assert_eq!(transform.origin, Point::new(0.0, 30.0));
        assert_eq!(transform.letterbox.src_w, 50);
        assert_eq!(transform.letterbox.src_h, 20);
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let mut frame = solid_frame(4, 4);
        frame.rgba.pop();
        assert!(prepare_frame(&frame, 32).is_err());
    }
}
