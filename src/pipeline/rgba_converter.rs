//! Native camera buffers to RGBA frames.

use std::time::Instant;

use anyhow::{Result, anyhow};
use nokhwa::{Buffer, utils::FrameFormat};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

use crate::types::Frame;

pub fn buffer_to_frame(buffer: &Buffer) -> Result<Frame> {
    let resolution = buffer.resolution();
    let (width, height) = (resolution.width_x, resolution.height_y);
    let data = buffer.buffer();

    let rgba = match buffer.source_frame_format() {
        FrameFormat::NV12 => nv12(data, width, height)?,
        FrameFormat::YUYV => yuyv(data, width, height)?,
        FrameFormat::MJPEG => mjpeg(data, width, height)?,
        FrameFormat::RAWRGB => packed_rgb(data, width, height, ChannelOrder::Rgb)?,
        FrameFormat::RAWBGR => packed_rgb(data, width, height, ChannelOrder::Bgr)?,
        FrameFormat::GRAY => gray(data, width, height)?,
    };

    Ok(Frame {
        rgba,
        width,
        height,
        timestamp: Instant::now(),
    })
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

fn require_len(format: &str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        return Err(anyhow!(
            "{format} buffer too small: got {}, expected {expected}",
            data.len()
        ));
    }
    Ok(())
}

fn nv12(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let luma_len = pixel_count(width, height);
    let chroma_len = luma_len / 2;
    require_len("NV12", data, luma_len + chroma_len)?;

    let image = YuvBiPlanarImage {
        y_plane: &data[..luma_len],
        y_stride: width,
        uv_plane: &data[luma_len..luma_len + chroma_len],
        uv_stride: width,
        width,
        height,
    };
    let mut rgba = vec![0u8; luma_len * 4];
    yuv_nv12_to_rgba(
        &image,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12 conversion failed: {err:?}"))?;
    Ok(rgba)
}

fn yuyv(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    require_len("YUYV", data, pixel_count(width, height) * 2)?;

    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };
    let mut rgba = vec![0u8; pixel_count(width, height) * 4];
    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV conversion failed: {err:?}"))?;
    Ok(rgba)
}

fn mjpeg(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;
    // Drivers occasionally hand over truncated JPEGs; the frame size must match.
    require_len("MJPEG", &rgba, pixel_count(width, height) * 4)?;
    Ok(rgba)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChannelOrder {
    Rgb,
    Bgr,
}

fn packed_rgb(data: &[u8], width: u32, height: u32, order: ChannelOrder) -> Result<Vec<u8>> {
    let pixels = pixel_count(width, height);
    require_len("RGB", data, pixels * 3)?;

    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            let (r, b) = match order {
                ChannelOrder::Rgb => (src[0], src[2]),
                ChannelOrder::Bgr => (src[2], src[0]),
            };
            dst.copy_from_slice(&[r, src[1], b, 255]);
        });
    Ok(rgba)
}

fn gray(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = pixel_count(width, height);
    require_len("GRAY", data, pixels)?;

    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_mut(4)
        .zip(data[..pixels].par_iter().copied())
        .for_each(|(dst, v)| dst.copy_from_slice(&[v, v, v, 255]));
    Ok(rgba)
}
