use crate::{validate_image_size, ImgprocError, Result};
use align_core::ImageF32;
use image::GrayImage;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    Nearest,
    #[default]
    Linear,
}

pub fn resize(src: &GrayImage, width: u32, height: u32, interpolation: Interpolation) -> GrayImage {
    if width == 0 || height == 0 || src.width() == 0 || src.height() == 0 {
        return GrayImage::new(width, height);
    }
    match interpolation {
        Interpolation::Nearest => resize_nearest(src, width, height),
        Interpolation::Linear => resize_linear(src, width, height),
    }
}

fn resize_nearest(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    let mut dst = GrayImage::new(width, height);
    let scale_x = src.width() as f32 / width as f32;
    let scale_y = src.height() as f32 / height as f32;

    dst.as_mut()
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let sy = (((y as f32 + 0.5) * scale_y) as u32).min(src.height() - 1);
            for (x, out) in row.iter_mut().enumerate() {
                let sx = (((x as f32 + 0.5) * scale_x) as u32).min(src.width() - 1);
                *out = src.get_pixel(sx, sy)[0];
            }
        });
    dst
}

/// Bilinear resize with pixel-centre alignment: destination pixel `x` samples
/// the source at `(x + 0.5) * src_w / dst_w - 0.5`.
pub fn resize_linear(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    let mut dst = GrayImage::new(width, height);
    let scale_x = src.width() as f32 / width as f32;
    let scale_y = src.height() as f32 / height as f32;
    let max_x = src.width() - 1;
    let max_y = src.height() - 1;

    dst.as_mut()
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let fy = ((y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, max_y as f32);
            let y0 = fy as u32;
            let y1 = (y0 + 1).min(max_y);
            let dy = fy - y0 as f32;

            for (x, out) in row.iter_mut().enumerate() {
                let fx = ((x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, max_x as f32);
                let x0 = fx as u32;
                let x1 = (x0 + 1).min(max_x);
                let dx = fx - x0 as f32;

                let v00 = src.get_pixel(x0, y0)[0] as f32;
                let v10 = src.get_pixel(x1, y0)[0] as f32;
                let v01 = src.get_pixel(x0, y1)[0] as f32;
                let v11 = src.get_pixel(x1, y1)[0] as f32;

                let v0 = v00 * (1.0 - dx) + v10 * dx;
                let v1 = v01 * (1.0 - dx) + v11 * dx;
                let v = v0 * (1.0 - dy) + v1 * dy;

                *out = v.round().clamp(0.0, 255.0) as u8;
            }
        });

    dst
}

/// Resamples `src` by `factor` (e.g. `0.5` halves both sides). A factor of
/// exactly 1 returns a copy.
pub fn downscale(src: &GrayImage, factor: f32) -> Result<GrayImage> {
    validate_image_size(src.width(), src.height())?;
    if !(factor > 0.0 && factor <= 1.0) {
        return Err(ImgprocError::AlgorithmError(format!(
            "scale factor must be in (0, 1], got {factor}"
        )));
    }
    if factor == 1.0 {
        return Ok(src.clone());
    }
    let width = ((src.width() as f32 * factor).round() as u32).max(1);
    let height = ((src.height() as f32 * factor).round() as u32).max(1);
    Ok(resize_linear(src, width, height))
}

/// Keeps every second sample in both directions; used between scale-space
/// octaves where the plane is already low-passed.
pub fn decimate_f32(src: &ImageF32) -> ImageF32 {
    let width = (src.width / 2).max(1);
    let height = (src.height / 2).max(1);
    let mut dst = ImageF32::new(width, height);
    dst.data
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let sy = (2 * y).min(src.height.saturating_sub(1));
            let src_row = src.row(sy);
            for (x, out) in row.iter_mut().enumerate() {
                *out = src_row[(2 * x).min(src.width - 1)];
            }
        });
    dst
}
