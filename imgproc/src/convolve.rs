use align_core::ImageF32;
use image::GrayImage;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    Constant(u8),
    Replicate,
    Reflect,
    Reflect101,
}

pub(crate) fn map_coord(coord: isize, len: usize, mode: BorderMode) -> Option<usize> {
    let n = len as isize;
    if n <= 0 {
        return None;
    }

    match mode {
        BorderMode::Constant(_) => {
            if coord < 0 || coord >= n {
                None
            } else {
                Some(coord as usize)
            }
        }
        BorderMode::Replicate => Some(coord.clamp(0, n - 1) as usize),
        BorderMode::Reflect => {
            if n == 1 {
                return Some(0);
            }
            let period = 2 * n;
            let mut c = coord % period;
            if c < 0 {
                c += period;
            }
            if c >= n {
                c = period - c - 1;
            }
            Some(c as usize)
        }
        BorderMode::Reflect101 => {
            if n == 1 {
                return Some(0);
            }
            let period = 2 * n - 2;
            let mut c = coord % period;
            if c < 0 {
                c += period;
            }
            if c >= n {
                c = period - c;
            }
            Some(c as usize)
        }
    }
}

/// Odd kernel length covering `±3σ`.
pub fn gaussian_kernel_size(sigma: f32) -> usize {
    let radius = (3.0 * sigma).ceil().max(1.0) as usize;
    2 * radius + 1
}

pub fn gaussian_kernel_1d(sigma: f32, size: usize) -> Vec<f32> {
    assert!(size % 2 == 1, "gaussian kernel size must be odd");
    let mut kernel = Vec::with_capacity(size);
    let center = (size / 2) as isize;
    let sigma2 = sigma * sigma;
    let mut sum = 0.0f32;

    for i in 0..size {
        let x = (i as isize - center) as f32;
        let v = (-(x * x) / (2.0 * sigma2)).exp();
        kernel.push(v);
        sum += v;
    }

    if sum != 0.0 {
        for v in &mut kernel {
            *v /= sum;
        }
    }

    kernel
}

fn convolve_row_1d(padded: &[f32], out: &mut [f32], kernel: &[f32]) {
    for (x, o) in out.iter_mut().enumerate() {
        *o = kernel
            .iter()
            .zip(&padded[x..x + kernel.len()])
            .map(|(k, v)| k * v)
            .sum();
    }
}

/// Two-pass separable convolution of a float plane. Rows are processed in
/// parallel in both passes.
pub fn separable_convolve_f32(
    image: &ImageF32,
    kx: &[f32],
    ky: &[f32],
    border: BorderMode,
) -> ImageF32 {
    assert!(kx.len() % 2 == 1, "kx size must be odd");
    assert!(ky.len() % 2 == 1, "ky size must be odd");

    let width = image.width;
    let height = image.height;
    if width == 0 || height == 0 {
        return image.clone();
    }
    let rx = kx.len() / 2;
    let ry = ky.len() / 2;
    let constant = match border {
        BorderMode::Constant(v) => v as f32 / 255.0,
        _ => 0.0,
    };

    let mut tmp = vec![0.0f32; width * height];

    // Horizontal pass
    tmp.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row_out)| {
            let row = image.row(y);
            let padded: Vec<f32> = (0..width + 2 * rx)
                .map(|i| match map_coord(i as isize - rx as isize, width, border) {
                    Some(ix) => row[ix],
                    None => constant,
                })
                .collect();
            convolve_row_1d(&padded, row_out, kx);
        });

    // Vertical pass
    let mut out = ImageF32::new(width, height);
    out.data
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row_out)| {
            for (k, &w) in ky.iter().enumerate() {
                let sy = y as isize + k as isize - ry as isize;
                match map_coord(sy, height, border) {
                    Some(iy) => {
                        let src = &tmp[iy * width..(iy + 1) * width];
                        for (o, v) in row_out.iter_mut().zip(src) {
                            *o += w * v;
                        }
                    }
                    None => {
                        for o in row_out.iter_mut() {
                            *o += w * constant;
                        }
                    }
                }
            }
        });

    out
}

pub fn gaussian_blur_f32(image: &ImageF32, sigma: f32) -> ImageF32 {
    if sigma <= 0.0 {
        return image.clone();
    }
    let kernel = gaussian_kernel_1d(sigma, gaussian_kernel_size(sigma));
    separable_convolve_f32(image, &kernel, &kernel, BorderMode::Replicate)
}

pub fn gaussian_blur_with_border(image: &GrayImage, sigma: f32, border: BorderMode) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    let kernel = gaussian_kernel_1d(sigma, gaussian_kernel_size(sigma));
    separable_convolve_f32(&ImageF32::from_gray(image), &kernel, &kernel, border).to_gray()
}

pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_with_border(image, sigma, BorderMode::Replicate)
}
