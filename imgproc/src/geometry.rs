use crate::convolve::map_coord;
use crate::{BorderMode, Interpolation};
use image::GrayImage;
use nalgebra::{Matrix3, Point2};
use rayon::prelude::*;

/// Preimages are clamped to this magnitude so integer neighbours never
/// overflow; anything that far out is already outside every image.
const COORD_LIMIT: f64 = 1.0e9;

fn get_pixel_bilinear_with_border(img: &GrayImage, x: f64, y: f64, border: BorderMode) -> f64 {
    let x = x.clamp(-COORD_LIMIT, COORD_LIMIT);
    let y = y.clamp(-COORD_LIMIT, COORD_LIMIT);
    let x0 = x.floor() as isize;
    let y0 = y.floor() as isize;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let v00 = sample_pixel(img, x0, y0, border);
    let v10 = sample_pixel(img, x1, y0, border);
    let v01 = sample_pixel(img, x0, y1, border);
    let v11 = sample_pixel(img, x1, y1, border);

    let v0 = v00 * (1.0 - fx) + v10 * fx;
    let v1 = v01 * (1.0 - fx) + v11 * fx;

    v0 * (1.0 - fy) + v1 * fy
}

fn get_pixel_nearest_with_border(img: &GrayImage, x: f64, y: f64, border: BorderMode) -> f64 {
    let x = x.clamp(-COORD_LIMIT, COORD_LIMIT);
    let y = y.clamp(-COORD_LIMIT, COORD_LIMIT);
    sample_pixel(img, x.round() as isize, y.round() as isize, border)
}

fn sample_pixel(img: &GrayImage, x: isize, y: isize, border: BorderMode) -> f64 {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let raw = img.as_raw();

    match (map_coord(x, width, border), map_coord(y, height, border)) {
        (Some(ix), Some(iy)) => raw[iy * width + ix] as f64,
        _ => match border {
            BorderMode::Constant(v) => v as f64,
            _ => 0.0,
        },
    }
}

fn interpolate_sample(
    src: &GrayImage,
    x: f64,
    y: f64,
    interpolation: Interpolation,
    border: BorderMode,
) -> f64 {
    match interpolation {
        Interpolation::Nearest => get_pixel_nearest_with_border(src, x, y, border),
        Interpolation::Linear => get_pixel_bilinear_with_border(src, x, y, border),
    }
}

/// Inverse-mapping warp: destination pixel `(x, y)` takes the source value at
/// `matrix * (x, y, 1)`. Destination points whose preimage is at infinity get
/// the border's constant value.
pub fn warp_perspective_ex(
    src: &GrayImage,
    matrix: &Matrix3<f64>,
    width: u32,
    height: u32,
    interpolation: Interpolation,
    border: BorderMode,
) -> GrayImage {
    let mut dst = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return dst;
    }
    let outside = match border {
        BorderMode::Constant(v) => v,
        _ => 0,
    };

    dst.as_mut()
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let pt = Point2::new(x as f64, y as f64);
                *out = match transform_point(matrix, &pt) {
                    Some(src_pt) => {
                        let val =
                            interpolate_sample(src, src_pt.x, src_pt.y, interpolation, border);
                        val.round().clamp(0.0, 255.0) as u8
                    }
                    None => outside,
                };
            }
        });

    dst
}

pub fn warp_perspective(src: &GrayImage, matrix: &Matrix3<f64>, width: u32, height: u32) -> GrayImage {
    warp_perspective_ex(
        src,
        matrix,
        width,
        height,
        Interpolation::Linear,
        BorderMode::Constant(0),
    )
}

fn transform_point(matrix: &Matrix3<f64>, pt: &Point2<f64>) -> Option<Point2<f64>> {
    let x = pt.x;
    let y = pt.y;

    let w = matrix[(2, 0)] * x + matrix[(2, 1)] * y + matrix[(2, 2)];
    if w.abs() <= 1e-12 || !w.is_finite() {
        return None;
    }
    let sx = (matrix[(0, 0)] * x + matrix[(0, 1)] * y + matrix[(0, 2)]) / w;
    let sy = (matrix[(1, 0)] * x + matrix[(1, 1)] * y + matrix[(1, 2)]) / w;
    (sx.is_finite() && sy.is_finite()).then(|| Point2::new(sx, sy))
}
