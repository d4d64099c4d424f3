//! Scale-invariant feature transform.
//!
//! Keypoints are scale-space extrema of the difference-of-Gaussians pyramid,
//! refined to sub-pixel accuracy and assigned one or more dominant
//! orientations. Each keypoint gets a 4×4×8 gradient-histogram descriptor
//! sampled in its rotated frame.

use crate::descriptor::FeatureExtractor;
use align_core::{Descriptor, Error, ImageF32, ImageFeatures, KeyPoint, Result};
use align_imgproc::{decimate_f32, gaussian_blur_f32};
use image::GrayImage;
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Blur assumed to be present in the input image.
const SIGMA_IN: f32 = 0.5;
const IMAGE_BORDER: usize = 5;
const MAX_INTERP_STEPS: usize = 5;

const ORI_HIST_BINS: usize = 36;
const ORI_SIG_FCTR: f32 = 1.5;
const ORI_RADIUS: f32 = 3.0 * ORI_SIG_FCTR;
const ORI_PEAK_RATIO: f32 = 0.8;

const DESCR_WIDTH: usize = 4;
const DESCR_HIST_BINS: usize = 8;
const DESCR_SCL_FCTR: f32 = 3.0;
const DESCR_MAG_THR: f32 = 0.2;

pub const DESCRIPTOR_SIZE: usize = DESCR_WIDTH * DESCR_WIDTH * DESCR_HIST_BINS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    /// Upper bound on pyramid octaves; small images get fewer.
    pub n_octaves: usize,
    /// Scales sampled per octave.
    pub n_layers: usize,
    pub sigma: f32,
    /// Minimum DoG contrast on `[0, 1]` intensities.
    pub contrast_threshold: f32,
    /// Principal-curvature ratio above which edge responses are dropped.
    pub edge_threshold: f32,
    /// Keep only the strongest responses.
    pub max_features: Option<usize>,
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            n_octaves: 4,
            n_layers: 3,
            sigma: 1.6,
            contrast_threshold: 0.04,
            edge_threshold: 10.0,
            max_features: None,
        }
    }
}

impl SiftConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_octaves == 0 || self.n_layers == 0 {
            return Err(Error::InvalidConfig(
                "sift: n_octaves and n_layers must be >= 1".into(),
            ));
        }
        if !(self.sigma > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "sift: sigma must be positive, got {}",
                self.sigma
            )));
        }
        if !(self.contrast_threshold >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "sift: contrast_threshold must be >= 0, got {}",
                self.contrast_threshold
            )));
        }
        if !(self.edge_threshold >= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "sift: edge_threshold must be >= 1, got {}",
                self.edge_threshold
            )));
        }
        Ok(())
    }
}

/// Refined scale-space extremum in octave coordinates.
#[derive(Debug, Clone, Copy)]
struct Extremum {
    octave: usize,
    layer: usize,
    c: usize,
    r: usize,
    offset: Vector3<f32>,
    contrast: f32,
}

impl Extremum {
    fn key(&self) -> (usize, usize, usize, usize) {
        (self.octave, self.layer, self.r, self.c)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sift {
    config: SiftConfig,
}

impl Sift {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SiftConfig) -> Self {
        Self { config }
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.config.max_features = Some(max_features);
        self
    }

    pub fn config(&self) -> &SiftConfig {
        &self.config
    }

    /// Octaves actually built for a `width × height` image.
    pub fn octave_count(&self, width: usize, height: usize) -> usize {
        let min_side = width.min(height).max(1) as f32;
        let fit = (min_side.log2().floor() as i64 - 3).max(1) as usize;
        fit.min(self.config.n_octaves.max(1))
    }

    /// Incremental blur applied to produce layer `i` from layer `i - 1`;
    /// entry 0 is the absolute blur of the octave base.
    fn layer_sigmas(&self) -> Vec<f32> {
        let n_layers = self.config.n_layers;
        let sigma = self.config.sigma;
        let k = 2.0f32.powf(1.0 / n_layers as f32);
        let mut sigmas = Vec::with_capacity(n_layers + 3);
        sigmas.push(sigma);
        for i in 1..(n_layers + 3) {
            let sig_prev = sigma * k.powi(i as i32 - 1);
            let sig_total = sig_prev * k;
            sigmas.push((sig_total * sig_total - sig_prev * sig_prev).sqrt());
        }
        sigmas
    }

    /// Gaussian pyramid: `octaves × (n_layers + 3)` planes.
    pub fn build_scale_space(&self, image: &ImageF32) -> Vec<Vec<ImageF32>> {
        let n_octaves = self.octave_count(image.width, image.height);
        let n_layers = self.config.n_layers;
        let sigmas = self.layer_sigmas();
        let base_sigma = (self.config.sigma.powi(2) - SIGMA_IN * SIGMA_IN)
            .max(0.01)
            .sqrt();

        let mut pyramid: Vec<Vec<ImageF32>> = Vec::with_capacity(n_octaves);
        for _ in 0..n_octaves {
            let first = match pyramid.last() {
                None => gaussian_blur_f32(image, base_sigma),
                Some(prev) => decimate_f32(&prev[n_layers]),
            };
            let mut octave = Vec::with_capacity(n_layers + 3);
            octave.push(first);
            for &sig in &sigmas[1..] {
                let next = gaussian_blur_f32(&octave[octave.len() - 1], sig);
                octave.push(next);
            }
            pyramid.push(octave);
        }
        pyramid
    }

    /// Differences of adjacent Gaussian layers: `octaves × (n_layers + 2)`.
    pub fn compute_dog(&self, gaussian_pyramid: &[Vec<ImageF32>]) -> Vec<Vec<ImageF32>> {
        gaussian_pyramid
            .iter()
            .map(|octave| {
                octave
                    .windows(2)
                    .map(|pair| {
                        pair[1]
                            .difference(&pair[0])
                            .unwrap_or_else(|| ImageF32::new(pair[0].width, pair[0].height))
                    })
                    .collect()
            })
            .collect()
    }

    pub fn detect_and_compute(&self, image: &GrayImage) -> ImageFeatures {
        if image.width() == 0 || image.height() == 0 {
            return ImageFeatures::empty();
        }
        let base = ImageF32::from_gray(image);
        let gaussians = self.build_scale_space(&base);
        let dogs = self.compute_dog(&gaussians);
        let n_layers = self.config.n_layers;

        let layers: Vec<(usize, usize)> = (0..dogs.len())
            .flat_map(|o| (1..=n_layers).map(move |l| (o, l)))
            .collect();
        let mut extrema: Vec<Extremum> = layers
            .par_iter()
            .map(|&(o, l)| self.scan_layer(&dogs[o], o, l))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();
        // Several candidates may converge onto the same refined location.
        extrema.sort_by_key(Extremum::key);
        extrema.dedup_by_key(|e| e.key());

        let mut pairs: Vec<(KeyPoint, Descriptor)> = extrema
            .par_iter()
            .map(|e| self.describe_extremum(&gaussians[e.octave][e.layer], e))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();

        if let Some(max) = self.config.max_features {
            if pairs.len() > max {
                pairs.sort_by(|a, b| b.0.response.total_cmp(&a.0.response));
                pairs.truncate(max);
            }
        }

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            octaves = gaussians.len(),
            extrema = extrema.len(),
            keypoints = pairs.len(),
            "sift extraction"
        );
        ImageFeatures::from_pairs(pairs)
    }

    fn scan_layer(&self, dog: &[ImageF32], octave: usize, layer: usize) -> Vec<Extremum> {
        let cur = &dog[layer];
        let (w, h) = (cur.width, cur.height);
        if w <= 2 * IMAGE_BORDER || h <= 2 * IMAGE_BORDER {
            return Vec::new();
        }
        let threshold = 0.5 * self.config.contrast_threshold / self.config.n_layers as f32;
        let stack = [&dog[layer - 1], cur, &dog[layer + 1]];

        let mut found = Vec::new();
        for r in IMAGE_BORDER..h - IMAGE_BORDER {
            for c in IMAGE_BORDER..w - IMAGE_BORDER {
                let val = cur.get(c, r);
                if val.abs() <= threshold || !is_extremum(&stack, c, r, val) {
                    continue;
                }
                if let Some(e) = self.localize(dog, octave, layer, c, r) {
                    found.push(e);
                }
            }
        }
        found
    }

    /// Newton refinement of a discrete extremum followed by the contrast and
    /// edge tests.
    fn localize(
        &self,
        dog: &[ImageF32],
        octave: usize,
        layer: usize,
        c: usize,
        r: usize,
    ) -> Option<Extremum> {
        let n_layers = self.config.n_layers as isize;
        let (w, h) = (dog[0].width as isize, dog[0].height as isize);
        let border = IMAGE_BORDER as isize;
        let (mut c, mut r, mut layer) = (c as isize, r as isize, layer as isize);

        let mut offset = Vector3::zeros();
        let mut converged = false;
        for _ in 0..MAX_INTERP_STEPS {
            let (grad, hess) = derivatives(dog, layer as usize, c as usize, r as usize);
            offset = -hess.lu().solve(&grad)?;
            if offset.iter().all(|v| v.abs() < 0.5) {
                converged = true;
                break;
            }
            if offset.iter().any(|v| !v.is_finite() || v.abs() > (i32::MAX / 3) as f32) {
                return None;
            }
            c += offset[0].round() as isize;
            r += offset[1].round() as isize;
            layer += offset[2].round() as isize;
            if layer < 1
                || layer > n_layers
                || c < border
                || c >= w - border
                || r < border
                || r >= h - border
            {
                return None;
            }
        }
        if !converged {
            return None;
        }

        let (c, r, layer) = (c as usize, r as usize, layer as usize);
        let (grad, hess) = derivatives(dog, layer, c, r);
        let contrast = dog[layer].get(c, r) + 0.5 * grad.dot(&offset);
        if contrast.abs() * (n_layers as f32) < self.config.contrast_threshold {
            return None;
        }

        let (dxx, dyy, dxy) = (hess[(0, 0)], hess[(1, 1)], hess[(0, 1)]);
        let tr = dxx + dyy;
        let det = dxx * dyy - dxy * dxy;
        let edge = self.config.edge_threshold;
        if det <= 0.0 || tr * tr * edge >= (edge + 1.0) * (edge + 1.0) * det {
            return None;
        }

        Some(Extremum {
            octave,
            layer,
            c,
            r,
            offset,
            contrast,
        })
    }

    fn describe_extremum(&self, image: &ImageF32, e: &Extremum) -> Vec<(KeyPoint, Descriptor)> {
        let octave_scale = (1usize << e.octave) as f32;
        let layer_pos = e.layer as f32 + e.offset[2];
        let scl_octv = self.config.sigma * 2.0f32.powf(layer_pos / self.config.n_layers as f32);
        let x_oct = e.c as f32 + e.offset[0];
        let y_oct = e.r as f32 + e.offset[1];

        orientations(image, e.c, e.r, scl_octv)
            .into_iter()
            .map(|angle| {
                let kp = KeyPoint::new((x_oct * octave_scale) as f64, (y_oct * octave_scale) as f64)
                    .with_size((2.0 * scl_octv * octave_scale) as f64)
                    .with_angle(angle as f64)
                    .with_response(e.contrast.abs() as f64)
                    .with_octave(e.octave as i32);
                (kp, describe(image, x_oct, y_oct, angle, scl_octv))
            })
            .collect()
    }
}

impl FeatureExtractor for Sift {
    fn extract(&self, image: &GrayImage) -> ImageFeatures {
        self.detect_and_compute(image)
    }
}

/// Strict extremum over the 26 neighbours in `stack = [below, cur, above]`.
fn is_extremum(stack: &[&ImageF32; 3], c: usize, r: usize, val: f32) -> bool {
    let is_max = val > 0.0;
    for (k, img) in stack.iter().enumerate() {
        for y in r - 1..=r + 1 {
            for x in c - 1..=c + 1 {
                if k == 1 && x == c && y == r {
                    continue;
                }
                let v = img.get(x, y);
                if (is_max && v >= val) || (!is_max && v <= val) {
                    return false;
                }
            }
        }
    }
    true
}

/// Gradient and Hessian of the DoG stack at `(c, r, layer)`, ordered
/// `(x, y, scale)`.
fn derivatives(dog: &[ImageF32], layer: usize, c: usize, r: usize) -> (Vector3<f32>, Matrix3<f32>) {
    let prev = &dog[layer - 1];
    let cur = &dog[layer];
    let next = &dog[layer + 1];

    let v2 = 2.0 * cur.get(c, r);
    let grad = Vector3::new(
        (cur.get(c + 1, r) - cur.get(c - 1, r)) * 0.5,
        (cur.get(c, r + 1) - cur.get(c, r - 1)) * 0.5,
        (next.get(c, r) - prev.get(c, r)) * 0.5,
    );

    let dxx = cur.get(c + 1, r) + cur.get(c - 1, r) - v2;
    let dyy = cur.get(c, r + 1) + cur.get(c, r - 1) - v2;
    let dss = next.get(c, r) + prev.get(c, r) - v2;
    let dxy = (cur.get(c + 1, r + 1) - cur.get(c - 1, r + 1) - cur.get(c + 1, r - 1)
        + cur.get(c - 1, r - 1))
        * 0.25;
    let dxs = (next.get(c + 1, r) - next.get(c - 1, r) - prev.get(c + 1, r) + prev.get(c - 1, r))
        * 0.25;
    let dys = (next.get(c, r + 1) - next.get(c, r - 1) - prev.get(c, r + 1) + prev.get(c, r - 1))
        * 0.25;

    let hess = Matrix3::new(dxx, dxy, dxs, dxy, dyy, dys, dxs, dys, dss);
    (grad, hess)
}

/// Central-difference gradient `(dx, dy)` with `y` pointing up.
#[inline]
fn gradient(image: &ImageF32, x: usize, y: usize) -> (f32, f32) {
    (
        image.get(x + 1, y) - image.get(x - 1, y),
        image.get(x, y - 1) - image.get(x, y + 1),
    )
}

/// Dominant orientations (degrees) around `(c, r)`.
fn orientations(image: &ImageF32, c: usize, r: usize, scl_octv: f32) -> Vec<f32> {
    let n = ORI_HIST_BINS;
    let radius = (ORI_RADIUS * scl_octv).round() as isize;
    let sigma_w = ORI_SIG_FCTR * scl_octv;
    let exp_scale = -1.0 / (2.0 * sigma_w * sigma_w);
    let (w, h) = (image.width as isize, image.height as isize);

    let mut raw = [0.0f32; ORI_HIST_BINS];
    for i in -radius..=radius {
        let y = r as isize + i;
        if y <= 0 || y >= h - 1 {
            continue;
        }
        for j in -radius..=radius {
            let x = c as isize + j;
            if x <= 0 || x >= w - 1 {
                continue;
            }
            let (dx, dy) = gradient(image, x as usize, y as usize);
            let weight = (((i * i + j * j) as f32) * exp_scale).exp();
            let ori = dy.atan2(dx).to_degrees();
            let bin = ((n as f32 / 360.0) * ori).round() as isize;
            raw[bin.rem_euclid(n as isize) as usize] += weight * (dx * dx + dy * dy).sqrt();
        }
    }

    let at = |k: isize| raw[k.rem_euclid(n as isize) as usize];
    let hist: Vec<f32> = (0..n as isize)
        .map(|k| {
            (at(k - 2) + at(k + 2)) * (1.0 / 16.0)
                + (at(k - 1) + at(k + 1)) * (4.0 / 16.0)
                + at(k) * (6.0 / 16.0)
        })
        .collect();

    let max = hist.iter().copied().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return Vec::new();
    }
    let mag_thr = max * ORI_PEAK_RATIO;

    let mut angles = Vec::new();
    for j in 0..n {
        let left = hist[(j + n - 1) % n];
        let right = hist[(j + 1) % n];
        let v = hist[j];
        if v > left && v > right && v >= mag_thr {
            let mut bin = j as f32 + 0.5 * (left - right) / (left - 2.0 * v + right);
            if bin < 0.0 {
                bin += n as f32;
            } else if bin >= n as f32 {
                bin -= n as f32;
            }
            let mut angle = 360.0 - (360.0 / n as f32) * bin;
            if (angle - 360.0).abs() < f32::EPSILON {
                angle = 0.0;
            }
            angles.push(angle);
        }
    }
    angles
}

/// 4×4×8 histogram of gradients in the keypoint's rotated frame, trilinearly
/// interpolated, normalized, clipped at 0.2 and renormalized.
fn describe(image: &ImageF32, x: f32, y: f32, angle: f32, scl: f32) -> Descriptor {
    let d = DESCR_WIDTH;
    let n = DESCR_HIST_BINS;
    let (w, h) = (image.width as isize, image.height as isize);
    let ptx = x.round() as isize;
    let pty = y.round() as isize;

    let mut ori = 360.0 - angle;
    if (ori - 360.0).abs() < f32::EPSILON {
        ori = 0.0;
    }
    let bins_per_deg = n as f32 / 360.0;
    let exp_scale = -1.0 / (d as f32 * d as f32 * 0.5);
    let hist_width = DESCR_SCL_FCTR * scl;
    let diag = ((w * w + h * h) as f32).sqrt();
    let radius = (hist_width * std::f32::consts::SQRT_2 * (d as f32 + 1.0) * 0.5)
        .round()
        .min(diag) as isize;
    let (sin_t, cos_t) = ori.to_radians().sin_cos();
    let (sin_t, cos_t) = (sin_t / hist_width, cos_t / hist_width);

    let row_stride = (d + 2) * (n + 2);
    let col_stride = n + 2;
    let mut hist = vec![0.0f32; (d + 2) * row_stride];
    let half = d as f32 / 2.0 - 0.5;

    for i in -radius..=radius {
        for j in -radius..=radius {
            let c_rot = j as f32 * cos_t - i as f32 * sin_t;
            let r_rot = j as f32 * sin_t + i as f32 * cos_t;
            let rbin = r_rot + half;
            let cbin = c_rot + half;
            let r = pty + i;
            let c = ptx + j;

            if rbin <= -1.0
                || rbin >= d as f32
                || cbin <= -1.0
                || cbin >= d as f32
                || r <= 0
                || r >= h - 1
                || c <= 0
                || c >= w - 1
            {
                continue;
            }

            let (dx, dy) = gradient(image, c as usize, r as usize);
            let grad_ori = dy.atan2(dx).to_degrees().rem_euclid(360.0);
            let mag = (dx * dx + dy * dy).sqrt() * ((c_rot * c_rot + r_rot * r_rot) * exp_scale).exp();
            let obin = (grad_ori - ori) * bins_per_deg;

            let (r0, c0, o0) = (rbin.floor(), cbin.floor(), obin.floor());
            let (rf, cf, of) = (rbin - r0, cbin - c0, obin - o0);
            let o0 = (o0 as isize).rem_euclid(n as isize) as usize;
            let (r0, c0) = ((r0 as isize + 1) as usize, (c0 as isize + 1) as usize);

            let v_r1 = mag * rf;
            let v_r0 = mag - v_r1;
            let v_rc11 = v_r1 * cf;
            let v_rc10 = v_r1 - v_rc11;
            let v_rc01 = v_r0 * cf;
            let v_rc00 = v_r0 - v_rc01;
            let v_rco111 = v_rc11 * of;
            let v_rco110 = v_rc11 - v_rco111;
            let v_rco101 = v_rc10 * of;
            let v_rco100 = v_rc10 - v_rco101;
            let v_rco011 = v_rc01 * of;
            let v_rco010 = v_rc01 - v_rco011;
            let v_rco001 = v_rc00 * of;
            let v_rco000 = v_rc00 - v_rco001;

            let idx = r0 * row_stride + c0 * col_stride + o0;
            hist[idx] += v_rco000;
            hist[idx + 1] += v_rco001;
            hist[idx + col_stride] += v_rco010;
            hist[idx + col_stride + 1] += v_rco011;
            hist[idx + row_stride] += v_rco100;
            hist[idx + row_stride + 1] += v_rco101;
            hist[idx + row_stride + col_stride] += v_rco110;
            hist[idx + row_stride + col_stride + 1] += v_rco111;
        }
    }

    // Fold the wrap-around orientation bins and drop the spatial padding.
    let mut data = Vec::with_capacity(DESCRIPTOR_SIZE);
    for i in 0..d {
        for j in 0..d {
            let idx = (i + 1) * row_stride + (j + 1) * col_stride;
            hist[idx] += hist[idx + n];
            hist[idx + 1] += hist[idx + n + 1];
            data.extend_from_slice(&hist[idx..idx + n]);
        }
    }

    let norm = data.iter().map(|v| v * v).sum::<f32>().sqrt();
    let thr = norm * DESCR_MAG_THR;
    for v in &mut data {
        *v = v.min(thr);
    }
    let norm = data.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in &mut data {
            *v /= norm;
        }
    }

    Descriptor::new(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn squares(width: u32, height: u32, seed: u64) -> GrayImage {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut img = GrayImage::from_pixel(width, height, Luma([20]));
        for _ in 0..40 {
            let size = rng.gen_range(4..12);
            let x0 = rng.gen_range(0..width - size);
            let y0 = rng.gen_range(0..height - size);
            let v = rng.gen_range(80..=255u8);
            for y in y0..y0 + size {
                for x in x0..x0 + size {
                    img.put_pixel(x, y, Luma([v]));
                }
            }
        }
        img
    }

    #[test]
    fn test_sift_scale_space() {
        let sift = Sift::new();
        let image = ImageF32::new(128, 128);
        let pyramid = sift.build_scale_space(&image);

        assert_eq!(pyramid.len(), 4);
        for (o, octave) in pyramid.iter().enumerate() {
            assert_eq!(octave.len(), sift.config().n_layers + 3);
            assert_eq!(octave[0].width, 128 >> o);
        }
    }

    #[test]
    fn test_sift_dog() {
        let sift = Sift::new();
        let image = ImageF32::from_gray(&squares(64, 64, 1));
        let gaussians = sift.build_scale_space(&image);
        let dogs = sift.compute_dog(&gaussians);

        assert_eq!(dogs.len(), gaussians.len());
        for octave in &dogs {
            assert_eq!(octave.len(), sift.config().n_layers + 2);
        }
    }

    #[test]
    fn octave_count_tracks_image_size() {
        let sift = Sift::new();
        assert_eq!(sift.octave_count(100, 100), 3);
        assert_eq!(sift.octave_count(1024, 768), 4);
        assert_eq!(sift.octave_count(8, 8), 1);
    }

    #[test]
    fn layer_sigmas_compose_to_octave_doubling() {
        let sift = Sift::new();
        let sigmas = sift.layer_sigmas();
        let total = sigmas.iter().take(4).map(|s| s * s).sum::<f32>().sqrt();
        assert!((total - 2.0 * sift.config().sigma).abs() < 1e-4);
    }

    #[test]
    fn flat_image_has_no_features() {
        let img = GrayImage::from_pixel(64, 64, Luma([128]));
        assert!(Sift::new().extract(&img).is_empty());
    }

    #[test]
    fn textured_image_has_unit_descriptors() {
        let features = Sift::new().extract(&squares(96, 96, 7));
        assert!(features.len() >= 10, "only {} features", features.len());
        for desc in features.descriptors().iter() {
            assert_eq!(desc.size(), DESCRIPTOR_SIZE);
            let norm = desc.data.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-3);
        }
        for kp in features.keypoints().iter() {
            assert!(kp.x >= 0.0 && kp.x < 96.0 && kp.y >= 0.0 && kp.y < 96.0);
            assert!((0.0..360.0).contains(&kp.angle));
        }
    }

    #[test]
    fn max_features_keeps_strongest() {
        let img = squares(96, 96, 3);
        let all = Sift::new().extract(&img);
        let limited = Sift::new().with_max_features(5).extract(&img);
        assert_eq!(limited.len(), 5.min(all.len()));
        let weakest_kept = limited
            .keypoints()
            .iter()
            .map(|k| k.response)
            .fold(f64::INFINITY, f64::min);
        let stronger = all
            .keypoints()
            .iter()
            .filter(|k| k.response > weakest_kept)
            .count();
        assert!(stronger < 5);
    }

    #[test]
    fn config_validation() {
        assert!(SiftConfig::default().validate().is_ok());
        let bad = SiftConfig {
            n_layers: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = SiftConfig {
            sigma: -1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
