use align_core::{AbsoluteTransform, Canvas, Error, Result};
use align_imgproc::{warp_perspective_ex, BorderMode, Interpolation};
use image::GrayImage;
use rayon::prelude::*;

/// Resamples frames into the anchor's pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameWarper {
    canvas: Canvas,
    fill: u8,
}

impl FrameWarper {
    pub fn new(canvas: Canvas) -> Self {
        Self { canvas, fill: 0 }
    }

    /// Value written where a canvas pixel has no source coverage.
    pub fn with_fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn fill(&self) -> u8 {
        self.fill
    }

    /// Canvas pixel `p` takes the bilinear sample of `image` at
    /// `transform⁻¹(p)`. The anchor frame is returned as is.
    pub fn warp(&self, image: &GrayImage, transform: &AbsoluteTransform) -> Result<GrayImage> {
        if transform.is_anchor() && Canvas::of(image) == self.canvas {
            return Ok(image.clone());
        }
        let inverse = transform
            .homography
            .try_inverse()
            .ok_or(Error::SingularTransform)?;
        Ok(warp_perspective_ex(
            image,
            inverse.matrix(),
            self.canvas.width,
            self.canvas.height,
            Interpolation::Linear,
            BorderMode::Constant(self.fill),
        ))
    }

    /// Warps every frame in parallel; output order follows `frames`.
    pub fn warp_all(
        &self,
        frames: &[GrayImage],
        transforms: &[AbsoluteTransform],
    ) -> Result<Vec<GrayImage>> {
        if frames.len() != transforms.len() {
            return Err(Error::DimensionMismatch(format!(
                "{} frames but {} transforms",
                frames.len(),
                transforms.len()
            )));
        }
        frames
            .par_iter()
            .zip(transforms.par_iter())
            .map(|(frame, transform)| self.warp(frame, transform))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use align_core::{Homography, RelativeTransform};
    use image::Luma;
    use nalgebra::Matrix3;

    fn gradient_image(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]))
    }

    fn absolute(frame: usize, h: Homography) -> AbsoluteTransform {
        AbsoluteTransform::anchor().then(&RelativeTransform::new(frame, h))
    }

    #[test]
    fn anchor_is_returned_unchanged() {
        let img = gradient_image(30, 20);
        let warper = FrameWarper::new(Canvas::of(&img));
        let out = warper.warp(&img, &AbsoluteTransform::anchor()).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn translation_shifts_content() {
        let img = gradient_image(30, 20);
        let warper = FrameWarper::new(Canvas::new(30, 20)).with_fill(7);
        // frame coordinates map to anchor coordinates shifted by +4 in x
        let out = warper
            .warp(&img, &absolute(1, Homography::translation(4.0, 0.0)))
            .unwrap();
        assert_eq!(out.get_pixel(10, 5), img.get_pixel(6, 5));
        assert_eq!(out.get_pixel(2, 5)[0], 7);
    }

    #[test]
    fn output_matches_canvas() {
        let img = gradient_image(40, 25);
        let warper = FrameWarper::new(Canvas::new(32, 32));
        let out = warper
            .warp(&img, &absolute(1, Homography::translation(1.5, -2.0)))
            .unwrap();
        assert_eq!(Canvas::of(&out), Canvas::new(32, 32));
    }

    #[test]
    fn warping_is_repeatable() {
        let img = gradient_image(30, 30);
        let warper = FrameWarper::new(Canvas::of(&img));
        let t = absolute(
            2,
            Homography::from_matrix(Matrix3::new(1.01, 0.02, 3.3, -0.01, 0.99, 1.7, 1e-4, 0.0, 1.0)),
        );
        let a = warper.warp(&img, &t).unwrap();
        let b = warper.warp(&img, &t).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn singular_transform_is_rejected() {
        let img = gradient_image(10, 10);
        let warper = FrameWarper::new(Canvas::of(&img));
        let singular = Homography::from_matrix(Matrix3::new(
            1.0, 2.0, 0.0, 2.0, 4.0, 0.0, 0.0, 0.0, 1.0,
        ));
        let err = warper.warp(&img, &absolute(1, singular)).unwrap_err();
        assert!(matches!(err, Error::SingularTransform));
    }

    #[test]
    fn warp_all_preserves_order() {
        let frames = vec![gradient_image(12, 12), GrayImage::from_pixel(12, 12, Luma([99]))];
        let transforms = vec![
            AbsoluteTransform::anchor(),
            absolute(1, Homography::identity()),
        ];
        let warper = FrameWarper::new(Canvas::new(12, 12));
        let out = warper.warp_all(&frames, &transforms).unwrap();
        assert_eq!(out[0], frames[0]);
        assert!(out[1].pixels().all(|p| p[0] == 99));
        assert!(warper.warp_all(&frames, &transforms[..1]).is_err());
    }
}
