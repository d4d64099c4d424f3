//! End-to-end alignment: extract, match, estimate, compose, warp.

use crate::chain::{compose_outcomes, ChainPolicy, Substitution};
use crate::config::AlignConfig;
use crate::io::{ImageSink, ImageSource};
use crate::warp::FrameWarper;
use align_core::{
    AbsoluteTransform, Canvas, Error, ImageFeatures, RansacConfig, RelativeTransform, Result,
};
use align_features::{estimate_homography_fit, FeatureExtractor, Matcher, Sift};
use align_imgproc::downscale;
use image::GrayImage;
use rayon::prelude::*;

/// Diagnostics for one consecutive pair `(source, target = source - 1)`.
#[derive(Debug)]
pub struct PairReport {
    pub source: usize,
    pub target: usize,
    /// Keypoints found in `(source, target)`.
    pub keypoints: (usize, usize),
    pub correspondences: usize,
    pub inliers: usize,
    /// Mean inlier reprojection error at working resolution.
    pub residual: Option<f64>,
    /// Non-fatal conditions, e.g. `EmptyDescriptorSet`.
    pub warnings: Vec<Error>,
}

/// A pair's estimation result together with its diagnostics.
#[derive(Debug)]
pub struct PairEstimate {
    pub report: PairReport,
    pub outcome: Result<RelativeTransform>,
}

#[derive(Debug)]
pub struct AlignmentOutput {
    pub canvas: Canvas,
    /// Aligned frames, index-aligned with the input; frame 0 is the anchor.
    pub frames: Vec<GrayImage>,
    /// Absolute transforms in working-resolution pixel coordinates.
    pub transforms: Vec<AbsoluteTransform>,
    pub working_scale: f32,
    pub pairs: Vec<PairReport>,
    /// Pairs replaced by identity under `ChainPolicy::CarryForward`.
    pub substitutions: Vec<Substitution>,
}

impl AlignmentOutput {
    fn empty(working_scale: f32) -> Self {
        Self {
            canvas: Canvas::new(0, 0),
            frames: Vec::new(),
            transforms: Vec::new(),
            working_scale,
            pairs: Vec::new(),
            substitutions: Vec::new(),
        }
    }

    /// Absolute transforms in the original frames' pixel coordinates.
    pub fn full_resolution_transforms(&self) -> Vec<AbsoluteTransform> {
        lift_transforms(&self.transforms, self.working_scale)
    }
}

fn lift_transforms(transforms: &[AbsoluteTransform], working_scale: f32) -> Vec<AbsoluteTransform> {
    if working_scale == 1.0 {
        return transforms.to_vec();
    }
    let factor = 1.0 / working_scale as f64;
    transforms
        .iter()
        .map(|t| AbsoluteTransform {
            frame: t.frame,
            homography: t.homography.rescaled(factor),
        })
        .collect()
}

/// Registers a frame sequence onto its first frame.
pub struct AlignmentPipeline<E = Sift> {
    extractor: E,
    matcher: Matcher,
    estimator: RansacConfig,
    policy: ChainPolicy,
    working_scale: f32,
    fill: u8,
}

impl AlignmentPipeline<Sift> {
    pub fn new() -> Self {
        Self::build(Sift::new(), &AlignConfig::default())
    }

    pub fn from_config(config: &AlignConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(Sift::with_config(config.sift.clone()), config))
    }
}

impl Default for AlignmentPipeline<Sift> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: FeatureExtractor> AlignmentPipeline<E> {
    fn build(extractor: E, config: &AlignConfig) -> Self {
        Self {
            extractor,
            matcher: Matcher::with_config(config.matcher.clone()),
            estimator: config.estimator.clone(),
            policy: config.chain_policy,
            working_scale: config.working_scale,
            fill: config.fill,
        }
    }

    pub fn with_extractor<F: FeatureExtractor>(self, extractor: F) -> AlignmentPipeline<F> {
        AlignmentPipeline {
            extractor,
            matcher: self.matcher,
            estimator: self.estimator,
            policy: self.policy,
            working_scale: self.working_scale,
            fill: self.fill,
        }
    }

    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_estimator(mut self, estimator: RansacConfig) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_policy(mut self, policy: ChainPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Non-positive or larger-than-one factors are rejected by
    /// [`AlignmentPipeline::align`].
    pub fn with_working_scale(mut self, scale: f32) -> Self {
        self.working_scale = scale;
        self
    }

    pub fn with_fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }

    pub fn policy(&self) -> ChainPolicy {
        self.policy
    }

    /// Frames at the resolution used for feature work.
    fn working_frames(&self, frames: &[GrayImage]) -> Result<Vec<GrayImage>> {
        if self.working_scale == 1.0 {
            return Ok(frames.to_vec());
        }
        frames
            .par_iter()
            .map(|f| downscale(f, self.working_scale).map_err(Error::from))
            .collect()
    }

    /// One feature set per frame, extracted in parallel.
    pub fn extract_features(&self, frames: &[GrayImage]) -> Vec<ImageFeatures> {
        let _span = tracing::info_span!("extract", frames = frames.len()).entered();
        let features: Vec<ImageFeatures> = frames
            .par_iter()
            .map(|frame| self.extractor.extract(frame))
            .collect();
        for (frame, f) in features.iter().enumerate() {
            if f.is_empty() {
                tracing::warn!(frame, "frame has no keypoints");
            }
        }
        tracing::info!(
            keypoints = features.iter().map(ImageFeatures::len).sum::<usize>(),
            "features extracted"
        );
        features
    }

    /// Matches and fits every consecutive pair in parallel. Entry `k` is the
    /// pair `(k + 1, k)`.
    pub fn estimate_pairs(&self, features: &[ImageFeatures]) -> Vec<PairEstimate> {
        let _span = tracing::info_span!("estimate", pairs = features.len().saturating_sub(1))
            .entered();
        (1..features.len())
            .into_par_iter()
            .map(|i| self.estimate_pair(i, &features[i], &features[i - 1]))
            .collect()
    }

    fn estimate_pair(
        &self,
        source: usize,
        query: &ImageFeatures,
        train: &ImageFeatures,
    ) -> PairEstimate {
        let target = source - 1;
        let mut warnings = Vec::new();
        for (frame, f) in [(source, query), (target, train)] {
            if f.is_empty() {
                warnings.push(Error::EmptyDescriptorSet { frame });
            }
        }

        let matches = self.matcher.match_features(query, train);
        let fit = estimate_homography_fit(
            &matches,
            query.keypoints(),
            train.keypoints(),
            &self.estimator,
        );

        let (inliers, residual) = match &fit {
            Ok(fit) => (fit.inliers.len(), Some(fit.residual)),
            Err(_) => (0, None),
        };
        tracing::debug!(
            source,
            target,
            correspondences = matches.len(),
            inliers,
            residual = residual.unwrap_or(f64::NAN),
            "pair estimated"
        );
        if let Err(err) = &fit {
            tracing::debug!(source, error = %err, "pair estimation failed");
        }

        PairEstimate {
            report: PairReport {
                source,
                target,
                keypoints: (query.len(), train.len()),
                correspondences: matches.len(),
                inliers,
                residual,
                warnings,
            },
            outcome: fit.map(|fit| RelativeTransform::new(source, fit.homography)),
        }
    }

    /// Aligns `frames` onto `frames[0]`. Every output has the anchor's size;
    /// the anchor itself is returned unchanged.
    pub fn align(&self, frames: &[GrayImage]) -> Result<AlignmentOutput> {
        if !(self.working_scale > 0.0 && self.working_scale <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "working_scale must be in (0, 1], got {}",
                self.working_scale
            )));
        }
        let Some(anchor) = frames.first() else {
            return Ok(AlignmentOutput::empty(self.working_scale));
        };
        let canvas = Canvas::of(anchor);
        if canvas.is_empty() {
            return Err(Error::DimensionMismatch("anchor frame is empty".into()));
        }
        let _span = tracing::info_span!(
            "align",
            frames = frames.len(),
            width = canvas.width,
            height = canvas.height
        )
        .entered();
        tracing::info!(working_scale = self.working_scale, "aligning frames");

        let working = self.working_frames(frames)?;
        let features = self.extract_features(&working);

        let (outcomes, pairs): (Vec<_>, Vec<_>) = self
            .estimate_pairs(&features)
            .into_iter()
            .map(|p| (p.outcome, p.report))
            .unzip();
        for warning in pairs.iter().flat_map(|p| p.warnings.iter()) {
            tracing::warn!(%warning, "pair warning");
        }

        let chain = compose_outcomes(outcomes, self.policy)?;
        tracing::info!(
            substitutions = chain.substitutions.len(),
            "transform chain composed"
        );

        let full_res = lift_transforms(&chain.transforms, self.working_scale);
        let warper = FrameWarper::new(canvas).with_fill(self.fill);
        let aligned = {
            let _span = tracing::info_span!("warp").entered();
            warper.warp_all(frames, &full_res)?
        };
        tracing::info!(frames = aligned.len(), "frames warped");

        Ok(AlignmentOutput {
            canvas,
            frames: aligned,
            transforms: chain.transforms,
            working_scale: self.working_scale,
            pairs,
            substitutions: chain.substitutions,
        })
    }

    /// Pulls every frame from `source`, aligns them and delivers the results
    /// to `sink` in index order.
    pub fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<AlignmentOutput>
    where
        S: ImageSource + ?Sized,
        K: ImageSink + ?Sized,
    {
        let frames = source.frames()?;
        let output = self.align(&frames)?;
        for (index, image) in output.frames.iter().enumerate() {
            sink.accept(index, image).map_err(|e| match e {
                Error::Sink { .. } => e,
                other => Error::Sink {
                    index,
                    message: other.to_string(),
                },
            })?;
        }
        Ok(output)
    }
}
