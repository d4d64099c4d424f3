use align_core::{Error, Result};
use align_registration::*;
use image::{GrayImage, Luma};
use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn scene(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = GrayImage::from_pixel(width, height, Luma([15]));
    for _ in 0..(width * height / 250) {
        let size = rng.gen_range(4..14);
        let x0 = rng.gen_range(0..width - size);
        let y0 = rng.gen_range(0..height - size);
        let v = rng.gen_range(70..=250u8);
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                img.put_pixel(x, y, Luma([v]));
            }
        }
    }
    img
}

/// Frame `k` sees the scene panned right by `step * k` pixels.
fn panned_sequence(count: u32, step: u32) -> Vec<GrayImage> {
    let width = 100;
    let base = scene(width + step * (count - 1), 100, 42);
    (0..count)
        .map(|k| GrayImage::from_fn(width, 100, |x, y| *base.get_pixel(x + step * k, y)))
        .collect()
}

struct RejectingSink {
    reject_at: usize,
    accepted: Vec<usize>,
}

impl ImageSink for RejectingSink {
    fn accept(&mut self, index: usize, _image: &GrayImage) -> Result<()> {
        if index == self.reject_at {
            return Err(Error::Imaging("disk full".into()));
        }
        self.accepted.push(index);
        Ok(())
    }
}

#[test]
fn test_pipeline_from_toml_config() {
    let config = AlignConfig::from_toml_str(
        r#"
        chain_policy = "carry_forward"
        fill = 7

        [matcher]
        top_k = 20

        [estimator]
        threshold = 3.0
        "#,
    )
    .unwrap();
    let pipeline = AlignmentPipeline::from_config(&config).unwrap();
    assert_eq!(pipeline.policy(), ChainPolicy::CarryForward);

    let frames = panned_sequence(2, 8);
    let out = pipeline.align(&frames).unwrap();
    let p = out.transforms[1]
        .homography
        .transform_point(&Point2::new(30.0, 40.0))
        .unwrap();
    assert!((p.x - 38.0).abs() < 1.0, "x = {}", p.x);
    assert!((p.y - 40.0).abs() < 1.0, "y = {}", p.y);
    // Canvas columns left of frame 1's coverage take the configured fill.
    assert_eq!(out.frames[1].get_pixel(0, 50)[0], 7);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = AlignConfig {
        working_scale: 1.5,
        ..Default::default()
    };
    assert!(matches!(
        AlignmentPipeline::from_config(&config),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn test_sink_failure_stops_delivery() {
    let mut source = VecSource::new(panned_sequence(3, 6));
    let mut sink = RejectingSink {
        reject_at: 1,
        accepted: Vec::new(),
    };
    let err = AlignmentPipeline::new().run(&mut source, &mut sink).unwrap_err();
    assert!(matches!(err, Error::Sink { index: 1, .. }));
    assert_eq!(sink.accepted, vec![0]);
}

#[test]
fn test_pair_reports_cover_every_pair() {
    let frames = panned_sequence(4, 5);
    let out = AlignmentPipeline::new().align(&frames).unwrap();
    assert_eq!(out.pairs.len(), 3);
    for (k, pair) in out.pairs.iter().enumerate() {
        assert_eq!((pair.source, pair.target), (k + 1, k));
        assert!(pair.correspondences <= 10);
        assert!(pair.inliers >= 4 && pair.inliers <= pair.correspondences);
        assert!(pair.residual.unwrap() < 5.0);
        assert!(pair.warnings.is_empty());
    }
    assert!(out.substitutions.is_empty());
}

#[test]
fn test_compose_matches_pipeline_chain() {
    let frames = panned_sequence(3, 7);
    let pipeline = AlignmentPipeline::new();
    let features = pipeline.extract_features(&frames);
    let relatives: Vec<_> = pipeline
        .estimate_pairs(&features)
        .into_iter()
        .map(|p| p.outcome.unwrap())
        .collect();
    let absolute = compose(&relatives).unwrap();
    let out = pipeline.align(&frames).unwrap();
    assert_eq!(absolute, out.transforms);
}
