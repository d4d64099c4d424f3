//! Robust homography estimation from feature correspondences.
//!
//! Hypotheses come from minimal 4-point samples solved with the normalized
//! DLT; the consensus winner is refit on all of its inliers.

use align_core::geometry::normalize_points_2d;
use align_core::{
    Correspondences, Error, Homography, KeyPoints, Ransac, RansacConfig, Result, RobustModel,
};
use nalgebra::{DMatrix, Matrix3, Point2};

/// Four point pairs determine a homography.
pub const MIN_CORRESPONDENCES: usize = 4;

const COLLINEAR_EPS: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchPair {
    pub src: Point2<f64>,
    pub dst: Point2<f64>,
}

pub struct HomographyEstimator;

impl RobustModel<MatchPair> for HomographyEstimator {
    type Model = Homography;

    fn min_sample_size(&self) -> usize {
        MIN_CORRESPONDENCES
    }

    fn estimate(&self, data: &[&MatchPair]) -> Option<Self::Model> {
        let src: Vec<Point2<f64>> = data.iter().map(|m| m.src).collect();
        let dst: Vec<Point2<f64>> = data.iter().map(|m| m.dst).collect();
        dlt_homography(&src, &dst)
    }

    /// Forward reprojection error in pixels.
    fn compute_error(&self, model: &Self::Model, data: &MatchPair) -> f64 {
        match model.transform_point(&data.src) {
            Some(p) => (p - data.dst).norm(),
            None => f64::INFINITY,
        }
    }

    fn is_degenerate(&self, sample: &[&MatchPair]) -> bool {
        let src: Vec<Point2<f64>> = sample.iter().map(|m| m.src).collect();
        let dst: Vec<Point2<f64>> = sample.iter().map(|m| m.dst).collect();
        has_collinear_triple(&src) || has_collinear_triple(&dst)
    }
}

fn has_collinear_triple(points: &[Point2<f64>]) -> bool {
    let n = points.len();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                let (a, b, c) = (points[i], points[j], points[k]);
                let area = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
                if area.abs() < COLLINEAR_EPS {
                    return true;
                }
            }
        }
    }
    false
}

/// Normalized DLT: `dst ~ H src` in the least-squares sense over all pairs.
pub fn dlt_homography(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Homography> {
    let n = src.len();
    if n < MIN_CORRESPONDENCES || dst.len() != n {
        return None;
    }

    let (src_n, t_src) = normalize_points_2d(src)?;
    let (dst_n, t_dst) = normalize_points_2d(dst)?;

    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (i, (p, q)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        let (x1, y1) = (p.x, p.y);
        let (x2, y2) = (q.x, q.y);
        let r0 = 2 * i;
        let r1 = r0 + 1;

        a[(r0, 0)] = -x1;
        a[(r0, 1)] = -y1;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = x2 * x1;
        a[(r0, 7)] = x2 * y1;
        a[(r0, 8)] = x2;

        a[(r1, 3)] = -x1;
        a[(r1, 4)] = -y1;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = y2 * x1;
        a[(r1, 7)] = y2 * y1;
        a[(r1, 8)] = y2;
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let h_vec = v_t.row(svd.singular_values.imin());
    let h_n = Matrix3::from_fn(|r, c| h_vec[3 * r + c]);

    let h = t_dst.try_inverse()? * h_n * t_src;
    if h[(2, 2)].abs() <= f64::EPSILON || h.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let homography = Homography::from_matrix(h);
    homography.try_inverse()?;
    Some(homography)
}

/// Winning model together with its support.
#[derive(Debug, Clone)]
pub struct HomographyFit {
    pub homography: Homography,
    /// Indices into the correspondence list.
    pub inliers: Vec<usize>,
    /// Mean inlier reprojection error in pixels.
    pub residual: f64,
    pub iterations: usize,
}

/// Point pairs `(query keypoint, train keypoint)` for every correspondence.
pub fn correspondence_pairs(
    correspondences: &Correspondences,
    query: &KeyPoints,
    train: &KeyPoints,
) -> Result<Vec<MatchPair>> {
    correspondences
        .iter()
        .map(|m| {
            let src = query.get(m.query_idx).ok_or_else(|| {
                Error::DimensionMismatch(format!(
                    "query index {} out of range for {} keypoints",
                    m.query_idx,
                    query.len()
                ))
            })?;
            let dst = train.get(m.train_idx).ok_or_else(|| {
                Error::DimensionMismatch(format!(
                    "train index {} out of range for {} keypoints",
                    m.train_idx,
                    train.len()
                ))
            })?;
            Ok(MatchPair {
                src: src.pt(),
                dst: dst.pt(),
            })
        })
        .collect()
}

/// Estimates the homography mapping `query` keypoint coordinates onto
/// `train` keypoint coordinates.
pub fn estimate_homography_fit(
    correspondences: &Correspondences,
    query: &KeyPoints,
    train: &KeyPoints,
    config: &RansacConfig,
) -> Result<HomographyFit> {
    if correspondences.len() < MIN_CORRESPONDENCES {
        return Err(Error::InsufficientCorrespondences {
            found: correspondences.len(),
            required: MIN_CORRESPONDENCES,
        });
    }

    let data = correspondence_pairs(correspondences, query, train)?;
    let result = Ransac::new(config.clone()).run(&HomographyEstimator, &data);
    let inliers = result.inlier_indices();

    match result.model {
        Some(homography) => Ok(HomographyFit {
            homography,
            inliers,
            residual: result.residual,
            iterations: result.iterations,
        }),
        None if result.num_inliers == 0 => Err(Error::EstimationFailed(format!(
            "no non-degenerate hypothesis among {} correspondences after {} iterations",
            data.len(),
            result.iterations
        ))),
        None => Err(Error::EstimationFailed(format!(
            "best consensus has {} inliers, need {}",
            result.num_inliers,
            config.min_inliers.max(MIN_CORRESPONDENCES)
        ))),
    }
}

pub fn estimate_homography(
    correspondences: &Correspondences,
    query: &KeyPoints,
    train: &KeyPoints,
    config: &RansacConfig,
) -> Result<Homography> {
    estimate_homography_fit(correspondences, query, train, config).map(|fit| fit.homography)
}
