use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-12;

/// 3×3 projective transform acting on pixel coordinates: `p' ~ H p`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Wraps `matrix`, scaling it so that `h[2][2] == 1` when possible.
    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        let mut matrix = matrix;
        let s = matrix[(2, 2)];
        if s.abs() > EPS {
            matrix /= s;
        }
        Self { matrix }
    }

    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            matrix: Matrix3::new(1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0),
        }
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self {
            matrix: Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0),
        }
    }

    /// Rotation by `angle` radians about `center`.
    pub fn rotation_about(center: Point2<f64>, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let tx = center.x - c * center.x + s * center.y;
        let ty = center.y - s * center.x - c * center.y;
        Self {
            matrix: Matrix3::new(c, -s, tx, s, c, ty, 0.0, 0.0, 1.0),
        }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn is_identity(&self, tolerance: f64) -> bool {
        (self.matrix - Matrix3::identity()).abs().max() <= tolerance
    }

    /// `self ∘ other`: `other` is applied first.
    pub fn compose(&self, other: &Homography) -> Homography {
        Homography::from_matrix(self.matrix * other.matrix)
    }

    pub fn try_inverse(&self) -> Option<Homography> {
        let inv = self.matrix.try_inverse()?;
        inv.iter()
            .all(|v| v.is_finite())
            .then(|| Homography::from_matrix(inv))
    }

    /// Maps a point; `None` when it lands on the line at infinity.
    pub fn transform_point(&self, p: &Point2<f64>) -> Option<Point2<f64>> {
        let v = self.matrix * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        if !w.is_finite() || w.abs() <= EPS {
            return None;
        }
        let out = Point2::new(v[0] / w, v[1] / w);
        (out.x.is_finite() && out.y.is_finite()).then_some(out)
    }

    /// Re-expresses the transform on a grid resampled by `scale`, using the
    /// pixel-centre convention `p' = scale * (p + 0.5) - 0.5`.
    ///
    /// A transform estimated on frames downscaled by `s` is lifted back to
    /// full resolution with `rescaled(1.0 / s)`.
    pub fn rescaled(&self, scale: f64) -> Homography {
        if scale <= 0.0 || !scale.is_finite() {
            return *self;
        }
        let offset = 0.5 * (scale - 1.0);
        let s = Matrix3::new(scale, 0.0, offset, 0.0, scale, offset, 0.0, 0.0, 1.0);
        let s_inv = Matrix3::new(
            1.0 / scale,
            0.0,
            -offset / scale,
            0.0,
            1.0 / scale,
            -offset / scale,
            0.0,
            0.0,
            1.0,
        );
        Homography::from_matrix(s * self.matrix * s_inv)
    }
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

/// Maps frame `source` coordinates onto frame `target = source - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeTransform {
    pub source: usize,
    pub target: usize,
    pub homography: Homography,
}

impl RelativeTransform {
    pub fn new(source: usize, homography: Homography) -> Self {
        Self {
            source,
            target: source.saturating_sub(1),
            homography,
        }
    }
}

/// Maps frame `frame` coordinates onto the anchor (frame 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteTransform {
    pub frame: usize,
    pub homography: Homography,
}

impl AbsoluteTransform {
    pub fn anchor() -> Self {
        Self {
            frame: 0,
            homography: Homography::identity(),
        }
    }

    pub fn is_anchor(&self) -> bool {
        self.frame == 0
    }

    /// Extends the chain by one frame: `self ∘ relative`.
    pub fn then(&self, relative: &RelativeTransform) -> AbsoluteTransform {
        AbsoluteTransform {
            frame: relative.source,
            homography: self.homography.compose(&relative.homography),
        }
    }
}

/// Hartley normalization: translate the centroid to the origin and scale the
/// mean distance to √2. Returns the normalized points and the similarity `T`
/// with `p_n = T p`, or `None` for coincident points.
pub fn normalize_points_2d(points: &[Point2<f64>]) -> Option<(Vec<Point2<f64>>, Matrix3<f64>)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist <= EPS {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = points
        .iter()
        .map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    Some((normalized, t))
}
