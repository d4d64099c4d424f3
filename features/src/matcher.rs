use align_core::{
    Correspondence, Correspondences, Descriptors, Error, ImageFeatures, KeyPoints, Result,
};
use nalgebra::Point2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Selection policy applied after nearest-neighbour search, in field order:
/// ratio test, absolute distance cap, mutual check, then top-K by distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Lowe ratio: keep a match only if `best < ratio * second_best`.
    pub ratio: Option<f32>,
    pub max_distance: Option<f32>,
    pub cross_check: bool,
    /// Number of strongest matches kept; `None` keeps all.
    pub top_k: Option<usize>,
    /// When matching located features, a match whose query and train points
    /// both lie within this many pixels of an already kept match is dropped
    /// before top-K. SIFT reports one keypoint per dominant orientation, so
    /// the same point pair otherwise fills several slots.
    pub min_separation: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            ratio: Some(0.8),
            max_distance: None,
            cross_check: false,
            top_k: Some(10),
            min_separation: 1.0,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(ratio) = self.ratio {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(Error::InvalidConfig(format!(
                    "matcher: ratio must be in (0, 1], got {ratio}"
                )));
            }
        }
        if let Some(d) = self.max_distance {
            if !(d >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "matcher: max_distance must be >= 0, got {d}"
                )));
            }
        }
        if !(self.min_separation >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "matcher: min_separation must be >= 0, got {}",
                self.min_separation
            )));
        }
        if self.top_k == Some(0) {
            return Err(Error::InvalidConfig("matcher: top_k must be >= 1".into()));
        }
        Ok(())
    }
}

/// Brute-force L2 descriptor matcher.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn with_cross_check(mut self) -> Self {
        self.config.cross_check = true;
        self
    }

    pub fn with_ratio_test(mut self, threshold: f32) -> Self {
        self.config.ratio = Some(threshold);
        self
    }

    pub fn without_ratio_test(mut self) -> Self {
        self.config.ratio = None;
        self
    }

    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.config.max_distance = Some(max_distance);
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.config.top_k = Some(k);
        self
    }

    pub fn with_min_separation(mut self, pixels: f32) -> Self {
        self.config.min_separation = pixels;
        self
    }

    pub fn keep_all(mut self) -> Self {
        self.config.top_k = None;
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Matches `query` (the newer image) against `train` (its predecessor).
    /// Either side empty gives an empty result.
    pub fn match_descriptors(&self, query: &Descriptors, train: &Descriptors) -> Correspondences {
        let mut matches = self.candidates(query, train);
        if let Some(k) = self.config.top_k {
            matches.retain_top_k(k);
        }
        matches
    }

    /// Like [`Matcher::match_descriptors`], but top-K only counts matches at
    /// distinct `(query point, train point)` locations.
    pub fn match_features(&self, query: &ImageFeatures, train: &ImageFeatures) -> Correspondences {
        let candidates = self.candidates(query.descriptors(), train.descriptors());
        retain_distinct(
            &candidates,
            query.keypoints(),
            train.keypoints(),
            self.config.min_separation as f64,
            self.config.top_k,
        )
    }

    /// Every match surviving the ratio, distance and mutual checks, sorted by
    /// ascending distance.
    fn candidates(&self, query: &Descriptors, train: &Descriptors) -> Correspondences {
        if query.is_empty() || train.is_empty() {
            return Correspondences::new();
        }

        let nearest = knn_match(query, train, 2);
        let kept: Vec<Option<Correspondence>> = nearest
            .par_iter()
            .map(|knn| {
                let best = *knn.first()?;
                if let (Some(ratio), Some(second)) = (self.config.ratio, knn.get(1)) {
                    if best.distance >= ratio * second.distance {
                        return None;
                    }
                }
                if let Some(max) = self.config.max_distance {
                    if best.distance > max {
                        return None;
                    }
                }
                if self.config.cross_check
                    && find_best_match(train, query, best.train_idx) != Some(best.query_idx)
                {
                    return None;
                }
                Some(best)
            })
            .collect();

        let mut matches: Correspondences = kept.into_iter().flatten().collect();
        matches.sort_by_distance();
        matches
    }
}

/// Walks `sorted` in order and keeps a match unless both of its points lie
/// within `min_separation` of a kept match's points. Stops after `limit`.
fn retain_distinct(
    sorted: &Correspondences,
    query: &KeyPoints,
    train: &KeyPoints,
    min_separation: f64,
    limit: Option<usize>,
) -> Correspondences {
    let mut kept: Vec<(Correspondence, Point2<f64>, Point2<f64>)> = Vec::new();
    for m in sorted.iter() {
        if limit.is_some_and(|k| kept.len() >= k) {
            break;
        }
        let (Some(q), Some(t)) = (query.get(m.query_idx), train.get(m.train_idx)) else {
            continue;
        };
        let (q, t) = (q.pt(), t.pt());
        let duplicate = kept.iter().any(|(_, kq, kt)| {
            (q - *kq).norm() <= min_separation && (t - *kt).norm() <= min_separation
        });
        if !duplicate {
            kept.push((*m, q, t));
        }
    }
    kept.into_iter().map(|(m, _, _)| m).collect()
}

/// Index of the nearest `train` descriptor to `query[query_idx]`; the first
/// one wins ties.
fn find_best_match(query: &Descriptors, train: &Descriptors, query_idx: usize) -> Option<usize> {
    let q_desc = query.get(query_idx)?;
    let mut best: Option<(usize, f32)> = None;
    for (idx, t_desc) in train.iter().enumerate() {
        let distance = q_desc.squared_distance(t_desc);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((idx, distance));
        }
    }
    best.map(|(idx, _)| idx)
}

pub fn match_descriptors(
    query: &Descriptors,
    train: &Descriptors,
    ratio_threshold: Option<f32>,
) -> Correspondences {
    let mut matcher = Matcher::new().without_ratio_test().keep_all();

    if let Some(threshold) = ratio_threshold {
        matcher = matcher.with_ratio_test(threshold);
    }

    matcher.match_descriptors(query, train)
}

/// The `k` nearest `train` descriptors for every `query` descriptor, nearest
/// first. Rows are computed in parallel and returned in query order.
pub fn knn_match(query: &Descriptors, train: &Descriptors, k: usize) -> Vec<Vec<Correspondence>> {
    query
        .descriptors
        .par_iter()
        .enumerate()
        .map(|(query_idx, q_desc)| {
            let mut nearest: Vec<(usize, f32)> = Vec::with_capacity(k + 1);
            for (train_idx, t_desc) in train.iter().enumerate() {
                let distance = q_desc.squared_distance(t_desc);
                if nearest.len() == k && nearest.last().map_or(true, |&(_, d)| distance >= d) {
                    continue;
                }
                let pos = nearest.partition_point(|&(_, d)| d <= distance);
                nearest.insert(pos, (train_idx, distance));
                nearest.truncate(k);
            }
            nearest
                .into_iter()
                .map(|(train_idx, sq)| Correspondence::new(query_idx, train_idx, sq.sqrt()))
                .collect()
        })
        .collect()
}

pub fn filter_matches_by_distance(matches: &mut Correspondences, max_distance: f32) {
    matches.filter_by_distance(max_distance);
}

pub fn filter_matches_by_ratio_test(
    matches: &[Vec<Correspondence>],
    ratio: f32,
) -> Correspondences {
    matches
        .iter()
        .filter(|knn| knn.len() >= 2 && knn[0].distance < ratio * knn[1].distance)
        .map(|knn| knn[0])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use align_core::{Descriptor, KeyPoint};

    fn descs(rows: &[[f32; 2]]) -> Descriptors {
        let mut d = Descriptors::new();
        for r in rows {
            d.push(Descriptor::new(r.to_vec()));
        }
        d
    }

    #[test]
    fn nearest_neighbour_is_found() {
        let query = descs(&[[0.0, 0.0], [10.0, 10.0]]);
        let train = descs(&[[10.0, 9.0], [0.0, 1.0], [50.0, 50.0]]);
        let m = Matcher::new().match_descriptors(&query, &train);
        assert_eq!(m.len(), 2);
        let pairs: Vec<(usize, usize)> = m.iter().map(|c| (c.query_idx, c.train_idx)).collect();
        assert!(pairs.contains(&(0, 1)));
        assert!(pairs.contains(&(1, 0)));
    }

    #[test]
    fn ratio_test_rejects_ambiguous() {
        let query = descs(&[[0.0, 0.0]]);
        let train = descs(&[[1.0, 0.0], [0.0, 1.05]]);
        assert!(Matcher::new().match_descriptors(&query, &train).is_empty());
        let relaxed = Matcher::new().without_ratio_test();
        assert_eq!(relaxed.match_descriptors(&query, &train).len(), 1);
    }

    #[test]
    fn ratio_runs_before_top_k() {
        // Query 0 has the smallest distance but is ambiguous; it must not
        // occupy a top-K slot.
        let query = descs(&[[0.0, 0.0], [20.0, 0.0], [40.0, 0.0]]);
        let train = descs(&[[0.1, 0.0], [-0.1, 0.0], [21.0, 0.0], [42.0, 0.0]]);
        let m = Matcher::new().with_top_k(2).match_descriptors(&query, &train);
        let queries: Vec<usize> = m.iter().map(|c| c.query_idx).collect();
        assert_eq!(queries, vec![1, 2]);
    }

    #[test]
    fn top_k_bounds_retained_distances() {
        let query = descs(&[[0.0, 0.0], [10.0, 0.0], [20.0, 0.0], [30.0, 0.0], [40.0, 0.0]]);
        let train = descs(&[[0.5, 0.0], [13.0, 0.0], [21.0, 0.0], [34.0, 0.0], [42.0, 0.0]]);
        let all = Matcher::new().without_ratio_test().keep_all().match_descriptors(&query, &train);
        let top = Matcher::new().without_ratio_test().with_top_k(3).match_descriptors(&query, &train);
        assert_eq!(top.len(), 3);
        let max_kept = top.max_distance().unwrap();
        for c in all.iter() {
            if !top.iter().any(|t| t.query_idx == c.query_idx) {
                assert!(max_kept <= c.distance);
            }
        }
    }

    #[test]
    fn cross_check_requires_mutual_nearest() {
        let query = descs(&[[0.0, 0.0], [0.2, 0.0]]);
        let train = descs(&[[0.3, 0.0], [100.0, 100.0]]);
        let m = Matcher::new()
            .without_ratio_test()
            .with_cross_check()
            .match_descriptors(&query, &train);
        assert_eq!(m.len(), 1);
        assert_eq!(m.matches[0].query_idx, 1);
    }

    #[test]
    fn max_distance_filters() {
        let query = descs(&[[0.0, 0.0], [10.0, 0.0]]);
        let train = descs(&[[0.5, 0.0], [13.0, 0.0]]);
        let m = Matcher::new()
            .without_ratio_test()
            .with_max_distance(1.0)
            .match_descriptors(&query, &train);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn empty_side_gives_no_matches() {
        let some = descs(&[[0.0, 0.0]]);
        assert!(Matcher::new().match_descriptors(&Descriptors::new(), &some).is_empty());
        assert!(Matcher::new().match_descriptors(&some, &Descriptors::new()).is_empty());
    }

    #[test]
    fn knn_rows_are_sorted() {
        let query = descs(&[[0.0, 0.0]]);
        let train = descs(&[[3.0, 0.0], [1.0, 0.0], [2.0, 0.0]]);
        let knn = knn_match(&query, &train, 2);
        assert_eq!(knn[0].len(), 2);
        assert_eq!(knn[0][0].train_idx, 1);
        assert_eq!(knn[0][1].train_idx, 2);
        let good = filter_matches_by_ratio_test(&knn, 0.8);
        assert_eq!(good.len(), 1);
    }

    #[test]
    fn free_function_keeps_everything_without_ratio() {
        let query = descs(&[[0.0, 0.0], [5.0, 0.0]]);
        let train = descs(&[[0.0, 0.1], [5.0, 0.2]]);
        let mut m = match_descriptors(&query, &train, None);
        assert_eq!(m.len(), 2);
        filter_matches_by_distance(&mut m, 0.15);
        assert_eq!(m.len(), 1);
    }

    fn located(rows: &[([f32; 2], (f64, f64))]) -> ImageFeatures {
        ImageFeatures::from_pairs(
            rows.iter()
                .map(|(d, (x, y))| (KeyPoint::new(*x, *y), Descriptor::new(d.to_vec()))),
        )
    }

    #[test]
    fn repeated_locations_do_not_fill_top_k() {
        // Three orientations of one point in each image, all matching their
        // twins exactly, plus three weaker matches elsewhere.
        let query = located(&[
            ([0.0, 0.0], (44.0, 72.0)),
            ([0.0, 30.0], (44.0, 72.0)),
            ([0.0, 60.0], (44.3, 72.2)),
            ([20.0, 0.0], (10.0, 10.0)),
            ([40.0, 0.0], (80.0, 20.0)),
            ([60.0, 0.0], (30.0, 90.0)),
        ]);
        let train = located(&[
            ([0.0, 0.0], (54.0, 72.0)),
            ([0.0, 30.0], (54.0, 72.0)),
            ([0.0, 60.0], (54.3, 72.2)),
            ([20.5, 0.0], (20.0, 10.0)),
            ([40.5, 0.0], (90.0, 20.0)),
            ([60.5, 0.0], (40.0, 90.0)),
        ]);

        let by_descriptor = Matcher::new()
            .with_top_k(4)
            .match_descriptors(query.descriptors(), train.descriptors());
        let queries: Vec<usize> = by_descriptor.iter().map(|c| c.query_idx).collect();
        assert_eq!(queries, vec![0, 1, 2, 3]);

        let m = Matcher::new().with_top_k(4).match_features(&query, &train);
        let queries: Vec<usize> = m.iter().map(|c| c.query_idx).collect();
        assert_eq!(queries, vec![0, 3, 4, 5]);

        let exact_only = Matcher::new()
            .with_top_k(4)
            .with_min_separation(0.0)
            .match_features(&query, &train);
        let queries: Vec<usize> = exact_only.iter().map(|c| c.query_idx).collect();
        assert_eq!(queries, vec![0, 2, 3, 4]);
    }

    #[test]
    fn config_validation() {
        assert!(MatcherConfig::default().validate().is_ok());
        let bad = MatcherConfig {
            top_k: Some(0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = MatcherConfig {
            ratio: Some(1.5),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = MatcherConfig {
            min_separation: -1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
