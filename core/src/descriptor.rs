use crate::{Error, KeyPoint, KeyPoints, Result};

/// Fixed-length gradient-histogram fingerprint of a keypoint's patch.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub data: Vec<f32>,
}

impl Descriptor {
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn squared_distance(&self, other: &Descriptor) -> f32 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    pub fn l2_distance(&self, other: &Descriptor) -> f32 {
        self.squared_distance(other).sqrt()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Descriptors {
    pub descriptors: Vec<Descriptor>,
}

impl Descriptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            descriptors: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, desc: Descriptor) {
        self.descriptors.push(desc);
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Descriptor> {
        self.descriptors.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter()
    }
}

/// Keypoints of one image together with their descriptors.
///
/// `descriptors[k]` always describes `keypoints[k]`; construction fails
/// otherwise.
#[derive(Debug, Clone, Default)]
pub struct ImageFeatures {
    keypoints: KeyPoints,
    descriptors: Descriptors,
}

impl ImageFeatures {
    pub fn new(keypoints: KeyPoints, descriptors: Descriptors) -> Result<Self> {
        if keypoints.len() != descriptors.len() {
            return Err(Error::DimensionMismatch(format!(
                "{} keypoints but {} descriptors",
                keypoints.len(),
                descriptors.len()
            )));
        }
        Ok(Self {
            keypoints,
            descriptors,
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds from `(keypoint, descriptor)` pairs, which keeps both sets
    /// index-aligned by construction.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (KeyPoint, Descriptor)>) -> Self {
        let mut keypoints = KeyPoints::new();
        let mut descriptors = Descriptors::new();
        for (kp, desc) in pairs {
            keypoints.push(kp);
            descriptors.push(desc);
        }
        Self {
            keypoints,
            descriptors,
        }
    }

    pub fn keypoints(&self) -> &KeyPoints {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &Descriptors {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn into_parts(self) -> (KeyPoints, Descriptors) {
        (self.keypoints, self.descriptors)
    }
}
