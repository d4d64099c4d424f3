//! Feature extraction, descriptor matching and homography estimation.

pub mod descriptor;
pub mod matcher;
pub mod ransac;
pub mod sift;

pub use descriptor::FeatureExtractor;
pub use matcher::*;
pub use ransac::*;
pub use sift::{Sift, SiftConfig, DESCRIPTOR_SIZE};

use align_core::{ImageFeatures, KeyPoints};
use image::GrayImage;

/// Detects SIFT features with default settings, keeping at most
/// `max_keypoints` of the strongest.
pub fn detect_keypoints(image: &GrayImage, max_keypoints: usize) -> KeyPoints {
    let (keypoints, _) = detect_features(image, max_keypoints).into_parts();
    keypoints
}

pub fn detect_features(image: &GrayImage, max_keypoints: usize) -> ImageFeatures {
    Sift::new().with_max_features(max_keypoints).extract(image)
}
