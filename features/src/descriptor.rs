use align_core::ImageFeatures;
use image::GrayImage;

/// Produces keypoints and their descriptors for one image.
///
/// Implementations must be deterministic and must not fail: an image without
/// usable structure yields an empty set.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, image: &GrayImage) -> ImageFeatures;
}

impl<F: FeatureExtractor + ?Sized> FeatureExtractor for Box<F> {
    fn extract(&self, image: &GrayImage) -> ImageFeatures {
        (**self).extract(image)
    }
}
