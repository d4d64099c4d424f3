//! Aligns an ordered sequence of overlapping grayscale frames onto the first
//! frame's pixel grid.
//!
//! ```no_run
//! use focus_align::prelude::*;
//!
//! # fn frames() -> Vec<image::GrayImage> { Vec::new() }
//! let output = AlignmentPipeline::new().align(&frames())?;
//! for (frame, transform) in output.frames.iter().zip(&output.transforms) {
//!     println!("{}x{} {:?}", frame.width(), frame.height(), transform.homography);
//! }
//! # Ok::<(), focus_align::core::Error>(())
//! ```

pub use align_core as core;
pub use align_features as features;
pub use align_imgproc as imgproc;
pub use align_registration as registration;

pub mod prelude {
    pub use align_core::{
        AbsoluteTransform, Canvas, Error, Homography, ImageFeatures, RansacConfig,
        RelativeTransform, Result,
    };
    pub use align_features::{FeatureExtractor, Matcher, MatcherConfig, Sift, SiftConfig};
    pub use align_registration::{
        AlignConfig, AlignmentOutput, AlignmentPipeline, ChainPolicy, FrameWarper, ImageSink,
        ImageSource, MemorySink, VecSource,
    };
}

/// Initialize a single global Rayon thread pool for the parallel stages.
///
/// Call this once at startup, before the first alignment. Repeated calls are
/// idempotent and return the first initialization result.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `FOCUS_ALIGN_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> Result<(), String> {
    align_core::init_global_thread_pool(num_threads)
}
