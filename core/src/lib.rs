//! Core types for frame alignment: images, keypoints, descriptors,
//! correspondences, homographies and the robust estimation engine.

pub mod descriptor;
pub mod error;
pub mod geometry;
pub mod image;
pub mod keypoint;
pub mod robust;
pub mod runtime;

pub use descriptor::*;
pub use error::{Error, Result};
pub use geometry::*;
pub use image::*;
pub use keypoint::*;
pub use robust::{Ransac, RansacConfig, RobustModel, RobustResult};
pub use runtime::init_global_thread_pool;
