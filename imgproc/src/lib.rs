//! Image processing primitives used by the alignment pipeline: separable
//! Gaussian filtering, resampling and perspective warping.

pub mod convolve;
pub mod geometry;
pub mod resize;

pub use convolve::*;
pub use geometry::*;
pub use resize::*;

pub type Result<T> = std::result::Result<T, ImgprocError>;

#[derive(Debug, thiserror::Error)]
pub enum ImgprocError {
    #[error("Algorithm error: {0}")]
    AlgorithmError(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
}

impl From<ImgprocError> for align_core::Error {
    fn from(err: ImgprocError) -> Self {
        align_core::Error::Imaging(err.to_string())
    }
}

pub fn validate_image_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ImgprocError::DimensionMismatch(
            "Image dimensions must be non-zero".into(),
        ));
    }
    Ok(())
}
