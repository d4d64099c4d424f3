/// Error taxonomy shared by every stage of the alignment pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A frame produced no keypoints. Non-fatal: matching against it yields
    /// zero correspondences.
    #[error("Frame {frame} has an empty descriptor set")]
    EmptyDescriptorSet { frame: usize },

    #[error("Insufficient correspondences: need {required}, got {found}")]
    InsufficientCorrespondences { found: usize, required: usize },

    #[error("Estimation failed: {0}")]
    EstimationFailed(String),

    /// A pair-level failure that invalidates the absolute transform of
    /// `frame` and of every frame after it.
    #[error("Chain broken at frame {frame}: {source}")]
    ChainBroken {
        frame: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Chain order violated: {0}")]
    ChainOrder(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Transform is not invertible")]
    SingularTransform,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Imaging error: {0}")]
    Imaging(String),

    #[error("Sink rejected frame {index}: {message}")]
    Sink { index: usize, message: String },
}

impl Error {
    /// True for errors raised while fitting a pair's transform, whether the
    /// fit never started (too few correspondences) or found no consensus.
    pub fn is_estimation_failure(&self) -> bool {
        match self {
            Error::InsufficientCorrespondences { .. } | Error::EstimationFailed(_) => true,
            Error::ChainBroken { source, .. } => source.is_estimation_failure(),
            _ => false,
        }
    }

    /// Frame index at which the chain broke, if this is a chain error.
    pub fn broken_frame(&self) -> Option<usize> {
        match self {
            Error::ChainBroken { frame, .. } => Some(*frame),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
